//! List query parameters, sorting and paging.

use std::collections::BTreeMap;
use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::instance::Instance;
use super::model::ModelDef;

/// Default number of items per page.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Default upper bound for the `limit` query parameter.
pub const DEFAULT_MAX_PAGE_LIMIT: u32 = 50;

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for Direction {
    type Err = ListParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(ListParamError::InvalidDirection),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}

/// Something a query can be ordered by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortExpr {
    /// A column of the listed model.
    Column(String),
    /// A trusted SQL expression, emitted verbatim.
    Raw(String),
}

/// Client-facing sort keys mapped to orderable expressions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortMap(BTreeMap<String, SortExpr>);

impl SortMap {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn column(mut self, key: impl Into<String>, column: impl Into<String>) -> Self {
        self.0.insert(key.into(), SortExpr::Column(column.into()));
        self
    }

    #[must_use]
    pub fn raw(mut self, key: impl Into<String>, expr: impl Into<String>) -> Self {
        self.0.insert(key.into(), SortExpr::Raw(expr.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&SortExpr> {
        self.0.get(key)
    }
}

/// A resolved `ORDER BY` term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub expr: SortExpr,
    pub direction: Direction,
}

/// Equality filter applied by a [`BaseQuery`].
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    IsNull(String),
    NotNull(String),
}

/// The query every lookup and listing of a view builds on.
///
/// Views override `base_query` to narrow what is visible, e.g. hiding
/// soft-deleted rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseQuery {
    filters: Vec<Filter>,
}

impl BaseQuery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn filter_eq(self, column: impl Into<String>, value: Value) -> Self {
        self.filter(Filter::Eq(column.into(), value))
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }
}

/// Offset, limit and order for one page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub offset: u64,
    pub order: Option<Ordering>,
}

/// One page of instances plus the unpaginated total.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Instance>,
    pub count: u64,
}

/// Per-view listing defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSettings {
    pub page_limit: u32,
    pub max_page_limit: u32,
    /// Sort key used when the request has no `sortby`. `None` means unsorted.
    pub sortby: Option<String>,
    pub direction: Direction,
}

impl Default for ListSettings {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
            max_page_limit: DEFAULT_MAX_PAGE_LIMIT,
            sortby: None,
            direction: Direction::Asc,
        }
    }
}

/// Rejected list query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ListParamError {
    #[error("Invalid limit")]
    InvalidLimit,
    #[error("Invalid offset")]
    InvalidOffset,
    #[error("Invalid sortby")]
    InvalidSortby,
    #[error("Invalid direction")]
    InvalidDirection,
}

/// Raw list query string parameters, as sent by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub sortby: Option<String>,
    pub direction: Option<String>,
}

impl ListQuery {
    /// Resolve the raw parameters against a view's settings.
    ///
    /// `limit` is clamped to `max_page_limit`. `sortby` is looked up in
    /// `sort_map` first and then among the model's columns; an empty
    /// `sortby` disables ordering.
    pub fn resolve(
        &self,
        settings: &ListSettings,
        model: &ModelDef,
        sort_map: Option<&SortMap>,
    ) -> Result<PageRequest, ListParamError> {
        let limit = match self.limit.as_deref() {
            None => settings.page_limit,
            Some(raw) => {
                let n = parse_count(raw).ok_or(ListParamError::InvalidLimit)?;
                u32::try_from(n).unwrap_or(u32::MAX)
            }
        }
        .min(settings.max_page_limit);

        let offset = match self.offset.as_deref() {
            None => 0,
            Some(raw) => {
                let n = parse_count(raw).ok_or(ListParamError::InvalidOffset)?;
                u64::try_from(n).unwrap_or(u64::MAX)
            }
        };

        let direction = match self.direction.as_deref() {
            None => settings.direction,
            Some(raw) => raw.parse()?,
        };

        let sortby = self.sortby.as_deref().or(settings.sortby.as_deref());
        let order = match sortby {
            None | Some("") => None,
            Some(key) => Some(Ordering {
                expr: resolve_sort_key(key, model, sort_map)?,
                direction,
            }),
        };

        Ok(PageRequest {
            limit,
            offset,
            order,
        })
    }
}

/// Non-negative integer of any size; too large saturates.
fn parse_count(raw: &str) -> Option<u128> {
    match raw.trim().parse::<u128>() {
        Ok(n) => Some(n),
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => Some(u128::MAX),
        Err(_) => None,
    }
}

fn resolve_sort_key(
    key: &str,
    model: &ModelDef,
    sort_map: Option<&SortMap>,
) -> Result<SortExpr, ListParamError> {
    if let Some(expr) = sort_map.and_then(|m| m.get(key)) {
        return Ok(expr.clone());
    }
    if model.has_column(key) {
        return Ok(SortExpr::Column(key.to_string()));
    }
    Err(ListParamError::InvalidSortby)
}
