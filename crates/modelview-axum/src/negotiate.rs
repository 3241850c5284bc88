//! `Accept` header negotiation between JSON and HTML.

use axum::http::HeaderMap;
use axum::http::header::ACCEPT;

/// Response format chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Html,
}

impl Format {
    /// Pick the format from the request headers.
    ///
    /// HTML is chosen only when `text/html` has a strictly higher quality
    /// than `application/json`; a missing header means JSON.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let Some(accept) = headers.get(ACCEPT).and_then(|v| v.to_str().ok()) else {
            return Self::Json;
        };
        let ranges = parse_accept(accept);
        if quality(&ranges, "text", "html") > quality(&ranges, "application", "json") {
            Self::Html
        } else {
            Self::Json
        }
    }

    pub const fn is_html(self) -> bool {
        matches!(self, Self::Html)
    }
}

struct MediaRange<'a> {
    kind: &'a str,
    subtype: &'a str,
    q: f32,
}

fn parse_accept(header: &str) -> Vec<MediaRange<'_>> {
    header
        .split(',')
        .filter_map(|part| {
            let mut params = part.split(';').map(str::trim);
            let (kind, subtype) = params.next()?.split_once('/')?;
            let q = params
                .filter_map(|p| p.strip_prefix("q="))
                .find_map(|v| v.parse::<f32>().ok())
                .unwrap_or(1.0);
            Some(MediaRange { kind, subtype, q })
        })
        .collect()
}

// Quality of the most specific range matching kind/subtype.
fn quality(ranges: &[MediaRange<'_>], kind: &str, subtype: &str) -> f32 {
    let mut best: Option<(u8, f32)> = None;
    for range in ranges {
        let specificity = match (range.kind, range.subtype) {
            (k, s) if k.eq_ignore_ascii_case(kind) && s.eq_ignore_ascii_case(subtype) => 2,
            (k, "*") if k.eq_ignore_ascii_case(kind) => 1,
            ("*", "*") => 0,
            _ => continue,
        };
        if best.is_none_or(|(s, _)| specificity > s) {
            best = Some((specificity, range.q));
        }
    }
    best.map_or(0.0, |(_, q)| q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn format(accept: Option<&'static str>) -> Format {
        let mut headers = HeaderMap::new();
        if let Some(accept) = accept {
            headers.insert(ACCEPT, HeaderValue::from_static(accept));
        }
        Format::from_headers(&headers)
    }

    #[test]
    fn test_defaults_to_json() {
        assert_eq!(format(None), Format::Json);
        assert_eq!(format(Some("*/*")), Format::Json);
        assert_eq!(format(Some("application/json")), Format::Json);
    }

    #[test]
    fn test_browser_accept_prefers_html() {
        assert_eq!(
            format(Some(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
            )),
            Format::Html
        );
        assert_eq!(format(Some("text/*")), Format::Html);
    }

    #[test]
    fn test_equal_quality_is_json() {
        assert_eq!(format(Some("text/html, application/json")), Format::Json);
        assert_eq!(
            format(Some("text/html;q=0.5, application/json;q=0.9")),
            Format::Json
        );
    }
}
