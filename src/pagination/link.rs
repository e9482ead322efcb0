//! REST `Link` header pagination
//!
//! Format: `<https://shop/admin/api/2024-07/products.json?limit=50&page_info=abc>; rel="next"`

use url::Url;

/// Parse a Link header and extract the URL for the given rel
pub fn parse_link_header(header: &str, target_rel: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut url = None;
        let mut rel = None;

        for segment in part.split(';').map(str::trim) {
            if let Some(inner) = segment.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                url = Some(inner);
            } else if let Some(value) = segment.strip_prefix("rel=") {
                rel = Some(value.trim_matches('"').trim_matches('\''));
            }
        }

        match (url, rel) {
            (Some(u), Some(r)) if r == target_rel => Some(u.to_string()),
            _ => None,
        }
    })
}

/// `page_info` query value of the `rel="next"` link
pub fn next_page_info(header: &str) -> Option<String> {
    let next = parse_link_header(header, "next")?;
    let url = Url::parse(&next).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "page_info")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}
