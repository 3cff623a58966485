//! Embedding a pass id into, and recovering it from, URL querystrings.
//!
//! URLs are handled as plain text so relative links such as
//! `example.com/page?a=1` work the same as absolute ones. Only the
//! querystring is rewritten; everything before `?` and after `#` is kept
//! byte for byte.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use visitors_core::types::VisitorPassId;

/// Characters left unescaped in a querystring key.
const QUERY_KEY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Return `url` carrying exactly one `key` parameter set to `id`.
///
/// Any existing values for `key` are dropped. Other parameters keep their
/// original encoding.
pub fn tokenise_url(url: &str, key: &str, id: &VisitorPassId) -> String {
    let parts = UrlParts::split(url);

    let mut pairs: Vec<String> = parts
        .query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| decode_component(pair_key(pair)) != key)
        .map(str::to_string)
        .collect();
    pairs.push(format!("{}={}", utf8_percent_encode(key, QUERY_KEY), id));

    let mut out = String::with_capacity(url.len() + key.len() + 40);
    out.push_str(parts.base);
    out.push('?');
    out.push_str(&pairs.join("&"));
    if let Some(fragment) = parts.fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

/// Find the pass id carried by `key` in `url`.
///
/// Returns `None` when the parameter is missing or its first value is not
/// a UUID.
pub fn extract_token(url: &str, key: &str) -> Option<VisitorPassId> {
    let raw = query_value(url, key)?;
    raw.trim().parse().ok()
}

/// First decoded value of `key` in the querystring of `url`.
pub fn query_value(url: &str, key: &str) -> Option<String> {
    let parts = UrlParts::split(url);
    parts
        .query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .find(|pair| decode_component(pair_key(pair)) == key)
        .map(|pair| decode_component(pair.split_once('=').map_or("", |(_, v)| v)))
}

struct UrlParts<'a> {
    base: &'a str,
    query: &'a str,
    fragment: Option<&'a str>,
}

impl<'a> UrlParts<'a> {
    fn split(url: &'a str) -> Self {
        let (rest, fragment) = match url.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (url, None),
        };
        let (base, query) = rest.split_once('?').unwrap_or((rest, ""));
        Self {
            base,
            query,
            fragment,
        }
    }
}

fn pair_key(pair: &str) -> &str {
    pair.split_once('=').map_or(pair, |(k, _)| k)
}

/// `application/x-www-form-urlencoded` decoding of one component.
fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_UUID: &str = "68201321-9dd2-4fb3-92b1-24367f38a7d6";

    fn id() -> VisitorPassId {
        TEST_UUID.parse().unwrap()
    }

    #[test]
    fn test_tokenise() {
        let cases = [
            ("google.com", format!("google.com?vuid={TEST_UUID}")),
            ("google.com?vuid=123", format!("google.com?vuid={TEST_UUID}")),
            ("google.com?", format!("google.com?vuid={TEST_UUID}")),
            (
                "https://example.com/a/b#top",
                format!("https://example.com/a/b?vuid={TEST_UUID}#top"),
            ),
        ];
        for (url_in, url_out) in cases {
            assert_eq!(tokenise_url(url_in, "vuid", &id()), url_out);
        }
    }

    #[test]
    fn test_tokenise_replaces_every_existing_value() {
        let url = tokenise_url("/page?vuid=1&x=2&vuid=3", "vuid", &id());
        assert_eq!(url.matches("vuid=").count(), 1);
        assert_eq!(query_value(&url, "vuid").as_deref(), Some(TEST_UUID));
        assert_eq!(query_value(&url, "x").as_deref(), Some("2"));
    }

    #[test]
    fn test_tokenise_replaces_encoded_key() {
        let url = tokenise_url("/page?v%75id=old", "vuid", &id());
        assert_eq!(url, format!("/page?vuid={TEST_UUID}"));
    }

    #[test]
    fn test_tokenise_keeps_other_params_verbatim() {
        let url = tokenise_url("https://h.example/p?q=a+b&r=%2F", "vuid", &id());
        assert!(url.starts_with("https://h.example/p?"));
        assert!(url.contains("q=a+b"));
        assert!(url.contains("r=%2F"));
        assert!(url.ends_with(&format!("vuid={TEST_UUID}")));
    }

    #[test]
    fn test_tokenise_custom_key() {
        let url = tokenise_url("/x", "pass id", &id());
        assert_eq!(url, format!("/x?pass%20id={TEST_UUID}"));
        assert_eq!(extract_token(&url, "pass id"), Some(id()));
    }

    #[test]
    fn test_extract_token() {
        let url = format!("https://example.com/?a=1&vuid={TEST_UUID}#frag");
        assert_eq!(extract_token(&url, "vuid"), Some(id()));
        assert_eq!(extract_token("https://example.com/?vuid=123", "vuid"), None);
        assert_eq!(extract_token("https://example.com/", "vuid"), None);
        assert_eq!(extract_token("https://example.com/?vuid", "vuid"), None);
    }

    #[test]
    fn test_extract_after_tokenise() {
        let url = tokenise_url("example.com/list?page=2", "vuid", &id());
        assert_eq!(extract_token(&url, "vuid"), Some(id()));
    }
}
