//! Cache key conventions shared by the resolver, click recorder and
//! reconciliation worker.

/// Prefix of cached `code -> target URL` entries.
pub const URL_PREFIX: &str = "url:";

/// Prefix of per-code click counters.
pub const CLICKS_PREFIX: &str = "clicks:";

/// Glob matching every click counter key.
pub const CLICKS_PATTERN: &str = "clicks:*";

/// Key of the cached target URL for `code`.
pub fn url_key(code: &str) -> String {
    format!("{URL_PREFIX}{code}")
}

/// Key of the click counter for `code`.
pub fn clicks_key(code: &str) -> String {
    format!("{CLICKS_PREFIX}{code}")
}

/// Extracts the short code from a click counter key.
///
/// Returns `None` for keys outside the counter namespace or with an empty code.
pub fn code_from_clicks_key(key: &str) -> Option<&str> {
    key.strip_prefix(CLICKS_PREFIX).filter(|code| !code.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys() {
        assert_eq!(url_key("sG1"), "url:sG1");
        assert_eq!(clicks_key("sG1"), "clicks:sG1");
    }

    #[test]
    fn test_code_from_clicks_key() {
        assert_eq!(code_from_clicks_key("clicks:abc"), Some("abc"));
        assert_eq!(code_from_clicks_key("clicks:"), None);
        assert_eq!(code_from_clicks_key("url:abc"), None);
    }
}
