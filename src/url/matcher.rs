/// Checks if a domain matches a wildcard pattern
///
/// `"example.com"` matches only itself. `"*.example.com"` matches the bare
/// domain and any subdomain of it, so a recipe hosted on `www.example.com`
/// still counts as coming from the expected source.
///
/// # Examples
///
/// ```
/// use recipe_harvest::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.example.com", "www.example.com"));
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(!matches_wildcard("*.example.com", "example.org"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || candidate
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => candidate == pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_only() {
        assert!(matches_wildcard("www.example.com", "www.example.com"));
        assert!(!matches_wildcard("example.com", "www.example.com"));
    }

    #[test]
    fn test_wildcard_matches_bare_and_nested() {
        assert!(matches_wildcard("*.example.com", "example.com"));
        assert!(matches_wildcard("*.example.com", "cdn.static.example.com"));
    }

    #[test]
    fn test_wildcard_rejects_lookalikes() {
        assert!(!matches_wildcard("*.example.com", "badexample.com"));
        assert!(!matches_wildcard("*.example.com", "example.com.evil.net"));
        assert!(!matches_wildcard("*.example.com", ""));
    }
}
