use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use recipe_harvest::url::extract_domain;
///
/// let url = Url::parse("https://WWW.Example.com/recipes/soup").unwrap();
/// assert_eq!(extract_domain(&url), Some("www.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Derives the stable idempotency key for a recipe from its URL
///
/// The slug is the last non-empty path segment, lowercased. Returns None for
/// URLs whose path is just `/`.
///
/// ```
/// use recipe_harvest::url::slug_from_url;
///
/// assert_eq!(
///     slug_from_url("https://example.com/recipes/dinner/Beef-Stew/"),
///     Some("beef-stew".to_string())
/// );
/// ```
pub fn slug_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(|s| s.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("http://127.0.0.1:8080/recipes").unwrap();
        assert_eq!(extract_domain(&url), Some("127.0.0.1".to_string()));
    }

    #[test]
    fn test_extract_subdomain() {
        let url = Url::parse("https://cooking.example.com/recipes/x").unwrap();
        assert_eq!(extract_domain(&url), Some("cooking.example.com".to_string()));
    }

    #[test]
    fn test_slug_ignores_query_and_fragment() {
        assert_eq!(
            slug_from_url("https://example.com/recipes/tomato-soup?print=1#top"),
            Some("tomato-soup".to_string())
        );
    }

    #[test]
    fn test_slug_same_with_and_without_trailing_slash() {
        assert_eq!(
            slug_from_url("https://example.com/recipes/tomato-soup/"),
            slug_from_url("https://example.com/recipes/tomato-soup")
        );
    }

    #[test]
    fn test_slug_of_root_is_none() {
        assert_eq!(slug_from_url("https://example.com/"), None);
    }

    #[test]
    fn test_slug_of_garbage_is_none() {
        assert_eq!(slug_from_url("not a url"), None);
    }
}
