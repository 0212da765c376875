use crate::UrlError;
use url::Url;

/// Query parameters that only carry tracking data and never change page content
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "ref", "source"];

/// Normalizes a discovered link so the same page is always spelled the same way
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not HTTP(S)
/// 3. Lowercase the host
/// 4. Collapse repeated slashes and resolve dot segments (a trailing slash is kept,
///    since recipe sites route `/slug` and `/slug/` differently)
/// 5. Remove the fragment
/// 6. Remove tracking query parameters, keeping the others in their original order
///
/// # Examples
///
/// ```
/// use recipe_harvest::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.COM/recipes//dinner/stew/#method").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/recipes/dinner/stew/");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?.to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    Ok(url)
}

fn normalize_path(path: &str) -> String {
    let trailing_slash = path.len() > 1 && path.ends_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    let mut result = format!("/{}", segments.join("/"));
    if trailing_slash {
        result.push('/');
    }
    result
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
