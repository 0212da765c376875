//! Robots.txt parser implementation
//!
//! Allow/disallow matching is delegated to the robotstxt crate; crawl-delay is
//! read separately because the matcher does not expose it.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt data for the target site
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    content: String,
    allow_all: bool,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// Used when robots.txt is missing or cannot be fetched.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    /// Returns true if this instance permits every URL without consulting rules
    pub fn is_permissive(&self) -> bool {
        self.allow_all || self.content.trim().is_empty()
    }

    /// Checks if a full URL may be fetched by the given user agent
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.is_permissive() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, product_token(user_agent), url)
    }

    /// Gets the crawl delay in seconds for a user agent, if one is declared
    ///
    /// A group naming this agent takes precedence over the `*` group.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        if self.is_permissive() {
            return None;
        }

        let agent = product_token(user_agent).to_lowercase();
        let mut group: Vec<String> = Vec::new();
        let mut in_rules = false;
        let mut for_agent: Option<f64> = None;
        let mut for_wildcard: Option<f64> = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    // A user-agent line after rules starts a new group
                    if in_rules {
                        group.clear();
                        in_rules = false;
                    }
                    group.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    in_rules = true;
                    let Ok(delay) = value.parse::<f64>() else {
                        continue;
                    };
                    if group.iter().any(|ua| ua != "*" && agent.contains(ua.as_str())) {
                        for_agent = Some(delay);
                    } else if group.iter().any(|ua| ua == "*") {
                        for_wildcard = Some(delay);
                    }
                }
                _ => in_rules = true,
            }
        }

        for_agent.or(for_wildcard)
    }
}

/// Reduces a full user-agent header to the product token robots.txt groups match on
///
/// `"RecipeBot/1.0 (+https://example.com)"` becomes `"RecipeBot"`.
fn product_token(user_agent: &str) -> &str {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(user_agent)
}
