use crate::config::ValidationConfig;
use crate::extract::{NormalizedRecord, NutritionInfo};
use crate::url::{extract_domain, matches_wildcard};
use crate::validate::Report;
use url::Url;

pub(crate) const NAME_MIN_CHARS: usize = 3;
pub(crate) const NAME_MAX_CHARS: usize = 500;
pub(crate) const MAX_TOTAL_MINUTES: i64 = 24 * 60;
pub(crate) const MAX_SERVINGS: i64 = 100;
pub(crate) const MAX_NUTRIENT_GRAMS: f64 = 1000.0;

pub(crate) fn check_name(name: &str, report: &mut Report) {
    let name = name.trim();
    if name.is_empty() {
        report.error("name", "name is required");
        return;
    }

    let len = name.chars().count();
    if len < NAME_MIN_CHARS {
        report.error(
            "name",
            format!("name must be at least {} characters, got {}", NAME_MIN_CHARS, len),
        );
    } else if len > NAME_MAX_CHARS {
        report.error(
            "name",
            format!("name must be at most {} characters, got {}", NAME_MAX_CHARS, len),
        );
    }

    if !name.chars().any(char::is_alphabetic) {
        report.error("name", "name must contain at least one letter");
    }
}

pub(crate) fn check_source_url(source_url: &str, expected_domain: Option<&str>, report: &mut Report) {
    if source_url.trim().is_empty() {
        report.error("source_url", "source URL is required");
        return;
    }

    if !(source_url.starts_with("http://") || source_url.starts_with("https://")) {
        report.error("source_url", "source URL must start with http:// or https://");
        return;
    }

    let Some(pattern) = expected_domain else {
        return;
    };

    let domain = Url::parse(source_url).ok().and_then(|u| extract_domain(&u));
    match domain {
        Some(domain) if matches_wildcard(pattern, &domain) => {}
        Some(domain) => report.warning(
            "source_url",
            format!("domain {} does not match expected {}", domain, pattern),
        ),
        None => report.warning("source_url", "source URL has no domain"),
    }
}

pub(crate) fn check_required_lists(
    record: &NormalizedRecord,
    config: &ValidationConfig,
    report: &mut Report,
) {
    if config.require_ingredients && record.ingredients.is_empty() {
        report.error("ingredients", "at least one ingredient is required");
    }
    if config.require_instructions && record.instructions.is_empty() {
        report.error("instructions", "at least one instruction step is required");
    }
}

pub(crate) fn check_total_time(total: Option<i64>, report: &mut Report) {
    match total {
        None => {}
        Some(t) if t < 0 => report.error("total_time", format!("total time is negative ({} min)", t)),
        Some(0) => report.warning("total_time", "total time is 0 minutes"),
        Some(t) if t > MAX_TOTAL_MINUTES => report.warning(
            "total_time",
            format!("total time {} min exceeds {} min", t, MAX_TOTAL_MINUTES),
        ),
        Some(_) => {}
    }
}

pub(crate) fn check_servings(servings: Option<i64>, report: &mut Report) {
    match servings {
        Some(s) if s < 1 => report.error("servings", format!("servings must be at least 1, got {}", s)),
        Some(s) if s > MAX_SERVINGS => report.warning(
            "servings",
            format!("servings {} exceeds {}", s, MAX_SERVINGS),
        ),
        _ => {}
    }
}

pub(crate) fn check_nutrition(
    nutrition: Option<&NutritionInfo>,
    config: &ValidationConfig,
    report: &mut Report,
) {
    let Some(nutrition) = nutrition else {
        report.warning("nutrition", "no nutrition data");
        return;
    };

    for (field, value) in nutrition.gram_values() {
        match value {
            Some(v) if v < 0.0 => report.error(field, format!("{} is negative ({})", field, v)),
            Some(v) if v > MAX_NUTRIENT_GRAMS => report.warning(
                field,
                format!("{} value {}g exceeds {}g", field, v, MAX_NUTRIENT_GRAMS),
            ),
            _ => {}
        }
    }

    if let Some(calories) = nutrition.calories {
        if calories < config.min_calories || calories > config.max_calories {
            report.warning(
                "calories",
                format!(
                    "calories {} outside expected range {}-{}",
                    calories, config.min_calories, config.max_calories
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(f: impl FnOnce(&mut Report)) -> Report {
        let mut report = Report::default();
        f(&mut report);
        report
    }

    #[test]
    fn test_name_rules() {
        assert!(run(|r| check_name("Stew", r)).errors.is_empty());
        assert_eq!(run(|r| check_name("", r)).errors.len(), 1);
        assert_eq!(run(|r| check_name("123", r)).errors.len(), 1);
        assert_eq!(run(|r| check_name(&"a".repeat(501), r)).errors.len(), 1);
        // "12" is both too short and letterless
        assert_eq!(run(|r| check_name("12", r)).errors.len(), 2);
    }

    #[test]
    fn test_url_scheme_is_error() {
        let report = run(|r| check_source_url("ftp://example.com/a/b/c", None, r));
        assert_eq!(report.errors.len(), 1);
        let report = run(|r| check_source_url("", None, r));
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_total_time_bounds() {
        assert_eq!(run(|r| check_total_time(Some(-5), r)).errors.len(), 1);
        assert_eq!(run(|r| check_total_time(Some(0), r)).warnings.len(), 1);
        assert_eq!(run(|r| check_total_time(Some(1440), r)).warnings.len(), 0);
        assert_eq!(run(|r| check_total_time(Some(1441), r)).warnings.len(), 1);
        let none = run(|r| check_total_time(None, r));
        assert!(none.errors.is_empty() && none.warnings.is_empty());
    }

    #[test]
    fn test_servings_bounds() {
        assert_eq!(run(|r| check_servings(Some(0), r)).errors.len(), 1);
        assert_eq!(run(|r| check_servings(Some(1), r)).errors.len(), 0);
        assert_eq!(run(|r| check_servings(Some(100), r)).warnings.len(), 0);
        assert_eq!(run(|r| check_servings(Some(101), r)).warnings.len(), 1);
    }

    #[test]
    fn test_nutrient_bounds() {
        let config = ValidationConfig::default();
        let info = NutritionInfo {
            calories: Some(9000.0),
            protein_g: Some(-1.0),
            fat_g: Some(1500.0),
            ..Default::default()
        };
        let report = run(|r| check_nutrition(Some(&info), &config, r));
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].field, "protein_g");
        assert_eq!(report.warnings.len(), 2);
    }
}
