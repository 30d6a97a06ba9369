//! Pulls the maghrib time out of an upstream HTML page.
//!
//! The page markup is not stable, so extraction runs an ordered table of
//! [`Rule`]s. Each rule looks for a marker (Arabic label, English label or
//! a JSON field) shortly before an `H:MM` pair. The first rule whose first
//! match is a plausible maghrib time wins; an implausible match is skipped
//! and the next rule gets its turn.

use regex::Regex;

use super::types::TimeValue;

/// One marker pattern. The pattern must capture the hour in group 1 and the
/// minute in group 2.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: &'static str,
    pattern: Regex,
}

impl Rule {
    pub fn new(name: &'static str, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            pattern: Regex::new(pattern)?,
        })
    }

    /// Applies the rule to its first match only.
    pub fn apply(&self, html: &str) -> Option<TimeValue> {
        let caps = self.pattern.captures(html)?;
        let hour = caps.get(1)?.as_str().parse().ok()?;
        let minute = caps.get(2)?.as_str().parse().ok()?;
        TimeValue::plausible(hour, minute)
    }
}

// `[0-9]` rather than `\d`: the latter also matches Arabic-Indic digits.
const DEFAULT_RULES: &[(&str, &str)] = &[
    ("arabic-label", r"المغرب(?s:.){0,20}?([0-9]{1,2}):([0-9]{2})"),
    ("english-label", r"(?i)Maghrib(?s:.){0,20}?([0-9]{1,2}):([0-9]{2})"),
    ("json-field", r#"(?i)"maghrib"\s*:\s*"([0-9]{1,2}):([0-9]{2})""#),
];

#[derive(Debug, Clone)]
pub struct Extractor {
    rules: Vec<Rule>,
}

impl Extractor {
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn extract(&self, html: &str) -> Option<TimeValue> {
        self.rules.iter().find_map(|rule| {
            let found = rule.apply(html);
            if let Some(value) = found {
                tracing::debug!(rule = rule.name, %value, "maghrib pattern matched");
            }
            found
        })
    }
}

impl Default for Extractor {
    fn default() -> Self {
        let rules = DEFAULT_RULES
            .iter()
            .map(|&(name, pattern)| {
                Rule::new(name, pattern).expect("built-in maghrib pattern must compile")
            })
            .collect();
        Self::with_rules(rules)
    }
}
