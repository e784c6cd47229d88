//! Context selection: pattern tokens and the filter engine.
//!
//! A token is parsed into a [`Filter`]:
//! - `name` matches the context with exactly that name
//! - `/re/` matches contexts whose whole name matches `re`
//! - `^tok` removes whatever `tok` would have matched
//!
//! [`match_targets`] applies filters left to right against the raw context
//! list and always returns a subsequence of it.

use crate::errors::AllctxError;
use regex::Regex;
use std::collections::HashSet;

/// How a filter compares a context name.
#[derive(Debug, Clone)]
pub enum FilterKind {
    Exact,
    /// Compiled anchored form of the pattern.
    Regex(Regex),
}

/// One parsed pattern token.
#[derive(Debug, Clone)]
pub struct Filter {
    pub kind: FilterKind,
    pub negate: bool,
    pub pattern: String,
}

impl Filter {
    /// Parse a single command-line token.
    pub fn parse(token: &str) -> Result<Self, AllctxError> {
        let (negate, rest) = match token.strip_prefix('^') {
            Some(rest) => (true, rest),
            None => (false, token),
        };

        if rest.is_empty() {
            return Err(invalid(token, "empty pattern"));
        }

        if rest.len() >= 2 && rest.starts_with('/') && rest.ends_with('/') {
            let pattern = &rest[1..rest.len() - 1];
            let re = Regex::new(&format!("^(?:{})$", pattern))
                .map_err(|e| invalid(token, &e.to_string()))?;
            return Ok(Self {
                kind: FilterKind::Regex(re),
                negate,
                pattern: pattern.to_string(),
            });
        }

        Ok(Self {
            kind: FilterKind::Exact,
            negate,
            pattern: rest.to_string(),
        })
    }

    /// Parse every token, failing on the first invalid one.
    pub fn parse_all<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<Self>, AllctxError> {
        tokens.iter().map(|t| Self::parse(t.as_ref())).collect()
    }

    /// Whether `name` matches the un-negated pattern.
    pub fn matches(&self, name: &str) -> bool {
        match &self.kind {
            FilterKind::Exact => self.pattern == name,
            FilterKind::Regex(re) => re.is_match(name),
        }
    }
}

fn invalid(token: &str, reason: &str) -> AllctxError {
    AllctxError::InvalidPattern {
        token: token.to_string(),
        reason: reason.to_string(),
    }
}

/// Apply `filters` in order to `raw` and return the selected contexts in raw order.
///
/// With no filters the raw list is returned as is. A list made only of
/// negations starts from every context; otherwise selection starts empty.
pub fn match_targets(raw: &[String], filters: &[Filter]) -> Vec<String> {
    if filters.is_empty() {
        return raw.to_vec();
    }

    let mut selected: HashSet<&str> = if filters.iter().any(|f| !f.negate) {
        HashSet::new()
    } else {
        raw.iter().map(String::as_str).collect()
    };

    for filter in filters {
        for name in raw.iter().filter(|n| filter.matches(n)) {
            if filter.negate {
                selected.remove(name.as_str());
            } else {
                selected.insert(name.as_str());
            }
        }
    }

    let mut seen = HashSet::new();
    raw.iter()
        .filter(|n| selected.contains(n.as_str()) && seen.insert(n.as_str()))
        .cloned()
        .collect()
}
