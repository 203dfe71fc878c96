use crate::{RulesError, RulesResult};
use tracing::trace;

/// A resource name pattern with an optional leading and/or trailing `*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectionPattern {
    Any,
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
}

impl SelectionPattern {
    pub fn parse(pattern: &str) -> RulesResult<SelectionPattern> {
        let invalid = || RulesError::InvalidPattern(pattern.to_owned());
        if pattern == "*" {
            return Ok(SelectionPattern::Any);
        }
        let (leading, rest) = match pattern.strip_prefix('*') {
            Some(rest) => (true, rest),
            None => (false, pattern),
        };
        let (trailing, core) = match rest.strip_suffix('*') {
            Some(core) => (true, core),
            None => (false, rest),
        };
        if core.is_empty() || core.contains('*') {
            return Err(invalid());
        }
        let core = core.to_owned();
        Ok(match (leading, trailing) {
            (true, true) => SelectionPattern::Contains(core),
            (true, false) => SelectionPattern::Suffix(core),
            (false, true) => SelectionPattern::Prefix(core),
            (false, false) => SelectionPattern::Exact(core),
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            SelectionPattern::Any => true,
            SelectionPattern::Exact(exact) => name == exact,
            SelectionPattern::Prefix(prefix) => name.starts_with(prefix.as_str()),
            SelectionPattern::Suffix(suffix) => name.ends_with(suffix.as_str()),
            SelectionPattern::Contains(infix) => name.contains(infix.as_str()),
        }
    }
}

/// Include/exclude filter deciding which resources are transformed at all.
/// An empty include list includes everything; excludes win over includes.
#[derive(Debug, Clone, Default)]
pub struct SelectionRule {
    includes: Vec<SelectionPattern>,
    excludes: Vec<SelectionPattern>,
}

impl SelectionRule {
    pub fn new<I, E>(includes: I, excludes: E) -> RulesResult<SelectionRule>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let includes = includes
            .into_iter()
            .map(|pattern| SelectionPattern::parse(pattern.as_ref()))
            .collect::<RulesResult<Vec<_>>>()?;
        let excludes = excludes
            .into_iter()
            .map(|pattern| SelectionPattern::parse(pattern.as_ref()))
            .collect::<RulesResult<Vec<_>>>()?;
        Ok(SelectionRule { includes, excludes })
    }

    pub fn select(&self, resource_name: &str) -> bool {
        let selected = self.select_included(resource_name) && !self.reject_excluded(resource_name);
        if !selected {
            trace!(resource = resource_name, "resource not selected");
        }
        selected
    }

    pub fn select_included(&self, resource_name: &str) -> bool {
        self.includes.is_empty()
            || self
                .includes
                .iter()
                .any(|pattern| pattern.matches(resource_name))
    }

    pub fn reject_excluded(&self, resource_name: &str) -> bool {
        self.excludes
            .iter()
            .any(|pattern| pattern.matches(resource_name))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_patterns() {
        assert_eq!(
            SelectionPattern::Suffix(".class".into()),
            SelectionPattern::parse("*.class").unwrap()
        );
        assert!(SelectionPattern::parse("META-INF/*")
            .unwrap()
            .matches("META-INF/MANIFEST.MF"));
        assert!(SelectionPattern::parse("*rest*").unwrap().matches("a/rest/B.class"));
        assert!(SelectionPattern::parse("a*b").is_err());
        assert!(SelectionPattern::parse("**").is_err());
    }

    #[test]
    fn test_select() {
        let rule = SelectionRule::new(["com/*"], ["*Test.class"]).unwrap();
        assert!(rule.select("com/foo/Bar.class"));
        assert!(!rule.select("com/foo/BarTest.class"));
        assert!(!rule.select("org/foo/Bar.class"));

        let everything = SelectionRule::default();
        assert!(everything.select("anything"));
    }
}
