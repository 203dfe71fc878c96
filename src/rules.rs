//! Rule tables consumed by the engine. Loading them from rule files is left
//! to the embedding tool; any serde format can produce a [`RuleTables`].

use crate::signature::VersionRange;
use crate::{RulesError, RulesResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Replacement identity for a renamed bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BundleUpdate {
    pub symbolic_name: String,
    pub version: String,
    /// Text appended to (with a leading `+`) or replacing the bundle description.
    pub addendum: String,
}

impl BundleUpdate {
    /// Applies the addendum to an existing description or name.
    pub fn update_description(&self, initial: &str) -> Option<String> {
        if self.addendum.is_empty() {
            return None;
        }
        let updated = match self.addendum.strip_prefix('+') {
            Some(suffix) => format!("{initial}{suffix}"),
            None => self.addendum.clone(),
        };
        (updated != initial).then_some(updated)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TextRule {
    /// Resource name pattern, see [`crate::SelectionPattern`].
    pub pattern: String,
    pub substitutions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RuleTables {
    /// Old dotted package → new dotted package. A trailing `.*` is accepted.
    pub renames: BTreeMap<String, String>,
    /// New dotted package → version or version range.
    pub versions: BTreeMap<String, String>,
    /// Old bundle symbolic name (or `*`) → bundle update.
    pub bundles: BTreeMap<String, BundleUpdate>,
    /// Binary class name → (old string constant → new string constant).
    pub per_class_constants: BTreeMap<String, BTreeMap<String, String>>,
    /// Whole string constant replacements.
    pub direct_strings: BTreeMap<String, String>,
    pub text_master: Vec<TextRule>,
}

pub(crate) fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

pub(crate) fn is_package_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|component| {
            !component.is_empty()
                && !component.starts_with(|c: char| c.is_ascii_digit())
                && component.chars().all(is_identifier_part)
        })
}

fn strip_wildcard(name: &str) -> &str {
    name.strip_suffix(".*").unwrap_or(name)
}

fn is_under(name: &str, package: &str) -> bool {
    name == package
        || name
            .strip_prefix(package)
            .is_some_and(|rest| rest.starts_with('.'))
}

impl RuleTables {
    /// Package renames with any `.*` suffix removed from the keys.
    pub fn normalized_renames(&self) -> BTreeMap<String, String> {
        self.renames
            .iter()
            .map(|(old, new)| (strip_wildcard(old).to_owned(), new.clone()))
            .collect()
    }

    pub fn validate(&self) -> RulesResult<()> {
        let renames = self.normalized_renames();
        for (old, new) in &renames {
            for name in [old, new] {
                if !is_package_name(name) {
                    return Err(RulesError::InvalidPackageName {
                        table: "rename",
                        name: name.clone(),
                    });
                }
            }
            if let Some(rule) = renames.keys().find(|key| is_under(new, key)) {
                return Err(RulesError::ChainedRename {
                    source_package: old.clone(),
                    target: new.clone(),
                    rule: rule.clone(),
                });
            }
        }

        for (package, range) in &self.versions {
            if !is_package_name(package) {
                return Err(RulesError::InvalidPackageName {
                    table: "version",
                    name: package.clone(),
                });
            }
            if VersionRange::parse(range).is_none() {
                return Err(RulesError::InvalidVersion {
                    package: package.clone(),
                    range: range.clone(),
                });
            }
        }

        for (name, update) in &self.bundles {
            let bad_version =
                !update.version.is_empty() && VersionRange::parse(&update.version).is_none();
            if name.is_empty() || update.symbolic_name.is_empty() || bad_version {
                return Err(RulesError::InvalidBundle(name.clone()));
            }
        }

        if self.per_class_constants.keys().any(String::is_empty) {
            return Err(RulesError::EmptyClassName);
        }

        for rule in &self.text_master {
            crate::SelectionPattern::parse(&rule.pattern)?;
        }

        Ok(())
    }

    /// Swaps the rename and direct string tables, for undoing a transformation.
    pub fn invert(&self) -> RulesResult<RuleTables> {
        Ok(RuleTables {
            renames: invert_table(&self.normalized_renames())?,
            direct_strings: invert_table(&self.direct_strings)?,
            ..self.clone()
        })
    }
}

fn invert_table(table: &BTreeMap<String, String>) -> RulesResult<BTreeMap<String, String>> {
    let mut inverted: BTreeMap<String, String> = BTreeMap::new();
    for (old, new) in table {
        if let Some(first) = inverted.insert(new.clone(), old.clone()) {
            return Err(RulesError::AmbiguousInverse {
                first,
                second: old.clone(),
                target: new.clone(),
            });
        }
    }
    Ok(inverted)
}

#[cfg(test)]
mod test {
    use super::*;

    fn renames(pairs: &[(&str, &str)]) -> RuleTables {
        RuleTables {
            renames: pairs
                .iter()
                .map(|(old, new)| (old.to_string(), new.to_string()))
                .collect(),
            ..RuleTables::default()
        }
    }

    #[test]
    fn test_validate_accepts_jakarta_rules() {
        let rules = renames(&[
            ("javax.ws.rs.*", "jakarta.ws.rs"),
            ("javax.inject", "jakarta.inject"),
        ]);
        rules.validate().unwrap();
        assert_eq!(
            Some("jakarta.ws.rs"),
            rules.normalized_renames().get("javax.ws.rs").map(String::as_str)
        );
    }

    #[test]
    fn test_validate_rejects_chained_rename() {
        let rules = renames(&[("com.foo", "com.foo.shaded")]);
        assert!(matches!(
            rules.validate(),
            Err(RulesError::ChainedRename { .. })
        ));
        let rules = renames(&[("a.b", "c.d"), ("c", "e")]);
        assert!(rules.validate().is_err());
        // a prefix that is not a whole component is not a chain
        renames(&[("a.b", "c.dx"), ("c.d", "e")]).validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        assert!(renames(&[("javax..ws", "jakarta.ws")]).validate().is_err());
        assert!(renames(&[("javax/ws", "jakarta.ws")]).validate().is_err());

        let mut rules = RuleTables::default();
        rules.versions.insert("jakarta.ws.rs".into(), "[3.0".into());
        assert!(matches!(
            rules.validate(),
            Err(RulesError::InvalidVersion { .. })
        ));
    }

    #[test]
    fn test_invert() {
        let rules = renames(&[("javax.inject.*", "jakarta.inject")]);
        let inverted = rules.invert().unwrap();
        assert_eq!(
            Some("javax.inject"),
            inverted.renames.get("jakarta.inject").map(String::as_str)
        );

        let ambiguous = renames(&[("a.b", "x.y"), ("c.d", "x.y")]);
        assert!(matches!(
            ambiguous.invert(),
            Err(RulesError::AmbiguousInverse { .. })
        ));
    }

    #[test]
    fn test_bundle_addendum() {
        let append = BundleUpdate {
            symbolic_name: "jakarta.bundle".into(),
            version: "5.0".into(),
            addendum: "+ (Jakarta)".into(),
        };
        assert_eq!(
            Some("Core (Jakarta)".to_owned()),
            append.update_description("Core")
        );
        let replace = BundleUpdate {
            addendum: "Jakarta core".into(),
            ..append
        };
        assert_eq!(Some("Jakarta core".to_owned()), replace.update_description("Core"));
    }

    #[test]
    fn test_deserialize() {
        let rules: RuleTables = serde_json::from_str(
            r#"{"renames": {"javax.inject": "jakarta.inject"},
                "per-class-constants": {"com/foo/Bar": {"javax": "jakarta"}}}"#,
        )
        .unwrap();
        assert_eq!(1, rules.renames.len());
        assert!(rules.per_class_constants.contains_key("com/foo/Bar"));
    }
}
