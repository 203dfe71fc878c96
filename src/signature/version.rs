use std::fmt::{Display, Formatter};

/// An OSGi-style version or version interval, `1.2.3`, `[1,2)`, `(1.0,2.0]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionRange {
    Single(String),
    Interval {
        left: char,
        floor: String,
        ceiling: String,
        right: char,
    },
}

fn is_version(text: &str) -> bool {
    text.starts_with(|c: char| c.is_ascii_digit())
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

impl VersionRange {
    /// Parses an unquoted version or interval, ignoring surrounding whitespace.
    pub fn parse(text: &str) -> Option<VersionRange> {
        let text = text.trim();
        let left = text.chars().next()?;
        if left != '[' && left != '(' {
            return is_version(text).then(|| VersionRange::Single(text.to_owned()));
        }
        let right = text.chars().last()?;
        if (right != ']' && right != ')') || text.len() < 2 {
            return None;
        }
        let (floor, ceiling) = text[1..text.len() - 1].split_once(',')?;
        let (floor, ceiling) = (floor.trim(), ceiling.trim());
        if !is_version(floor) || !is_version(ceiling) {
            return None;
        }
        Some(VersionRange::Interval {
            left,
            floor: floor.to_owned(),
            ceiling: ceiling.to_owned(),
            right,
        })
    }

    pub fn floor(&self) -> &str {
        match self {
            VersionRange::Single(version) => version,
            VersionRange::Interval { floor, .. } => floor,
        }
    }

    /// Replaces the numeric bounds of `original` with those of `replacement`,
    /// keeping the original's bound characters and quotes. Returns `None`
    /// when either side does not parse or nothing would change.
    pub fn substitute(original: &str, replacement: &VersionRange) -> Option<String> {
        let (quoted, inner) = match original
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
        {
            Some(inner) => (true, inner),
            None => (false, original),
        };
        let updated = match (VersionRange::parse(inner)?, replacement) {
            (VersionRange::Single(_), replacement) => {
                VersionRange::Single(replacement.floor().to_owned())
            }
            (
                VersionRange::Interval { left, right, .. },
                VersionRange::Interval { floor, ceiling, .. },
            ) => VersionRange::Interval {
                left,
                floor: floor.clone(),
                ceiling: ceiling.clone(),
                right,
            },
            (VersionRange::Interval { .. }, single) => single.clone(),
        };
        let updated = if quoted {
            format!("\"{updated}\"")
        } else {
            updated.to_string()
        };
        (updated != original).then_some(updated)
    }
}

impl Display for VersionRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionRange::Single(version) => f.write_str(version),
            VersionRange::Interval {
                left,
                floor,
                ceiling,
                right,
            } => write!(f, "{left}{floor},{ceiling}{right}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::VersionRange;

    #[test]
    fn test_parse() {
        assert_eq!(
            Some(VersionRange::Single("4.0.1".into())),
            VersionRange::parse(" 4.0.1 ")
        );
        assert!(matches!(
            VersionRange::parse("[4.0, 5)"),
            Some(VersionRange::Interval { left: '[', right: ')', .. })
        ));
        assert_eq!(None, VersionRange::parse("[4.0"));
        assert_eq!(None, VersionRange::parse("four"));
        assert_eq!(None, VersionRange::parse(""));
    }

    #[test]
    fn test_substitute_keeps_bound_characters() {
        let replacement = VersionRange::parse("[5.0,6.0]").unwrap();
        assert_eq!(
            Some("\"(5.0,6.0)\"".to_owned()),
            VersionRange::substitute("\"(4.0,5)\"", &replacement)
        );
        assert_eq!(
            Some("5.0".to_owned()),
            VersionRange::substitute("4.0", &replacement)
        );
    }

    #[test]
    fn test_substitute_single_replacement() {
        let replacement = VersionRange::parse("2.0").unwrap();
        assert_eq!(
            Some("2.0".to_owned()),
            VersionRange::substitute("[1,2)", &replacement)
        );
        assert_eq!(None, VersionRange::substitute("2.0", &replacement));
        assert_eq!(None, VersionRange::substitute("junk", &replacement));
    }
}
