use crate::action::{is_file, Action, ActionType};
use crate::{BundleUpdate, Changes, SignatureRule, TransformError, TransformResult};
use std::ops::Range;
use std::path::Path;
use tracing::debug;

const MANIFEST_NAME: &str = "META-INF/MANIFEST.MF";
/// Maximum line length in bytes, line ending excluded.
const LINE_LIMIT: usize = 72;

const PACKAGE_LIST_HEADERS: [&str; 4] = [
    "Import-Package",
    "Export-Package",
    "DynamicImport-Package",
    "Private-Package",
];

/// Rewrites bundle identity headers and package lists in a jar manifest.
/// Headers that do not change keep their exact bytes.
#[derive(Debug, Copy, Clone, Default)]
pub struct ManifestAction;

impl Action for ManifestAction {
    fn action_type(&self) -> ActionType {
        ActionType::Manifest
    }

    fn accept(&self, resource_name: &str, resource_path: Option<&Path>) -> bool {
        let Some(split) = resource_name.len().checked_sub(MANIFEST_NAME.len()) else {
            return false;
        };
        let (prefix, tail) = resource_name.as_bytes().split_at(split);
        tail.eq_ignore_ascii_case(MANIFEST_NAME.as_bytes())
            && (prefix.is_empty() || prefix.ends_with(b"/"))
            && is_file(resource_path)
    }

    fn basic_apply(
        &self,
        rule: &SignatureRule,
        input_name: &str,
        input: &[u8],
        changes: &mut Changes,
    ) -> TransformResult<Option<Vec<u8>>> {
        let text = std::str::from_utf8(input).map_err(|_| TransformError::Encoding {
            resource: input_name.to_owned(),
        })?;
        let line_ending = if text.contains("\r\n") { "\r\n" } else { "\n" };
        let lines = parse(text);

        let bundle = lines
            .iter()
            .take_while(|line| !line.is_section_break())
            .find_map(|line| match line {
                ManifestLine::Header(header) if header.name == "Bundle-SymbolicName" => {
                    let symbolic_name = split_outside_quotes(&header.value, ';')[0].trim();
                    rule.bundle_update(symbolic_name)
                        .map(|update| (symbolic_name.to_owned(), update))
                }
                _ => None,
            });

        let mut output = String::with_capacity(text.len());
        let mut replacements = 0;
        let mut main_section = true;
        for line in &lines {
            let header = match line {
                ManifestLine::Header(header) => header,
                ManifestLine::Blank(range) => {
                    main_section = false;
                    output.push_str(&text[range.clone()]);
                    continue;
                }
                ManifestLine::Other(range) => {
                    output.push_str(&text[range.clone()]);
                    continue;
                }
            };
            let updated = if main_section {
                main_header(rule, bundle.as_ref(), header)
            } else {
                entry_header(rule, header)
            };
            match updated {
                Some((value, count)) => {
                    debug!("[ {input_name} ] {}: [ {} ] -> [ {value} ]", header.name, header.value);
                    replacements += count;
                    let raw = &text[header.raw.clone()];
                    write_header(&mut output, header.name, &value, line_ending, raw.ends_with('\n'));
                }
                None => output.push_str(&text[header.raw.clone()]),
            }
        }

        if replacements == 0 {
            return Ok(None);
        }
        changes.add_replacements(replacements);
        Ok(Some(output.into_bytes()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Header<'a> {
    name: &'a str,
    /// Value with continuation lines joined.
    value: String,
    /// Bytes of all physical lines of the header, line endings included.
    raw: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ManifestLine<'a> {
    Header(Header<'a>),
    /// Ends a section.
    Blank(Range<usize>),
    Other(Range<usize>),
}

impl ManifestLine<'_> {
    fn is_section_break(&self) -> bool {
        matches!(self, ManifestLine::Blank(_))
    }
}

fn parse(text: &str) -> Vec<ManifestLine<'_>> {
    let mut lines = Vec::new();
    let mut position = 0;
    for line in text.split_inclusive('\n') {
        let start = position;
        position += line.len();
        let content = line
            .strip_suffix('\n')
            .map_or(line, |line| line.strip_suffix('\r').unwrap_or(line));

        if let Some(continuation) = content.strip_prefix(' ') {
            if let Some(ManifestLine::Header(header)) = lines.last_mut() {
                header.value.push_str(continuation);
                header.raw.end = position;
                continue;
            }
        }
        let header = content
            .split_once(':')
            .filter(|(name, _)| !name.is_empty() && !name.contains(' '));
        match header {
            Some((name, value)) => lines.push(ManifestLine::Header(Header {
                name,
                value: value.strip_prefix(' ').unwrap_or(value).to_owned(),
                raw: start..position,
            })),
            None if content.trim().is_empty() => lines.push(ManifestLine::Blank(start..position)),
            None => lines.push(ManifestLine::Other(start..position)),
        }
    }
    lines
}

fn main_header(
    rule: &SignatureRule,
    bundle: Option<&(String, &BundleUpdate)>,
    header: &Header<'_>,
) -> Option<(String, usize)> {
    if PACKAGE_LIST_HEADERS.contains(&header.name) {
        return replace_package_list(rule, &header.value);
    }
    let (symbolic_name, update) = bundle?;
    let value = &header.value;
    let updated = match header.name {
        "Bundle-SymbolicName" => {
            let new_name = update.symbolic_name.replace('*', symbolic_name);
            if new_name.is_empty() || new_name == *symbolic_name {
                return None;
            }
            let start = value.find(symbolic_name.as_str())?;
            format!("{}{new_name}{}", &value[..start], &value[start + symbolic_name.len()..])
        }
        "Bundle-Version" => {
            if update.version.is_empty() || value.trim() == update.version {
                return None;
            }
            update.version.clone()
        }
        "Bundle-Name" if update.addendum.starts_with('+') => update.update_description(value)?,
        "Bundle-Description" => update.update_description(value)?,
        _ => return None,
    };
    Some((updated, 1))
}

/// Per-entry sections name a path; a package directory moves with its package.
fn entry_header(rule: &SignatureRule, header: &Header<'_>) -> Option<(String, usize)> {
    if header.name != "Name" {
        return None;
    }
    let package = header.value.strip_suffix('/')?;
    let new_package = rule.replace_binary_package(package)?;
    Some((format!("{new_package}/"), 1))
}

/// Renames the packages of an OSGi clause list, updating the `version`
/// attribute of renamed clauses and the package names inside `uses:=`.
fn replace_package_list(rule: &SignatureRule, value: &str) -> Option<(String, usize)> {
    let mut replacements = 0;
    let clauses: Vec<String> = split_outside_quotes(value, ',')
        .into_iter()
        .map(|clause| {
            let mut parts: Vec<String> = Vec::new();
            let mut renamed_to: Option<String> = None;
            let mut attributes = Vec::new();
            for part in split_outside_quotes(clause, ';') {
                let trimmed = part.trim();
                if trimmed.contains('=') {
                    attributes.push(parts.len());
                    parts.push(part.to_owned());
                    continue;
                }
                let (package, wildcard) = match trimmed.strip_suffix(".*") {
                    Some(package) => (package, ".*"),
                    None => (trimmed, ""),
                };
                match rule.replace_package(package) {
                    Some(new_package) => {
                        replacements += 1;
                        parts.push(replace_trimmed(part, &format!("{new_package}{wildcard}")));
                        renamed_to.get_or_insert(new_package);
                    }
                    None => parts.push(part.to_owned()),
                }
            }

            for index in attributes {
                let part = &parts[index];
                let Some((key, attribute_value)) = part.split_once('=') else {
                    continue;
                };
                let updated = match (key.trim(), &renamed_to) {
                    ("version", Some(new_package)) => rule
                        .replace_package_version(new_package, attribute_value.trim())
                        .map(|version| (version, 1)),
                    ("uses:", _) => rule
                        .replace_packages(attribute_value)
                        .map(|replacement| (replacement.text, replacement.count)),
                    _ => None,
                };
                if let Some((new_value, count)) = updated {
                    replacements += count;
                    let new_value = if key.trim() == "uses:" {
                        new_value
                    } else {
                        replace_trimmed(attribute_value, &new_value)
                    };
                    parts[index] = format!("{key}={new_value}");
                }
            }
            parts.join(";")
        })
        .collect();

    (replacements > 0).then(|| (clauses.join(","), replacements))
}

/// Replaces `part` but keeps its leading and trailing whitespace.
fn replace_trimmed(part: &str, replacement: &str) -> String {
    let start = part.len() - part.trim_start().len();
    let end = part.trim_end().len().max(start);
    format!("{}{replacement}{}", &part[..start], &part[end..])
}

fn split_outside_quotes(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    for (index, c) in text.char_indices() {
        if c == '"' {
            quoted = !quoted;
        } else if c == separator && !quoted {
            parts.push(&text[start..index]);
            start = index + c.len_utf8();
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Writes `name: value`, continuing on lines that start with a space so no
/// line exceeds the limit. Lines are only broken on character boundaries.
fn write_header(output: &mut String, name: &str, value: &str, line_ending: &str, terminated: bool) {
    let header = format!("{name}: {value}");
    let mut rest = header.as_str();
    let mut limit = LINE_LIMIT;
    let mut first = true;
    while !rest.is_empty() {
        let mut split = rest.len().min(limit);
        while !rest.is_char_boundary(split) {
            split -= 1;
        }
        if !first {
            output.push_str(line_ending);
            output.push(' ');
        }
        output.push_str(&rest[..split]);
        rest = &rest[split..];
        first = false;
        limit = LINE_LIMIT - 1;
    }
    if terminated {
        output.push_str(line_ending);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{ChangesKind, EmbeddedMatching, RuleTables};

    fn rule() -> SignatureRule {
        let tables = RuleTables {
            renames: [
                ("javax.servlet".to_owned(), "jakarta.servlet".to_owned()),
                ("javax.inject".to_owned(), "jakarta.inject".to_owned()),
            ]
            .into(),
            versions: [
                ("jakarta.servlet".to_owned(), "[5.0,6)".to_owned()),
                ("jakarta.servlet.http".to_owned(), "[5.0,6)".to_owned()),
                ("jakarta.inject".to_owned(), "2.0.0".to_owned()),
            ]
            .into(),
            bundles: [(
                "com.acme.web".to_owned(),
                BundleUpdate {
                    symbolic_name: "com.acme.web.jakarta".to_owned(),
                    version: "2.0.0".to_owned(),
                    addendum: "+ (Jakarta)".to_owned(),
                },
            )]
            .into(),
            ..RuleTables::default()
        };
        SignatureRule::new(&tables, EmbeddedMatching::default()).unwrap()
    }

    fn apply(input: &str) -> (Option<String>, Changes) {
        let mut changes = Changes::new(ChangesKind::Replacements);
        changes.set_resource_names(MANIFEST_NAME, MANIFEST_NAME);
        let output = ManifestAction
            .basic_apply(&rule(), MANIFEST_NAME, input.as_bytes(), &mut changes)
            .unwrap()
            .map(|bytes| String::from_utf8(bytes).unwrap());
        (output, changes)
    }

    #[test]
    fn test_accept() {
        assert!(ManifestAction.accept("META-INF/MANIFEST.MF", None));
        assert!(ManifestAction.accept("WEB-INF/lib/x/META-INF/manifest.mf", None));
        assert!(!ManifestAction.accept("XMETA-INF/MANIFEST.MF", None));
        assert!(!ManifestAction.accept("MANIFEST.MF", None));
    }

    #[test]
    fn test_parse_continuations() {
        let text = "Manifest-Version: 1.0\r\nImport-Package: javax.servl\r\n et;version=\"[3,4)\"\r\n\r\nName: a/\r\n";
        let lines = parse(text);
        assert_eq!(4, lines.len());
        let ManifestLine::Header(header) = &lines[1] else {
            panic!("expected header");
        };
        assert_eq!("Import-Package", header.name);
        assert_eq!("javax.servlet;version=\"[3,4)\"", header.value);
        assert!(lines[2].is_section_break());
    }

    #[test]
    fn test_bundle_headers() {
        let input = "Manifest-Version: 1.0\n\
                     Bundle-SymbolicName: com.acme.web;singleton:=true\n\
                     Bundle-Version: 1.0.0\n\
                     Bundle-Name: Acme Web\n\
                     Created-By: hand\n";
        let (output, changes) = apply(input);
        assert_eq!(
            "Manifest-Version: 1.0\n\
             Bundle-SymbolicName: com.acme.web.jakarta;singleton:=true\n\
             Bundle-Version: 2.0.0\n\
             Bundle-Name: Acme Web (Jakarta)\n\
             Created-By: hand\n",
            output.unwrap()
        );
        assert_eq!(3, changes.replacements());
    }

    #[test]
    fn test_package_lists() {
        let input = "Manifest-Version: 1.0\r\n\
                     Import-Package: javax.servlet;version=\"[3.1,4)\",javax.servlet.http;ver\r\n \
                     sion=\"[3.1,4)\",org.slf4j;version=\"[1.7,2)\",javax.inject;version=1\r\n\
                     Export-Package: com.acme.web;uses:=\"javax.servlet,org.slf4j\";version=\"1.0.0\"\r\n\
                     \r\n\
                     Name: javax/servlet/\r\n\
                     Sealed: true\r\n";
        let (output, changes) = apply(input);
        let output = output.unwrap();
        let lines = parse(&output);
        let headers: Vec<(&str, &str)> = lines
            .iter()
            .filter_map(|line| match line {
                ManifestLine::Header(header) => Some((header.name, header.value.as_str())),
                ManifestLine::Blank(_) | ManifestLine::Other(_) => None,
            })
            .collect();
        assert_eq!(
            vec![
                ("Manifest-Version", "1.0"),
                (
                    "Import-Package",
                    "jakarta.servlet;version=\"[5.0,6)\",jakarta.servlet.http;version=\"[5.0,6)\",\
                     org.slf4j;version=\"[1.7,2)\",jakarta.inject;version=2.0.0"
                ),
                (
                    "Export-Package",
                    "com.acme.web;uses:=\"jakarta.servlet,org.slf4j\";version=\"1.0.0\""
                ),
                ("Name", "jakarta/servlet/"),
                ("Sealed", "true"),
            ],
            headers
        );
        assert!(output.split("\r\n").all(|line| line.len() <= LINE_LIMIT));
        assert!(output.ends_with("Sealed: true\r\n"));
        // 3 package renames, 3 versions, 1 uses directive, 1 entry name
        assert_eq!(8, changes.replacements());
    }

    #[test]
    fn test_version_lookup_is_per_package() {
        let input = "Import-Package: javax.servlet.annotation;version=\"[3.1,4)\"\n";
        let (output, changes) = apply(input);
        assert_eq!(
            "Import-Package: jakarta.servlet.annotation;version=\"[3.1,4)\"\n",
            output.unwrap()
        );
        assert_eq!(1, changes.replacements());
    }

    #[test]
    fn test_unchanged_manifest() {
        let (output, changes) = apply("Manifest-Version: 1.0\nImport-Package: org.slf4j\n");
        assert_eq!(None, output);
        assert!(!changes.has_changes());
    }

    #[test]
    fn test_wrap_on_char_boundaries() {
        let mut output = String::new();
        let value = "\u{e9}".repeat(60);
        write_header(&mut output, "Bundle-Description", &value, "\n", true);
        assert!(output.lines().all(|line| line.len() <= LINE_LIMIT));
        let joined: String = output
            .lines()
            .enumerate()
            .map(|(index, line)| if index == 0 { line } else { &line[1..] })
            .collect();
        assert_eq!(format!("Bundle-Description: {value}"), joined);
    }
}
