//! Package, descriptor and signature rewriting driven by the rule tables.

mod grammar;
mod version;

pub use grammar::*;
pub use version::*;

use crate::rules::{is_identifier_part, BundleUpdate, RuleTables};
use crate::{GrammarResult, RulesResult, SelectionPattern};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How package names embedded in free text and string constants are found.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddedMatching {
    /// Only dotted names, `javax.inject.Inject`.
    Dotted,
    /// Dotted names and binary names, `javax/inject/Inject`.
    #[default]
    DottedAndBinary,
}

/// Text produced by a substitution, with the number of occurrences replaced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Replacement {
    pub text: String,
    pub count: usize,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Separator {
    Dot,
    Slash,
}

impl Separator {
    fn char(self) -> char {
        match self {
            Separator::Dot => '.',
            Separator::Slash => '/',
        }
    }
}

/// Immutable rewrite rules, shareable between actions and threads.
#[derive(Debug, Clone)]
pub struct SignatureRule {
    renames: HashMap<String, String>,
    /// Renames as `(old, new)` in `/` form, longest first.
    binary_scan: Vec<(String, String)>,
    /// Renames as `(old, new)` in `.` form, longest first.
    dotted_scan: Vec<(String, String)>,
    versions: HashMap<String, VersionRange>,
    bundles: HashMap<String, BundleUpdate>,
    per_class_constants: HashMap<String, HashMap<String, String>>,
    direct_strings: HashMap<String, String>,
    text_rules: Vec<(SelectionPattern, Vec<(String, String)>)>,
    embedded: EmbeddedMatching,
}

impl SignatureRule {
    pub fn new(tables: &RuleTables, embedded: EmbeddedMatching) -> RulesResult<SignatureRule> {
        tables.validate()?;

        let renames: HashMap<String, String> = tables.normalized_renames().into_iter().collect();
        let mut dotted_scan: Vec<(String, String)> = renames
            .iter()
            .map(|(old, new)| (old.clone(), new.clone()))
            .collect();
        dotted_scan.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let binary_scan = dotted_scan
            .iter()
            .map(|(old, new)| (old.replace('.', "/"), new.replace('.', "/")))
            .collect();

        let versions = tables
            .versions
            .iter()
            .filter_map(|(package, range)| {
                VersionRange::parse(range).map(|range| (package.clone(), range))
            })
            .collect();

        let text_rules = tables
            .text_master
            .iter()
            .map(|rule| -> RulesResult<(SelectionPattern, Vec<(String, String)>)> {
                let pattern = SelectionPattern::parse(&rule.pattern)?;
                let substitutions = rule
                    .substitutions
                    .iter()
                    .map(|(old, new)| (old.clone(), new.clone()))
                    .collect();
                Ok((pattern, substitutions))
            })
            .collect::<RulesResult<Vec<_>>>()?;

        Ok(SignatureRule {
            renames,
            binary_scan,
            dotted_scan,
            versions,
            bundles: tables.bundles.clone().into_iter().collect(),
            per_class_constants: tables
                .per_class_constants
                .iter()
                .map(|(class, constants)| {
                    (class.clone(), constants.clone().into_iter().collect())
                })
                .collect(),
            direct_strings: tables.direct_strings.clone().into_iter().collect(),
            text_rules,
            embedded,
        })
    }

    pub fn package_renames(&self) -> &HashMap<String, String> {
        &self.renames
    }

    pub fn package_versions(&self) -> &HashMap<String, VersionRange> {
        &self.versions
    }

    pub fn embedded_matching(&self) -> EmbeddedMatching {
        self.embedded
    }

    /// Renames a dotted package by its longest renamed ancestor, matching
    /// only whole components. `None` means the package is not renamed.
    pub fn replace_package(&self, name: &str) -> Option<String> {
        let mut candidate = name;
        loop {
            if let Some(new) = self.renames.get(candidate) {
                return Some(format!("{new}{}", &name[candidate.len()..]));
            }
            candidate = &candidate[..candidate.rfind('.')?];
        }
    }

    /// [`replace_package`](Self::replace_package) for `/`-separated packages.
    pub fn replace_binary_package(&self, name: &str) -> Option<String> {
        if name.contains('.') {
            return None;
        }
        self.replace_package(&name.replace('/', "."))
            .map(|new| new.replace('.', "/"))
    }

    fn rename_class(&self, binary_name: &str) -> Option<String> {
        let (package, simple_name) = binary_name.rsplit_once('/')?;
        let package = self.replace_binary_package(package)?;
        Some(format!("{package}/{simple_name}"))
    }

    /// Rewrites the package of an internal class name. Array class names
    /// (`[Lcom/foo/Bar;`) are rewritten as descriptors; primitive arrays and
    /// names in the default package are left alone.
    pub fn transform_binary_type(&self, name: &str) -> GrammarResult<Option<String>> {
        if name.starts_with('[') {
            return self.transform_descriptor(name);
        }
        Ok(self.rename_class(name))
    }

    /// Rewrites every class name in a field or method descriptor.
    pub fn transform_descriptor(&self, descriptor: &str) -> GrammarResult<Option<String>> {
        let mut parsed = Descriptor::parse(descriptor)?;
        let changed = parsed.remap(&mut |name: &str| self.rename_class(name));
        Ok(changed.then(|| parsed.to_string()))
    }

    /// A field descriptor or `V`, as held by a `class_info` annotation value
    /// such as `void.class`.
    pub fn transform_return_descriptor(&self, descriptor: &str) -> GrammarResult<Option<String>> {
        if descriptor == "V" {
            return Ok(None);
        }
        self.transform_descriptor(descriptor)
    }

    /// Rewrites every class type in a generic signature.
    pub fn transform(
        &self,
        signature: &str,
        signature_type: SignatureType,
    ) -> GrammarResult<Option<String>> {
        let mut parsed = Signature::parse(signature, signature_type)?;
        let changed = parsed.remap(&mut |name: &str| self.rename_class(name));
        Ok(changed.then(|| parsed.to_string()))
    }

    /// Treats a string constant as a class name. With `simple_substitution`
    /// the whole constant must be one name (internal, dotted, or an array
    /// or object descriptor); otherwise binary names embedded in the
    /// constant are replaced where they start and end on name boundaries.
    pub fn transform_constant_as_binary_type(
        &self,
        constant: &str,
        simple_substitution: bool,
    ) -> Option<String> {
        if !simple_substitution {
            return self
                .replace_embedded(constant, Separator::Slash)
                .map(|replacement| replacement.text);
        }
        if looks_like_descriptor(constant) {
            return self.transform_descriptor(constant).ok().flatten();
        }
        if constant.contains('/') {
            return self.rename_class(constant);
        }
        let (package, simple_name) = constant.rsplit_once('.')?;
        if !crate::rules::is_package_name(constant) {
            return None;
        }
        let package = self.replace_package(package)?;
        Some(format!("{package}.{simple_name}"))
    }

    /// Treats a string constant as a descriptor; see
    /// [`transform_constant_as_binary_type`](Self::transform_constant_as_binary_type).
    pub fn transform_constant_as_descriptor(
        &self,
        constant: &str,
        simple_substitution: bool,
    ) -> Option<String> {
        if simple_substitution {
            self.transform_descriptor(constant).ok().flatten()
        } else {
            self.replace_embedded(constant, Separator::Slash)
                .map(|replacement| replacement.text)
        }
    }

    /// Replaces renamed packages occurring anywhere in free text. A match
    /// must not be preceded by an identifier character or separator and must
    /// not be followed by an identifier character.
    pub fn replace_packages(&self, text: &str) -> Option<Replacement> {
        let dotted = self.replace_embedded(text, Separator::Dot);
        if self.embedded == EmbeddedMatching::Dotted {
            return dotted;
        }
        let (current, count) = match &dotted {
            Some(replacement) => (replacement.text.as_str(), replacement.count),
            None => (text, 0),
        };
        match self.replace_embedded(current, Separator::Slash) {
            Some(binary) => Some(Replacement {
                text: binary.text,
                count: count + binary.count,
            }),
            None => dotted,
        }
    }

    fn replace_embedded(&self, text: &str, separator: Separator) -> Option<Replacement> {
        let scan = match separator {
            Separator::Dot => &self.dotted_scan,
            Separator::Slash => &self.binary_scan,
        };
        if scan.is_empty() {
            return None;
        }

        let mut output = String::new();
        let mut copied = 0;
        let mut count = 0;
        let mut pos = 0;
        while pos < text.len() {
            let found = is_match_start(text, pos, separator)
                .then(|| {
                    scan.iter().find(|(old, _)| {
                        text[pos..].starts_with(old.as_str())
                            && is_match_end(text, pos + old.len())
                    })
                })
                .flatten();
            match found {
                Some((old, new)) => {
                    output.push_str(&text[copied..pos]);
                    output.push_str(new);
                    pos += old.len();
                    copied = pos;
                    count += 1;
                }
                None => {
                    pos += text[pos..].chars().next().map_or(1, char::len_utf8);
                }
            }
        }

        if count == 0 {
            return None;
        }
        output.push_str(&text[copied..]);
        Some(Replacement {
            text: output,
            count,
        })
    }

    /// Applies the text master substitutions whose pattern matches the
    /// resource name, or its simple file name.
    pub fn replace_text(&self, resource_name: &str, text: &str) -> Option<Replacement> {
        let simple_name = resource_name.rsplit('/').next().unwrap_or(resource_name);
        let mut current: Option<String> = None;
        let mut count = 0;
        for (pattern, substitutions) in &self.text_rules {
            if !pattern.matches(resource_name) && !pattern.matches(simple_name) {
                continue;
            }
            for (old, new) in substitutions {
                let input = current.as_deref().unwrap_or(text);
                let occurrences = input.matches(old.as_str()).count();
                if occurrences > 0 {
                    current = Some(input.replace(old.as_str(), new));
                    count += occurrences;
                }
            }
        }
        current.map(|text| Replacement { text, count })
    }

    pub fn direct_string(&self, initial: &str) -> Option<&str> {
        self.direct_strings.get(initial).map(String::as_str)
    }

    /// Per-class constant replacement, keyed by binary class name.
    pub fn constant_string(&self, class_name: &str, initial: &str) -> Option<&str> {
        self.per_class_constants
            .get(class_name)?
            .get(initial)
            .map(String::as_str)
    }

    /// The bundle rename for a symbolic name, falling back to the `*` rule.
    pub fn bundle_update(&self, symbolic_name: &str) -> Option<&BundleUpdate> {
        self.bundles
            .get(symbolic_name)
            .or_else(|| self.bundles.get("*"))
    }

    /// Updates a version attribute for a package that was renamed to
    /// `new_package`, keeping the original's interval bound characters.
    pub fn replace_package_version(&self, new_package: &str, version: &str) -> Option<String> {
        let replacement = self.versions.get(new_package)?;
        VersionRange::substitute(version, replacement)
    }
}

fn looks_like_descriptor(constant: &str) -> bool {
    constant.starts_with('[')
        || constant.starts_with('(')
        || (constant.starts_with('L') && constant.ends_with(';'))
}

fn is_match_start(text: &str, pos: usize, separator: Separator) -> bool {
    let mut before = text[..pos].chars().rev();
    let Some(prev) = before.next() else {
        return true;
    };
    if prev == separator.char() {
        return false;
    }
    if separator == Separator::Slash && prev == 'L' {
        // object type inside an embedded descriptor, `(Ljavax/...;`
        return before
            .next()
            .is_none_or(|c| !is_identifier_part(c) && c != '/');
    }
    !is_identifier_part(prev)
}

fn is_match_end(text: &str, end: usize) -> bool {
    text[end..]
        .chars()
        .next()
        .is_none_or(|c| !is_identifier_part(c))
}

#[cfg(test)]
mod test {
    use super::*;

    fn rule(pairs: &[(&str, &str)], embedded: EmbeddedMatching) -> SignatureRule {
        let tables = RuleTables {
            renames: pairs
                .iter()
                .map(|(old, new)| (old.to_string(), new.to_string()))
                .collect(),
            ..RuleTables::default()
        };
        SignatureRule::new(&tables, embedded).unwrap()
    }

    fn jakarta() -> SignatureRule {
        rule(
            &[
                ("javax.ws.rs", "jakarta.ws.rs"),
                ("javax.inject", "jakarta.inject"),
                ("com.old", "com.new"),
                ("com.foo", "com.bar"),
            ],
            EmbeddedMatching::default(),
        )
    }

    #[test]
    fn test_replace_package_longest_prefix() {
        let rule = rule(
            &[("a.b", "x.y"), ("a.b.c", "z")],
            EmbeddedMatching::default(),
        );
        assert_eq!(Some("z.d".to_owned()), rule.replace_package("a.b.c.d"));
        assert_eq!(Some("x.y.e".to_owned()), rule.replace_package("a.b.e"));
        assert_eq!(Some("x.y".to_owned()), rule.replace_package("a.b"));
        assert_eq!(None, rule.replace_package("a.bc"));
        assert_eq!(None, rule.replace_package("a"));
    }

    #[test]
    fn test_replace_binary_package() {
        let rule = jakarta();
        assert_eq!(
            Some("jakarta/ws/rs/core".to_owned()),
            rule.replace_binary_package("javax/ws/rs/core")
        );
        assert_eq!(None, rule.replace_binary_package("javax/ws/rsx"));
        assert_eq!(None, rule.replace_binary_package("javax.ws.rs"));
    }

    #[test]
    fn test_transform_binary_type() {
        let rule = jakarta();
        assert_eq!(
            Some("com/new/Foo$Inner".to_owned()),
            rule.transform_binary_type("com/old/Foo$Inner").unwrap()
        );
        assert_eq!(
            Some("[[Lcom/new/Foo;".to_owned()),
            rule.transform_binary_type("[[Lcom/old/Foo;").unwrap()
        );
        assert_eq!(None, rule.transform_binary_type("[I").unwrap());
        assert_eq!(None, rule.transform_binary_type("Foo").unwrap());
        assert!(rule.transform_binary_type("[Lcom/old/Foo").is_err());
    }

    #[test]
    fn test_transform_descriptor() {
        let rule = jakarta();
        assert_eq!(
            Some("(Ljava/util/List;)Lcom/new/Foo;".to_owned()),
            rule.transform_descriptor("(Ljava/util/List;)Lcom/old/Foo;")
                .unwrap()
        );
        assert_eq!(
            None,
            rule.transform_descriptor("(I[JLjava/lang/String;)V").unwrap()
        );
        let err = rule.transform_descriptor("(Lcom/old/Foo").unwrap_err();
        assert_eq!("(Lcom/old/Foo", err.text);
    }

    #[test]
    fn test_transform_return_descriptor() {
        let rule = jakarta();
        assert!(rule.transform_descriptor("V").is_err());
        assert_eq!(None, rule.transform_return_descriptor("V").unwrap());
        assert_eq!(
            Some("[Lcom/new/Foo;".to_owned()),
            rule.transform_return_descriptor("[Lcom/old/Foo;").unwrap()
        );
        assert!(rule.transform_return_descriptor("VV").is_err());
    }

    #[test]
    fn test_transform_signature() {
        let rule = jakarta();
        assert_eq!(
            Some("<T:Lcom/new/Base<-TT;>;>(Ljava/util/List<+Lcom/new/Foo;>;)V^Ljavax/naming/NamingException;".to_owned()),
            rule.transform(
                "<T:Lcom/old/Base<-TT;>;>(Ljava/util/List<+Lcom/old/Foo;>;)V^Ljavax/naming/NamingException;",
                SignatureType::Method
            )
            .unwrap()
        );
        assert_eq!(
            None,
            rule.transform("Ljava/util/Map<**>;", SignatureType::Field).ok().flatten()
        );
    }

    #[test]
    fn test_boundary_safety() {
        let rule = jakarta();
        assert_eq!(None, rule.replace_packages("import com.foobar.Thing;"));
        assert_eq!(None, rule.replace_package("com.foobar"));
        assert_eq!(None, rule.replace_packages("org.javax.inject.Named"));
        let replaced = rule.replace_packages("import com.foo.Thing;").unwrap();
        assert_eq!("import com.bar.Thing;", replaced.text);
        assert_eq!(1, replaced.count);
    }

    #[test]
    fn test_replace_packages_scenario() {
        let rule = rule(
            &[("javax.ws.rs", "jakarta.ws.rs"), ("javax.inject", "jakarta.inject")],
            EmbeddedMatching::default(),
        );
        let source = "import cdi.*;\nimport javax.inject.*;\nimport javax.ws.rs.*;\nimport javax.ws.rs.core.*;\n";
        let replaced = rule.replace_packages(source).unwrap();
        assert_eq!(
            "import cdi.*;\nimport jakarta.inject.*;\nimport jakarta.ws.rs.*;\nimport jakarta.ws.rs.core.*;\n",
            replaced.text
        );
        assert_eq!(3, replaced.count);
    }

    #[test]
    fn test_embedded_matching_modes() {
        let text = "<class>javax/inject/Named</class> javax.inject.Named";
        let both = rule(&[("javax.inject", "jakarta.inject")], EmbeddedMatching::DottedAndBinary);
        let replaced = both.replace_packages(text).unwrap();
        assert_eq!(
            "<class>jakarta/inject/Named</class> jakarta.inject.Named",
            replaced.text
        );
        assert_eq!(2, replaced.count);

        let dotted = rule(&[("javax.inject", "jakarta.inject")], EmbeddedMatching::Dotted);
        let replaced = dotted.replace_packages(text).unwrap();
        assert_eq!(
            "<class>javax/inject/Named</class> jakarta.inject.Named",
            replaced.text
        );
        assert_eq!(1, replaced.count);
    }

    #[test]
    fn test_transform_constants() {
        let rule = jakarta();
        assert_eq!(
            Some("com.new.Foo".to_owned()),
            rule.transform_constant_as_binary_type("com.old.Foo", true)
        );
        assert_eq!(
            Some("com/new/Foo".to_owned()),
            rule.transform_constant_as_binary_type("com/old/Foo", true)
        );
        assert_eq!(
            None,
            rule.transform_constant_as_binary_type("see com/old/Foo", true)
        );
        assert_eq!(
            Some("see com/new/Foo and (Lcom/new/Bar;)V".to_owned()),
            rule.transform_constant_as_binary_type("see com/old/Foo and (Lcom/old/Bar;)V", false)
        );
        assert_eq!(
            None,
            rule.transform_constant_as_binary_type("xcom/old/Foo", false)
        );
        assert_eq!(
            Some("Lcom/new/Foo;".to_owned()),
            rule.transform_constant_as_descriptor("Lcom/old/Foo;", true)
        );
        assert_eq!(None, rule.transform_constant_as_descriptor("not a descriptor", true));
    }

    #[test]
    fn test_inverse_round_trip() {
        let tables = RuleTables {
            renames: [("javax.inject".to_owned(), "jakarta.inject".to_owned())].into(),
            ..RuleTables::default()
        };
        let forward = SignatureRule::new(&tables, EmbeddedMatching::default()).unwrap();
        let backward =
            SignatureRule::new(&tables.invert().unwrap(), EmbeddedMatching::default()).unwrap();

        let text = "@javax.inject.Inject javax/inject/Named";
        let there = forward.replace_packages(text).unwrap().text;
        let back = backward.replace_packages(&there).unwrap().text;
        assert_eq!(text, back);
        assert_eq!(None, forward.replace_packages(&there));
    }

    #[test]
    fn test_text_master_and_versions() {
        let mut tables = RuleTables::default();
        tables.text_master.push(crate::rules::TextRule {
            pattern: "*.xml".into(),
            substitutions: [("http://xmlns.jcp.org/xml/ns/javaee".to_owned(), "https://jakarta.ee/xml/ns/jakartaee".to_owned())].into(),
        });
        tables.versions.insert("jakarta.inject".into(), "[2.0,3)".into());
        let rule = SignatureRule::new(&tables, EmbeddedMatching::default()).unwrap();

        let replaced = rule
            .replace_text("WEB-INF/web.xml", "<web-app xmlns=\"http://xmlns.jcp.org/xml/ns/javaee\">")
            .unwrap();
        assert_eq!(1, replaced.count);
        assert!(replaced.text.contains("https://jakarta.ee/xml/ns/jakartaee"));
        assert_eq!(None, rule.replace_text("readme.txt", "http://xmlns.jcp.org/xml/ns/javaee"));

        assert_eq!(
            Some("\"[2.0,3)\"".to_owned()),
            rule.replace_package_version("jakarta.inject", "\"[1,2)\"")
        );
        assert_eq!(None, rule.replace_package_version("jakarta.other", "[1,2)"));
    }
}
