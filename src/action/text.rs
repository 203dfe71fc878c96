use crate::action::{has_extension, is_file, relocate_resource, Action, ActionType};
use crate::{Changes, SignatureRule, TransformError, TransformResult};
use std::borrow::Cow;
use std::path::Path;
use tracing::trace;

/// Line oriented text substitution: renamed packages anywhere in a line,
/// then the literal substitutions of any matching text rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextAction {
    action_type: ActionType,
    extensions: Vec<String>,
}

impl TextAction {
    pub fn java() -> TextAction {
        TextAction {
            action_type: ActionType::Java,
            extensions: vec![".java".to_owned()],
        }
    }

    pub fn tag() -> TextAction {
        TextAction {
            action_type: ActionType::Tag,
            extensions: vec![".tag".to_owned()],
        }
    }

    pub fn text<I>(extensions: I) -> TextAction
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        TextAction {
            action_type: ActionType::Text,
            extensions: extensions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Java sources and resource bundles live in their package directory and
    /// move with it.
    fn relocates(&self, resource_name: &str) -> bool {
        self.action_type == ActionType::Java || has_extension(resource_name, ".properties")
    }
}

impl Action for TextAction {
    fn action_type(&self) -> ActionType {
        self.action_type
    }

    fn accept(&self, resource_name: &str, resource_path: Option<&Path>) -> bool {
        self.extensions
            .iter()
            .any(|extension| has_extension(resource_name, extension))
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

        let mut output = String::with_capacity(text.len());
        let mut replacements = 0;
        for (line_number, line) in text.split_inclusive('\n').enumerate() {
            let mut line = Cow::Borrowed(line);
            if let Some(replacement) = rule.replace_packages(&line) {
                replacements += replacement.count;
                line = Cow::Owned(replacement.text);
            }
            if let Some(replacement) = rule.replace_text(input_name, &line) {
                replacements += replacement.count;
                line = Cow::Owned(replacement.text);
            }
            if let Cow::Owned(line) = &line {
                trace!("[ {input_name} ] line {}: {}", line_number + 1, line.trim_end());
            }
            output.push_str(&line);
        }

        if self.relocates(input_name) {
            if let Some(output_name) = relocate_resource(rule, input_name) {
                changes.set_output_resource_name(&output_name);
            }
        }

        if replacements == 0 {
            return Ok(None);
        }
        changes.add_replacements(replacements);
        Ok(Some(output.into_bytes()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{ChangesKind, EmbeddedMatching, RuleTables, TextRule};

    fn jakarta() -> SignatureRule {
        let tables = RuleTables {
            renames: [
                ("javax.ws.rs".to_owned(), "jakarta.ws.rs".to_owned()),
                ("javax.inject".to_owned(), "jakarta.inject".to_owned()),
            ]
            .into(),
            text_master: vec![TextRule {
                pattern: "*.xml".to_owned(),
                substitutions: [(
                    "http://xmlns.jcp.org/xml/ns/javaee".to_owned(),
                    "https://jakarta.ee/xml/ns/jakartaee".to_owned(),
                )]
                .into(),
            }],
            ..RuleTables::default()
        };
        SignatureRule::new(&tables, EmbeddedMatching::default()).unwrap()
    }

    fn apply(action: &TextAction, name: &str, input: &str) -> (Option<String>, Changes) {
        let mut changes = Changes::new(ChangesKind::Replacements);
        changes.set_resource_names(name, name);
        let output = action
            .basic_apply(&jakarta(), name, input.as_bytes(), &mut changes)
            .unwrap()
            .map(|bytes| String::from_utf8(bytes).unwrap());
        (output, changes)
    }

    #[test]
    fn test_java_imports() {
        let input = "package com.acme;\r\n\
                     \r\n\
                     import javax.ws.rs.GET;\r\n\
                     import javax.inject.Inject;\r\n\
                     import cdi.CDIBean;\r\n\
                     import javax.inject.InjectX;\r\n";
        let (output, changes) = apply(&TextAction::java(), "com/acme/Hello.java", input);
        assert_eq!(
            "package com.acme;\r\n\
             \r\n\
             import jakarta.ws.rs.GET;\r\n\
             import jakarta.inject.Inject;\r\n\
             import cdi.CDIBean;\r\n\
             import jakarta.inject.InjectX;\r\n",
            output.unwrap()
        );
        assert_eq!(3, changes.replacements());
        assert!(!changes.has_resource_name_change());
    }

    #[test]
    fn test_java_source_moves_with_package() {
        let input = "package javax.inject;\npublic @interface Named {}";
        let (output, changes) = apply(&TextAction::java(), "src/javax/inject/Named.java", input);
        assert_eq!(
            "package jakarta.inject;\npublic @interface Named {}",
            output.unwrap()
        );
        assert_eq!("src/jakarta/inject/Named.java", changes.output_resource_name());
    }

    #[test]
    fn test_text_rules_and_boundaries() {
        let input = "<web-app xmlns=\"http://xmlns.jcp.org/xml/ns/javaee\">\n\
                     <servlet-class>com.foobar.javax.inject.Thing</servlet-class>\n\
                     <filter>javax.ws.rs.core.Application</filter>\n";
        let (output, changes) = apply(&TextAction::text([".xml"]), "WEB-INF/web.xml", input);
        assert_eq!(
            "<web-app xmlns=\"https://jakarta.ee/xml/ns/jakartaee\">\n\
             <servlet-class>com.foobar.javax.inject.Thing</servlet-class>\n\
             <filter>jakarta.ws.rs.core.Application</filter>\n",
            output.unwrap()
        );
        assert_eq!(2, changes.replacements());
    }

    #[test]
    fn test_unchanged_text() {
        let (output, changes) = apply(&TextAction::tag(), "x.tag", "<%@ tag body-content=\"empty\" %>");
        assert_eq!(None, output);
        assert!(!changes.has_changes());
    }

    #[test]
    fn test_invalid_utf8() {
        let mut changes = Changes::new(ChangesKind::Replacements);
        let err = TextAction::text([".txt"])
            .basic_apply(&jakarta(), "a.txt", b"\xff\xfe", &mut changes)
            .unwrap_err();
        assert!(matches!(err, TransformError::Encoding { .. }));
        assert!(!err.is_fatal());
    }
}
