use crate::action::{has_extension, is_file, relocate_resource, Action, ActionType};
use crate::class_writer::{self, Utf8Edits};
use crate::{
    ClassFileError, ClassFileResult, ClassReader, Changes, SignatureRule, TransformError,
    TransformResult, Utf8Usage,
};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, trace};

/// Rewrites class names, descriptors, signatures and string constants in the
/// constant pool of a class file.
#[derive(Debug, Copy, Clone, Default)]
pub struct ClassAction;

impl Action for ClassAction {
    fn action_type(&self) -> ActionType {
        ActionType::Class
    }

    fn accept(&self, resource_name: &str, resource_path: Option<&Path>) -> bool {
        has_extension(resource_name, ".class") && is_file(resource_path)
    }

    fn basic_apply(
        &self,
        rule: &SignatureRule,
        input_name: &str,
        input: &[u8],
        changes: &mut Changes,
    ) -> TransformResult<Option<Vec<u8>>> {
        let class_file_error = |e: ClassFileError| TransformError::class_file(input_name, e);

        let reader = ClassReader::new(input).map_err(class_file_error)?;
        let access = reader.access().map_err(class_file_error)?;
        let name_index = reader.name_index().map_err(class_file_error)?;
        let class_name = reader.name().map_err(class_file_error)?;
        let class_name = class_name
            .as_str()
            .map_err(|e| class_file_error(e.into()))?
            .to_owned();
        trace!(class = %class_name, ?access, version = reader.major_version(), "Class");

        let references = reader.utf8_references().map_err(class_file_error)?;
        let pool = &reader.constant_pool;
        let mut edits = Utf8Edits::default();
        for (index, usage) in references.usages.iter().enumerate() {
            let Some(usage) = *usage else {
                continue;
            };
            let index = index as u16;
            // a string sharing its entry with a name gets an entry of its own below
            if usage == Utf8Usage::StringConstant && references.is_shared(index) {
                continue;
            }
            let value = pool.get_utf8(index).map_err(class_file_error)?;
            // lone surrogates cannot name a class and are left alone
            let Ok(value) = value.as_str() else {
                continue;
            };
            let updated = match usage {
                Utf8Usage::ClassName => rule.transform_binary_type(value),
                Utf8Usage::ReturnDescriptor => rule.transform_return_descriptor(value),
                Utf8Usage::Descriptor => rule.transform_descriptor(value),
                Utf8Usage::Signature(signature_type) => rule.transform(value, signature_type),
                Utf8Usage::PackageName => Ok(rule.replace_binary_package(value)),
                Utf8Usage::StringConstant => Ok(transform_string(rule, &class_name, value)),
            }
            .map_err(|e| TransformError::grammar(input_name, e))?;

            if let Some(updated) = updated.filter(|updated| updated != value) {
                debug!("[ {input_name} ] {usage:?} [ {value} ] -> [ {updated} ]");
                edits.updates.insert(index, updated);
            }
        }

        let mut separated: BTreeMap<u16, Option<u16>> = BTreeMap::new();
        for string in &references.strings {
            if !references.is_shared(string.index) {
                continue;
            }
            let new_index = match separated.get(&string.index) {
                Some(&new_index) => new_index,
                None => {
                    let new_index = separate_string(rule, &reader, &class_name, string.index, &mut edits)
                        .map_err(class_file_error)?;
                    separated.insert(string.index, new_index);
                    new_index
                }
            };
            if let Some(new_index) = new_index {
                edits.repoints.push((string.offset, new_index));
            }
        }

        if let Some(new_class_name) = edits.updates.get(&name_index) {
            if !access.keeps_resource_name() {
                let output_name = output_name(rule, input_name, &class_name, new_class_name);
                changes.set_output_resource_name(&output_name);
            }
        }

        if edits.is_empty() {
            return Ok(None);
        }
        changes.add_replacements(edits.updates.len() + edits.appended.len());
        class_writer::rewrite_utf8_entries(&reader, &edits)
            .map(Some)
            .map_err(class_file_error)
    }
}

/// Gives a string constant whose entry is shared with a name or another
/// usage its own entry when its rewrite differs from what the shared entry
/// ends up holding. Returns the new index, if any.
fn separate_string(
    rule: &SignatureRule,
    reader: &ClassReader<'_>,
    class_name: &str,
    index: u16,
    edits: &mut Utf8Edits,
) -> ClassFileResult<Option<u16>> {
    let value = reader.constant_pool.get_utf8(index)?;
    let Ok(value) = value.as_str() else {
        return Ok(None);
    };
    let Some(string) = transform_string(rule, class_name, value) else {
        // the string keeps its text even if the shared entry was rewritten
        if !edits.updates.contains_key(&index) {
            return Ok(None);
        }
        return edits.append(reader.constant_pool.count(), value.to_owned()).map(Some);
    };
    let shared = edits.updates.get(&index).map_or(value, String::as_str);
    if string == shared {
        return Ok(None);
    }
    trace!("[ {class_name} ] string [ {value} ] -> [ {string} ] in a new entry");
    edits.append(reader.constant_pool.count(), string).map(Some)
}

/// String constants in order of precedence: the per-class table, the direct
/// string table, the whole constant as one class name or descriptor, and
/// finally package names embedded in the text.
fn transform_string(rule: &SignatureRule, class_name: &str, value: &str) -> Option<String> {
    if let Some(replacement) = rule.constant_string(class_name, value) {
        return Some(replacement.to_owned());
    }
    if let Some(replacement) = rule.direct_string(value) {
        return Some(replacement.to_owned());
    }
    rule.transform_constant_as_binary_type(value, true)
        .or_else(|| rule.transform_constant_as_descriptor(value, true))
        .or_else(|| rule.replace_packages(value).map(|replacement| replacement.text))
}

fn output_name(rule: &SignatureRule, input_name: &str, old_class: &str, new_class: &str) -> String {
    match input_name
        .strip_suffix(".class")
        .and_then(|stem| stem.strip_suffix(old_class))
    {
        Some(prefix) => format!("{prefix}{new_class}.class"),
        None => relocate_resource(rule, input_name).unwrap_or_else(|| input_name.to_owned()),
    }
}
