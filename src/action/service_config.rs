use crate::action::{is_file, Action, ActionType};
use crate::{Changes, ChangesKind, SignatureRule, TransformError, TransformResult};
use std::path::Path;
use tracing::debug;

const SERVICES_DIRECTORY: &str = "META-INF/services/";

/// Renames the service interface file and the provider classes listed in a
/// `META-INF/services/` registration.
#[derive(Debug, Copy, Clone, Default)]
pub struct ServiceConfigAction;

impl Action for ServiceConfigAction {
    fn action_type(&self) -> ActionType {
        ActionType::ServiceLoaderConfig
    }

    fn accept(&self, resource_name: &str, resource_path: Option<&Path>) -> bool {
        resource_name
            .rsplit_once(SERVICES_DIRECTORY)
            .is_some_and(|(prefix, service)| {
                (prefix.is_empty() || prefix.ends_with('/'))
                    && !service.is_empty()
                    && !service.contains('/')
            })
            && is_file(resource_path)
    }

    fn changes_kind(&self) -> ChangesKind {
        ChangesKind::ServiceLoaderConfig
    }

    fn basic_apply(
        &self,
        rule: &SignatureRule,
        input_name: &str,
        input: &[u8],
        changes: &mut Changes,
    ) -> TransformResult<Option<Vec<u8>>> {
        if let Some((directory, service)) = input_name.rsplit_once('/') {
            if let Some(new_service) = rename_class(rule, service) {
                changes.set_output_resource_name(&format!("{directory}/{new_service}"));
            }
        }

        let text = std::str::from_utf8(input).map_err(|_| TransformError::Encoding {
            resource: input_name.to_owned(),
        })?;
        let mut output = String::with_capacity(text.len());
        let mut changed = false;
        for line in text.split_inclusive('\n') {
            let content = line.split('#').next().unwrap_or_default();
            let provider = content.trim();
            if provider.is_empty() {
                output.push_str(line);
                continue;
            }
            match rename_class(rule, provider) {
                Some(new_provider) => {
                    debug!("[ {input_name} ] provider [ {provider} ] -> [ {new_provider} ]");
                    let start = content.find(provider).unwrap_or_default();
                    output.push_str(&line[..start]);
                    output.push_str(&new_provider);
                    output.push_str(&line[start + provider.len()..]);
                    changes.add_changed_provider();
                    changed = true;
                }
                None => {
                    output.push_str(line);
                    changes.add_unchanged_provider();
                }
            }
        }

        Ok(changed.then(|| output.into_bytes()))
    }
}

/// Renames the package of a dotted class name.
fn rename_class(rule: &SignatureRule, class_name: &str) -> Option<String> {
    let (package, simple_name) = class_name.rsplit_once('.')?;
    let package = rule.replace_package(package)?;
    Some(format!("{package}.{simple_name}"))
}
