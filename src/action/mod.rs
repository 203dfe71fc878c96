//! Per-resource transformations, one variant per kind of resource.

mod class;
mod manifest;
mod service_config;
mod text;

pub use class::*;
pub use manifest::*;
pub use service_config::*;
pub use text::*;

use crate::{Changes, ChangesKind, SignatureRule, TransformResult};
use std::path::Path;
use strum::Display;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum ActionType {
    #[strum(to_string = "Class Action")]
    Class,
    #[strum(to_string = "Service Loader Configuration Action")]
    ServiceLoaderConfig,
    #[strum(to_string = "Manifest Action")]
    Manifest,
    #[strum(to_string = "Java Action")]
    Java,
    #[strum(to_string = "Tag Action")]
    Tag,
    #[strum(to_string = "Text Action")]
    Text,
}

pub trait Action {
    fn action_type(&self) -> ActionType;

    /// Whether this action handles the resource. Only looks at the name and,
    /// when given, the file type.
    fn accept(&self, resource_name: &str, resource_path: Option<&Path>) -> bool;

    fn changes_kind(&self) -> ChangesKind {
        ChangesKind::Replacements
    }

    /// Rewrites one resource, recording what changed. `Ok(None)` leaves the
    /// content as it was; the output name is taken from `changes` either way.
    fn basic_apply(
        &self,
        rule: &SignatureRule,
        input_name: &str,
        input: &[u8],
        changes: &mut Changes,
    ) -> TransformResult<Option<Vec<u8>>>;
}

#[derive(Debug, Clone)]
pub enum ActionImpl {
    Class(ClassAction),
    ServiceLoaderConfig(ServiceConfigAction),
    Manifest(ManifestAction),
    Text(TextAction),
}

impl Action for ActionImpl {
    fn action_type(&self) -> ActionType {
        match self {
            ActionImpl::Class(action) => action.action_type(),
            ActionImpl::ServiceLoaderConfig(action) => action.action_type(),
            ActionImpl::Manifest(action) => action.action_type(),
            ActionImpl::Text(action) => action.action_type(),
        }
    }

    fn accept(&self, resource_name: &str, resource_path: Option<&Path>) -> bool {
        match self {
            ActionImpl::Class(action) => action.accept(resource_name, resource_path),
            ActionImpl::ServiceLoaderConfig(action) => action.accept(resource_name, resource_path),
            ActionImpl::Manifest(action) => action.accept(resource_name, resource_path),
            ActionImpl::Text(action) => action.accept(resource_name, resource_path),
        }
    }

    fn changes_kind(&self) -> ChangesKind {
        match self {
            ActionImpl::Class(action) => action.changes_kind(),
            ActionImpl::ServiceLoaderConfig(action) => action.changes_kind(),
            ActionImpl::Manifest(action) => action.changes_kind(),
            ActionImpl::Text(action) => action.changes_kind(),
        }
    }

    fn basic_apply(
        &self,
        rule: &SignatureRule,
        input_name: &str,
        input: &[u8],
        changes: &mut Changes,
    ) -> TransformResult<Option<Vec<u8>>> {
        match self {
            ActionImpl::Class(action) => action.basic_apply(rule, input_name, input, changes),
            ActionImpl::ServiceLoaderConfig(action) => {
                action.basic_apply(rule, input_name, input, changes)
            }
            ActionImpl::Manifest(action) => action.basic_apply(rule, input_name, input, changes),
            ActionImpl::Text(action) => action.basic_apply(rule, input_name, input, changes),
        }
    }
}

/// Actions in polling order; the first that accepts a resource handles it.
#[derive(Debug, Clone)]
pub struct ActionRegistry {
    actions: Vec<ActionImpl>,
}

impl ActionRegistry {
    pub fn new<I>(text_extensions: I) -> ActionRegistry
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        ActionRegistry {
            actions: vec![
                ActionImpl::Class(ClassAction),
                ActionImpl::ServiceLoaderConfig(ServiceConfigAction),
                ActionImpl::Manifest(ManifestAction),
                ActionImpl::Text(TextAction::java()),
                ActionImpl::Text(TextAction::tag()),
                ActionImpl::Text(TextAction::text(text_extensions)),
            ],
        }
    }

    pub fn actions(&self) -> &[ActionImpl] {
        &self.actions
    }

    pub fn select(&self, resource_name: &str, resource_path: Option<&Path>) -> Option<&ActionImpl> {
        self.actions
            .iter()
            .find(|action| action.accept(resource_name, resource_path))
    }
}

pub(crate) fn has_extension(resource_name: &str, extension: &str) -> bool {
    let name = resource_name.as_bytes();
    let extension = extension.as_bytes();
    name.len() > extension.len()
        && name[name.len() - extension.len()..].eq_ignore_ascii_case(extension)
}

pub(crate) fn is_file(resource_path: Option<&Path>) -> bool {
    resource_path.is_none_or(|path| !path.is_dir())
}

/// Moves a resource whose directory is a renamed package, `javax/servlet/x.properties`
/// to `jakarta/servlet/x.properties`. A `WEB-INF/classes/` or similar prefix
/// before the package directories is kept.
pub(crate) fn relocate_resource(rule: &SignatureRule, resource_name: &str) -> Option<String> {
    let (directory, file_name) = resource_name.rsplit_once('/')?;
    // try every suffix of the directory that starts on a segment boundary,
    // longest first
    let mut start = 0;
    loop {
        let package = &directory[start..];
        if let Some(new_package) = rule.replace_binary_package(package) {
            return Some(format!("{}{new_package}/{file_name}", &directory[..start]));
        }
        start += package.find('/')? + 1;
    }
}
