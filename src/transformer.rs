//! Drives actions over resources: selection, action lookup, change
//! recording and output, for single buffers, streams, files and directory
//! trees.

use crate::action::{Action, ActionImpl, ActionRegistry};
use crate::{
    io, ChangeRecorder, Changes, ChangesKind, InputBuffers, ReturnCode, RuleTables,
    SelectionRule, SignatureRule, TransformError, TransformOptions, TransformResult, Verbosity,
};
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, error, info};
use walkdir::WalkDir;

/// A transformed resource. `data` borrows the input when nothing changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput<'a> {
    pub name: String,
    pub data: Cow<'a, [u8]>,
}

impl TransformOutput<'_> {
    pub fn is_identity(&self) -> bool {
        matches!(self.data, Cow::Borrowed(_))
    }
}

/// Receives transformed resources, typically an archive writer.
pub trait ResourceSink {
    fn accept(&mut self, resource_name: &str, data: &[u8]) -> TransformResult<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySink {
    pub resources: Vec<(String, Vec<u8>)>,
}

impl MemorySink {
    pub fn get(&self, resource_name: &str) -> Option<&[u8]> {
        self.resources
            .iter()
            .find(|(name, _)| name == resource_name)
            .map(|(_, data)| data.as_slice())
    }
}

impl ResourceSink for MemorySink {
    fn accept(&mut self, resource_name: &str, data: &[u8]) -> TransformResult<()> {
        self.resources.push((resource_name.to_owned(), data.to_vec()));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFailure {
    pub resource: String,
    pub message: String,
}

/// Run totals. Failures listed here were logged and their resources
/// passed through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformSummary {
    pub selected: usize,
    pub unselected: usize,
    pub unsupported: usize,
    pub changed: usize,
    pub renamed: usize,
    pub unchanged: usize,
    pub failures: Vec<ResourceFailure>,
}

impl TransformSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn log(&self) {
        info!(
            "Resources [ {} ] selected [ {} ] unselected [ {} ] unsupported",
            self.selected, self.unselected, self.unsupported
        );
        info!(
            "Resources [ {} ] changed [ {} ] renamed [ {} ] unchanged [ {} ] failed",
            self.changed,
            self.renamed,
            self.unchanged,
            self.failed()
        );
        for failure in &self.failures {
            info!("Failed [ {} ]: {}", failure.resource, failure.message);
        }
    }
}

pub struct Transformer {
    rule: Arc<SignatureRule>,
    selection: SelectionRule,
    registry: ActionRegistry,
    verbosity: Verbosity,
    overwrite: bool,
    recorder: ChangeRecorder,
    buffers: InputBuffers,
    summary: TransformSummary,
}

impl Transformer {
    pub fn new(tables: &RuleTables, options: &TransformOptions) -> TransformResult<Transformer> {
        let tables = if options.invert {
            Cow::Owned(tables.invert()?)
        } else {
            Cow::Borrowed(tables)
        };
        let rule = SignatureRule::new(&tables, options.embedded_matching)?;
        let selection = SelectionRule::new(&options.includes, &options.excludes)?;
        Ok(Transformer::with_rule(Arc::new(rule), selection, options))
    }

    /// Shares an already built rule, for several transformers running on
    /// separate threads.
    pub fn with_rule(
        rule: Arc<SignatureRule>,
        selection: SelectionRule,
        options: &TransformOptions,
    ) -> Transformer {
        Transformer {
            rule,
            selection,
            registry: ActionRegistry::new(options.text_extensions.iter().cloned()),
            verbosity: Verbosity::from_flags(options.terse, options.verbose),
            overwrite: options.overwrite,
            recorder: ChangeRecorder::new(),
            buffers: InputBuffers::default(),
            summary: TransformSummary::default(),
        }
    }

    pub fn rule(&self) -> &Arc<SignatureRule> {
        &self.rule
    }

    pub fn summary(&self) -> &TransformSummary {
        &self.summary
    }

    /// Changes of the most recently completed resource or container.
    pub fn last_changes(&self) -> Option<&Changes> {
        self.recorder.last_changes()
    }

    pub fn select_action(&self, resource_name: &str, resource_path: Option<&Path>) -> Option<&ActionImpl> {
        self.registry.select(resource_name, resource_path)
    }

    pub fn transform_bytes<'a>(
        &mut self,
        resource_name: &str,
        input: &'a [u8],
    ) -> TransformResult<TransformOutput<'a>> {
        self.transform_at(resource_name, None, input)
    }

    fn transform_at<'a>(
        &mut self,
        resource_name: &str,
        resource_path: Option<&Path>,
        input: &'a [u8],
    ) -> TransformResult<TransformOutput<'a>> {
        let identity = || TransformOutput {
            name: resource_name.to_owned(),
            data: Cow::Borrowed(input),
        };

        if !self.selection.select(resource_name) {
            self.summary.unselected += 1;
            return Ok(identity());
        }
        let Some(action) = self.registry.select(resource_name, resource_path) else {
            debug!("No action selected for [ {resource_name} ]");
            self.summary.unsupported += 1;
            return Ok(identity());
        };
        self.summary.selected += 1;
        let action_type = action.action_type();

        let changes = self
            .recorder
            .start_recording(resource_name, action.changes_kind());
        let data = match action.basic_apply(&self.rule, resource_name, input, changes) {
            Ok(Some(data)) => Cow::Owned(data),
            Ok(None) => Cow::Borrowed(input),
            Err(err) if err.is_fatal() => {
                self.recorder.stop_recording();
                return Err(err);
            }
            Err(err) => {
                error!("Transform failure [ {resource_name} ]: {err}");
                changes.clear_changes();
                changes.set_resource_names(resource_name, resource_name);
                self.summary.failures.push(ResourceFailure {
                    resource: resource_name.to_owned(),
                    message: err.to_string(),
                });
                Cow::Borrowed(input)
            }
        };

        let Some(changes) = self.recorder.stop_recording() else {
            return Ok(TransformOutput {
                name: resource_name.to_owned(),
                data,
            });
        };
        let name = changes.output_resource_name().to_owned();
        let has_changes = changes.has_changes();
        if changes.has_resource_name_change() {
            self.summary.renamed += 1;
        }
        if self.verbosity.show_progress() {
            info!("[ {action_type} ] [ {resource_name} ]: {}", changes.change_text());
        }
        if self.verbosity.show_details() {
            changes.log_verbose(resource_name, &name);
        }
        if has_changes {
            self.summary.changed += 1;
            self.mark_parent_changed();
        } else {
            self.summary.unchanged += 1;
        }

        Ok(TransformOutput { name, data })
    }

    fn mark_parent_changed(&mut self) {
        if let Some(parent) = self.recorder.active_changes_mut() {
            parent.add_replacement();
        }
    }

    /// Transforms one resource into `sink`, under its possibly new name.
    pub fn transform_resource(
        &mut self,
        resource_name: &str,
        input: &[u8],
        sink: &mut dyn ResourceSink,
    ) -> TransformResult<()> {
        let output = self.transform_bytes(resource_name, input)?;
        sink.accept(&output.name, &output.data)
    }

    /// Reads the whole stream, transforms it and writes the result. Returns
    /// the output resource name.
    pub fn transform_stream(
        &mut self,
        resource_name: &str,
        reader: &mut dyn Read,
        count: Option<usize>,
        writer: &mut dyn Write,
    ) -> TransformResult<String> {
        self.transform_read(resource_name, None, reader, count, writer)
    }

    fn transform_read(
        &mut self,
        resource_name: &str,
        resource_path: Option<&Path>,
        reader: &mut dyn Read,
        count: Option<usize>,
        writer: &mut dyn Write,
    ) -> TransformResult<String> {
        let depth = self.recorder.depth();
        let data = io::read(resource_name, reader, self.buffers.take(depth), count)?;
        let result = self
            .transform_at(resource_name, resource_path, data.as_slice())
            .and_then(|output| {
                io::write(&output.name, &output.data, writer)?;
                Ok(output.name)
            });
        self.buffers.restore(depth, data.into_buffer());
        result
    }

    /// Runs `body` as the contents of a container such as a nested archive.
    /// The container's changes become [`last_changes`](Self::last_changes)
    /// and count as one replacement in any enclosing container.
    pub fn transform_nested<R>(
        &mut self,
        container_name: &str,
        body: impl FnOnce(&mut Transformer) -> TransformResult<R>,
    ) -> TransformResult<R> {
        self.recorder
            .start_recording(container_name, ChangesKind::Replacements);
        let result = body(self);
        let has_changes = match self.recorder.stop_recording() {
            Some(changes) => {
                if self.verbosity.show_progress() {
                    info!("[ {container_name} ]: {}", changes.change_text());
                }
                changes.has_changes()
            }
            None => false,
        };
        if has_changes {
            self.mark_parent_changed();
        }
        result
    }

    /// File to file. When input and output are the same file the result is
    /// written next to it and then moved over it.
    pub fn transform_file(
        &mut self,
        resource_name: &str,
        input: &Path,
        output: &Path,
    ) -> TransformResult<String> {
        debug!("Input [ {resource_name} ] [ {} ] Output [ {} ]", input.display(), output.display());
        if !self.overwrite && output.exists() && !is_same_file(input, output) {
            return Err(TransformError::OutputExists(output.to_path_buf()));
        }

        let mut input_file = File::open(input).map_err(|e| {
            TransformError::io(format!("Failed to open input [ {} ]", input.display()), e)
        })?;
        let count = input_file
            .metadata()
            .ok()
            .and_then(|metadata| usize::try_from(metadata.len()).ok());

        let mut temp = temp_file_for(output)?;
        let output_name = self.transform_read(
            resource_name,
            Some(input),
            &mut input_file,
            count,
            temp.as_file_mut(),
        )?;
        drop(input_file);
        persist(temp, output)?;
        Ok(output_name)
    }

    /// Transforms every file below `input` into the same relative location
    /// below `output`, or its renamed location. Resource names are relative
    /// paths with `/` separators. `output` may be `input`.
    pub fn transform_directory(&mut self, input: &Path, output: &Path) -> TransformResult<()> {
        let in_place = is_same_file(input, output);
        let entries = WalkDir::new(input)
            .sort_by_file_name()
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                TransformError::io(format!("Failed to walk [ {} ]", input.display()), e.into())
            })?;

        for entry in entries.iter().filter(|entry| entry.file_type().is_file()) {
            let path = entry.path();
            let relative = path.strip_prefix(input).unwrap_or(path);
            let resource_name = resource_name(relative);

            let mut file = File::open(path).map_err(|e| {
                TransformError::io(format!("Failed to open input [ {} ]", path.display()), e)
            })?;
            let count = entry
                .metadata()
                .ok()
                .and_then(|metadata| usize::try_from(metadata.len()).ok());

            let depth = self.recorder.depth();
            let data = io::read(&resource_name, &mut file, self.buffers.take(depth), count)?;
            drop(file);
            let result = self
                .transform_at(&resource_name, Some(path), data.as_slice())
                .and_then(|transformed| {
                    let target = output.join(&transformed.name);
                    let moved = transformed.name != resource_name;
                    if in_place && !moved && transformed.is_identity() {
                        return Ok(());
                    }
                    if !in_place && !self.overwrite && target.exists() {
                        return Err(TransformError::OutputExists(target));
                    }
                    write_file(&target, &transformed.data)?;
                    if in_place && moved {
                        fs::remove_file(path).map_err(|e| {
                            TransformError::io(format!("Failed to remove [ {} ]", path.display()), e)
                        })?;
                    }
                    Ok(())
                });
            self.buffers.restore(depth, data.into_buffer());
            result?;
        }
        Ok(())
    }

    /// Transforms a file or directory tree, logging the summary and
    /// classifying the outcome.
    pub fn run(&mut self, input: &Path, output: &Path) -> ReturnCode {
        let result = if input.is_dir() {
            self.transform_directory(input, output)
        } else {
            let resource_name = input
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            if self.registry.select(&resource_name, Some(input)).is_none() {
                Err(TransformError::UnsupportedResource {
                    resource: resource_name,
                })
            } else {
                self.transform_file(&resource_name, input, output).map(drop)
            }
        };

        if self.verbosity.show_progress() {
            self.summary.log();
        }
        match result {
            Ok(()) => ReturnCode::Success,
            Err(err) => {
                error!("{err}");
                err.return_code()
            }
        }
    }
}

impl std::fmt::Debug for Transformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformer")
            .field("verbosity", &self.verbosity)
            .field("overwrite", &self.overwrite)
            .field("depth", &self.recorder.depth())
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

/// Builds a transformer from rule tables and options and runs it.
pub fn run(tables: &RuleTables, options: &TransformOptions, input: &Path, output: &Path) -> ReturnCode {
    match Transformer::new(tables, options) {
        Ok(mut transformer) => transformer.run(input, output),
        Err(err) => {
            error!("{err}");
            err.return_code()
        }
    }
}

fn resource_name(relative: &Path) -> String {
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn temp_file_for(target: &Path) -> TransformResult<NamedTempFile> {
    let directory = target
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(directory).map_err(|e| {
        TransformError::io(format!("Failed to create [ {} ]", directory.display()), e)
    })?;
    NamedTempFile::new_in(directory).map_err(|e| {
        TransformError::io(
            format!("Failed to create temporary file in [ {} ]", directory.display()),
            e,
        )
    })
}

fn persist(temp: NamedTempFile, target: &Path) -> TransformResult<()> {
    temp.persist(target).map(drop).map_err(|e| {
        TransformError::io(format!("Failed to replace [ {} ]", target.display()), e.error)
    })
}

/// Writes through a temporary file in the target directory, so the target is
/// never left truncated.
fn write_file(target: &Path, data: &[u8]) -> TransformResult<()> {
    let mut temp = temp_file_for(target)?;
    io::write(&target.display().to_string(), data, temp.as_file_mut())?;
    persist(temp, target)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{EmbeddedMatching, TextRule};
    use std::io::Cursor;
    use test_helpers::ClassFileBuilder;

    fn tables() -> RuleTables {
        RuleTables {
            renames: [
                ("javax.ws.rs".to_owned(), "jakarta.ws.rs".to_owned()),
                ("javax.inject".to_owned(), "jakarta.inject".to_owned()),
            ]
            .into(),
            ..RuleTables::default()
        }
    }

    fn transformer(options: TransformOptions) -> Transformer {
        Transformer::new(&tables(), &options).unwrap()
    }

    const RESOURCE: &str = "import javax.ws.rs.GET;\nimport javax.inject.Inject;\nimport cdi.CDIBean;\n";
    const TRANSFORMED: &str = "import jakarta.ws.rs.GET;\nimport jakarta.inject.Inject;\nimport cdi.CDIBean;\n";

    #[test]
    fn test_transform_bytes() {
        let mut transformer = transformer(TransformOptions::default());
        let output = transformer
            .transform_bytes("Hello.java", RESOURCE.as_bytes())
            .unwrap();
        assert_eq!(TRANSFORMED.as_bytes(), &*output.data);
        assert_eq!("Hello.java", output.name);
        let changes = transformer.last_changes().unwrap();
        assert_eq!(2, changes.replacements());

        let again = transformer
            .transform_bytes("Hello.java", TRANSFORMED.as_bytes())
            .unwrap();
        assert!(again.is_identity());
        assert!(!transformer.last_changes().unwrap().has_changes());
        assert_eq!(1, transformer.summary().changed);
        assert_eq!(1, transformer.summary().unchanged);
    }

    #[test]
    fn test_inverse_restores_original() {
        let mut forward = transformer(TransformOptions::default());
        let transformed = forward
            .transform_bytes("a.properties", RESOURCE.as_bytes())
            .unwrap()
            .data
            .into_owned();
        let mut inverse = transformer(TransformOptions {
            invert: true,
            ..TransformOptions::default()
        });
        let restored = inverse
            .transform_bytes("a.properties", &transformed)
            .unwrap();
        assert_eq!(RESOURCE.as_bytes(), &*restored.data);
    }

    #[test]
    fn test_selection_and_unsupported() {
        let mut transformer = transformer(TransformOptions {
            excludes: vec!["*.properties".to_owned()],
            ..TransformOptions::default()
        });
        let skipped = transformer
            .transform_bytes("a.properties", RESOURCE.as_bytes())
            .unwrap();
        assert!(skipped.is_identity());
        let unknown = transformer
            .transform_bytes("logo.png", RESOURCE.as_bytes())
            .unwrap();
        assert!(unknown.is_identity());
        assert_eq!(1, transformer.summary().unselected);
        assert_eq!(1, transformer.summary().unsupported);
        assert_eq!(0, transformer.summary().selected);
    }

    #[test]
    fn test_failure_passes_through() {
        let mut transformer = transformer(TransformOptions::default());
        let input = b"\xca\xfe\xba\xbe truncated";
        let output = transformer.transform_bytes("a/B.class", input).unwrap();
        assert!(output.is_identity());
        assert_eq!(1, transformer.summary().failed());
        assert_eq!("a/B.class", transformer.summary().failures[0].resource);
        assert!(!transformer.last_changes().unwrap().has_changes());
    }

    #[test]
    fn test_renamed_class_into_sink() {
        let mut transformer = transformer(TransformOptions::default());
        let class = ClassFileBuilder::new("javax/inject/Named", Some("java/lang/Object")).build();
        let mut sink = MemorySink::default();
        transformer
            .transform_resource("javax/inject/Named.class", &class, &mut sink)
            .unwrap();
        assert_eq!("jakarta/inject/Named.class", sink.resources[0].0);
        assert!(sink.get("javax/inject/Named.class").is_none());
        assert_eq!(1, transformer.summary().renamed);
    }

    #[test]
    fn test_stream_reuses_buffers() {
        let mut transformer = transformer(TransformOptions::default());
        for _ in 0..2 {
            let mut output = Vec::new();
            let name = transformer
                .transform_stream(
                    "a.txt",
                    &mut Cursor::new(RESOURCE),
                    Some(RESOURCE.len()),
                    &mut output,
                )
                .unwrap();
            assert_eq!("a.txt", name);
            assert_eq!(TRANSFORMED.as_bytes(), output.as_slice());
        }
    }

    #[test]
    fn test_nested_changes_reach_container() {
        let mut transformer = transformer(TransformOptions::default());
        let mut sink = MemorySink::default();
        transformer
            .transform_nested("outer.war", |transformer| {
                transformer.transform_nested("WEB-INF/lib/inner.jar", |transformer| {
                    transformer.transform_resource("a.txt", RESOURCE.as_bytes(), &mut sink)?;
                    transformer.transform_resource("b.txt", b"nothing here", &mut sink)
                })
            })
            .unwrap();
        let outer = transformer.last_changes().unwrap();
        assert_eq!("outer.war", outer.input_resource_name());
        assert_eq!(1, outer.replacements());
        assert_eq!(2, sink.resources.len());
    }

    #[test]
    fn test_same_path_file_update() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foo.txt");
        fs::write(&path, RESOURCE).unwrap();

        let mut transformer = transformer(TransformOptions::default());
        transformer.transform_file("foo.txt", &path, &path).unwrap();

        assert_eq!(TRANSFORMED, fs::read_to_string(&path).unwrap());
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(vec![std::ffi::OsString::from("foo.txt")], names);
    }

    #[test]
    fn test_existing_output_needs_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        fs::write(&input, RESOURCE).unwrap();
        fs::write(&output, "old").unwrap();

        let mut transformer = transformer(TransformOptions::default());
        let err = transformer
            .transform_file("in.txt", &input, &output)
            .unwrap_err();
        assert!(matches!(err, TransformError::OutputExists(_)));

        let mut transformer = transformer_with_overwrite();
        transformer.transform_file("in.txt", &input, &output).unwrap();
        assert_eq!(TRANSFORMED, fs::read_to_string(&output).unwrap());
    }

    fn transformer_with_overwrite() -> Transformer {
        transformer(TransformOptions {
            overwrite: true,
            ..TransformOptions::default()
        })
    }

    #[test]
    fn test_directory_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let package = dir.path().join("javax/inject");
        fs::create_dir_all(&package).unwrap();
        fs::write(package.join("Messages.properties"), "key=javax.inject.Named\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "nothing to see\n").unwrap();
        fs::write(dir.path().join("logo.png"), [0x89, b'P', b'N', b'G']).unwrap();

        let mut transformer = transformer(TransformOptions::default());
        assert_eq!(ReturnCode::Success, transformer.run(dir.path(), dir.path()));

        let moved = dir.path().join("jakarta/inject/Messages.properties");
        assert_eq!("key=jakarta.inject.Named\n", fs::read_to_string(moved).unwrap());
        assert!(!package.join("Messages.properties").exists());
        assert_eq!("nothing to see\n", fs::read_to_string(dir.path().join("notes.txt")).unwrap());
        assert_eq!(1, transformer.summary().renamed);
        assert_eq!(1, transformer.summary().unsupported);
    }

    #[test]
    fn test_directory_to_new_tree() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::create_dir_all(input.path().join("WEB-INF")).unwrap();
        fs::write(
            input.path().join("WEB-INF/web.xml"),
            "<servlet-class>javax.ws.rs.core.Application</servlet-class>\n",
        )
        .unwrap();

        let mut transformer = transformer(TransformOptions::default());
        transformer
            .transform_directory(input.path(), output.path())
            .unwrap();
        assert_eq!(
            "<servlet-class>jakarta.ws.rs.core.Application</servlet-class>\n",
            fs::read_to_string(output.path().join("WEB-INF/web.xml")).unwrap()
        );
    }

    #[test]
    fn test_run_return_codes() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("logo.png");
        fs::write(&png, b"png").unwrap();
        let options = TransformOptions::default();
        assert_eq!(
            ReturnCode::FileTypeError,
            run(&tables(), &options, &png, &dir.path().join("out.png"))
        );

        let bad_tables = RuleTables {
            renames: [("javax".to_owned(), "jakarta".to_owned()), ("jakarta".to_owned(), "x".to_owned())].into(),
            ..RuleTables::default()
        };
        assert_eq!(
            ReturnCode::RulesError,
            run(&bad_tables, &options, &png, &dir.path().join("out.png"))
        );
    }

    #[test]
    fn test_text_rules_and_dotted_matching() {
        let tables = RuleTables {
            text_master: vec![TextRule {
                pattern: "*.txt".to_owned(),
                substitutions: [("old-name".to_owned(), "new-name".to_owned())].into(),
            }],
            ..tables()
        };
        let options = TransformOptions {
            embedded_matching: EmbeddedMatching::Dotted,
            ..TransformOptions::default()
        };
        let mut transformer = Transformer::new(&tables, &options).unwrap();
        let output = transformer
            .transform_bytes("a.txt", b"old-name javax/inject/Named javax.inject.Named")
            .unwrap();
        assert_eq!(
            b"new-name javax/inject/Named jakarta.inject.Named".as_slice(),
            &*output.data
        );
    }
}
