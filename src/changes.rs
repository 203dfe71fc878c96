use derive_more::IsVariant;
use tracing::info;

/// What a resource's content changes are counted in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, IsVariant)]
pub enum ContentChanges {
    Replacements(usize),
    /// Service loader configuration provider lines.
    Providers { changed: usize, unchanged: usize },
}

impl ContentChanges {
    fn cleared(self) -> ContentChanges {
        match self {
            ContentChanges::Replacements(_) => ContentChanges::Replacements(0),
            ContentChanges::Providers { .. } => ContentChanges::Providers {
                changed: 0,
                unchanged: 0,
            },
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum ChangesKind {
    #[default]
    Replacements,
    ServiceLoaderConfig,
}

/// Name and content changes made to one resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Changes {
    input_resource_name: String,
    output_resource_name: String,
    content: ContentChanges,
}

impl Changes {
    pub fn new(kind: ChangesKind) -> Changes {
        let content = match kind {
            ChangesKind::Replacements => ContentChanges::Replacements(0),
            ChangesKind::ServiceLoaderConfig => ContentChanges::Providers {
                changed: 0,
                unchanged: 0,
            },
        };
        Changes {
            input_resource_name: String::new(),
            output_resource_name: String::new(),
            content,
        }
    }

    pub fn clear_changes(&mut self) {
        self.input_resource_name.clear();
        self.output_resource_name.clear();
        self.content = self.content.cleared();
    }

    fn reset(&mut self, kind: ChangesKind, resource_name: &str) {
        self.content = Changes::new(kind).content;
        self.set_resource_names(resource_name, resource_name);
    }

    pub fn input_resource_name(&self) -> &str {
        &self.input_resource_name
    }

    pub fn output_resource_name(&self) -> &str {
        &self.output_resource_name
    }

    pub fn set_resource_names(&mut self, input: &str, output: &str) {
        self.input_resource_name.clear();
        self.input_resource_name.push_str(input);
        self.output_resource_name.clear();
        self.output_resource_name.push_str(output);
    }

    pub fn set_output_resource_name(&mut self, output: &str) {
        self.output_resource_name.clear();
        self.output_resource_name.push_str(output);
    }

    pub fn content(&self) -> ContentChanges {
        self.content
    }

    pub fn replacements(&self) -> usize {
        match self.content {
            ContentChanges::Replacements(count) => count,
            ContentChanges::Providers { changed, .. } => changed,
        }
    }

    pub fn add_replacement(&mut self) {
        self.add_replacements(1);
    }

    pub fn add_replacements(&mut self, additions: usize) {
        match &mut self.content {
            ContentChanges::Replacements(count) => *count += additions,
            ContentChanges::Providers { changed, .. } => *changed += additions,
        }
    }

    pub fn add_changed_provider(&mut self) {
        self.add_replacements(1);
    }

    pub fn add_unchanged_provider(&mut self) {
        if let ContentChanges::Providers { unchanged, .. } = &mut self.content {
            *unchanged += 1;
        }
    }

    pub fn unchanged_providers(&self) -> usize {
        match self.content {
            ContentChanges::Providers { unchanged, .. } => unchanged,
            ContentChanges::Replacements(_) => 0,
        }
    }

    pub fn has_resource_name_change(&self) -> bool {
        self.input_resource_name != self.output_resource_name
    }

    pub fn has_non_resource_name_changes(&self) -> bool {
        self.replacements() > 0
    }

    pub fn has_changes(&self) -> bool {
        self.has_resource_name_change() || self.has_non_resource_name_changes()
    }

    pub fn change_text(&self) -> &'static str {
        match (
            self.has_resource_name_change(),
            self.has_non_resource_name_changes(),
        ) {
            (true, true) => "Name and content changes",
            (true, false) => "Name changes",
            (false, true) => "Content changes",
            (false, false) => "No changes",
        }
    }

    pub fn log_verbose(&self, input_path: &str, output_path: &str) {
        info!("Input  [ {} ] as [ {} ]", self.input_resource_name, input_path);
        info!("Output [ {} ] as [ {} ]", self.output_resource_name, output_path);
        info!("Replacements [ {} ]", self.replacements());
    }
}

/// Stack of in-flight [`Changes`], one per nesting level, recycled across
/// resources so allocation is bounded by the deepest nesting seen.
#[derive(Debug, Default)]
pub struct ChangeRecorder {
    history: Vec<Changes>,
    active: usize,
    last: Option<Changes>,
}

impl ChangeRecorder {
    pub fn new() -> ChangeRecorder {
        ChangeRecorder::default()
    }

    /// Number of recordings currently open.
    pub fn depth(&self) -> usize {
        self.active
    }

    pub fn start_recording(&mut self, resource_name: &str, kind: ChangesKind) -> &mut Changes {
        if self.active == self.history.len() {
            self.history.push(Changes::new(kind));
        }
        let changes = &mut self.history[self.active];
        changes.reset(kind, resource_name);
        self.active += 1;
        changes
    }

    /// Closes the innermost recording and keeps it as the last completed one.
    /// `None` when no recording is open.
    pub fn stop_recording(&mut self) -> Option<&Changes> {
        self.active = self.active.checked_sub(1)?;
        let finished = &self.history[self.active];
        let last = self
            .last
            .get_or_insert_with(|| Changes::new(ChangesKind::Replacements));
        last.clone_from(finished);
        Some(last)
    }

    pub fn active_changes(&self) -> Option<&Changes> {
        self.active.checked_sub(1).map(|index| &self.history[index])
    }

    pub fn active_changes_mut(&mut self) -> Option<&mut Changes> {
        self.active
            .checked_sub(1)
            .map(|index| &mut self.history[index])
    }

    /// The recording enclosing the innermost one, for nested containers.
    pub fn parent_changes_mut(&mut self) -> Option<&mut Changes> {
        self.active
            .checked_sub(2)
            .map(|index| &mut self.history[index])
    }

    pub fn last_changes(&self) -> Option<&Changes> {
        self.last.as_ref()
    }

    pub fn had_changes(&self) -> bool {
        self.last.as_ref().is_some_and(Changes::has_changes)
    }

    pub fn allocated(&self) -> usize {
        self.history.len()
    }
}
