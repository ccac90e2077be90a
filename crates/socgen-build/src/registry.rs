//! Registries of file and command templates.
//!
//! Builders are composed by merging registries: a base registry plus an
//! override registry, where overrides win on name collision.

/// A template producing one file of the build plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTemplate {
    /// Template for the file path, relative to the build directory.
    pub path: String,
    /// Template for the file contents.
    pub body: String,
}

/// A template producing one command of the build plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    /// Registry key.
    pub name: String,
    pub body: String,
}

/// Ordered file and command templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateRegistry {
    files: Vec<FileTemplate>,
    commands: Vec<CommandTemplate>,
}

impl TemplateRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file template.
    ///
    /// An existing template with the same path is replaced in place.
    pub fn add_file(&mut self, path: impl Into<String>, body: impl Into<String>) -> &mut Self {
        let template = FileTemplate {
            path: path.into(),
            body: body.into(),
        };
        match self.files.iter_mut().find(|f| f.path == template.path) {
            Some(existing) => *existing = template,
            None => self.files.push(template),
        }
        self
    }

    /// Register a command template.
    ///
    /// An existing template with the same name is replaced in place.
    pub fn add_command(&mut self, name: impl Into<String>, body: impl Into<String>) -> &mut Self {
        let template = CommandTemplate {
            name: name.into(),
            body: body.into(),
        };
        match self.commands.iter_mut().find(|c| c.name == template.name) {
            Some(existing) => *existing = template,
            None => self.commands.push(template),
        }
        self
    }

    /// Merge `overrides` into this registry.
    ///
    /// Entries keep their registration order; colliding entries take the
    /// override's body at the base's position, new entries are appended.
    pub fn merge(mut self, overrides: TemplateRegistry) -> Self {
        for file in overrides.files {
            self.add_file(file.path, file.body);
        }
        for command in overrides.commands {
            self.add_command(command.name, command.body);
        }
        self
    }

    pub fn files(&self) -> &[FileTemplate] {
        &self.files
    }

    pub fn commands(&self) -> &[CommandTemplate] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.commands.is_empty()
    }
}
