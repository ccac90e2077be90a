//! Build plans: the rendered files and commands of one build invocation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use socgen_model::{SocDescription, SystemModel};

use crate::error::{BuildError, Result};
use crate::execute::execute_plan;
use crate::product::{normalize_relative, ProductSet};
use crate::registry::TemplateRegistry;
use crate::template::context::{RenderContext, RESERVED_NAMES};
use crate::template::Template;

/// Run name used when the caller does not pick one.
pub const DEFAULT_RUN_NAME: &str = "top";

/// Banner exposed to templates as `autogenerated`.
pub const AUTOGENERATED: &str = "Automatically generated by socgen. Do not edit.";

/// A file to be written into the working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedFile {
    /// Path relative to the working directory.
    pub path: PathBuf,
    pub contents: String,
}

/// Ordered files and commands produced for one build invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
    name: String,
    build_dir: PathBuf,
    files: Vec<PlannedFile>,
    commands: Vec<String>,
}

impl BuildPlan {
    /// Run name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Working directory the plan was rendered for.
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn files(&self) -> &[PlannedFile] {
        &self.files
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// File name of the standalone build script.
    pub fn script_name(&self) -> String {
        format!("build_{}.sh", self.name)
    }

    /// A POSIX shell script running every command from the script's own
    /// directory, stopping at the first failure.
    pub fn script(&self) -> String {
        let mut out = String::from("#!/bin/sh\n");
        out.push_str(&format!("# {AUTOGENERATED}\n"));
        out.push_str("set -e\n");
        out.push_str("cd \"$(dirname \"$0\")\"\n");
        for command in &self.commands {
            out.push_str(command);
            out.push('\n');
        }
        out
    }

    /// Write every planned file under `dir`, creating directories as needed
    /// and overwriting existing files.
    pub fn write_files(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| BuildError::io(dir, e))?;
        for file in &self.files {
            let path = dir.join(&file.path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
            }
            fs::write(&path, &file.contents).map_err(|e| BuildError::io(&path, e))?;
            log::debug!("wrote {}", path.display());
        }
        Ok(())
    }

    /// Write the planned files and the build script under `dir` without
    /// running anything. Returns the script path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        self.write_files(dir)?;
        let script = dir.join(self.script_name());
        fs::write(&script, self.script()).map_err(|e| BuildError::io(&script, e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755))
                .map_err(|e| BuildError::io(&script, e))?;
        }
        log::info!("wrote build script {}", script.display());
        Ok(script)
    }

    /// Execute the plan in the working directory it was rendered for.
    pub fn execute_local(&self) -> Result<ProductSet> {
        execute_plan(self, &self.build_dir)
    }
}

/// Renders a [`TemplateRegistry`] into [`BuildPlan`]s.
#[derive(Debug, Clone, Default)]
pub struct PlanBuilder {
    registry: TemplateRegistry,
}

impl PlanBuilder {
    pub fn new(registry: TemplateRegistry) -> Self {
        Self { registry }
    }

    /// Merge `overrides` over the current templates.
    pub fn with_overrides(self, overrides: TemplateRegistry) -> Self {
        Self {
            registry: self.registry.merge(overrides),
        }
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Validate `desc` as a system model, then plan it.
    ///
    /// An incomplete description fails with
    /// [`socgen_model::ModelError::InvalidModel`] before anything is rendered.
    pub fn prepare_description(
        &self,
        desc: &SocDescription,
        build_dir: &Path,
        name: Option<&str>,
        params: &BTreeMap<String, String>,
    ) -> Result<BuildPlan> {
        let model = SystemModel::from_description(desc.clone())?;
        self.prepare(&model, build_dir, name, params)
    }

    /// Render every file template, then every command template, in
    /// registration order.
    pub fn prepare(
        &self,
        model: &SystemModel,
        build_dir: &Path,
        name: Option<&str>,
        params: &BTreeMap<String, String>,
    ) -> Result<BuildPlan> {
        if let Some(reserved) = params.keys().find(|k| RESERVED_NAMES.contains(&k.as_str())) {
            return Err(BuildError::ReservedParameter {
                name: reserved.clone(),
            });
        }

        let name = name.unwrap_or(DEFAULT_RUN_NAME);
        let build_dir_text = build_dir.display().to_string();
        let ctx = RenderContext {
            model,
            name,
            build_dir: &build_dir_text,
            autogenerated: AUTOGENERATED,
            params,
        };

        let mut files = Vec::with_capacity(self.registry.files().len());
        for template in self.registry.files() {
            let path = render_path(&template.path, &ctx)?;
            let contents = Template::parse(&template.path, &template.body)?.render(&ctx)?;
            log::debug!("rendered {} ({} bytes)", path.display(), contents.len());
            files.push(PlannedFile { path, contents });
        }

        let mut commands = Vec::with_capacity(self.registry.commands().len());
        for template in self.registry.commands() {
            let rendered = Template::parse(&template.name, &template.body)?.render(&ctx)?;
            commands.push(join_command(&rendered));
        }

        log::info!(
            "planned '{name}': {} files, {} commands",
            files.len(),
            commands.len()
        );
        Ok(BuildPlan {
            name: name.to_string(),
            build_dir: build_dir.to_path_buf(),
            files,
            commands,
        })
    }
}

fn render_path(path_template: &str, ctx: &RenderContext<'_>) -> Result<PathBuf> {
    let rendered = Template::parse(path_template, path_template)?.render(ctx)?;
    let rendered = rendered.trim();
    let invalid = |reason: &str| BuildError::TemplateResolution {
        template: path_template.to_string(),
        reference: rendered.to_string(),
        reason: reason.to_string(),
    };
    if rendered.is_empty() {
        return Err(invalid("file path renders empty"));
    }
    if rendered.contains('\n') {
        return Err(invalid("file path spans several lines"));
    }
    let path = normalize_relative(Path::new(rendered))?;
    if path.as_os_str().is_empty() {
        return Err(invalid("file path names the working directory itself"));
    }
    Ok(path)
}

/// Join the non-empty lines of a rendered command fragment with single spaces.
fn join_command(rendered: &str) -> String {
    rendered
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> SystemModel {
        SystemModel::from_description(SocDescription::example_minerva()).unwrap()
    }

    fn registry() -> TemplateRegistry {
        let mut reg = TemplateRegistry::new();
        reg.add_file("{{name}}.txt", "name={{name}} dir={{build_dir}}")
            .add_file("sub/{{lower(soc.cpu.arch)}}.h", "#define X {{ hex(soc.rom.size) }}");
        reg.add_command(
            "first",
            r#"
                echo
                  {{ greeting }}
            "#,
        )
        .add_command("second", "cat {{name}}.txt");
        reg
    }

    #[test]
    fn one_artifact_per_template_in_order() {
        let params = BTreeMap::from([("greeting".to_string(), "hi".to_string())]);
        let plan = PlanBuilder::new(registry())
            .prepare(&model(), Path::new("/b"), None, &params)
            .unwrap();
        assert_eq!(plan.name(), "top");
        let paths: Vec<&Path> = plan.files().iter().map(|f| f.path.as_path()).collect();
        assert_eq!(paths, vec![Path::new("top.txt"), Path::new("sub/riscv.h")]);
        assert_eq!(plan.files()[0].contents, "name=top dir=/b\n");
        assert_eq!(plan.files()[1].contents, "#define X 0x2000\n");
        assert_eq!(plan.commands(), &["echo hi", "cat top.txt"]);
    }

    #[test]
    fn reserved_parameter_is_rejected() {
        let params = BTreeMap::from([("build_dir".to_string(), "x".to_string())]);
        let err = PlanBuilder::new(registry())
            .prepare(&model(), Path::new("/b"), None, &params)
            .unwrap_err();
        assert!(matches!(err, BuildError::ReservedParameter { ref name } if name == "build_dir"));
    }

    #[test]
    fn missing_parameter_names_command_template() {
        let err = PlanBuilder::new(registry())
            .prepare(&model(), Path::new("/b"), Some("run"), &BTreeMap::new())
            .unwrap_err();
        match err {
            BuildError::TemplateResolution {
                template,
                reference,
                ..
            } => {
                assert_eq!(template, "first");
                assert_eq!(reference, "greeting");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn escaping_file_name_is_rejected() {
        let mut reg = TemplateRegistry::new();
        reg.add_file("../{{name}}.txt", "x");
        let err = PlanBuilder::new(reg)
            .prepare(&model(), Path::new("/b"), None, &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, BuildError::PathEscape { .. }));
    }

    #[test]
    fn incomplete_description_fails_before_rendering() {
        let mut desc = SocDescription::example_minerva();
        desc.ram = None;
        let err = PlanBuilder::new(registry())
            .prepare_description(&desc, Path::new("/b"), None, &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Model(socgen_model::ModelError::InvalidModel { ref missing }) if missing == &["ram"]
        ));
    }

    #[test]
    fn script_and_write_to() {
        let params = BTreeMap::from([("greeting".to_string(), "hi".to_string())]);
        let plan = PlanBuilder::new(registry())
            .prepare(&model(), Path::new("/b"), Some("soc"), &params)
            .unwrap();
        let script = plan.script();
        assert!(script.starts_with("#!/bin/sh\n"));
        assert!(script.contains("set -e\n"));
        assert!(script.ends_with("echo hi\ncat soc.txt\n"));

        let dir = tempfile::tempdir().unwrap();
        let path = plan.write_to(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("build_soc.sh"));
        assert!(dir.path().join("soc.txt").is_file());
        assert!(dir.path().join("sub/riscv.h").is_file());
    }

    #[test]
    fn overrides_replace_base_templates() {
        let mut child = TemplateRegistry::new();
        child.add_command("second", "true");
        let builder = PlanBuilder::new(registry()).with_overrides(child);
        let params = BTreeMap::from([("greeting".to_string(), "hi".to_string())]);
        let plan = builder
            .prepare(&model(), Path::new("/b"), None, &params)
            .unwrap();
        assert_eq!(plan.commands(), &["echo hi", "true"]);
    }

    #[test]
    fn join_command_collapses_lines() {
        assert_eq!(join_command("\n  a=1\n\n   make -C x  \n"), "a=1 make -C x");
        assert_eq!(join_command(""), "");
    }
}
