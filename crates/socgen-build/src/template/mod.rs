//! Text templates rendered with minijinja.
//!
//! Templates use Jinja syntax: `{{ expr }}` substitutions and `{% if %}` /
//! `{% elif %}` / `{% else %}` / `{% endif %}` blocks. Before compiling, the
//! text is dedented and leading/trailing blank lines are dropped, so templates
//! can be written as indented raw strings. A line that holds nothing but a
//! block tag produces no output of its own, and rendered text ends with a
//! newline.
//!
//! Undefined names are errors, never empty strings.

pub mod context;

use std::sync::Arc;

use minijinja::{AutoEscape, Environment, Error, ErrorKind, UndefinedBehavior, Value};
use socgen_model::ModelError;

use crate::error::{BuildError, Result};
use context::{RenderContext, FUNCTIONS};

/// A syntax-checked template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    name: String,
    source: String,
}

/// Remove the common leading whitespace of all non-blank lines and trim
/// blank lines at both ends.
pub fn dedent(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    let (Some(start), Some(end)) = (start, end) else {
        return String::new();
    };
    let body = &lines[start..=end];
    let indent = body
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out = String::new();
    for line in body {
        if line.trim().is_empty() {
            out.push('\n');
        } else {
            out.push_str(line.get(indent..).unwrap_or(line.trim_start()));
            out.push('\n');
        }
    }
    out
}

fn environment<'s>() -> Environment<'s> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_keep_trailing_newline(true);
    env.set_auto_escape_callback(|_| AutoEscape::None);
    context::add_builtins(&mut env);
    env
}

fn detail(err: &Error) -> String {
    err.detail()
        .map(str::to_string)
        .unwrap_or_else(|| err.kind().to_string())
}

/// Whether `path` (`soc.sdram.core`) has no value under `root`.
fn is_undefined(root: &Value, path: &str) -> bool {
    let mut value = root.clone();
    for key in path.split('.') {
        value = match value.get_attr(key) {
            Ok(v) if !v.is_undefined() => v,
            _ => return true,
        };
    }
    false
}

impl Template {
    /// Dedent `text` and check its syntax, naming it `name` in errors.
    pub fn parse(name: &str, text: &str) -> Result<Self> {
        let template = Template {
            name: name.to_string(),
            source: dedent(text),
        };
        environment()
            .template_from_named_str(name, &template.source)
            .map_err(|e| template.syntax_error(&e))?;
        Ok(template)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render against `ctx`.
    pub fn render(&self, ctx: &RenderContext<'_>) -> Result<String> {
        let mut env = environment();
        context::add_model_functions(&mut env, Arc::new(ctx.model.clone()));
        let template = env
            .template_from_named_str(&self.name, &self.source)
            .map_err(|e| self.syntax_error(&e))?;

        let root = Value::from_serialize(ctx.view());
        let mut out = template
            .render(&root)
            .map_err(|e| self.render_error(&e, &template, &root))?;
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        Ok(out)
    }

    fn syntax_error(&self, err: &Error) -> BuildError {
        BuildError::TemplateSyntax {
            template: self.name.clone(),
            line: err.line().unwrap_or(0),
            message: detail(err),
        }
    }

    fn render_error(
        &self,
        err: &Error,
        template: &minijinja::Template<'_, '_>,
        root: &Value,
    ) -> BuildError {
        match context::model_error(err) {
            Some(ModelError::UnresolvedPeripheral { peripheral }) => {
                return BuildError::UnresolvedPeripheral {
                    template: self.name.clone(),
                    peripheral: peripheral.clone(),
                }
            }
            Some(ModelError::UnregisteredInterrupt { line }) => {
                return BuildError::UnregisteredInterrupt {
                    template: self.name.clone(),
                    line: line.clone(),
                }
            }
            _ => {}
        }
        if err.kind() == ErrorKind::SyntaxError {
            return self.syntax_error(err);
        }
        BuildError::TemplateResolution {
            template: self.name.clone(),
            reference: self.reference(err, template, root),
            reason: detail(err),
        }
    }

    /// The name a failed render tripped over: an undefined path used on the
    /// failing line, else any undefined path, else the line itself.
    fn reference(&self, err: &Error, template: &minijinja::Template<'_, '_>, root: &Value) -> String {
        let line = err
            .line()
            .and_then(|n| n.checked_sub(1))
            .and_then(|n| self.source.lines().nth(n))
            .unwrap_or_default();
        let mut undefined: Vec<String> = template
            .undeclared_variables(true)
            .into_iter()
            .filter(|path| !FUNCTIONS.contains(&path.as_str()))
            .filter(|path| is_undefined(root, path))
            .collect();
        undefined.sort();
        undefined
            .iter()
            .find(|path| line.contains(path.as_str()))
            .or(undefined.first())
            .cloned()
            .unwrap_or_else(|| line.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use socgen_model::{SocDescription, SystemModel};

    fn render_with(model: &SystemModel, text: &str) -> Result<String> {
        let params = BTreeMap::new();
        let ctx = RenderContext {
            model,
            name: "top",
            build_dir: "/build",
            autogenerated: "auto",
            params: &params,
        };
        Template::parse("test", text)?.render(&ctx)
    }

    fn example() -> SystemModel {
        SystemModel::from_description(SocDescription::example_minerva()).unwrap()
    }

    #[test]
    fn dedent_strips_common_indent_and_blank_edges() {
        let text = "\n    a\n      b\n\n    c\n  \n";
        assert_eq!(dedent(text), "a\n  b\n\nc\n");
        assert_eq!(dedent("   \n\n"), "");
    }

    #[test]
    fn substitutes_variables() {
        let out = render_with(&example(), "CLK={{ soc.clk_freq }} NAME={{name}}").unwrap();
        assert_eq!(out, "CLK=100000000 NAME=top\n");
    }

    #[test]
    fn hex_is_a_function_and_a_filter() {
        let out = render_with(&example(), "{{ hex(soc.ram.size) }} {{ soc.ram.size | hex }}").unwrap();
        assert_eq!(out, "0x1000 0x1000\n");
        let out = render_with(&example(), "{{ upper(soc.cpu.arch) }}{{ lower(\"X\") }}").unwrap();
        assert_eq!(out, "RISCVx\n");
    }

    #[test]
    fn block_tag_lines_vanish() {
        let text = r#"
            A
            {% if soc.sdram is none %}
            B
            {% else %}
            C
            {% endif %}
            D
        "#;
        assert_eq!(render_with(&example(), text).unwrap(), "A\nB\nD\n");
    }

    #[test]
    fn inline_conditionals() {
        let out = render_with(
            &example(),
            "x={% if soc.cpu.muldiv == \"soft\" %}y{% else %}n{% endif %}",
        )
        .unwrap();
        assert_eq!(out, "x=n\n");
    }

    #[test]
    fn elif_and_nesting() {
        let text = r#"
            {% if soc.cpu.data_width == 64 %}
            wide
            {% elif soc.cpu.data_width == 32 %}
            {% if soc.cpu.byteorder == "little" %}
            le32
            {% endif %}
            {% else %}
            narrow
            {% endif %}
        "#;
        assert_eq!(render_with(&example(), text).unwrap(), "le32\n");
    }

    #[test]
    fn html_like_names_are_not_escaped() {
        let params = BTreeMap::from([("tag".to_string(), "<a&b>".to_string())]);
        let model = example();
        let ctx = RenderContext {
            model: &model,
            name: "top",
            build_dir: "/build",
            autogenerated: "auto",
            params: &params,
        };
        let out = Template::parse("index.html", "{{ tag }}").unwrap().render(&ctx).unwrap();
        assert_eq!(out, "<a&b>\n");
    }

    #[test]
    fn undefined_variable_names_template_and_reference() {
        let err = render_with(&example(), "{{ litedram_dir }}").unwrap_err();
        match err {
            BuildError::TemplateResolution {
                template,
                reference,
                ..
            } => {
                assert_eq!(template, "test");
                assert_eq!(reference, "litedram_dir");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn undefined_attribute_is_reported_by_path() {
        let text = r#"
            {{ soc.cpu.arch }}
            {{ soc.cpu.vendor }}
        "#;
        let err = render_with(&example(), text).unwrap_err();
        assert!(
            matches!(err, BuildError::TemplateResolution { ref reference, .. } if reference == "soc.cpu.vendor"),
            "{err}"
        );
    }

    #[test]
    fn absent_peripheral_outside_a_guard_fails() {
        let err = render_with(&example(), "{{ soc.sdram.core.size }}").unwrap_err();
        assert!(matches!(err, BuildError::TemplateResolution { .. }), "{err}");
    }

    #[test]
    fn unregistered_interrupt_surfaces_as_its_own_kind() {
        let mut desc = SocDescription::example_minerva();
        desc.intc.as_mut().unwrap().lines.clear();
        let model = SystemModel::from_description(desc).unwrap();
        let err = render_with(&model, "{{ irq_index(soc.uart) }}").unwrap_err();
        assert!(matches!(err, BuildError::UnregisteredInterrupt { ref line, .. } if line == "uart"));
    }

    #[test]
    fn unattached_peripheral_surfaces_as_its_own_kind() {
        let mut desc = SocDescription::example_minerva();
        desc.bus.windows.clear();
        let model = SystemModel::from_description(desc).unwrap();
        let err = render_with(&model, "{{ hex(periph_addr(soc.rom)) }}").unwrap_err();
        assert!(matches!(err, BuildError::UnresolvedPeripheral { ref peripheral, .. } if peripheral == "rom"));
    }

    #[test]
    fn peripheral_without_interrupt_is_a_resolution_error() {
        let err = render_with(&example(), "{{ irq_index(soc.rom) }}").unwrap_err();
        assert!(
            matches!(err, BuildError::TemplateResolution { ref reason, .. } if reason.contains("no interrupt line")),
            "{err}"
        );
    }

    #[test]
    fn untaken_branch_is_not_evaluated() {
        let text = "{% if soc.sdram is not none %}{{ soc.sdram.core.size }}{% endif %}ok";
        assert_eq!(render_with(&example(), text).unwrap(), "ok\n");
    }

    #[test]
    fn syntax_errors() {
        for bad in [
            "{% if x %}never closed",
            "{% endif %}",
            "{% else %}",
            "{{ unterminated",
            "{% if a %}{% else %}{% else %}{% endif %}",
            "{{ a b }}",
        ] {
            let err = Template::parse("bad", bad).unwrap_err();
            assert!(
                matches!(err, BuildError::TemplateSyntax { .. }),
                "{bad}: {err}"
            );
        }
    }

    #[test]
    fn syntax_error_reports_line() {
        let err = Template::parse("lines", "a\nb\n{{ ( }}\n").unwrap_err();
        assert!(matches!(err, BuildError::TemplateSyntax { line: 3, .. }));
    }
}
