//! Rendering of generated layouts with minijinja.
//!
//! The layout model is asked for Jinja2 templates, so layouts are compiled
//! and rendered by a Jinja2-compatible engine: loops and `loop.*`,
//! arithmetic, macros, `range`, `set`, `raw` blocks and the builtin filters
//! all work as in Jinja2. Python-style methods (`skills.items()`,
//! `name.upper()`) come from `minijinja-contrib`'s pycompat layer, and the
//! Jinja2 filters `wordcount` and `truncate` are registered here.
//!
//! Output is not auto-escaped, matching a plain `jinja2.Template`; layouts
//! escape explicitly with `| e` where they need to.
//!
//! Engine errors are mapped onto [`TemplateError`] so the pipeline can tell
//! a layout that does not compile from one that references a field the
//! resume lacks.

use minijinja::{AutoEscape, Environment, ErrorKind};
use serde_json::{Map, Value};
use thiserror::Error;

/// Template parse or render failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// The source is not valid template syntax.
    #[error("template syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// A placeholder names a field absent from the data (strict mode only).
    #[error("undefined variable '{name}'")]
    UndefinedVariable { name: String },

    /// The template calls a filter the engine does not provide.
    #[error("unknown filter '{name}'")]
    UnknownFilter { name: String },

    /// Any other failure while rendering (type errors, bad arguments,
    /// `include` of a template that does not exist, …).
    #[error("render error: {0}")]
    Render(String),
}

/// What to do when a placeholder names a missing field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndefinedBehavior {
    /// Printing, iterating or testing a missing field is an error; only
    /// `is defined` and `| default(…)` may touch it. (default)
    #[default]
    Strict,
    /// Missing fields, and attributes of missing fields, render as nothing
    /// and iterate as empty.
    Lenient,
}

impl UndefinedBehavior {
    fn engine(self) -> minijinja::UndefinedBehavior {
        match self {
            UndefinedBehavior::Strict => minijinja::UndefinedBehavior::Strict,
            UndefinedBehavior::Lenient => minijinja::UndefinedBehavior::Chainable,
        }
    }
}

/// A layout template whose source is known to compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
}

impl Template {
    /// Compile `source`, rejecting it on any syntax error.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let env = environment(UndefinedBehavior::Strict);
        env.template_from_str(source)
            .map_err(|e| map_error(&e, source))?;
        Ok(Self {
            source: source.to_string(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render with `data`'s top-level fields as the variable scope.
    ///
    /// Rendering is a pure function of the template and the data: the same
    /// inputs always produce byte-identical output.
    pub fn render(
        &self,
        data: &Map<String, Value>,
        undefined: UndefinedBehavior,
    ) -> Result<String, TemplateError> {
        let env = environment(undefined);
        let template = env
            .template_from_str(&self.source)
            .map_err(|e| map_error(&e, &self.source))?;
        template
            .render(data)
            .map_err(|e| map_error(&e, &self.source))
    }
}

/// Parse and render in one step.
pub fn render_str(
    source: &str,
    data: &Map<String, Value>,
    undefined: UndefinedBehavior,
) -> Result<String, TemplateError> {
    Template::parse(source)?.render(data, undefined)
}

fn environment<'source>(undefined: UndefinedBehavior) -> Environment<'source> {
    let mut env = Environment::new();
    env.set_undefined_behavior(undefined.engine());
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.set_unknown_method_callback(minijinja_contrib::pycompat::unknown_method_callback);
    env.add_filter("wordcount", wordcount);
    env.add_filter("truncate", truncate);
    env
}

// ── Error mapping ────────────────────────────────────────────────────────────

fn map_error(err: &minijinja::Error, source: &str) -> TemplateError {
    let detail = || err.detail().unwrap_or_default().to_string();
    match err.kind() {
        ErrorKind::SyntaxError => TemplateError::Syntax {
            line: err.line().unwrap_or(0),
            message: detail(),
        },
        ErrorKind::UndefinedError => TemplateError::UndefinedVariable {
            name: span_text(err, source).unwrap_or_else(|| "<unknown>".into()),
        },
        ErrorKind::UnknownFilter => TemplateError::UnknownFilter {
            name: span_text(err, source)
                .and_then(|expr| filter_name(&expr))
                .unwrap_or_else(detail),
        },
        _ => TemplateError::Render(err.to_string()),
    }
}

/// The source text of the expression an error points at, without tag
/// delimiters.
fn span_text(err: &minijinja::Error, source: &str) -> Option<String> {
    let text = source.get(err.range()?)?;
    let text = text
        .trim()
        .trim_start_matches(['{', '%', '-'])
        .trim_end_matches(['}', '%', '-'])
        .trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// `skills | join(', ') | bogus(1)` → `bogus`
fn filter_name(expr: &str) -> Option<String> {
    let last = expr.rsplit('|').next()?.trim();
    let name = last.split(['(', ' ']).next()?.trim();
    (!name.is_empty()).then(|| name.to_string())
}

// ── Extra filters ────────────────────────────────────────────────────────────

fn wordcount(value: &str) -> usize {
    value.split_whitespace().count()
}

/// Jinja2's `truncate(length=255, killwords=False, end='...', leeway=5)`.
fn truncate(
    value: &str,
    length: Option<usize>,
    killwords: Option<bool>,
    end: Option<&str>,
    leeway: Option<usize>,
) -> String {
    let length = length.unwrap_or(255);
    let end = end.unwrap_or("...");
    let leeway = leeway.unwrap_or(5);

    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= length + leeway {
        return value.to_string();
    }

    let keep = length.saturating_sub(end.chars().count());
    let head: String = chars[..keep].iter().collect();
    if killwords.unwrap_or(false) {
        return format!("{head}{end}");
    }
    match head.rsplit_once(' ') {
        Some((words, _)) => format!("{words}{end}"),
        None => format!("{head}{end}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("test data must be an object"),
        }
    }

    fn render(src: &str, v: Value) -> Result<String, TemplateError> {
        render_str(src, &data(v), UndefinedBehavior::Strict)
    }

    fn ann() -> Value {
        json!({"name": "Ann Lee", "skills": ["Rust", "Go"]})
    }

    #[test]
    fn substitutes_top_level_fields() {
        let out = render("<h1>{{ name }}</h1><p>{{ title }}</p>", json!({"name": "Ann", "title": "Engineer"}));
        assert_eq!(out.unwrap(), "<h1>Ann</h1><p>Engineer</p>");
    }

    #[test]
    fn nested_lookup_and_index() {
        let v = json!({"contact": {"email": "ann@example.org"}, "skills": ["Rust", "Go"]});
        let out = render("{{ contact.email }} {{ skills[1] }}", v).unwrap();
        assert_eq!(out, "ann@example.org Go");
    }

    #[test]
    fn loop_with_loop_variables_and_else() {
        let src = "{% for s in skills %}{{ loop.index }}:{{ s }}{% if not loop.last %}, {% endif %}{% else %}none{% endfor %}";
        assert_eq!(render(src, json!({"skills": ["a", "b"]})).unwrap(), "1:a, 2:b");
        assert_eq!(render(src, json!({"skills": []})).unwrap(), "none");
    }

    #[test]
    fn animation_delays_from_loop_arithmetic() {
        let src = r#"{% for s in skills %}<li style="animation-delay: {{ loop.index * 0.25 }}s">{{ s }}</li>{% endfor %}"#;
        let out = render(src, ann()).unwrap();
        assert_eq!(
            out,
            r#"<li style="animation-delay: 0.25s">Rust</li><li style="animation-delay: 0.5s">Go</li>"#
        );
    }

    #[test]
    fn macros_are_supported() {
        let src = "{% macro card(t) %}<div class=\"card\">{{ t }}</div>{% endmacro %}{{ card(name) }}";
        assert_eq!(render(src, ann()).unwrap(), "<div class=\"card\">Ann Lee</div>");
    }

    #[test]
    fn range_function() {
        let src = "{% for i in range(3) %}<span class=\"dot-{{ i }}\"></span>{% endfor %}";
        assert_eq!(
            render(src, ann()).unwrap(),
            "<span class=\"dot-0\"></span><span class=\"dot-1\"></span><span class=\"dot-2\"></span>"
        );
    }

    #[test]
    fn wordcount_and_truncate_filters() {
        assert_eq!(render("{{ name | wordcount }}", ann()).unwrap(), "2");
        let v = json!({"summary": "Builds reliable distributed systems in Rust"});
        assert_eq!(
            render("{{ summary | truncate(20) }}", v.clone()).unwrap(),
            "Builds reliable..."
        );
        assert_eq!(
            render("{{ summary | truncate(20, true) }}", v).unwrap(),
            "Builds reliable d..."
        );
    }

    #[test]
    fn mapping_items_loop() {
        let v = json!({"skills": {"backend": ["Rust", "SQL"], "frontend": ["CSS"]}});
        for src in [
            "{% for group, list in skills.items() %}[{{ group }}={{ list | join('/') }}]{% endfor %}",
            "{% for group, list in skills | items %}[{{ group }}={{ list | join('/') }}]{% endfor %}",
        ] {
            assert_eq!(render(src, v.clone()).unwrap(), "[backend=Rust/SQL][frontend=CSS]");
        }
    }

    #[test]
    fn strict_mode_rejects_missing_field() {
        let err = render("{{ phone }}", json!({"name": "Ann"})).unwrap_err();
        assert!(matches!(err, TemplateError::UndefinedVariable { .. }), "got {err:?}");
    }

    #[test]
    fn strict_mode_rejects_attribute_of_missing_field() {
        let err = render("{{ contact.phone | upper }}", json!({"name": "Ann"})).unwrap_err();
        assert!(matches!(err, TemplateError::UndefinedVariable { .. }), "got {err:?}");
    }

    #[test]
    fn lenient_mode_renders_nothing_for_missing_field() {
        let out = render_str(
            "[{{ phone }}{{ contact.phone }}]{% for x in missing %}x{% endfor %}",
            &data(json!({})),
            UndefinedBehavior::Lenient,
        )
        .unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn missing_fields_can_be_guarded() {
        let src = "{% if phone is defined %}{{ phone }}{% else %}{{ email | default('n/a') }}{% endif %}";
        assert_eq!(render(src, json!({})).unwrap(), "n/a");
        assert_eq!(render(src, json!({"phone": "555"})).unwrap(), "555");
    }

    #[test]
    fn set_and_concat() {
        let src = "{% set heading = name ~ ' | ' ~ role %}<title>{{ heading }}</title>";
        let out = render(src, json!({"name": "Ann", "role": "SRE"})).unwrap();
        assert_eq!(out, "<title>Ann | SRE</title>");
    }

    #[test]
    fn output_is_not_auto_escaped() {
        let src = "{{ bio }}|{{ bio | e }}{% raw %}{{ js }}{% endraw %}";
        let out = render(src, json!({"bio": "<b>&"})).unwrap();
        assert_eq!(out, "<b>&|&lt;b&gt;&amp;{{ js }}");
    }

    #[test]
    fn comparisons_and_membership() {
        let src = "{% if years >= 5 and 'Rust' in skills %}senior{% else %}junior{% endif %}";
        let v = json!({"years": 7, "skills": ["Rust"]});
        assert_eq!(render(src, v).unwrap(), "senior");
    }

    #[test]
    fn css_and_js_pass_through() {
        let src = "<style>.card{transition:all .3s}</style><script>const o = {a: 1};</script>";
        assert_eq!(render(src, json!({})).unwrap(), src);
    }

    #[test]
    fn rendering_is_deterministic() {
        let t = Template::parse("{% for k, v in m | items %}{{ k }}={{ v }};{% endfor %}").unwrap();
        let d = data(json!({"m": {"b": 2, "a": 1, "c": [1, 2]}}));
        let first = t.render(&d, UndefinedBehavior::Strict).unwrap();
        let second = t.render(&d, UndefinedBehavior::Strict).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unclosed_block_is_a_syntax_error() {
        let err = Template::parse("<html>\n{% for s in skills %}{{ s }}</html>").unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { .. }), "got {err:?}");
    }

    #[test]
    fn unknown_filter_fails_at_render() {
        let t = Template::parse("{{ name | sparkle }}").unwrap();
        let err = t.render(&data(ann()), UndefinedBehavior::Strict).unwrap_err();
        assert!(matches!(err, TemplateError::UnknownFilter { .. }), "got {err:?}");
    }

    #[test]
    fn iterating_a_number_is_a_render_error() {
        let err = render("{% for x in n %}{% endfor %}", json!({"n": 3})).unwrap_err();
        assert!(matches!(err, TemplateError::Render(_)), "got {err:?}");
    }

    #[test]
    fn filter_name_takes_last_filter() {
        assert_eq!(filter_name("skills | join(', ') | bogus(1)").as_deref(), Some("bogus"));
        assert_eq!(filter_name("name|sparkle").as_deref(), Some("sparkle"));
    }
}
