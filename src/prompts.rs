//! Prompts for the three model calls.
//!
//! Every prompt the structurer, selector and layout generator send is built
//! here, so unit tests can inspect them without a live model.

use crate::resume::StructuredResume;
use crate::theme::Theme;

/// Instruction for turning extracted resume text into JSON.
pub const STRUCTURE_INSTRUCTION: &str =
    "Convert the following text into structured JSON format suitable for a resume:";

/// Appended on a retry after the previous reply was rejected.
pub const STRUCTURE_RETRY_SUFFIX: &str = "\n\nYour previous answer could not be used ({reason}). \
Respond with exactly one JSON object and nothing else.";

/// Build the structurer prompt.
pub fn structure_prompt(text: &str, previous_error: Option<&str>) -> String {
    let mut prompt = format!("{STRUCTURE_INSTRUCTION}\n    {text}");
    if let Some(reason) = previous_error {
        prompt.push_str(&STRUCTURE_RETRY_SUFFIX.replace("{reason}", reason));
    }
    prompt
}

/// Build the theme-selection prompt listing every catalog label.
pub fn theme_prompt(resume: &StructuredResume) -> String {
    let options: String = Theme::ALL
        .iter()
        .map(|t| format!("        - {}\n", t.label()))
        .collect();
    format!(
        "Based on the following resume data, select the best template from the available options:\n\
{options}    \n    JSON Data: {data}\n    Respond only with the template name.",
        data = resume.to_pretty_json()
    )
}

/// Style guidance for the layout generator.
pub const LAYOUT_GUIDELINES: &str = r#"### Template Guidelines:
    - Use the Theme:{theme}.
    - Use **Jinja2 placeholders** for dynamic data insertion.
    - Only reference fields that exist in the resume data above; guard optional ones with `{% if field is defined %}` or `| default('')`.
    - Use advanced CSS by refering the official documentations:-
        refer: `https://tailwindcss.com/docs/colors`
    - Reward advanced animations and advanced user interactions using JavaScript.
    - **Use Cards or carousel effects while rendering list of items to be displayed, for JS and CSS Documentation**
    - Make use of **FontAwesome icons** for better UI enhancement.
    - Use **advanced animations (GSAP, CSS keyframes, hover effects, smooth scrolling)**.
    - Return one complete document from `<html>` to `</html>`; do not use `extends` or `include`.

    Ensure the template looks **modern, sleek, and visually appealing**. Use Jinja2 placeholders for dynamic data insertion."#;

/// Appended on a retry after the previous layout was rejected.
pub const LAYOUT_RETRY_SUFFIX: &str = "\n\nYour previous template could not be used ({reason}). \
Fix this and return the full HTML document.";

/// Build the layout-generation prompt.
pub fn layout_prompt(resume: &StructuredResume, theme: Theme, previous_error: Option<&str>) -> String {
    let mut prompt = format!(
        "Generate a professional, `modern HTML + CSS + JS` portfolio template for the following resume data:\n    {data}\n    {guidelines}",
        data = resume.to_pretty_json(),
        guidelines = LAYOUT_GUIDELINES.replace("{theme}", theme.label()),
    );
    if let Some(reason) = previous_error {
        prompt.push_str(&LAYOUT_RETRY_SUFFIX.replace("{reason}", reason));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resume() -> StructuredResume {
        StructuredResume::from_value(json!({"name": "Ann"})).unwrap()
    }

    #[test]
    fn structure_prompt_embeds_text() {
        let p = structure_prompt("Ann Lee, SRE", None);
        assert!(p.starts_with(STRUCTURE_INSTRUCTION));
        assert!(p.contains("Ann Lee, SRE"));
        assert!(!p.contains("previous answer"));
    }

    #[test]
    fn structure_retry_explains_rejection() {
        let p = structure_prompt("x", Some("no JSON object in reply"));
        assert!(p.contains("no JSON object in reply"));
    }

    #[test]
    fn theme_prompt_lists_every_label() {
        let p = theme_prompt(&resume());
        for t in Theme::ALL {
            assert!(p.contains(&format!("- {}\n", t.label())), "missing {t}");
        }
        assert!(p.contains("\"name\": \"Ann\""));
    }

    #[test]
    fn layout_prompt_names_theme() {
        let p = layout_prompt(&resume(), Theme::DarkTheme, None);
        assert!(p.contains("Use the Theme:dark_theme."));
        assert!(!p.contains("{theme}"));
        assert!(p.contains("FontAwesome"));
    }
}
