//! Prompt template rendering.
//!
//! Templates are static strings containing `{{name}}` placeholders. Every
//! placeholder in the template must be covered by the supplied variables;
//! an uncovered placeholder is a hard error rather than being left verbatim,
//! so a miswired chain step fails here instead of sending a prompt with a
//! literal `{{c2}}` in it.

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unresolved placeholder '{{{{{0}}}}}' in template")]
    Unresolved(String),
}

fn placeholder_pattern() -> Regex {
    Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").expect("placeholder pattern is valid")
}

/// Substitutes every `{{name}}` occurrence in `template` with its value.
/// Fails if the template names a placeholder the mapping does not cover.
pub fn render(template: &str, vars: &[(&str, &str)]) -> Result<String, RenderError> {
    let pattern = placeholder_pattern();

    for caps in pattern.captures_iter(template) {
        let name = &caps[1];
        if !vars.iter().any(|(k, _)| *k == name) {
            return Err(RenderError::Unresolved(name.to_string()));
        }
    }

    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{{{key}}}}}"), value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_all_occurrences() {
        let out = render("{{a}} and {{b}} and {{a}}", &[("a", "X"), ("b", "Y")]).unwrap();
        assert_eq!(out, "X and Y and X");
    }

    #[test]
    fn test_render_leaves_no_placeholders() {
        let out = render("{{a}}-{{b}}", &[("a", "X"), ("b", "Y")]).unwrap();
        assert!(!out.contains("{{a}}"));
        assert!(!out.contains("{{b}}"));
    }

    #[test]
    fn test_render_is_idempotent() {
        let vars = [("a", "X"), ("b", "Y")];
        let once = render("{{a}} {{b}}", &vars).unwrap();
        let twice = render(&once, &vars).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_render_fails_on_missing_key() {
        let err = render("{{a}} {{missing}}", &[("a", "X")]).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_render_extra_vars_are_harmless() {
        let out = render("{{a}}", &[("a", "X"), ("unused", "Z")]).unwrap();
        assert_eq!(out, "X");
    }
}
