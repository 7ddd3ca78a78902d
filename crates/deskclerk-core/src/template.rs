//! Placeholder substitution for the system instructions template
//!
//! Supports `{name}` placeholders over a fixed variable set. Substitution is
//! all-or-nothing: if any placeholder cannot be resolved, the template is
//! returned verbatim and the omission is logged. A partially filled prompt is
//! worse than an unfilled one.

use std::collections::HashMap;

use tracing::warn;

/// Render a template against the given variables.
///
/// `{{` and `}}` escape literal braces.
pub fn render_template(template: &str, vars: &HashMap<&str, String>) -> String {
    let mut result = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                result.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                result.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for ch in chars.by_ref() {
                    if ch == '}' {
                        closed = true;
                        break;
                    }
                    name.push(ch);
                }
                if !closed {
                    // Unterminated placeholder, keep the template as-is
                    warn!(template_len = template.len(), "Unterminated placeholder in template");
                    return template.to_string();
                }
                match vars.get(name.as_str()) {
                    Some(value) => result.push_str(value),
                    None => {
                        warn!(placeholder = %name, "Unresolved template placeholder, using template verbatim");
                        return template.to_string();
                    }
                }
            }
            _ => result.push(c),
        }
    }

    result
}
