//! Path template rendering — `${PLACEHOLDER}` substitution.
//!
//! Pure string work, no I/O. A placeholder with no supplied value is left
//! verbatim in the output; that is the documented behavior, not an error.

/// Substitute `${KEY}` placeholders in `template` with the supplied values.
pub fn expand(template: &str, vars: &[(&str, &str)]) -> String {
    let mut rendered = template.to_owned();
    for (key, value) in vars {
        rendered = rendered.replace(&format!("${{{key}}}"), value);
    }
    rendered
}

/// Absolute path for an agent: `base_path + "/" + rendered`.
pub fn join_base(base_path: &str, rendered: &str) -> String {
    format!("{base_path}/{rendered}")
}
