use regex::Regex;
use std::env;
use std::sync::OnceLock;

fn env_reference() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("env reference pattern is valid"))
}

/// Expand environment variables in a string using ${VAR_NAME} syntax.
/// Unset variables are left as written.
pub fn expand_env_var_in_string(value: &str) -> String {
    let mut result = value.to_string();

    for cap in env_reference().captures_iter(value) {
        let var_name = &cap[1];
        let replacement = env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name));
        result = result.replace(&cap[0], &replacement);
    }

    result
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
