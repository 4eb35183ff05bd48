/// Expand Unix-style environment variables (`$VAR` and `${VAR}`) in a config value.
///
/// An unset `${VAR}` expands to nothing. An unset `$VAR` is left as written,
/// so literal dollar signs in bucket names or paths survive. Expanded values
/// are not expanded again.
pub fn parse_unix_env_vars(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(pos) = rest.find('$') {
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => {
                    let var_name = &braced[..end];
                    result.push_str(&std::env::var(var_name).unwrap_or_default());
                    rest = &braced[end + 1..];
                },
                None => {
                    // No closing brace, keep the remainder verbatim
                    result.push_str(&rest[pos..]);
                    rest = "";
                }
            }
        } else {
            let name_len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            let var_name = &after[..name_len];

            match std::env::var(var_name) {
                Ok(var_value) if !var_name.is_empty() => result.push_str(&var_value),
                _ => {
                    result.push('$');
                    result.push_str(var_name);
                }
            }
            rest = &after[name_len..];
        }
    }

    result.push_str(rest);
    result
}

/// Expand variables in an optional value in place
pub fn expand_in_place(value: &mut Option<String>) {
    if let Some(v) = value.as_mut() {
        if v.contains('$') {
            *v = parse_unix_env_vars(v);
        }
    }
}
