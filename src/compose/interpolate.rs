// ABOUTME: Shell-style variable interpolation over manifest values.
// ABOUTME: Supports $VAR, ${VAR}, the :- - :? ? :+ + modifiers, and $$ escapes.

use std::collections::BTreeMap;

use super::ComposeError;
use crate::diagnostics::{Diagnostics, Warning};

/// Interpolate a single string against `env`.
///
/// Unset variables without a default resolve to "" and leave a warning behind.
pub fn interpolate(
    input: &str,
    env: &BTreeMap<String, String>,
    diag: &mut Diagnostics,
) -> Result<String, ComposeError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
        } else if let Some(body) = after.strip_prefix('{') {
            let end = closing_brace(body).ok_or_else(|| ComposeError::Interpolation {
                value: input.to_string(),
                reason: "unterminated ${".to_string(),
            })?;
            out.push_str(&expand(&body[..end], input, env, diag)?);
            rest = &body[end + 1..];
        } else if after.starts_with(|c: char| c == '_' || c.is_ascii_alphabetic()) {
            let len = after
                .find(|c: char| c != '_' && !c.is_ascii_alphanumeric())
                .unwrap_or(after.len());
            let name = &after[..len];
            out.push_str(&lookup(name, env, diag));
            rest = &after[len..];
        } else {
            out.push('$');
            rest = after;
        }
    }
    out.push_str(rest);
    Ok(out)
}

/// Interpolate every string scalar in a YAML tree in place. Mapping keys are left alone.
pub(crate) fn interpolate_value(
    value: &mut serde_yaml::Value,
    env: &BTreeMap<String, String>,
    diag: &mut Diagnostics,
) -> Result<(), ComposeError> {
    match value {
        serde_yaml::Value::String(s) => *s = interpolate(s, env, diag)?,
        serde_yaml::Value::Sequence(items) => {
            for item in items {
                interpolate_value(item, env, diag)?;
            }
        }
        serde_yaml::Value::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                interpolate_value(v, env, diag)?;
            }
        }
        serde_yaml::Value::Tagged(tagged) => interpolate_value(&mut tagged.value, env, diag)?,
        _ => {}
    }
    Ok(())
}

// Index of the `}` closing a `${`, allowing nested `${...}` in defaults.
fn closing_brace(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' if depth == 0 => return Some(i),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn lookup(name: &str, env: &BTreeMap<String, String>, diag: &mut Diagnostics) -> String {
    match env.get(name) {
        Some(v) => v.clone(),
        None => {
            diag.warn(Warning::unset_variable(name));
            String::new()
        }
    }
}

fn expand(
    body: &str,
    input: &str,
    env: &BTreeMap<String, String>,
    diag: &mut Diagnostics,
) -> Result<String, ComposeError> {
    let name_len = body
        .find(|c: char| c != '_' && !c.is_ascii_alphanumeric())
        .unwrap_or(body.len());
    let (name, modifier) = body.split_at(name_len);
    if name.is_empty() {
        return Err(ComposeError::Interpolation {
            value: input.to_string(),
            reason: "missing variable name".to_string(),
        });
    }
    if modifier.is_empty() {
        return Ok(lookup(name, env, diag));
    }

    let value = env.get(name);
    let (colon, op, arg) = match modifier.strip_prefix(':') {
        Some(m) => (true, m.chars().next(), m.get(1..).unwrap_or("")),
        None => (false, modifier.chars().next(), modifier.get(1..).unwrap_or("")),
    };
    // With a colon an empty value counts as unset.
    let is_set = value.is_some_and(|v| !colon || !v.is_empty());

    match op {
        Some('-') if is_set => Ok(value.cloned().unwrap_or_default()),
        Some('-') => interpolate(arg, env, diag),
        Some('+') if is_set => interpolate(arg, env, diag),
        Some('+') => Ok(String::new()),
        Some('?') if is_set => Ok(value.cloned().unwrap_or_default()),
        Some('?') => Err(ComposeError::RequiredVariable {
            name: name.to_string(),
            message: arg.to_string(),
        }),
        _ => Err(ComposeError::Interpolation {
            value: input.to_string(),
            reason: format!("unsupported modifier {modifier:?}"),
        }),
    }
}
