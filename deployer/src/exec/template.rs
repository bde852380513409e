//! Shell quoting and parameterized script templates
//!
//! Operator-supplied values (addresses, tokens, paths) are only ever placed
//! into shell text through [`shell_quote`], either directly or via
//! [`ScriptTemplate`] substitutions.

use std::collections::BTreeMap;

use crate::errors::DeployError;

/// Quote `value` as a single POSIX shell word.
///
/// The value is wrapped in single quotes and every embedded single quote
/// becomes `'\''`. Plain words made of safe characters are left as-is.
pub fn shell_quote(value: &str) -> String {
    let is_plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:@%+=,".contains(c));
    if is_plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

/// A script body with `{{name}}` placeholders.
///
/// Every placeholder must be bound before rendering, and every bound value is
/// shell-quoted on substitution. Raw (unquoted) fragments are only accepted
/// through [`ScriptTemplate::bind_raw`] and are meant for values the program
/// itself produces, such as a privilege prefix.
#[derive(Debug, Clone)]
pub struct ScriptTemplate {
    body: &'static str,
    values: BTreeMap<&'static str, String>,
}

impl ScriptTemplate {
    pub fn new(body: &'static str) -> Self {
        Self {
            body,
            values: BTreeMap::new(),
        }
    }

    /// Bind a placeholder to a value that will be shell-quoted
    pub fn bind(mut self, name: &'static str, value: &str) -> Self {
        self.values.insert(name, shell_quote(value));
        self
    }

    /// Bind a placeholder to trusted shell text, inserted verbatim
    pub fn bind_raw(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(name, value.into());
        self
    }

    /// Substitute all placeholders
    pub fn render(&self) -> Result<String, DeployError> {
        let mut rendered = String::with_capacity(self.body.len());
        let mut rest = self.body;

        while let Some(start) = rest.find("{{") {
            rendered.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find("}}").ok_or_else(|| {
                DeployError::Internal("Unterminated placeholder in script template".to_string())
            })?;
            let name = after[..end].trim();
            let value = self.values.get(name).ok_or_else(|| {
                DeployError::Internal(format!("Unbound script placeholder: {}", name))
            })?;
            rendered.push_str(value);
            rest = &after[end + 2..];
        }
        rendered.push_str(rest);

        Ok(rendered)
    }
}
