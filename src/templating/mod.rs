//! Template variable substitution
//!
//! [`TemplateService`] holds a snapshot of every dashboard variable's
//! current value and substitutes `$name` / `${name}` tokens into query
//! strings, regexes, and URLs. Substitution is format-aware: regex format
//! escapes values so that a variable can be embedded inside a regular
//! expression (a multi-value selection renders as an alternation group).
//!
//! The service is the read side of variable state: the variable store
//! pushes a [`VariableSnapshot`] here after every option update, and
//! dependent consumers (queries, link URLs, other variables' regexes)
//! resolve against it.

use std::sync::{OnceLock, RwLock};

use regex::Regex;

/// Kinds of dashboard variables the template index distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// Values resolved through a datasource metric-find query
    Query,
    /// Value names a datasource; used as a `$name` pseudo-source
    Datasource,
}

/// Point-in-time view of one variable's selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSnapshot {
    pub name: String,
    pub kind: VariableKind,
    /// Display text of the current selection
    pub current_text: String,
    /// Selected values; single-value selections hold one entry
    pub values: Vec<String>,
}

/// Output format of a substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemplateFormat {
    /// Values inserted verbatim; multi-value selections join with `,`
    #[default]
    Raw,
    /// Values regex-escaped; multi-value selections render as `(a|b)`
    Regex,
}

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"\$\{(\w+)\}|\$(\w+)").expect("valid token regex"))
}

/// The template substitution service.
#[derive(Debug, Default)]
pub struct TemplateService {
    variables: RwLock<Vec<VariableSnapshot>>,
}

impl TemplateService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the snapshot for a variable, keyed by name.
    pub fn set_variable(&self, snapshot: VariableSnapshot) {
        let mut variables = self.variables.write().expect("template index poisoned");
        match variables.iter_mut().find(|v| v.name == snapshot.name) {
            Some(existing) => *existing = snapshot,
            None => variables.push(snapshot),
        }
    }

    /// Remove a variable from the index, e.g. on dashboard teardown.
    pub fn remove_variable(&self, name: &str) {
        let mut variables = self.variables.write().expect("template index poisoned");
        variables.retain(|v| v.name != name);
    }

    /// All current snapshots, in registration order.
    pub fn variables(&self) -> Vec<VariableSnapshot> {
        self.variables.read().expect("template index poisoned").clone()
    }

    /// Substitute every `$name` / `${name}` token in `text`.
    ///
    /// Tokens naming an unknown variable are left untouched.
    pub fn replace(&self, text: &str, format: TemplateFormat) -> String {
        let variables = self.variables.read().expect("template index poisoned");
        token_regex()
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                match variables.iter().find(|v| v.name == name) {
                    Some(variable) => format_value(variable, format),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

fn format_value(variable: &VariableSnapshot, format: TemplateFormat) -> String {
    match format {
        TemplateFormat::Raw => variable.values.join(","),
        TemplateFormat::Regex => {
            if variable.values.len() == 1 {
                regex::escape(&variable.values[0])
            } else {
                let escaped: Vec<String> =
                    variable.values.iter().map(|v| regex::escape(v)).collect();
                format!("({})", escaped.join("|"))
            }
        }
    }
}
