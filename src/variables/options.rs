//! Query variable option reduction
//!
//! Turns raw metric-find results into the variable's option list: templated
//! regex extraction, the configured sort order, and reconciliation of the
//! previous selection against the refreshed options.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::core::{DatavError, Result};
use crate::models::{
    CurrentSelection, MetricFindValue, QueryVariableModel, VariableOption, VariableSort,
};

/// The reducer's output: the replacement option list plus the reconciled
/// current selection.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionsUpdate {
    pub options: Vec<VariableOption>,
    pub current: CurrentSelection,
}

/// Reduce metric-find results into options for `variable`.
///
/// An empty `templated_regex` means no filtering. A non-empty regex keeps
/// only matching results, extracting capture group 1 when the pattern has
/// one; duplicate texts are dropped.
///
/// # Errors
///
/// Returns [`DatavError::InvalidRegex`] when `templated_regex` does not
/// compile.
pub fn update_variable_options(
    variable: &QueryVariableModel,
    results: &[MetricFindValue],
    templated_regex: &str,
) -> Result<OptionsUpdate> {
    let mut options = metric_names_to_options(results, templated_regex)?;
    sort_options(&mut options, variable.sort);
    let current = reconcile_selection(&mut options, &variable.current, variable.multi);
    Ok(OptionsUpdate { options, current })
}

fn metric_names_to_options(
    results: &[MetricFindValue],
    templated_regex: &str,
) -> Result<Vec<VariableOption>> {
    let regex = if templated_regex.is_empty() {
        None
    } else {
        Some(Regex::new(templated_regex).map_err(|err| DatavError::InvalidRegex {
            pattern: templated_regex.to_string(),
            reason: err.to_string(),
        })?)
    };

    let mut seen = HashSet::new();
    let mut options = Vec::new();
    for result in results {
        let (text, value) = match &regex {
            None => {
                let value = result.value.clone().unwrap_or_else(|| result.text.clone());
                (result.text.clone(), value)
            }
            Some(regex) => {
                let Some(captures) = regex.captures(&result.text) else { continue };
                let matched = captures
                    .get(1)
                    .unwrap_or_else(|| captures.get(0).expect("match has group 0"))
                    .as_str()
                    .to_string();
                (matched.clone(), matched)
            }
        };
        if seen.insert(text.clone()) {
            options.push(VariableOption { text, value, selected: false });
        }
    }
    Ok(options)
}

fn leading_number(text: &str) -> Option<i64> {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    let digits = DIGITS.get_or_init(|| Regex::new(r"\d+").expect("valid digits regex"));
    digits.find(text).and_then(|m| m.as_str().parse().ok())
}

fn sort_options(options: &mut [VariableOption], sort: VariableSort) {
    match sort {
        VariableSort::Disabled => {}
        VariableSort::AlphabeticalAsc => options.sort_by(|a, b| a.text.cmp(&b.text)),
        VariableSort::AlphabeticalDesc => options.sort_by(|a, b| b.text.cmp(&a.text)),
        // Options without a leading number sort last in both directions
        VariableSort::NumericalAsc => {
            options.sort_by_key(|o| leading_number(&o.text).unwrap_or(i64::MAX));
        }
        VariableSort::NumericalDesc => {
            options.sort_by_key(|o| match leading_number(&o.text) {
                Some(n) => -n,
                None => i64::MAX,
            });
        }
        VariableSort::AlphabeticalCaseInsensitiveAsc => {
            options.sort_by_key(|o| o.text.to_lowercase());
        }
        VariableSort::AlphabeticalCaseInsensitiveDesc => {
            options.sort_by(|a, b| b.text.to_lowercase().cmp(&a.text.to_lowercase()));
        }
    }
}

/// Reconcile the previous selection with the refreshed option list.
///
/// Previously-selected values that survived the refresh stay selected;
/// otherwise the first option becomes the selection. Multi-value variables
/// keep the surviving subset and join the display text with ` + `.
fn reconcile_selection(
    options: &mut [VariableOption],
    previous: &CurrentSelection,
    multi: bool,
) -> CurrentSelection {
    if options.is_empty() {
        return CurrentSelection::default();
    }

    if multi {
        let mut values: Vec<String> = previous
            .values
            .iter()
            .filter(|value| options.iter().any(|o| &o.value == *value))
            .cloned()
            .collect();
        if values.is_empty() {
            values.push(options[0].value.clone());
        }
        for option in options.iter_mut() {
            option.selected = values.contains(&option.value);
        }
        let text = options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.text.as_str())
            .collect::<Vec<_>>()
            .join(" + ");
        CurrentSelection { text, values }
    } else {
        let surviving = previous
            .values
            .first()
            .filter(|value| options.iter().any(|o| &o.value == *value))
            .cloned();
        let value = surviving.unwrap_or_else(|| options[0].value.clone());
        for option in options.iter_mut() {
            option.selected = option.value == value;
        }
        let text = options
            .iter()
            .find(|o| o.selected)
            .map(|o| o.text.clone())
            .unwrap_or_default();
        CurrentSelection { text, values: vec![value] }
    }
}
