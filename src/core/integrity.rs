//! Reference checks and per-form counts over a built (or persisted) extra structure.

use crate::domain::model::{FormExtra, MultipleChoiceBucket, ProjectExtra};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    /// A list names a ref that is missing from the global input map.
    UnknownRef { list: String, input_ref: String },
    /// A multiple-choice bucket's `order` disagrees with its keys.
    OrderMismatch { bucket: String },
    /// `details.has_location` disagrees with `location_inputs`.
    HasLocationMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub form_ref: String,
    #[serde(flatten)]
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ViolationKind::UnknownRef { list, input_ref } => write!(
                f,
                "form {}: {} references unknown input '{}'",
                self.form_ref, list, input_ref
            ),
            ViolationKind::OrderMismatch { bucket } => write!(
                f,
                "form {}: multiple choice '{}' order does not match its entries",
                self.form_ref, bucket
            ),
            ViolationKind::HasLocationMismatch => write!(
                f,
                "form {}: has_location does not match location_inputs",
                self.form_ref
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub violations: Vec<Violation>,
}

impl IntegrityReport {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn first_form(&self) -> Option<&str> {
        self.violations.first().map(|v| v.form_ref.as_str())
    }
}

pub fn check_integrity(extra: &ProjectExtra) -> IntegrityReport {
    let mut report = IntegrityReport::default();
    for (form_ref, form) in &extra.forms {
        check_form(extra, form_ref, form, &mut report.violations);
    }
    report
}

fn check_refs<'a>(
    extra: &ProjectExtra,
    form_ref: &str,
    list: &str,
    refs: impl IntoIterator<Item = &'a String>,
    out: &mut Vec<Violation>,
) {
    for input_ref in refs {
        if !extra.inputs.contains_key(input_ref) {
            out.push(Violation {
                form_ref: form_ref.to_string(),
                kind: ViolationKind::UnknownRef {
                    list: list.to_string(),
                    input_ref: input_ref.clone(),
                },
            });
        }
    }
}

fn check_form(extra: &ProjectExtra, form_ref: &str, form: &FormExtra, out: &mut Vec<Violation>) {
    check_refs(extra, form_ref, "inputs", &form.inputs, out);
    for (group_ref, members) in &form.group {
        let list = format!("group.{}", group_ref);
        check_refs(extra, form_ref, &list, std::iter::once(group_ref).chain(members), out);
    }
    for (branch_ref, members) in &form.branch {
        let list = format!("branch.{}", branch_ref);
        check_refs(extra, form_ref, &list, std::iter::once(branch_ref).chain(members), out);
    }
    check_refs(
        extra,
        form_ref,
        "lists.location_inputs",
        form.lists.location_inputs.iter().map(|l| &l.input_ref),
        out,
    );

    let choices = &form.lists.multiple_choice_inputs;
    for (name, bucket) in [("form", &choices.form), ("branch", &choices.branch)] {
        let list = format!("lists.multiple_choice_inputs.{}.order", name);
        check_refs(extra, form_ref, &list, &bucket.order, out);
        if !order_matches(bucket) {
            out.push(Violation {
                form_ref: form_ref.to_string(),
                kind: ViolationKind::OrderMismatch {
                    bucket: name.to_string(),
                },
            });
        }
    }

    if form.details.has_location == form.lists.location_inputs.is_empty() {
        out.push(Violation {
            form_ref: form_ref.to_string(),
            kind: ViolationKind::HasLocationMismatch,
        });
    }
}

fn order_matches(bucket: &MultipleChoiceBucket) -> bool {
    let order: HashSet<&String> = bucket.order.iter().collect();
    bucket.order.len() == bucket.inputs.len()
        && order.len() == bucket.order.len()
        && bucket.inputs.keys().all(|k| order.contains(k))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormSummary {
    pub form_ref: String,
    pub name: String,
    pub inputs: usize,
    pub groups: usize,
    pub branches: usize,
    pub location_inputs: usize,
    pub form_multiple_choice: usize,
    pub branch_multiple_choice: usize,
}

impl fmt::Display for FormSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {} inputs, {} groups, {} branches, {} locations, {}/{} multiple choice (form/branch)",
            self.name,
            self.form_ref,
            self.inputs,
            self.groups,
            self.branches,
            self.location_inputs,
            self.form_multiple_choice,
            self.branch_multiple_choice
        )
    }
}

pub fn summarize(extra: &ProjectExtra) -> Vec<FormSummary> {
    extra
        .forms
        .iter()
        .map(|(form_ref, form)| FormSummary {
            form_ref: form_ref.clone(),
            name: form.details.name.clone(),
            inputs: form.inputs.len(),
            groups: form.group.len(),
            branches: form.branch.len(),
            location_inputs: form.lists.location_inputs.len(),
            form_multiple_choice: form.lists.multiple_choice_inputs.form.len(),
            branch_multiple_choice: form.lists.multiple_choice_inputs.branch.len(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::extra::{generate_extra_structure, ExtraOptions};
    use crate::domain::definition::ProjectDefinition;
    use serde_json::json;

    fn sample() -> ProjectExtra {
        let def = ProjectDefinition::from_value(&json!({
            "project": {
                "ref": "p", "name": "P", "slug": "p",
                "forms": [{ "ref": "f", "name": "Form", "slug": "form", "inputs": [
                    { "ref": "l", "type": "location", "question": "Where" },
                    { "ref": "m", "type": "radio", "question": "Pick", "possible_answers": [
                        { "answer_ref": "a", "answer": "A" }
                    ]},
                    { "ref": "B", "type": "branch", "question": "B", "branch": [
                        { "ref": "bm", "type": "dropdown", "question": "D" }
                    ]}
                ]}]
            }
        }))
        .unwrap();
        generate_extra_structure(&def, &ExtraOptions::default())
    }

    #[test]
    fn test_generated_structure_is_consistent() {
        let report = check_integrity(&sample());
        assert!(report.is_ok(), "{:?}", report);
    }

    #[test]
    fn test_detects_unknown_ref() {
        let mut extra = sample();
        extra.inputs.shift_remove("bm");

        let report = check_integrity(&extra);
        assert!(!report.is_ok());
        assert!(report.violations.iter().any(|v| matches!(
            &v.kind,
            ViolationKind::UnknownRef { list, input_ref } if list == "branch.B" && input_ref == "bm"
        )));
        assert_eq!(report.first_form(), Some("f"));
    }

    #[test]
    fn test_detects_order_mismatch_and_has_location() {
        let mut extra = sample();
        let form = extra.forms.get_mut("f").unwrap();
        form.lists.multiple_choice_inputs.form.order.push("m".to_string());
        form.details.has_location = false;

        let kinds: Vec<_> = check_integrity(&extra)
            .violations
            .into_iter()
            .map(|v| v.kind)
            .collect();
        assert!(kinds.contains(&ViolationKind::OrderMismatch {
            bucket: "form".to_string()
        }));
        assert!(kinds.contains(&ViolationKind::HasLocationMismatch));
    }

    #[test]
    fn test_summarize_counts() {
        let summary = summarize(&sample());
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].inputs, 4);
        assert_eq!(summary[0].branches, 1);
        assert_eq!(summary[0].location_inputs, 1);
        assert_eq!(summary[0].form_multiple_choice, 1);
        assert_eq!(summary[0].branch_multiple_choice, 1);
        assert!(summary[0].to_string().starts_with("Form (f): 4 inputs"));
    }
}
