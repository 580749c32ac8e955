use crate::core::integrity::{FormSummary, IntegrityReport};
use crate::domain::definition::ProjectDefinition;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const FORM_TYPE_HIERARCHY: &str = "hierarchy";

/// Derived lookup structure persisted next to a project definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectExtra {
    pub forms: IndexMap<String, FormExtra>,
    pub inputs: IndexMap<String, InputExtra>,
    pub project: ProjectSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputExtra {
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormExtra {
    pub group: IndexMap<String, Vec<String>>,
    pub lists: FormLists,
    pub branch: IndexMap<String, Vec<String>>,
    pub inputs: Vec<String>,
    pub details: FormDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormLists {
    pub location_inputs: Vec<LocationInput>,
    pub multiple_choice_inputs: MultipleChoiceInputs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationInput {
    pub question: String,
    pub input_ref: String,
    pub branch_ref: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultipleChoiceInputs {
    pub form: MultipleChoiceBucket,
    pub branch: MultipleChoiceBucket,
}

/// Serialized as `{"order": [...], "<ref>": {...}, ...}`. Parsing rejects a
/// multiple-choice ref named `order`, so the keys cannot collide.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultipleChoiceBucket {
    pub order: Vec<String>,
    #[serde(flatten)]
    pub inputs: IndexMap<String, MultipleChoiceInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultipleChoiceInput {
    pub question: String,
    pub possible_answers: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDetails {
    #[serde(rename = "ref")]
    pub form_ref: String,
    pub name: String,
    pub slug: String,
    #[serde(rename = "type")]
    pub form_type: String,
    pub has_location: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSection {
    pub details: ProjectDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDetails {
    #[serde(rename = "ref")]
    pub project_ref: String,
    pub name: String,
    pub slug: String,
    pub access: Value,
    pub status: Value,
    pub logo_url: Value,
    pub visibility: Value,
    pub small_description: Value,
    pub description: Value,
    pub category: Value,
    pub entries_limits: Value,
}

/// A parsed definition and the file it came from.
#[derive(Debug, Clone)]
pub struct SourceDefinition {
    pub source: String,
    pub definition: ProjectDefinition,
}

#[derive(Debug, Clone)]
pub struct GeneratedExtra {
    pub source: String,
    pub extra: ProjectExtra,
    pub summary: Vec<FormSummary>,
    pub report: IntegrityReport,
}

impl GeneratedExtra {
    /// `<project slug>.extra.json`
    pub fn output_filename(&self) -> String {
        format!("{}.extra.json", self.extra.details().slug)
    }
}

impl MultipleChoiceBucket {
    /// Keeps `order` free of repeats; a repeated ref replaces the stored entry.
    pub fn record(&mut self, input_ref: &str, entry: MultipleChoiceInput) {
        if self.inputs.insert(input_ref.to_string(), entry).is_none() {
            self.order.push(input_ref.to_string());
        }
    }

    pub fn get(&self, input_ref: &str) -> Option<&MultipleChoiceInput> {
        self.inputs.get(input_ref)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl FormExtra {
    pub fn has_location(&self) -> bool {
        self.details.has_location
    }

    pub fn branch_refs(&self) -> impl Iterator<Item = &str> {
        self.branch.keys().map(String::as_str)
    }

    pub fn multiple_choice(&self, input_ref: &str) -> Option<&MultipleChoiceInput> {
        let lists = &self.lists.multiple_choice_inputs;
        lists.form.get(input_ref).or_else(|| lists.branch.get(input_ref))
    }
}

impl ProjectExtra {
    pub fn form(&self, form_ref: &str) -> Option<&FormExtra> {
        self.forms.get(form_ref)
    }

    pub fn form_refs(&self) -> impl Iterator<Item = &str> {
        self.forms.keys().map(String::as_str)
    }

    pub fn input(&self, input_ref: &str) -> Option<&Value> {
        self.inputs.get(input_ref).map(|extra| &extra.data)
    }

    pub fn details(&self) -> &ProjectDetails {
        &self.project.details
    }

    /// Branch input refs of a form, in definition order.
    pub fn branch_refs(&self, form_ref: &str) -> Vec<&str> {
        self.form(form_ref)
            .map(|form| form.branch_refs().collect())
            .unwrap_or_default()
    }

    /// Branch that directly owns `input_ref` within the form, if any.
    pub fn branch_of(&self, form_ref: &str, input_ref: &str) -> Option<&str> {
        self.form(form_ref)?
            .branch
            .iter()
            .find(|(_, members)| members.iter().any(|m| m == input_ref))
            .map(|(branch_ref, _)| branch_ref.as_str())
    }

    pub fn is_valid_answer(&self, input_ref: &str, answer_ref: &str) -> bool {
        self.forms
            .values()
            .filter_map(|form| form.multiple_choice(input_ref))
            .any(|mc| mc.possible_answers.contains_key(answer_ref))
    }
}
