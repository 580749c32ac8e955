//! Typed view of a persisted project definition document.
//!
//! The form builder stores definitions as loosely shaped JSON. Parsing turns
//! them into a tree of [`Input`]s whose [`InputKind`] decides how each node is
//! expanded when the extra structure is built. Every input keeps its raw JSON
//! object so the global input map can hand it back untouched.

use crate::utils::error::{ExtraError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

pub const TYPE_GROUP: &str = "group";
pub const TYPE_BRANCH: &str = "branch";
pub const TYPE_LOCATION: &str = "location";

/// Key under which multiple-choice buckets store their ref order.
pub const ORDER_KEY: &str = "order";

pub const DEFAULT_MULTIPLE_CHOICE_TYPES: &[&str] = &[
    "radio",
    "checkbox",
    "dropdown",
    "searchsingle",
    "searchmultiple",
];

/// Type names that carry a `possible_answers` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputTypes {
    pub multiple_choice: Vec<String>,
}

impl Default for InputTypes {
    fn default() -> Self {
        Self {
            multiple_choice: DEFAULT_MULTIPLE_CHOICE_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

impl InputTypes {
    pub fn new<I, S>(multiple_choice: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            multiple_choice: multiple_choice.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_multiple_choice(&self, input_type: &str) -> bool {
        self.multiple_choice.iter().any(|t| t == input_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PossibleAnswer {
    pub answer_ref: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputKind {
    Location,
    MultipleChoice(Vec<PossibleAnswer>),
    Group(Vec<Input>),
    Branch(Vec<Input>),
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    pub input_ref: String,
    pub input_type: String,
    pub question: String,
    pub kind: InputKind,
    /// The input object exactly as it appeared in the definition.
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormNode {
    pub form_ref: String,
    pub name: String,
    pub slug: String,
    pub inputs: Vec<Input>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectNode {
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
    pub forms: Vec<FormNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDefinition {
    pub project: ProjectNode,
}

impl ProjectDefinition {
    pub fn from_json_str(content: &str) -> Result<Self> {
        Self::from_json_str_with(content, &InputTypes::default())
    }

    pub fn from_json_str_with(content: &str, types: &InputTypes) -> Result<Self> {
        let value: Value = serde_json::from_str(content)?;
        Self::parse(&value, types)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        Self::parse(value, &InputTypes::default())
    }

    pub fn parse(value: &Value, types: &InputTypes) -> Result<Self> {
        let root = as_object(value, "$")?;
        let project = root
            .get("project")
            .ok_or_else(|| ExtraError::missing("$", "project"))?;

        Ok(Self {
            project: parse_project(project, types)?,
        })
    }

    pub fn forms(&self) -> &[FormNode] {
        &self.project.forms
    }
}

impl FormNode {
    /// Number of inputs at every depth, counted the way the traversal visits them.
    pub fn input_count(&self) -> usize {
        self.inputs.iter().map(Input::node_count).sum()
    }
}

impl Input {
    pub fn members(&self) -> &[Input] {
        match &self.kind {
            InputKind::Group(members) | InputKind::Branch(members) => members,
            _ => &[],
        }
    }

    fn node_count(&self) -> usize {
        1 + self.members().iter().map(Input::node_count).sum::<usize>()
    }
}

fn parse_project(value: &Value, types: &InputTypes) -> Result<ProjectNode> {
    let path = "project";
    let obj = as_object(value, path)?;

    let forms = required(obj, path, "forms")?
        .as_array()
        .ok_or_else(|| ExtraError::invalid(path, "forms", "expected an array"))?
        .iter()
        .enumerate()
        .map(|(i, form)| parse_form(form, &format!("{}.forms[{}]", path, i), types))
        .collect::<Result<Vec<_>>>()?;

    Ok(ProjectNode {
        project_ref: required_str(obj, path, "ref")?,
        name: required_str(obj, path, "name")?,
        slug: file_safe_slug(obj, path)?,
        access: optional(obj, "access"),
        status: optional(obj, "status"),
        logo_url: optional(obj, "logo_url"),
        visibility: optional(obj, "visibility"),
        small_description: optional(obj, "small_description"),
        description: optional(obj, "description"),
        category: optional(obj, "category"),
        entries_limits: obj
            .get("entries_limits")
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())),
        forms,
    })
}

/// The project slug names the output file, so it must stay a single path segment.
fn file_safe_slug(obj: &Map<String, Value>, path: &str) -> Result<String> {
    let slug = required_str(obj, path, "slug")?;
    let reason = if slug.trim().is_empty() {
        "slug cannot be empty"
    } else if slug.contains(|c: char| matches!(c, '/' | '\\' | '\0')) || slug.contains("..") {
        "slug cannot contain path separators or '..'"
    } else {
        return Ok(slug);
    };
    Err(ExtraError::invalid(path, "slug", reason))
}

fn parse_form(value: &Value, path: &str, types: &InputTypes) -> Result<FormNode> {
    let obj = as_object(value, path)?;

    Ok(FormNode {
        form_ref: required_str(obj, path, "ref")?,
        name: required_str(obj, path, "name")?,
        slug: required_str(obj, path, "slug")?,
        inputs: parse_inputs(required(obj, path, "inputs")?, path, "inputs", types)?,
    })
}

fn parse_inputs(value: &Value, parent: &str, key: &str, types: &InputTypes) -> Result<Vec<Input>> {
    value
        .as_array()
        .ok_or_else(|| ExtraError::invalid(parent, key, "expected an array"))?
        .iter()
        .enumerate()
        .map(|(i, input)| parse_input(input, &format!("{}.{}[{}]", parent, key, i), types))
        .collect()
}

fn parse_input(value: &Value, path: &str, types: &InputTypes) -> Result<Input> {
    let obj = as_object(value, path)?;
    let input_ref = required_str(obj, path, "ref")?;
    let input_type = required_str(obj, path, "type")?;
    let question = obj
        .get("question")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    // Structural types win over the configurable multiple-choice list.
    let kind = match input_type.as_str() {
        TYPE_GROUP => InputKind::Group(parse_members(obj, path, TYPE_GROUP, types)?),
        TYPE_BRANCH => InputKind::Branch(parse_members(obj, path, TYPE_BRANCH, types)?),
        TYPE_LOCATION => InputKind::Location,
        t if types.is_multiple_choice(t) => {
            if input_ref == ORDER_KEY {
                return Err(ExtraError::invalid(
                    path,
                    "ref",
                    format!("'{}' is reserved in multiple choice lists", ORDER_KEY),
                ));
            }
            InputKind::MultipleChoice(parse_possible_answers(obj, path)?)
        }
        _ => InputKind::Other,
    };

    Ok(Input {
        input_ref,
        input_type,
        question,
        kind,
        data: value.clone(),
    })
}

/// Members live under the `group`/`branch` key; a plain `inputs` array is accepted as well.
fn parse_members(
    obj: &Map<String, Value>,
    path: &str,
    key: &str,
    types: &InputTypes,
) -> Result<Vec<Input>> {
    match obj.get(key).or_else(|| obj.get("inputs")) {
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(members) => parse_inputs(members, path, key, types),
    }
}

fn parse_possible_answers(obj: &Map<String, Value>, path: &str) -> Result<Vec<PossibleAnswer>> {
    let answers = match obj.get("possible_answers") {
        Some(Value::Null) | None => return Ok(Vec::new()),
        Some(value) => value
            .as_array()
            .ok_or_else(|| ExtraError::invalid(path, "possible_answers", "expected an array"))?,
    };

    let mut seen = HashSet::new();
    answers
        .iter()
        .enumerate()
        .map(|(i, answer)| {
            let answer_path = format!("{}.possible_answers[{}]", path, i);
            let answer_obj = as_object(answer, &answer_path)?;
            let answer_ref = required_str(answer_obj, &answer_path, "answer_ref")?;
            if !seen.insert(answer_ref.clone()) {
                return Err(ExtraError::invalid(
                    answer_path,
                    "answer_ref",
                    format!("duplicate answer_ref '{}'", answer_ref),
                ));
            }
            Ok(PossibleAnswer {
                answer_ref,
                answer: required_str(answer_obj, &answer_path, "answer")?,
            })
        })
        .collect()
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| ExtraError::invalid(path, "$", "expected an object"))
}

fn required<'a>(obj: &'a Map<String, Value>, path: &str, key: &str) -> Result<&'a Value> {
    obj.get(key).ok_or_else(|| ExtraError::missing(path, key))
}

fn required_str(obj: &Map<String, Value>, path: &str, key: &str) -> Result<String> {
    required(obj, path, key)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ExtraError::invalid(path, key, "expected a string"))
}

fn optional(obj: &Map<String, Value>, key: &str) -> Value {
    obj.get(key).cloned().unwrap_or(Value::Null)
}
