//! Builds the project "extra" structure: per-form lookup lists derived from a
//! project definition, plus a global map of every input by ref.
//!
//! The build is a pure function of its arguments. Accumulators live on the
//! stack of a single call and the global input map is threaded through the
//! traversal, so calls never observe each other's state.

use crate::domain::definition::{FormNode, Input, InputKind, InputTypes, ProjectDefinition};
use crate::domain::model::{
    FormDetails, FormExtra, FormLists, InputExtra, LocationInput, MultipleChoiceBucket,
    MultipleChoiceInput, MultipleChoiceInputs, ProjectDetails, ProjectExtra, ProjectSection,
    FORM_TYPE_HIERARCHY,
};
use crate::utils::error::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How member lists of sibling groups inside one branch are recorded in `group`.
///
/// Long-standing producers record each branch group with the members of every
/// earlier sibling group in that branch prepended (`Cumulative`). Whether that
/// is relied upon downstream is unresolved, so both behaviours are available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchGroupMembers {
    #[default]
    Cumulative,
    PerGroup,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraOptions {
    pub input_types: InputTypes,
    pub branch_group_members: BranchGroupMembers,
}

/// Where an input sits: directly in the form (or a form-level group) or inside a branch.
#[derive(Debug, Clone, Copy)]
enum Scope<'a> {
    Form,
    Branch(&'a str),
}

type InputRegistry = IndexMap<String, InputExtra>;

#[derive(Default)]
struct FormAccumulator {
    input_refs: Vec<String>,
    groups: IndexMap<String, Vec<String>>,
    branches: IndexMap<String, Vec<String>>,
    location_inputs: Vec<LocationInput>,
    form_choices: MultipleChoiceBucket,
    branch_choices: MultipleChoiceBucket,
}

impl FormAccumulator {
    /// Bookkeeping shared by every visited input, whatever its depth.
    fn record(&mut self, input: &Input, scope: Scope<'_>, registry: &mut InputRegistry) {
        registry.insert(
            input.input_ref.clone(),
            InputExtra {
                data: input.data.clone(),
            },
        );
        self.input_refs.push(input.input_ref.clone());

        match &input.kind {
            InputKind::Location => self.location_inputs.push(LocationInput {
                question: input.question.clone(),
                input_ref: input.input_ref.clone(),
                branch_ref: match scope {
                    Scope::Form => None,
                    Scope::Branch(branch_ref) => Some(branch_ref.to_string()),
                },
            }),
            InputKind::MultipleChoice(answers) => {
                let entry = MultipleChoiceInput {
                    question: input.question.clone(),
                    possible_answers: answers
                        .iter()
                        .map(|a| (a.answer_ref.clone(), a.answer.clone()))
                        .collect(),
                };
                match scope {
                    Scope::Form => self.form_choices.record(&input.input_ref, entry),
                    Scope::Branch(_) => self.branch_choices.record(&input.input_ref, entry),
                }
            }
            InputKind::Group(_) | InputKind::Branch(_) | InputKind::Other => {}
        }
    }

    fn visit_top_level(
        &mut self,
        input: &Input,
        options: &ExtraOptions,
        registry: &mut InputRegistry,
    ) {
        self.record(input, Scope::Form, registry);

        match &input.kind {
            InputKind::Group(members) => {
                let member_refs = members
                    .iter()
                    .map(|member| {
                        self.record(member, Scope::Form, registry);
                        member.input_ref.clone()
                    })
                    .collect();
                self.groups.insert(input.input_ref.clone(), member_refs);
            }
            InputKind::Branch(members) => {
                let member_refs = self.visit_branch(&input.input_ref, members, options, registry);
                self.branches.insert(input.input_ref.clone(), member_refs);
            }
            InputKind::Location | InputKind::MultipleChoice(_) | InputKind::Other => {}
        }
    }

    /// Returns the branch's direct member refs. Groups inside the branch are
    /// expanded one level and recorded in `groups`.
    fn visit_branch(
        &mut self,
        branch_ref: &str,
        members: &[Input],
        options: &ExtraOptions,
        registry: &mut InputRegistry,
    ) -> Vec<String> {
        let scope = Scope::Branch(branch_ref);
        let mut member_refs = Vec::with_capacity(members.len());
        let mut group_refs: Vec<String> = Vec::new();

        for member in members {
            self.record(member, scope, registry);
            member_refs.push(member.input_ref.clone());

            if let InputKind::Group(group_members) = &member.kind {
                if options.branch_group_members == BranchGroupMembers::PerGroup {
                    group_refs.clear();
                }
                for group_member in group_members {
                    self.record(group_member, scope, registry);
                    group_refs.push(group_member.input_ref.clone());
                }
                self.groups
                    .insert(member.input_ref.clone(), group_refs.clone());
            }
        }

        member_refs
    }

    fn finish(self, form: &FormNode) -> FormExtra {
        let has_location = !self.location_inputs.is_empty();
        FormExtra {
            group: self.groups,
            lists: FormLists {
                location_inputs: self.location_inputs,
                multiple_choice_inputs: MultipleChoiceInputs {
                    form: self.form_choices,
                    branch: self.branch_choices,
                },
            },
            branch: self.branches,
            inputs: self.input_refs,
            details: FormDetails {
                form_ref: form.form_ref.clone(),
                name: form.name.clone(),
                slug: form.slug.clone(),
                form_type: FORM_TYPE_HIERARCHY.to_string(),
                has_location,
            },
        }
    }
}

fn build_form(form: &FormNode, options: &ExtraOptions, registry: &mut InputRegistry) -> FormExtra {
    let mut acc = FormAccumulator::default();
    for input in &form.inputs {
        acc.visit_top_level(input, options, registry);
    }

    let extra = acc.finish(form);
    tracing::debug!(
        form_ref = %form.form_ref,
        inputs = extra.inputs.len(),
        groups = extra.group.len(),
        branches = extra.branch.len(),
        locations = extra.lists.location_inputs.len(),
        "Built form extra"
    );
    extra
}

/// Derives the extra structure for `definition`. Deterministic: equal inputs
/// give equal outputs, down to map ordering.
pub fn generate_extra_structure(
    definition: &ProjectDefinition,
    options: &ExtraOptions,
) -> ProjectExtra {
    let mut registry = InputRegistry::new();
    let forms = definition
        .forms()
        .iter()
        .map(|form| (form.form_ref.clone(), build_form(form, options, &mut registry)))
        .collect();

    let project = &definition.project;
    ProjectExtra {
        forms,
        inputs: registry,
        project: ProjectSection {
            details: ProjectDetails {
                project_ref: project.project_ref.clone(),
                name: project.name.clone(),
                slug: project.slug.clone(),
                access: project.access.clone(),
                status: project.status.clone(),
                logo_url: project.logo_url.clone(),
                visibility: project.visibility.clone(),
                small_description: project.small_description.clone(),
                description: project.description.clone(),
                category: project.category.clone(),
                entries_limits: project.entries_limits.clone(),
            },
        },
    }
}

/// Holds only immutable options; share freely across threads.
#[derive(Debug, Clone, Default)]
pub struct ProjectExtraService {
    options: ExtraOptions,
}

impl ProjectExtraService {
    pub fn new(options: ExtraOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtraOptions {
        &self.options
    }

    pub fn generate(&self, definition: &ProjectDefinition) -> ProjectExtra {
        generate_extra_structure(definition, &self.options)
    }

    /// Parses a raw definition document with this service's input types, then builds.
    pub fn generate_from_value(&self, value: &Value) -> Result<ProjectExtra> {
        let definition = ProjectDefinition::parse(value, &self.options.input_types)?;
        Ok(self.generate(&definition))
    }
}
