use crate::core::extra::{BranchGroupMembers, ExtraOptions};
use crate::domain::definition::InputTypes;
use crate::utils::error::{ExtraError, Result};
use crate::utils::validation::{self, Validate};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_BUNDLE_FILENAME: &str = "project-extra.zip";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub structure: Option<StructureConfig>,
    pub input: Option<InputConfig>,
    pub output: Option<OutputConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructureConfig {
    pub multiple_choice_types: Option<Vec<String>>,
    pub branch_group_members: Option<BranchGroupMembers>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: Option<String>,
    pub bundle: Option<bool>,
    pub bundle_filename: Option<String>,
    pub pretty: Option<bool>,
    pub strict: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ExtraError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ExtraError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ExtraError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.into_owned())
    }

    pub fn extra_options(&self) -> ExtraOptions {
        let structure = self.structure.clone().unwrap_or_default();
        ExtraOptions {
            input_types: structure
                .multiple_choice_types
                .map(InputTypes::new)
                .unwrap_or_default(),
            branch_group_members: structure.branch_group_members.unwrap_or_default(),
        }
    }

    pub fn input_path(&self) -> Option<&str> {
        self.input.as_ref()?.path.as_deref()
    }

    pub fn output_path(&self) -> Option<&str> {
        self.output.as_ref()?.path.as_deref()
    }

    /// Bundle file name when bundling is switched on.
    pub fn bundle_filename(&self) -> Option<String> {
        let output = self.output.as_ref()?;
        if !output.bundle.unwrap_or(false) {
            return None;
        }
        Some(
            output
                .bundle_filename
                .clone()
                .unwrap_or_else(|| DEFAULT_BUNDLE_FILENAME.to_string()),
        )
    }

    pub fn pretty(&self) -> bool {
        self.output.as_ref().and_then(|o| o.pretty).unwrap_or(true)
    }

    pub fn strict(&self) -> bool {
        self.output.as_ref().and_then(|o| o.strict).unwrap_or(true)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        if let Some(types) = self
            .structure
            .as_ref()
            .and_then(|s| s.multiple_choice_types.as_ref())
        {
            validation::validate_non_empty_list("structure.multiple_choice_types", types)?;
        }
        if let Some(path) = self.input_path() {
            validation::validate_path("input.path", path)?;
        }
        if let Some(path) = self.output_path() {
            validation::validate_path("output.path", path)?;
        }
        if let Some(filename) = self.bundle_filename() {
            validation::validate_extension("output.bundle_filename", &filename, "zip")?;
        }
        Ok(())
    }
}
