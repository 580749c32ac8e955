#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::extra::ExtraOptions;
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use std::path::Path;
use toml_config::TomlConfig;

pub const DEFAULT_INPUT_PATH: &str = ".";
pub const DEFAULT_OUTPUT_PATH: &str = "./output";

/// Settings for one generate run, after TOML and command line are merged.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory the definitions are read from.
    pub input_path: String,
    pub input_files: Vec<String>,
    pub output_path: String,
    pub options: ExtraOptions,
    pub bundle_filename: Option<String>,
    pub pretty: bool,
    pub strict: bool,
    pub monitor: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_path: DEFAULT_INPUT_PATH.to_string(),
            input_files: Vec::new(),
            output_path: DEFAULT_OUTPUT_PATH.to_string(),
            options: ExtraOptions::default(),
            bundle_filename: None,
            pretty: true,
            strict: true,
            monitor: false,
        }
    }
}

impl RunConfig {
    pub fn from_toml(config: &TomlConfig) -> Self {
        let mut run = Self {
            output_path: config
                .output_path()
                .unwrap_or(DEFAULT_OUTPUT_PATH)
                .to_string(),
            options: config.extra_options(),
            bundle_filename: config.bundle_filename(),
            pretty: config.pretty(),
            strict: config.strict(),
            monitor: config.monitoring_enabled(),
            ..Self::default()
        };
        if let Some(input) = config.input_path() {
            run.set_input(input);
        }
        run
    }

    /// A file input narrows the run to that file; a directory input scans it.
    pub fn set_input(&mut self, path: &str) {
        let candidate = Path::new(path);
        if candidate.is_file() {
            self.input_path = candidate
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| DEFAULT_INPUT_PATH.to_string());
            self.input_files = candidate
                .file_name()
                .map(|name| vec![name.to_string_lossy().into_owned()])
                .unwrap_or_default();
        } else {
            self.input_path = path.to_string();
            self.input_files.clear();
        }
    }
}

impl ConfigProvider for RunConfig {
    fn input_files(&self) -> &[String] {
        &self.input_files
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn options(&self) -> &ExtraOptions {
        &self.options
    }

    fn bundle_filename(&self) -> Option<&str> {
        self.bundle_filename.as_deref()
    }

    fn pretty(&self) -> bool {
        self.pretty
    }

    fn strict(&self) -> bool {
        self.strict
    }
}

impl Validate for RunConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("input", &self.input_path)?;
        validation::validate_path("output", &self.output_path)?;
        validation::validate_non_empty_list(
            "structure.multiple_choice_types",
            &self.options.input_types.multiple_choice,
        )?;
        if let Some(filename) = &self.bundle_filename {
            validation::validate_extension("bundle_filename", filename, "zip")?;
        }
        Ok(())
    }
}
