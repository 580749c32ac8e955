use crate::config::toml_config::DEFAULT_BUNDLE_FILENAME;
use crate::config::RunConfig;
use crate::core::extra::BranchGroupMembers;
use crate::domain::definition::InputTypes;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(name = "project-extra")]
#[command(about = "Builds project extra lookup structures from project definitions")]
pub struct CliConfig {
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Generate extra structures for every definition in the input
    Generate(GenerateArgs),
    /// Check persisted extra structures for dangling references
    Check(CheckArgs),
    /// Print the per-form summary of one definition
    Inspect(InspectArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupMembersArg {
    Cumulative,
    PerGroup,
}

impl From<GroupMembersArg> for BranchGroupMembers {
    fn from(arg: GroupMembersArg) -> Self {
        match arg {
            GroupMembersArg::Cumulative => BranchGroupMembers::Cumulative,
            GroupMembersArg::PerGroup => BranchGroupMembers::PerGroup,
        }
    }
}

/// Flags shared by commands that build structures.
#[derive(Debug, Clone, Default, Args)]
pub struct StructureArgs {
    /// Input types treated as multiple choice (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub multiple_choice_types: Vec<String>,

    /// How member lists of sibling groups inside a branch are recorded
    #[arg(long, value_enum)]
    pub branch_group_members: Option<GroupMembersArg>,
}

#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    /// Definition file or directory of definition files
    #[arg(short, long)]
    pub input: Option<String>,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Also write every structure into a ZIP bundle
    #[arg(long)]
    pub bundle: bool,

    #[arg(long)]
    pub bundle_filename: Option<String>,

    /// Write compact JSON
    #[arg(long)]
    pub compact: bool,

    /// Write output even when integrity checks fail
    #[arg(long)]
    pub no_strict: bool,

    /// Log process CPU and memory per phase
    #[arg(long)]
    pub monitor: bool,

    /// Parse and summarize without writing anything
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub structure: StructureArgs,
}

#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    /// Extra structure file or directory of `*.extra.json` files
    pub path: String,
}

#[derive(Debug, Clone, Args)]
pub struct InspectArgs {
    /// Definition file
    pub definition: String,

    /// Print the full extra structure as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub structure: StructureArgs,
}

impl StructureArgs {
    pub fn apply(&self, config: &mut RunConfig) {
        if !self.multiple_choice_types.is_empty() {
            config.options.input_types = InputTypes::new(self.multiple_choice_types.clone());
        }
        if let Some(mode) = self.branch_group_members {
            config.options.branch_group_members = mode.into();
        }
    }
}

impl GenerateArgs {
    /// Command line flags win over values loaded from TOML.
    pub fn apply(&self, config: &mut RunConfig) {
        if let Some(input) = &self.input {
            config.set_input(input);
        }
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if let Some(filename) = &self.bundle_filename {
            config.bundle_filename = Some(filename.clone());
        } else if self.bundle && config.bundle_filename.is_none() {
            config.bundle_filename = Some(DEFAULT_BUNDLE_FILENAME.to_string());
        }
        if self.compact {
            config.pretty = false;
        }
        if self.no_strict {
            config.strict = false;
        }
        if self.monitor {
            config.monitor = true;
        }
        self.structure.apply(config);
    }
}
