pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;
pub use config::RunConfig;

pub use adapters::LocalStorage;
pub use core::{
    engine::ExtraEngine,
    extra::{generate_extra_structure, BranchGroupMembers, ExtraOptions, ProjectExtraService},
    integrity::{check_integrity, summarize, IntegrityReport},
    pipeline::ExtraPipeline,
};
pub use domain::definition::{InputTypes, ProjectDefinition};
pub use domain::model::ProjectExtra;
pub use utils::error::{ExtraError, Result};
