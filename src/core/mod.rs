pub mod engine;
pub mod extra;
pub mod integrity;
pub mod pipeline;

pub use crate::domain::model::{GeneratedExtra, ProjectExtra, SourceDefinition};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
