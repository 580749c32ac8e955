use crate::core::extra::ExtraOptions;
use crate::domain::model::{GeneratedExtra, SourceDefinition};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Relative paths of files directly under `dir` with the given extension, sorted.
    fn list_files(
        &self,
        dir: &str,
        extension: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    /// Explicit definition files; empty means every definition in the input directory.
    fn input_files(&self) -> &[String];
    fn output_path(&self) -> &str;
    fn options(&self) -> &ExtraOptions;
    fn bundle_filename(&self) -> Option<&str>;
    fn pretty(&self) -> bool;
    fn strict(&self) -> bool;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<SourceDefinition>>;
    async fn transform(&self, data: Vec<SourceDefinition>) -> Result<Vec<GeneratedExtra>>;
    async fn load(&self, result: Vec<GeneratedExtra>) -> Result<Vec<String>>;
}
