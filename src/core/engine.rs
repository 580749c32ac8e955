use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct ExtraEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> ExtraEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    /// Runs extract, transform and load; returns every path written.
    pub async fn run(&self) -> Result<Vec<String>> {
        tracing::info!("Starting project extra generation");
        self.monitor.log_stats("Start");

        tracing::info!("Reading project definitions...");
        let definitions = self.pipeline.extract().await?;
        tracing::info!("Read {} definition(s)", definitions.len());
        self.monitor.log_stats("Extract");

        tracing::info!("Building extra structures...");
        let generated = self.pipeline.transform(definitions).await?;
        let forms: usize = generated.iter().map(|g| g.extra.forms.len()).sum();
        tracing::info!("Built {} structure(s) covering {} form(s)", generated.len(), forms);
        self.monitor.log_stats("Transform");

        tracing::info!("Writing output...");
        let written = self.pipeline.load(generated).await?;
        for path in &written {
            tracing::info!("Output saved to: {}", path);
        }
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(written)
    }
}
