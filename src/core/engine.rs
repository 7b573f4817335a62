use crate::core::{Pipeline, ProtocolSummary};
use crate::utils::error::Result;

pub struct ExportEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> ExportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    /// Extract, parse and write the module. Returns the written path.
    pub async fn run(&self) -> Result<String> {
        tracing::info!("Extracting protocol source...");
        let source = self.pipeline.extract().await?;
        tracing::info!("Read {} ({} bytes)", source.name, source.text.len());

        tracing::info!("Parsing...");
        let document = self.pipeline.transform(source).await?;
        tracing::info!("Parsed {}", document.summary());

        tracing::info!("Writing module...");
        let output_path = self.pipeline.load(document).await?;
        tracing::info!("Output saved to: {}", output_path);

        Ok(output_path)
    }

    /// Extract and parse without writing anything.
    pub async fn describe(&self) -> Result<ProtocolSummary> {
        let source = self.pipeline.extract().await?;
        let document = self.pipeline.transform(source).await?;
        Ok(document.summary())
    }
}
