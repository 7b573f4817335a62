use crate::domain::model::{PdlSource, ProtocolDocument, SourceDocument};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn source(&self) -> &PdlSource;
    fn output_path(&self) -> &str;
    fn map_binary_to_string(&self) -> bool;
    fn request_timeout(&self) -> Duration;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<SourceDocument>;
    async fn transform(&self, source: SourceDocument) -> Result<ProtocolDocument>;
    async fn load(&self, document: ProtocolDocument) -> Result<String>;
}
