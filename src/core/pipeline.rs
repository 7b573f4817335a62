use crate::core::module_writer::render_module;
use crate::core::pdl::load_protocol;
use crate::core::{
    ConfigProvider, PdlSource, Pipeline, ProtocolDocument, SourceDocument, Storage,
};
use crate::utils::error::{ExportError, Result};
use reqwest::Client;
use std::path::Path;
use url::Url;

pub struct ExportPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    client: Client,
}

impl<S: Storage, C: ConfigProvider> ExportPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            storage,
            config,
            client,
        })
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        tracing::debug!("Making request to: {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        tracing::debug!("Response status: {}", status);
        if !status.is_success() {
            return Err(ExportError::HttpStatusError {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Decoded strictly so a bad byte fails instead of becoming U+FFFD.
        let bytes = response.bytes().await?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}

/// File name used to choose between the PDL parser and plain JSON.
fn source_name(source: &PdlSource) -> String {
    match source {
        PdlSource::File(path) => Path::new(path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone()),
        PdlSource::Url(raw) => Url::parse(raw)
            .ok()
            .and_then(|url| {
                url.path_segments()
                    .and_then(|mut segments| segments.next_back().map(str::to_string))
            })
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| raw.clone()),
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ExportPipeline<S, C> {
    async fn extract(&self) -> Result<SourceDocument> {
        let source = self.config.source();
        let text = match source {
            PdlSource::File(path) => {
                tracing::debug!("Reading PDL from {}", path);
                String::from_utf8(self.storage.read_file(path).await?)?
            }
            PdlSource::Url(url) => self.fetch(url).await?,
        };

        tracing::debug!("Read {} bytes from {}", text.len(), source);
        Ok(SourceDocument {
            name: source_name(source),
            text,
        })
    }

    async fn transform(&self, source: SourceDocument) -> Result<ProtocolDocument> {
        load_protocol(&source.text, &source.name, self.config.map_binary_to_string())
    }

    async fn load(&self, document: ProtocolDocument) -> Result<String> {
        let module = render_module(&document)?;

        tracing::debug!(
            "Writing module ({} bytes) to {}",
            module.len(),
            self.config.output_path()
        );
        let written = self
            .storage
            .write_file(self.config.output_path(), module.as_bytes())
            .await?;

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::module_writer::parse_module;
    use httpmock::prelude::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn put_file(&self, path: &str, data: &str) {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.as_bytes().to_vec());
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                ExportError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<String> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(path.to_string())
        }
    }

    struct MockConfig {
        source: PdlSource,
    }

    impl ConfigProvider for MockConfig {
        fn source(&self) -> &PdlSource {
            &self.source
        }

        fn output_path(&self) -> &str {
            "out/custom.ts"
        }

        fn map_binary_to_string(&self) -> bool {
            true
        }

        fn request_timeout(&self) -> Duration {
            Duration::from_secs(5)
        }
    }

    const SAMPLE: &str = "\
version
  major 1
  minor 0

domain NodeTracing
  type TraceConfig extends object
    properties
      array of string includedCategories
  command start
    parameters
      TraceConfig traceConfig
  event dataCollected
    parameters
      array of object value
      binary payload
";

    #[test]
    fn test_source_name() {
        assert_eq!(
            source_name(&PdlSource::File("src/adapter/cdpProxy.pdl".to_string())),
            "cdpProxy.pdl"
        );
        assert_eq!(
            source_name(&PdlSource::Url(
                "https://raw.githubusercontent.com/nodejs/node/master/src/inspector/node_protocol.pdl"
                    .to_string()
            )),
            "node_protocol.pdl"
        );
        assert_eq!(
            source_name(&PdlSource::Url("https://example.com/".to_string())),
            "https://example.com/"
        );
    }

    #[tokio::test]
    async fn test_pipeline_from_file() {
        let storage = MockStorage::new();
        storage.put_file("proto/custom.pdl", SAMPLE).await;
        let config = MockConfig {
            source: PdlSource::File("proto/custom.pdl".to_string()),
        };
        let pipeline = ExportPipeline::new(storage.clone(), config).unwrap();

        let document = pipeline.extract().await.unwrap();
        assert_eq!(document.name, "custom.pdl");

        let protocol = match pipeline.transform(document).await.unwrap() {
            ProtocolDocument::Pdl(protocol) => protocol,
            other => panic!("expected a parsed protocol, got {other:?}"),
        };
        let events = protocol.domains[0].events.as_ref().unwrap();
        let payload = &events[0].parameters.as_ref().unwrap()[1];
        assert_eq!(
            serde_json::to_value(payload).unwrap(),
            serde_json::json!({"name": "payload", "type": "string"})
        );

        let path = pipeline
            .load(ProtocolDocument::Pdl(protocol.clone()))
            .await
            .unwrap();
        assert_eq!(path, "out/custom.ts");

        let written = storage.get_file("out/custom.ts").await.unwrap();
        let module = String::from_utf8(written).unwrap();
        assert_eq!(parse_module(&module).unwrap(), protocol);
    }

    #[tokio::test]
    async fn test_pipeline_missing_file() {
        let config = MockConfig {
            source: PdlSource::File("missing.pdl".to_string()),
        };
        let pipeline = ExportPipeline::new(MockStorage::new(), config).unwrap();

        let result = pipeline.extract().await;
        assert!(matches!(result, Err(ExportError::IoError(_))));
    }

    #[tokio::test]
    async fn test_pipeline_from_url() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/inspector/node_protocol.pdl");
            then.status(200).body(SAMPLE);
        });

        let config = MockConfig {
            source: PdlSource::Url(server.url("/inspector/node_protocol.pdl")),
        };
        let pipeline = ExportPipeline::new(MockStorage::new(), config).unwrap();

        let document = pipeline.extract().await.unwrap();
        mock.assert();
        assert_eq!(document.name, "node_protocol.pdl");
        assert_eq!(document.text, SAMPLE);
    }

    #[tokio::test]
    async fn test_pipeline_rejects_invalid_utf8_response() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/latin1.pdl");
            then.status(200).body(b"domain Caf\xe9\n".to_vec());
        });

        let config = MockConfig {
            source: PdlSource::Url(server.url("/latin1.pdl")),
        };
        let pipeline = ExportPipeline::new(MockStorage::new(), config).unwrap();

        let result = pipeline.extract().await;
        mock.assert();
        assert!(matches!(result, Err(ExportError::EncodingError(_))));
    }

    #[tokio::test]
    async fn test_pipeline_http_failure() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/gone.pdl");
            then.status(404);
        });

        let config = MockConfig {
            source: PdlSource::Url(server.url("/gone.pdl")),
        };
        let pipeline = ExportPipeline::new(MockStorage::new(), config).unwrap();

        match pipeline.extract().await {
            Err(ExportError::HttpStatusError { status, .. }) => assert_eq!(status, 404),
            other => panic!("expected HTTP status error, got {:?}", other.map(|d| d.name)),
        }
        mock.assert();
    }
}
