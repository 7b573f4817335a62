use crate::core::ConfigProvider;
use crate::domain::model::PdlSource;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use std::time::Duration;

/// One fully resolved conversion: where to read, where to write, how to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJob {
    pub name: String,
    pub source: PdlSource,
    pub output_path: String,
    pub map_binary_to_string: bool,
    pub timeout_seconds: u64,
}

impl ConfigProvider for ExportJob {
    fn source(&self) -> &PdlSource {
        &self.source
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn map_binary_to_string(&self) -> bool {
        self.map_binary_to_string
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Validate for ExportJob {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("name", &self.name)?;

        match &self.source {
            PdlSource::Url(url) => validation::validate_url("url", url)?,
            PdlSource::File(path) => validation::validate_path("file", path)?,
        }

        validation::validate_path("output", &self.output_path)?;
        validation::validate_range("timeout_seconds", self.timeout_seconds, 1, 600)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(source: PdlSource) -> ExportJob {
        ExportJob {
            name: "test".to_string(),
            source,
            output_path: "out.ts".to_string(),
            map_binary_to_string: true,
            timeout_seconds: 30,
        }
    }

    #[test]
    fn test_validate_sources() {
        assert!(job(PdlSource::File("a.pdl".to_string())).validate().is_ok());
        assert!(job(PdlSource::Url("https://example.com/a.pdl".to_string()))
            .validate()
            .is_ok());
        assert!(job(PdlSource::Url("file:///a.pdl".to_string()))
            .validate()
            .is_err());
        assert!(job(PdlSource::File(String::new())).validate().is_err());
    }

    #[test]
    fn test_validate_timeout() {
        let mut zero_timeout = job(PdlSource::File("a.pdl".to_string()));
        zero_timeout.timeout_seconds = 0;
        assert!(zero_timeout.validate().is_err());
        assert_eq!(
            job(PdlSource::File("a.pdl".to_string())).request_timeout(),
            Duration::from_secs(30)
        );
    }
}
