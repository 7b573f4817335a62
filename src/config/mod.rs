pub mod cli;
pub mod job;
pub mod jobs_config;

use crate::domain::model::PdlSource;
use crate::utils::error::{ExportError, Result};
#[cfg(feature = "cli")]
use crate::utils::validation::Validate;
#[cfg(feature = "cli")]
use job::ExportJob;
use serde::{Deserialize, Serialize};

pub const NODE_PROTOCOL_URL: &str =
    "https://raw.githubusercontent.com/nodejs/node/master/src/inspector/node_protocol.pdl";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// The protocol modules the build knows how to regenerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    /// Node's inspector protocol, downloaded from the Node repository.
    Node,
    /// The debugger's own CDP proxy protocol.
    JsDebug,
}

impl Target {
    pub fn name(&self) -> &'static str {
        match self {
            Target::Node => "node",
            Target::JsDebug => "js-debug",
        }
    }

    pub fn source(&self) -> PdlSource {
        match self {
            Target::Node => PdlSource::Url(NODE_PROTOCOL_URL.to_string()),
            Target::JsDebug => PdlSource::File("src/adapter/cdpProxy.pdl".to_string()),
        }
    }

    pub fn output_path(&self) -> &'static str {
        match self {
            Target::Node => "src/build/nodeCustom.ts",
            Target::JsDebug => "src/build/jsDebugCustom.ts",
        }
    }
}

/// Picks the source from an explicit URL or file, falling back to a target.
pub fn resolve_source(
    url: Option<&str>,
    file: Option<&str>,
    target: Option<Target>,
) -> Result<PdlSource> {
    match (url, file, target) {
        (Some(_), Some(_), _) => Err(ExportError::ConfigError {
            message: "`url` and `file` cannot both be set".to_string(),
        }),
        (Some(url), None, _) => Ok(PdlSource::Url(url.to_string())),
        (None, Some(file), _) => Ok(PdlSource::File(file.to_string())),
        (None, None, Some(target)) => Ok(target.source()),
        (None, None, None) => Err(ExportError::MissingConfigError {
            field: "target, url or file".to_string(),
        }),
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, clap::Parser)]
#[command(name = "pdl-export")]
#[command(about = "Convert a protocol definition (PDL) file into an exported JSON module")]
pub struct CliConfig {
    /// Built-in source/output pair to regenerate
    #[arg(long, value_enum)]
    pub target: Option<Target>,

    /// Download the PDL from this URL
    #[arg(long, conflicts_with = "file")]
    pub url: Option<String>,

    /// Read the PDL from this file
    #[arg(long)]
    pub file: Option<String>,

    /// Where to write the generated module
    #[arg(long)]
    pub output: Option<String>,

    /// Keep `binary` as its own type instead of mapping it to `string`
    #[arg(long)]
    pub no_binary_as_string: bool,

    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECONDS)]
    pub timeout_seconds: u64,

    /// Parse and print a summary without writing the module
    #[arg(long)]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn resolve(&self) -> Result<ExportJob> {
        let source = resolve_source(self.url.as_deref(), self.file.as_deref(), self.target)?;
        let output_path = self
            .output
            .clone()
            .or_else(|| self.target.map(|target| target.output_path().to_string()))
            .ok_or_else(|| ExportError::MissingConfigError {
                field: "output".to_string(),
            })?;

        Ok(ExportJob {
            name: self
                .target
                .map(|target| target.name().to_string())
                .unwrap_or_else(|| "custom".to_string()),
            source,
            output_path,
            map_binary_to_string: !self.no_binary_as_string,
            timeout_seconds: self.timeout_seconds,
        })
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        self.resolve()?.validate()
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_target_defaults() {
        let config = CliConfig::parse_from(["pdl-export", "--target", "node"]);
        let job = config.resolve().unwrap();
        assert_eq!(job.name, "node");
        assert_eq!(job.source, PdlSource::Url(NODE_PROTOCOL_URL.to_string()));
        assert_eq!(job.output_path, "src/build/nodeCustom.ts");
        assert!(job.map_binary_to_string);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_take_precedence_over_target() {
        let config = CliConfig::parse_from([
            "pdl-export",
            "--target",
            "js-debug",
            "--file",
            "local.pdl",
            "--output",
            "out.ts",
            "--no-binary-as-string",
        ]);
        let job = config.resolve().unwrap();
        assert_eq!(job.source, PdlSource::File("local.pdl".to_string()));
        assert_eq!(job.output_path, "out.ts");
        assert!(!job.map_binary_to_string);
    }

    #[test]
    fn test_url_and_file_conflict() {
        let result = CliConfig::try_parse_from([
            "pdl-export",
            "--url",
            "https://example.com/a.pdl",
            "--file",
            "a.pdl",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_output_without_target() {
        let config = CliConfig::parse_from(["pdl-export", "--file", "a.pdl"]);
        assert!(matches!(
            config.resolve(),
            Err(ExportError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_nothing_to_do() {
        let config = CliConfig::parse_from(["pdl-export"]);
        assert!(config.validate().is_err());
    }
}
