use crate::config::job::ExportJob;
use crate::config::{resolve_source, Target, DEFAULT_TIMEOUT_SECONDS};
use crate::utils::error::{ExportError, Result};
use crate::utils::validation::{self, Validate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

static ENV_VAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var regex"));

/// Batch configuration: a list of conversions plus shared defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    #[serde(default)]
    pub defaults: JobDefaults,
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDefaults {
    #[serde(default = "default_map_binary_to_string")]
    pub map_binary_to_string: bool,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_map_binary_to_string() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            map_binary_to_string: default_map_binary_to_string(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub target: Option<Target>,
    pub url: Option<String>,
    pub file: Option<String>,
    pub output: Option<String>,
    pub map_binary_to_string: Option<bool>,
    pub timeout_seconds: Option<u64>,
}

impl JobsConfig {
    /// Loads the jobs configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ExportError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` references with environment values. Unset variables are left as is.
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// Resolves every job against the defaults, in file order.
    pub fn jobs(&self) -> Result<Vec<ExportJob>> {
        self.jobs.iter().map(|job| self.resolve(job)).collect()
    }

    /// Resolves the job called `name`.
    pub fn job(&self, name: &str) -> Result<ExportJob> {
        let job = self
            .jobs
            .iter()
            .find(|job| job.name == name)
            .ok_or_else(|| ExportError::InvalidConfigValueError {
                field: "--only".to_string(),
                value: name.to_string(),
                reason: "No job with this name".to_string(),
            })?;
        self.resolve(job)
    }

    fn resolve(&self, job: &JobConfig) -> Result<ExportJob> {
        let field = |name: &str| format!("jobs.{}.{}", job.name, name);

        let source = resolve_source(job.url.as_deref(), job.file.as_deref(), job.target)
            .map_err(|e| ExportError::ConfigError {
                message: format!("job '{}': {}", job.name, e),
            })?;
        let output_path = job
            .output
            .clone()
            .or_else(|| job.target.map(|target| target.output_path().to_string()))
            .ok_or_else(|| ExportError::MissingConfigError {
                field: field("output"),
            })?;

        Ok(ExportJob {
            name: job.name.clone(),
            source,
            output_path,
            map_binary_to_string: job
                .map_binary_to_string
                .unwrap_or(self.defaults.map_binary_to_string),
            timeout_seconds: job.timeout_seconds.unwrap_or(self.defaults.timeout_seconds),
        })
    }
}

impl Validate for JobsConfig {
    fn validate(&self) -> Result<()> {
        if self.jobs.is_empty() {
            return Err(ExportError::ValidationError {
                message: "no [[jobs]] defined".to_string(),
            });
        }

        validation::validate_unique_names("jobs.name", self.jobs.iter().map(|job| job.name.as_str()))?;

        for job in self.jobs()? {
            job.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::PdlSource;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BOTH_TARGETS: &str = r#"
[defaults]
timeout_seconds = 10

[[jobs]]
name = "node"
target = "node"

[[jobs]]
name = "js-debug"
file = "src/adapter/cdpProxy.pdl"
output = "src/build/jsDebugCustom.ts"
map_binary_to_string = false
"#;

    #[test]
    fn test_parse_jobs() {
        let config = JobsConfig::from_toml_str(BOTH_TARGETS).unwrap();
        assert!(config.validate().is_ok());

        let jobs = config.jobs().unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].source, Target::Node.source());
        assert_eq!(jobs[0].output_path, "src/build/nodeCustom.ts");
        assert_eq!(jobs[0].timeout_seconds, 10);
        assert!(jobs[0].map_binary_to_string);
        assert!(!jobs[1].map_binary_to_string);

        assert_eq!(config.job("js-debug").unwrap().name, "js-debug");
        assert!(config.job("chrome").is_err());
    }

    #[test]
    fn test_defaults_when_section_missing() {
        let config = JobsConfig::from_toml_str(
            r#"
[[jobs]]
name = "only"
file = "a.pdl"
output = "a.ts"
"#,
        )
        .unwrap();
        let job = config.job("only").unwrap();
        assert!(job.map_binary_to_string);
        assert_eq!(job.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("PDL_EXPORT_TEST_URL", "https://mirror.example.com/node_protocol.pdl");

        let config = JobsConfig::from_toml_str(
            r#"
[[jobs]]
name = "mirror"
url = "${PDL_EXPORT_TEST_URL}"
output = "out/${PDL_EXPORT_TEST_UNSET}.ts"
"#,
        )
        .unwrap();
        let job = config.job("mirror").unwrap();
        assert_eq!(
            job.source,
            PdlSource::Url("https://mirror.example.com/node_protocol.pdl".to_string())
        );
        assert_eq!(job.output_path, "out/${PDL_EXPORT_TEST_UNSET}.ts");

        std::env::remove_var("PDL_EXPORT_TEST_URL");
    }

    #[test]
    fn test_validation_failures() {
        let duplicate = JobsConfig::from_toml_str(
            r#"
[[jobs]]
name = "a"
target = "node"

[[jobs]]
name = "a"
target = "js-debug"
"#,
        )
        .unwrap();
        assert!(duplicate.validate().is_err());

        let both_sources = JobsConfig::from_toml_str(
            r#"
[[jobs]]
name = "a"
url = "https://example.com/a.pdl"
file = "a.pdl"
output = "a.ts"
"#,
        )
        .unwrap();
        assert!(matches!(
            both_sources.validate(),
            Err(ExportError::ConfigError { .. })
        ));

        let empty = JobsConfig::from_toml_str("").unwrap();
        assert!(empty.validate().is_err());

        assert!(JobsConfig::from_toml_str("[[jobs]]\nname = 3").is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BOTH_TARGETS.as_bytes()).unwrap();

        let config = JobsConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.jobs.len(), 2);
    }
}
