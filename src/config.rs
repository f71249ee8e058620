//! Rategen configuration
//!
//! [`EngineConfig`] holds the resolution engine's safety valves. The project
//! file `.rategen.yaml` carries defaults plus a list of generation jobs;
//! [`ProjectFile::merge`] folds a job's overrides over the defaults.

use crate::backend::Backend;
use crate::control::GenerationRequest;
use crate::error::{Error, Result};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// File name of the project configuration
pub const PROJECT_FILE: &str = ".rategen.yaml";

/// What happens to a token naming a trigger the backend does not know
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum UnknownTriggerPolicy {
    /// Leave the macro text in the output
    #[default]
    Keep,
    /// Delete the macro text
    Remove,
}

/// Resolution engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EngineConfig {
    /// Resolution passes allowed per line before the line is written as-is.
    /// A safety valve against triggers that keep re-emitting macros.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Maximum sub-template nesting depth
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default)]
    pub unknown_triggers: UnknownTriggerPolicy,
}

fn default_max_iterations() -> usize {
    10
}

fn default_max_depth() -> usize {
    16
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_depth: default_max_depth(),
            unknown_triggers: UnknownTriggerPolicy::Keep,
        }
    }
}

/// Project configuration (`.rategen.yaml`)
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[schemars(title = "Rategen Project", description = "Template generation jobs")]
pub struct ProjectFile {
    /// Schema version for migrations
    pub version: u32,

    pub project: ProjectInfo,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProjectInfo {
    pub name: String,
}

/// Settings applied to every job unless overridden
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Defaults {
    #[serde(default)]
    pub backend: Backend,

    /// Directory templates are resolved against
    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,

    /// Schema file exported from the metadata store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<PathBuf>,

    /// Directory relative outputs are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub linkage_prefix: String,

    #[serde(flatten)]
    pub engine: EngineConfig,
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated")
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            template_dir: default_template_dir(),
            schema: None,
            output_dir: default_output_dir(),
            linkage_prefix: String::new(),
            engine: EngineConfig::default(),
        }
    }
}

/// One generation job
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobConfig {
    /// Template name, relative to the template directory
    pub template: String,

    /// Output file, relative to the output directory
    pub output: PathBuf,

    pub insurance_line: String,

    pub process_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// Defaults to the output file stem, upper-cased
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<Backend>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkage_prefix: Option<String>,
}

/// A job with defaults applied and paths resolved against the project root
#[derive(Debug, Clone)]
pub struct MergedJob {
    pub request: GenerationRequest,
    pub backend: Backend,
    pub template_dir: PathBuf,
    pub template_path: PathBuf,
    pub schema: Option<PathBuf>,
    pub engine: EngineConfig,
}

impl ProjectFile {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: ProjectFile = serde_norway::from_str(yaml)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", PROJECT_FILE, e)))?;
        if file.version != 1 {
            return Err(Error::Config(format!(
                "Unsupported {} version: {}",
                PROJECT_FILE, file.version
            )));
        }
        Ok(file)
    }

    /// Load `.rategen.yaml` from a directory
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(PROJECT_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).map_err(Error::Io)?;
        Self::from_yaml(&content).map(Some)
    }

    /// Merge a job with the defaults; relative paths resolve under `root`
    pub fn merge(&self, job: &JobConfig, root: &Path) -> MergedJob {
        let defaults = &self.defaults;
        let template_dir = root.join(&defaults.template_dir);
        let output = if job.output.is_absolute() {
            job.output.clone()
        } else {
            root.join(&defaults.output_dir).join(&job.output)
        };

        let mut request = GenerationRequest::new(
            job.template.clone(),
            output,
            job.insurance_line.clone(),
            job.process_type.clone(),
            job.main.unwrap_or(true),
        )
        .with_linkage_prefix(
            job.linkage_prefix
                .clone()
                .unwrap_or_else(|| defaults.linkage_prefix.clone()),
        );
        if let Some(name) = &job.program_name {
            request = request.with_program_name(name.clone());
        }
        if let Some(table) = &job.table {
            request = request.with_table(table.clone());
        }

        MergedJob {
            template_path: template_dir.join(&job.template),
            template_dir,
            request,
            backend: job.backend.unwrap_or(defaults.backend),
            schema: defaults.schema.as_ref().map(|s| root.join(s)),
            engine: defaults.engine.clone(),
        }
    }

    /// Problems that would make jobs fail or produce unusable programs
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.defaults.engine.max_iterations == 0 {
            issues.push("defaults.max_iterations must be at least 1".to_string());
        }
        for (i, job) in self.jobs.iter().enumerate() {
            if job.template.trim().is_empty() {
                issues.push(format!("jobs[{}]: template is empty", i));
            }
            let backend = job.backend.unwrap_or(self.defaults.backend);
            if let Some(name) = &job.program_name {
                if backend == Backend::Cobol && !is_cobol_program_name(name) {
                    issues.push(format!(
                        "jobs[{}]: '{}' is not a valid COBOL program name (1-8 letters/digits, starting with a letter)",
                        i, name
                    ));
                }
            }
        }
        let mut outputs: Vec<_> = self.jobs.iter().map(|j| &j.output).collect();
        outputs.sort();
        for pair in outputs.windows(2) {
            if pair[0] == pair[1] {
                issues.push(format!(
                    "output {} is produced by more than one job",
                    pair[0].display()
                ));
            }
        }
        issues
    }
}

/// COBOL program names: 1-8 characters, letters and digits, leading letter
pub fn is_cobol_program_name(name: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]{0,7}$").expect("valid regex"))
        .is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = r#"
version: 1
project:
  name: rating
defaults:
  backend: cobol
  schema: schema.yaml
  linkage_prefix: LK
  max_iterations: 12
jobs:
  - template: rate.cbt
    output: PGUOBK3.cbl
    insurance_line: BOP
    process_type: RATE
    table: BOP_RATE
  - template: rate.jvt
    output: BopRate.java
    insurance_line: BOP
    process_type: RATE
    backend: java
    linkage_prefix: XYZ
    main: false
"#;

    #[test]
    fn test_parse_project() {
        let file = ProjectFile::from_yaml(PROJECT).unwrap();
        assert_eq!(file.project.name, "rating");
        assert_eq!(file.defaults.engine.max_iterations, 12);
        assert_eq!(file.defaults.engine.max_depth, 16);
        assert_eq!(file.defaults.engine.unknown_triggers, UnknownTriggerPolicy::Keep);
        assert_eq!(file.jobs.len(), 2);
        assert!(file.validate().is_empty());
    }

    #[test]
    fn test_merge_applies_defaults() {
        let file = ProjectFile::from_yaml(PROJECT).unwrap();
        let root = Path::new("/proj");

        let first = file.merge(&file.jobs[0], root);
        assert_eq!(first.backend, Backend::Cobol);
        assert_eq!(first.request.output, Path::new("/proj/generated/PGUOBK3.cbl"));
        assert_eq!(first.request.program_name(), "PGUOBK3");
        assert_eq!(first.request.linkage_prefix.as_deref(), Some("LK"));
        assert_eq!(first.request.table.as_deref(), Some("BOP_RATE"));
        assert!(first.request.is_main);
        assert_eq!(first.template_path, Path::new("/proj/templates/rate.cbt"));
        assert_eq!(first.schema.as_deref(), Some(Path::new("/proj/schema.yaml")));

        let second = file.merge(&file.jobs[1], root);
        assert_eq!(second.backend, Backend::Java);
        assert_eq!(second.request.linkage_prefix.as_deref(), Some("XYZ"));
        assert!(!second.request.is_main);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let err = ProjectFile::from_yaml("version: 2\nproject:\n  name: x\n").unwrap_err();
        assert!(err.to_string().contains("Unsupported .rategen.yaml version: 2"));
    }

    #[test]
    fn test_validate_reports_issues() {
        let mut file = ProjectFile::from_yaml(PROJECT).unwrap();
        file.jobs[0].program_name = Some("TOO-LONG-NAME".into());
        file.jobs[1].output = file.jobs[0].output.clone();
        let issues = file.validate();
        assert_eq!(issues.len(), 2, "{:?}", issues);
    }

    #[test]
    fn test_cobol_program_names() {
        assert!(is_cobol_program_name("PGUOBK3"));
        assert!(is_cobol_program_name("A"));
        assert!(!is_cobol_program_name("9ABC"));
        assert!(!is_cobol_program_name("ABCDEFGHI"));
        assert!(!is_cobol_program_name(""));
    }

    #[test]
    fn test_engine_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.max_depth, 16);
    }
}
