//! Metadata tracking for staleness detection
//!
//! `.rategen_meta.yaml` in the output directory stores, per generated file,
//! the hashes of the template, of every sub-template it pulled in and of the
//! schema it was produced from. A job whose
//! inputs still hash the same, whose output still exists and that was
//! produced by this tool version does not need regeneration.

use crate::backend::Backend;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Metadata file name, stored in the output directory
pub const META_FILE: &str = ".rategen_meta.yaml";

/// What one output was generated from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OutputRecord {
    pub template: String,
    pub template_hash: String,

    /// Sub-template path -> hash, for `INCLUDE` and `EACHTABLE` fragments
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub includes: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_hash: Option<String>,

    pub backend: Backend,

    /// Lines written
    #[serde(default)]
    pub lines: usize,

    #[serde(with = "chrono::serde::ts_seconds")]
    #[schemars(with = "i64")]
    pub generated_at: DateTime<Utc>,
}

/// Contents of `.rategen_meta.yaml`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationMeta {
    /// Output path relative to the output directory -> record
    #[serde(default)]
    pub outputs: BTreeMap<String, OutputRecord>,

    pub tool_version: String,
}

impl Default for GenerationMeta {
    fn default() -> Self {
        Self {
            outputs: BTreeMap::new(),
            tool_version: crate::VERSION.to_string(),
        }
    }
}

/// Why a job has to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Staleness {
    Fresh,
    NeverGenerated,
    OutputMissing,
    TemplateChanged,
    SchemaChanged,
    ToolUpgraded,
}

impl Staleness {
    pub fn is_stale(self) -> bool {
        self != Staleness::Fresh
    }

    pub fn describe(self) -> &'static str {
        match self {
            Staleness::Fresh => "up to date",
            Staleness::NeverGenerated => "never generated",
            Staleness::OutputMissing => "output missing",
            Staleness::TemplateChanged => "template changed",
            Staleness::SchemaChanged => "schema changed",
            Staleness::ToolUpgraded => "generated by another rategen version",
        }
    }
}

impl GenerationMeta {
    pub fn load_from_dir(output_dir: &Path) -> Result<Option<Self>> {
        let meta_file = output_dir.join(META_FILE);
        if !meta_file.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&meta_file).map_err(Error::Io)?;
        let meta: GenerationMeta = serde_norway::from_str(&content)
            .map_err(|e| Error::Other(format!("Failed to parse {}: {}", META_FILE, e)))?;
        Ok(Some(meta))
    }

    pub fn save_to_dir(&self, output_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(output_dir).map_err(Error::Io)?;
        let mut content = String::from(
            "# AUTO-GENERATED - DO NOT EDIT\n\
             # Input hashes of generated sources, used by 'rategen regen'\n\n",
        );
        content.push_str(&serde_norway::to_string(self)?);
        std::fs::write(output_dir.join(META_FILE), content).map_err(Error::Io)?;
        Ok(())
    }

    /// Compare the recorded inputs of `output` with the files on disk
    pub fn staleness(
        &self,
        output_dir: &Path,
        output: &Path,
        template: &Path,
        schema: Option<&Path>,
    ) -> Staleness {
        let Some(record) = self.outputs.get(&output_key(output_dir, output)) else {
            return Staleness::NeverGenerated;
        };
        if !output.exists() {
            return Staleness::OutputMissing;
        }
        if self.tool_version != crate::VERSION {
            return Staleness::ToolUpgraded;
        }
        if compute_file_hash(template).ok().as_ref() != Some(&record.template_hash) {
            return Staleness::TemplateChanged;
        }
        let fragment_changed = record
            .includes
            .iter()
            .any(|(path, hash)| {
                compute_file_hash(Path::new(path)).ok().as_ref() != Some(hash)
            });
        if fragment_changed {
            return Staleness::TemplateChanged;
        }
        let schema_hash = schema.and_then(|s| compute_file_hash(s).ok());
        if schema_hash != record.schema_hash {
            return Staleness::SchemaChanged;
        }
        Staleness::Fresh
    }

    /// Record a successful generation; `includes` are the sub-template
    /// files the run opened
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &mut self,
        output_dir: &Path,
        output: &Path,
        template: &Path,
        includes: &[PathBuf],
        schema: Option<&Path>,
        backend: Backend,
        lines: usize,
    ) -> Result<()> {
        let includes = includes
            .iter()
            .map(|path| Ok((path.display().to_string(), compute_file_hash(path)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        let record = OutputRecord {
            template: template.display().to_string(),
            template_hash: compute_file_hash(template)?,
            includes,
            schema_hash: schema.map(compute_file_hash).transpose()?,
            backend,
            lines,
            generated_at: Utc::now(),
        };
        self.outputs.insert(output_key(output_dir, output), record);
        self.tool_version = crate::VERSION.to_string();
        Ok(())
    }

    pub fn get(&self, output_dir: &Path, output: &Path) -> Option<&OutputRecord> {
        self.outputs.get(&output_key(output_dir, output))
    }
}

/// Key for `output`: relative to `output_dir` when inside it, `/`-separated
pub fn output_key(output_dir: &Path, output: &Path) -> String {
    output
        .strip_prefix(output_dir)
        .unwrap_or(output)
        .to_string_lossy()
        .replace('\\', "/")
}

/// SHA-256 of a file, hex encoded
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let content = std::fs::read(path).map_err(Error::Io)?;
    Ok(hex::encode(Sha256::digest(&content)))
}
