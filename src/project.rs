//! Project discovery and batch regeneration
//!
//! A project is a directory holding `.rategen.yaml`. [`Project::regen`]
//! runs every job whose inputs changed since the last run (or all of them
//! when forced) and records the new input hashes in the output directory.

use crate::backend::Backend;
use crate::config::{MergedJob, ProjectFile, PROJECT_FILE};
use crate::control::{GenerationControl, GenerationReport};
use crate::error::{Error, Result};
use crate::meta::{GenerationMeta, Staleness};
use crate::schema::{InMemorySchema, NoSchema, SchemaFile, SchemaProvider};
use crate::source::DirTemplateStore;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Nearest directory at or above `start_dir` containing `.rategen.yaml`
pub fn find_project_root(start_dir: &Path) -> Result<Option<PathBuf>> {
    let mut current = start_dir.canonicalize().map_err(Error::Io)?;
    loop {
        if current.join(PROJECT_FILE).is_file() {
            return Ok(Some(current));
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return Ok(None),
        }
    }
}

/// A loaded project
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub file: ProjectFile,
}

/// Freshness of one job
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub template: String,
    pub output: PathBuf,
    pub backend: Backend,
    pub staleness: Staleness,
}

/// Result of one job in a regen run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Generated {
        output: PathBuf,
        reason: Staleness,
        report: GenerationReport,
    },
    Skipped {
        output: PathBuf,
    },
    Failed {
        output: PathBuf,
        error: String,
    },
}

/// Summary of a regen run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegenSummary {
    pub outcomes: Vec<JobOutcome>,
}

impl RegenSummary {
    pub fn generated(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Generated { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&JobOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}

impl Project {
    /// Load the project rooted at `root`
    pub fn load(root: &Path) -> Result<Self> {
        let file = ProjectFile::load_from_dir(root)?.ok_or_else(|| {
            Error::Config(format!("No {} in {}", PROJECT_FILE, root.display()))
        })?;
        Ok(Self {
            root: root.to_path_buf(),
            file,
        })
    }

    /// Find and load the project containing `start_dir`
    pub fn discover(start_dir: &Path) -> Result<Self> {
        match find_project_root(start_dir)? {
            Some(root) => Self::load(&root),
            None => Err(Error::Config(format!(
                "No {} found in {} or any parent directory",
                PROJECT_FILE,
                start_dir.display()
            ))),
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.file.defaults.output_dir)
    }

    pub fn jobs(&self) -> Vec<MergedJob> {
        self.file
            .jobs
            .iter()
            .map(|job| self.file.merge(job, &self.root))
            .collect()
    }

    /// Schema provider for the configured schema file, if any
    pub fn schema(&self) -> Result<Option<InMemorySchema>> {
        match &self.file.defaults.schema {
            Some(path) => Ok(Some(SchemaFile::load(&self.root.join(path))?.into_provider())),
            None => Ok(None),
        }
    }

    pub fn status(&self) -> Result<Vec<JobStatus>> {
        let output_dir = self.output_dir();
        let meta = GenerationMeta::load_from_dir(&output_dir)?.unwrap_or_default();
        Ok(self
            .jobs()
            .into_iter()
            .map(|job| JobStatus {
                staleness: meta.staleness(
                    &output_dir,
                    &job.request.output,
                    &job.template_path,
                    job.schema.as_deref(),
                ),
                template: job.request.template,
                output: job.request.output,
                backend: job.backend,
            })
            .collect())
    }

    /// Run stale jobs (every job when `force`). A failing job is reported
    /// and the others still run.
    pub fn regen(&self, force: bool) -> Result<RegenSummary> {
        let issues = self.file.validate();
        if !issues.is_empty() {
            return Err(Error::Config(issues.join("; ")));
        }

        let output_dir = self.output_dir();
        let mut meta = GenerationMeta::load_from_dir(&output_dir)?.unwrap_or_default();
        let schema = self.schema()?;
        let provider: &dyn SchemaProvider = match &schema {
            Some(schema) => schema,
            None => &NoSchema,
        };

        let mut summary = RegenSummary::default();
        for job in self.jobs() {
            let output = job.request.output.clone();
            let staleness = meta.staleness(
                &output_dir,
                &output,
                &job.template_path,
                job.schema.as_deref(),
            );
            if !force && !staleness.is_stale() {
                summary.outcomes.push(JobOutcome::Skipped { output });
                continue;
            }

            info!(output = %output.display(), reason = staleness.describe(), "regenerating");
            let store = DirTemplateStore::new(&job.template_dir);
            let control = GenerationControl::new(job.backend.registry(), provider, &store)
                .with_config(job.engine.clone());
            match control.generate(&job.request) {
                Ok(report) => {
                    let includes: Vec<PathBuf> = report
                        .sub_template_names
                        .iter()
                        .map(|name| store.resolve(name))
                        .collect();
                    meta.record(
                        &output_dir,
                        &output,
                        &job.template_path,
                        &includes,
                        job.schema.as_deref(),
                        job.backend,
                        report.lines_written,
                    )?;
                    summary.outcomes.push(JobOutcome::Generated {
                        output,
                        reason: staleness,
                        report,
                    });
                }
                Err(e) => {
                    error!(output = %output.display(), error = %e, "generation failed");
                    summary.outcomes.push(JobOutcome::Failed {
                        output,
                        error: e.to_string(),
                    });
                }
            }
        }

        meta.save_to_dir(&output_dir)?;
        Ok(summary)
    }
}
