// Production-quality lints
#![warn(
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
// Deny truly dangerous patterns
#![deny(clippy::mem_forget)]
// Allow common patterns in library code
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! # rategen: schema-driven macro templates for rating programs
//!
//! Templates are plain COBOL (or Java) sources annotated with macro calls.
//! The engine reads a template line by line and rewrites every macro
//! against the current run: program name, insurance line, process type and
//! the field metadata of the bound database table.
//!
//! ## Macro Syntax
//!
//! ```text
//! &NAME|p1|p2|        call with pipe-terminated parameters ($ works too)
//! &NAME(p1,p2)        call with comma-separated parameters
//! &<|ABC|text         keep `text` only if the linkage prefix is ABC
//! &!|ABC|text         keep `text` only if it is not
//! ```
//!
//! Names are case-insensitive. A marker with no `|` after it is plain text.
//!
//! ## Quick Start
//!
//! ```rust
//! use rategen::{Backend, GenerationControl, GenerationRequest, InMemorySchema};
//! use rategen::{DataType, FieldMeta, MemoryTemplateStore, TableMeta};
//!
//! let schema = InMemorySchema::new().with_table(
//!     TableMeta::new("BOP_RATE", 1)
//!         .field(FieldMeta::new("RATE_CD", DataType::Char, 3).key())
//!         .field(FieldMeta::new("BASE_PREM", DataType::Decimal, 11).with_decimals(2)),
//! );
//! let templates = MemoryTemplateStore::new();
//! let control = GenerationControl::new(Backend::Cobol.registry(), &schema, &templates);
//!
//! let request = GenerationRequest::new("rate.cbt", "PGUOBK3.cbl", "BOP", "RATE", true)
//!     .with_table("BOP_RATE");
//! let lines = control
//!     .preview(&request, "       PROGRAM-ID. &PGM|.\n           &KEYWHERE|")
//!     .unwrap();
//! assert_eq!(lines, ["       PROGRAM-ID. PGUOBK3.", "           WHERE RATE_CD = :RATE-CD"]);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! TemplateSource ──► Line ──► tokenize ──► TriggerRegistry (per Backend)
//!                                               │
//!                                               ▼
//!      OutputSink ◄── GenerationControl ◄── Trigger::resolve(GenerationRun)
//!                          │                      │
//!                          ▼                      ▼
//!                    ContextArena          SchemaProvider
//!                 (parent-linked frames)   (cached per run)
//! ```
//!
//! Only resource failures (missing template, unwritable output, runaway
//! sub-template nesting) abort a run. Unknown macros, expansion that never
//! settles and failed schema lookups are logged through `tracing` and
//! degrade to placeholder output.

pub mod backend;
pub mod check;
pub mod config;
pub mod context;
pub mod control;
pub mod error;
pub mod line;
pub mod meta;
pub mod project;
pub mod schema;
pub mod sink;
pub mod source;
pub mod trigger;
pub mod util;

// Re-exports
pub use backend::Backend;
pub use check::{check_template, CheckReport, Finding};
pub use config::{EngineConfig, JobConfig, MergedJob, ProjectFile, UnknownTriggerPolicy};
pub use context::{BusinessContext, ContextArena, ContextId, GenerationContext, TableBinding};
pub use control::{
    GenerationControl, GenerationReport, GenerationRequest, GenerationRun, UnresolvedToken,
};
pub use error::{Error, Result};
pub use line::{carries_macros, tokenize, CallForm, Line, Span, Token};
pub use meta::{GenerationMeta, Staleness};
pub use project::{find_project_root, JobOutcome, JobStatus, Project, RegenSummary};
pub use schema::{
    DataType, FieldMeta, InMemorySchema, NoSchema, SchemaError, SchemaFile, SchemaProvider,
    TableMeta,
};
pub use sink::{FileSink, MemorySink, OutputSink};
pub use source::{DirTemplateStore, LineReader, MemoryTemplateStore, TemplateSource, TemplateStore};
pub use trigger::{FnTrigger, Trigger, TriggerRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
