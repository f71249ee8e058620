//! Generation control: template iteration and macro resolution
//!
//! ## Resolution algorithm
//!
//! For every template line:
//!
//! 1. A line without macro syntax is written unchanged.
//! 2. Otherwise the line is resolved in passes, at most
//!    [`EngineConfig::max_iterations`] of them. Each pass extracts the
//!    tokens of the current text and looks each name up in the backend's
//!    registry. Unknown names are skipped. A token-replacing trigger
//!    substitutes its own span; a line-replacing trigger's result becomes
//!    the whole output for the line and ends processing of that line.
//!    Passes repeat while something resolved and macro syntax remains, so a
//!    trigger's output may itself contain macros.
//! 3. The rewritten line is written once, unless it became empty.
//!
//! Sub-templates are processed with a child context chained to the current
//! one (see [`GenerationRun::generate_sub_template`]).

use crate::config::{EngineConfig, UnknownTriggerPolicy};
use crate::context::{BusinessContext, ContextArena, ContextId, GenerationContext, TableBinding};
use crate::error::{Error, Result};
use crate::line::{carries_macros, tokenize, Line, Token};
use crate::schema::{FieldMeta, SchemaCache, SchemaProvider};
use crate::sink::{FileSink, MemorySink, OutputSink};
use crate::source::{LineReader, TemplateSource, TemplateStore};
use crate::trigger::TriggerRegistry;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Entry point value for a top-level generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Template name as understood by the template store
    pub template: String,
    pub output: PathBuf,
    pub insurance_line: String,
    pub process_type: String,
    pub is_main: bool,
    pub program_name: Option<String>,
    pub linkage_prefix: Option<String>,
    /// Table bound before the first line is processed
    pub table: Option<String>,
    /// Fields for `table`, bypassing the schema provider
    pub table_fields: Option<Vec<FieldMeta>>,
}

impl GenerationRequest {
    pub fn new(
        template: impl Into<String>,
        output: impl Into<PathBuf>,
        insurance_line: impl Into<String>,
        process_type: impl Into<String>,
        is_main: bool,
    ) -> Self {
        Self {
            template: template.into(),
            output: output.into(),
            insurance_line: insurance_line.into(),
            process_type: process_type.into(),
            is_main,
            program_name: None,
            linkage_prefix: None,
            table: None,
            table_fields: None,
        }
    }

    pub fn with_program_name(mut self, name: impl Into<String>) -> Self {
        self.program_name = Some(name.into());
        self
    }

    pub fn with_linkage_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.linkage_prefix = Some(prefix.into());
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_table_fields(mut self, table: impl Into<String>, fields: Vec<FieldMeta>) -> Self {
        self.table = Some(table.into());
        self.table_fields = Some(fields);
        self
    }

    /// Explicit program name, else the output file stem upper-cased
    pub fn program_name(&self) -> String {
        match &self.program_name {
            Some(name) => name.clone(),
            None => self
                .output
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_ascii_uppercase(),
        }
    }
}

/// A token or line the engine could not fully resolve
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedToken {
    pub template: String,
    pub line: usize,
    pub token: String,
}

/// What happened during a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub lines_read: usize,
    pub lines_written: usize,
    /// Resolution passes over macro-carrying lines
    pub passes: usize,
    pub unknown_triggers: Vec<UnresolvedToken>,
    /// Lines written unresolved because the iteration cap was reached
    pub runaway_lines: Vec<UnresolvedToken>,
    pub schema_fallbacks: usize,
    pub sub_templates: usize,
    /// Distinct sub-templates opened, in first-use order
    pub sub_template_names: Vec<String>,
}

impl GenerationReport {
    pub fn is_clean(&self) -> bool {
        self.unknown_triggers.is_empty() && self.runaway_lines.is_empty()
    }
}

/// Drives generation runs against one backend registry
pub struct GenerationControl<'a> {
    registry: &'a TriggerRegistry,
    schema: &'a dyn SchemaProvider,
    templates: &'a dyn TemplateStore,
    config: EngineConfig,
}

impl<'a> GenerationControl<'a> {
    pub fn new(
        registry: &'a TriggerRegistry,
        schema: &'a dyn SchemaProvider,
        templates: &'a dyn TemplateStore,
    ) -> Self {
        Self {
            registry,
            schema,
            templates,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &TriggerRegistry {
        self.registry
    }

    /// Run a request end to end into its output file. The file only
    /// appears once the whole template has been processed.
    #[tracing::instrument(
        skip_all,
        fields(template = %request.template, output = %request.output.display())
    )]
    pub fn generate(&self, request: &GenerationRequest) -> Result<GenerationReport> {
        let source = self.templates.open(&request.template)?;
        let mut sink = FileSink::create(&request.output)?;
        let report = self.run(request, source, &mut sink)?;
        let path = sink.finish()?;
        info!(
            output = %path.display(),
            lines = report.lines_written,
            unknown = report.unknown_triggers.len(),
            "generation finished"
        );
        Ok(report)
    }

    /// Run a request into a caller-owned sink
    pub fn generate_into(
        &self,
        request: &GenerationRequest,
        sink: &mut dyn OutputSink,
    ) -> Result<GenerationReport> {
        let source = self.templates.open(&request.template)?;
        self.run(request, source, sink)
    }

    /// Resolve inline template text, returning the output lines
    pub fn preview(&self, request: &GenerationRequest, text: &str) -> Result<Vec<String>> {
        let mut sink = MemorySink::new();
        let source = LineReader::from_text(request.template.clone(), text);
        self.run(request, Box::new(source), &mut sink)?;
        Ok(sink.into_lines())
    }

    /// Process `source` with a fresh top-level context
    pub fn run(
        &self,
        request: &GenerationRequest,
        source: Box<dyn TemplateSource>,
        sink: &mut dyn OutputSink,
    ) -> Result<GenerationReport> {
        let mut run = GenerationRun::new(self, request, sink);
        debug!(template = %request.template, main = request.is_main, "run started");
        run.process(source)?;
        if run.context().is_main() {
            run.flush()?;
        }
        Ok(run.report)
    }
}

enum PassOutcome {
    /// A line-replacing trigger produced the line's entire output
    LineReplaced(Option<String>),
    Rewritten { text: String, resolved: usize },
}

/// State of one top-level generation, handed to every trigger
pub struct GenerationRun<'r> {
    registry: &'r TriggerRegistry,
    schema: &'r dyn SchemaProvider,
    templates: &'r dyn TemplateStore,
    config: &'r EngineConfig,
    sink: &'r mut dyn OutputSink,
    arena: ContextArena,
    current: ContextId,
    cache: SchemaCache,
    warned: HashSet<(String, usize, String)>,
    report: GenerationReport,
}

impl<'r> GenerationRun<'r> {
    fn new(
        control: &'r GenerationControl<'_>,
        request: &GenerationRequest,
        sink: &'r mut dyn OutputSink,
    ) -> Self {
        let business = BusinessContext {
            insurance_line: request.insurance_line.clone(),
            process_type: request.process_type.clone(),
            program_name: request.program_name(),
            linkage_prefix: request.linkage_prefix.clone().unwrap_or_default(),
        };
        let arena = ContextArena::new(
            request.template.clone(),
            request.output.display().to_string(),
            business,
            request.is_main,
        );
        let current = arena.root();
        let mut run = Self {
            registry: control.registry,
            schema: control.schema,
            templates: control.templates,
            config: &control.config,
            sink,
            arena,
            current,
            cache: SchemaCache::new(),
            warned: HashSet::new(),
            report: GenerationReport::default(),
        };
        if let Some(table) = &request.table {
            let mut binding = run.table_binding(table);
            binding.fields = request.table_fields.clone();
            run.context_mut().bind_table(binding);
        }
        run
    }

    /// Context of the template currently being processed
    pub fn context(&self) -> &GenerationContext {
        self.arena.get(self.current)
    }

    pub fn context_mut(&mut self) -> &mut GenerationContext {
        self.arena.get_mut(self.current)
    }

    pub fn arena(&self) -> &ContextArena {
        &self.arena
    }

    pub fn registry(&self) -> &TriggerRegistry {
        self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    pub fn report(&self) -> &GenerationReport {
        &self.report
    }

    /// Binding for `table`, with its index looked up in the schema
    pub fn table_binding(&self, table: &str) -> TableBinding {
        let index = self
            .tables()
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(table))
            .map(|(_, index)| index)
            .unwrap_or(0);
        TableBinding::new(table, index)
    }

    /// Tables known to the schema; empty when the schema cannot list them
    pub fn tables(&self) -> Vec<(String, usize)> {
        self.schema.tables().unwrap_or_else(|e| {
            warn!(error = %e, "schema table listing failed");
            Vec::new()
        })
    }

    /// Fields of the bound table, or `None` when no table is bound or the
    /// lookup failed. Failures are logged and counted, never raised.
    pub fn table_fields(&mut self, keys_only: bool) -> Option<Vec<FieldMeta>> {
        let binding = self.context().table.clone()?;
        let fields = match binding.fields {
            Some(fields) if keys_only => fields.into_iter().filter(|f| f.is_key).collect(),
            Some(fields) => fields,
            None => match self.cache.lookup(self.schema, &binding.name, keys_only) {
                Ok(fields) => fields,
                Err(e) => {
                    let ctx = self.context();
                    warn!(
                        template = %ctx.template(),
                        line = ctx.line_number,
                        table = %binding.name,
                        error = %e,
                        "schema lookup failed, using placeholder"
                    );
                    self.report.schema_fallbacks += 1;
                    return None;
                }
            },
        };
        Some(fields)
    }

    /// Process another template with a child context that inherits the
    /// current table and business context. Its output goes to the same sink.
    pub fn generate_sub_template(&mut self, template: &str) -> Result<()> {
        self.generate_sub_template_with(template, false, |_| {})
    }

    /// Like [`generate_sub_template`](Self::generate_sub_template), with a
    /// hook to adjust the child context before its first line. A main child
    /// starts from the root business values with no table bound; only the
    /// top-level run flushes the sink.
    pub fn generate_sub_template_with<F>(
        &mut self,
        template: &str,
        is_main: bool,
        configure: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut GenerationContext),
    {
        let parent = self.current;
        if self.context().depth() + 1 > self.config.max_depth {
            return Err(Error::NestingTooDeep {
                depth: self.config.max_depth,
                template: template.to_string(),
            });
        }
        let source = self.templates.open(template)?;
        if !self.report.sub_template_names.iter().any(|n| n == template) {
            self.report.sub_template_names.push(template.to_string());
        }
        let child = self.arena.spawn_child(parent, template, is_main);
        configure(self.arena.get_mut(child));
        debug!(template, depth = self.arena.get(child).depth(), "sub-template started");

        self.current = child;
        let result = self.process(source);
        self.current = parent;
        self.arena.release(child);
        self.report.sub_templates += 1;
        result
    }

    /// Write one output line
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        self.sink
            .write_line(line)
            .map_err(|source| Error::OutputUnwritable {
                path: PathBuf::from(self.arena.get(self.arena.root()).output()),
                source,
            })?;
        self.report.lines_written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.sink.flush().map_err(|source| Error::OutputUnwritable {
            path: PathBuf::from(self.arena.get(self.arena.root()).output()),
            source,
        })
    }

    /// Write text that may span several lines
    fn emit(&mut self, text: &str) -> Result<()> {
        for line in text.split('\n') {
            self.write_line(line.strip_suffix('\r').unwrap_or(line))?;
        }
        Ok(())
    }

    fn process(&mut self, mut source: Box<dyn TemplateSource>) -> Result<()> {
        while let Some(line) = source.next_line()? {
            self.report.lines_read += 1;
            self.context_mut().line_number = line.number();
            self.process_line(line)?;
        }
        Ok(())
    }

    fn process_line(&mut self, line: Line) -> Result<()> {
        if !line.carries_macros() {
            return self.write_line(line.text());
        }

        let number = line.number();
        let mut text = line.into_text();
        let mut resolved_any = false;
        let cap = self.config.max_iterations.max(1);

        for pass in 1..=cap {
            self.report.passes += 1;
            match self.resolve_pass(&text)? {
                PassOutcome::LineReplaced(output) => {
                    if let Some(output) = output.filter(|o| !o.is_empty()) {
                        self.emit(&output)?;
                    }
                    return Ok(());
                }
                PassOutcome::Rewritten { text: next, resolved } => {
                    text = next;
                    if resolved == 0 {
                        break;
                    }
                    resolved_any = true;
                    if !carries_macros(&text) {
                        break;
                    }
                    if pass == cap && self.has_resolvable(&text) {
                        let template = self.context().template().to_string();
                        warn!(
                            template = %template,
                            line = number,
                            passes = cap,
                            text = %text,
                            "macro expansion did not settle, writing line as-is"
                        );
                        self.report.runaway_lines.push(UnresolvedToken {
                            template,
                            line: number,
                            token: text.clone(),
                        });
                    }
                }
            }
        }

        // A line emptied by a trigger is suppressed; one that only lost
        // unknown macros keeps its place in the output.
        if !text.is_empty() || !resolved_any {
            self.emit(&text)?;
        }
        Ok(())
    }

    fn resolve_pass(&mut self, text: &str) -> Result<PassOutcome> {
        let registry = self.registry;
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        let mut resolved = 0;

        for token in tokenize(text) {
            let Some(trigger) = registry.get(token.name()) else {
                self.note_unknown(&token, text);
                if self.config.unknown_triggers == UnknownTriggerPolicy::Remove {
                    let span = token.full_span();
                    out.push_str(&text[cursor..span.start]);
                    cursor = span.end;
                }
                continue;
            };

            let (span, params) = token.consume(trigger.max_params());
            {
                let ctx = self.context_mut();
                ctx.current_token = Some(text[span.range()].to_string());
                let line_start = text[..span.start].rfind('\n').map_or(0, |i| i + 1);
                ctx.token_column = text[line_start..span.start].chars().count();
            }
            debug!(
                line = self.context().line_number,
                trigger = trigger.name(),
                params = params.len(),
                "resolving"
            );

            let value = trigger.resolve(self, params)?;
            self.context_mut().current_token = None;

            if trigger.replaces_entire_line() {
                return Ok(PassOutcome::LineReplaced(value));
            }
            out.push_str(&text[cursor..span.start]);
            out.push_str(value.as_deref().unwrap_or(""));
            cursor = span.end;
            resolved += 1;
        }

        out.push_str(&text[cursor..]);
        Ok(PassOutcome::Rewritten {
            text: out,
            resolved,
        })
    }

    fn has_resolvable(&self, text: &str) -> bool {
        tokenize(text)
            .iter()
            .any(|t| self.registry.contains(t.name()))
    }

    fn note_unknown(&mut self, token: &Token, text: &str) {
        let ctx = self.context();
        let entry = UnresolvedToken {
            template: ctx.template().to_string(),
            line: ctx.line_number,
            token: token.raw(text).to_string(),
        };
        let key = (entry.template.clone(), entry.line, entry.token.clone());
        if self.warned.insert(key) {
            warn!(
                template = %entry.template,
                line = entry.line,
                token = %entry.token,
                "unknown trigger"
            );
            self.report.unknown_triggers.push(entry);
        }
    }
}
