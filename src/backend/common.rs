//! Triggers every backend understands
//!
//! | Name        | Kind  | Result                                             |
//! |-------------|-------|----------------------------------------------------|
//! | `<`, `!`    | token | payload if the linkage prefix matches / differs    |
//! | `PGM`       | token | program name                                       |
//! | `LOB`       | token | insurance line                                     |
//! | `PROC`      | token | process type                                       |
//! | `LINK`      | token | linkage prefix                                     |
//! | `SETLINK`   | token | sets the linkage prefix for the rest of the run    |
//! | `TABLE`     | token | binds a table                                      |
//! | `TABNAME`   | token | bound table name                                   |
//! | `TABIDX`    | token | bound table index                                  |
//! | `SET`/`GET` | token | scratch slots                                      |
//! | `UPPER`     | token | upper-cased parameter                              |
//! | `LOWER`     | token | lower-cased parameter                              |
//! | `DATE`      | token | run date                                           |
//! | `TIME`      | token | run time                                           |
//! | `INCLUDE`   | line  | processes a sub-template in place                  |
//! | `EACHTABLE` | line  | processes a sub-template once per schema table     |

use super::emit::param;
use crate::context::TableBinding;
use crate::control::GenerationRun;
use crate::error::Result;
use crate::line::{EXCLUDE_DIRECTIVE, INCLUDE_DIRECTIVE};
use crate::trigger::{FnTrigger, Trigger, TriggerRegistry};
use tracing::{debug, warn};

/// Add the shared triggers to `registry`
pub fn register(registry: &mut TriggerRegistry) {
    registry.register(Conditional::include());
    registry.register(Conditional::exclude());
    registry.register(Include);
    registry.register(EachTable);
    for trigger in SIMPLE {
        registry.register(*trigger);
    }
}

const SIMPLE: &[FnTrigger] = &[
    FnTrigger::token("PGM", "Program name", Some(0), |run, _| {
        Ok(Some(run.context().program_name().to_string()))
    }),
    FnTrigger::token("LOB", "Insurance line code", Some(0), |run, _| {
        Ok(Some(run.context().insurance_line().to_string()))
    }),
    FnTrigger::token("PROC", "Process type", Some(0), |run, _| {
        Ok(Some(run.context().process_type().to_string()))
    }),
    FnTrigger::token("LINK", "Linkage prefix", Some(0), |run, _| {
        Ok(Some(run.context().linkage_prefix().to_string()))
    }),
    FnTrigger::token("SETLINK", "Set the linkage prefix: |prefix|", Some(1), set_link),
    FnTrigger::token("TABLE", "Bind a table: |name|", Some(1), bind_table),
    FnTrigger::token("TABNAME", "Bound table name", Some(0), |run, _| {
        Ok(Some(run.context().table_name().unwrap_or_default().to_string()))
    }),
    FnTrigger::token("TABIDX", "Bound table index", Some(0), |run, _| {
        Ok(Some(
            run.context()
                .table
                .as_ref()
                .map(|t| t.index.to_string())
                .unwrap_or_default(),
        ))
    }),
    FnTrigger::token("SET", "Store a scratch value: |slot|value|", Some(2), set_scratch),
    FnTrigger::token("GET", "Read a scratch value: |slot|", Some(1), |run, params| {
        Ok(Some(
            param(params, 0)
                .and_then(|slot| run.context().scratch(slot))
                .unwrap_or_default()
                .to_string(),
        ))
    }),
    FnTrigger::token("UPPER", "Upper-case: |text|", Some(1), |_, params| {
        Ok(params.first().map(|p| p.to_uppercase()))
    }),
    FnTrigger::token("LOWER", "Lower-case: |text|", Some(1), |_, params| {
        Ok(params.first().map(|p| p.to_lowercase()))
    }),
    FnTrigger::token("DATE", "Run date: |ISO| or |COMPACT|", Some(1), |run, params| {
        let format = match param(params, 0).map(str::to_ascii_uppercase).as_deref() {
            Some("COMPACT") => "%Y%m%d",
            _ => "%Y-%m-%d",
        };
        Ok(Some(run.context().started_at.format(format).to_string()))
    }),
    FnTrigger::token("TIME", "Run time", Some(0), |run, _| {
        Ok(Some(run.context().started_at.format("%H:%M:%S").to_string()))
    }),
];

fn set_link(run: &mut GenerationRun<'_>, params: &[String]) -> Result<Option<String>> {
    let prefix = params.first().map(|p| p.trim()).unwrap_or_default();
    run.context_mut().business.linkage_prefix = prefix.to_string();
    Ok(None)
}

fn bind_table(run: &mut GenerationRun<'_>, params: &[String]) -> Result<Option<String>> {
    match param(params, 0) {
        Some(name) => {
            let binding = run.table_binding(name);
            debug!(table = %binding.name, index = binding.index, "table bound");
            run.context_mut().bind_table(binding);
        }
        None => run.context_mut().table = None,
    }
    Ok(None)
}

fn set_scratch(run: &mut GenerationRun<'_>, params: &[String]) -> Result<Option<String>> {
    if let Some(slot) = param(params, 0) {
        let value = params.get(1).cloned().unwrap_or_default();
        run.context_mut().set_scratch(slot, value);
    }
    Ok(None)
}

/// The `<` and `!` directives
#[derive(Debug, Clone, Copy)]
pub struct Conditional {
    keep_on_match: bool,
}

impl Conditional {
    pub const fn include() -> Self {
        Self {
            keep_on_match: true,
        }
    }

    pub const fn exclude() -> Self {
        Self {
            keep_on_match: false,
        }
    }
}

impl Trigger for Conditional {
    fn name(&self) -> &str {
        if self.keep_on_match {
            INCLUDE_DIRECTIVE
        } else {
            EXCLUDE_DIRECTIVE
        }
    }

    fn summary(&self) -> &str {
        if self.keep_on_match {
            "Keep the rest of the line if the linkage prefix matches: |prefix|rest"
        } else {
            "Keep the rest of the line unless the linkage prefix matches: |prefix|rest"
        }
    }

    fn resolve(&self, run: &mut GenerationRun<'_>, params: &[String]) -> Result<Option<String>> {
        let prefix = params.first().map(String::as_str).unwrap_or_default();
        let matched = prefix == run.context().linkage_prefix();
        if matched == self.keep_on_match {
            Ok(Some(params.get(1).cloned().unwrap_or_default()))
        } else {
            Ok(Some(String::new()))
        }
    }
}

/// `&INCLUDE|template|` processes another template in place of the line
#[derive(Debug, Clone, Copy)]
pub struct Include;

impl Trigger for Include {
    fn name(&self) -> &str {
        "INCLUDE"
    }

    fn summary(&self) -> &str {
        "Process a sub-template in place of this line: |template|"
    }

    fn resolve(&self, run: &mut GenerationRun<'_>, params: &[String]) -> Result<Option<String>> {
        match param(params, 0) {
            Some(template) => run.generate_sub_template(template)?,
            None => warn!(
                template = %run.context().template(),
                line = run.context().line_number,
                "INCLUDE without a template name"
            ),
        }
        Ok(None)
    }

    fn replaces_entire_line(&self) -> bool {
        true
    }

    fn max_params(&self) -> Option<usize> {
        Some(1)
    }
}

/// `&EACHTABLE|template|prefix|` processes a sub-template once per schema
/// table, optionally only tables whose name starts with `prefix`
#[derive(Debug, Clone, Copy)]
pub struct EachTable;

impl Trigger for EachTable {
    fn name(&self) -> &str {
        "EACHTABLE"
    }

    fn summary(&self) -> &str {
        "Process a sub-template per schema table: |template|prefix|"
    }

    fn resolve(&self, run: &mut GenerationRun<'_>, params: &[String]) -> Result<Option<String>> {
        let Some(template) = param(params, 0) else {
            warn!(
                template = %run.context().template(),
                line = run.context().line_number,
                "EACHTABLE without a template name"
            );
            return Ok(None);
        };
        let prefix = param(params, 1).map(str::to_ascii_uppercase);
        for (name, index) in run.tables() {
            if let Some(prefix) = &prefix {
                if !name.to_ascii_uppercase().starts_with(prefix.as_str()) {
                    continue;
                }
            }
            let binding = TableBinding::new(name, index);
            run.generate_sub_template_with(template, false, |ctx| ctx.bind_table(binding))?;
        }
        Ok(None)
    }

    fn replaces_entire_line(&self) -> bool {
        true
    }

    fn max_params(&self) -> Option<usize> {
        Some(2)
    }
}
