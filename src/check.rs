//! Static template check
//!
//! Scans a template without resolving anything and reports tokens whose
//! names the backend registry does not know. Tokens produced by other
//! triggers at generation time cannot be seen here.

use crate::error::Result;
use crate::line::Line;
use crate::source::TemplateSource;
use crate::trigger::TriggerRegistry;
use serde::Serialize;

/// A token naming an unregistered trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub line: usize,
    pub column: usize,
    pub name: String,
    pub token: String,
}

/// Result of checking one template
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub template: String,
    pub backend: String,
    pub lines: usize,
    pub macro_lines: usize,
    pub tokens: usize,
    pub unknown: Vec<Finding>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.unknown.is_empty()
    }
}

/// Check every line of `source` against `registry`
pub fn check_template(
    source: &mut dyn TemplateSource,
    registry: &TriggerRegistry,
) -> Result<CheckReport> {
    let mut report = CheckReport {
        template: source.name().to_string(),
        backend: registry.label().to_string(),
        ..Default::default()
    };
    while let Some(line) = source.next_line()? {
        report.lines += 1;
        check_line(&line, registry, &mut report);
    }
    Ok(report)
}

fn check_line(line: &Line, registry: &TriggerRegistry, report: &mut CheckReport) {
    if !line.carries_macros() {
        return;
    }
    report.macro_lines += 1;
    for token in line.tokens() {
        report.tokens += 1;
        if registry.contains(token.name()) {
            continue;
        }
        let span = token.full_span();
        report.unknown.push(Finding {
            line: line.number(),
            column: line.text()[..span.start].chars().count() + 1,
            name: token.name().to_string(),
            token: token.raw(line.text()).to_string(),
        });
    }
}
