//! COBOL/DB2 backend
//!
//! Adds comment and header triggers here, embedded-SQL emitters in [`sql`]
//! and WORKING-STORAGE / PROCEDURE DIVISION emitters in [`storage`].
//!
//! Token-replacing emitters that span several lines align their
//! continuation lines under the column where the token started, so a
//! template keeps control over area A/B placement.

mod sql;
mod storage;

use super::common;
use super::emit::pad;
use crate::control::GenerationRun;
use crate::error::Result;
use crate::trigger::{FnTrigger, TriggerRegistry};
use std::sync::OnceLock;

/// Fixed-format comment line: indicator `*` in column 7
const COMMENT: &str = "      *";

const RULE: &str = "================================================================";

/// The COBOL registry
pub fn registry() -> &'static TriggerRegistry {
    static REGISTRY: OnceLock<TriggerRegistry> = OnceLock::new();
    REGISTRY.get_or_init(build)
}

fn build() -> TriggerRegistry {
    let mut registry = TriggerRegistry::new("cobol");
    common::register(&mut registry);
    registry.register(FnTrigger::line("CMNT", "Comment line: |text|", None, comment));
    registry.register(FnTrigger::line("HDR", "Program header comment block", Some(0), header));
    for trigger in sql::TRIGGERS.iter().chain(storage::TRIGGERS) {
        registry.register(*trigger);
    }
    registry
}

fn comment_line(text: &str) -> String {
    if text.is_empty() {
        COMMENT.to_string()
    } else {
        format!("{} {}", COMMENT, text)
    }
}

fn comment(_: &mut GenerationRun<'_>, params: &[String]) -> Result<Option<String>> {
    Ok(Some(comment_line(params.join(" ").trim_end())))
}

fn header(run: &mut GenerationRun<'_>, _: &[String]) -> Result<Option<String>> {
    let ctx = run.context();
    let mut lines = vec![
        format!("{}{}*", COMMENT, RULE),
        comment_line(&format!("PROGRAM   : {}", ctx.program_name())),
        comment_line(&format!(
            "LINE      : {:<8}PROCESS: {}",
            ctx.insurance_line(),
            ctx.process_type()
        )),
    ];
    if let Some(table) = ctx.table_name() {
        lines.push(comment_line(&format!("TABLE     : {}", table)));
    }
    lines.push(comment_line(&format!(
        "GENERATED : {} BY RATEGEN {}",
        ctx.started_at.format("%Y-%m-%d %H:%M"),
        crate::VERSION
    )));
    lines.push(format!("{}{}*", COMMENT, RULE));
    Ok(Some(lines.join("\n")))
}

/// Lines of `body` each prefixed with `indent` spaces
fn indented(indent: usize, body: &[String]) -> String {
    let pad = pad(indent);
    body.iter()
        .map(|line| format!("{}{}", pad, line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{GenerationControl, GenerationRequest};
    use crate::schema::NoSchema;
    use crate::source::MemoryTemplateStore;
    use pretty_assertions::assert_eq;

    fn preview(text: &str) -> Vec<String> {
        let store = MemoryTemplateStore::new();
        let request = GenerationRequest::new("main", "PGUOBK3.cbl", "BOP", "RATE", true)
            .with_table("BOP_RATE");
        GenerationControl::new(registry(), &NoSchema, &store)
            .preview(&request, text)
            .unwrap()
    }

    #[test]
    fn test_comment() {
        assert_eq!(preview("&CMNT|hello|"), ["      * hello"]);
        assert_eq!(preview("  x &CMNT|a|b| y"), ["      * a b"]);
        assert_eq!(preview("&CMNT|"), ["      *"]);
    }

    #[test]
    fn test_header_block() {
        let lines = preview("&HDR|");
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], lines[5]);
        assert!(lines[0].starts_with("      *====="));
        assert_eq!(lines[1], "      * PROGRAM   : PGUOBK3");
        assert_eq!(lines[2], "      * LINE      : BOP     PROCESS: RATE");
        assert_eq!(lines[3], "      * TABLE     : BOP_RATE");
        assert!(lines[4].ends_with(&format!("BY RATEGEN {}", crate::VERSION)));
    }

    #[test]
    fn test_indented() {
        let body = vec!["A".to_string(), "B".to_string()];
        assert_eq!(indented(2, &body), "  A\n  B");
    }
}
