//! Host-variable declarations and MOVE/DISPLAY statements
//!
//! Numeric fields are initialized with `ZERO`, everything else with
//! `SPACES`.

use super::super::emit::{param, FieldEmitter};
use super::indented;
use crate::control::GenerationRun;
use crate::error::Result;
use crate::schema::FieldMeta;
use crate::trigger::FnTrigger;

const DEFAULT_LEVEL: &str = "05";
const HOST_RECORD: &str = "HOST-RECORD";

pub(super) const TRIGGERS: &[FnTrigger] = &[
    FnTrigger::token("FLDCNT", "Number of fields in the bound table", Some(0), |run, _| {
        Ok(Some(
            FieldEmitter::columns()
                .fields(run)
                .map_or(0, |f| f.len())
                .to_string(),
        ))
    }),
    FnTrigger::line("HOSTVARS", "Host variable declarations: |level|", Some(1), host_vars),
    FnTrigger::line("NULLINDS", "Null indicator declarations: |level|", Some(1), null_indicators),
    FnTrigger::token("MOVEINIT", "Initialize host variables: |qualifier|", Some(1), move_init),
    FnTrigger::token("MOVETO", "MOVE each field between records: |from|to|", Some(2), move_to),
    FnTrigger::token("DISPLAY", "DISPLAY each field: |qualifier|", Some(1), display),
];

/// `NAME OF QUAL` when qualified
fn qualified(field: &FieldMeta, qualifier: Option<&str>) -> String {
    match qualifier {
        Some(q) => format!("{} OF {}", field.cobol_name(), q),
        None => field.cobol_name(),
    }
}

/// Level-numbered declarations with the PIC clauses aligned
fn declarations<F>(
    fields: &[FieldMeta],
    level: &str,
    name: F,
    pic: fn(&FieldMeta) -> String,
) -> Vec<String>
where
    F: Fn(&FieldMeta) -> String,
{
    let names: Vec<String> = fields.iter().map(&name).collect();
    let width = names.iter().map(String::len).max().unwrap_or_default();
    names
        .iter()
        .zip(fields)
        .map(|(n, f)| format!("{}  {:<width$}  {}.", level, n, pic(f), width = width))
        .collect()
}

fn host_vars(run: &mut GenerationRun<'_>, params: &[String]) -> Result<Option<String>> {
    let level = param(params, 0).unwrap_or(DEFAULT_LEVEL).to_string();
    let indent = run.context().token_column;
    let body = match FieldEmitter::columns().fields(run) {
        Some(fields) => declarations(&fields, &level, FieldMeta::cobol_name, FieldMeta::pic_clause),
        None => vec![format!("{}  {}  PIC X(256).", level, HOST_RECORD)],
    };
    Ok(Some(indented(indent, &body)))
}

fn null_indicators(run: &mut GenerationRun<'_>, params: &[String]) -> Result<Option<String>> {
    let level = param(params, 0).unwrap_or(DEFAULT_LEVEL).to_string();
    let indent = run.context().token_column;
    let body = match FieldEmitter::columns().fields(run) {
        Some(fields) => declarations(
            &fields,
            &level,
            |f| format!("{}-NI", f.cobol_name()),
            |_| "PIC S9(4) COMP".to_string(),
        ),
        None => vec![format!("{}  HOST-NULL-IND  PIC S9(4) COMP.", level)],
    };
    Ok(Some(indented(indent, &body)))
}

fn move_init(run: &mut GenerationRun<'_>, params: &[String]) -> Result<Option<String>> {
    let qualifier = param(params, 0);
    Ok(Some(
        FieldEmitter::statements()
            .emit(run, |_, f| {
                format!("MOVE {} TO {}", f.initial_value(), qualified(f, qualifier))
            })
            .unwrap_or_else(|| format!("INITIALIZE {}", qualifier.unwrap_or(HOST_RECORD))),
    ))
}

fn move_to(run: &mut GenerationRun<'_>, params: &[String]) -> Result<Option<String>> {
    let from = param(params, 0);
    let to = param(params, 1);
    Ok(Some(
        FieldEmitter::statements()
            .emit(run, |_, f| {
                format!("MOVE {} TO {}", qualified(f, from), qualified(f, to))
            })
            .unwrap_or_else(|| {
                format!(
                    "MOVE {} TO {}",
                    from.unwrap_or(HOST_RECORD),
                    to.unwrap_or(HOST_RECORD)
                )
            }),
    ))
}

fn display(run: &mut GenerationRun<'_>, params: &[String]) -> Result<Option<String>> {
    let qualifier = param(params, 0);
    Ok(Some(
        FieldEmitter::statements()
            .emit(run, |_, f| {
                format!("DISPLAY '{}: ' {}", f.cobol_name(), qualified(f, qualifier))
            })
            .unwrap_or_else(|| "DISPLAY 'NO TABLE BOUND'".to_string()),
    ))
}

#[cfg(test)]
mod tests {
    use super::super::registry;
    use crate::control::{GenerationControl, GenerationRequest};
    use crate::schema::{DataType, FieldMeta, InMemorySchema, TableMeta};
    use crate::source::MemoryTemplateStore;
    use pretty_assertions::assert_eq;

    fn preview(text: &str, table: Option<&str>) -> Vec<String> {
        let store = MemoryTemplateStore::new();
        let schema = InMemorySchema::new().with_table(
            TableMeta::new("BOP_RATE", 3)
                .field(FieldMeta::new("RATE_CD", DataType::Char, 3).key())
                .field(FieldMeta::new("SEQ", DataType::SmallInt, 4).key())
                .field(
                    FieldMeta::new("BASE_PREM", DataType::Decimal, 11)
                        .with_decimals(2)
                        .with_cobol_name("WS-BASE-PREM"),
                ),
        );
        let mut request = GenerationRequest::new("main", "PGUOBK3.cbl", "BOP", "RATE", true);
        if let Some(table) = table {
            request = request.with_table(table);
        }
        GenerationControl::new(registry(), &schema, &store)
            .preview(&request, text)
            .unwrap()
    }

    #[test]
    fn test_move_init_zero_vs_spaces() {
        assert_eq!(
            preview("           &MOVEINIT|", Some("BOP_RATE")),
            [
                "           MOVE SPACES TO RATE-CD",
                "           MOVE ZERO TO SEQ",
                "           MOVE ZERO TO WS-BASE-PREM",
            ]
        );
        assert_eq!(
            preview("           &MOVEINIT|", None),
            ["           INITIALIZE HOST-RECORD"]
        );
        assert_eq!(preview("&MOVEINIT|WS-REC|", None), ["INITIALIZE WS-REC"]);
    }

    #[test]
    fn test_move_to_qualified() {
        assert_eq!(
            preview("&MOVETO|DCL-RATE|WS-RATE|", Some("BOP_RATE")),
            [
                "MOVE RATE-CD OF DCL-RATE TO RATE-CD OF WS-RATE",
                "MOVE SEQ OF DCL-RATE TO SEQ OF WS-RATE",
                "MOVE WS-BASE-PREM OF DCL-RATE TO WS-BASE-PREM OF WS-RATE",
            ]
        );
        assert_eq!(preview("&MOVETO|A|B|", None), ["MOVE A TO B"]);
    }

    #[test]
    fn test_host_vars() {
        assert_eq!(
            preview("           &HOSTVARS|10|", Some("BOP_RATE")),
            [
                "           10  RATE-CD       PIC X(3).",
                "           10  SEQ           PIC S9(4) COMP.",
                "           10  WS-BASE-PREM  PIC S9(9)V9(2) COMP-3.",
            ]
        );
        assert_eq!(
            preview("       &HOSTVARS|", None),
            ["       05  HOST-RECORD  PIC X(256)."]
        );
    }

    #[test]
    fn test_null_indicators() {
        assert_eq!(
            preview("&NULLINDS|", Some("BOP_RATE")),
            [
                "05  RATE-CD-NI       PIC S9(4) COMP.",
                "05  SEQ-NI           PIC S9(4) COMP.",
                "05  WS-BASE-PREM-NI  PIC S9(4) COMP.",
            ]
        );
    }

    #[test]
    fn test_field_count_and_display() {
        assert_eq!(preview("N = &FLDCNT|", Some("BOP_RATE")), ["N = 3"]);
        assert_eq!(preview("N = &FLDCNT|", None), ["N = 0"]);
        assert_eq!(
            preview("&DISPLAY|", Some("BOP_RATE")),
            [
                "DISPLAY 'RATE-CD: ' RATE-CD",
                "DISPLAY 'SEQ: ' SEQ",
                "DISPLAY 'WS-BASE-PREM: ' WS-BASE-PREM",
            ]
        );
    }
}
