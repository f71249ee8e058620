//! Embedded SQL fragments built from the bound table
//!
//! Column lists are comma-newline joined, WHERE clauses put each further
//! key on its own `AND` line. Host variables are `:NAME`, or `:QUAL.NAME`
//! when the trigger's qualifier parameter is given.

use super::super::emit::{host_var, pad, param, FieldEmitter, Join, Selection};
use super::{comment_line, indented};
use crate::control::GenerationRun;
use crate::error::Result;
use crate::schema::FieldMeta;
use crate::trigger::FnTrigger;

const HOST_TABLE: &str = "HOST-TABLE";
const HOST_RECORD: &str = ":HOST-RECORD";
const DEFAULT_CURSOR: &str = "C1";

pub(super) const TRIGGERS: &[FnTrigger] = &[
    FnTrigger::token("SELCOLS", "SELECT column list", Some(0), |run, _| {
        Ok(Some(
            FieldEmitter::columns()
                .emit(run, |_, f| f.column_name.clone())
                .unwrap_or_else(|| "*".to_string()),
        ))
    }),
    FnTrigger::token("KEYCOLS", "Key column list", Some(0), |run, _| {
        Ok(Some(
            FieldEmitter::columns()
                .keys()
                .emit(run, |_, f| f.column_name.clone())
                .unwrap_or_else(|| "*".to_string()),
        ))
    }),
    FnTrigger::token("INTOVARS", "INTO host variables: |qualifier|", Some(1), into_vars),
    FnTrigger::token("INSCOLS", "INSERT column list", Some(0), |run, _| {
        Ok(Some(
            FieldEmitter::columns()
                .emit(run, |_, f| f.column_name.clone())
                .unwrap_or_else(|| "*".to_string()),
        ))
    }),
    FnTrigger::token(
        "INSVALS",
        "INSERT VALUES host variables: |qualifier|",
        Some(1),
        into_vars,
    ),
    FnTrigger::token(
        "KEYWHERE",
        "WHERE clause on the key columns: |qualifier|",
        Some(1),
        key_where,
    ),
    FnTrigger::token("ORDERBY", "ORDER BY the key columns", Some(0), |run, _| {
        Ok(Some(
            FieldEmitter::new(Selection::Keys, Join::Inline(", "))
                .emit(run, |i, f| lead(i, "ORDER BY ", &f.column_name))
                .unwrap_or_else(|| "ORDER BY 1".to_string()),
        ))
    }),
    FnTrigger::token(
        "UPDSET",
        "UPDATE SET list of non-key columns: |qualifier|",
        Some(1),
        update_set,
    ),
    FnTrigger::token("FETCH", "FETCH statement: |cursor|qualifier|", Some(2), fetch),
    FnTrigger::token("INSERT", "INSERT statement: |qualifier|", Some(1), insert),
    FnTrigger::token("UPDATE", "UPDATE statement by key: |qualifier|", Some(1), update),
    FnTrigger::token(
        "DECLCUR",
        "DECLARE CURSOR over the table: |cursor|qualifier|",
        Some(2),
        declare_cursor,
    ),
    FnTrigger::line("DCLTAB", "EXEC SQL DECLARE TABLE block", Some(0), declare_table),
];

/// `first` before the first fragment only
fn lead(position: usize, first: &str, text: &str) -> String {
    if position == 0 {
        format!("{}{}", first, text)
    } else {
        text.to_string()
    }
}

fn table_name(run: &GenerationRun<'_>) -> String {
    run.context()
        .table_name()
        .unwrap_or(HOST_TABLE)
        .to_string()
}

fn equals_host(field: &FieldMeta, qualifier: Option<&str>) -> String {
    format!("{} = {}", field.column_name, host_var(field, qualifier))
}

/// `WHERE A = :A` then `  AND B = :B` lines, aligned at `indent`
fn where_lines(keys: &[FieldMeta], qualifier: Option<&str>, indent: usize) -> String {
    FieldEmitter::statements().join_fields(keys, indent, |i, f| {
        let clause = equals_host(f, qualifier);
        if i == 0 {
            format!("WHERE {}", clause)
        } else {
            format!("  AND {}", clause)
        }
    })
}

fn into_vars(run: &mut GenerationRun<'_>, params: &[String]) -> Result<Option<String>> {
    let qualifier = param(params, 0);
    Ok(Some(
        FieldEmitter::columns()
            .emit(run, |_, f| host_var(f, qualifier))
            .unwrap_or_else(|| HOST_RECORD.to_string()),
    ))
}

fn key_where(run: &mut GenerationRun<'_>, params: &[String]) -> Result<Option<String>> {
    let qualifier = param(params, 0);
    let indent = run.context().token_column;
    Ok(Some(match FieldEmitter::columns().keys().fields(run) {
        Some(keys) => where_lines(&keys, qualifier, indent),
        None => "WHERE 1 = 1".to_string(),
    }))
}

fn update_set(run: &mut GenerationRun<'_>, params: &[String]) -> Result<Option<String>> {
    let qualifier = param(params, 0);
    let indent = run.context().token_column + 4;
    Ok(Some(
        FieldEmitter::columns()
            .non_keys()
            .emit_at(run, indent, |i, f| lead(i, "SET ", &equals_host(f, qualifier)))
            .unwrap_or_else(|| format!("SET {} = {}", HOST_TABLE, HOST_RECORD)),
    ))
}

fn fetch(run: &mut GenerationRun<'_>, params: &[String]) -> Result<Option<String>> {
    let cursor = param(params, 0).unwrap_or(DEFAULT_CURSOR).to_string();
    let qualifier = param(params, 1);
    let indent = run.context().token_column;
    // "  INTO " is 7 wide
    let vars = FieldEmitter::columns().emit_at(run, indent + 7, |_, f| host_var(f, qualifier));
    Ok(Some(match vars {
        Some(vars) => format!("FETCH {}\n{}  INTO {}", cursor, pad(indent), vars),
        None => format!("FETCH {} INTO {}", cursor, HOST_RECORD),
    }))
}

fn insert(run: &mut GenerationRun<'_>, params: &[String]) -> Result<Option<String>> {
    let qualifier = param(params, 0);
    let indent = run.context().token_column;
    let table = table_name(run);
    let Some(fields) = FieldEmitter::columns().fields(run) else {
        return Ok(Some(format!(
            "INSERT INTO {} VALUES ({})",
            table, HOST_RECORD
        )));
    };
    let emitter = FieldEmitter::columns();
    let columns = emitter.join_fields(&fields, indent + 8, |_, f| f.column_name.clone());
    let values = emitter.join_fields(&fields, indent + 8, |_, f| host_var(f, qualifier));
    let pad = pad(indent);
    Ok(Some(format!(
        "INSERT INTO {}\n{pad}       ({})\n{pad}VALUES ({})",
        table,
        columns,
        values,
        pad = pad
    )))
}

fn update(run: &mut GenerationRun<'_>, params: &[String]) -> Result<Option<String>> {
    let qualifier = param(params, 0);
    let indent = run.context().token_column;
    let table = table_name(run);
    let Some(fields) = FieldEmitter::columns().fields(run) else {
        return Ok(Some(format!(
            "UPDATE {} SET {} = {}",
            table, HOST_TABLE, HOST_RECORD
        )));
    };
    let (keys, values): (Vec<FieldMeta>, Vec<FieldMeta>) =
        fields.into_iter().partition(|f| f.is_key);

    let pad = pad(indent);
    let mut out = format!("UPDATE {}", table);
    if !values.is_empty() {
        // "   SET " is 7 wide
        let set = FieldEmitter::columns()
            .join_fields(&values, indent + 7, |_, f| equals_host(f, qualifier));
        out.push_str(&format!("\n{}   SET {}", pad, set));
    }
    if !keys.is_empty() {
        out.push_str(&format!("\n{} {}", pad, where_lines(&keys, qualifier, indent + 1)));
    }
    Ok(Some(out))
}

fn declare_cursor(run: &mut GenerationRun<'_>, params: &[String]) -> Result<Option<String>> {
    let cursor = param(params, 0).unwrap_or(DEFAULT_CURSOR).to_string();
    let qualifier = param(params, 1);
    let indent = run.context().token_column;
    let table = table_name(run);
    let Some(fields) = FieldEmitter::columns().fields(run) else {
        return Ok(Some(format!(
            "DECLARE {} CURSOR FOR SELECT * FROM {}",
            cursor, table
        )));
    };
    let keys: Vec<FieldMeta> = fields.iter().filter(|f| f.is_key).cloned().collect();

    let pad = pad(indent);
    // "    SELECT " is 11 wide
    let columns =
        FieldEmitter::columns().join_fields(&fields, indent + 11, |_, f| f.column_name.clone());
    let mut out = format!(
        "DECLARE {} CURSOR FOR\n{pad}    SELECT {}\n{pad}      FROM {}",
        cursor,
        columns,
        table,
        pad = pad
    );
    if !keys.is_empty() {
        out.push_str(&format!(
            "\n{}     {}",
            pad,
            where_lines(&keys, qualifier, indent + 5)
        ));
        let order: Vec<String> = keys.iter().map(|k| k.column_name.clone()).collect();
        out.push_str(&format!("\n{}     ORDER BY {}", pad, order.join(", ")));
    }
    Ok(Some(out))
}

fn declare_table(run: &mut GenerationRun<'_>, _: &[String]) -> Result<Option<String>> {
    let indent = run.context().token_column;
    let table = table_name(run);
    let Some(fields) = FieldEmitter::columns().fields(run) else {
        return Ok(Some(comment_line(&format!("NO FIELDS FOR DCLTAB {}", table))));
    };
    let width = fields
        .iter()
        .map(|f| f.column_name.len())
        .max()
        .unwrap_or_default();
    let last = fields.len() - 1;
    let mut body = vec![format!("EXEC SQL DECLARE {} TABLE", table)];
    for (i, field) in fields.iter().enumerate() {
        let open = if i == 0 { "( " } else { "  " };
        let null = if field.is_key { " NOT NULL" } else { "" };
        let sep = if i == last { "" } else { "," };
        body.push(format!(
            "{}{:<width$} {}{}{}",
            open,
            field.column_name,
            field.sql_type(),
            null,
            sep,
            width = width
        ));
    }
    body.push(") END-EXEC.".to_string());
    Ok(Some(indented(indent, &body)))
}

#[cfg(test)]
mod tests {
    use super::super::registry;
    use crate::control::{GenerationControl, GenerationReport, GenerationRequest};
    use crate::schema::{DataType, FieldMeta, InMemorySchema, TableMeta};
    use crate::sink::MemorySink;
    use crate::source::{LineReader, MemoryTemplateStore};
    use pretty_assertions::assert_eq;

    fn schema() -> InMemorySchema {
        InMemorySchema::new().with_table(
            TableMeta::new("BOP_RATE", 3)
                .field(FieldMeta::new("A", DataType::Char, 2).key())
                .field(FieldMeta::new("B", DataType::Integer, 4).key())
                .field(FieldMeta::new("C_AMT", DataType::Decimal, 9).with_decimals(2)),
        )
    }

    fn run(text: &str, table: Option<&str>) -> (Vec<String>, GenerationReport) {
        let store = MemoryTemplateStore::new();
        let schema = schema();
        let mut request = GenerationRequest::new("main", "PGUOBK3.cbl", "BOP", "RATE", true);
        if let Some(table) = table {
            request = request.with_table(table);
        }
        let mut sink = MemorySink::new();
        let report = GenerationControl::new(registry(), &schema, &store)
            .run(
                &request,
                Box::new(LineReader::from_text("main", text)),
                &mut sink,
            )
            .unwrap();
        (sink.into_lines(), report)
    }

    fn bound(text: &str) -> Vec<String> {
        run(text, Some("BOP_RATE")).0
    }

    fn unbound(text: &str) -> Vec<String> {
        run(text, None).0
    }

    #[test]
    fn test_key_where_references_keys_in_order() {
        assert_eq!(
            bound("    &KEYWHERE|"),
            ["    WHERE A = :A", "      AND B = :B"]
        );
        assert_eq!(unbound("    &KEYWHERE|"), ["    WHERE 1 = 1"]);
    }

    #[test]
    fn test_key_where_qualified() {
        assert_eq!(
            bound("&KEYWHERE|DCL-RATE|"),
            ["WHERE A = :DCL-RATE.A", "  AND B = :DCL-RATE.B"]
        );
    }

    #[test]
    fn test_select_columns() {
        assert_eq!(
            bound("  SELECT &SELCOLS|"),
            ["  SELECT A,", "         B,", "         C_AMT"]
        );
        assert_eq!(bound("&KEYCOLS|"), ["A,", "B"]);
        assert_eq!(unbound("  SELECT &SELCOLS|"), ["  SELECT *"]);
    }

    #[test]
    fn test_into_vars() {
        assert_eq!(bound("INTO &INTOVARS|"), ["INTO :A,", "     :B,", "     :C-AMT"]);
        assert_eq!(unbound("INTO &INTOVARS|"), ["INTO :HOST-RECORD"]);
    }

    #[test]
    fn test_order_by() {
        assert_eq!(bound("&ORDERBY|"), ["ORDER BY A, B"]);
        assert_eq!(unbound("&ORDERBY|"), ["ORDER BY 1"]);
    }

    #[test]
    fn test_update_set_skips_keys() {
        assert_eq!(bound("&UPDSET|"), ["SET C_AMT = :C-AMT"]);
    }

    #[test]
    fn test_fetch() {
        assert_eq!(
            bound("  &FETCH|CSR1|"),
            ["  FETCH CSR1", "    INTO :A,", "         :B,", "         :C-AMT"]
        );
        assert_eq!(unbound("&FETCH|"), ["FETCH C1 INTO :HOST-RECORD"]);
    }

    #[test]
    fn test_insert() {
        assert_eq!(
            bound("&INSERT|"),
            [
                "INSERT INTO BOP_RATE",
                "       (A,",
                "        B,",
                "        C_AMT)",
                "VALUES (:A,",
                "        :B,",
                "        :C-AMT)",
            ]
        );
        assert_eq!(unbound("&INSERT|"), ["INSERT INTO HOST-TABLE VALUES (:HOST-RECORD)"]);
    }

    #[test]
    fn test_update() {
        assert_eq!(
            bound("&UPDATE|"),
            [
                "UPDATE BOP_RATE",
                "   SET C_AMT = :C-AMT",
                " WHERE A = :A",
                "   AND B = :B",
            ]
        );
    }

    #[test]
    fn test_declare_cursor() {
        assert_eq!(
            bound("&DECLCUR|RATE-CSR|"),
            [
                "DECLARE RATE-CSR CURSOR FOR",
                "    SELECT A,",
                "           B,",
                "           C_AMT",
                "      FROM BOP_RATE",
                "     WHERE A = :A",
                "       AND B = :B",
                "     ORDER BY A, B",
            ]
        );
    }

    #[test]
    fn test_declare_table() {
        assert_eq!(
            bound("       &DCLTAB| ignored"),
            [
                "       EXEC SQL DECLARE BOP_RATE TABLE",
                "       ( A     CHAR(2) NOT NULL,",
                "         B     INTEGER NOT NULL,",
                "         C_AMT DECIMAL(9,2)",
                "       ) END-EXEC.",
            ]
        );
        assert_eq!(
            unbound("&DCLTAB|"),
            ["      * NO FIELDS FOR DCLTAB HOST-TABLE"]
        );
    }

    #[test]
    fn test_failed_lookup_degrades_and_is_counted() {
        let (lines, report) = run("&SELCOLS| &KEYWHERE|", Some("NO_SUCH_TABLE"));
        assert_eq!(lines, ["* WHERE 1 = 1"]);
        assert_eq!(report.schema_fallbacks, 2);
    }
}
