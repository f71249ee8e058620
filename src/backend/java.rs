//! Java/JDBC backend
//!
//! Fields become camelCase members, table access goes through
//! `PreparedStatement` placeholders instead of host variables.

use super::common;
use super::emit::{pad, param, FieldEmitter, Join, Selection};
use crate::control::GenerationRun;
use crate::error::Result;
use crate::schema::FieldMeta;
use crate::trigger::{FnTrigger, TriggerRegistry};
use crate::util::{to_camel_case, to_pascal_case};
use std::sync::OnceLock;

const NO_TABLE: &str = "// no table bound";

/// The Java registry
pub fn registry() -> &'static TriggerRegistry {
    static REGISTRY: OnceLock<TriggerRegistry> = OnceLock::new();
    REGISTRY.get_or_init(build)
}

fn build() -> TriggerRegistry {
    let mut registry = TriggerRegistry::new("java");
    common::register(&mut registry);
    for trigger in TRIGGERS {
        registry.register(*trigger);
    }
    registry
}

const TRIGGERS: &[FnTrigger] = &[
    FnTrigger::line("CMNT", "Comment line: |text|", None, |run, params| {
        let text = params.join(" ");
        let text = text.trim_end();
        let pad = pad(run.context().token_column);
        Ok(Some(if text.is_empty() {
            format!("{}//", pad)
        } else {
            format!("{}// {}", pad, text)
        }))
    }),
    FnTrigger::token("CLASS", "Class name derived from the program name", Some(0), |run, _| {
        Ok(Some(to_pascal_case(run.context().program_name())))
    }),
    FnTrigger::token("FIELDS", "Member declarations", Some(0), |run, _| {
        Ok(Some(
            FieldEmitter::statements()
                .emit(run, |_, f| {
                    format!("private {} {};", f.java_type(), to_camel_case(&f.column_name))
                })
                .unwrap_or_else(|| NO_TABLE.to_string()),
        ))
    }),
    FnTrigger::line("ACCESSORS", "Getter and setter per field", Some(0), accessors),
    FnTrigger::token("COLS", "Comma-separated column list", Some(0), |run, _| {
        Ok(Some(
            FieldEmitter::new(Selection::All, Join::Inline(", "))
                .emit(run, |_, f| f.column_name.clone())
                .unwrap_or_else(|| "*".to_string()),
        ))
    }),
    FnTrigger::token("KEYWHERE", "WHERE clause with ? placeholders", Some(0), |run, _| {
        Ok(Some(
            FieldEmitter::new(Selection::Keys, Join::Inline(" AND "))
                .emit(run, |i, f| {
                    let clause = format!("{} = ?", f.column_name);
                    if i == 0 {
                        format!("WHERE {}", clause)
                    } else {
                        clause
                    }
                })
                .unwrap_or_else(|| "WHERE 1 = 1".to_string()),
        ))
    }),
    FnTrigger::token("BINDKEYS", "Bind key values: |statement|source|", Some(2), bind_keys),
    FnTrigger::token("READROW", "Copy a result row: |resultset|target|", Some(2), read_row),
];

fn accessors(run: &mut GenerationRun<'_>, _: &[String]) -> Result<Option<String>> {
    let pad = pad(run.context().token_column);
    let Some(fields) = FieldEmitter::statements().fields(run) else {
        return Ok(Some(format!("{}{}", pad, NO_TABLE)));
    };
    let blocks: Vec<String> = fields
        .iter()
        .map(|f| {
            let ty = f.java_type();
            let member = to_camel_case(&f.column_name);
            let property = to_pascal_case(&f.column_name);
            [
                format!("public {} get{}() {{", ty, property),
                format!("    return {};", member),
                "}".to_string(),
                String::new(),
                format!("public void set{}({} {}) {{", property, ty, member),
                format!("    this.{} = {};", member, member),
                "}".to_string(),
            ]
            .iter()
            .map(|line| {
                if line.is_empty() {
                    String::new()
                } else {
                    format!("{}{}", pad, line)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
        })
        .collect();
    Ok(Some(blocks.join("\n\n")))
}

/// `rs.getString("COL")`, or `getObject` with the target class for
/// temporal types
fn read_expr(field: &FieldMeta, result_set: &str) -> String {
    match field.jdbc_accessor() {
        "Object" => format!(
            "{}.getObject(\"{}\", {}.class)",
            result_set,
            field.column_name,
            field.java_type()
        ),
        accessor => format!("{}.get{}(\"{}\")", result_set, accessor, field.column_name),
    }
}

fn bind_keys(run: &mut GenerationRun<'_>, params: &[String]) -> Result<Option<String>> {
    let statement = param(params, 0).unwrap_or("stmt");
    let source = param(params, 1).unwrap_or("key");
    Ok(Some(
        FieldEmitter::statements()
            .keys()
            .emit(run, |i, f| {
                format!(
                    "{}.set{}({}, {}.get{}());",
                    statement,
                    f.jdbc_accessor(),
                    i + 1,
                    source,
                    to_pascal_case(&f.column_name)
                )
            })
            .unwrap_or_else(|| "// no key fields".to_string()),
    ))
}

fn read_row(run: &mut GenerationRun<'_>, params: &[String]) -> Result<Option<String>> {
    let result_set = param(params, 0).unwrap_or("rs");
    let target = param(params, 1).unwrap_or("row");
    Ok(Some(
        FieldEmitter::statements()
            .emit(run, |_, f| {
                format!(
                    "{}.set{}({});",
                    target,
                    to_pascal_case(&f.column_name),
                    read_expr(f, result_set)
                )
            })
            .unwrap_or_else(|| NO_TABLE.to_string()),
    ))
}
