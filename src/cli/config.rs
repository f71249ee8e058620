//! JSON schemas of the files rategen reads

use rategen::{ProjectFile, Result, SchemaFile};
use std::process::ExitCode;

fn print_schema<T: schemars::JsonSchema>() -> Result<ExitCode> {
    let schema = schemars::schema_for!(T);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(ExitCode::SUCCESS)
}

pub fn cmd_schema(args: &[String]) -> Result<ExitCode> {
    match args.first().map(|s| s.as_str()).unwrap_or("list") {
        "list" => {
            println!("Available schemas: project (.rategen.yaml), schema (table metadata), meta");
            Ok(ExitCode::SUCCESS)
        }
        "project" => print_schema::<ProjectFile>(),
        "schema" => print_schema::<SchemaFile>(),
        "meta" => print_schema::<rategen::GenerationMeta>(),
        other => Err(format!("Unknown schema: {}", other).into()),
    }
}
