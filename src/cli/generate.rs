//! Single-template commands: generate, check, triggers

use super::util::{
    flag_value, has_flag, parse_backend_arg, parse_usize_arg, positional, print_json,
};
use rategen::{
    check_template, DirTemplateStore, EngineConfig, Error, GenerationControl, GenerationRequest,
    LineReader, NoSchema, Result, SchemaFile, SchemaProvider, UnknownTriggerPolicy,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn engine_config(args: &[String]) -> Result<EngineConfig> {
    let mut config = EngineConfig::default();
    if let Some(n) = parse_usize_arg(args, "--max-iterations")? {
        config.max_iterations = n.max(1);
    }
    if let Some(n) = parse_usize_arg(args, "--max-depth")? {
        config.max_depth = n;
    }
    if let Some(policy) = flag_value(args, "--unknown") {
        config.unknown_triggers = match policy {
            "keep" => UnknownTriggerPolicy::Keep,
            "remove" => UnknownTriggerPolicy::Remove,
            other => {
                return Err(Error::Other(format!(
                    "--unknown expects keep or remove, got '{}'",
                    other
                )))
            }
        };
    }
    Ok(config)
}

pub fn cmd_generate(args: &[String]) -> Result<ExitCode> {
    let pos = positional(args);
    if pos.len() < 2 {
        return Err(
            "Usage: rategen generate <template> <output> --lob <code> --proc <tag> [options]"
                .into(),
        );
    }
    let template = Path::new(pos[0]);
    let output = PathBuf::from(pos[1]);
    let lob = flag_value(args, "--lob").ok_or("Missing --lob <insurance line>")?;
    let process = flag_value(args, "--proc").ok_or("Missing --proc <process type>")?;
    let backend = parse_backend_arg(args)?;
    let config = engine_config(args)?;

    let schema = match flag_value(args, "--schema") {
        Some(path) => Some(SchemaFile::load(Path::new(path))?.into_provider()),
        None => None,
    };
    let provider: &dyn SchemaProvider = match &schema {
        Some(schema) => schema,
        None => &NoSchema,
    };

    let dir = match template.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = template
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Other(format!("Invalid template path: {}", template.display())))?;

    let mut request = GenerationRequest::new(name, &output, lob, process, !has_flag(args, "--sub"));
    if let Some(program) = flag_value(args, "--program") {
        request = request.with_program_name(program);
    }
    if let Some(prefix) = flag_value(args, "--prefix") {
        request = request.with_linkage_prefix(prefix);
    }
    if let Some(table) = flag_value(args, "--table") {
        request = request.with_table(table);
    }

    let store = DirTemplateStore::new(dir);
    let control = GenerationControl::new(backend.registry(), provider, &store).with_config(config);
    let report = control.generate(&request)?;

    if has_flag(args, "--json") {
        print_json(&report)?;
    } else {
        println!(
            "Generated {} ({} lines, {} sub-templates)",
            output.display(),
            report.lines_written,
            report.sub_templates
        );
        for unknown in &report.unknown_triggers {
            println!(
                "  unknown trigger {} at {}:{}",
                unknown.token, unknown.template, unknown.line
            );
        }
        for runaway in &report.runaway_lines {
            println!(
                "  expansion did not settle at {}:{}",
                runaway.template, runaway.line
            );
        }
        if report.schema_fallbacks > 0 {
            println!("  {} schema lookups fell back to placeholders", report.schema_fallbacks);
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn cmd_check(args: &[String]) -> Result<ExitCode> {
    let templates = positional(args);
    if templates.is_empty() {
        return Err("Usage: rategen check <template>... [--backend cobol|java] [--json]".into());
    }
    let registry = parse_backend_arg(args)?.registry();

    let mut reports = Vec::new();
    for path in templates {
        let mut source = LineReader::open(Path::new(path))?;
        reports.push(check_template(&mut source, registry)?);
    }
    let clean = reports.iter().all(|r| r.is_clean());

    if has_flag(args, "--json") {
        print_json(&reports)?;
    } else {
        for report in &reports {
            for finding in &report.unknown {
                println!(
                    "{}:{}:{}: unknown {} trigger {} ({})",
                    report.template,
                    finding.line,
                    finding.column,
                    report.backend,
                    finding.name,
                    finding.token
                );
            }
            if report.is_clean() {
                println!(
                    "✓ {} ({} macros on {} lines)",
                    report.template, report.tokens, report.macro_lines
                );
            }
        }
    }

    Ok(if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

#[derive(Serialize)]
struct TriggerInfo<'a> {
    name: &'a str,
    line_replacing: bool,
    max_params: Option<usize>,
    summary: &'a str,
}

pub fn cmd_triggers(args: &[String]) -> Result<ExitCode> {
    let registry = parse_backend_arg(args)?.registry();
    let infos: Vec<TriggerInfo<'_>> = registry
        .iter()
        .map(|t| TriggerInfo {
            name: t.name(),
            line_replacing: t.replaces_entire_line(),
            max_params: t.max_params(),
            summary: t.summary(),
        })
        .collect();

    if has_flag(args, "--json") {
        print_json(&infos)?;
    } else {
        println!("{} triggers ({}):\n", registry.label(), infos.len());
        for info in &infos {
            let kind = if info.line_replacing { "line " } else { "token" };
            println!("  {:<10} {}  {}", info.name, kind, info.summary);
        }
    }
    Ok(ExitCode::SUCCESS)
}
