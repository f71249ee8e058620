//! CLI utility helpers

use rategen::{Backend, Error, Result};
use serde::Serialize;

/// Flags that take a value
const VALUE_FLAGS: &[&str] = &[
    "--backend",
    "-b",
    "--lob",
    "--proc",
    "--table",
    "--schema",
    "--program",
    "--prefix",
    "--max-iterations",
    "--max-depth",
    "--unknown",
];

/// Value following `flag`
pub fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

/// Arguments that are neither flags nor flag values
pub fn positional(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut skip = false;
    for arg in args {
        if skip {
            skip = false;
            continue;
        }
        if VALUE_FLAGS.contains(&arg.as_str()) {
            skip = true;
        } else if !arg.starts_with('-') {
            out.push(arg.as_str());
        }
    }
    out
}

/// Parse --backend argument (default: cobol)
pub fn parse_backend_arg(args: &[String]) -> Result<Backend> {
    match flag_value(args, "--backend").or_else(|| flag_value(args, "-b")) {
        Some(name) => Backend::parse(name).ok_or_else(|| {
            Error::Other(format!(
                "Unknown backend: {} (expected cobol or java)",
                name
            ))
        }),
        None => Ok(Backend::default()),
    }
}

/// Parse a numeric flag
pub fn parse_usize_arg(args: &[String], flag: &str) -> Result<Option<usize>> {
    flag_value(args, flag)
        .map(|v| {
            v.parse::<usize>()
                .map_err(|_| Error::Other(format!("{} expects a number, got '{}'", flag, v)))
        })
        .transpose()
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
