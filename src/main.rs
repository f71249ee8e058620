//! rategen CLI
//!
//! Commands:
//!   generate - Run one template into an output file
//!   check    - Report macros a backend does not know
//!   triggers - List a backend's triggers
//!   regen    - Run the jobs of the current project
//!   status   - Show which project outputs are stale
//!   schema   - Print JSON schemas of the config files

mod cli;

use rategen::VERSION;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "-v" || a == "--verbose");
    init_tracing(verbose);

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    let result = match args[1].as_str() {
        "generate" | "gen" => cli::cmd_generate(&args[2..]),
        "check" => cli::cmd_check(&args[2..]),
        "triggers" => cli::cmd_triggers(&args[2..]),
        "regen" => cli::cmd_regen(&args[2..]),
        "status" => cli::cmd_status(&args[2..]),
        "schema" => cli::cmd_schema(&args[2..]),
        "version" | "--version" | "-V" => {
            println!("rategen {}", VERSION);
            Ok(ExitCode::SUCCESS)
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(ExitCode::SUCCESS)
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            Err("Unknown command".into())
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_usage() {
    println!(
        r#"
rategen - schema-driven macro templates for rating programs

USAGE:
    rategen <COMMAND> [OPTIONS]

COMMANDS:
    generate <template> <output>     Run one template
    check <template>...              Report macros unknown to the backend
    triggers                         List the backend's triggers
    regen [--force]                  Run stale jobs of the current project
    status [--json]                  Show stale project outputs
    schema [project|schema]          Print JSON schema of a config file
    version                          Print version

GENERATE OPTIONS:
    --lob <code>                      Insurance line (required)
    --proc <tag>                      Process type (required)
    --table <name>                    Table bound before the first line
    --schema <file>                   Schema YAML for table metadata
    --program <name>                  Program name (default: output stem)
    --prefix <prefix>                 Linkage prefix for &<| and &!|
    --sub                             Run as a sub-template (no final flush)
    --max-iterations <n>              Resolution passes per line (default: 10)
    --max-depth <n>                   Sub-template nesting bound (default: 16)
    --unknown <keep|remove>           Unknown macro policy (default: keep)

OPTIONS:
    --backend <cobol|java>            Target backend (default: cobol)
    --json                            JSON output (generate, check, triggers, regen, status)
    -v, --verbose                     Debug logging (RUST_LOG overrides)

EXAMPLES:
    rategen generate templates/rate.cbt out/PGUOBK3.cbl --lob BOP --proc RATE --table BOP_RATE --schema schema.yaml
    rategen check templates/*.cbt --backend cobol
    rategen triggers --backend java
    rategen regen --force
"#
    );
}
