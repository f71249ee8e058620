//! Project commands: regen, status

use super::util::{has_flag, print_json};
use rategen::{Error, JobOutcome, Project, Result};
use std::process::ExitCode;

fn current_project() -> Result<Project> {
    let current_dir = std::env::current_dir().map_err(Error::Io)?;
    Project::discover(&current_dir)
}

pub fn cmd_regen(args: &[String]) -> Result<ExitCode> {
    let force = has_flag(args, "--force");
    let project = current_project()?;
    let summary = project.regen(force)?;

    if has_flag(args, "--json") {
        print_json(&summary)?;
    } else {
        for outcome in &summary.outcomes {
            match outcome {
                JobOutcome::Generated {
                    output,
                    reason,
                    report,
                } => println!(
                    "  ✓ {} ({}, {} lines)",
                    output.display(),
                    reason.describe(),
                    report.lines_written
                ),
                JobOutcome::Skipped { output } => println!("  - {} (up to date)", output.display()),
                JobOutcome::Failed { output, error } => {
                    println!("  ✗ {}: {}", output.display(), error)
                }
            }
        }
        println!(
            "\n{}: {} generated, {} skipped, {} failed",
            project.file.project.name,
            summary.generated(),
            summary.skipped(),
            summary.failed()
        );
    }

    Ok(if summary.failed() == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

pub fn cmd_status(args: &[String]) -> Result<ExitCode> {
    let project = current_project()?;
    let statuses = project.status()?;

    if has_flag(args, "--json") {
        print_json(&statuses)?;
        return Ok(ExitCode::SUCCESS);
    }

    println!("rategen project {}\n", project.file.project.name);
    println!("Root: {}", project.root.display());
    println!("Jobs: {}", statuses.len());

    let stale: Vec<_> = statuses.iter().filter(|s| s.staleness.is_stale()).collect();
    for status in &stale {
        println!(
            "  {} <- {} [{}]: {}",
            status.output.display(),
            status.template,
            status.backend,
            status.staleness.describe()
        );
    }
    if stale.is_empty() {
        println!("\n✓ All outputs up to date");
    } else {
        println!(
            "\n⚠ {} output(s) need regeneration (run 'rategen regen')",
            stale.len()
        );
    }

    let issues = project.file.validate();
    if !issues.is_empty() {
        println!("\n⚠ Configuration issues:");
        for issue in issues {
            println!("  {}", issue);
        }
    }
    Ok(ExitCode::SUCCESS)
}
