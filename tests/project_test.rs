//! End-to-end project runs on disk

use pretty_assertions::assert_eq;
use rategen::config::PROJECT_FILE;
use rategen::{
    Backend, DirTemplateStore, Error, GenerationControl, GenerationRequest, JobOutcome, NoSchema,
    Project, Staleness,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PROJECT: &str = r#"
version: 1
project:
  name: rating
defaults:
  schema: schema.yaml
  linkage_prefix: ABC
jobs:
  - template: rate.cbt
    output: PGUOBK3.cbl
    insurance_line: BOP
    process_type: RATE
    table: BOP_RATE
  - template: rate.jvt
    output: BopRate.java
    insurance_line: BOP
    process_type: RATE
    program_name: BOP_RATE
    backend: java
    table: BOP_RATE
"#;

const SCHEMA: &str = r#"
tables:
  - name: BOP_BASE
    index: 1
    fields:
      - column: POLICY_NO
        type: char
        length: 10
        key: true
  - name: BOP_RATE
    index: 2
    fields:
      - column: RATE_CD
        type: char
        length: 4
        key: true
      - column: BASE_PREM
        type: decimal
        length: 11
        decimals: 2
"#;

const COBOL: &str = "       PROGRAM-ID. &PGM|.
&INCLUDE|banner.cpy|
&EACHTABLE|table.cpy|BOP_|
           SELECT &SELCOLS|
             FROM &TABNAME|
           &KEYWHERE|
&!|ABC|      * not linked
";

const JAVA: &str = "public class &CLASS| {
&!|ABC|    // not linked
}
";

fn write(root: &Path, name: &str, text: &str) {
    let path = root.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn project_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, PROJECT_FILE, PROJECT);
    write(root, "schema.yaml", SCHEMA);
    write(root, "templates/rate.cbt", COBOL);
    write(root, "templates/rate.jvt", JAVA);
    write(root, "templates/banner.cpy", "      * &LOB| &PROC|");
    write(root, "templates/table.cpy", "      * &TABIDX| &TABNAME| &FLDCNT|");
    dir
}

#[test]
fn test_regen_writes_every_job() {
    let dir = project_dir();
    let project = Project::load(dir.path()).unwrap();

    let summary = project.regen(false).unwrap();
    assert_eq!(summary.generated(), 2, "{:?}", summary.outcomes);
    assert_eq!(summary.failed(), 0);

    let cobol = fs::read_to_string(dir.path().join("generated/PGUOBK3.cbl")).unwrap();
    let lines: Vec<&str> = cobol.lines().collect();
    assert_eq!(
        lines,
        [
            "       PROGRAM-ID. PGUOBK3.",
            "      * BOP RATE",
            "      * 1 BOP_BASE 1",
            "      * 2 BOP_RATE 2",
            "           SELECT RATE_CD,",
            "                  BASE_PREM",
            "             FROM BOP_RATE",
            "           WHERE RATE_CD = :RATE-CD",
        ]
    );

    let java = fs::read_to_string(dir.path().join("generated/BopRate.java")).unwrap();
    assert_eq!(java, "public class BopRate {\n}\n");
}

#[test]
fn test_status_tracks_template_edits() {
    let dir = project_dir();
    let project = Project::load(dir.path()).unwrap();

    let before = project.status().unwrap();
    assert!(before
        .iter()
        .all(|s| s.staleness == Staleness::NeverGenerated));

    project.regen(false).unwrap();
    assert!(project
        .status()
        .unwrap()
        .iter()
        .all(|s| s.staleness == Staleness::Fresh));

    write(dir.path(), "templates/rate.jvt", "class &CLASS| {}\n");
    let after = project.status().unwrap();
    assert_eq!(after[0].staleness, Staleness::Fresh);
    assert_eq!(after[1].staleness, Staleness::TemplateChanged);
    assert_eq!(after[1].backend, Backend::Java);

    let summary = project.regen(false).unwrap();
    assert_eq!(summary.generated(), 1);
    assert_eq!(summary.skipped(), 1);
}

#[test]
fn test_fragment_edit_marks_output_stale() {
    let dir = project_dir();
    let project = Project::load(dir.path()).unwrap();
    project.regen(false).unwrap();

    write(dir.path(), "templates/banner.cpy", "      * EDITED &LOB|");
    let status = project.status().unwrap();
    assert_eq!(status[0].staleness, Staleness::TemplateChanged);
    assert_eq!(status[1].staleness, Staleness::Fresh);

    let summary = project.regen(false).unwrap();
    assert_eq!(summary.generated(), 1);
    let cobol = fs::read_to_string(dir.path().join("generated/PGUOBK3.cbl")).unwrap();
    assert_eq!(cobol.lines().nth(1), Some("      * EDITED BOP"));

    write(dir.path(), "templates/table.cpy", "      * &TABNAME|");
    assert_eq!(
        project.status().unwrap()[0].staleness,
        Staleness::TemplateChanged
    );
}

#[test]
fn test_schema_edit_marks_outputs_stale() {
    let dir = project_dir();
    let project = Project::load(dir.path()).unwrap();
    project.regen(false).unwrap();

    write(dir.path(), "schema.yaml", &SCHEMA.replace("length: 4", "length: 6"));
    assert!(project
        .status()
        .unwrap()
        .iter()
        .all(|s| s.staleness == Staleness::SchemaChanged));
}

#[test]
fn test_missing_sub_template_leaves_no_output() {
    let dir = project_dir();
    fs::remove_file(dir.path().join("templates/banner.cpy")).unwrap();
    let project = Project::load(dir.path()).unwrap();

    let summary = project.regen(false).unwrap();
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.generated(), 1);
    match &summary.outcomes[0] {
        JobOutcome::Failed { error, .. } => assert!(error.contains("banner.cpy"), "{}", error),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(!dir.path().join("generated/PGUOBK3.cbl").exists());

    let leftovers: Vec<_> = fs::read_dir(dir.path().join("generated"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| !n.starts_with('.') && n != "BopRate.java")
        .collect();
    assert!(leftovers.is_empty(), "{:?}", leftovers);
}

#[test]
fn test_failed_run_keeps_previous_output() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "main.cbt", "first\n&INCLUDE|gone.cpy|\n");
    let output = dir.path().join("out/PGM1.cbl");
    write(dir.path(), "out/PGM1.cbl", "previous\n");

    let store = DirTemplateStore::new(dir.path());
    let control = GenerationControl::new(Backend::Cobol.registry(), &NoSchema, &store);
    let request = GenerationRequest::new("main.cbt", &output, "BOP", "RATE", true);
    let err = control.generate(&request).unwrap_err();
    assert!(matches!(err, Error::TemplateNotFound { .. }), "{:?}", err);
    assert_eq!(fs::read_to_string(&output).unwrap(), "previous\n");
}

#[test]
fn test_nesting_bound_stops_recursive_include() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "loop.cpy", "&INCLUDE|loop.cpy|\n");
    let store = DirTemplateStore::new(dir.path());
    let control = GenerationControl::new(Backend::Cobol.registry(), &NoSchema, &store);
    let request =
        GenerationRequest::new("loop.cpy", dir.path().join("LOOP.cbl"), "BOP", "RATE", true);

    let err = control.generate(&request).unwrap_err();
    assert!(matches!(err, Error::NestingTooDeep { depth: 16, .. }), "{:?}", err);
    assert!(!dir.path().join("LOOP.cbl").exists());
}

#[test]
fn test_latin1_comment_does_not_stop_generation() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("rate.cbt"),
        b"      * PR\xc9MIUM\n       PROGRAM-ID. &PGM|.\n",
    )
    .unwrap();
    let output = dir.path().join("PGUOBK3.cbl");
    let store = DirTemplateStore::new(dir.path());
    let control = GenerationControl::new(Backend::Cobol.registry(), &NoSchema, &store);
    let request = GenerationRequest::new("rate.cbt", &output, "BOP", "RATE", true);

    let report = control.generate(&request).unwrap();
    assert_eq!(report.lines_written, 2);
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "      * PR\u{FFFD}MIUM\n       PROGRAM-ID. PGUOBK3.\n"
    );
}
