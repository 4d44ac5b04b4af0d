use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

struct TestRepo {
    root: PathBuf,
}

impl TestRepo {
    fn create() -> TestResult<Self> {
        let mut root = std::env::temp_dir();
        let ts = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        root.push(format!("lintgate-cli-it-{}-{ts}-{seq}", std::process::id()));
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn resolved_root(&self) -> TestResult<PathBuf> {
        Ok(fs::canonicalize(&self.root)?)
    }

    fn write_file(&self, rel: &str, content: &str) -> TestResult<()> {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    fn write_lint_report(&self, rel: &str, severity: &str) -> TestResult<()> {
        let resolved = self.resolved_root()?;
        self.write_file(
            rel,
            &format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<issues format="6" by="lint 8.1.0">
    <issue
        id="SampleIssue"
        severity="{severity}"
        message="sample message"
        category="Correctness"
        summary="Sample summary"
        explanation="Sample explanation.">
        <location
            file="{root}/app/src/main/Main.kt"
            line="7"
            column="2"/>
    </issue>
</issues>
"#,
                root = resolved.display(),
            ),
        )
    }
}

impl Drop for TestRepo {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

fn run_lintgate(repo_root: &Path, args: &[&str]) -> TestResult<Output> {
    Ok(Command::new(env!("CARGO_BIN_EXE_lintgate"))
        .current_dir(repo_root)
        .args(args)
        .output()?)
}

#[test]
fn annotate_json_flow_is_stable() -> TestResult<()> {
    let repo = TestRepo::create()?;
    repo.write_lint_report("app/build/reports/lint-results.xml", "Warning")?;

    let output = run_lintgate(repo.root(), &["annotate", "--format", "json"])?;
    assert!(
        output.status.success(),
        "annotate should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout)?;
    let report: serde_json::Value = serde_json::from_str(&stdout)?;

    assert_eq!(report["report_files"], 1);
    assert_eq!(report["warning_count"], 1);
    assert_eq!(report["failure_count"], 0);
    assert_eq!(
        report["annotations"][0]["path"],
        "app/src/main/Main.kt"
    );
    assert_eq!(report["annotations"][0]["annotation_level"], "warning");

    Ok(())
}

#[test]
fn annotate_without_reports_warns_and_exits_zero() -> TestResult<()> {
    let repo = TestRepo::create()?;
    repo.write_file("src/lib.rs", "pub fn nothing() {}\n")?;

    let output = run_lintgate(repo.root(), &["annotate"])?;
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no lint reports matched"));
    assert!(String::from_utf8_lossy(&output.stdout).contains("No annotations."));

    Ok(())
}

#[test]
fn enforce_mode_fails_on_failure_annotations() -> TestResult<()> {
    let repo = TestRepo::create()?;
    repo.write_lint_report("app/build/reports/lint-results.xml", "Error")?;

    let output = run_lintgate(repo.root(), &["annotate", "--mode", "enforce"])?;
    assert_eq!(output.status.code(), Some(1));

    let warn_only = run_lintgate(repo.root(), &["annotate", "--mode", "warn"])?;
    assert!(warn_only.status.success());

    Ok(())
}

#[test]
fn invalid_mode_from_cli_exits_with_input_code() -> TestResult<()> {
    let repo = TestRepo::create()?;

    let output = run_lintgate(repo.root(), &["annotate", "--mode", "loud"])?;
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("annotate.mode"));

    Ok(())
}

#[test]
fn invalid_config_exits_with_config_code() -> TestResult<()> {
    let repo = TestRepo::create()?;
    repo.write_file("lintgate.toml", "[output]\nformat = \"markdown\"\n")?;

    let output = run_lintgate(repo.root(), &["annotate"])?;
    assert_eq!(output.status.code(), Some(3));

    Ok(())
}

#[test]
fn github_publish_without_required_env_exits_with_publish_code() -> TestResult<()> {
    let repo = TestRepo::create()?;
    repo.write_lint_report("app/build/reports/lint-results.xml", "Warning")?;

    let output = Command::new(env!("CARGO_BIN_EXE_lintgate"))
        .current_dir(repo.root())
        .args(["annotate", "--github-publish"])
        .env_remove("GITHUB_REPOSITORY")
        .env_remove("GITHUB_EVENT_PATH")
        .env_remove("GITHUB_SHA")
        .env_remove("GITHUB_TOKEN")
        .output()?;
    assert_eq!(output.status.code(), Some(6));

    Ok(())
}

#[test]
fn github_publish_dry_run_writes_payload_file() -> TestResult<()> {
    let repo = TestRepo::create()?;
    repo.write_lint_report("app/build/reports/lint-results.xml", "Warning")?;
    let payload_path = repo.root().join("artifacts/github-dry-run.json");

    let output = Command::new(env!("CARGO_BIN_EXE_lintgate"))
        .current_dir(repo.root())
        .args([
            "annotate",
            "--format",
            "json",
            "--github-publish",
            "--github-dry-run",
            "--github-repo",
            "example/repo",
            "--github-sha",
            "deadbeef",
            "--github-dry-run-output",
            payload_path
                .to_str()
                .ok_or("invalid payload output path utf8")?,
        ])
        .env_remove("GITHUB_TOKEN")
        .output()?;
    assert!(
        output.status.success(),
        "dry-run publish should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let payload: serde_json::Value = serde_json::from_str(&fs::read_to_string(payload_path)?)?;
    assert_eq!(payload["repo"], "example/repo");
    assert_eq!(payload["head_sha"], "deadbeef");
    let check_runs = payload["check_run_payloads"]
        .as_array()
        .ok_or("check_run_payloads must be an array")?;
    assert_eq!(check_runs.len(), 1);
    assert_eq!(check_runs[0]["status"], "completed");
    assert_eq!(check_runs[0]["conclusion"], "neutral");

    Ok(())
}

#[test]
fn report_glob_override_limits_discovery() -> TestResult<()> {
    let repo = TestRepo::create()?;
    repo.write_lint_report("app/build/reports/lint-results.xml", "Warning")?;
    repo.write_lint_report("custom/lint.xml", "Error")?;

    let output = run_lintgate(
        repo.root(),
        &[
            "annotate",
            "--format",
            "json",
            "--report-glob",
            "custom/*.xml",
        ],
    )?;
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_str(&String::from_utf8(output.stdout)?)?;
    assert_eq!(report["report_files"], 1);
    assert_eq!(report["failure_count"], 1);
    assert_eq!(report["warning_count"], 0);

    Ok(())
}
