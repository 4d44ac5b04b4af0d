use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context as _, Result};
use clap::{Args, Parser, Subcommand};
use lintgate_config::{Config, ConfigError};
use lintgate_core::{Context, Report, Runner};
use lintgate_github::{publish_annotations, PublishRequest};
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(
    name = "lintgate",
    version,
    about = "Publishes Android Lint results as check-run annotations."
)]
struct Cli {
    /// Repo root (default: current dir)
    #[arg(long)]
    repo: Option<PathBuf>,

    /// Config file path (default: lintgate.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover lint reports and map them to annotations
    Annotate(Box<AnnotateArgs>),

    /// Print environment and config diagnostics
    Doctor,
}

#[derive(Args, Debug)]
struct AnnotateArgs {
    /// Output format: text|json
    #[arg(long)]
    format: Option<String>,

    /// Gate mode: warn|enforce
    #[arg(long)]
    mode: Option<String>,

    /// Report glob override (repeatable, replaces config globs)
    #[arg(long)]
    report_glob: Vec<String>,

    /// Publish annotations to a GitHub check run
    #[arg(long)]
    github_publish: bool,

    /// Override target repository (owner/repo)
    #[arg(long)]
    github_repo: Option<String>,

    /// Override commit SHA for the check run
    #[arg(long)]
    github_sha: Option<String>,

    /// Environment variable name for GitHub token (default: GITHUB_TOKEN)
    #[arg(long)]
    github_token_env: Option<String>,

    /// Check-run name override
    #[arg(long)]
    github_check_name: Option<String>,

    /// Build GitHub payloads but do not call the GitHub API
    #[arg(long)]
    github_dry_run: bool,

    /// Write dry-run payload JSON to a file
    #[arg(long)]
    github_dry_run_output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnnotateErrorKind {
    Input,
    Config,
    Runtime,
    Output,
    Publish,
}

impl AnnotateErrorKind {
    fn as_str(self) -> &'static str {
        match self {
            AnnotateErrorKind::Input => "input",
            AnnotateErrorKind::Config => "config",
            AnnotateErrorKind::Runtime => "runtime",
            AnnotateErrorKind::Output => "output",
            AnnotateErrorKind::Publish => "publish",
        }
    }

    fn exit_code(self) -> i32 {
        match self {
            AnnotateErrorKind::Input => 2,
            AnnotateErrorKind::Config => 3,
            AnnotateErrorKind::Runtime => 4,
            AnnotateErrorKind::Output => 5,
            AnnotateErrorKind::Publish => 6,
        }
    }
}

#[derive(Debug)]
struct AnnotateError {
    kind: AnnotateErrorKind,
    source: anyhow::Error,
}

impl AnnotateError {
    fn new(kind: AnnotateErrorKind, source: anyhow::Error) -> Self {
        Self { kind, source }
    }

    fn render(&self) -> String {
        format!(
            "lintgate annotate error [{}]: {:#}",
            self.kind.as_str(),
            self.source
        )
    }

    fn print(&self) {
        eprintln!("{}", self.render());
    }

    fn exit_code(&self) -> i32 {
        self.kind.exit_code()
    }
}

#[derive(Debug, Clone, Copy)]
enum OptionSource {
    Cli,
    Config,
}

struct ResolvedAnnotateOptions {
    format: String,
    mode: String,
}

type AnnotateResult<T> = std::result::Result<T, AnnotateError>;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let repo_root = cli.repo.unwrap_or(std::env::current_dir()?);

    match cli.cmd {
        Command::Doctor => run_doctor(&repo_root, cli.config.as_deref()),
        Command::Annotate(annotate) => {
            let code = match execute_annotate(&repo_root, cli.config.as_deref(), *annotate) {
                Ok(code) => code,
                Err(err) => {
                    err.print();
                    err.exit_code()
                }
            };
            std::process::exit(code);
        }
    }
}

fn run_doctor(repo_root: &Path, config_override: Option<&Path>) -> Result<()> {
    let config_path = resolve_config_path(repo_root, config_override);
    println!("lintgate doctor");
    println!("- repo_root: {}", repo_root.display());
    println!(
        "- config_path: {}",
        config_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<default only>".to_string())
    );

    let cfg = match load_config(config_path.as_deref()) {
        Ok(cfg) => {
            println!("- config: ok");
            cfg
        }
        Err(err) => {
            println!("- config: error ({err:#})");
            return Ok(());
        }
    };

    let runner = Runner::new(cfg.clone());
    let ctx = Context {
        repo_root: repo_root.to_path_buf(),
    };
    match runner.discover_reports(&ctx) {
        Ok(reports) => {
            println!(
                "- reports: {} file(s) matched {:?}",
                reports.len(),
                cfg.report.globs
            );
            for report in reports {
                println!("  - {}", report.display());
            }
        }
        Err(err) => println!("- reports: error ({err:#})"),
    }

    for env_name in ["GITHUB_REPOSITORY", "GITHUB_SHA", "GITHUB_EVENT_PATH"] {
        match std::env::var(env_name) {
            Ok(value) => println!("- {env_name}: {value}"),
            Err(_) => println!("- {env_name}: <unset>"),
        }
    }

    Ok(())
}

fn execute_annotate(
    repo_root: &Path,
    config_override: Option<&Path>,
    annotate: AnnotateArgs,
) -> AnnotateResult<i32> {
    let AnnotateArgs {
        format,
        mode,
        report_glob,
        github_publish,
        github_repo,
        github_sha,
        github_token_env,
        github_check_name,
        github_dry_run,
        github_dry_run_output,
    } = annotate;

    let config_path = resolve_config_path(repo_root, config_override);
    let mut cfg = load_config(config_path.as_deref()).map_err(|err| {
        AnnotateError::new(
            AnnotateErrorKind::Config,
            anyhow::Error::new(err).context("failed to load config"),
        )
    })?;

    if !report_glob.is_empty() {
        cfg.report.globs = report_glob;
        lintgate_config::validate_config(&cfg).map_err(|err| {
            AnnotateError::new(
                AnnotateErrorKind::Input,
                anyhow::Error::new(err).context("invalid value for annotate.report_glob from cli"),
            )
        })?;
    }

    let opts = resolve_annotate_options(&cfg, format.as_deref(), mode.as_deref())?;

    let runner = Runner::new(cfg.clone());
    let ctx = Context {
        repo_root: repo_root.to_path_buf(),
    };
    let report = runner.annotate(&ctx).map_err(|err| {
        AnnotateError::new(
            AnnotateErrorKind::Runtime,
            err.context("failed to build annotations from lint reports"),
        )
    })?;

    if report.report_files == 0 {
        eprintln!(
            "warning: no lint reports matched {:?} under {}",
            cfg.report.globs,
            repo_root.display()
        );
    }

    if github_publish {
        let req = resolve_publish_request(
            &cfg,
            github_repo,
            github_sha,
            github_token_env,
            github_check_name,
            github_dry_run,
        )
        .map_err(|err| {
            AnnotateError::new(
                AnnotateErrorKind::Publish,
                err.context("failed to resolve GitHub publish inputs"),
            )
        })?;
        let published = publish_annotations(&report, &req).map_err(|err| {
            AnnotateError::new(
                AnnotateErrorKind::Publish,
                err.context("failed to publish check run to GitHub"),
            )
        })?;
        if let Some(payload) = published.dry_run_payload.as_ref() {
            emit_dry_run_payload(payload, github_dry_run_output.as_deref())?;
        }
        if let Some(url) = published.check_run_url {
            eprintln!(
                "published check run: {url} ({} chunk(s), conclusion: {})",
                published.chunks, published.conclusion
            );
        }
    }

    match opts.format.as_str() {
        "json" => {
            let pretty = serde_json::to_string_pretty(&report).map_err(|err| {
                AnnotateError::new(
                    AnnotateErrorKind::Output,
                    anyhow!("failed to encode json report: {err}"),
                )
            })?;
            println!("{pretty}");
        }
        _ => print_text(&report),
    }

    Ok(gate_exit_code(&opts.mode, report.has_failures()))
}

fn emit_dry_run_payload(payload: &Value, output: Option<&Path>) -> AnnotateResult<()> {
    let pretty = serde_json::to_string_pretty(payload).map_err(|err| {
        AnnotateError::new(
            AnnotateErrorKind::Output,
            anyhow!("failed to encode github dry-run payload: {err}"),
        )
    })?;
    eprintln!("github dry-run payload:\n{pretty}");
    if let Some(path) = output {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                AnnotateError::new(
                    AnnotateErrorKind::Output,
                    anyhow!("failed to create dry-run output directory: {parent:?}: {err}"),
                )
            })?;
        }
        fs::write(path, pretty).map_err(|err| {
            AnnotateError::new(
                AnnotateErrorKind::Output,
                anyhow!("failed to write github dry-run payload: {path:?}: {err}"),
            )
        })?;
    }
    Ok(())
}

fn resolve_publish_request(
    cfg: &Config,
    github_repo: Option<String>,
    github_sha: Option<String>,
    github_token_env: Option<String>,
    github_check_name: Option<String>,
    github_dry_run: bool,
) -> Result<PublishRequest> {
    let repo = github_repo
        .or_else(|| std::env::var("GITHUB_REPOSITORY").ok())
        .context("github repository was not provided (use --github-repo or GITHUB_REPOSITORY)")?;

    let head_sha = match github_sha {
        Some(sha) => sha,
        None => detect_head_sha_from_env()
            .or_else(|| std::env::var("GITHUB_SHA").ok())
            .context(
                "head SHA was not provided (use --github-sha, pull_request.head.sha, or GITHUB_SHA)",
            )?,
    };

    let token_env = github_token_env.unwrap_or_else(|| "GITHUB_TOKEN".to_string());
    let token = if github_dry_run {
        std::env::var(&token_env).unwrap_or_else(|_| "<dry-run-token>".to_string())
    } else {
        std::env::var(&token_env)
            .with_context(|| format!("missing GitHub token env var: {token_env}"))?
    };

    let check_name = github_check_name.unwrap_or_else(|| cfg.github.check_name.clone());
    let mut req = PublishRequest::new(repo, head_sha, token, check_name);
    req.check_title = cfg.github.check_title.clone();
    req.chunk_size = cfg.github.max_annotations_per_request;
    req.dry_run = github_dry_run;
    Ok(req)
}

fn detect_head_sha_from_env() -> Option<String> {
    let payload = load_github_event_payload()?;
    pr_head_sha_from_event_payload(&payload)
}

fn load_github_event_payload() -> Option<Value> {
    let event_path = std::env::var("GITHUB_EVENT_PATH").ok()?;
    let payload = match fs::read_to_string(&event_path) {
        Ok(payload) => payload,
        Err(err) => {
            eprintln!("warning: failed to read GITHUB_EVENT_PATH ({event_path}): {err}");
            return None;
        }
    };
    match serde_json::from_str::<Value>(&payload) {
        Ok(json) => Some(json),
        Err(err) => {
            eprintln!("warning: failed to parse github event json ({event_path}): {err}");
            None
        }
    }
}

fn pr_head_sha_from_event_payload(payload: &Value) -> Option<String> {
    payload
        .get("pull_request")
        .and_then(|pr| pr.get("head"))
        .and_then(|head| head.get("sha"))
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

fn resolve_config_path(repo_root: &Path, override_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = override_path {
        if path.is_absolute() {
            return Some(path.to_path_buf());
        }
        return Some(repo_root.join(path));
    }

    for candidate in ["lintgate.toml", ".lintgate/lintgate.toml"] {
        let path = repo_root.join(candidate);
        if path.exists() {
            return Some(path);
        }
    }

    None
}

fn load_config(path: Option<&Path>) -> std::result::Result<Config, ConfigError> {
    match path {
        Some(path) => lintgate_config::load_from_typed(path),
        None => Ok(Config::default()),
    }
}

fn resolve_annotate_options(
    cfg: &Config,
    format: Option<&str>,
    mode: Option<&str>,
) -> AnnotateResult<ResolvedAnnotateOptions> {
    let (format_raw, format_source) = if let Some(value) = format {
        (value, OptionSource::Cli)
    } else {
        (cfg.output.format.as_str(), OptionSource::Config)
    };
    let (mode_raw, mode_source) = if let Some(value) = mode {
        (value, OptionSource::Cli)
    } else {
        (cfg.output.mode.as_str(), OptionSource::Config)
    };

    Ok(ResolvedAnnotateOptions {
        format: parse_format(format_raw, format_source)?,
        mode: parse_mode(mode_raw, mode_source)?,
    })
}

fn parse_format(raw: &str, source: OptionSource) -> AnnotateResult<String> {
    match raw {
        "text" | "json" => Ok(raw.to_string()),
        _ => Err(invalid_annotate_option(
            "format",
            raw,
            "text|json",
            source,
        )),
    }
}

fn parse_mode(raw: &str, source: OptionSource) -> AnnotateResult<String> {
    match raw {
        "warn" | "enforce" => Ok(raw.to_string()),
        _ => Err(invalid_annotate_option(
            "mode",
            raw,
            "warn|enforce",
            source,
        )),
    }
}

fn invalid_annotate_option(
    field: &str,
    raw: &str,
    expected: &str,
    source: OptionSource,
) -> AnnotateError {
    let (kind, from) = match source {
        OptionSource::Cli => (AnnotateErrorKind::Input, "cli"),
        OptionSource::Config => (AnnotateErrorKind::Config, "config"),
    };
    AnnotateError::new(
        kind,
        anyhow!("invalid value for annotate.{field} from {from}: `{raw}` (expected: {expected})"),
    )
}

fn gate_exit_code(mode: &str, has_failures: bool) -> i32 {
    if mode == "enforce" && has_failures {
        1
    } else {
        0
    }
}

fn print_text(report: &Report) {
    println!("{}", report.summary_line());
    println!("Duration: {}ms", report.duration_ms);

    if report.annotations.is_empty() {
        println!("\nNo annotations.");
        return;
    }

    println!("\nAnnotations ({}):", report.annotations.len());
    for annotation in &report.annotations {
        println!(
            "- [{}] {}:{}:{} {}",
            annotation.annotation_level.as_str().to_uppercase(),
            annotation.path,
            annotation.start_line,
            annotation.start_column,
            annotation.title
        );
        println!("  {}", annotation.message);
    }
}
