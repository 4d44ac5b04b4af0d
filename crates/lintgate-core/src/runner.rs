use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context as _, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use lintgate_config::Config;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::model::{Annotation, LintIssue, LintLocation, Report, ReportMeta};

#[derive(Debug, Clone)]
pub struct Context {
    pub repo_root: PathBuf,
}

pub struct Runner {
    policy: Config,
}

impl Runner {
    pub fn new(policy: Config) -> Self {
        Self { policy }
    }

    /// Walks the repo root and returns report files matching the configured
    /// globs, sorted by path.
    pub fn discover_reports(&self, ctx: &Context) -> Result<Vec<PathBuf>> {
        let glob_set =
            compile_globs(&self.policy.report.globs).context("failed to compile report globs")?;

        let mut reports = Vec::new();
        for entry in walkdir::WalkDir::new(&ctx.repo_root)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| entry.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = match entry.path().strip_prefix(&ctx.repo_root) {
                Ok(rel) => rel,
                Err(_) => continue,
            };
            if glob_set.is_match(rel) {
                reports.push(entry.path().to_path_buf());
            }
        }
        reports.sort();
        Ok(reports)
    }

    /// Runs the full pipeline: discover reports, parse them, and map every
    /// in-repo issue location to an annotation.
    pub fn annotate(&self, ctx: &Context) -> Result<Report> {
        let start = Instant::now();
        let reports = self.discover_reports(ctx)?;

        let repo_root = fs::canonicalize(&ctx.repo_root)
            .with_context(|| format!("failed to resolve repo root: {}", ctx.repo_root.display()))?;

        let mut annotations = Vec::new();
        let mut skipped_locations = 0usize;
        for report_path in &reports {
            let issues = parse_report_file(report_path)?;
            for issue in &issues {
                for location in &issue.locations {
                    match relativize(&repo_root, &location.file) {
                        Some(repo_path) => {
                            annotations.push(Annotation::from_issue(issue, repo_path, location));
                        }
                        None => skipped_locations += 1,
                    }
                }
            }
        }

        Ok(Report::new(
            annotations,
            ReportMeta {
                report_files: reports.len(),
                skipped_locations,
                duration_ms: start.elapsed().as_millis(),
            },
        ))
    }
}

fn compile_globs(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("invalid glob `{pattern}`"))?);
    }
    Ok(builder.build()?)
}

/// Reads and parses one `lint-results.xml` file.
pub fn parse_report_file(path: &Path) -> Result<Vec<LintIssue>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read lint report: {}", path.display()))?;
    parse_lint_report(&text)
        .with_context(|| format!("failed to parse lint report: {}", path.display()))
}

/// Parses the Android Lint XML schema: an `<issues>` root containing
/// `<issue>` elements, each with one or more `<location>` children.
/// Elements other than `issue` and `location` are skipped.
pub fn parse_lint_report(xml: &str) -> Result<Vec<LintIssue>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut issues = Vec::new();
    let mut current: Option<LintIssue> = None;
    loop {
        match reader.read_event()? {
            Event::Start(element) => match element.name().as_ref() {
                b"issue" => current = Some(issue_from_element(&element)?),
                b"location" => attach_location(&mut current, &element)?,
                _ => {}
            },
            Event::Empty(element) => match element.name().as_ref() {
                // A self-closing issue carries no locations and maps to nothing.
                b"issue" => {
                    issues.push(issue_from_element(&element)?);
                }
                b"location" => attach_location(&mut current, &element)?,
                _ => {}
            },
            Event::End(element) => {
                if element.name().as_ref() == b"issue" {
                    if let Some(issue) = current.take() {
                        issues.push(issue);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(issues)
}

fn issue_from_element(element: &BytesStart<'_>) -> Result<LintIssue> {
    Ok(LintIssue {
        id: attr(element, "id")?.unwrap_or_default(),
        severity: attr(element, "severity")?.unwrap_or_default(),
        message: attr(element, "message")?.unwrap_or_default(),
        category: attr(element, "category")?.unwrap_or_default(),
        summary: attr(element, "summary")?.unwrap_or_default(),
        explanation: attr(element, "explanation")?.unwrap_or_default(),
        locations: Vec::new(),
    })
}

fn attach_location(current: &mut Option<LintIssue>, element: &BytesStart<'_>) -> Result<()> {
    // A location outside an issue element has nothing to attach to.
    let Some(issue) = current.as_mut() else {
        return Ok(());
    };
    let Some(file) = attr(element, "file")? else {
        return Ok(());
    };
    issue.locations.push(LintLocation {
        file,
        line: numeric_attr(element, "line")?,
        column: numeric_attr(element, "column")?,
    });
    Ok(())
}

fn attr(element: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    let Some(attribute) = element.try_get_attribute(name)? else {
        return Ok(None);
    };
    Ok(Some(attribute.unescape_value()?.into_owned()))
}

/// Line/column attributes default to 1 when missing or non-numeric; lint
/// emits file-scoped locations without them.
fn numeric_attr(element: &BytesStart<'_>, name: &str) -> Result<u32> {
    Ok(attr(element, name)?
        .and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(1))
}

/// Strips the repo root prefix from an absolute report path. Returns `None`
/// when the location does not live under the repo root.
pub fn relativize(repo_root: &Path, file: &str) -> Option<String> {
    let rel = Path::new(file).strip_prefix(repo_root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}
