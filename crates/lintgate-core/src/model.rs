use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationLevel {
    Notice,
    Warning,
    Failure,
}

impl AnnotationLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AnnotationLevel::Notice => "notice",
            AnnotationLevel::Warning => "warning",
            AnnotationLevel::Failure => "failure",
        }
    }

    /// Maps an Android Lint severity attribute to a check-run annotation level.
    /// Unknown severities are treated as failures.
    pub fn from_lint_severity(raw: &str) -> Self {
        match raw {
            "Warning" => AnnotationLevel::Warning,
            "Informational" => AnnotationLevel::Notice,
            _ => AnnotationLevel::Failure,
        }
    }
}

/// A single location inside a lint `<issue>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

/// One `<issue>` record as parsed from a lint report.
#[derive(Debug, Clone, Default)]
pub struct LintIssue {
    pub id: String,
    pub severity: String,
    pub message: String,
    pub category: String,
    pub summary: String,
    pub explanation: String,
    pub locations: Vec<LintLocation>,
}

/// A check-run annotation in the shape the GitHub API expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub start_column: u32,
    pub annotation_level: AnnotationLevel,
    pub message: String,
    pub title: String,
    pub raw_details: String,
}

impl Annotation {
    pub fn from_issue(issue: &LintIssue, repo_path: String, location: &LintLocation) -> Self {
        Self {
            path: repo_path,
            start_line: location.line,
            end_line: location.line,
            start_column: location.column,
            annotation_level: AnnotationLevel::from_lint_severity(&issue.severity),
            message: issue.message.clone(),
            title: format!("{} - {}", issue.category, issue.summary),
            raw_details: issue.explanation.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub annotations: Vec<Annotation>,
    pub notice_count: usize,
    pub warning_count: usize,
    pub failure_count: usize,
    pub report_files: usize,
    pub skipped_locations: usize,
    pub duration_ms: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    pub report_files: usize,
    pub skipped_locations: usize,
    pub duration_ms: u128,
}

impl Report {
    pub fn new(annotations: Vec<Annotation>, meta: ReportMeta) -> Self {
        let count = |level: AnnotationLevel| {
            annotations
                .iter()
                .filter(|a| a.annotation_level == level)
                .count()
        };
        let notice_count = count(AnnotationLevel::Notice);
        let warning_count = count(AnnotationLevel::Warning);
        let failure_count = count(AnnotationLevel::Failure);

        Self {
            annotations,
            notice_count,
            warning_count,
            failure_count,
            report_files: meta.report_files,
            skipped_locations: meta.skipped_locations,
            duration_ms: meta.duration_ms,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failure_count > 0
    }

    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "{} annotation(s) from {} report file(s) (failure: {}, warning: {}, notice: {})",
            self.annotations.len(),
            self.report_files,
            self.failure_count,
            self.warning_count,
            self.notice_count
        );
        if self.skipped_locations > 0 {
            line.push_str(&format!(
                "; {} location(s) outside the repository were skipped",
                self.skipped_locations
            ));
        }
        line
    }
}
