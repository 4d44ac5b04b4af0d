pub mod model;
pub mod runner;

pub use model::{Annotation, AnnotationLevel, LintIssue, LintLocation, Report, ReportMeta};
pub use runner::{parse_lint_report, parse_report_file, relativize, Context, Runner};
