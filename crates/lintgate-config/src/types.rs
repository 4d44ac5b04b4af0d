use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub github: GithubConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportConfig {
    #[serde(default = "default_report_globs")]
    pub globs: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            globs: default_report_globs(),
        }
    }
}

fn default_report_globs() -> Vec<String> {
    vec!["**/build/reports/lint-results.xml".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: String, // "text" | "json"
    #[serde(default = "default_mode")]
    pub mode: String, // "warn" | "enforce"
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            mode: default_mode(),
        }
    }
}

fn default_format() -> String {
    "text".to_string()
}

fn default_mode() -> String {
    "warn".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GithubConfig {
    #[serde(default = "default_check_name")]
    pub check_name: String,
    #[serde(default = "default_check_title")]
    pub check_title: String,
    #[serde(default = "default_max_annotations_per_request")]
    pub max_annotations_per_request: usize, // 1..=50, the check-run API cap
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            check_name: default_check_name(),
            check_title: default_check_title(),
            max_annotations_per_request: default_max_annotations_per_request(),
        }
    }
}

fn default_check_name() -> String {
    "Android Lint".to_string()
}

fn default_check_title() -> String {
    "Android Lint results".to_string()
}

fn default_max_annotations_per_request() -> usize {
    50
}
