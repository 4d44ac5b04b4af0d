use anyhow::{Context as _, Result};
use lintgate_core::{Annotation, Report};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The check-run API rejects more than 50 annotations per request.
pub const MAX_ANNOTATIONS_PER_REQUEST: usize = 50;

#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub repo: String,
    pub head_sha: String,
    pub token: String,
    pub check_name: String,
    pub check_title: String,
    pub chunk_size: usize,
    pub dry_run: bool,
}

impl PublishRequest {
    pub fn new(repo: String, head_sha: String, token: String, check_name: String) -> Self {
        let check_title = format!("{check_name} results");
        Self {
            repo,
            head_sha,
            token,
            check_name,
            check_title,
            chunk_size: MAX_ANNOTATIONS_PER_REQUEST,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishResult {
    pub check_run_url: Option<String>,
    pub chunks: usize,
    pub conclusion: String,
    pub dry_run_payload: Option<Value>,
}

/// Creates a check run for the first annotation batch, then patches the
/// remaining batches onto it. The final request carries `completed`; an empty
/// report completes in the create call.
pub fn publish_annotations(report: &Report, req: &PublishRequest) -> Result<PublishResult> {
    let conclusion = check_run_conclusion(report);
    let payloads = chunk_payloads(report, req, conclusion)?;

    if req.dry_run {
        return Ok(PublishResult {
            check_run_url: None,
            chunks: payloads.len(),
            conclusion: conclusion.to_string(),
            dry_run_payload: Some(serde_json::json!({
                "repo": req.repo,
                "head_sha": req.head_sha,
                "check_name": req.check_name,
                "check_run_payloads": payloads,
            })),
        });
    }

    let client = github_client(&req.token)?;
    let mut payloads = payloads.into_iter();
    let create_payload = payloads
        .next()
        .context("internal error: no check-run payloads were built")?;

    let created: CheckRunResponse = client
        .post(format!(
            "https://api.github.com/repos/{}/check-runs",
            req.repo
        ))
        .json(&create_payload)
        .send()
        .context("failed to create check run")?
        .error_for_status()
        .context("github returned error creating check run")?
        .json()
        .context("failed to decode check run response")?;

    let mut chunks = 1;
    for update_payload in payloads {
        client
            .patch(format!(
                "https://api.github.com/repos/{}/check-runs/{}",
                req.repo, created.id
            ))
            .json(&update_payload)
            .send()
            .context("failed to update check run")?
            .error_for_status()
            .context("github returned error updating check run")?;
        chunks += 1;
    }

    Ok(PublishResult {
        check_run_url: created.html_url,
        chunks,
        conclusion: conclusion.to_string(),
        dry_run_payload: None,
    })
}

/// Builds one payload per annotation batch. The first payload is for the
/// create call and carries `name`/`head_sha`; the rest are update payloads.
pub fn chunk_payloads(
    report: &Report,
    req: &PublishRequest,
    conclusion: &str,
) -> Result<Vec<Value>> {
    let chunk_size = req.chunk_size.clamp(1, MAX_ANNOTATIONS_PER_REQUEST);
    let mut chunks: Vec<&[Annotation]> = report.annotations.chunks(chunk_size).collect();
    if chunks.is_empty() {
        chunks.push(&[]);
    }
    let total = chunks.len();
    let summary = report.summary_line();

    let mut payloads = Vec::with_capacity(total);
    for (index, chunk) in chunks.iter().enumerate() {
        let completed = index + 1 == total;
        let mut payload = serde_json::json!({
            "status": if completed { "completed" } else { "in_progress" },
            "output": {
                "title": req.check_title,
                "summary": summary,
                "annotations": serde_json::to_value(chunk)?,
            },
        });
        let object = payload
            .as_object_mut()
            .context("internal error: check-run payload must be an object")?;
        if index == 0 {
            object.insert("name".to_string(), Value::String(req.check_name.clone()));
            object.insert("head_sha".to_string(), Value::String(req.head_sha.clone()));
        }
        if completed {
            object.insert(
                "conclusion".to_string(),
                Value::String(conclusion.to_string()),
            );
        }
        payloads.push(payload);
    }
    Ok(payloads)
}

pub fn check_run_conclusion(report: &Report) -> &'static str {
    if report.has_failures() {
        "failure"
    } else if report.annotations.is_empty() {
        "success"
    } else {
        "neutral"
    }
}

fn github_client(token: &str) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static("lintgate/0.2"));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/vnd.github+json"),
    );
    let auth = format!("Bearer {token}");
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&auth).context("failed to build auth header")?,
    );

    Client::builder()
        .default_headers(headers)
        .build()
        .context("failed to build github client")
}

#[derive(Debug, Deserialize)]
struct CheckRunResponse {
    id: u64,
    html_url: Option<String>,
}
