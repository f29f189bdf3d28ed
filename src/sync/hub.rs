use crate::feedback::FeedbackError;
use crate::sync::{PublishFile, Publisher};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Commits the feedback folder to a dataset repository over HTTP.
///
/// Each publish is one commit carrying the full current content of every
/// changed file under `path_in_repo`.
pub struct HubPublisher {
    client: Client,
    endpoint: String,
    repo_id: String,
    repo_type: String,
    revision: String,
    path_in_repo: String,
    token: Option<String>,
}

impl HubPublisher {
    pub fn new(
        endpoint: impl Into<String>,
        repo_id: impl Into<String>,
        repo_type: impl Into<String>,
        revision: impl Into<String>,
        path_in_repo: impl Into<String>,
        token: Option<String>,
    ) -> Result<Self, FeedbackError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            repo_id: repo_id.into(),
            repo_type: repo_type.into(),
            revision: revision.into(),
            path_in_repo: path_in_repo.into().trim_matches('/').to_string(),
            token,
        })
    }

    pub fn commit_url(&self) -> String {
        format!(
            "{}/api/{}s/{}/commit/{}",
            self.endpoint, self.repo_type, self.repo_id, self.revision
        )
    }

    /// NDJSON commit payload: a header line, then one line per file
    pub fn commit_body(&self, files: &[PublishFile]) -> Result<String, FeedbackError> {
        let mut lines = Vec::with_capacity(files.len() + 1);
        lines.push(serde_json::to_string(&json!({
            "key": "header",
            "value": {
                "summary": format!("Scheduled feedback sync ({} files)", files.len()),
                "description": "",
            },
        }))?);
        for file in files {
            lines.push(serde_json::to_string(&json!({
                "key": "file",
                "value": {
                    "path": self.repo_path(&file.name),
                    "content": STANDARD.encode(&file.contents),
                    "encoding": "base64",
                },
            }))?);
        }
        let mut body = lines.join("\n");
        body.push('\n');
        Ok(body)
    }

    fn repo_path(&self, name: &str) -> String {
        if self.path_in_repo.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.path_in_repo, name)
        }
    }
}

#[async_trait]
impl Publisher for HubPublisher {
    async fn publish(&self, files: &[PublishFile]) -> Result<(), FeedbackError> {
        let body = self.commit_body(files)?;
        let mut request = self
            .client
            .post(self.commit_url())
            .header("content-type", "application/x-ndjson")
            .body(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(FeedbackError::Publish(format!(
                "{} returned {}: {}",
                self.repo_id, status, text
            )));
        }
        Ok(())
    }
}
