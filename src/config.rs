use crate::feedback::{FeedbackError, RetentionPolicy};
use crate::sync::{DirectoryPublisher, HubPublisher, PublishFile, Publisher};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Where feedback is written locally and where it is published.
///
/// `from_env` overlays `FEEDBACK_*` variables (and `HF_TOKEN`) on the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub folder: PathBuf,
    pub repo_id: Option<String>,
    pub repo_type: String,
    pub path_in_repo: String,
    pub revision: String,
    pub endpoint: String,
    pub token: Option<String>,
    pub every_secs: u64,
    pub retention: RetentionPolicy,
    pub mirror_dir: Option<PathBuf>,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("user_feedback"),
            repo_id: None,
            repo_type: "dataset".into(),
            path_in_repo: "data".into(),
            revision: "main".into(),
            endpoint: "https://huggingface.co".into(),
            token: None,
            every_secs: 60,
            retention: RetentionPolicy::Keep,
            mirror_dir: None,
        }
    }
}

impl FeedbackConfig {
    pub fn from_env() -> Result<Self, FeedbackError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, FeedbackError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(v) = get("FEEDBACK_FOLDER") {
            cfg.folder = PathBuf::from(v);
        }
        cfg.repo_id = get("FEEDBACK_REPO_ID").or(cfg.repo_id);
        if let Some(v) = get("FEEDBACK_REPO_TYPE") {
            cfg.repo_type = v;
        }
        if let Some(v) = get("FEEDBACK_PATH_IN_REPO") {
            cfg.path_in_repo = v;
        }
        if let Some(v) = get("FEEDBACK_REVISION") {
            cfg.revision = v;
        }
        if let Some(v) = get("FEEDBACK_ENDPOINT") {
            cfg.endpoint = v;
        }
        cfg.token = get("HF_TOKEN").or(cfg.token);
        if let Some(v) = get("FEEDBACK_EVERY_SECS") {
            cfg.every_secs = v.trim().parse().map_err(|_| {
                FeedbackError::Config(format!("FEEDBACK_EVERY_SECS is not a number: {v}"))
            })?;
        }
        if let Some(v) = get("FEEDBACK_RETENTION") {
            cfg.retention = v.parse()?;
        }
        if let Some(v) = get("FEEDBACK_MIRROR_DIR") {
            cfg.mirror_dir = Some(PathBuf::from(v));
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), FeedbackError> {
        if self.every_secs == 0 {
            return Err(FeedbackError::Config("sync interval must be at least 1s".into()));
        }
        if self.mirror_dir.is_none() && self.repo_id.is_none() {
            return Err(FeedbackError::Config(
                "set FEEDBACK_REPO_ID or FEEDBACK_MIRROR_DIR".into(),
            ));
        }
        Ok(())
    }

    pub fn every(&self) -> Duration {
        Duration::from_secs(self.every_secs)
    }

    /// The configured sink; a mirror directory takes precedence over the hub
    pub fn publisher(&self) -> Result<ConfiguredPublisher, FeedbackError> {
        if let Some(dir) = &self.mirror_dir {
            return Ok(ConfiguredPublisher::Directory(DirectoryPublisher::new(dir)));
        }
        let repo_id = self
            .repo_id
            .clone()
            .ok_or_else(|| FeedbackError::Config("no repository configured".into()))?;
        Ok(ConfiguredPublisher::Hub(HubPublisher::new(
            self.endpoint.clone(),
            repo_id,
            self.repo_type.clone(),
            self.revision.clone(),
            self.path_in_repo.clone(),
            self.token.clone(),
        )?))
    }
}

/// Either shipped publisher, chosen at runtime
pub enum ConfiguredPublisher {
    Hub(HubPublisher),
    Directory(DirectoryPublisher),
}

#[async_trait]
impl Publisher for ConfiguredPublisher {
    async fn publish(&self, files: &[PublishFile]) -> Result<(), FeedbackError> {
        match self {
            ConfiguredPublisher::Hub(p) => p.publish(files).await,
            ConfiguredPublisher::Directory(p) => p.publish(files).await,
        }
    }
}
