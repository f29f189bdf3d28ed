use feedback_sync::config::{ConfiguredPublisher, FeedbackConfig};
use feedback_sync::feedback::{FeedbackError, RetentionPolicy};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

fn from_vars(vars: &[(&str, &str)]) -> Result<FeedbackConfig, FeedbackError> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    FeedbackConfig::from_lookup(|key| map.get(key).cloned())
}

#[test]
fn defaults_with_repo() {
    let cfg = from_vars(&[("FEEDBACK_REPO_ID", "acme/chat-feedback")]).unwrap();
    assert_eq!(cfg.folder, PathBuf::from("user_feedback"));
    assert_eq!(cfg.repo_type, "dataset");
    assert_eq!(cfg.path_in_repo, "data");
    assert_eq!(cfg.every(), Duration::from_secs(60));
    assert_eq!(cfg.retention, RetentionPolicy::Keep);
    assert!(matches!(cfg.publisher().unwrap(), ConfiguredPublisher::Hub(_)));
}

#[test]
fn env_overrides() {
    let cfg = from_vars(&[
        ("FEEDBACK_FOLDER", "/var/feedback"),
        ("FEEDBACK_MIRROR_DIR", "/mnt/share"),
        ("FEEDBACK_EVERY_SECS", " 5 "),
        ("FEEDBACK_RETENTION", "remove-confirmed"),
        ("HF_TOKEN", "hf_secret"),
        ("FEEDBACK_REVISION", ""),
    ])
    .unwrap();
    assert_eq!(cfg.folder, PathBuf::from("/var/feedback"));
    assert_eq!(cfg.every_secs, 5);
    assert_eq!(cfg.retention, RetentionPolicy::RemoveConfirmed);
    assert_eq!(cfg.token.as_deref(), Some("hf_secret"));
    assert_eq!(cfg.revision, "main");
    assert!(matches!(cfg.publisher().unwrap(), ConfiguredPublisher::Directory(_)));
}

#[test]
fn rejects_bad_values() {
    for (key, value) in [
        ("FEEDBACK_EVERY_SECS", "soon"),
        ("FEEDBACK_EVERY_SECS", "0"),
        ("FEEDBACK_RETENTION", "forever"),
    ] {
        let err = from_vars(&[("FEEDBACK_REPO_ID", "a/b"), (key, value)]).unwrap_err();
        assert!(matches!(err, FeedbackError::Config(_)), "{key}={value}");
    }

    let err = from_vars(&[]).unwrap_err();
    assert!(matches!(err, FeedbackError::Config(_)));
}

#[test]
fn deserializes_partial_document() {
    let cfg: FeedbackConfig = serde_json::from_str(
        r#"{"repo_id": "acme/x", "every_secs": 30, "retention": "remove_confirmed"}"#,
    )
    .unwrap();
    assert_eq!(cfg.repo_id.as_deref(), Some("acme/x"));
    assert_eq!(cfg.every_secs, 30);
    assert_eq!(cfg.retention, RetentionPolicy::RemoveConfirmed);
    assert_eq!(cfg.endpoint, "https://huggingface.co");
    assert!(cfg.validate().is_ok());
}
