//! Wire types for the task endpoints.
//!
//! Only the fields the client reads are typed; anything else the provider
//! sends on a [`Task`] is kept in `extra` so diagnostics can print the task
//! as it was received.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Model tag of the alignment operation.
pub const ALIGNMENT_MODEL: &str = "alignment";

// ---------------------------------------------------------------------------
// TargetStatus
// ---------------------------------------------------------------------------

/// Processing status of one [`Target`].
///
/// The enumeration is owned by the provider; values this client does not know
/// are carried verbatim in [`TargetStatus::Other`] and treated as still
/// processing. Null or non-string statuses decode to `Other` as well, so one
/// odd field never fails the whole task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum TargetStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Other(String),
}

impl TargetStatus {
    /// `true` for `completed` and `failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TargetStatus::Completed | TargetStatus::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            TargetStatus::Queued => "queued",
            TargetStatus::Processing => "processing",
            TargetStatus::Completed => "completed",
            TargetStatus::Failed => "failed",
            TargetStatus::Other(s) => s,
        }
    }
}

impl Default for TargetStatus {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for TargetStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "queued" => Self::Queued,
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Other(s),
        }
    }
}

impl<'de> Deserialize<'de> for TargetStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Self::from(s),
            Value::Null => Self::default(),
            other => Self::Other(other.to_string()),
        })
    }
}

impl From<TargetStatus> for String {
    fn from(status: TargetStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Output / Target / Task
// ---------------------------------------------------------------------------

/// One artifact produced by a completed target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Output {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Output {
    /// `format == "json"` or a `type` mentioning json.
    pub fn is_json(&self) -> bool {
        self.format.as_deref() == Some("json")
            || self.kind.as_deref().is_some_and(|k| k.contains("json"))
    }
}

/// One requested operation within a [`Task`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Target {
    #[serde(default, deserialize_with = "lenient_string")]
    pub model: String,
    #[serde(default)]
    pub status: TargetStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Vec<Output>>,
    /// Failure description. Object-shaped errors are reduced to their
    /// `message`.
    #[serde(
        default,
        deserialize_with = "error_message",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<String>,
    /// Source media URL the target was created for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Target {
    pub fn is_alignment(&self) -> bool {
        self.model == ALIGNMENT_MODEL
    }

    /// Outputs of the target, empty when none were produced.
    pub fn outputs(&self) -> &[Output] {
        self.output.as_deref().unwrap_or_default()
    }

    /// Link of the first JSON artifact, if any.
    pub fn json_output_link(&self) -> Option<&str> {
        self.outputs()
            .iter()
            .find(|o| o.is_json())
            .and_then(|o| o.link.as_deref())
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn error_message<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Object(map) => match map.get("message") {
            Some(Value::String(m)) => Some(m.clone()),
            _ => Some(Value::Object(map).to_string()),
        },
        other => Some(other.to_string()),
    })
}

/// One remote processing job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Fields the client does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    /// The target the client created the task for, searched by model.
    pub fn alignment_target(&self) -> Option<&Target> {
        self.targets.iter().find(|t| t.is_alignment())
    }

    pub fn has_alignment_target(&self) -> bool {
        self.alignment_target().is_some()
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// One entry of the `targets` list in a task-creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRequest {
    pub model: String,
    pub formats: Vec<String>,
    pub language: String,
}

impl TargetRequest {
    pub fn alignment(formats: Vec<String>, language: impl Into<String>) -> Self {
        Self {
            model: ALIGNMENT_MODEL.to_string(),
            formats,
            language: language.into(),
        }
    }
}

/// Body of `POST /tasks`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateTaskRequest {
    pub url: String,
    pub targets: Vec<TargetRequest>,
    #[serde(rename = "callbackUrl", skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

/// Query parameters of `GET /tasks`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl TaskQuery {
    pub fn page(skip: u32, take: u32) -> Self {
        Self {
            skip: Some(skip),
            take: Some(take),
            limit: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.skip.is_none() && self.take.is_none() && self.limit.is_none()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_deserializes_with_unknown_status_and_extra_fields() {
        let task: Task = serde_json::from_value(json!({
            "id": "t-1",
            "createdAt": "2025-11-18T05:22:56.000Z",
            "clientId": "abc",
            "targets": [{ "model": "alignment", "status": "uploading", "url": "https://x/a.mp3" }]
        }))
        .unwrap();

        assert_eq!(task.id, "t-1");
        assert_eq!(task.targets[0].status, TargetStatus::Other("uploading".into()));
        assert!(!task.targets[0].status.is_terminal());
        assert_eq!(task.extra.get("clientId"), Some(&json!("abc")));
    }

    #[test]
    fn null_or_odd_status_decodes_as_other() {
        let task: Task = serde_json::from_value(json!({
            "id": "t-3",
            "targets": [
                { "model": "alignment", "status": null },
                { "model": null, "status": 7 }
            ]
        }))
        .unwrap();

        assert_eq!(task.targets[0].status, TargetStatus::Other(String::new()));
        assert!(!task.targets[0].status.is_terminal());
        assert_eq!(task.targets[1].status, TargetStatus::Other("7".into()));
        assert_eq!(task.targets[1].model, "");
    }

    #[test]
    fn object_error_is_reduced_to_its_message() {
        let task: Task = serde_json::from_value(json!({
            "id": "t-4",
            "targets": [
                {
                    "model": "alignment",
                    "status": "failed",
                    "error": { "code": 422, "message": "unsupported codec" }
                },
                { "model": "alignment", "status": "failed", "error": { "code": 500 } },
                { "model": "alignment", "status": "failed", "error": null }
            ]
        }))
        .unwrap();

        assert_eq!(task.targets[0].error.as_deref(), Some("unsupported codec"));
        assert_eq!(task.targets[1].error.as_deref(), Some(r#"{"code":500}"#));
        assert_eq!(task.targets[2].error, None);
    }

    #[test]
    fn task_serializes_back_with_extra_fields() {
        let raw = json!({
            "id": "t-2",
            "clientId": "abc",
            "targets": [{ "model": "alignment", "status": "completed" }]
        });
        let task: Task = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&task).unwrap(), raw);
    }

    #[test]
    fn json_output_matches_format_or_type() {
        let by_format = Target {
            output: Some(vec![
                Output { format: Some("srt".into()), link: Some("a".into()), ..Default::default() },
                Output { format: Some("json".into()), link: Some("b".into()), ..Default::default() },
            ]),
            ..Default::default()
        };
        assert_eq!(by_format.json_output_link(), Some("b"));

        let by_type = Target {
            output: Some(vec![Output {
                kind: Some("application/json".into()),
                link: Some("c".into()),
                ..Default::default()
            }]),
            ..Default::default()
        };
        assert_eq!(by_type.json_output_link(), Some("c"));
        assert_eq!(Target::default().json_output_link(), None);
    }

    #[test]
    fn create_request_omits_missing_callback() {
        let req = CreateTaskRequest {
            url: "https://x/a.mp3".into(),
            targets: vec![TargetRequest::alignment(vec!["json".into()], "en")],
            callback_url: None,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "url": "https://x/a.mp3",
                "targets": [{ "model": "alignment", "formats": ["json"], "language": "en" }]
            })
        );
    }

    #[test]
    fn alignment_target_is_found_by_model() {
        let task = Task {
            id: "t".into(),
            targets: vec![
                Target { model: "separation".into(), ..Default::default() },
                Target { model: "alignment".into(), ..Default::default() },
            ],
            ..Default::default()
        };
        assert_eq!(task.alignment_target().map(|t| t.model.as_str()), Some("alignment"));
    }
}
