use std::fmt;
use std::str::FromStr;

use chrono::{
  DateTime,
  Utc
};
use serde::{
  Deserialize,
  Serialize
};
use thiserror::Error;

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
)]
#[serde(transparent)]
pub struct TodoId(String);

impl TodoId {
  pub fn new(
    raw: impl Into<String>
  ) -> Self {
    Self(raw.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for TodoId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for TodoId {
  fn from(raw: &str) -> Self {
    Self(raw.to_string())
  }
}

/// Lifecycle state of a todo. Each
/// variant is also a board column.
#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TodoStatus {
  Pending,
  InProgress,
  Completed,
  Cancelled
}

impl TodoStatus {
  pub const ALL: [TodoStatus; 4] = [
    TodoStatus::Pending,
    TodoStatus::InProgress,
    TodoStatus::Completed,
    TodoStatus::Cancelled
  ];

  /// Wire form, also used as the
  /// column id on the board.
  pub fn as_str(self) -> &'static str {
    match self {
      | TodoStatus::Pending => "PENDING",
      | TodoStatus::InProgress => {
        "IN_PROGRESS"
      }
      | TodoStatus::Completed => {
        "COMPLETED"
      }
      | TodoStatus::Cancelled => {
        "CANCELLED"
      }
    }
  }

  pub fn label(self) -> String {
    self.as_str().replace('_', " ")
  }
}

impl fmt::Display for TodoStatus {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq, Error,
)]
#[error("unknown todo status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for TodoStatus {
  type Err = UnknownStatus;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let normalized = s
      .trim()
      .to_ascii_uppercase()
      .replace(['-', ' '], "_");
    TodoStatus::ALL
      .into_iter()
      .find(|status| {
        status.as_str() == normalized
      })
      .ok_or_else(|| {
        UnknownStatus(s.to_string())
      })
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
  pub id:          TodoId,
  pub title:       String,
  #[serde(default)]
  pub description: Option<String>,
  pub status:      TodoStatus,
  #[serde(default)]
  pub due_date:    Option<DateTime<Utc>>,
  #[serde(default)]
  pub tags:        Vec<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub created_at:  Option<DateTime<Utc>>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub updated_at:  Option<DateTime<Utc>>
}

/// Body of a create or update request.
/// `id` is absent for creates.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
#[serde(rename_all = "camelCase")]
pub struct UpsertTodo {
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub id:          Option<TodoId>,
  pub title:       String,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub description: Option<String>,
  pub status:      TodoStatus,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub due_date:    Option<DateTime<Utc>>,
  #[serde(default)]
  pub tags:        Vec<String>
}

#[derive(
  Debug, Clone, PartialEq, Eq, Error,
)]
pub enum PayloadError {
  #[error("todo title must not be empty")]
  EmptyTitle,
  #[error("update payload requires an id")]
  MissingId
}

impl UpsertTodo {
  pub fn new(
    title: impl Into<String>,
    status: TodoStatus
  ) -> Self {
    Self {
      id: None,
      title: title.into(),
      description: None,
      status,
      due_date: None,
      tags: Vec::new()
    }
  }

  /// Carries every field of `todo`
  /// over; callers change what they
  /// need afterwards.
  pub fn from_todo(todo: &Todo) -> Self {
    Self {
      id:          Some(todo.id.clone()),
      title:       todo.title.clone(),
      description: todo
        .description
        .clone(),
      status:      todo.status,
      due_date:    todo.due_date,
      tags:        todo.tags.clone()
    }
  }

  pub fn validate(
    &self
  ) -> Result<(), PayloadError> {
    if self.title.trim().is_empty() {
      return Err(
        PayloadError::EmptyTitle
      );
    }
    Ok(())
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
#[serde(rename_all = "camelCase")]
pub struct TodoListResult {
  pub todos:       Vec<Todo>,
  pub total:       u64,
  pub page:        u64,
  pub limit:       u64,
  pub total_pages: u64
}

impl TodoListResult {
  pub fn find(
    &self,
    id: &TodoId
  ) -> Option<&Todo> {
    self
      .todos
      .iter()
      .find(|todo| &todo.id == id)
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Success,
  #[default]
  Info,
  Warning,
  Error
}

impl fmt::Display for Severity {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    let text = match self {
      | Severity::Success => "success",
      | Severity::Info => "info",
      | Severity::Warning => "warning",
      | Severity::Error => "error"
    };
    f.write_str(text)
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct NotificationMessage {
  pub message:  String,
  #[serde(default)]
  pub severity: Option<Severity>
}

impl NotificationMessage {
  pub fn new(
    message: impl Into<String>
  ) -> Self {
    Self {
      message:  message.into(),
      severity: None
    }
  }

  pub fn with_severity(
    message: impl Into<String>,
    severity: Severity
  ) -> Self {
    Self {
      message:  message.into(),
      severity: Some(severity)
    }
  }

  pub fn effective_severity(
    &self
  ) -> Severity {
    self.severity.unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_parses_loose_forms() {
    assert_eq!(
      "in progress"
        .parse::<TodoStatus>()
        .expect("parse"),
      TodoStatus::InProgress
    );
    assert_eq!(
      "Completed"
        .parse::<TodoStatus>()
        .expect("parse"),
      TodoStatus::Completed
    );
    assert!(
      "DONE"
        .parse::<TodoStatus>()
        .is_err()
    );
  }

  #[test]
  fn status_label_replaces_underscore() {
    assert_eq!(
      TodoStatus::InProgress.label(),
      "IN PROGRESS"
    );
  }

  #[test]
  fn todo_reads_camel_case_wire_shape() {
    let raw = r#"{
      "id": "t1",
      "title": "Ship it",
      "description": null,
      "status": "IN_PROGRESS",
      "dueDate": "2024-05-01T10:00:00Z",
      "tags": ["ops"]
    }"#;
    let todo: Todo =
      serde_json::from_str(raw)
        .expect("decode todo");
    assert_eq!(todo.id.as_str(), "t1");
    assert_eq!(
      todo.status,
      TodoStatus::InProgress
    );
    assert!(todo.due_date.is_some());
    assert_eq!(todo.tags, vec!["ops"]);
  }

  #[test]
  fn upsert_omits_absent_fields() {
    let payload =
      UpsertTodo::new("Write docs", TodoStatus::Pending);
    let value =
      serde_json::to_value(&payload)
        .expect("encode");
    assert_eq!(
      value,
      serde_json::json!({
        "title": "Write docs",
        "status": "PENDING",
        "tags": []
      })
    );
  }

  #[test]
  fn blank_title_is_rejected() {
    let payload =
      UpsertTodo::new("  ", TodoStatus::Pending);
    assert_eq!(
      payload.validate(),
      Err(PayloadError::EmptyTitle)
    );
  }

  #[test]
  fn errors_describe_themselves() {
    assert_eq!(
      "DONE"
        .parse::<TodoStatus>()
        .expect_err("unknown")
        .to_string(),
      "unknown todo status: DONE"
    );
    assert_eq!(
      PayloadError::MissingId.to_string(),
      "update payload requires an id"
    );
  }

  #[test]
  fn list_result_reads_total_pages() {
    let raw = r#"{"todos":[],"total":0,"page":1,"limit":20,"totalPages":0}"#;
    let result: TodoListResult =
      serde_json::from_str(raw)
        .expect("decode list");
    assert_eq!(result.limit, 20);
    assert_eq!(result.total_pages, 0);
  }

  #[test]
  fn severity_defaults_to_info() {
    let msg = NotificationMessage::new(
      "hello"
    );
    assert_eq!(
      msg.effective_severity(),
      Severity::Info
    );
  }
}
