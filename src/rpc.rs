//! Wire envelopes of the single-endpoint protocol spoken by the remote
//! backend: requests are `{action, payload}`, responses `{ok, data?, error?}`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::models::{wire, AttendanceItem, Id};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RpcRequest {
    /// `<entity>.<operation>`, e.g. `students.add`.
    pub action: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RpcResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RpcResponse {
    pub fn success(data: Value) -> Self {
        Self { ok: true, data: Some(data), error: None }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self { ok: false, data: None, error: Some(error.into()) }
    }
}

/// Action names understood by the endpoint.
pub mod actions {
    pub const CLASSES_GET_ALL: &str = "classes.getAll";
    pub const CLASSES_GET_BY_ID: &str = "classes.getById";
    pub const CLASSES_ADD: &str = "classes.add";
    pub const CLASSES_UPDATE: &str = "classes.update";
    pub const CLASSES_DELETE: &str = "classes.delete";

    pub const STUDENTS_GET_ALL: &str = "students.getAll";
    pub const STUDENTS_GET_BY_ID: &str = "students.getById";
    pub const STUDENTS_ADD: &str = "students.add";
    pub const STUDENTS_ADD_MANY: &str = "students.addMany";
    pub const STUDENTS_UPDATE: &str = "students.update";
    pub const STUDENTS_DELETE: &str = "students.delete";

    pub const PARENTS_GET_ALL: &str = "parents.getAll";
    pub const PARENTS_GET_BY_ID: &str = "parents.getById";
    pub const PARENTS_ADD: &str = "parents.add";
    pub const PARENTS_UPDATE: &str = "parents.update";
    pub const PARENTS_DELETE: &str = "parents.delete";

    pub const ATTENDANCE_MARK: &str = "attendance.mark";
    pub const ATTENDANCE_GET_ALL: &str = "attendance.getAll";
    pub const ATTENDANCE_GET_BY_CLASS_AND_DATE: &str = "attendance.getByClassAndDate";
    pub const ATTENDANCE_GET_BY_STUDENT: &str = "attendance.getByStudent";

    pub const BEHAVIOR_GET_ALL: &str = "behavior.getAll";
    pub const BEHAVIOR_ADD: &str = "behavior.add";
    pub const BEHAVIOR_UPDATE: &str = "behavior.update";
    pub const BEHAVIOR_DELETE: &str = "behavior.delete";

    pub const ANNOUNCEMENTS_GET_ALL: &str = "announcements.getAll";
    pub const ANNOUNCEMENTS_ADD: &str = "announcements.add";
    pub const ANNOUNCEMENTS_UPDATE: &str = "announcements.update";
    pub const ANNOUNCEMENTS_DELETE: &str = "announcements.delete";

    pub const DOCUMENTS_GET_ALL: &str = "documents.getAll";
    pub const DOCUMENTS_ADD: &str = "documents.add";
    pub const DOCUMENTS_UPDATE: &str = "documents.update";
    pub const DOCUMENTS_DELETE: &str = "documents.delete";

    pub const TASKS_GET_ALL: &str = "tasks.getAll";
    pub const TASKS_ADD: &str = "tasks.add";
    pub const TASKS_UPDATE: &str = "tasks.update";
    pub const TASKS_DELETE: &str = "tasks.delete";
    pub const TASK_REPLIES_GET_ALL: &str = "taskReplies.getAll";
    pub const TASK_REPLIES_ADD: &str = "taskReplies.add";

    pub const THREADS_GET_ALL: &str = "threads.getAll";
    pub const THREADS_GET_OR_CREATE: &str = "threads.getOrCreate";
    pub const MESSAGES_GET_ALL: &str = "messages.getAll";
    pub const MESSAGES_ADD: &str = "messages.add";

    pub const REPORTS_WEEKLY: &str = "reports.weeklySummary";
    pub const REPORTS_MONTHLY: &str = "reports.monthlySummary";
    pub const REPORTS_DASHBOARD: &str = "reports.dashboard";
}

// ---------------- payload shapes ----------------

#[derive(Debug, Serialize, Deserialize)]
pub struct IdArg {
    pub id: Id,
}

/// Update payload: the id next to the patched fields, `{id, ...patch}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct WithId<T> {
    pub id: Id,
    #[serde(flatten)]
    pub fields: T,
}

/// Create payload carrying a client-side timestamp, `{...fields, createdAt}`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stamped<T> {
    #[serde(flatten)]
    pub fields: T,
    #[serde(with = "wire::timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_id: Option<Id>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<Id>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentArg {
    pub student_id: Id,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<Id>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreadFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<Id>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadKeyArg {
    pub thread_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDateArgs {
    pub class_id: Id,
    #[serde(with = "wire::date")]
    pub date: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceArgs {
    pub class_id: Id,
    #[serde(with = "wire::date")]
    pub date: NaiveDate,
    pub items: Vec<AttendanceItem>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyArgs {
    pub class_id: Id,
    #[serde(with = "wire::date")]
    pub week_start: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyArgs {
    pub class_id: Id,
    pub month: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UpdateParent;
    use serde_json::json;

    #[test]
    fn update_payload_flattens_patch_next_to_id() {
        let body = WithId {
            id: "p-1".to_string(),
            fields: UpdateParent { phone: Some("0901".into()), ..Default::default() },
        };
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({"id": "p-1", "phone": "0901"}));
    }

    #[test]
    fn failure_envelope_omits_data() {
        let v = serde_json::to_value(RpcResponse::failure("boom")).unwrap();
        assert_eq!(v, json!({"ok": false, "error": "boom"}));
    }

    #[test]
    fn request_payload_defaults_to_null() {
        let req: RpcRequest = serde_json::from_str(r#"{"action":"classes.getAll"}"#).unwrap();
        assert_eq!(req.action, actions::CLASSES_GET_ALL);
        assert!(req.payload.is_null());
    }
}
