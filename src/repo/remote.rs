//! Relay store: every operation becomes one `{action, payload}` POST to the
//! spreadsheet-backed endpoint. List filters are applied here, after
//! fetching the whole collection, because the endpoint only offers `getAll`.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use super::*;
use crate::rpc::{actions, *};

#[derive(Clone)]
pub struct RemoteRepo {
    client: reqwest::Client,
    endpoint: String,
}

fn no_args() -> Value {
    Value::Object(Default::default())
}

fn decode<T: DeserializeOwned>(action: &str, data: Value) -> RepoResult<T> {
    serde_json::from_value(data).map_err(|e| RepoError::Remote(format!("{action}: unexpected response data: {e}")))
}

impl RemoteRepo {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self { client, endpoint: endpoint.into() }
    }

    async fn exchange(&self, action: &str, payload: Value) -> RepoResult<Value> {
        let body = serde_json::to_string(&RpcRequest { action: action.to_string(), payload })
            .map_err(|e| RepoError::InvalidInput(e.to_string()))?;
        // text/plain keeps browsers from sending a CORS pre-flight the endpoint can't answer
        let resp = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "text/plain;charset=utf-8")
            .body(body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RepoError::Remote(format!("network response was not ok: {status}")));
        }
        let envelope: RpcResponse = resp.json().await?;
        if !envelope.ok {
            return Err(RepoError::Remote(envelope.error.unwrap_or_else(|| "API Error".to_string())));
        }
        Ok(envelope.data.unwrap_or(Value::Null))
    }

    async fn call_raw(&self, action: &str, payload: impl Serialize + Send) -> RepoResult<Value> {
        let payload = serde_json::to_value(payload).map_err(|e| RepoError::InvalidInput(e.to_string()))?;
        debug!(action, "remote call");
        self.exchange(action, payload).await.map_err(|e| {
            error!(action, "remote call failed: {e}");
            e
        })
    }

    async fn call<T: DeserializeOwned>(&self, action: &str, payload: impl Serialize + Send) -> RepoResult<T> {
        let data = self.call_raw(action, payload).await?;
        decode(action, data)
    }

    /// Lookup by id; a `null` result means the row does not exist.
    async fn call_get<T: DeserializeOwned>(&self, action: &str, id: &str, entity: &'static str) -> RepoResult<T> {
        match self.call_raw(action, IdArg { id: id.to_string() }).await? {
            Value::Null => Err(RepoError::NotFound(entity)),
            data => decode(action, data),
        }
    }

    async fn call_unit(&self, action: &str, payload: impl Serialize + Send) -> RepoResult<()> {
        self.call_raw(action, payload).await.map(|_| ())
    }

    async fn get_all<T: DeserializeOwned>(&self, action: &str) -> RepoResult<Vec<T>> {
        self.call(action, no_args()).await
    }

    async fn update<P: Serialize + Send, T: DeserializeOwned>(&self, action: &str, id: &str, fields: P) -> RepoResult<T> {
        self.call(action, WithId { id: id.to_string(), fields }).await
    }

    async fn delete(&self, action: &str, id: &str) -> RepoResult<()> {
        self.call_unit(action, IdArg { id: id.to_string() }).await
    }
}

fn keep_matching<T>(mut items: Vec<T>, want: Option<&str>, key: impl Fn(&T) -> &str) -> Vec<T> {
    if let Some(w) = want {
        items.retain(|i| key(i) == w);
    }
    items
}

#[async_trait]
impl ClassRepo for RemoteRepo {
    async fn list_classes(&self) -> RepoResult<Vec<ClassInfo>> {
        self.get_all(actions::CLASSES_GET_ALL).await
    }
    async fn get_class(&self, id: &str) -> RepoResult<ClassInfo> {
        self.call_get(actions::CLASSES_GET_BY_ID, id, "class").await
    }
    async fn create_class(&self, new: NewClass) -> RepoResult<ClassInfo> {
        self.call(actions::CLASSES_ADD, new).await
    }
    async fn update_class(&self, id: &str, upd: UpdateClass) -> RepoResult<ClassInfo> {
        self.update(actions::CLASSES_UPDATE, id, upd).await
    }
    async fn delete_class(&self, id: &str) -> RepoResult<()> {
        self.delete(actions::CLASSES_DELETE, id).await
    }
}

#[async_trait]
impl StudentRepo for RemoteRepo {
    async fn list_students(&self, class_id: Option<&str>) -> RepoResult<Vec<Student>> {
        let all = self.get_all(actions::STUDENTS_GET_ALL).await?;
        Ok(keep_matching(all, class_id, |s: &Student| s.class_id.as_str()))
    }
    async fn get_student(&self, id: &str) -> RepoResult<Student> {
        self.call_get(actions::STUDENTS_GET_BY_ID, id, "student").await
    }
    async fn create_student(&self, new: NewStudent) -> RepoResult<Student> {
        self.call(actions::STUDENTS_ADD, new).await
    }
    /// One `students.add` per row, in order. Stops at the first failure;
    /// rows already sent stay created.
    async fn create_students(&self, new: Vec<NewStudent>) -> RepoResult<Vec<Student>> {
        let mut created = Vec::with_capacity(new.len());
        for s in new {
            created.push(self.create_student(s).await?);
        }
        Ok(created)
    }
    async fn update_student(&self, id: &str, upd: UpdateStudent) -> RepoResult<Student> {
        self.update(actions::STUDENTS_UPDATE, id, upd).await
    }
    async fn delete_student(&self, id: &str) -> RepoResult<()> {
        self.delete(actions::STUDENTS_DELETE, id).await
    }
}

#[async_trait]
impl ParentRepo for RemoteRepo {
    async fn list_parents(&self) -> RepoResult<Vec<Parent>> {
        self.get_all(actions::PARENTS_GET_ALL).await
    }
    async fn get_parent(&self, id: &str) -> RepoResult<Parent> {
        self.call_get(actions::PARENTS_GET_BY_ID, id, "parent").await
    }
    async fn create_parent(&self, new: NewParent) -> RepoResult<Parent> {
        self.call(actions::PARENTS_ADD, new).await
    }
    async fn update_parent(&self, id: &str, upd: UpdateParent) -> RepoResult<Parent> {
        self.update(actions::PARENTS_UPDATE, id, upd).await
    }
    async fn delete_parent(&self, id: &str) -> RepoResult<()> {
        self.delete(actions::PARENTS_DELETE, id).await
    }
}

#[async_trait]
impl AttendanceRepo for RemoteRepo {
    async fn mark_attendance(&self, class_id: &str, date: NaiveDate, items: Vec<AttendanceItem>) -> RepoResult<()> {
        let args = MarkAttendanceArgs { class_id: class_id.to_string(), date, items };
        self.call_unit(actions::ATTENDANCE_MARK, args).await
    }
    async fn attendance_by_class_and_date(&self, class_id: &str, date: NaiveDate) -> RepoResult<Vec<Attendance>> {
        let mut all = self.all_attendance().await?;
        all.retain(|a| a.class_id == class_id && a.date == date);
        Ok(all)
    }
    async fn attendance_by_student(&self, student_id: &str) -> RepoResult<Vec<Attendance>> {
        let all = self.all_attendance().await?;
        Ok(keep_matching(all, Some(student_id), |a: &Attendance| a.student_id.as_str()))
    }
    async fn all_attendance(&self) -> RepoResult<Vec<Attendance>> {
        self.get_all(actions::ATTENDANCE_GET_ALL).await
    }
}

#[async_trait]
impl BehaviorRepo for RemoteRepo {
    async fn list_behaviors(&self, student_id: Option<&str>) -> RepoResult<Vec<Behavior>> {
        let all = self.get_all(actions::BEHAVIOR_GET_ALL).await?;
        Ok(keep_matching(all, student_id, |b: &Behavior| b.student_id.as_str()))
    }
    async fn create_behavior(&self, new: NewBehavior) -> RepoResult<Behavior> {
        self.call(actions::BEHAVIOR_ADD, new).await
    }
    async fn update_behavior(&self, id: &str, upd: UpdateBehavior) -> RepoResult<Behavior> {
        self.update(actions::BEHAVIOR_UPDATE, id, upd).await
    }
    async fn delete_behavior(&self, id: &str) -> RepoResult<()> {
        self.delete(actions::BEHAVIOR_DELETE, id).await
    }
}

#[async_trait]
impl AnnouncementRepo for RemoteRepo {
    async fn list_announcements(&self, class_id: Option<&str>) -> RepoResult<Vec<Announcement>> {
        let all = self.get_all(actions::ANNOUNCEMENTS_GET_ALL).await?;
        let mut v = keep_matching(all, class_id, |a: &Announcement| a.class_id.as_str());
        sort_announcements(&mut v);
        Ok(v)
    }
    async fn create_announcement(&self, new: NewAnnouncement) -> RepoResult<Announcement> {
        self.call(actions::ANNOUNCEMENTS_ADD, new).await
    }
    async fn update_announcement(&self, id: &str, upd: UpdateAnnouncement) -> RepoResult<Announcement> {
        self.update(actions::ANNOUNCEMENTS_UPDATE, id, upd).await
    }
    async fn delete_announcement(&self, id: &str) -> RepoResult<()> {
        self.delete(actions::ANNOUNCEMENTS_DELETE, id).await
    }
}

#[async_trait]
impl DocumentRepo for RemoteRepo {
    async fn list_documents(&self, class_id: Option<&str>) -> RepoResult<Vec<Document>> {
        let all = self.get_all(actions::DOCUMENTS_GET_ALL).await?;
        Ok(keep_matching(all, class_id, |d: &Document| d.class_id.as_str()))
    }
    async fn create_document(&self, new: NewDocument) -> RepoResult<Document> {
        self.call(actions::DOCUMENTS_ADD, new).await
    }
    async fn update_document(&self, id: &str, upd: UpdateDocument) -> RepoResult<Document> {
        self.update(actions::DOCUMENTS_UPDATE, id, upd).await
    }
    async fn delete_document(&self, id: &str) -> RepoResult<()> {
        self.delete(actions::DOCUMENTS_DELETE, id).await
    }
}

#[async_trait]
impl TaskRepo for RemoteRepo {
    async fn list_tasks(&self, class_id: Option<&str>) -> RepoResult<Vec<Task>> {
        let all = self.get_all(actions::TASKS_GET_ALL).await?;
        Ok(keep_matching(all, class_id, |t: &Task| t.class_id.as_str()))
    }
    async fn create_task(&self, new: NewTask) -> RepoResult<Task> {
        self.call(actions::TASKS_ADD, new).await
    }
    async fn update_task(&self, id: &str, upd: UpdateTask) -> RepoResult<Task> {
        self.update(actions::TASKS_UPDATE, id, upd).await
    }
    async fn delete_task(&self, id: &str) -> RepoResult<()> {
        self.delete(actions::TASKS_DELETE, id).await
    }
    async fn list_task_replies(&self, task_id: &str) -> RepoResult<Vec<TaskReply>> {
        let all = self.all_task_replies().await?;
        Ok(keep_matching(all, Some(task_id), |r: &TaskReply| r.task_id.as_str()))
    }
    async fn reply_task(&self, new: NewTaskReply) -> RepoResult<TaskReply> {
        self.call(actions::TASK_REPLIES_ADD, Stamped { fields: new, created_at: Utc::now() }).await
    }
    async fn all_task_replies(&self) -> RepoResult<Vec<TaskReply>> {
        self.get_all(actions::TASK_REPLIES_GET_ALL).await
    }
}

#[async_trait]
impl MessageRepo for RemoteRepo {
    async fn list_threads(&self) -> RepoResult<Vec<MessageThread>> {
        let mut v: Vec<MessageThread> = self.get_all(actions::THREADS_GET_ALL).await?;
        v.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        Ok(v)
    }
    async fn list_messages(&self, thread_id: &str) -> RepoResult<Vec<Message>> {
        let all = self.all_messages().await?;
        let mut v = keep_matching(all, Some(thread_id), |m: &Message| m.thread_id.as_str());
        v.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(v)
    }
    async fn send_message(&self, new: NewMessage) -> RepoResult<Message> {
        self.call(actions::MESSAGES_ADD, Stamped { fields: new, created_at: Utc::now() }).await
    }
    /// Built locally from the key; the endpoint is never told about the thread.
    async fn get_or_create_thread(&self, thread_key: &str) -> RepoResult<MessageThread> {
        Ok(MessageThread {
            id: MessageThread::id_for_key(thread_key),
            thread_key: thread_key.to_string(),
            participants: Vec::new(),
            last_message_at: Utc::now(),
            last_message_text: None,
        })
    }
    async fn all_messages(&self) -> RepoResult<Vec<Message>> {
        self.get_all(actions::MESSAGES_GET_ALL).await
    }
}

#[async_trait]
impl ReportRepo for RemoteRepo {
    async fn weekly_report(&self, class_id: &str, week_start: NaiveDate) -> RepoResult<WeeklyReport> {
        let args = WeeklyArgs { class_id: class_id.to_string(), week_start };
        self.call(actions::REPORTS_WEEKLY, args).await
    }
    async fn monthly_report(&self, class_id: &str, month: &str) -> RepoResult<MonthlyReport> {
        let args = MonthlyArgs { class_id: class_id.to_string(), month: month.to_string() };
        self.call(actions::REPORTS_MONTHLY, args).await
    }
}
