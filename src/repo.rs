use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::*;

pub mod local;
pub mod remote;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("remote call failed: {0}")]
    Remote(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for RepoError {
    fn from(e: reqwest::Error) -> Self {
        RepoError::Transport(e.to_string())
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

#[async_trait]
pub trait ClassRepo: Send + Sync {
    async fn list_classes(&self) -> RepoResult<Vec<ClassInfo>>;
    async fn get_class(&self, id: &str) -> RepoResult<ClassInfo>;
    async fn create_class(&self, new: NewClass) -> RepoResult<ClassInfo>;
    async fn update_class(&self, id: &str, upd: UpdateClass) -> RepoResult<ClassInfo>;
    /// Also drops the class's students, announcements, tasks and documents.
    async fn delete_class(&self, id: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait StudentRepo: Send + Sync {
    async fn list_students(&self, class_id: Option<&str>) -> RepoResult<Vec<Student>>;
    async fn get_student(&self, id: &str) -> RepoResult<Student>;
    async fn create_student(&self, new: NewStudent) -> RepoResult<Student>;
    async fn create_students(&self, new: Vec<NewStudent>) -> RepoResult<Vec<Student>>;
    async fn update_student(&self, id: &str, upd: UpdateStudent) -> RepoResult<Student>;
    async fn delete_student(&self, id: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait ParentRepo: Send + Sync {
    async fn list_parents(&self) -> RepoResult<Vec<Parent>>;
    async fn get_parent(&self, id: &str) -> RepoResult<Parent>;
    async fn create_parent(&self, new: NewParent) -> RepoResult<Parent>;
    async fn update_parent(&self, id: &str, upd: UpdateParent) -> RepoResult<Parent>;
    async fn delete_parent(&self, id: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait AttendanceRepo: Send + Sync {
    /// Replaces every record of `class_id` on `date` with `items`.
    async fn mark_attendance(&self, class_id: &str, date: NaiveDate, items: Vec<AttendanceItem>) -> RepoResult<()>;
    async fn attendance_by_class_and_date(&self, class_id: &str, date: NaiveDate) -> RepoResult<Vec<Attendance>>;
    async fn attendance_by_student(&self, student_id: &str) -> RepoResult<Vec<Attendance>>;
    async fn all_attendance(&self) -> RepoResult<Vec<Attendance>>;
}

/// Behavior writes keep the owning student's `behavior_score` in step.
#[async_trait]
pub trait BehaviorRepo: Send + Sync {
    async fn list_behaviors(&self, student_id: Option<&str>) -> RepoResult<Vec<Behavior>>;
    async fn create_behavior(&self, new: NewBehavior) -> RepoResult<Behavior>;
    async fn update_behavior(&self, id: &str, upd: UpdateBehavior) -> RepoResult<Behavior>;
    async fn delete_behavior(&self, id: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait AnnouncementRepo: Send + Sync {
    /// Pinned first, newest first within each group.
    async fn list_announcements(&self, class_id: Option<&str>) -> RepoResult<Vec<Announcement>>;
    async fn create_announcement(&self, new: NewAnnouncement) -> RepoResult<Announcement>;
    async fn update_announcement(&self, id: &str, upd: UpdateAnnouncement) -> RepoResult<Announcement>;
    async fn delete_announcement(&self, id: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait DocumentRepo: Send + Sync {
    async fn list_documents(&self, class_id: Option<&str>) -> RepoResult<Vec<Document>>;
    async fn create_document(&self, new: NewDocument) -> RepoResult<Document>;
    async fn update_document(&self, id: &str, upd: UpdateDocument) -> RepoResult<Document>;
    async fn delete_document(&self, id: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait TaskRepo: Send + Sync {
    async fn list_tasks(&self, class_id: Option<&str>) -> RepoResult<Vec<Task>>;
    async fn create_task(&self, new: NewTask) -> RepoResult<Task>;
    async fn update_task(&self, id: &str, upd: UpdateTask) -> RepoResult<Task>;
    async fn delete_task(&self, id: &str) -> RepoResult<()>;
    async fn list_task_replies(&self, task_id: &str) -> RepoResult<Vec<TaskReply>>;
    /// At most one reply per (task, student); a new one replaces the old.
    async fn reply_task(&self, new: NewTaskReply) -> RepoResult<TaskReply>;
    async fn all_task_replies(&self) -> RepoResult<Vec<TaskReply>>;
}

#[async_trait]
pub trait MessageRepo: Send + Sync {
    async fn list_threads(&self) -> RepoResult<Vec<MessageThread>>;
    /// Oldest first.
    async fn list_messages(&self, thread_id: &str) -> RepoResult<Vec<Message>>;
    async fn send_message(&self, new: NewMessage) -> RepoResult<Message>;
    async fn get_or_create_thread(&self, thread_key: &str) -> RepoResult<MessageThread>;
    async fn all_messages(&self) -> RepoResult<Vec<Message>>;
}

#[async_trait]
pub trait ReportRepo: Send + Sync {
    async fn weekly_report(&self, class_id: &str, week_start: NaiveDate) -> RepoResult<WeeklyReport>;
    /// `month` is `YYYY-MM`.
    async fn monthly_report(&self, class_id: &str, month: &str) -> RepoResult<MonthlyReport>;
}

pub trait Repo:
    ClassRepo
    + StudentRepo
    + ParentRepo
    + AttendanceRepo
    + BehaviorRepo
    + AnnouncementRepo
    + DocumentRepo
    + TaskRepo
    + MessageRepo
    + ReportRepo
{
}

impl<T> Repo for T where
    T: ClassRepo
        + StudentRepo
        + ParentRepo
        + AttendanceRepo
        + BehaviorRepo
        + AnnouncementRepo
        + DocumentRepo
        + TaskRepo
        + MessageRepo
        + ReportRepo
{
}
