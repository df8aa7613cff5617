//! In-process store: all collections live in one snapshot that is written
//! back to a [`BlobStore`] after every mutation.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use uuid::Uuid;

use super::*;
use crate::reports::{self, ReportInputs};
use crate::storage::{BlobStore, MemoryBlobStore};

/// Blob key of the snapshot. Bump the suffix when the layout changes; old
/// data under the previous key is left behind.
pub const STORAGE_KEY: &str = "CLASS_MANAGER_DATA_V7";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub classes: Vec<ClassInfo>,
    pub students: Vec<Student>,
    pub parents: Vec<Parent>,
    pub attendance: Vec<Attendance>,
    pub behaviors: Vec<Behavior>,
    pub announcements: Vec<Announcement>,
    pub tasks: Vec<Task>,
    pub replies: Vec<TaskReply>,
    pub threads: Vec<MessageThread>,
    pub messages: Vec<Message>,
    pub reports: Vec<Report>,
    pub documents: Vec<Document>,
}

impl Snapshot {
    fn report_inputs(&self) -> ReportInputs<'_> {
        ReportInputs {
            students: &self.students,
            attendance: &self.attendance,
            behaviors: &self.behaviors,
            tasks: &self.tasks,
            replies: &self.replies,
        }
    }

    fn adjust_score(&mut self, student_id: &str, delta: i64) {
        match self.students.iter_mut().find(|s| s.id == student_id) {
            Some(s) => s.behavior_score += delta,
            None => debug!(student_id, "behavior references unknown student; score untouched"),
        }
    }
}

#[derive(Clone)]
pub struct LocalRepo {
    state: Arc<RwLock<Snapshot>>,
    blobs: Arc<dyn BlobStore>,
}

fn new_id(prefix: &str) -> Id {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

fn filter_by<T: Clone>(items: &[T], want: Option<&str>, key: impl Fn(&T) -> &str) -> Vec<T> {
    match want {
        Some(w) => items.iter().filter(|i| key(i) == w).cloned().collect(),
        None => items.to_vec(),
    }
}

impl LocalRepo {
    /// Loads the snapshot from `blobs`, or seeds empty collections and saves them.
    ///
    /// A blob that can't be read or parsed is an error; it is left untouched.
    pub fn new(blobs: Arc<dyn BlobStore>) -> RepoResult<Self> {
        let state = match blobs.load(STORAGE_KEY) {
            Ok(Some(bytes)) => {
                let s = serde_json::from_slice::<Snapshot>(&bytes).map_err(|e| {
                    error!(key = STORAGE_KEY, "failed to parse snapshot: {e}");
                    RepoError::Storage(format!("unreadable snapshot {STORAGE_KEY}: {e}"))
                })?;
                info!(key = STORAGE_KEY, students = s.students.len(), "loaded snapshot");
                s
            }
            Ok(None) => {
                info!(key = STORAGE_KEY, "no snapshot found, seeding empty collections");
                let seeded = Snapshot::default();
                Self::write_snapshot(blobs.as_ref(), &seeded)?;
                seeded
            }
            Err(e) => {
                error!(key = STORAGE_KEY, "failed to read snapshot: {e}");
                return Err(RepoError::Storage(e.to_string()));
            }
        };
        Ok(Self { state: Arc::new(RwLock::new(state)), blobs })
    }

    /// Store backed by process memory only, starting empty.
    pub fn in_memory() -> Self {
        Self { state: Arc::new(RwLock::new(Snapshot::default())), blobs: Arc::new(MemoryBlobStore::new()) }
    }

    fn read(&self) -> RwLockReadGuard<'_, Snapshot> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Snapshot> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_snapshot(blobs: &dyn BlobStore, s: &Snapshot) -> RepoResult<()> {
        let bytes = serde_json::to_vec_pretty(s).map_err(|e| RepoError::Storage(e.to_string()))?;
        blobs.save(STORAGE_KEY, &bytes).map_err(|e| {
            error!(key = STORAGE_KEY, "failed to write snapshot: {e}");
            RepoError::Storage(e.to_string())
        })
    }

    // Called with the write guard still held so saves land in mutation order.
    fn persist(&self, s: &Snapshot) -> RepoResult<()> {
        Self::write_snapshot(self.blobs.as_ref(), s)
    }
}

#[async_trait]
impl ClassRepo for LocalRepo {
    async fn list_classes(&self) -> RepoResult<Vec<ClassInfo>> {
        Ok(self.read().classes.clone())
    }
    async fn get_class(&self, id: &str) -> RepoResult<ClassInfo> {
        self.read().classes.iter().find(|c| c.id == id).cloned().ok_or(RepoError::NotFound("class"))
    }
    async fn create_class(&self, new: NewClass) -> RepoResult<ClassInfo> {
        let mut s = self.write();
        let class = new.into_class(new_id("c"));
        s.classes.push(class.clone());
        self.persist(&s)?;
        Ok(class)
    }
    async fn update_class(&self, id: &str, upd: UpdateClass) -> RepoResult<ClassInfo> {
        let mut s = self.write();
        let class = s.classes.iter_mut().find(|c| c.id == id).ok_or(RepoError::NotFound("class"))?;
        upd.apply(class);
        let updated = class.clone();
        self.persist(&s)?;
        Ok(updated)
    }
    async fn delete_class(&self, id: &str) -> RepoResult<()> {
        let mut s = self.write();
        s.classes.retain(|c| c.id != id);
        // attendance, behaviors and parents of the removed students stay
        s.students.retain(|x| x.class_id != id);
        s.announcements.retain(|a| a.class_id != id);
        s.tasks.retain(|t| t.class_id != id);
        s.documents.retain(|d| d.class_id != id);
        self.persist(&s)
    }
}

#[async_trait]
impl StudentRepo for LocalRepo {
    async fn list_students(&self, class_id: Option<&str>) -> RepoResult<Vec<Student>> {
        Ok(filter_by(&self.read().students, class_id, |s| s.class_id.as_str()))
    }
    async fn get_student(&self, id: &str) -> RepoResult<Student> {
        self.read().students.iter().find(|s| s.id == id).cloned().ok_or(RepoError::NotFound("student"))
    }
    async fn create_student(&self, new: NewStudent) -> RepoResult<Student> {
        let mut s = self.write();
        let student = new.into_student(new_id("s"));
        s.students.push(student.clone());
        self.persist(&s)?;
        Ok(student)
    }
    async fn create_students(&self, new: Vec<NewStudent>) -> RepoResult<Vec<Student>> {
        let mut s = self.write();
        let created: Vec<Student> = new.into_iter().map(|n| n.into_student(new_id("s"))).collect();
        s.students.extend(created.iter().cloned());
        self.persist(&s)?;
        info!(count = created.len(), "imported students");
        Ok(created)
    }
    async fn update_student(&self, id: &str, upd: UpdateStudent) -> RepoResult<Student> {
        let mut s = self.write();
        let student = s.students.iter_mut().find(|x| x.id == id).ok_or(RepoError::NotFound("student"))?;
        upd.apply(student);
        let updated = student.clone();
        self.persist(&s)?;
        Ok(updated)
    }
    async fn delete_student(&self, id: &str) -> RepoResult<()> {
        let mut s = self.write();
        s.students.retain(|x| x.id != id);
        self.persist(&s)
    }
}

#[async_trait]
impl ParentRepo for LocalRepo {
    async fn list_parents(&self) -> RepoResult<Vec<Parent>> {
        Ok(self.read().parents.clone())
    }
    async fn get_parent(&self, id: &str) -> RepoResult<Parent> {
        self.read().parents.iter().find(|p| p.id == id).cloned().ok_or(RepoError::NotFound("parent"))
    }
    async fn create_parent(&self, new: NewParent) -> RepoResult<Parent> {
        let mut s = self.write();
        let parent = new.into_parent(new_id("p"));
        s.parents.push(parent.clone());
        self.persist(&s)?;
        Ok(parent)
    }
    async fn update_parent(&self, id: &str, upd: UpdateParent) -> RepoResult<Parent> {
        let mut s = self.write();
        let parent = s.parents.iter_mut().find(|p| p.id == id).ok_or(RepoError::NotFound("parent"))?;
        upd.apply(parent);
        let updated = parent.clone();
        self.persist(&s)?;
        Ok(updated)
    }
    async fn delete_parent(&self, id: &str) -> RepoResult<()> {
        let mut s = self.write();
        s.parents.retain(|p| p.id != id);
        self.persist(&s)
    }
}

#[async_trait]
impl AttendanceRepo for LocalRepo {
    async fn mark_attendance(&self, class_id: &str, date: NaiveDate, items: Vec<AttendanceItem>) -> RepoResult<()> {
        let mut s = self.write();
        s.attendance.retain(|a| !(a.class_id == class_id && a.date == date));
        s.attendance.extend(items.into_iter().map(|item| Attendance {
            id: new_id("att"),
            class_id: class_id.to_string(),
            student_id: item.student_id,
            date,
            status: item.status,
            note: item.note,
        }));
        self.persist(&s)
    }
    async fn attendance_by_class_and_date(&self, class_id: &str, date: NaiveDate) -> RepoResult<Vec<Attendance>> {
        Ok(self
            .read()
            .attendance
            .iter()
            .filter(|a| a.class_id == class_id && a.date == date)
            .cloned()
            .collect())
    }
    async fn attendance_by_student(&self, student_id: &str) -> RepoResult<Vec<Attendance>> {
        Ok(filter_by(&self.read().attendance, Some(student_id), |a| a.student_id.as_str()))
    }
    async fn all_attendance(&self) -> RepoResult<Vec<Attendance>> {
        Ok(self.read().attendance.clone())
    }
}

#[async_trait]
impl BehaviorRepo for LocalRepo {
    async fn list_behaviors(&self, student_id: Option<&str>) -> RepoResult<Vec<Behavior>> {
        Ok(filter_by(&self.read().behaviors, student_id, |b| b.student_id.as_str()))
    }
    async fn create_behavior(&self, new: NewBehavior) -> RepoResult<Behavior> {
        let mut s = self.write();
        let behavior = new.into_behavior(new_id("bh"));
        s.behaviors.insert(0, behavior.clone());
        s.adjust_score(&behavior.student_id, behavior.points);
        self.persist(&s)?;
        Ok(behavior)
    }
    async fn update_behavior(&self, id: &str, upd: UpdateBehavior) -> RepoResult<Behavior> {
        let mut s = self.write();
        let behavior = s.behaviors.iter_mut().find(|b| b.id == id).ok_or(RepoError::NotFound("behavior"))?;
        let old_points = behavior.points;
        upd.apply(behavior);
        let updated = behavior.clone();
        if updated.points != old_points {
            s.adjust_score(&updated.student_id, updated.points - old_points);
        }
        self.persist(&s)?;
        Ok(updated)
    }
    async fn delete_behavior(&self, id: &str) -> RepoResult<()> {
        let mut s = self.write();
        if let Some(pos) = s.behaviors.iter().position(|b| b.id == id) {
            let removed = s.behaviors.remove(pos);
            s.adjust_score(&removed.student_id, -removed.points);
        }
        self.persist(&s)
    }
}

#[async_trait]
impl AnnouncementRepo for LocalRepo {
    async fn list_announcements(&self, class_id: Option<&str>) -> RepoResult<Vec<Announcement>> {
        let mut v = filter_by(&self.read().announcements, class_id, |a| a.class_id.as_str());
        sort_announcements(&mut v);
        Ok(v)
    }
    async fn create_announcement(&self, new: NewAnnouncement) -> RepoResult<Announcement> {
        let mut s = self.write();
        let announcement = new.into_announcement(new_id("ann"));
        s.announcements.insert(0, announcement.clone());
        self.persist(&s)?;
        Ok(announcement)
    }
    async fn update_announcement(&self, id: &str, upd: UpdateAnnouncement) -> RepoResult<Announcement> {
        let mut s = self.write();
        let a = s.announcements.iter_mut().find(|a| a.id == id).ok_or(RepoError::NotFound("announcement"))?;
        upd.apply(a);
        let updated = a.clone();
        self.persist(&s)?;
        Ok(updated)
    }
    async fn delete_announcement(&self, id: &str) -> RepoResult<()> {
        let mut s = self.write();
        s.announcements.retain(|a| a.id != id);
        self.persist(&s)
    }
}

#[async_trait]
impl DocumentRepo for LocalRepo {
    async fn list_documents(&self, class_id: Option<&str>) -> RepoResult<Vec<Document>> {
        Ok(filter_by(&self.read().documents, class_id, |d| d.class_id.as_str()))
    }
    async fn create_document(&self, new: NewDocument) -> RepoResult<Document> {
        let mut s = self.write();
        let doc = new.into_document(new_id("doc"));
        s.documents.insert(0, doc.clone());
        self.persist(&s)?;
        Ok(doc)
    }
    async fn update_document(&self, id: &str, upd: UpdateDocument) -> RepoResult<Document> {
        let mut s = self.write();
        let doc = s.documents.iter_mut().find(|d| d.id == id).ok_or(RepoError::NotFound("document"))?;
        upd.apply(doc);
        let updated = doc.clone();
        self.persist(&s)?;
        Ok(updated)
    }
    async fn delete_document(&self, id: &str) -> RepoResult<()> {
        let mut s = self.write();
        s.documents.retain(|d| d.id != id);
        self.persist(&s)
    }
}

#[async_trait]
impl TaskRepo for LocalRepo {
    async fn list_tasks(&self, class_id: Option<&str>) -> RepoResult<Vec<Task>> {
        Ok(filter_by(&self.read().tasks, class_id, |t| t.class_id.as_str()))
    }
    async fn create_task(&self, new: NewTask) -> RepoResult<Task> {
        let mut s = self.write();
        let task = new.into_task(new_id("task"));
        s.tasks.insert(0, task.clone());
        self.persist(&s)?;
        Ok(task)
    }
    async fn update_task(&self, id: &str, upd: UpdateTask) -> RepoResult<Task> {
        let mut s = self.write();
        let task = s.tasks.iter_mut().find(|t| t.id == id).ok_or(RepoError::NotFound("task"))?;
        upd.apply(task);
        let updated = task.clone();
        self.persist(&s)?;
        Ok(updated)
    }
    async fn delete_task(&self, id: &str) -> RepoResult<()> {
        let mut s = self.write();
        s.tasks.retain(|t| t.id != id);
        s.replies.retain(|r| r.task_id != id);
        self.persist(&s)
    }
    async fn list_task_replies(&self, task_id: &str) -> RepoResult<Vec<TaskReply>> {
        Ok(filter_by(&self.read().replies, Some(task_id), |r| r.task_id.as_str()))
    }
    async fn reply_task(&self, new: NewTaskReply) -> RepoResult<TaskReply> {
        let mut s = self.write();
        s.replies.retain(|r| !(r.task_id == new.task_id && r.student_id == new.student_id));
        let reply = new.into_reply(new_id("r"), Utc::now());
        s.replies.push(reply.clone());
        self.persist(&s)?;
        Ok(reply)
    }
    async fn all_task_replies(&self) -> RepoResult<Vec<TaskReply>> {
        Ok(self.read().replies.clone())
    }
}

#[async_trait]
impl MessageRepo for LocalRepo {
    async fn list_threads(&self) -> RepoResult<Vec<MessageThread>> {
        let mut v = self.read().threads.clone();
        v.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at)); // latest first
        Ok(v)
    }
    async fn list_messages(&self, thread_id: &str) -> RepoResult<Vec<Message>> {
        let mut v = filter_by(&self.read().messages, Some(thread_id), |m| m.thread_id.as_str());
        v.sort_by(|a, b| a.created_at.cmp(&b.created_at)); // ascending
        Ok(v)
    }
    async fn send_message(&self, new: NewMessage) -> RepoResult<Message> {
        let mut s = self.write();
        let msg = new.into_message(new_id("msg"), Utc::now());
        s.messages.push(msg.clone());
        if let Some(th) = s.threads.iter_mut().find(|t| t.id == msg.thread_id) {
            th.last_message_at = msg.created_at;
            th.last_message_text = Some(msg.content.clone());
        }
        self.persist(&s)?;
        Ok(msg)
    }
    async fn get_or_create_thread(&self, thread_key: &str) -> RepoResult<MessageThread> {
        if let Some(th) = self.read().threads.iter().find(|t| t.thread_key == thread_key) {
            return Ok(th.clone());
        }
        let mut s = self.write();
        // another caller may have created it between the two locks
        if let Some(th) = s.threads.iter().find(|t| t.thread_key == thread_key) {
            return Ok(th.clone());
        }
        let thread = MessageThread {
            id: MessageThread::id_for_key(thread_key),
            thread_key: thread_key.to_string(),
            participants: vec![Role::Teacher, Role::Parent],
            last_message_at: Utc::now(),
            last_message_text: None,
        };
        s.threads.push(thread.clone());
        self.persist(&s)?;
        Ok(thread)
    }
    async fn all_messages(&self) -> RepoResult<Vec<Message>> {
        Ok(self.read().messages.clone())
    }
}

#[async_trait]
impl ReportRepo for LocalRepo {
    async fn weekly_report(&self, class_id: &str, week_start: NaiveDate) -> RepoResult<WeeklyReport> {
        let s = self.read();
        Ok(reports::weekly(s.report_inputs(), class_id, week_start, Utc::now()))
    }
    async fn monthly_report(&self, class_id: &str, month: &str) -> RepoResult<MonthlyReport> {
        let s = self.read();
        reports::monthly(s.report_inputs(), class_id, month, Utc::now())
    }
}
