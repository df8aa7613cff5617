use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Opaque, collection-unique identifiers
pub type Id = String;

/// Score every student starts from; behavior points accumulate on top of it.
pub const DEFAULT_BEHAVIOR_SCORE: i64 = 100;

// ---------------------------------------------------------------- classes

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassInfo {
    pub id: Id,
    pub class_name: String,
    pub school_year: String,
    pub homeroom_teacher: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_council: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_slogan: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewClass {
    pub class_name: String,
    pub school_year: String,
    pub homeroom_teacher: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_council: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_slogan: Option<String>,
}

impl NewClass {
    pub fn into_class(self, id: Id) -> ClassInfo {
        ClassInfo {
            id,
            class_name: self.class_name,
            school_year: self.school_year,
            homeroom_teacher: self.homeroom_teacher,
            note: self.note,
            goals: self.goals,
            contact_info: self.contact_info,
            parent_council: self.parent_council,
            class_slogan: self.class_slogan,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateClass {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homeroom_teacher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goals: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_council: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_slogan: Option<String>,
}

impl UpdateClass {
    pub fn apply(self, c: &mut ClassInfo) {
        if let Some(v) = self.class_name { c.class_name = v; }
        if let Some(v) = self.school_year { c.school_year = v; }
        if let Some(v) = self.homeroom_teacher { c.homeroom_teacher = v; }
        if self.note.is_some() { c.note = self.note; }
        if self.goals.is_some() { c.goals = self.goals; }
        if self.contact_info.is_some() { c.contact_info = self.contact_info; }
        if self.parent_council.is_some() { c.parent_council = self.parent_council; }
        if self.class_slogan.is_some() { c.class_slogan = self.class_slogan; }
    }
}

// --------------------------------------------------------------- students

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Gender {
    #[serde(rename = "Nam", alias = "male")]
    Male,
    #[serde(rename = "Nữ", alias = "female")]
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum StudentStatus {
    #[default]
    #[serde(rename = "Đang học", alias = "studying")]
    Studying,
    #[serde(rename = "Nghỉ học", alias = "withdrawn")]
    Withdrawn,
    #[serde(rename = "Chuyển trường", alias = "transferred")]
    Transferred,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Id,
    pub class_id: Id,
    pub full_name: String,
    #[serde(default, with = "wire::optional_date")]
    pub dob: Option<NaiveDate>,
    pub gender: Gender,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub parent_id: Id,
    #[serde(default)]
    pub status: StudentStatus,
    pub behavior_score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ethnicity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investigation_number: Option<String>,
}

/// Create input for a student; the id and behavior score are assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub class_id: Id,
    pub full_name: String,
    #[serde(default, with = "wire::optional_date")]
    pub dob: Option<NaiveDate>,
    pub gender: Gender,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub parent_id: Id,
    #[serde(default)]
    pub status: StudentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ethnicity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investigation_number: Option<String>,
}

impl NewStudent {
    pub fn into_student(self, id: Id) -> Student {
        Student {
            id,
            class_id: self.class_id,
            full_name: self.full_name,
            dob: self.dob,
            gender: self.gender,
            address: self.address,
            parent_id: self.parent_id,
            status: self.status,
            behavior_score: DEFAULT_BEHAVIOR_SCORE,
            ethnicity: self.ethnicity,
            parent_name: self.parent_name,
            phone_number: self.phone_number,
            family_background: self.family_background,
            registry_number: self.registry_number,
            investigation_number: self.investigation_number,
        }
    }
}

/// Overwritable student fields. `behaviorScore` is derived from behavior
/// events and deliberately absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateStudent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", with = "wire::optional_date")]
    pub dob: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StudentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ethnicity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub investigation_number: Option<String>,
}

impl UpdateStudent {
    pub fn apply(self, s: &mut Student) {
        if let Some(v) = self.class_id { s.class_id = v; }
        if let Some(v) = self.full_name { s.full_name = v; }
        if self.dob.is_some() { s.dob = self.dob; }
        if let Some(v) = self.gender { s.gender = v; }
        if let Some(v) = self.address { s.address = v; }
        if let Some(v) = self.parent_id { s.parent_id = v; }
        if let Some(v) = self.status { s.status = v; }
        if self.ethnicity.is_some() { s.ethnicity = self.ethnicity; }
        if self.parent_name.is_some() { s.parent_name = self.parent_name; }
        if self.phone_number.is_some() { s.phone_number = self.phone_number; }
        if self.family_background.is_some() { s.family_background = self.family_background; }
        if self.registry_number.is_some() { s.registry_number = self.registry_number; }
        if self.investigation_number.is_some() { s.investigation_number = self.investigation_number; }
    }
}

// ---------------------------------------------------------------- parents

/// How a parent relates to the student. Any label outside the three known
/// ones is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Relationship {
    Father,
    Mother,
    Guardian,
    Other(String),
}

impl From<String> for Relationship {
    fn from(raw: String) -> Self {
        match raw.trim() {
            "Cha" | "father" => Relationship::Father,
            "Mẹ" | "mother" => Relationship::Mother,
            "Giám hộ" | "guardian" => Relationship::Guardian,
            _ => Relationship::Other(raw),
        }
    }
}

impl From<Relationship> for String {
    fn from(r: Relationship) -> Self {
        match r {
            Relationship::Father => "Cha".to_string(),
            Relationship::Mother => "Mẹ".to_string(),
            Relationship::Guardian => "Giám hộ".to_string(),
            Relationship::Other(label) => label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Parent {
    pub id: Id,
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[schema(value_type = String)]
    pub relationship: Relationship,
    pub student_id: Id,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewParent {
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[schema(value_type = String)]
    pub relationship: Relationship,
    pub student_id: Id,
}

impl NewParent {
    pub fn into_parent(self, id: Id) -> Parent {
        Parent {
            id,
            full_name: self.full_name,
            phone: self.phone,
            email: self.email,
            relationship: self.relationship,
            student_id: self.student_id,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateParent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub relationship: Option<Relationship>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<Id>,
}

impl UpdateParent {
    pub fn apply(self, p: &mut Parent) {
        if let Some(v) = self.full_name { p.full_name = v; }
        if let Some(v) = self.phone { p.phone = v; }
        if let Some(v) = self.email { p.email = v; }
        if let Some(v) = self.relationship { p.relationship = v; }
        if let Some(v) = self.student_id { p.student_id = v; }
    }
}

// ------------------------------------------------------------- attendance

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub id: Id,
    pub class_id: Id,
    pub student_id: Id,
    #[serde(with = "wire::date")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// One line of a day's roll call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceItem {
    pub student_id: Id,
    pub status: AttendanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

// --------------------------------------------------------------- behavior

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum BehaviorKind {
    #[serde(rename = "PRAISE")]
    Praise,
    #[serde(rename = "WARN")]
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Behavior {
    pub id: Id,
    pub student_id: Id,
    #[serde(with = "wire::date")]
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: BehaviorKind,
    #[serde(default)]
    pub content: String,
    pub points: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewBehavior {
    pub student_id: Id,
    #[serde(with = "wire::date")]
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: BehaviorKind,
    #[serde(default)]
    pub content: String,
    pub points: i64,
}

impl NewBehavior {
    pub fn into_behavior(self, id: Id) -> Behavior {
        Behavior {
            id,
            student_id: self.student_id,
            date: self.date,
            kind: self.kind,
            content: self.content,
            points: self.points,
        }
    }
}

/// Overwritable behavior fields. The owning student cannot be reassigned,
/// which keeps score bookkeeping on a single student.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateBehavior {
    #[serde(skip_serializing_if = "Option::is_none", with = "wire::optional_date")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<BehaviorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
}

impl UpdateBehavior {
    pub fn apply(self, b: &mut Behavior) {
        if let Some(v) = self.date { b.date = v; }
        if let Some(v) = self.kind { b.kind = v; }
        if let Some(v) = self.content { b.content = v; }
        if let Some(v) = self.points { b.points = v; }
    }
}

// ---------------------------------------------------------- announcements

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Parent,
    Student,
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: Id,
    pub class_id: Id,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub target: Audience,
    #[serde(default)]
    pub pinned: bool,
    #[serde(with = "wire::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub author: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewAnnouncement {
    pub class_id: Id,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub target: Audience,
    #[serde(default)]
    pub pinned: bool,
    #[serde(with = "wire::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub author: String,
}

impl NewAnnouncement {
    pub fn into_announcement(self, id: Id) -> Announcement {
        Announcement {
            id,
            class_id: self.class_id,
            title: self.title,
            content: self.content,
            target: self.target,
            pinned: self.pinned,
            created_at: self.created_at,
            author: self.author,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateAnnouncement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Audience>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl UpdateAnnouncement {
    pub fn apply(self, a: &mut Announcement) {
        if let Some(v) = self.class_id { a.class_id = v; }
        if let Some(v) = self.title { a.title = v; }
        if let Some(v) = self.content { a.content = v; }
        if let Some(v) = self.target { a.target = v; }
        if let Some(v) = self.pinned { a.pinned = v; }
        if let Some(v) = self.author { a.author = v; }
    }
}

/// Pinned first, then newest first.
pub fn sort_announcements(list: &mut [Announcement]) {
    list.sort_by(|a, b| {
        b.pinned
            .cmp(&a.pinned)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

// -------------------------------------------------------------- documents

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Id,
    pub class_id: Id,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub category: String,
    #[serde(with = "wire::timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub class_id: Id,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub category: String,
    #[serde(with = "wire::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl NewDocument {
    pub fn into_document(self, id: Id) -> Document {
        Document {
            id,
            class_id: self.class_id,
            title: self.title,
            url: self.url,
            category: self.category,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl UpdateDocument {
    pub fn apply(self, d: &mut Document) {
        if let Some(v) = self.class_id { d.class_id = v; }
        if let Some(v) = self.title { d.title = v; }
        if let Some(v) = self.url { d.url = v; }
        if let Some(v) = self.category { d.category = v; }
    }
}

// ------------------------------------------------------------------ tasks

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Id,
    pub class_id: Id,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "wire::timestamp")]
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub require_reply: bool,
    #[serde(with = "wire::timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub class_id: Id,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "wire::timestamp")]
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub require_reply: bool,
    #[serde(with = "wire::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl NewTask {
    pub fn into_task(self, id: Id) -> Task {
        Task {
            id,
            class_id: self.class_id,
            title: self.title,
            description: self.description,
            due_date: self.due_date,
            require_reply: self.require_reply,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateTask {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", with = "wire::optional_timestamp")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_reply: Option<bool>,
}

impl UpdateTask {
    pub fn apply(self, t: &mut Task) {
        if let Some(v) = self.class_id { t.class_id = v; }
        if let Some(v) = self.title { t.title = v; }
        if let Some(v) = self.description { t.description = v; }
        if let Some(v) = self.due_date { t.due_date = v; }
        if let Some(v) = self.require_reply { t.require_reply = v; }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskReply {
    pub id: Id,
    pub task_id: Id,
    pub student_id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Id>,
    #[serde(default)]
    pub reply_text: String,
    #[serde(rename = "attachmentsJson", default, with = "wire::json_string")]
    #[schema(value_type = String)]
    pub attachments: Vec<String>,
    #[serde(with = "wire::timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewTaskReply {
    pub task_id: Id,
    pub student_id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Id>,
    #[serde(default)]
    pub reply_text: String,
    #[serde(rename = "attachmentsJson", default, with = "wire::json_string")]
    #[schema(value_type = String)]
    pub attachments: Vec<String>,
}

impl NewTaskReply {
    pub fn into_reply(self, id: Id, created_at: DateTime<Utc>) -> TaskReply {
        TaskReply {
            id,
            task_id: self.task_id,
            student_id: self.student_id,
            parent_id: self.parent_id,
            reply_text: self.reply_text,
            attachments: self.attachments,
            created_at,
        }
    }
}

// --------------------------------------------------------------- messages

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Teacher,
    Parent,
    Student,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageThread {
    pub id: Id,
    /// Student or class id the conversation belongs to.
    pub thread_key: String,
    #[serde(rename = "participantsJson", default, with = "wire::json_string")]
    #[schema(value_type = String)]
    pub participants: Vec<Role>,
    #[serde(with = "wire::timestamp")]
    pub last_message_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_text: Option<String>,
}

impl MessageThread {
    pub fn id_for_key(thread_key: &str) -> Id {
        format!("th-{thread_key}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Id,
    pub thread_id: Id,
    pub from_role: Role,
    pub sender_id: Id,
    pub content: String,
    #[serde(with = "wire::timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub thread_id: Id,
    pub from_role: Role,
    pub sender_id: Id,
    pub content: String,
}

impl NewMessage {
    pub fn into_message(self, id: Id, created_at: DateTime<Utc>) -> Message {
        Message {
            id,
            thread_id: self.thread_id,
            from_role: self.from_role,
            sender_id: self.sender_id,
            content: self.content,
            created_at,
        }
    }
}

// ---------------------------------------------------------------- reports

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ReportKind {
    Weekly,
    Monthly,
}

/// Archived report row. Kept in the snapshot for schema parity; nothing
/// writes to it, report snapshots are computed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Id,
    #[serde(rename = "type")]
    pub kind: ReportKind,
    pub period: String,
    pub summary: String,
    #[serde(with = "wire::timestamp")]
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NameCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NameScore {
    pub name: String,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReport {
    pub id: Id,
    #[serde(rename = "type")]
    pub kind: ReportKind,
    pub period: String,
    pub summary: String,
    #[serde(with = "wire::timestamp")]
    pub generated_at: DateTime<Utc>,
    pub attendance_rate: f64,
    pub absent_count: usize,
    pub late_count: usize,
    pub top_praise: Vec<NameCount>,
    pub top_warn: Vec<NameCount>,
    pub overdue_tasks_count: usize,
    pub replied_parents_count: usize,
    pub total_students: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReport {
    pub id: Id,
    #[serde(rename = "type")]
    pub kind: ReportKind,
    pub period: String,
    pub summary: String,
    #[serde(with = "wire::timestamp")]
    pub generated_at: DateTime<Utc>,
    pub attendance_rate: f64,
    pub absent_count: usize,
    pub late_count: usize,
    pub praise_count: usize,
    pub warn_count: usize,
    pub task_completion_rate: f64,
    pub top_students: Vec<NameScore>,
}

/// Headline numbers for the teacher's landing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub active_students: usize,
    pub total_students: usize,
    pub praise_count: usize,
    pub warn_count: usize,
    pub task_count: usize,
    pub top_students: Vec<NameScore>,
}

/// Serde adapters for the shapes the spreadsheet backend and the local
/// snapshot exchange: lenient calendar dates and timestamps, and list
/// fields carried as JSON-encoded strings.
pub mod wire {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use serde::de::{DeserializeOwned, Error};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(d);
        }
        parse_timestamp(raw).map(|ts| ts.date_naive())
    }

    pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        // `<input type="datetime-local">` values carry no offset
        for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
                return Some(naive.and_utc());
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    pub mod date {
        use super::*;

        pub fn serialize<S: Serializer>(value: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
            s.serialize_str(&value.format("%Y-%m-%d").to_string())
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
            let raw = String::deserialize(d)?;
            parse_date(&raw).ok_or_else(|| D::Error::custom(format!("invalid date '{raw}'")))
        }
    }

    pub mod optional_date {
        use super::*;

        pub fn serialize<S: Serializer>(value: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => super::date::serialize(v, s),
                None => s.serialize_none(),
            }
        }

        // empty strings come back from blank form inputs
        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
            match Option::<String>::deserialize(d)? {
                None => Ok(None),
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => parse_date(&raw)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid date '{raw}'"))),
            }
        }
    }

    pub mod timestamp {
        use super::*;

        pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
            value.serialize(s)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
            let raw = String::deserialize(d)?;
            parse_timestamp(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp '{raw}'")))
        }
    }

    pub mod optional_timestamp {
        use super::*;

        pub fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
            value.serialize(s)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(d)? {
                None => Ok(None),
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => parse_timestamp(&raw)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid timestamp '{raw}'"))),
            }
        }
    }

    /// A list stored as its JSON text. Native arrays are accepted too.
    pub mod json_string {
        use super::*;

        pub fn serialize<T: Serialize, S: Serializer>(value: &T, s: S) -> Result<S::Ok, S::Error> {
            let encoded = serde_json::to_string(value).map_err(serde::ser::Error::custom)?;
            s.serialize_str(&encoded)
        }

        pub fn deserialize<'de, T, D>(d: D) -> Result<T, D::Error>
        where
            T: DeserializeOwned + Default,
            D: Deserializer<'de>,
        {
            match serde_json::Value::deserialize(d)? {
                serde_json::Value::Null => Ok(T::default()),
                serde_json::Value::String(raw) if raw.trim().is_empty() => Ok(T::default()),
                serde_json::Value::String(raw) => serde_json::from_str(&raw).map_err(D::Error::custom),
                other => serde_json::from_value(other).map_err(D::Error::custom),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reply_attachments_travel_as_json_text() {
        let reply = TaskReply {
            id: "r-1".into(),
            task_id: "task-1".into(),
            student_id: "s-1".into(),
            parent_id: None,
            reply_text: "done".into(),
            attachments: vec!["https://a.example/x.pdf".into()],
            created_at: Utc::now(),
        };
        let v = serde_json::to_value(&reply).unwrap();
        assert_eq!(v["attachmentsJson"], json!("[\"https://a.example/x.pdf\"]"));
        assert!(v.get("parentId").is_none());
    }

    #[test]
    fn participants_accept_encoded_text_or_array() {
        let encoded: MessageThread = serde_json::from_value(json!({
            "id": "th-s-1",
            "threadKey": "s-1",
            "participantsJson": "[\"TEACHER\",\"PARENT\"]",
            "lastMessageAt": "2024-01-08T07:00:00.000Z"
        }))
        .unwrap();
        assert_eq!(encoded.participants, vec![Role::Teacher, Role::Parent]);

        let native: MessageThread = serde_json::from_value(json!({
            "id": "th-s-1",
            "threadKey": "s-1",
            "participantsJson": ["STUDENT"],
            "lastMessageAt": "2024-01-08T07:00:00Z"
        }))
        .unwrap();
        assert_eq!(native.participants, vec![Role::Student]);
    }

    #[test]
    fn dates_accept_spreadsheet_timestamps() {
        let a: Attendance = serde_json::from_value(json!({
            "id": "att-1",
            "classId": "c-1",
            "studentId": "s-1",
            "date": "2024-01-08T00:00:00.000Z",
            "status": "LATE"
        }))
        .unwrap();
        assert_eq!(a.date, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert_eq!(serde_json::to_value(&a).unwrap()["date"], json!("2024-01-08"));
    }

    #[test]
    fn blank_dob_and_local_due_dates() {
        let s: NewStudent = serde_json::from_value(json!({
            "classId": "c-1",
            "fullName": "An",
            "dob": "",
            "gender": "Nữ"
        }))
        .unwrap();
        assert_eq!(s.dob, None);
        assert_eq!(s.gender, Gender::Female);
        assert_eq!(s.status, StudentStatus::Studying);

        let t: NewTask = serde_json::from_value(json!({
            "classId": "c-1",
            "title": "Form",
            "dueDate": "2024-01-10T17:30",
            "createdAt": "2024-01-08T01:00:00Z"
        }))
        .unwrap();
        assert_eq!(t.due_date.to_rfc3339(), "2024-01-10T17:30:00+00:00");
    }

    #[test]
    fn patches_serialize_only_set_fields() {
        let patch = UpdateBehavior { points: Some(3), ..Default::default() };
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"points": 3}));
    }

    #[test]
    fn announcements_pinned_then_newest() {
        let at = |h: u32| chrono::NaiveDate::from_ymd_opt(2024, 1, 8).unwrap().and_hms_opt(h, 0, 0).unwrap().and_utc();
        let mk = |id: &str, pinned, h| Announcement {
            id: id.into(),
            class_id: "c".into(),
            title: id.into(),
            content: String::new(),
            target: Audience::All,
            pinned,
            created_at: at(h),
            author: String::new(),
        };
        let mut v = vec![mk("old", false, 1), mk("pin-old", true, 0), mk("new", false, 5), mk("pin-new", true, 3)];
        sort_announcements(&mut v);
        let ids: Vec<_> = v.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["pin-new", "pin-old", "new", "old"]);
    }

    #[test]
    fn free_form_relationship_survives_round_trip() {
        let p: Parent = serde_json::from_value(json!({
            "id": "p-1", "fullName": "Nguyen Van C", "relationship": "Ông", "studentId": "s-1"
        }))
        .unwrap();
        assert_eq!(p.relationship, Relationship::Other("Ông".into()));
        assert_eq!(serde_json::to_value(&p).unwrap()["relationship"], json!("Ông"));

        let known: Relationship = serde_json::from_value(json!("mother")).unwrap();
        assert_eq!(known, Relationship::Mother);
        assert_eq!(serde_json::to_value(known).unwrap(), json!("Mẹ"));
    }
}
