use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::models::*;
use crate::reports;
use crate::repo::*;
use crate::rpc::{actions, *};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/exec").route(web::post().to(exec)))
        .service(web::resource("/health").route(web::get().to(health)));
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
}

#[utoipa::path(
    post,
    path = "/exec",
    request_body(content = RpcRequest, description = "`{action, payload}`; sent as text/plain by browsers"),
    responses(
        (status = 200, description = "Action result; `ok` tells success from failure", body = RpcResponse),
        (status = 400, description = "Malformed envelope or unknown action", body = RpcResponse)
    )
)]
pub async fn exec(data: web::Data<AppState>, body: web::Bytes) -> Result<HttpResponse, ApiError> {
    let req: RpcRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(format!("malformed request: {e}")))?;
    debug!(action = %req.action, "exec");
    match dispatch(data.repo.as_ref(), &req.action, req.payload).await {
        Ok(v) => Ok(HttpResponse::Ok().json(RpcResponse::success(v))),
        Err(e) => {
            warn!(action = %req.action, "action failed: {e}");
            Err(e)
        }
    }
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({"status": "ok"}))
}

/// Decodes an action payload; a missing payload reads as `{}`.
fn arg<T: DeserializeOwned>(payload: Value) -> Result<T, ApiError> {
    let payload = if payload.is_null() { json!({}) } else { payload };
    serde_json::from_value(payload).map_err(|e| ApiError::BadRequest(format!("invalid payload: {e}")))
}

fn out<T: Serialize>(v: T) -> Result<Value, ApiError> {
    serde_json::to_value(v).map_err(|e| ApiError::Repo(RepoError::Storage(e.to_string())))
}

/// Lookups answer `null` for unknown ids instead of failing.
fn found<T: Serialize>(r: RepoResult<T>) -> Result<Value, ApiError> {
    match r {
        Ok(v) => out(v),
        Err(RepoError::NotFound(_)) => Ok(Value::Null),
        Err(e) => Err(e.into()),
    }
}

fn done(r: RepoResult<()>) -> Result<Value, ApiError> {
    r?;
    Ok(json!({"success": true}))
}

pub async fn dispatch(repo: &dyn Repo, action: &str, payload: Value) -> Result<Value, ApiError> {
    use actions::*;
    match action {
        CLASSES_GET_ALL => out(repo.list_classes().await?),
        CLASSES_GET_BY_ID => found(repo.get_class(&arg::<IdArg>(payload)?.id).await),
        CLASSES_ADD => out(repo.create_class(arg(payload)?).await?),
        CLASSES_UPDATE => {
            let a: WithId<UpdateClass> = arg(payload)?;
            out(repo.update_class(&a.id, a.fields).await?)
        }
        CLASSES_DELETE => done(repo.delete_class(&arg::<IdArg>(payload)?.id).await),

        STUDENTS_GET_ALL => {
            let f: ClassFilter = arg(payload)?;
            out(repo.list_students(f.class_id.as_deref()).await?)
        }
        STUDENTS_GET_BY_ID => found(repo.get_student(&arg::<IdArg>(payload)?.id).await),
        STUDENTS_ADD => out(repo.create_student(arg(payload)?).await?),
        STUDENTS_ADD_MANY => out(repo.create_students(arg(payload)?).await?),
        STUDENTS_UPDATE => {
            let a: WithId<UpdateStudent> = arg(payload)?;
            out(repo.update_student(&a.id, a.fields).await?)
        }
        STUDENTS_DELETE => done(repo.delete_student(&arg::<IdArg>(payload)?.id).await),

        PARENTS_GET_ALL => out(repo.list_parents().await?),
        PARENTS_GET_BY_ID => found(repo.get_parent(&arg::<IdArg>(payload)?.id).await),
        PARENTS_ADD => out(repo.create_parent(arg(payload)?).await?),
        PARENTS_UPDATE => {
            let a: WithId<UpdateParent> = arg(payload)?;
            out(repo.update_parent(&a.id, a.fields).await?)
        }
        PARENTS_DELETE => done(repo.delete_parent(&arg::<IdArg>(payload)?.id).await),

        ATTENDANCE_MARK => {
            let a: MarkAttendanceArgs = arg(payload)?;
            done(repo.mark_attendance(&a.class_id, a.date, a.items).await)
        }
        ATTENDANCE_GET_ALL => out(repo.all_attendance().await?),
        ATTENDANCE_GET_BY_CLASS_AND_DATE => {
            let a: ClassDateArgs = arg(payload)?;
            out(repo.attendance_by_class_and_date(&a.class_id, a.date).await?)
        }
        ATTENDANCE_GET_BY_STUDENT => {
            let a: StudentArg = arg(payload)?;
            out(repo.attendance_by_student(&a.student_id).await?)
        }

        BEHAVIOR_GET_ALL => {
            let f: StudentFilter = arg(payload)?;
            out(repo.list_behaviors(f.student_id.as_deref()).await?)
        }
        BEHAVIOR_ADD => out(repo.create_behavior(arg(payload)?).await?),
        BEHAVIOR_UPDATE => {
            let a: WithId<UpdateBehavior> = arg(payload)?;
            out(repo.update_behavior(&a.id, a.fields).await?)
        }
        BEHAVIOR_DELETE => done(repo.delete_behavior(&arg::<IdArg>(payload)?.id).await),

        ANNOUNCEMENTS_GET_ALL => {
            let f: ClassFilter = arg(payload)?;
            out(repo.list_announcements(f.class_id.as_deref()).await?)
        }
        ANNOUNCEMENTS_ADD => out(repo.create_announcement(arg(payload)?).await?),
        ANNOUNCEMENTS_UPDATE => {
            let a: WithId<UpdateAnnouncement> = arg(payload)?;
            out(repo.update_announcement(&a.id, a.fields).await?)
        }
        ANNOUNCEMENTS_DELETE => done(repo.delete_announcement(&arg::<IdArg>(payload)?.id).await),

        DOCUMENTS_GET_ALL => {
            let f: ClassFilter = arg(payload)?;
            out(repo.list_documents(f.class_id.as_deref()).await?)
        }
        DOCUMENTS_ADD => out(repo.create_document(arg(payload)?).await?),
        DOCUMENTS_UPDATE => {
            let a: WithId<UpdateDocument> = arg(payload)?;
            out(repo.update_document(&a.id, a.fields).await?)
        }
        DOCUMENTS_DELETE => done(repo.delete_document(&arg::<IdArg>(payload)?.id).await),

        TASKS_GET_ALL => {
            let f: ClassFilter = arg(payload)?;
            out(repo.list_tasks(f.class_id.as_deref()).await?)
        }
        TASKS_ADD => out(repo.create_task(arg(payload)?).await?),
        TASKS_UPDATE => {
            let a: WithId<UpdateTask> = arg(payload)?;
            out(repo.update_task(&a.id, a.fields).await?)
        }
        TASKS_DELETE => done(repo.delete_task(&arg::<IdArg>(payload)?.id).await),
        TASK_REPLIES_GET_ALL => match arg::<TaskFilter>(payload)?.task_id {
            Some(task_id) => out(repo.list_task_replies(&task_id).await?),
            None => out(repo.all_task_replies().await?),
        },
        // a client-side createdAt in the payload is ignored; the store stamps its own
        TASK_REPLIES_ADD => out(repo.reply_task(arg(payload)?).await?),

        THREADS_GET_ALL => out(repo.list_threads().await?),
        THREADS_GET_OR_CREATE => {
            let a: ThreadKeyArg = arg(payload)?;
            out(repo.get_or_create_thread(&a.thread_key).await?)
        }
        MESSAGES_GET_ALL => match arg::<ThreadFilter>(payload)?.thread_id {
            Some(thread_id) => out(repo.list_messages(&thread_id).await?),
            None => out(repo.all_messages().await?),
        },
        MESSAGES_ADD => out(repo.send_message(arg(payload)?).await?),

        REPORTS_WEEKLY => {
            let a: WeeklyArgs = arg(payload)?;
            out(repo.weekly_report(&a.class_id, a.week_start).await?)
        }
        REPORTS_MONTHLY => {
            let a: MonthlyArgs = arg(payload)?;
            out(repo.monthly_report(&a.class_id, &a.month).await?)
        }
        REPORTS_DASHBOARD => {
            let f: ClassFilter = arg(payload)?;
            out(dashboard(repo, f.class_id.as_deref()).await?)
        }

        other => Err(ApiError::BadRequest(format!("unknown action: {other}"))),
    }
}

/// Dashboard numbers for one class, or for everything when `class_id` is `None`.
pub async fn dashboard(repo: &dyn Repo, class_id: Option<&str>) -> RepoResult<DashboardStats> {
    let students = repo.list_students(class_id).await?;
    let mut behaviors = repo.list_behaviors(None).await?;
    if class_id.is_some() {
        behaviors.retain(|b| students.iter().any(|s| s.id == b.student_id));
    }
    let tasks = repo.list_tasks(class_id).await?;
    Ok(reports::dashboard(&students, &behaviors, &tasks))
}
