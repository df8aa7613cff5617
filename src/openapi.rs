use crate::models::*;
use crate::rpc::{RpcRequest, RpcResponse};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(crate::routes::exec),
    components(schemas(
        RpcRequest, RpcResponse,
        ClassInfo, NewClass, UpdateClass,
        Student, NewStudent, UpdateStudent, Gender, StudentStatus,
        Parent, NewParent, UpdateParent,
        Attendance, AttendanceItem, AttendanceStatus,
        Behavior, NewBehavior, UpdateBehavior, BehaviorKind,
        Announcement, NewAnnouncement, UpdateAnnouncement, Audience,
        Document, NewDocument, UpdateDocument,
        Task, NewTask, UpdateTask, TaskReply, NewTaskReply,
        MessageThread, Message, NewMessage, Role,
        WeeklyReport, MonthlyReport, DashboardStats, NameCount, NameScore
    )),
    tags(
        (name = "rpc", description = "Single-endpoint action protocol"),
    )
)]
pub struct ApiDoc;
