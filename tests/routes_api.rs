use actix_web::{test, web, App, HttpServer};
use homeroom::models::{Gender, NewStudent, StudentStatus};
use homeroom::repo::{BehaviorRepo, ClassRepo, StudentRepo};
use homeroom::{config, AppState, LocalRepo, RemoteRepo};
use serde_json::{json, Value};
use std::sync::Arc;

fn state(repo: LocalRepo) -> web::Data<AppState> {
    web::Data::new(AppState { repo: Arc::new(repo) })
}

macro_rules! exec {
    ($app:expr, $body:expr) => {{
        let req = test::TestRequest::post()
            .uri("/exec")
            .insert_header(("content-type", "text/plain;charset=utf-8"))
            .set_payload(serde_json::to_vec(&$body).unwrap())
            .to_request();
        let resp = test::call_service(&$app, req).await;
        let status = resp.status();
        let v: Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
        (status, v)
    }};
}

#[actix_web::test]
async fn class_student_behavior_flow() {
    let app = test::init_service(App::new().app_data(state(LocalRepo::in_memory())).configure(config)).await;

    let (status, v) = exec!(app, json!({"action": "classes.getAll"}));
    assert_eq!(status, 200);
    assert_eq!(v, json!({"ok": true, "data": []}));

    let (_, v) = exec!(
        app,
        json!({"action": "classes.add", "payload": {"className": "6A", "schoolYear": "2024-2025", "homeroomTeacher": "Co Lan"}})
    );
    let class_id = v["data"]["id"].as_str().unwrap().to_string();
    assert!(class_id.starts_with("c-"));

    let (_, v) = exec!(
        app,
        json!({"action": "students.add", "payload": {"classId": class_id, "fullName": "An", "gender": "Nam", "dob": "2012-01-02"}})
    );
    assert_eq!(v["data"]["behaviorScore"], 100);
    assert_eq!(v["data"]["status"], "Đang học");
    let student_id = v["data"]["id"].as_str().unwrap().to_string();

    let (_, v) = exec!(
        app,
        json!({"action": "behavior.add", "payload": {"studentId": student_id, "date": "2024-05-06", "type": "PRAISE", "content": "Helped a classmate", "points": 5}})
    );
    assert_eq!(v["ok"], true);

    let (_, v) = exec!(app, json!({"action": "students.getById", "payload": {"id": student_id}}));
    assert_eq!(v["data"]["behaviorScore"], 105);

    let (_, v) = exec!(app, json!({"action": "students.getAll", "payload": {"classId": "c-other"}}));
    assert_eq!(v["data"], json!([]));

    let (_, v) = exec!(app, json!({"action": "reports.dashboard", "payload": {"classId": class_id}}));
    assert_eq!(v["data"]["praiseCount"], 1);
    assert_eq!(v["data"]["topStudents"][0], json!({"name": "An", "score": 105}));
}

#[actix_web::test]
async fn unknown_lookup_answers_null() {
    let app = test::init_service(App::new().app_data(state(LocalRepo::in_memory())).configure(config)).await;
    let (status, v) = exec!(app, json!({"action": "parents.getById", "payload": {"id": "p-missing"}}));
    assert_eq!(status, 200);
    assert_eq!(v["ok"], true);
    assert!(v["data"].is_null());
}

#[actix_web::test]
async fn domain_failures_stay_inside_the_envelope() {
    let app = test::init_service(App::new().app_data(state(LocalRepo::in_memory())).configure(config)).await;
    let (status, v) = exec!(app, json!({"action": "tasks.update", "payload": {"id": "task-x", "title": "t"}}));
    assert_eq!(status, 200);
    assert_eq!(v, json!({"ok": false, "error": "task not found"}));

    let (status, v) =
        exec!(app, json!({"action": "reports.monthlySummary", "payload": {"classId": "c-1", "month": "May"}}));
    assert_eq!(status, 200);
    assert_eq!(v["ok"], false);
}

#[actix_web::test]
async fn malformed_requests_are_rejected() {
    let app = test::init_service(App::new().app_data(state(LocalRepo::in_memory())).configure(config)).await;

    let req = test::TestRequest::post().uri("/exec").set_payload("not json").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let v: Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(v["ok"], false);

    let (status, v) = exec!(app, json!({"action": "boards.getAll"}));
    assert_eq!(status, 400);
    assert_eq!(v["error"], "unknown action: boards.getAll");

    // missing required payload field
    let (status, _) = exec!(app, json!({"action": "students.getById", "payload": {}}));
    assert_eq!(status, 400);
}

#[actix_web::test]
async fn attendance_round_trip_through_actions() {
    let app = test::init_service(App::new().app_data(state(LocalRepo::in_memory())).configure(config)).await;
    let (_, v) = exec!(
        app,
        json!({"action": "attendance.mark", "payload": {"classId": "c-1", "date": "2024-05-06",
            "items": [{"studentId": "s-1", "status": "PRESENT"}, {"studentId": "s-2", "status": "ABSENT", "note": "sick"}]}})
    );
    assert_eq!(v["ok"], true);

    let (_, v) = exec!(
        app,
        json!({"action": "attendance.getByClassAndDate", "payload": {"classId": "c-1", "date": "2024-05-06T00:00:00.000Z"}})
    );
    assert_eq!(v["data"].as_array().unwrap().len(), 2);

    let (_, v) = exec!(app, json!({"action": "attendance.getByStudent", "payload": {"studentId": "s-2"}}));
    assert_eq!(v["data"][0]["note"], "sick");
}

#[actix_web::test]
async fn health_is_ok() {
    let app = test::init_service(App::new().configure(config)).await;
    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn remote_store_talks_to_the_server() {
    let local = LocalRepo::in_memory();
    let data = state(local.clone());
    let server = HttpServer::new(move || App::new().app_data(data.clone()).configure(config))
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
    let addr = server.addrs()[0];
    actix_rt::spawn(server.run());

    let remote = RemoteRepo::new(format!("http://{addr}/exec"));
    let class = remote
        .create_class(homeroom::models::NewClass {
            class_name: "9B".into(),
            school_year: "2024-2025".into(),
            homeroom_teacher: "Thay Minh".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let students = remote
        .create_students(
            ["An", "Binh"]
                .into_iter()
                .map(|name| NewStudent {
                    class_id: class.id.clone(),
                    full_name: name.into(),
                    dob: None,
                    gender: Gender::Male,
                    address: String::new(),
                    parent_id: String::new(),
                    status: StudentStatus::Studying,
                    ethnicity: None,
                    parent_name: None,
                    phone_number: None,
                    family_background: None,
                    registry_number: None,
                    investigation_number: None,
                })
                .collect(),
        )
        .await
        .unwrap();
    assert_eq!(students.len(), 2);

    // writes through the relay land in the server's store
    assert_eq!(local.list_students(Some(&class.id)).await.unwrap().len(), 2);
    assert!(local.list_behaviors(None).await.unwrap().is_empty());
    assert_eq!(remote.get_class(&class.id).await.unwrap().class_name, "9B");
    assert!(remote.get_student("s-none").await.is_err());
}
