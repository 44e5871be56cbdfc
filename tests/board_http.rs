//! Testes das rotas HTTP do quadro, via `tower::ServiceExt::oneshot`.

mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{case, today, with_follow_up, FailingStore};
use quadro_cobranca::{
    common::i18n::I18nStore,
    config::{AppState, Settings},
    db::RecordStore,
    models::collection::{CollectionCase, Stage},
    router::build_router,
    services::{change_feed::ChangeFeed, clock::FixedClock, BoardController},
};

async fn app_with(cases: Vec<CollectionCase>) -> (Router, Arc<FailingStore>) {
    let store = Arc::new(FailingStore::with_cases(cases));
    let change_feed = Arc::new(ChangeFeed::default());
    let board = BoardController::new(store.clone(), store.clone())
        .with_observer(change_feed.clone())
        .with_clock(Arc::new(FixedClock::at_date(today())));
    board.load().await.unwrap();

    let state = AppState {
        db_pool: None,
        board: Arc::new(board),
        change_feed,
        i18n_store: Arc::new(I18nStore::default()),
    };
    (build_router(state), store)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-user-name", "maria")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn put_json(uri: &str, body: Value, user: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-user-name", user)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_memory_backend() {
    let (app, _) = app_with(vec![]).await;

    let (status, body) = send(&app, get("/api/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert_eq!(body["database"], false);
}

#[tokio::test]
async fn board_lists_columns_with_portuguese_titles() {
    let (app, _) = app_with(vec![case("1", Stage::Overdue), case("2", Stage::ReplyReceived)]).await;

    let (status, body) = send(&app, get("/api/board")).await;

    assert_eq!(status, StatusCode::OK);
    let columns = body["columns"].as_array().unwrap();
    assert_eq!(columns.len(), 4);
    assert_eq!(columns[0]["title"], "Casos Inadimplentes");
    assert_eq!(columns[0]["count"], 1);
    assert_eq!(columns[2]["cases"][0]["id"], "2");
    assert_eq!(body["shown"], 2);
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn board_titles_follow_accept_language() {
    let (app, _) = app_with(vec![]).await;
    let request = Request::builder()
        .uri("/api/board")
        .header("accept-language", "en-US,en;q=0.9")
        .body(Body::empty())
        .unwrap();

    let (_, body) = send(&app, request).await;

    assert_eq!(body["columns"][3]["title"], "Payment Made");
}

#[tokio::test]
async fn malformed_period_is_a_bad_request() {
    let (app, _) = app_with(vec![]).await;

    let (status, body) = send(&app, get("/api/board?period=janeiro")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Período inválido. Use o formato AAAA-MM.");
    assert_eq!(body["details"], "janeiro");
}

#[tokio::test]
async fn end_to_end_payment_date_gate() {
    let mut record = case("1", Stage::ReplyReceived);
    record.payment_date = Some(String::new());
    let (app, store) = app_with(vec![record]).await;

    let (status, body) = send(
        &app,
        post_json("/api/board/cases/1/transition", json!({ "targetStage": "payment_made" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["outcome"], "denied");
    assert_eq!(body["reason"], "missing-payment-date");
    assert_eq!(body["message"], "Data de pagamento obrigatória");

    let mut edited = serde_json::to_value(store.stored("1").unwrap()).unwrap();
    edited["paymentDate"] = json!("01/01/2025");
    let (status, _) = send(&app, put_json("/api/board/cases/1", edited, "maria")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        post_json("/api/board/cases/1/transition", json!({ "targetStage": "payment_made" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "applied");
    assert_eq!(body["case"]["stage"], "payment_made");
    assert_eq!(body["case"]["statusHistory"].as_array().unwrap().len(), 1);
    assert_eq!(body["case"]["statusHistory"][0]["changedBy"], "maria");
}

#[tokio::test]
async fn persistence_failure_is_retry_suggested() {
    let (app, store) = app_with(vec![with_follow_up(case("1", Stage::Overdue))]).await;
    store.fail_next_write("1");

    let (status, body) = send(
        &app,
        post_json("/api/board/cases/1/transition", json!({ "targetStage": "message_sent" })),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["outcome"], "failed");
    assert_eq!(body["retry_suggested"], true);

    // Rollback chegou ao feed de mudanças
    let (_, changes) = send(&app, get("/api/board/changes")).await;
    let events = changes["events"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["case"]["stage"], "message_sent");
    assert_eq!(events[1]["case"]["stage"], "overdue");
    assert_eq!(changes["latestSeq"], 2);

    let (_, later) = send(&app, get("/api/board/changes?after=2")).await;
    assert!(later["events"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn repeated_click_while_processing_is_a_silent_conflict() {
    let (app, store) = app_with(vec![with_follow_up(case("1", Stage::Overdue))]).await;
    store.hold_writes();

    let first_app = app.clone();
    let first = tokio::spawn(async move {
        send(
            &first_app,
            post_json("/api/board/cases/1/transition", json!({ "targetStage": "message_sent" })),
        )
        .await
    });
    store.entered.notified().await;

    let (status, body) = send(
        &app,
        post_json("/api/board/cases/1/transition", json!({ "targetStage": "message_sent" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["outcome"], "ignored");
    assert!(body.get("message").is_none());

    store.release();
    let (status, body) = first.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn return_from_first_stage_is_informational() {
    let (app, _) = app_with(vec![case("1", Stage::Overdue)]).await;

    let (status, body) = send(&app, post_json("/api/board/cases/1/return", json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "info");
    assert_eq!(body["notice"], "already-at-first-stage");
}

#[tokio::test]
async fn unknown_case_is_not_found() {
    let (app, _) = app_with(vec![]).await;

    let (status, body) = send(
        &app,
        post_json("/api/board/cases/99/transition", json!({ "targetStage": "message_sent" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["outcome"], "not_found");
}

#[tokio::test]
async fn editing_someone_elses_notes_is_forbidden() {
    let mut record = case("1", Stage::Overdue);
    record.created_by = Some("joao".into());
    let (app, store) = app_with(vec![record]).await;

    let mut edited = serde_json::to_value(store.stored("1").unwrap()).unwrap();
    edited["notes"] = json!("anotação");

    let (status, body) = send(&app, put_json("/api/board/cases/1", edited, "maria")).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["reason"], "forbidden-edit");
    assert!(body["hint"].is_string());
}

#[tokio::test]
async fn delete_then_save_and_metrics() {
    let (app, store) = app_with(vec![case("1", Stage::Overdue), case("2", Stage::PaymentMade)]).await;

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/board/cases/1")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "removed");
    assert!(store.stored("1").is_none());

    let (status, body) = send(&app, post_json("/api/board/save", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "saved");
    assert_eq!(body["count"], 1);

    let (_, metrics) = send(&app, get("/api/board/metrics")).await;
    assert_eq!(metrics["total"], 1);
    assert_eq!(metrics["paymentMade"], 1);
}

#[tokio::test]
async fn reload_picks_up_store_changes() {
    let (app, store) = app_with(vec![case("1", Stage::Overdue)]).await;
    store.inner.persist_all(&[case("2", Stage::MessageSent)]).await.unwrap();

    let (status, body) = send(&app, post_json("/api/board/reload", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    store.fail_reads(true);
    let (status, _) = send(&app, post_json("/api/board/reload", json!({}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn app_state_wires_any_store() {
    let store = Arc::new(FailingStore::with_cases(vec![case("1", Stage::Overdue)]));
    let state = AppState::with_store(store.clone(), store, &Settings::default())
        .await
        .unwrap();
    let app = build_router(state);

    let (status, body) = send(&app, get("/api/board/metrics")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (app, _) = app_with(vec![]).await;

    let (status, body) = send(&app, get("/api-docs/openapi.json")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/board/cases/{id}/transition"].is_object());
}
