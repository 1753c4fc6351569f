// tests/diagnosis_flow_tests.rs

use bungo_shindan::{config::Config, routes, session::SessionRegistry, state::AppState};
use serde_json::json;

const SESSION_HEADER: &str = "x-diagnosis-session";

fn test_state() -> AppState {
    AppState {
        sessions: SessionRegistry::new(),
        config: Config {
            rust_log: "error".to_string(),
            environment: "test".to_string(),
            port: 0,
        },
    }
}

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    let app = routes::create_router(test_state());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

fn new_session() -> String {
    uuid::Uuid::new_v4().to_string()
}

async fn submit_stage(
    client: &reqwest::Client,
    address: &str,
    session: &str,
    stage: u8,
    body: serde_json::Value,
) -> reqwest::Response {
    client
        .post(format!("{address}/api/diagnosis/stage/{stage}"))
        .header(SESSION_HEADER, session)
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request")
}

async fn get_result(
    client: &reqwest::Client,
    address: &str,
    session: &str,
) -> reqwest::Response {
    client
        .get(format!("{address}/api/diagnosis/result"))
        .header(SESSION_HEADER, session)
        .send()
        .await
        .expect("Failed to execute request")
}

#[tokio::test]
async fn unknown_path_404() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{address}/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn test_full_flow_reaches_simada_override() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let session = new_session();

    // Stage 1: five answers of 10 -> score 50.
    let resp = submit_stage(
        &client,
        &address,
        &session,
        1,
        json!({ "answers": {
            "ques1": "10", "ques2": "10", "ques3": "10", "ques4": "10", "ques5": "10"
        }}),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["score"], 50);

    // Stage 2: score 20 on the literary route.
    let resp = submit_stage(
        &client,
        &address,
        &session,
        2,
        json!({ "answers": {
            "ques1": "7", "ques2": "7", "ques3": "3", "ques4": "3", "ques5": "0"
        }, "isGeneral": false }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["score"], 20);

    // Stage 3: simada's answer signature.
    let resp = submit_stage(
        &client,
        &address,
        &session,
        3,
        json!({ "answers": {
            "ques1": "0", "ques2": "10", "ques3": "10", "ques4": "0", "ques5": "10"
        }}),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 200);

    let resp = get_result(&client, &address, &session).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["author"]["id"], "simada");
    assert_eq!(body["author"]["type"], "刹那タイプ");
    assert_eq!(body["stage1Score"], 50);
    assert_eq!(body["stage2Score"], 20);
    assert_eq!(body["stage3Score"], 30);
    assert_eq!(body["isGeneral"], false);
}

#[tokio::test]
async fn test_full_flow_reaches_kikuti_by_answer_points() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let session = new_session();

    submit_stage(
        &client,
        &address,
        &session,
        1,
        json!({ "answers": {
            "ques1": "5", "ques2": "5", "ques3": "5", "ques4": "5", "ques5": "5"
        }}),
    )
    .await;

    // General route, stage-2 score 35 -> Leader sub-branch.
    submit_stage(
        &client,
        &address,
        &session,
        2,
        json!({ "answers": {
            "ques1": "7", "ques2": "7", "ques3": "7", "ques4": "7", "ques5": "7"
        }, "isGeneral": true }),
    )
    .await;

    submit_stage(
        &client,
        &address,
        &session,
        3,
        json!({ "answers": {
            "ques1": "10", "ques2": "7", "ques3": "5", "ques4": "5", "ques5": "7"
        }}),
    )
    .await;

    let resp = get_result(&client, &address, &session).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["author"]["id"], "kikuti");
}

#[tokio::test]
async fn test_extra_answer_keys_do_not_block_the_result() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let session = new_session();

    submit_stage(
        &client,
        &address,
        &session,
        1,
        json!({ "answers": {
            "ques1": "10", "ques2": "10", "ques3": "10", "ques4": "10", "ques5": "10"
        }}),
    )
    .await;
    submit_stage(
        &client,
        &address,
        &session,
        2,
        json!({ "answers": {
            "ques1": "7", "ques2": "7", "ques3": "3", "ques4": "3", "ques5": "0"
        }, "isGeneral": false }),
    )
    .await;

    // The form posts a key outside the five question slots. Submission
    // accepts it, and it must not wedge the result afterwards.
    let resp = submit_stage(
        &client,
        &address,
        &session,
        3,
        json!({ "answers": {
            "ques1": "0", "ques2": "10", "ques3": "10", "ques4": "0", "ques5": "10",
            "hobby": "3"
        }}),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 200);

    // Repeatable: the stored extra key never poisons later reads.
    for _ in 0..2 {
        let resp = get_result(&client, &address, &session).await;
        assert_eq!(resp.status().as_u16(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["author"]["id"], "simada");
    }
}

#[tokio::test]
async fn test_result_without_data_is_missing_stage() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let resp = get_result(&client, &address, &new_session()).await;
    assert_eq!(resp.status().as_u16(), 404);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "MISSING_STAGE_DATA");
    assert_eq!(body["canRetry"], false);
    assert_eq!(body["redirectUrl"], "/test");
}

#[tokio::test]
async fn test_stage3_requires_earlier_stages() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let resp = submit_stage(
        &client,
        &address,
        &new_session(),
        3,
        json!({ "answers": {
            "ques1": "0", "ques2": "0", "ques3": "0", "ques4": "0", "ques5": "0"
        }}),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 404);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "MISSING_STAGE_DATA");
}

#[tokio::test]
async fn test_stage3_rejects_out_of_domain_answers() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let session = new_session();

    submit_stage(&client, &address, &session, 1, json!({ "answers": { "ques1": "5" }})).await;
    submit_stage(
        &client,
        &address,
        &session,
        2,
        json!({ "answers": { "ques1": "5" }, "isGeneral": true }),
    )
    .await;

    // "4" is not in the answer domain.
    let resp = submit_stage(
        &client,
        &address,
        &session,
        3,
        json!({ "answers": {
            "ques1": "4", "ques2": "0", "ques3": "0", "ques4": "0", "ques5": "0"
        }}),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(body["canRetry"], true);
    assert_eq!(body["redirectUrl"], "/test3");
}

#[tokio::test]
async fn test_stage2_requires_route_flag() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let resp = submit_stage(
        &client,
        &address,
        &new_session(),
        2,
        json!({ "answers": { "ques1": "5" }}),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn test_unknown_stage_number_is_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let resp = submit_stage(
        &client,
        &address,
        &new_session(),
        9,
        json!({ "answers": {} }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn test_resubmission_overwrites_stage_score() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let session = new_session();

    let resp = submit_stage(
        &client,
        &address,
        &session,
        1,
        json!({ "answers": { "ques1": "3" }}),
    )
    .await;
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["score"], 3);

    let resp = submit_stage(
        &client,
        &address,
        &session,
        1,
        json!({ "answers": { "ques1": "10", "ques2": "10" }}),
    )
    .await;
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["score"], 20);
}

#[tokio::test]
async fn test_reset_clears_the_session() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let session = new_session();

    submit_stage(
        &client,
        &address,
        &session,
        1,
        json!({ "answers": { "ques1": "5" }}),
    )
    .await;
    submit_stage(
        &client,
        &address,
        &session,
        2,
        json!({ "answers": { "ques1": "5" }, "isGeneral": false }),
    )
    .await;
    submit_stage(
        &client,
        &address,
        &session,
        3,
        json!({ "answers": {
            "ques1": "0", "ques2": "0", "ques3": "0", "ques4": "0", "ques5": "0"
        }}),
    )
    .await;

    let resp = client
        .delete(format!("{address}/api/diagnosis/session"))
        .header(SESSION_HEADER, &session)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(resp.status().as_u16(), 200);

    let resp = get_result(&client, &address, &session).await;
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn test_missing_session_header_mints_one() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{address}/api/diagnosis/stage/1"))
        .json(&json!({ "answers": { "ques1": "5" }}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(resp.status().as_u16(), 200);
    let minted = resp
        .headers()
        .get(SESSION_HEADER)
        .expect("session header missing")
        .to_str()
        .unwrap()
        .to_string();
    assert!(!minted.is_empty());
}

#[tokio::test]
async fn test_router_oneshot_rejects_bad_body() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let app = routes::create_router(test_state());

    let request = Request::builder()
        .method("POST")
        .uri("/api/diagnosis/stage/1")
        .header("content-type", "application/json")
        .body(Body::from("{\"answers\": 42}"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
}
