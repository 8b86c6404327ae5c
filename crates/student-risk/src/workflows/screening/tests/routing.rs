use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;

use crate::workflows::screening::router::{batch_handler, feature_handler, BatchRequest};
use crate::workflows::screening::{screening_router, ScreeningEngine};

fn json_request(uri: &str, payload: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(payload).expect("serialize")))
        .expect("request builds")
}

#[tokio::test]
async fn batch_route_scores_record_arrays() {
    let router = screening_router(shared_engine());
    let payload = serde_json::to_value(cohort()).expect("serialize cohort");

    let response = router
        .oneshot(json_request("/api/v1/screening/batch", &payload))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["summary"]["rows"], 9);
    assert_eq!(body["rows"][8]["record_id"], "s-9");
    assert_eq!(body["rows"][8]["score"]["band"], "high");
    assert_eq!(body["rows"][8]["contributions"][0]["feature"], "Pressure");
}

#[tokio::test]
async fn batch_route_accepts_csv_text() {
    let router = screening_router(shared_engine());
    let csv = "id,Stress Level,Diet,Crisis\ns-1,2,Healthy,No\ns-2,'9',poor,sometimes\n";

    let response = router
        .oneshot(json_request(
            "/api/v1/screening/batch",
            &json!({ "csv": csv }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["summary"]["rows"], 2);
    assert_eq!(body["summary"]["critical_flags"], 1);
    assert_eq!(body["rows"][1]["recommendations"][0]["rule"], "crisis_protocol");
}

#[tokio::test]
async fn batch_handler_rejects_missing_columns() {
    let request = BatchRequest::Wrapped {
        records: vec![crate::workflows::screening::RawRecord::new().with("Pressure", 4.0)],
    };

    let response = batch_handler(State(shared_engine()), axum::Json(request)).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["missing_columns"], json!(["Diet", "Crisis"]));
}

#[tokio::test]
async fn batch_handler_reports_unusable_model_as_unavailable() {
    let engine = ScreeningEngine::new(schema(), FixedModel::new(f64::NAN).handle())
        .expect("order matches");

    let response = batch_handler(
        State(Arc::new(engine)),
        axum::Json(BatchRequest::Records(cohort())),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = read_json_body(response).await;
    assert_eq!(body["artifact"], "memory://fixed");
}

#[tokio::test]
async fn batch_handler_rejects_malformed_csv() {
    let request = BatchRequest::Csv {
        csv: "id,Pressure,Diet,Crisis\ns-1,3,Healthy,No,extra\n".to_string(),
    };
    let response = batch_handler(State(shared_engine()), axum::Json(request)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn feature_route_resolves_aliases() {
    let response = feature_handler(State(shared_engine()), Path("stress_level".to_string())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["name"], "Pressure");
    assert_eq!(body["description"], "Perceived pressure, 0-10.");
    assert_eq!(body["directionality"], "higher_is_worse");
    assert_eq!(body["definition"]["kind"], "numeric");

    let response = feature_handler(State(shared_engine()), Path("Mood".to_string())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn schema_route_lists_features_in_order() {
    let router = screening_router(shared_engine());
    let response = router
        .oneshot(
            Request::get("/api/v1/screening/schema")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["version"], "test-v1");
    assert_eq!(body["features"][2]["name"], "Crisis");
    assert_eq!(body["identifier_columns"], json!(["id"]));
}
