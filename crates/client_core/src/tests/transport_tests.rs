use super::*;
use axum::{
    extract::{Path, State},
    http::{StatusCode, Uri},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::domain::LocationId;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct Recorder {
    requests: Arc<Mutex<Vec<(String, Value)>>>,
}

impl Recorder {
    async fn push(&self, uri: &Uri, body: Value) {
        self.requests.lock().await.push((uri.path().to_string(), body));
    }
}

async fn record_post(State(rec): State<Recorder>, uri: Uri, Json(body): Json<Value>) -> Json<Value> {
    rec.push(&uri, body.clone()).await;
    match uri.path() {
        "/api/create_tour/" => Json(json!({"id": 12, "name": body["name"]})),
        "/api/add_location/" => Json(json!({
            "id": 40,
            "name": body["name"],
            "address": body["address"],
            "latitude": body["latitude"],
            "longitude": body["longitude"],
        })),
        _ => Json(json!({"status": "ok"})),
    }
}

async fn search(State(rec): State<Recorder>, uri: Uri, Path(query): Path<String>) -> Json<Value> {
    rec.push(&uri, Value::String(query)).await;
    Json(json!({"data": [
        {"name": "Hood College", "display_name": "Hood College, Frederick", "lat": "39.4229624", "lon": "-77.4189171"}
    ]}))
}

async fn get_tour(Path(id): Path<i64>) -> Result<Json<Value>, StatusCode> {
    if id != 3 {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({
        "id": 3,
        "name": "Maryland Trip",
        "locations": [
            {"id": 8, "name": "Myersville, MD", "address": "Myersville, Frederick County", "latitude": "39.505101", "longitude": "-77.566377"}
        ]
    })))
}

async fn delete_tour(State(rec): State<Recorder>, uri: Uri) -> StatusCode {
    rec.push(&uri, Value::Null).await;
    StatusCode::NO_CONTENT
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "database is down")
}

async fn spawn_recording_server() -> (String, Recorder) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let recorder = Recorder::default();
    let app = Router::new()
        .route("/api/tours/", get(broken))
        .route("/api/get_tour/:id/", get(get_tour))
        .route("/api/create_tour/", post(record_post))
        .route("/api/delete_tour/:id/", delete(delete_tour))
        .route("/api/search/:query/", get(search))
        .route("/api/add_location/", post(record_post))
        .route("/api/add_to_tour/", post(record_post))
        .route("/api/remove_from_tour/", post(record_post))
        .with_state(recorder.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), recorder)
}

#[test]
fn endpoint_urls_keep_trailing_slash_and_prefix() {
    let backend = HttpTourBackend::new("http://127.0.0.1:8000").expect("backend");
    assert_eq!(
        backend.endpoint_url(&["get_tour", "4"]).as_str(),
        "http://127.0.0.1:8000/api/get_tour/4/"
    );

    let prefixed = HttpTourBackend::new("https://tours.example.com/v1/").expect("backend");
    assert_eq!(
        prefixed.endpoint_url(&["tours"]).as_str(),
        "https://tours.example.com/v1/api/tours/"
    );
}

#[test]
fn search_query_stays_in_one_segment() {
    let backend = HttpTourBackend::new("http://127.0.0.1:8000").expect("backend");
    assert_eq!(
        backend.endpoint_url(&["search", "Hood College/Frederick"]).as_str(),
        "http://127.0.0.1:8000/api/search/Hood%20College%2FFrederick/"
    );
}

#[test]
fn rejects_unusable_base_urls() {
    assert!(matches!(
        HttpTourBackend::new("not a url"),
        Err(TransportError::BaseUrl { .. })
    ));
    assert!(matches!(
        HttpTourBackend::new("mailto:someone@example.com"),
        Err(TransportError::BaseUrl { .. })
    ));
}

#[tokio::test]
async fn get_tour_decodes_decimal_string_coordinates() {
    let (url, _rec) = spawn_recording_server().await;
    let backend = HttpTourBackend::new(&url).expect("backend");
    let tour = backend.get_tour(TourId(3)).await.expect("tour");
    assert_eq!(tour.name, "Maryland Trip");
    assert_eq!(tour.locations[0].id, LocationId(8));
    assert_eq!(tour.locations[0].lat_lon(), [39.505101, -77.566377]);
}

#[tokio::test]
async fn missing_tour_maps_to_not_found() {
    let (url, _rec) = spawn_recording_server().await;
    let backend = HttpTourBackend::new(&url).expect("backend");
    let err = backend.get_tour(TourId(77)).await.expect_err("must fail");
    assert!(err.is_not_found(), "unexpected error: {err}");
}

#[tokio::test]
async fn server_error_keeps_response_body() {
    let (url, _rec) = spawn_recording_server().await;
    let backend = HttpTourBackend::new(&url).expect("backend");
    let err = backend.list_tours().await.expect_err("must fail");
    assert_eq!(err.error_code(), Some(ErrorCode::Internal));
    assert!(err.to_string().contains("database is down"), "{err}");
}

#[tokio::test]
async fn connection_failure_is_a_request_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let backend = HttpTourBackend::new(&format!("http://{addr}")).expect("backend");
    let err = backend.list_tours().await.expect_err("must fail");
    assert!(matches!(err, TransportError::Request { endpoint: "list_tours", .. }));
}

#[tokio::test]
async fn posts_send_expected_bodies() {
    let (url, rec) = spawn_recording_server().await;
    let backend = HttpTourBackend::new(&url).expect("backend");

    let created = backend
        .create_tour(&CreateTourRequest::new("Maryland Trip"))
        .await
        .expect("create");
    assert_eq!(created.id, TourId(12));

    let location = backend
        .create_location(&NewLocation {
            name: "Hood College".into(),
            address: "Frederick".into(),
            latitude: 39.4229624,
            longitude: -77.4189171,
        })
        .await
        .expect("create location");
    assert_eq!(location.id, LocationId(40));

    let membership = TourMembershipRequest {
        tour_id: TourId(12),
        location_id: LocationId(40),
    };
    backend.add_to_tour(membership).await.expect("attach");
    backend.remove_from_tour(membership).await.expect("detach");
    backend.delete_tour(TourId(12)).await.expect("delete");

    let requests = rec.requests.lock().await.clone();
    let paths: Vec<&str> = requests.iter().map(|(p, _)| p.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "/api/create_tour/",
            "/api/add_location/",
            "/api/add_to_tour/",
            "/api/remove_from_tour/",
            "/api/delete_tour/12/",
        ]
    );
    assert_eq!(requests[0].1, json!({"name": "Maryland Trip"}));
    assert_eq!(requests[1].1["latitude"], "39.422962");
    assert_eq!(requests[1].1["longitude"], "-77.418917");
    assert_eq!(requests[2].1, json!({"tour_id": 12, "location_id": 40}));
}

#[tokio::test]
async fn search_unwraps_data_array_and_decodes_query() {
    let (url, rec) = spawn_recording_server().await;
    let backend = HttpTourBackend::new(&url).expect("backend");
    let results = backend
        .search_locations("Hood College")
        .await
        .expect("search");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].address, "Hood College, Frederick");

    let requests = rec.requests.lock().await.clone();
    assert_eq!(requests[0].1, json!("Hood College"));
}

#[test]
fn timeout_comes_from_settings() {
    let settings = Settings {
        request_timeout_secs: Some(5),
        ..Settings::default()
    };
    let backend = HttpTourBackend::from_settings(&settings).expect("backend");
    assert_eq!(backend.base_url().as_str(), "http://127.0.0.1:8000/");
}
