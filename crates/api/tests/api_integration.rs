//! Integration tests for the gateway router.

use std::sync::{Arc, OnceLock};

use api::AppState;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use clients::{InMemoryCatalogService, InMemoryRatingService, InMemoryReservationService};
use common::{BookUid, LibraryUid, ReservationUid, UserName};
use domain::{Book, Library, Reservation, ReservationStatus};
use metrics_exporter_prometheus::PrometheusHandle;
use resilience::{CircuitBreakerConfig, RetryConfig, RetryScheduler};
use saga::{SagaCoordinator, breaker_registry};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

const USER: &str = "Test Max";

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    router: axum::Router,
    catalog: InMemoryCatalogService,
    reservations: InMemoryReservationService,
    ratings: InMemoryRatingService,
    book: Book,
    library: Library,
}

impl TestApp {
    fn new() -> Self {
        let catalog = InMemoryCatalogService::new();
        let reservations = InMemoryReservationService::new();
        let ratings = InMemoryRatingService::new();

        let library = Library {
            library_uid: LibraryUid::new(),
            name: "Библиотека имени 7 Непьющих".to_string(),
            address: "2-я Бауманская ул., д.5, стр.1".to_string(),
            city: "Москва".to_string(),
        };
        let book = Book {
            book_uid: BookUid::new(),
            name: "Краткий курс C++ в 7 томах".to_string(),
            author: "Бьерн Страуструп".to_string(),
            genre: "Научная фантастика".to_string(),
        };
        catalog.add_library(library.clone());
        catalog.add_book(library.library_uid, book.clone(), 1);
        ratings.set_stars(&UserName::from(USER), 75);

        let (scheduler, worker) = RetryScheduler::new(RetryConfig::default());
        worker.spawn();
        let coordinator = SagaCoordinator::new(
            catalog.clone(),
            reservations.clone(),
            ratings.clone(),
            breaker_registry(CircuitBreakerConfig::default()),
            scheduler,
        );
        let router = api::create_app(Arc::new(AppState { coordinator }), get_metrics_handle());

        Self {
            router,
            catalog,
            reservations,
            ratings,
            book,
            library,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    fn seed_reservation(&self, status: ReservationStatus) -> ReservationUid {
        let reservation = Reservation {
            reservation_uid: ReservationUid::new(),
            status,
            start_date: NaiveDate::from_ymd_opt(2021, 10, 8).unwrap(),
            till_date: NaiveDate::from_ymd_opt(2021, 10, 11).unwrap(),
            book_uid: self.book.book_uid,
            library_uid: self.library.library_uid,
        };
        let uid = reservation.reservation_uid;
        self.reservations.insert(&UserName::from(USER), reservation);
        uid
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("X-User-Name", USER)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("X-User-Name", USER)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn json(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let request = Request::builder()
        .uri("/manage/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "UP");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = TestApp::new();

    let request = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_identity_is_rejected() {
    let app = TestApp::new();

    let request = Request::builder()
        .uri("/api/v1/rating")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json(&body)["message"],
        "missing or invalid X-User-Name header"
    );
}

#[tokio::test]
async fn test_list_libraries_passes_city_filter() {
    let app = TestApp::new();
    app.catalog.add_library(Library {
        library_uid: LibraryUid::new(),
        name: "Городская библиотека".to_string(),
        address: "Невский пр., д.1".to_string(),
        city: "Санкт-Петербург".to_string(),
    });

    let (status, body) = app
        .send(get("/api/v1/libraries?city=%D0%9C%D0%BE%D1%81%D0%BA%D0%B2%D0%B0&page=1&size=10"))
        .await;

    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["totalElements"], 1);
    assert_eq!(body["items"][0]["city"], "Москва");
}

#[tokio::test]
async fn test_library_books() {
    let app = TestApp::new();

    let uri = format!("/api/v1/libraries/{}/books?showAll=true", app.library.library_uid);
    let (status, body) = app.send(get(&uri)).await;

    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["items"][0]["bookUid"], app.book.book_uid.to_string());
    assert_eq!(body["items"][0]["availableCount"], 1);
}

#[tokio::test]
async fn test_library_books_rejects_bad_uid() {
    let app = TestApp::new();

    let (status, _) = app.send(get("/api/v1/libraries/not-a-uid/books")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rating_is_relayed() {
    let app = TestApp::new();

    let (status, body) = app.send(get("/api/v1/rating")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), serde_json::json!({ "stars": 75 }));
}

#[tokio::test]
async fn test_reserve_book() {
    let app = TestApp::new();

    let (status, body) = app
        .send(post_json(
            "/api/v1/reservations",
            serde_json::json!({
                "bookUid": app.book.book_uid.to_string(),
                "libraryUid": app.library.library_uid.to_string(),
                "tillDate": "2021-10-11"
            }),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["status"], "RENTED");
    assert_eq!(body["book"]["author"], "Бьерн Страуструп");
    assert_eq!(body["library"]["name"], "Библиотека имени 7 Непьющих");
    assert_eq!(body["rating"]["stars"], 75);
    assert_eq!(
        app.catalog
            .available_count(app.library.library_uid, app.book.book_uid),
        Some(0)
    );
}

#[tokio::test]
async fn test_reserve_rejects_malformed_body() {
    let app = TestApp::new();

    let (status, body) = app
        .send(post_json(
            "/api/v1/reservations",
            serde_json::json!({ "bookUid": "nope" }),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["message"], "failed to parse request");
}

#[tokio::test]
async fn test_reserve_over_limit() {
    let app = TestApp::new();
    app.ratings.set_stars(&UserName::from(USER), 1);
    app.seed_reservation(ReservationStatus::Rented);

    let (status, body) = app
        .send(post_json(
            "/api/v1/reservations",
            serde_json::json!({
                "bookUid": app.book.book_uid.to_string(),
                "libraryUid": app.library.library_uid.to_string(),
                "tillDate": "2021-10-11"
            }),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["message"], "reservations over limit");
}

#[tokio::test]
async fn test_return_book() {
    let app = TestApp::new();
    let uid = app.seed_reservation(ReservationStatus::Rented);

    let (status, body) = app
        .send(post_json(
            &format!("/api/v1/reservations/{uid}/return"),
            serde_json::json!({ "condition": "GOOD", "date": "2021-10-10" }),
        ))
        .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
    assert_eq!(
        app.reservations.get(uid).unwrap().status,
        ReservationStatus::Returned
    );
    assert_eq!(app.ratings.stars(&UserName::from(USER)), Some(76));
}

#[tokio::test]
async fn test_return_twice_conflicts() {
    let app = TestApp::new();
    let uid = app.seed_reservation(ReservationStatus::Expired);

    let (status, _) = app
        .send(post_json(
            &format!("/api/v1/reservations/{uid}/return"),
            serde_json::json!({ "condition": "GOOD", "date": "2021-10-10" }),
        ))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_list_reservations() {
    let app = TestApp::new();
    app.seed_reservation(ReservationStatus::Rented);

    let (status, body) = app.send(get("/api/v1/reservations")).await;

    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["book"]["name"], "Краткий курс C++ в 7 томах");
    assert_eq!(body[0]["tillDate"], "2021-10-11");
}
