use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use kalkulator::calculator::{CalculationError, Calculator};
use kalkulator::observability::Metrics;
use kalkulator::regel::models::JobRequest;
use kalkulator::regel::{
    Context, HttpConfig, JobClient, JobStatus, PollLocation, RegelApi, RegelApiError,
    RegelApiJobClient, RegelApiResultFetcher, RegelApiStatusCheck, ResultFetcher,
    ResultLocation, StaticTokenProvider, StatusCheck, StatusPoller,
};

const TOKEN: &str = "test-token";
const API_KEY: &str = "regel-key";

/// What the stub rules engine saw and how it should answer.
#[derive(Default)]
struct Stub {
    behov: Mutex<Vec<JobRequest>>,
    unauthorized: AtomicUsize,
    status_checks: AtomicUsize,
    pending_checks: usize,
}

fn authorized(headers: &HeaderMap, stub: &Stub) -> bool {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {TOKEN}").as_str());
    let api_key = headers.get("X-API-KEY").and_then(|v| v.to_str().ok()) == Some(API_KEY);
    if !(bearer && api_key) {
        stub.unauthorized.fetch_add(1, Ordering::SeqCst);
    }
    bearer && api_key
}

async fn start_behov(
    State(stub): State<Arc<Stub>>,
    headers: HeaderMap,
    Json(request): Json<JobRequest>,
) -> impl IntoResponse {
    if !authorized(&headers, &stub) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    stub.behov.lock().unwrap().push(request);
    (
        StatusCode::ACCEPTED,
        [(header::LOCATION, "/v1/behov/status/123")],
        Json(json!({ "status": "PENDING" })),
    )
        .into_response()
}

async fn behov_status(State(stub): State<Arc<Stub>>, headers: HeaderMap) -> impl IntoResponse {
    if !authorized(&headers, &stub) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let seen = stub.status_checks.fetch_add(1, Ordering::SeqCst);
    if seen < stub.pending_checks {
        Json(json!({ "status": "PENDING" })).into_response()
    } else {
        (StatusCode::SEE_OTHER, [(header::LOCATION, "/v1/subsumsjon/54321")]).into_response()
    }
}

async fn subsumsjon(State(stub): State<Arc<Stub>>, headers: HeaderMap) -> impl IntoResponse {
    if !authorized(&headers, &stub) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(subsumsjon_body()).into_response()
}

fn subsumsjon_body() -> Value {
    json!({
        "behovId": "1234",
        "faktum": { "aktorId": "1234", "beregningsdato": "2024-05-01" },
        "grunnlagResultat": {
            "subsumsjonsId": "grunnlagSubsumsjonId",
            "sporingsId": "",
            "regelIdentifikator": "",
            "avkortet": 20.5,
            "uavkortet": 10,
            "harAvkortet": true,
            "beregningsregel": "",
            "grunnlagInntektsPerioder": []
        },
        "satsResultat": {
            "subsumsjonsId": "12",
            "dagsats": 12,
            "ukesats": 123,
            "benyttet90ProsentRegel": false
        },
        "minsteinntektResultat": {
            "subsumsjonsId": "12",
            "oppfyllerMinsteinntekt": true,
            "minsteinntektInntektsPerioder": []
        },
        "periodeResultat": {
            "subsumsjonsId": "12",
            "periodeAntallUker": 52
        },
        "problem": null
    })
}

fn stub_router(stub: Arc<Stub>) -> Router {
    Router::new()
        .route("/behov", post(start_behov))
        .route("/behov/status/123", get(behov_status))
        .route("/subsumsjon/54321", get(subsumsjon))
        .with_state(stub)
}

async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{address}")
}

fn regel_api(base_url: &str) -> RegelApi {
    RegelApi::new(
        base_url,
        &HttpConfig::default(),
        Arc::new(StaticTokenProvider::new(Some(TOKEN.to_string()))),
        Some(API_KEY.to_string()),
    )
    .unwrap()
}

async fn stub_with_pending(pending_checks: usize) -> (Arc<Stub>, RegelApi) {
    let stub = Arc::new(Stub {
        pending_checks,
        ..Default::default()
    });
    let base_url = spawn(stub_router(stub.clone())).await;
    (stub, regel_api(&base_url))
}

#[tokio::test]
async fn test_start_returns_normalized_poll_location() {
    let (stub, api) = stub_with_pending(0).await;
    let metrics = Arc::new(Metrics::new());
    let client = RegelApiJobClient::new(api, metrics.clone());

    let location = client.start("001", &Context::Veiledning).await.unwrap();

    assert_eq!(location, PollLocation::new("/behov/status/123"));
    let behov = stub.behov.lock().unwrap();
    assert_eq!(behov.len(), 1);
    assert_eq!(behov[0].aktor_id, "001");
    assert_eq!(behov[0].context(), Context::Veiledning);
    assert_eq!(behov[0].beregningsdato, chrono::Local::now().date_naive());
    assert_eq!(metrics.snapshot().context_count("veiledning"), 1);
}

#[tokio::test]
async fn test_start_failure_carries_status_and_still_counts() {
    let base_url = spawn(Router::new()).await;
    let metrics = Arc::new(Metrics::new());
    let client = RegelApiJobClient::new(regel_api(&base_url), metrics.clone());

    let err = client.start("1234", &Context::Unspecified).await.unwrap_err();

    assert!(matches!(
        err,
        RegelApiError::JobStart {
            status: Some(404),
            ..
        }
    ));
    assert_eq!(metrics.snapshot().context_count("default"), 1);
}

#[tokio::test]
async fn test_start_without_location_header_fails() {
    let app = Router::new().route("/behov", post(|| async { StatusCode::ACCEPTED }));
    let base_url = spawn(app).await;
    let client = RegelApiJobClient::new(regel_api(&base_url), Arc::new(Metrics::new()));

    let err = client.start("1234", &Context::Soknad).await.unwrap_err();

    assert!(matches!(
        err,
        RegelApiError::JobStart {
            status: Some(202),
            ..
        }
    ));
}

#[tokio::test]
async fn test_start_without_token_never_reaches_engine() {
    let stub = Arc::new(Stub::default());
    let base_url = spawn(stub_router(stub.clone())).await;
    let api = RegelApi::new(
        &base_url,
        &HttpConfig::default(),
        Arc::new(StaticTokenProvider::new(None)),
        None,
    )
    .unwrap();
    let client = RegelApiJobClient::new(api, Arc::new(Metrics::new()));

    let err = client.start("1234", &Context::Soknad).await.unwrap_err();

    assert!(matches!(err, RegelApiError::Auth(_)));
    assert!(stub.behov.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_status_check_pending_then_redirect() {
    let (stub, api) = stub_with_pending(1).await;
    let check = RegelApiStatusCheck::new(api);
    let location = PollLocation::new("/behov/status/123");

    assert_eq!(check.check(&location).await.unwrap(), JobStatus::Pending);
    assert_eq!(
        check.check(&location).await.unwrap(),
        JobStatus::Redirect(ResultLocation::new("/subsumsjon/54321"))
    );
    assert_eq!(stub.status_checks.load(Ordering::SeqCst), 2);
    assert_eq!(stub.unauthorized.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_status_check_failures() {
    let app = Router::new()
        .route(
            "/broken",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route("/garbled", get(|| async { "not json" }))
        .route("/lost", get(|| async { StatusCode::SEE_OTHER }));
    let base_url = spawn(app).await;
    let check = RegelApiStatusCheck::new(regel_api(&base_url));

    for path in ["/broken", "/garbled", "/lost"] {
        let err = check.check(&PollLocation::new(path)).await.unwrap_err();
        assert!(
            matches!(err, RegelApiError::Poll { .. }),
            "{path} gave {err:?}"
        );
    }
}

#[tokio::test]
async fn test_status_check_any_parsed_status_is_pending() {
    let app = Router::new()
        .route("/done", get(|| async { Json(json!({ "status": "DONE" })) }))
        .route("/bare", get(|| async { Json(json!({})) }));
    let base_url = spawn(app).await;
    let check = RegelApiStatusCheck::new(regel_api(&base_url));

    assert_eq!(
        check.check(&PollLocation::new("/done")).await.unwrap(),
        JobStatus::Pending
    );
    let err = check.check(&PollLocation::new("/bare")).await.unwrap_err();
    assert!(matches!(err, RegelApiError::Poll { .. }));
}

#[tokio::test]
async fn test_poller_follows_engine_until_redirect() {
    let (stub, api) = stub_with_pending(2).await;
    let poller = StatusPoller::new(Arc::new(RegelApiStatusCheck::new(api)));

    let started = std::time::Instant::now();
    let result = poller
        .poll(
            &PollLocation::new("/behov/status/123"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result, ResultLocation::new("/subsumsjon/54321"));
    assert_eq!(stub.status_checks.load(Ordering::SeqCst), 3);
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn test_poller_times_out_against_slow_engine() {
    let (_stub, api) = stub_with_pending(usize::MAX).await;
    let poller = StatusPoller::new(Arc::new(RegelApiStatusCheck::new(api)))
        .with_timeout(Duration::from_millis(350));

    let err = poller
        .poll(
            &PollLocation::new("/behov/status/123"),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RegelApiError::PollTimeout(_)));
}

#[tokio::test]
async fn test_fetch_subsumsjon() {
    let (_stub, api) = stub_with_pending(0).await;
    let fetcher = RegelApiResultFetcher::new(api);

    let result = fetcher
        .fetch(&ResultLocation::new("/subsumsjon/54321"))
        .await
        .unwrap();

    assert_eq!(result.behov_id.as_deref(), Some("1234"));
    assert_eq!(result.sats_resultat.unwrap().ukesats, 123);
    assert_eq!(
        result.grunnlag_resultat.unwrap().avkortet,
        rust_decimal::Decimal::new(205, 1)
    );
}

#[tokio::test]
async fn test_fetch_failures() {
    let app = Router::new().route("/subsumsjon/bad", get(|| async { Json(json!([1, 2, 3])) }));
    let base_url = spawn(app).await;
    let fetcher = RegelApiResultFetcher::new(regel_api(&base_url));

    let err = fetcher
        .fetch(&ResultLocation::new("/subsumsjon/missing"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegelApiError::ResultFetch {
            status: Some(404),
            ..
        }
    ));

    let err = fetcher
        .fetch(&ResultLocation::new("/subsumsjon/bad"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegelApiError::ResultFetch {
            status: Some(200),
            ..
        }
    ));
}

fn calculator(api: RegelApi, metrics: Arc<Metrics>) -> Calculator {
    Calculator::new(
        Arc::new(RegelApiJobClient::new(api.clone(), metrics.clone())),
        StatusPoller::new(Arc::new(RegelApiStatusCheck::new(api.clone()))),
        Arc::new(RegelApiResultFetcher::new(api)),
        metrics,
    )
}

#[tokio::test]
async fn test_compute_end_to_end() {
    let (stub, api) = stub_with_pending(2).await;
    let metrics = Arc::new(Metrics::new());

    let response = calculator(api, metrics.clone())
        .compute("1234", &Context::Soknad)
        .await
        .unwrap();

    assert!(response.oppfyller_minsteinntekt);
    assert_eq!(response.ukesats, 123);
    assert_eq!(response.periode_antall_uker, 52);
    assert_eq!(response.subsumsjon_id.as_deref(), Some("grunnlagSubsumsjonId"));
    assert_eq!(stub.status_checks.load(Ordering::SeqCst), 3);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.context_count("soknad"), 1);
    assert_eq!(snapshot.minimum_income_met, 1);
}

#[tokio::test]
async fn test_compute_start_404() {
    let base_url = spawn(Router::new()).await;
    let metrics = Arc::new(Metrics::new());

    let err = calculator(regel_api(&base_url), metrics.clone())
        .compute("1234", &Context::Vedtak)
        .await
        .unwrap_err();

    match err {
        CalculationError::RegelApi(RegelApiError::JobStart { status, .. }) => {
            assert_eq!(status, Some(404))
        }
        other => panic!("expected JobStart, got {other:?}"),
    }
    assert_eq!(metrics.snapshot().minimum_income_total(), 0);
}
