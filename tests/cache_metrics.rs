use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
    middleware,
    routing::get,
};
use metrics_util::debugging::DebuggingRecorder;
use tower::ServiceExt;
use yatube::cache::{PageCacheConfig, PageCacheState, page_cache_layer};

#[tokio::test]
async fn page_cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let cache = PageCacheState::new(
        PageCacheConfig {
            enabled: true,
            ttl: Duration::from_secs(60),
            capacity: 1,
        },
        "sid",
    );

    let renders = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&renders);
    let app = Router::new()
        .route(
            "/",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    "index"
                }
            }),
        )
        .layer(middleware::from_fn_with_state(cache, page_cache_layer));

    // miss, hit, then a second key pushes the first out of a one-entry cache
    for uri in ["/", "/", "/?page=2"] {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .expect("request should build");
        let response = app
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(renders.load(Ordering::SeqCst), 2);

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    for metric in [
        "yatube_page_cache_hit_total",
        "yatube_page_cache_miss_total",
        "yatube_page_cache_evict_total",
    ] {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
