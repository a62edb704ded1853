// A panic inside a handler must take the whole process down with status 1.
// The test re-runs itself as a child process so the exit can be observed.

use std::process::Command;

use axum::{body::Body, http::Request, routing::get, Router};
use blog_api::{fault, middleware::apply_request_pipeline};
use tower::ServiceExt;

const CHILD_ENV: &str = "BLOG_API_FAULT_CHILD";

fn panicking_app() -> Router {
    let router = Router::new().route(
        "/api/posts",
        get(|| async {
            let posts: Vec<&str> = Vec::new();
            // Indexing an empty list stands in for any uncaught handler fault
            posts[0].to_string()
        }),
    );
    apply_request_pipeline(router)
}

#[test]
fn handler_panic_exits_process_with_status_one() {
    if std::env::var_os(CHILD_ENV).is_some() {
        fault::install_panic_hook();

        let request = Request::builder()
            .uri("/api/posts")
            .body(Body::empty())
            .unwrap();
        let _ = tokio_test::block_on(panicking_app().oneshot(request));

        // Only reachable if the hook failed to terminate the process
        std::process::exit(0);
    }

    let status = Command::new(std::env::current_exe().expect("test binary path"))
        .arg("handler_panic_exits_process_with_status_one")
        .arg("--exact")
        .arg("--nocapture")
        .arg("--test-threads=1")
        .env(CHILD_ENV, "1")
        .status()
        .expect("child test process should start");

    assert_eq!(status.code(), Some(fault::FAULT_EXIT_CODE));
}

#[test]
fn panic_in_spawned_task_exits_process_with_status_one() {
    if std::env::var_os(CHILD_ENV).is_some() {
        fault::install_panic_hook();

        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let _ = tokio::spawn(async { panic!("background fault") }).await;
        });

        std::process::exit(0);
    }

    let status = Command::new(std::env::current_exe().expect("test binary path"))
        .arg("panic_in_spawned_task_exits_process_with_status_one")
        .arg("--exact")
        .arg("--nocapture")
        .arg("--test-threads=1")
        .env(CHILD_ENV, "1")
        .status()
        .expect("child test process should start");

    assert_eq!(status.code(), Some(fault::FAULT_EXIT_CODE));
}
