// src/testing.rs
// =============================================================================
// Test-only helpers: a tiny local website served by axum on 127.0.0.1:0.
//
// Routes:
//   /ok            200, a page with plenty of text
//   /thin          200, a page with almost no text
//   /missing       404
//   /slow          200 after 3 seconds
//   /head-rejected 405 for HEAD, 200 for GET
//   /image.png     200
// =============================================================================

use axum::http::{Method, StatusCode};
use axum::response::Html;
use axum::routing::{any, get};
use axum::Router;
use std::time::Duration;
use url::Url;

pub const RICH_PAGE: &str = r#"<html><head><title>A perfectly ordinary page</title></head><body>
<h1>Welcome</h1>
<p>Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do eiusmod tempor
incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, quis nostrud
exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat. Duis aute irure
dolor in reprehenderit in voluptate velit esse cillum dolore eu fugiat nulla pariatur.</p>
</body></html>"#;

pub const THIN_PAGE: &str = "<html><body><p>Soon.</p></body></html>";

/// Starts the site in the background and returns its base URL.
pub async fn spawn_site() -> Url {
    let app = Router::new()
        .route("/ok", get(|| async { Html(RICH_PAGE) }))
        .route("/thin", get(|| async { Html(THIN_PAGE) }))
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Html(RICH_PAGE)
            }),
        )
        .route(
            "/head-rejected",
            any(|method: Method| async move {
                if method == Method::HEAD {
                    StatusCode::METHOD_NOT_ALLOWED
                } else {
                    StatusCode::OK
                }
            }),
        )
        .route("/image.png", get(|| async { StatusCode::OK }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Url::parse(&format!("http://{addr}/")).unwrap()
}
