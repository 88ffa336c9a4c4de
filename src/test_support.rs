//! Local HTTP fixtures shared by the unit tests.

use axum::http::{HeaderMap, StatusCode};
use axum::response::Html;
use axum::routing::get;
use axum::Router;

pub fn article_html() -> String {
    r#"<html>
<head><title> Memory Safety </title></head>
<body>
<nav>Home | About</nav>
<p>Rust is a systems programming language focused on memory safety.</p>
<p>The Rust compiler checks memory safety at compile time. Many developers enjoy the Rust type system and its safety guarantees.</p>
<p>Cats like to sleep in the sun.</p>
<p>The borrow checker is the part of the compiler that enforces memory safety. Rust programs avoid data races because the compiler rejects them.</p>
<p>Coffee is popular in the morning. Safety without garbage collection is a key Rust goal.</p>
<p>The weather was mild yesterday.</p>
</body>
</html>"#
        .to_string()
}

fn second_html() -> String {
    r#"<html><head><title>Second Page</title></head><body>
<p>Queues hold work until it is processed. A queue keeps items in order.</p>
<p>Items leave the queue once they are handled. Ordered queues make delivery predictable.</p>
</body></html>"#
        .to_string()
}

/// A single paragraph well past the fetch size limit.
pub fn huge_html() -> String {
    let filler: String = (0..60_000)
        .map(|i| format!("Sentence {i} talks about topic {}. ", i % 13))
        .collect();
    format!("<html><head><title>Huge</title></head><body><p>{filler}</p></body></html>")
}

async fn agent_only(headers: HeaderMap) -> Result<Html<&'static str>, StatusCode> {
    let agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let upgrade = headers.get("upgrade-insecure-requests").is_some();
    if agent.contains("Firefox") && upgrade {
        Ok(Html(
            "<html><head><title>Welcome</title></head><body><p>Browsers are welcome here. Bots are not.</p></body></html>",
        ))
    } else {
        Err(StatusCode::FORBIDDEN)
    }
}

/// Serve fixture pages on an ephemeral local port and return the base URL.
pub async fn serve_pages() -> String {
    let app = Router::new()
        .route("/article", get(|| async { Html(article_html()) }))
        .route("/second", get(|| async { Html(second_html()) }))
        .route(
            "/no-paragraphs",
            get(|| async {
                Html("<html><head><title>Layout</title></head><body><div>Only divs here.</div></body></html>")
            }),
        )
        .route("/huge", get(|| async { Html(huge_html()) }))
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route("/agent-only", get(agent_only));
    serve(app).await
}

/// Serve `app` on an ephemeral local port and return the base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}
