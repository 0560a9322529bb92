use crate::web::api::AppState;
use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use std::sync::atomic::Ordering;

/// Middleware for the `/app` file server: only GET is allowed, and every GET
/// counts as a hit.
pub async fn count_hits_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    if req.method() != Method::GET {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }
    state.fileserver_hits.fetch_add(1, Ordering::Relaxed);
    next.run(req).await
}

/// GET /admin/metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Html<String> {
    let hits = state.fileserver_hits.load(Ordering::Relaxed);
    Html(format!(
        "<html>\n<body>\n<h1>Welcome, Chirpy Admin</h1>\n<p>Chirpy has been visited {hits} times!</p>\n</body>\n</html>\n"
    ))
}
