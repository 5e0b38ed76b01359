use axum::response::Html;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Single-page front end: analysis form, per-brand label chart, review table.
pub(super) async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
