use axum::{
    extract::Request,
    http::{HeaderValue, header},
    middleware::Next,
    response::Response,
};

/// Open CORS on every response, plus the server version.
pub async fn add_response_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers
        .entry(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .or_insert(HeaderValue::from_static("*"));
    headers.insert(
        "Skywave-Version",
        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
    );
    response
}
