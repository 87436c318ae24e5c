//! Read-only observability endpoints. Both render the pool's snapshot and
//! take no part in selection or mutation.

use hyper::header;
use hyper::{Response, StatusCode};

use rondo_pool::BackendPool;

use crate::dispatch::{plain_response, text_body, ProxyBody};

/// Always succeeds while the process is alive; does not probe backends.
pub fn health(pool: &BackendPool) -> Response<ProxyBody> {
    plain_response(
        StatusCode::OK,
        &format!("Load Balancer OK - Managing {} servers", pool.len()),
    )
}

/// HTML listing of the configured backends, 1-indexed.
pub fn stats(pool: &BackendPool) -> Response<ProxyBody> {
    let servers = pool.snapshot();

    let mut page = String::from("<h1>Load Balancer Statistics</h1>");
    page.push_str(&format!("<h2>Configured Servers ({})</h2>", servers.len()));
    page.push_str("<ul>");
    for (index, server) in servers.iter().enumerate() {
        page.push_str(&format!("<li>Server {}: {}</li>", index + 1, server.host()));
    }
    page.push_str("</ul>");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/html")
        .body(text_body(page))
        .expect("static response")
}
