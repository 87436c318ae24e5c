use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{self, HeaderValue};
use hyper::{Request, Response, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use log::{error, info};

use rondo_pool::{Backend, BackendPool};

use crate::timing::CompletionTimer;

pub type ProxyBody = BoxBody<Bytes, hyper::Error>;

/// Bridges one inbound request to one backend round trip. Holds the pool and
/// a shared upstream client; per-request state lives on the stack.
pub struct Dispatcher {
    pool: Arc<BackendPool>,
    client: Client<HttpConnector, Incoming>,
}

impl Dispatcher {
    pub fn new(pool: Arc<BackendPool>, connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self { pool, client }
    }

    pub fn pool(&self) -> &BackendPool {
        &self.pool
    }

    /// Forwards the request to the next backend in rotation and relays the
    /// response verbatim. Failures never escape as errors: an empty pool
    /// becomes a 503, a transport failure a 502, with diagnostics going to
    /// the log only. No retry against another backend.
    pub async fn dispatch(&self, req: Request<Incoming>, remote: SocketAddr) -> Response<ProxyBody> {
        let request_id = request_id();
        let started = Instant::now();

        // Selection is the only part under the pool lock; the forward below
        // runs without it.
        let target = match self.pool.next() {
            Ok(target) => target,
            Err(err) => {
                error!("[REQ-{request_id}] No backend available: {err}");
                return plain_response(StatusCode::SERVICE_UNAVAILABLE, "service unavailable");
            }
        };

        info!(
            "[REQ-{request_id}] Proxying {} {} from {} to {}",
            req.method(),
            req.uri().path(),
            remote,
            target.host()
        );

        let outbound = match rewrite_request(req, &target) {
            Ok(outbound) => outbound,
            Err(err) => {
                error!(
                    "[REQ-{request_id}] Failed to rewrite request for {}: {err}",
                    target.host()
                );
                return plain_response(StatusCode::BAD_GATEWAY, "bad gateway");
            }
        };

        match self.client.request(outbound).await {
            Ok(response) => {
                // "Completed" is logged once the whole body has been relayed,
                // not when the upstream headers arrive.
                response.map(|body| CompletionTimer::new(body, request_id, started).boxed())
            }
            Err(err) => {
                error!(
                    "[REQ-{request_id}] Backend {} unreachable after {:?}: {err}",
                    target.host(),
                    started.elapsed()
                );
                plain_response(StatusCode::BAD_GATEWAY, "bad gateway")
            }
        }
    }
}

/// Unique within the process for logging purposes only; nothing correctness-
/// critical hangs off it.
fn request_id() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|since_epoch| since_epoch.as_nanos())
        .unwrap_or_default()
}

/// Retargets the request: scheme and authority from the backend, Host header
/// rewritten to match, method, query, remaining headers and body untouched.
fn rewrite_request(
    req: Request<Incoming>,
    target: &Backend,
) -> Result<Request<Incoming>, http::Error> {
    let (mut parts, body) = req.into_parts();

    let path = join_paths(target.path_prefix(), parts.uri.path());
    let path_and_query = match parts.uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path,
    };

    parts.uri = Uri::builder()
        .scheme(target.scheme().clone())
        .authority(target.authority().clone())
        .path_and_query(path_and_query)
        .build()?;
    parts
        .headers
        .insert(header::HOST, HeaderValue::try_from(target.host())?);

    Ok(Request::from_parts(parts, body))
}

// Single-slash join of the target's configured path prefix with the inbound
// path.
fn join_paths(prefix: &str, path: &str) -> String {
    if prefix.is_empty() || prefix == "/" {
        return path.to_string();
    }

    match (prefix.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{prefix}{}", &path[1..]),
        (false, false) => format!("{prefix}/{path}"),
        _ => format!("{prefix}{path}"),
    }
}

pub(crate) fn text_body(content: String) -> ProxyBody {
    Full::new(Bytes::from(content))
        .map_err(|never| match never {})
        .boxed()
}

pub(crate) fn plain_response(status: StatusCode, message: &str) -> Response<ProxyBody> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(text_body(message.to_string()))
        .expect("static response")
}
