use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{header, Request, Response, StatusCode};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioIo};
use tokio::net::TcpListener;

use rondo_pool::BackendPool;
use rondo_proxy::server::serve;
use rondo_proxy::Dispatcher;

/// Backend that answers 201 and echoes what it saw, so tests can check the
/// rewritten Host header, the forwarded path/query and the request body.
async fn echo(
    req: Request<Incoming>,
    name: &'static str,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let body = req
        .into_body()
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .unwrap_or_default();

    let text = format!(
        "{name} method={method} uri={uri} host={host} body={}",
        String::from_utf8_lossy(&body)
    );

    Ok(Response::builder()
        .status(StatusCode::CREATED)
        .header("x-backend", name)
        .body(Full::new(Bytes::from(text)))
        .unwrap())
}

async fn start_backend(name: &'static str) -> std::io::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();

    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(_) => break,
            };
            let service = service_fn(move |req| echo(req, name));

            tokio::spawn(async move {
                let _ = hyper::server::conn::http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    Ok(port)
}

async fn start_proxy(targets: &[String]) -> (u16, Arc<BackendPool>) {
    let pool = Arc::new(BackendPool::new(targets).unwrap());
    let dispatcher = Arc::new(Dispatcher::new(pool.clone(), Duration::from_secs(2)));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let _ = serve(listener, dispatcher).await;
    });

    (port, pool)
}

fn client() -> Client<HttpConnector, Full<Bytes>> {
    Client::builder(TokioExecutor::new()).build_http()
}

async fn get(port: u16, path: &str) -> (StatusCode, hyper::HeaderMap, String) {
    let response = client()
        .request(
            Request::builder()
                .uri(format!("http://127.0.0.1:{port}{path}"))
                .body(Full::new(Bytes::new()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, String::from_utf8_lossy(&body).to_string())
}

#[tokio::test]
async fn relays_status_headers_body_and_rewrites_host() {
    let backend_port = start_backend("alpha").await.unwrap();
    let (proxy_port, _pool) = start_proxy(&[format!("http://127.0.0.1:{backend_port}")]).await;

    let (status, headers, body) = get(proxy_port, "/foo?x=1").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(headers.get("x-backend").unwrap(), "alpha");
    assert!(body.contains("uri=/foo?x=1"), "body was: {body}");
    assert!(
        body.contains(&format!("host=127.0.0.1:{backend_port}")),
        "Host header was not rewritten: {body}"
    );
}

#[tokio::test]
async fn post_body_streams_through_unchanged() {
    let backend_port = start_backend("alpha").await.unwrap();
    let (proxy_port, _pool) = start_proxy(&[format!("http://127.0.0.1:{backend_port}")]).await;

    let response = client()
        .request(
            Request::builder()
                .method("POST")
                .uri(format!("http://127.0.0.1:{proxy_port}/submit"))
                .body(Full::new(Bytes::from("hello backend")))
                .unwrap(),
        )
        .await
        .unwrap();

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body = String::from_utf8_lossy(&body);
    assert!(body.contains("method=POST"));
    assert!(body.contains("body=hello backend"), "body was: {body}");
}

#[tokio::test]
async fn requests_alternate_between_backends_in_order() {
    let port_a = start_backend("alpha").await.unwrap();
    let port_b = start_backend("beta").await.unwrap();
    let (proxy_port, _pool) = start_proxy(&[
        format!("http://127.0.0.1:{port_a}"),
        format!("http://127.0.0.1:{port_b}"),
    ])
    .await;

    let mut seen = Vec::new();
    for _ in 0..4 {
        let (_, headers, _) = get(proxy_port, "/").await;
        seen.push(headers.get("x-backend").unwrap().to_str().unwrap().to_string());
    }

    assert_eq!(seen, vec!["alpha", "beta", "alpha", "beta"]);
}

#[tokio::test]
async fn target_path_prefix_is_prepended() {
    let backend_port = start_backend("alpha").await.unwrap();
    let (proxy_port, _pool) = start_proxy(&[format!("http://127.0.0.1:{backend_port}/v2")]).await;

    let (_, _, body) = get(proxy_port, "/foo").await;
    assert!(body.contains("uri=/v2/foo"), "body was: {body}");
}

#[tokio::test]
async fn added_backend_joins_the_rotation() {
    let port_a = start_backend("alpha").await.unwrap();
    let port_b = start_backend("beta").await.unwrap();
    let (proxy_port, pool) = start_proxy(&[format!("http://127.0.0.1:{port_a}")]).await;

    let (_, headers, _) = get(proxy_port, "/").await;
    assert_eq!(headers.get("x-backend").unwrap(), "alpha");

    pool.add_server(&format!("http://127.0.0.1:{port_b}")).unwrap();

    let (_, headers, _) = get(proxy_port, "/").await;
    assert_eq!(headers.get("x-backend").unwrap(), "alpha");
    let (_, headers, _) = get(proxy_port, "/").await;
    assert_eq!(headers.get("x-backend").unwrap(), "beta");
}

#[tokio::test]
async fn empty_pool_returns_503_but_health_still_answers() {
    let (proxy_port, _pool) = start_proxy(&[]).await;

    let (status, _, _) = get(proxy_port, "/anything").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _, body) = get(proxy_port, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Load Balancer OK - Managing 0 servers");
}

#[tokio::test]
async fn unreachable_backend_returns_502_without_detail() {
    // Bind then drop to get a port nothing is listening on.
    let dead_port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let (proxy_port, _pool) = start_proxy(&[format!("http://127.0.0.1:{dead_port}")]).await;

    let (status, _, body) = get(proxy_port, "/").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, "bad gateway");
}

#[tokio::test]
async fn stats_lists_backends_one_indexed() {
    let (proxy_port, _pool) = start_proxy(&[
        "http://10.0.0.1:81".to_string(),
        "http://10.0.0.2:82".to_string(),
    ])
    .await;

    let (status, headers, body) = get(proxy_port, "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "text/html");
    assert!(body.contains("Configured Servers (2)"));
    assert!(body.contains("<li>Server 1: 10.0.0.1:81</li>"));
    assert!(body.contains("<li>Server 2: 10.0.0.2:82</li>"));
}

#[tokio::test]
async fn health_reports_pool_size() {
    let (proxy_port, pool) = start_proxy(&[
        "http://10.0.0.1:81".to_string(),
        "http://10.0.0.2:82".to_string(),
    ])
    .await;

    let (status, _, body) = get(proxy_port, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Load Balancer OK - Managing 2 servers");

    pool.add_server("http://10.0.0.3:83").unwrap();
    let (_, _, body) = get(proxy_port, "/health").await;
    assert_eq!(body, "Load Balancer OK - Managing 3 servers");
}
