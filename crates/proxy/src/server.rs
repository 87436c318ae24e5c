use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use log::{debug, info};
use tokio::net::TcpListener;

use crate::dispatch::{Dispatcher, ProxyBody};
use crate::handlers;

/// Accept loop: one task per connection, so a slow backend only ever blocks
/// the request it is serving.
pub async fn serve(listener: TcpListener, dispatcher: Arc<Dispatcher>) -> std::io::Result<()> {
    loop {
        let (stream, remote) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let dispatcher = dispatcher.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let dispatcher = dispatcher.clone();
                async move { Ok::<_, Infallible>(route(req, remote, &dispatcher).await) }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Connection from {remote} ended: {err}");
            }
        });
    }
}

async fn route(
    req: Request<Incoming>,
    remote: SocketAddr,
    dispatcher: &Dispatcher,
) -> Response<ProxyBody> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/health") => {
            info!("Health check from {remote}");
            handlers::health(dispatcher.pool())
        }
        (&Method::GET, "/stats") => handlers::stats(dispatcher.pool()),
        _ => dispatcher.dispatch(req, remote).await,
    }
}
