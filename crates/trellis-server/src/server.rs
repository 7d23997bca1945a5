//! HTTP serving via Hyper.
//!
//! Each accepted connection is served on its own task with HTTP/1.1. Request
//! bodies are collected in full before the request enters the middleware
//! chain.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use trellis_middleware::{Request, Response, ResponseExt};

use crate::{App, ServerError};

impl App {
    /// Serves the application until the process is stopped.
    pub async fn serve(self, addr: SocketAddr) -> Result<(), ServerError> {
        self.serve_with_shutdown(addr, std::future::pending()).await
    }

    /// Serves the application until `shutdown` completes.
    ///
    /// Connections already accepted keep running on their own tasks.
    pub async fn serve_with_shutdown<S>(self, addr: SocketAddr, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        tracing::info!(addr = %listener.local_addr()?, "listening");

        let app = Arc::new(self);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, remote_addr) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            tracing::warn!(error = %e, "failed to accept connection");
                            continue;
                        }
                    };
                    let app = Arc::clone(&app);
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let service = service_fn(move |req: http::Request<Incoming>| {
                            let app = Arc::clone(&app);
                            async move { Ok::<_, Infallible>(app.handle_incoming(req).await) }
                        });
                        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                            tracing::debug!(%remote_addr, error = %e, "connection closed with error");
                        }
                    });
                }
                () = &mut shutdown => {
                    tracing::info!("shutdown signal received, no longer accepting connections");
                    return Ok(());
                }
            }
        }
    }

    async fn handle_incoming(&self, request: http::Request<Incoming>) -> Response {
        let (parts, body) = request.into_parts();
        let body: Bytes = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read request body");
                return Response::json_error(
                    StatusCode::BAD_REQUEST,
                    "BODY_READ_ERROR",
                    "failed to read request body",
                );
            }
        };
        self.handle(Request::from_parts(parts, Full::new(body))).await
    }
}
