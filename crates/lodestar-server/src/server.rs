//! The HTTP host.
//!
//! A hyper HTTP/1 server that turns each request into a [`Request`], attaches
//! the cookie session, hands it to the [`Dispatcher`] and writes the
//! resulting [`Response`] back. The host owns the transport concerns the
//! dispatcher does not: body limits, timeouts, connection caps and graceful
//! shutdown.
//!
//! ```rust,ignore
//! let server = Server::new(HostConfig::default(), dispatcher)
//!     .with_sessions(SessionStore::default());
//! server.run().await?;
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::SET_COOKIE;
use http::StatusCode;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use lodestar_core::{Request, Response, Session};
use lodestar_middleware::translator::{wants_html, write_status};
use tokio::net::{TcpListener, TcpStream};

use crate::config::HostConfig;
use crate::dispatcher::Dispatcher;
use crate::error::ServerError;
use crate::session_store::SessionStore;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Response type written to the wire.
pub type HttpResponse = http::Response<Full<Bytes>>;

/// The Lodestar HTTP server.
pub struct Server {
    config: HostConfig,
    dispatcher: Arc<Dispatcher>,
    sessions: Option<Arc<SessionStore>>,
}

impl Server {
    /// Creates a server without sessions.
    #[must_use]
    pub fn new(config: HostConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            dispatcher: Arc::new(dispatcher),
            sessions: None,
        }
    }

    /// Attaches a cookie session to every request.
    #[must_use]
    pub fn with_sessions(mut self, store: SessionStore) -> Self {
        self.sessions = Some(Arc::new(store));
        self
    }

    /// Host settings.
    #[must_use]
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// The dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// The session store, if sessions are enabled.
    #[must_use]
    pub fn sessions(&self) -> Option<&Arc<SessionStore>> {
        self.sessions.as_ref()
    }

    /// Serves until SIGTERM or SIGINT.
    ///
    /// # Errors
    ///
    /// Fails if the address cannot be bound.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Binds the configured address and serves until `shutdown` triggers.
    ///
    /// # Errors
    ///
    /// Fails if the address is invalid or cannot be bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self.config.socket_addr().map_err(|e| {
            ServerError::Bind(format!("invalid address '{}': {e}", self.config.http_addr()))
        })?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(format!("failed to bind to {addr}: {e}")))?;
        self.serve(listener, shutdown).await
    }

    /// Serves connections from `listener` until `shutdown` triggers, then
    /// waits up to the shutdown timeout for open connections.
    ///
    /// # Errors
    ///
    /// Fails if the listener's address cannot be read.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let local = listener.local_addr()?;
        tracing::info!(addr = %local, "Server listening on {}", local);

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        if let Some(sessions) = &server.sessions {
            spawn_session_sweeper(Arc::clone(sessions), shutdown.clone());
        }

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, remote) = match accepted {
                        Ok(conn) => conn,
                        Err(err) => {
                            tracing::error!(error = %err, "Failed to accept connection");
                            continue;
                        }
                    };
                    if let Some(max) = server.config.max_connections() {
                        if tracker.active_connections() >= max {
                            tracing::warn!(remote = %remote, max, "Connection limit reached, dropping connection");
                            continue;
                        }
                    }

                    let server = Arc::clone(&server);
                    let token = tracker.acquire();
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        if let Err(err) = server.handle_connection(stream, remote, shutdown).await {
                            tracing::debug!(remote = %remote, error = %err, "Connection error");
                        }
                        drop(token);
                    });
                }
                () = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        let timeout = server.config.shutdown_timeout();
        tracing::info!(
            "Waiting up to {:?} for {} connections to close",
            timeout,
            tracker.active_connections()
        );
        tokio::select! {
            () = tracker.wait_for_shutdown() => tracing::info!("All connections closed"),
            () = tokio::time::sleep(timeout) => tracing::warn!(
                "Shutdown timeout reached, {} connections still active",
                tracker.active_connections()
            ),
        }

        tracing::info!("Server stopped");
        Ok(())
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        remote: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(self);
        let service = service_fn(move |req: http::Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle(req).await) }
        });

        let conn = http1::Builder::new()
            .keep_alive(self.config.keep_alive_timeout().is_some())
            .serve_connection(io, service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                tracing::debug!(remote = %remote, "Closing connection for shutdown");
                conn.as_mut().graceful_shutdown();
                conn.as_mut().await
            }
        }
    }

    /// Handles one HTTP request end to end.
    pub async fn handle<B>(&self, req: http::Request<B>) -> HttpResponse
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();
        let limit = self.config.max_body_bytes();
        let collected = tokio::time::timeout(
            self.config.request_timeout(),
            Limited::new(body, limit).collect(),
        )
        .await;

        let body = match collected {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(err)) => {
                let status = if err.downcast_ref::<LengthLimitError>().is_some() {
                    StatusCode::PAYLOAD_TOO_LARGE
                } else {
                    StatusCode::BAD_REQUEST
                };
                tracing::warn!(path = %parts.uri.path(), error = %err, "Failed to read request body");
                let request = Request::from_http(http::Request::from_parts(parts, Bytes::new()));
                return plain_status(status, &request);
            }
            Err(_) => {
                tracing::warn!(path = %parts.uri.path(), "Request body collection timed out");
                let request = Request::from_http(http::Request::from_parts(parts, Bytes::new()));
                return plain_status(StatusCode::REQUEST_TIMEOUT, &request);
            }
        };

        let mut request = Request::from_http(http::Request::from_parts(parts, body));
        let mut session = None;
        if let Some(store) = &self.sessions {
            let attached = store.attach(request.headers());
            request = request.with_session(Arc::clone(&attached) as Arc<dyn Session>);
            session = Some(attached);
        }

        let dispatched = tokio::time::timeout(
            self.config.request_timeout(),
            self.dispatcher.dispatch(request.clone()),
        )
        .await;

        let mut response = match dispatched {
            Ok(response) => response.to_http(),
            Err(_) => {
                tracing::warn!(
                    request_id = %request.id(),
                    method = %request.method(),
                    path = %request.path(),
                    "Dispatch timed out"
                );
                return plain_status(StatusCode::GATEWAY_TIMEOUT, &request);
            }
        };

        if let (Some(session), Some(store)) = (session.filter(|s| s.is_new()), &self.sessions) {
            if let Some(cookie) = store.set_cookie(session.id()) {
                response.headers_mut().append(SET_COOKIE, cookie);
            }
        }
        response.map(Full::new)
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("sessions", &self.sessions.is_some())
            .finish_non_exhaustive()
    }
}

fn plain_status(status: StatusCode, request: &Request) -> HttpResponse {
    let response = Response::new();
    write_status(status, wants_html(request, &response), request, &response);
    response.to_http().map(Full::new)
}

fn spawn_session_sweeper(store: Arc<SessionStore>, shutdown: ShutdownSignal) {
    let period = store.cookie().ttl.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    store.purge_expired();
                }
                () = shutdown.recv() => break,
            }
        }
    });
}
