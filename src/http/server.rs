//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum application around the route tree
//! - Wire up middleware (timeout, request ID, tracing)
//! - Bind server to listener
//! - Dispatch every request to the `Router` through one fallback
//!
//! # Design Decisions
//! - Axum does no routing of its own; the route tree sees every path
//! - The active `Router` sits behind `ArcSwap` so a reload never blocks requests
//! - Handlers run inline on the connection task once the body is buffered

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{body::Body, extract::State, http::Request, response::Response};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::http::request::{self, request_id_header};
use crate::lifecycle::shutdown;
use crate::routing::Router;

/// Application state injected into the dispatch handler.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ArcSwap<Router>>,
    pub max_body_size: usize,
}

/// HTTP front end for a [`Router`].
pub struct HttpServer {
    app: axum::Router,
    router: Arc<ArcSwap<Router>>,
    config: ServerConfig,
}

impl HttpServer {
    pub fn new(config: ServerConfig, router: Router) -> Self {
        let router = Arc::new(ArcSwap::from_pointee(router));
        let state = AppState {
            router: router.clone(),
            max_body_size: config.limits.max_body_size,
        };
        let app = Self::build_app(&config, state);
        Self {
            app,
            router,
            config,
        }
    }

    /// Build the Axum application with all middleware layers.
    #[allow(deprecated)]
    fn build_app(config: &ServerConfig, state: AppState) -> axum::Router {
        axum::Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(request_id_header()))
            .layer(SetRequestIdLayer::new(request_id_header(), MakeRequestUuid))
    }

    /// Handle for swapping in a rebuilt router.
    pub fn router_handle(&self) -> Arc<ArcSwap<Router>> {
        self.router.clone()
    }

    /// The application as a service, for driving requests without a socket.
    pub fn app(&self) -> axum::Router {
        self.app.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.app.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::recv(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Fallback handler: buffer the request, run the route tree, reply.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let mut ctx = request::into_context(request, state.max_body_size).await;
    let router = state.router.load();
    router.handle(&mut ctx);
    ctx.into_response()
}
