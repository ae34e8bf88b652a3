use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    #[must_use]
    pub const fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/api/status", get(handlers::status))
            .route("/api/themes", get(handlers::list_themes))
            .route("/api/themes/:rank", get(handlers::theme_detail))
            .route("/api/insights/summary", get(handlers::insights_summary))
            .route(
                "/api/insights/theme-history",
                get(handlers::insights_theme_history),
            )
            .route("/api/record", get(handlers::list_records))
            .route("/api/record", post(handlers::append_record))
            .route("/api/record/:record_id", delete(handlers::delete_record))
            .route("/api/refresh", post(handlers::trigger_refresh))
            .route("/api/refresh/status", get(handlers::refresh_status))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Starts the web server listening on the specified address.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the address or serve
    /// requests.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Web API listening on {}", addr);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}
