pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod mail;
pub mod request_id;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use folio_core::{FolioResult, JsonStore, TokenService};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub use config::Config;

pub struct AppState {
    pub store: Arc<JsonStore>,
    pub auth: auth::AuthState,
    pub mailer: Arc<dyn mail::Mailer>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn from_config(config: Config, mailer: Arc<dyn mail::Mailer>) -> FolioResult<Self> {
        let store = JsonStore::open(&config.db_path).await?;
        let tokens = TokenService::new(config.secret_auth.clone())
            .with_auth_ttl(config.token_ttl());

        Ok(Self {
            store: Arc::new(store),
            auth: auth::AuthState::new(tokens),
            mailer,
            config: Arc::new(config),
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route(
            "/articles",
            get(api::list_articles).post(api::create_article),
        )
        .route(
            "/articles/:id",
            get(api::get_article)
                .patch(api::update_article)
                .delete(api::delete_article),
        )
        .route("/users/:id", get(api::get_user).patch(api::update_user))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::authenticate,
        ));

    let public = Router::new()
        .route("/register", post(api::register))
        .route("/verify", get(api::verify))
        .route("/login", post(api::login))
        .route("/token", get(api::token));

    // Built assets first, index.html for everything else (client-side routes)
    let frontend = ServeDir::new(&state.config.build_dir)
        .append_index_html_on_directories(false)
        .fallback(get(api::index_html).with_state::<()>(state.clone()));

    Router::new()
        .nest("/api", protected.merge(public))
        .route("/health", get(|| async { "OK" }))
        .route("/index.html", get(api::index_html))
        .fallback_service(frontend)
        .layer(middleware::from_fn(request_id::request_id))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
