//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

use auth::middleware::{Access, GateState, RoutePolicy, RouteRule, request_gate};
use auth::models::Role;
use auth::{AuthConfig, PgCredentialDirectory, TokenService, auth_router};
use axum::{
    Router, http,
    http::{Method, header},
};
use base64::Engine;
use base64::engine::general_purpose;
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,auth=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database connection
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    tracing::info!("Connected to database");

    // Auth configuration
    let auth_config = if cfg!(debug_assertions) {
        AuthConfig::development()
    } else {
        // In production, tokens must survive restarts and be valid across
        // instances, so the signing key comes from the environment
        let key_b64 =
            env::var("JWT_SIGNING_KEY").expect("JWT_SIGNING_KEY must be set in production");
        let key_bytes = Engine::decode(&general_purpose::STANDARD, &key_b64)?;
        if key_bytes.len() != 32 {
            anyhow::bail!(
                "JWT_SIGNING_KEY must decode to 32 bytes, got {}",
                key_bytes.len()
            );
        }
        let mut signing_key = [0u8; 32];
        signing_key.copy_from_slice(&key_bytes);

        let password_pepper = env::var("PASSWORD_PEPPER")
            .ok()
            .map(|p| p.into_bytes());

        AuthConfig {
            signing_key,
            password_pepper,
            ..AuthConfig::default()
        }
    };

    let auth_config = Arc::new(auth_config);
    let tokens = TokenService::new(auth_config.clone());
    let directory = PgCredentialDirectory::new(pool.clone());

    // Route access policy, evaluated first-match for every request
    let policy = RoutePolicy::new(Access::Authenticated)
        .rule(RouteRule::new("/authenticate", Access::Public).with_method(Method::POST))
        .rule(RouteRule::new("/users/register", Access::Public).with_method(Method::POST))
        .rule(RouteRule::new("/courses/*", Access::Public).with_method(Method::GET))
        .rule(RouteRule::new("/categories/*", Access::Public).with_method(Method::GET))
        .rule(RouteRule::new("/providers/*", Access::Public).with_method(Method::GET))
        .rule(RouteRule::new("/admin/*", Access::Role(Role::Admin)))
        .rule(RouteRule::new("/", Access::Public));

    let gate_state = GateState {
        directory: Arc::new(directory.clone()),
        tokens: tokens.clone(),
        policy: Arc::new(policy),
    };

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:5173,http://127.0.0.1:5173".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    // Build router; the gate runs before every route
    let app = Router::new()
        .merge(auth_router(directory, tokens, auth_config))
        .layer(axum::middleware::from_fn(move |req, next| {
            let state = gate_state.clone();
            async move { request_gate(state, req, next).await }
        }))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], 8080));
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
