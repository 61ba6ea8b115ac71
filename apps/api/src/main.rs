//! CamboAdmin API composition root.

#![forbid(unsafe_code)]

mod auth;
mod dev_seed;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post, put};
use cambo_application::{
    AuthorizationService, PrincipalService, RoleAdminService, SettingsService,
};
use cambo_core::AppError;
use cambo_infrastructure::{
    AesSecretEncryptor, Argon2PasswordHasher, PostgresAuditRepository,
    PostgresAuthorizationRepository, PostgresPrincipalRepository, PostgresRoleAdminRepository,
    PostgresSettingsRepository,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let run_mode = env::args().nth(1);
    let migrate_only = run_mode.as_deref() == Some("migrate");
    let seed_only = run_mode.as_deref() == Some("seed");

    let database_url = required_env("DATABASE_URL")?;
    let frontend_url =
        env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());

    let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
    let api_port = env::var("API_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3001);
    let cookie_secure = env::var("SESSION_COOKIE_SECURE")
        .unwrap_or_else(|_| "false".to_owned())
        .eq_ignore_ascii_case("true");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    if seed_only {
        dev_seed::run(pool).await?;
        return Ok(());
    }

    // Only the full server needs the encryption key; the migrate and seed
    // modes return before the settings service exists.
    let settings_encryption_key = required_env("SETTINGS_ENCRYPTION_KEY")?;

    let session_store = PostgresStore::new(pool.clone())
        .with_table_name("tower_sessions")
        .map_err(|error| {
            AppError::Validation(format!("invalid session table name configuration: {error}"))
        })?;
    session_store.migrate().await.map_err(|error| {
        AppError::Internal(format!("failed to initialize session store: {error}"))
    })?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(cookie_secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(30)));

    let authorization_repository = Arc::new(PostgresAuthorizationRepository::new(pool.clone()));
    let authorization_service = AuthorizationService::new(authorization_repository);
    let audit_repository = Arc::new(PostgresAuditRepository::new(pool.clone()));

    let role_admin_repository = Arc::new(PostgresRoleAdminRepository::new(pool.clone()));
    let role_admin_service = RoleAdminService::new(
        authorization_service.clone(),
        role_admin_repository.clone(),
        audit_repository.clone(),
    );

    let principal_repository = Arc::new(PostgresPrincipalRepository::new(pool.clone()));
    let password_hasher = Arc::new(Argon2PasswordHasher::new());
    let principal_service = PrincipalService::new(
        authorization_service.clone(),
        principal_repository,
        role_admin_repository,
        audit_repository.clone(),
        password_hasher,
    );

    let settings_repository = Arc::new(PostgresSettingsRepository::new(pool.clone()));
    let secret_encryptor = Arc::new(AesSecretEncryptor::from_hex(&settings_encryption_key)?);
    let settings_service = SettingsService::new(
        authorization_service.clone(),
        settings_repository,
        audit_repository,
        secret_encryptor,
    );

    let app_state = AppState {
        authorization_service,
        role_admin_service,
        principal_service,
        settings_service,
    };

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route(
            "/api/admin/roles",
            get(handlers::list_roles_handler).post(handlers::create_role_handler),
        )
        .route(
            "/api/admin/roles/default",
            get(handlers::default_role_handler).put(handlers::set_default_role_handler),
        )
        .route(
            "/api/admin/roles/{slug}",
            put(handlers::update_role_handler).delete(handlers::delete_role_handler),
        )
        .route(
            "/api/admin/roles/{slug}/permissions",
            put(handlers::sync_role_permissions_handler),
        )
        .route(
            "/api/admin/roles/{slug}/permission-grants",
            post(handlers::grant_role_permissions_handler),
        )
        .route(
            "/api/admin/roles/{slug}/permission-revocations",
            post(handlers::revoke_role_permissions_handler),
        )
        .route(
            "/api/admin/permissions",
            get(handlers::list_permissions_handler).post(handlers::create_permission_handler),
        )
        .route(
            "/api/admin/role-assignments",
            get(handlers::list_role_assignments_handler).post(handlers::assign_roles_handler),
        )
        .route(
            "/api/admin/role-unassignments",
            post(handlers::unassign_roles_handler),
        )
        .route("/api/admin/role-syncs", post(handlers::sync_roles_handler))
        .route(
            "/api/admin/principals",
            get(handlers::list_principals_handler).post(handlers::create_principal_handler),
        )
        .route(
            "/api/admin/settings",
            get(handlers::list_settings_handler).put(handlers::update_settings_handler),
        )
        .route(
            "/api/admin/settings/{key}",
            put(handlers::update_setting_handler),
        )
        .route_layer(from_fn(middleware::require_auth));

    let cors_layer = CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(&frontend_url)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE]);

    let app = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/api/settings/public", get(handlers::public_settings_handler))
        .merge(protected_routes)
        .route_layer(from_fn_with_state(
            frontend_url.clone(),
            middleware::block_cross_origin_mutations,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .layer(session_layer)
        .with_state(app_state);

    let host = IpAddr::from_str(&api_host)
        .map_err(|error| AppError::Internal(format!("invalid API_HOST '{api_host}': {error}")))?;
    let address = SocketAddr::from((host, api_port));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "cambo-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}
