pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod services;
#[cfg(test)]
pub(crate) mod testing;
pub mod types;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, StatusCode},
    middleware::from_fn,
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    trace::TraceLayer,
};

use crate::database::DatabaseManager;
use crate::services::storage::{Bucket, LocalStorage};

/// The full HTTP application: public, protected and elevated tiers.
pub fn app() -> Router {
    let settings = config::config();

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        .merge(storage_routes())
        .merge(api_routes())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(settings.server.max_request_size_bytes))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

fn public_routes() -> Router {
    use handlers::public::{auth, calculator, catalog};

    Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/calculator", post(calculator::calculate))
        .route("/catalog/products", get(catalog::product_list))
        .route("/catalog/products/:id", get(catalog::product_show))
        .route("/catalog/products/:id/calculator", get(catalog::product_calculator))
        .route("/catalog/tags", get(catalog::tag_list))
}

/// Uploaded objects, read-only, one directory per bucket
fn storage_routes() -> Router {
    let storage = LocalStorage::from_config();
    Bucket::ALL.iter().fold(Router::new(), |router, bucket| {
        router.nest_service(
            &format!("/storage/{}", bucket.as_str()),
            ServeDir::new(storage.bucket_dir(*bucket)),
        )
    })
}

fn api_routes() -> Router {
    Router::new()
        .route("/api/auth/whoami", get(handlers::protected::auth::whoami))
        .route("/api/auth/logout", post(handlers::protected::auth::logout))
        .merge(vendor_routes())
        .merge(partner_routes())
        .merge(admin_routes())
        .route_layer(from_fn(middleware::jwt_auth_middleware))
}

fn vendor_routes() -> Router {
    use axum::routing::patch;
    use handlers::protected::vendor::{applications, products, profile};

    Router::new()
        .route(
            "/api/vendor/profile",
            get(profile::profile_get)
                .post(profile::profile_create)
                .patch(profile::profile_update),
        )
        .route("/api/vendor/profile/logo", post(profile::logo_upload))
        .route(
            "/api/vendor/products",
            get(products::product_list).post(products::product_create),
        )
        .route(
            "/api/vendor/products/:id",
            get(products::product_get)
                .patch(products::product_update)
                .delete(products::product_delete),
        )
        .route("/api/vendor/products/:id/image", post(products::image_upload))
        .route("/api/vendor/products/:id/tags", put(products::tags_set))
        .route(
            "/api/vendor/products/:id/tiers",
            get(products::tier_list).post(products::tier_create),
        )
        .route(
            "/api/vendor/products/:id/tiers/:tier_id",
            patch(products::tier_update).delete(products::tier_delete),
        )
        .route("/api/vendor/applications", get(applications::application_list))
        .route_layer(from_fn(middleware::require_vendor))
}

fn partner_routes() -> Router {
    use axum::routing::patch;
    use handlers::protected::partner::{applications, profile};

    Router::new()
        .route(
            "/api/partner/profile",
            get(profile::profile_get)
                .post(profile::profile_create)
                .patch(profile::profile_update),
        )
        .route(
            "/api/partner/applications",
            get(applications::application_list).post(applications::application_create),
        )
        .route("/api/partner/applications/:id", delete(applications::application_withdraw))
        .route_layer(from_fn(middleware::require_partner))
}

fn admin_routes() -> Router {
    use handlers::elevated::admin;

    Router::new()
        .route("/api/admin/stats", get(admin::stats))
        .route("/api/admin/:collection", get(admin::collection_list))
        .route("/api/admin/:collection/find", post(admin::collection_find))
        .route("/api/admin/:collection/:id", get(admin::record_get))
        .route("/api/admin/:collection/:id/status", put(admin::status_put))
        .route("/api/admin/:collection/:id/approve", post(admin::approve))
        .route("/api/admin/:collection/:id/reject", post(admin::reject))
        .route_layer(from_fn(middleware::require_admin))
}

fn cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = config::config()
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Rezollo API",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "auth": "/auth/signup, /auth/login, /auth/refresh (public)",
                "catalog": "/catalog/products[/:id[/calculator]], /catalog/tags (public)",
                "calculator": "/calculator (public)",
                "storage": "/storage/:bucket/:key (public)",
                "session": "/api/auth/whoami, /api/auth/logout (protected)",
                "vendor": "/api/vendor/* (vendor accounts)",
                "partner": "/api/partner/* (partner accounts)",
                "admin": "/api/admin/* (admin accounts)",
            }
        }
    }))
}

async fn health() -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "database": "ok" }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": { "status": "degraded", "timestamp": now }
                })),
            )
        }
    }
}
