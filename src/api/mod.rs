mod handlers;
pub mod middleware;

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::db::Database;

pub use middleware::SecurityConfig;

pub fn create_router(db: Database) -> Router {
    create_router_with_config(db, SecurityConfig::disabled())
}

pub fn create_router_with_config(db: Database, config: SecurityConfig) -> Router {
    let mut api = Router::new()
        // Customers
        .route("/customers", get(handlers::list_customers))
        .route("/customers", post(handlers::create_customer))
        .route("/customers/{id}", get(handlers::get_customer))
        .route("/customers/{id}", put(handlers::update_customer))
        .route("/customers/{id}", delete(handlers::delete_customer))
        .route("/customers/{id}/projects", get(handlers::list_customer_projects))
        // Projects
        .route("/projects", get(handlers::list_projects))
        .route("/projects", post(handlers::create_project))
        .route("/projects/{id}", get(handlers::get_project))
        .route("/projects/{id}", put(handlers::update_project))
        .route("/projects/{id}", delete(handlers::delete_project))
        .route("/projects/{id}/summary", get(handlers::get_project_summary))
        .route("/projects/{id}/features", get(handlers::list_project_features))
        .route("/projects/{id}/features", post(handlers::create_feature))
        .route("/projects/{id}/features/with-tasks", get(handlers::list_project_features_with_tasks))
        .route("/projects/{id}/tasks", get(handlers::list_project_tasks))
        .route("/projects/{id}/payments", get(handlers::list_project_payments))
        .route("/projects/{id}/payments", post(handlers::create_payment))
        .route("/projects/{id}/subscriptions", get(handlers::list_project_subscriptions))
        .route("/projects/{id}/subscriptions", post(handlers::create_subscription))
        .route("/projects/{id}/files", get(handlers::list_project_files))
        .route("/projects/{id}/files", post(handlers::add_project_file))
        // Features (by feature id)
        .route("/features/{id}", get(handlers::get_feature))
        .route("/features/{id}", put(handlers::update_feature))
        .route("/features/{id}", delete(handlers::delete_feature))
        .route("/features/{id}/tasks", get(handlers::list_feature_tasks))
        .route("/features/{id}/tasks", post(handlers::create_task))
        // Tasks
        .route("/tasks/{id}", get(handlers::get_task))
        .route("/tasks/{id}", put(handlers::update_task))
        .route("/tasks/{id}", delete(handlers::delete_task))
        // Payments
        .route("/payments/{id}", get(handlers::get_payment))
        .route("/payments/{id}", put(handlers::update_payment))
        .route("/payments/{id}", delete(handlers::delete_payment))
        // Subscriptions
        .route("/subscriptions/{id}", get(handlers::get_subscription))
        .route("/subscriptions/{id}", put(handlers::update_subscription))
        .route("/subscriptions/{id}", delete(handlers::delete_subscription))
        // Files
        .route("/files/{id}", delete(handlers::remove_project_file));

    if let Some(limiter) = &config.rate_limiter {
        api = api.layer(from_fn_with_state(
            limiter.clone(),
            middleware::rate_limit_middleware,
        ));
    }
    if config.api_key.is_some() {
        api = api.layer(from_fn_with_state(
            config.clone(),
            middleware::auth_middleware,
        ));
    }

    // Health stays reachable without credentials
    let api = api.route("/health", get(handlers::health));

    let cors = match &config.cors_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> =
                origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::permissive(),
    };

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(db)
}
