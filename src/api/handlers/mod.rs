use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{Database, ValidationError};
use crate::models::*;

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
/// The full error is logged server-side for debugging, but clients only
/// see a generic message to avoid leaking internal details.
///
/// Range violations ([`ValidationError`]) and missing-parent errors from
/// create paths are safe to expose and come back as BAD_REQUEST.
fn internal_error(e: anyhow::Error) -> (StatusCode, String) {
    let msg = e.to_string();

    if e.downcast_ref::<ValidationError>().is_some() || msg.contains("not found") {
        tracing::warn!("Validation error: {}", msg);
        return (StatusCode::BAD_REQUEST, msg);
    }

    tracing::error!("Internal error: {}", msg);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Customers
// ============================================================

pub async fn list_customers(
    State(db): State<Database>,
) -> Result<Json<Vec<Customer>>, (StatusCode, String)> {
    db.get_all_customers().map(Json).map_err(internal_error)
}

pub async fn get_customer(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<Customer>, (StatusCode, String)> {
    db.get_customer(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Customer not found".to_string()))
}

pub async fn create_customer(
    State(db): State<Database>,
    Json(input): Json<CreateCustomerInput>,
) -> Result<(StatusCode, Json<Customer>), (StatusCode, String)> {
    db.create_customer(input)
        .map(|c| (StatusCode::CREATED, Json(c)))
        .map_err(internal_error)
}

pub async fn update_customer(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateCustomerInput>,
) -> Result<Json<Customer>, (StatusCode, String)> {
    db.update_customer(id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Customer not found".to_string()))
}

pub async fn delete_customer(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.delete_customer(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Customer not found".to_string()))
    }
}

pub async fn list_customer_projects(
    State(db): State<Database>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<Vec<Project>>, (StatusCode, String)> {
    db.get_projects_by_customer(customer_id)
        .map(Json)
        .map_err(internal_error)
}

// ============================================================
// Projects
// ============================================================

pub async fn list_projects(
    State(db): State<Database>,
) -> Result<Json<Vec<Project>>, (StatusCode, String)> {
    db.get_all_projects().map(Json).map_err(internal_error)
}

pub async fn get_project(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectWithCustomer>, (StatusCode, String)> {
    db.get_project_with_customer(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Project not found".to_string()))
}

pub async fn create_project(
    State(db): State<Database>,
    Json(input): Json<CreateProjectInput>,
) -> Result<(StatusCode, Json<Project>), (StatusCode, String)> {
    db.create_project(input)
        .map(|p| (StatusCode::CREATED, Json(p)))
        .map_err(internal_error)
}

pub async fn update_project(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProjectInput>,
) -> Result<Json<Project>, (StatusCode, String)> {
    db.update_project(id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Project not found".to_string()))
}

pub async fn delete_project(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.delete_project(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Project not found".to_string()))
    }
}

/// The four aggregate figures for a project, computed from its current
/// payments, features, and tasks.
pub async fn get_project_summary(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectSummary>, (StatusCode, String)> {
    db.get_project_summary(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Project not found".to_string()))
}

// ============================================================
// Features
// ============================================================

/// Query parameters for listing a project's features.
#[derive(Debug, Deserialize)]
pub struct ListFeaturesQuery {
    /// Restrict the listing to one kind (`main` or `additional`).
    pub kind: Option<FeatureKind>,
}

pub async fn list_project_features(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<ListFeaturesQuery>,
) -> Result<Json<Vec<Feature>>, (StatusCode, String)> {
    let features = match query.kind {
        Some(kind) => db.get_features_by_kind(project_id, kind),
        None => db.get_features_by_project(project_id),
    }
    .map_err(internal_error)?;

    Ok(Json(features))
}

pub async fn list_project_features_with_tasks(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<FeatureWithTasks>>, (StatusCode, String)> {
    db.get_features_with_tasks(project_id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn get_feature(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<Feature>, (StatusCode, String)> {
    db.get_feature(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Feature not found".to_string()))
}

pub async fn create_feature(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
    Json(input): Json<CreateFeatureInput>,
) -> Result<(StatusCode, Json<Feature>), (StatusCode, String)> {
    db.create_feature(project_id, input)
        .map(|f| (StatusCode::CREATED, Json(f)))
        .map_err(internal_error)
}

pub async fn update_feature(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateFeatureInput>,
) -> Result<Json<Feature>, (StatusCode, String)> {
    db.update_feature(id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Feature not found".to_string()))
}

pub async fn delete_feature(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.delete_feature(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Feature not found".to_string()))
    }
}

// ============================================================
// Tasks
// ============================================================

pub async fn list_feature_tasks(
    State(db): State<Database>,
    Path(feature_id): Path<Uuid>,
) -> Result<Json<Vec<Task>>, (StatusCode, String)> {
    db.get_tasks_by_feature(feature_id)
        .map(Json)
        .map_err(internal_error)
}

/// Tasks across all of a project's features.
pub async fn list_project_tasks(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<Task>>, (StatusCode, String)> {
    db.get_tasks_by_project(project_id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn get_task(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, (StatusCode, String)> {
    db.get_task(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Task not found".to_string()))
}

pub async fn create_task(
    State(db): State<Database>,
    Path(feature_id): Path<Uuid>,
    Json(input): Json<CreateTaskInput>,
) -> Result<(StatusCode, Json<Task>), (StatusCode, String)> {
    db.create_task(feature_id, input)
        .map(|t| (StatusCode::CREATED, Json(t)))
        .map_err(internal_error)
}

pub async fn update_task(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateTaskInput>,
) -> Result<Json<Task>, (StatusCode, String)> {
    db.update_task(id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Task not found".to_string()))
}

pub async fn delete_task(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.delete_task(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Task not found".to_string()))
    }
}

// ============================================================
// Payments
// ============================================================

pub async fn list_project_payments(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<Payment>>, (StatusCode, String)> {
    db.get_payments_by_project(project_id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn get_payment(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<Payment>, (StatusCode, String)> {
    db.get_payment(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Payment not found".to_string()))
}

pub async fn create_payment(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
    Json(input): Json<CreatePaymentInput>,
) -> Result<(StatusCode, Json<Payment>), (StatusCode, String)> {
    db.create_payment(project_id, input)
        .map(|p| (StatusCode::CREATED, Json(p)))
        .map_err(internal_error)
}

pub async fn update_payment(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdatePaymentInput>,
) -> Result<Json<Payment>, (StatusCode, String)> {
    db.update_payment(id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Payment not found".to_string()))
}

pub async fn delete_payment(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.delete_payment(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Payment not found".to_string()))
    }
}

// ============================================================
// Subscriptions
// ============================================================

pub async fn list_project_subscriptions(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<Subscription>>, (StatusCode, String)> {
    db.get_subscriptions_by_project(project_id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn get_subscription(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<Subscription>, (StatusCode, String)> {
    db.get_subscription(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Subscription not found".to_string()))
}

pub async fn create_subscription(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
    Json(input): Json<CreateSubscriptionInput>,
) -> Result<(StatusCode, Json<Subscription>), (StatusCode, String)> {
    db.create_subscription(project_id, input)
        .map(|s| (StatusCode::CREATED, Json(s)))
        .map_err(internal_error)
}

pub async fn update_subscription(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateSubscriptionInput>,
) -> Result<Json<Subscription>, (StatusCode, String)> {
    db.update_subscription(id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Subscription not found".to_string()))
}

pub async fn delete_subscription(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.delete_subscription(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Subscription not found".to_string()))
    }
}

// ============================================================
// Project files
// ============================================================

pub async fn list_project_files(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<ProjectFile>>, (StatusCode, String)> {
    db.get_project_files(project_id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn add_project_file(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
    Json(input): Json<AddFileInput>,
) -> Result<(StatusCode, Json<ProjectFile>), (StatusCode, String)> {
    db.add_project_file(project_id, input)
        .map(|f| (StatusCode::CREATED, Json(f)))
        .map_err(internal_error)
}

pub async fn remove_project_file(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.remove_project_file(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "File not found".to_string()))
    }
}
