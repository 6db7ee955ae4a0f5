//! Tenant-scoped attendance handlers: geofenced check-in/out and holidays.
//!
//! These are the canonical consumers of the tenant scope. Each handler
//! retrieves the connection the resolution middleware bound and must handle
//! the absent case itself: an unknown tenant reaches the handler, not a
//! middleware rejection, and surfaces as the client-unavailable 400 here.

use axum::extract::{Extension, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

use foreman_core::{GeoPoint, RequestContext, TenantRecord};

use super::AppState;
use crate::tenancy::error::ApiError;
use crate::tenancy::scope::tenant_connection;

/// Fence radius applied when a tenant has not configured one.
const DEFAULT_GEOFENCE_RADIUS_M: f64 = 250.0;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    pub employee_id: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResponse {
    pub status_text: &'static str,
    pub status_value: u16,
    pub attendance_id: i64,
    pub distance_m: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutRequest {
    pub employee_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutResponse {
    pub status_text: &'static str,
    pub status_value: u16,
    pub attendance_id: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Holiday {
    pub name: String,
    pub holiday_date: NaiveDate,
    pub recurring: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidaysResponse {
    pub status_text: &'static str,
    pub status_value: u16,
    pub holidays: Vec<Holiday>,
}

/// `POST /api/attendance/check-in`
///
/// Validates the caller's position against the tenant's geofence, then
/// opens an attendance record.
pub async fn check_in_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<CheckInRequest>,
) -> Result<Json<CheckInResponse>, ApiError> {
    let pool = tenant_connection().ok_or(ApiError::ClientUnavailable)?;
    let record = tenant_record(&state, &ctx)?;

    let here = GeoPoint::new(body.latitude, body.longitude);
    let distance_m = record.location.distance_m(&here);
    let radius_m = geofence_radius(&pool).await?;
    if distance_m > radius_m {
        return Err(ApiError::OutsideGeofence { distance_m });
    }

    let (attendance_id,): (i64,) = sqlx::query_as(
        "INSERT INTO attendance_records (employee_id, latitude, longitude, distance_m)
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(&body.employee_id)
    .bind(body.latitude)
    .bind(body.longitude)
    .bind(distance_m)
    .fetch_one(&pool)
    .await?;

    log_event(&pool, &body.employee_id, "check-in", distance_m).await?;
    info!(
        request_id = %ctx.request_id,
        tenant = ctx.tenant_id.as_deref().unwrap_or("-"),
        employee = %body.employee_id,
        attendance_id,
        "attendance check-in"
    );

    Ok(Json(CheckInResponse {
        status_text: "SUCCESS",
        status_value: 200,
        attendance_id,
        distance_m,
    }))
}

/// `POST /api/attendance/check-out`
///
/// Closes the employee's open attendance record. Checking out without an
/// open record is a client error, not an upsert.
pub async fn check_out_handler(
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<CheckOutRequest>,
) -> Result<Json<CheckOutResponse>, ApiError> {
    let pool = tenant_connection().ok_or(ApiError::ClientUnavailable)?;

    let closed: Option<(i64,)> = sqlx::query_as(
        "UPDATE attendance_records SET checked_out_at = now()
         WHERE id = (
             SELECT id FROM attendance_records
             WHERE employee_id = $1 AND checked_out_at IS NULL
             ORDER BY checked_in_at DESC LIMIT 1
         )
         RETURNING id",
    )
    .bind(&body.employee_id)
    .fetch_optional(&pool)
    .await?;

    let Some((attendance_id,)) = closed else {
        return Err(ApiError::NotCheckedIn {
            employee_id: body.employee_id,
        });
    };

    log_event(&pool, &body.employee_id, "check-out", 0.0).await?;
    info!(
        request_id = %ctx.request_id,
        employee = %body.employee_id,
        attendance_id,
        "attendance check-out"
    );

    Ok(Json(CheckOutResponse {
        status_text: "SUCCESS",
        status_value: 200,
        attendance_id,
    }))
}

/// `GET /api/holidays` -- the tenant's holiday list.
pub async fn holidays_handler() -> Result<Json<HolidaysResponse>, ApiError> {
    let pool = tenant_connection().ok_or(ApiError::ClientUnavailable)?;

    let holidays: Vec<Holiday> = sqlx::query_as(
        "SELECT name, holiday_date, recurring FROM holiday_lists ORDER BY holiday_date",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(HolidaysResponse {
        status_text: "SUCCESS",
        status_value: 200,
        holidays,
    }))
}

fn tenant_record(state: &AppState, ctx: &RequestContext) -> Result<TenantRecord, ApiError> {
    ctx.tenant_id
        .as_deref()
        .and_then(|db_name| state.tenants.record_for(db_name))
        .ok_or(ApiError::ClientUnavailable)
}

async fn geofence_radius(pool: &PgPool) -> Result<f64, ApiError> {
    let configured: Option<(f64,)> =
        sqlx::query_as("SELECT geofence_radius_m FROM attendance_settings LIMIT 1")
            .fetch_optional(pool)
            .await?;
    Ok(configured.map_or(DEFAULT_GEOFENCE_RADIUS_M, |(radius,)| radius))
}

async fn log_event(
    pool: &PgPool,
    employee_id: &str,
    event: &str,
    distance_m: f64,
) -> Result<(), ApiError> {
    sqlx::query("INSERT INTO attendance_logs (employee_id, event, detail) VALUES ($1, $2, $3)")
        .bind(employee_id)
        .bind(event)
        .bind(format!("distance_m={distance_m:.1}"))
        .execute(pool)
        .await?;
    Ok(())
}
