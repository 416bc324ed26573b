//! Fiscal years screen routes.
//!
//! Handlers never hold the view lock across a backend call: they copy the
//! current snapshot out, run the operation, then take the write lock only to
//! install the result.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use periodo_core::fiscal::{
    CreateFiscalYearForm, FiscalYearRecord, FiscalYearsViewModel, MonthlyPeriod, Outcome,
    PeriodAction, ProcessingKey, ViewSnapshot, YearAction,
};
use periodo_shared::AppError;
use periodo_shared::types::{FiscalYearId, MonthlyPeriodId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::AppState;
use crate::error::ApiResult;
use crate::middleware::AuthUser;

/// Creates the fiscal routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/fiscal-years", get(get_fiscal_years).post(create_fiscal_year))
        .route("/fiscal-years/reload", post(reload_fiscal_years))
        .route("/fiscal-years/{id}/close", post(close_fiscal_year))
        .route("/fiscal-years/{id}/reopen", post(reopen_fiscal_year))
        .route("/fiscal-years/{id}/active", post(toggle_fiscal_year_active))
        .route(
            "/fiscal-years/{id}/monthly-periods",
            post(initialize_monthly_periods),
        )
        .route("/fiscal-years/{id}/expansion", post(toggle_expansion))
        .route("/monthly-periods/{id}/close", post(close_monthly_period))
        .route("/monthly-periods/{id}/active", post(toggle_monthly_period_active))
}

/// Request body for confirmable operations.
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmRequest {
    /// Whether the user accepted the confirmation prompt.
    #[serde(default)]
    pub confirmed: bool,
}

/// Request body for activation toggles.
#[derive(Debug, Deserialize)]
pub struct ToggleActiveRequest {
    /// Target state.
    pub activate: bool,
    /// Whether the user accepted the confirmation prompt.
    #[serde(default)]
    pub confirmed: bool,
}

/// Request body for reopening a fiscal year.
#[derive(Debug, Deserialize)]
pub struct ReopenRequest {
    /// Justification, required.
    #[serde(default)]
    pub reason: String,
}

/// Monthly period as shown on the screen.
#[derive(Debug, Serialize)]
pub struct MonthlyPeriodResponse<'a> {
    /// The period record.
    #[serde(flatten)]
    pub period: &'a MonthlyPeriod,
    /// Journal entries recorded against the period.
    pub entry_count: u64,
    /// Whether the period covers today's month.
    pub is_current: bool,
    /// Whether an action on the period is in flight.
    pub is_processing: bool,
    /// Actions the period currently accepts.
    pub actions: Vec<PeriodAction>,
}

/// Fiscal year as shown on the screen.
#[derive(Debug, Serialize)]
pub struct FiscalYearResponse<'a> {
    /// The year record.
    #[serde(flatten)]
    pub record: &'a FiscalYearRecord,
    /// Whether the year owns any periods.
    pub has_monthly_periods: bool,
    /// Number of periods the year owns.
    pub monthly_periods_count: u32,
    /// Whether the year is expanded.
    pub is_expanded: bool,
    /// Whether an action on the year is in flight.
    pub is_processing: bool,
    /// Actions the year currently accepts.
    pub actions: Vec<YearAction>,
    /// Child periods, newest first.
    pub monthly_periods: Vec<MonthlyPeriodResponse<'a>>,
}

/// The whole fiscal years screen.
#[derive(Debug, Serialize)]
pub struct FiscalYearsResponse<'a> {
    /// Date the view was derived for.
    pub today: NaiveDate,
    /// Period covering today's month, if any.
    pub current_period_id: Option<MonthlyPeriodId>,
    /// Fiscal years, newest first.
    pub fiscal_years: Vec<FiscalYearResponse<'a>>,
}

fn render(view: &FiscalYearsViewModel, snapshot: &ViewSnapshot) -> serde_json::Value {
    let markers = view.markers();
    let fiscal_years = snapshot
        .fiscal_years
        .iter()
        .map(|year| FiscalYearResponse {
            record: &year.record,
            has_monthly_periods: year.has_monthly_periods,
            monthly_periods_count: year.monthly_periods_count,
            is_expanded: view.is_expanded(year.id()),
            is_processing: markers.is_processing(ProcessingKey::Year(year.id())),
            actions: snapshot.year_actions(year),
            monthly_periods: snapshot
                .periods_for_year(year.id())
                .map(|period| MonthlyPeriodResponse {
                    period,
                    entry_count: snapshot.stats.entry_count(period.id),
                    is_current: snapshot.current_period_id == Some(period.id),
                    is_processing: markers.is_processing(ProcessingKey::Period(period.id)),
                    actions: snapshot.period_actions(period),
                })
                .collect(),
        })
        .collect();

    json!(FiscalYearsResponse {
        today: snapshot.today,
        current_period_id: snapshot.current_period_id,
        fiscal_years,
    })
}

async fn current_view(state: &AppState) -> Response {
    let view = state.view.read().await;
    let snapshot = view.snapshot();
    (StatusCode::OK, Json(render(&view, &snapshot))).into_response()
}

/// Installs a finished outcome, or turns a pending confirmation into a 428.
async fn settle(state: &AppState, outcome: Outcome) -> Response {
    match outcome {
        Outcome::NeedsConfirmation(confirmation) => {
            let err = AppError::ConfirmationRequired(confirmation.prompt);
            (
                StatusCode::PRECONDITION_REQUIRED,
                Json(json!({
                    "error": err.error_code(),
                    "message": err.message(),
                    "operation": confirmation.operation,
                })),
            )
                .into_response()
        }
        Outcome::Completed { snapshot, expand } => {
            state.view.write().await.apply_mutation(snapshot, expand);
            current_view(state).await
        }
    }
}

/// Runs the first full reload if the view has never been loaded.
async fn ensure_loaded(state: &AppState) -> ApiResult<()> {
    let never_loaded = state.view.read().await.snapshot().is_empty();
    if never_loaded {
        let snapshot = state.manager.reload().await?;
        state.view.write().await.apply_reload(snapshot);
    }
    Ok(())
}

async fn snapshot_of(state: &AppState) -> ApiResult<Arc<ViewSnapshot>> {
    ensure_loaded(state).await?;
    Ok(state.view.read().await.snapshot())
}

/// GET `/fiscal-years` - The current screen, loading it on first use.
async fn get_fiscal_years(State(state): State<AppState>) -> ApiResult<Response> {
    ensure_loaded(&state).await?;
    Ok(current_view(&state).await)
}

/// POST `/fiscal-years/reload` - Full reload from the period service.
async fn reload_fiscal_years(State(state): State<AppState>) -> ApiResult<Response> {
    let snapshot = state.manager.reload().await?;
    state.view.write().await.apply_reload(snapshot);
    Ok(current_view(&state).await)
}

/// POST `/fiscal-years` - Create a fiscal year with its monthly periods.
async fn create_fiscal_year(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(form): Json<CreateFiscalYearForm>,
) -> ApiResult<Response> {
    let snapshot = state
        .manager
        .create_fiscal_year(Some(auth.user_id()), &form)
        .await?;
    info!(
        user_id = %auth.user_id(),
        email = auth.email().unwrap_or("-"),
        name = %form.name,
        "Fiscal year created via API"
    );
    state.view.write().await.apply_reload(snapshot);

    let view = state.view.read().await;
    let snapshot = view.snapshot();
    Ok((StatusCode::CREATED, Json(render(&view, &snapshot))).into_response())
}

/// POST `/fiscal-years/{id}/close` - Close a year and its open periods.
async fn close_fiscal_year(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<FiscalYearId>,
    Json(body): Json<ConfirmRequest>,
) -> ApiResult<Response> {
    let guard = state.view.read().await.markers().try_acquire(ProcessingKey::Year(id))?;
    let snapshot = snapshot_of(&state).await?;
    let outcome = state
        .manager
        .close_fiscal_year(&snapshot, Some(auth.user_id()), id, body.confirmed)
        .await?;
    drop(guard);
    Ok(settle(&state, outcome).await)
}

/// POST `/fiscal-years/{id}/reopen` - Reopen a closed year with a reason.
async fn reopen_fiscal_year(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<FiscalYearId>,
    Json(body): Json<ReopenRequest>,
) -> ApiResult<Response> {
    let guard = state.view.read().await.markers().try_acquire(ProcessingKey::Year(id))?;
    let snapshot = snapshot_of(&state).await?;
    let snapshot = state
        .manager
        .reopen_fiscal_year(&snapshot, Some(auth.user_id()), id, &body.reason)
        .await?;
    drop(guard);
    state.view.write().await.apply_reload(snapshot);
    Ok(current_view(&state).await)
}

/// POST `/fiscal-years/{id}/active` - Activate or deactivate a year.
async fn toggle_fiscal_year_active(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<FiscalYearId>,
    Json(body): Json<ToggleActiveRequest>,
) -> ApiResult<Response> {
    let guard = state.view.read().await.markers().try_acquire(ProcessingKey::Year(id))?;
    let snapshot = snapshot_of(&state).await?;
    let outcome = state
        .manager
        .toggle_fiscal_year_active(
            &snapshot,
            Some(auth.user_id()),
            id,
            body.activate,
            body.confirmed,
        )
        .await?;
    drop(guard);
    Ok(settle(&state, outcome).await)
}

/// POST `/fiscal-years/{id}/monthly-periods` - Generate a year's periods.
async fn initialize_monthly_periods(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<FiscalYearId>,
    Json(body): Json<ConfirmRequest>,
) -> ApiResult<Response> {
    let guard = state.view.read().await.markers().try_acquire(ProcessingKey::Year(id))?;
    let snapshot = snapshot_of(&state).await?;
    let outcome = state
        .manager
        .initialize_monthly_periods(&snapshot, Some(auth.user_id()), id, body.confirmed)
        .await?;
    drop(guard);
    Ok(settle(&state, outcome).await)
}

/// POST `/fiscal-years/{id}/expansion` - Expand or collapse a year.
async fn toggle_expansion(
    State(state): State<AppState>,
    Path(id): Path<FiscalYearId>,
) -> ApiResult<Response> {
    ensure_loaded(&state).await?;
    let expanded = state.view.write().await.toggle_expansion(id)?;
    info!(fiscal_year_id = %id, expanded, "Fiscal year expansion toggled");
    Ok((
        StatusCode::OK,
        Json(json!({ "fiscal_year_id": id, "expanded": expanded })),
    )
        .into_response())
}

/// POST `/monthly-periods/{id}/close` - Close a period for good.
async fn close_monthly_period(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<MonthlyPeriodId>,
    Json(body): Json<ConfirmRequest>,
) -> ApiResult<Response> {
    let guard = state.view.read().await.markers().try_acquire(ProcessingKey::Period(id))?;
    let snapshot = snapshot_of(&state).await?;
    let outcome = state
        .manager
        .close_monthly_period(&snapshot, Some(auth.user_id()), id, body.confirmed)
        .await?;
    drop(guard);
    Ok(settle(&state, outcome).await)
}

/// POST `/monthly-periods/{id}/active` - Activate or deactivate a period.
async fn toggle_monthly_period_active(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<MonthlyPeriodId>,
    Json(body): Json<ToggleActiveRequest>,
) -> ApiResult<Response> {
    let guard = state.view.read().await.markers().try_acquire(ProcessingKey::Period(id))?;
    let snapshot = snapshot_of(&state).await?;
    let outcome = state
        .manager
        .toggle_monthly_period_active(
            &snapshot,
            Some(auth.user_id()),
            id,
            body.activate,
            body.confirmed,
        )
        .await?;
    drop(guard);
    Ok(settle(&state, outcome).await)
}
