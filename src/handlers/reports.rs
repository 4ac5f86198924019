// src/handlers/reports.rs

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::ApiError,
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::TenantContext},
    models::finance::{FinancialStats, MonthlySummary, OpenAccountsReport, OverdueReport},
};

// GET /api/financial/reports/stats
#[utoipa::path(
    get,
    path = "/api/financial/reports/stats",
    tag = "Relatórios",
    responses(
        (status = 200, description = "Totais por status e natureza", body = FinancialStats)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    security(("api_jwt" = []))
)]
pub async fn financial_stats(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let stats = app_state
        .report_service
        .stats(&mut *rls_conn, tenant.0)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(stats)))
}

// GET /api/financial/reports/receivable
#[utoipa::path(
    get,
    path = "/api/financial/reports/receivable",
    tag = "Relatórios",
    responses(
        (status = 200, description = "Contas a receber em aberto", body = OpenAccountsReport)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    security(("api_jwt" = []))
)]
pub async fn accounts_receivable(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let report = app_state
        .report_service
        .accounts_receivable(&mut *rls_conn, tenant.0)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}

// GET /api/financial/reports/payable
#[utoipa::path(
    get,
    path = "/api/financial/reports/payable",
    tag = "Relatórios",
    responses(
        (status = 200, description = "Contas a pagar em aberto", body = OpenAccountsReport)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    security(("api_jwt" = []))
)]
pub async fn accounts_payable(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let report = app_state
        .report_service
        .accounts_payable(&mut *rls_conn, tenant.0)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}

// GET /api/financial/reports/overdue
#[utoipa::path(
    get,
    path = "/api/financial/reports/overdue",
    tag = "Relatórios",
    responses(
        (status = 200, description = "Pendências vencidas, separadas por natureza", body = OverdueReport)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    security(("api_jwt" = []))
)]
pub async fn overdue_report(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let today = Utc::now().date_naive();
    let report = app_state
        .report_service
        .overdue(&mut *rls_conn, tenant.0, today)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}

// ---
// Query: mês de referência
// ---
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MonthlyReportQuery {
    pub month: u32,
    pub year: i32,
}

// GET /api/financial/reports/monthly
#[utoipa::path(
    get,
    path = "/api/financial/reports/monthly",
    tag = "Relatórios",
    responses(
        (status = 200, description = "Receitas e despesas confirmadas no mês", body = MonthlySummary)
    ),
    params(
        MonthlyReportQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    security(("api_jwt" = []))
)]
pub async fn monthly_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Query(query): Query<MonthlyReportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let report = app_state
        .report_service
        .monthly_summary(&mut *rls_conn, tenant.0, query.month, query.year)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}
