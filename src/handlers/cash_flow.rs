// src/handlers/cash_flow.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::TenantContext},
    models::finance::{CashFlow, CashFlowSummary, CloseCashFlowData},
};

// ---
// Validações customizadas
// ---
fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

fn validate_positive(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() || val.is_zero() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor deve ser maior que zero.".into());
        return Err(err);
    }
    Ok(())
}

// ---
// Payload: OpenCashFlow
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenCashFlowPayload {
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,

    #[validate(custom(function = "validate_not_negative"))]
    pub opening_balance: Decimal,
}

// ---
// Handler: open_cash_flow
// ---
#[utoipa::path(
    post,
    path = "/api/financial/cash-flow/open",
    tag = "Caixa",
    request_body = OpenCashFlowPayload,
    responses(
        (status = 201, description = "Caixa do dia aberto", body = CashFlow),
        (status = 409, description = "Já existe caixa para esta data")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    security(("api_jwt" = []))
)]
pub async fn open_cash_flow(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<OpenCashFlowPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let cash_flow = app_state
        .cash_flow_service
        .open(
            &mut *rls_conn,
            tenant.0,
            payload.date,
            payload.opening_balance,
            user.0.id,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(cash_flow)))
}

// ---
// Payload: Recompute
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeCashFlowPayload {
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
}

// ---
// Handler: recompute_cash_flow
// ---
#[utoipa::path(
    post,
    path = "/api/financial/cash-flow/recompute",
    tag = "Caixa",
    request_body = RecomputeCashFlowPayload,
    responses(
        (status = 200, description = "Totais do dia recalculados", body = CashFlow),
        (status = 404, description = "Caixa não encontrado para a data"),
        (status = 422, description = "Caixa já fechado")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    security(("api_jwt" = []))
)]
pub async fn recompute_cash_flow(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<RecomputeCashFlowPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let cash_flow = app_state
        .cash_flow_service
        .recompute_from_transactions(&mut *rls_conn, tenant.0, payload.date)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(cash_flow)))
}

// ---
// Payload: Sangria / Reforço
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CashAdjustmentPayload {
    #[validate(custom(function = "validate_positive"))]
    pub amount: Decimal,
    pub notes: Option<String>,
}

// ---
// Handler: record_withdrawal (Sangria)
// ---
#[utoipa::path(
    post,
    path = "/api/financial/cash-flow/{id}/withdrawal",
    tag = "Caixa",
    request_body = CashAdjustmentPayload,
    responses(
        (status = 200, description = "Sangria registrada e totais recalculados", body = CashFlow),
        (status = 422, description = "Caixa já fechado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Caixa"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    security(("api_jwt" = []))
)]
pub async fn record_withdrawal(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<CashAdjustmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let cash_flow = app_state
        .cash_flow_service
        .record_withdrawal(
            &mut *rls_conn,
            tenant.0,
            id,
            user.0.id,
            payload.amount,
            payload.notes.as_deref(),
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(cash_flow)))
}

// ---
// Handler: record_deposit (Reforço)
// ---
#[utoipa::path(
    post,
    path = "/api/financial/cash-flow/{id}/deposit",
    tag = "Caixa",
    request_body = CashAdjustmentPayload,
    responses(
        (status = 200, description = "Reforço registrado e totais recalculados", body = CashFlow),
        (status = 422, description = "Caixa já fechado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Caixa"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    security(("api_jwt" = []))
)]
pub async fn record_deposit(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<CashAdjustmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let cash_flow = app_state
        .cash_flow_service
        .record_deposit(
            &mut *rls_conn,
            tenant.0,
            id,
            user.0.id,
            payload.amount,
            payload.notes.as_deref(),
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(cash_flow)))
}

// ---
// Payload: CloseCashFlow (conferência manual da gaveta)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloseCashFlowPayload {
    #[validate(custom(function = "validate_not_negative"))]
    pub closing_balance: Decimal,

    #[validate(custom(function = "validate_not_negative"))]
    pub cash_amount: Decimal,
    #[validate(custom(function = "validate_not_negative"))]
    pub pix_amount: Decimal,
    #[validate(custom(function = "validate_not_negative"))]
    pub credit_card_amount: Decimal,
    #[validate(custom(function = "validate_not_negative"))]
    pub debit_card_amount: Decimal,
    #[validate(custom(function = "validate_not_negative"))]
    pub transfer_amount: Decimal,
    #[validate(custom(function = "validate_not_negative"))]
    pub other_amount: Decimal,

    #[validate(custom(function = "validate_not_negative"))]
    pub withdrawals: Option<Decimal>,
    #[validate(custom(function = "validate_not_negative"))]
    pub deposits: Option<Decimal>,

    pub notes: Option<String>,
}

// ---
// Handler: close_cash_flow
// ---
#[utoipa::path(
    post,
    path = "/api/financial/cash-flow/{id}/close",
    tag = "Caixa",
    request_body = CloseCashFlowPayload,
    responses(
        (status = 200, description = "Caixa fechado com os valores informados", body = CashFlow),
        (status = 422, description = "Caixa já fechado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Caixa"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    security(("api_jwt" = []))
)]
pub async fn close_cash_flow(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<CloseCashFlowPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let data = CloseCashFlowData {
        closing_balance: payload.closing_balance,
        cash_amount: payload.cash_amount,
        pix_amount: payload.pix_amount,
        credit_card_amount: payload.credit_card_amount,
        debit_card_amount: payload.debit_card_amount,
        transfer_amount: payload.transfer_amount,
        other_amount: payload.other_amount,
        withdrawals: payload.withdrawals,
        deposits: payload.deposits,
        notes: payload.notes,
    };

    let cash_flow = app_state
        .cash_flow_service
        .close(&mut *rls_conn, tenant.0, id, &data, user.0.id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(cash_flow)))
}

// ---
// Query: resumo mensal
// ---
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MonthQuery {
    pub month: u32,
    pub year: i32,
}

// ---
// Handler: cash_flow_summary
// ---
#[utoipa::path(
    get,
    path = "/api/financial/cash-flow/summary",
    tag = "Caixa",
    responses(
        (status = 200, description = "Consolidado mensal dos caixas diários", body = CashFlowSummary)
    ),
    params(
        MonthQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    security(("api_jwt" = []))
)]
pub async fn cash_flow_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Query(query): Query<MonthQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let summary = app_state
        .cash_flow_service
        .summary(&mut *rls_conn, tenant.0, query.month, query.year)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(summary)))
}
