// src/handlers/transactions.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::TenantContext},
    models::finance::{
        NewInstallmentPlan, NewTransaction, PaymentMethod, Transaction, TransactionFilter,
        TransactionKind, TransactionStatus, UpdateTransactionData,
    },
};

// ---
// Validações customizadas
// ---
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
// Payload: CreateTransaction
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionPayload {
    pub kind: TransactionKind,

    #[validate(length(min = 1, message = "A categoria é obrigatória."))]
    pub category: String,

    // Quando ausente, a transação nasce PENDENTE
    pub status: Option<TransactionStatus>,

    #[validate(custom(function = "validate_positive"))]
    pub amount: Decimal,

    pub payment_method: Option<PaymentMethod>,

    #[schema(value_type = String, format = Date)]
    pub due_date: NaiveDate,

    pub payment_date: Option<DateTime<Utc>>,

    #[validate(length(min = 1, message = "A descrição é obrigatória."))]
    pub description: String,

    pub notes: Option<String>,

    pub lead_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub procedure_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
}

// ---
// Handler: create_transaction
// ---
#[utoipa::path(
    post,
    path = "/api/financial/transactions",
    tag = "Financeiro",
    request_body = CreateTransactionPayload,
    responses(
        (status = 201, description = "Transação criada", body = Transaction),
        (status = 400, description = "Payload inválido")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_transaction(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CreateTransactionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let data = NewTransaction {
        kind: payload.kind,
        category: payload.category,
        status: payload.status,
        amount: payload.amount,
        payment_method: payload.payment_method,
        due_date: payload.due_date,
        payment_date: payload.payment_date,
        description: payload.description,
        notes: payload.notes,
        is_installment: false,
        installment_number: None,
        total_installments: None,
        parent_transaction_id: None,
        lead_id: payload.lead_id,
        appointment_id: payload.appointment_id,
        procedure_id: payload.procedure_id,
        supplier_id: payload.supplier_id,
    };

    let transaction = app_state
        .transaction_service
        .create(&mut *rls_conn, tenant.0, &data)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

// ---
// Handler: list_transactions (a primitiva de consulta exposta)
// ---
#[utoipa::path(
    get,
    path = "/api/financial/transactions",
    tag = "Financeiro",
    responses(
        (status = 200, description = "Transações filtradas, vencimento decrescente", body = Vec<Transaction>)
    ),
    params(
        TransactionFilter,
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_transactions(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Query(filter): Query<TransactionFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let transactions = app_state
        .transaction_service
        .query(&mut *rls_conn, tenant.0, &filter)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(transactions)))
}

// ---
// Handler: get_transaction
// ---
#[utoipa::path(
    get,
    path = "/api/financial/transactions/{id}",
    tag = "Financeiro",
    responses(
        (status = 200, description = "Transação encontrada", body = Transaction),
        (status = 404, description = "Transação não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da Transação"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_transaction(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let transaction = app_state
        .transaction_service
        .get(&mut *rls_conn, id, tenant.0)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(transaction)))
}

// ---
// Payload: UpdateTransaction (patch parcial)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTransactionPayload {
    pub kind: Option<TransactionKind>,

    #[validate(length(min = 1, message = "A categoria não pode ficar vazia."))]
    pub category: Option<String>,

    pub status: Option<TransactionStatus>,

    #[validate(custom(function = "validate_positive"))]
    pub amount: Option<Decimal>,

    pub payment_method: Option<PaymentMethod>,

    #[schema(value_type = Option<String>, format = Date)]
    pub due_date: Option<NaiveDate>,

    #[validate(length(min = 1, message = "A descrição não pode ficar vazia."))]
    pub description: Option<String>,
}

// ---
// Handler: update_transaction
// ---
#[utoipa::path(
    patch,
    path = "/api/financial/transactions/{id}",
    tag = "Financeiro",
    request_body = UpdateTransactionPayload,
    responses(
        (status = 200, description = "Transação atualizada", body = Transaction),
        (status = 422, description = "Transação confirmada é imutável (exceto estorno)")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da Transação"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_transaction(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTransactionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let patch = UpdateTransactionData {
        kind: payload.kind,
        category: payload.category,
        status: payload.status,
        amount: payload.amount,
        payment_method: payload.payment_method,
        due_date: payload.due_date,
        description: payload.description,
    };

    let transaction = app_state
        .transaction_service
        .update(&mut *rls_conn, id, tenant.0, &patch)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(transaction)))
}

// ---
// Payload: ConfirmTransaction
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmTransactionPayload {
    pub payment_date: DateTime<Utc>,
    // Quando ausente, mantém a forma de pagamento já cadastrada
    pub payment_method: Option<PaymentMethod>,
}

// ---
// Handler: confirm_transaction
// ---
#[utoipa::path(
    post,
    path = "/api/financial/transactions/{id}/confirm",
    tag = "Financeiro",
    request_body = ConfirmTransactionPayload,
    responses(
        (status = 200, description = "Transação confirmada", body = Transaction),
        (status = 422, description = "Status atual não permite confirmação")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da Transação"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    security(("api_jwt" = []))
)]
pub async fn confirm_transaction(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmTransactionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    // O usuário autenticado é quem aprova
    let transaction = app_state
        .transaction_service
        .confirm(
            &mut *rls_conn,
            id,
            tenant.0,
            payload.payment_date,
            payload.payment_method,
            user.0.id,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(transaction)))
}

// ---
// Payload: CancelTransaction
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelTransactionPayload {
    pub reason: Option<String>,
}

// ---
// Handler: cancel_transaction
// ---
#[utoipa::path(
    post,
    path = "/api/financial/transactions/{id}/cancel",
    tag = "Financeiro",
    request_body = CancelTransactionPayload,
    responses(
        (status = 200, description = "Transação cancelada", body = Transaction),
        (status = 422, description = "Transação confirmada deve ser estornada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da Transação"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_transaction(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelTransactionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let transaction = app_state
        .transaction_service
        .cancel(
            &mut *rls_conn,
            id,
            tenant.0,
            user.0.id,
            payload.reason.as_deref(),
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(transaction)))
}

// ---
// Payload: ReverseTransaction (motivo obrigatório, diferente do cancelamento)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReverseTransactionPayload {
    #[validate(length(min = 1, message = "O motivo do estorno é obrigatório."))]
    pub reason: String,
}

// ---
// Handler: reverse_transaction
// ---
#[utoipa::path(
    post,
    path = "/api/financial/transactions/{id}/reverse",
    tag = "Financeiro",
    request_body = ReverseTransactionPayload,
    responses(
        (status = 200, description = "Transação estornada", body = Transaction),
        (status = 422, description = "Apenas transações confirmadas podem ser estornadas")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da Transação"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    security(("api_jwt" = []))
)]
pub async fn reverse_transaction(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReverseTransactionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let transaction = app_state
        .transaction_service
        .reverse(&mut *rls_conn, id, tenant.0, user.0.id, &payload.reason)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(transaction)))
}

// ---
// Handler: delete_transaction (exclusão lógica)
// ---
#[utoipa::path(
    delete,
    path = "/api/financial/transactions/{id}",
    tag = "Financeiro",
    responses(
        (status = 200, description = "Transação marcada como cancelada", body = Transaction),
        (status = 422, description = "Transação confirmada não pode ser excluída")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da Transação"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_transaction(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let transaction = app_state
        .transaction_service
        .soft_delete(&mut *rls_conn, id, tenant.0)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(transaction)))
}

// ---
// Payload: CreateInstallmentPlan (parcelamento)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstallmentPlanPayload {
    pub kind: TransactionKind,

    #[validate(length(min = 1, message = "A categoria é obrigatória."))]
    pub category: String,

    #[validate(custom(function = "validate_positive"))]
    pub total_amount: Decimal,

    #[validate(range(min = 1, max = 120, message = "O número de parcelas deve ficar entre 1 e 120."))]
    pub total_installments: u32,

    #[schema(value_type = String, format = Date)]
    pub first_due_date: NaiveDate,

    #[validate(length(min = 1, message = "A descrição é obrigatória."))]
    pub description: String,

    pub payment_method: Option<PaymentMethod>,

    pub lead_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub procedure_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
}

// ---
// Handler: create_installments
// ---
#[utoipa::path(
    post,
    path = "/api/financial/transactions/installments",
    tag = "Financeiro",
    request_body = CreateInstallmentPlanPayload,
    responses(
        (status = 201, description = "Parcelas criadas (a transação agregada fica fora da lista)", body = Vec<Transaction>),
        (status = 400, description = "Payload inválido")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_installments(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CreateInstallmentPlanPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let plan = NewInstallmentPlan {
        kind: payload.kind,
        category: payload.category,
        total_amount: payload.total_amount,
        total_installments: payload.total_installments,
        first_due_date: payload.first_due_date,
        description: payload.description,
        payment_method: payload.payment_method,
        lead_id: payload.lead_id,
        appointment_id: payload.appointment_id,
        procedure_id: payload.procedure_id,
        supplier_id: payload.supplier_id,
    };

    let installments = app_state
        .installment_service
        .plan(&mut *rls_conn, tenant.0, &plan)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(installments)))
}
