// src/handlers/tenancy.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::tenancy::Tenant,
};

// ---
// 1. "Payload" (O "Formulário" da API)
// ---
// O que o cliente precisa enviar para criar uma clínica
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTenantPayload {
    #[validate(length(min = 1, message = "O nome da clínica é obrigatório."))]
    pub name: String,
    pub description: Option<String>,
}

// ---
// 2. O "Handler" (A Rota)
// ---
#[utoipa::path(
    post,
    path = "/api/tenants",
    tag = "Tenancy",
    request_body = CreateTenantPayload,
    responses(
        (status = 201, description = "Clínica criada com o usuário como dono", body = Tenant)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_tenant(
    State(app_state): State<AppState>,
    locale: Locale,
    // Precisamos do usuário autenticado para torná-lo "dono"
    user: AuthenticatedUser,
    Json(payload): Json<CreateTenantPayload>,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Validar o payload
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    // 2. Chamar o Serviço (criar a clínica E vincular o usuário é transacional)
    let new_tenant = app_state
        .tenant_service
        .create_tenant_with_owner(&payload.name, payload.description.as_deref(), user.0.id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    // 3. Responder com Sucesso
    Ok((StatusCode::CREATED, Json(new_tenant)))
}

#[utoipa::path(
    get,
    path = "/api/tenants",
    tag = "Tenancy",
    responses(
        (status = 200, description = "Clínicas do usuário autenticado", body = Vec<Tenant>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_my_tenants(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let tenants = app_state
        .tenant_service
        .list_user_tenants(user.0.id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(tenants)))
}
