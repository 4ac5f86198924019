// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::tenancy::TenantContext,
    models::auth::User,
};

fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::InvalidToken)
}

// Guarda de autenticação: valida o token e injeta o usuário na requisição
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;
    let user = app_state.auth_service.validate_token(token).await?;

    // Insere o usuário nos "extensions" da requisição
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

// Guarda de tenancy: autentica E confere que o usuário pertence à clínica
// do cabeçalho X-Tenant-ID antes de liberar qualquer rota financeira.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;
    let user = app_state.auth_service.validate_token(token).await?;

    let is_member = app_state
        .tenant_service
        .check_user_tenancy(user.id, tenant.0)
        .await?;

    if !is_member {
        return Err(AppError::TenantAccessDenied);
    }

    request.extensions_mut().insert(user);
    request.extensions_mut().insert(tenant);
    Ok(next.run(request).await)
}

// Extrator para obter o usuário autenticado diretamente nos handlers
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .map(AuthenticatedUser)
            .ok_or(AppError::InvalidToken)
    }
}
