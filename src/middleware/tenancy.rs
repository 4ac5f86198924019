// src/middleware/tenancy.rs

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use uuid::Uuid;

use crate::common::error::ApiError;

// O nome do nosso cabeçalho HTTP customizado
const TENANT_ID_HEADER: &str = "x-tenant-id";

// O extrator de tenant.
// Armazena o UUID da clínica que o usuário quer acessar.
// A verificação de que o usuário pertence a ela é do tenant_guard.
#[derive(Debug, Clone)]
pub struct TenantContext(pub Uuid);

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    // Usamos ApiError como rejeição, pois ele já implementa IntoResponse
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts.headers.get(TENANT_ID_HEADER);

        match header_value {
            Some(value) => {
                let value_str = value.to_str().map_err(|_| {
                    ApiError::simple(
                        StatusCode::BAD_REQUEST,
                        "Cabeçalho X-Tenant-ID contém caracteres inválidos.".to_string(),
                    )
                })?;

                let tenant_id = Uuid::parse_str(value_str).map_err(|_| {
                    ApiError::simple(
                        StatusCode::BAD_REQUEST,
                        "Cabeçalho X-Tenant-ID inválido (não é um UUID).".to_string(),
                    )
                })?;

                Ok(TenantContext(tenant_id))
            }
            None => Err(ApiError::simple(
                StatusCode::BAD_REQUEST,
                "O cabeçalho X-Tenant-ID é obrigatório.".to_string(),
            )),
        }
    }
}
