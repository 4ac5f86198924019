// src/common/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde_json::json;
use std::collections::HashMap;
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;

// Nosso tipo de erro de negócio, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // --- Autenticação / Tenancy ---
    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Usuário não tem acesso a esta clínica")]
    TenantAccessDenied,

    // --- Núcleo financeiro ---
    #[error("Transação não encontrada")]
    TransactionNotFound,

    #[error("Caixa não encontrado")]
    CashFlowNotFound,

    #[error("Já existe um caixa para a data {0}")]
    CashFlowAlreadyExists(NaiveDate),

    #[error("O caixa deste dia já foi fechado")]
    CashFlowAlreadyClosed,

    #[error("Transição de status inválida: {0}")]
    InvalidStatusTransition(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Converte o erro de negócio na resposta HTTP localizada.
    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        match self {
            AppError::ValidationError(errors) => {
                let mut details = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                ApiError {
                    status: StatusCode::BAD_REQUEST,
                    message: store.translate(&locale.0, "validation"),
                    details: Some(details),
                }
            }
            AppError::EmailAlreadyExists => {
                ApiError::simple(StatusCode::CONFLICT, store.translate(&locale.0, "email_exists"))
            }
            AppError::InvalidCredentials => ApiError::simple(
                StatusCode::UNAUTHORIZED,
                store.translate(&locale.0, "invalid_credentials"),
            ),
            AppError::InvalidToken => ApiError::simple(
                StatusCode::UNAUTHORIZED,
                store.translate(&locale.0, "invalid_token"),
            ),
            AppError::UserNotFound => ApiError::simple(
                StatusCode::NOT_FOUND,
                store.translate(&locale.0, "user_not_found"),
            ),
            AppError::TenantAccessDenied => ApiError::simple(
                StatusCode::FORBIDDEN,
                store.translate(&locale.0, "tenant_access_denied"),
            ),
            AppError::TransactionNotFound => ApiError::simple(
                StatusCode::NOT_FOUND,
                store.translate(&locale.0, "transaction_not_found"),
            ),
            AppError::CashFlowNotFound => ApiError::simple(
                StatusCode::NOT_FOUND,
                store.translate(&locale.0, "cash_flow_not_found"),
            ),
            AppError::CashFlowAlreadyExists(date) => ApiError::simple(
                StatusCode::CONFLICT,
                store
                    .translate(&locale.0, "cash_flow_exists")
                    .replace("{date}", &date.to_string()),
            ),
            AppError::CashFlowAlreadyClosed => ApiError::simple(
                StatusCode::UNPROCESSABLE_ENTITY,
                store.translate(&locale.0, "cash_flow_closed"),
            ),
            AppError::InvalidStatusTransition(detail) => ApiError::simple(
                StatusCode::UNPROCESSABLE_ENTITY,
                store
                    .translate(&locale.0, "invalid_transition")
                    .replace("{detail}", detail),
            ),
            // Todos os outros (DatabaseError, InternalServerError...) viram 500.
            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                ApiError::simple(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    store.translate(&locale.0, "internal"),
                )
            }
        }
    }
}

// Resposta de erro que o middleware pode devolver diretamente
// (rejeições de extractors não passam pelo to_api_error).
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let store = I18nStore::new();
        let locale = Locale("pt".to_string());
        self.to_api_error(&locale, &store).into_response()
    }
}

// ---
// ApiError: o formato HTTP final (status + mensagem já traduzida)
// ---
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<HashMap<String, Vec<String>>>,
}

impl ApiError {
    pub fn simple(status: StatusCode, message: String) -> Self {
        Self {
            status,
            message,
            details: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => Json(json!({ "error": self.message, "details": details })),
            None => Json(json!({ "error": self.message })),
        };
        (self.status, body).into_response()
    }
}
