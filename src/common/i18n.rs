// src/common/i18n.rs

use std::collections::HashMap;

// Mensagens de erro da API em pt/en.
// O idioma vem do cabeçalho Accept-Language (extractor Locale).
#[derive(Clone)]
pub struct I18nStore {
    messages: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

const DEFAULT_LOCALE: &str = "pt";

impl I18nStore {
    pub fn new() -> Self {
        let mut pt = HashMap::new();
        pt.insert("validation", "Um ou mais campos são inválidos.");
        pt.insert("email_exists", "Este e-mail já está em uso.");
        pt.insert("invalid_credentials", "E-mail ou senha inválidos.");
        pt.insert("invalid_token", "Token de autenticação inválido ou ausente.");
        pt.insert("user_not_found", "Usuário não encontrado.");
        pt.insert("tenant_access_denied", "Você não tem acesso a esta clínica.");
        pt.insert("transaction_not_found", "Transação não encontrada.");
        pt.insert("cash_flow_not_found", "Caixa não encontrado para esta data.");
        pt.insert("cash_flow_exists", "Já existe um caixa aberto para a data {date}.");
        pt.insert("cash_flow_closed", "O caixa deste dia já foi fechado e não aceita alterações.");
        pt.insert("invalid_transition", "Operação não permitida: {detail}");
        pt.insert("internal", "Ocorreu um erro inesperado.");

        let mut en = HashMap::new();
        en.insert("validation", "One or more fields are invalid.");
        en.insert("email_exists", "This e-mail is already in use.");
        en.insert("invalid_credentials", "Invalid e-mail or password.");
        en.insert("invalid_token", "Missing or invalid authentication token.");
        en.insert("user_not_found", "User not found.");
        en.insert("tenant_access_denied", "You do not have access to this clinic.");
        en.insert("transaction_not_found", "Transaction not found.");
        en.insert("cash_flow_not_found", "No cash flow record for this date.");
        en.insert("cash_flow_exists", "A cash flow record already exists for {date}.");
        en.insert("cash_flow_closed", "This day's cash flow is already closed.");
        en.insert("invalid_transition", "Operation not allowed: {detail}");
        en.insert("internal", "An unexpected error occurred.");

        let mut messages = HashMap::new();
        messages.insert("pt", pt);
        messages.insert("en", en);

        Self { messages }
    }

    /// Busca a mensagem no idioma pedido, caindo para pt quando não houver.
    pub fn translate(&self, locale: &str, key: &str) -> String {
        self.messages
            .get(locale)
            .and_then(|m| m.get(key))
            .or_else(|| self.messages.get(DEFAULT_LOCALE).and_then(|m| m.get(key)))
            .map(|s| s.to_string())
            .unwrap_or_else(|| key.to_string())
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}
