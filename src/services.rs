pub mod auth;
pub mod cash_flow_service;
pub mod installment_service;
pub mod report_service;
pub mod tenancy_service;
pub mod transaction_service;
