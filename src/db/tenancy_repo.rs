// src/db/tenancy_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::tenancy::{Tenant, UserTenant};

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Verifica se um usuário tem permissão para acessar uma clínica.
    /// Esta é a verificação de autorização mais importante do sistema.
    pub async fn check_user_tenancy(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<bool, AppError> {
        // SELECT EXISTS para a consulta mais rápida possível.
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_tenants
                WHERE user_id = $1 AND tenant_id = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Cria uma nova clínica (Tenant) na base de dados.
    pub async fn create_tenant<'e, E>(
        &self,
        executor: E, // Aceita um executor (pool ou transação)
        name: &str,
        description: Option<&str>,
    ) -> Result<Tenant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tenant = sqlx::query_as::<_, Tenant>(
            "INSERT INTO tenants (name, description) VALUES ($1, $2) RETURNING *",
        )
        .bind(name)
        .bind(description)
        .fetch_one(executor)
        .await?;

        Ok(tenant)
    }

    /// Atribui um usuário a uma clínica (na tabela-ponte).
    pub async fn assign_user_to_tenant<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<UserTenant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let link = sqlx::query_as::<_, UserTenant>(
            "INSERT INTO user_tenants (user_id, tenant_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_one(executor)
        .await?;

        Ok(link)
    }

    /// Lista as clínicas às quais o usuário pertence.
    pub async fn get_tenants_for_user(&self, user_id: Uuid) -> Result<Vec<Tenant>, AppError> {
        let tenants = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT t.* FROM tenants t
            JOIN user_tenants ut ON ut.tenant_id = t.id
            WHERE ut.user_id = $1
            ORDER BY t.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tenants)
    }
}
