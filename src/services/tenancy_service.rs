// src/services/tenancy_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::TenantRepository,
    models::tenancy::Tenant,
};

#[derive(Clone)]
pub struct TenantService {
    tenant_repo: TenantRepository,
    pool: PgPool, // Usamos a pool para iniciar transações
}

impl TenantService {
    pub fn new(tenant_repo: TenantRepository, pool: PgPool) -> Self {
        Self { tenant_repo, pool }
    }

    /// Cria uma nova Clínica e, atomicamente, vincula o usuário que a
    /// criou como o seu primeiro membro (dono).
    pub async fn create_tenant_with_owner(
        &self,
        name: &str,
        description: Option<&str>,
        owner_id: Uuid,
    ) -> Result<Tenant, AppError> {
        // 1. Inicia a transação
        let mut tx = self.pool.begin().await?;

        // 2. Cria a Clínica (Tenant)
        let new_tenant = self
            .tenant_repo
            .create_tenant(&mut *tx, name, description)
            .await?;

        // 3. Vincula o usuário criador
        self.tenant_repo
            .assign_user_to_tenant(&mut *tx, owner_id, new_tenant.id)
            .await?;

        // 4. Commit
        tx.commit().await?;

        Ok(new_tenant)
    }

    pub async fn list_user_tenants(&self, user_id: Uuid) -> Result<Vec<Tenant>, AppError> {
        self.tenant_repo.get_tenants_for_user(user_id).await
    }

    pub async fn check_user_tenancy(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<bool, AppError> {
        self.tenant_repo.check_user_tenancy(user_id, tenant_id).await
    }
}
