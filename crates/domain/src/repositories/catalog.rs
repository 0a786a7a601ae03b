use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::entities::billing_params::{BaseCosts, BillingParamsEntity};
use crate::entities::service_plans::ServicePlanEntity;

/// Read-only catalog data: the plan table, the global rate card and the
/// payment-gateway configuration.
#[async_trait]
#[automock]
pub trait BillingCatalogRepository {
    async fn list_service_plans(&self) -> Result<Vec<ServicePlanEntity>>;

    async fn base_costs(&self) -> Result<BaseCosts>;

    async fn billing_params(&self) -> Result<BillingParamsEntity>;
}
