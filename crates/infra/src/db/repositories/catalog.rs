use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, prelude::*};
use std::sync::Arc;

use crate::db::postgres_connection::PgPoolSquad;
use domain::{
    entities::{
        billing_params::{BaseCosts, BillingParamsEntity},
        service_plans::ServicePlanEntity,
    },
    repositories::catalog::BillingCatalogRepository,
    schema::{api_credentials, customizations, service_plans},
};

pub struct BillingCatalogPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl BillingCatalogPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl BillingCatalogRepository for BillingCatalogPostgres {
    async fn list_service_plans(&self) -> Result<Vec<ServicePlanEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let plans = service_plans::table
            .select(ServicePlanEntity::as_select())
            .load::<ServicePlanEntity>(&mut conn)?;

        Ok(plans)
    }

    async fn base_costs(&self) -> Result<BaseCosts> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let (recordings_cents_per_byte, fax_cents_per_unit) = customizations::table
            .select((
                customizations::recordings_cents_per_byte,
                customizations::fax_cents_per_unit,
            ))
            .first::<(f64, f64)>(&mut conn)?;

        Ok(BaseCosts {
            recordings_cents_per_byte,
            fax_cents_per_unit,
        })
    }

    async fn billing_params(&self) -> Result<BillingParamsEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let (provider, retry_attempts) = customizations::table
            .select((
                customizations::payment_gateway,
                customizations::billing_retry_attempts,
            ))
            .first::<(String, i32)>(&mut conn)?;

        let (stripe_private_key, braintree_api_key) = api_credentials::table
            .select((
                api_credentials::stripe_private_key,
                api_credentials::braintree_api_key,
            ))
            .first::<(String, Option<String>)>(&mut conn)?;

        Ok(BillingParamsEntity {
            provider,
            stripe_private_key,
            braintree_api_key,
            retry_attempts,
        })
    }
}
