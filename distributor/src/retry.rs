use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{error, info, warn};

use domain::{
    repositories::{
        cards::CardRepository, catalog::BillingCatalogRepository, invoices::InvoiceRepository,
        workspaces::WorkspaceRepository,
    },
    value_objects::confirmation::create_confirmation_number,
};
use payments::charger::CardCharger;
use payments::gateway::{ChargeRequest, create_idempotency_key};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RetryReport {
    pub attempted: usize,
    pub recovered: usize,
    pub failed: usize,
}

/// Daily chore that re-drives INCOMPLETE invoices through the stored card.
/// The idempotency-key scheme makes a retry of an already-captured charge a
/// provider-side no-op.
pub struct RetryBillingUseCase<I, W, C, Card, G>
where
    I: InvoiceRepository + Send + Sync + 'static,
    W: WorkspaceRepository + Send + Sync + 'static,
    C: BillingCatalogRepository + Send + Sync + 'static,
    Card: CardRepository + Send + Sync + 'static,
    G: CardCharger + Send + Sync + 'static,
{
    invoice_repo: Arc<I>,
    workspace_repo: Arc<W>,
    catalog_repo: Arc<C>,
    card_repo: Arc<Card>,
    charger: Arc<G>,
}

impl<I, W, C, Card, G> RetryBillingUseCase<I, W, C, Card, G>
where
    I: InvoiceRepository + Send + Sync + 'static,
    W: WorkspaceRepository + Send + Sync + 'static,
    C: BillingCatalogRepository + Send + Sync + 'static,
    Card: CardRepository + Send + Sync + 'static,
    G: CardCharger + Send + Sync + 'static,
{
    pub fn new(
        invoice_repo: Arc<I>,
        workspace_repo: Arc<W>,
        catalog_repo: Arc<C>,
        card_repo: Arc<Card>,
        charger: Arc<G>,
    ) -> Self {
        Self {
            invoice_repo,
            workspace_repo,
            catalog_repo,
            card_repo,
            charger,
        }
    }

    pub async fn retry_incomplete_invoices(&self) -> Result<RetryReport> {
        let billing_params = self.catalog_repo.billing_params().await?;
        let invoices = self.invoice_repo.list_incomplete().await?;

        let mut report = RetryReport::default();

        for invoice in invoices {
            report.attempted += 1;
            let now = Utc::now();

            let user = match self.workspace_repo.find_user(invoice.creator_id).await {
                Ok(Some(user)) => user,
                Ok(None) => {
                    warn!(invoice_id = invoice.id, user_id = invoice.creator_id, "retry: user not found");
                    continue;
                }
                Err(err) => {
                    error!(invoice_id = invoice.id, error = %err, "retry: error loading user");
                    continue;
                }
            };

            let card = match self.card_repo.find_primary_card(invoice.workspace_id).await {
                Ok(Some(card)) => card,
                Ok(None) => {
                    warn!(invoice_id = invoice.id, workspace_id = invoice.workspace_id, "retry: no primary payment method");
                    if let Err(err) = self.invoice_repo.record_retry_failure(invoice.id, now).await
                    {
                        error!(invoice_id = invoice.id, error = %err, "retry: error stamping attempt");
                    }
                    report.failed += 1;
                    continue;
                }
                Err(err) => {
                    error!(invoice_id = invoice.id, error = %err, "retry: error loading card");
                    continue;
                }
            };

            let request = ChargeRequest {
                customer_ref: user.provider_customer_id.clone(),
                payment_method_ref: card.provider_payment_method_id.clone(),
                amount_cents: invoice.cents,
                currency: "usd".to_string(),
                idempotency_key: create_idempotency_key(invoice.workspace_id, now, invoice.cents),
                descriptor_suffix: String::new(),
                return_url: String::new(),
            };

            match self.charger.charge(&billing_params, &request).await {
                Ok(outcome) => {
                    info!(
                        invoice_id = invoice.id,
                        provider_id = %outcome.provider_id,
                        "retry: charge recovered"
                    );
                    let confirmation = create_confirmation_number();
                    if let Err(err) = self
                        .invoice_repo
                        .record_retry_success(invoice.id, invoice.cents, &confirmation, now)
                        .await
                    {
                        error!(invoice_id = invoice.id, error = %err, "retry: error marking invoice complete");
                        continue;
                    }
                    report.recovered += 1;
                }
                Err(err) => {
                    warn!(invoice_id = invoice.id, error = %err, "retry: charge failed again");
                    if let Err(err) = self.invoice_repo.record_retry_failure(invoice.id, now).await
                    {
                        error!(invoice_id = invoice.id, error = %err, "retry: error stamping attempt");
                    }
                    report.failed += 1;
                }
            }
        }

        info!(
            attempted = report.attempted,
            recovered = report.recovered,
            failed = report.failed,
            "retry pass finished"
        );

        Ok(report)
    }
}
