use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info, warn};

use domain::{
    entities::{
        billing_params::{BaseCosts, BillingParamsEntity},
        service_plans::ServicePlanEntity,
        subscriptions::SubscriptionEntity,
        users::UserEntity,
        workspaces::WorkspaceEntity,
    },
    repositories::{
        cards::CardRepository, catalog::BillingCatalogRepository, events::BillingEventPublisher,
        invoices::InvoiceRepository, subscriptions::SubscriptionRepository,
        usage::UsageRepository, workspaces::WorkspaceRepository,
    },
    value_objects::{
        billing_events::{FailedPaymentEvent, PaymentReceiptEvent},
        billing_tasks::BillingTask,
        confirmation::create_confirmation_number,
        enums::{
            debit_sources::DebitSource, invoice_sources::InvoiceSource,
            invoice_statuses::InvoiceStatus,
        },
    },
};
use domain::entities::invoices::InsertInvoiceEntity;
use payments::charger::CardCharger;
use payments::gateway::{ChargeError, ChargeRequest, create_idempotency_key};

use crate::usecases::allowance::charge_against_allowance;

const CURRENCY: &str = "usd";

pub use payments::charger::GatewayCharger;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("subscription {0} not found")]
    SubscriptionNotFound(i64),
    #[error("workspace {0} not found")]
    WorkspaceNotFound(i64),
    #[error("user {0} not found")]
    UserNotFound(i64),
    #[error("plan not found")]
    PlanNotFound,
    #[error(transparent)]
    Infrastructure(#[from] anyhow::Error),
}

impl BillingError {
    /// Task-fatal errors are acked with a failure event; infrastructure
    /// errors requeue the task for another replica instead.
    pub fn is_task_fatal(&self) -> bool {
        !matches!(self, BillingError::Infrastructure(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Settled {
        invoice_id: i64,
        source: InvoiceSource,
    },
    ChargeFailed {
        invoice_id: i64,
        reason: String,
    },
}

/// Everything a task needs loaded before costing starts.
struct BillingData {
    subscription: SubscriptionEntity,
    workspace: WorkspaceEntity,
    user: UserEntity,
    plan: ServicePlanEntity,
    billing_params: BillingParamsEntity,
    base_costs: BaseCosts,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    now: DateTime<Utc>,
    user_count: i64,
}

#[derive(Debug, Default, Clone)]
pub struct CostBreakdown {
    pub membership_cents: i64,
    pub call_tolls_cents: i64,
    pub recording_cents: i64,
    pub fax_cents: i64,
    pub number_rental_cents: i64,
}

impl CostBreakdown {
    pub fn total_cents(&self) -> i64 {
        self.membership_cents
            + self.call_tolls_cents
            + self.recording_cents
            + self.fax_cents
            + self.number_rental_cents
    }

    /// Per-category breakdown stored for the downstream tax engine.
    pub fn tax_metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "call_costs": self.call_tolls_cents,
            "recording_costs": self.recording_cents,
            "fax_costs": self.fax_cents,
            "membership_costs": self.membership_cents,
            "number_costs": self.number_rental_cents,
        })
    }
}

/// Drives one billing task from delivery to a terminal invoice state:
/// load -> cost -> invoice -> charge -> settle.
pub struct BillingUseCase<S, W, C, U, I, Card, E, G>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    W: WorkspaceRepository + Send + Sync + 'static,
    C: BillingCatalogRepository + Send + Sync + 'static,
    U: UsageRepository + Send + Sync + 'static,
    I: InvoiceRepository + Send + Sync + 'static,
    Card: CardRepository + Send + Sync + 'static,
    E: BillingEventPublisher + Send + Sync + 'static,
    G: CardCharger + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    workspace_repo: Arc<W>,
    catalog_repo: Arc<C>,
    usage_repo: Arc<U>,
    invoice_repo: Arc<I>,
    card_repo: Arc<Card>,
    event_publisher: Arc<E>,
    charger: Arc<G>,
}

impl<S, W, C, U, I, Card, E, G> BillingUseCase<S, W, C, U, I, Card, E, G>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    W: WorkspaceRepository + Send + Sync + 'static,
    C: BillingCatalogRepository + Send + Sync + 'static,
    U: UsageRepository + Send + Sync + 'static,
    I: InvoiceRepository + Send + Sync + 'static,
    Card: CardRepository + Send + Sync + 'static,
    E: BillingEventPublisher + Send + Sync + 'static,
    G: CardCharger + Send + Sync + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        subscription_repo: Arc<S>,
        workspace_repo: Arc<W>,
        catalog_repo: Arc<C>,
        usage_repo: Arc<U>,
        invoice_repo: Arc<I>,
        card_repo: Arc<Card>,
        event_publisher: Arc<E>,
        charger: Arc<G>,
    ) -> Self {
        Self {
            subscription_repo,
            workspace_repo,
            catalog_repo,
            usage_repo,
            invoice_repo,
            card_repo,
            event_publisher,
            charger,
        }
    }

    pub async fn process_task(&self, task: &BillingTask) -> Result<TaskOutcome, BillingError> {
        match self.process_inner(task).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                if err.is_task_fatal() {
                    self.publish_failure(task, &err.to_string()).await;
                }
                Err(err)
            }
        }
    }

    async fn process_inner(&self, task: &BillingTask) -> Result<TaskOutcome, BillingError> {
        let data = self.load_billing_data(task).await?;
        let costs = self.calculate_costs(task, &data).await?;
        let invoice_id = self.create_invoice(&costs, &data).await?;
        self.charge_invoice(invoice_id, &costs, &data, task).await
    }

    async fn load_billing_data(&self, task: &BillingTask) -> Result<BillingData, BillingError> {
        let subscription = self
            .subscription_repo
            .find_by_id(task.subscription_id)
            .await?
            .ok_or(BillingError::SubscriptionNotFound(task.subscription_id))?;
        info!(
            subscription_id = subscription.id,
            workspace_id = task.workspace_id,
            "loaded subscription for billing task"
        );

        let billing_params = self.catalog_repo.billing_params().await?;

        let now = Utc::now();
        let period_start = task.billing_type.period_start(now);

        let workspace = self
            .workspace_repo
            .find_workspace(task.workspace_id)
            .await?
            .ok_or(BillingError::WorkspaceNotFound(task.workspace_id))?;

        let user = self
            .workspace_repo
            .find_user(task.creator_id)
            .await?
            .ok_or(BillingError::UserNotFound(task.creator_id))?;

        let plans = self.catalog_repo.list_service_plans().await?;
        let plan = plans
            .into_iter()
            .find(|plan| plan.id == task.plan_to_bill)
            .ok_or(BillingError::PlanNotFound)?;

        let base_costs = self.catalog_repo.base_costs().await?;

        let user_count = self.workspace_repo.workspace_user_count(workspace.id).await?;
        info!(workspace_id = workspace.id, user_count, "workspace member count");

        Ok(BillingData {
            subscription,
            workspace,
            user,
            plan,
            billing_params,
            base_costs,
            period_start,
            period_end: now,
            now,
            user_count,
        })
    }

    async fn calculate_costs(
        &self,
        task: &BillingTask,
        data: &BillingData,
    ) -> Result<CostBreakdown, BillingError> {
        let months = task.billing_type.months_billed();
        let mut costs = CostBreakdown {
            membership_cents: data.plan.base_cost_cents * data.user_count * months,
            ..Default::default()
        };

        let rentals = self
            .usage_repo
            .create_number_rental_debits(data.workspace.id, data.workspace.creator_id, data.period_start)
            .await?;
        if rentals > 0 {
            info!(
                workspace_id = data.workspace.id,
                rentals, "inserted number rental debits for the cycle"
            );
        }

        self.scan_debits(data, months, &mut costs).await?;
        self.scan_recordings(data, months, &mut costs).await?;
        self.scan_faxes(data, months, &mut costs).await?;

        info!(
            workspace_id = data.workspace.id,
            membership = costs.membership_cents,
            call_tolls = costs.call_tolls_cents,
            recordings = costs.recording_cents,
            fax = costs.fax_cents,
            number_rental = costs.number_rental_cents,
            total = costs.total_cents(),
            "final cycle costs in cents"
        );

        Ok(costs)
    }

    async fn scan_debits(
        &self,
        data: &BillingData,
        months: i64,
        costs: &mut CostBreakdown,
    ) -> Result<(), BillingError> {
        let debits = self
            .usage_repo
            .debits_in_window(data.workspace.creator_id, data.period_start, data.period_end)
            .await?;

        let mut remaining_minutes = data.plan.minutes_per_month * months as f64;

        for debit in debits {
            match DebitSource::from_str(&debit.source) {
                DebitSource::Call => {
                    let call = match self.usage_repo.find_call(debit.module_id).await {
                        Ok(Some(call)) => call,
                        Ok(None) => {
                            warn!(debit_id = debit.id, call_id = debit.module_id, "call not found for debit");
                            continue;
                        }
                        Err(err) => {
                            error!(debit_id = debit.id, error = %err, "error loading call for debit");
                            continue;
                        }
                    };

                    let minutes = call.duration_seconds as f64 / 60.0;
                    let charge =
                        match charge_against_allowance(debit.cents as f64, remaining_minutes, minutes) {
                            Ok(charge) => charge,
                            Err(err) => {
                                error!(debit_id = debit.id, error = %err, "error computing call charge");
                                continue;
                            }
                        };

                    costs.call_tolls_cents += charge as i64;
                    remaining_minutes -= minutes;
                }
                DebitSource::NumberRental => {
                    let did = match self.usage_repo.find_did(debit.module_id).await {
                        Ok(Some(did)) => did,
                        Ok(None) => {
                            warn!(debit_id = debit.id, did_id = debit.module_id, "DID not found for debit");
                            continue;
                        }
                        Err(err) => {
                            error!(debit_id = debit.id, error = %err, "error loading DID for debit");
                            continue;
                        }
                    };

                    costs.number_rental_cents += did.monthly_cost_cents;
                }
                DebitSource::Other => {
                    warn!(debit_id = debit.id, source = %debit.source, "skipping debit with unbilled source");
                }
            }
        }

        Ok(())
    }

    async fn scan_recordings(
        &self,
        data: &BillingData,
        months: i64,
        costs: &mut CostBreakdown,
    ) -> Result<(), BillingError> {
        let recordings = self
            .usage_repo
            .recordings_in_window(data.workspace.creator_id, data.period_start, data.period_end)
            .await?;

        let mut remaining_bytes = data.plan.recording_space_bytes * months as f64;

        for recording in recordings {
            let full_cents =
                (data.base_costs.recordings_cents_per_byte * recording.size_bytes).round();
            let charge =
                match charge_against_allowance(full_cents, remaining_bytes, recording.size_bytes) {
                    Ok(charge) => charge,
                    Err(err) => {
                        error!(recording_id = recording.id, error = %err, "error computing recording charge");
                        continue;
                    }
                };

            costs.recording_cents += charge as i64;
            remaining_bytes -= recording.size_bytes;
        }

        Ok(())
    }

    async fn scan_faxes(
        &self,
        data: &BillingData,
        months: i64,
        costs: &mut CostBreakdown,
    ) -> Result<(), BillingError> {
        let faxes = self
            .usage_repo
            .faxes_in_window(data.workspace.id, data.period_start, data.period_end)
            .await?;

        let mut remaining_units = data.plan.fax_units * months as f64;

        for fax in faxes {
            let charge =
                match charge_against_allowance(data.base_costs.fax_cents_per_unit, remaining_units, 1.0)
                {
                    Ok(charge) => charge,
                    Err(err) => {
                        error!(fax_id = fax.id, error = %err, "error computing fax charge");
                        continue;
                    }
                };

            costs.fax_cents += charge as i64;
            remaining_units -= 1.0;
        }

        Ok(())
    }

    async fn create_invoice(
        &self,
        costs: &CostBreakdown,
        data: &BillingData,
    ) -> Result<i64, BillingError> {
        info!(
            user_id = data.user.id,
            workspace_id = data.workspace.id,
            plan = %data.plan.key_name,
            "creating invoice"
        );

        // Taxes are computed by a downstream engine; stored as zero here with
        // the breakdown it needs.
        let taxes = 0;
        let total = costs.total_cents();

        let invoice = InsertInvoiceEntity {
            cents: total,
            cents_including_taxes: total + taxes,
            call_costs: costs.call_tolls_cents,
            recording_costs: costs.recording_cents,
            fax_costs: costs.fax_cents,
            membership_costs: costs.membership_cents,
            number_costs: costs.number_rental_cents,
            status: InvoiceStatus::Incomplete.to_string(),
            source: InvoiceSource::Subscription.to_string(),
            cents_collected: 0,
            num_attempts: 0,
            tax_metadata: costs.tax_metadata(),
            user_id: data.workspace.creator_id,
            workspace_id: data.workspace.id,
            created_at: data.now,
            updated_at: data.now,
        };

        let invoice_id = self.invoice_repo.create_invoice(invoice).await?;
        Ok(invoice_id)
    }

    async fn charge_invoice(
        &self,
        invoice_id: i64,
        costs: &CostBreakdown,
        data: &BillingData,
        task: &BillingTask,
    ) -> Result<TaskOutcome, BillingError> {
        info!(
            invoice_id,
            workspace_id = data.workspace.id,
            subscription_id = data.subscription.id,
            pay_as_you_go = data.plan.pay_as_you_go,
            "charging invoice"
        );

        if data.plan.pay_as_you_go {
            self.charge_with_credits(invoice_id, costs, data, task).await
        } else {
            let card_charge_cents = (costs.total_cents() as f64).ceil() as i64;
            self.attempt_card_charge(invoice_id, card_charge_cents, costs, data, task)
                .await
        }
    }

    async fn charge_with_credits(
        &self,
        invoice_id: i64,
        costs: &CostBreakdown,
        data: &BillingData,
        task: &BillingTask,
    ) -> Result<TaskOutcome, BillingError> {
        let balance = data.workspace.remaining_balance_cents;
        let total = costs.total_cents();

        if balance >= total {
            info!(invoice_id, balance, total, "settling invoice from prepaid credits");
            let confirmation = create_confirmation_number();
            self.invoice_repo
                .settle_invoice(invoice_id, InvoiceSource::Credits, total, &confirmation, data.now)
                .await?;
            self.publish_receipt(task, total, "", "CREDITS", data.now).await;
            return Ok(TaskOutcome::Settled {
                invoice_id,
                source: InvoiceSource::Credits,
            });
        }

        warn!(invoice_id, balance, total, "insufficient credits; falling back to card");
        let credits_applied = balance.max(0);
        self.invoice_repo
            .record_partial_credits(invoice_id, credits_applied)
            .await?;

        let shortfall = ((total - credits_applied) as f64).ceil() as i64;
        self.attempt_card_charge(invoice_id, shortfall, costs, data, task)
            .await
    }

    async fn attempt_card_charge(
        &self,
        invoice_id: i64,
        amount_cents: i64,
        costs: &CostBreakdown,
        data: &BillingData,
        task: &BillingTask,
    ) -> Result<TaskOutcome, BillingError> {
        let total = costs.total_cents();

        if amount_cents <= 0 {
            // Nothing left to collect; settle without touching the provider.
            info!(invoice_id, "zero-amount charge; settling without provider call");
            let confirmation = create_confirmation_number();
            self.invoice_repo
                .settle_invoice(invoice_id, InvoiceSource::Card, total, &confirmation, data.now)
                .await?;
            self.publish_receipt(task, total, "", "", data.now).await;
            return Ok(TaskOutcome::Settled {
                invoice_id,
                source: InvoiceSource::Card,
            });
        }

        let card = self
            .card_repo
            .find_primary_card(data.workspace.id)
            .await?;
        let Some(card) = card else {
            warn!(invoice_id, workspace_id = data.workspace.id, "no primary payment method on file");
            return self
                .fail_charge(invoice_id, task, &ChargeError::NoPaymentMethod.to_string(), data.now)
                .await;
        };

        let request = ChargeRequest {
            customer_ref: data.user.provider_customer_id.clone(),
            payment_method_ref: card.provider_payment_method_id.clone(),
            amount_cents,
            currency: CURRENCY.to_string(),
            idempotency_key: create_idempotency_key(data.workspace.id, data.now, amount_cents),
            descriptor_suffix: String::new(),
            return_url: String::new(),
        };

        info!(
            invoice_id,
            amount_cents,
            idempotency_key = %request.idempotency_key,
            "charging card"
        );

        match self.charger.charge(&data.billing_params, &request).await {
            Ok(outcome) => {
                info!(
                    invoice_id,
                    provider_id = %outcome.provider_id,
                    status = %outcome.status,
                    "card charge succeeded"
                );
                let confirmation = create_confirmation_number();
                self.invoice_repo
                    .settle_invoice(invoice_id, InvoiceSource::Card, total, &confirmation, data.now)
                    .await?;
                self.publish_receipt(task, total, &outcome.card_last_4, &outcome.card_brand, data.now)
                    .await;
                Ok(TaskOutcome::Settled {
                    invoice_id,
                    source: InvoiceSource::Card,
                })
            }
            Err(err) => {
                error!(invoice_id, error = %err, "card charge failed");
                self.fail_charge(invoice_id, task, &err.to_string(), data.now).await
            }
        }
    }

    async fn fail_charge(
        &self,
        invoice_id: i64,
        task: &BillingTask,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<TaskOutcome, BillingError> {
        self.invoice_repo.mark_charge_failed(invoice_id, now).await?;
        self.publish_failure(task, reason).await;
        Ok(TaskOutcome::ChargeFailed {
            invoice_id,
            reason: reason.to_string(),
        })
    }

    async fn publish_receipt(
        &self,
        task: &BillingTask,
        amount_cents: i64,
        card_last_4: &str,
        card_brand: &str,
        now: DateTime<Utc>,
    ) {
        let event = PaymentReceiptEvent::for_task(
            task,
            amount_cents,
            card_last_4,
            card_brand,
            now.timestamp(),
        );
        if let Err(err) = self.event_publisher.publish_receipt(&event).await {
            error!(workspace_id = task.workspace_id, error = %err, "error publishing payment receipt");
        } else {
            info!(
                workspace_id = task.workspace_id,
                subscription_id = task.subscription_id,
                amount_cents,
                "published payment receipt"
            );
        }
    }

    async fn publish_failure(&self, task: &BillingTask, reason: &str) {
        let event = FailedPaymentEvent::for_task(task, reason);
        if let Err(err) = self.event_publisher.publish_failure(&event).await {
            error!(workspace_id = task.workspace_id, error = %err, "error publishing failed payment");
        } else {
            info!(
                workspace_id = task.workspace_id,
                subscription_id = task.subscription_id,
                reason,
                "published failed payment event"
            );
        }
    }
}

/// Object-safe view of the use case for the consumer loop.
#[async_trait]
pub trait TaskProcessor: Send + Sync {
    async fn process(&self, task: &BillingTask) -> Result<TaskOutcome, BillingError>;
}

#[async_trait]
impl<S, W, C, U, I, Card, E, G> TaskProcessor for BillingUseCase<S, W, C, U, I, Card, E, G>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    W: WorkspaceRepository + Send + Sync + 'static,
    C: BillingCatalogRepository + Send + Sync + 'static,
    U: UsageRepository + Send + Sync + 'static,
    I: InvoiceRepository + Send + Sync + 'static,
    Card: CardRepository + Send + Sync + 'static,
    E: BillingEventPublisher + Send + Sync + 'static,
    G: CardCharger + Send + Sync + 'static,
{
    async fn process(&self, task: &BillingTask) -> Result<TaskOutcome, BillingError> {
        self.process_task(task).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::{
        entities::{
            calls::CallEntity, cards::CardEntity, debits::DebitEntity,
        },
        repositories::{
            cards::MockCardRepository, catalog::MockBillingCatalogRepository,
            events::MockBillingEventPublisher, invoices::MockInvoiceRepository,
            subscriptions::MockSubscriptionRepository, usage::MockUsageRepository,
            workspaces::MockWorkspaceRepository,
        },
        value_objects::enums::{
            billing_actions::BillingAction, billing_cycles::BillingCycle,
        },
    };
    use payments::charger::MockCardCharger;
    use payments::gateway::ChargeOutcome;

    fn assert_confirmation_shape(confirmation: &str) -> bool {
        confirmation.len() == 12 && confirmation.starts_with("INV-")
    }

    struct Mocks {
        subscriptions: MockSubscriptionRepository,
        workspaces: MockWorkspaceRepository,
        catalog: MockBillingCatalogRepository,
        usage: MockUsageRepository,
        invoices: MockInvoiceRepository,
        cards: MockCardRepository,
        events: MockBillingEventPublisher,
        charger: MockCardCharger,
    }

    fn sample_task(cycle: BillingCycle) -> BillingTask {
        BillingTask {
            run_id: format!("billing_run_lock:{}:2026-08", cycle),
            billing_type: cycle,
            workspace_id: 1,
            creator_id: 101,
            subscription_id: 55,
            action: BillingAction::Renewal,
            plan_to_bill: 3,
            provider_subscription_id: None,
        }
    }

    fn sample_subscription(cycle: BillingCycle) -> SubscriptionEntity {
        let now = Utc::now();
        SubscriptionEntity {
            id: 55,
            workspace_id: 1,
            current_plan_id: 3,
            scheduled_plan_id: None,
            scheduled_effective_at: None,
            provider_subscription_id: None,
            billing_cycle: cycle.to_string(),
            status: "active".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_workspace(balance_cents: i64) -> WorkspaceEntity {
        WorkspaceEntity {
            id: 1,
            creator_id: 101,
            plan: "starter".to_string(),
            remaining_balance_cents: balance_cents,
            invoice_due: "August 2026".to_string(),
            created_at: Utc::now(),
        }
    }

    fn sample_user() -> UserEntity {
        UserEntity {
            id: 101,
            email: "owner@example.com".to_string(),
            provider_customer_id: "cus_123".to_string(),
            created_at: Utc::now(),
        }
    }

    fn starter_plan() -> ServicePlanEntity {
        ServicePlanEntity {
            id: 3,
            key_name: "starter".to_string(),
            base_cost_cents: 2499,
            minutes_per_month: 200.0,
            recording_space_bytes: 1024.0,
            fax_units: 0.0,
            pay_as_you_go: false,
            annual_cost_cents: 24990,
        }
    }

    fn stripe_params() -> BillingParamsEntity {
        BillingParamsEntity {
            provider: "stripe".to_string(),
            stripe_private_key: "sk_test_x".to_string(),
            braintree_api_key: None,
            retry_attempts: 0,
        }
    }

    fn sample_base_costs() -> BaseCosts {
        BaseCosts {
            recordings_cents_per_byte: 0.001,
            fax_cents_per_unit: 50.0,
        }
    }

    fn sample_card() -> CardEntity {
        CardEntity {
            id: 9,
            workspace_id: 1,
            provider_payment_method_id: "pm_456".to_string(),
            is_primary: true,
            created_at: Utc::now(),
        }
    }

    fn charge_outcome() -> ChargeOutcome {
        ChargeOutcome {
            provider_id: "pi_789".to_string(),
            status: "succeeded".to_string(),
            card_brand: "visa".to_string(),
            card_last_4: "4242".to_string(),
            created_at: 1_700_000_000,
        }
    }

    fn new_mocks() -> Mocks {
        Mocks {
            subscriptions: MockSubscriptionRepository::new(),
            workspaces: MockWorkspaceRepository::new(),
            catalog: MockBillingCatalogRepository::new(),
            usage: MockUsageRepository::new(),
            invoices: MockInvoiceRepository::new(),
            cards: MockCardRepository::new(),
            events: MockBillingEventPublisher::new(),
            charger: MockCardCharger::new(),
        }
    }

    /// Wires the happy-path load expectations shared by most scenarios.
    fn expect_load(mocks: &mut Mocks, cycle: BillingCycle, plan: ServicePlanEntity, balance: i64, user_count: i64) {
        let subscription = sample_subscription(cycle);
        mocks
            .subscriptions
            .expect_find_by_id()
            .returning(move |_| {
                let subscription = subscription.clone();
                Box::pin(async move { Ok(Some(subscription)) })
            });
        mocks
            .catalog
            .expect_billing_params()
            .returning(|| Box::pin(async { Ok(stripe_params()) }));
        mocks
            .workspaces
            .expect_find_workspace()
            .returning(move |_| {
                let workspace = sample_workspace(balance);
                Box::pin(async move { Ok(Some(workspace)) })
            });
        mocks
            .workspaces
            .expect_find_user()
            .returning(|_| Box::pin(async { Ok(Some(sample_user())) }));
        mocks.catalog.expect_list_service_plans().returning(move || {
            let plan = plan.clone();
            Box::pin(async move { Ok(vec![plan]) })
        });
        mocks
            .catalog
            .expect_base_costs()
            .returning(|| Box::pin(async { Ok(sample_base_costs()) }));
        mocks
            .workspaces
            .expect_workspace_user_count()
            .returning(move |_| Box::pin(async move { Ok(user_count) }));
    }

    fn expect_no_usage(mocks: &mut Mocks) {
        mocks
            .usage
            .expect_create_number_rental_debits()
            .returning(|_, _, _| Box::pin(async { Ok(0) }));
        mocks
            .usage
            .expect_debits_in_window()
            .returning(|_, _, _| Box::pin(async { Ok(vec![]) }));
        mocks
            .usage
            .expect_recordings_in_window()
            .returning(|_, _, _| Box::pin(async { Ok(vec![]) }));
        mocks
            .usage
            .expect_faxes_in_window()
            .returning(|_, _, _| Box::pin(async { Ok(vec![]) }));
    }

    fn build_usecase(
        mocks: Mocks,
    ) -> BillingUseCase<
        MockSubscriptionRepository,
        MockWorkspaceRepository,
        MockBillingCatalogRepository,
        MockUsageRepository,
        MockInvoiceRepository,
        MockCardRepository,
        MockBillingEventPublisher,
        MockCardCharger,
    > {
        BillingUseCase::new(
            Arc::new(mocks.subscriptions),
            Arc::new(mocks.workspaces),
            Arc::new(mocks.catalog),
            Arc::new(mocks.usage),
            Arc::new(mocks.invoices),
            Arc::new(mocks.cards),
            Arc::new(mocks.events),
            Arc::new(mocks.charger),
        )
    }

    #[tokio::test]
    async fn monthly_card_only_within_allowance_settles_complete() {
        let mut mocks = new_mocks();
        expect_load(&mut mocks, BillingCycle::Monthly, starter_plan(), 0, 1);
        expect_no_usage(&mut mocks);

        mocks
            .invoices
            .expect_create_invoice()
            .withf(|invoice| {
                invoice.cents == 2499
                    && invoice.membership_costs == 2499
                    && invoice.call_costs == 0
                    && invoice.recording_costs == 0
                    && invoice.fax_costs == 0
                    && invoice.number_costs == 0
                    && invoice.cents_including_taxes == 2499
                    && invoice.status == "INCOMPLETE"
                    && invoice.source == "SUBSCRIPTION"
            })
            .returning(|_| Box::pin(async { Ok(900) }));

        mocks
            .cards
            .expect_find_primary_card()
            .returning(|_| Box::pin(async { Ok(Some(sample_card())) }));
        mocks
            .charger
            .expect_charge()
            .withf(|_, request| request.amount_cents == 2499 && request.currency == "usd")
            .returning(|_, _| Box::pin(async { Ok(charge_outcome()) }));

        mocks
            .invoices
            .expect_settle_invoice()
            .withf(|invoice_id, source, cents, confirmation, _| {
                *invoice_id == 900
                    && *source == InvoiceSource::Card
                    && *cents == 2499
                    && assert_confirmation_shape(confirmation)
            })
            .returning(|_, _, _, _, _| Box::pin(async { Ok(()) }));

        mocks
            .events
            .expect_publish_receipt()
            .withf(|event| {
                event.payment_amount == 24.99
                    && event.card_last_4 == "4242"
                    && event.card_brand == "visa"
            })
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let usecase = build_usecase(mocks);
        let outcome = usecase
            .process_task(&sample_task(BillingCycle::Monthly))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TaskOutcome::Settled {
                invoice_id: 900,
                source: InvoiceSource::Card
            }
        );
    }

    #[tokio::test]
    async fn monthly_call_overage_adds_partial_charge() {
        let mut mocks = new_mocks();
        expect_load(&mut mocks, BillingCycle::Monthly, starter_plan(), 0, 1);

        mocks
            .usage
            .expect_create_number_rental_debits()
            .returning(|_, _, _| Box::pin(async { Ok(0) }));
        mocks.usage.expect_debits_in_window().returning(|_, _, _| {
            let debit = DebitEntity {
                id: 70,
                source: "CALL".to_string(),
                status: "INCOMPLETE".to_string(),
                cents: 5000,
                module_id: 500,
                user_id: 101,
                workspace_id: 1,
                created_at: Utc::now(),
            };
            Box::pin(async move { Ok(vec![debit]) })
        });
        mocks.usage.expect_find_call().returning(|_| {
            let call = CallEntity {
                id: 500,
                workspace_id: 1,
                duration_seconds: 13_000,
                created_at: Utc::now(),
            };
            Box::pin(async move { Ok(Some(call)) })
        });
        mocks
            .usage
            .expect_recordings_in_window()
            .returning(|_, _, _| Box::pin(async { Ok(vec![]) }));
        mocks
            .usage
            .expect_faxes_in_window()
            .returning(|_, _, _| Box::pin(async { Ok(vec![]) }));

        // 13000s = 216.67 min against 200 allowed: ~7.7% of 5000 cents.
        let minutes = 13_000.0 / 60.0;
        let expected_call_charge = (5000.0 * (minutes - 200.0) / minutes) as i64;
        let expected_total = 2499 + expected_call_charge;

        mocks
            .invoices
            .expect_create_invoice()
            .withf(move |invoice| {
                invoice.call_costs == expected_call_charge && invoice.cents == expected_total
            })
            .returning(|_| Box::pin(async { Ok(901) }));

        mocks
            .cards
            .expect_find_primary_card()
            .returning(|_| Box::pin(async { Ok(Some(sample_card())) }));
        mocks
            .charger
            .expect_charge()
            .returning(|_, _| Box::pin(async { Ok(charge_outcome()) }));
        mocks
            .invoices
            .expect_settle_invoice()
            .returning(|_, _, _, _, _| Box::pin(async { Ok(()) }));
        mocks
            .events
            .expect_publish_receipt()
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let usecase = build_usecase(mocks);
        let outcome = usecase
            .process_task(&sample_task(BillingCycle::Monthly))
            .await
            .unwrap();

        assert!(matches!(outcome, TaskOutcome::Settled { invoice_id: 901, .. }));
        assert!(expected_call_charge >= 1);
    }

    #[tokio::test]
    async fn annual_card_decline_leaves_invoice_incomplete_and_emits_failure() {
        let mut mocks = new_mocks();
        let pro_plan = ServicePlanEntity {
            id: 3,
            key_name: "pro".to_string(),
            base_cost_cents: 4999,
            minutes_per_month: 1000.0,
            recording_space_bytes: 1_000_000.0,
            fax_units: 100.0,
            pay_as_you_go: false,
            annual_cost_cents: 599_880,
        };
        expect_load(&mut mocks, BillingCycle::Annual, pro_plan, 0, 20);
        expect_no_usage(&mut mocks);

        // 4999 x 20 users x 12 months.
        mocks
            .invoices
            .expect_create_invoice()
            .withf(|invoice| invoice.cents == 1_199_760 && invoice.membership_costs == 1_199_760)
            .returning(|_| Box::pin(async { Ok(902) }));

        mocks
            .cards
            .expect_find_primary_card()
            .returning(|_| Box::pin(async { Ok(Some(sample_card())) }));
        mocks.charger.expect_charge().returning(|_, _| {
            Box::pin(async {
                Err(ChargeError::Declined {
                    reason: "insufficient_funds".to_string(),
                })
            })
        });

        mocks
            .invoices
            .expect_mark_charge_failed()
            .withf(|invoice_id, _| *invoice_id == 902)
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));
        mocks
            .events
            .expect_publish_failure()
            .withf(|event| event.reason.contains("insufficient_funds"))
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let usecase = build_usecase(mocks);
        let outcome = usecase
            .process_task(&sample_task(BillingCycle::Annual))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            TaskOutcome::ChargeFailed { invoice_id: 902, .. }
        ));
    }

    #[tokio::test]
    async fn pay_as_you_go_with_sufficient_credits_settles_from_balance() {
        let mut mocks = new_mocks();
        let paygo_plan = ServicePlanEntity {
            id: 3,
            key_name: "metered".to_string(),
            base_cost_cents: 50_000,
            minutes_per_month: 0.0,
            recording_space_bytes: 0.0,
            fax_units: 0.0,
            pay_as_you_go: true,
            annual_cost_cents: 0,
        };
        expect_load(&mut mocks, BillingCycle::Monthly, paygo_plan, 1_000_000, 1);
        expect_no_usage(&mut mocks);

        mocks
            .invoices
            .expect_create_invoice()
            .withf(|invoice| invoice.cents == 50_000)
            .returning(|_| Box::pin(async { Ok(903) }));
        mocks
            .invoices
            .expect_settle_invoice()
            .withf(|invoice_id, source, cents, _, _| {
                *invoice_id == 903 && *source == InvoiceSource::Credits && *cents == 50_000
            })
            .times(1)
            .returning(|_, _, _, _, _| Box::pin(async { Ok(()) }));
        mocks
            .events
            .expect_publish_receipt()
            .withf(|event| event.card_brand == "CREDITS" && event.payment_amount == 500.0)
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let usecase = build_usecase(mocks);
        let outcome = usecase
            .process_task(&sample_task(BillingCycle::Monthly))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TaskOutcome::Settled {
                invoice_id: 903,
                source: InvoiceSource::Credits
            }
        );
    }

    #[tokio::test]
    async fn pay_as_you_go_with_insufficient_credits_charges_card_for_shortfall() {
        let mut mocks = new_mocks();
        let paygo_plan = ServicePlanEntity {
            id: 3,
            key_name: "metered".to_string(),
            base_cost_cents: 50_000,
            minutes_per_month: 0.0,
            recording_space_bytes: 0.0,
            fax_units: 0.0,
            pay_as_you_go: true,
            annual_cost_cents: 0,
        };
        expect_load(&mut mocks, BillingCycle::Monthly, paygo_plan, 10_000, 1);
        expect_no_usage(&mut mocks);

        mocks
            .invoices
            .expect_create_invoice()
            .returning(|_| Box::pin(async { Ok(904) }));
        mocks
            .invoices
            .expect_record_partial_credits()
            .withf(|invoice_id, cents| *invoice_id == 904 && *cents == 10_000)
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));
        mocks
            .cards
            .expect_find_primary_card()
            .returning(|_| Box::pin(async { Ok(Some(sample_card())) }));
        mocks
            .charger
            .expect_charge()
            .withf(|_, request| request.amount_cents == 40_000)
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(charge_outcome()) }));
        mocks
            .invoices
            .expect_settle_invoice()
            .withf(|invoice_id, source, cents, _, _| {
                *invoice_id == 904 && *source == InvoiceSource::Card && *cents == 50_000
            })
            .times(1)
            .returning(|_, _, _, _, _| Box::pin(async { Ok(()) }));
        mocks
            .events
            .expect_publish_receipt()
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let usecase = build_usecase(mocks);
        let outcome = usecase
            .process_task(&sample_task(BillingCycle::Monthly))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TaskOutcome::Settled {
                invoice_id: 904,
                source: InvoiceSource::Card
            }
        );
    }

    #[tokio::test]
    async fn missing_plan_fails_the_task_before_any_invoice_exists() {
        let mut mocks = new_mocks();
        let subscription = sample_subscription(BillingCycle::Monthly);
        mocks
            .subscriptions
            .expect_find_by_id()
            .returning(move |_| {
                let subscription = subscription.clone();
                Box::pin(async move { Ok(Some(subscription)) })
            });
        mocks
            .catalog
            .expect_billing_params()
            .returning(|| Box::pin(async { Ok(stripe_params()) }));
        mocks
            .workspaces
            .expect_find_workspace()
            .returning(|_| Box::pin(async { Ok(Some(sample_workspace(0))) }));
        mocks
            .workspaces
            .expect_find_user()
            .returning(|_| Box::pin(async { Ok(Some(sample_user())) }));
        mocks
            .catalog
            .expect_list_service_plans()
            .returning(|| Box::pin(async { Ok(vec![]) }));

        mocks
            .events
            .expect_publish_failure()
            .withf(|event| event.reason == "plan not found")
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let usecase = build_usecase(mocks);
        let err = usecase
            .process_task(&sample_task(BillingCycle::Monthly))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::PlanNotFound));
        assert!(err.is_task_fatal());
    }

    #[tokio::test]
    async fn zero_user_workspace_settles_a_zero_invoice_without_provider_call() {
        let mut mocks = new_mocks();
        let free_tier = ServicePlanEntity {
            id: 3,
            key_name: "starter".to_string(),
            base_cost_cents: 2499,
            minutes_per_month: 200.0,
            recording_space_bytes: 1024.0,
            fax_units: 0.0,
            pay_as_you_go: false,
            annual_cost_cents: 24990,
        };
        expect_load(&mut mocks, BillingCycle::Monthly, free_tier, 0, 0);
        expect_no_usage(&mut mocks);

        mocks
            .invoices
            .expect_create_invoice()
            .withf(|invoice| invoice.cents == 0 && invoice.membership_costs == 0)
            .returning(|_| Box::pin(async { Ok(905) }));
        mocks
            .invoices
            .expect_settle_invoice()
            .withf(|invoice_id, source, cents, _, _| {
                *invoice_id == 905 && *source == InvoiceSource::Card && *cents == 0
            })
            .times(1)
            .returning(|_, _, _, _, _| Box::pin(async { Ok(()) }));
        mocks
            .events
            .expect_publish_receipt()
            .withf(|event| event.payment_amount == 0.0)
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let usecase = build_usecase(mocks);
        let outcome = usecase
            .process_task(&sample_task(BillingCycle::Monthly))
            .await
            .unwrap();

        assert!(matches!(outcome, TaskOutcome::Settled { invoice_id: 905, .. }));
    }

    #[tokio::test]
    async fn no_payment_method_fails_the_charge_with_a_typed_reason() {
        let mut mocks = new_mocks();
        expect_load(&mut mocks, BillingCycle::Monthly, starter_plan(), 0, 1);
        expect_no_usage(&mut mocks);

        mocks
            .invoices
            .expect_create_invoice()
            .returning(|_| Box::pin(async { Ok(906) }));
        mocks
            .cards
            .expect_find_primary_card()
            .returning(|_| Box::pin(async { Ok(None) }));
        mocks
            .invoices
            .expect_mark_charge_failed()
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));
        mocks
            .events
            .expect_publish_failure()
            .withf(|event| event.reason.contains("no primary payment method"))
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let usecase = build_usecase(mocks);
        let outcome = usecase
            .process_task(&sample_task(BillingCycle::Monthly))
            .await
            .unwrap();

        assert!(matches!(outcome, TaskOutcome::ChargeFailed { .. }));
    }

    #[tokio::test]
    async fn infrastructure_error_requeues_without_emitting_an_event() {
        let mut mocks = new_mocks();
        mocks
            .subscriptions
            .expect_find_by_id()
            .returning(|_| Box::pin(async { Err(anyhow::anyhow!("connection refused")) }));
        // No expect_publish_failure: the mock panics if an event is emitted.

        let usecase = build_usecase(mocks);
        let err = usecase
            .process_task(&sample_task(BillingCycle::Monthly))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::Infrastructure(_)));
        assert!(!err.is_task_fatal());
    }

    #[tokio::test]
    async fn missing_subscription_emits_failure_and_acks() {
        let mut mocks = new_mocks();
        mocks
            .subscriptions
            .expect_find_by_id()
            .returning(|_| Box::pin(async { Ok(None) }));
        mocks
            .events
            .expect_publish_failure()
            .withf(|event| event.reason.contains("subscription"))
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let usecase = build_usecase(mocks);
        let err = usecase
            .process_task(&sample_task(BillingCycle::Monthly))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::SubscriptionNotFound(55)));
        assert!(err.is_task_fatal());
    }
}
