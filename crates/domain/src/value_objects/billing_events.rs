use serde::{Deserialize, Serialize};

use crate::value_objects::billing_tasks::BillingTask;

/// Outbound record on `payment_receipts` for the downstream ledger and email
/// systems. `payment_amount` is dollars, not cents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentReceiptEvent {
    pub run_id: String,
    pub workspace_id: i64,
    pub subscription_id: i64,
    pub creator_id: i64,
    pub card_last_4: String,
    pub card_brand: String,
    pub payment_amount: f64,
    pub timestamp: i64,
}

impl PaymentReceiptEvent {
    pub fn for_task(
        task: &BillingTask,
        amount_cents: i64,
        card_last_4: &str,
        card_brand: &str,
        timestamp: i64,
    ) -> Self {
        Self {
            run_id: task.run_id.clone(),
            workspace_id: task.workspace_id,
            subscription_id: task.subscription_id,
            creator_id: task.creator_id,
            card_last_4: card_last_4.to_string(),
            card_brand: card_brand.to_string(),
            payment_amount: amount_cents as f64 / 100.0,
            timestamp,
        }
    }
}

/// Outbound record on `failed_payments`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailedPaymentEvent {
    pub run_id: String,
    pub workspace_id: i64,
    pub subscription_id: i64,
    pub creator_id: i64,
    pub reason: String,
}

impl FailedPaymentEvent {
    pub fn for_task(task: &BillingTask, reason: &str) -> Self {
        Self {
            run_id: task.run_id.clone(),
            workspace_id: task.workspace_id,
            subscription_id: task.subscription_id,
            creator_id: task.creator_id,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::enums::{
        billing_actions::BillingAction, billing_cycles::BillingCycle,
    };

    fn sample_task() -> BillingTask {
        BillingTask {
            run_id: "billing_run_lock:MONTHLY:2026-08".to_string(),
            billing_type: BillingCycle::Monthly,
            workspace_id: 1,
            creator_id: 101,
            subscription_id: 55,
            action: BillingAction::Renewal,
            plan_to_bill: 3,
            provider_subscription_id: None,
        }
    }

    #[test]
    fn receipt_amount_is_converted_to_dollars() {
        let receipt = PaymentReceiptEvent::for_task(&sample_task(), 2499, "4242", "visa", 1_700_000_000);
        assert_eq!(receipt.payment_amount, 24.99);

        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["card_last_4"], "4242");
        assert_eq!(json["card_brand"], "visa");
        assert_eq!(json["payment_amount"], 24.99);
        assert_eq!(json["timestamp"], 1_700_000_000);
    }

    #[test]
    fn failure_event_carries_the_reason() {
        let event = FailedPaymentEvent::for_task(&sample_task(), "card declined");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["workspace_id"], 1);
        assert_eq!(json["reason"], "card declined");
    }
}
