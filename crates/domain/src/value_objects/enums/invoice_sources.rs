use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// How an invoice was (or will be) settled. Freshly inserted invoices carry
/// `Subscription` until a payment path claims them.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InvoiceSource {
    #[default]
    Subscription,
    Card,
    Credits,
}

impl Display for InvoiceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let source = match self {
            InvoiceSource::Subscription => "SUBSCRIPTION",
            InvoiceSource::Card => "CARD",
            InvoiceSource::Credits => "CREDITS",
        };
        write!(f, "{}", source)
    }
}

impl InvoiceSource {
    pub fn from_str(value: &str) -> Self {
        match value {
            "CARD" => InvoiceSource::Card,
            "CREDITS" => InvoiceSource::Credits,
            _ => InvoiceSource::Subscription,
        }
    }
}
