use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InvoiceStatus {
    #[default]
    Incomplete,
    Complete,
}

impl Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            InvoiceStatus::Incomplete => "INCOMPLETE",
            InvoiceStatus::Complete => "COMPLETE",
        };
        write!(f, "{}", status)
    }
}

impl InvoiceStatus {
    pub fn from_str(value: &str) -> Self {
        match value {
            "COMPLETE" => InvoiceStatus::Complete,
            _ => InvoiceStatus::Incomplete,
        }
    }
}
