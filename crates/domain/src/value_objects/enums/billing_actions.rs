use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BillingAction {
    #[default]
    Renewal,
    Upgrade,
}

impl Display for BillingAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let action = match self {
            BillingAction::Renewal => "renewal",
            BillingAction::Upgrade => "upgrade",
        };
        write!(f, "{}", action)
    }
}
