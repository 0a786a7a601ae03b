/// Gateway configuration assembled from the admin customizations row and the
/// stored provider credentials. Loaded once per billing task.
#[derive(Debug, Clone)]
pub struct BillingParamsEntity {
    pub provider: String,
    pub stripe_private_key: String,
    pub braintree_api_key: Option<String>,
    pub retry_attempts: i32,
}

/// Global rate card applied to metered usage.
#[derive(Debug, Clone, Copy)]
pub struct BaseCosts {
    pub recordings_cents_per_byte: f64,
    pub fax_cents_per_unit: f64,
}
