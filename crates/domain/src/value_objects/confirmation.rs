use uuid::Uuid;

/// Opaque, human-readable settlement reference stamped on every paid invoice.
pub fn create_confirmation_number() -> String {
    let hex = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("INV-{}", &hex[..8])
}
