pub mod braintree;
pub mod charger;
pub mod gateway;
pub mod stripe;

pub use gateway::{ChargeError, ChargeOutcome, ChargeRequest, PaymentGateway};
