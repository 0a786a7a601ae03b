use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DebitSource {
    Call,
    NumberRental,
    Other,
}

impl Display for DebitSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let source = match self {
            DebitSource::Call => "CALL",
            DebitSource::NumberRental => "NUMBER_RENTAL",
            DebitSource::Other => "OTHER",
        };
        write!(f, "{}", source)
    }
}

impl DebitSource {
    pub fn from_str(value: &str) -> Self {
        match value {
            "CALL" => DebitSource::Call,
            "NUMBER_RENTAL" => DebitSource::NumberRental,
            _ => DebitSource::Other,
        }
    }
}
