use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    Full,
    Partial,
    NotDelivered,
}

impl Display for DeliveryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let delivery_type = match self {
            DeliveryType::Full => "full",
            DeliveryType::Partial => "partial",
            DeliveryType::NotDelivered => "not_delivered",
        };
        write!(f, "{}", delivery_type)
    }
}
