use serde::{Deserialize, Serialize};

use crate::domain::{
    entities::deliveries::GeoPoint, value_objects::business_key::BusinessKey,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenLineItem {
    pub product_code: String,
    #[serde(default)]
    pub description: Option<String>,
    pub programmed: f64,
}

/// One delivery line still waiting to be attempted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenDelivery {
    pub order_id: String,
    pub folio: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub line_items: Vec<OpenLineItem>,
}

impl OpenDelivery {
    pub fn business_key(&self) -> BusinessKey {
        BusinessKey::new(self.order_id.clone(), self.folio.clone())
    }

    pub fn matches(&self, key: &BusinessKey) -> bool {
        self.order_id == key.order_id && self.folio == key.folio
    }
}

/// Open deliveries grouped by client account and truck load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenOrderGroup {
    pub account_id: String,
    pub load_id: String,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub deliveries: Vec<OpenDelivery>,
}

impl OpenOrderGroup {
    pub fn group_key(&self) -> (&str, &str) {
        (self.account_id.as_str(), self.load_id.as_str())
    }

    pub fn same_group(&self, other: &OpenOrderGroup) -> bool {
        self.group_key() == other.group_key()
    }
}
