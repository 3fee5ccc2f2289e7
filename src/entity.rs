//! Platform records that parametrize views.
//!
//! These mirror what the platform's account API returns; only the fields the
//! UI layer needs are kept.

use serde::{Deserialize, Serialize};

/// A product (API service).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "id")]
    pub entity_id: u64,
    pub name: String,
    #[serde(default)]
    pub system_name: Option<String>,
}

impl Product {
    pub fn new(entity_id: u64, name: impl Into<String>) -> Self {
        Self {
            entity_id,
            name: name.into(),
            system_name: None,
        }
    }
}

/// A backend API a product routes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backend {
    #[serde(rename = "id")]
    pub entity_id: u64,
    pub name: String,
    #[serde(default)]
    pub private_endpoint: Option<String>,
}

impl Backend {
    pub fn new(entity_id: u64, name: impl Into<String>) -> Self {
        Self {
            entity_id,
            name: name.into(),
            private_endpoint: None,
        }
    }
}

/// An application plan of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationPlan {
    #[serde(rename = "id")]
    pub entity_id: u64,
    pub name: String,
}

impl ApplicationPlan {
    pub fn new(entity_id: u64, name: impl Into<String>) -> Self {
        Self {
            entity_id,
            name: name.into(),
        }
    }
}
