//! Domain models for repair-order leads.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A repair-order lead assigned to the partner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "orderId")]
    pub order_id: String,
    #[serde(rename = "claimNumber")]
    pub claim_number: Option<String>,
    #[serde(rename = "customerName")]
    pub customer_name: Option<String>,
    #[serde(rename = "customerPhone")]
    pub customer_phone: Option<String>,
    #[serde(rename = "vehiclePlate")]
    pub vehicle_plate: Option<String>,
    #[serde(rename = "vehicleModel")]
    pub vehicle_model: Option<String>,
    /// Backend status label, passed through untouched.
    pub status: Option<String>,
    #[serde(rename = "insurerName")]
    pub insurer_name: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl Order {
    /// Title for list rows: the claim number when present, else the order id.
    pub fn display_title(&self) -> &str {
        self.claim_number
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(&self.order_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderListResponse {
    #[serde(default)]
    pub orders: Vec<Order>,
}

/// Server-side filter for the order list.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<String>,
    pub search: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

impl OrderFilter {
    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(ref status) = self.status {
            pairs.push(("status", status.clone()));
        }
        if let Some(ref search) = self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(from) = self.from_date {
            pairs.push(("fromDate", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = self.to_date {
            pairs.push(("toDate", to.format("%Y-%m-%d").to_string()));
        }
        pairs
    }
}
