//! Payloads for raising a new repair-order request.

use serde::{Deserialize, Serialize};

/// Payload for raising a new repair-order request.
///
/// Field validation (required fields, formats) happens in the frontends
/// before this is built; the backend re-validates anyway.
#[derive(Debug, Clone, Serialize)]
pub struct NewRequest {
    #[serde(rename = "claimNumber")]
    pub claim_number: String,
    #[serde(rename = "customerName")]
    pub customer_name: String,
    #[serde(rename = "customerPhone", skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    #[serde(rename = "vehiclePlate")]
    pub vehicle_plate: String,
    #[serde(rename = "vehicleModel", skip_serializing_if = "Option::is_none")]
    pub vehicle_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// Backend acknowledgement of a raised request.
#[derive(Debug, Clone, Deserialize)]
pub struct RaisedRequest {
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
    pub status: Option<String>,
}
