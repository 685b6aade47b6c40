//! The signed-in partner's account profile.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartnerProfile {
    #[serde(rename = "partnerId")]
    pub partner_id: Option<String>,
    #[serde(rename = "businessName")]
    pub business_name: Option<String>,
    #[serde(rename = "contactName")]
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
}

impl PartnerProfile {
    pub fn display_name(&self) -> String {
        self.business_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.contact_name.as_deref())
            .unwrap_or("Unknown partner")
            .to_string()
    }
}
