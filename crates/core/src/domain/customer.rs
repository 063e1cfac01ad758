use std::fmt;

use serde::{Deserialize, Serialize};

pub const UNKNOWN_SEGMENT: &str = "unknown";

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer_id: CustomerId,
    pub segment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
}

impl CustomerProfile {
    /// Stand-in profile used whenever the directory cannot produce a record.
    pub fn unknown(customer_id: CustomerId) -> Self {
        Self { customer_id, segment: UNKNOWN_SEGMENT.to_string(), name: None, plan: None }
    }

    pub fn is_unknown(&self) -> bool {
        self.segment == UNKNOWN_SEGMENT
    }
}

#[cfg(test)]
mod tests {
    use super::{CustomerId, CustomerProfile};

    #[test]
    fn unknown_profile_keeps_requested_identifier() {
        let profile = CustomerProfile::unknown(CustomerId("9999".to_string()));

        assert_eq!(profile.customer_id.as_str(), "9999");
        assert_eq!(profile.segment, "unknown");
        assert!(profile.is_unknown());
    }

    #[test]
    fn profile_json_omits_absent_optional_fields() {
        let profile = CustomerProfile {
            customer_id: CustomerId("1001".to_string()),
            segment: "premium".to_string(),
            name: None,
            plan: Some("PremiumPlus".to_string()),
        };

        let json = serde_json::to_value(&profile).expect("serialize profile");
        assert_eq!(json["customer_id"], "1001");
        assert!(json.get("name").is_none());
        assert_eq!(json["plan"], "PremiumPlus");
    }
}
