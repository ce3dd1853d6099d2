use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmsKind {
    Confirmation,
    Rescheduled,
    Cancelled,
}

impl SmsKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SmsKind::Confirmation => "confirmation",
            SmsKind::Rescheduled => "rescheduled",
            SmsKind::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "confirmation" => Some(SmsKind::Confirmation),
            "rescheduled" => Some(SmsKind::Rescheduled),
            "cancelled" => Some(SmsKind::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for SmsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Audit record of one outbound SMS attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsLog {
    pub id: String,
    pub appointment_id: Option<String>,
    pub phone_number: String,
    pub kind: SmsKind,
    /// `sent`, `failed` or `skipped`
    pub status: String,
    pub provider_id: Option<String>,
    pub error: Option<String>,
    pub created_at: i64,
}
