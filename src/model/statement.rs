//! Bank statement and funding position data types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Payment cadence detected for a funding position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl PaymentFrequency {
    /// Lenient parse of model output ("Daily", " weekly", "MONTHLY")
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }
}

/// Monthly metrics extracted from a single bank statement
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BankStatement {
    /// Synthesized unique id for this statement record
    pub statement_id: String,
    pub bank_name: Option<String>,
    /// Statement month as `YYYY-MM`
    pub statement_month: Option<String>,
    /// Total credits for the month
    pub credits: Option<f64>,
    /// Total debits for the month
    pub debits: Option<f64>,
    #[serde(default)]
    pub nsfs: i64,
    #[serde(default)]
    pub overdrafts: i64,
    #[serde(default)]
    pub negative_balance_days: i64,
    pub average_daily_balance: Option<f64>,
    pub deposit_count: Option<i64>,
}

/// An outstanding funding obligation observed in statement activity,
/// typically recurring withdrawals by another lender
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FundingPosition {
    pub lender_name: String,
    /// Recurring payment amount; always present and positive
    pub amount: f64,
    pub frequency: Option<PaymentFrequency>,
    /// ISO dates (`YYYY-MM-DD`) on which the payment was observed
    #[serde(default)]
    pub detected_dates: Vec<String>,
}
