//! Normalization of model JSON replies into typed extraction outcomes
//!
//! Model output is treated as untrusted: fields may be missing, numbers
//! may arrive as "$3,000" strings, booleans as "yes"/"no". Everything
//! lenient lives here so the rest of the crate sees clean types.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde_json::Value;
use uuid::Uuid;

use crate::model::{
    BankStatement, DealConfidence, DealExtraction, DealOwner, DealProfile, FundingPosition,
    LoanType, PaymentFrequency, StatementConfidence, StatementExtraction,
};

use super::ExtractionOutcome;

const MAX_OWNERS: usize = 2;

impl ExtractionOutcome for StatementExtraction {
    fn from_model_value(value: Value) -> Self {
        let statements = value
            .get("statements")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(parse_statement).collect())
            .unwrap_or_default();

        Self {
            statements,
            funding_positions: parse_funding_positions(value.get("fundingPositions")),
            confidence: StatementConfidence {
                statements: confidence_scores(value.pointer("/confidence/statements")),
            },
            warnings: value.get("warnings").map(string_array).unwrap_or_default(),
        }
    }

    fn push_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    fn dedup_warnings(&mut self) {
        dedup_preserving_order(&mut self.warnings);
    }

    fn merge(&mut self, other: Self) {
        self.statements.extend(other.statements);
        self.funding_positions.extend(other.funding_positions);
        self.confidence.statements.extend(other.confidence.statements);
        self.warnings.extend(other.warnings);
    }
}

impl ExtractionOutcome for DealExtraction {
    fn from_model_value(value: Value) -> Self {
        // Some model replies name the profile block "deal_information"
        let deal = parse_deal(value.get("deal").or_else(|| value.get("deal_information")));

        let owners = value
            .get("owners")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(parse_owner).collect())
            .unwrap_or_default();

        let statements = value
            .get("statements")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(parse_statement).collect())
            .unwrap_or_default();

        Self {
            deal,
            owners,
            statements,
            funding_positions: parse_funding_positions(value.get("fundingPositions")),
            confidence: DealConfidence {
                deal: value
                    .pointer("/confidence/deal")
                    .and_then(as_lenient_number)
                    .map(|n| n.clamp(0.0, 100.0))
                    .unwrap_or(0.0),
                owners: confidence_scores(value.pointer("/confidence/owners")),
                statements: confidence_scores(value.pointer("/confidence/statements")),
            },
            // Recomputed by finalize() once every file has been merged
            missing_fields: Vec::new(),
            warnings: value.get("warnings").map(string_array).unwrap_or_default(),
            documents_folder: None,
            log_id: None,
        }
    }

    fn push_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    fn dedup_warnings(&mut self) {
        dedup_preserving_order(&mut self.warnings);
    }

    fn merge(&mut self, other: Self) {
        self.deal.merge_missing(other.deal);

        for owner in other.owners {
            if self.owners.len() >= MAX_OWNERS {
                break;
            }
            let duplicate = match owner.identity_key() {
                Some(key) => self
                    .owners
                    .iter()
                    .any(|existing| existing.identity_key().as_deref() == Some(key.as_str())),
                None => false,
            };
            if !duplicate {
                self.owners.push(owner);
            }
        }
        for (idx, owner) in self.owners.iter_mut().enumerate() {
            owner.owner_number = idx as u8 + 1;
        }

        self.statements.extend(other.statements);
        self.funding_positions.extend(other.funding_positions);
        self.confidence.deal = self.confidence.deal.max(other.confidence.deal);
        self.confidence.owners.extend(other.confidence.owners);
        self.confidence.statements.extend(other.confidence.statements);
        self.warnings.extend(other.warnings);
    }

    fn finalize(&mut self) {
        self.missing_fields = self.deal.missing_critical_fields(&self.owners);
    }
}

fn parse_statement(value: &Value) -> BankStatement {
    BankStatement {
        statement_id: string_field(value, "statement_id")
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        bank_name: string_field(value, "bank_name"),
        statement_month: string_field(value, "statement_month"),
        credits: number_field(value, "credits"),
        debits: number_field(value, "debits"),
        nsfs: count_field(value, "nsfs"),
        overdrafts: count_field(value, "overdrafts"),
        negative_balance_days: count_field(value, "negative_balance_days"),
        average_daily_balance: number_field(value, "average_daily_balance"),
        deposit_count: number_field(value, "deposit_count").map(|n| n.round() as i64),
    }
}

fn parse_funding_positions(value: Option<&Value>) -> Vec<FundingPosition> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut positions = Vec::new();
    for item in items {
        let Some(lender_name) = string_field(item, "lender_name") else {
            tracing::debug!("Dropping funding position without a lender name");
            continue;
        };
        // Positions are only actionable with a concrete payment amount
        let Some(amount) = number_field(item, "amount").filter(|a| *a > 0.0) else {
            tracing::debug!(lender = %lender_name, "Dropping funding position without an amount");
            continue;
        };

        positions.push(FundingPosition {
            lender_name,
            amount,
            frequency: string_field(item, "frequency")
                .and_then(|f| PaymentFrequency::parse(&f)),
            detected_dates: item
                .get("detected_dates")
                .map(valid_dates)
                .unwrap_or_default(),
        });
    }

    collapse_funding_positions(positions)
}

/// Collapse duplicate positions per document: one entry per distinct
/// (lender, amount) pair, detected dates merged, first-seen order kept.
pub fn collapse_funding_positions(positions: Vec<FundingPosition>) -> Vec<FundingPosition> {
    let mut collapsed: Vec<FundingPosition> = Vec::with_capacity(positions.len());

    for position in positions {
        let key = position_key(&position);
        match collapsed.iter_mut().find(|p| position_key(p) == key) {
            Some(existing) => {
                for date in position.detected_dates {
                    if !existing.detected_dates.contains(&date) {
                        existing.detected_dates.push(date);
                    }
                }
                if existing.frequency.is_none() {
                    existing.frequency = position.frequency;
                }
            }
            None => collapsed.push(position),
        }
    }

    collapsed
}

/// Lender is matched case-insensitively; the amount in cents sidesteps
/// float comparison noise
fn position_key(position: &FundingPosition) -> (String, i64) {
    (
        position.lender_name.trim().to_lowercase(),
        (position.amount * 100.0).round() as i64,
    )
}

fn parse_deal(value: Option<&Value>) -> DealProfile {
    let Some(obj) = value.filter(|v| v.is_object()) else {
        return DealProfile::default();
    };

    DealProfile {
        legal_business_name: string_field(obj, "legal_business_name"),
        dba_name: string_field(obj, "dba_name"),
        ein: string_field(obj, "ein"),
        business_type: string_field(obj, "business_type"),
        address: string_field(obj, "address"),
        city: string_field(obj, "city"),
        state: string_field(obj, "state"),
        zip: string_field(obj, "zip"),
        phone: string_field(obj, "phone"),
        website: string_field(obj, "website"),
        franchise_business: bool_field(obj, "franchise_business"),
        seasonal_business: bool_field(obj, "seasonal_business"),
        peak_sales_month: string_field(obj, "peak_sales_month"),
        business_start_date: string_field(obj, "business_start_date"),
        product_service_sold: string_field(obj, "product_service_sold"),
        franchise_units_percent: number_field(obj, "franchise_units_percent"),
        average_monthly_sales: number_field(obj, "average_monthly_sales"),
        average_monthly_card_sales: number_field(obj, "average_monthly_card_sales"),
        desired_loan_amount: number_field(obj, "desired_loan_amount"),
        reason_for_loan: string_field(obj, "reason_for_loan"),
        loan_type: parse_loan_type(obj.get("loan_type")),
    }
}

fn parse_owner(value: &Value) -> DealOwner {
    DealOwner {
        owner_number: number_field(value, "owner_number")
            .and_then(|n| u8::try_from(n.round() as i64).ok())
            .unwrap_or(0),
        full_name: string_field(value, "full_name"),
        street_address: string_field(value, "street_address"),
        city: string_field(value, "city"),
        state: string_field(value, "state"),
        zip: string_field(value, "zip"),
        phone: string_field(value, "phone"),
        email: string_field(value, "email"),
        ownership_percent: number_field(value, "ownership_percent"),
        drivers_license_number: string_field(value, "drivers_license_number"),
        date_of_birth: string_field(value, "date_of_birth"),
    }
}

fn parse_loan_type(value: Option<&Value>) -> Option<LoanType> {
    let raw = value?.as_str()?;
    match raw.trim().to_lowercase().as_str() {
        "mca" | "merchant cash advance" => Some(LoanType::Mca),
        "business loc" | "line of credit" | "loc" => Some(LoanType::BusinessLoc),
        _ => None,
    }
}

/// String field, tolerating bare numbers (zip codes, EINs)
fn string_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numeric field, tolerating formatted strings like "$45,210.55" or "25%"
fn number_field(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(as_lenient_number)
}

fn as_lenient_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !matches!(c, '$' | ',' | '%') && !c.is_whitespace())
                .collect();
            cleaned.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}

/// Count field: missing, null or negative all normalize to 0
fn count_field(value: &Value, key: &str) -> i64 {
    number_field(value, key)
        .map(|n| n.round() as i64)
        .map(|n| n.max(0))
        .unwrap_or(0)
}

fn bool_field(value: &Value, key: &str) -> Option<bool> {
    match value.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "yes" | "true" | "y" => Some(true),
            "no" | "false" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn string_array(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn confidence_scores(value: Option<&Value>) -> Vec<f64> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(as_lenient_number)
                .map(|n| n.clamp(0.0, 100.0))
                .collect()
        })
        .unwrap_or_default()
}

fn valid_dates(value: &Value) -> Vec<String> {
    string_array(value)
        .into_iter()
        .filter(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok())
        .collect()
}

/// Set-style dedup keeping the first occurrence of each warning
pub fn dedup_preserving_order(warnings: &mut Vec<String>) {
    let mut seen = HashSet::new();
    warnings.retain(|warning| seen.insert(warning.clone()));
}
