//! Merchant deal profile and owner data types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Funding product requested by the merchant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum LoanType {
    #[serde(rename = "MCA")]
    Mca,
    #[serde(rename = "Business LOC")]
    BusinessLoc,
}

/// Business profile assembled from application and supporting documents.
/// Every field is optional; extraction fills what the documents support.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DealProfile {
    pub legal_business_name: Option<String>,
    pub dba_name: Option<String>,
    pub ein: Option<String>,
    pub business_type: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub franchise_business: Option<bool>,
    pub seasonal_business: Option<bool>,
    pub peak_sales_month: Option<String>,
    pub business_start_date: Option<String>,
    pub product_service_sold: Option<String>,
    pub franchise_units_percent: Option<f64>,
    pub average_monthly_sales: Option<f64>,
    pub average_monthly_card_sales: Option<f64>,
    pub desired_loan_amount: Option<f64>,
    pub reason_for_loan: Option<String>,
    pub loan_type: Option<LoanType>,
}

impl DealProfile {
    /// Fill still-empty fields from a later extraction; earlier values win
    pub fn merge_missing(&mut self, other: DealProfile) {
        merge_field(&mut self.legal_business_name, other.legal_business_name);
        merge_field(&mut self.dba_name, other.dba_name);
        merge_field(&mut self.ein, other.ein);
        merge_field(&mut self.business_type, other.business_type);
        merge_field(&mut self.address, other.address);
        merge_field(&mut self.city, other.city);
        merge_field(&mut self.state, other.state);
        merge_field(&mut self.zip, other.zip);
        merge_field(&mut self.phone, other.phone);
        merge_field(&mut self.website, other.website);
        merge_field(&mut self.franchise_business, other.franchise_business);
        merge_field(&mut self.seasonal_business, other.seasonal_business);
        merge_field(&mut self.peak_sales_month, other.peak_sales_month);
        merge_field(&mut self.business_start_date, other.business_start_date);
        merge_field(&mut self.product_service_sold, other.product_service_sold);
        merge_field(
            &mut self.franchise_units_percent,
            other.franchise_units_percent,
        );
        merge_field(&mut self.average_monthly_sales, other.average_monthly_sales);
        merge_field(
            &mut self.average_monthly_card_sales,
            other.average_monthly_card_sales,
        );
        merge_field(&mut self.desired_loan_amount, other.desired_loan_amount);
        merge_field(&mut self.reason_for_loan, other.reason_for_loan);
        merge_field(&mut self.loan_type, other.loan_type);
    }

    /// Underwriting-critical fields still missing after aggregation
    pub fn missing_critical_fields(&self, owners: &[DealOwner]) -> Vec<String> {
        let mut missing = Vec::new();
        if is_blank(&self.legal_business_name) {
            missing.push("legal_business_name".to_string());
        }
        if is_blank(&self.ein) {
            missing.push("ein".to_string());
        }
        if is_blank(&self.address) {
            missing.push("address".to_string());
        }
        if is_blank(&self.phone) {
            missing.push("phone".to_string());
        }
        if self.desired_loan_amount.is_none() {
            missing.push("desired_loan_amount".to_string());
        }
        if !owners.iter().any(|o| !is_blank(&o.full_name)) {
            missing.push("owner_full_name".to_string());
        }
        missing
    }
}

/// Individual owner listed on the deal, at most two per merchant
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DealOwner {
    #[serde(default)]
    pub owner_number: u8,
    pub full_name: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub ownership_percent: Option<f64>,
    pub drivers_license_number: Option<String>,
    pub date_of_birth: Option<String>,
}

impl DealOwner {
    /// Case-folded name used to spot the same owner across documents
    pub fn identity_key(&self) -> Option<String> {
        self.full_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_lowercase)
    }
}

fn merge_field<T>(current: &mut Option<T>, incoming: Option<T>) {
    if current.is_none() {
        *current = incoming;
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_earlier_values() {
        let mut first = DealProfile {
            legal_business_name: Some("Riverside Diner LLC".to_string()),
            desired_loan_amount: None,
            ..DealProfile::default()
        };
        let second = DealProfile {
            legal_business_name: Some("Other Name".to_string()),
            desired_loan_amount: Some(75000.0),
            ein: Some("12-3456789".to_string()),
            ..DealProfile::default()
        };

        first.merge_missing(second);

        assert_eq!(
            first.legal_business_name.as_deref(),
            Some("Riverside Diner LLC")
        );
        assert_eq!(first.desired_loan_amount, Some(75000.0));
        assert_eq!(first.ein.as_deref(), Some("12-3456789"));
    }

    #[test]
    fn test_missing_critical_fields() {
        let profile = DealProfile {
            legal_business_name: Some("Riverside Diner LLC".to_string()),
            phone: Some("  ".to_string()),
            ..DealProfile::default()
        };
        let missing = profile.missing_critical_fields(&[]);

        assert!(!missing.contains(&"legal_business_name".to_string()));
        assert!(missing.contains(&"ein".to_string()));
        assert!(missing.contains(&"phone".to_string()));
        assert!(missing.contains(&"desired_loan_amount".to_string()));
        assert!(missing.contains(&"owner_full_name".to_string()));
    }

    #[test]
    fn test_owner_identity_key_folds_case() {
        let owner = DealOwner {
            full_name: Some("  Jane Q. Merchant ".to_string()),
            ..DealOwner::default()
        };
        assert_eq!(owner.identity_key().as_deref(), Some("jane q. merchant"));

        let nameless = DealOwner::default();
        assert!(nameless.identity_key().is_none());
    }

    #[test]
    fn test_loan_type_wire_values() {
        assert_eq!(serde_json::to_string(&LoanType::Mca).unwrap(), "\"MCA\"");
        assert_eq!(
            serde_json::to_string(&LoanType::BusinessLoc).unwrap(),
            "\"Business LOC\""
        );
        let parsed: LoanType = serde_json::from_str("\"Business LOC\"").unwrap();
        assert_eq!(parsed, LoanType::BusinessLoc);
    }
}
