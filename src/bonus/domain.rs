use serde::{Deserialize, Serialize};

/// Fields that identify one employee and stay constant across the months of a
/// quarter. Quarter aggregation groups on these raw values exactly as the
/// roster provides them; normalization is only for table lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmployeeIdentity {
    pub city: String,
    pub name: String,
    pub role: String,
    pub admission_date: String,
    pub tenure_bucket: String,
}

/// One roster row: an employee in one month.
///
/// `monthly_target` is `None` when the spreadsheet cell is empty or not a
/// number, which makes the month ineligible. The error-rate fields keep the
/// value as entered (readings above 1 are percentages) and are only
/// meaningful for the inspector role.
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeRecord {
    pub identity: EmployeeIdentity,
    pub observation: String,
    pub monthly_target: Option<f64>,
    pub total_error_rate: f64,
    pub severe_error_rate: f64,
}

/// Computed payout for one employee over one period (a month name, or
/// `TRIMESTRE` after aggregation). Derived data only; the aggregator builds
/// new rows instead of editing these.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BonusRow {
    pub period: String,
    #[serde(flatten)]
    pub identity: EmployeeIdentity,
    pub target: f64,
    pub earned: f64,
    pub lost: f64,
    pub percent: f64,
    /// Eligibility label shown instead of a computed result; empty for
    /// eligible months. Quarter rows join distinct badges with " / ".
    pub badge: String,
    pub observation: String,
    /// Human-readable descriptions of items not fully earned, in item order.
    /// Quarter rows carry each description tagged with its month.
    pub missed_indicators: Vec<String>,
}

impl BonusRow {
    /// Zeroed row for an ineligible employee-month; it still appears in the
    /// output so the badge and observation reach the reader.
    pub(crate) fn ineligible(
        period: &str,
        identity: EmployeeIdentity,
        badge: &str,
        observation: String,
    ) -> Self {
        Self {
            period: period.to_string(),
            identity,
            target: 0.0,
            earned: 0.0,
            lost: 0.0,
            percent: 0.0,
            badge: badge.to_string(),
            observation,
            missed_indicators: Vec::new(),
        }
    }
}
