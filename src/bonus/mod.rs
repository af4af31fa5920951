mod aggregate;
mod calculator;
mod domain;
mod eligibility;
mod normalizer;
mod roster;
mod tables;

pub use aggregate::{aggregate_quarter, QUARTER_PERIOD};
pub use calculator::{classify_quality, QualityOutcome};
pub use domain::{BonusRow, EmployeeIdentity, EmployeeRecord};
pub use eligibility::{assess, Eligibility, NO_ELIGIBILITY_BADGE, ON_LEAVE_BADGE};
pub use normalizer::normalize_key;
pub use roster::parse_records;
pub use tables::{
    CityQualityThresholds, IndicatorCalendar, IndicatorKind, MonthFlags, QualityLimits,
    RoleRuleSet, RoleRules, SupervisorCityShares, WeightedItem, DEFAULT_QUALITY_LIMITS,
};

use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Failure loading roster or configuration sources. These abort a run before
/// any computation; everything downstream of loading is infallible.
#[derive(Debug)]
pub enum SourceError {
    Io(std::io::Error),
    Roster(csv::Error),
    Table(serde_json::Error),
    MonthNotConfigured(String),
    InlineRosterUnsupported,
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Io(err) => write!(f, "failed to read source file: {}", err),
            SourceError::Roster(err) => write!(f, "invalid roster CSV data: {}", err),
            SourceError::Table(err) => write!(f, "invalid configuration table: {}", err),
            SourceError::MonthNotConfigured(month) => {
                write!(f, "month '{}' has no indicator flags configured", month)
            }
            SourceError::InlineRosterUnsupported => {
                write!(f, "inline roster data covers a single month; quarter reports read per-month files from the data directory")
            }
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Io(err) => Some(err),
            SourceError::Roster(err) => Some(err),
            SourceError::Table(err) => Some(err),
            SourceError::MonthNotConfigured(_) | SourceError::InlineRosterUnsupported => None,
        }
    }
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for SourceError {
    fn from(err: csv::Error) -> Self {
        Self::Roster(err)
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Table(err)
    }
}

pub fn load_rules<P: AsRef<Path>>(path: P) -> Result<RoleRuleSet, SourceError> {
    let file = File::open(path)?;
    Ok(RoleRuleSet::from_reader(file)?)
}

pub fn load_calendar<P: AsRef<Path>>(path: P) -> Result<IndicatorCalendar, SourceError> {
    let file = File::open(path)?;
    Ok(IndicatorCalendar::from_reader(file)?)
}

pub fn load_roster<P: AsRef<Path>>(path: P) -> Result<Vec<EmployeeRecord>, SourceError> {
    let file = File::open(path)?;
    Ok(roster::parse_records(file)?)
}

pub fn parse_roster<R: Read>(reader: R) -> Result<Vec<EmployeeRecord>, SourceError> {
    Ok(roster::parse_records(reader)?)
}

/// Stateless computation façade over the three static tables. Tables are
/// read-only after construction; each call processes one roster snapshot.
pub struct BonusEngine {
    rules: RoleRuleSet,
    thresholds: CityQualityThresholds,
    shares: SupervisorCityShares,
}

impl BonusEngine {
    pub fn new(
        rules: RoleRuleSet,
        thresholds: CityQualityThresholds,
        shares: SupervisorCityShares,
    ) -> Self {
        Self {
            rules,
            thresholds,
            shares,
        }
    }

    /// One result row per roster row, in roster order.
    pub fn compute_month(
        &self,
        records: &[EmployeeRecord],
        flags: &MonthFlags,
        period: &str,
    ) -> Vec<BonusRow> {
        records
            .iter()
            .map(|record| {
                calculator::compute_record(
                    record,
                    &self.rules,
                    &self.thresholds,
                    &self.shares,
                    flags,
                    period,
                )
            })
            .collect()
    }

    pub fn aggregate_quarter(&self, rows: &[BonusRow]) -> Vec<BonusRow> {
        aggregate::aggregate_quarter(rows)
    }
}
