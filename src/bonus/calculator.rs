use super::domain::{BonusRow, EmployeeRecord};
use super::eligibility::{self, Eligibility};
use super::normalizer::{display_text, normalize_key, title_case};
use super::tables::{
    CityQualityThresholds, IndicatorKind, MonthFlags, QualityLimits, RoleRuleSet,
    SupervisorCityShares,
};

const SUPERVISOR_ROLE: &str = "SUPERVISOR";
const INSPECTOR_ROLE: &str = "VISTORIADOR";

const QUALITY_FLAG: &str = "qualidade";
const FINANCIAL_FLAG: &str = "financeiro";
const STORE_ORGANIZATION_FLAG: &str = "organizacao_da_loja";
const LEADERSHIP_FLAG: &str = "Liderança & Organização";

/// Outcome of the inspector quality rule for one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityOutcome {
    /// Both error rates within their ceilings; full parcel earned.
    Full,
    /// Exactly one ceiling exceeded; half the parcel earned, half lost.
    Half,
    /// Both ceilings exceeded; whole parcel lost.
    Zero,
}

pub fn classify_quality(total_rate: f64, severe_rate: f64, limits: QualityLimits) -> QualityOutcome {
    let total_ok = total_rate <= limits.total;
    let severe_ok = severe_rate <= limits.severe;
    match (total_ok, severe_ok) {
        (true, true) => QualityOutcome::Full,
        (false, false) => QualityOutcome::Zero,
        _ => QualityOutcome::Half,
    }
}

/// Spreadsheet percentage cells arrive either as fractions (0.035) or as
/// percent readings (3.5); anything above 1 is read as a percentage.
fn percent_fraction(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    if value > 1.0 {
        value / 100.0
    } else {
        value
    }
}

fn fmt_pct(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

/// Computes one employee-month. Never fails: ineligible months short-circuit
/// to a zeroed badge row and malformed numerics were already coerced upstream.
pub(crate) fn compute_record(
    record: &EmployeeRecord,
    rules: &RoleRuleSet,
    thresholds: &CityQualityThresholds,
    shares: &SupervisorCityShares,
    flags: &MonthFlags,
    period: &str,
) -> BonusRow {
    let observation = display_text(&record.observation);

    if let Eligibility::Ineligible { badge } =
        eligibility::assess(record.monthly_target, &record.observation)
    {
        return BonusRow::ineligible(period, record.identity.clone(), badge, observation);
    }

    let role_key = normalize_key(&record.identity.role);
    let city_key = normalize_key(&record.identity.city);

    let role_rules = rules.get(&record.identity.role);
    // Unconfigured roles fall back to the record's own stated target with an
    // empty item list, so the row shows the target at 0% achieved.
    let target = role_rules
        .and_then(|rules| rules.total)
        .or(record.monthly_target)
        .unwrap_or(0.0);

    let mut earned = 0.0;
    let mut lost = 0.0;
    let mut missed: Vec<String> = Vec::new();

    for item in role_rules.map(|rules| rules.items.as_slice()).unwrap_or(&[]) {
        let parcel = target * item.weight;

        match item.kind {
            IndicatorKind::Production => {
                let split = if role_key == SUPERVISOR_ROLE {
                    shares.shares_for(&record.identity.name)
                } else {
                    None
                };

                match split {
                    Some(cities) => {
                        let weight_sum: f64 = cities.iter().map(|(_, weight)| weight).sum();
                        let weight_sum = if weight_sum == 0.0 { 1.0 } else { weight_sum };
                        let mut missed_cities: Vec<String> = Vec::new();
                        for (city, weight) in cities {
                            let slice = parcel * (weight / weight_sum);
                            if flags.production_hit(city) {
                                earned += slice;
                            } else {
                                lost += slice;
                                missed_cities.push(title_case(city));
                            }
                        }
                        if !missed_cities.is_empty() {
                            missed.push(format!("Produção – {}", missed_cities.join(", ")));
                        }
                    }
                    None => {
                        if flags.production_hit(&city_key) {
                            earned += parcel;
                        } else {
                            lost += parcel;
                            let city_label = if record.identity.city.trim().is_empty() {
                                "Cidade não informada".to_string()
                            } else {
                                title_case(&record.identity.city)
                            };
                            missed.push(format!("Produção – {city_label}"));
                        }
                    }
                }
            }
            IndicatorKind::Quality => {
                if role_key == INSPECTOR_ROLE {
                    let total_rate = percent_fraction(record.total_error_rate);
                    let severe_rate = percent_fraction(record.severe_error_rate);
                    let limits = thresholds.limits_for(&record.identity.city);

                    match classify_quality(total_rate, severe_rate, limits) {
                        QualityOutcome::Full => earned += parcel,
                        QualityOutcome::Half => {
                            earned += parcel * 0.5;
                            lost += parcel * 0.5;
                            missed.push(quality_message("50%", total_rate, severe_rate, limits));
                        }
                        QualityOutcome::Zero => {
                            lost += parcel;
                            missed.push(quality_message("0%", total_rate, severe_rate, limits));
                        }
                    }
                } else if flags.flag(QUALITY_FLAG) {
                    earned += parcel;
                } else {
                    lost += parcel;
                    missed.push("Qualidade".to_string());
                }
            }
            IndicatorKind::Profitability => {
                if flags.flag(FINANCIAL_FLAG) {
                    earned += parcel;
                } else {
                    lost += parcel;
                    missed.push("Lucratividade".to_string());
                }
            }
            IndicatorKind::StoreOrganization => {
                if flags.flag(STORE_ORGANIZATION_FLAG) {
                    earned += parcel;
                } else {
                    lost += parcel;
                    missed.push("Organização da Loja 5s".to_string());
                }
            }
            IndicatorKind::LeadershipOrganization => {
                if flags.flag(LEADERSHIP_FLAG) {
                    earned += parcel;
                } else {
                    lost += parcel;
                    missed.push("Liderança & Organização".to_string());
                }
            }
            IndicatorKind::Unconditional => earned += parcel,
        }
    }

    let percent = if target == 0.0 {
        0.0
    } else {
        earned / target * 100.0
    };

    BonusRow {
        period: period.to_string(),
        identity: record.identity.clone(),
        target,
        earned,
        lost,
        percent,
        badge: String::new(),
        observation,
        missed_indicators: missed,
    }
}

fn quality_message(share: &str, total_rate: f64, severe_rate: f64, limits: QualityLimits) -> String {
    format!(
        "Qualidade ({share}) — total {} | graves {} (meta: {} / {})",
        fmt_pct(total_rate),
        fmt_pct(severe_rate),
        fmt_pct(limits.total),
        fmt_pct(limits.severe)
    )
}
