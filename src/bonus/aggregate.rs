use std::collections::{BTreeSet, HashMap};

use super::domain::{BonusRow, EmployeeIdentity};

/// Period label carried by aggregated rows.
pub const QUARTER_PERIOD: &str = "TRIMESTRE";

#[derive(Debug, Default)]
struct QuarterAccumulator {
    target: f64,
    earned: f64,
    lost: f64,
    observations: BTreeSet<String>,
    badges: BTreeSet<String>,
    missed: BTreeSet<String>,
}

/// Combines per-month rows into one row per distinct identity. Amounts are
/// summed, the percentage recomputed from the sums, observations and badges
/// merged as deduplicated sorted joins, and each missed indicator tagged
/// with the month it occurred in.
///
/// Grouping compares the five raw identity fields exactly; rows from the
/// same person only merge when the roster spells them identically.
pub fn aggregate_quarter(rows: &[BonusRow]) -> Vec<BonusRow> {
    let mut groups: HashMap<EmployeeIdentity, QuarterAccumulator> = HashMap::new();

    for row in rows {
        let entry = groups.entry(row.identity.clone()).or_default();
        entry.target += row.target;
        entry.earned += row.earned;
        entry.lost += row.lost;
        if !row.observation.is_empty() {
            entry.observations.insert(row.observation.clone());
        }
        if !row.badge.is_empty() {
            entry.badges.insert(row.badge.clone());
        }
        for description in &row.missed_indicators {
            entry.missed.insert(format!("{description} ({})", row.period));
        }
    }

    let mut aggregated: Vec<BonusRow> = groups
        .into_iter()
        .map(|(identity, accumulator)| {
            let percent = if accumulator.target == 0.0 {
                0.0
            } else {
                accumulator.earned / accumulator.target * 100.0
            };
            BonusRow {
                period: QUARTER_PERIOD.to_string(),
                identity,
                target: accumulator.target,
                earned: accumulator.earned,
                lost: accumulator.lost,
                percent,
                badge: accumulator
                    .badges
                    .into_iter()
                    .collect::<Vec<String>>()
                    .join(" / "),
                observation: accumulator
                    .observations
                    .into_iter()
                    .collect::<Vec<String>>()
                    .join(", "),
                missed_indicators: accumulator.missed.into_iter().collect(),
            }
        })
        .collect();

    aggregated.sort_by(|a, b| {
        (
            &a.identity.city,
            &a.identity.name,
            &a.identity.role,
            &a.identity.admission_date,
            &a.identity.tenure_bucket,
        )
            .cmp(&(
                &b.identity.city,
                &b.identity.name,
                &b.identity.role,
                &b.identity.admission_date,
                &b.identity.tenure_bucket,
            ))
    });

    aggregated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(name: &str) -> EmployeeIdentity {
        EmployeeIdentity {
            city: "TIMON".to_string(),
            name: name.to_string(),
            role: "AUXILIAR".to_string(),
            admission_date: "2022-05-10".to_string(),
            tenure_bucket: "2 a 3 anos".to_string(),
        }
    }

    fn row(name: &str, period: &str, target: f64, earned: f64, lost: f64) -> BonusRow {
        BonusRow {
            period: period.to_string(),
            identity: identity(name),
            target,
            earned,
            lost,
            percent: if target == 0.0 { 0.0 } else { earned / target * 100.0 },
            badge: String::new(),
            observation: String::new(),
            missed_indicators: Vec::new(),
        }
    }

    #[test]
    fn single_month_aggregation_is_an_identity_on_sums() {
        let monthly = row("HELENA", "OUTUBRO", 450.0, 300.0, 150.0);
        let aggregated = aggregate_quarter(std::slice::from_ref(&monthly));

        assert_eq!(aggregated.len(), 1);
        let quarter = &aggregated[0];
        assert_eq!(quarter.period, QUARTER_PERIOD);
        assert_eq!(quarter.target, monthly.target);
        assert_eq!(quarter.earned, monthly.earned);
        assert_eq!(quarter.lost, monthly.lost);
        assert_eq!(quarter.percent, monthly.percent);
    }

    #[test]
    fn months_sum_and_percent_recomputes() {
        let rows = vec![
            row("HELENA", "OUTUBRO", 450.0, 450.0, 0.0),
            row("HELENA", "NOVEMBRO", 450.0, 225.0, 225.0),
            row("HELENA", "DEZEMBRO", 450.0, 0.0, 450.0),
        ];
        let aggregated = aggregate_quarter(&rows);

        assert_eq!(aggregated.len(), 1);
        let quarter = &aggregated[0];
        assert_eq!(quarter.target, 1350.0);
        assert_eq!(quarter.earned, 675.0);
        assert_eq!(quarter.lost, 675.0);
        assert!((quarter.percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn missed_indicators_are_month_tagged_and_deduplicated() {
        let mut october = row("HELENA", "OUTUBRO", 450.0, 300.0, 150.0);
        october.missed_indicators = vec!["Qualidade".to_string(), "Qualidade".to_string()];
        let mut november = row("HELENA", "NOVEMBRO", 450.0, 300.0, 150.0);
        november.missed_indicators = vec!["Lucratividade".to_string()];

        let aggregated = aggregate_quarter(&[october, november]);

        assert_eq!(
            aggregated[0].missed_indicators,
            ["Lucratividade (NOVEMBRO)", "Qualidade (OUTUBRO)"]
        );
    }

    #[test]
    fn badges_and_observations_merge_deduplicated() {
        let mut october = row("HELENA", "OUTUBRO", 0.0, 0.0, 0.0);
        october.badge = "Licença no mês".to_string();
        october.observation = "licença".to_string();
        let mut november = row("HELENA", "NOVEMBRO", 0.0, 0.0, 0.0);
        november.badge = "Licença no mês".to_string();
        let mut december = row("HELENA", "DEZEMBRO", 0.0, 0.0, 0.0);
        december.badge = "Sem elegibilidade no mês".to_string();

        let aggregated = aggregate_quarter(&[october, november, december]);

        assert_eq!(aggregated.len(), 1);
        assert_eq!(
            aggregated[0].badge,
            "Licença no mês / Sem elegibilidade no mês"
        );
        assert_eq!(aggregated[0].observation, "licença");
        assert_eq!(aggregated[0].percent, 0.0);
    }

    #[test]
    fn identities_differing_in_any_raw_field_stay_separate() {
        let first = row("HELENA", "OUTUBRO", 450.0, 450.0, 0.0);
        let mut second = row("HELENA", "NOVEMBRO", 450.0, 450.0, 0.0);
        second.identity.tenure_bucket = "3 a 4 anos".to_string();

        let aggregated = aggregate_quarter(&[first, second]);
        assert_eq!(aggregated.len(), 2);
    }

    #[test]
    fn output_is_sorted_by_identity() {
        let mut zara = row("ZARA", "OUTUBRO", 100.0, 100.0, 0.0);
        zara.identity.city = "CAROLINA".to_string();
        let ana = row("ANA", "OUTUBRO", 100.0, 100.0, 0.0);

        let aggregated = aggregate_quarter(&[zara, ana]);
        assert_eq!(aggregated[0].identity.city, "CAROLINA");
        assert_eq!(aggregated[1].identity.name, "ANA");
    }
}
