use std::collections::HashMap;
use std::io::Read;

use serde::Deserialize;
use serde_json::Value;

use super::normalizer::normalize_key;

/// How a weighted target item participates in the payout. Labels are
/// classified once when the rule set loads, so per-record dispatch is an
/// exhaustive match instead of repeated substring scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorKind {
    Production,
    Quality,
    Profitability,
    StoreOrganization,
    LeadershipOrganization,
    /// Items the company does not track centrally; always credited.
    Unconditional,
}

impl IndicatorKind {
    /// Match precedence follows the source data conventions: production
    /// items are prefixed, quality and profitability are exact labels, the
    /// organization pair match on tokens.
    pub(crate) fn classify(normalized_label: &str) -> Self {
        if normalized_label.starts_with("PRODUCAO") {
            return Self::Production;
        }
        if normalized_label == "QUALIDADE" {
            return Self::Quality;
        }
        if normalized_label == "LUCRATIVIDADE" {
            return Self::Profitability;
        }
        if normalized_label.contains("ORGANIZACAO DA LOJA") {
            return Self::StoreOrganization;
        }
        if normalized_label.contains("LIDERANCA") && normalized_label.contains("ORGANIZACAO") {
            return Self::LeadershipOrganization;
        }
        Self::Unconditional
    }
}

/// One weighted item of a role's target composition.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedItem {
    pub label: String,
    pub weight: f64,
    pub kind: IndicatorKind,
}

/// Target composition for one role. `total` is absent when the table omits
/// it; the calculator then falls back to the record's own monthly target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleRules {
    pub total: Option<f64>,
    pub items: Vec<WeightedItem>,
}

#[derive(Debug, Deserialize)]
struct RoleRulesRaw {
    #[serde(default)]
    total: Option<Value>,
    #[serde(default)]
    metas: serde_json::Map<String, Value>,
}

/// Per-role weighted targets, keyed by normalized role name. Loaded once per
/// run from `pesos_log.json`; read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct RoleRuleSet {
    roles: HashMap<String, RoleRules>,
}

impl RoleRuleSet {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, serde_json::Error> {
        let raw: HashMap<String, RoleRulesRaw> = serde_json::from_reader(reader)?;
        Ok(Self::from_raw(raw))
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let parsed: HashMap<String, RoleRulesRaw> = serde_json::from_str(raw)?;
        Ok(Self::from_raw(parsed))
    }

    fn from_raw(raw: HashMap<String, RoleRulesRaw>) -> Self {
        let mut roles = HashMap::with_capacity(raw.len());
        for (role, rules) in raw {
            // `metas` is a preserve_order map, so item order stays the
            // configuration insertion order.
            let items = rules
                .metas
                .iter()
                .map(|(label, weight)| WeightedItem {
                    label: label.clone(),
                    weight: weight.as_f64().unwrap_or(0.0),
                    kind: IndicatorKind::classify(&normalize_key(label)),
                })
                .collect();
            roles.insert(
                normalize_key(&role),
                RoleRules {
                    total: rules.total.as_ref().and_then(Value::as_f64),
                    items,
                },
            );
        }
        Self { roles }
    }

    pub fn get(&self, role: &str) -> Option<&RoleRules> {
        self.roles.get(&normalize_key(role))
    }

    pub fn insert(&mut self, role: &str, rules: RoleRules) {
        self.roles.insert(normalize_key(role), rules);
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

/// Error-rate ceilings for the inspector quality rule, both fractions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityLimits {
    pub total: f64,
    pub severe: f64,
}

/// Applied when a city has no entry of its own.
pub const DEFAULT_QUALITY_LIMITS: QualityLimits = QualityLimits {
    total: 0.035,
    severe: 0.015,
};

/// Quality ceilings per normalized city name, with a global fallback.
#[derive(Debug, Clone, Default)]
pub struct CityQualityThresholds {
    cities: HashMap<String, QualityLimits>,
}

impl CityQualityThresholds {
    /// The operation's standing table: 3.5%/1.5% in the capital-tier cities,
    /// 5%/2% elsewhere.
    pub fn builtin() -> Self {
        let mut table = Self::default();
        table.set("AÇAILÂNDIA", QualityLimits { total: 0.035, severe: 0.015 });
        table.set("CAROLINA", QualityLimits { total: 0.05, severe: 0.02 });
        table.set("PRESIDENTE DUTRA", QualityLimits { total: 0.05, severe: 0.02 });
        table.set("SÃO LUÍS", QualityLimits { total: 0.035, severe: 0.015 });
        table.set("TIMON", QualityLimits { total: 0.05, severe: 0.02 });
        table
    }

    pub fn set(&mut self, city: &str, limits: QualityLimits) {
        self.cities.insert(normalize_key(city), limits);
    }

    pub fn limits_for(&self, city: &str) -> QualityLimits {
        self.cities
            .get(&normalize_key(city))
            .copied()
            .unwrap_or(DEFAULT_QUALITY_LIMITS)
    }
}

/// A supervisor's fractional responsibility for production targets across
/// several cities. Entries keep their configured order; weights are relative
/// and get renormalized by their own sum when applied.
#[derive(Debug, Clone, Default)]
pub struct SupervisorCityShares {
    supervisors: HashMap<String, Vec<(String, f64)>>,
}

impl SupervisorCityShares {
    /// Static assignment table maintained with the operations team.
    pub fn builtin() -> Self {
        let mut table = Self::default();
        table.assign(
            "MARTA OLIVEIRA COSTA RAMOS",
            &[("SÃO LUÍS", 0.10), ("CAROLINA", 0.10)],
        );
        table.assign(
            "ELEILSON DE SOUSA ADELINO",
            &[
                ("TIMON", 0.0666),
                ("PRESIDENTE DUTRA", 0.0666),
                ("AÇAILÂNDIA", 0.0666),
            ],
        );
        table
    }

    pub fn assign(&mut self, supervisor: &str, cities: &[(&str, f64)]) {
        let shares = cities
            .iter()
            .map(|(city, weight)| (normalize_key(city), *weight))
            .collect();
        self.supervisors.insert(normalize_key(supervisor), shares);
    }

    /// Shares for a supervisor, keyed lookup by normalized name. Cities in
    /// the returned slice are already normalized.
    pub fn shares_for(&self, supervisor: &str) -> Option<&[(String, f64)]> {
        self.supervisors
            .get(&normalize_key(supervisor))
            .map(Vec::as_slice)
    }
}

/// Company-wide pass/fail flags for one month: indicator flags keyed by
/// normalized label, plus the per-city production map. Absent entries count
/// as passed.
#[derive(Debug, Clone, Default)]
pub struct MonthFlags {
    flags: HashMap<String, bool>,
    production_by_city: HashMap<String, bool>,
}

impl MonthFlags {
    pub fn flag(&self, label: &str) -> bool {
        self.flags
            .get(&normalize_key(label))
            .copied()
            .unwrap_or(true)
    }

    /// Whether the city met its production target. `city` must already be
    /// normalized; unknown cities default to met.
    pub fn production_hit(&self, city: &str) -> bool {
        self.production_by_city.get(city).copied().unwrap_or(true)
    }

    pub fn set_flag(&mut self, label: &str, passed: bool) {
        self.flags.insert(normalize_key(label), passed);
    }

    pub fn set_production(&mut self, city: &str, hit: bool) {
        self.production_by_city.insert(normalize_key(city), hit);
    }
}

#[derive(Debug, Deserialize)]
struct MonthFlagsRaw {
    #[serde(default)]
    producao_por_cidade: HashMap<String, bool>,
    #[serde(flatten)]
    flags: HashMap<String, Value>,
}

/// All months' indicator flags, loaded once per run from
/// `empresa_indicadores_log.json` and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct IndicatorCalendar {
    months: HashMap<String, MonthFlags>,
}

impl IndicatorCalendar {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, serde_json::Error> {
        let raw: HashMap<String, MonthFlagsRaw> = serde_json::from_reader(reader)?;
        Ok(Self::from_raw(raw))
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let parsed: HashMap<String, MonthFlagsRaw> = serde_json::from_str(raw)?;
        Ok(Self::from_raw(parsed))
    }

    fn from_raw(raw: HashMap<String, MonthFlagsRaw>) -> Self {
        let mut months = HashMap::with_capacity(raw.len());
        for (month, entry) in raw {
            let mut flags = MonthFlags::default();
            for (label, value) in &entry.flags {
                // Tolerate stray non-boolean keys in the table.
                if let Some(passed) = value.as_bool() {
                    flags.set_flag(label, passed);
                }
            }
            for (city, hit) in &entry.producao_por_cidade {
                flags.set_production(city, *hit);
            }
            months.insert(normalize_key(&month), flags);
        }
        Self { months }
    }

    pub fn insert(&mut self, month: &str, flags: MonthFlags) {
        self.months.insert(normalize_key(month), flags);
    }

    pub fn month(&self, name: &str) -> Option<&MonthFlags> {
        self.months.get(&normalize_key(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_recognizes_each_indicator_family() {
        assert_eq!(
            IndicatorKind::classify(&normalize_key("Produção")),
            IndicatorKind::Production
        );
        assert_eq!(
            IndicatorKind::classify(&normalize_key("Produção São Luís")),
            IndicatorKind::Production
        );
        assert_eq!(
            IndicatorKind::classify(&normalize_key("Qualidade")),
            IndicatorKind::Quality
        );
        assert_eq!(
            IndicatorKind::classify(&normalize_key("Lucratividade")),
            IndicatorKind::Profitability
        );
        assert_eq!(
            IndicatorKind::classify(&normalize_key("Organização da Loja 5s")),
            IndicatorKind::StoreOrganization
        );
        assert_eq!(
            IndicatorKind::classify(&normalize_key("Liderança & Organização")),
            IndicatorKind::LeadershipOrganization
        );
        assert_eq!(
            IndicatorKind::classify(&normalize_key("Assiduidade")),
            IndicatorKind::Unconditional
        );
    }

    #[test]
    fn rule_set_parses_items_in_configured_order() {
        let rules = RoleRuleSet::from_json(
            r#"{
                "Vistoriador": {
                    "total": 500,
                    "metas": {
                        "Produção": 0.4,
                        "Qualidade": 0.4,
                        "Assiduidade": 0.2
                    }
                }
            }"#,
        )
        .expect("valid rules json");

        let entry = rules.get("VISTORIADOR").expect("role present");
        assert_eq!(entry.total, Some(500.0));
        let labels: Vec<&str> = entry.items.iter().map(|item| item.label.as_str()).collect();
        assert_eq!(labels, ["Produção", "Qualidade", "Assiduidade"]);
        assert_eq!(entry.items[2].kind, IndicatorKind::Unconditional);

        // Accent and case differences on the lookup side resolve to the
        // same entry.
        assert!(rules.get("vistoriador").is_some());
    }

    #[test]
    fn rule_set_coerces_malformed_numbers_to_zero() {
        let rules = RoleRuleSet::from_json(
            r#"{"Auxiliar": {"total": "n/a", "metas": {"Produção": "x"}}}"#,
        )
        .expect("parses despite junk values");
        let entry = rules.get("Auxiliar").expect("role present");
        assert_eq!(entry.total, None);
        assert_eq!(entry.items[0].weight, 0.0);
    }

    #[test]
    fn thresholds_fall_back_to_global_default() {
        let table = CityQualityThresholds::builtin();
        assert_eq!(table.limits_for("São Luís").total, 0.035);
        assert_eq!(table.limits_for("sao luis").severe, 0.015);
        assert_eq!(table.limits_for("TIMON").total, 0.05);
        let fallback = table.limits_for("Cidade Nova");
        assert_eq!(fallback.total, DEFAULT_QUALITY_LIMITS.total);
        assert_eq!(fallback.severe, DEFAULT_QUALITY_LIMITS.severe);
    }

    #[test]
    fn supervisor_shares_normalize_keys_and_keep_order() {
        let table = SupervisorCityShares::builtin();
        let shares = table
            .shares_for("Marta Oliveira Costa Ramos")
            .expect("supervisor configured");
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].0, "SAO LUIS");
        assert_eq!(shares[1].0, "CAROLINA");
        assert!(table.shares_for("Fulano de Tal").is_none());
    }

    #[test]
    fn calendar_flags_default_to_passed() {
        let calendar = IndicatorCalendar::from_json(
            r#"{
                "OUTUBRO": {
                    "qualidade": true,
                    "financeiro": false,
                    "producao_por_cidade": {"SÃO LUÍS": false}
                }
            }"#,
        )
        .expect("valid calendar json");

        let month = calendar.month("outubro").expect("month present");
        assert!(month.flag("qualidade"));
        assert!(!month.flag("financeiro"));
        assert!(month.flag("organizacao_da_loja"));
        assert!(!month.production_hit("SAO LUIS"));
        assert!(month.production_hit("TIMON"));
        assert!(calendar.month("JANEIRO").is_none());
    }
}
