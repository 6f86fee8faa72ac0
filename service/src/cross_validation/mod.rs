//! Cross-validation of related fields
//!
//! Named checks that compare values across the payload and its sibling
//! entities, such as an invoice total against its line items or string
//! voltage against the inverter's input limit. Rules are looked up in a
//! fixed dispatch table; a check whose inputs are absent from the payload
//! passes as not applicable.
//!
//! Expected payload fields:
//!
//! | rule | fields |
//! |------|--------|
//! | `total_matches_line_items` | `total_amount`, `line_items[].amount` or `line_items[].quantity * line_items[].unit_price` |
//! | `component_compatibility` | `panel.voc`, `panel.wattage`, `modules_per_string`, `panel_count`, `inverter.max_input_voltage`, `inverter.capacity_kw` |
//! | `production_within_yield_band` | `system_size_kw`, `estimated_annual_production_kwh` |
//! | `milestone_dates_ordered` | `milestones.contract_signed`, `milestones.permit_issued`, `milestones.installation_completed`, `milestones.interconnection_approved` |
//! | `financing_covers_cost` | `total_cost`, `financing.loan_amount`, `financing.incentives`, `financing.down_payment` |

use serde_json::Value;
use tracing::{debug, warn};
use validation_core::configuration::CrossValidationConfig;
use validation_core::report::CrossValidationResult;
use validation_core::validation::ValidationSeverity;

use crate::json_path::{lookup, lookup_f64};
use crate::rule_engine::predicate::parse_date;

/// Outcome of a single cross check
#[derive(Debug, Clone, PartialEq)]
enum Verdict {
    Pass,
    NotApplicable(String),
    Fail(String),
}

type CrossCheck = fn(&Value, &CrossValidationConfig) -> Verdict;

/// Dispatch table of known cross-validation rules
const RULES: &[(&str, ValidationSeverity, CrossCheck)] = &[
    ("total_matches_line_items", ValidationSeverity::Error, total_matches_line_items),
    ("component_compatibility", ValidationSeverity::Error, component_compatibility),
    ("production_within_yield_band", ValidationSeverity::Warning, production_within_yield_band),
    ("milestone_dates_ordered", ValidationSeverity::Error, milestone_dates_ordered),
    ("financing_covers_cost", ValidationSeverity::Error, financing_covers_cost),
];

/// Milestones in the order they must occur
const MILESTONES: [&str; 4] = [
    "contract_signed",
    "permit_issued",
    "installation_completed",
    "interconnection_approved",
];

/// Runs named cross-validation rules
#[derive(Debug, Clone, Default)]
pub struct CrossValidationEngine {
    config: CrossValidationConfig,
}

impl CrossValidationEngine {
    /// Create an engine with the given thresholds
    #[must_use]
    pub fn new(config: CrossValidationConfig) -> Self {
        Self { config }
    }

    /// Names of every known rule
    pub fn known_rules() -> impl Iterator<Item = &'static str> {
        RULES.iter().map(|(name, _, _)| *name)
    }

    /// Whether `name` is a known rule
    #[must_use]
    pub fn is_known(name: &str) -> bool {
        RULES.iter().any(|(known, _, _)| *known == name)
    }

    /// Run each named rule against `payload`, in the order given
    ///
    /// Unknown names pass with `known: false` unless `strict` is set, in
    /// which case they fail with error severity.
    #[must_use]
    pub fn validate(
        &self,
        names: &[String],
        payload: &Value,
        strict: bool,
    ) -> Vec<CrossValidationResult> {
        names
            .iter()
            .map(|name| self.run_one(name, payload, strict))
            .collect()
    }

    fn run_one(&self, name: &str, payload: &Value, strict: bool) -> CrossValidationResult {
        let Some((_, severity, check)) = RULES.iter().find(|(known, _, _)| *known == name) else {
            warn!(rule = %name, strict, "Unknown cross-validation rule");
            return CrossValidationResult {
                rule: name.to_string(),
                valid: !strict,
                known: false,
                severity: if strict {
                    ValidationSeverity::Error
                } else {
                    ValidationSeverity::Info
                },
                message: Some(format!("Unknown cross-validation rule '{name}'")),
            };
        };

        let verdict = check(payload, &self.config);
        debug!(rule = %name, ?verdict, "Cross-validation rule evaluated");

        let (valid, message) = match verdict {
            Verdict::Pass => (true, None),
            Verdict::NotApplicable(reason) => (true, Some(reason)),
            Verdict::Fail(reason) => (false, Some(reason)),
        };
        CrossValidationResult {
            rule: name.to_string(),
            valid,
            known: true,
            severity: *severity,
            message,
        }
    }
}

fn total_matches_line_items(payload: &Value, config: &CrossValidationConfig) -> Verdict {
    let (Some(total), Some(items)) = (
        lookup_f64(payload, "total_amount"),
        lookup(payload, "line_items").and_then(Value::as_array),
    ) else {
        return Verdict::NotApplicable(
            "Not applicable: total_amount or line_items absent".to_string(),
        );
    };

    let mut sum = 0.0;
    for (index, item) in items.iter().enumerate() {
        let amount = lookup_f64(item, "amount").or_else(|| {
            Some(lookup_f64(item, "quantity")? * lookup_f64(item, "unit_price")?)
        });
        match amount {
            Some(amount) => sum += amount,
            None => return Verdict::Fail(format!("Line item {index} has no amount")),
        }
    }

    if (total - sum).abs() > config.sum_tolerance {
        Verdict::Fail(format!("Total amount {total:.2} does not match line item sum {sum:.2}"))
    } else {
        Verdict::Pass
    }
}

fn component_compatibility(payload: &Value, config: &CrossValidationConfig) -> Verdict {
    let mut checked = false;

    if let (Some(voc), Some(modules), Some(limit)) = (
        lookup_f64(payload, "panel.voc"),
        lookup_f64(payload, "modules_per_string"),
        lookup_f64(payload, "inverter.max_input_voltage"),
    ) {
        checked = true;
        let string_voltage = voc * modules;
        if string_voltage > limit {
            return Verdict::Fail(format!(
                "String voltage {string_voltage:.1} V exceeds inverter maximum input of {limit:.1} V"
            ));
        }
    }

    if let (Some(wattage), Some(count), Some(ac_kw)) = (
        lookup_f64(payload, "panel.wattage"),
        lookup_f64(payload, "panel_count"),
        lookup_f64(payload, "inverter.capacity_kw"),
    ) {
        checked = true;
        if ac_kw <= 0.0 {
            return Verdict::Fail("Inverter capacity must be positive".to_string());
        }
        let ratio = wattage * count / 1000.0 / ac_kw;
        if ratio < config.min_dc_ac_ratio || ratio > config.max_dc_ac_ratio {
            return Verdict::Fail(format!(
                "DC/AC ratio {ratio:.2} is outside {:.2}..={:.2}",
                config.min_dc_ac_ratio, config.max_dc_ac_ratio
            ));
        }
    }

    if checked {
        Verdict::Pass
    } else {
        Verdict::NotApplicable("Not applicable: panel and inverter data absent".to_string())
    }
}

fn production_within_yield_band(payload: &Value, config: &CrossValidationConfig) -> Verdict {
    let (Some(size_kw), Some(production)) = (
        lookup_f64(payload, "system_size_kw"),
        lookup_f64(payload, "estimated_annual_production_kwh"),
    ) else {
        return Verdict::NotApplicable(
            "Not applicable: system_size_kw or estimated_annual_production_kwh absent".to_string(),
        );
    };
    if size_kw <= 0.0 {
        return Verdict::Fail("System size must be positive".to_string());
    }

    let specific_yield = production / size_kw;
    if specific_yield < config.min_specific_yield || specific_yield > config.max_specific_yield {
        Verdict::Fail(format!(
            "Specific yield {specific_yield:.0} kWh/kW is outside {:.0}..={:.0}",
            config.min_specific_yield, config.max_specific_yield
        ))
    } else {
        Verdict::Pass
    }
}

fn milestone_dates_ordered(payload: &Value, _config: &CrossValidationConfig) -> Verdict {
    let Some(milestones) = lookup(payload, "milestones").and_then(Value::as_object) else {
        return Verdict::NotApplicable("Not applicable: milestones absent".to_string());
    };

    let mut previous: Option<(&str, chrono::DateTime<chrono::Utc>)> = None;
    for name in MILESTONES {
        let Some(raw) = milestones.get(name).and_then(Value::as_str) else {
            continue;
        };
        let Some(date) = parse_date(raw) else {
            return Verdict::Fail(format!("Milestone '{name}' has an unparseable date '{raw}'"));
        };
        if let Some((earlier, earlier_date)) = previous {
            if date < earlier_date {
                return Verdict::Fail(format!("Milestone '{name}' precedes '{earlier}'"));
            }
        }
        previous = Some((name, date));
    }
    Verdict::Pass
}

fn financing_covers_cost(payload: &Value, config: &CrossValidationConfig) -> Verdict {
    let (Some(total_cost), Some(financing)) = (
        lookup_f64(payload, "total_cost"),
        lookup(payload, "financing").filter(|value| value.is_object()),
    ) else {
        return Verdict::NotApplicable("Not applicable: total_cost or financing absent".to_string());
    };

    let covered: f64 = ["loan_amount", "incentives", "down_payment"]
        .iter()
        .filter_map(|key| lookup_f64(financing, key))
        .sum();

    if covered + config.sum_tolerance < total_cost {
        Verdict::Fail(format!(
            "Financing covers {covered:.2} of total cost {total_cost:.2}"
        ))
    } else {
        Verdict::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(name: &str, payload: &Value) -> CrossValidationResult {
        CrossValidationEngine::default()
            .validate(&[name.to_string()], payload, false)
            .remove(0)
    }

    #[test]
    fn test_total_matches_line_items() {
        let payload = json!({
            "total_amount": 1250.0,
            "line_items": [
                { "amount": 1000.0 },
                { "quantity": 5, "unit_price": 50.0 }
            ]
        });
        assert!(run("total_matches_line_items", &payload).valid);

        let wrong = json!({ "total_amount": 1300.0, "line_items": [{ "amount": 1000.0 }] });
        let result = run("total_matches_line_items", &wrong);
        assert!(!result.valid);
        assert!(result.message.unwrap_or_default().contains("1000.00"));
    }

    #[test]
    fn test_component_compatibility() {
        let ok = json!({
            "panel": { "voc": 49.5, "wattage": 400 },
            "modules_per_string": 10,
            "panel_count": 20,
            "inverter": { "max_input_voltage": 600, "capacity_kw": 7.0 }
        });
        assert!(run("component_compatibility", &ok).valid);

        let overvoltage = json!({
            "panel": { "voc": 49.5 },
            "modules_per_string": 14,
            "inverter": { "max_input_voltage": 600 }
        });
        assert!(!run("component_compatibility", &overvoltage).valid);

        let oversized = json!({
            "panel": { "wattage": 400 },
            "panel_count": 40,
            "inverter": { "capacity_kw": 5.0 }
        });
        let result = run("component_compatibility", &oversized);
        assert!(!result.valid);
        assert!(result.message.unwrap_or_default().contains("DC/AC"));
    }

    #[test]
    fn test_production_band_is_a_warning() {
        let result = run(
            "production_within_yield_band",
            &json!({ "system_size_kw": 8.0, "estimated_annual_production_kwh": 30_000 }),
        );
        assert!(!result.valid);
        assert_eq!(result.severity, ValidationSeverity::Warning);

        assert!(run(
            "production_within_yield_band",
            &json!({ "system_size_kw": 8.0, "estimated_annual_production_kwh": 11_000 }),
        )
        .valid);
    }

    #[test]
    fn test_milestone_order() {
        let ordered = json!({ "milestones": {
            "contract_signed": "2024-01-10",
            "installation_completed": "2024-03-02",
            "interconnection_approved": "2024-04-01T09:00:00Z"
        }});
        assert!(run("milestone_dates_ordered", &ordered).valid);

        let reversed = json!({ "milestones": {
            "contract_signed": "2024-05-10",
            "permit_issued": "2024-02-01"
        }});
        assert!(!run("milestone_dates_ordered", &reversed).valid);
    }

    #[test]
    fn test_financing_covers_cost() {
        let covered = json!({
            "total_cost": 24_000,
            "financing": { "loan_amount": 15_000, "incentives": 7_200, "down_payment": 1_800 }
        });
        assert!(run("financing_covers_cost", &covered).valid);

        let short = json!({ "total_cost": 24_000, "financing": { "loan_amount": 15_000 } });
        assert!(!run("financing_covers_cost", &short).valid);
    }

    #[test]
    fn test_absent_inputs_are_not_applicable() {
        for name in CrossValidationEngine::known_rules() {
            let result = run(name, &json!({}));
            assert!(result.valid, "{name} should pass on an empty payload");
            assert!(result.known);
        }
    }

    #[test]
    fn test_unknown_rule_policy() {
        let engine = CrossValidationEngine::default();
        let names = ["no_such_rule".to_string()];

        let lenient = engine.validate(&names, &json!({}), false);
        assert!(lenient[0].valid);
        assert!(!lenient[0].known);

        let strict = engine.validate(&names, &json!({}), true);
        assert!(!strict[0].valid);
        assert_eq!(strict[0].severity, ValidationSeverity::Error);
    }
}
