//! JSON Schema generation for the wire types.
//!
//! `pw-core config schema --file <name>` prints one of these so upstream
//! model jobs and the reporting layer can validate what they exchange.

use schemars::schema_for;
use serde_json::Value;
use std::collections::BTreeMap;

pub use crate::batch::{BatchReport, BatchRequest, RiskCell};
pub use crate::decision::{ActionBand, DecisionLedger};
pub use crate::response::BatchResponse;
pub use pw_config::{CalibrationConfig, CostParametersFile};

/// Available schema names with their descriptions.
pub fn available_schemas() -> Vec<(&'static str, &'static str)> {
    vec![
        ("costs", "costs.json: monetary constants and units"),
        ("calibration", "calibration.json: target prevalence settings"),
        ("request", "Batch request: cells and reference sample"),
        ("report", "Batch response: results, failures, summary, config snapshot"),
        ("cell", "One raw risk cell"),
        ("ledger", "Single-probability decision ledger (explain)"),
        ("band", "Probability interval with one recommended action"),
    ]
}

/// Generate the JSON Schema for a name from [`available_schemas`].
///
/// Returns None if the name is unknown.
pub fn generate_schema(name: &str) -> Option<Value> {
    let schema = match name {
        "costs" => schema_for!(CostParametersFile),
        "calibration" => schema_for!(CalibrationConfig),
        "request" => schema_for!(BatchRequest),
        "report" => schema_for!(BatchResponse),
        "cell" => schema_for!(RiskCell),
        "ledger" => schema_for!(DecisionLedger),
        "band" => schema_for!(ActionBand),
        _ => return None,
    };
    serde_json::to_value(schema).ok()
}

/// Generate all schemas as a map from name to schema.
pub fn generate_all_schemas() -> BTreeMap<String, Value> {
    available_schemas()
        .into_iter()
        .filter_map(|(name, _)| generate_schema(name).map(|s| (name.to_string(), s)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_schema_generates() {
        for (name, _) in available_schemas() {
            let schema = generate_schema(name).unwrap_or_else(|| panic!("{name}"));
            assert!(schema.is_object(), "{name}");
        }
        assert_eq!(generate_all_schemas().len(), available_schemas().len());
    }

    #[test]
    fn unknown_schema_is_none() {
        assert!(generate_schema("priors").is_none());
    }

    #[test]
    fn request_schema_names_its_fields() {
        let schema = generate_schema("request").unwrap();
        let text = serde_json::to_string(&schema).unwrap();
        assert!(text.contains("reference_sample"));
        assert!(text.contains("raw_probability"));
    }
}
