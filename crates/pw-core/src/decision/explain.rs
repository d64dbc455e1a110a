//! Full arithmetic ledger for a single probability.

use pw_config::CostParameters;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::action_utility::{recommend, utilities, Action, ActionThresholds};
use super::evppi::{evaluate_evppi, EvppiBreakdown};
use super::expected_cost::{expected_cost, expected_hat_cost, Treatment};

/// Cost of one treatment branch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BranchCost {
    pub treatment: Treatment,
    pub expected_cost: f64,
    pub expected_hat_cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActionUtility {
    pub action: Action,
    pub utility: f64,
}

/// Everything the engine computes for one probability, in one place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DecisionLedger {
    pub probability: f64,
    pub out_of_unit_interval: bool,
    pub treatment_cost: f64,
    pub branches: Vec<BranchCost>,
    pub evppi: EvppiBreakdown,
    pub utilities: Vec<ActionUtility>,
    pub recommended_action: Action,
    pub thresholds: ActionThresholds,
    pub units: String,
}

pub fn explain(p: f64, params: &CostParameters) -> DecisionLedger {
    let branches = Treatment::ALL
        .iter()
        .map(|&treatment| BranchCost {
            treatment,
            expected_cost: expected_cost(p, treatment, params),
            expected_hat_cost: expected_hat_cost(p, treatment, params),
        })
        .collect();
    let utilities = Action::ALL
        .iter()
        .zip(utilities(p, params))
        .map(|(&action, utility)| ActionUtility { action, utility })
        .collect();

    DecisionLedger {
        probability: p,
        out_of_unit_interval: !pw_math::is_unit_interval(p),
        treatment_cost: params.treatment_cost(),
        branches,
        evppi: evaluate_evppi(p, params),
        utilities,
        recommended_action: recommend(p, params),
        thresholds: ActionThresholds::from_params(params),
        units: params.units().to_string(),
    }
}

impl DecisionLedger {
    /// Markdown rendering for terminals and reports.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "# Decision ledger for p = {}\n\n",
            self.probability
        ));
        if self.out_of_unit_interval {
            out.push_str("> probability lies outside [0, 1]; results are unclipped\n\n");
        }
        out.push_str(&format!(
            "Treatment cost C = {} {}\n\n",
            self.treatment_cost, self.units
        ));

        out.push_str("| Branch | Expected cost | Hat-cost |\n|---|---|---|\n");
        for b in &self.branches {
            let name = if b.treatment.is_treat() {
                "treat"
            } else {
                "no treatment"
            };
            out.push_str(&format!(
                "| {} | {:.4} | {:.4} |\n",
                name, b.expected_cost, b.expected_hat_cost
            ));
        }

        out.push_str(&format!(
            "\nEVPPI = {:.4} - ({:.4}) = **{:.4}**\n\n",
            self.evppi.cost_without_info, self.evppi.cost_with_info, self.evppi.evppi
        ));

        out.push_str("| Action | Utility |\n|---|---|\n");
        for u in &self.utilities {
            let marker = if u.action == self.recommended_action {
                " ←"
            } else {
                ""
            };
            out.push_str(&format!("| {} | {:.4}{} |\n", u.action, u.utility, marker));
        }
        out.push_str(&format!(
            "\nRecommended: **{}**\n",
            self.recommended_action
        ));
        out
    }
}
