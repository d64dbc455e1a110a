//! Decision core: expected cost, EVPPI, and the three-action utility rule.
//!
//! Every function here is a pure function of one probability and a shared
//! [`pw_config::CostParameters`].

pub mod action_utility;
pub mod evppi;
pub mod expected_cost;
pub mod explain;

pub use action_utility::{
    action_bands, argmax_first, recommend, utilities, utility, Action, ActionBand,
    ActionThresholds,
};
pub use evppi::{evaluate_evppi, evppi, EvppiBreakdown};
pub use expected_cost::{expected_cost, expected_hat_cost, Treatment};
pub use explain::{explain, DecisionLedger};
