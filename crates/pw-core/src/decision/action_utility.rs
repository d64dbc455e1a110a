//! Three-action utility rule: inaction, monitoring, spraying.
//!
//! ```text
//! u(inaction)   = 0
//! u(monitoring) = p * (L_nt - L_t - C) - M
//! u(spraying)   = p * (L_nt - L_t) - C
//! ```
//!
//! The recommendation is the first maximum in index order, compared exactly.

use pw_config::CostParameters;
use pw_math::{linear_crossing, Affine};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Discrete response to a pest-presence probability.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Inaction,
    Monitoring,
    Spraying,
}

impl Action {
    /// All actions in index (and tie-break) order.
    pub const ALL: [Action; 3] = [Action::Inaction, Action::Monitoring, Action::Spraying];

    pub fn index(self) -> usize {
        match self {
            Action::Inaction => 0,
            Action::Monitoring => 1,
            Action::Spraying => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Action> {
        Action::ALL.get(index).copied()
    }

    /// Stable wire name.
    pub fn name(self) -> &'static str {
        match self {
            Action::Inaction => "inaction",
            Action::Monitoring => "monitoring",
            Action::Spraying => "spraying",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Utility of `action` as a line in `p`.
pub fn utility_line(action: Action, params: &CostParameters) -> Affine {
    let avoided = params.avoided_loss();
    let c = params.treatment_cost();
    match action {
        Action::Inaction => Affine::ZERO,
        Action::Monitoring => Affine::new(avoided - c, -params.monitoring_cost()),
        Action::Spraying => Affine::new(avoided, -c),
    }
}

pub fn utility(action: Action, p: f64, params: &CostParameters) -> f64 {
    match action {
        Action::Inaction => 0.0,
        Action::Monitoring => {
            p * (params.loss_given_no_treatment() - params.loss_given_treatment()
                - params.treatment_cost())
                - params.monitoring_cost()
        }
        Action::Spraying => {
            p * (params.loss_given_no_treatment() - params.loss_given_treatment())
                - params.treatment_cost()
        }
    }
}

/// Utilities ordered inaction, monitoring, spraying.
pub fn utilities(p: f64, params: &CostParameters) -> [f64; 3] {
    Action::ALL.map(|action| utility(action, p, params))
}

/// First maximum: a later action replaces the incumbent only when strictly greater.
pub fn argmax_first(utilities: &[f64; 3]) -> Action {
    let mut best = 0;
    for (index, &u) in utilities.iter().enumerate().skip(1) {
        if u > utilities[best] {
            best = index;
        }
    }
    Action::ALL[best]
}

pub fn recommend(p: f64, params: &CostParameters) -> Action {
    argmax_first(&utilities(p, params))
}

/// Closed-form probabilities at which two utilities are equal.
///
/// A crossing is `None` when its denominator is zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActionThresholds {
    /// `M / (L_nt - L_t - C)`
    pub inaction_monitoring: Option<f64>,
    /// `1 - M / C`
    pub monitoring_spraying: Option<f64>,
    /// `C / (L_nt - L_t)`
    pub inaction_spraying: Option<f64>,
}

impl ActionThresholds {
    pub fn from_params(params: &CostParameters) -> Self {
        let line = |action| utility_line(action, params);
        ActionThresholds {
            inaction_monitoring: linear_crossing(line(Action::Inaction), line(Action::Monitoring)),
            monitoring_spraying: linear_crossing(line(Action::Monitoring), line(Action::Spraying)),
            inaction_spraying: linear_crossing(line(Action::Inaction), line(Action::Spraying)),
        }
    }

    fn crossings(&self) -> impl Iterator<Item = f64> {
        [
            self.inaction_monitoring,
            self.monitoring_spraying,
            self.inaction_spraying,
        ]
        .into_iter()
        .flatten()
    }
}

/// A probability interval over which one action is recommended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActionBand {
    pub from: f64,
    pub to: f64,
    pub action: Action,
}

/// Partition [0, 1] into maximal intervals with a single recommendation.
///
/// Each band's action is the one recommended strictly inside it; at a shared
/// endpoint the argmax tie-break decides.
pub fn action_bands(params: &CostParameters) -> Vec<ActionBand> {
    let thresholds = ActionThresholds::from_params(params);
    let mut edges: Vec<f64> = thresholds
        .crossings()
        .filter(|p| *p > 0.0 && *p < 1.0)
        .collect();
    edges.push(0.0);
    edges.push(1.0);
    edges.sort_by(f64::total_cmp);
    edges.dedup();

    let mut bands: Vec<ActionBand> = Vec::new();
    for pair in edges.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let action = recommend((from + to) / 2.0, params);
        match bands.last_mut() {
            Some(last) if last.action == action => last.to = to,
            _ => bands.push(ActionBand { from, to, action }),
        }
    }
    bands
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        pw_math::approx_eq(a, b, pw_math::DEFAULT_TOLERANCE)
    }

    #[test]
    fn scenario_half_probability_sprays() {
        let params = CostParameters::default();
        let u = utilities(0.5, &params);
        assert_eq!(u[0], 0.0);
        assert!(approx(u[1], 358.25));
        assert!(approx(u[2], 378.5));
        assert_eq!(argmax_first(&u), Action::Spraying);
    }

    #[test]
    fn scenario_zero_probability_is_inaction() {
        let params = CostParameters::default();
        let u = utilities(0.0, &params);
        assert_eq!(u, [0.0, -48.0, -55.5]);
        assert_eq!(argmax_first(&u), Action::Inaction);
    }

    #[test]
    fn ten_percent_monitors() {
        let params = CostParameters::default();
        let u = utilities(0.1, &params);
        assert!(approx(u[1], 33.25));
        assert!(approx(u[2], 31.3));
        assert_eq!(recommend(0.1, &params), Action::Monitoring);
    }

    #[test]
    fn exact_ties_go_to_lowest_index() {
        assert_eq!(argmax_first(&[0.0, 0.0, 0.0]), Action::Inaction);
        assert_eq!(argmax_first(&[-1.0, 2.0, 2.0]), Action::Monitoring);
        assert_eq!(argmax_first(&[3.0, 1.0, 3.0]), Action::Inaction);

        // Free monitoring at p = 0 ties with inaction.
        let free = CostParameters::new(0.0, 868.0, 795.0, 0.0).unwrap();
        assert_eq!(recommend(0.0, &free), Action::Inaction);

        // C = 10, M = 5: u(monitoring) = u(spraying) = 40 at p = 0.5.
        let tied = CostParameters::new(0.0, 100.0, 340.0, 5.0).unwrap();
        let u = utilities(0.5, &tied);
        assert_eq!(u[1], u[2]);
        assert_eq!(argmax_first(&u), Action::Monitoring);
    }

    #[test]
    fn default_thresholds() {
        let t = ActionThresholds::from_params(&CostParameters::default());
        assert!(approx(t.inaction_monitoring.unwrap(), 48.0 / 812.5));
        assert!(approx(t.monitoring_spraying.unwrap(), 1.0 - 48.0 / 55.5));
        assert!(approx(t.inaction_spraying.unwrap(), 55.5 / 868.0));
    }

    #[test]
    fn zero_denominators_give_none() {
        // A = 240 gives C = 0.
        let t = ActionThresholds::from_params(&CostParameters::new(0.0, 100.0, 240.0, 5.0).unwrap());
        assert!(t.monitoring_spraying.is_none());
        assert_eq!(t.inaction_spraying, Some(0.0));

        // L_nt - L_t - C = 0.
        let t = ActionThresholds::from_params(&CostParameters::new(0.0, 10.0, 340.0, 5.0).unwrap());
        assert!(t.inaction_monitoring.is_none());
    }

    #[test]
    fn lines_match_utilities() {
        let params = CostParameters::new(12.0, 700.0, 610.0, 30.0).unwrap();
        for action in Action::ALL {
            for p in [0.0, 0.2, 0.75, 1.4] {
                assert!(approx(utility_line(action, &params).eval(p), utility(action, p, &params)));
            }
        }
    }

    #[test]
    fn default_bands() {
        let bands = action_bands(&CostParameters::default());
        let actions: Vec<Action> = bands.iter().map(|b| b.action).collect();
        assert_eq!(
            actions,
            vec![Action::Inaction, Action::Monitoring, Action::Spraying]
        );
        assert_eq!(bands[0].from, 0.0);
        assert!(approx(bands[0].to, 48.0 / 812.5));
        assert!(approx(bands[1].to, 1.0 - 48.0 / 55.5));
        assert_eq!(bands[2].to, 1.0);
    }

    #[test]
    fn expensive_monitoring_skips_monitoring_band() {
        // M = 60 > C = 55.5: monitoring is dominated by spraying past the break-even.
        let bands = action_bands(&CostParameters::new(0.0, 868.0, 795.0, 60.0).unwrap());
        assert!(bands.iter().all(|b| b.action != Action::Monitoring));
        assert_eq!(bands.len(), 2);
    }

    #[test]
    fn action_index_roundtrip_and_names() {
        for action in Action::ALL {
            assert_eq!(Action::from_index(action.index()), Some(action));
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.name()));
        }
        assert_eq!(Action::from_index(3), None);
    }
}
