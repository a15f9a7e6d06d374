use crate::utils::Result;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

// List of abbreviations
// lp = log probability
// ems = emissions

const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_8;
pub const MIN_STD: f64 = 1e-3;

/// What a state's occupancy says about the event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Background,
    Context,
    Label(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSpec {
    pub name: String,
    pub region: Region,
    pub mean: f64,
    pub std: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionSpec {
    pub from: String,
    pub to: String,
    pub prob: f64,
}

/// On-disk description of an untrained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    pub states: Vec<StateSpec>,
    pub start: BTreeMap<String, f64>,
    pub transitions: Vec<TransitionSpec>,
    #[serde(default = "default_iterations")]
    pub iterations: usize,
}

fn default_iterations() -> usize {
    10
}

#[derive(Debug, Clone, PartialEq)]
pub struct HmmState {
    pub name: String,
    pub region: Region,
    pub mean: f64,
    pub std: f64,
}

type MatF64 = Vec<Vec<f64>>;
type MatInt = Vec<Vec<usize>>;

/// Gaussian-emission HMM over segment means. Transitions are stored per target
/// state as incoming states with their log probabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct Hmm {
    pub name: String,
    pub num_states: usize,
    pub states: Vec<HmmState>,
    pub start_lps: Vec<f64>,
    pub in_states: MatInt,
    pub in_lps: MatF64,
    /// `out_edges[s]` lists `(target, k)` with `in_states[target][k] == s`
    pub out_edges: Vec<Vec<(usize, usize)>>,
    pub iterations: usize,
}

impl Hmm {
    pub fn new(name: &str, states: Vec<HmmState>) -> Hmm {
        let num_states = states.len();
        Hmm {
            name: name.to_string(),
            num_states,
            states,
            start_lps: vec![f64::NEG_INFINITY; num_states],
            in_states: vec![Vec::new(); num_states],
            in_lps: vec![Vec::new(); num_states],
            out_edges: vec![Vec::new(); num_states],
            iterations: default_iterations(),
        }
    }

    pub fn read(path: &Path) -> Result<Hmm> {
        let file = File::open(path).map_err(|e| format!("Model {}: {}", path.display(), e))?;
        let spec: ModelSpec = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| format!("Malformed model {}: {}", path.display(), e))?;
        Hmm::from_spec(spec).map_err(|e| format!("Model {}: {}", path.display(), e))
    }

    pub fn from_spec(spec: ModelSpec) -> Result<Hmm> {
        if spec.states.is_empty() {
            return Err("Model has no states".into());
        }
        let mut index = HashMap::new();
        for (i, state) in spec.states.iter().enumerate() {
            if index.insert(state.name.clone(), i).is_some() {
                return Err(format!("Duplicate state name: {}", state.name));
            }
            if !(state.std > 0.0) || !state.mean.is_finite() {
                return Err(format!(
                    "State {} needs a finite mean and positive std",
                    state.name
                ));
            }
        }
        let lookup = |name: &str| {
            index
                .get(name)
                .copied()
                .ok_or_else(|| format!("Unknown state: {}", name))
        };
        let check_prob = |p: f64, what: &str| {
            if p > 0.0 && p <= 1.0 {
                Ok(p)
            } else {
                Err(format!("Probability of {} must be in (0, 1], got {}", what, p))
            }
        };

        let states = spec
            .states
            .iter()
            .map(|s| HmmState {
                name: s.name.clone(),
                region: s.region.clone(),
                mean: s.mean,
                std: s.std,
            })
            .collect_vec();
        let mut hmm = Hmm::new(&spec.name, states);
        hmm.iterations = spec.iterations;

        if spec.start.is_empty() {
            return Err("Model has no start states".into());
        }
        for (name, prob) in &spec.start {
            let state = lookup(name)?;
            hmm.start_lps[state] = check_prob(*prob, name)?.ln();
        }

        let mut incoming: Vec<Vec<(usize, f64)>> = vec![Vec::new(); hmm.num_states];
        for t in &spec.transitions {
            let (from, to) = (lookup(&t.from)?, lookup(&t.to)?);
            let prob = check_prob(t.prob, &format!("{} -> {}", t.from, t.to))?;
            if incoming[to].iter().any(|(s, _)| *s == from) {
                return Err(format!("Duplicate transition {} -> {}", t.from, t.to));
            }
            incoming[to].push((from, prob));
        }
        for (target, edges) in incoming.into_iter().enumerate() {
            let (sources, probs): (Vec<_>, Vec<_>) = edges.into_iter().unzip();
            hmm.set_trans(target, sources, probs);
        }

        Ok(hmm)
    }

    pub fn set_trans(&mut self, target_state: usize, in_states: Vec<usize>, in_probs: Vec<f64>) {
        assert_eq!(in_states.len(), in_probs.len());
        for edges in self.out_edges.iter_mut() {
            edges.retain(|(t, _)| *t != target_state);
        }
        for (k, source) in in_states.iter().enumerate() {
            self.out_edges[*source].push((target_state, k));
        }
        self.in_states[target_state] = in_states;
        self.in_lps[target_state] = in_probs.iter().map(|v| v.ln()).collect_vec();
    }

    pub fn emission_lp(&self, state: usize, value: f64) -> f64 {
        let state = &self.states[state];
        let z = (value - state.mean) / state.std;
        -LN_SQRT_2PI - state.std.ln() - 0.5 * z * z
    }

    pub fn region(&self, state: usize) -> &Region {
        &self.states[state].region
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Background -> context -> label A or label B -> background ...
    pub(crate) fn toy_spec() -> ModelSpec {
        let state = |name: &str, region: Region, mean: f64| StateSpec {
            name: name.into(),
            region,
            mean,
            std: 1.0,
        };
        let trans = |from: &str, to: &str, prob: f64| TransitionSpec {
            from: from.into(),
            to: to.into(),
            prob,
        };
        ModelSpec {
            name: "toy".into(),
            states: vec![
                state("bg", Region::Background, 0.0),
                state("ctx", Region::Context, 10.0),
                state("lab_a", Region::Label("A".into()), 20.0),
                state("lab_b", Region::Label("B".into()), 30.0),
            ],
            start: [("bg".to_string(), 1.0)].into_iter().collect(),
            transitions: vec![
                trans("bg", "bg", 0.5),
                trans("bg", "ctx", 0.5),
                trans("ctx", "ctx", 0.5),
                trans("ctx", "lab_a", 0.25),
                trans("ctx", "lab_b", 0.25),
                trans("lab_a", "lab_a", 0.5),
                trans("lab_a", "bg", 0.5),
                trans("lab_b", "lab_b", 0.5),
                trans("lab_b", "bg", 0.5),
            ],
            iterations: 5,
        }
    }

    #[test]
    fn test_from_spec_builds_incoming_and_outgoing() {
        let hmm = Hmm::from_spec(toy_spec()).unwrap();
        assert_eq!(hmm.num_states, 4);
        assert_eq!(hmm.in_states[0], vec![0, 2, 3]);
        assert_eq!(hmm.in_states[1], vec![0, 1]);
        let mut out_ctx = hmm.out_edges[1].iter().map(|(t, _)| *t).collect_vec();
        out_ctx.sort();
        assert_eq!(out_ctx, vec![1, 2, 3]);
        for (source, edges) in hmm.out_edges.iter().enumerate() {
            for (target, k) in edges {
                assert_eq!(hmm.in_states[*target][*k], source);
            }
        }
        assert_eq!(hmm.start_lps[0], 0.0);
        assert_eq!(hmm.start_lps[1], f64::NEG_INFINITY);
        assert_eq!(hmm.region(2), &Region::Label("A".into()));
    }

    #[test]
    fn test_from_spec_rejects_unknown_state() {
        let mut spec = toy_spec();
        spec.transitions.push(TransitionSpec {
            from: "ctx".into(),
            to: "nowhere".into(),
            prob: 0.1,
        });
        assert!(Hmm::from_spec(spec).is_err());
    }

    #[test]
    fn test_from_spec_rejects_bad_values() {
        let mut spec = toy_spec();
        spec.states[1].std = 0.0;
        assert!(Hmm::from_spec(spec).is_err());

        let mut spec = toy_spec();
        spec.transitions[0].prob = 1.5;
        assert!(Hmm::from_spec(spec).is_err());

        let mut spec = toy_spec();
        spec.states[2].name = "ctx".into();
        assert!(Hmm::from_spec(spec).is_err());
    }

    #[test]
    fn test_spec_json_round_trip() {
        let json = serde_json::to_string(&toy_spec()).unwrap();
        assert!(json.contains(r#""region":{"label":"A"}"#));
        assert!(json.contains(r#""region":"context""#));
        let spec: ModelSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(spec, toy_spec());
    }

    #[test]
    fn test_iterations_default() {
        let json = r#"{"name": "m", "states": [{"name": "s", "region": "background", "mean": 1.0, "std": 1.0}],
                       "start": {"s": 1.0}, "transitions": [{"from": "s", "to": "s", "prob": 1.0}]}"#;
        let spec: ModelSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.iterations, 10);
        assert!(Hmm::from_spec(spec).is_ok());
    }

    #[test]
    fn test_emission_lp_peaks_at_mean() {
        let hmm = Hmm::from_spec(toy_spec()).unwrap();
        assert!((hmm.emission_lp(0, 0.0) + LN_SQRT_2PI).abs() < 1e-12);
        assert!(hmm.emission_lp(1, 10.0) > hmm.emission_lp(1, 11.0));
        assert!(hmm.emission_lp(1, 11.0) > hmm.emission_lp(2, 11.0));
    }
}
