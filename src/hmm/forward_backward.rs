use super::model::{Hmm, MIN_STD};
use crate::utils::{math::log_sum_exp, Result};
use itertools::Itertools;

/// Posterior quantities of one observation sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Posterior {
    /// `emissions[t][s]`: probability of being in state `s` at position `t`
    pub emissions: Vec<Vec<f64>>,
    /// `transitions[s][k]`: expected number of uses of `in_states[s][k] -> s`
    pub transitions: Vec<Vec<f64>>,
    pub log_likelihood: f64,
}

impl Posterior {
    pub fn len(&self) -> usize {
        self.emissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emissions.is_empty()
    }
}

impl Hmm {
    fn forward(&self, obs: &[f64]) -> Vec<Vec<f64>> {
        let mut alpha = vec![vec![f64::NEG_INFINITY; self.num_states]; obs.len()];
        for state in 0..self.num_states {
            alpha[0][state] = self.start_lps[state] + self.emission_lp(state, obs[0]);
        }
        for t in 1..obs.len() {
            for state in 0..self.num_states {
                let incoming = self.in_states[state]
                    .iter()
                    .zip(&self.in_lps[state])
                    .map(|(prev, lp)| alpha[t - 1][*prev] + lp);
                alpha[t][state] = log_sum_exp(incoming) + self.emission_lp(state, obs[t]);
            }
        }
        alpha
    }

    fn backward(&self, obs: &[f64]) -> Vec<Vec<f64>> {
        let mut beta = vec![vec![f64::NEG_INFINITY; self.num_states]; obs.len()];
        if let Some(last) = beta.last_mut() {
            last.fill(0.0);
        }
        for t in (0..obs.len().saturating_sub(1)).rev() {
            for state in 0..self.num_states {
                let outgoing = self.out_edges[state].iter().map(|(next, k)| {
                    self.in_lps[*next][*k] + self.emission_lp(*next, obs[t + 1]) + beta[t + 1][*next]
                });
                beta[t][state] = log_sum_exp(outgoing);
            }
        }
        beta
    }

    pub fn forward_backward(&self, obs: &[f64]) -> Result<Posterior> {
        if obs.is_empty() {
            return Err("Cannot run forward-backward on an empty sequence".into());
        }
        let alpha = self.forward(obs);
        let beta = self.backward(obs);
        let log_likelihood = log_sum_exp(alpha[obs.len() - 1].iter().copied());
        if !log_likelihood.is_finite() {
            return Err(format!(
                "Sequence of {} observations has zero likelihood under model {}",
                obs.len(),
                self.name
            ));
        }

        let emissions = alpha
            .iter()
            .zip(&beta)
            .map(|(a, b)| {
                a.iter()
                    .zip(b)
                    .map(|(a, b)| (a + b - log_likelihood).exp())
                    .collect_vec()
            })
            .collect_vec();

        let mut transitions = self
            .in_states
            .iter()
            .map(|sources| vec![0.0; sources.len()])
            .collect_vec();
        for t in 0..obs.len() - 1 {
            for (state, sources) in self.in_states.iter().enumerate() {
                let tail = self.emission_lp(state, obs[t + 1]) + beta[t + 1][state];
                for (k, prev) in sources.iter().enumerate() {
                    let lp = alpha[t][*prev] + self.in_lps[state][k] + tail - log_likelihood;
                    transitions[state][k] += lp.exp();
                }
            }
        }

        Ok(Posterior {
            emissions,
            transitions,
            log_likelihood,
        })
    }

    /// Baum-Welch re-estimation of emissions, transitions and start
    /// probabilities for `self.iterations` rounds.
    pub fn baum_welch(&mut self, sequences: &[Vec<f64>]) -> Result<()> {
        let sequences = sequences.iter().filter(|s| !s.is_empty()).collect_vec();
        if sequences.is_empty() {
            return Err("No training sequences".into());
        }

        for iteration in 0..self.iterations {
            let mut weight = vec![0.0; self.num_states];
            let mut weighted_sum = vec![0.0; self.num_states];
            let mut weighted_sq = vec![0.0; self.num_states];
            let mut start = vec![0.0; self.num_states];
            let mut trans = self
                .in_states
                .iter()
                .map(|sources| vec![0.0; sources.len()])
                .collect_vec();
            let mut total_ll = 0.0;

            for seq in &sequences {
                let posterior = self.forward_backward(seq)?;
                total_ll += posterior.log_likelihood;
                for (t, row) in posterior.emissions.iter().enumerate() {
                    for (state, p) in row.iter().enumerate() {
                        weight[state] += p;
                        weighted_sum[state] += p * seq[t];
                        weighted_sq[state] += p * seq[t] * seq[t];
                    }
                }
                for (state, p) in posterior.emissions[0].iter().enumerate() {
                    start[state] += p;
                }
                for (acc, expected) in trans.iter_mut().zip(&posterior.transitions) {
                    for (a, e) in acc.iter_mut().zip(expected) {
                        *a += e;
                    }
                }
            }
            log::debug!(
                "Model {} iteration {}: log likelihood {:.3}",
                self.name,
                iteration + 1,
                total_ll
            );

            for state in 0..self.num_states {
                if weight[state] > 0.0 {
                    let mean = weighted_sum[state] / weight[state];
                    let var = weighted_sq[state] / weight[state] - mean * mean;
                    self.states[state].mean = mean;
                    self.states[state].std = var.max(0.0).sqrt().max(MIN_STD);
                }
            }

            let n = sequences.len() as f64;
            for (lp, count) in self.start_lps.iter_mut().zip(&start) {
                *lp = (count / n).ln();
            }

            for source in 0..self.num_states {
                let total: f64 = self.out_edges[source]
                    .iter()
                    .map(|(target, k)| trans[*target][*k])
                    .sum();
                if total <= 0.0 {
                    continue;
                }
                for (target, k) in &self.out_edges[source] {
                    self.in_lps[*target][*k] = (trans[*target][*k] / total).ln();
                }
            }
        }
        Ok(())
    }
}
