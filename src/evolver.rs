//! Mutation policy for network graphs.
//!
//! An [`Evolver`] owns an [`EvolverConfig`] and applies two kinds of mutation
//! to a [`Graph`]:
//!
//! - **parametric**: a fixed number of independent trials, each of which may
//!   perturb one random bias or one random weight;
//! - **structural**: possibly split a random link, then possibly link two random
//!   neurons.
//!
//! Perturbations mix a rare full replacement, an occasional full-range jump
//! and a frequent small nudge. All probabilities and ranges live in the config,
//! so independent populations can evolve with different settings.

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::error::NeatError;
use crate::gene::{LinkId, NeuronId};
use crate::graph::Graph;
use crate::random::RandomSource;

/// Perturbation settings for one kind of parameter (bias or weight).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamMutation {
    /// Scale of a full-range jump.
    pub full_range: f64,
    /// Scale of a small nudge.
    pub small_range: f64,
    /// Probability that a perturbation is a full-range jump rather than a nudge.
    pub full_prob: f64,
}

impl ParamMutation {
    fn validate(&self, name: &str) -> Result<(), NeatError> {
        check_probability(&format!("{name}.full_prob"), self.full_prob)?;
        check_range(&format!("{name}.full_range"), self.full_range)?;
        check_range(&format!("{name}.small_range"), self.small_range)
    }
}

/// Configuration for graph mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolverConfig {
    /// Number of parametric trials per [`Evolver::mutate`] call.
    pub mutation_count: usize,
    /// Probability that a single parametric trial fires.
    pub mutation_prob: f64,
    /// Probability that a perturbation replaces the value with a fresh draw in `[-1, 1]`.
    pub new_value_prob: f64,
    /// Bias perturbation settings.
    pub bias: ParamMutation,
    /// Weight perturbation settings.
    pub weight: ParamMutation,
    /// Probability of splitting a random link.
    pub split_link_prob: f64,
    /// Probability of linking two random neurons.
    pub add_link_prob: f64,
}

impl Default for EvolverConfig {
    fn default() -> Self {
        Self {
            mutation_count: 4,
            mutation_prob: 0.25,
            new_value_prob: 0.2,
            bias: ParamMutation {
                full_range: 1.0,
                small_range: 0.01,
                full_prob: 0.25,
            },
            weight: ParamMutation {
                full_range: 1.0,
                small_range: 0.01,
                full_prob: 0.75,
            },
            split_link_prob: 0.05,
            add_link_prob: 0.8,
        }
    }
}

impl EvolverConfig {
    /// Default tunables with structural mutation switched off.
    #[must_use]
    pub fn parametric_only() -> Self {
        Self {
            split_link_prob: 0.0,
            add_link_prob: 0.0,
            ..Default::default()
        }
    }

    /// Default tunables with parametric mutation switched off.
    #[must_use]
    pub fn structural_only() -> Self {
        Self {
            mutation_prob: 0.0,
            ..Default::default()
        }
    }

    /// Check that probabilities lie in `[0, 1]` and ranges are finite and non-negative.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<(), NeatError> {
        check_probability("mutation_prob", self.mutation_prob)?;
        check_probability("new_value_prob", self.new_value_prob)?;
        check_probability("split_link_prob", self.split_link_prob)?;
        check_probability("add_link_prob", self.add_link_prob)?;
        self.bias.validate("bias")?;
        self.weight.validate("weight")
    }

    /// Parse and validate a JSON config. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::InvalidConfig`] for malformed JSON or out-of-range values.
    pub fn from_json(json: &str) -> Result<Self, NeatError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| NeatError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Pretty-printed JSON form of this config.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::InvalidConfig`] if serialization fails.
    pub fn to_json(&self) -> Result<String, NeatError> {
        serde_json::to_string_pretty(self).map_err(|e| NeatError::InvalidConfig(e.to_string()))
    }
}

fn check_probability(name: &str, value: f64) -> Result<(), NeatError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(NeatError::InvalidConfig(format!(
            "{name} must lie in [0, 1], got {value}"
        )))
    }
}

fn check_range(name: &str, value: f64) -> Result<(), NeatError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(NeatError::InvalidConfig(format!(
            "{name} must be finite and non-negative, got {value}"
        )))
    }
}

/// Applies mutations to graphs according to its config.
#[derive(Debug, Clone, Default)]
pub struct Evolver {
    config: EvolverConfig,
}

impl Evolver {
    /// Create an evolver. The config is used as given; see [`Evolver::try_new`].
    #[must_use]
    pub fn new(config: EvolverConfig) -> Self {
        Self { config }
    }

    /// Create an evolver after validating its config.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::InvalidConfig`] if [`EvolverConfig::validate`] fails.
    pub fn try_new(config: EvolverConfig) -> Result<Self, NeatError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Current tunables.
    #[must_use]
    pub fn config(&self) -> &EvolverConfig {
        &self.config
    }

    /// Tunables, for adjustment between mutation calls.
    pub fn config_mut(&mut self) -> &mut EvolverConfig {
        &mut self.config
    }

    /// One full mutation step: parametric trials, then structural mutation.
    pub fn mutate<R: RandomSource + ?Sized>(&self, graph: &mut Graph, rng: &mut R) {
        self.mutate_parameters(graph, rng);
        self.mutate_structure(graph, rng);
    }

    /// Run the parametric trials.
    pub fn mutate_parameters<R: RandomSource + ?Sized>(&self, graph: &mut Graph, rng: &mut R) {
        for _ in 0..self.config.mutation_count {
            if rng.chance() < self.config.mutation_prob {
                if rng.chance() < 0.5 {
                    self.mutate_bias(graph, rng);
                } else {
                    self.mutate_weight(graph, rng);
                }
            }
        }
    }

    /// Possibly split a random link, then possibly add a random link.
    pub fn mutate_structure<R: RandomSource + ?Sized>(&self, graph: &mut Graph, rng: &mut R) {
        if rng.chance() < self.config.split_link_prob {
            self.split_random_link(graph, rng);
        }
        if rng.chance() < self.config.add_link_prob {
            self.add_random_link(graph, rng);
        }
    }

    /// Perturb the bias of a uniformly chosen neuron.
    ///
    /// Returns the neuron that changed, or `None` for an empty graph.
    pub fn mutate_bias<R: RandomSource + ?Sized>(
        &self,
        graph: &mut Graph,
        rng: &mut R,
    ) -> Option<NeuronId> {
        let count = graph.neuron_count();
        if count == 0 {
            trace!("bias mutation skipped: no neurons");
            return None;
        }
        let id = *graph.neuron_ids().get(rng.uniform_int(0, count - 1))?;
        let current = graph.neuron(id)?.bias;
        graph.set_bias(id, self.perturb(current, &self.config.bias, rng));
        Some(id)
    }

    /// Perturb the weight of a uniformly chosen link.
    ///
    /// Returns the link that changed, or `None` when there are no links.
    pub fn mutate_weight<R: RandomSource + ?Sized>(
        &self,
        graph: &mut Graph,
        rng: &mut R,
    ) -> Option<LinkId> {
        let count = graph.link_count();
        if count == 0 {
            trace!("weight mutation skipped: no links");
            return None;
        }
        let id = *graph.link_ids().get(rng.uniform_int(0, count - 1))?;
        let current = graph.link(id)?.weight;
        graph.set_weight(id, self.perturb(current, &self.config.weight, rng));
        Some(id)
    }

    /// Split a uniformly chosen link.
    ///
    /// Returns the inserted neuron, or `None` when there are no links.
    pub fn split_random_link<R: RandomSource + ?Sized>(
        &self,
        graph: &mut Graph,
        rng: &mut R,
    ) -> Option<NeuronId> {
        let count = graph.link_count();
        if count == 0 {
            trace!("split skipped: no links");
            return None;
        }
        let id = *graph.link_ids().get(rng.uniform_int(0, count - 1))?;
        let created = graph.split_link(id);
        debug!("split mutation: {} neurons", graph.neuron_count());
        created
    }

    /// Link two uniformly chosen neurons (drawn with replacement) with a fresh
    /// weight in `[-1, 1]`.
    ///
    /// The request goes through [`Graph::add_link`], so it may overwrite,
    /// reverse or be rejected. Returns the resulting link, if any.
    pub fn add_random_link<R: RandomSource + ?Sized>(
        &self,
        graph: &mut Graph,
        rng: &mut R,
    ) -> Option<LinkId> {
        let count = graph.neuron_count();
        if count < 2 {
            trace!("link mutation skipped: fewer than two neurons");
            return None;
        }
        let a = *graph.neuron_ids().get(rng.uniform_int(0, count - 1))?;
        let b = *graph.neuron_ids().get(rng.uniform_int(0, count - 1))?;
        let weight = rng.unit();
        graph.add_link(a, b, weight)
    }

    /// Replace, jump or nudge `value`.
    fn perturb<R: RandomSource + ?Sized>(
        &self,
        value: f64,
        param: &ParamMutation,
        rng: &mut R,
    ) -> f64 {
        if rng.chance() < self.config.new_value_prob {
            rng.unit()
        } else if rng.chance() < param.full_prob {
            value + rng.unit() * param.full_range
        } else {
            value + rng.unit() * param.small_range
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::VecDeque;

    fn test_rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    /// Replays queued draws: reals are mapped onto the requested range from a
    /// unit fraction, integers are returned as-is.
    #[derive(Default)]
    struct Scripted {
        reals: VecDeque<f64>,
        ints: VecDeque<usize>,
    }

    impl Scripted {
        fn reals(mut self, values: &[f64]) -> Self {
            self.reals.extend(values);
            self
        }

        fn ints(mut self, values: &[usize]) -> Self {
            self.ints.extend(values);
            self
        }
    }

    impl RandomSource for Scripted {
        fn uniform_real(&mut self, min: f64, max: f64) -> f64 {
            let fraction = self.reals.pop_front().expect("script ran out of reals");
            min + fraction * (max - min)
        }

        fn uniform_int(&mut self, min: usize, max: usize) -> usize {
            let value = self.ints.pop_front().expect("script ran out of ints");
            assert!((min..=max).contains(&value), "{value} not in {min}..={max}");
            value
        }
    }

    #[test]
    fn test_default_config_values() {
        let config = EvolverConfig::default();
        assert_eq!(config.mutation_count, 4);
        assert!((config.mutation_prob - 0.25).abs() < 1e-12);
        assert!((config.new_value_prob - 0.2).abs() < 1e-12);
        assert!((config.bias.full_prob - 0.25).abs() < 1e-12);
        assert!((config.weight.full_prob - 0.75).abs() < 1e-12);
        assert!((config.split_link_prob - 0.05).abs() < 1e-12);
        assert!((config.add_link_prob - 0.8).abs() < 1e-12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let config = EvolverConfig {
            add_link_prob: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(NeatError::InvalidConfig(msg)) if msg.contains("add_link_prob")
        ));

        let mut config = EvolverConfig::default();
        config.weight.small_range = -0.1;
        assert!(Evolver::try_new(config).is_err());
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = EvolverConfig::parametric_only();
        let json = config.to_json().unwrap();
        assert_eq!(EvolverConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_config_json_defaults_missing_fields() {
        let config = EvolverConfig::from_json(r#"{ "mutation_count": 9 }"#).unwrap();
        assert_eq!(config.mutation_count, 9);
        assert!((config.add_link_prob - 0.8).abs() < 1e-12);

        assert!(EvolverConfig::from_json("{ not json").is_err());
        assert!(EvolverConfig::from_json(r#"{ "mutation_prob": -1.0 }"#).is_err());
    }

    #[test]
    fn test_perturb_replaces_value() {
        let evolver = Evolver::default();
        // new value roll 0.1 < 0.2, then unit draw fraction 0.75 -> 0.5
        let mut rng = Scripted::default().reals(&[0.1, 0.75]);
        let value = evolver.perturb(10.0, &evolver.config().bias, &mut rng);
        assert!((value - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_perturb_full_range_jump() {
        let evolver = Evolver::default();
        // no replacement (0.9), full jump (0.1 < 0.75), unit fraction 1.0 -> +1.0
        let mut rng = Scripted::default().reals(&[0.9, 0.1, 1.0]);
        let value = evolver.perturb(0.25, &evolver.config().weight, &mut rng);
        assert!((value - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_perturb_small_nudge() {
        let evolver = Evolver::default();
        // no replacement, no jump (0.5 >= 0.25), unit fraction 0.0 -> -1.0 * 0.01
        let mut rng = Scripted::default().reals(&[0.9, 0.5, 0.0]);
        let value = evolver.perturb(0.25, &evolver.config().bias, &mut rng);
        assert!((value - 0.24).abs() < 1e-12);
    }

    #[test]
    fn test_mutate_bias_targets_drawn_neuron() {
        let mut graph = Graph::unconnected(2, 1);
        let evolver = Evolver::default();
        let mut rng = Scripted::default().ints(&[2]).reals(&[0.0, 1.0]);

        let id = evolver.mutate_bias(&mut graph, &mut rng).unwrap();
        assert_eq!(id, graph.output_ids()[0]);
        assert!((graph.neuron(id).unwrap().bias - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mutate_weight_without_links_is_noop() {
        let mut graph = Graph::unconnected(2, 1);
        let evolver = Evolver::default();
        let mut rng = Scripted::default();
        assert!(evolver.mutate_weight(&mut graph, &mut rng).is_none());
        assert!(evolver.split_random_link(&mut graph, &mut rng).is_none());
    }

    #[test]
    fn test_add_random_link_needs_two_neurons() {
        let mut graph = Graph::unconnected(1, 0);
        let evolver = Evolver::default();
        let mut rng = Scripted::default();
        assert!(evolver.add_random_link(&mut graph, &mut rng).is_none());
    }

    #[test]
    fn test_add_random_link_reverses_inverted_pick() {
        let mut graph = Graph::unconnected(1, 1);
        let evolver = Evolver::default();
        // picks output then input, weight fraction 0.5 -> 0.0
        let mut rng = Scripted::default().ints(&[1, 0]).reals(&[0.5]);

        let id = evolver.add_random_link(&mut graph, &mut rng).unwrap();
        let link = graph.link(id).unwrap();
        assert_eq!(link.from, graph.input_ids()[0]);
        assert_eq!(link.towards, graph.output_ids()[0]);
    }

    #[test]
    fn test_add_random_link_same_hidden_pick_prunes_it() {
        let mut rng = test_rng();
        let mut graph = Graph::new(1, 1, 1, &mut rng);
        let hidden = graph.hidden_ids()[0];
        let evolver = Evolver::default();
        // insertion order is input, hidden, output
        let mut script = Scripted::default().ints(&[1, 1]).reals(&[0.5]);

        assert!(evolver.add_random_link(&mut graph, &mut script).is_none());
        assert!(graph.neuron(hidden).is_none());
        assert_eq!(graph.link_count(), 0);
        assert!(graph.is_layer_consistent());
    }

    #[test]
    fn test_structural_mutation_forced() {
        let mut rng = test_rng();
        let mut graph = Graph::new(2, 1, 0, &mut rng);
        let evolver = Evolver::new(EvolverConfig {
            split_link_prob: 1.0,
            add_link_prob: 0.0,
            ..EvolverConfig::structural_only()
        });

        evolver.mutate(&mut graph, &mut rng);

        assert_eq!(graph.neuron_count(), 4);
        assert_eq!(graph.link_count(), 3);
        assert!(graph.is_layer_consistent());
    }

    #[test]
    fn test_parametric_only_keeps_topology() {
        let mut rng = test_rng();
        let mut graph = Graph::new(3, 2, 1, &mut rng);
        let evolver = Evolver::new(EvolverConfig {
            mutation_prob: 1.0,
            ..EvolverConfig::parametric_only()
        });

        let neurons = graph.neuron_count();
        let links = graph.link_count();
        let before: Vec<f64> = graph.links().map(|(_, l)| l.weight).collect();
        for _ in 0..20 {
            evolver.mutate(&mut graph, &mut rng);
        }
        let after: Vec<f64> = graph.links().map(|(_, l)| l.weight).collect();

        assert_eq!(graph.neuron_count(), neurons);
        assert_eq!(graph.link_count(), links);
        assert_ne!(before, after);
    }

    #[test]
    fn test_long_mutation_run_stays_consistent() {
        let mut rng = test_rng();
        let mut graph = Graph::new(3, 2, 0, &mut rng);
        let evolver = Evolver::new(EvolverConfig {
            split_link_prob: 0.3,
            ..Default::default()
        });

        for _ in 0..300 {
            evolver.mutate(&mut graph, &mut rng);
            assert!(graph.is_layer_consistent());
        }
        assert_eq!(graph.in_size(), 3);
        assert_eq!(graph.out_size(), 2);
        assert_eq!(graph.hidden_ids().len(), graph.neuron_count() - 5);
    }
}
