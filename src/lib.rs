//! # Layered NEAT
//!
//! A topology-evolving feed-forward network engine in the style of NEAT
//! (`NeuroEvolution` of Augmenting Topologies).
//!
//! ## Features
//!
//! - **Arena-Graph Model**: neurons and links live in `SlotMap` arenas; links
//!   hold generational handles, so removing a neuron can never leave a dangling
//!   reference behind
//! - **Always-Evaluable Layering**: every structural edit re-layers the graph
//!   (inputs first, outputs last, every link pointing deeper) and prunes neurons
//!   that can no longer be reached
//! - **Explicit Link Policy**: duplicate links overwrite, inverted links reverse,
//!   input→input / output→output links are rejected
//! - **Configurable Mutation**: bias/weight perturbation plus link splitting and
//!   link insertion, driven by an owned [`EvolverConfig`]
//! - **Text Codec**: a compact `|`/`,`/`;` delimited encoding for persisting genomes
//!
//! ## Quick Start
//!
//! ```rust
//! use layered_neat::{codec, evaluate, Evolver, EvolverConfig, Graph};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let mut graph = Graph::new(2, 1, 1, &mut rng);
//!
//! let evolver = Evolver::new(EvolverConfig::default());
//! for _ in 0..10 {
//!     evolver.mutate(&mut graph, &mut rng);
//! }
//!
//! let output = evaluate(&mut graph, &[0.5, -0.5]).unwrap();
//! assert_eq!(output.len(), 1);
//!
//! let text = codec::serialize(&mut graph);
//! let mut restored = codec::restore(&text).unwrap();
//! assert_eq!(evaluate(&mut restored, &[0.5, -0.5]).unwrap(), output);
//! ```
//!
//! ## Architecture
//!
//! ### Layering
//!
//! Layers are recomputed from scratch after each edit (see [`topology`]). Hosts
//! that make many edits in a row wrap them in [`Graph::batch`], which defers the
//! pass until the batch closes.
//!
//! ### Randomness
//!
//! The engine owns no generator. Construction and mutation take any
//! [`RandomSource`]; every [`rand::Rng`] is one.

pub mod activation;
pub mod codec;
pub mod error;
pub mod evaluator;
pub mod evolver;
pub mod gene;
pub mod graph;
pub mod random;
pub mod topology;

// Re-exports for convenience
pub use activation::{scaled_tanh, Activation};
pub use error::NeatError;
pub use evaluator::{evaluate, evaluate_into};
pub use evolver::{Evolver, EvolverConfig, ParamMutation};
pub use gene::{Link, LinkId, Neuron, NeuronId, Role};
pub use graph::{Graph, LinkPolicy, SPLIT_OUTGOING_WEIGHT};
pub use random::RandomSource;
pub use topology::Layering;

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_generation_cycle() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut graph = Graph::new(2, 1, 0, &mut rng);
        let evolver = Evolver::default();

        for _ in 0..50 {
            evolver.mutate(&mut graph, &mut rng);
            let output = evaluate(&mut graph, &[1.0, -1.0]).unwrap();
            assert!(output[0].is_finite());
        }
    }

    #[test]
    fn test_text_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(123);
        let mut graph = Graph::new(3, 2, 1, &mut rng);
        let link = graph.link_ids()[0];
        graph.split_link(link);

        let text = codec::serialize(&mut graph);
        let restored: Graph = text.parse().expect("restore failed");

        assert_eq!(graph.neuron_count(), restored.neuron_count());
        assert_eq!(graph.link_count(), restored.link_count());
        assert_eq!(graph.in_size(), restored.in_size());
        assert_eq!(graph.out_size(), restored.out_size());
    }
}
