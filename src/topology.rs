//! Layer assignment for feed-forward evaluation.
//!
//! [`Layering::compute`] partitions a graph's neurons into layers so that every
//! link goes from a shallower layer to a deeper one:
//!
//! 1. All inputs form layer 0.
//! 2. A hidden neuron joins the next layer once every one of its incoming links
//!    leaves an already-layered neuron. Hidden neurons without any incoming link
//!    join the first layer after the inputs.
//! 3. When no neuron can join, all outputs are appended as the final layer,
//!    whether or not anything reaches them.
//! 4. Hidden neurons that never joined (they sit on a cycle or downstream of
//!    one) are reported as unreachable and get pruned by the graph.
//!
//! The pass always runs from scratch. Pending in-degree counters keep it at
//! O(V + E) plus a sort per layer, which keeps each layer in insertion order.

use slotmap::SecondaryMap;

use crate::gene::{NeuronId, Role};
use crate::graph::Graph;

/// Result of one layering pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layering {
    /// Neurons per layer, each layer in insertion order.
    pub layers: Vec<Vec<NeuronId>>,
    /// Hidden neurons that could not be placed.
    pub unreachable: Vec<NeuronId>,
}

impl Layering {
    /// Layer the graph's current topology.
    #[must_use]
    pub fn compute(graph: &Graph) -> Self {
        let order = graph.neuron_ids();
        let count = order.len();

        let mut index: SecondaryMap<NeuronId, usize> = SecondaryMap::with_capacity(count);
        for (i, &id) in order.iter().enumerate() {
            index.insert(id, i);
        }

        let roles: Vec<Option<Role>> = order
            .iter()
            .map(|&id| graph.neuron(id).map(|n| n.role))
            .collect();
        let mut pending: Vec<usize> = order
            .iter()
            .map(|&id| graph.neuron(id).map_or(0, |n| n.incoming().len()))
            .collect();
        let mut placed = vec![false; count];

        let mut layers: Vec<Vec<NeuronId>> = Vec::new();
        let mut frontier: Vec<usize> = (0..count)
            .filter(|&i| roles[i] == Some(Role::Input))
            .collect();
        let mut first_pass = true;

        while !frontier.is_empty() {
            for &i in &frontier {
                placed[i] = true;
            }

            let mut next: Vec<usize> = Vec::new();
            if first_pass {
                next.extend(
                    (0..count)
                        .filter(|&i| !placed[i] && pending[i] == 0 && roles[i] == Some(Role::Hidden)),
                );
                first_pass = false;
            }

            for &i in &frontier {
                let Some(neuron) = graph.neuron(order[i]) else {
                    continue;
                };
                for &link_id in neuron.outgoing() {
                    let Some(&t) = graph.link(link_id).and_then(|l| index.get(l.towards)) else {
                        continue;
                    };
                    if placed[t] {
                        continue;
                    }
                    pending[t] = pending[t].saturating_sub(1);
                    if pending[t] == 0 && roles[t] == Some(Role::Hidden) {
                        next.push(t);
                    }
                }
            }

            next.sort_unstable();
            next.dedup();
            layers.push(frontier.iter().map(|&i| order[i]).collect());
            frontier = next;
        }

        layers.push(
            (0..count)
                .filter(|&i| roles[i] == Some(Role::Output))
                .map(|i| order[i])
                .collect(),
        );

        let unreachable = (0..count)
            .filter(|&i| !placed[i] && roles[i] != Some(Role::Output))
            .map(|i| order[i])
            .collect();

        Self {
            layers,
            unreachable,
        }
    }

    /// Number of layers, including the output layer.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.layers.len()
    }
}
