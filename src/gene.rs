//! Building blocks of a network graph.
//!
//! - [`Neuron`]: a node with a bias, a fixed role and its layer assignment
//! - [`Link`]: a weighted directed edge between two neurons
//!
//! Both live in `SlotMap` arenas owned by [`Graph`](crate::graph::Graph). Links
//! refer to their endpoints through generational [`NeuronId`] handles, so a
//! removed neuron can never be reached through a stale link.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::activation::Activation;

new_key_type! {
    /// Handle of a neuron inside its graph.
    pub struct NeuronId;

    /// Handle of a link inside its graph.
    pub struct LinkId;
}

/// The fixed category of a neuron.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Receives external values; always in layer 0.
    Input,
    /// Produces a network output; always in the last layer.
    Output,
    /// Internal neuron created by construction or by splitting a link.
    Hidden,
}

impl Role {
    /// Integer code used by the text codec.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Input => 0,
            Self::Output => 1,
            Self::Hidden => 2,
        }
    }

    /// Inverse of [`Role::code`].
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Input),
            1 => Some(Self::Output),
            2 => Some(Self::Hidden),
            _ => None,
        }
    }
}

/// A neuron in the network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neuron {
    /// Added to the accumulated input before activation.
    pub bias: f64,
    /// Category of this neuron; never changes.
    pub role: Role,
    /// Position in the output vector. `Some` exactly for output neurons.
    pub output_slot: Option<usize>,
    /// Layer index assigned by the last settle pass, `None` while unassigned.
    pub layer: Option<usize>,
    /// Derived from the role at creation.
    pub activation: Activation,
    /// Sum of weighted inputs gathered during the current evaluation.
    #[serde(skip)]
    pub accumulated_input: f64,
    /// Activation result of the current evaluation.
    #[serde(skip)]
    pub activated_output: f64,
    pub(crate) incoming: Vec<LinkId>,
    pub(crate) outgoing: Vec<LinkId>,
}

impl Neuron {
    fn with_role(bias: f64, role: Role, output_slot: Option<usize>) -> Self {
        Self {
            bias,
            role,
            output_slot,
            layer: None,
            activation: Activation::for_role(role),
            accumulated_input: 0.0,
            activated_output: 0.0,
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }
    }

    /// Create a new input neuron.
    #[must_use]
    pub fn input(bias: f64) -> Self {
        Self::with_role(bias, Role::Input, None)
    }

    /// Create a new output neuron writing to `slot`.
    #[must_use]
    pub fn output(bias: f64, slot: usize) -> Self {
        Self::with_role(bias, Role::Output, Some(slot))
    }

    /// Create a new hidden neuron.
    #[must_use]
    pub fn hidden(bias: f64) -> Self {
        Self::with_role(bias, Role::Hidden, None)
    }

    /// Links arriving at this neuron, in insertion order.
    #[must_use]
    pub fn incoming(&self) -> &[LinkId] {
        &self.incoming
    }

    /// Links leaving this neuron, in insertion order.
    #[must_use]
    pub fn outgoing(&self) -> &[LinkId] {
        &self.outgoing
    }
}

/// A weighted directed edge between two neurons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    /// Per-graph number: one above the highest number present when the link
    /// was created, or 0 for the first link.
    pub innovation: u32,
    /// Source neuron.
    pub from: NeuronId,
    /// Target neuron.
    pub towards: NeuronId,
    /// The link weight.
    pub weight: f64,
}

impl Link {
    /// Create a new link.
    #[must_use]
    pub fn new(innovation: u32, from: NeuronId, towards: NeuronId, weight: f64) -> Self {
        Self {
            innovation,
            from,
            towards,
            weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neuron_creation() {
        let input = Neuron::input(0.0);
        assert_eq!(input.role, Role::Input);
        assert_eq!(input.activation, Activation::Identity);
        assert_eq!(input.output_slot, None);
        assert_eq!(input.layer, None);

        let output = Neuron::output(0.5, 2);
        assert_eq!(output.role, Role::Output);
        assert_eq!(output.activation, Activation::ScaledTanh);
        assert_eq!(output.output_slot, Some(2));

        let hidden = Neuron::hidden(-0.25);
        assert_eq!(hidden.role, Role::Hidden);
        assert_eq!(hidden.activation, Activation::ScaledTanh);
        assert!((hidden.bias + 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_role_codes() {
        for role in [Role::Input, Role::Output, Role::Hidden] {
            assert_eq!(Role::from_code(role.code()), Some(role));
        }
        assert_eq!(Role::Input.code(), 0);
        assert_eq!(Role::Output.code(), 1);
        assert_eq!(Role::Hidden.code(), 2);
        assert_eq!(Role::from_code(3), None);
    }

    #[test]
    fn test_link_creation() {
        use slotmap::SlotMap;

        let mut neurons: SlotMap<NeuronId, Neuron> = SlotMap::with_key();
        let a = neurons.insert(Neuron::input(0.0));
        let b = neurons.insert(Neuron::output(0.0, 0));

        let link = Link::new(4, a, b, 0.5);
        assert_eq!(link.from, a);
        assert_eq!(link.towards, b);
        assert_eq!(link.innovation, 4);
        assert!((link.weight - 0.5).abs() < 1e-12);
    }
}
