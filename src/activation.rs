//! Activation functions for network neurons.
//!
//! A neuron's activation is fixed by its [`Role`](crate::gene::Role): inputs pass
//! their value through unchanged, hidden and output neurons squash with
//! [`Activation::ScaledTanh`]. [`Activation::ReLU`] is available for hosts that
//! build graphs by hand.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::gene::Role;

/// Activation function types supported by neurons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Activation {
    /// Identity function: f(x) = x
    #[default]
    Identity,
    /// Scaled hyperbolic tangent: f(x) = tanh(x) * 2 / PI
    ScaledTanh,
    /// Rectified Linear Unit: f(x) = max(0, x)
    ReLU,
}

impl Activation {
    /// All available activation functions.
    pub const ALL: [Self; 3] = [Self::Identity, Self::ScaledTanh, Self::ReLU];

    /// Activation assigned to a neuron of the given role.
    #[inline]
    #[must_use]
    pub const fn for_role(role: Role) -> Self {
        match role {
            Role::Input => Self::Identity,
            Role::Output | Role::Hidden => Self::ScaledTanh,
        }
    }

    /// Apply this activation function to an input value.
    ///
    /// NaN propagates unchanged. Infinite inputs map to the function's limit.
    #[inline]
    #[must_use]
    pub fn apply(self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }

        match self {
            Self::Identity => x,
            Self::ScaledTanh => scaled_tanh(x),
            Self::ReLU => x.max(0.0),
        }
    }
}

/// `tanh(x) * 2 / PI`, the squashing function of hidden and output neurons.
#[inline]
#[must_use]
pub fn scaled_tanh(x: f64) -> f64 {
    x.tanh() * 2.0 / PI
}
