//! Forward evaluation of a settled graph.
//!
//! Evaluation walks the graph's layers in order. Each neuron activates on
//! `bias + accumulated input`, then pushes `activation * weight` along every
//! outgoing link into the target's accumulator. Because every link points to a
//! deeper layer, one pass suffices.
//!
//! The per-neuron scratch fields (`accumulated_input`, `activated_output`) are
//! reset at the start of every call; nothing else in the graph is touched.

use crate::error::NeatError;
use crate::graph::Graph;

/// Evaluate the network, writing results to a provided buffer.
///
/// This is the allocation-free version for hot evaluation loops.
///
/// # Errors
///
/// - [`NeatError::DimensionMismatch`] if `inputs.len() != graph.in_size()` or
///   `outputs.len() != graph.out_size()`.
/// - [`NeatError::BatchInProgress`] if called from inside [`Graph::batch`].
pub fn evaluate_into(
    graph: &mut Graph,
    inputs: &[f64],
    outputs: &mut [f64],
) -> Result<(), NeatError> {
    if !graph.is_settled() {
        return Err(NeatError::BatchInProgress);
    }
    if inputs.len() != graph.in_size() {
        return Err(NeatError::DimensionMismatch {
            expected: graph.in_size(),
            actual: inputs.len(),
        });
    }
    if outputs.len() != graph.out_size() {
        return Err(NeatError::DimensionMismatch {
            expected: graph.out_size(),
            actual: outputs.len(),
        });
    }

    let Graph {
        neurons,
        links,
        layers,
        input_ids,
        output_ids,
        ..
    } = graph;

    for neuron in neurons.values_mut() {
        neuron.accumulated_input = 0.0;
        neuron.activated_output = 0.0;
    }

    for (&id, &value) in input_ids.iter().zip(inputs) {
        if let Some(neuron) = neurons.get_mut(id) {
            neuron.accumulated_input = value;
        }
    }

    for layer in layers.iter() {
        for &id in layer {
            let Some(neuron) = neurons.get_mut(id) else {
                continue;
            };
            let value = neuron.activation.apply(neuron.bias + neuron.accumulated_input);
            neuron.activated_output = value;
            let outgoing = std::mem::take(&mut neuron.outgoing);

            for link in outgoing.iter().filter_map(|&l| links.get(l)) {
                if let Some(target) = neurons.get_mut(link.towards) {
                    target.accumulated_input += value * link.weight;
                }
            }

            if let Some(neuron) = neurons.get_mut(id) {
                neuron.outgoing = outgoing;
            }
        }
    }

    for (slot, &id) in output_ids.iter().enumerate() {
        outputs[slot] = neurons.get(id).map_or(0.0, |n| n.activated_output);
    }

    Ok(())
}

/// Evaluate the network with given inputs.
///
/// # Returns
///
/// One value per output neuron, in slot order.
///
/// # Errors
///
/// See [`evaluate_into`].
pub fn evaluate(graph: &mut Graph, inputs: &[f64]) -> Result<Vec<f64>, NeatError> {
    let mut outputs = vec![0.0; graph.out_size()];
    evaluate_into(graph, inputs, &mut outputs)?;
    Ok(outputs)
}

impl Graph {
    /// Shorthand for [`evaluate`].
    ///
    /// # Errors
    ///
    /// See [`evaluate_into`].
    pub fn evaluate(&mut self, inputs: &[f64]) -> Result<Vec<f64>, NeatError> {
        evaluate(self, inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::scaled_tanh;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    /// 2 inputs, 1 output, all biases zero.
    fn zero_bias_graph() -> Graph {
        let mut rng = test_rng();
        let mut graph = Graph::new(2, 1, 0, &mut rng);
        let ids = graph.neuron_ids().to_vec();
        for id in ids {
            graph.set_bias(id, 0.0);
        }
        graph
    }

    #[test]
    fn test_evaluator_basic() {
        let mut rng = test_rng();
        let mut graph = Graph::new(2, 1, 1, &mut rng);

        let outputs = evaluate(&mut graph, &[0.5, 0.5]).unwrap();
        assert_eq!(outputs.len(), 1);
        assert!(outputs[0].is_finite());
    }

    #[test]
    fn test_identity_like_setup() {
        let mut graph = zero_bias_graph();
        let (i0, i1) = (graph.input_ids()[0], graph.input_ids()[1]);
        let out = graph.output_ids()[0];
        graph.add_link(i0, out, 1.0);
        graph.add_link(i1, out, 0.0);

        for x in [-2.0, -0.3, 0.0, 0.7, 3.0] {
            let outputs = evaluate(&mut graph, &[x, 5.0]).unwrap();
            assert_eq!(outputs[0], scaled_tanh(x));
        }
    }

    #[test]
    fn test_single_link_scenario() {
        let mut graph = zero_bias_graph();
        let i0 = graph.input_ids()[0];
        let out = graph.output_ids()[0];
        graph.add_link(i0, out, 0.5);

        let outputs = evaluate(&mut graph, &[1.0, 0.0]).unwrap();
        assert!((outputs[0] - scaled_tanh(0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_hidden_neuron_propagates() {
        let mut graph = Graph::unconnected(1, 1);
        let input = graph.input_ids()[0];
        let output = graph.output_ids()[0];
        let link = graph.add_link(input, output, 2.0).unwrap();
        graph.split_link(link);

        let outputs = evaluate(&mut graph, &[0.25]).unwrap();
        let expected = scaled_tanh(scaled_tanh(0.5));
        assert!((outputs[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_evaluator_deterministic() {
        let mut rng = test_rng();
        let mut graph = Graph::new(3, 2, 2, &mut rng);

        let first = evaluate(&mut graph, &[0.5, -0.5, 0.1]).unwrap();
        let second = evaluate(&mut graph, &[0.5, -0.5, 0.1]).unwrap();
        assert_eq!(first, second, "Evaluation should be repeatable");
    }

    #[test]
    fn test_adjacency_untouched() {
        let mut rng = test_rng();
        let mut graph = Graph::new(2, 2, 1, &mut rng);
        let before: Vec<usize> = graph.neurons().map(|(_, n)| n.outgoing().len()).collect();

        evaluate(&mut graph, &[0.2, 0.4]).unwrap();

        let after: Vec<usize> = graph.neurons().map(|(_, n)| n.outgoing().len()).collect();
        assert_eq!(before, after);
        assert!(graph.is_layer_consistent());
    }

    #[test]
    fn test_outputs_in_slot_order() {
        let mut graph = Graph::unconnected(1, 2);
        let input = graph.input_ids()[0];
        let (o0, o1) = (graph.output_ids()[0], graph.output_ids()[1]);
        graph.add_link(input, o0, 1.0);
        graph.add_link(input, o1, -1.0);

        let outputs = evaluate(&mut graph, &[1.0]).unwrap();
        assert!((outputs[0] - scaled_tanh(1.0)).abs() < 1e-12);
        assert!((outputs[1] - scaled_tanh(-1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_input_mismatch() {
        let mut graph = zero_bias_graph();
        let err = evaluate(&mut graph, &[1.0]).unwrap_err();
        assert_eq!(
            err,
            NeatError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_output_buffer_mismatch() {
        let mut graph = zero_bias_graph();
        let mut outputs = [0.0; 3];
        let err = evaluate_into(&mut graph, &[1.0, 1.0], &mut outputs).unwrap_err();
        assert!(matches!(err, NeatError::DimensionMismatch { expected: 1, actual: 3 }));
    }

    #[test]
    fn test_refused_inside_batch() {
        let mut graph = zero_bias_graph();
        let result = graph.batch(|g| evaluate(g, &[0.0, 0.0]));
        assert_eq!(result, Err(NeatError::BatchInProgress));
    }
}
