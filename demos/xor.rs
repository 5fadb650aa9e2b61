//! XOR example for layered-neat.
//!
//! Evolves a network for the XOR problem with a small truncation-selection
//! loop: every generation each survivor spawns mutated copies, and the best
//! graphs by squared error carry over. The champion is printed in the text
//! encoding at the end.
//!
//! Run with: `RUST_LOG=info cargo run --example xor`

use layered_neat::{codec, evaluate, Evolver, EvolverConfig, Graph};
use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// XOR truth table
const CASES: [([f64; 2], f64); 4] = [
    ([0.0, 0.0], 0.0),
    ([0.0, 1.0], 1.0),
    ([1.0, 0.0], 1.0),
    ([1.0, 1.0], 0.0),
];

/// Fitness: higher is better. Maximum is 4.0 (zero error).
fn fitness(graph: &mut Graph) -> f64 {
    let mut total_error = 0.0;
    for (inputs, expected) in &CASES {
        match evaluate(graph, inputs) {
            Ok(output) => total_error += (output[0] - expected).powi(2),
            Err(_) => return f64::NEG_INFINITY,
        }
    }
    4.0 - total_error
}

fn main() {
    env_logger::init();

    println!("XOR Example");
    println!("===========\n");

    let config = EvolverConfig {
        mutation_count: 6,
        mutation_prob: 0.5,
        split_link_prob: 0.1,
        add_link_prob: 0.5,
        ..EvolverConfig::default()
    };
    let evolver = match Evolver::try_new(config) {
        Ok(evolver) => evolver,
        Err(e) => {
            eprintln!("invalid config: {e}");
            return;
        }
    };

    let survivors = 10;
    let offspring_per_survivor = 10;
    let generations = 200;
    let seed = 42;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut population: Vec<(f64, Graph)> = (0..survivors * offspring_per_survivor)
        .map(|_| {
            let mut graph = Graph::new(2, 1, 1, &mut rng);
            (fitness(&mut graph), graph)
        })
        .collect();

    println!("Population: {}", population.len());
    println!("Generations: {generations}");
    println!();

    let mut solution_generation = None;

    for gen in 0..generations {
        population.sort_by(|a, b| b.0.total_cmp(&a.0));
        population.truncate(survivors);

        let parents: Vec<Graph> = population.iter().map(|(_, g)| g.clone()).collect();
        for parent in &parents {
            for _ in 1..offspring_per_survivor {
                let mut child = parent.clone();
                evolver.mutate(&mut child, &mut rng);
                population.push((fitness(&mut child), child));
            }
        }

        population.sort_by(|a, b| b.0.total_cmp(&a.0));
        let (best, champion) = &population[0];

        if *best >= 3.9 && solution_generation.is_none() {
            solution_generation = Some(gen);
        }

        if gen % 10 == 0 || gen == generations - 1 {
            let avg = population.iter().map(|(f, _)| f).sum::<f64>() / population.len() as f64;
            info!(
                "gen {gen:3}: best={best:.4}, avg={avg:.4}, neurons={}, links={}, layers={}",
                champion.neuron_count(),
                champion.link_count(),
                champion.layers().len()
            );
        }
    }

    let Some((best, champion)) = population.first_mut() else {
        return;
    };

    println!("Evolution Complete!");
    println!("==================");
    println!("Best fitness: {best:.4}");
    println!("Neurons: {}", champion.neuron_count());
    println!("Links: {}", champion.link_count());
    println!("Hidden neurons: {}", champion.hidden_ids().len());

    if let Some(gen) = solution_generation {
        println!("Solution found at generation: {gen}");
    }

    println!("\nChampion XOR outputs:");
    for (inputs, expected) in &CASES {
        let Ok(output) = evaluate(champion, inputs) else {
            continue;
        };
        let rounded = if output[0] > 0.5 { 1.0 } else { 0.0 };
        let status = if (rounded - expected).abs() < 0.1 {
            "✓"
        } else {
            "✗"
        };
        println!(
            "  {} XOR {} = {:.4} (expected {}) {}",
            inputs[0], inputs[1], output[0], expected, status
        );
    }

    println!("\nEncoded champion:\n{}", codec::serialize(champion));
}
