//! neurofield demo CLI.
//!
//! Wires two stimulated neural fields through a Hebbian field coupling,
//! runs the simulation and dumps JSON snapshots — the headless version of
//! the classic two-field associative learning setup.
//!
//! Usage: neurofield-cli [ticks]

use neurofield::prelude::*;

fn build(ticks_seed: u64) -> Simulation {
    let mut sim = Simulation::new("two-field demo", 1.0, 0.0, 0.0).expect("valid parameters");
    let dims = ElementDimensions::new(50, 1.0);

    let field_params = NeuralFieldParameters {
        tau: 20.0,
        starting_resting_level: -5.0,
        activation_function: ActivationFunction::Sigmoid {
            x_shift: 0.0,
            steepness: 5.0,
        },
    };
    let kernel_params = GaussKernelParameters {
        width: 3.0,
        amplitude: 4.0,
        circular: true,
        normalized: true,
        ..Default::default()
    };

    for (field, kernel, stim, noise, position, seed) in [
        ("field a", "a -> a", "stim a", "noise a", 20.0, ticks_seed),
        ("field b", "b -> b", "stim b", "noise b", 30.0, ticks_seed + 1),
    ] {
        sim.add_element(
            Element::neural_field(field, dims, field_params.clone()).expect("field"),
        );
        sim.add_element(Element::gauss_kernel(kernel, dims, kernel_params).expect("kernel"));
        sim.add_element(
            Element::gauss_stimulus(
                stim,
                dims,
                GaussStimulusParameters {
                    width: 3.0,
                    amplitude: 15.0,
                    position,
                    circular: true,
                    normalized: false,
                },
            )
            .expect("stimulus"),
        );
        sim.add_element(
            Element::normal_noise(
                noise,
                dims,
                NormalNoiseParameters {
                    amplitude: 0.05,
                    seed: Some(seed),
                },
            )
            .expect("noise"),
        );

        for src in [stim, noise, kernel] {
            sim.create_interaction(src, "output", field).expect("wire");
        }
        sim.create_interaction(field, "output", kernel).expect("wire");
    }

    sim.add_element(
        Element::field_coupling(
            "a -> b",
            dims,
            FieldCouplingParameters {
                input_field_dims: dims,
                learning_rule: LearningRule::Hebbian,
                scalar: 1.0,
                learning_rate: 0.01,
                learning_active: true,
                seed: Some(ticks_seed + 2),
            },
        )
        .expect("coupling"),
    );
    sim.create_interaction("field a", "output", "a -> b").expect("wire");
    sim.create_interaction("a -> b", "output", "field b").expect("wire");

    sim
}

fn main() {
    tracing_subscriber::fmt::init();

    let ticks: usize = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(1000);

    let mut sim = build(42);
    sim.init();
    for _ in 0..ticks {
        sim.step();
    }

    let snapshot = SimulationAdapter::new(&sim).snapshot();
    println!(
        "{}",
        serde_json::to_string_pretty(&snapshot).expect("snapshot serializes")
    );

    let coupling = sim
        .element("a -> b")
        .expect("coupling exists")
        .as_field_coupling()
        .expect("is a field coupling");
    let mut peak = (0usize, 0usize, f64::NEG_INFINITY);
    for (i, row) in coupling.weights().iter().enumerate() {
        for (j, &w) in row.iter().enumerate() {
            if w > peak.2 {
                peak = (i, j, w);
            }
        }
    }
    println!(
        "{}",
        serde_json::json!({
            "ticks": ticks,
            "weight_peak": { "input_index": peak.0, "output_index": peak.1, "value": peak.2 },
        })
    );
}
