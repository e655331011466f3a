//! Read-only observation adapters.
//!
//! Design intent:
//! - Observers cannot mutate or steer the simulation.
//! - Snapshotting is *on-demand* and may allocate; the hot tick loop stays
//!   unchanged.

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::element::field::Bump;
use crate::element::ElementLabel;
use crate::simulation::Simulation;

/// What one neural field is doing right now.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct FieldSnapshot {
    pub name: String,
    pub stable: bool,
    pub lowest_activation: f64,
    pub highest_activation: f64,
    pub bumps: Vec<Bump>,
}

/// A point-in-time view over a whole simulation.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SimulationSnapshot {
    pub name: String,
    pub time: f64,
    pub element_count: usize,
    pub fields: Vec<FieldSnapshot>,
}

pub struct SimulationAdapter<'a> {
    sim: &'a Simulation,
}

impl<'a> SimulationAdapter<'a> {
    pub fn new(sim: &'a Simulation) -> Self {
        Self { sim }
    }

    pub fn snapshot(&self) -> SimulationSnapshot {
        let fields = self
            .sim
            .elements()
            .iter()
            .filter(|el| el.label() == ElementLabel::NeuralField)
            .filter_map(|el| {
                let field = el.as_neural_field()?;
                Some(FieldSnapshot {
                    name: el.name().to_string(),
                    stable: field.state.stable,
                    lowest_activation: field.state.lowest_activation,
                    highest_activation: field.state.highest_activation,
                    bumps: field.state.bumps.clone(),
                })
            })
            .collect();

        SimulationSnapshot {
            name: self.sim.name().to_string(),
            time: self.sim.time(),
            element_count: self.sim.len(),
            fields,
        }
    }
}
