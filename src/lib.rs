//! # neurofield
//!
//! A dynamic neural field (DNF) simulation engine.
//!
//! This crate provides 1-D neural fields integrating an Amari-style field
//! equation, lateral-interaction kernels built from truncated Gaussian
//! profiles, and learned or fixed inter-field couplings — wired together as
//! an ordered element graph and advanced tick by tick.
//!
//! ## Quick Start
//!
//! ```
//! use neurofield::prelude::*;
//!
//! // A simulation advancing 1 ms per tick.
//! let mut sim = Simulation::new("demo", 1.0, 0.0, 0.0).unwrap();
//!
//! let dims = ElementDimensions::new(100, 1.0);
//!
//! // A field, its self-excitation kernel, and a stimulus.
//! sim.add_element(
//!     Element::neural_field("field u", dims, NeuralFieldParameters::default()).unwrap(),
//! );
//! sim.add_element(
//!     Element::gauss_kernel("u -> u", dims, GaussKernelParameters::default()).unwrap(),
//! );
//! sim.add_element(Element::gauss_stimulus(
//!     "stimulus",
//!     dims,
//!     GaussStimulusParameters { position: 50.0, ..Default::default() },
//! ).unwrap());
//!
//! sim.create_interaction("field u", "output", "u -> u").unwrap();
//! sim.create_interaction("u -> u", "output", "field u").unwrap();
//! sim.create_interaction("stimulus", "output", "field u").unwrap();
//!
//! // Runs init -> step loop -> close.
//! sim.run(50.0).unwrap();
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): serialization support on parameters, state and
//!   snapshots
//!
//! ## Modules
//!
//! - [`simulation`]: the driver owning the element graph
//! - [`element`]: fields, kernels, stimuli and couplings
//! - [`math`]: convolution and profile primitives
//! - [`observer`]: read-only snapshot adapters

pub mod element;
pub mod error;
pub mod math;
pub mod observer;
pub mod prng;
pub mod simulation;

/// Prelude module for convenient imports.
///
/// ```
/// use neurofield::prelude::*;
/// ```
pub mod prelude {
    pub use crate::element::activation::ActivationFunction;
    pub use crate::element::coupling::{
        FieldCouplingParameters, GaussCoupling, GaussFieldCouplingParameters, LearningRule,
    };
    pub use crate::element::field::{Bump, NeuralFieldParameters, NeuralFieldState};
    pub use crate::element::kernel::{
        AsymmetricGaussKernelParameters, GaussKernelParameters, LateralInteractionsParameters,
        MexicanHatKernelParameters, OscillatoryKernelParameters,
    };
    pub use crate::element::stimulus::{GaussStimulusParameters, NormalNoiseParameters};
    pub use crate::element::{Element, ElementDimensions, ElementId, ElementLabel};
    pub use crate::error::FieldError;
    pub use crate::observer::{FieldSnapshot, SimulationAdapter, SimulationSnapshot};
    pub use crate::simulation::Simulation;
}
