//! Elements: the nodes of the simulation graph.
//!
//! Every element owns a set of named component vectors ("input", "output",
//! plus kind-specific ones such as "activation" or "kernel") and a list of
//! input slots referencing other elements by id. The driver sums the
//! referenced component vectors into "input" before stepping the element;
//! whatever the element writes into its own components becomes readable by
//! its dependents.

pub mod activation;
pub mod coupling;
pub mod field;
pub mod kernel;
pub mod stimulus;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::FieldError;

use coupling::{FieldCoupling, GaussFieldCoupling, LearningSignals};
use field::NeuralField;
use kernel::{
    AsymmetricGaussKernel, GaussKernel, LateralInteractions, MexicanHatKernel, OscillatoryKernel,
};
use stimulus::{GaussStimulus, NormalNoise};

/// Stable element handle. Ids are process-global and never reused, so graph
/// edges stay valid across removals of unrelated elements.
pub type ElementId = usize;

static ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn next_element_id() -> ElementId {
    ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Well-known component names.
pub mod component {
    pub const INPUT: &str = "input";
    pub const OUTPUT: &str = "output";
    pub const ACTIVATION: &str = "activation";
    pub const RESTING_LEVEL: &str = "resting level";
    pub const KERNEL: &str = "kernel";
    pub const WEIGHTS: &str = "weights";
}

/// Spatial extent of an element: `size` samples covering `[0, x_max]` at
/// resolution `d_x`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElementDimensions {
    pub x_max: i32,
    pub d_x: f64,
    pub size: usize,
}

impl ElementDimensions {
    pub fn new(x_max: i32, d_x: f64) -> Self {
        let size = if d_x > 0.0 {
            (x_max as f64 / d_x).round().max(0.0) as usize
        } else {
            0
        };
        Self { x_max, d_x, size }
    }
}

impl Default for ElementDimensions {
    fn default() -> Self {
        Self::new(100, 1.0)
    }
}

/// Variant tag of an element, mirrored in its serialized form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum ElementLabel {
    NeuralField = 1,
    GaussStimulus = 2,
    GaussKernel = 3,
    MexicanHatKernel = 4,
    NormalNoise = 5,
    FieldCoupling = 6,
    GaussFieldCoupling = 7,
    LateralInteractions = 8,
    OscillatoryKernel = 9,
    AsymmetricGaussKernel = 10,
}

impl ElementLabel {
    /// True for the convolution-kernel family.
    pub fn is_kernel(self) -> bool {
        matches!(
            self,
            ElementLabel::GaussKernel
                | ElementLabel::MexicanHatKernel
                | ElementLabel::LateralInteractions
                | ElementLabel::OscillatoryKernel
                | ElementLabel::AsymmetricGaussKernel
        )
    }
}

impl std::fmt::Display for ElementLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ElementLabel::NeuralField => "neural field",
            ElementLabel::GaussStimulus => "gauss stimulus",
            ElementLabel::GaussKernel => "gauss kernel",
            ElementLabel::MexicanHatKernel => "mexican hat kernel",
            ElementLabel::NormalNoise => "normal noise",
            ElementLabel::FieldCoupling => "field coupling",
            ElementLabel::GaussFieldCoupling => "gauss field coupling",
            ElementLabel::LateralInteractions => "lateral interactions",
            ElementLabel::OscillatoryKernel => "oscillatory kernel",
            ElementLabel::AsymmetricGaussKernel => "asymmetric gauss kernel",
        };
        f.write_str(name)
    }
}

/// One wiring edge: read `component` of the element `source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSlot {
    pub source: ElementId,
    pub component: String,
}

/// Kind-specific payload and behavior.
#[derive(Debug, Clone)]
pub enum ElementKind {
    NeuralField(NeuralField),
    GaussStimulus(GaussStimulus),
    GaussKernel(GaussKernel),
    MexicanHatKernel(MexicanHatKernel),
    NormalNoise(NormalNoise),
    FieldCoupling(FieldCoupling),
    GaussFieldCoupling(GaussFieldCoupling),
    LateralInteractions(LateralInteractions),
    OscillatoryKernel(OscillatoryKernel),
    AsymmetricGaussKernel(AsymmetricGaussKernel),
}

impl ElementKind {
    pub fn label(&self) -> ElementLabel {
        match self {
            ElementKind::NeuralField(_) => ElementLabel::NeuralField,
            ElementKind::GaussStimulus(_) => ElementLabel::GaussStimulus,
            ElementKind::GaussKernel(_) => ElementLabel::GaussKernel,
            ElementKind::MexicanHatKernel(_) => ElementLabel::MexicanHatKernel,
            ElementKind::NormalNoise(_) => ElementLabel::NormalNoise,
            ElementKind::FieldCoupling(_) => ElementLabel::FieldCoupling,
            ElementKind::GaussFieldCoupling(_) => ElementLabel::GaussFieldCoupling,
            ElementKind::LateralInteractions(_) => ElementLabel::LateralInteractions,
            ElementKind::OscillatoryKernel(_) => ElementLabel::OscillatoryKernel,
            ElementKind::AsymmetricGaussKernel(_) => ElementLabel::AsymmetricGaussKernel,
        }
    }
}

/// A node of the simulation graph.
#[derive(Debug, Clone)]
pub struct Element {
    id: ElementId,
    name: String,
    dims: ElementDimensions,
    pub(crate) components: HashMap<String, Vec<f64>>,
    pub(crate) inputs: Vec<InputSlot>,
    kind: ElementKind,
}

impl Element {
    fn base(name: &str, dims: ElementDimensions, kind: ElementKind) -> Result<Self, FieldError> {
        if dims.size == 0 {
            return Err(FieldError::InvalidElementSize(name.to_string()));
        }
        let mut components = HashMap::new();
        components.insert(component::INPUT.to_string(), vec![0.0; dims.size]);
        components.insert(component::OUTPUT.to_string(), vec![0.0; dims.size]);
        Ok(Self {
            id: next_element_id(),
            name: name.to_string(),
            dims,
            components,
            inputs: Vec::new(),
            kind,
        })
    }

    pub fn neural_field(
        name: &str,
        dims: ElementDimensions,
        params: field::NeuralFieldParameters,
    ) -> Result<Self, FieldError> {
        let mut el = Self::base(name, dims, ElementKind::NeuralField(NeuralField::new(params)))?;
        el.components
            .insert(component::ACTIVATION.to_string(), vec![0.0; dims.size]);
        el.components
            .insert(component::RESTING_LEVEL.to_string(), vec![0.0; dims.size]);
        Ok(el)
    }

    pub fn gauss_stimulus(
        name: &str,
        dims: ElementDimensions,
        params: stimulus::GaussStimulusParameters,
    ) -> Result<Self, FieldError> {
        if params.position < 0.0 || params.position >= dims.x_max as f64 {
            return Err(FieldError::StimulusPositionOutOfRange {
                position: params.position,
                x_max: dims.x_max as f64,
            });
        }
        Self::base(name, dims, ElementKind::GaussStimulus(GaussStimulus::new(params)))
    }

    pub fn normal_noise(
        name: &str,
        dims: ElementDimensions,
        params: stimulus::NormalNoiseParameters,
    ) -> Result<Self, FieldError> {
        Self::base(name, dims, ElementKind::NormalNoise(NormalNoise::new(params)))
    }

    pub fn gauss_kernel(
        name: &str,
        dims: ElementDimensions,
        params: kernel::GaussKernelParameters,
    ) -> Result<Self, FieldError> {
        let mut el = Self::base(name, dims, ElementKind::GaussKernel(GaussKernel::new(params)))?;
        el.components
            .insert(component::KERNEL.to_string(), vec![0.0; dims.size]);
        Ok(el)
    }

    pub fn mexican_hat_kernel(
        name: &str,
        dims: ElementDimensions,
        params: kernel::MexicanHatKernelParameters,
    ) -> Result<Self, FieldError> {
        let mut el = Self::base(
            name,
            dims,
            ElementKind::MexicanHatKernel(MexicanHatKernel::new(params)),
        )?;
        el.components
            .insert(component::KERNEL.to_string(), vec![0.0; dims.size]);
        Ok(el)
    }

    pub fn lateral_interactions(
        name: &str,
        dims: ElementDimensions,
        params: kernel::LateralInteractionsParameters,
    ) -> Result<Self, FieldError> {
        let mut el = Self::base(
            name,
            dims,
            ElementKind::LateralInteractions(LateralInteractions::new(params)),
        )?;
        el.components
            .insert(component::KERNEL.to_string(), vec![0.0; dims.size]);
        Ok(el)
    }

    pub fn oscillatory_kernel(
        name: &str,
        dims: ElementDimensions,
        params: kernel::OscillatoryKernelParameters,
    ) -> Result<Self, FieldError> {
        let mut el = Self::base(
            name,
            dims,
            ElementKind::OscillatoryKernel(OscillatoryKernel::new(params)),
        )?;
        el.components
            .insert(component::KERNEL.to_string(), vec![0.0; dims.size]);
        Ok(el)
    }

    pub fn asymmetric_gauss_kernel(
        name: &str,
        dims: ElementDimensions,
        params: kernel::AsymmetricGaussKernelParameters,
    ) -> Result<Self, FieldError> {
        let mut el = Self::base(
            name,
            dims,
            ElementKind::AsymmetricGaussKernel(AsymmetricGaussKernel::new(params)),
        )?;
        el.components
            .insert(component::KERNEL.to_string(), vec![0.0; dims.size]);
        Ok(el)
    }

    pub fn field_coupling(
        name: &str,
        dims: ElementDimensions,
        params: coupling::FieldCouplingParameters,
    ) -> Result<Self, FieldError> {
        if params.input_field_dims.size == 0 {
            return Err(FieldError::InvalidElementSize(name.to_string()));
        }
        let input_size = params.input_field_dims.size;
        let mut el = Self::base(
            name,
            dims,
            ElementKind::FieldCoupling(FieldCoupling::new(name, params, dims.size)),
        )?;
        // The input lives in the source field's coordinate space.
        el.components
            .insert(component::INPUT.to_string(), vec![0.0; input_size]);
        Ok(el)
    }

    pub fn gauss_field_coupling(
        name: &str,
        dims: ElementDimensions,
        params: coupling::GaussFieldCouplingParameters,
    ) -> Result<Self, FieldError> {
        if params.input_field_dims.size == 0 {
            return Err(FieldError::InvalidElementSize(name.to_string()));
        }
        let input_size = params.input_field_dims.size;
        let mut el = Self::base(
            name,
            dims,
            ElementKind::GaussFieldCoupling(GaussFieldCoupling::new(params)),
        )?;
        el.components
            .insert(component::INPUT.to_string(), vec![0.0; input_size]);
        el.components
            .insert(component::WEIGHTS.to_string(), vec![0.0; input_size * dims.size]);
        Ok(el)
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> ElementLabel {
        self.kind.label()
    }

    pub fn dims(&self) -> ElementDimensions {
        self.dims
    }

    pub fn size(&self) -> usize {
        self.dims.size
    }

    pub fn step_size(&self) -> f64 {
        self.dims.d_x
    }

    pub fn max_spatial_dimension(&self) -> i32 {
        self.dims.x_max
    }

    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut ElementKind {
        &mut self.kind
    }

    /// Copy of a named component vector.
    pub fn get_component(&self, name: &str) -> Result<Vec<f64>, FieldError> {
        self.component_ref(name).map(|c| c.to_vec())
    }

    /// Borrowed view of a named component vector.
    pub fn component_ref(&self, name: &str) -> Result<&[f64], FieldError> {
        self.components
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| FieldError::ComponentNotFound {
                element: self.name.clone(),
                component: name.to_string(),
            })
    }

    pub fn component_list(&self) -> Vec<String> {
        self.components.keys().cloned().collect()
    }

    /// Length of the "input" component (the wiring size invariant target).
    pub fn input_len(&self) -> usize {
        self.components[component::INPUT].len()
    }

    pub fn inputs(&self) -> &[InputSlot] {
        &self.inputs
    }

    pub fn has_any_input(&self) -> bool {
        !self.inputs.is_empty()
    }

    pub fn has_input(&self, source: ElementId, component_name: &str) -> bool {
        self.inputs
            .iter()
            .any(|slot| slot.source == source && slot.component == component_name)
    }

    pub fn has_input_from(&self, source: ElementId) -> bool {
        self.inputs.iter().any(|slot| slot.source == source)
    }

    pub(crate) fn push_input(&mut self, source: ElementId, component_name: &str) {
        self.inputs.push(InputSlot {
            source,
            component: component_name.to_string(),
        });
    }

    pub(crate) fn remove_input(&mut self, source: ElementId) {
        self.inputs.retain(|slot| slot.source != source);
    }

    pub(crate) fn rewire_input(&mut self, old: ElementId, new: ElementId) {
        for slot in &mut self.inputs {
            if slot.source == old {
                slot.source = new;
            }
        }
    }

    /// Overwrite the summed "input" component with freshly gathered values.
    pub(crate) fn set_input(&mut self, values: Vec<f64>) {
        self.components.insert(component::INPUT.to_string(), values);
    }

    pub(crate) fn init(&mut self) {
        let dims = self.dims;
        match &mut self.kind {
            ElementKind::NeuralField(k) => k.init(dims, &mut self.components),
            ElementKind::GaussStimulus(k) => k.init(dims, &mut self.components),
            ElementKind::GaussKernel(k) => k.init(dims, &mut self.components),
            ElementKind::MexicanHatKernel(k) => k.init(dims, &mut self.components),
            ElementKind::NormalNoise(k) => k.init(dims, &mut self.components),
            ElementKind::FieldCoupling(k) => k.init(dims, &mut self.components),
            ElementKind::GaussFieldCoupling(k) => k.init(dims, &mut self.components),
            ElementKind::LateralInteractions(k) => k.init(dims, &mut self.components),
            ElementKind::OscillatoryKernel(k) => k.init(dims, &mut self.components),
            ElementKind::AsymmetricGaussKernel(k) => k.init(dims, &mut self.components),
        }
    }

    pub(crate) fn step(&mut self, t: f64, dt: f64, learning: Option<LearningSignals>) {
        let dims = self.dims;
        match &mut self.kind {
            ElementKind::NeuralField(k) => k.step(dims, &mut self.components, t, dt),
            ElementKind::GaussStimulus(k) => k.step(dims, &mut self.components, t, dt),
            ElementKind::GaussKernel(k) => k.step(dims, &mut self.components, t, dt),
            ElementKind::MexicanHatKernel(k) => k.step(dims, &mut self.components, t, dt),
            ElementKind::NormalNoise(k) => k.step(dims, &mut self.components, t, dt),
            ElementKind::FieldCoupling(k) => {
                k.step(dims, &mut self.components, t, dt, learning)
            }
            ElementKind::GaussFieldCoupling(k) => k.step(dims, &mut self.components, t, dt),
            ElementKind::LateralInteractions(k) => k.step(dims, &mut self.components, t, dt),
            ElementKind::OscillatoryKernel(k) => k.step(dims, &mut self.components, t, dt),
            ElementKind::AsymmetricGaussKernel(k) => k.step(dims, &mut self.components, t, dt),
        }
    }

    /// Zero every component. The element object stays usable; `init()`
    /// rebuilds whatever the kind needs.
    pub(crate) fn close(&mut self) {
        for component in self.components.values_mut() {
            component.iter_mut().for_each(|v| *v = 0.0);
        }
    }

    pub fn as_neural_field(&self) -> Option<&NeuralField> {
        match &self.kind {
            ElementKind::NeuralField(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_field_coupling(&self) -> Option<&FieldCoupling> {
        match &self.kind {
            ElementKind::FieldCoupling(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_field_coupling_mut(&mut self) -> Option<&mut FieldCoupling> {
        match &mut self.kind {
            ElementKind::FieldCoupling(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_gauss_field_coupling_mut(&mut self) -> Option<&mut GaussFieldCoupling> {
        match &mut self.kind {
            ElementKind::GaussFieldCoupling(k) => Some(k),
            _ => None,
        }
    }
}
