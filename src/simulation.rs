//! The simulation driver: owns the ordered element graph and advances it.
//!
//! Elements are visited strictly in insertion order within one tick. An
//! element whose sources were already stepped this pass reads their fresh
//! output; one whose sources come later reads last tick's values. This
//! Gauss-Seidel/Jacobi hybrid is part of the numerical contract — graph
//! topology includes the insertion order.

use tracing::{info, warn};

use crate::element::coupling::LearningSignals;
use crate::element::{component, Element, ElementDimensions, ElementId, ElementKind, ElementLabel};
use crate::error::FieldError;

#[derive(Debug)]
pub struct Simulation {
    name: String,
    delta_t: f64,
    t_zero: f64,
    t: f64,
    initialized: bool,
    paused: bool,
    elements: Vec<Element>,
}

impl Simulation {
    /// A fresh simulation. `delta_t` must be positive and `t_zero` must not
    /// lie past `t`.
    pub fn new(name: &str, delta_t: f64, t_zero: f64, t: f64) -> Result<Self, FieldError> {
        if delta_t <= 0.0 {
            return Err(FieldError::InvalidSimulationParameter(format!(
                "delta_t must be positive, got {delta_t}"
            )));
        }
        if t_zero > t {
            return Err(FieldError::InvalidSimulationParameter(format!(
                "t_zero ({t_zero}) must not exceed t ({t})"
            )));
        }
        let name = if name.is_empty() { "default sim" } else { name };
        Ok(Self {
            name: name.to_string(),
            delta_t,
            t_zero,
            t,
            initialized: false,
            paused: false,
            elements: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn time(&self) -> f64 {
        self.t
    }

    pub fn delta_t(&self) -> f64 {
        self.delta_t
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Append an element. A duplicate unique name is rejected with a
    /// warning; the simulation is left unchanged.
    pub fn add_element(&mut self, element: Element) {
        if self.elements.iter().any(|e| e.name() == element.name()) {
            warn!(
                element = element.name(),
                "an element with this unique name already exists; not added"
            );
            return;
        }
        info!(element = element.name(), "element added to the simulation");
        self.elements.push(element);
    }

    /// Remove an element by name, detaching it from every dependent's input
    /// set first. An unknown name is reported, not fatal.
    pub fn remove_element(&mut self, name: &str) {
        let Some(index) = self.index_of(name) else {
            warn!(element = name, "element not found; nothing removed");
            return;
        };
        let id = self.elements[index].id();
        for el in &mut self.elements {
            el.remove_input(id);
        }
        self.elements.remove(index);
        info!(element = name, "element removed from the simulation");
    }

    /// Replace a named element in place and initialize the replacement.
    /// Dependents are rewired to the new element's id (integer handles
    /// cannot keep the removed object alive the way shared pointers did).
    pub fn reset_element(&mut self, name: &str, new_element: Element) {
        let Some(index) = self.index_of(name) else {
            warn!(element = name, "element not found; nothing reset");
            return;
        };
        let old_id = self.elements[index].id();
        let new_id = new_element.id();
        self.elements[index] = new_element;
        for el in &mut self.elements {
            el.rewire_input(old_id, new_id);
        }
        let input = self.gather_input(index);
        let el = &mut self.elements[index];
        el.set_input(input);
        el.init();
        info!(element = name, "element reset in the simulation");
    }

    /// Wire `src`'s component into `dst`'s input set. Unknown elements and
    /// component-length mismatches are structural errors; an already
    /// existing edge is only warned about.
    pub fn create_interaction(
        &mut self,
        src: &str,
        src_component: &str,
        dst: &str,
    ) -> Result<(), FieldError> {
        let src_index = self
            .index_of(src)
            .ok_or_else(|| FieldError::ElementNotFound(src.to_string()))?;
        let dst_index = self
            .index_of(dst)
            .ok_or_else(|| FieldError::ElementNotFound(dst.to_string()))?;

        let source_len = self.elements[src_index].component_ref(src_component)?.len();
        let expected = self.elements[dst_index].input_len();
        if source_len != expected {
            return Err(FieldError::InputSizeMismatch {
                source_name: src.to_string(),
                target: dst.to_string(),
                expected,
                found: source_len,
            });
        }

        let src_id = self.elements[src_index].id();
        if self.elements[dst_index].has_input_from(src_id) {
            warn!(source = src, target = dst, "input already exists; not added");
            return Ok(());
        }
        self.elements[dst_index].push_input(src_id, src_component);
        info!(source = src, target = dst, "interaction created");
        Ok(())
    }

    /// Reset time, validate coupling wiring and initialize every element in
    /// container order. Inputs are gathered before each `init` so stimuli
    /// can fold in chained sources.
    pub fn init(&mut self) {
        self.paused = false;
        self.t = self.t_zero;
        self.validate_wiring();
        for index in 0..self.elements.len() {
            let input = self.gather_input(index);
            let el = &mut self.elements[index];
            el.set_input(input);
            el.init();
        }
        self.initialized = true;
        info!(
            simulation = %self.name,
            delta_t = self.delta_t,
            t_zero = self.t_zero,
            "simulation initialized"
        );
    }

    /// Advance one tick: bump time, then gather-and-step every element in
    /// insertion order. A no-op while paused.
    pub fn step(&mut self) {
        if self.paused {
            return;
        }
        self.t += self.delta_t;
        let (t, dt) = (self.t, self.delta_t);
        for index in 0..self.elements.len() {
            let input = self.gather_input(index);
            let learning = self.learning_signals(index);
            let el = &mut self.elements[index];
            el.set_input(input);
            el.step(t, dt, learning);
        }
    }

    /// Zero all element components and drop back to the idle state.
    pub fn close(&mut self) {
        for el in &mut self.elements {
            el.close();
        }
        self.initialized = false;
        info!(simulation = %self.name, "simulation closed");
    }

    pub fn pause(&mut self) {
        self.paused = true;
        info!(simulation = %self.name, "simulation paused");
    }

    pub fn resume(&mut self) {
        self.paused = false;
        info!(simulation = %self.name, "simulation resumed");
    }

    /// Run for `duration` units of simulated time, initializing first if
    /// needed, then close. A paused simulation is resumed (the step loop
    /// could otherwise never finish).
    pub fn run(&mut self, duration: f64) -> Result<(), FieldError> {
        if duration <= 0.0 {
            return Err(FieldError::NonPositiveRunTime(duration));
        }
        self.paused = false;
        if !self.initialized {
            self.init();
        }
        let sim_time = self.t + duration;
        while self.t < sim_time {
            self.step();
        }
        self.close();
        Ok(())
    }

    pub fn element(&self, name: &str) -> Result<&Element, FieldError> {
        self.elements
            .iter()
            .find(|e| e.name() == name)
            .ok_or_else(|| FieldError::ElementNotFound(name.to_string()))
    }

    pub fn element_mut(&mut self, name: &str) -> Result<&mut Element, FieldError> {
        self.elements
            .iter_mut()
            .find(|e| e.name() == name)
            .ok_or_else(|| FieldError::ElementNotFound(name.to_string()))
    }

    pub fn element_at(&self, index: usize) -> Result<&Element, FieldError> {
        self.elements
            .get(index)
            .ok_or(FieldError::ElementIndexOutOfRange {
                index,
                len: self.elements.len(),
            })
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Copy of a component vector, for export and plotting.
    pub fn get_component(&self, name: &str, component_name: &str) -> Result<Vec<f64>, FieldError> {
        self.element(name)?.get_component(component_name)
    }

    /// Borrowed live view of a component vector.
    pub fn component_ref(&self, name: &str, component_name: &str) -> Result<&[f64], FieldError> {
        self.element(name)?.component_ref(component_name)
    }

    /// Elements that read the given component of `name`.
    pub fn dependents_of(&self, name: &str, component_name: &str) -> Vec<&Element> {
        let Some(index) = self.index_of(name) else {
            return Vec::new();
        };
        let id = self.elements[index].id();
        self.elements
            .iter()
            .filter(|e| e.has_input(id, component_name))
            .collect()
    }

    /// The kernel (if any) that both reads this field and feeds back into
    /// it — the field's lateral-interaction loop. Used by metrics surfaces,
    /// not by the integration itself.
    pub fn self_excitation_kernel(&self, field_name: &str) -> Option<&Element> {
        let field = self.elements.iter().find(|e| e.name() == field_name)?;
        let field_id = field.id();
        field.inputs().iter().find_map(|slot| {
            self.elements
                .iter()
                .find(|e| e.id() == slot.source && e.label().is_kernel())
                .filter(|kernel| kernel.has_input_from(field_id))
        })
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.elements.iter().position(|e| e.name() == name)
    }

    fn find_by_id(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id() == id)
    }

    /// Sum the current values of an element's wired input components.
    fn gather_input(&self, index: usize) -> Vec<f64> {
        let receiver = &self.elements[index];
        let mut input = vec![0.0; receiver.input_len()];
        for slot in receiver.inputs() {
            let Some(source) = self.find_by_id(slot.source) else {
                continue;
            };
            match source.component_ref(&slot.component) {
                Ok(values) => {
                    for (acc, &v) in input.iter_mut().zip(values) {
                        *acc += v;
                    }
                }
                Err(_) => warn!(
                    source = source.name(),
                    component = %slot.component,
                    "wired component no longer exists; skipped"
                ),
            }
        }
        input
    }

    /// Teaching signals for a learning coupling: the activation of its wired
    /// source field and of the field it feeds. `None` for everything else.
    fn learning_signals(&self, index: usize) -> Option<LearningSignals> {
        let el = &self.elements[index];
        let ElementKind::FieldCoupling(fc) = el.kind() else {
            return None;
        };
        if !fc.params.learning_active {
            return None;
        }

        let input_field = el.inputs().iter().find_map(|slot| {
            self.elements
                .iter()
                .find(|e| e.id() == slot.source && e.label() == ElementLabel::NeuralField)
        })?;
        let output_field = self
            .elements
            .iter()
            .find(|e| e.label() == ElementLabel::NeuralField && e.has_input_from(el.id()))?;

        Some(LearningSignals {
            input_activation: input_field.component_ref(component::ACTIVATION).ok()?.to_vec(),
            output_activation: output_field
                .component_ref(component::ACTIVATION)
                .ok()?
                .to_vec(),
        })
    }

    /// Pre-init consistency pass over the couplings: a learned coupling
    /// should sit between two fields, and a Gauss coupling adopts its
    /// single input field's dimensions. Violations degrade with a warning.
    fn validate_wiring(&mut self) {
        let mut adopted_dims: Vec<(usize, ElementDimensions)> = Vec::new();

        for (index, el) in self.elements.iter().enumerate() {
            match el.kind() {
                ElementKind::FieldCoupling(fc) => {
                    let source_field = el.inputs().iter().find_map(|slot| {
                        self.elements
                            .iter()
                            .find(|e| e.id() == slot.source && e.label() == ElementLabel::NeuralField)
                    });
                    match source_field {
                        None => warn!(
                            element = el.name(),
                            "field coupling has no neural field input; learning will be skipped"
                        ),
                        Some(field) => {
                            if field.size() != fc.params.input_field_dims.size {
                                warn!(
                                    element = el.name(),
                                    declared = fc.params.input_field_dims.size,
                                    actual = field.size(),
                                    "field coupling input dimensions differ from the wired field"
                                );
                            }
                        }
                    }
                    if fc.params.learning_active
                        && !self.elements.iter().any(|e| {
                            e.label() == ElementLabel::NeuralField && e.has_input_from(el.id())
                        })
                    {
                        warn!(
                            element = el.name(),
                            "learning field coupling feeds no neural field; learning will be skipped"
                        );
                    }
                }
                ElementKind::GaussFieldCoupling(gfc) => {
                    let mut sources = el.inputs().iter().filter_map(|slot| {
                        self.elements
                            .iter()
                            .find(|e| e.id() == slot.source && e.label() == ElementLabel::NeuralField)
                    });
                    match (sources.next(), sources.next()) {
                        (Some(field), None) => {
                            if field.size() == el.input_len() {
                                adopted_dims.push((index, field.dims()));
                            } else {
                                warn!(
                                    element = el.name(),
                                    declared = gfc.params.input_field_dims.size,
                                    actual = field.size(),
                                    "gauss field coupling input size differs from the wired field"
                                );
                            }
                        }
                        _ => warn!(
                            element = el.name(),
                            "gauss field coupling needs exactly one neural field input"
                        ),
                    }
                }
                _ => {}
            }
        }

        for (index, dims) in adopted_dims {
            if let Some(gfc) = self.elements[index].as_gauss_field_coupling_mut() {
                gfc.params.input_field_dims = dims;
            }
        }
    }
}
