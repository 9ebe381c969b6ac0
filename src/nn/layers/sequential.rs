use super::sequential_builder::SequentialBuilder;
use crate::error::{Error, Result};
use crate::nn::{ForwardHooks, Module};
use crate::tensor::Tensor;

pub(crate) struct LayerEntry {
    pub(crate) name: Option<String>,
    pub(crate) layer: Box<dyn Module>,
}

/// Runs its layers one after another, feeding each output to the next.
///
/// Layers are invoked through [`Module::call`] so their forward hooks fire.
pub struct Sequential {
    pub(crate) layers: Vec<LayerEntry>,
    pub(crate) hooks: ForwardHooks,
}

impl Sequential {
    pub fn new(layers: Vec<Box<dyn Module>>) -> Self {
        Sequential {
            layers: layers
                .into_iter()
                .map(|layer| LayerEntry { name: None, layer })
                .collect(),
            hooks: ForwardHooks::new(),
        }
    }

    #[must_use]
    pub fn builder() -> SequentialBuilder {
        SequentialBuilder::new()
    }

    pub fn push(&mut self, layer: Box<dyn Module>) {
        self.layers.push(LayerEntry { name: None, layer });
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&dyn Module> {
        self.layers.get(index).map(|e| e.layer.as_ref())
    }

    pub fn layer_names(&self) -> Vec<Option<&str>> {
        self.layers.iter().map(|e| e.name.as_deref()).collect()
    }
}

impl Module for Sequential {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let mut current = x.clone();
        for entry in &self.layers {
            current = entry.layer.call(&current)?;
        }
        Ok(current)
    }

    fn forward_many(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        let mut current = inputs.to_vec();
        for entry in &self.layers {
            current = entry.layer.call_many(&current)?;
        }
        Ok(current)
    }

    fn name(&self) -> &'static str {
        "Sequential"
    }

    fn hooks(&self) -> &ForwardHooks {
        &self.hooks
    }

    fn children(&self) -> Vec<&dyn Module> {
        self.layers.iter().map(|e| e.layer.as_ref()).collect()
    }

    fn is_container(&self) -> bool {
        true
    }

    fn train(&mut self, mode: bool) {
        for entry in &mut self.layers {
            entry.layer.train(mode);
        }
    }
}

/// Holds sub-modules without defining how they are chained.
///
/// The owning module decides the call order in its own forward.
#[derive(Default)]
pub struct ModuleList {
    modules: Vec<Box<dyn Module>>,
    hooks: ForwardHooks,
}

impl ModuleList {
    pub fn new(modules: Vec<Box<dyn Module>>) -> Self {
        Self {
            modules,
            hooks: ForwardHooks::new(),
        }
    }

    pub fn push(&mut self, module: Box<dyn Module>) {
        self.modules.push(module);
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&dyn Module> {
        self.modules.get(index).map(|m| m.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Module> {
        self.modules.iter().map(|m| m.as_ref())
    }
}

impl Module for ModuleList {
    fn forward(&self, _x: &Tensor) -> Result<Tensor> {
        Err(Error::NoForward("ModuleList"))
    }

    fn name(&self) -> &'static str {
        "ModuleList"
    }

    fn hooks(&self) -> &ForwardHooks {
        &self.hooks
    }

    fn children(&self) -> Vec<&dyn Module> {
        self.iter().collect()
    }

    fn is_container(&self) -> bool {
        true
    }

    fn train(&mut self, mode: bool) {
        for m in &mut self.modules {
            m.train(mode);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::{Linear, ReLU};
    use crate::{RawTensor, TensorOps};

    fn build_mlp(input_dim: usize, hidden_dim: usize, output_dim: usize) -> Sequential {
        Sequential::new(vec![
            Box::new(Linear::new(input_dim, hidden_dim, true)),
            Box::new(ReLU::new()),
            Box::new(Linear::new(hidden_dim, output_dim, true)),
        ])
    }

    #[test]
    fn test_sequential_forward() -> Result<()> {
        let model = build_mlp(4, 8, 2);
        let y = model.forward(&RawTensor::rand(&[3, 4]))?;
        assert_eq!(y.shape(), vec![3, 2]);
        assert_eq!(model.len(), 3);
        assert!(model.is_container());
        Ok(())
    }

    #[test]
    fn test_sequential_propagates_layer_errors() {
        let model = build_mlp(4, 8, 2);
        let err = model.forward(&RawTensor::rand(&[3, 5]));
        assert!(matches!(err, Err(Error::ShapeMismatch { op: "Linear", .. })));
    }

    #[test]
    fn test_empty_sequential_is_identity() -> Result<()> {
        let model = Sequential::new(vec![]);
        let x = RawTensor::rand(&[2, 2]);
        assert_eq!(model.forward(&x)?.borrow().data, x.borrow().data);
        Ok(())
    }

    #[test]
    fn test_module_list_has_no_forward() {
        let list = ModuleList::new(vec![Box::new(ReLU::new())]);
        assert!(matches!(
            list.forward(&RawTensor::zeros(&[1])),
            Err(Error::NoForward("ModuleList"))
        ));
        assert_eq!(list.children().len(), 1);
    }
}
