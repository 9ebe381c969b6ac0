use crate::error::{Error, Result};
use crate::tensor::Tensor;

pub mod hooks;
pub mod layers;

pub use hooks::{ForwardHookFn, ForwardHooks, HookHandle};
pub use layers::{
    BatchNorm1d, BatchNorm2d, Conv2d, Dropout, Embedding, Flatten, LSTMCell, Linear, MaxPool2d,
    ModuleList, ReLU, Sequential, SequentialBuilder, Sigmoid, Tanh,
};

pub trait Module {
    /// The module's own computation for a single input.
    fn forward(&self, x: &Tensor) -> Result<Tensor>;

    /// Computation over several inputs and/or producing several outputs.
    ///
    /// The default accepts exactly one input and wraps [`Module::forward`].
    /// Multi-input models and multi-output layers override this.
    fn forward_many(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        match inputs {
            [x] => Ok(vec![self.forward(x)?]),
            _ => Err(Error::Arity {
                module: self.name(),
                expected: 1,
                got: inputs.len(),
            }),
        }
    }

    /// Type name used in reports, e.g. `"Linear"`.
    fn name(&self) -> &'static str;

    /// Hook table consulted by [`Module::call`] and [`Module::call_many`].
    fn hooks(&self) -> &ForwardHooks;

    /// Direct sub-modules, in forward order.
    fn children(&self) -> Vec<&dyn Module> {
        Vec::new()
    }

    /// Pure grouping constructs (no computation of their own) return true.
    fn is_container(&self) -> bool {
        false
    }

    fn weight(&self) -> Option<&Tensor> {
        None
    }

    fn bias(&self) -> Option<&Tensor> {
        None
    }

    /// Non-learnable state this module updates during forward, such as
    /// running statistics. Children report their own.
    fn buffers(&self) -> Vec<&Tensor> {
        Vec::new()
    }

    /// Learnable tensors owned by this module and its children
    fn parameters(&self) -> Vec<Tensor> {
        let own = self.weight().into_iter().chain(self.bias()).cloned();
        own.chain(self.children().into_iter().flat_map(|c| c.parameters()))
            .collect()
    }

    fn num_parameters(&self) -> u64 {
        self.parameters()
            .iter()
            .map(|p| p.borrow().numel() as u64)
            .sum()
    }

    /// Switch between training and evaluation modes.
    /// Important for layers like `BatchNorm` and Dropout.
    fn train(&mut self, _mode: bool) {}
    fn eval(&mut self) {
        self.train(false);
    }

    /// Run [`Module::forward`], then this module's forward hooks.
    ///
    /// Containers call their children through here so that hooks fire.
    fn call(&self, x: &Tensor) -> Result<Tensor> {
        let y = self.forward(x)?;
        self.hooks()
            .fire(std::slice::from_ref(x), std::slice::from_ref(&y));
        Ok(y)
    }

    /// Run [`Module::forward_many`], then this module's forward hooks.
    fn call_many(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        let outputs = self.forward_many(inputs)?;
        self.hooks().fire(inputs, &outputs);
        Ok(outputs)
    }
}

/// Pre-order walk over `root` and every module beneath it.
pub fn modules(root: &dyn Module) -> Vec<&dyn Module> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(m) = stack.pop() {
        out.push(m);
        // reversed so the first child is visited first
        stack.extend(m.children().into_iter().rev());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RawTensor;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Identity {
        hooks: ForwardHooks,
    }

    impl Module for Identity {
        fn forward(&self, x: &Tensor) -> Result<Tensor> {
            Ok(x.clone())
        }
        fn name(&self) -> &'static str {
            "Identity"
        }
        fn hooks(&self) -> &ForwardHooks {
            &self.hooks
        }
    }

    #[test]
    fn test_call_fires_hooks_but_forward_does_not() -> Result<()> {
        let m = Identity {
            hooks: ForwardHooks::new(),
        };
        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        let _h = m.hooks().register(move |_, _| f.set(f.get() + 1));

        let x = RawTensor::zeros(&[2, 2]);
        m.forward(&x)?;
        assert_eq!(fired.get(), 0);
        m.call(&x)?;
        m.call_many(&[x])?;
        assert_eq!(fired.get(), 2);
        Ok(())
    }

    #[test]
    fn test_default_forward_many_checks_arity() {
        let m = Identity {
            hooks: ForwardHooks::new(),
        };
        let x = RawTensor::zeros(&[1]);
        let err = m.forward_many(&[x.clone(), x]);
        assert!(matches!(
            err,
            Err(Error::Arity {
                module: "Identity",
                expected: 1,
                got: 2
            })
        ));
    }

    #[test]
    fn test_modules_preorder() {
        let model = Sequential::new(vec![
            Box::new(Linear::new(4, 3, true)),
            Box::new(Sequential::new(vec![Box::new(ReLU::new()), Box::new(Tanh::new())])),
            Box::new(Linear::new(3, 1, true)),
        ]);
        let names: Vec<&str> = modules(&model).iter().map(|m| m.name()).collect();
        assert_eq!(
            names,
            vec!["Sequential", "Linear", "Sequential", "ReLU", "Tanh", "Linear"]
        );
        assert_eq!(model.num_parameters(), (4 * 3 + 3) + (3 + 1));
    }
}
