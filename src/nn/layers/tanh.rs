use crate::error::Result;
use crate::nn::{ForwardHooks, Module};
use crate::tensor::{Tensor, TensorOps};

/// Element-wise `tanh(x)`
#[derive(Default)]
pub struct Tanh {
    hooks: ForwardHooks,
}

impl Tanh {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Module for Tanh {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        Ok(x.tanh())
    }

    fn name(&self) -> &'static str {
        "Tanh"
    }

    fn hooks(&self) -> &ForwardHooks {
        &self.hooks
    }
}
