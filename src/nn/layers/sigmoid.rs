use crate::error::Result;
use crate::nn::{ForwardHooks, Module};
use crate::tensor::{Tensor, TensorOps};

/// Element-wise `1 / (1 + e^-x)`
#[derive(Default)]
pub struct Sigmoid {
    hooks: ForwardHooks,
}

impl Sigmoid {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Module for Sigmoid {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        Ok(x.sigmoid())
    }

    fn name(&self) -> &'static str {
        "Sigmoid"
    }

    fn hooks(&self) -> &ForwardHooks {
        &self.hooks
    }
}
