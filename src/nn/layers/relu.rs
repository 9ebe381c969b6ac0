use crate::error::Result;
use crate::nn::{ForwardHooks, Module};
use crate::tensor::{Tensor, TensorOps};

/// Element-wise `max(0, x)`
#[derive(Default)]
pub struct ReLU {
    hooks: ForwardHooks,
}

impl ReLU {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Module for ReLU {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        Ok(x.relu())
    }

    fn name(&self) -> &'static str {
        "ReLU"
    }

    fn hooks(&self) -> &ForwardHooks {
        &self.hooks
    }
}
