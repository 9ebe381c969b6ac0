use crate::error::Result;
use crate::nn::{ForwardHooks, Module};
use crate::tensor::{Tensor, TensorOps};

/// Flattens the input tensor into a 2D tensor (batch_size, remaining_features).
///
/// Assumes the first dimension is the batch dimension and flattens all subsequent dimensions.
/// Input shape: (B, D1, D2, ...)
/// Output shape: (B, D1 * D2 * ...)
#[derive(Default)]
pub struct Flatten {
    hooks: ForwardHooks,
}

impl Flatten {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Module for Flatten {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let shape = x.shape();
        if shape.len() < 2 {
            // Already flat or scalar
            return Ok(x.clone());
        }

        let batch_size = shape[0];
        let flattened_size: usize = shape[1..].iter().product();
        x.reshape(&[batch_size, flattened_size])
    }

    fn name(&self) -> &'static str {
        "Flatten"
    }

    fn hooks(&self) -> &ForwardHooks {
        &self.hooks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RawTensor;

    #[test]
    fn test_flatten() -> Result<()> {
        let flatten = Flatten::new();
        // B=2, C=2, H=2, W=2 -> 2 x 8
        let x = RawTensor::zeros(&[2, 2, 2, 2]);
        let y = flatten.forward(&x)?;

        assert_eq!(y.shape(), vec![2, 8]);
        Ok(())
    }
}
