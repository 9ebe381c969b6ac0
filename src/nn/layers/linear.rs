use crate::error::{Error, Result};
use crate::nn::{ForwardHooks, Module};
use crate::tensor::{RawTensor, Tensor, TensorOps};

/// Fully-connected (dense/linear) layer
///
/// Computes: y = xW + b
/// where x is (..., in_features), W is (in_features, out_features), b is (out_features).
/// Leading dimensions are treated as batch dimensions.
pub struct Linear {
    pub weight: Tensor,
    pub bias: Option<Tensor>,
    in_features: usize,
    out_features: usize,
    hooks: ForwardHooks,
}

impl Linear {
    /// Create a new linear layer with Xavier-uniform weights and zero bias
    #[must_use]
    pub fn new(in_features: usize, out_features: usize, use_bias: bool) -> Self {
        let weight = RawTensor::parameter(RawTensor::xavier_uniform(&[in_features, out_features]));
        let bias = use_bias.then(|| RawTensor::parameter(RawTensor::zeros(&[out_features])));
        Linear {
            weight,
            bias,
            in_features,
            out_features,
            hooks: ForwardHooks::new(),
        }
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }

    /// Mark weight and bias as non-trainable
    pub fn freeze(&mut self) {
        self.weight.borrow_mut().requires_grad = false;
        if let Some(b) = &self.bias {
            b.borrow_mut().requires_grad = false;
        }
    }
}

impl Module for Linear {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let shape = x.shape();
        match shape.last() {
            Some(&d) if d == self.in_features => {}
            _ => {
                return Err(Error::shape(
                    "Linear",
                    format!("[..., {}]", self.in_features),
                    &shape,
                ));
            }
        }

        let rows = shape[..shape.len() - 1].iter().product();
        let flat = x.reshape(&[rows, self.in_features])?;
        let mut out = flat.matmul(&self.weight)?;
        if let Some(b) = &self.bias {
            out = out.add(b)?;
        }

        let mut out_shape = shape;
        if let Some(last) = out_shape.last_mut() {
            *last = self.out_features;
        }
        out.reshape(&out_shape)
    }

    fn name(&self) -> &'static str {
        "Linear"
    }

    fn hooks(&self) -> &ForwardHooks {
        &self.hooks
    }

    fn weight(&self) -> Option<&Tensor> {
        Some(&self.weight)
    }

    fn bias(&self) -> Option<&Tensor> {
        self.bias.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_forward_shape() -> Result<()> {
        let layer = Linear::new(4, 3, true);
        let y = layer.forward(&RawTensor::rand(&[5, 4]))?;
        assert_eq!(y.shape(), vec![5, 3]);

        // extra leading dims pass through
        let y = layer.forward(&RawTensor::rand(&[2, 7, 4]))?;
        assert_eq!(y.shape(), vec![2, 7, 3]);
        Ok(())
    }

    #[test]
    fn test_linear_known_values() -> Result<()> {
        let layer = Linear::new(2, 1, true);
        layer.weight.borrow_mut().data = vec![2.0, -1.0];
        if let Some(b) = &layer.bias {
            b.borrow_mut().data = vec![0.5];
        }
        let x = RawTensor::new(vec![1.0, 1.0, 3.0, 2.0], &[2, 2], false)?;
        assert_eq!(layer.forward(&x)?.borrow().data, vec![1.5, 4.5]);
        Ok(())
    }

    #[test]
    fn test_linear_rejects_wrong_features() {
        let layer = Linear::new(4, 3, false);
        let err = layer.forward(&RawTensor::zeros(&[2, 5]));
        assert!(matches!(err, Err(Error::ShapeMismatch { op: "Linear", .. })));
    }

    #[test]
    fn test_linear_parameter_count() {
        let layer = Linear::new(784, 512, true);
        assert_eq!(layer.num_parameters(), 784 * 512 + 512);
        assert_eq!(Linear::new(784, 512, false).num_parameters(), 784 * 512);
    }

    #[test]
    fn test_freeze() {
        let mut layer = Linear::new(3, 2, true);
        layer.freeze();
        assert!(layer.parameters().iter().all(|p| !p.borrow().requires_grad));
    }
}
