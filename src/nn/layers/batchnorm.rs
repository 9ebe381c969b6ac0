use crate::error::{Error, Result};
use crate::nn::{ForwardHooks, Module};
use crate::tensor::{RawTensor, Tensor};

/// State shared by the 1d and 2d variants: per-channel affine parameters
/// plus running statistics. Channels live on axis 1.
struct BatchNormCore {
    num_features: usize,
    eps: f32,
    momentum: f32,
    training: bool,
    // Parameters (Learnable)
    gamma: Tensor,
    beta: Tensor,
    // Buffers (Non-learnable)
    running_mean: Tensor,
    running_var: Tensor,
}

impl BatchNormCore {
    fn new(num_features: usize, eps: f32, momentum: f32) -> Self {
        BatchNormCore {
            num_features,
            eps,
            momentum,
            training: true,
            gamma: RawTensor::parameter(RawTensor::ones(&[num_features])),
            beta: RawTensor::parameter(RawTensor::zeros(&[num_features])),
            // Running stats are buffers, so they don't require grad
            running_mean: RawTensor::zeros(&[num_features]),
            running_var: RawTensor::ones(&[num_features]),
        }
    }

    fn normalize(&self, op: &'static str, x: &RawTensor) -> Result<Tensor> {
        let batch = x.shape[0];
        let channels = self.num_features;
        let spatial: usize = x.shape[2..].iter().product();
        let count = batch * spatial;

        let (mean, var) = if self.training {
            if count <= 1 {
                return Err(Error::shape(
                    op,
                    "more than 1 value per channel when training",
                    &x.shape,
                ));
            }
            let mut mean = vec![0.0f32; channels];
            let mut var = vec![0.0f32; channels];
            for b in 0..batch {
                for (c, m) in mean.iter_mut().enumerate() {
                    let start = (b * channels + c) * spatial;
                    *m += x.data[start..start + spatial].iter().sum::<f32>();
                }
            }
            mean.iter_mut().for_each(|m| *m /= count as f32);
            for b in 0..batch {
                for c in 0..channels {
                    let start = (b * channels + c) * spatial;
                    var[c] += x.data[start..start + spatial]
                        .iter()
                        .map(|v| (v - mean[c]).powi(2))
                        .sum::<f32>();
                }
            }
            // biased variance normalises, unbiased variance feeds the running stats
            var.iter_mut().for_each(|v| *v /= count as f32);

            let m = self.momentum;
            let correction = count as f32 / (count as f32 - 1.0);
            let mut rm = self.running_mean.borrow_mut();
            let mut rv = self.running_var.borrow_mut();
            for c in 0..channels {
                rm.data[c] = (1.0 - m) * rm.data[c] + m * mean[c];
                rv.data[c] = (1.0 - m) * rv.data[c] + m * var[c] * correction;
            }
            (mean, var)
        } else {
            (
                self.running_mean.borrow().data.clone(),
                self.running_var.borrow().data.clone(),
            )
        };

        let gamma = self.gamma.borrow();
        let beta = self.beta.borrow();
        let mut out = Vec::with_capacity(x.data.len());
        for (i, chunk) in x.data.chunks(spatial.max(1)).enumerate() {
            let c = i % channels;
            let inv_std = 1.0 / (var[c] + self.eps).sqrt();
            out.extend(
                chunk
                    .iter()
                    .map(|v| (v - mean[c]) * inv_std * gamma.data[c] + beta.data[c]),
            );
        }

        Ok(RawTensor::from_parts(out, &x.shape, false, x.device))
    }

    fn freeze(&self) {
        self.gamma.borrow_mut().requires_grad = false;
        self.beta.borrow_mut().requires_grad = false;
    }
}

/// Batch normalisation over (B, C) or (B, C, L) inputs
pub struct BatchNorm1d {
    core: BatchNormCore,
    hooks: ForwardHooks,
}

impl BatchNorm1d {
    #[must_use]
    pub fn new(num_features: usize) -> Self {
        Self::new_with_params(num_features, 1e-5, 0.1)
    }

    #[must_use]
    pub fn new_with_params(num_features: usize, eps: f32, momentum: f32) -> Self {
        Self {
            core: BatchNormCore::new(num_features, eps, momentum),
            hooks: ForwardHooks::new(),
        }
    }

    pub fn freeze(&mut self) {
        self.core.freeze();
    }

    pub fn running_mean(&self) -> &Tensor {
        &self.core.running_mean
    }

    pub fn running_var(&self) -> &Tensor {
        &self.core.running_var
    }
}

impl Module for BatchNorm1d {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let x = x.borrow();
        match x.shape.as_slice() {
            &[_, c] | &[_, c, _] if c == self.core.num_features => {
                self.core.normalize("BatchNorm1d", &x)
            }
            _ => Err(Error::shape(
                "BatchNorm1d",
                format!(
                    "[B, {}] or [B, {}, L]",
                    self.core.num_features, self.core.num_features
                ),
                &x.shape,
            )),
        }
    }

    fn name(&self) -> &'static str {
        "BatchNorm1d"
    }

    fn hooks(&self) -> &ForwardHooks {
        &self.hooks
    }

    fn weight(&self) -> Option<&Tensor> {
        Some(&self.core.gamma)
    }

    fn bias(&self) -> Option<&Tensor> {
        Some(&self.core.beta)
    }

    fn buffers(&self) -> Vec<&Tensor> {
        vec![&self.core.running_mean, &self.core.running_var]
    }

    fn train(&mut self, mode: bool) {
        self.core.training = mode;
    }
}

/// Batch normalisation over (B, C, H, W) inputs
pub struct BatchNorm2d {
    core: BatchNormCore,
    hooks: ForwardHooks,
}

impl BatchNorm2d {
    #[must_use]
    pub fn new(num_features: usize) -> Self {
        Self::new_with_params(num_features, 1e-5, 0.1)
    }

    #[must_use]
    pub fn new_with_params(num_features: usize, eps: f32, momentum: f32) -> Self {
        Self {
            core: BatchNormCore::new(num_features, eps, momentum),
            hooks: ForwardHooks::new(),
        }
    }

    pub fn freeze(&mut self) {
        self.core.freeze();
    }

    pub fn running_mean(&self) -> &Tensor {
        &self.core.running_mean
    }

    pub fn running_var(&self) -> &Tensor {
        &self.core.running_var
    }
}

impl Module for BatchNorm2d {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let x = x.borrow();
        match x.shape.as_slice() {
            &[_, c, _, _] if c == self.core.num_features => {
                self.core.normalize("BatchNorm2d", &x)
            }
            _ => Err(Error::shape(
                "BatchNorm2d",
                format!("[B, {}, H, W]", self.core.num_features),
                &x.shape,
            )),
        }
    }

    fn name(&self) -> &'static str {
        "BatchNorm2d"
    }

    fn hooks(&self) -> &ForwardHooks {
        &self.hooks
    }

    fn weight(&self) -> Option<&Tensor> {
        Some(&self.core.gamma)
    }

    fn bias(&self) -> Option<&Tensor> {
        Some(&self.core.beta)
    }

    fn buffers(&self) -> Vec<&Tensor> {
        vec![&self.core.running_mean, &self.core.running_var]
    }

    fn train(&mut self, mode: bool) {
        self.core.training = mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TensorOps;
    use approx::assert_abs_diff_eq;
    use std::rc::Rc;

    #[test]
    fn test_batchnorm_parameter_count() {
        assert_eq!(BatchNorm2d::new(64).num_parameters(), 128); // 64 gamma + 64 beta
        assert_eq!(BatchNorm1d::new(512).num_parameters(), 1024);
    }

    #[test]
    fn test_training_output_is_normalised() -> Result<()> {
        let bn = BatchNorm1d::new(2);
        let x = RawTensor::new(vec![1.0, 10.0, 3.0, 30.0], &[2, 2], false)?;
        let y = bn.forward(&x)?;
        let data = y.borrow().data.clone();
        // each channel becomes (-1, 1) up to eps
        assert_abs_diff_eq!(data[0], -1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(data[2], 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(data[1], -1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(data[3], 1.0, epsilon = 1e-3);

        // running mean moved 10% toward the batch mean
        let rm = bn.running_mean().borrow().data.clone();
        assert_abs_diff_eq!(rm[0], 0.2, epsilon = 1e-6);
        assert_abs_diff_eq!(rm[1], 2.0, epsilon = 1e-5);
        Ok(())
    }

    #[test]
    fn test_single_value_per_channel_rejected_in_training() {
        let bn = BatchNorm1d::new(3);
        let err = bn.forward(&RawTensor::rand(&[1, 3]));
        assert!(matches!(err, Err(Error::ShapeMismatch { op: "BatchNorm1d", .. })));
    }

    #[test]
    fn test_eval_uses_running_stats() -> Result<()> {
        let mut bn = BatchNorm2d::new(1);
        bn.eval();
        let x = RawTensor::constant(3.0, &[1, 1, 2, 2]);
        let y = bn.forward(&x)?;
        // running mean 0, running var 1: output ~= input
        assert!(y.borrow().data.iter().all(|v| (v - 3.0).abs() < 1e-3));
        assert_eq!(y.shape(), vec![1, 1, 2, 2]);
        Ok(())
    }

    #[test]
    fn test_channel_mismatch() {
        let bn = BatchNorm2d::new(4);
        assert!(bn.forward(&RawTensor::rand(&[2, 3, 4, 4])).is_err());
        assert!(bn.forward(&RawTensor::rand(&[2, 4])).is_err());
    }

    #[test]
    fn test_buffers_are_running_stats() {
        let bn = BatchNorm1d::new(3);
        let buffers = bn.buffers();
        assert_eq!(buffers.len(), 2);
        assert!(Rc::ptr_eq(buffers[0], bn.running_mean()));
        assert!(Rc::ptr_eq(buffers[1], bn.running_var()));
        assert!(buffers.iter().all(|b| !b.borrow().requires_grad));
    }
}
