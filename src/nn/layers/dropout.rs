use crate::error::Result;
use crate::nn::{ForwardHooks, Module};
use crate::tensor::{RawTensor, Tensor, TensorOps, with_rng};
use rand::Rng;

pub struct Dropout {
    p: f32,
    training: bool,
    hooks: ForwardHooks,
}

impl Dropout {
    /// Create a new Dropout layer
    ///
    /// # Arguments
    /// * `p` - Probability of an element being zeroed out
    /// # Panics
    /// dropout prob must be in \[0,1\]
    #[must_use]
    pub fn new(p: f32) -> Self {
        assert!(
            (0.0..=1.0).contains(&p),
            "Dropout probability must be in [0, 1]"
        );
        Self {
            p,
            training: true,
            hooks: ForwardHooks::new(),
        }
    }

    pub fn p(&self) -> f32 {
        self.p
    }
}

impl Module for Dropout {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        if !self.training || self.p == 0.0 {
            return Ok(x.clone());
        }
        if self.p == 1.0 {
            return Ok(x.scale(0.0));
        }

        let keep_prob = 1.0 - self.p;
        let scale = 1.0 / keep_prob;
        let (shape, device) = {
            let x_borrow = x.borrow();
            (x_borrow.shape.clone(), x_borrow.device)
        };
        let size: usize = shape.iter().product();

        // 1/keep_prob with prob keep_prob, 0 otherwise
        let mask_data: Vec<f32> = with_rng(|rng| {
            (0..size)
                .map(|_| {
                    if rng.random::<f32>() < keep_prob {
                        scale
                    } else {
                        0.0
                    }
                })
                .collect()
        });
        let mask = RawTensor::from_parts(mask_data, &shape, false, device);

        x.elem_mul(&mask)
    }

    fn name(&self) -> &'static str {
        "Dropout"
    }

    fn hooks(&self) -> &ForwardHooks {
        &self.hooks
    }

    fn train(&mut self, mode: bool) {
        self.training = mode;
    }
}
