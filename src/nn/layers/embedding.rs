use crate::error::{Error, Result};
use crate::nn::{ForwardHooks, Module};
use crate::tensor::{RawTensor, Tensor, TensorOps};

/// Lookup table mapping integer indices to dense vectors
///
/// The input tensor holds indices stored as `f32` (fractional parts are
/// truncated). An input of shape `S` produces an output of shape
/// `S + [embedding_dim]`.
pub struct Embedding {
    pub weight: Tensor, // [num_embeddings, embedding_dim]
    num_embeddings: usize,
    dim: usize,
    hooks: ForwardHooks,
}

impl Embedding {
    /// Create an embedding table initialised from N(0, 1)
    #[must_use]
    pub fn new(num_embeddings: usize, embedding_dim: usize) -> Self {
        Self {
            weight: RawTensor::parameter(RawTensor::randn(&[num_embeddings, embedding_dim])),
            num_embeddings,
            dim: embedding_dim,
            hooks: ForwardHooks::new(),
        }
    }

    pub fn embedding_dim(&self) -> usize {
        self.dim
    }

    pub fn freeze(&mut self) {
        self.weight.borrow_mut().requires_grad = false;
    }

    /// Gather rows for the given indices
    ///
    /// Returns a tensor of shape `[indices.len(), embedding_dim]`.
    pub fn lookup(&self, indices: &[usize]) -> Result<Tensor> {
        let weight = self.weight.borrow();
        let mut out = Vec::with_capacity(indices.len() * self.dim);
        for &idx in indices {
            if idx >= self.num_embeddings {
                return Err(Error::InvalidArgument(format!(
                    "index {idx} out of range for {} embeddings",
                    self.num_embeddings
                )));
            }
            out.extend_from_slice(&weight.data[idx * self.dim..(idx + 1) * self.dim]);
        }
        Ok(RawTensor::from_parts(
            out,
            &[indices.len(), self.dim],
            false,
            weight.device,
        ))
    }
}

impl Module for Embedding {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let (indices, mut shape) = {
            let x = x.borrow();
            let indices: Vec<usize> = x.data.iter().map(|&v| v as usize).collect();
            (indices, x.shape.clone())
        };
        shape.push(self.dim);
        self.lookup(&indices)?.reshape(&shape)
    }

    fn name(&self) -> &'static str {
        "Embedding"
    }

    fn hooks(&self) -> &ForwardHooks {
        &self.hooks
    }

    fn weight(&self) -> Option<&Tensor> {
        Some(&self.weight)
    }
}
