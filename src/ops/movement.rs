use crate::error::{Error, Result};
use crate::{RawTensor, Tensor};

impl RawTensor {
    /// Reinterpret the data under a new shape with the same element count
    pub fn reshape(self_t: &Tensor, new_shape: &[usize]) -> Result<Tensor> {
        let s = self_t.borrow();
        let new_size: usize = new_shape.iter().product();
        if new_size != s.numel() {
            return Err(Error::shape(
                "reshape",
                format!("{} elements", new_size),
                &s.shape,
            ));
        }
        Ok(Self::from_parts(
            s.data.clone(),
            new_shape,
            s.requires_grad,
            s.device,
        ))
    }

    /// Slice `len` entries starting at `start` along `dim`
    pub fn narrow(self_t: &Tensor, dim: usize, start: usize, len: usize) -> Result<Tensor> {
        let s = self_t.borrow();
        let Some(&dim_size) = s.shape.get(dim) else {
            return Err(Error::shape("narrow", format!("rank > {dim}"), &s.shape));
        };
        if start + len > dim_size {
            return Err(Error::shape(
                "narrow",
                format!("dim {dim} >= {}", start + len),
                &s.shape,
            ));
        }

        // (outer, dim, inner) view of the data
        let outer: usize = s.shape[..dim].iter().product();
        let inner: usize = s.shape[dim + 1..].iter().product();
        let mut data = Vec::with_capacity(outer * len * inner);
        for o in 0..outer {
            let base = o * dim_size * inner;
            data.extend_from_slice(&s.data[base + start * inner..base + (start + len) * inner]);
        }

        let mut shape = s.shape.clone();
        shape[dim] = len;
        Ok(Self::from_parts(data, &shape, s.requires_grad, s.device))
    }
}
