use crate::error::{Error, Result};
use crate::{RawTensor, Tensor};

/// Binary operations: two inputs, one output
///
/// Broadcasting is automatically handled for compatible shapes.
#[derive(Clone, Copy, Debug)]
pub enum BinaryOp {
    Add, // x + y
    Sub, // x - y
    Mul, // x * y (element-wise)
}

impl BinaryOp {
    fn apply(self, a: f32, b: f32) -> f32 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
        }
    }
}

impl RawTensor {
    /// Compute the broadcast result shape of two shapes (numpy rules)
    pub fn broadcast_shape(shape_a: &[usize], shape_b: &[usize]) -> Result<Vec<usize>> {
        let max_len = shape_a.len().max(shape_b.len());
        let mut result = vec![1; max_len];

        // Align from right (trailing dimensions)
        for i in 0..max_len {
            let a_dim = shape_a.len().checked_sub(i + 1).map_or(1, |idx| shape_a[idx]);
            let b_dim = shape_b.len().checked_sub(i + 1).map_or(1, |idx| shape_b[idx]);

            result[max_len - 1 - i] = if a_dim == b_dim || b_dim == 1 {
                a_dim
            } else if a_dim == 1 {
                b_dim
            } else {
                return Err(Error::BroadcastError(shape_a.to_vec(), shape_b.to_vec()));
            };
        }
        Ok(result)
    }

    /// Broadcast data from one shape to another
    ///
    /// This repeats values along dimensions where `from_shape` is 1
    /// and `to_shape` is larger.
    pub(crate) fn broadcast_to(data: &[f32], from_shape: &[usize], to_shape: &[usize]) -> Vec<f32> {
        if from_shape == to_shape {
            return data.to_vec();
        }

        let to_size: usize = to_shape.iter().product();
        let mut result = vec![0.0; to_size];

        // Pad from_shape with leading 1s to match rank
        let mut padded_from = vec![1; to_shape.len()];
        let offset = to_shape.len() - from_shape.len();
        padded_from[offset..].copy_from_slice(from_shape);
        let from_strides = Self::compute_strides(&padded_from);
        let to_strides = Self::compute_strides(to_shape);

        for (i, slot) in result.iter_mut().enumerate() {
            let mut from_idx = 0;
            let mut remainder = i;
            for dim in 0..to_shape.len() {
                let coord = remainder / to_strides[dim];
                remainder %= to_strides[dim];
                // broadcast dims read coordinate 0
                if padded_from[dim] != 1 {
                    from_idx += coord * from_strides[dim];
                }
            }
            *slot = data[from_idx];
        }
        result
    }

    pub(crate) fn binary_op(self_t: &Tensor, other: &Tensor, op: BinaryOp) -> Result<Tensor> {
        let a = self_t.borrow();
        let b = other.borrow();
        let out_shape = Self::broadcast_shape(&a.shape, &b.shape)?;

        let bc_a = Self::broadcast_to(&a.data, &a.shape, &out_shape);
        let bc_b = Self::broadcast_to(&b.data, &b.shape, &out_shape);
        let data = bc_a
            .iter()
            .zip(&bc_b)
            .map(|(&x, &y)| op.apply(x, y))
            .collect();

        Ok(Self::from_parts(data, &out_shape, false, a.device))
    }

    pub fn add(self_t: &Tensor, other: &Tensor) -> Result<Tensor> {
        Self::binary_op(self_t, other, BinaryOp::Add)
    }
    pub fn sub(self_t: &Tensor, other: &Tensor) -> Result<Tensor> {
        Self::binary_op(self_t, other, BinaryOp::Sub)
    }
    pub fn elem_mul(self_t: &Tensor, other: &Tensor) -> Result<Tensor> {
        Self::binary_op(self_t, other, BinaryOp::Mul)
    }
}
