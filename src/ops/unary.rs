use crate::{RawTensor, Tensor};

/// Unary operations: single input, single output
#[derive(Clone, Copy, Debug)]
pub enum UnaryOp {
    Tanh,
    Sigmoid,
    ReLU,
    Scale(f32),
}

impl UnaryOp {
    fn apply(self, x: f32) -> f32 {
        match self {
            UnaryOp::Tanh => x.tanh(),
            UnaryOp::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            UnaryOp::ReLU => x.max(0.0),
            UnaryOp::Scale(k) => x * k,
        }
    }
}

impl RawTensor {
    pub(crate) fn unary_op(self_t: &Tensor, op: UnaryOp) -> Tensor {
        let s = self_t.borrow();
        let data = s.data.iter().map(|&x| op.apply(x)).collect();
        Self::from_parts(data, &s.shape, false, s.device)
    }

    pub fn tanh(self_t: &Tensor) -> Tensor {
        Self::unary_op(self_t, UnaryOp::Tanh)
    }
    pub fn sigmoid(self_t: &Tensor) -> Tensor {
        Self::unary_op(self_t, UnaryOp::Sigmoid)
    }
    pub fn relu(self_t: &Tensor) -> Tensor {
        Self::unary_op(self_t, UnaryOp::ReLU)
    }
    pub fn scale(self_t: &Tensor, factor: f32) -> Tensor {
        Self::unary_op(self_t, UnaryOp::Scale(factor))
    }
}
