// Operation enums and CPU kernels behind `TensorOps`
pub mod binary;
pub mod matmul;
pub mod movement;
pub mod unary;

pub use binary::BinaryOp;
pub use unary::UnaryOp;
