pub mod batchnorm;
pub mod conv;
pub mod dropout;
pub mod embedding;
pub mod flatten;
pub mod linear;
pub mod lstm;
pub mod maxpool;
pub mod relu;
pub mod sequential;
pub mod sequential_builder;
pub mod sigmoid;
pub mod tanh;

pub use batchnorm::{BatchNorm1d, BatchNorm2d};
pub use conv::Conv2d;
pub use dropout::Dropout;
pub use embedding::Embedding;
pub use flatten::Flatten;
pub use linear::Linear;
pub use lstm::LSTMCell;
pub use maxpool::MaxPool2d;
pub use relu::ReLU;
pub use sequential::{ModuleList, Sequential};
pub use sequential_builder::SequentialBuilder;
pub use sigmoid::Sigmoid;
pub use tanh::Tanh;
