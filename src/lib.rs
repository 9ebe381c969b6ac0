//! Layer-by-layer summaries of neural network models
//!
//! Models are trees of [`Module`]s. Every module owns a table of forward
//! hooks that fire after its forward computation when it is invoked
//! through [`Module::call`]. [`summary`] uses those hooks to trace one
//! random forward pass and reports, per layer, the output shape and the
//! number of parameters, followed by parameter totals and a rough memory
//! estimate.
//!
//! ```
//! use layerscope::nn::{Conv2d, Flatten, Linear, ReLU, Sequential};
//! use layerscope::Summarize;
//!
//! let model = Sequential::new(vec![
//!     Box::new(Conv2d::new(1, 4, 3, 1, 1, true)),
//!     Box::new(ReLU::new()),
//!     Box::new(Flatten::new()),
//!     Box::new(Linear::new(4 * 8 * 8, 10, true)),
//! ]);
//! let report = model.summary(&[vec![1, 8, 8]], 32, "cpu")?;
//! assert_eq!(report.layers.len(), 4);
//! assert_eq!(report.layers[3].output_shape.to_string(), "[32, 10]");
//! # Ok::<(), layerscope::Error>(())
//! ```

pub mod device;
pub mod error;
pub mod io;
pub mod nn;
pub mod ops;
pub mod summary;
pub mod tensor;

pub use device::Device;
pub use error::{Error, Result};
pub use nn::{ForwardHooks, HookHandle, Module};
pub use summary::{
    LayerRecord, OutputShape, Report, SummaryOptions, Summarize, print_summary, summary,
    summary_with,
};
pub use tensor::{RawTensor, Tensor, TensorOps, manual_seed};
