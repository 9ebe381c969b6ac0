//! Layer-by-layer model summaries
//!
//! [`summary`] attaches a forward hook to every non-container sub-module,
//! pushes one batch of random inputs through the model and records what
//! each hooked module saw: the shape of its first input, the shape(s) it
//! produced and how many parameters it owns. The hooks are removed again
//! before the function returns, whether the forward pass succeeded,
//! failed or panicked.
//!
//! ```
//! use layerscope::nn::{Linear, ReLU, Sequential};
//! use layerscope::summary::summary;
//!
//! let model = Sequential::new(vec![
//!     Box::new(Linear::new(8, 4, true)),
//!     Box::new(ReLU::new()),
//! ]);
//! let report = summary(&model, &[vec![8]], -1, "cpu")?;
//! assert_eq!(report.total_params, 8 * 4 + 4);
//! println!("{report}");
//! # Ok::<(), layerscope::Error>(())
//! ```

use crate::device::Device;
use crate::error::{Error, Result};
use crate::nn::{self, HookHandle, Module};
use crate::tensor::{RawTensor, Tensor, TensorOps};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Batch size of the random inputs. Two rows keep batch statistics defined.
pub const SYNTHETIC_BATCH: usize = 2;

const BYTES_PER_ELEMENT: f64 = 4.0;
const MB: f64 = 1024.0 * 1024.0;

const RULE: &str = "----------------------------------------------------------------";
const DOUBLE_RULE: &str = "================================================================";

/// Reporting options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryOptions {
    /// Batch size written into every reported shape; `-1` leaves it open.
    pub batch_size: i64,
    /// `"cpu"` or `"accelerator"`
    pub device: String,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            batch_size: -1,
            device: Device::CPU.name().to_string(),
        }
    }
}

/// Shape(s) produced by one module invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OutputShape {
    Single(Vec<i64>),
    Multi(Vec<Vec<i64>>),
}

impl OutputShape {
    /// Elements across all outputs, with the batch dimension taken by magnitude
    pub fn element_count(&self) -> u64 {
        match self {
            OutputShape::Single(dims) => abs_product(dims),
            OutputShape::Multi(shapes) => shapes.iter().map(|s| abs_product(s)).sum(),
        }
    }

    /// Leading dimension of every output
    pub fn leading_dims(&self) -> Vec<Option<i64>> {
        match self {
            OutputShape::Single(dims) => vec![dims.first().copied()],
            OutputShape::Multi(shapes) => shapes.iter().map(|s| s.first().copied()).collect(),
        }
    }
}

impl fmt::Display for OutputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputShape::Single(dims) => f.write_str(&format_dims(dims)),
            OutputShape::Multi(shapes) => {
                let inner: Vec<String> = shapes.iter().map(|s| format_dims(s)).collect();
                write!(f, "[{}]", inner.join(", "))
            }
        }
    }
}

/// What one hooked module invocation looked like
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerRecord {
    /// `"<Name>-<n>"`, `n` counting invocations from 1
    pub label: String,
    pub input_shape: Vec<i64>,
    pub output_shape: OutputShape,
    pub trainable: bool,
    pub num_params: u64,
}

/// Result of [`summary`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub layers: Vec<LayerRecord>,
    pub total_params: u64,
    pub trainable_params: u64,
    pub input_size_mb: f64,
    pub forward_backward_size_mb: f64,
    pub params_size_mb: f64,
    pub input_sizes: Vec<Vec<usize>>,
    pub batch_size: i64,
    pub device: Device,
}

impl Report {
    fn aggregate(
        layers: Vec<LayerRecord>,
        input_sizes: &[Vec<usize>],
        batch_size: i64,
        device: Device,
    ) -> Self {
        let total_params: u64 = layers.iter().map(|l| l.num_params).sum();
        let trainable_params: u64 = layers
            .iter()
            .filter(|l| l.trainable)
            .map(|l| l.num_params)
            .sum();

        let input_elements: u64 = input_sizes
            .iter()
            .map(|s| s.iter().map(|&d| d as u64).product::<u64>())
            .sum::<u64>()
            * batch_size.unsigned_abs();
        // activations are stored twice: values and their gradients
        let activation_elements: u64 = 2 * layers
            .iter()
            .map(|l| l.output_shape.element_count())
            .sum::<u64>();

        Self {
            total_params,
            trainable_params,
            input_size_mb: to_mb(input_elements),
            forward_backward_size_mb: to_mb(activation_elements),
            params_size_mb: to_mb(total_params),
            layers,
            input_sizes: input_sizes.to_vec(),
            batch_size,
            device,
        }
    }

    pub fn non_trainable_params(&self) -> u64 {
        self.total_params - self.trainable_params
    }

    pub fn total_size_mb(&self) -> f64 {
        self.input_size_mb + self.forward_backward_size_mb + self.params_size_mb
    }

    /// Look up a row by its label, e.g. `"Linear-1"`
    pub fn layer(&self, label: &str) -> Option<&LayerRecord> {
        self.layers.iter().find(|l| l.label == label)
    }

    /// The fixed-width table, as printed by [`print_summary`]
    pub fn render(&self) -> String {
        self.to_string()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(
            f,
            "{:>20}  {:>25} {:>15}",
            "Layer (type)", "Output Shape", "Param #"
        )?;
        writeln!(f, "{DOUBLE_RULE}")?;
        for layer in &self.layers {
            writeln!(
                f,
                "{:>20}  {:>25} {:>15}",
                layer.label,
                layer.output_shape.to_string(),
                group_thousands(layer.num_params)
            )?;
        }
        writeln!(f, "{DOUBLE_RULE}")?;
        writeln!(f, "Total params: {}", group_thousands(self.total_params))?;
        writeln!(f, "Trainable params: {}", group_thousands(self.trainable_params))?;
        writeln!(
            f,
            "Non-trainable params: {}",
            group_thousands(self.non_trainable_params())
        )?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "Input size (MB): {:.2}", self.input_size_mb)?;
        writeln!(
            f,
            "Forward/backward pass size (MB): {:.2}",
            self.forward_backward_size_mb
        )?;
        writeln!(f, "Params size (MB): {:.2}", self.params_size_mb)?;
        writeln!(f, "Estimated Total Size (MB): {:.2}", self.total_size_mb())?;
        writeln!(f, "{RULE}")
    }
}

/// Summarize `model` for inputs of the given shapes (batch dimension excluded).
///
/// `batch_size` is only used for reporting; `-1` means unspecified.
/// `device` is `"cpu"` or `"accelerator"`, in any letter case.
pub fn summary(
    model: &dyn Module,
    input_sizes: &[Vec<usize>],
    batch_size: i64,
    device: &str,
) -> Result<Report> {
    summary_with(
        model,
        input_sizes,
        &SummaryOptions {
            batch_size,
            device: device.to_string(),
        },
    )
}

pub fn summary_with(
    model: &dyn Module,
    input_sizes: &[Vec<usize>],
    options: &SummaryOptions,
) -> Result<Report> {
    let device = Device::resolve(&options.device)?;
    if input_sizes.is_empty() {
        return Err(Error::InvalidArgument(
            "at least one input size is required".to_string(),
        ));
    }
    let batch_size = options.batch_size;
    if batch_size == 0 || batch_size < -1 {
        return Err(Error::InvalidArgument(format!(
            "batch size must be -1 or positive, got {batch_size}"
        )));
    }

    let records: Rc<RefCell<Vec<LayerRecord>>> = Rc::default();
    let handles = instrument(model, batch_size, &records);
    log::debug!(
        "registered {} summary hooks on {}",
        handles.len(),
        model.name()
    );

    let state = StateSnapshot::capture(model);
    let inputs = synthetic_inputs(input_sizes, device);
    let outcome = model.call_many(&inputs);
    // Hooks and buffers are restored before the outcome is inspected so an
    // error leaves no trace.
    drop(handles);
    drop(state);
    outcome?;

    let layers = std::mem::take(&mut *records.borrow_mut());
    Ok(Report::aggregate(layers, input_sizes, batch_size, device))
}

/// Summarize `model` and write the table to stdout.
pub fn print_summary(
    model: &dyn Module,
    input_sizes: &[Vec<usize>],
    batch_size: i64,
    device: &str,
) -> Result<()> {
    let report = summary(model, input_sizes, batch_size, device)?;
    print!("{report}");
    Ok(())
}

/// `model.summary(..)` for every module
pub trait Summarize {
    fn summary(&self, input_sizes: &[Vec<usize>], batch_size: i64, device: &str)
    -> Result<Report>;

    fn print_summary(
        &self,
        input_sizes: &[Vec<usize>],
        batch_size: i64,
        device: &str,
    ) -> Result<()>;
}

impl<M: Module> Summarize for M {
    fn summary(
        &self,
        input_sizes: &[Vec<usize>],
        batch_size: i64,
        device: &str,
    ) -> Result<Report> {
        summary(self, input_sizes, batch_size, device)
    }

    fn print_summary(
        &self,
        input_sizes: &[Vec<usize>],
        batch_size: i64,
        device: &str,
    ) -> Result<()> {
        print_summary(self, input_sizes, batch_size, device)
    }
}

impl Summarize for dyn Module {
    fn summary(
        &self,
        input_sizes: &[Vec<usize>],
        batch_size: i64,
        device: &str,
    ) -> Result<Report> {
        summary(self, input_sizes, batch_size, device)
    }

    fn print_summary(
        &self,
        input_sizes: &[Vec<usize>],
        batch_size: i64,
        device: &str,
    ) -> Result<()> {
        print_summary(self, input_sizes, batch_size, device)
    }
}

/// Hook every module below `root` that does its own computation.
fn instrument(
    root: &dyn Module,
    batch_size: i64,
    records: &Rc<RefCell<Vec<LayerRecord>>>,
) -> Vec<HookHandle> {
    nn::modules(root)
        .into_iter()
        .skip(1) // the root itself
        .filter(|m| !m.is_container())
        .map(|m| attach(m, batch_size, Rc::clone(records)))
        .collect()
}

fn attach(
    module: &dyn Module,
    batch_size: i64,
    records: Rc<RefCell<Vec<LayerRecord>>>,
) -> HookHandle {
    let name = module.name();
    let weight = module.weight().cloned();
    let bias = module.bias().cloned();

    module.hooks().register(move |inputs, outputs| {
        let input_shape = inputs
            .first()
            .map(|x| with_batch(&x.shape(), batch_size))
            .unwrap_or_default();
        let output_shape = match outputs {
            [y] => OutputShape::Single(with_batch(&y.shape(), batch_size)),
            many => OutputShape::Multi(
                many.iter()
                    .map(|y| with_batch(&y.shape(), batch_size))
                    .collect(),
            ),
        };
        let trainable = weight.as_ref().is_some_and(|w| w.borrow().requires_grad);
        let num_params = [weight.as_ref(), bias.as_ref()]
            .into_iter()
            .flatten()
            .map(|p| p.borrow().numel() as u64)
            .sum();

        let mut records = records.borrow_mut();
        let label = format!("{name}-{}", records.len() + 1);
        log::trace!("{label}: {input_shape:?} -> {output_shape}");
        records.push(LayerRecord {
            label,
            input_shape,
            output_shape,
            trainable,
            num_params,
        });
    })
}

/// Copies of every buffer in the tree, written back on drop.
///
/// The synthetic pass may update running statistics; dropping the snapshot
/// (also during unwinding) undoes that.
struct StateSnapshot {
    saved: Vec<(Tensor, Vec<f32>)>,
}

impl StateSnapshot {
    fn capture(root: &dyn Module) -> Self {
        let saved: Vec<(Tensor, Vec<f32>)> = nn::modules(root)
            .into_iter()
            .flat_map(|m| m.buffers())
            .map(|b| (Rc::clone(b), b.borrow().data.clone()))
            .collect();
        log::debug!("saved {} buffers before the summary pass", saved.len());
        Self { saved }
    }
}

impl Drop for StateSnapshot {
    fn drop(&mut self) {
        for (buffer, data) in self.saved.drain(..) {
            // a panic may have left the buffer borrowed
            if let Ok(mut b) = buffer.try_borrow_mut() {
                b.data = data;
            }
        }
    }
}

fn synthetic_inputs(input_sizes: &[Vec<usize>], device: Device) -> Vec<Tensor> {
    input_sizes
        .iter()
        .map(|size| {
            let mut shape = Vec::with_capacity(size.len() + 1);
            shape.push(SYNTHETIC_BATCH);
            shape.extend_from_slice(size);
            log::debug!("synthetic input {shape:?} on {device}");
            RawTensor::rand(&shape).to_device(device)
        })
        .collect()
}

/// Signed copy of `shape` with the leading dimension replaced by `batch_size`
fn with_batch(shape: &[usize], batch_size: i64) -> Vec<i64> {
    let mut dims: Vec<i64> = shape.iter().map(|&d| d as i64).collect();
    if let Some(first) = dims.first_mut() {
        *first = batch_size;
    }
    dims
}

fn abs_product(dims: &[i64]) -> u64 {
    dims.iter().map(|d| d.unsigned_abs()).product()
}

fn to_mb(elements: u64) -> f64 {
    elements as f64 * BYTES_PER_ELEMENT / MB
}

fn format_dims(dims: &[i64]) -> String {
    let parts: Vec<String> = dims.iter().map(i64::to_string).collect();
    format!("[{}]", parts.join(", "))
}

/// `1234567` -> `"1,234,567"`
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::{Linear, ReLU, Sequential};
    use approx::assert_relative_eq;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_output_shape_display() {
        assert_eq!(OutputShape::Single(vec![-1, 10]).to_string(), "[-1, 10]");
        let multi = OutputShape::Multi(vec![vec![4, 7], vec![4, 7]]);
        assert_eq!(multi.to_string(), "[[4, 7], [4, 7]]");
        assert_eq!(multi.element_count(), 56);
    }

    #[test]
    fn test_with_batch_replaces_leading_dim() {
        assert_eq!(with_batch(&[2, 3, 4], -1), vec![-1, 3, 4]);
        assert_eq!(with_batch(&[], 8), Vec::<i64>::new());
    }

    #[test]
    fn test_render_single_linear() -> Result<()> {
        let model = Sequential::new(vec![Box::new(Linear::new(10, 5, true))]);
        let report = summary(&model, &[vec![10]], -1, "cpu")?;

        let expected = format!(
            "{RULE}\n{:>20}  {:>25} {:>15}\n{DOUBLE_RULE}\n{:>20}  {:>25} {:>15}\n{DOUBLE_RULE}\n",
            "Layer (type)", "Output Shape", "Param #", "Linear-1", "[-1, 5]", "55"
        );
        let text = report.render();
        assert!(text.starts_with(&expected), "{text}");
        assert!(text.contains("Total params: 55\n"));
        assert!(text.contains("Trainable params: 55\n"));
        assert!(text.contains("Non-trainable params: 0\n"));
        assert!(text.contains("Estimated Total Size (MB): 0.00\n"));
        Ok(())
    }

    #[test]
    fn test_memory_estimates() -> Result<()> {
        let model = Sequential::new(vec![
            Box::new(Linear::new(256, 1024, true)),
            Box::new(ReLU::new()),
        ]);
        let report = summary(&model, &[vec![256]], 64, "cpu")?;

        assert_relative_eq!(report.input_size_mb, 256.0 * 64.0 * 4.0 / MB);
        // two [64, 1024] activations, doubled
        assert_relative_eq!(
            report.forward_backward_size_mb,
            2.0 * 2.0 * 64.0 * 1024.0 * 4.0 / MB
        );
        assert_relative_eq!(report.params_size_mb, (256.0 * 1024.0 + 1024.0) * 4.0 / MB);
        assert_relative_eq!(
            report.total_size_mb(),
            report.input_size_mb + report.forward_backward_size_mb + report.params_size_mb
        );
        Ok(())
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let model = Sequential::new(vec![Box::new(ReLU::new())]);
        for (sizes, batch, device) in [
            (vec![vec![3]], -1, "gpu"),
            (vec![], -1, "cpu"),
            (vec![vec![3]], 0, "cpu"),
            (vec![vec![3]], -5, "cpu"),
        ] {
            let err = summary(&model, &sizes, batch, device);
            assert!(matches!(err, Err(Error::InvalidArgument(_))), "{device} {batch}");
        }
    }

    #[test]
    fn test_options_default_from_json() -> Result<()> {
        let opts: SummaryOptions = serde_json::from_str("{}")?;
        assert_eq!(opts, SummaryOptions::default());
        let opts: SummaryOptions = serde_json::from_str(r#"{"batch_size": 4}"#)?;
        assert_eq!(opts.batch_size, 4);
        assert_eq!(opts.device, "cpu");
        Ok(())
    }

    #[test]
    fn test_report_json_lists_layers() -> Result<()> {
        let model = Sequential::new(vec![Box::new(Linear::new(3, 2, false))]);
        let json = summary(&model, &[vec![3]], 1, "cpu")?.to_json()?;
        let value: serde_json::Value = serde_json::from_str(&json)?;
        assert_eq!(value["layers"][0]["label"], "Linear-1");
        assert_eq!(value["layers"][0]["output_shape"], serde_json::json!([1, 2]));
        assert_eq!(value["device"], "cpu");
        Ok(())
    }
}
