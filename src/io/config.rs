//! JSON model descriptions
//!
//! A configuration lists the layers of a [`Sequential`] model in order and
//! may carry the arguments for summarizing it:
//!
//! ```json
//! {
//!   "layers": [
//!     { "type": "conv2d", "in_channels": 3, "out_channels": 8, "kernel_size": 3, "padding": 1 },
//!     { "type": "relu" },
//!     { "type": "flatten" },
//!     { "type": "linear", "in_features": 8192, "out_features": 10, "frozen": true }
//!   ],
//!   "summary": { "input_sizes": [[3, 32, 32]], "batch_size": 16, "device": "cpu" }
//! }
//! ```
//!
//! Every layer accepts an optional `"name"` and an optional `"frozen"` flag
//! that marks its parameters non-trainable.

use crate::error::{Error, Result};
use crate::nn::{
    BatchNorm1d, BatchNorm2d, Conv2d, Dropout, Embedding, Flatten, LSTMCell, Linear, MaxPool2d,
    Module, ReLU, Sequential, Sigmoid, Tanh,
};
use crate::summary::{self, Report, SummaryOptions};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub layers: Vec<LayerConfig>,
    #[serde(default)]
    pub summary: Option<SummaryRequest>,
}

/// Summary arguments stored next to the model
#[derive(Debug, Clone, Deserialize)]
pub struct SummaryRequest {
    pub input_sizes: Vec<Vec<usize>>,
    #[serde(flatten)]
    pub options: SummaryOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LayerConfig {
    #[serde(flatten)]
    pub kind: LayerKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub frozen: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerKind {
    Linear {
        in_features: usize,
        out_features: usize,
        #[serde(default = "default_true")]
        bias: bool,
    },
    Conv2d {
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        #[serde(default = "default_one")]
        stride: usize,
        #[serde(default)]
        padding: usize,
        #[serde(default = "default_true")]
        bias: bool,
    },
    MaxPool2d {
        kernel_size: usize,
        /// Defaults to `kernel_size`
        #[serde(default)]
        stride: Option<usize>,
        #[serde(default)]
        padding: usize,
    },
    BatchNorm1d {
        num_features: usize,
    },
    BatchNorm2d {
        num_features: usize,
    },
    Relu,
    Sigmoid,
    Tanh,
    Flatten,
    Dropout {
        #[serde(default = "default_dropout")]
        p: f32,
    },
    Embedding {
        num_embeddings: usize,
        embedding_dim: usize,
    },
    LstmCell {
        input_size: usize,
        hidden_size: usize,
        #[serde(default = "default_true")]
        bias: bool,
    },
}

fn default_true() -> bool {
    true
}

fn default_one() -> usize {
    1
}

fn default_dropout() -> f32 {
    0.5
}

/// Read and validate a configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<ModelConfig> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse and validate a configuration document.
pub fn parse_config(json: &str) -> Result<ModelConfig> {
    let config: ModelConfig = serde_json::from_str(json)?;
    validate_config(&config)?;
    Ok(config)
}

fn invalid(index: usize, msg: impl std::fmt::Display) -> Error {
    Error::InvalidArgument(format!("layer {index}: {msg}"))
}

fn validate_config(config: &ModelConfig) -> Result<()> {
    for (i, layer) in config.layers.iter().enumerate() {
        match &layer.kind {
            LayerKind::Conv2d {
                kernel_size,
                stride,
                ..
            } => {
                if *kernel_size == 0 {
                    return Err(invalid(i, "kernel_size must be positive"));
                }
                if *stride == 0 {
                    return Err(invalid(i, "stride must be positive"));
                }
            }
            LayerKind::MaxPool2d {
                kernel_size,
                stride,
                ..
            } => {
                if *kernel_size == 0 {
                    return Err(invalid(i, "kernel_size must be positive"));
                }
                if *stride == Some(0) {
                    return Err(invalid(i, "stride must be positive"));
                }
            }
            LayerKind::Dropout { p } => {
                if !(0.0..=1.0).contains(p) {
                    return Err(invalid(i, format!("dropout p must be in [0, 1], got {p}")));
                }
            }
            LayerKind::Embedding { num_embeddings, .. } => {
                if *num_embeddings == 0 {
                    return Err(invalid(i, "num_embeddings must be positive"));
                }
            }
            _ => {}
        }
    }

    if let Some(request) = &config.summary {
        if request.input_sizes.is_empty() {
            return Err(Error::InvalidArgument(
                "summary.input_sizes must not be empty".to_string(),
            ));
        }
        request.options.device.parse::<crate::Device>()?;
    }
    Ok(())
}

fn build_layer(kind: &LayerKind) -> Box<dyn Module> {
    match *kind {
        LayerKind::Linear {
            in_features,
            out_features,
            bias,
        } => Box::new(Linear::new(in_features, out_features, bias)),
        LayerKind::Conv2d {
            in_channels,
            out_channels,
            kernel_size,
            stride,
            padding,
            bias,
        } => Box::new(Conv2d::new(
            in_channels,
            out_channels,
            kernel_size,
            stride,
            padding,
            bias,
        )),
        LayerKind::MaxPool2d {
            kernel_size,
            stride,
            padding,
        } => Box::new(MaxPool2d::new(
            kernel_size,
            stride.unwrap_or(kernel_size),
            padding,
        )),
        LayerKind::BatchNorm1d { num_features } => Box::new(BatchNorm1d::new(num_features)),
        LayerKind::BatchNorm2d { num_features } => Box::new(BatchNorm2d::new(num_features)),
        LayerKind::Relu => Box::new(ReLU::new()),
        LayerKind::Sigmoid => Box::new(Sigmoid::new()),
        LayerKind::Tanh => Box::new(Tanh::new()),
        LayerKind::Flatten => Box::new(Flatten::new()),
        LayerKind::Dropout { p } => Box::new(Dropout::new(p)),
        LayerKind::Embedding {
            num_embeddings,
            embedding_dim,
        } => Box::new(Embedding::new(num_embeddings, embedding_dim)),
        LayerKind::LstmCell {
            input_size,
            hidden_size,
            bias,
        } => Box::new(LSTMCell::new(input_size, hidden_size, bias)),
    }
}

/// Build the described model.
///
/// The configuration is validated again, so hand-built values are checked too.
pub fn build_from_config(config: &ModelConfig) -> Result<Sequential> {
    validate_config(config)?;

    let mut builder = Sequential::builder();
    for layer in &config.layers {
        let module = build_layer(&layer.kind);
        if layer.frozen {
            for p in module.parameters() {
                p.borrow_mut().requires_grad = false;
            }
        }
        builder = match &layer.name {
            Some(name) => builder.add_named(name.clone(), module),
            None => builder.add_unnamed(module),
        };
    }
    let model = builder.build();
    log::debug!("built Sequential with {} layers from config", model.len());
    Ok(model)
}

/// Build the model and run the summary request stored alongside it.
pub fn summarize_config(config: &ModelConfig) -> Result<Report> {
    let request = config.summary.as_ref().ok_or_else(|| {
        Error::InvalidArgument("configuration has no summary section".to_string())
    })?;
    let model = build_from_config(config)?;
    summary::summary_with(&model, &request.input_sizes, &request.options)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CNN: &str = r#"{
        "layers": [
            { "type": "conv2d", "in_channels": 3, "out_channels": 8, "kernel_size": 3, "padding": 1 },
            { "type": "relu", "name": "act" },
            { "type": "max_pool2d", "kernel_size": 2 },
            { "type": "flatten" },
            { "type": "linear", "in_features": 2048, "out_features": 10, "frozen": true }
        ],
        "summary": { "input_sizes": [[3, 32, 32]], "batch_size": 16 }
    }"#;

    #[test]
    fn test_parse_defaults() -> Result<()> {
        let config = parse_config(CNN)?;
        assert_eq!(config.layers.len(), 5);
        assert_eq!(
            config.layers[0].kind,
            LayerKind::Conv2d {
                in_channels: 3,
                out_channels: 8,
                kernel_size: 3,
                stride: 1,
                padding: 1,
                bias: true,
            }
        );
        assert_eq!(config.layers[1].name.as_deref(), Some("act"));
        assert!(config.layers[4].frozen);

        let request = config
            .summary
            .as_ref()
            .map(|s| (s.options.batch_size, s.options.device.as_str()));
        assert_eq!(request, Some((16, "cpu")));
        Ok(())
    }

    #[test]
    fn test_build_applies_names_and_freezing() -> Result<()> {
        let model = build_from_config(&parse_config(CNN)?)?;
        assert_eq!(model.len(), 5);
        assert_eq!(
            model.layer_names(),
            vec![None, Some("act"), None, None, None]
        );
        let last = model.get(4).map(|m| m.parameters());
        assert!(last.is_some_and(|ps| ps.iter().all(|p| !p.borrow().requires_grad)));
        Ok(())
    }

    #[test]
    fn test_summarize_config() -> Result<()> {
        let report = summarize_config(&parse_config(CNN)?)?;
        assert_eq!(report.layers.len(), 5);
        assert_eq!(report.trainable_params, 8 * 27 + 8);
        assert_eq!(report.non_trainable_params(), 2048 * 10 + 10);
        Ok(())
    }

    #[test]
    fn test_rejects_invalid_values() {
        for json in [
            r#"{"layers": [{"type": "dropout", "p": 1.5}]}"#,
            r#"{"layers": [{"type": "conv2d", "in_channels": 1, "out_channels": 1, "kernel_size": 0}]}"#,
            r#"{"layers": [{"type": "max_pool2d", "kernel_size": 2, "stride": 0}]}"#,
            r#"{"layers": [], "summary": {"input_sizes": [[4]], "device": "gpu"}}"#,
            r#"{"layers": [], "summary": {"input_sizes": []}}"#,
        ] {
            assert!(
                matches!(parse_config(json), Err(Error::InvalidArgument(_))),
                "{json}"
            );
        }
    }

    #[test]
    fn test_unknown_layer_type_is_config_error() {
        let err = parse_config(r#"{"layers": [{"type": "transformer"}]}"#);
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config("/nonexistent/layerscope.json");
        assert!(matches!(err, Err(Error::Io(_))));
    }
}
