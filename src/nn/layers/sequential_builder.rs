use super::sequential::LayerEntry;
use crate::nn::{ForwardHooks, Module, Sequential};

/// Builder for constructing Sequential models with named or unnamed layers
///
/// # Examples
///
/// ```
/// use layerscope::nn::{Linear, ReLU, Sequential};
///
/// let model = Sequential::builder()
///     .add_named("encoder", Box::new(Linear::new(784, 128, true)))
///     .add_unnamed(Box::new(ReLU::new()))
///     .add_named("decoder", Box::new(Linear::new(128, 10, true)))
///     .build();
/// assert_eq!(model.len(), 3);
/// ```
pub struct SequentialBuilder {
    entries: Vec<LayerEntry>,
}

impl SequentialBuilder {
    /// Create a new empty builder
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add an unnamed layer to the sequence
    #[must_use]
    pub fn add_unnamed(mut self, layer: Box<dyn Module>) -> Self {
        self.entries.push(LayerEntry { name: None, layer });
        self
    }

    /// Add a named layer to the sequence
    ///
    /// Empty strings are treated as unnamed.
    #[must_use]
    pub fn add_named(mut self, name: impl Into<String>, layer: Box<dyn Module>) -> Self {
        let name: String = name.into();
        self.entries.push(LayerEntry {
            name: (!name.is_empty()).then_some(name),
            layer,
        });
        self
    }

    /// Build the Sequential model from the accumulated layers
    #[must_use]
    pub fn build(self) -> Sequential {
        Sequential {
            layers: self.entries,
            hooks: ForwardHooks::new(),
        }
    }
}

impl Default for SequentialBuilder {
    fn default() -> Self {
        Self::new()
    }
}
