//! Prints the summary table for a small image classifier.
//!
//! Run with `RUST_LOG=debug cargo run --example summary` to see the hook
//! bookkeeping, or pass a JSON model description as the first argument.

use layerscope::io::config::{load_config, summarize_config};
use layerscope::nn::{BatchNorm2d, Conv2d, Dropout, Flatten, Linear, MaxPool2d, ReLU, Sequential};
use layerscope::{Summarize, manual_seed};

fn classifier() -> Sequential {
    Sequential::builder()
        .add_named("conv1", Box::new(Conv2d::new(1, 16, 3, 1, 1, true)))
        .add_unnamed(Box::new(BatchNorm2d::new(16)))
        .add_unnamed(Box::new(ReLU::new()))
        .add_unnamed(Box::new(MaxPool2d::new(2, 2, 0)))
        .add_named("conv2", Box::new(Conv2d::new(16, 32, 3, 1, 1, true)))
        .add_unnamed(Box::new(ReLU::new()))
        .add_unnamed(Box::new(MaxPool2d::new(2, 2, 0)))
        .add_unnamed(Box::new(Flatten::new()))
        .add_unnamed(Box::new(Dropout::new(0.5)))
        .add_named("fc", Box::new(Linear::new(32 * 7 * 7, 10, true)))
        .build()
}

fn main() -> layerscope::Result<()> {
    env_logger::init();
    manual_seed(42);

    if let Some(path) = std::env::args().nth(1) {
        let report = summarize_config(&load_config(path)?)?;
        print!("{report}");
        return Ok(());
    }

    let model = classifier();
    model.print_summary(&[vec![1, 28, 28]], -1, "cpu")
}
