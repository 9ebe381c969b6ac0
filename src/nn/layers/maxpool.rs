use super::conv::window_out;
use crate::error::{Error, Result};
use crate::nn::{ForwardHooks, Module};
use crate::tensor::{RawTensor, Tensor};

/// 2D max pooling layer
///
/// Accepts tensors shaped (batch, channels, height, width) and downsamples each
/// spatial window to its maximum value, similar to `PyTorch`'s `nn.MaxPool2d`.
/// Padding cells never win the max.
pub struct MaxPool2d {
    kernel: (usize, usize),
    stride: (usize, usize),
    padding: (usize, usize),
    hooks: ForwardHooks,
}

impl MaxPool2d {
    /// Square-kernel constructor for convenience
    ///
    /// # Panics
    /// `kernel` and `stride` must be positive.
    #[must_use]
    pub fn new(kernel: usize, stride: usize, padding: usize) -> Self {
        Self::with_params((kernel, kernel), (stride, stride), (padding, padding))
    }

    /// Arbitrary kernel/stride/padding constructor
    ///
    /// # Panics
    /// Kernel and stride dimensions must be positive.
    #[must_use]
    pub fn with_params(
        kernel: (usize, usize),
        stride: (usize, usize),
        padding: (usize, usize),
    ) -> Self {
        assert!(
            kernel.0 > 0 && kernel.1 > 0,
            "MaxPool2d kernel size must be positive"
        );
        assert!(
            stride.0 > 0 && stride.1 > 0,
            "MaxPool2d stride must be positive"
        );
        Self {
            kernel,
            stride,
            padding,
            hooks: ForwardHooks::new(),
        }
    }

    fn pool_forward(&self, x: &RawTensor) -> Result<Tensor> {
        let (batch, channels, height, width) = match x.shape.as_slice() {
            &[b, c, h, w] if h > 0 && w > 0 => (b, c, h, w),
            _ => return Err(Error::shape("MaxPool2d", "[B, C, H>0, W>0]", &x.shape)),
        };

        let (kernel_h, kernel_w) = self.kernel;
        let (stride_h, stride_w) = self.stride;
        let (pad_h, pad_w) = self.padding;
        let (Some(out_h), Some(out_w)) = (
            window_out(height, kernel_h, stride_h, pad_h),
            window_out(width, kernel_w, stride_w, pad_w),
        ) else {
            return Err(Error::shape(
                "MaxPool2d",
                format!("spatial dims >= kernel {kernel_h}x{kernel_w} after padding"),
                &x.shape,
            ));
        };

        let mut out = Vec::with_capacity(batch * channels * out_h * out_w);
        for plane in x.data.chunks(height * width).take(batch * channels) {
            for oy in 0..out_h {
                for ox in 0..out_w {
                    let mut best = f32::NEG_INFINITY;
                    for ky in 0..kernel_h {
                        let iy = (oy * stride_h + ky).wrapping_sub(pad_h);
                        if iy >= height {
                            continue;
                        }
                        for kx in 0..kernel_w {
                            let ix = (ox * stride_w + kx).wrapping_sub(pad_w);
                            if ix < width {
                                best = best.max(plane[iy * width + ix]);
                            }
                        }
                    }
                    out.push(best);
                }
            }
        }

        Ok(RawTensor::from_parts(
            out,
            &[batch, channels, out_h, out_w],
            false,
            x.device,
        ))
    }
}

impl Module for MaxPool2d {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        self.pool_forward(&x.borrow())
    }

    fn name(&self) -> &'static str {
        "MaxPool2d"
    }

    fn hooks(&self) -> &ForwardHooks {
        &self.hooks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TensorOps;

    #[test]
    fn test_maxpool_halves_spatial_dims() -> Result<()> {
        let pool = MaxPool2d::new(2, 2, 0);
        let y = pool.forward(&RawTensor::rand(&[2, 3, 8, 8]))?;
        assert_eq!(y.shape(), vec![2, 3, 4, 4]);
        Ok(())
    }

    #[test]
    fn test_maxpool_values() -> Result<()> {
        let pool = MaxPool2d::new(2, 2, 0);
        let x = RawTensor::new(
            vec![
                1.0, 2.0, 5.0, 6.0, //
                3.0, 4.0, 7.0, 8.0, //
                -1.0, -2.0, 0.0, 0.5, //
                -3.0, -4.0, 0.2, 0.1,
            ],
            &[1, 1, 4, 4],
            false,
        )?;
        assert_eq!(pool.forward(&x)?.borrow().data, vec![4.0, 8.0, -1.0, 0.5]);
        Ok(())
    }

    #[test]
    fn test_padding_never_wins() -> Result<()> {
        let pool = MaxPool2d::new(3, 1, 1);
        let x = RawTensor::constant(-5.0, &[1, 1, 2, 2]);
        let y = pool.forward(&x)?;
        assert_eq!(y.shape(), vec![1, 1, 2, 2]);
        assert!(y.borrow().data.iter().all(|&v| v == -5.0));
        Ok(())
    }

    #[test]
    fn test_maxpool_has_no_parameters() {
        assert_eq!(MaxPool2d::new(2, 2, 0).num_parameters(), 0);
    }
}
