use crate::error::{Error, Result};
use crate::nn::{ForwardHooks, Module};
use crate::tensor::{RawTensor, Tensor};

/// 2D convolution over (B, C, H, W) inputs
pub struct Conv2d {
    pub weight: Tensor,       // [out_channels, in_channels, kernel_h, kernel_w]
    pub bias: Option<Tensor>, // [out_channels]
    in_channels: usize,
    out_channels: usize,
    kernel: (usize, usize),
    stride: (usize, usize),
    padding: (usize, usize),
    hooks: ForwardHooks,
}

/// Output length of a sliding window, `None` when the window does not fit.
pub(crate) fn window_out(input: usize, kernel: usize, stride: usize, pad: usize) -> Option<usize> {
    let padded = input + 2 * pad;
    (padded >= kernel && stride > 0).then(|| (padded - kernel) / stride + 1)
}

impl Conv2d {
    /// Square-kernel constructor
    ///
    /// # Panics
    /// `kernel` and `stride` must be positive.
    #[must_use]
    pub fn new(
        in_ch: usize,
        out_ch: usize,
        kernel: usize,
        stride: usize,
        padding: usize,
        use_bias: bool,
    ) -> Self {
        assert!(kernel > 0, "Conv2d kernel size must be positive");
        assert!(stride > 0, "Conv2d stride must be positive");

        let weight = RawTensor::parameter(RawTensor::xavier_uniform(&[
            out_ch, in_ch, kernel, kernel,
        ]));
        let bias = use_bias.then(|| RawTensor::parameter(RawTensor::zeros(&[out_ch])));
        Conv2d {
            weight,
            bias,
            in_channels: in_ch,
            out_channels: out_ch,
            kernel: (kernel, kernel),
            stride: (stride, stride),
            padding: (padding, padding),
            hooks: ForwardHooks::new(),
        }
    }

    pub fn freeze(&mut self) {
        self.weight.borrow_mut().requires_grad = false;
        if let Some(b) = &self.bias {
            b.borrow_mut().requires_grad = false;
        }
    }

    fn conv_forward(&self, x: &RawTensor) -> Result<Tensor> {
        let (batch, height, width) = match x.shape.as_slice() {
            &[b, c, h, w] if c == self.in_channels => (b, h, w),
            _ => {
                return Err(Error::shape(
                    "Conv2d",
                    format!("[B, {}, H, W]", self.in_channels),
                    &x.shape,
                ));
            }
        };

        let (kh, kw) = self.kernel;
        let (sh, sw) = self.stride;
        let (ph, pw) = self.padding;
        let (Some(out_h), Some(out_w)) = (
            window_out(height, kh, sh, ph),
            window_out(width, kw, sw, pw),
        ) else {
            return Err(Error::shape(
                "Conv2d",
                format!("spatial dims >= kernel {kh}x{kw} after padding"),
                &x.shape,
            ));
        };

        let w = self.weight.borrow();
        let bias = self.bias.as_ref().map(|b| b.borrow());
        let cin = self.in_channels;
        let mut out = vec![0.0; batch * self.out_channels * out_h * out_w];

        for b in 0..batch {
            for oc in 0..self.out_channels {
                let bias_val = bias.as_ref().map_or(0.0, |bt| bt.data[oc]);
                for oy in 0..out_h {
                    for ox in 0..out_w {
                        let mut acc = bias_val;
                        for ic in 0..cin {
                            for ky in 0..kh {
                                // padded row index, skip rows in the zero border
                                let iy = (oy * sh + ky).wrapping_sub(ph);
                                if iy >= height {
                                    continue;
                                }
                                for kx in 0..kw {
                                    let ix = (ox * sw + kx).wrapping_sub(pw);
                                    if ix >= width {
                                        continue;
                                    }
                                    let xv = x.data[((b * cin + ic) * height + iy) * width + ix];
                                    let wv = w.data[((oc * cin + ic) * kh + ky) * kw + kx];
                                    acc += xv * wv;
                                }
                            }
                        }
                        out[((b * self.out_channels + oc) * out_h + oy) * out_w + ox] = acc;
                    }
                }
            }
        }

        Ok(RawTensor::from_parts(
            out,
            &[batch, self.out_channels, out_h, out_w],
            false,
            x.device,
        ))
    }
}

impl Module for Conv2d {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        self.conv_forward(&x.borrow())
    }

    fn name(&self) -> &'static str {
        "Conv2d"
    }

    fn hooks(&self) -> &ForwardHooks {
        &self.hooks
    }

    fn weight(&self) -> Option<&Tensor> {
        Some(&self.weight)
    }

    fn bias(&self) -> Option<&Tensor> {
        self.bias.as_ref()
    }
}

#[cfg(test)]
mod conv2d_tests {
    use super::*;
    use crate::TensorOps;

    #[test]
    fn test_conv2d_forward_shape() -> Result<()> {
        // Input: (1, 3, 32, 32), Conv: 16 filters, 3x3, stride=1, pad=1
        let conv = Conv2d::new(3, 16, 3, 1, 1, true);
        let y = conv.forward(&RawTensor::rand(&[1, 3, 32, 32]))?;
        assert_eq!(y.shape(), vec![1, 16, 32, 32]);

        let strided = Conv2d::new(3, 4, 5, 2, 0, false);
        let y = strided.forward(&RawTensor::rand(&[2, 3, 32, 32]))?;
        assert_eq!(y.shape(), vec![2, 4, 14, 14]);
        Ok(())
    }

    #[test]
    fn test_conv2d_known_values() -> Result<()> {
        // 1 channel, 3x3 ones kernel, zero padding 1: corner sees 4 cells
        let conv = Conv2d::new(1, 1, 3, 1, 1, true);
        conv.weight.borrow_mut().data = vec![1.0; 9];
        let x = RawTensor::ones(&[1, 1, 3, 3]);
        let y = conv.forward(&x)?;
        assert_eq!(
            y.borrow().data,
            vec![4.0, 6.0, 4.0, 6.0, 9.0, 6.0, 4.0, 6.0, 4.0]
        );
        Ok(())
    }

    #[test]
    fn test_conv2d_parameter_count() {
        let conv = Conv2d::new(1, 8, 3, 1, 0, true);
        assert_eq!(conv.num_parameters(), 8 * 9 + 8);
    }

    #[test]
    fn test_conv2d_rejects_bad_input() {
        let conv = Conv2d::new(3, 8, 3, 1, 0, true);
        assert!(conv.forward(&RawTensor::zeros(&[1, 1, 8, 8])).is_err());
        assert!(conv.forward(&RawTensor::zeros(&[1, 3, 2, 2])).is_err());
        assert!(conv.forward(&RawTensor::zeros(&[3, 8, 8])).is_err());
    }

    #[test]
    #[should_panic(expected = "kernel size must be positive")]
    fn test_conv2d_zero_kernel_panics() {
        let _ = Conv2d::new(3, 16, 0, 1, 1, true);
    }
}
