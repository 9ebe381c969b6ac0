use crate::error::{Error, Result};
use crate::nn::{ForwardHooks, Module};
use crate::tensor::{RawTensor, Tensor, TensorOps};

/// LSTM Cell - processes one timestep at a time
///
/// Implements the LSTM equations:
/// - i = `sigmoid([x, h] @ W_i + b_i)`  (input gate)
/// - f = `sigmoid([x, h] @ W_f + b_f)`  (forget gate)
/// - g = `tanh([x, h] @ W_g + b_g)`     (cell gate)
/// - o = `sigmoid([x, h] @ W_o + b_o)`  (output gate)
/// - `c_next` = f * c + i * g
/// - `h_next` = o * `tanh(c_next)`
///
/// Input and hidden projections share one weight matrix so the cell
/// exposes a single `weight` / `bias` pair.
///
/// Through [`Module::forward_many`] the cell takes `[x]` or `[x, h, c]` and
/// returns `[h_next, c_next]`; [`Module::forward`] returns only `h_next`.
pub struct LSTMCell {
    input_size: usize,
    hidden_size: usize,
    /// `[input_size + hidden_size, 4*hidden_size]`, gate order i, f, g, o
    pub weight: Tensor,
    /// `[4*hidden_size]`
    pub bias: Option<Tensor>,
    hooks: ForwardHooks,
}

impl LSTMCell {
    #[must_use]
    pub fn new(input_size: usize, hidden_size: usize, bias: bool) -> Self {
        let weight = RawTensor::parameter(RawTensor::xavier_uniform(&[
            input_size + hidden_size,
            4 * hidden_size,
        ]));
        let bias = bias.then(|| RawTensor::parameter(RawTensor::zeros(&[4 * hidden_size])));
        Self {
            input_size,
            hidden_size,
            weight,
            bias,
            hooks: ForwardHooks::new(),
        }
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Forward pass for a single timestep
    ///
    /// # Arguments
    /// * `input` - Input tensor of shape `[batch, input_size]`
    /// * `state` - Optional tuple of (h, c) where h and c are `[batch, hidden_size]`
    ///
    /// # Returns
    /// Tuple of `(h_next, c_next)` both of shape `[batch, hidden_size]`
    pub fn forward_step(
        &self,
        input: &Tensor,
        state: Option<(&Tensor, &Tensor)>,
    ) -> Result<(Tensor, Tensor)> {
        let batch_size = match input.shape().as_slice() {
            &[b, f] if f == self.input_size => b,
            other => {
                return Err(Error::shape(
                    "LSTMCell",
                    format!("[B, {}]", self.input_size),
                    other,
                ));
            }
        };
        let state_shape = [batch_size, self.hidden_size];

        // Initialize hidden and cell states if not provided
        let (h, c) = match state {
            Some((h, c)) => {
                for t in [h, c] {
                    if t.shape() != state_shape {
                        return Err(Error::shape(
                            "LSTMCell state",
                            format!("{state_shape:?}"),
                            &t.shape(),
                        ));
                    }
                }
                (h.clone(), c.clone())
            }
            None => (
                RawTensor::zeros(&state_shape),
                RawTensor::zeros(&state_shape),
            ),
        };

        let xh = Self::concat_features(input, &h);
        let mut gates = xh.matmul(&self.weight)?;
        if let Some(b) = &self.bias {
            gates = gates.add(b)?;
        }

        // Split gates into i, f, g, o (each is [batch, hidden_size])
        let hs = self.hidden_size;
        let i = gates.narrow(1, 0, hs)?.sigmoid();
        let f = gates.narrow(1, hs, hs)?.sigmoid();
        let g = gates.narrow(1, 2 * hs, hs)?.tanh();
        let o = gates.narrow(1, 3 * hs, hs)?.sigmoid();

        let c_next = f.elem_mul(&c)?.add(&i.elem_mul(&g)?)?;
        let h_next = o.elem_mul(&c_next.tanh())?;
        Ok((h_next, c_next))
    }

    /// Row-wise `[x, h]` for `[B, n]` and `[B, m]` inputs
    fn concat_features(x: &Tensor, h: &Tensor) -> Tensor {
        let x = x.borrow();
        let h = h.borrow();
        let (n, m) = (x.shape[1], h.shape[1]);
        let data = x
            .data
            .chunks(n.max(1))
            .zip(h.data.chunks(m.max(1)))
            .flat_map(|(xr, hr)| xr.iter().chain(hr).copied())
            .collect();
        RawTensor::from_parts(data, &[x.shape[0], n + m], false, x.device)
    }
}

impl Module for LSTMCell {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let (h, _c) = self.forward_step(x, None)?;
        Ok(h)
    }

    fn forward_many(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        let (h, c) = match inputs {
            [x] => self.forward_step(x, None)?,
            [x, h, c] => self.forward_step(x, Some((h, c)))?,
            _ => {
                return Err(Error::Arity {
                    module: "LSTMCell",
                    expected: 3,
                    got: inputs.len(),
                });
            }
        };
        Ok(vec![h, c])
    }

    fn name(&self) -> &'static str {
        "LSTMCell"
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
mod tests {
    use super::*;

    #[test]
    fn test_lstm_shapes() -> Result<()> {
        let cell = LSTMCell::new(5, 7, true);
        let x = RawTensor::rand(&[3, 5]);

        let outs = cell.forward_many(&[x.clone()])?;
        assert_eq!(outs.len(), 2);
        assert!(outs.iter().all(|t| t.shape() == vec![3, 7]));

        let again = cell.forward_many(&[x.clone(), outs[0].clone(), outs[1].clone()])?;
        assert_eq!(again[1].shape(), vec![3, 7]);

        assert_eq!(cell.forward(&x)?.shape(), vec![3, 7]);
        Ok(())
    }

    #[test]
    fn test_zero_weights_give_half_gates() -> Result<()> {
        // all gates: sigmoid(0)=0.5, tanh(0)=0 -> c=0, h=0
        let cell = LSTMCell::new(2, 2, true);
        cell.weight.borrow_mut().data.fill(0.0);
        let (h, c) = cell.forward_step(&RawTensor::ones(&[1, 2]), None)?;
        assert!(h.borrow().data.iter().all(|&v| v == 0.0));
        assert!(c.borrow().data.iter().all(|&v| v == 0.0));
        Ok(())
    }

    #[test]
    fn test_lstm_arity_and_state_checks() {
        let cell = LSTMCell::new(2, 3, false);
        let x = RawTensor::rand(&[4, 2]);
        assert!(matches!(
            cell.forward_many(&[x.clone(), x.clone()]),
            Err(Error::Arity { got: 2, .. })
        ));
        let bad = RawTensor::zeros(&[4, 2]);
        assert!(cell.forward_step(&x, Some((&bad, &bad))).is_err());
    }

    #[test]
    fn test_lstm_parameter_count() {
        // 4h * (in + h) + 4h
        assert_eq!(LSTMCell::new(10, 20, true).num_parameters(), 80 * 30 + 80);
    }
}
