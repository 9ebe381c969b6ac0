use crate::error::{Error, Result};
use crate::{RawTensor, Tensor};

// ===== MATRIX MULTIPLICATION =====

impl RawTensor {
    /// Transpose a 2D matrix
    ///
    /// For shape [m, n], produces shape [n, m]
    fn transpose_2d(data: &[f32], m: usize, n: usize) -> Vec<f32> {
        let mut result = vec![0.0; m * n];
        for i in 0..m {
            for j in 0..n {
                result[j * m + i] = data[i * n + j];
            }
        }
        result
    }

    /// Raw matrix multiplication: (m,k) @ (k,n) -> (m,n)
    /// Uses naive O(mnk) algorithm.
    pub fn matmul_raw(a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Vec<f32> {
        let mut result = vec![0.0; m * n];
        for i in 0..m {
            for p in 0..k {
                let a_ip = a[i * k + p];
                if a_ip == 0.0 {
                    continue;
                }
                let row = &b[p * n..(p + 1) * n];
                for (out, &b_pj) in result[i * n..(i + 1) * n].iter_mut().zip(row) {
                    *out += a_ip * b_pj;
                }
            }
        }
        result
    }

    /// Matrix product of two 2D tensors
    pub fn matmul(self_t: &Tensor, other: &Tensor) -> Result<Tensor> {
        let a = self_t.borrow();
        let b = other.borrow();
        let (m, k) = match a.shape.as_slice() {
            &[m, k] => (m, k),
            _ => return Err(Error::shape("matmul", "[m, k]", &a.shape)),
        };
        let n = match b.shape.as_slice() {
            &[bk, n] if bk == k => n,
            _ => return Err(Error::shape("matmul", format!("[{k}, n]"), &b.shape)),
        };

        let data = Self::matmul_raw(&a.data, &b.data, m, k, n);
        Ok(Self::from_parts(data, &[m, n], false, a.device))
    }

    /// Transpose of a 2D tensor
    pub fn transpose(self_t: &Tensor) -> Result<Tensor> {
        let s = self_t.borrow();
        let (m, n) = match s.shape.as_slice() {
            &[m, n] => (m, n),
            _ => return Err(Error::shape("transpose", "[m, n]", &s.shape)),
        };
        let data = Self::transpose_2d(&s.data, m, n);
        Ok(Self::from_parts(data, &[n, m], s.requires_grad, s.device))
    }
}
