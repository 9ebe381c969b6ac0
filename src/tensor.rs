use crate::device::Device;
use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::cell::RefCell;
use std::rc::Rc;

/// Type alias for a reference-counted, interior-mutable tensor.
///
/// Layers hand out clones of their parameter handles, so flipping
/// `requires_grad` through one handle is visible through all of them.
/// Single-threaded only.
pub type Tensor = Rc<RefCell<RawTensor>>;

// ===== RAW TENSOR STRUCTURE =====

/// The core tensor structure
///
/// Fields:
/// - `data`: flat Vec<f32> of values (row-major order)
/// - `shape`: dimensions, e.g. [batch, channels, height, width]
/// - `requires_grad`: marks trainable parameters
/// - `device`: where the data lives
#[derive(Clone)]
pub struct RawTensor {
    pub data: Vec<f32>,
    pub shape: Vec<usize>,
    pub requires_grad: bool,
    pub device: Device,
}

impl std::fmt::Debug for RawTensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("requires_grad", &self.requires_grad)
            .field("device", &self.device)
            .finish()
    }
}

// ===== RANDOM STATE =====

thread_local! {
    static RNG: RefCell<StdRng> = RefCell::new(StdRng::from_os_rng());
}

/// Reseed the thread-local generator used by every random constructor.
pub fn manual_seed(seed: u64) {
    RNG.with(|rng| *rng.borrow_mut() = StdRng::seed_from_u64(seed));
}

pub(crate) fn with_rng<T>(f: impl FnOnce(&mut StdRng) -> T) -> T {
    RNG.with(|rng| f(&mut rng.borrow_mut()))
}

// ===== TENSOR CONSTRUCTORS =====
impl RawTensor {
    /// Create a new tensor from data and shape
    ///
    /// # Errors
    /// `ShapeDataMismatch` if `data.len()` differs from the product of `shape`.
    pub fn new(data: Vec<f32>, shape: &[usize], requires_grad: bool) -> Result<Tensor> {
        let elements: usize = shape.iter().product();
        if data.len() != elements {
            return Err(Error::ShapeDataMismatch {
                shape: shape.to_vec(),
                elements,
                len: data.len(),
            });
        }
        Ok(Self::from_parts(data, shape, requires_grad, Device::CPU))
    }

    /// Assemble a tensor whose data length the caller has already checked.
    pub(crate) fn from_parts(
        data: Vec<f32>,
        shape: &[usize],
        requires_grad: bool,
        device: Device,
    ) -> Tensor {
        debug_assert_eq!(data.len(), shape.iter().product::<usize>());
        Rc::new(RefCell::new(RawTensor {
            data,
            shape: shape.to_vec(),
            requires_grad,
            device,
        }))
    }

    /// Create a tensor filled with zeros
    pub fn zeros(shape: &[usize]) -> Tensor {
        Self::constant(0.0, shape)
    }

    /// Create a tensor filled with ones
    pub fn ones(shape: &[usize]) -> Tensor {
        Self::constant(1.0, shape)
    }

    /// Create tensor filled with constant value
    pub fn constant(value: f32, shape: &[usize]) -> Tensor {
        let size = shape.iter().product();
        Self::from_parts(vec![value; size], shape, false, Device::CPU)
    }

    /// Create a tensor with random values uniformly distributed in [0, 1)
    pub fn rand(shape: &[usize]) -> Tensor {
        let size = shape.iter().product();
        let data = with_rng(|rng| (0..size).map(|_| rng.random::<f32>()).collect());
        Self::from_parts(data, shape, false, Device::CPU)
    }

    /// Create a tensor with values from standard normal distribution N(0, 1)
    pub fn randn(shape: &[usize]) -> Tensor {
        let size = shape.iter().product();
        let data = match Normal::new(0.0f32, 1.0) {
            Ok(normal) => with_rng(|rng| (0..size).map(|_| normal.sample(rng)).collect()),
            Err(_) => vec![0.0; size],
        };
        Self::from_parts(data, shape, false, Device::CPU)
    }

    /// Uniform samples in `[-limit, limit)`
    pub fn uniform(shape: &[usize], limit: f32) -> Tensor {
        let size = shape.iter().product();
        let data = if limit > 0.0 {
            with_rng(|rng| (0..size).map(|_| rng.random_range(-limit..limit)).collect())
        } else {
            vec![0.0; size]
        };
        Self::from_parts(data, shape, false, Device::CPU)
    }

    /// Xavier uniform initialization
    ///
    /// Samples weights uniformly from [-limit, limit] where
    /// limit = sqrt(6 / (fan_in + fan_out)). The fans are the first two
    /// dimensions; trailing dimensions (kernel window) scale both.
    pub fn xavier_uniform(shape: &[usize]) -> Tensor {
        let receptive: usize = shape.iter().skip(2).product();
        let fan_a = shape.first().copied().unwrap_or(1) * receptive;
        let fan_b = shape.get(1).copied().unwrap_or(1) * receptive;
        let limit = (6.0 / (fan_a + fan_b).max(1) as f32).sqrt();
        Self::uniform(shape, limit)
    }

    /// A trainable parameter tensor: `requires_grad` is set.
    pub(crate) fn parameter(t: Tensor) -> Tensor {
        t.borrow_mut().requires_grad = true;
        t
    }

    /// Number of elements
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Row-major strides for a shape
    pub(crate) fn compute_strides(shape: &[usize]) -> Vec<usize> {
        let mut strides = vec![1; shape.len()];
        for i in (0..shape.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * shape[i + 1];
        }
        strides
    }

    /// Copy a tensor onto `device`.
    ///
    /// There is a single host memory space, so only the device tag moves.
    pub fn to_device(t: &Tensor, device: Device) -> Tensor {
        let s = t.borrow();
        Self::from_parts(s.data.clone(), &s.shape, s.requires_grad, device)
    }
}

// ===== TRAIT-BASED API =====

/// Public trait for tensor operations
///
/// This provides a more ergonomic API: `tensor.add(&other)` instead of `RawTensor::add(&tensor, &other)`
pub trait TensorOps {
    // Binary ops
    fn add(&self, other: &Tensor) -> Result<Tensor>;
    fn sub(&self, other: &Tensor) -> Result<Tensor>;
    fn elem_mul(&self, other: &Tensor) -> Result<Tensor>;

    // Unary ops
    fn tanh(&self) -> Tensor;
    fn sigmoid(&self) -> Tensor;
    fn relu(&self) -> Tensor;
    fn scale(&self, factor: f32) -> Tensor;

    // Movement ops
    fn reshape(&self, new_shape: &[usize]) -> Result<Tensor>;
    fn narrow(&self, dim: usize, start: usize, len: usize) -> Result<Tensor>;

    // Matmul
    fn matmul(&self, other: &Tensor) -> Result<Tensor>;
    fn transpose(&self) -> Result<Tensor>;

    // Accessors
    fn shape(&self) -> Vec<usize>;
    fn numel(&self) -> usize;
    fn to_device(&self, device: Device) -> Tensor;
}

impl TensorOps for Tensor {
    fn add(&self, other: &Tensor) -> Result<Tensor> {
        RawTensor::add(self, other)
    }
    fn sub(&self, other: &Tensor) -> Result<Tensor> {
        RawTensor::sub(self, other)
    }
    fn elem_mul(&self, other: &Tensor) -> Result<Tensor> {
        RawTensor::elem_mul(self, other)
    }

    fn tanh(&self) -> Tensor {
        RawTensor::tanh(self)
    }
    fn sigmoid(&self) -> Tensor {
        RawTensor::sigmoid(self)
    }
    fn relu(&self) -> Tensor {
        RawTensor::relu(self)
    }
    fn scale(&self, factor: f32) -> Tensor {
        RawTensor::scale(self, factor)
    }

    fn reshape(&self, new_shape: &[usize]) -> Result<Tensor> {
        RawTensor::reshape(self, new_shape)
    }
    fn narrow(&self, dim: usize, start: usize, len: usize) -> Result<Tensor> {
        RawTensor::narrow(self, dim, start, len)
    }

    fn matmul(&self, other: &Tensor) -> Result<Tensor> {
        RawTensor::matmul(self, other)
    }
    fn transpose(&self) -> Result<Tensor> {
        RawTensor::transpose(self)
    }

    fn shape(&self) -> Vec<usize> {
        self.borrow().shape.clone()
    }
    fn numel(&self) -> usize {
        self.borrow().numel()
    }
    fn to_device(&self, device: Device) -> Tensor {
        RawTensor::to_device(self, device)
    }
}
