use std::time::Duration;

/// Edge length of the square matrices.
pub const MATRIX_SIZE: usize = 1 << 10;

/// Every knob of a benchmark run.
///
/// The binary always runs [`BenchConfig::default`].
#[derive(Clone, PartialEq, Debug)]
pub struct BenchConfig {
    /// M = N = K, also every leading dimension.
    pub matrix_size: usize,
    /// Jobs allowed to wait in the context worker queue.
    pub queue_depth: usize,
    /// GEMM calls per timed batch.
    pub batch: usize,
    pub alpha: f32,
    pub beta: f32,
    pub mean: f32,
    pub stddev: f32,
    /// Bytes the allocator may keep reserved; 0 grows on demand.
    pub pool_hint: u64,
    /// Pause between batches.
    pub interval: Duration,
    /// Stop after this many batches; `None` runs until killed.
    pub iterations: Option<u64>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            matrix_size: MATRIX_SIZE,
            queue_depth: 10,
            batch: 10,
            alpha: 2.718,
            beta: 3.142,
            mean: 0.,
            stddev: 1.,
            pool_hint: 0,
            interval: Duration::from_secs(1),
            iterations: None,
        }
    }
}

impl BenchConfig {
    #[inline]
    pub const fn buffer_bytes(&self) -> usize {
        self.matrix_size * self.matrix_size * size_of::<f32>()
    }

    /// Floating point operations of one timed batch.
    #[inline]
    pub fn flops_per_batch(&self) -> f64 {
        let n = self.matrix_size as f64;
        2. * n * n * n * self.batch as f64
    }
}

#[test]
fn test_default() {
    let config = BenchConfig::default();
    assert_eq!(config.matrix_size, 1024);
    assert_eq!(config.buffer_bytes(), 4 << 20);
    assert_eq!(config.flops_per_batch(), 2. * 1024f64.powi(3) * 10.);
    assert_eq!(config.iterations, None);
}
