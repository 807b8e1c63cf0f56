//! The seam between the benchmark and the compute library it drives.

use crate::BenchError;
use std::{
    convert::Infallible,
    error::Error,
    fmt,
    sync::mpsc::Receiver,
};

/// Device discovery and context creation.
pub trait Runtime {
    type Device: fmt::Display;
    type Context: Context;
    type Error: Error + Send + Sync + 'static;

    /// Every available device, in the library's order.
    fn devices(&self) -> Result<Vec<Self::Device>, Self::Error>;

    /// Binds a context to `device`; at most `queue_depth` submissions may be pending.
    fn create_context(
        &self,
        device: Self::Device,
        queue_depth: usize,
    ) -> Result<Self::Context, Self::Error>;
}

/// An execution scope on one device that runs submitted units of work.
pub trait Context {
    /// Queues `job`; its result arrives on the returned receiver.
    ///
    /// A receiver that disconnects without a value means the job was lost.
    fn submit<J: Job>(&self, job: J) -> Receiver<Result<(), BenchError>>;
}

/// A unit of work run while a context is current.
pub trait Job: Send + 'static {
    fn execute<S: Session>(self, session: &S) -> Result<(), BenchError>;
}

/// What the library offers while a context is current.
///
/// All operations are issued in order on one logical stream.
pub trait Session {
    type Buffer;
    type Blas;
    type Generator;
    type Error: Error + Send + Sync + 'static;

    fn create_blas(&self) -> Result<Self::Blas, Self::Error>;
    /// Prepares the native allocator; `size_hint` bytes may stay reserved.
    fn configure_allocator(&self, size_hint: u64) -> Result<(), Self::Error>;
    fn alloc(&self, bytes: usize) -> Result<Self::Buffer, Self::Error>;
    fn clear(&self, buffer: &mut Self::Buffer) -> Result<(), Self::Error>;
    fn create_generator(&self) -> Result<Self::Generator, Self::Error>;
    fn fill_normal(
        &self,
        generator: &mut Self::Generator,
        buffer: &mut Self::Buffer,
        mean: f32,
        stddev: f32,
    ) -> Result<(), Self::Error>;
    fn sgemm(
        &self,
        blas: &Self::Blas,
        gemm: &Gemm,
        a: &Self::Buffer,
        b: &Self::Buffer,
        c: &mut Self::Buffer,
    ) -> Result<(), Self::Error>;
    /// Blocks until everything issued so far has completed.
    fn synchronize(&self) -> Result<(), Self::Error>;
}

/// Shape and scalars of `c = alpha · op(a) · op(b) + beta · c`, column-major.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Gemm {
    pub m: usize,
    pub n: usize,
    pub k: usize,
    pub trans_a: bool,
    pub trans_b: bool,
    pub alpha: f32,
    pub beta: f32,
    pub lda: usize,
    pub ldb: usize,
    pub ldc: usize,
}

impl Gemm {
    /// Untransposed `n × n` operands, every leading dimension `n`.
    pub const fn square(n: usize, alpha: f32, beta: f32) -> Self {
        Self {
            m: n,
            n,
            k: n,
            trans_a: false,
            trans_b: false,
            alpha,
            beta,
            lda: n,
            ldb: n,
            ldc: n,
        }
    }

    /// Elements `a` must hold.
    pub const fn len_a(&self) -> usize {
        if self.trans_a {
            span(self.lda, self.m, self.k)
        } else {
            span(self.lda, self.k, self.m)
        }
    }

    /// Elements `b` must hold.
    pub const fn len_b(&self) -> usize {
        if self.trans_b {
            span(self.ldb, self.k, self.n)
        } else {
            span(self.ldb, self.n, self.k)
        }
    }

    /// Elements `c` must hold.
    pub const fn len_c(&self) -> usize {
        span(self.ldc, self.n, self.m)
    }
}

/// Elements spanned by `cols` columns of `rows` rows with leading dimension `ld`.
const fn span(ld: usize, cols: usize, rows: usize) -> usize {
    if cols == 0 || rows == 0 {
        0
    } else {
        ld * (cols - 1) + rows
    }
}

/// The runtime used when no compute library was found at build time.
///
/// It never finds a device.
#[derive(Clone, Copy, Default, Debug)]
pub struct NoRuntime;

impl Runtime for NoRuntime {
    type Device = Infallible;
    type Context = Infallible;
    type Error = Infallible;

    #[inline]
    fn devices(&self) -> Result<Vec<Self::Device>, Self::Error> {
        log::warn!("built without a cuda toolkit");
        Ok(Vec::new())
    }

    #[inline]
    fn create_context(&self, device: Infallible, _: usize) -> Result<Infallible, Infallible> {
        match device {}
    }
}

impl Context for Infallible {
    fn submit<J: Job>(&self, _: J) -> Receiver<Result<(), BenchError>> {
        match *self {}
    }
}

#[test]
fn test_span() {
    let gemm = Gemm::square(4, 1., 0.);
    assert_eq!(gemm.len_a(), 16);
    assert_eq!(gemm.len_b(), 16);
    assert_eq!(gemm.len_c(), 16);

    // a: 3×4 stored with lda 5, b: 4×2 transposed (stored 2×4) with ldb 2
    let gemm = Gemm {
        m: 3,
        n: 2,
        k: 4,
        trans_a: false,
        trans_b: true,
        alpha: 1.,
        beta: 0.,
        lda: 5,
        ldb: 2,
        ldc: 3,
    };
    assert_eq!(gemm.len_a(), 5 * 3 + 3);
    assert_eq!(gemm.len_b(), 2 * 3 + 2);
    assert_eq!(gemm.len_c(), 3 + 3);
    assert_eq!(span(3, 0, 3), 0);
}
