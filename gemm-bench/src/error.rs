use std::{error::Error, fmt, io};

pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// The step of the benchmark a library call belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Op {
    Discover,
    CreateContext,
    CreateBlas,
    CreateAllocator,
    Allocate,
    CreateGenerator,
    Randomize,
    Clear,
    Gemm,
    Synchronize,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ErrorKind {
    /// Enumeration or creation of a device-side object failed.
    Setup,
    /// Work issued on the device failed.
    Compute,
}

impl Op {
    pub const fn kind(self) -> ErrorKind {
        match self {
            Self::Discover
            | Self::CreateContext
            | Self::CreateBlas
            | Self::CreateAllocator
            | Self::CreateGenerator => ErrorKind::Setup,
            Self::Allocate | Self::Randomize | Self::Clear | Self::Gemm | Self::Synchronize => {
                ErrorKind::Compute
            }
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Discover => "device discovery",
            Self::CreateContext => "context creation",
            Self::CreateBlas => "blas handle creation",
            Self::CreateAllocator => "allocator creation",
            Self::Allocate => "matrix allocation",
            Self::CreateGenerator => "generator creation",
            Self::Randomize => "matrix randomization",
            Self::Clear => "matrix clearing",
            Self::Gemm => "sgemm",
            Self::Synchronize => "synchronization",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("no device found")]
    NoDevice,
    #[error("{op} failed: {source}")]
    Library {
        op: Op,
        #[source]
        source: BoxError,
    },
    #[error("context worker stopped without reporting a result")]
    WorkerGone,
    #[error("matrix pool holds {0} buffers, 3 required")]
    MissingOperands(usize),
    #[error("failed to write report: {0}")]
    Output(#[from] io::Error),
}

impl BenchError {
    #[inline]
    pub fn library(op: Op, source: impl Into<BoxError>) -> Self {
        Self::Library {
            op,
            source: source.into(),
        }
    }

    /// Adapter for `map_err`.
    #[inline]
    pub fn at<E: Into<BoxError>>(op: Op) -> impl FnOnce(E) -> Self {
        move |e| Self::library(op, e)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoDevice | Self::WorkerGone => ErrorKind::Setup,
            Self::Library { op, .. } => op.kind(),
            Self::MissingOperands(_) | Self::Output(_) => ErrorKind::Compute,
        }
    }

    /// The failed step, if a library call failed.
    #[inline]
    pub fn op(&self) -> Option<Op> {
        match self {
            Self::Library { op, .. } => Some(*op),
            _ => None,
        }
    }
}

#[test]
fn test_kind() {
    assert_eq!(BenchError::NoDevice.kind(), ErrorKind::Setup);
    assert_eq!(BenchError::NoDevice.to_string(), "no device found");

    let e = BenchError::library(Op::Gemm, "boom");
    assert_eq!(e.kind(), ErrorKind::Compute);
    assert_eq!(e.op(), Some(Op::Gemm));
    assert_eq!(e.to_string(), "sgemm failed: boom");
    assert!(e.source().is_some());

    let e = BenchError::library(Op::CreateBlas, "boom");
    assert_eq!(e.kind(), ErrorKind::Setup);
}
