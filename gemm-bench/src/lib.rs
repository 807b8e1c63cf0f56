mod backend;
mod bench;
mod config;
mod error;
mod pool;

#[cfg(nvidia)]
mod cuda_backend;

pub use backend::{Context, Gemm, Job, NoRuntime, Runtime, Session};
pub use bench::{Benchmark, run};
pub use config::{BenchConfig, MATRIX_SIZE};
pub use error::{BenchError, BoxError, ErrorKind, Op};
pub use pool::MatrixPool;

#[cfg(nvidia)]
pub use cuda_backend::{CudaContext, CudaError, CudaRuntime, CudaSession};

#[cfg(test)]
mod test;
