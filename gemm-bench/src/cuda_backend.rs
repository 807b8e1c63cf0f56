//! The benchmark backend over the CUDA driver, cuBLAS and cuRAND.

use crate::{BenchError, Context, Gemm, Job, Runtime, Session};
use cublas::{Cublas, CublasError};
use cuda::{CurrentCtx, DevMem, Device, DriverError, Worker, WorkerError};
use curand::{CurandError, Generator, RngType};
use std::sync::mpsc::Receiver;

#[derive(Debug, thiserror::Error)]
pub enum CudaError {
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error(transparent)]
    Cublas(#[from] CublasError),
    #[error(transparent)]
    Curand(#[from] CurandError),
    #[error("{operand} holds {bytes} bytes, sgemm reads {need}")]
    Shape {
        operand: char,
        bytes: usize,
        need: usize,
    },
}

#[derive(Clone, Copy, Default, Debug)]
pub struct CudaRuntime;

impl Runtime for CudaRuntime {
    type Device = Device;
    type Context = CudaContext;
    type Error = CudaError;

    fn devices(&self) -> Result<Vec<Device>, CudaError> {
        let devices = Device::all()?;
        // 设备属性只用于日志，查询失败不影响枚举
        for dev in &devices {
            match describe(dev) {
                Ok(info) => log::info!("{info}"),
                Err(e) => log::warn!("{dev}: {e}"),
            }
        }
        Ok(devices)
    }

    fn create_context(
        &self,
        device: Device,
        queue_depth: usize,
    ) -> Result<CudaContext, CudaError> {
        let worker = device.context()?.into_worker(queue_depth)?;
        Ok(CudaContext { device, worker })
    }
}

/// A context kept current on its own worker thread.
pub struct CudaContext {
    device: Device,
    worker: Worker,
}

impl Context for CudaContext {
    fn submit<J: Job>(&self, job: J) -> Receiver<Result<(), BenchError>> {
        let device = self.device;
        self.worker
            .run(move |ctx| job.execute(&CudaSession { ctx, device }))
    }
}

/// Operations on the context current on the worker thread.
pub struct CudaSession<'ctx> {
    ctx: &'ctx CurrentCtx,
    device: Device,
}

impl<'ctx> Session for CudaSession<'ctx> {
    type Buffer = DevMem<'ctx>;
    type Blas = Cublas<'ctx>;
    type Generator = Generator<'ctx>;
    type Error = CudaError;

    #[inline]
    fn create_blas(&self) -> Result<Self::Blas, CudaError> {
        Ok(Cublas::new(self.ctx)?)
    }

    #[inline]
    fn configure_allocator(&self, size_hint: u64) -> Result<(), CudaError> {
        Ok(self.device.set_mempool_threshold(size_hint)?)
    }

    #[inline]
    fn alloc(&self, bytes: usize) -> Result<Self::Buffer, CudaError> {
        Ok(self.ctx.malloc::<u8>(bytes)?)
    }

    #[inline]
    fn clear(&self, buffer: &mut Self::Buffer) -> Result<(), CudaError> {
        Ok(buffer.memset_zero()?)
    }

    #[inline]
    fn create_generator(&self) -> Result<Self::Generator, CudaError> {
        Ok(Generator::new(self.ctx, RngType::PseudoDefault)?)
    }

    #[inline]
    fn fill_normal(
        &self,
        generator: &mut Self::Generator,
        buffer: &mut Self::Buffer,
        mean: f32,
        stddev: f32,
    ) -> Result<(), CudaError> {
        Ok(generator.normal(buffer, mean, stddev)?)
    }

    fn sgemm(
        &self,
        blas: &Self::Blas,
        gemm: &Gemm,
        a: &Self::Buffer,
        b: &Self::Buffer,
        c: &mut Self::Buffer,
    ) -> Result<(), CudaError> {
        check('a', a, gemm.len_a())?;
        check('b', b, gemm.len_b())?;
        check('c', c, gemm.len_c())?;
        let &Gemm {
            m,
            n,
            k,
            trans_a,
            trans_b,
            alpha,
            beta,
            lda,
            ldb,
            ldc,
        } = gemm;
        unsafe {
            blas.sgemm(
                m,
                n,
                k,
                alpha,
                a.as_ptr(),
                trans_a,
                lda as _,
                b.as_ptr(),
                trans_b,
                ldb as _,
                beta,
                c.as_mut_ptr(),
                ldc as _,
            )
        }?;
        Ok(())
    }

    #[inline]
    fn synchronize(&self) -> Result<(), CudaError> {
        Ok(self.ctx.synchronize()?)
    }
}

fn describe(dev: &Device) -> Result<String, DriverError> {
    Ok(format!(
        "{dev}: {} ver{} mem={}",
        dev.name()?,
        dev.compute_capability()?,
        dev.total_memory()?,
    ))
}

fn check(operand: char, mem: &DevMem<'_>, len: usize) -> Result<(), CudaError> {
    let need = len * size_of::<f32>();
    if mem.len() >= need {
        Ok(())
    } else {
        Err(CudaError::Shape {
            operand,
            bytes: mem.len(),
            need,
        })
    }
}

#[test]
fn test_devices_match_driver() {
    let all = Device::all().unwrap();
    assert_eq!(CudaRuntime.devices().unwrap(), all);
    for dev in &all {
        assert!(describe(dev).unwrap().starts_with(&format!("{dev}: ")));
    }
}

#[test]
fn test_benchmark_on_device() {
    use crate::{BenchConfig, run};
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    #[derive(Clone, Default)]
    struct Lines(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Lines {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    if Device::all().unwrap().is_empty() {
        return;
    }
    let config = BenchConfig {
        matrix_size: 256,
        interval: Duration::ZERO,
        iterations: Some(2),
        ..Default::default()
    };
    let out = Lines::default();
    run(&CudaRuntime, &config, out.clone()).unwrap();

    let text = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
    let lines = text.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 6);
    assert!(
        lines[4..]
            .iter()
            .all(|l| l.starts_with("Took ") && l.ends_with(" ns"))
    );
}
