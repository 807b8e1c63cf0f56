use crate::{BenchConfig, BenchError, Context, Gemm, Job, MatrixPool, Op, Runtime, Session};
use std::{
    fmt,
    io::Write,
    thread,
    time::{Duration, Instant},
};

/// Finds a device, opens a context on it and runs [`Benchmark`] there.
///
/// Blocks until the benchmark ends. With `config.iterations` unset that only
/// happens on error.
pub fn run<R, W>(runtime: &R, config: &BenchConfig, mut out: W) -> Result<(), BenchError>
where
    R: Runtime,
    W: Write + Send + 'static,
{
    say(&mut out, "Finding device...")?;
    let device = runtime
        .devices()
        .map_err(BenchError::at(Op::Discover))?
        .into_iter()
        .next()
        .ok_or(BenchError::NoDevice)?;
    log::info!("benchmarking on {device}");

    let context = runtime
        .create_context(device, config.queue_depth)
        .map_err(BenchError::at(Op::CreateContext))?;
    context
        .submit(Benchmark::new(config.clone(), out))
        .recv()
        .map_err(|_| BenchError::WorkerGone)?
}

/// The whole device-side run: setup, randomization and the timed GEMM loop.
pub struct Benchmark<W> {
    config: BenchConfig,
    out: W,
}

impl<W> Benchmark<W> {
    #[inline]
    pub fn new(config: BenchConfig, out: W) -> Self {
        Self { config, out }
    }
}

impl<W: Write + Send + 'static> Job for Benchmark<W> {
    fn execute<S: Session>(mut self, session: &S) -> Result<(), BenchError> {
        let config = &self.config;
        let blas = session
            .create_blas()
            .map_err(BenchError::at(Op::CreateBlas))?;

        say(&mut self.out, "Allocating matrices...")?;
        let mut pool = MatrixPool::new(session, config.pool_hint)?;
        for _ in 0..3 {
            pool.alloc(config.buffer_bytes())?;
        }
        log::debug!("allocated {} matrices, {} bytes", pool.len(), pool.bytes());

        say(&mut self.out, "Randomizing matrices...")?;
        let mut generator = session
            .create_generator()
            .map_err(BenchError::at(Op::CreateGenerator))?;
        let (a, b, c) = pool.operands()?;
        for buffer in [&mut *a, &mut *b] {
            session
                .fill_normal(&mut generator, buffer, config.mean, config.stddev)
                .map_err(BenchError::at(Op::Randomize))?;
        }
        session.clear(c).map_err(BenchError::at(Op::Clear))?;

        say(&mut self.out, "Timing matrix multiplications...")?;
        let gemm = Gemm::square(config.matrix_size, config.alpha, config.beta);
        let mut done = 0u64;
        while config.iterations.is_none_or(|limit| done < limit) {
            let start = Instant::now();
            for _ in 0..config.batch {
                let issued = session.sgemm(&blas, &gemm, a, b, c);
                let synced = session.synchronize();
                issued.map_err(BenchError::at(Op::Gemm))?;
                synced.map_err(BenchError::at(Op::Synchronize))?;
            }
            let elapsed = start.elapsed();

            say(&mut self.out, Took(elapsed))?;
            log::info!(
                "{:.1} GFLOP/s",
                config.flops_per_batch() / elapsed.as_nanos().max(1) as f64,
            );

            done += 1;
            if config.iterations.is_none_or(|limit| done < limit) {
                thread::sleep(config.interval)
            }
        }
        Ok(())
    }
}

/// One report line of a timed batch.
struct Took(Duration);

impl fmt::Display for Took {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Took {} ns", self.0.as_nanos())
    }
}

fn say(out: &mut impl Write, line: impl fmt::Display) -> Result<(), BenchError> {
    writeln!(out, "{line}")?;
    out.flush()?;
    Ok(())
}

#[test]
fn test_took() {
    assert_eq!(
        Took(Duration::from_micros(1500)).to_string(),
        "Took 1500000 ns"
    );
    assert_eq!(Took(Duration::ZERO).to_string(), "Took 0 ns");
}
