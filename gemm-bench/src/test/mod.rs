//! A host-memory backend that records every call, with injectable faults.

mod sequence;

use crate::{BenchConfig, BenchError, Context, Gemm, Job, Runtime, Session, run};
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};
use std::{
    cell::Cell,
    io,
    sync::{
        Arc, Mutex,
        mpsc::{Receiver, channel},
    },
    thread,
    time::Duration,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Call {
    CreateContext { device: usize, depth: usize },
    CreateBlas,
    ConfigureAllocator(u64),
    Alloc(usize),
    Clear(usize),
    CreateGenerator,
    FillNormal(usize),
    Gemm { a: usize, b: usize, c: usize },
    Synchronize,
}

/// Which call fails; indices count calls of that kind from 0.
#[derive(Clone, Copy, Default, Debug)]
struct Faults {
    discover: bool,
    create_context: bool,
    lose_job: bool,
    alloc: Option<usize>,
    clear: bool,
    randomize: Option<usize>,
    gemm: Option<usize>,
    sync: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
#[error("injected {0} failure")]
struct Injected(&'static str);

/// Operands of the first GEMM, copied before and after it ran.
#[derive(Clone, Debug)]
struct Snapshot {
    a: Vec<f32>,
    b: Vec<f32>,
    c_before: Vec<f32>,
    c_after: Vec<f32>,
}

#[derive(Clone, Default)]
struct Record {
    calls: Arc<Mutex<Vec<Call>>>,
    out: Arc<Mutex<Vec<u8>>>,
    first_gemm: Arc<Mutex<Option<Snapshot>>>,
}

impl Record {
    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call)
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn lines(&self) -> Vec<String> {
        String::from_utf8(self.out.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn took(&self) -> Vec<u128> {
        self.lines()
            .iter()
            .filter_map(|line| line.strip_prefix("Took ")?.strip_suffix(" ns"))
            .map(|ns| ns.parse().unwrap())
            .collect()
    }

    fn count(&self, f: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| f(*call)).count()
    }
}

struct Output(Arc<Mutex<Vec<u8>>>);

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct MockRuntime {
    devices: usize,
    faults: Faults,
    record: Record,
}

impl MockRuntime {
    fn new(devices: usize) -> Self {
        Self {
            devices,
            faults: Faults::default(),
            record: Record::default(),
        }
    }

    fn with(faults: Faults) -> Self {
        Self {
            faults,
            ..Self::new(1)
        }
    }

    fn bench(&self, config: &BenchConfig) -> Result<(), BenchError> {
        run(self, config, Output(self.record.out.clone()))
    }
}

impl Runtime for MockRuntime {
    type Device = usize;
    type Context = MockContext;
    type Error = Injected;

    fn devices(&self) -> Result<Vec<usize>, Injected> {
        if self.faults.discover {
            Err(Injected("discovery"))
        } else {
            Ok((0..self.devices).collect())
        }
    }

    fn create_context(&self, device: usize, depth: usize) -> Result<MockContext, Injected> {
        self.record.push(Call::CreateContext { device, depth });
        if self.faults.create_context {
            Err(Injected("context"))
        } else {
            Ok(MockContext {
                faults: self.faults,
                record: self.record.clone(),
            })
        }
    }
}

struct MockContext {
    faults: Faults,
    record: Record,
}

impl Context for MockContext {
    fn submit<J: Job>(&self, job: J) -> Receiver<Result<(), BenchError>> {
        let (answer, receiver) = channel();
        if self.faults.lose_job {
            return receiver;
        }
        let session = MockSession {
            faults: self.faults,
            record: self.record.clone(),
            allocs: Cell::new(0),
            fills: Cell::new(0),
            gemms: Cell::new(0),
            syncs: Cell::new(0),
            pending: Cell::new(false),
        };
        thread::spawn(move || {
            let _ = answer.send(job.execute(&session));
        });
        receiver
    }
}

struct MockSession {
    faults: Faults,
    record: Record,
    allocs: Cell<usize>,
    fills: Cell<usize>,
    gemms: Cell<usize>,
    syncs: Cell<usize>,
    pending: Cell<bool>,
}

struct MockBuffer {
    id: usize,
    data: Vec<f32>,
}

fn next(counter: &Cell<usize>) -> usize {
    let i = counter.get();
    counter.set(i + 1);
    i
}

impl Session for MockSession {
    type Buffer = MockBuffer;
    type Blas = ();
    type Generator = StdRng;
    type Error = Injected;

    fn create_blas(&self) -> Result<(), Injected> {
        self.record.push(Call::CreateBlas);
        Ok(())
    }

    fn configure_allocator(&self, size_hint: u64) -> Result<(), Injected> {
        self.record.push(Call::ConfigureAllocator(size_hint));
        Ok(())
    }

    fn alloc(&self, bytes: usize) -> Result<MockBuffer, Injected> {
        let id = next(&self.allocs);
        self.record.push(Call::Alloc(bytes));
        if self.faults.alloc == Some(id) {
            return Err(Injected("allocation"));
        }
        // 新分配的显存内容是未定义的
        Ok(MockBuffer {
            id,
            data: vec![f32::NAN; bytes / size_of::<f32>()],
        })
    }

    fn clear(&self, buffer: &mut MockBuffer) -> Result<(), Injected> {
        self.record.push(Call::Clear(buffer.id));
        if self.faults.clear {
            return Err(Injected("clear"));
        }
        buffer.data.fill(0.);
        Ok(())
    }

    fn create_generator(&self) -> Result<StdRng, Injected> {
        self.record.push(Call::CreateGenerator);
        Ok(StdRng::seed_from_u64(42))
    }

    fn fill_normal(
        &self,
        generator: &mut StdRng,
        buffer: &mut MockBuffer,
        mean: f32,
        stddev: f32,
    ) -> Result<(), Injected> {
        let i = next(&self.fills);
        self.record.push(Call::FillNormal(buffer.id));
        if self.faults.randomize == Some(i) {
            return Err(Injected("randomization"));
        }
        let normal =
            Normal::new(mean, stddev).map_err(|_| Injected("normal distribution"))?;
        for x in &mut buffer.data {
            *x = normal.sample(generator)
        }
        Ok(())
    }

    fn sgemm(
        &self,
        _: &(),
        gemm: &Gemm,
        a: &MockBuffer,
        b: &MockBuffer,
        c: &mut MockBuffer,
    ) -> Result<(), Injected> {
        assert!(
            !self.pending.replace(true),
            "sgemm issued before the previous one was synchronized",
        );
        let i = next(&self.gemms);
        self.record.push(Call::Gemm {
            a: a.id,
            b: b.id,
            c: c.id,
        });
        if self.faults.gemm == Some(i) {
            return Err(Injected("sgemm"));
        }
        assert!(a.data.len() >= gemm.len_a());
        assert!(b.data.len() >= gemm.len_b());
        assert!(c.data.len() >= gemm.len_c());

        let c_before = c.data.clone();
        host_sgemm(gemm, &a.data, &b.data, &mut c.data);
        self.record
            .first_gemm
            .lock()
            .unwrap()
            .get_or_insert_with(|| Snapshot {
                a: a.data.clone(),
                b: b.data.clone(),
                c_before,
                c_after: c.data.clone(),
            });
        Ok(())
    }

    fn synchronize(&self) -> Result<(), Injected> {
        let i = next(&self.syncs);
        self.record.push(Call::Synchronize);
        self.pending.set(false);
        if self.faults.sync == Some(i) {
            Err(Injected("synchronization"))
        } else {
            Ok(())
        }
    }
}

/// Column-major reference GEMM.
fn host_sgemm(gemm: &Gemm, a: &[f32], b: &[f32], c: &mut [f32]) {
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
    let a = |i: usize, l: usize| if trans_a { a[l + i * lda] } else { a[i + l * lda] };
    let b = |l: usize, j: usize| if trans_b { b[j + l * ldb] } else { b[l + j * ldb] };
    for j in 0..n {
        for i in 0..m {
            let sum = (0..k).map(|l| a(i, l) * b(l, j)).sum::<f32>();
            let c = &mut c[i + j * ldc];
            *c = alpha * sum + beta * *c;
        }
    }
}

fn config(iterations: u64) -> BenchConfig {
    BenchConfig {
        matrix_size: 4,
        interval: Duration::ZERO,
        iterations: Some(iterations),
        ..Default::default()
    }
}

const PROGRESS: [&str; 4] = [
    "Finding device...",
    "Allocating matrices...",
    "Randomizing matrices...",
    "Timing matrix multiplications...",
];
