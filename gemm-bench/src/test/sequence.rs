use super::{Call, MockRuntime, PROGRESS, config, host_sgemm};
use crate::{BenchConfig, Gemm};

#[test]
fn progress_in_order() {
    let runtime = MockRuntime::new(1);
    runtime.bench(&config(3)).unwrap();

    let lines = runtime.record.lines();
    assert_eq!(lines.len(), PROGRESS.len() + 3);
    assert_eq!(lines[..PROGRESS.len()], PROGRESS);
    assert_eq!(runtime.record.took().len(), 3);
}

#[test]
fn setup_order() {
    let runtime = MockRuntime::new(1);
    let config = config(1);
    runtime.bench(&config).unwrap();

    let bytes = 4 * 4 * size_of::<f32>();
    assert_eq!(config.buffer_bytes(), bytes);
    assert_eq!(
        runtime.record.calls()[..9],
        [
            Call::CreateContext {
                device: 0,
                depth: 10
            },
            Call::CreateBlas,
            Call::ConfigureAllocator(0),
            Call::Alloc(bytes),
            Call::Alloc(bytes),
            Call::Alloc(bytes),
            Call::CreateGenerator,
            Call::FillNormal(0),
            Call::FillNormal(1),
        ]
    );
    // 输出矩阵只清零，不随机化
    assert_eq!(runtime.record.calls()[9], Call::Clear(2));
}

#[test]
fn first_device_wins() {
    let runtime = MockRuntime::new(3);
    runtime.bench(&config(1)).unwrap();
    assert_eq!(
        runtime.record.calls()[0],
        Call::CreateContext {
            device: 0,
            depth: 10
        }
    );
}

#[test]
fn every_gemm_synchronized() {
    let runtime = MockRuntime::new(1);
    let config = config(4);
    runtime.bench(&config).unwrap();

    let calls = runtime.record.calls();
    let start = calls
        .iter()
        .position(|call| matches!(call, Call::Gemm { .. }))
        .unwrap();
    let timed = &calls[start..];
    assert_eq!(timed.len(), 2 * config.batch * 4);
    for pair in timed.chunks(2) {
        assert_eq!(pair, [Call::Gemm { a: 0, b: 1, c: 2 }, Call::Synchronize]);
    }
    assert!(calls[..start].iter().all(|call| *call != Call::Synchronize));
}

#[test]
fn batch_per_report() {
    let runtime = MockRuntime::new(1);
    let config = BenchConfig {
        batch: 3,
        ..config(5)
    };
    runtime.bench(&config).unwrap();

    assert_eq!(runtime.record.took().len(), 5);
    assert_eq!(
        runtime.record.count(|call| matches!(call, Call::Gemm { .. })),
        15
    );
}

#[test]
fn zero_iterations() {
    let runtime = MockRuntime::new(1);
    runtime.bench(&config(0)).unwrap();

    assert_eq!(runtime.record.lines(), PROGRESS);
    assert_eq!(
        runtime.record.count(|call| matches!(call, Call::Gemm { .. })),
        0
    );
}

#[test]
fn gemm_semantics() {
    let runtime = MockRuntime::new(1);
    let config = BenchConfig {
        batch: 1,
        alpha: 2.,
        beta: 0.5,
        ..config(1)
    };
    runtime.bench(&config).unwrap();

    let snapshot = runtime.record.first_gemm.lock().unwrap().clone().unwrap();
    assert!(snapshot.c_before.iter().all(|&x| x == 0.));
    assert!(snapshot.a.iter().chain(&snapshot.b).all(|x| x.is_finite()));
    assert!(snapshot.a.iter().any(|&x| x != 0.));

    let n = config.matrix_size;
    for j in 0..n {
        for i in 0..n {
            let expected = 2. * (0..n)
                .map(|l| snapshot.a[i + l * n] * snapshot.b[l + j * n])
                .sum::<f32>();
            let actual = snapshot.c_after[i + j * n];
            assert!((actual - expected).abs() <= 1e-5 * expected.abs().max(1.));
        }
    }
}

#[test]
fn host_reference() {
    // |10 10|    |1 1 1 1|   |1 1|
    // |20 20| <- |2 2 2 2| · |2 2|
    // |30 30|    |3 3 3 3|   |3 3|
    //                        |4 4|
    let a: [f32; 12] = std::array::from_fn(|i| (i % 3 + 1) as _);
    let b: [f32; 8] = std::array::from_fn(|i| (i % 4 + 1) as _);
    let mut c = [1.0f32; 6];
    let gemm = Gemm {
        m: 3,
        n: 2,
        k: 4,
        lda: 3,
        ldb: 4,
        ldc: 3,
        ..Gemm::square(0, 1., 0.)
    };
    host_sgemm(&gemm, &a, &b, &mut c);
    assert_eq!(c, [10., 20., 30., 10., 20., 30.]);

    let gemm = Gemm {
        alpha: 2.,
        beta: 0.5,
        ..gemm
    };
    host_sgemm(&gemm, &a, &b, &mut c);
    assert_eq!(c, [25., 50., 75., 25., 50., 75.]);
}
