use gemm_bench::{BenchConfig, run};
use std::{io, process::ExitCode};

fn main() -> ExitCode {
    env_logger::init();

    match run(&runtime(), &BenchConfig::default(), io::stdout()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(nvidia)]
fn runtime() -> gemm_bench::CudaRuntime {
    gemm_bench::CudaRuntime
}

#[cfg(not(nvidia))]
fn runtime() -> gemm_bench::NoRuntime {
    gemm_bench::NoRuntime
}
