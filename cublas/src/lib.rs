#![cfg(nvidia)]
#![deny(warnings)]

#[macro_use]
#[allow(unused, non_upper_case_globals, non_camel_case_types, non_snake_case)]
pub mod bindings {
    include!(concat!(env!("OUT_DIR"), "/bindings.rs"));

    #[macro_export]
    macro_rules! cublas {
        ($f:ident($($arg:expr),* $(,)?)) => {{
            #[allow(unused_imports)]
            use $crate::bindings::*;
            #[allow(unused_unsafe, clippy::macro_metavars_in_unsafe)]
            let err = unsafe { $f($($arg),*) };
            $crate::CublasError::check(err, stringify!($f))
        }};
    }
}

mod blas;
pub use blas::Cublas;

use bindings::cublasStatus_t;

#[derive(Clone, Copy, PartialEq, Eq, Debug, thiserror::Error)]
#[error("{call} failed with {status:?}")]
pub struct CublasError {
    pub call: &'static str,
    pub status: cublasStatus_t,
}

impl CublasError {
    #[inline]
    pub fn check(status: cublasStatus_t, call: &'static str) -> Result<(), Self> {
        if status == cublasStatus_t::CUBLAS_STATUS_SUCCESS {
            Ok(())
        } else {
            Err(Self { call, status })
        }
    }
}
