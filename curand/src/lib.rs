#![cfg(nvidia)]
#![deny(warnings)]

#[macro_use]
#[allow(unused, non_upper_case_globals, non_camel_case_types, non_snake_case)]
pub mod bindings {
    include!(concat!(env!("OUT_DIR"), "/bindings.rs"));

    #[macro_export]
    macro_rules! curand {
        ($f:ident($($arg:expr),* $(,)?)) => {{
            #[allow(unused_imports)]
            use $crate::bindings::*;
            #[allow(unused_unsafe, clippy::macro_metavars_in_unsafe)]
            let err = unsafe { $f($($arg),*) };
            $crate::CurandError::check(err, stringify!($f))
        }};
    }
}

mod generator;
pub use generator::{Generator, RngType};

use bindings::curandStatus_t;

#[derive(Clone, Copy, PartialEq, Eq, Debug, thiserror::Error)]
#[error("{call} failed with {status:?}")]
pub struct CurandError {
    pub call: &'static str,
    pub status: curandStatus_t,
}

impl CurandError {
    #[inline]
    pub fn check(status: curandStatus_t, call: &'static str) -> Result<(), Self> {
        if status == curandStatus_t::CURAND_STATUS_SUCCESS {
            Ok(())
        } else {
            Err(Self { call, status })
        }
    }
}
