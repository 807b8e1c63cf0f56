#![cfg(nvidia)]
#![deny(warnings)]

#[macro_use]
#[allow(unused, non_upper_case_globals, non_camel_case_types, non_snake_case)]
pub mod bindings {
    include!(concat!(env!("OUT_DIR"), "/bindings.rs"));

    #[macro_export]
    macro_rules! driver {
        ($f:ident($($arg:expr),* $(,)?)) => {{
            #[allow(unused_imports)]
            use $crate::bindings::*;
            #[allow(unused_unsafe, clippy::macro_metavars_in_unsafe)]
            let err = unsafe { $f($($arg),*) };
            $crate::DriverError::check(err, stringify!($f))
        }};
    }
}

mod context;
mod device;
mod memory;
mod worker;

use bindings::CUresult;

pub trait AsRaw {
    type Raw;

    /// # Safety
    ///
    /// The caller must ensure that the returned item is dropped before the original item.
    unsafe fn as_raw(&self) -> Self::Raw;
}

/// A failed driver call, with the name of the call and the status it returned.
#[derive(Clone, Copy, PartialEq, Eq, Debug, thiserror::Error)]
#[error("{call} failed with {code:?}")]
pub struct DriverError {
    pub call: &'static str,
    pub code: CUresult,
}

impl DriverError {
    #[inline]
    pub fn check(code: CUresult, call: &'static str) -> Result<(), Self> {
        if code == CUresult::CUDA_SUCCESS {
            Ok(())
        } else {
            Err(Self { call, code })
        }
    }

    #[inline]
    pub fn is_no_device(&self) -> bool {
        self.code == CUresult::CUDA_ERROR_NO_DEVICE
    }
}

#[inline(always)]
pub fn init() -> Result<(), DriverError> {
    driver!(cuInit(0))
}

pub use context::{Context, CurrentCtx, Pushed};
pub use device::{ComputeCapability, Device};
pub use memory::DevMem;
pub use worker::{Worker, WorkerError};
