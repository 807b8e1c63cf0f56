use crate::{
    CurandError,
    bindings::{curandGenerator_t, curandRngType},
};
use cuda::{AsRaw, CurrentCtx, DevMem};
use std::{marker::PhantomData, ptr::null_mut};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
pub enum RngType {
    #[default]
    PseudoDefault,
    Philox4x32_10,
}

impl RngType {
    fn raw(self) -> curandRngType {
        use curandRngType::*;
        match self {
            Self::PseudoDefault => CURAND_RNG_PSEUDO_DEFAULT,
            Self::Philox4x32_10 => CURAND_RNG_PSEUDO_PHILOX4_32_10,
        }
    }
}

/// A host-API cuRAND generator writing into device memory of the current context.
pub struct Generator<'ctx>(curandGenerator_t, PhantomData<&'ctx CurrentCtx>);

impl Drop for Generator<'_> {
    #[inline]
    fn drop(&mut self) {
        if let Err(e) = curand!(curandDestroyGenerator(self.0)) {
            log::warn!("{e}")
        }
    }
}

impl AsRaw for Generator<'_> {
    type Raw = curandGenerator_t;
    #[inline]
    unsafe fn as_raw(&self) -> Self::Raw {
        self.0
    }
}

impl<'ctx> Generator<'ctx> {
    #[inline]
    pub fn new(_ctx: &'ctx CurrentCtx, ty: RngType) -> Result<Self, CurandError> {
        let mut raw = null_mut();
        curand!(curandCreateGenerator(&mut raw, ty.raw()))?;
        Ok(Self(raw, PhantomData))
    }
}

impl Generator<'_> {
    #[inline]
    pub fn set_seed(&mut self, seed: u64) -> Result<(), CurandError> {
        curand!(curandSetPseudoRandomGeneratorSeed(self.0, seed as _))
    }

    /// Fills `mem` with `f32` samples of N(`mean`, `stddev`²).
    ///
    /// Pseudo-random generators need an even sample count.
    pub fn normal(
        &mut self,
        mem: &mut DevMem,
        mean: f32,
        stddev: f32,
    ) -> Result<(), CurandError> {
        let n = mem.len() / size_of::<f32>();
        curand!(curandGenerateNormal(
            self.0,
            mem.as_mut_ptr(),
            n,
            mean,
            stddev,
        ))
    }
}
