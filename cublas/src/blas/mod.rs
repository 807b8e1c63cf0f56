use crate::{
    CublasError,
    bindings::{cublasHandle_t, cublasOperation_t},
};
use cuda::{AsRaw, CurrentCtx};
use std::{marker::PhantomData, ptr::null_mut};

/// A cuBLAS handle created in the current context, issuing on its default stream.
pub struct Cublas<'ctx>(cublasHandle_t, PhantomData<&'ctx CurrentCtx>);

impl Drop for Cublas<'_> {
    #[inline]
    fn drop(&mut self) {
        if let Err(e) = cublas!(cublasDestroy_v2(self.0)) {
            log::warn!("{e}")
        }
    }
}

impl AsRaw for Cublas<'_> {
    type Raw = cublasHandle_t;
    #[inline]
    unsafe fn as_raw(&self) -> Self::Raw {
        self.0
    }
}

impl<'ctx> Cublas<'ctx> {
    #[inline]
    pub fn new(_ctx: &'ctx CurrentCtx) -> Result<Self, CublasError> {
        let mut handle = null_mut();
        cublas!(cublasCreate_v2(&mut handle))?;
        Ok(Self(handle, PhantomData))
    }
}

impl Cublas<'_> {
    /// 调用 cublas 单精度矩阵乘：`c = alpha · op(a) · op(b) + beta · c`，列主序。
    ///
    /// # Safety
    ///
    /// 这个函数使用指向显存的裸指针。
    // 对 C API 的封装
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn sgemm(
        &self,
        m: usize,
        n: usize,
        k: usize,
        alpha: f32,
        a: *const f32,
        trans_a: bool,
        lda: isize,
        b: *const f32,
        trans_b: bool,
        ldb: isize,
        beta: f32,
        c: *mut f32,
        ldc: isize,
    ) -> Result<(), CublasError> {
        cublas!(cublasSgemm_v2(
            self.0,
            op(trans_a),
            op(trans_b),
            m as _,
            n as _,
            k as _,
            &alpha,
            a,
            lda as _,
            b,
            ldb as _,
            &beta,
            c,
            ldc as _,
        ))
    }
}

fn op(trans: bool) -> cublasOperation_t {
    if trans {
        cublasOperation_t::CUBLAS_OP_T
    } else {
        cublasOperation_t::CUBLAS_OP_N
    }
}
