use crate::{AsRaw, CurrentCtx, DriverError, bindings as cuda};
use std::{alloc::Layout, marker::PhantomData, mem::size_of_val, ptr::null_mut};

/// Device memory taken from the default pool in stream order, freed on drop.
pub struct DevMem<'ctx> {
    ptr: cuda::CUdeviceptr,
    len: usize,
    _ctx: PhantomData<&'ctx CurrentCtx>,
}

impl CurrentCtx {
    pub fn malloc<T: Copy>(&self, len: usize) -> Result<DevMem<'_>, DriverError> {
        let len = Layout::array::<T>(len).map_or(usize::MAX, |layout| layout.size());
        let mut ptr = 0;
        driver!(cuMemAllocAsync(&mut ptr, len, null_mut()))?;
        Ok(DevMem {
            ptr,
            len,
            _ctx: PhantomData,
        })
    }

    pub fn from_host<T: Copy>(&self, slice: &[T]) -> Result<DevMem<'_>, DriverError> {
        let mut mem = self.malloc::<u8>(size_of_val(slice))?;
        mem.copy_in(slice)?;
        Ok(mem)
    }
}

impl Drop for DevMem<'_> {
    #[inline]
    fn drop(&mut self) {
        if let Err(e) = driver!(cuMemFreeAsync(self.ptr, null_mut())) {
            log::warn!("failed to free {} bytes of device memory: {e}", self.len)
        }
    }
}

impl AsRaw for DevMem<'_> {
    type Raw = cuda::CUdeviceptr;
    #[inline]
    unsafe fn as_raw(&self) -> Self::Raw {
        self.ptr
    }
}

impl DevMem<'_> {
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn as_ptr<T>(&self) -> *const T {
        self.ptr as _
    }

    #[inline]
    pub fn as_mut_ptr<T>(&mut self) -> *mut T {
        self.ptr as _
    }

    /// Clears every byte, ordered after the work already issued on the default stream.
    #[inline]
    pub fn memset_zero(&mut self) -> Result<(), DriverError> {
        driver!(cuMemsetD8Async(self.ptr, 0, self.len, null_mut()))
    }

    pub fn copy_in<T: Copy>(&mut self, slice: &[T]) -> Result<(), DriverError> {
        let len = size_of_val(slice);
        assert_eq!(len, self.len);
        driver!(cuMemcpyHtoD_v2(self.ptr, slice.as_ptr().cast(), len))
    }

    pub fn copy_out<T: Copy>(&self, slice: &mut [T]) -> Result<(), DriverError> {
        let len = size_of_val(slice);
        assert_eq!(len, self.len);
        driver!(cuMemcpyDtoH_v2(slice.as_mut_ptr().cast(), self.ptr, len))
    }
}

#[test]
fn test_round_trip() {
    use crate::Device;
    use rand::Rng;

    let Some(dev) = Device::all().unwrap().into_iter().next() else {
        return;
    };
    dev.context()
        .unwrap()
        .apply(|ctx| {
            let mut rng = rand::rng();
            let host = (0..1024).map(|_| rng.random::<f32>()).collect::<Vec<_>>();

            let mut mem = ctx.from_host(&host).unwrap();
            assert_eq!(mem.len(), host.len() * size_of::<f32>());
            let mut back = vec![0.0f32; host.len()];
            mem.copy_out(&mut back).unwrap();
            assert_eq!(back, host);

            mem.memset_zero().unwrap();
            ctx.synchronize().unwrap();
            mem.copy_out(&mut back).unwrap();
            assert!(back.iter().all(|&x| x == 0.));
        })
        .unwrap()
}
