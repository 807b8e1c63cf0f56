use crate::{AsRaw, Device, DriverError, bindings as cuda};
use std::{ops::Deref, ptr::null_mut};

#[derive(PartialEq, Eq, Hash, Debug)]
pub struct Context {
    ctx: cuda::CUcontext,
    dev: Device,
}

impl Device {
    /// Creates a context on this device, left floating (not current on any thread).
    pub fn context(&self) -> Result<Context, DriverError> {
        let dev = unsafe { self.as_raw() };
        let mut ctx = null_mut();
        driver!(cuCtxCreate_v2(&mut ctx, 0, dev))?;
        let context = Context { ctx, dev: *self };
        driver!(cuCtxPopCurrent_v2(null_mut()))?;
        Ok(context)
    }
}

impl Drop for Context {
    #[inline]
    fn drop(&mut self) {
        if let Err(e) = driver!(cuCtxDestroy_v2(self.ctx)) {
            log::warn!("failed to destroy context on {}: {e}", self.dev)
        }
    }
}

unsafe impl Send for Context {}
unsafe impl Sync for Context {}

impl AsRaw for Context {
    type Raw = cuda::CUcontext;
    #[inline]
    unsafe fn as_raw(&self) -> Self::Raw {
        self.ctx
    }
}

impl Context {
    #[inline]
    pub fn device(&self) -> Device {
        self.dev
    }

    /// Makes this context current on the calling thread until the guard drops.
    #[inline]
    pub fn push(&self) -> Result<Pushed<'_>, DriverError> {
        driver!(cuCtxPushCurrent_v2(self.ctx))?;
        Ok(Pushed(CurrentCtx(self.ctx), self))
    }

    #[inline]
    pub fn apply<T>(&self, f: impl FnOnce(&CurrentCtx) -> T) -> Result<T, DriverError> {
        self.push().map(|ctx| f(&*ctx))
    }
}

/// The context current on this thread; every device resource borrows it.
#[derive(Debug)]
#[repr(transparent)]
pub struct CurrentCtx(cuda::CUcontext);

pub struct Pushed<'a>(CurrentCtx, &'a Context);

impl Deref for Pushed<'_> {
    type Target = CurrentCtx;
    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Drop for Pushed<'_> {
    #[inline]
    fn drop(&mut self) {
        let mut top = null_mut();
        match driver!(cuCtxPopCurrent_v2(&mut top)) {
            Ok(()) => debug_assert_eq!(top, self.0.0),
            Err(e) => log::warn!("failed to pop context of {}: {e}", self.1.dev),
        }
    }
}

impl AsRaw for CurrentCtx {
    type Raw = cuda::CUcontext;
    #[inline]
    unsafe fn as_raw(&self) -> Self::Raw {
        self.0
    }
}

impl CurrentCtx {
    #[inline]
    pub fn dev(&self) -> Result<Device, DriverError> {
        let mut dev = 0;
        driver!(cuCtxGetDevice(&mut dev))?;
        Device::new(dev)
    }

    /// Blocks until every operation issued in this context has completed.
    #[inline]
    pub fn synchronize(&self) -> Result<(), DriverError> {
        driver!(cuCtxSynchronize())
    }
}

#[test]
fn test_push_pop() {
    let Some(dev) = Device::all().unwrap().into_iter().next() else {
        return;
    };
    let ctx = dev.context().unwrap();
    let mut raw = null_mut();
    driver!(cuCtxGetCurrent(&mut raw)).unwrap();
    assert!(raw.is_null());

    ctx.apply(|current| {
        let mut raw = null_mut();
        driver!(cuCtxGetCurrent(&mut raw)).unwrap();
        assert_eq!(raw, unsafe { current.as_raw() });
        assert_eq!(current.dev().unwrap(), dev);
        current.synchronize().unwrap();
    })
    .unwrap();

    driver!(cuCtxGetCurrent(&mut raw)).unwrap();
    assert!(raw.is_null());
}
