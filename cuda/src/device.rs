use crate::{AsRaw, DriverError, bindings as cuda};
use std::{
    cmp::Ordering,
    ffi::{CStr, c_char, c_int},
    fmt,
    ptr::null_mut,
};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(transparent)]
pub struct Device(cuda::CUdevice);

impl AsRaw for Device {
    type Raw = cuda::CUdevice;
    #[inline]
    unsafe fn as_raw(&self) -> Self::Raw {
        self.0
    }
}

impl Device {
    #[inline]
    pub fn new(index: c_int) -> Result<Self, DriverError> {
        let mut device = 0;
        driver!(cuDeviceGet(&mut device, index))?;
        Ok(Self(device))
    }

    #[inline]
    pub fn count() -> Result<usize, DriverError> {
        let mut count = 0;
        driver!(cuDeviceGetCount(&mut count))?;
        Ok(count as _)
    }

    /// Initializes the driver and lists every device in ordinal order.
    ///
    /// A machine without devices yields an empty list, not an error.
    pub fn all() -> Result<Vec<Self>, DriverError> {
        match crate::init() {
            Ok(()) => {}
            Err(e) if e.is_no_device() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        }
        (0..Self::count()?).map(|i| Self::new(i as _)).collect()
    }

    pub fn name(&self) -> Result<String, DriverError> {
        let mut buf = [0 as c_char; 256];
        driver!(cuDeviceGetName(buf.as_mut_ptr(), buf.len() as _, self.0))?;
        let name = unsafe { CStr::from_ptr(buf.as_ptr()) };
        Ok(name.to_string_lossy().into_owned())
    }

    #[inline]
    pub fn compute_capability(&self) -> Result<ComputeCapability, DriverError> {
        use cuda::CUdevice_attribute::*;
        Ok(ComputeCapability {
            major: self.get_attribute(CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MAJOR)?,
            minor: self.get_attribute(CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MINOR)?,
        })
    }

    #[inline]
    pub fn total_memory(&self) -> Result<usize, DriverError> {
        let mut bytes = 0;
        driver!(cuDeviceTotalMem_v2(&mut bytes, self.0))?;
        Ok(bytes as _)
    }

    /// Sets how many bytes the default memory pool keeps reserved after frees.
    ///
    /// 0 hands freed memory back to the system at the next synchronization.
    pub fn set_mempool_threshold(&self, threshold: u64) -> Result<(), DriverError> {
        let mut mempool = null_mut();
        driver!(cuDeviceGetDefaultMemPool(&mut mempool, self.0))?;
        driver!(cuMemPoolSetAttribute(
            mempool,
            CUmemPool_attribute::CU_MEMPOOL_ATTR_RELEASE_THRESHOLD,
            (&threshold) as *const _ as _,
        ))
    }

    #[inline]
    fn get_attribute(&self, attr: cuda::CUdevice_attribute) -> Result<i32, DriverError> {
        let mut value = 0;
        driver!(cuDeviceGetAttribute(&mut value, attr, self.0))?;
        Ok(value)
    }
}

impl fmt::Display for Device {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "gpu{}", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ComputeCapability {
    pub major: i32,
    pub minor: i32,
}

impl PartialOrd for ComputeCapability {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ComputeCapability {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
    }
}

impl fmt::Display for ComputeCapability {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[test]
fn test() {
    for dev in Device::all().unwrap() {
        println!(
            "{dev}: {} ver{} mem={}",
            dev.name().unwrap(),
            dev.compute_capability().unwrap(),
            dev.total_memory().unwrap(),
        );
    }
}

#[test]
fn test_capability_order() {
    let a = ComputeCapability { major: 7, minor: 5 };
    let b = ComputeCapability { major: 8, minor: 0 };
    let c = ComputeCapability { major: 8, minor: 6 };
    assert!(a < b && b < c);
    assert_eq!(c.to_string(), "8.6");
}
