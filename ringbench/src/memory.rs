//! Transfer buffer allocation for host and device memory.
use crate::{Error, Result};
use log::debug;

/// Memory location for the transfer buffers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MemLocation {
    /// Ordinary host memory.
    Host,

    /// Accelerator memory (requires the `cuda` feature).
    Device,
}

/// Capability interface over one contiguous transfer buffer.
///
/// Backends consume the raw pointer and length; a device buffer's
/// pointer is only meaningful to a transport that understands device
/// memory (e.g. a CUDA-aware MPI).
pub trait TransferBuffer: Send {
    /// Pointer to the start of the buffer.
    fn as_ptr(&self) -> *const u8;

    /// Mutable pointer to the start of the buffer.
    fn as_mut_ptr(&mut self) -> *mut u8;

    /// Length of the buffer in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Where the buffer lives.
    fn location(&self) -> MemLocation;

    /// View as a host byte slice, if the buffer is host-resident.
    fn host_slice(&self) -> Option<&[u8]>;

    /// Mutable view as a host byte slice, if the buffer is host-resident.
    fn host_slice_mut(&mut self) -> Option<&mut [u8]>;
}

/// Host buffer backed by a `Vec`. Freed by the normal `Vec` drop.
struct HostBuffer(Vec<u8>);

impl HostBuffer {
    fn new(len: usize) -> Result<HostBuffer> {
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|err| Error::Alloc(len, err.to_string()))?;
        data.resize(len, 0);
        Ok(HostBuffer(data))
    }
}

impl TransferBuffer for HostBuffer {
    fn as_ptr(&self) -> *const u8 {
        self.0.as_ptr()
    }

    fn as_mut_ptr(&mut self) -> *mut u8 {
        self.0.as_mut_ptr()
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn location(&self) -> MemLocation {
        MemLocation::Host
    }

    fn host_slice(&self) -> Option<&[u8]> {
        Some(&self.0)
    }

    fn host_slice_mut(&mut self) -> Option<&mut [u8]> {
        Some(&mut self.0)
    }
}

#[cfg(feature = "cuda")]
mod device {
    use super::{MemLocation, TransferBuffer};
    use crate::{Error, Result};
    use cudarc::driver::{CudaDevice, CudaSlice, DevicePtr, DevicePtrMut};
    use std::sync::Arc;

    /// Device buffer backed by cudarc. Freed by the cudarc drop.
    pub(super) struct DeviceBuffer {
        slice: CudaSlice<u8>,
        // Kept alive so the allocation outlives any context teardown.
        _dev: Arc<CudaDevice>,
    }

    impl DeviceBuffer {
        pub(super) fn new(len: usize) -> Result<DeviceBuffer> {
            let dev = CudaDevice::new(0).map_err(|err| Error::Alloc(len, err.to_string()))?;
            let slice = dev
                .alloc_zeros::<u8>(len)
                .map_err(|err| Error::Alloc(len, err.to_string()))?;
            Ok(DeviceBuffer { slice, _dev: dev })
        }
    }

    impl TransferBuffer for DeviceBuffer {
        fn as_ptr(&self) -> *const u8 {
            *self.slice.device_ptr() as *const u8
        }

        fn as_mut_ptr(&mut self) -> *mut u8 {
            *self.slice.device_ptr_mut() as *mut u8
        }

        fn len(&self) -> usize {
            self.slice.len()
        }

        fn location(&self) -> MemLocation {
            MemLocation::Device
        }

        fn host_slice(&self) -> Option<&[u8]> {
            None
        }

        fn host_slice_mut(&mut self) -> Option<&mut [u8]> {
            None
        }
    }
}

/// Allocate one zero-filled buffer at the requested location.
pub fn allocate(len: usize, location: MemLocation) -> Result<Box<dyn TransferBuffer>> {
    match location {
        MemLocation::Host => Ok(Box::new(HostBuffer::new(len)?)),
        #[cfg(feature = "cuda")]
        MemLocation::Device => Ok(Box::new(device::DeviceBuffer::new(len)?)),
        #[cfg(not(feature = "cuda"))]
        MemLocation::Device => Err(Error::DeviceUnsupported),
    }
}

/// Allocate the send and receive buffers for one participant.
pub fn allocate_pair(
    len: usize,
    location: MemLocation,
) -> Result<(Box<dyn TransferBuffer>, Box<dyn TransferBuffer>)> {
    debug!("allocating 2 x {} byte buffers at {:?}", len, location);
    let send = allocate(len, location)?;
    let recv = allocate(len, location)?;
    Ok((send, recv))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_buffers_are_zeroed() {
        let (send, recv) = allocate_pair(64, MemLocation::Host).unwrap();
        assert_eq!(send.len(), 64);
        assert_eq!(recv.len(), 64);
        assert!(send.host_slice().unwrap().iter().all(|&b| b == 0));
        assert!(recv.host_slice().unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn zero_length_buffer_is_valid() {
        let buf = allocate(0, MemLocation::Host).unwrap();
        assert_eq!(buf.len(), 0);
        assert!(buf.is_empty());
    }

    #[cfg(not(feature = "cuda"))]
    #[test]
    fn device_without_cuda_is_fatal() {
        match allocate(16, MemLocation::Device) {
            Err(crate::Error::DeviceUnsupported) => (),
            other => panic!("expected DeviceUnsupported, got {:?}", other.map(|b| b.len())),
        }
    }
}
