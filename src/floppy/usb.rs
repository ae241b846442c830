//! USB Block Façade: adapts the cache/lifecycle pair to a block-device view.
//!
//! The block-I/O half of this type implements [`usbd_scsi::BlockDevice`]
//! (feature `usb`) — the same trait real `usb-device`-based mass-storage
//! firmwares implement to plug into a SCSI command dispatcher. The
//! ready/media-change/inquiry surface has no counterpart in that trait, so
//! it is exposed as plain inherent methods for the embedding firmware's
//! SCSI glue to call directly.

use crate::floppy::cache::CacheEngine;
use crate::floppy::clock::Clock;
use crate::floppy::device::ImageDevice;
use crate::floppy::error::FloppyError;
use crate::floppy::lifecycle::{FloppyStatus, ImageLifecycleManager};
use spin::Mutex;

/// Sector size presented to the host, always 512 bytes.
pub const BLOCK_BYTES: usize = 512;

/// Capacity advertised when no image is mounted: the largest supported
/// geometry, so a host that queries before mounting never under-reports.
const DEFAULT_TOTAL_SECTORS: u32 = 2880;

/// Vendor string returned by Inquiry.
pub const INQUIRY_VENDOR: &str = "USBFLOP ";
/// Product string returned by Inquiry.
pub const INQUIRY_PRODUCT: &str = "Floppy Emulator ";
/// Revision string returned by Inquiry.
pub const INQUIRY_REVISION: &str = "1.0 ";

/// Adapts a [`CacheEngine`] and [`ImageLifecycleManager`] pair to the
/// host-facing block device surface.
pub struct UsbBlockFacade<'a, B, C, const META_BLOCKS: usize, const DATA_BLOCKS: usize> {
    cache: &'a CacheEngine<B, C, META_BLOCKS, DATA_BLOCKS>,
    lifecycle: &'a ImageLifecycleManager<'a, B, C, META_BLOCKS, DATA_BLOCKS>,
    /// Ready state as of the last `unit_ready` query, used to detect the
    /// transition and report it as "not ready" exactly once.
    was_ready: Mutex<bool>,
}

impl<'a, B, C, const META_BLOCKS: usize, const DATA_BLOCKS: usize>
    UsbBlockFacade<'a, B, C, META_BLOCKS, DATA_BLOCKS>
where
    B: ImageDevice,
    C: Clock,
{
    /// Builds a façade over a cache/lifecycle pair.
    pub fn new(
        cache: &'a CacheEngine<B, C, META_BLOCKS, DATA_BLOCKS>,
        lifecycle: &'a ImageLifecycleManager<'a, B, C, META_BLOCKS, DATA_BLOCKS>,
    ) -> Self {
        Self {
            cache,
            lifecycle,
            was_ready: Mutex::new(false),
        }
    }

    /// Whether the unit is ready to serve block I/O.
    ///
    /// If the ready/not-ready boolean has changed since the caller's last
    /// query, that transition is reported as "not ready" once (simulating
    /// `UNIT_ATTENTION`/`(0x28,0x00)`); the following call reports the true
    /// state.
    pub fn unit_ready(&self) -> bool {
        let ready = self.lifecycle.status() == FloppyStatus::Ready;
        let mut was_ready = self.was_ready.lock();
        if ready != *was_ready {
            *was_ready = ready;
            return false;
        }
        ready
    }

    /// `(total_sectors, bytes_per_sector)` for the mounted image, or the
    /// maximum supported geometry if nothing is mounted.
    pub fn capacity(&self) -> (u32, usize) {
        let snapshot = self.lifecycle.status_snapshot();
        if snapshot.status == FloppyStatus::Ready {
            (snapshot.total_sectors, BLOCK_BYTES)
        } else {
            (DEFAULT_TOTAL_SECTORS, BLOCK_BYTES)
        }
    }

    /// Reads one sector, bounds-checked against the current capacity.
    pub fn read10(&self, lba: u32, buf: &mut [u8; BLOCK_BYTES]) -> Result<(), FloppyError> {
        let (total_sectors, _) = self.capacity();
        if lba >= total_sectors {
            return Err(FloppyError::OutOfRange);
        }
        self.cache.read_sector(lba, buf)
    }

    /// Writes one sector, bounds-checked against the current capacity.
    pub fn write10(&self, lba: u32, buf: &[u8; BLOCK_BYTES]) -> Result<(), FloppyError> {
        let (total_sectors, _) = self.capacity();
        if lba >= total_sectors {
            return Err(FloppyError::OutOfRange);
        }
        self.cache.write_sector(lba, buf)
    }

    /// Constant vendor/product/revision strings for SCSI Inquiry.
    pub fn inquiry(&self) -> (&'static str, &'static str, &'static str) {
        (INQUIRY_VENDOR, INQUIRY_PRODUCT, INQUIRY_REVISION)
    }
}

#[cfg(feature = "usb")]
mod block_device_impl {
    use super::*;
    use usbd_scsi::{BlockDevice, BlockDeviceError};

    impl<'a, B, C, const META_BLOCKS: usize, const DATA_BLOCKS: usize> BlockDevice
        for UsbBlockFacade<'a, B, C, META_BLOCKS, DATA_BLOCKS>
    where
        B: ImageDevice,
        C: Clock,
    {
        const BLOCK_BYTES: usize = BLOCK_BYTES;

        fn read_block(&self, lba: u32, block: &mut [u8]) -> Result<(), BlockDeviceError> {
            let mut buf = [0u8; BLOCK_BYTES];
            self.read10(lba, &mut buf).map_err(|_| BlockDeviceError::ReadError)?;
            block.copy_from_slice(&buf);
            Ok(())
        }

        fn write_block(&mut self, lba: u32, block: &[u8]) -> Result<(), BlockDeviceError> {
            let mut buf = [0u8; BLOCK_BYTES];
            buf.copy_from_slice(block);
            self.write10(lba, &buf).map_err(|_| BlockDeviceError::WriteError)
        }

        fn max_lba(&self) -> u32 {
            self.capacity().0.saturating_sub(1)
        }
    }
}
