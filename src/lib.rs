//! # floppy-emu
//!
//! The sector-caching back-end for a USB mass-storage floppy drive emulator
//! on a resource-constrained microcontroller. A host computer sees a
//! standard removable block device; behind it, sectors are served from a
//! disk image file on an SD card, mediated by a RAM cache sized to a large
//! fraction of available SRAM.
//!
//! This crate is the core: the two-region write-back sector cache, the
//! image mount/eject state machine, and the adapter that presents both as a
//! USB block device. The low-level SD/SPI sequencing, the FAT filesystem
//! library, the USB transport, and the on-device menu/OLED UI are external
//! collaborators, specified only by the narrow traits this crate calls
//! into ([`floppy::device::ImageDevice`]) or can be adapted to
//! ([`floppy::usb::UsbBlockFacade`]).
//!
//! ## Modules
//!
//! - [`floppy`]: the cache engine, lifecycle manager, and USB facade — see
//!   its module documentation for the full component breakdown.
//! - [`storage`]: the byte- and block-addressed storage traits the floppy
//!   back-end's [`floppy::device::ImageDevice`] contract builds on.
//!
//! ## Basic usage
//!
//! ```rust,no_run
//! use floppy_emu::floppy::cache::CacheEngine;
//! use floppy_emu::floppy::clock::StepClock;
//! use floppy_emu::floppy::lifecycle::{FloppyStatus, ImageLifecycleManager};
//! use floppy_emu::floppy::usb::UsbBlockFacade;
//! # #[cfg(feature = "std")]
//! # fn example() {
//! use floppy_emu::floppy::device::file::FileImageDevice;
//!
//! let cache: CacheEngine<FileImageDevice, StepClock, 5, 64> =
//!     CacheEngine::new(FileImageDevice::new(), StepClock::new());
//! let lifecycle = ImageLifecycleManager::new(&cache);
//! let facade = UsbBlockFacade::new(&cache, &lifecycle);
//!
//! lifecycle.load("DOS622.IMG").unwrap();
//! assert_eq!(lifecycle.status(), FloppyStatus::Ready);
//!
//! let mut sector = [0u8; 512];
//! facade.read10(0, &mut sector).unwrap();
//!
//! lifecycle.eject().unwrap();
//! # }
//! ```
//!
//! ## Optional features
//!
//! - `std`: enables [`floppy::device::file::FileImageDevice`], a
//!   `std::fs::File`-backed [`floppy::device::ImageDevice`] for host tools
//!   and tests, in place of the target firmware's FAT-library file handle.
//! - `usb`: implements `usbd_scsi::BlockDevice` for
//!   [`floppy::usb::UsbBlockFacade`], for wiring directly into a
//!   `usb-device`-based SCSI dispatcher.
//! - `defmt`: enables `defmt::Format` on this crate's error types, for
//!   logging on embedded targets.

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

/// Sector-caching floppy back-end: cache engine, image lifecycle, and USB
/// block facade.
///
/// See the module-level documentation for the component breakdown.
pub mod floppy;

/// Storage abstraction layer for byte- and block-addressed devices.
///
/// Provides the traits the floppy back-end's [`floppy::device::ImageDevice`]
/// contract is built on top of.
pub mod storage;
