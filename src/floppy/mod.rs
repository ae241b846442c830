//! Sector-caching floppy back-end for a USB mass-storage floppy emulator.
//!
//! This module is the core this crate exists to provide: the subsystem that
//! sits between a USB mass-storage block interface and a file-backed disk
//! image, making the presented block device consistent, bounded in RAM, and
//! safe under concurrent USB and foreground-menu access.
//!
//! ## Components
//!
//! - [`cache`]: the two-region (pinned metadata + LRU data) write-back
//!   sector cache ([`cache::CacheEngine`]), the hard engineering of this
//!   crate.
//! - [`geometry`]: the closed set of supported floppy image geometries and
//!   their detection from file size ([`geometry::Geometry`]).
//! - [`lifecycle`]: the mount/eject state machine
//!   ([`lifecycle::ImageLifecycleManager`]) that drives the cache engine
//!   through loading and ejecting an image.
//! - [`usb`]: the host-facing block device adapter
//!   ([`usb::UsbBlockFacade`]) translating ready/capacity/read10/write10
//!   queries into cache operations.
//! - [`device`]: the narrow [`device::ImageDevice`] contract a storage
//!   backend must satisfy to back a cache engine, plus a `std`-only
//!   file-backed implementation for host tooling and tests.
//! - [`clock`]: the monotonic tick source the cache engine stamps onto
//!   blocks for LRU ordering.
//! - [`error`]: the shared [`error::FloppyError`] type and its recovery
//!   policy, documented per variant.
//!
//! ## Usage
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
//! // Metadata region sized for the widest supported geometry (33 sectors,
//! // 5 blocks); data region sized to whatever SRAM remains.
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

pub mod cache;
pub mod clock;
pub mod device;
pub mod error;
pub mod geometry;
pub mod lifecycle;
pub mod usb;
