//! End-to-end scenarios over the floppy back-end, against real files on
//! disk through [`FileImageDevice`], mirroring how the teacher crate's
//! `tests/ota/mod.rs` drives `Ota` against a `RamStorage` double rather than
//! real flash: here the double is a real filesystem, the lowest-fidelity
//! stand-in for an SD card available on a host.

#![cfg(feature = "std")]

use floppy_emu::floppy::cache::CacheEngine;
use floppy_emu::floppy::clock::StepClock;
use floppy_emu::floppy::device::file::FileImageDevice;
use floppy_emu::floppy::geometry::Geometry;
use floppy_emu::floppy::lifecycle::{FloppyStatus, ImageLifecycleManager};
use floppy_emu::floppy::usb::UsbBlockFacade;
use std::fs;
use std::io::Read;
use std::path::PathBuf;

/// A scratch image file under the host temp directory, removed on drop.
struct ScratchImage {
    path: PathBuf,
}

impl ScratchImage {
    fn new(name: &str, size: u64) -> Self {
        let path = std::env::temp_dir().join(format!("floppy_emu_test_{name}.img"));
        fs::write(&path, vec![0u8; size as usize]).unwrap();
        Self { path }
    }

    fn path_str(&self) -> &str {
        self.path.to_str().unwrap()
    }
}

impl Drop for ScratchImage {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Metadata region sized for the widest supported geometry (33 sectors
/// needs 5 blocks of 8); data region given a handful of blocks, enough to
/// exercise eviction without needing a multi-megabyte cache in a test.
type TestCache = CacheEngine<FileImageDevice, StepClock, 5, 4>;

fn new_cache() -> TestCache {
    CacheEngine::new(FileImageDevice::new(), StepClock::new())
}

#[test]
fn mount_read_eject_144m_image() {
    let image = ScratchImage::new("dos622", Geometry::Mb1_44.byte_size());
    let cache = new_cache();
    let lifecycle = ImageLifecycleManager::new(&cache);
    let facade = UsbBlockFacade::new(&cache, &lifecycle);

    lifecycle.load(image.path_str()).unwrap();
    let snapshot = lifecycle.status_snapshot();
    assert_eq!(snapshot.status, FloppyStatus::Ready);
    assert_eq!(snapshot.total_sectors, 2880);
    assert_eq!(snapshot.geometry, Some(Geometry::Mb1_44));
    // 33 metadata sectors * 512 bytes / 1024 == 16 KiB, fully preloaded.
    assert_eq!(snapshot.loaded_sectors, 33);
    assert_eq!(snapshot.loaded_sectors as u64 * 512 / 1024, 16);

    let _ = facade.unit_ready(); // consume the startup false->true media-change event
    assert_eq!(facade.capacity(), (2880, 512));

    let mut sector = [0u8; 512];
    facade.read10(0, &mut sector).unwrap();
    assert_eq!(sector, [0u8; 512]);

    lifecycle.eject().unwrap();
    assert_eq!(lifecycle.status(), FloppyStatus::NoImage);
}

#[test]
fn write_then_flush_lands_on_disk() {
    let image = ScratchImage::new("write_flush", Geometry::Mb1_44.byte_size());
    let cache = new_cache();
    let lifecycle = ImageLifecycleManager::new(&cache);
    let facade = UsbBlockFacade::new(&cache, &lifecycle);

    lifecycle.load(image.path_str()).unwrap();

    let pattern = [0xA5u8; 512];
    facade.write10(100, &pattern).unwrap();

    let mut readback = [0u8; 512];
    facade.read10(100, &mut readback).unwrap();
    assert_eq!(readback, pattern);

    lifecycle.eject().unwrap();

    let mut file = fs::File::open(image.path_str()).unwrap();
    let mut on_disk = [0u8; 512];
    file.seek_and_read(51_200, &mut on_disk);
    assert_eq!(on_disk, pattern);
}

trait SeekAndRead {
    fn seek_and_read(&mut self, offset: u64, buf: &mut [u8]);
}

impl SeekAndRead for fs::File {
    fn seek_and_read(&mut self, offset: u64, buf: &mut [u8]) {
        use std::io::Seek;
        self.seek(std::io::SeekFrom::Start(offset)).unwrap();
        self.read_exact(buf).unwrap();
    }
}

#[test]
fn lru_eviction_with_two_data_blocks() {
    // A cache with only 2 data blocks forces eviction on the third distinct
    // block touched; the metadata region is irrelevant here, since LBAs
    // 200/300/400 lie well past a 720K image's 14 metadata sectors.
    let image = ScratchImage::new("lru", Geometry::Kb720.byte_size());
    let cache: CacheEngine<FileImageDevice, StepClock, 5, 2> =
        CacheEngine::new(FileImageDevice::new(), StepClock::new());
    let lifecycle = ImageLifecycleManager::new(&cache);
    lifecycle.load(image.path_str()).unwrap();

    let mut buf = [0u8; 512];
    cache.read_sector(200, &mut buf).unwrap(); // block A
    cache.read_sector(300, &mut buf).unwrap(); // block B
    let (_, misses_before_c) = cache.stats();
    cache.read_sector(400, &mut buf).unwrap(); // evicts A
    let (_, misses_after_c) = cache.stats();
    assert_eq!(misses_after_c, misses_before_c + 1);

    let (_, misses_before_a) = cache.stats();
    cache.read_sector(200, &mut buf).unwrap(); // miss: A was evicted
    let (_, misses_after_a) = cache.stats();
    assert_eq!(misses_after_a, misses_before_a + 1);

    let (_, misses_before_b) = cache.stats();
    cache.read_sector(300, &mut buf).unwrap(); // hit: B is still resident
    let (_, misses_after_b) = cache.stats();
    assert_eq!(misses_after_b, misses_before_b);
}

#[test]
fn media_change_across_remount_updates_capacity() {
    let small = ScratchImage::new("media_change_small", Geometry::Kb720.byte_size());
    let cache = new_cache();
    let lifecycle = ImageLifecycleManager::new(&cache);
    let facade = UsbBlockFacade::new(&cache, &lifecycle);

    let _ = facade.unit_ready(); // consume the startup false->false non-event
    lifecycle.load(small.path_str()).unwrap();
    assert_eq!(facade.capacity(), (1440, 512));
    lifecycle.eject().unwrap();

    let big = ScratchImage::new("media_change_big", Geometry::Mb1_44.byte_size());
    lifecycle.load(big.path_str()).unwrap();

    assert!(!facade.unit_ready()); // media change reported exactly once
    assert!(facade.unit_ready());
    assert_eq!(facade.capacity(), (2880, 512));
}

#[test]
fn unknown_format_rejects_file_and_remembers_its_size() {
    let image = ScratchImage::new("unknown", 1_000_000);
    let cache = new_cache();
    let lifecycle = ImageLifecycleManager::new(&cache);

    let err = lifecycle.load(image.path_str()).unwrap_err();
    assert_eq!(err, floppy_emu::floppy::error::FloppyError::UnknownFormat);

    let snapshot = lifecycle.status_snapshot();
    assert_eq!(snapshot.status, FloppyStatus::Error);
    assert_eq!(snapshot.rejected_file_size, Some(1_000_000));

    lifecycle.acknowledge_error();
    assert_eq!(lifecycle.status(), FloppyStatus::NoImage);
}

#[test]
fn out_of_range_read_is_rejected_on_a_720k_image() {
    let image = ScratchImage::new("oor", Geometry::Kb720.byte_size());
    let cache = new_cache();
    let lifecycle = ImageLifecycleManager::new(&cache);
    let facade = UsbBlockFacade::new(&cache, &lifecycle);

    lifecycle.load(image.path_str()).unwrap();

    let mut buf = [0u8; 512];
    assert!(facade.read10(1440, &mut buf).is_err());
    assert!(facade.read10(1439, &mut buf).is_ok());
}
