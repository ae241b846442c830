//! Image Lifecycle Manager: mount/eject state machine over the cache engine.
//!
//! An explicit status enum driven by fallible steps that transition to a
//! terminal error state on failure, the same state-machine-over-a-platform
//! shape used elsewhere in this crate's lineage for multi-step processes
//! with an external collaborator: here the "platform" is the pair of a
//! [`CacheEngine`] and the [`ImageDevice`] it owns internally.

use crate::floppy::cache::CacheEngine;
use crate::floppy::clock::Clock;
use crate::floppy::device::ImageDevice;
use crate::floppy::error::FloppyError;
use crate::floppy::geometry::Geometry;
use heapless::String;
use spin::Mutex;

/// Maximum length of a remembered image filename.
pub const MAX_FILENAME: usize = 64;

/// The floppy's externally visible status.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FloppyStatus {
    /// No image is mounted.
    NoImage,
    /// A mount is in progress (opening, detecting geometry, preloading).
    Loading,
    /// An image is mounted and the cache's metadata region is populated.
    Ready,
    /// The last mount attempt failed; needs an acknowledgement to clear.
    Error,
}

struct LifecycleState {
    status: FloppyStatus,
    filename: String<MAX_FILENAME>,
    geometry: Option<Geometry>,
    total_sectors: u32,
    loaded_sectors: u32,
    last_error: Option<FloppyError>,
    rejected_file_size: Option<u64>,
}

impl LifecycleState {
    const fn no_image() -> Self {
        Self {
            status: FloppyStatus::NoImage,
            filename: String::new(),
            geometry: None,
            total_sectors: 0,
            loaded_sectors: 0,
            last_error: None,
            rejected_file_size: None,
        }
    }
}

/// A read-only view of the mounted image record (§3), assembled on demand
/// from the lifecycle manager's own state plus the cache engine's live
/// hit/miss counters.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    /// Current floppy status.
    pub status: FloppyStatus,
    /// Name of the mounted (or last attempted) image file.
    pub filename: String<MAX_FILENAME>,
    /// Geometry of the mounted image, if any.
    pub geometry: Option<Geometry>,
    /// Total sectors in the mounted image.
    pub total_sectors: u32,
    /// Metadata sectors preloaded so far during a mount in progress.
    pub loaded_sectors: u32,
    /// Cumulative cache hits since the last mount.
    pub cache_hits: u32,
    /// Cumulative cache misses since the last mount.
    pub cache_misses: u32,
    /// The error that put the device into [`FloppyStatus::Error`], if any.
    pub last_error: Option<FloppyError>,
    /// File size that failed geometry detection, if that was the cause.
    pub rejected_file_size: Option<u64>,
}

/// Drives the mount/eject state machine described in §4.2.
///
/// Holds a reference to the [`CacheEngine`] it mounts images into; per §5,
/// it never touches the cache arrays or the image handle directly, only
/// through the cache engine's own locked methods.
pub struct ImageLifecycleManager<'a, B, C, const META_BLOCKS: usize, const DATA_BLOCKS: usize> {
    cache: &'a CacheEngine<B, C, META_BLOCKS, DATA_BLOCKS>,
    state: Mutex<LifecycleState>,
}

impl<'a, B, C, const META_BLOCKS: usize, const DATA_BLOCKS: usize>
    ImageLifecycleManager<'a, B, C, META_BLOCKS, DATA_BLOCKS>
where
    B: ImageDevice,
    C: Clock,
{
    /// Creates a manager with status `NoImage` over the given cache engine.
    pub fn new(cache: &'a CacheEngine<B, C, META_BLOCKS, DATA_BLOCKS>) -> Self {
        Self {
            cache,
            state: Mutex::new(LifecycleState::no_image()),
        }
    }

    /// Current floppy status.
    pub fn status(&self) -> FloppyStatus {
        self.state.lock().status
    }

    /// Assembles the mounted image record readable by all components.
    pub fn status_snapshot(&self) -> StatusSnapshot {
        let state = self.state.lock();
        let (cache_hits, cache_misses) = self.cache.stats();
        StatusSnapshot {
            status: state.status,
            filename: state.filename.clone(),
            geometry: state.geometry,
            total_sectors: state.total_sectors,
            loaded_sectors: state.loaded_sectors,
            cache_hits,
            cache_misses,
            last_error: state.last_error,
            rejected_file_size: state.rejected_file_size,
        }
    }

    /// Mounts the image at `path`: opens it, detects geometry, preloads the
    /// pinned metadata region, then publishes `Ready`.
    ///
    /// On any failure the status becomes `Error` and the cache is left
    /// reset; the caller must [`Self::acknowledge_error`] before mounting
    /// again.
    pub fn load(&self, path: &str) -> Result<(), FloppyError> {
        {
            let mut state = self.state.lock();
            state.status = FloppyStatus::Loading;
            state.filename = String::try_from(path).unwrap_or_default();
            state.geometry = None;
            state.total_sectors = 0;
            state.loaded_sectors = 0;
            state.last_error = None;
            state.rejected_file_size = None;
        }
        self.cache.reset();

        let size = match self.cache.open_image(path) {
            Ok(size) => size,
            Err(err) => return self.fail(err),
        };

        let geometry = match Geometry::detect(size) {
            Some(geometry) => geometry,
            None => {
                self.state.lock().rejected_file_size = Some(size);
                return self.fail(FloppyError::UnknownFormat);
            }
        };

        self.cache
            .publish_geometry(geometry.metadata_sectors(), geometry.total_sectors());
        {
            let mut state = self.state.lock();
            state.geometry = Some(geometry);
            state.total_sectors = geometry.total_sectors();
        }

        let mut scratch = [0u8; 512];
        for lba in 0..geometry.metadata_sectors() {
            if self.cache.read_sector(lba, &mut scratch).is_err() {
                return self.fail(FloppyError::PreloadFailure);
            }
            self.state.lock().loaded_sectors = lba + 1;
        }

        self.state.lock().status = FloppyStatus::Ready;
        Ok(())
    }

    fn fail(&self, err: FloppyError) -> Result<(), FloppyError> {
        let mut state = self.state.lock();
        state.status = FloppyStatus::Error;
        state.last_error = Some(err);
        Err(err)
    }

    /// Flushes dirty blocks, resets the cache, closes the image, and
    /// publishes `NoImage`. Idempotent: ejecting with nothing mounted is a
    /// no-op that still returns `Ok`.
    ///
    /// Flush and close failures are not propagated — the host has asked
    /// for removal, and a wedged device is worse than a lost write.
    pub fn eject(&self) -> Result<(), FloppyError> {
        let _ = self.cache.flush_all();
        self.cache.reset();
        let _ = self.cache.close_image();
        *self.state.lock() = LifecycleState::no_image();
        Ok(())
    }

    /// Clears an `Error` status back to `NoImage`, as if the user pressed
    /// OK on the error screen. A no-op in any other status.
    pub fn acknowledge_error(&self) {
        let mut state = self.state.lock();
        if state.status == FloppyStatus::Error {
            *state = LifecycleState::no_image();
        }
    }
}
