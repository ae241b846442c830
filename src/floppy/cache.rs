//! Block Cache Engine: the two-region write-back sector cache.
//!
//! A [`CacheEngine`] owns two fixed-size arrays of [`CacheBlock`] — a pinned
//! metadata region and an LRU data region — plus the open image handle,
//! behind one [`spin::Mutex`]. Every public method takes that mutex for its
//! whole critical section, including the synchronous call into the
//! [`ImageDevice`] on a miss: this serializes concurrent misses against the
//! same physical region by construction, and is what makes the image
//! handle's "accessed only from the task that owns the current cache
//! critical section" rule true without any extra bookkeeping.

use crate::floppy::clock::Clock;
use crate::floppy::device::ImageDevice;
use crate::floppy::error::FloppyError;
use crate::floppy::geometry::Geometry;
use spin::Mutex;

/// Sectors per cache block: the unit of load and eviction.
pub const SECTORS_PER_BLOCK: u32 = 8;
/// Bytes of payload per cache block (4 KiB).
pub const BLOCK_BYTES: usize = 512 * SECTORS_PER_BLOCK as usize;

/// One fixed-size, aligned cache block covering up to [`SECTORS_PER_BLOCK`]
/// consecutive sectors.
#[derive(Clone)]
pub struct CacheBlock {
    start_sector: u32,
    last_access_tick: u32,
    valid: bool,
    dirty: bool,
    data: [u8; BLOCK_BYTES],
}

impl CacheBlock {
    const fn empty() -> Self {
        Self {
            start_sector: 0,
            last_access_tick: 0,
            valid: false,
            dirty: false,
            data: [0u8; BLOCK_BYTES],
        }
    }
}

impl Default for CacheBlock {
    fn default() -> Self {
        Self::empty()
    }
}

/// Everything guarded by the cache mutex: both region arrays, the open
/// image, and the running hit/miss counters.
struct CacheInner<B, const META_BLOCKS: usize, const DATA_BLOCKS: usize> {
    meta_blocks: [CacheBlock; META_BLOCKS],
    data_blocks: [CacheBlock; DATA_BLOCKS],
    backend: B,
    metadata_sectors: u32,
    total_sectors: u32,
    cache_hits: u32,
    cache_misses: u32,
}

/// The two-region write-back sector cache.
///
/// `META_BLOCKS` and `DATA_BLOCKS` are compile-time const generics: the
/// regions are literally `[CacheBlock; N]` static arrays, sized once at
/// build time for the target's available SRAM.
pub struct CacheEngine<B, C, const META_BLOCKS: usize, const DATA_BLOCKS: usize> {
    inner: Mutex<CacheInner<B, META_BLOCKS, DATA_BLOCKS>>,
    clock: C,
}

impl<B, C, const META_BLOCKS: usize, const DATA_BLOCKS: usize>
    CacheEngine<B, C, META_BLOCKS, DATA_BLOCKS>
where
    B: ImageDevice,
    C: Clock,
{
    /// Builds a cache engine with no image open and the metadata split
    /// point set to the widest supported geometry, per §4.1's rule for
    /// "no geometry yet published".
    pub fn new(backend: B, clock: C) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                meta_blocks: core::array::from_fn(|_| CacheBlock::empty()),
                data_blocks: core::array::from_fn(|_| CacheBlock::empty()),
                backend,
                metadata_sectors: Geometry::max_metadata_sectors(),
                total_sectors: 0,
                cache_hits: 0,
                cache_misses: 0,
            }),
            clock,
        }
    }

    /// Opens `path` through the storage adapter and returns its byte size,
    /// for the caller (the lifecycle manager) to detect geometry from.
    pub fn open_image(&self, path: &str) -> Result<u64, FloppyError> {
        let mut inner = self.inner.lock();
        inner.backend.open(path).map_err(|_| FloppyError::UnderlyingIO)
    }

    /// Publishes the geometry detected for the image now open, moving the
    /// metadata/data split point to its real value.
    pub fn publish_geometry(&self, metadata_sectors: u32, total_sectors: u32) {
        let mut inner = self.inner.lock();
        inner.metadata_sectors = metadata_sectors;
        inner.total_sectors = total_sectors;
    }

    /// Reads one 512-byte sector, filling its cache block on a miss.
    pub fn read_sector(&self, lba: u32, out: &mut [u8; 512]) -> Result<(), FloppyError> {
        let now = self.clock.now_us();
        let mut inner = self.inner.lock();
        if inner.total_sectors != 0 && lba >= inner.total_sectors {
            return Err(FloppyError::OutOfRange);
        }
        let idx = inner.ensure_loaded(lba, now)?;
        let block = inner.block_at(lba, idx);
        let offset = ((lba - block.start_sector) * 512) as usize;
        out.copy_from_slice(&block.data[offset..offset + 512]);
        Ok(())
    }

    /// Writes one 512-byte sector, filling its cache block on a miss and
    /// marking it dirty for later write-back.
    pub fn write_sector(&self, lba: u32, data: &[u8; 512]) -> Result<(), FloppyError> {
        let now = self.clock.now_us();
        let mut inner = self.inner.lock();
        if inner.total_sectors != 0 && lba >= inner.total_sectors {
            return Err(FloppyError::OutOfRange);
        }
        let idx = inner.ensure_loaded(lba, now)?;
        let is_meta = lba < inner.metadata_sectors;
        let block = if is_meta {
            &mut inner.meta_blocks[idx]
        } else {
            &mut inner.data_blocks[idx]
        };
        let offset = ((lba - block.start_sector) * 512) as usize;
        block.data[offset..offset + 512].copy_from_slice(data);
        block.dirty = true;
        block.last_access_tick = now;
        Ok(())
    }

    /// Writes every dirty block back to the image, in both regions, then
    /// asks the storage adapter to flush them to the physical medium.
    pub fn flush_all(&self) -> Result<(), FloppyError> {
        let mut inner = self.inner.lock();
        let total_sectors = inner.total_sectors;
        write_back_all(&mut inner.meta_blocks, &mut inner.backend, total_sectors)?;
        write_back_all(&mut inner.data_blocks, &mut inner.backend, total_sectors)?;
        inner.backend.sync().map_err(|_| FloppyError::UnderlyingIO)
    }

    /// Invalidates every block in both regions without writing anything
    /// back. Callers that want dirty data preserved must `flush_all` first.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        for block in inner.meta_blocks.iter_mut() {
            *block = CacheBlock::empty();
        }
        for block in inner.data_blocks.iter_mut() {
            *block = CacheBlock::empty();
        }
        inner.cache_hits = 0;
        inner.cache_misses = 0;
        inner.total_sectors = 0;
        inner.metadata_sectors = Geometry::max_metadata_sectors();
    }

    /// Closes the open image via the storage adapter.
    pub fn close_image(&self) -> Result<(), FloppyError> {
        let mut inner = self.inner.lock();
        inner.backend.close().map_err(|_| FloppyError::UnderlyingIO)
    }

    /// Returns `(cache_hits, cache_misses)` since the last `reset`.
    pub fn stats(&self) -> (u32, u32) {
        let inner = self.inner.lock();
        (inner.cache_hits, inner.cache_misses)
    }
}

impl<B, const META_BLOCKS: usize, const DATA_BLOCKS: usize> CacheInner<B, META_BLOCKS, DATA_BLOCKS>
where
    B: ImageDevice,
{
    /// Looks up or loads the block covering `lba`, returning its index
    /// within the region array it belongs to. Bumps hit/miss counters and
    /// the block's access tick.
    fn ensure_loaded(&mut self, lba: u32, now: u32) -> Result<usize, FloppyError> {
        let is_meta = lba < self.metadata_sectors;
        let block_start = (lba / SECTORS_PER_BLOCK) * SECTORS_PER_BLOCK;
        let total_sectors = self.total_sectors;
        let backend = &mut self.backend;

        if is_meta {
            if let Some(idx) = lookup(&self.meta_blocks, block_start) {
                self.meta_blocks[idx].last_access_tick = now;
                self.cache_hits = self.cache_hits.saturating_add(1);
                return Ok(idx);
            }
            let idx = select_victim(&self.meta_blocks);
            write_back_one(&mut self.meta_blocks[idx], backend, total_sectors)?;
            fill(&mut self.meta_blocks[idx], block_start, backend, total_sectors, now)?;
            self.cache_misses = self.cache_misses.saturating_add(1);
            Ok(idx)
        } else {
            if let Some(idx) = lookup(&self.data_blocks, block_start) {
                self.data_blocks[idx].last_access_tick = now;
                self.cache_hits = self.cache_hits.saturating_add(1);
                return Ok(idx);
            }
            let idx = select_victim(&self.data_blocks);
            write_back_one(&mut self.data_blocks[idx], backend, total_sectors)?;
            fill(&mut self.data_blocks[idx], block_start, backend, total_sectors, now)?;
            self.cache_misses = self.cache_misses.saturating_add(1);
            Ok(idx)
        }
    }

    fn block_at(&self, lba: u32, idx: usize) -> &CacheBlock {
        if lba < self.metadata_sectors {
            &self.meta_blocks[idx]
        } else {
            &self.data_blocks[idx]
        }
    }
}

/// Scans a region for a valid block whose start matches `block_start`.
fn lookup(blocks: &[CacheBlock], block_start: u32) -> Option<usize> {
    blocks
        .iter()
        .position(|b| b.valid && b.start_sector == block_start)
}

/// Picks an eviction candidate: the first invalid slot, or else the one
/// with the smallest (oldest) access tick. Shared by both regions, per the
/// design note that the pinned and LRU regions are one block type with a
/// region-selection predicate rather than parallel code.
fn select_victim(blocks: &[CacheBlock]) -> usize {
    if let Some(idx) = blocks.iter().position(|b| !b.valid) {
        return idx;
    }
    blocks
        .iter()
        .enumerate()
        .min_by_key(|(_, b)| b.last_access_tick)
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

/// Writes a block's dirty sectors back to the image if it holds any, then
/// leaves it `valid`/`dirty=false` unless the write-back fails, in which
/// case it is left untouched and the caller should not reuse the slot yet.
fn write_back_one<B: ImageDevice>(
    block: &mut CacheBlock,
    backend: &mut B,
    total_sectors: u32,
) -> Result<(), FloppyError> {
    if !(block.valid && block.dirty) {
        return Ok(());
    }
    let n_sectors = live_sector_count(block.start_sector, total_sectors);
    let byte_len = n_sectors as usize * 512;
    backend
        .write(block.start_sector * 512, &block.data[..byte_len])
        .map_err(|_| FloppyError::UnderlyingIO)?;
    block.dirty = false;
    Ok(())
}

fn write_back_all<B: ImageDevice>(
    blocks: &mut [CacheBlock],
    backend: &mut B,
    total_sectors: u32,
) -> Result<(), FloppyError> {
    for block in blocks.iter_mut() {
        write_back_one(block, backend, total_sectors)?;
    }
    Ok(())
}

/// Loads up to [`SECTORS_PER_BLOCK`] sectors starting at `block_start` into
/// `block`, stopping early at `total_sectors` if the block straddles the
/// end of the image.
fn fill<B: ImageDevice>(
    block: &mut CacheBlock,
    block_start: u32,
    backend: &mut B,
    total_sectors: u32,
    now: u32,
) -> Result<(), FloppyError> {
    let n_sectors = live_sector_count(block_start, total_sectors);
    let byte_len = n_sectors as usize * 512;
    backend
        .read(block_start * 512, &mut block.data[..byte_len])
        .map_err(|_| FloppyError::UnderlyingIO)?;
    block.start_sector = block_start;
    block.valid = true;
    block.dirty = false;
    block.last_access_tick = now;
    Ok(())
}

/// How many of this block's [`SECTORS_PER_BLOCK`] sectors actually exist in
/// the image (the last block of an image may be partial).
fn live_sector_count(block_start: u32, total_sectors: u32) -> u32 {
    if total_sectors == 0 {
        return SECTORS_PER_BLOCK;
    }
    SECTORS_PER_BLOCK.min(total_sectors.saturating_sub(block_start))
}
