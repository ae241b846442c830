//! Closed enumeration of supported floppy image geometries.

/// Tolerance, in bytes, applied when matching a file size to a geometry.
const SIZE_TOLERANCE: u64 = 512;

/// A supported floppy disk geometry.
///
/// Detected purely from image file size (§ geometry determinism); there is
/// no header or magic number in the raw sector dump.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Geometry {
    /// 720 KiB, 1440 sectors, 14 metadata sectors.
    Kb720,
    /// 1.2 MiB, 2400 sectors, 29 metadata sectors.
    Mb1_2,
    /// 1.44 MiB, 2880 sectors, 33 metadata sectors.
    Mb1_44,
}

impl Geometry {
    /// Total number of 512-byte sectors in this geometry.
    pub const fn total_sectors(self) -> u32 {
        match self {
            Geometry::Kb720 => 1440,
            Geometry::Mb1_2 => 2400,
            Geometry::Mb1_44 => 2880,
        }
    }

    /// Number of sectors covered by the pinned metadata region: the boot
    /// sector, both FAT copies, and the root directory.
    ///
    /// The 1.2 MiB entry is 29, not the 19 that appears in some transcriptions
    /// of the original firmware's geometry table alongside a comment that
    /// itself computes 29 (1 boot + 2*7 FAT + 14 root) — 19 does not match
    /// any consistent FAT12 layout for this geometry and is treated as a
    /// transcription error.
    pub const fn metadata_sectors(self) -> u32 {
        match self {
            Geometry::Kb720 => 14,
            Geometry::Mb1_2 => 29,
            Geometry::Mb1_44 => 33,
        }
    }

    /// Expected image file size in bytes for this geometry.
    pub const fn byte_size(self) -> u64 {
        self.total_sectors() as u64 * 512
    }

    /// The largest metadata-sector count among all supported geometries.
    ///
    /// Used by the cache engine as the metadata/data split point before a
    /// geometry has been published for the current mount.
    pub const fn max_metadata_sectors() -> u32 {
        Geometry::Mb1_44.metadata_sectors()
    }

    /// Detect a geometry from an image file's byte size, allowing
    /// [`SIZE_TOLERANCE`] bytes of slack in either direction.
    ///
    /// Returns `None` if the size matches no supported geometry.
    pub fn detect(file_size: u64) -> Option<Geometry> {
        for geometry in [Geometry::Kb720, Geometry::Mb1_2, Geometry::Mb1_44] {
            let expected = geometry.byte_size();
            let low = expected.saturating_sub(SIZE_TOLERANCE);
            let high = expected + SIZE_TOLERANCE;
            if (low..=high).contains(&file_size) {
                return Some(geometry);
            }
        }
        None
    }
}
