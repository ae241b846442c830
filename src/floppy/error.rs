//! Error type for the floppy back-end.

/// Errors that can occur while caching, mounting, or serving a floppy image.
///
/// Each variant maps to exactly one recovery policy; see the module
/// documentation on [`crate::floppy`] for what each component does with it.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FloppyError {
    /// The requested LBA is outside `[0, total_sectors)` for the mounted
    /// image (or the maximum supported geometry if nothing is mounted).
    OutOfRange,
    /// The storage adapter's read, write, or open call failed.
    UnderlyingIO,
    /// The image file's size matches none of the supported geometries.
    UnknownFormat,
    /// Preloading the pinned metadata region failed partway through.
    PreloadFailure,
    /// A fallible constructor could not allocate a required resource.
    ///
    /// Unreachable for the const-generic, statically-sized cache this crate
    /// builds, but kept for interface parity with the original firmware's
    /// queue/mutex creation step.
    ResourceExhaustion,
}

#[cfg(feature = "defmt")]
impl defmt::Format for FloppyError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            FloppyError::OutOfRange => defmt::write!(f, "OutOfRange"),
            FloppyError::UnderlyingIO => defmt::write!(f, "UnderlyingIO"),
            FloppyError::UnknownFormat => defmt::write!(f, "UnknownFormat"),
            FloppyError::PreloadFailure => defmt::write!(f, "PreloadFailure"),
            FloppyError::ResourceExhaustion => defmt::write!(f, "ResourceExhaustion"),
        }
    }
}
