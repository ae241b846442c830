//! Storage Adapter: the narrow contract over a file-backed disk image.

use crate::storage::Storage;

/// A disk image backing store, opened by path and addressed by byte offset.
///
/// Extends [`Storage`] (byte-offset read/write plus capacity) with the
/// open/sync/close lifecycle the image manager needs, layered on the
/// storage module the same way a technology-specific trait would add
/// setup/teardown on top of the plain read/write contract. All methods are
/// synchronous and blocking; the cache engine is the sole caller and holds
/// its mutex across every call.
pub trait ImageDevice: Storage {
    /// Opens the image at `path`, returning its size in bytes.
    ///
    /// Calling `open` while an image is already open first closes it.
    fn open(&mut self, path: &str) -> Result<u64, Self::Error>;

    /// Flushes any buffered writes to the backing medium without closing it.
    fn sync(&mut self) -> Result<(), Self::Error>;

    /// Closes the currently open image, if any.
    fn close(&mut self) -> Result<(), Self::Error>;
}

/// Desktop-only [`ImageDevice`] backed by [`std::fs::File`], used by
/// integration tests and host tooling in place of the target firmware's
/// FAT-library file handle.
#[cfg(feature = "std")]
pub mod file {
    use super::ImageDevice;
    use crate::storage::error::Error;
    use crate::storage::{ReadStorage, Storage};
    use std::fs::{File, OpenOptions};
    use std::io::{Read as _, Seek, SeekFrom, Write as _};

    /// An [`ImageDevice`] that reads and writes a real file on the host
    /// filesystem.
    #[derive(Debug, Default)]
    pub struct FileImageDevice {
        file: Option<File>,
        size: u64,
    }

    impl FileImageDevice {
        /// Creates a device with no image open.
        pub fn new() -> Self {
            Self {
                file: None,
                size: 0,
            }
        }
    }

    impl ReadStorage for FileImageDevice {
        type Error = Error;

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
            let file = self.file.as_mut().ok_or(Error::NotInitialized)?;
            if offset as u64 + bytes.len() as u64 > self.size {
                return Err(Error::OutOfBounds);
            }
            file.seek(SeekFrom::Start(offset as u64))
                .map_err(|_| Error::ReadError)?;
            file.read_exact(bytes).map_err(|_| Error::ReadError)
        }

        fn capacity(&self) -> usize {
            self.size as usize
        }
    }

    impl Storage for FileImageDevice {
        fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
            let file = self.file.as_mut().ok_or(Error::NotInitialized)?;
            if offset as u64 + bytes.len() as u64 > self.size {
                return Err(Error::OutOfBounds);
            }
            file.seek(SeekFrom::Start(offset as u64))
                .map_err(|_| Error::WriteError)?;
            file.write_all(bytes).map_err(|_| Error::WriteError)
        }
    }

    impl ImageDevice for FileImageDevice {
        fn open(&mut self, path: &str) -> Result<u64, Self::Error> {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .open(path)
                .map_err(|_| Error::ReadError)?;
            let size = file.metadata().map_err(|_| Error::ReadError)?.len();
            self.file = Some(file);
            self.size = size;
            Ok(size)
        }

        fn sync(&mut self) -> Result<(), Self::Error> {
            match self.file.as_ref() {
                Some(file) => file.sync_data().map_err(|_| Error::WriteError),
                None => Ok(()),
            }
        }

        fn close(&mut self) -> Result<(), Self::Error> {
            self.file = None;
            self.size = 0;
            Ok(())
        }
    }
}
