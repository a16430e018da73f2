// Windowed, sector-aligned reader used by the signature detectors
// Disk nodes only accept reads aligned to (and sized in) whole sectors,
// so every read goes through 4096-byte aligned chunks.

use log::trace;
use std::collections::HashMap;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use umass_core::UmassError;

const CHUNK_SIZE: u64 = 4096;

/// Largest single read a detector may ask for.
pub const MAX_READ_SIZE: usize = 1024 * 1024;

/// Anything a detector can read from: an open node, an image, a buffer.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// Reads from the byte range `[0, media_size)` of a node.
///
/// Reads that fall outside the window, or that hit end-of-file, come back as
/// `None` so detectors can treat a truncated device as "not this format".
pub struct ProbeReader<'a> {
    source: &'a mut dyn ReadSeek,
    media_size: Option<u64>,
    chunk_cache: HashMap<u64, Vec<u8>>,
    max_cache_chunks: usize,
}

impl<'a> ProbeReader<'a> {
    /// `media_size` of 0 means unknown; the window is then bounded only by
    /// end-of-file.
    pub fn new(source: &'a mut dyn ReadSeek, media_size: u64) -> Self {
        Self {
            source,
            media_size: (media_size > 0).then_some(media_size),
            chunk_cache: HashMap::new(),
            max_cache_chunks: 256,
        }
    }

    pub fn media_size(&self) -> Option<u64> {
        self.media_size
    }

    /// Read `size` bytes at `offset`, or `None` if they are not all there.
    pub fn read_at(&mut self, offset: u64, size: usize) -> Result<Option<Vec<u8>>, UmassError> {
        if size == 0 {
            return Ok(Some(Vec::new()));
        }
        if size > MAX_READ_SIZE {
            trace!("refusing {}-byte read at {:#x}", size, offset);
            return Ok(None);
        }
        let end = match offset.checked_add(size as u64) {
            Some(end) => end,
            None => return Ok(None),
        };
        if let Some(limit) = self.media_size {
            if end > limit {
                trace!("read of {} bytes at {:#x} is outside the window", size, offset);
                return Ok(None);
            }
        }

        let first_chunk = offset / CHUNK_SIZE;
        let last_chunk = (end - 1) / CHUNK_SIZE;
        let mut data = Vec::with_capacity(((last_chunk - first_chunk + 1) * CHUNK_SIZE) as usize);
        for chunk in first_chunk..=last_chunk {
            let bytes = self.read_chunk(chunk)?;
            let short = bytes.len() < CHUNK_SIZE as usize;
            data.extend_from_slice(&bytes);
            if short {
                break;
            }
        }

        let start = (offset - first_chunk * CHUNK_SIZE) as usize;
        if data.len() < start + size {
            trace!("short read of {} bytes at {:#x}", size, offset);
            return Ok(None);
        }
        Ok(Some(data[start..start + size].to_vec()))
    }

    fn read_chunk(&mut self, chunk: u64) -> Result<Vec<u8>, UmassError> {
        if let Some(cached) = self.chunk_cache.get(&chunk) {
            return Ok(cached.clone());
        }

        let offset = chunk * CHUNK_SIZE;
        self.source.seek(SeekFrom::Start(offset))?;

        let mut buffer = vec![0u8; CHUNK_SIZE as usize];
        let mut filled = 0;
        while filled < buffer.len() {
            match self.source.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
        }
        buffer.truncate(filled);

        if self.chunk_cache.len() < self.max_cache_chunks {
            self.chunk_cache.insert(chunk, buffer.clone());
        }
        Ok(buffer)
    }
}
