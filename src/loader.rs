use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Files larger than this are not transformed.
pub const DEFAULT_MAX_BYTES: u64 = 256 * 1024;
/// Files sent to the edit provider are held to a tighter limit.
pub const PROVIDER_MAX_BYTES: u64 = 64 * 1024;
/// How much of a file is inspected for null bytes.
const BINARY_SNIFF_LEN: usize = 1000;

/// Reads source files as text, refusing anything that looks unusable.
#[derive(Debug, Clone, Copy)]
pub struct ContentLoader {
    max_bytes: u64,
}

impl Default for ContentLoader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BYTES)
    }
}

impl ContentLoader {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// Returns the file's text, or `None` when it is too large, looks binary,
    /// or cannot be read at all.
    pub fn load(&self, path: &Path) -> Option<String> {
        let bytes = match self.read_capped(path) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "unreadable file");
                return None;
            }
        };
        self.decode(bytes, path)
    }

    /// Reads the file unless it is over the size cap, in which case `None` is
    /// returned without buffering it. At most `max_bytes + 1` bytes are read
    /// even if the file grows after the size check.
    fn read_capped(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        if len > self.max_bytes {
            tracing::debug!(path = %path.display(), len, "file too large");
            return Ok(None);
        }

        let mut bytes = Vec::with_capacity(len as usize);
        file.take(self.max_bytes + 1).read_to_end(&mut bytes)?;
        Ok(Some(bytes))
    }

    fn decode(&self, bytes: Vec<u8>, path: &Path) -> Option<String> {
        if bytes.len() as u64 > self.max_bytes {
            tracing::debug!(path = %path.display(), len = bytes.len(), "file too large");
            return None;
        }
        if bytes.iter().take(BINARY_SNIFF_LEN).any(|&b| b == 0) {
            tracing::debug!(path = %path.display(), "binary content");
            return None;
        }
        match String::from_utf8(bytes) {
            Ok(text) => Some(text),
            Err(err) => Some(String::from_utf8_lossy(err.as_bytes()).into_owned()),
        }
    }
}
