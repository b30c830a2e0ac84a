//! In-memory file streams for driving the image codec without touching disk.
//!
//! A [`StreamArena`] holds named byte buffers ("handles") with file-like
//! semantics: open/read/write/seek/truncate/stat/unlink plus access and
//! modification timestamps. Handles are addressed by URL:
//!
//! ```text
//! avatar-stream://{handle}/{ignored path}
//! ```
//!
//! Only the host segment matters; the path exists so codecs that insist on a
//! file name (and sniff its extension) get one.
//!
//! Arenas are created per render and passed down explicitly. Handles are
//! owned through [`ScopedHandle`], which unlinks its buffer on drop, so no
//! early return can leave bytes behind in the table.

pub mod codec;

pub use codec::{ImageCodec, crop_resize, render_image};

use crate::error::{AvatarError, AvatarResult};
use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

/// URL scheme understood by [`StreamArena::open`].
pub const SCHEME: &str = "avatar-stream";

/// Largest buffer a handle may grow to. Encoded avatars are far smaller.
pub const MAX_STREAM_LEN: u64 = 1 << 30;

/// How a stream is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read from the start; the handle must exist.
    Read,
    /// Create or truncate, then write from the start.
    Write,
    /// Create if missing; every write goes to the end.
    Append,
    /// Create if missing; read and write from the start without truncating.
    ReadWrite,
}

/// Metadata for a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamStat {
    pub size: u64,
    pub accessed: SystemTime,
    pub modified: SystemTime,
    /// Last metadata change (creation, truncation, write).
    pub changed: SystemTime,
}

/// Converts a buffer length to `usize`, refusing anything past [`MAX_STREAM_LEN`].
fn bounded_len(len: u64) -> io::Result<usize> {
    if len > MAX_STREAM_LEN {
        return Err(io::Error::new(
            io::ErrorKind::FileTooLarge,
            format!("stream length {len} exceeds {MAX_STREAM_LEN} bytes"),
        ));
    }
    usize::try_from(len).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))
}

#[derive(Debug)]
struct MemoryFile {
    data: Vec<u8>,
    accessed: SystemTime,
    modified: SystemTime,
    changed: SystemTime,
}

impl MemoryFile {
    fn new() -> Self {
        let now = SystemTime::now();
        Self {
            data: Vec::new(),
            accessed: now,
            modified: now,
            changed: now,
        }
    }

    fn touch_modified(&mut self) {
        let now = SystemTime::now();
        self.modified = now;
        self.changed = now;
    }

    fn stat(&self) -> StreamStat {
        StreamStat {
            size: self.data.len() as u64,
            accessed: self.accessed,
            modified: self.modified,
            changed: self.changed,
        }
    }
}

/// Extracts the handle from an `avatar-stream://` URL.
pub fn parse_url(url: &str) -> AvatarResult<&str> {
    let rest = url
        .strip_prefix(SCHEME)
        .and_then(|r| r.strip_prefix("://"))
        .ok_or_else(|| AvatarError::codec(format!("not an {SCHEME} URL: {url}")))?;
    let handle = rest.split('/').next().unwrap_or_default();
    if handle.is_empty() {
        return Err(AvatarError::codec(format!("missing handle in URL: {url}")));
    }
    Ok(handle)
}

// ============================================================================
// StreamArena
// ============================================================================

/// A table of in-memory files, local to one render.
#[derive(Debug, Default)]
pub struct StreamArena {
    files: Mutex<HashMap<String, MemoryFile>>,
    next_handle: AtomicU64,
}

impl StreamArena {
    pub fn new() -> Self {
        Self::default()
    }

    fn files(&self) -> io::Result<MutexGuard<'_, HashMap<String, MemoryFile>>> {
        self.files
            .lock()
            .map_err(|_| io::Error::other("stream arena mutex poisoned"))
    }

    /// Allocates an empty buffer under a fresh handle.
    pub fn create(&self) -> AvatarResult<ScopedHandle<'_>> {
        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        let handle = format!("h{id}");
        self.files()
            .map_err(|e| AvatarError::io("allocating stream handle", e))?
            .insert(handle.clone(), MemoryFile::new());
        Ok(ScopedHandle {
            arena: self,
            handle,
        })
    }

    /// Opens the handle addressed by `url`.
    pub fn open(&self, url: &str, mode: OpenMode) -> AvatarResult<MemoryStream<'_>> {
        let handle = parse_url(url)?.to_string();
        {
            let mut files = self
                .files()
                .map_err(|e| AvatarError::io(format!("opening {url}"), e))?;
            match mode {
                OpenMode::Read => {
                    if !files.contains_key(&handle) {
                        return Err(AvatarError::io(
                            format!("opening {url}"),
                            io::Error::from(io::ErrorKind::NotFound),
                        ));
                    }
                }
                OpenMode::Write => {
                    let file = files.entry(handle.clone()).or_insert_with(MemoryFile::new);
                    file.data.clear();
                    file.touch_modified();
                }
                OpenMode::Append | OpenMode::ReadWrite => {
                    files.entry(handle.clone()).or_insert_with(MemoryFile::new);
                }
            }
        }
        Ok(MemoryStream {
            arena: self,
            handle,
            position: 0,
            mode,
        })
    }

    /// Returns the metadata of the handle addressed by `url`.
    pub fn stat(&self, url: &str) -> AvatarResult<StreamStat> {
        let handle = parse_url(url)?;
        let files = self
            .files()
            .map_err(|e| AvatarError::io(format!("stat {url}"), e))?;
        files.get(handle).map(MemoryFile::stat).ok_or_else(|| {
            AvatarError::io(format!("stat {url}"), io::Error::from(io::ErrorKind::NotFound))
        })
    }

    /// Deletes the handle addressed by `url`.
    pub fn unlink(&self, url: &str) -> AvatarResult<()> {
        let handle = parse_url(url)?;
        self.remove(handle).ok_or_else(|| {
            AvatarError::io(format!("unlink {url}"), io::Error::from(io::ErrorKind::NotFound))
        })
    }

    fn remove(&self, handle: &str) -> Option<()> {
        self.files.lock().ok()?.remove(handle).map(|_| ())
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.files.lock().map(|f| f.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// ScopedHandle
// ============================================================================

/// Ownership of one arena handle; the buffer is unlinked on drop.
#[derive(Debug)]
pub struct ScopedHandle<'a> {
    arena: &'a StreamArena,
    handle: String,
}

impl ScopedHandle<'_> {
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// The URL for this handle. `name` only decorates the path segment.
    pub fn url_with_name(&self, name: &str) -> String {
        format!("{SCHEME}://{}/{name}", self.handle)
    }

    pub fn url(&self) -> String {
        self.url_with_name("render")
    }

    /// Replaces the buffer's contents with `bytes`.
    pub fn write_bytes(&self, bytes: &[u8]) -> AvatarResult<()> {
        let mut stream = self.arena.open(&self.url(), OpenMode::Write)?;
        stream
            .write_all(bytes)
            .map_err(|e| AvatarError::io(format!("writing {}", self.url()), e))
    }

    /// Reads the whole buffer.
    pub fn read_bytes(&self) -> AvatarResult<Vec<u8>> {
        let mut stream = self.arena.open(&self.url(), OpenMode::Read)?;
        let mut bytes = Vec::new();
        stream
            .read_to_end(&mut bytes)
            .map_err(|e| AvatarError::io(format!("reading {}", self.url()), e))?;
        Ok(bytes)
    }
}

impl Drop for ScopedHandle<'_> {
    fn drop(&mut self) {
        self.arena.remove(&self.handle);
    }
}

// ============================================================================
// MemoryStream
// ============================================================================

/// An open cursor into an arena handle.
#[derive(Debug)]
pub struct MemoryStream<'a> {
    arena: &'a StreamArena,
    handle: String,
    position: u64,
    mode: OpenMode,
}

impl MemoryStream<'_> {
    fn with_file<T>(&self, op: impl FnOnce(&mut MemoryFile) -> io::Result<T>) -> io::Result<T> {
        let mut files = self.arena.files()?;
        let file = files
            .get_mut(&self.handle)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "stream handle was unlinked"))?;
        op(file)
    }

    /// Resizes the buffer, dropping bytes or padding with zeros.
    pub fn truncate(&mut self, len: u64) -> io::Result<()> {
        if self.mode == OpenMode::Read {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "stream opened read-only",
            ));
        }
        let len = bounded_len(len)?;
        self.with_file(|file| {
            file.data.resize(len, 0);
            file.touch_modified();
            Ok(())
        })
    }

    pub fn stat(&self) -> io::Result<StreamStat> {
        self.with_file(|file| Ok(file.stat()))
    }
}

impl Read for MemoryStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let position = self.position;
        let read = self.with_file(|file| {
            file.accessed = SystemTime::now();
            let start = usize::try_from(position).unwrap_or(usize::MAX).min(file.data.len());
            let available = &file.data[start..];
            let n = available.len().min(buf.len());
            buf[..n].copy_from_slice(&available[..n]);
            Ok(n)
        })?;
        self.position += read as u64;
        Ok(read)
    }
}

impl Write for MemoryStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.mode == OpenMode::Read {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "stream opened read-only",
            ));
        }
        let append = self.mode == OpenMode::Append;
        let position = self.position;
        let end = self.with_file(|file| {
            let start = if append { file.data.len() as u64 } else { position };
            let end = start
                .checked_add(buf.len() as u64)
                .ok_or_else(|| io::Error::from(io::ErrorKind::InvalidInput))?;
            let end = bounded_len(end)?;
            let start = end - buf.len();
            if file.data.len() < end {
                file.data.resize(end, 0);
            }
            file.data[start..end].copy_from_slice(buf);
            file.touch_modified();
            Ok(end)
        })?;
        self.position = end as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryStream<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = self.with_file(|file| Ok(file.data.len() as u64))?;
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => len.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of stream")
        })?;
        self.position = target;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_parsing_uses_host_only() {
        assert_eq!(parse_url("avatar-stream://h7/whatever/file.png").unwrap(), "h7");
        assert_eq!(parse_url("avatar-stream://h7").unwrap(), "h7");
        assert!(parse_url("file:///tmp/x").is_err());
        assert!(parse_url("avatar-stream:///x").is_err());
    }

    #[test]
    fn write_then_read_back() {
        let arena = StreamArena::new();
        let handle = arena.create().unwrap();
        handle.write_bytes(b"hello").unwrap();
        assert_eq!(handle.read_bytes().unwrap(), b"hello");
        assert_eq!(arena.stat(&handle.url()).unwrap().size, 5);
    }

    #[test]
    fn path_segment_is_ignored() {
        let arena = StreamArena::new();
        let handle = arena.create().unwrap();
        handle.write_bytes(b"abc").unwrap();

        let mut stream = arena
            .open(&handle.url_with_name("different/name.png"), OpenMode::Read)
            .unwrap();
        let mut out = String::new();
        stream.read_to_string(&mut out).unwrap();
        assert_eq!(out, "abc");
    }

    #[test]
    fn seek_and_overwrite() {
        let arena = StreamArena::new();
        let handle = arena.create().unwrap();
        let mut stream = arena.open(&handle.url(), OpenMode::ReadWrite).unwrap();
        stream.write_all(b"abcdef").unwrap();
        stream.seek(SeekFrom::Start(2)).unwrap();
        stream.write_all(b"XY").unwrap();
        assert_eq!(stream.seek(SeekFrom::Current(0)).unwrap(), 4);
        assert_eq!(stream.seek(SeekFrom::End(-1)).unwrap(), 5);
        assert!(stream.seek(SeekFrom::Current(-10)).is_err());
        drop(stream);
        assert_eq!(handle.read_bytes().unwrap(), b"abXYef");
    }

    #[test]
    fn writing_past_end_zero_pads() {
        let arena = StreamArena::new();
        let handle = arena.create().unwrap();
        let mut stream = arena.open(&handle.url(), OpenMode::ReadWrite).unwrap();
        stream.seek(SeekFrom::Start(3)).unwrap();
        stream.write_all(b"z").unwrap();
        drop(stream);
        assert_eq!(handle.read_bytes().unwrap(), [0, 0, 0, b'z']);
    }

    #[test]
    fn oversized_writes_and_truncates_are_errors() {
        let arena = StreamArena::new();
        let handle = arena.create().unwrap();
        let mut stream = arena.open(&handle.url(), OpenMode::ReadWrite).unwrap();

        stream.seek(SeekFrom::Start(u64::MAX)).unwrap();
        assert!(stream.write(b"x").is_err());

        stream.seek(SeekFrom::Start(MAX_STREAM_LEN)).unwrap();
        assert_eq!(
            stream.write(b"x").unwrap_err().kind(),
            io::ErrorKind::FileTooLarge
        );
        assert_eq!(
            stream.truncate(MAX_STREAM_LEN + 1).unwrap_err().kind(),
            io::ErrorKind::FileTooLarge
        );

        assert_eq!(stream.stat().unwrap().size, 0);
        stream.seek(SeekFrom::Start(0)).unwrap();
        stream.write_all(b"ok").unwrap();
        drop(stream);
        assert_eq!(handle.read_bytes().unwrap(), b"ok");
    }

    #[test]
    fn append_mode_always_writes_at_end() {
        let arena = StreamArena::new();
        let handle = arena.create().unwrap();
        handle.write_bytes(b"ab").unwrap();
        let mut stream = arena.open(&handle.url(), OpenMode::Append).unwrap();
        stream.seek(SeekFrom::Start(0)).unwrap();
        stream.write_all(b"cd").unwrap();
        drop(stream);
        assert_eq!(handle.read_bytes().unwrap(), b"abcd");
    }

    #[test]
    fn truncate_drops_or_pads() {
        let arena = StreamArena::new();
        let handle = arena.create().unwrap();
        handle.write_bytes(b"abcdef").unwrap();

        let mut stream = arena.open(&handle.url(), OpenMode::ReadWrite).unwrap();
        stream.truncate(3).unwrap();
        assert_eq!(stream.stat().unwrap().size, 3);
        stream.truncate(5).unwrap();
        drop(stream);
        assert_eq!(handle.read_bytes().unwrap(), [b'a', b'b', b'c', 0, 0]);
    }

    #[test]
    fn write_mode_truncates_existing_content() {
        let arena = StreamArena::new();
        let handle = arena.create().unwrap();
        handle.write_bytes(b"long content").unwrap();
        handle.write_bytes(b"x").unwrap();
        assert_eq!(handle.read_bytes().unwrap(), b"x");
    }

    #[test]
    fn read_only_streams_reject_writes() {
        let arena = StreamArena::new();
        let handle = arena.create().unwrap();
        let mut stream = arena.open(&handle.url(), OpenMode::Read).unwrap();
        assert_eq!(
            stream.write(b"x").unwrap_err().kind(),
            io::ErrorKind::PermissionDenied
        );
        assert!(stream.truncate(0).is_err());
    }

    #[test]
    fn timestamps_track_access_and_modification() {
        let arena = StreamArena::new();
        let handle = arena.create().unwrap();
        let created = arena.stat(&handle.url()).unwrap();

        handle.write_bytes(b"data").unwrap();
        let written = arena.stat(&handle.url()).unwrap();
        assert!(written.modified >= created.modified);

        handle.read_bytes().unwrap();
        let read = arena.stat(&handle.url()).unwrap();
        assert!(read.accessed >= written.accessed);
        assert_eq!(read.modified, written.modified);
    }

    #[test]
    fn scoped_handles_are_released_on_drop() {
        let arena = StreamArena::new();
        let url = {
            let handle = arena.create().unwrap();
            handle.write_bytes(b"temp").unwrap();
            assert_eq!(arena.len(), 1);
            handle.url()
        };
        assert!(arena.is_empty());
        assert!(arena.open(&url, OpenMode::Read).is_err());
    }

    #[test]
    fn released_on_error_paths() {
        fn fails(arena: &StreamArena) -> AvatarResult<()> {
            let handle = arena.create()?;
            handle.write_bytes(b"partial")?;
            Err(AvatarError::codec("simulated failure"))
        }

        let arena = StreamArena::new();
        assert!(fails(&arena).is_err());
        assert!(arena.is_empty());
    }

    #[test]
    fn unlink_and_stat_missing() {
        let arena = StreamArena::new();
        let handle = arena.create().unwrap();
        let url = handle.url();
        arena.unlink(&url).unwrap();
        assert!(arena.unlink(&url).is_err());
        assert!(arena.stat(&url).is_err());
        drop(handle);
    }

    #[test]
    fn handles_are_unique() {
        let arena = StreamArena::new();
        let a = arena.create().unwrap();
        let b = arena.create().unwrap();
        assert_ne!(a.handle(), b.handle());
    }
}
