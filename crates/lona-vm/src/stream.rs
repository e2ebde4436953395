// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Streams: the vtable-backed byte source/sink that a [`Port`](crate::port::Port)
//! buffers.
//!
//! §4.6 describes a `Stream` as `{read, write, close, mark, ready, seek}`,
//! any subset of which may be absent. In C that's a struct of function
//! pointers; the idiomatic Rust equivalent is a trait with default no-op
//! methods, stored as a trait object so a `Port` can wrap a file, a socket,
//! an in-memory buffer, or a host extension's stream uniformly.

use crate::error::Result;
use crate::value::Value;
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

/// The byte source/sink a `Port` buffers.
///
/// Every method has a default that reports "unsupported" so a stream only
/// needs to implement the directions it actually offers (e.g. a read-only
/// file stream never implements `write`).
pub trait StreamOps: fmt::Debug {
    /// Human-readable stream kind, used in printed port representations.
    fn name(&self) -> &'static str;

    /// Read up to `buf.len()` bytes. Returns the number of bytes read (0 at EOF).
    fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(crate::error::LonaError::io(format!(
            "{} stream is not readable",
            self.name()
        )))
    }

    /// Write all of `buf`. Returns the number of bytes written.
    fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(crate::error::LonaError::io(format!(
            "{} stream is not writable",
            self.name()
        )))
    }

    /// Release any external resource. Idempotent.
    fn close(&mut self) {}

    /// True if a read/write would not block (mode 0 = read, 1 = write).
    fn ready(&self, _mode: u8) -> bool {
        true
    }

    /// Seek to an absolute byte offset. `None` means the stream is not seekable.
    fn seek(&mut self, _offset: u64) -> Option<Result<()>> {
        None
    }

    /// Mark any values the host context keeps alive (extension streams only).
    fn mark_roots(&self, _push: &mut dyn FnMut(Value)) {}

    /// The full backing buffer, for streams that keep one (`get-output-string`).
    /// `None` for streams with no addressable whole-buffer notion, e.g. files.
    fn contents(&self) -> Option<Vec<u8>> {
        None
    }
}

/// An in-memory, growable byte stream. Used for string ports and as the
/// backing store for output-to-buffer primitives.
#[derive(Debug, Default)]
pub struct MemoryStream {
    pub data: Vec<u8>,
    pub pos: usize,
    pub closed: bool,
}

impl MemoryStream {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            pos: 0,
            closed: false,
        }
    }
}

impl StreamOps for MemoryStream {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.closed {
            return Err(crate::error::LonaError::io("read on closed stream"));
        }
        let remaining = &self.data[self.pos.min(self.data.len())..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.closed {
            return Err(crate::error::LonaError::io("write on closed stream"));
        }
        if self.pos == self.data.len() {
            self.data.extend_from_slice(buf);
        } else {
            let end = (self.pos + buf.len()).min(self.data.len().max(self.pos + buf.len()));
            self.data.resize(end.max(self.data.len()), 0);
            self.data[self.pos..self.pos + buf.len()].copy_from_slice(buf);
        }
        self.pos += buf.len();
        Ok(buf.len())
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn ready(&self, _mode: u8) -> bool {
        !self.closed
    }

    fn seek(&mut self, offset: u64) -> Option<Result<()>> {
        self.pos = offset as usize;
        Some(Ok(()))
    }

    fn contents(&self) -> Option<Vec<u8>> {
        Some(self.data.clone())
    }
}

/// A stream backed by a `std::fs::File`.
#[derive(Debug)]
pub struct FileStream {
    pub file: File,
    pub closed: bool,
}

impl FileStream {
    #[must_use]
    pub fn new(file: File) -> Self {
        Self {
            file,
            closed: false,
        }
    }
}

impl StreamOps for FileStream {
    fn name(&self) -> &'static str {
        "file"
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.closed {
            return Err(crate::error::LonaError::io("read on closed file"));
        }
        self.file
            .read(buf)
            .map_err(|e| crate::error::LonaError::io(e.to_string()))
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.closed {
            return Err(crate::error::LonaError::io("write on closed file"));
        }
        self.file
            .write(buf)
            .map_err(|e| crate::error::LonaError::io(e.to_string()))
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn seek(&mut self, offset: u64) -> Option<Result<()>> {
        Some(
            self.file
                .seek(SeekFrom::Start(offset))
                .map(|_| ())
                .map_err(|e| crate::error::LonaError::io(e.to_string())),
        )
    }
}

/// The process's standard input, wrapped as a `StreamOps`.
#[derive(Debug, Default)]
pub struct StdinStream;

impl StreamOps for StdinStream {
    fn name(&self) -> &'static str {
        "stdin"
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        use std::io::Read;
        std::io::stdin()
            .read(buf)
            .map_err(|e| crate::error::LonaError::io(e.to_string()))
    }
}

/// The process's standard output, wrapped as a `StreamOps`.
#[derive(Debug, Default)]
pub struct StdoutStream;

impl StreamOps for StdoutStream {
    fn name(&self) -> &'static str {
        "stdout"
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let mut out = std::io::stdout();
        out.write_all(buf)
            .and_then(|()| out.flush())
            .map_err(|e| crate::error::LonaError::io(e.to_string()))?;
        Ok(buf.len())
    }
}

/// The process's standard error, wrapped as a `StreamOps`.
#[derive(Debug, Default)]
pub struct StderrStream;

impl StreamOps for StderrStream {
    fn name(&self) -> &'static str {
        "stderr"
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let mut out = std::io::stderr();
        out.write_all(buf)
            .and_then(|()| out.flush())
            .map_err(|e| crate::error::LonaError::io(e.to_string()))?;
        Ok(buf.len())
    }
}

/// The concrete heap payload for `Value::Stream`: a boxed vtable plus the
/// closed flag mirrored for cheap inspection without a dynamic dispatch.
#[derive(Debug)]
pub struct StreamObject {
    pub ops: Box<dyn StreamOps>,
    pub closed: bool,
}

impl StreamObject {
    #[must_use]
    pub fn new(ops: Box<dyn StreamOps>) -> Self {
        Self {
            ops,
            closed: false,
        }
    }

    pub fn close(&mut self) {
        if !self.closed {
            self.ops.close();
            self.closed = true;
        }
    }
}
