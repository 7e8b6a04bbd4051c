// src/framing/reader.rs
use crate::error::{DbdError, Result};
use crate::framing::is_compressed;
use bytes::{Buf, Bytes, BytesMut};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

#[cfg(feature = "mmap")]
use memmap2::Mmap;
#[cfg(feature = "mmap")]
use std::io::Cursor;

/// Largest decompressed size of a single LZ4 frame
pub const MAX_FRAME_SIZE: usize = 65536;

const PLAIN_CHUNK_SIZE: usize = 65536;

/// Byte-oriented reader over a plain or LZ4-framed DBD stream
///
/// Decompressed (or plainly read) bytes are held in an internal buffer;
/// more frames are decoded on demand as consumers read past its tail.
pub struct FramingReader {
    source: Box<dyn Read + Send>,
    compressed: bool,
    buffer: BytesMut,
    scratch: Vec<u8>,
    eof: bool,
    position: u64,
}

impl FramingReader {
    /// Open a file, choosing the compressed path from its extension
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(Self::new(BufReader::with_capacity(65536, file), is_compressed(path)))
    }

    /// Open a file through a read-only memory map (requires "mmap" feature)
    #[cfg(feature = "mmap")]
    pub fn open_mmap(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self::new(Cursor::new(mmap), is_compressed(path)))
    }

    /// Wrap an arbitrary byte source
    pub fn new(source: impl Read + Send + 'static, compressed: bool) -> Self {
        let scratch_len = if compressed { MAX_FRAME_SIZE } else { PLAIN_CHUNK_SIZE };
        FramingReader {
            source: Box::new(source),
            compressed,
            buffer: BytesMut::with_capacity(scratch_len),
            scratch: vec![0u8; scratch_len],
            eof: false,
            position: 0,
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Number of decoded bytes consumed so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Whether the underlying source is exhausted and the buffer drained
    pub fn is_eof(&mut self) -> Result<bool> {
        Ok(self.ensure(1)? == 0)
    }

    /// Pull the next chunk (plain) or frame (compressed) into the buffer.
    /// Returns `false` once the source is exhausted.
    fn fill(&mut self) -> Result<bool> {
        if self.eof {
            return Ok(false);
        }

        if !self.compressed {
            let n = read_full(&mut self.source, &mut self.scratch)?;
            if n == 0 {
                self.eof = true;
                return Ok(false);
            }
            self.buffer.extend_from_slice(&self.scratch[..n]);
            return Ok(true);
        }

        let mut prefix = [0u8; 2];
        if read_full(&mut self.source, &mut prefix)? < 2 {
            self.eof = true;
            return Ok(false);
        }
        let frame_size = u16::from_be_bytes(prefix) as usize;
        if frame_size == 0 {
            return Ok(true);
        }

        let mut frame = vec![0u8; frame_size];
        let got = read_full(&mut self.source, &mut frame)?;
        if got != frame_size {
            self.eof = true;
            return Err(DbdError::Framing(format!(
                "short frame: expected {} bytes, got {}",
                frame_size, got
            )));
        }

        let n = lz4_flex::block::decompress_into(&frame, &mut self.scratch)
            .map_err(|e| DbdError::Framing(format!("LZ4 decompression failed: {}", e)))?;
        self.buffer.extend_from_slice(&self.scratch[..n]);
        Ok(true)
    }

    /// Buffer at least `n` bytes if the stream has them; returns the
    /// number of bytes available (less than `n` only at end of stream)
    fn ensure(&mut self, n: usize) -> Result<usize> {
        while self.buffer.len() < n {
            if !self.fill()? {
                break;
            }
        }
        Ok(self.buffer.len().min(n))
    }

    /// Look at up to `n` upcoming bytes without consuming them
    pub fn peek(&mut self, n: usize) -> Result<&[u8]> {
        let available = self.ensure(n)?;
        Ok(&self.buffer[..available])
    }

    /// Look at the next line (through `\n`) without consuming it.
    ///
    /// At most `max_len` bytes are examined, so a binary section without
    /// newlines never buffers more than that.
    pub fn peek_line(&mut self, max_len: usize) -> Result<&[u8]> {
        let mut searched = 0;
        loop {
            let limit = self.buffer.len().min(max_len);
            if let Some(pos) = self.buffer[searched..limit].iter().position(|&b| b == b'\n') {
                let end = searched + pos + 1;
                return Ok(&self.buffer[..end]);
            }
            searched = limit;
            if limit >= max_len || !self.fill()? {
                let end = self.buffer.len().min(max_len);
                return Ok(&self.buffer[..end]);
            }
        }
    }

    /// Read up to `n` bytes; fewer are returned only at end of stream
    pub fn read_bytes(&mut self, n: usize) -> Result<Bytes> {
        let available = self.ensure(n)?;
        self.position += available as u64;
        Ok(self.buffer.split_to(available).freeze())
    }

    /// Fill `buf` as far as the stream allows and return the count
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        let available = self.ensure(buf.len())?;
        buf[..available].copy_from_slice(&self.buffer[..available]);
        self.buffer.advance(available);
        self.position += available as u64;
        Ok(available)
    }

    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.ensure(1)? == 0 {
            return Ok(None);
        }
        self.position += 1;
        Ok(Some(self.buffer.get_u8()))
    }

    /// Discard up to `n` bytes and return how many were skipped
    pub fn skip(&mut self, n: usize) -> Result<usize> {
        let available = self.ensure(n)?;
        self.buffer.advance(available);
        self.position += available as u64;
        Ok(available)
    }

    /// Read through the next `\n` (included). At end of stream the partial
    /// line is returned; an empty vector means nothing was left.
    pub fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        let mut searched = 0;
        loop {
            if let Some(pos) = self.buffer[searched..].iter().position(|&b| b == b'\n') {
                let end = searched + pos + 1;
                line.extend_from_slice(&self.buffer[..end]);
                self.buffer.advance(end);
                self.position += end as u64;
                return Ok(line);
            }
            searched = self.buffer.len();
            if !self.fill()? {
                let rest = self.buffer.len();
                line.extend_from_slice(&self.buffer[..rest]);
                self.buffer.advance(rest);
                self.position += rest as u64;
                return Ok(line);
            }
        }
    }

    /// Read everything that remains
    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        while self.fill()? {}
        let rest = self.buffer.len();
        self.position += rest as u64;
        Ok(self.buffer.split_to(rest).to_vec())
    }
}

impl Read for FramingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_into(buf).map_err(|e| match e {
            DbdError::Io(inner) => inner,
            other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
        })
    }
}

fn read_full<R: Read + ?Sized>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match source.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}
