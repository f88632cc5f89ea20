//! Record stream I/O: length-framed binary encoding of [`Record`]s.
//!
//! Each record is written as a little-endian `u32` frame length followed by
//! the frame body: length-prefixed name and sequence bytes, then the mapping
//! list. The same codec is used for the input stream, the sorted output
//! stream, and the spill files, so a spill can be re-read with the ordinary
//! reader.
//!
//! [`GamWriter`] flushes the underlying stream after every
//! `group_size` records rather than per record or once at the end, so a
//! downstream consumer of the output can start reading (and indexing) while
//! a long sort is still emitting.

use crate::model::{Mapping, Position, Record};
use bstr::BString;
use std::io::{self, BufReader, BufWriter, Read, Write};

/// Number of records written between flushes of the output stream.
pub const DEFAULT_GROUP_SIZE: usize = 1000;

/// Upper bound on a single frame, to catch garbage lengths in corrupt
/// streams before attempting a huge allocation.
const MAX_FRAME_LEN: u32 = 1 << 28;

/// Bytes per encoded mapping: node id + orientation flag + offset + rank.
const MAPPING_ENCODED_LEN: usize = 8 + 1 + 8 + 8;

/// Streaming reader over a framed record stream.
///
/// Yields records front to back, once; the stream is not restartable.
pub struct GamReader<R: Read> {
    inner: BufReader<R>,
}

impl<R: Read> GamReader<R> {
    /// Creates a reader over `inner` with the default buffer capacity.
    pub fn new(inner: R) -> Self {
        Self { inner: BufReader::new(inner) }
    }

    /// Creates a reader with an explicit buffer capacity.
    pub fn with_capacity(capacity: usize, inner: R) -> Self {
        Self { inner: BufReader::with_capacity(capacity, inner) }
    }

    /// Reads the next record, or `Ok(None)` at a clean end of stream.
    ///
    /// A stream that ends partway through a frame is an error
    /// (`UnexpectedEof`), never a silent truncation.
    pub fn read_record(&mut self) -> io::Result<Option<Record>> {
        let mut len_buf = [0u8; 4];
        if !read_exact_or_eof(&mut self.inner, &mut len_buf)? {
            return Ok(None);
        }
        let frame_len = u32::from_le_bytes(len_buf);
        if frame_len > MAX_FRAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("record frame length {frame_len} exceeds limit {MAX_FRAME_LEN}"),
            ));
        }

        let mut frame = vec![0u8; frame_len as usize];
        self.inner.read_exact(&mut frame)?;
        decode_record(&frame).map(Some)
    }
}

impl<R: Read> Iterator for GamReader<R> {
    type Item = io::Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

/// Buffered writer of framed records with grouped flushes.
pub struct GamWriter<W: Write> {
    inner: BufWriter<W>,
    group_size: usize,
    pending: usize,
    written: u64,
    frame: Vec<u8>,
}

impl<W: Write> GamWriter<W> {
    /// Creates a writer flushing every [`DEFAULT_GROUP_SIZE`] records.
    pub fn new(inner: W) -> Self {
        Self::with_group_size(inner, DEFAULT_GROUP_SIZE)
    }

    /// Creates a writer flushing every `group_size` records.
    /// A group size of zero flushes only on [`GamWriter::finish`].
    pub fn with_group_size(inner: W, group_size: usize) -> Self {
        Self {
            inner: BufWriter::new(inner),
            group_size,
            pending: 0,
            written: 0,
            frame: Vec::new(),
        }
    }

    /// Encodes and writes one record, flushing if a group boundary was reached.
    pub fn write_record(&mut self, record: &Record) -> io::Result<()> {
        self.frame.clear();
        encode_record(record, &mut self.frame);
        let frame_len = u32::try_from(self.frame.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "record frame exceeds u32 length")
        })?;
        self.inner.write_all(&frame_len.to_le_bytes())?;
        self.inner.write_all(&self.frame)?;
        self.written += 1;
        self.pending += 1;
        if self.group_size > 0 && self.pending >= self.group_size {
            self.inner.flush()?;
            self.pending = 0;
        }
        Ok(())
    }

    /// Number of records written so far.
    #[must_use]
    pub fn records_written(&self) -> u64 {
        self.written
    }

    /// Flushes any partial final group and returns the record count.
    pub fn finish(mut self) -> io::Result<u64> {
        self.inner.flush()?;
        Ok(self.written)
    }
}

/// Reads `buf.len()` bytes; returns `Ok(false)` on a clean EOF before the
/// first byte, and `UnexpectedEof` if the stream ends mid-read.
fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                if filled == 0 {
                    return Ok(false);
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended inside a record frame header",
                ));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

fn encode_record(record: &Record, out: &mut Vec<u8>) {
    encode_bytes(&record.name, out);
    encode_bytes(&record.sequence, out);
    out.extend_from_slice(&(record.path.len() as u32).to_le_bytes());
    for mapping in &record.path {
        out.extend_from_slice(&mapping.position.node_id.to_le_bytes());
        out.push(u8::from(mapping.position.is_reverse));
        out.extend_from_slice(&mapping.position.offset.to_le_bytes());
        out.extend_from_slice(&mapping.rank.to_le_bytes());
    }
}

fn encode_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

fn decode_record(frame: &[u8]) -> io::Result<Record> {
    let mut cursor = Decoder { frame, at: 0 };
    let name = BString::from(cursor.take_bytes()?.to_vec());
    let sequence = BString::from(cursor.take_bytes()?.to_vec());
    let mapping_count = cursor.take_u32()? as usize;

    // Bound check up front so a corrupt count fails fast instead of looping.
    let remaining = frame.len() - cursor.at;
    if mapping_count.checked_mul(MAPPING_ENCODED_LEN) != Some(remaining) {
        return Err(invalid_frame("mapping count disagrees with frame length"));
    }

    let mut path = Vec::with_capacity(mapping_count);
    for _ in 0..mapping_count {
        let node_id = cursor.take_u64()?;
        let is_reverse = cursor.take_u8()? != 0;
        let offset = cursor.take_u64()?;
        let rank = cursor.take_u64()?;
        path.push(Mapping::new(Position::new(node_id, is_reverse, offset), rank));
    }
    Ok(Record { name, sequence, path })
}

fn invalid_frame(reason: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("malformed record frame: {reason}"))
}

struct Decoder<'a> {
    frame: &'a [u8],
    at: usize,
}

impl<'a> Decoder<'a> {
    fn take(&mut self, len: usize) -> io::Result<&'a [u8]> {
        let end = self
            .at
            .checked_add(len)
            .filter(|&end| end <= self.frame.len())
            .ok_or_else(|| invalid_frame("field extends past end of frame"))?;
        let slice = &self.frame[self.at..end];
        self.at = end;
        Ok(slice)
    }

    fn take_u8(&mut self) -> io::Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn take_u32(&mut self) -> io::Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().expect("4-byte slice")))
    }

    fn take_u64(&mut self) -> io::Result<u64> {
        let bytes = self.take(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().expect("8-byte slice")))
    }

    fn take_bytes(&mut self) -> io::Result<&'a [u8]> {
        let len = self.take_u32()? as usize;
        self.take(len)
    }
}
