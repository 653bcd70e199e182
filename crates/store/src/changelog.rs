//! Append-only change log for durability.
//!
//! Format: each record is a one-byte tag (`0x00` Put, `0x01` Remove,
//! `0x02` Clear) followed by varint-length-prefixed byte strings. On open
//! the whole file is replayed; a malformed tail is truncated back to the
//! last whole record.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("change log I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Sync policy for the change log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// Sync to durable media after every append.
    Always,
    /// Sync periodically (caller controls).
    Batch,
    /// Never explicitly sync (OS decides).
    None,
}

impl SyncPolicy {
    pub fn from_str_config(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "batch" => Self::Batch,
            "none" => Self::None,
            _ => Self::Always,
        }
    }
}

const TAG_PUT: u8 = 0x00;
const TAG_REMOVE: u8 = 0x01;
const TAG_CLEAR: u8 = 0x02;

/// Decoders accept at most this many varint bytes.
const MAX_VARINT_BYTES: usize = 10;

/// A single durable mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Put { key: Vec<u8>, value: Vec<u8> },
    Remove { key: Vec<u8> },
    Clear,
}

impl Change {
    pub fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            Change::Put { key, value } => encode_put(buf, key, value),
            Change::Remove { key } => encode_remove(buf, key),
            Change::Clear => encode_clear(buf),
        }
    }
}

fn encode_put(buf: &mut Vec<u8>, key: &[u8], value: &[u8]) {
    buf.push(TAG_PUT);
    put_varint(buf, key.len() as u64);
    buf.extend_from_slice(key);
    put_varint(buf, value.len() as u64);
    buf.extend_from_slice(value);
}

fn encode_remove(buf: &mut Vec<u8>, key: &[u8]) {
    buf.push(TAG_REMOVE);
    put_varint(buf, key.len() as u64);
    buf.extend_from_slice(key);
}

fn encode_clear(buf: &mut Vec<u8>) {
    buf.push(TAG_CLEAR);
}

/// Base-128 unsigned varint: low 7 bits first, continuation bit on every
/// byte except the last. Zero encodes as a single `0x00`.
pub fn put_varint(buf: &mut Vec<u8>, mut x: u64) {
    loop {
        let b = (x & 0x7f) as u8;
        x >>= 7;
        if x == 0 {
            buf.push(b);
            return;
        }
        buf.push(b | 0x80);
    }
}

/// Reads a varint. `None` means the input ended or the encoding exceeded
/// [`MAX_VARINT_BYTES`]; both count as a corrupt tail.
fn read_varint<R: Read>(r: &mut R) -> io::Result<Option<u64>> {
    let mut x = 0u64;
    let mut shift = 0u32;
    for _ in 0..MAX_VARINT_BYTES {
        let mut b = [0u8; 1];
        if r.read(&mut b)? == 0 {
            return Ok(None);
        }
        x |= u64::from(b[0] & 0x7f) << shift;
        if b[0] & 0x80 == 0 {
            return Ok(Some(x));
        }
        shift += 7;
    }
    Ok(None)
}

fn read_bytes<R: Read>(r: &mut R) -> io::Result<Option<Vec<u8>>> {
    let Some(len) = read_varint(r)? else {
        return Ok(None);
    };
    let mut buf = Vec::new();
    (&mut *r).take(len).read_to_end(&mut buf)?;
    if (buf.len() as u64) < len {
        return Ok(None);
    }
    Ok(Some(buf))
}

/// Outcome of decoding one record.
enum Decoded {
    Record(Change),
    /// Clean end of input at a record boundary.
    Eof,
    /// Malformed or truncated record.
    Corrupt,
}

fn decode_one<R: Read>(r: &mut R) -> io::Result<Decoded> {
    let mut tag = [0u8; 1];
    if r.read(&mut tag)? == 0 {
        return Ok(Decoded::Eof);
    }
    let change = match tag[0] {
        TAG_PUT => {
            let Some(key) = read_bytes(r)? else {
                return Ok(Decoded::Corrupt);
            };
            let Some(value) = read_bytes(r)? else {
                return Ok(Decoded::Corrupt);
            };
            Change::Put { key, value }
        }
        TAG_REMOVE => {
            let Some(key) = read_bytes(r)? else {
                return Ok(Decoded::Corrupt);
            };
            Change::Remove { key }
        }
        TAG_CLEAR => Change::Clear,
        _ => return Ok(Decoded::Corrupt),
    };
    Ok(Decoded::Record(change))
}

/// Counts bytes consumed so the scan knows the last good record boundary.
struct CountingReader<R> {
    inner: R,
    consumed: u64,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed += n as u64;
        Ok(n)
    }
}

/// An append-only change log bound to a single file.
#[derive(Debug)]
pub struct ChangeLog {
    writer: BufWriter<File>,
    path: PathBuf,
    sync: SyncPolicy,
    durable_len: u64,
}

impl ChangeLog {
    /// Open or create the log at `path`, replaying existing records.
    ///
    /// If decoding fails partway the file is truncated to the last whole
    /// record before the log is reopened for appending, so the surviving
    /// prefix always folds cleanly.
    pub fn open(path: &Path, sync: SyncPolicy) -> Result<(Self, Vec<Change>), LogError> {
        let mut changes = Vec::new();
        let mut good_len = 0u64;

        match File::open(path) {
            Ok(file) => {
                let file_len = file.metadata()?.len();
                let mut reader = CountingReader {
                    inner: BufReader::new(file),
                    consumed: 0,
                };
                let mut corrupt = false;
                loop {
                    match decode_one(&mut reader)? {
                        Decoded::Record(change) => {
                            changes.push(change);
                            good_len = reader.consumed;
                        }
                        Decoded::Eof => break,
                        Decoded::Corrupt => {
                            corrupt = true;
                            break;
                        }
                    }
                }
                if corrupt {
                    tracing::warn!(
                        "change log corrupt after {} byte(s), truncating {} trailing byte(s)",
                        good_len,
                        file_len - good_len
                    );
                    let file = OpenOptions::new().write(true).open(path)?;
                    file.set_len(good_len)?;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(LogError::Io(e)),
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok((
            Self {
                writer: BufWriter::new(file),
                path: path.to_path_buf(),
                sync,
                durable_len: good_len,
            },
            changes,
        ))
    }

    /// Append a put record. Flushed before returning.
    pub fn append_put(&mut self, key: &[u8], value: &[u8]) -> Result<(), LogError> {
        let mut buf = Vec::new();
        encode_put(&mut buf, key, value);
        self.append_record(&buf)
    }

    /// Append a remove record. Flushed before returning.
    pub fn append_remove(&mut self, key: &[u8]) -> Result<(), LogError> {
        let mut buf = Vec::new();
        encode_remove(&mut buf, key);
        self.append_record(&buf)
    }

    /// Append a clear record. Flushed before returning.
    pub fn append_clear(&mut self) -> Result<(), LogError> {
        let mut buf = Vec::new();
        encode_clear(&mut buf);
        self.append_record(&buf)
    }

    fn append_record(&mut self, buf: &[u8]) -> Result<(), LogError> {
        match self.write_record(buf) {
            Ok(()) => {
                self.durable_len += buf.len() as u64;
                Ok(())
            }
            Err(e) => {
                self.rewind();
                Err(LogError::Io(e))
            }
        }
    }

    fn write_record(&mut self, buf: &[u8]) -> io::Result<()> {
        self.writer.write_all(buf)?;
        self.writer.flush()?;
        if self.sync == SyncPolicy::Always {
            self.writer.get_ref().sync_data()?;
        }
        Ok(())
    }

    /// Discard a partially written record and reopen in append mode. The
    /// in-flight writer's state is unknown after a failed write, so the file
    /// is wound back to the previous record boundary.
    fn rewind(&mut self) {
        if let Ok(file) = OpenOptions::new().write(true).open(&self.path) {
            let _ = file.set_len(self.durable_len);
        }
        if let Ok(file) = OpenOptions::new().append(true).open(&self.path) {
            self.writer = BufWriter::new(file);
        }
    }

    /// Explicitly sync the log (for batch mode).
    pub fn sync(&mut self) -> Result<(), LogError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }

    /// Byte length of the durable record prefix.
    pub fn len(&self) -> u64 {
        self.durable_len
    }

    pub fn is_empty(&self) -> bool {
        self.durable_len == 0
    }
}
