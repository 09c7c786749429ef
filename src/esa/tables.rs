// Adapted from the demand-driven table acquisition in GenomeTools'
// `mapsuffixarray`/`streamsuffixarray` (`src/match/esa-map.c`, see
// `original_source`): same demand bitmask, same map-vs-stream split, same
// refusal to stream the bucket table, same LCP-stream seek past the
// sentinel byte. I/O itself goes through `memmap2`/`byteorder`.

//! Map-mode and stream-mode access to the on-disk suffix/LCP/BWT/bucket
//! tables (§4.C step 4).

use crate::error::{EsaError, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::sync::Arc;

/// Which tables an `open` call needs; bits combine with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemandMask(u8);

impl DemandMask {
    pub const ESQ: DemandMask = DemandMask(1 << 0);
    pub const DES: DemandMask = DemandMask(1 << 1);
    pub const SUF: DemandMask = DemandMask(1 << 2);
    pub const LCP: DemandMask = DemandMask(1 << 3);
    pub const BWT: DemandMask = DemandMask(1 << 4);
    pub const BCK: DemandMask = DemandMask(1 << 5);

    pub const NONE: DemandMask = DemandMask(0);

    pub fn contains(self, other: DemandMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for DemandMask {
    type Output = DemandMask;
    fn bitor(self, rhs: DemandMask) -> DemandMask {
        DemandMask(self.0 | rhs.0)
    }
}

/// A memory-mapped table, read-only and freely shareable (§5).
#[derive(Debug, Clone)]
pub struct MappedTable {
    mmap: Arc<Mmap>,
}

impl MappedTable {
    /// Map `path`, verifying its byte length equals `expected_units *
    /// unit_size` exactly (§4.C step 4, map mode).
    pub fn open(path: &std::path::Path, expected_units: u64, unit_size: usize) -> Result<MappedTable> {
        let file = File::open(path).map_err(EsaError::Io)?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(EsaError::Io)?;
        let expected_bytes = expected_units
            .checked_mul(unit_size as u64)
            .ok_or_else(|| EsaError::Overflow("table size overflow".into()))?;
        if mmap.len() as u64 != expected_bytes {
            return Err(EsaError::IndexIncompatible(format!(
                "{}: expected {} bytes, mapped {}",
                path.display(),
                expected_bytes,
                mmap.len()
            )));
        }
        Ok(MappedTable { mmap: Arc::new(mmap) })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[..]
    }

    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }
}

/// A streamed table: a buffered file handle plus `(next_read, next_free)`
/// cursors, following §4.C step 4's stream-mode contract.
#[derive(Debug)]
pub struct StreamTable {
    reader: BufReader<File>,
    next_read: u64,
    next_free: u64,
}

impl StreamTable {
    pub fn open(path: &std::path::Path) -> Result<StreamTable> {
        let file = File::open(path).map_err(EsaError::Io)?;
        let len = file.metadata().map_err(EsaError::Io)?.len();
        Ok(StreamTable {
            reader: BufReader::new(file),
            next_read: 0,
            next_free: len,
        })
    }

    /// Skip the table's leading sentinel byte, used when streaming `.lcp`
    /// (its first byte is a sentinel, not a real LCP value).
    pub fn skip_sentinel_byte(&mut self) -> Result<()> {
        self.reader
            .seek(SeekFrom::Start(1))
            .map_err(EsaError::Io)?;
        self.next_read = 1;
        Ok(())
    }

    pub fn next_read(&self) -> u64 {
        self.next_read
    }

    pub fn next_free(&self) -> u64 {
        self.next_free
    }

    /// Read exactly `buf.len()` bytes, advancing `next_read`.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reader.read_exact(buf).map_err(EsaError::Io)?;
        self.next_read += buf.len() as u64;
        Ok(())
    }
}

/// Open a table for `kind` under `demand`, following the map/stream split
/// and the `BCK`-cannot-stream refusal in §4.C step 4.
#[derive(Debug)]
pub enum Table {
    Mapped(MappedTable),
    Streamed(StreamTable),
}

pub fn acquire_table(
    path: &std::path::Path,
    kind: DemandMask,
    mapped: bool,
    expected_units: u64,
    unit_size: usize,
) -> Result<Table> {
    if !mapped && kind.contains(DemandMask::BCK) {
        return Err(EsaError::Unsupported("cannot stream bucket table".into()));
    }
    if mapped {
        Ok(Table::Mapped(MappedTable::open(path, expected_units, unit_size)?))
    } else {
        let mut stream = StreamTable::open(path)?;
        if kind.contains(DemandMask::LCP) {
            stream.skip_sentinel_byte()?;
        }
        Ok(Table::Streamed(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn mapped_table_rejects_wrong_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.suf");
        std::fs::File::create(&path).unwrap().write_all(&[0u8; 16]).unwrap();
        assert!(MappedTable::open(&path, 3, 8).is_err());
        assert!(MappedTable::open(&path, 2, 8).is_ok());
    }

    #[test]
    fn streaming_bcktab_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.bck");
        std::fs::File::create(&path).unwrap();
        let err = acquire_table(&path, DemandMask::BCK, false, 0, 1).unwrap_err();
        assert!(matches!(err, EsaError::Unsupported(_)));
    }

    #[test]
    fn stream_lcp_skips_sentinel_byte() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.lcp");
        std::fs::File::create(&path).unwrap().write_all(&[255u8, 1, 2, 3]).unwrap();
        let mut stream = StreamTable::open(&path).unwrap();
        stream.skip_sentinel_byte().unwrap();
        let mut buf = [0u8; 3];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
    }
}
