// Adapted from GenomeTools' `mapsuffixarray`/`freesuffixarray`
// (`src/match/esa-map.c`, see `original_source`): `open`/`close` drive the
// same manifest-parse -> compatibility-check -> alphabet-load ->
// demand-driven table acquisition pipeline, and `close` is idempotent the
// same way `freesuffixarray` is safe to call on a partially built index.

//! Enhanced suffix array loader: parses the project manifest, validates
//! host compatibility, and acquires the on-disk tables a caller demands
//! (§4.C).

pub mod manifest;
pub mod radix_sort;
pub mod tables;
pub mod traversal;

use crate::alphabets::MultiRangeAlphabet;
use crate::error::{EsaError, Result};
use manifest::Manifest;
use std::path::{Path, PathBuf};
use tables::{DemandMask, MappedTable, StreamTable};

/// LCP value, or a marker that the real value lives in `llvtab`.
pub const LCP_LARGE_SENTINEL: u8 = 255;

/// One `(index, large_value)` entry from the `.llv` side table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LargeLcpEntry {
    pub index: u64,
    pub value: u64,
}

#[derive(Debug)]
enum SufTabHandle {
    Mapped(MappedTable),
    Streamed(StreamTable),
    Absent,
}

#[derive(Debug)]
enum LcpTabHandle {
    Mapped(MappedTable),
    Streamed(StreamTable),
    Absent,
}

#[derive(Debug)]
enum BwtTabHandle {
    Mapped(MappedTable),
    Streamed(StreamTable),
    Absent,
}

#[derive(Debug)]
enum BckTabHandle {
    Mapped(MappedTable),
    Absent,
}

/// An open enhanced suffix array. Dropping it releases every mapped region
/// and closes every streamed file handle (§3 lifecycles).
#[derive(Debug)]
pub struct EsaIndex {
    pub manifest: Manifest,
    pub alphabet: MultiRangeAlphabet,
    suftab: SufTabHandle,
    lcptab: LcpTabHandle,
    bwttab: BwtTabHandle,
    bcktab: BckTabHandle,
    largelcp: Vec<LargeLcpEntry>,
}

fn sibling_path(indexname: &Path, suffix: &str) -> PathBuf {
    let mut s = indexname.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

fn unit_size_for(manifest: &Manifest) -> usize {
    (manifest.integersize / 8) as usize
}

impl EsaIndex {
    /// Execute the four-step `open` pipeline of §4.C.
    pub fn open(indexname: &Path, demand: DemandMask, mapped: bool) -> Result<EsaIndex> {
        let prj_path = sibling_path(indexname, ".prj");
        let content = std::fs::read_to_string(&prj_path).map_err(EsaError::Io)?;
        let manifest = Manifest::parse(&prj_path.display().to_string(), &content)?;
        manifest.check_host_compatible()?;

        let al1_path = sibling_path(indexname, ".al1");
        let alphabet = load_alphabet_file(&al1_path)?;

        let unit_size = unit_size_for(&manifest);
        let totallength = manifest.totallength;

        let suftab = if demand.contains(DemandMask::SUF) {
            let path = sibling_path(indexname, ".suf");
            if mapped {
                SufTabHandle::Mapped(MappedTable::open(&path, totallength + 1, unit_size)?)
            } else {
                SufTabHandle::Streamed(StreamTable::open(&path)?)
            }
        } else {
            log::debug!("skipping suftab, not demanded");
            SufTabHandle::Absent
        };

        let lcptab = if demand.contains(DemandMask::LCP) {
            let path = sibling_path(indexname, ".lcp");
            if mapped {
                LcpTabHandle::Mapped(MappedTable::open(&path, totallength + 1, 1)?)
            } else {
                let mut stream = StreamTable::open(&path)?;
                stream.skip_sentinel_byte()?;
                LcpTabHandle::Streamed(stream)
            }
        } else {
            log::debug!("skipping lcptab, not demanded");
            LcpTabHandle::Absent
        };

        let bwttab = if demand.contains(DemandMask::BWT) {
            let path = sibling_path(indexname, ".bwt");
            if mapped {
                BwtTabHandle::Mapped(MappedTable::open(&path, totallength + 1, 1)?)
            } else {
                BwtTabHandle::Streamed(StreamTable::open(&path)?)
            }
        } else {
            log::debug!("skipping bwttab, not demanded");
            BwtTabHandle::Absent
        };

        let bcktab = if demand.contains(DemandMask::BCK) {
            if !mapped {
                return Err(EsaError::Unsupported("cannot stream bucket table".into()));
            }
            let path = sibling_path(indexname, ".bck");
            let bucket_count = 1usize << (2 * manifest.prefixlength.min(16) as usize);
            BckTabHandle::Mapped(MappedTable::open(&path, bucket_count as u64, unit_size)?)
        } else {
            log::debug!("skipping bcktab, not demanded");
            BckTabHandle::Absent
        };

        let largelcp = if manifest.largelcpvalues > 0 && demand.contains(DemandMask::LCP) {
            load_large_lcp(&sibling_path(indexname, ".llv"), manifest.largelcpvalues, unit_size)?
        } else {
            Vec::new()
        };

        if demand.contains(DemandMask::DES) {
            let expected = manifest.numofdbsequences;
            if expected != manifest.dbfiles.len() as u64 && !manifest.dbfiles.is_empty() {
                return Err(EsaError::IndexIncompatible(
                    "numofdbsequences does not match number of dbfile entries".into(),
                ));
            }
        }

        Ok(EsaIndex {
            manifest,
            alphabet,
            suftab,
            lcptab,
            bwttab,
            bcktab,
            largelcp,
        })
    }

    /// Look up the suffix position at `i`, requiring the suffix table to
    /// have been mapped (not streamed) and demanded at `open` time.
    pub fn suftab_at(&self, i: u64) -> Result<u64> {
        match &self.suftab {
            SufTabHandle::Mapped(table) => {
                let unit_size = unit_size_for(&self.manifest);
                let offset = (i as usize) * unit_size;
                let bytes = table.as_bytes();
                if offset + unit_size > bytes.len() {
                    return Err(EsaError::BadPosition {
                        pos: i,
                        len: (table.len() / unit_size) as u64,
                    });
                }
                Ok(read_native_uint(&bytes[offset..offset + unit_size]))
            }
            SufTabHandle::Streamed(_) => Err(EsaError::Unsupported(
                "random access requires a mapped suftab".into(),
            )),
            SufTabHandle::Absent => Err(EsaError::MissingTable("suftab not demanded".into())),
        }
    }

    /// Look up the (possibly large) LCP value at `i`.
    pub fn lcp_at(&self, i: u64) -> Result<u64> {
        match &self.lcptab {
            LcpTabHandle::Mapped(table) => {
                let bytes = table.as_bytes();
                let raw = *bytes
                    .get(i as usize)
                    .ok_or_else(|| EsaError::BadPosition { pos: i, len: table.len() as u64 })?;
                if raw as u64 == LCP_LARGE_SENTINEL as u64 {
                    self.largelcp
                        .iter()
                        .find(|e| e.index == i)
                        .map(|e| e.value)
                        .ok_or_else(|| {
                            EsaError::IndexIncompatible(format!("missing llvtab entry for index {}", i))
                        })
                } else {
                    Ok(raw as u64)
                }
            }
            LcpTabHandle::Streamed(_) => Err(EsaError::Unsupported(
                "random access requires a mapped lcptab".into(),
            )),
            LcpTabHandle::Absent => Err(EsaError::MissingTable("lcptab not demanded".into())),
        }
    }

    pub fn has_bcktab(&self) -> bool {
        matches!(self.bcktab, BckTabHandle::Mapped(_))
    }

    pub fn has_bwttab(&self) -> bool {
        !matches!(self.bwttab, BwtTabHandle::Absent)
    }

    /// Idempotent close: dropping the handles unmaps/closes every owned
    /// region. Calling this explicitly is just an early drop.
    pub fn close(self) {
        drop(self);
    }
}

fn read_native_uint(bytes: &[u8]) -> u64 {
    use byteorder::{ByteOrder, NativeEndian};
    match bytes.len() {
        4 => NativeEndian::read_u32(bytes) as u64,
        8 => NativeEndian::read_u64(bytes),
        _ => 0,
    }
}

fn load_alphabet_file(path: &Path) -> Result<MultiRangeAlphabet> {
    let content = std::fs::read_to_string(path).map_err(EsaError::Io)?;
    let mut ranges: Vec<Vec<u8>> = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        ranges.push(line.bytes().collect());
    }
    if ranges.is_empty() {
        return Err(EsaError::BadAlphabet(format!("{}: no ranges", path.display())));
    }
    MultiRangeAlphabet::new(&ranges)
}

fn load_large_lcp(path: &Path, count: u64, unit_size: usize) -> Result<Vec<LargeLcpEntry>> {
    use byteorder::{NativeEndian, ReadBytesExt};
    let mut file = std::fs::File::open(path).map_err(EsaError::Io)?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let index = if unit_size == 4 {
            file.read_u32::<NativeEndian>().map_err(EsaError::Io)? as u64
        } else {
            file.read_u64::<NativeEndian>().map_err(EsaError::Io)?
        };
        let value = if unit_size == 4 {
            file.read_u32::<NativeEndian>().map_err(EsaError::Io)? as u64
        } else {
            file.read_u64::<NativeEndian>().map_err(EsaError::Io)?
        };
        entries.push(LargeLcpEntry { index, value });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_minimal_index(dir: &Path, word_bits: u32, little: bool) {
        let base = dir.join("idx");
        let prj = format!(
            "totallength=3\n\
specialcharacters=0\n\
specialranges=0\n\
realspecialranges=0\n\
lengthofspecialprefix=0\n\
lengthofspecialsuffix=0\n\
numofsequences=1\n\
numofdbsequences=1\n\
longest=0\n\
prefixlength=2\n\
largelcpvalues=0\n\
integersize={}\n\
littleendian={}\n\
readmode=0\n\
dbfile=seq1 3 3\n",
            word_bits,
            if little { 1 } else { 0 }
        );
        std::fs::write(sibling_path(&base, ".prj"), prj).unwrap();
        std::fs::write(sibling_path(&base, ".al1"), "A\nC\nG\nT\nN\n").unwrap();

        let unit_size = (word_bits / 8) as usize;
        let mut suf_bytes = Vec::new();
        for v in [0u64, 1, 2, 3] {
            if unit_size == 4 {
                suf_bytes.extend_from_slice(&(v as u32).to_ne_bytes());
            } else {
                suf_bytes.extend_from_slice(&v.to_ne_bytes());
            }
        }
        std::fs::File::create(sibling_path(&base, ".suf"))
            .unwrap()
            .write_all(&suf_bytes)
            .unwrap();
        std::fs::File::create(sibling_path(&base, ".lcp"))
            .unwrap()
            .write_all(&[0u8, 0, 1, 0])
            .unwrap();
    }

    #[test]
    fn open_query_close_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let host_bits = (std::mem::size_of::<usize>() * 8) as u32;
        write_minimal_index(dir.path(), host_bits, cfg!(target_endian = "little"));
        let idx = EsaIndex::open(
            &dir.path().join("idx"),
            DemandMask::SUF | DemandMask::LCP,
            true,
        )
        .unwrap();
        assert_eq!(idx.suftab_at(0).unwrap(), 0);
        assert_eq!(idx.suftab_at(2).unwrap(), 2);
        assert_eq!(idx.lcp_at(2).unwrap(), 1);
        idx.close();
    }

    #[test]
    fn wrong_word_size_is_incompatible() {
        let dir = tempfile::tempdir().unwrap();
        let host_bits = (std::mem::size_of::<usize>() * 8) as u32;
        let other_bits = if host_bits == 64 { 32 } else { 64 };
        write_minimal_index(dir.path(), other_bits, cfg!(target_endian = "little"));
        let err = EsaIndex::open(&dir.path().join("idx"), DemandMask::NONE, true).unwrap_err();
        assert!(matches!(err, EsaError::IndexIncompatible(_)));
    }

    #[test]
    fn missing_table_without_demand_errors() {
        let _ = env_logger::try_init();
        let dir = tempfile::tempdir().unwrap();
        let host_bits = (std::mem::size_of::<usize>() * 8) as u32;
        write_minimal_index(dir.path(), host_bits, cfg!(target_endian = "little"));
        let idx = EsaIndex::open(&dir.path().join("idx"), DemandMask::NONE, true).unwrap();
        assert!(matches!(idx.suftab_at(0), Err(EsaError::MissingTable(_))));
    }
}
