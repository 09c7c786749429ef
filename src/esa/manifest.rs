// Adapted from `scanprjfileviafileptr` in GenomeTools' `src/match/esa-map.c`
// (see `original_source`): the same key set, the same `dbfile=NAME LEN
// EFFLEN` repeated-line grammar, and the same endianness/word-size refusal
// policy, rewritten as a typed line scanner in the style of `bio`'s direct
// parsers (no parser-combinator or regex crate).

//! `.prj` manifest parsing (§4.C, step 1-2).

use crate::encoding::ReadMode;
use crate::error::{EsaError, Result};
use serde::{Deserialize, Serialize};

/// One `dbfile=NAME LEN EFFLEN` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbFileEntry {
    pub name: String,
    pub len: u64,
    pub efflen: u64,
}

/// Parsed `.prj` manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub totallength: u64,
    pub specialcharacters: u64,
    pub specialranges: u64,
    pub realspecialranges: u64,
    pub lengthofspecialprefix: u64,
    pub lengthofspecialsuffix: u64,
    pub numofsequences: u64,
    pub numofdbsequences: u64,
    pub numofquerysequences: Option<u64>,
    pub longest: Option<u64>,
    pub prefixlength: u64,
    pub largelcpvalues: u64,
    pub maxbranchdepth: Option<u64>,
    pub integersize: u32,
    pub littleendian: bool,
    pub readmode: ReadMode,
    pub dbfiles: Vec<DbFileEntry>,
}

const DBFILE_KEY: &str = "dbfile=";

struct RequiredKeys {
    totallength: Option<u64>,
    specialcharacters: Option<u64>,
    specialranges: Option<u64>,
    realspecialranges: Option<u64>,
    lengthofspecialprefix: Option<u64>,
    lengthofspecialsuffix: Option<u64>,
    numofsequences: Option<u64>,
    numofdbsequences: Option<u64>,
    numofquerysequences: Option<u64>,
    longest: Option<u64>,
    prefixlength: Option<u64>,
    largelcpvalues: Option<u64>,
    maxbranchdepth: Option<u64>,
    integersize: Option<u32>,
    littleendian: Option<bool>,
    readmode: Option<u32>,
}

impl RequiredKeys {
    fn empty() -> Self {
        RequiredKeys {
            totallength: None,
            specialcharacters: None,
            specialranges: None,
            realspecialranges: None,
            lengthofspecialprefix: None,
            lengthofspecialsuffix: None,
            numofsequences: None,
            numofdbsequences: None,
            numofquerysequences: None,
            longest: None,
            prefixlength: None,
            largelcpvalues: None,
            maxbranchdepth: None,
            integersize: None,
            littleendian: None,
            readmode: None,
        }
    }
}

fn parse_error(path: &str, line: usize, column: usize, message: impl Into<String>) -> EsaError {
    EsaError::BadManifest {
        path: path.to_string(),
        line,
        column,
        message: message.into(),
    }
}

fn parse_u64_field(path: &str, line: usize, key: &str, raw: &str) -> Result<u64> {
    raw.parse::<u64>()
        .map_err(|_| parse_error(path, line, key.len() + 1, format!("bad integer for {}", key)))
}

impl Manifest {
    /// Parse a `.prj` file's textual content (already read by the caller).
    pub fn parse(path: &str, content: &str) -> Result<Manifest> {
        let mut keys = RequiredKeys::empty();
        let mut dbfiles = Vec::new();

        for (idx, raw_line) in content.lines().enumerate() {
            let linenum = idx + 1;
            let line = raw_line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            if let Some(rest) = line.strip_prefix(DBFILE_KEY) {
                let mut parts = rest.split_whitespace();
                let name = parts
                    .next()
                    .ok_or_else(|| parse_error(path, linenum, DBFILE_KEY.len(), "missing dbfile name"))?
                    .to_string();
                let len_str = parts
                    .next()
                    .ok_or_else(|| parse_error(path, linenum, DBFILE_KEY.len(), "missing dbfile length"))?;
                let efflen_str = parts.next().ok_or_else(|| {
                    parse_error(path, linenum, DBFILE_KEY.len(), "missing dbfile effective length")
                })?;
                let len = parse_u64_field(path, linenum, "dbfile len", len_str)?;
                let efflen = parse_u64_field(path, linenum, "dbfile efflen", efflen_str)?;
                dbfiles.push(DbFileEntry { name, len, efflen });
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| {
                parse_error(path, linenum, 0, "expected KEY=VALUE or dbfile=NAME LEN EFFLEN")
            })?;
            let column = key.len() + 1;
            match key {
                "totallength" => keys.totallength = Some(parse_u64_field(path, linenum, key, value)?),
                "specialcharacters" => {
                    keys.specialcharacters = Some(parse_u64_field(path, linenum, key, value)?)
                }
                "specialranges" => keys.specialranges = Some(parse_u64_field(path, linenum, key, value)?),
                "realspecialranges" => {
                    keys.realspecialranges = Some(parse_u64_field(path, linenum, key, value)?)
                }
                "lengthofspecialprefix" => {
                    keys.lengthofspecialprefix = Some(parse_u64_field(path, linenum, key, value)?)
                }
                "lengthofspecialsuffix" => {
                    keys.lengthofspecialsuffix = Some(parse_u64_field(path, linenum, key, value)?)
                }
                "numofsequences" => keys.numofsequences = Some(parse_u64_field(path, linenum, key, value)?),
                "numofdbsequences" => {
                    keys.numofdbsequences = Some(parse_u64_field(path, linenum, key, value)?)
                }
                "numofquerysequences" => {
                    keys.numofquerysequences = Some(parse_u64_field(path, linenum, key, value)?)
                }
                "longest" => keys.longest = Some(parse_u64_field(path, linenum, key, value)?),
                "prefixlength" => keys.prefixlength = Some(parse_u64_field(path, linenum, key, value)?),
                "largelcpvalues" => keys.largelcpvalues = Some(parse_u64_field(path, linenum, key, value)?),
                "maxbranchdepth" => keys.maxbranchdepth = Some(parse_u64_field(path, linenum, key, value)?),
                "integersize" => {
                    let v = parse_u64_field(path, linenum, key, value)?;
                    if v != 32 && v != 64 {
                        return Err(parse_error(path, linenum, column, "integersize must be 32 or 64"));
                    }
                    keys.integersize = Some(v as u32);
                }
                "littleendian" => {
                    let v = parse_u64_field(path, linenum, key, value)?;
                    if v != 0 && v != 1 {
                        return Err(parse_error(path, linenum, column, "littleendian must be 0 or 1"));
                    }
                    keys.littleendian = Some(v == 1);
                }
                "readmode" => {
                    let v = parse_u64_field(path, linenum, key, value)?;
                    if v > 3 {
                        return Err(parse_error(path, linenum, column, format!("illegal readmode {}", v)));
                    }
                    keys.readmode = Some(v as u32);
                }
                other => {
                    return Err(parse_error(path, linenum, 0, format!("unrecognized key {}", other)));
                }
            }
        }

        let missing = |name: &str| parse_error(path, 0, 0, format!("missing required key {}", name));

        Ok(Manifest {
            totallength: keys.totallength.ok_or_else(|| missing("totallength"))?,
            specialcharacters: keys.specialcharacters.ok_or_else(|| missing("specialcharacters"))?,
            specialranges: keys.specialranges.ok_or_else(|| missing("specialranges"))?,
            realspecialranges: keys.realspecialranges.ok_or_else(|| missing("realspecialranges"))?,
            lengthofspecialprefix: keys
                .lengthofspecialprefix
                .ok_or_else(|| missing("lengthofspecialprefix"))?,
            lengthofspecialsuffix: keys
                .lengthofspecialsuffix
                .ok_or_else(|| missing("lengthofspecialsuffix"))?,
            numofsequences: keys.numofsequences.ok_or_else(|| missing("numofsequences"))?,
            numofdbsequences: keys.numofdbsequences.ok_or_else(|| missing("numofdbsequences"))?,
            numofquerysequences: keys.numofquerysequences,
            longest: keys.longest,
            prefixlength: keys.prefixlength.ok_or_else(|| missing("prefixlength"))?,
            largelcpvalues: keys.largelcpvalues.ok_or_else(|| missing("largelcpvalues"))?,
            maxbranchdepth: keys.maxbranchdepth,
            integersize: keys.integersize.ok_or_else(|| missing("integersize"))?,
            littleendian: keys.littleendian.ok_or_else(|| missing("littleendian"))?,
            readmode: ReadMode::from_u32(keys.readmode.ok_or_else(|| missing("readmode"))?)?,
            dbfiles,
        })
    }

    /// Verify `integersize`/`littleendian` against this host's word size and
    /// byte order. Refuses rather than attempting a cross-endian or
    /// cross-word-size conversion.
    pub fn check_host_compatible(&self) -> Result<()> {
        let host_word_bits = (std::mem::size_of::<usize>() * 8) as u32;
        if self.integersize != host_word_bits {
            return Err(EsaError::IndexIncompatible(format!(
                "index built for {}-bit words, host is {}-bit",
                self.integersize, host_word_bits
            )));
        }
        let host_little = cfg!(target_endian = "little");
        if self.littleendian != host_little {
            return Err(EsaError::IndexIncompatible(
                "index endianness does not match host".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_prj() -> String {
        "totallength=10\n\
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
integersize=64\n\
littleendian=1\n\
readmode=0\n\
dbfile=seq1.fasta 10 10\n"
            .to_string()
    }

    #[test]
    fn parses_minimal_manifest() {
        let m = Manifest::parse("x.prj", &minimal_prj()).unwrap();
        assert_eq!(m.totallength, 10);
        assert_eq!(m.integersize, 64);
        assert!(m.littleendian);
        assert_eq!(m.readmode, ReadMode::Forward);
        assert_eq!(m.dbfiles.len(), 1);
        assert_eq!(m.dbfiles[0].name, "seq1.fasta");
    }

    #[test]
    fn missing_key_is_bad_manifest() {
        let content = minimal_prj().replace("totallength=10\n", "");
        let err = Manifest::parse("x.prj", &content).unwrap_err();
        assert!(matches!(err, EsaError::BadManifest { .. }));
    }

    #[test]
    fn bad_readmode_is_rejected() {
        let content = minimal_prj().replace("readmode=0", "readmode=9");
        let err = Manifest::parse("x.prj", &content).unwrap_err();
        assert!(matches!(err, EsaError::BadManifest { .. }));
    }

    #[test]
    fn unrecognized_key_is_rejected() {
        let mut content = minimal_prj();
        content.push_str("bogus=1\n");
        assert!(Manifest::parse("x.prj", &content).is_err());
    }
}
