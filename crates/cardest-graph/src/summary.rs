//! Persisted estimator summaries.
//!
//! A summary is an algorithm-defined statistic built once at summarize
//! time and loaded once per query-mode process. The file name encodes
//! the key `(dataset, method, parameter, seed)` as
//! `{dataPath}.{method}[.p{ratio}|.b{budget}].s{seed}` — external
//! orchestration scripts depend on this exact shape, so the ratio tag
//! reproduces the command-line spelling verbatim.
//!
//! On disk: magic `CSUM`, the method name, a bincode payload, and a
//! crc32 trailer. A missing file is [`Error::SummaryNotFound`];
//! anything undecodable is [`Error::SummaryCorrupt`].

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use cardest_common::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

const MAGIC: &[u8; 4] = b"CSUM";

/// The build parameter of a summary, as it appears in the file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryParam {
    /// Sampling ratio, kept in its command-line spelling (`.p{ratio}`).
    Ratio(String),
    /// Memory budget for sketch methods (`.b{budget}`).
    Budget(u64),
}

impl SummaryParam {
    fn tag(&self) -> String {
        match self {
            Self::Ratio(r) => format!(".p{r}"),
            Self::Budget(b) => format!(".b{b}"),
        }
    }
}

/// Derives the summary artifact path for `(dataset, method, parameter,
/// seed)`.
#[must_use]
pub fn summary_path(
    data_path: impl AsRef<Path>,
    method: &str,
    param: &SummaryParam,
    seed: u64,
) -> PathBuf {
    let mut name = data_path.as_ref().as_os_str().to_owned();
    name.push(format!(".{method}{}.s{seed}", param.tag()));
    PathBuf::from(name)
}

/// Writes a summary payload under `path`.
pub fn write_summary<T: Serialize>(path: impl AsRef<Path>, method: &str, value: &T) -> Result<()> {
    let encoded = bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| Error::Serialization(e.to_string()))?;

    let mut payload = Vec::with_capacity(encoded.len() + method.len() + 16);
    payload.write_u32::<LittleEndian>(method.len() as u32)?;
    payload.extend_from_slice(method.as_bytes());
    payload.write_u64::<LittleEndian>(encoded.len() as u64)?;
    payload.extend_from_slice(&encoded);

    let checksum = crc32fast::hash(&payload);
    let mut out = Vec::with_capacity(MAGIC.len() + payload.len() + 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&payload);
    out.extend_from_slice(&checksum.to_le_bytes());
    fs::write(path, out)?;
    Ok(())
}

/// Loads a summary payload, verifying the method tag and checksum.
pub fn read_summary<T: DeserializeOwned>(path: impl AsRef<Path>, method: &str) -> Result<T> {
    let path = path.as_ref();
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::SummaryNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    if bytes.len() < MAGIC.len() + 4 || &bytes[..MAGIC.len()] != MAGIC {
        return Err(Error::SummaryCorrupt(format!(
            "{} is not a summary file",
            path.display()
        )));
    }
    let payload = &bytes[MAGIC.len()..bytes.len() - 4];
    let stored = u32::from_le_bytes(bytes[bytes.len() - 4..].try_into().unwrap_or_default());
    if crc32fast::hash(payload) != stored {
        return Err(Error::SummaryCorrupt("checksum mismatch".into()));
    }

    let mut cur = Cursor::new(payload);
    let method_len = cur.read_u32::<LittleEndian>()? as usize;
    let pos = cur.position() as usize;
    let stored_method = payload
        .get(pos..pos + method_len)
        .and_then(|b| std::str::from_utf8(b).ok())
        .ok_or_else(|| Error::SummaryCorrupt("bad method tag".into()))?;
    if stored_method != method {
        return Err(Error::SummaryCorrupt(format!(
            "summary was built by method '{stored_method}', not '{method}'"
        )));
    }
    cur.set_position((pos + method_len) as u64);
    let encoded_len = cur.read_u64::<LittleEndian>()? as usize;
    let pos = cur.position() as usize;
    let encoded = payload
        .get(pos..pos + encoded_len)
        .ok_or_else(|| Error::SummaryCorrupt("truncated payload".into()))?;

    let (value, _) = bincode::serde::decode_from_slice(encoded, bincode::config::standard())
        .map_err(|e| Error::SummaryCorrupt(e.to_string()))?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Fake {
        counts: Vec<u64>,
        scale: f64,
    }

    #[test]
    fn test_naming_convention() {
        let p = summary_path(
            "/data/yago.bin",
            "wj",
            &SummaryParam::Ratio("0.03".to_string()),
            7,
        );
        assert_eq!(p, PathBuf::from("/data/yago.bin.wj.p0.03.s7"));

        let p = summary_path("/data/yago.bin", "bsk", &SummaryParam::Budget(4096), 0);
        assert_eq!(p, PathBuf::from("/data/yago.bin.bsk.b4096.s0"));
    }

    #[test]
    fn test_write_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.bin.wj.p0.1.s0");
        let summary = Fake {
            counts: vec![3, 1, 4],
            scale: 0.5,
        };
        write_summary(&path, "wj", &summary).unwrap();
        let loaded: Fake = read_summary(&path, "wj").unwrap();
        assert_eq!(loaded, summary);
    }

    #[test]
    fn test_missing_is_not_found() {
        let err = read_summary::<Fake>("/nonexistent/summary", "wj").unwrap_err();
        assert!(matches!(err, Error::SummaryNotFound(_)));
    }

    #[test]
    fn test_method_mismatch_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s");
        write_summary(&path, "wj", &Fake { counts: vec![], scale: 1.0 }).unwrap();
        let err = read_summary::<Fake>(&path, "cset").unwrap_err();
        assert!(matches!(err, Error::SummaryCorrupt(_)));
    }

    #[test]
    fn test_truncated_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s");
        write_summary(&path, "wj", &Fake { counts: vec![1, 2], scale: 1.0 }).unwrap();
        let mut bytes = std::fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 3);
        std::fs::write(&path, bytes).unwrap();
        let err = read_summary::<Fake>(&path, "wj").unwrap_err();
        assert!(matches!(err, Error::SummaryCorrupt(_)));
    }

    #[test]
    fn test_deterministic_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let (p1, p2) = (dir.path().join("a"), dir.path().join("b"));
        let summary = Fake {
            counts: vec![9, 9, 9],
            scale: 0.25,
        };
        write_summary(&p1, "wj", &summary).unwrap();
        write_summary(&p2, "wj", &summary).unwrap();
        assert_eq!(std::fs::read(&p1).unwrap(), std::fs::read(&p2).unwrap());
    }
}
