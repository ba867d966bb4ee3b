//! Snapshot encoding and atomic file replacement
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ Header (26 bytes, little endian)                                 │
//! │   Magic: "CHKV" (4) | Version: u16 (2) | EntryCount: u64 (8)     │
//! │   BodyLen: u64 (8)  | BodyCRC: u32 (4)                           │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ Body (BodyLen bytes)                                             │
//! │   bincode(HashMap<String, Value>)                                │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Atomic Save
//! The snapshot is written to `{path}.tmp.{suffix}`, fsynced, and renamed
//! over `{path}`. A crash at any point leaves either the previous or the new
//! snapshot at `{path}`, never a partial one.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{ChestError, Result};
use crate::value::Value;

/// Magic bytes identifying a ChestKV snapshot file
pub const MAGIC: &[u8; 4] = b"CHKV";

/// Current snapshot format version
pub const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + EntryCount (8) + BodyLen (8) + BodyCRC (4)
pub const HEADER_SIZE: usize = 26;

// =============================================================================
// Encoding
// =============================================================================

/// Encode a map into a complete snapshot image (header + body)
pub fn encode(data: &HashMap<String, Value>) -> Result<Vec<u8>> {
    let body = bincode::serialize(data)
        .map_err(|e| ChestError::Serialization(format!("Failed to encode snapshot: {}", e)))?;

    let mut image = Vec::with_capacity(HEADER_SIZE + body.len());
    image.extend_from_slice(MAGIC);
    image.extend_from_slice(&VERSION.to_le_bytes());
    image.extend_from_slice(&(data.len() as u64).to_le_bytes());
    image.extend_from_slice(&(body.len() as u64).to_le_bytes());
    image.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
    image.extend_from_slice(&body);

    Ok(image)
}

/// Decode a snapshot image, validating header, checksum and value shapes
pub fn decode(bytes: &[u8]) -> Result<HashMap<String, Value>> {
    if bytes.len() < HEADER_SIZE {
        return Err(ChestError::CorruptSnapshot(format!(
            "file too short: {} bytes, header needs {}",
            bytes.len(),
            HEADER_SIZE
        )));
    }

    if &bytes[0..4] != MAGIC {
        return Err(ChestError::CorruptSnapshot("bad magic bytes".to_string()));
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != VERSION {
        return Err(ChestError::CorruptSnapshot(format!(
            "unsupported version {} (expected {})",
            version, VERSION
        )));
    }

    let entry_count = read_u64(&bytes[6..14]);
    let body_len = read_u64(&bytes[14..22]);
    let expected_crc = u32::from_le_bytes([bytes[22], bytes[23], bytes[24], bytes[25]]);

    let body = &bytes[HEADER_SIZE..];
    if body.len() as u64 != body_len {
        return Err(ChestError::CorruptSnapshot(format!(
            "body length mismatch: header says {}, file has {}",
            body_len,
            body.len()
        )));
    }

    let actual_crc = crc32fast::hash(body);
    if actual_crc != expected_crc {
        return Err(ChestError::CorruptSnapshot(format!(
            "checksum mismatch: expected {:08x}, got {:08x}",
            expected_crc, actual_crc
        )));
    }

    let data: HashMap<String, Value> = bincode::deserialize(body)
        .map_err(|e| ChestError::CorruptSnapshot(format!("undecodable body: {}", e)))?;

    if data.len() as u64 != entry_count {
        return Err(ChestError::CorruptSnapshot(format!(
            "entry count mismatch: header says {}, body has {}",
            entry_count,
            data.len()
        )));
    }

    for (key, value) in &data {
        value
            .check()
            .map_err(|e| ChestError::CorruptSnapshot(format!("key {}: {}", key, e)))?;
    }

    Ok(data)
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

// =============================================================================
// Loading
// =============================================================================

/// Load the snapshot at `path`
///
/// Returns `Ok(None)` if nothing exists there yet.
pub fn load(path: &Path) -> Result<Option<HashMap<String, Value>>> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    if metadata.is_dir() {
        return Err(ChestError::InvalidPath(path.to_path_buf()));
    }

    let bytes = fs::read(path)?;
    decode(&bytes).map(Some)
}

// =============================================================================
// Atomic Writes
// =============================================================================

/// Temporary path for a save: `{target}.tmp.{8 random hex digits}`
pub fn temp_path(target: &Path) -> PathBuf {
    let mut name: OsString = target.as_os_str().to_owned();
    name.push(format!(".tmp.{:08x}", rand::random::<u32>()));
    PathBuf::from(name)
}

/// Create a fresh temporary file (fails if one with this name exists)
pub fn create_temp(path: &Path) -> Result<File> {
    let file = OpenOptions::new().write(true).create_new(true).open(path)?;
    Ok(file)
}

/// Write a snapshot image into a temporary file and fsync it
///
/// The temporary file is removed on failure.
pub fn write_temp(file: File, path: &Path, image: &[u8]) -> Result<()> {
    let result = (|| -> Result<()> {
        let mut writer = BufWriter::new(file);
        writer.write_all(image)?;
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    })();

    if result.is_err() {
        discard_temp(path);
    }
    result
}

/// Rename a written temporary file over the target
///
/// The temporary file is removed on failure.
pub fn commit(temp: &Path, target: &Path) -> Result<()> {
    if let Err(e) = fs::rename(temp, target) {
        discard_temp(temp);
        return Err(e.into());
    }
    sync_parent_dir(target);
    Ok(())
}

/// Write `image` to `target` through a temporary file
pub fn write_atomic(target: &Path, image: &[u8]) -> Result<()> {
    let temp = temp_path(target);
    let file = create_temp(&temp)?;
    write_temp(file, &temp, image)?;
    commit(&temp, target)
}

/// Best-effort removal of a temporary file
pub fn discard_temp(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            tracing::warn!("Failed to remove temporary snapshot {}: {}", path.display(), e);
        }
    }
}

/// Persist the rename itself (directory entry) where the platform allows it
#[cfg(unix)]
fn sync_parent_dir(target: &Path) {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if let Ok(dir) = File::open(parent) {
        let _ = dir.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_target: &Path) {}
