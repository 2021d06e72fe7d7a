//! Binary storage for the token vector table.
//!
//! File format: vectors.bin
//!
//! Header (47 bytes):
//! - version: u8 (1)
//! - model_id: [u8; 32] (SHA256 hash of model name)
//! - dimensions: u16 (little-endian)
//! - entry_count: u64 (little-endian)
//! - checksum: u32 (CRC32 of header fields before checksum)
//!
//! Entries (repeated):
//! - token_len: u16 (little-endian)
//! - token: [u8; token_len] (UTF-8)
//! - vector: [f32; dimensions] (little-endian)

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::similarity::vectors::TokenVectors;

/// Current file format version
const FORMAT_VERSION: u8 = 1;

/// Header size in bytes: version(1) + model_id(32) + dimensions(2) + entry_count(8) + checksum(4)
const HEADER_SIZE: usize = 47;

#[derive(Debug, thiserror::Error)]
pub enum VectorStorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Version mismatch: file version {0}, supported version {1}")]
    VersionMismatch(u8, u8),

    #[error("Model mismatch: file uses different model")]
    ModelMismatch,

    #[error("Checksum mismatch: file may be corrupted")]
    ChecksumMismatch,
}

/// SHA256 of a model name, stored in the header to identify the table's origin.
pub fn model_id_hash(model_name: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(model_name.as_bytes());
    hasher.finalize().into()
}

pub struct VectorStorage {
    path: PathBuf,
}

impl VectorStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the table. When `expected_model_id` is given, a table produced by a
    /// different model is rejected with `ModelMismatch`.
    pub fn load(
        &self,
        expected_model_id: Option<&[u8; 32]>,
    ) -> Result<TokenVectors, VectorStorageError> {
        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);

        let header = read_header(&mut reader)?;
        if let Some(expected) = expected_model_id {
            if header.model_id != *expected {
                return Err(VectorStorageError::ModelMismatch);
            }
        }

        let dimensions = header.dimensions as usize;
        let mut table = TokenVectors::with_capacity(dimensions, header.entry_count as usize);

        for _ in 0..header.entry_count {
            let (token, vector) = read_entry(&mut reader, dimensions)?;
            if let Err(err) = table.insert(&token, vector) {
                log::debug!("skipping stored vector: {err}");
            }
        }

        Ok(table)
    }

    /// Save the table.
    ///
    /// Uses atomic write: temp file -> fsync -> rename
    pub fn save(&self, table: &TokenVectors, model_id: &[u8; 32]) -> Result<(), VectorStorageError> {
        if table.dimensions() > u16::MAX as usize {
            return Err(VectorStorageError::InvalidFormat(format!(
                "{} dimensions do not fit the header",
                table.dimensions()
            )));
        }

        let temp_path = self.path.with_extension("tmp");

        let result = write_to_file(&temp_path, table, model_id);
        if result.is_err() {
            let _ = std::fs::remove_file(&temp_path);
            return result;
        }

        std::fs::rename(&temp_path, &self.path)?;

        Ok(())
    }
}

fn write_to_file(
    path: &Path,
    table: &TokenVectors,
    model_id: &[u8; 32],
) -> Result<(), VectorStorageError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let header = Header {
        version: FORMAT_VERSION,
        model_id: *model_id,
        dimensions: table.dimensions() as u16,
        entry_count: table.len() as u64,
    };
    write_header(&mut writer, &header)?;

    for (token, vector) in table.iter() {
        write_entry(&mut writer, token, vector)?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;

    Ok(())
}

fn read_header<R: Read>(reader: &mut R) -> Result<Header, VectorStorageError> {
    let mut header_bytes = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header_bytes)?;

    let version = header_bytes[0];
    if version > FORMAT_VERSION {
        return Err(VectorStorageError::VersionMismatch(version, FORMAT_VERSION));
    }

    let mut model_id = [0u8; 32];
    model_id.copy_from_slice(&header_bytes[1..33]);

    let dimensions = u16::from_le_bytes([header_bytes[33], header_bytes[34]]);
    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&header_bytes[35..43]);
    let entry_count = u64::from_le_bytes(count_bytes);
    let stored_checksum = u32::from_le_bytes([
        header_bytes[43],
        header_bytes[44],
        header_bytes[45],
        header_bytes[46],
    ]);

    if stored_checksum != crc32fast::hash(&header_bytes[0..43]) {
        return Err(VectorStorageError::ChecksumMismatch);
    }

    Ok(Header {
        version,
        model_id,
        dimensions,
        entry_count,
    })
}

fn write_header<W: Write>(writer: &mut W, header: &Header) -> Result<(), VectorStorageError> {
    let mut header_bytes = [0u8; HEADER_SIZE];

    header_bytes[0] = header.version;
    header_bytes[1..33].copy_from_slice(&header.model_id);
    header_bytes[33..35].copy_from_slice(&header.dimensions.to_le_bytes());
    header_bytes[35..43].copy_from_slice(&header.entry_count.to_le_bytes());

    let checksum = crc32fast::hash(&header_bytes[0..43]);
    header_bytes[43..47].copy_from_slice(&checksum.to_le_bytes());

    writer.write_all(&header_bytes)?;
    Ok(())
}

fn read_entry<R: Read>(
    reader: &mut R,
    dimensions: usize,
) -> Result<(String, Vec<f32>), VectorStorageError> {
    let mut len_bytes = [0u8; 2];
    reader.read_exact(&mut len_bytes)?;
    let token_len = u16::from_le_bytes(len_bytes) as usize;

    let mut token_bytes = vec![0u8; token_len];
    reader.read_exact(&mut token_bytes)?;
    let token = String::from_utf8(token_bytes)
        .map_err(|e| VectorStorageError::InvalidFormat(format!("token is not utf8: {e}")))?;

    let mut vector = Vec::with_capacity(dimensions);
    for _ in 0..dimensions {
        let mut float_bytes = [0u8; 4];
        reader.read_exact(&mut float_bytes)?;
        vector.push(f32::from_le_bytes(float_bytes));
    }

    Ok((token, vector))
}

fn write_entry<W: Write>(
    writer: &mut W,
    token: &str,
    vector: &[f32],
) -> Result<(), VectorStorageError> {
    let token_len = u16::try_from(token.len()).map_err(|_| {
        VectorStorageError::InvalidFormat(format!("token too long: {} bytes", token.len()))
    })?;

    writer.write_all(&token_len.to_le_bytes())?;
    writer.write_all(token.as_bytes())?;
    for &value in vector {
        writer.write_all(&value.to_le_bytes())?;
    }

    Ok(())
}

#[derive(Debug)]
struct Header {
    version: u8,
    model_id: [u8; 32],
    dimensions: u16,
    entry_count: u64,
}
