//! Compiled program container.
//!
//! A compiled file is three bincode records written back to back:
//!
//! ```text
//! ┌──────────────┬──────────────┬──────────────────────────────┐
//! │ magic: u64   │ version: f64 │ program: Vec<Instruction>    │
//! └──────────────┴──────────────┴──────────────────────────────┘
//! ```
//!
//! The magic and version are validated before any instruction is decoded.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::program::Program;

/// Format tag at the start of every compiled file.
pub const MAGIC: u64 = 0x535441434b;

/// Current on-disk schema version.
pub const VERSION: f64 = 1.0;

#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("invalid file format")]
    InvalidFormat,
    #[error("invalid file version")]
    InvalidVersion { found: f64 },
    #[error("malformed program data: {0}")]
    Encoding(#[from] bincode::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

pub fn write_program<W: Write>(program: &Program, mut writer: W) -> Result<(), ContainerError> {
    bincode::serialize_into(&mut writer, &MAGIC)?;
    bincode::serialize_into(&mut writer, &VERSION)?;
    bincode::serialize_into(&mut writer, program)?;
    writer.flush()?;
    Ok(())
}

pub fn read_program<R: Read>(mut reader: R) -> Result<Program, ContainerError> {
    // A stream too short to hold the tag is not ours either
    let magic: u64 = bincode::deserialize_from(&mut reader)
        .map_err(|_| ContainerError::InvalidFormat)?;
    if magic != MAGIC {
        debug!(magic = %format!("{:#x}", magic), "magic mismatch");
        return Err(ContainerError::InvalidFormat);
    }

    let version: f64 = bincode::deserialize_from(&mut reader)
        .map_err(|_| ContainerError::InvalidVersion { found: f64::NAN })?;
    if version != VERSION {
        debug!(version, "version mismatch");
        return Err(ContainerError::InvalidVersion { found: version });
    }

    let program: Program = bincode::deserialize_from(&mut reader)?;
    Ok(program)
}

pub fn to_bytes(program: &Program) -> Result<Vec<u8>, ContainerError> {
    let mut buf = Vec::new();
    write_program(program, &mut buf)?;
    Ok(buf)
}

pub fn from_bytes(bytes: &[u8]) -> Result<Program, ContainerError> {
    read_program(bytes)
}

pub fn save(program: &Program, path: &Path) -> Result<(), ContainerError> {
    let file = File::create(path)?;
    write_program(program, BufWriter::new(file))?;
    info!(path = %path.display(), instructions = program.len(), "wrote compiled program");
    Ok(())
}

pub fn load(path: &Path) -> Result<Program, ContainerError> {
    let file = File::open(path)?;
    let program = read_program(BufReader::new(file))?;
    info!(path = %path.display(), instructions = program.len(), "loaded compiled program");
    Ok(program)
}
