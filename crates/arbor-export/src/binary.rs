//! Binary encoding of tagged capsules.
//!
//! Layout (all words little-endian i64, tags 8 ASCII bytes):
//!
//! ```text
//! "ARBOREAL" version
//! "OBJECT  " class-string  field*  "DONE    "
//! field  = kind-tag name-string payload
//! string = byte-length  utf8-bytes
//! ```
//!
//! `BOOL`/`INT` payloads are one word, `FLOAT` is the f64 bit pattern,
//! `ENUM` is a string, `SAVABLE` is a nested object and `SAVABLES` is a
//! count followed by that many objects.

use std::io::{Read, Write};

use arbor_params::savable::read_record;
use arbor_params::{ParamArena, ParamId, Parameters, Savable};

use crate::capsule::{Capsule, Tagged};
use crate::config::{ExportConfig, ImportConfig};
use crate::error::ExportError;

pub const FORMAT_VERSION: i64 = 1;

const HEADER: &[u8; 8] = b"ARBOREAL";
const OBJECT: &[u8; 8] = b"OBJECT  ";
const DONE: &[u8; 8] = b"DONE    ";
const BOOL: &[u8; 8] = b"BOOL    ";
const INT: &[u8; 8] = b"INT     ";
const FLOAT: &[u8; 8] = b"FLOAT   ";
const ENUM: &[u8; 8] = b"ENUM    ";
const SAVABLE: &[u8; 8] = b"SAVABLE ";
const SAVABLES: &[u8; 8] = b"SAVABLES";

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Writes records as binary capsules.
#[derive(Debug, Clone, Default)]
pub struct BinaryExporter {
    config: ExportConfig,
}

impl BinaryExporter {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    /// An empty capsule honouring this exporter's elision setting.
    pub fn capsule(&self, class: &str) -> Capsule {
        Capsule::with_elision(class, self.config.elide_defaults)
    }

    pub fn save(&self, value: &dyn Savable) -> Result<Vec<u8>, ExportError> {
        let mut capsule = self.capsule(value.class_tag());
        value.write(&mut capsule)?;
        Ok(self.encode(&capsule))
    }

    pub fn save_to(&self, value: &dyn Savable, writer: &mut dyn Write) -> Result<(), ExportError> {
        writer.write_all(&self.save(value)?)?;
        Ok(())
    }

    /// Encode an arena record together with its parent chain.
    pub fn save_node<T: Parameters>(&self, arena: &ParamArena<T>, id: ParamId) -> Result<Vec<u8>, ExportError> {
        let mut capsule = self.capsule(T::NAME);
        arena.write_node(id, &mut capsule)?;
        Ok(self.encode(&capsule))
    }

    pub fn encode(&self, capsule: &Capsule) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(HEADER);
        put_i64(&mut out, FORMAT_VERSION);
        put_object(&mut out, capsule);
        log::debug!("encoded '{}' capsule into {} bytes", capsule.class(), out.len());
        out
    }
}

fn put_i64(out: &mut Vec<u8>, value: i64) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_string(out: &mut Vec<u8>, value: &str) {
    put_i64(out, value.len() as i64);
    out.extend_from_slice(value.as_bytes());
}

fn put_object(out: &mut Vec<u8>, capsule: &Capsule) {
    out.extend_from_slice(OBJECT);
    put_string(out, capsule.class());
    for (name, value) in capsule.fields() {
        match value {
            Tagged::Bool(v) => {
                out.extend_from_slice(BOOL);
                put_string(out, name);
                put_i64(out, *v as i64);
            }
            Tagged::Int(v) => {
                out.extend_from_slice(INT);
                put_string(out, name);
                put_i64(out, *v as i64);
            }
            Tagged::Float(v) => {
                out.extend_from_slice(FLOAT);
                put_string(out, name);
                put_i64(out, (*v as f64).to_bits() as i64);
            }
            Tagged::Enum(v) => {
                out.extend_from_slice(ENUM);
                put_string(out, name);
                put_string(out, v);
            }
            Tagged::Savable(child) => {
                out.extend_from_slice(SAVABLE);
                put_string(out, name);
                put_object(out, child);
            }
            Tagged::Savables(children) => {
                out.extend_from_slice(SAVABLES);
                put_string(out, name);
                put_i64(out, children.len() as i64);
                for child in children {
                    put_object(out, child);
                }
            }
        }
    }
    out.extend_from_slice(DONE);
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Reads binary capsules back into records.
#[derive(Debug, Clone, Default)]
pub struct BinaryImporter {
    config: ImportConfig,
}

impl BinaryImporter {
    pub fn new(config: ImportConfig) -> Self {
        Self { config }
    }

    pub fn load<T: Savable + Default>(&self, data: &[u8]) -> Result<T, ExportError> {
        let capsule = self.decode(data)?;
        Ok(read_record(&capsule)?)
    }

    pub fn load_from<T: Savable + Default>(&self, reader: &mut dyn Read) -> Result<T, ExportError> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.load(&data)
    }

    /// Decode a record and its parent chain into `arena`, returning the
    /// record's id.
    pub fn load_node<T: Parameters>(&self, arena: &mut ParamArena<T>, data: &[u8]) -> Result<ParamId, ExportError> {
        let capsule = self.decode(data)?;
        Ok(arena.read_node(&capsule)?)
    }

    pub fn decode(&self, data: &[u8]) -> Result<Capsule, ExportError> {
        let mut reader = ByteReader {
            data,
            pos: 0,
            config: &self.config,
        };

        let header = reader.read_tag()?;
        if &header != HEADER {
            return Err(ExportError::BadHeader(tag_text(&header)));
        }
        let version = reader.read_i64()?;
        if version > FORMAT_VERSION || version < 1 {
            return Err(ExportError::UnsupportedVersion(version));
        }

        let capsule = reader.read_object(0)?;
        let trailing = data.len() - reader.pos;
        if trailing > 0 {
            return Err(ExportError::TrailingBytes(trailing));
        }
        log::debug!("decoded '{}' capsule from {} bytes", capsule.class(), data.len());
        Ok(capsule)
    }
}

struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    config: &'a ImportConfig,
}

impl<'a> ByteReader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], ExportError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(ExportError::UnexpectedEof(self.data.len()))?;
        let data = self.data;
        let bytes = &data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_tag(&mut self) -> Result<[u8; 8], ExportError> {
        let mut tag = [0u8; 8];
        tag.copy_from_slice(self.take(8)?);
        Ok(tag)
    }

    fn read_i64(&mut self) -> Result<i64, ExportError> {
        Ok(i64::from_le_bytes(self.read_tag()?))
    }

    fn read_f64(&mut self) -> Result<f64, ExportError> {
        Ok(f64::from_bits(self.read_i64()? as u64))
    }

    fn read_len(&mut self, what: &str) -> Result<usize, ExportError> {
        let raw = self.read_i64()?;
        usize::try_from(raw)
            .ok()
            .filter(|&len| len <= self.config.max_length)
            .ok_or_else(|| ExportError::OutOfRange(what.to_string()))
    }

    fn read_string(&mut self) -> Result<String, ExportError> {
        let len = self.read_len("string length")?;
        let start = self.pos;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ExportError::InvalidUtf8(start))
    }

    fn read_object(&mut self, depth: usize) -> Result<Capsule, ExportError> {
        if depth > self.config.max_depth {
            return Err(ExportError::TooDeep(self.config.max_depth));
        }
        let tag = self.read_tag()?;
        if &tag != OBJECT {
            return Err(ExportError::UnexpectedTag {
                expected: "OBJECT  ",
                found: tag_text(&tag),
            });
        }
        let mut capsule = Capsule::new(self.read_string()?);

        loop {
            let kind = self.read_tag()?;
            if &kind == DONE {
                break;
            }
            let name = self.read_string()?;
            let value = match &kind {
                BOOL => Tagged::Bool(self.read_i64()? != 0),
                INT => {
                    let raw = self.read_i64()?;
                    Tagged::Int(i32::try_from(raw).map_err(|_| ExportError::OutOfRange(name.clone()))?)
                }
                FLOAT => Tagged::Float(self.read_f64()? as f32),
                ENUM => Tagged::Enum(self.read_string()?),
                SAVABLE => Tagged::Savable(self.read_object(depth + 1)?),
                SAVABLES => {
                    let count = self.read_len(&name)?;
                    // each object needs at least its two tags and class length
                    let mut children = Vec::with_capacity(count.min(self.remaining() / 24));
                    for _ in 0..count {
                        children.push(self.read_object(depth + 1)?);
                    }
                    Tagged::Savables(children)
                }
                other => return Err(ExportError::UnknownKind(tag_text(other))),
            };
            capsule.put(&name, value);
        }
        Ok(capsule)
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

fn tag_text(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}
