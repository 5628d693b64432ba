//! Dense table container.
//!
//! Layout (all integers big-endian):
//!
//! ```text
//! "CGTB" u32:version u32:dataset_count
//! dataset := str:name u32:attr_count attr* u64:len f64*len
//! attr    := str:name u8:tag (0 => u32:len i64*len | 1 => str)
//! str     := u32:byte_len utf8
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use cooltab_core::errors::{ErrorInfo, GridError};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::info;

use crate::assemble::DenseTable;
use crate::gridspec::ParameterAxis;

/// Leading bytes of every container.
pub const MAGIC: &[u8; 4] = b"CGTB";
/// Current container version.
pub const FORMAT_VERSION: u32 = 1;

const TAG_INTEGERS: u8 = 0;
const TAG_TEXT: u8 = 1;

/// Attribute value attached to a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    /// 8-byte signed integers.
    Integers(Vec<i64>),
    /// UTF-8 text.
    Text(String),
}

/// Named array of 8-byte floats with attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Dataset name.
    pub name: String,
    /// Attributes keyed by name.
    pub attributes: BTreeMap<String, Attribute>,
    /// Row-major values.
    pub data: Vec<f64>,
}

impl Dataset {
    fn shaped(name: impl Into<String>, dims: &[usize], data: Vec<f64>) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(
            "Dimension".to_string(),
            Attribute::Integers(dims.iter().map(|&d| d as i64).collect()),
        );
        attributes.insert(
            "Rank".to_string(),
            Attribute::Integers(vec![dims.len() as i64]),
        );
        Self {
            name: name.into(),
            attributes,
            data,
        }
    }

    /// `Dimension` attribute as sizes.
    pub fn dimension(&self) -> Option<Vec<usize>> {
        match self.attributes.get("Dimension")? {
            Attribute::Integers(values) => values.iter().map(|&v| usize::try_from(v).ok()).collect(),
            Attribute::Text(_) => None,
        }
    }

    /// `Rank` attribute.
    pub fn rank(&self) -> Option<usize> {
        match self.attributes.get("Rank")? {
            Attribute::Integers(values) => values.first().and_then(|&v| usize::try_from(v).ok()),
            Attribute::Text(_) => None,
        }
    }

    /// `Name` attribute of parameter datasets.
    pub fn source_name(&self) -> Option<&str> {
        match self.attributes.get("Name")? {
            Attribute::Text(name) => Some(name),
            Attribute::Integers(_) => None,
        }
    }
}

/// In-memory form of a dense table container.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DenseContainer {
    /// Datasets in write order.
    pub datasets: Vec<Dataset>,
}

impl DenseContainer {
    /// Lays out the sample axis, one dataset per field, then `Parameter1..K`.
    pub fn from_table(table: &DenseTable, sample_label: &str, axes: &[ParameterAxis]) -> Self {
        let mut datasets = Vec::with_capacity(1 + table.fields().len() + axes.len());
        let samples = table.sample_axis().values().to_vec();
        datasets.push(Dataset::shaped(sample_label, &[samples.len()], samples));
        let dims = table.dims();
        for field in table.fields() {
            datasets.push(Dataset::shaped(&field.name, &dims, field.data.clone()));
        }
        for (idx, axis) in axes.iter().enumerate() {
            let mut dataset =
                Dataset::shaped(format!("Parameter{}", idx + 1), &[axis.len()], axis.values.clone());
            dataset
                .attributes
                .insert("Name".to_string(), Attribute::Text(axis.name.clone()));
            datasets.push(dataset);
        }
        Self { datasets }
    }

    /// Looks a dataset up by name.
    pub fn dataset(&self, name: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|dataset| dataset.name == name)
    }

    /// Serializes the container.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&FORMAT_VERSION.to_be_bytes());
        buf.extend_from_slice(&(self.datasets.len() as u32).to_be_bytes());
        for dataset in &self.datasets {
            put_str(&mut buf, &dataset.name);
            buf.extend_from_slice(&(dataset.attributes.len() as u32).to_be_bytes());
            for (name, value) in &dataset.attributes {
                put_str(&mut buf, name);
                match value {
                    Attribute::Integers(values) => {
                        buf.push(TAG_INTEGERS);
                        buf.extend_from_slice(&(values.len() as u32).to_be_bytes());
                        for v in values {
                            buf.extend_from_slice(&v.to_be_bytes());
                        }
                    }
                    Attribute::Text(text) => {
                        buf.push(TAG_TEXT);
                        put_str(&mut buf, text);
                    }
                }
            }
            buf.extend_from_slice(&(dataset.data.len() as u64).to_be_bytes());
            for v in &dataset.data {
                buf.extend_from_slice(&v.to_be_bytes());
            }
        }
        buf
    }

    /// Parses a serialized container.
    pub fn decode(bytes: &[u8]) -> Result<Self, GridError> {
        let mut reader = Reader { bytes, pos: 0 };
        if reader.take(4)? != MAGIC {
            return Err(corrupt("container_magic", "not a dense table container"));
        }
        let version = reader.u32()?;
        if version != FORMAT_VERSION {
            return Err(GridError::Serde(
                ErrorInfo::new("container_version", "unsupported container version")
                    .with_context("version", version.to_string()),
            ));
        }
        let count = reader.u32()? as usize;
        let mut datasets = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            let name = reader.string()?;
            let attr_count = reader.u32()? as usize;
            let mut attributes = BTreeMap::new();
            for _ in 0..attr_count {
                let key = reader.string()?;
                let value = match reader.u8()? {
                    TAG_INTEGERS => {
                        let len = reader.u32()? as usize;
                        Attribute::Integers((0..len).map(|_| reader.i64()).collect::<Result<_, _>>()?)
                    }
                    TAG_TEXT => Attribute::Text(reader.string()?),
                    _ => return Err(corrupt("container_attr", "unknown attribute tag")),
                };
                attributes.insert(key, value);
            }
            let len = usize::try_from(reader.u64()?)
                .map_err(|_| corrupt("container_len", "dataset length overflows"))?;
            let data = (0..len).map(|_| reader.f64()).collect::<Result<_, _>>()?;
            datasets.push(Dataset {
                name,
                attributes,
                data,
            });
        }
        if reader.pos != bytes.len() {
            return Err(corrupt("container_trailing", "trailing bytes after last dataset"));
        }
        Ok(Self { datasets })
    }
}

fn put_str(buf: &mut Vec<u8>, text: &str) {
    buf.extend_from_slice(&(text.len() as u32).to_be_bytes());
    buf.extend_from_slice(text.as_bytes());
}

fn corrupt(code: &str, message: &str) -> GridError {
    GridError::Serde(ErrorInfo::new(code, message))
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], GridError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                GridError::Serde(
                    ErrorInfo::new("container_truncated", "unexpected end of container")
                        .with_context("offset", self.pos.to_string()),
                )
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], GridError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, GridError> {
        Ok(self.array::<1>()?[0])
    }

    fn u32(&mut self) -> Result<u32, GridError> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, GridError> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    fn i64(&mut self) -> Result<i64, GridError> {
        Ok(i64::from_be_bytes(self.array()?))
    }

    fn f64(&mut self) -> Result<f64, GridError> {
        Ok(f64::from_be_bytes(self.array()?))
    }

    fn string(&mut self) -> Result<String, GridError> {
        let len = self.u32()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec())
            .map_err(|err| GridError::Serde(ErrorInfo::new("container_utf8", err.to_string())))
    }
}

/// Writes `bytes` to a temporary file next to `path` and renames it into place.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), GridError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|err| GridError::io("output_dir", parent, err))?;
    let mut tmp = NamedTempFile::new_in(parent).map_err(|err| GridError::io("temp_create", parent, err))?;
    tmp.write_all(bytes)
        .map_err(|err| GridError::io("temp_write", tmp.path(), err))?;
    tmp.as_file()
        .sync_all()
        .map_err(|err| GridError::io("temp_sync", tmp.path(), err))?;
    tmp.persist(path)
        .map_err(|err| GridError::io("persist", path, err.error))?;
    Ok(())
}

/// Encodes the container in memory and persists it atomically at `path`.
pub fn write_dense_table(path: &Path, container: &DenseContainer) -> Result<(), GridError> {
    let bytes = container.encode();
    write_atomic(path, &bytes)?;
    info!(path = %path.display(), datasets = container.datasets.len(), bytes = bytes.len(), "wrote dense table");
    Ok(())
}

/// Reads a container written by [`write_dense_table`].
pub fn read_dense_table(path: &Path) -> Result<DenseContainer, GridError> {
    let bytes = fs::read(path).map_err(|err| GridError::io("container_read", path, err))?;
    DenseContainer::decode(&bytes).map_err(|err| match err {
        GridError::Serde(info) => GridError::Serde(info.with_path(path)),
        other => other,
    })
}
