use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use prost::Message;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::masked_crc;
use crate::meta_graph;
use crate::proto::tensorflow as pb;
use crate::table::Table;
use crate::shape;
use crate::tensor::{dtype_name, element_size, DataType, Tensor};
use crate::writer::{self, BUNDLE_VERSION, HEADER_ENTRY_KEY};

/// Reads the tensors stored in a checkpoint bundle.
///
/// The whole bundle is loaded into memory when the reader is created.
#[derive(Debug)]
pub struct CheckpointReader {
    prefix: Option<PathBuf>,
    header: pb::BundleHeaderProto,
    entries: BTreeMap<String, pb::BundleEntryProto>,
    shards: Vec<Vec<u8>>,
    variables: Vec<String>,
}

impl CheckpointReader {
    /// Opens the bundle at `prefix`, e.g. `tensorflow/simple/model.ckpt`.
    /// The `.meta` file is optional.
    pub fn open(prefix: impl AsRef<Path>) -> Result<Self> {
        let prefix = prefix.as_ref();
        let index = fs::read(writer::index_path(prefix))?;
        let (header, entries) = decode_index(&index)?;

        let mut shards = Vec::new();
        for shard in 0..header.num_shards {
            shards.push(fs::read(writer::data_path(prefix, shard, header.num_shards))?);
        }

        let meta_path = writer::meta_path(prefix);
        let variables = if meta_path.is_file() {
            meta_graph::variable_names(&meta_graph::decode(&fs::read(&meta_path)?)?)?
        } else {
            Vec::new()
        };

        info!(
            prefix = %prefix.display(),
            tensors = entries.len(),
            shards = shards.len(),
            "opened checkpoint"
        );
        Ok(Self {
            prefix: Some(prefix.to_path_buf()),
            header,
            entries,
            shards,
            variables,
        })
    }

    /// Decodes a bundle from memory: the index file, each data shard in
    /// order, and optionally the meta graph.
    pub fn from_bytes(index: &[u8], shards: Vec<Vec<u8>>, meta: Option<&[u8]>) -> Result<Self> {
        let (header, entries) = decode_index(index)?;
        if shards.len() != header.num_shards as usize {
            return Err(Error::CorruptTable(format!(
                "header names {} shards, got {}",
                header.num_shards,
                shards.len()
            )));
        }
        let variables = match meta {
            Some(bytes) => meta_graph::variable_names(&meta_graph::decode(bytes)?)?,
            None => Vec::new(),
        };
        Ok(Self {
            prefix: None,
            header,
            entries,
            shards,
            variables,
        })
    }

    pub fn prefix(&self) -> Option<&Path> {
        self.prefix.as_deref()
    }

    pub fn header(&self) -> &pb::BundleHeaderProto {
        &self.header
    }

    /// Variable names recorded in the meta graph; empty without one.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn has_tensor(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn tensor_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn variable_to_shape_map(&self) -> BTreeMap<String, Vec<i64>> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry_dims(entry)))
            .collect()
    }

    pub fn variable_to_dtype_map(&self) -> BTreeMap<String, DataType> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry.dtype()))
            .collect()
    }

    pub fn get_tensor(&self, name: &str) -> Result<Tensor> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| Error::TensorNotFound(name.to_string()))?;
        let corrupt = |what: String| Error::CorruptTable(format!("entry {:?}: {}", name, what));

        let shard = usize::try_from(entry.shard_id)
            .ok()
            .and_then(|id| self.shards.get(id))
            .ok_or_else(|| corrupt(format!("invalid shard id {}", entry.shard_id)))?;
        let range = usize::try_from(entry.offset)
            .ok()
            .zip(usize::try_from(entry.size).ok())
            .and_then(|(start, size)| Some(start..start.checked_add(size)?))
            .filter(|r| r.end <= shard.len())
            .ok_or_else(|| {
                corrupt(format!(
                    "bytes [{}, +{}) out of range for shard of {} bytes",
                    entry.offset,
                    entry.size,
                    shard.len()
                ))
            })?;
        let content = &shard[range];

        let expected = masked_crc::unmask(entry.crc32c);
        let actual = masked_crc::crc32c(content);
        if expected != actual {
            return Err(Error::ChecksumMismatch {
                what: format!("tensor {:?}", name),
                expected,
                actual,
            });
        }

        let dims = entry_dims(entry);
        let shape = dims
            .iter()
            .map(|&d| usize::try_from(d))
            .collect::<std::result::Result<Vec<usize>, _>>()
            .map_err(|_| corrupt(format!("invalid shape {:?}", dims)))?;
        if let Some(size) = element_size(entry.dtype()) {
            let expected = shape::checked_product(shape.iter().copied())
                .and_then(|n| n.checked_mul(size))
                .ok_or_else(|| corrupt(format!("shape {:?} overflows", dims)))?;
            if expected != content.len() {
                return Err(corrupt(format!(
                    "shape {:?} needs {} bytes, entry holds {}",
                    dims,
                    expected,
                    content.len()
                )));
            }
        } else if shape::checked_product(shape.iter().copied()).is_none() {
            return Err(corrupt(format!("shape {:?} overflows", dims)));
        }
        debug!(name, dtype = dtype_name(entry.dtype()), ?shape, "read tensor");
        Tensor::from_raw(entry.dtype(), shape, content.to_vec())
    }

    /// One line per tensor: name, dtype and shape.
    pub fn debug_string(&self) -> String {
        let mut out = String::new();
        for (name, entry) in &self.entries {
            out.push_str(&format!(
                "{} ({}) {:?}\n",
                name,
                dtype_name(entry.dtype()),
                entry_dims(entry)
            ));
        }
        out
    }
}

fn entry_dims(entry: &pb::BundleEntryProto) -> Vec<i64> {
    entry
        .shape
        .as_ref()
        .map(|shape| shape.dim.iter().map(|d| d.size).collect())
        .unwrap_or_default()
}

type IndexContents = (pb::BundleHeaderProto, BTreeMap<String, pb::BundleEntryProto>);

fn decode_index(index: &[u8]) -> Result<IndexContents> {
    let table = Table::open(index)?;
    let mut header = None;
    let mut entries = BTreeMap::new();
    for (key, value) in table.entries() {
        if key.as_slice() == HEADER_ENTRY_KEY.as_bytes() {
            header = Some(pb::BundleHeaderProto::decode(value.as_slice())?);
            continue;
        }
        let name = String::from_utf8(key.clone())
            .map_err(|_| Error::CorruptTable(format!("non-utf8 tensor name {:?}", key)))?;
        entries.insert(name, pb::BundleEntryProto::decode(value.as_slice())?);
    }
    let header = header
        .ok_or_else(|| Error::CorruptTable("index has no bundle header".to_string()))?;
    check_header(&header)?;
    debug!(
        num_shards = header.num_shards,
        entries = entries.len(),
        "decoded bundle index"
    );
    Ok((header, entries))
}

fn check_header(header: &pb::BundleHeaderProto) -> Result<()> {
    if header.endianness() != pb::bundle_header_proto::Endianness::Little {
        return Err(Error::Unsupported("big-endian bundle".to_string()));
    }
    if header.num_shards < 1 {
        return Err(Error::CorruptTable(format!(
            "invalid shard count {}",
            header.num_shards
        )));
    }
    if let Some(version) = &header.version {
        if version.min_consumer > BUNDLE_VERSION {
            return Err(Error::Unsupported(format!(
                "bundle requires reader version {}, this is {}",
                version.min_consumer, BUNDLE_VERSION
            )));
        }
        if version.bad_consumers.contains(&BUNDLE_VERSION) {
            return Err(Error::Unsupported(format!(
                "bundle disallows reader version {}",
                BUNDLE_VERSION
            )));
        }
    }
    Ok(())
}
