use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use prost::Message;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::masked_crc;
use crate::proto::tensorflow as pb;
use crate::table::{TableBuilder, TableOptions};
use crate::tensor::Tensor;

/// Version of the bundle format produced by this crate.
pub const BUNDLE_VERSION: i32 = 1;

/// Key under which the bundle header is stored in the index.
pub const HEADER_ENTRY_KEY: &str = "";

pub fn index_path(prefix: &Path) -> PathBuf {
    append_suffix(prefix, ".index")
}

pub fn data_path(prefix: &Path, shard: i32, num_shards: i32) -> PathBuf {
    append_suffix(prefix, &format!(".data-{:05}-of-{:05}", shard, num_shards))
}

pub fn meta_path(prefix: &Path) -> PathBuf {
    append_suffix(prefix, ".meta")
}

pub(crate) fn append_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut path = prefix.as_os_str().to_owned();
    path.push(suffix);
    PathBuf::from(path)
}

fn temp_path(path: &Path) -> PathBuf {
    append_suffix(path, &format!(".tempstate{}", std::process::id()))
}

/// A file written under a temporary name. It is removed on drop unless
/// [`persist`][Self::persist] moved it into place.
pub(crate) struct TempFile {
    path: PathBuf,
    persisted: bool,
}

impl TempFile {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self {
            path,
            persisted: false,
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn persist(mut self, to: &Path) -> io::Result<()> {
        fs::rename(&self.path, to)?;
        self.persisted = true;
        Ok(())
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.persisted {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed temporary file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove temporary file"),
        }
    }
}

/// Appends raw tensor bytes to a single data shard.
pub struct DataShardWriter<W> {
    writer: W,
    offset: u64,
}

impl<W> DataShardWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, offset: 0 }
    }

    /// Bytes written so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DataShardWriter<W> {
    /// Writes the tensor's content and returns the index entry describing it.
    pub fn write_tensor(&mut self, tensor: &Tensor) -> io::Result<pb::BundleEntryProto> {
        let content = tensor.content();
        self.writer.write_all(content)?;

        let mut entry = pb::BundleEntryProto::default();
        entry.set_dtype(tensor.dtype());
        entry.shape = Some(shape_proto(tensor.shape()));
        entry.shard_id = 0;
        entry.offset = self.offset as i64;
        entry.size = content.len() as i64;
        entry.crc32c = masked_crc::masked_crc32c(content);

        self.offset += content.len() as u64;
        Ok(entry)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

pub(crate) fn shape_proto(shape: &[usize]) -> pb::TensorShapeProto {
    let mut proto = pb::TensorShapeProto::default();
    proto.dim = shape
        .iter()
        .map(|&size| {
            let mut dim = pb::tensor_shape_proto::Dim::default();
            dim.size = size as i64;
            dim
        })
        .collect();
    proto
}

pub fn bundle_header(num_shards: i32) -> pb::BundleHeaderProto {
    let mut header = pb::BundleHeaderProto::default();
    header.num_shards = num_shards;
    header.set_endianness(pb::bundle_header_proto::Endianness::Little);
    let mut version = pb::VersionDef::default();
    version.producer = BUNDLE_VERSION;
    header.version = Some(version);
    header
}

/// Writes a single-shard tensor bundle: `<prefix>.data-00000-of-00001` and
/// `<prefix>.index`.
///
/// Both files are written under temporary names and only renamed into place
/// by [`finish`][Self::finish]. Dropping the writer, or a failed `finish`,
/// removes the temporary files.
pub struct BundleWriter {
    prefix: PathBuf,
    options: TableOptions,
    data: DataShardWriter<BufWriter<File>>,
    data_tmp: TempFile,
    entries: BTreeMap<String, pb::BundleEntryProto>,
}

impl BundleWriter {
    pub fn create(prefix: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(prefix, TableOptions::default())
    }

    pub fn with_options(prefix: impl AsRef<Path>, options: TableOptions) -> Result<Self> {
        let prefix = prefix.as_ref().to_path_buf();
        let data_tmp = TempFile::new(temp_path(&data_path(&prefix, 0, 1)));
        let file = File::create(data_tmp.path())?;
        debug!(path = %data_tmp.path().display(), "opened data shard");
        Ok(Self {
            prefix,
            options,
            data: DataShardWriter::new(BufWriter::new(file)),
            data_tmp,
            entries: BTreeMap::new(),
        })
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn add(&mut self, name: &str, tensor: &Tensor) -> Result<()> {
        if name == HEADER_ENTRY_KEY {
            return Err(Error::InvalidName(name.to_string()));
        }
        if self.entries.contains_key(name) {
            return Err(Error::DuplicateName(name.to_string()));
        }
        let entry = self.data.write_tensor(tensor)?;
        debug!(
            name,
            offset = entry.offset,
            size = entry.size,
            "added tensor to bundle"
        );
        self.entries.insert(name.to_string(), entry);
        Ok(())
    }

    /// Writes the index and moves both files to their final names.
    pub fn finish(self) -> Result<()> {
        let BundleWriter {
            prefix,
            options,
            data,
            data_tmp,
            entries,
        } = self;

        let file = data
            .into_inner()
            .into_inner()
            .map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);

        let index_final = index_path(&prefix);
        let index_tmp = TempFile::new(temp_path(&index_final));
        let mut table = TableBuilder::new(BufWriter::new(File::create(index_tmp.path())?), options);
        table.add(
            HEADER_ENTRY_KEY.as_bytes(),
            &bundle_header(1).encode_to_vec(),
        )?;
        for (name, entry) in &entries {
            table.add(name.as_bytes(), &entry.encode_to_vec())?;
        }
        let (index_writer, index_size) = table.finish()?;
        index_writer
            .into_inner()
            .map_err(|e| e.into_error())?
            .sync_all()?;

        data_tmp.persist(&data_path(&prefix, 0, 1))?;
        index_tmp.persist(&index_final)?;
        info!(
            prefix = %prefix.display(),
            tensors = entries.len(),
            index_bytes = index_size,
            "wrote tensor bundle"
        );
        Ok(())
    }
}
