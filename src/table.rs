//! Sorted string tables in the LevelDB layout, used for a bundle's `.index`.
//!
//! A table is a sequence of data blocks, an (empty) metaindex block, an
//! index block mapping the last key of each data block to its location, and
//! a fixed-size footer. Blocks are never compressed here.

use std::io::Write;

use byteorder::{ByteOrder, LittleEndian};
use prost::encoding::{decode_varint, encode_varint};
use tracing::debug;

use crate::error::{Error, Result};
use crate::masked_crc;

pub const TABLE_MAGIC: u64 = 0xdb47_7524_8b80_fb57;

const BLOCK_TRAILER_LEN: usize = 5;
const MAX_BLOCK_HANDLE_LEN: usize = 20;
pub const FOOTER_LEN: usize = 2 * MAX_BLOCK_HANDLE_LEN + 8;
const NO_COMPRESSION: u8 = 0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableOptions {
    /// Approximate size of user data packed per block, before the trailer.
    pub block_size: usize,
    /// Number of keys between restart points for delta encoding of keys.
    pub block_restart_interval: usize,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            block_size: 262_144,
            block_restart_interval: 16,
        }
    }
}

/// Location of a block within a table file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockHandle {
    pub offset: u64,
    pub size: u64,
}

impl BlockHandle {
    fn encode_to(&self, out: &mut Vec<u8>) {
        encode_varint(self.offset, out);
        encode_varint(self.size, out);
    }

    fn decode_from(buf: &mut &[u8]) -> Result<Self> {
        let offset = decode_varint(buf)?;
        let size = decode_varint(buf)?;
        Ok(Self { offset, size })
    }
}

fn put_fixed32(out: &mut Vec<u8>, value: u32) {
    let mut buf = [0u8; 4];
    LittleEndian::write_u32(&mut buf, value);
    out.extend_from_slice(&buf);
}

fn put_fixed64(out: &mut Vec<u8>, value: u64) {
    let mut buf = [0u8; 8];
    LittleEndian::write_u64(&mut buf, value);
    out.extend_from_slice(&buf);
}

fn shared_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

struct BlockBuilder {
    buffer: Vec<u8>,
    restarts: Vec<u32>,
    restart_interval: usize,
    counter: usize,
    entries: usize,
    last_key: Vec<u8>,
}

impl BlockBuilder {
    fn new(restart_interval: usize) -> Self {
        Self {
            buffer: Vec::new(),
            restarts: vec![0],
            restart_interval: restart_interval.max(1),
            counter: 0,
            entries: 0,
            last_key: Vec::new(),
        }
    }

    fn add(&mut self, key: &[u8], value: &[u8]) {
        let shared = if self.counter < self.restart_interval {
            shared_prefix_len(&self.last_key, key)
        } else {
            self.restarts.push(self.buffer.len() as u32);
            self.counter = 0;
            0
        };
        let non_shared = key.len() - shared;
        encode_varint(shared as u64, &mut self.buffer);
        encode_varint(non_shared as u64, &mut self.buffer);
        encode_varint(value.len() as u64, &mut self.buffer);
        self.buffer.extend_from_slice(&key[shared..]);
        self.buffer.extend_from_slice(value);

        self.last_key.clear();
        self.last_key.extend_from_slice(key);
        self.counter += 1;
        self.entries += 1;
    }

    fn estimated_size(&self) -> usize {
        self.buffer.len() + 4 * self.restarts.len() + 4
    }

    fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Appends the restart array and returns the block contents, leaving the
    /// builder ready for the next block.
    fn finish(&mut self) -> Vec<u8> {
        let mut contents = std::mem::take(&mut self.buffer);
        for &restart in &self.restarts {
            put_fixed32(&mut contents, restart);
        }
        put_fixed32(&mut contents, self.restarts.len() as u32);

        self.restarts = vec![0];
        self.counter = 0;
        self.entries = 0;
        self.last_key.clear();
        contents
    }
}

/// Writes a table to an output stream. Keys must be added in strictly
/// increasing bytewise order.
pub struct TableBuilder<W> {
    writer: W,
    options: TableOptions,
    offset: u64,
    data_block: BlockBuilder,
    index_block: BlockBuilder,
    last_key: Vec<u8>,
    pending_handle: Option<BlockHandle>,
    num_entries: u64,
}

impl<W> TableBuilder<W> {
    pub fn new(writer: W, options: TableOptions) -> Self {
        let data_block = BlockBuilder::new(options.block_restart_interval);
        Self {
            writer,
            options,
            offset: 0,
            data_block,
            index_block: BlockBuilder::new(1),
            last_key: Vec::new(),
            pending_handle: None,
            num_entries: 0,
        }
    }

    pub fn num_entries(&self) -> u64 {
        self.num_entries
    }
}

impl<W: Write> TableBuilder<W> {
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if self.num_entries > 0 && key <= self.last_key.as_slice() {
            return Err(Error::UnsortedKey {
                key: String::from_utf8_lossy(key).into_owned(),
                last: String::from_utf8_lossy(&self.last_key).into_owned(),
            });
        }
        self.add_pending_index_entry();

        self.data_block.add(key, value);
        self.last_key.clear();
        self.last_key.extend_from_slice(key);
        self.num_entries += 1;

        if self.data_block.estimated_size() >= self.options.block_size {
            self.flush_data_block()?;
        }
        Ok(())
    }

    // The last key of a block separates it from every key of the next one.
    fn add_pending_index_entry(&mut self) {
        if let Some(handle) = self.pending_handle.take() {
            let mut encoded = Vec::with_capacity(MAX_BLOCK_HANDLE_LEN);
            handle.encode_to(&mut encoded);
            self.index_block.add(&self.last_key, &encoded);
        }
    }

    fn flush_data_block(&mut self) -> Result<()> {
        if self.data_block.is_empty() {
            return Ok(());
        }
        let contents = self.data_block.finish();
        let handle = self.write_block(&contents)?;
        self.pending_handle = Some(handle);
        Ok(())
    }

    fn write_block(&mut self, contents: &[u8]) -> Result<BlockHandle> {
        let handle = BlockHandle {
            offset: self.offset,
            size: contents.len() as u64,
        };
        let mut trailer = [0u8; BLOCK_TRAILER_LEN];
        trailer[0] = NO_COMPRESSION;
        let crc = masked_crc::crc32c_chain(&[contents, &trailer[..1]]);
        LittleEndian::write_u32(&mut trailer[1..], masked_crc::mask(crc));

        self.writer.write_all(contents)?;
        self.writer.write_all(&trailer)?;
        self.offset += (contents.len() + BLOCK_TRAILER_LEN) as u64;
        debug!(offset = handle.offset, size = handle.size, "wrote table block");
        Ok(handle)
    }

    /// Writes the remaining blocks and the footer. Returns the underlying
    /// writer and the total file size.
    pub fn finish(mut self) -> Result<(W, u64)> {
        self.flush_data_block()?;

        let metaindex_contents = BlockBuilder::new(self.options.block_restart_interval).finish();
        let metaindex_handle = self.write_block(&metaindex_contents)?;

        self.add_pending_index_entry();
        let index_contents = self.index_block.finish();
        let index_handle = self.write_block(&index_contents)?;

        let mut footer = Vec::with_capacity(FOOTER_LEN);
        metaindex_handle.encode_to(&mut footer);
        index_handle.encode_to(&mut footer);
        footer.resize(2 * MAX_BLOCK_HANDLE_LEN, 0);
        put_fixed64(&mut footer, TABLE_MAGIC);
        self.writer.write_all(&footer)?;
        self.writer.flush()?;
        self.offset += FOOTER_LEN as u64;

        debug!(
            entries = self.num_entries,
            size = self.offset,
            "finished table"
        );
        Ok((self.writer, self.offset))
    }
}

/// A fully decoded table. Entries are kept in key order.
#[derive(Clone, Debug, Default)]
pub struct Table {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    num_data_blocks: usize,
}

impl Table {
    pub fn open(data: &[u8]) -> Result<Self> {
        if data.len() < FOOTER_LEN {
            return Err(Error::CorruptTable(format!(
                "file is too short ({} bytes) to be an sstable",
                data.len()
            )));
        }
        let footer = &data[data.len() - FOOTER_LEN..];
        if LittleEndian::read_u64(&footer[2 * MAX_BLOCK_HANDLE_LEN..]) != TABLE_MAGIC {
            return Err(Error::CorruptTable(
                "not an sstable (bad magic number)".to_string(),
            ));
        }
        let mut cursor = &footer[..2 * MAX_BLOCK_HANDLE_LEN];
        let _metaindex = BlockHandle::decode_from(&mut cursor)?;
        let index_handle = BlockHandle::decode_from(&mut cursor)?;

        let index_block = read_block(data, index_handle)?;
        let mut entries = Vec::new();
        let mut num_data_blocks = 0;
        for (_, encoded) in block_entries(index_block)? {
            let handle = BlockHandle::decode_from(&mut encoded.as_slice())?;
            let block = read_block(data, handle)?;
            entries.extend(block_entries(block)?);
            num_data_blocks += 1;
        }
        debug!(
            entries = entries.len(),
            blocks = num_data_blocks,
            "opened table"
        );
        Ok(Self {
            entries,
            num_data_blocks,
        })
    }

    pub fn entries(&self) -> &[(Vec<u8>, Vec<u8>)] {
        &self.entries
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries
            .binary_search_by(|(k, _)| k.as_slice().cmp(key))
            .ok()
            .map(|i| self.entries[i].1.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn num_data_blocks(&self) -> usize {
        self.num_data_blocks
    }
}

fn read_block(data: &[u8], handle: BlockHandle) -> Result<&[u8]> {
    let bounds = usize::try_from(handle.offset).ok().and_then(|start| {
        let end = start.checked_add(usize::try_from(handle.size).ok()?)?;
        let trailer_end = end.checked_add(BLOCK_TRAILER_LEN)?;
        Some((start, end, trailer_end))
    });
    let (start, end, trailer_end) = match bounds {
        Some(b) if b.2 <= data.len() => b,
        _ => {
            return Err(Error::CorruptTable(format!(
                "block handle {:?} is out of range for {} bytes",
                handle,
                data.len()
            )))
        }
    };
    let contents = &data[start..end];
    let trailer = &data[end..trailer_end];

    let expected = masked_crc::unmask(LittleEndian::read_u32(&trailer[1..]));
    let actual = masked_crc::crc32c_chain(&[contents, &trailer[..1]]);
    if expected != actual {
        return Err(Error::ChecksumMismatch {
            what: format!("block at offset {}", handle.offset),
            expected,
            actual,
        });
    }
    if trailer[0] != NO_COMPRESSION {
        return Err(Error::Unsupported(format!(
            "block compression type {}",
            trailer[0]
        )));
    }
    Ok(contents)
}

fn block_entries(block: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
    let corrupt = |what: &str| Error::CorruptTable(format!("bad block: {}", what));
    if block.len() < 4 {
        return Err(corrupt("too short"));
    }
    let num_restarts = LittleEndian::read_u32(&block[block.len() - 4..]) as usize;
    let restarts_len = num_restarts
        .checked_add(1)
        .and_then(|n| n.checked_mul(4))
        .filter(|&n| n <= block.len())
        .ok_or_else(|| corrupt("restart array overflows block"))?;
    let limit = block.len() - restarts_len;

    let mut entries = Vec::new();
    let mut key = Vec::new();
    let mut pos = 0;
    while pos < limit {
        let mut cursor = &block[pos..limit];
        let shared = decode_varint(&mut cursor)? as usize;
        let non_shared = decode_varint(&mut cursor)? as usize;
        let value_len = decode_varint(&mut cursor)? as usize;
        if shared > key.len() {
            return Err(corrupt("shared key prefix longer than previous key"));
        }
        let entry_len = non_shared
            .checked_add(value_len)
            .filter(|&n| n <= cursor.len())
            .ok_or_else(|| corrupt("entry runs past end of block"))?;
        key.truncate(shared);
        key.extend_from_slice(&cursor[..non_shared]);
        let value = cursor[non_shared..entry_len].to_vec();
        pos = limit - cursor.len() + entry_len;
        entries.push((key.clone(), value));
    }
    Ok(entries)
}
