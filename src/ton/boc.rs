//! TON cell construction and bag-of-cells serialization
//!
//! Wallet external messages are trees of cells: bit strings of up to
//! 1023 bits with up to four references. We assemble them with a
//! bit-level builder, hash them with the standard representation hash
//! (which is what gets signed), and serialize the tree into the
//! `b5ee9c72` bag-of-cells container accepted by the RPC provider.
//! Implemented by hand rather than through a chain SDK; the message
//! shapes we emit are small fixed trees.

use std::collections::HashMap;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::ton::address::TonAddress;

/// Maximum data bits in a single cell
pub const MAX_CELL_BITS: usize = 1023;
/// Maximum references from a single cell
pub const MAX_CELL_REFS: usize = 4;

/// Bag-of-cells magic prefix
const BOC_MAGIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];

/// An immutable TON cell: a bit string plus child references
#[derive(Clone, PartialEq, Eq)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl Cell {
    /// Build a data-only cell from whole bytes (used for embedded
    /// contract bytecode)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bit_len = bytes.len() * 8;
        if bit_len > MAX_CELL_BITS {
            return Err(Error::Serialization(format!(
                "cell data of {} bits exceeds {} bit limit",
                bit_len, MAX_CELL_BITS
            )));
        }
        Ok(Self {
            data: bytes.to_vec(),
            bit_len,
            refs: Vec::new(),
        })
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn refs(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    /// Depth of the cell tree below this cell
    pub fn depth(&self) -> u16 {
        self.refs
            .iter()
            .map(|r| r.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Standard representation hash; this is the value that gets
    /// ed25519-signed and the transaction handle reported to callers
    pub fn repr_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.descriptors());
        hasher.update(self.augmented_data());
        for child in &self.refs {
            hasher.update(child.depth().to_be_bytes());
        }
        for child in &self.refs {
            hasher.update(child.repr_hash());
        }
        hasher.finalize().into()
    }

    /// The two descriptor bytes: reference count and data length
    fn descriptors(&self) -> [u8; 2] {
        let d1 = self.refs.len() as u8;
        let d2 = (self.bit_len / 8 + (self.bit_len + 7) / 8) as u8;
        [d1, d2]
    }

    /// Cell data with the completion tag applied when the bit length
    /// is not byte-aligned
    fn augmented_data(&self) -> Vec<u8> {
        let mut data = self.data.clone();
        if self.bit_len % 8 != 0 {
            data[self.bit_len / 8] |= 0x80 >> (self.bit_len % 8);
        }
        data
    }
}

impl std::fmt::Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cell({} bits, {} refs)", self.bit_len, self.refs.len())
    }
}

/// Bit-level builder for a single cell
#[derive(Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self> {
        if self.bit_len >= MAX_CELL_BITS {
            return Err(Error::Serialization(format!(
                "cell overflow at {} bits",
                MAX_CELL_BITS
            )));
        }
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            self.data[self.bit_len / 8] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
        Ok(self)
    }

    /// Store the low `bits` bits of `value`, most significant first
    pub fn store_uint(&mut self, value: u64, bits: u32) -> Result<&mut Self> {
        debug_assert!(bits <= 64);
        for i in (0..bits).rev() {
            self.store_bit((value >> i) & 1 == 1)?;
        }
        Ok(self)
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self> {
        for &byte in bytes {
            self.store_uint(byte as u64, 8)?;
        }
        Ok(self)
    }

    /// Variable-length coin amount: 4-bit byte count, then the value
    pub fn store_coins(&mut self, nano: u64) -> Result<&mut Self> {
        if nano == 0 {
            return self.store_uint(0, 4);
        }
        let byte_len = (64 - nano.leading_zeros()).div_ceil(8);
        self.store_uint(byte_len as u64, 4)?;
        self.store_uint(nano, byte_len * 8)
    }

    /// `MsgAddress`: `addr_none` for `None`, `addr_std` (no anycast)
    /// for `Some`
    pub fn store_address(&mut self, address: Option<&TonAddress>) -> Result<&mut Self> {
        match address {
            None => self.store_uint(0b00, 2),
            Some(addr) => {
                self.store_uint(0b100, 3)?;
                self.store_uint(addr.workchain() as u8 as u64, 8)?;
                self.store_bytes(addr.hash())
            }
        }
    }

    pub fn store_ref(&mut self, cell: Cell) -> Result<&mut Self> {
        if self.refs.len() >= MAX_CELL_REFS {
            return Err(Error::Serialization(format!(
                "cell reference overflow at {} refs",
                MAX_CELL_REFS
            )));
        }
        self.refs.push(Arc::new(cell));
        Ok(self)
    }

    pub fn build(self) -> Cell {
        Cell {
            data: self.data,
            bit_len: self.bit_len,
            refs: self.refs,
        }
    }
}

/// Serialize a cell tree into the standard bag-of-cells container
/// (single root, no index, CRC32C appended)
pub fn serialize_boc(root: &Cell) -> Result<Vec<u8>> {
    // Parent-before-child ordering, deduplicated by hash; reference
    // indices must point forward.
    let mut order: Vec<&Cell> = Vec::new();
    let mut indices: HashMap<[u8; 32], usize> = HashMap::new();
    collect_cells(root, &mut order, &mut indices)?;

    if order.len() > u8::MAX as usize {
        return Err(Error::Serialization(format!(
            "cell tree too large for single-byte indices: {} cells",
            order.len()
        )));
    }

    let mut cells_payload = Vec::new();
    for cell in &order {
        cells_payload.extend_from_slice(&cell.descriptors());
        cells_payload.extend_from_slice(&cell.augmented_data());
        for child in &cell.refs {
            cells_payload.push(indices[&child.repr_hash()] as u8);
        }
    }

    let off_bytes: u8 = if cells_payload.len() < 256 { 1 } else { 2 };

    let mut out = Vec::with_capacity(cells_payload.len() + 16);
    out.extend_from_slice(&BOC_MAGIC);
    out.push(0x40 | 1); // has_crc32c, single-byte cell indices
    out.push(off_bytes);
    out.push(order.len() as u8); // cells
    out.push(1); // roots
    out.push(0); // absent
    if off_bytes == 1 {
        out.push(cells_payload.len() as u8);
    } else {
        out.extend_from_slice(&(cells_payload.len() as u16).to_be_bytes());
    }
    out.push(0); // root index
    out.extend_from_slice(&cells_payload);

    let crc = crc32c(&out);
    out.extend_from_slice(&crc.to_le_bytes());
    Ok(out)
}

fn collect_cells<'a>(
    cell: &'a Cell,
    order: &mut Vec<&'a Cell>,
    indices: &mut HashMap<[u8; 32], usize>,
) -> Result<()> {
    let hash = cell.repr_hash();
    if indices.contains_key(&hash) {
        return Ok(());
    }
    indices.insert(hash, order.len());
    order.push(cell);
    for child in &cell.refs {
        collect_cells(child, order, indices)?;
    }
    Ok(())
}

/// CRC32C (Castagnoli), reflected, as used by the bag-of-cells footer
fn crc32c(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0x82F6_3B78 & mask);
        }
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    #[test]
    fn test_crc32c_vector() {
        assert_eq!(crc32c(b"123456789"), 0xE306_9283);
    }

    #[test]
    fn test_builder_bit_layout() {
        let mut builder = CellBuilder::new();
        builder.store_uint(0b101, 3).unwrap();
        builder.store_uint(0xFF, 8).unwrap();
        let cell = builder.build();
        assert_eq!(cell.bit_len(), 11);
        // 101 11111 | 111 + completion tag 1 -> 0xBF 0xF1
        assert_eq!(cell.augmented_data(), vec![0xBF, 0xF1]);
    }

    #[test]
    fn test_store_coins() {
        let mut builder = CellBuilder::new();
        builder.store_coins(0).unwrap();
        assert_eq!(builder.bit_len, 4);

        let mut builder = CellBuilder::new();
        builder.store_coins(500_000_000).unwrap();
        // 500_000_000 needs 4 bytes: 4 bits length + 32 bits value
        assert_eq!(builder.bit_len, 36);
    }

    #[test]
    fn test_cell_overflow_rejected() {
        let mut builder = CellBuilder::new();
        builder.store_bytes(&[0u8; 127]).unwrap();
        builder.store_uint(0, 7).unwrap(); // 1023 bits, at the limit
        assert!(builder.store_bit(false).is_err());
    }

    #[test]
    fn test_repr_hash_distinguishes_content() {
        let a = Cell::from_bytes(&[1, 2, 3]).unwrap();
        let b = Cell::from_bytes(&[1, 2, 4]).unwrap();
        assert_eq!(a.repr_hash(), Cell::from_bytes(&[1, 2, 3]).unwrap().repr_hash());
        assert_ne!(a.repr_hash(), b.repr_hash());
    }

    #[test]
    fn test_depth_follows_refs() {
        let leaf = Cell::from_bytes(&[0]).unwrap();
        let mut builder = CellBuilder::new();
        builder.store_ref(leaf).unwrap();
        let parent = builder.build();
        assert_eq!(parent.depth(), 1);
        assert_eq!(parent.refs()[0].depth(), 0);
    }

    #[test]
    fn test_serialize_empty_cell() {
        let boc = serialize_boc(&CellBuilder::new().build()).unwrap();
        // magic, flags|size, off_bytes, cells, roots, absent, payload
        // size, root index, then the empty cell's two descriptor bytes
        let expected_prefix: [u8; 13] = [
            0xb5, 0xee, 0x9c, 0x72, 0x41, 0x01, 0x01, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00,
        ];
        assert_eq!(&boc[..13], &expected_prefix);
        assert_eq!(boc.len(), 17); // prefix + crc32c
        assert_eq!(&boc[13..], &crc32c(&boc[..13]).to_le_bytes());
        // the canonical textual prefix of every serialized bag of cells
        assert!(STANDARD.encode(&boc).starts_with("te6cck"));
    }

    #[test]
    fn test_serialize_tree_orders_parent_first() {
        let leaf = Cell::from_bytes(&[0xAA]).unwrap();
        let mut builder = CellBuilder::new();
        builder.store_uint(7, 8).unwrap();
        builder.store_ref(leaf).unwrap();
        let boc = serialize_boc(&builder.build()).unwrap();

        assert_eq!(&boc[..4], &BOC_MAGIC);
        assert_eq!(boc[6], 0x02); // two cells
        assert_eq!(boc[9], 0x07); // payload size
        // root cell: 1 ref, 1 byte data, then child index 1
        assert_eq!(&boc[11..15], &[0x01, 0x02, 0x07, 0x01]);
        // leaf cell: 0 refs, 1 byte data
        assert_eq!(&boc[15..18], &[0x00, 0x02, 0xAA]);
    }
}
