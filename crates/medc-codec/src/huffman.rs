/*
 * Copyright (c) 2024.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Huffman entropy coding of the quantized coefficient stream
//!
//! The code is built once per frame from the symbol histogram and
//! transmitted in full inside the frame, so any complete prefix code
//! is conformant and the decoder never re-derives it. Construction is
//! deterministic, ties in the priority queue resolve by insertion
//! order so the same image encodes to the same bytes every time.
//!
//! Codewords are kept in the same shape the wire format uses, a bit
//! length and right-aligned big-endian bytes, which makes the table
//! serializer a plain copy and keeps leading zero bits of a codeword
//! intact across the round trip.
//!
//! Decoding walks a tree of arena-stored nodes addressed by index,
//! one input bit per edge.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, BTreeMap};

use crate::bitstream::{BitReader, BitWriter};
use crate::errors::{MedcDecodeErrors, MedcEncodeErrors};
use medc_core::bytestream::{ByteReader, ByteWriter};

/// A single codeword
///
/// `bits` holds `⌈length/8⌉` bytes with the codeword right-aligned,
/// exactly as the frame stores it, so a code of `"011"` is the byte
/// `0b0000_0011` with length 3.
#[derive(Clone, Eq, PartialEq)]
pub(crate) struct HuffmanCode {
    pub length: u8,
    pub bits:   Vec<u8>
}

impl HuffmanCode {
    /// Bit `index` of the codeword counting from its most significant
    /// bit
    #[inline]
    fn bit(&self, index: usize) -> u8 {
        let skip = self.bits.len() * 8 - usize::from(self.length);
        let position = skip + index;
        (self.bits[position / 8] >> (7 - (position % 8))) & 1
    }
}

impl core::fmt::Debug for HuffmanCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for i in 0..usize::from(self.length) {
            write!(f, "{}", self.bit(i))?;
        }
        Ok(())
    }
}

/// Symbol to codeword mapping for one frame
///
/// A `BTreeMap` keeps iteration sorted by symbol which makes table
/// serialization deterministic.
pub(crate) type CodeTable = BTreeMap<i16, HuffmanCode>;

/// Count how often each symbol occurs in the coefficient stream
pub(crate) fn histogram(stream: &[i16]) -> BTreeMap<i16, u64> {
    let mut frequencies = BTreeMap::new();

    for symbol in stream {
        *frequencies.entry(*symbol).or_insert(0_u64) += 1;
    }

    frequencies
}

struct TreeNode {
    symbol: Option<i16>,
    left:   usize,
    right:  usize
}

const NO_NODE: usize = usize::MAX;

/// Build a prefix code from symbol frequencies
///
/// Standard Huffman construction over a min-priority queue, the two
/// least frequent nodes merge under a fresh parent until one root
/// remains. Left edges read as `0`, right edges as `1`.
///
/// A single-symbol alphabet gets the one-bit code `0`, the empty code
/// cannot be represented on the wire.
///
/// # Returns
/// An error when a codeword would outgrow the one byte length field
/// of the serialized table, such a code has no wire representation.
pub(crate) fn build_code_table(
    frequencies: &BTreeMap<i16, u64>
) -> Result<CodeTable, MedcEncodeErrors> {
    let mut table = CodeTable::new();

    if frequencies.is_empty() {
        return Ok(table);
    }

    if frequencies.len() == 1 {
        if let Some(symbol) = frequencies.keys().next() {
            table.insert(
                *symbol,
                HuffmanCode {
                    length: 1,
                    bits:   vec![0]
                }
            );
        }
        return Ok(table);
    }

    let mut arena: Vec<TreeNode> = Vec::with_capacity(2 * frequencies.len());
    // ties resolve by arena index, i.e. insertion order
    let mut heap: BinaryHeap<Reverse<(u64, usize)>> = BinaryHeap::with_capacity(frequencies.len());

    for (symbol, frequency) in frequencies {
        heap.push(Reverse((*frequency, arena.len())));
        arena.push(TreeNode {
            symbol: Some(*symbol),
            left:   NO_NODE,
            right:  NO_NODE
        });
    }

    while heap.len() > 1 {
        let Some(Reverse((left_freq, left))) = heap.pop() else {
            break;
        };
        let Some(Reverse((right_freq, right))) = heap.pop() else {
            break;
        };

        // the root total is never compared against anything, letting
        // it saturate keeps extreme caller-supplied weights safe
        heap.push(Reverse((left_freq.saturating_add(right_freq), arena.len())));
        arena.push(TreeNode {
            symbol: None,
            left,
            right
        });
    }

    let root = arena.len() - 1;
    let mut path = Vec::new();

    assign_codes(&arena, root, &mut path, &mut table)?;

    Ok(table)
}

/// Depth first walk assigning 0 to left edges and 1 to right edges
///
/// The path is a plain bit-per-entry vector, code lengths right up to
/// the wire ceiling of [`u8::MAX`] bits survive without a fixed width
/// intermediate. A tree deeper than that ceiling is reported instead
/// of walked, its codewords could not be serialized.
fn assign_codes(
    arena: &[TreeNode], index: usize, path: &mut Vec<u8>, table: &mut CodeTable
) -> Result<(), MedcEncodeErrors> {
    let node = &arena[index];

    if let Some(symbol) = node.symbol {
        table.insert(symbol, pack_path(path));
        return Ok(());
    }

    if path.len() >= usize::from(u8::MAX) {
        return Err(MedcEncodeErrors::TooLargeOutput("huffman code length"));
    }

    path.push(0);
    assign_codes(arena, node.left, path, table)?;
    path.pop();

    path.push(1);
    assign_codes(arena, node.right, path, table)?;
    path.pop();

    Ok(())
}

/// Pack a path of single bits into a right-aligned codeword
fn pack_path(path: &[u8]) -> HuffmanCode {
    let num_bytes = path.len().div_ceil(8);
    let mut bits = vec![0_u8; num_bytes];
    let skip = num_bytes * 8 - path.len();

    for (i, bit) in path.iter().enumerate() {
        let position = skip + i;
        bits[position / 8] |= *bit << (7 - (position % 8));
    }

    HuffmanCode {
        length: path.len() as u8,
        bits
    }
}

/// Append the codeword of every symbol in `stream` to the bit writer
pub(crate) fn encode_stream(
    stream: &[i16], table: &CodeTable, writer: &mut BitWriter
) -> Result<(), MedcEncodeErrors> {
    for symbol in stream {
        let Some(code) = table.get(symbol) else {
            return Err(MedcEncodeErrors::Generic(
                "symbol stream contains a value missing from the code table"
            ));
        };

        // first a partial byte, then whole bytes, keeps any code
        // length the wire format allows
        let skip = code.bits.len() * 8 - usize::from(code.length);
        let head_bits = 8 - skip;

        writer.put_bits(head_bits as u8, u64::from(code.bits[0]));
        for byte in &code.bits[1..] {
            writer.put_bits(8, u64::from(*byte));
        }
    }

    Ok(())
}

/// Serialize the code table to its wire form
///
/// Layout: a big-endian `u16` symbol count, then per symbol a
/// big-endian `i16` value, a one byte code length and the
/// right-aligned code bytes.
pub(crate) fn serialize_code_table(table: &CodeTable) -> Result<Vec<u8>, MedcEncodeErrors> {
    if table.len() > usize::from(u16::MAX) {
        return Err(MedcEncodeErrors::TooLargeOutput("huffman table"));
    }

    let mut writer = ByteWriter::with_capacity(2 + table.len() * 4);
    writer.write_u16_be(table.len() as u16);

    for (symbol, code) in table {
        writer.write_all(&symbol.to_be_bytes());
        writer.write_u8(code.length);
        writer.write_all(&code.bits);
    }

    Ok(writer.into_inner())
}

/// Restore a code table from its wire form
///
/// The reader position after the call tells the framer where the next
/// section starts.
pub(crate) fn deserialize_code_table(
    reader: &mut ByteReader
) -> Result<CodeTable, MedcDecodeErrors> {
    let num_symbols = reader.read_u16_be()?;
    let mut table = CodeTable::new();

    for _ in 0..num_symbols {
        let symbol = i16::from_be_bytes(reader.read_fixed_bytes::<2>()?);
        let length = reader.read_u8()?;

        if length == 0 {
            return Err(MedcDecodeErrors::InvalidCode(format!(
                "zero length code for symbol {symbol}"
            )));
        }

        let bits = reader.read_slice(usize::from(length).div_ceil(8))?.to_vec();

        if table.insert(symbol, HuffmanCode { length, bits }).is_some() {
            return Err(MedcDecodeErrors::InvalidCode(format!(
                "symbol {symbol} appears twice in the code table"
            )));
        }
    }

    Ok(table)
}

#[derive(Copy, Clone)]
struct DecodeNode {
    symbol:   Option<i16>,
    children: [usize; 2]
}

/// Prefix tree rebuilt from a transmitted code table
///
/// Nodes live in a flat arena and refer to each other by index.
pub(crate) struct HuffmanTree {
    nodes: Vec<DecodeNode>
}

impl HuffmanTree {
    /// Rebuild the decoding tree from a code table
    ///
    /// Fails when the table is empty or is not a prefix code, a
    /// codeword running through or ending on another codeword has no
    /// place in a valid tree.
    pub fn from_codes(table: &CodeTable) -> Result<HuffmanTree, MedcDecodeErrors> {
        if table.is_empty() {
            return Err(MedcDecodeErrors::InvalidCode(
                "empty code table".to_string()
            ));
        }

        let mut nodes = vec![DecodeNode {
            symbol:   None,
            children: [NO_NODE; 2]
        }];

        for (symbol, code) in table {
            let mut current = 0_usize;

            for i in 0..usize::from(code.length) {
                if nodes[current].symbol.is_some() {
                    return Err(MedcDecodeErrors::InvalidCode(format!(
                        "the code for symbol {symbol} passes through another codeword"
                    )));
                }

                let branch = usize::from(code.bit(i));
                if nodes[current].children[branch] == NO_NODE {
                    nodes.push(DecodeNode {
                        symbol:   None,
                        children: [NO_NODE; 2]
                    });
                    let fresh = nodes.len() - 1;
                    nodes[current].children[branch] = fresh;
                }
                current = nodes[current].children[branch];
            }

            if nodes[current].symbol.is_some() || nodes[current].children != [NO_NODE; 2] {
                return Err(MedcDecodeErrors::InvalidCode(format!(
                    "the code for symbol {symbol} collides with another codeword"
                )));
            }
            nodes[current].symbol = Some(*symbol);
        }

        Ok(HuffmanTree { nodes })
    }

    /// Decode exactly `count` symbols from the bit reader
    ///
    /// The reader enforces the meaningful bit budget, running out of
    /// bits mid-stream means the frame promised more symbols than its
    /// payload holds.
    pub fn decode_stream(
        &self, reader: &mut BitReader, count: usize
    ) -> Result<Vec<i16>, MedcDecodeErrors> {
        let mut symbols = Vec::with_capacity(count);

        while symbols.len() < count {
            let mut current = 0_usize;

            loop {
                if let Some(symbol) = self.nodes[current].symbol {
                    symbols.push(symbol);
                    break;
                }

                let Some(bit) = reader.read_bit() else {
                    return Err(MedcDecodeErrors::DimensionMismatch(count, symbols.len()));
                };

                let next = self.nodes[current].children[usize::from(bit)];
                if next == NO_NODE {
                    return Err(MedcDecodeErrors::InvalidCode(
                        "payload bits do not lead to a codeword".to_string()
                    ));
                }
                current = next;
            }
        }

        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use nanorand::{Rng, WyRand};

    use super::{
        assign_codes, build_code_table, deserialize_code_table, encode_stream, histogram,
        serialize_code_table, CodeTable, HuffmanTree, TreeNode, NO_NODE
    };
    use crate::bitstream::{BitReader, BitWriter};
    use crate::errors::MedcEncodeErrors;
    use medc_core::bytestream::ByteReader;

    fn round_trip(stream: &[i16]) -> Vec<i16> {
        let table = build_code_table(&histogram(stream)).unwrap();
        let mut writer = BitWriter::new();

        encode_stream(stream, &table, &mut writer).unwrap();

        let num_bits = writer.bits_written() as usize;
        let payload = writer.into_bytes();

        let tree = HuffmanTree::from_codes(&table).unwrap();
        let mut reader = BitReader::new(&payload, num_bits);

        tree.decode_stream(&mut reader, stream.len()).unwrap()
    }

    #[test]
    fn single_symbol_gets_a_one_bit_code() {
        let stream = [7_i16; 64];
        let table = build_code_table(&histogram(&stream)).unwrap();

        assert_eq!(table.len(), 1);
        let code = &table[&7];
        assert_eq!(code.length, 1);
        assert_eq!(code.bits, vec![0]);

        // 64 one-bit codewords pack into exactly 8 payload bytes
        let mut writer = BitWriter::new();
        encode_stream(&stream, &table, &mut writer).unwrap();
        assert_eq!(writer.bits_written(), 64);
        assert_eq!(writer.into_bytes().len(), 8);
    }

    #[test]
    fn two_symbols_get_one_bit_each() {
        let stream: Vec<i16> = (0..100).map(|i| if i % 2 == 0 { -1 } else { 1 }).collect();
        let table = build_code_table(&histogram(&stream)).unwrap();

        assert_eq!(table.len(), 2);
        assert!(table.values().all(|code| code.length == 1));

        assert_eq!(round_trip(&stream), stream);
    }

    #[test]
    fn no_code_is_a_prefix_of_another() {
        let mut rng = WyRand::new_seed(77);
        let stream: Vec<i16> = (0..4096).map(|_| (rng.generate::<u16>() % 40) as i16).collect();

        let table = build_code_table(&histogram(&stream)).unwrap();
        let codes: Vec<String> = table.values().map(|c| format!("{c:?}")).collect();

        for (i, a) in codes.iter().enumerate() {
            for (j, b) in codes.iter().enumerate() {
                if i != j {
                    assert!(!b.starts_with(a.as_str()), "{a} is a prefix of {b}");
                }
            }
        }
    }

    #[test]
    fn skewed_streams_round_trip() {
        let mut rng = WyRand::new_seed(0xDEAD);
        let mut stream = vec![0_i16; 10_000];

        // heavy tail of zeros with occasional large outliers, the
        // shape quantized coefficient streams actually have
        for slot in stream.iter_mut() {
            let draw = rng.generate::<u16>();
            *slot = match draw % 100 {
                0 => (draw as i16).wrapping_mul(3),
                1..=9 => i16::from((draw % 17) as i8) - 8,
                _ => 0
            };
        }

        assert_eq!(round_trip(&stream), stream);
    }

    #[test]
    fn table_serialization_round_trips() {
        let mut rng = WyRand::new_seed(42);
        let stream: Vec<i16> = (0..2000).map(|_| rng.generate::<u16>() as i16).collect();

        let table = build_code_table(&histogram(&stream)).unwrap();
        let bytes = serialize_code_table(&table).unwrap();

        let mut reader = ByteReader::new(&bytes);
        let restored = deserialize_code_table(&mut reader).unwrap();

        assert_eq!(reader.remaining(), 0);
        assert_eq!(table, restored);
    }

    #[test]
    fn serialized_codes_keep_leading_zeros() {
        // "011" must survive as three bits, not shrink to "11"
        let mut frequencies = BTreeMap::new();
        frequencies.insert(-2_i16, 1_u64);
        frequencies.insert(-1_i16, 2_u64);
        frequencies.insert(0_i16, 4_u64);
        frequencies.insert(1_i16, 8_u64);

        let table = build_code_table(&frequencies).unwrap();
        let bytes = serialize_code_table(&table).unwrap();

        let mut reader = ByteReader::new(&bytes);
        let restored = deserialize_code_table(&mut reader).unwrap();

        for (symbol, code) in &table {
            assert_eq!(restored[symbol].length, code.length);
            assert_eq!(restored[symbol].bits, code.bits);
        }
    }

    #[test]
    fn truncated_budget_is_a_dimension_mismatch() {
        let stream: Vec<i16> = (0..64).map(|i| i % 5).collect();
        let table = build_code_table(&histogram(&stream)).unwrap();
        let mut writer = BitWriter::new();
        encode_stream(&stream, &table, &mut writer).unwrap();

        let num_bits = writer.bits_written() as usize;
        let payload = writer.into_bytes();

        let tree = HuffmanTree::from_codes(&table).unwrap();
        // budget for half the stream, then ask for all of it
        let mut reader = BitReader::new(&payload, num_bits / 2);
        let err = tree.decode_stream(&mut reader, stream.len()).unwrap_err();

        assert!(matches!(
            err,
            crate::errors::MedcDecodeErrors::DimensionMismatch(64, _)
        ));
    }

    #[test]
    fn empty_table_is_rejected() {
        let table = super::CodeTable::new();
        assert!(HuffmanTree::from_codes(&table).is_err());
    }

    #[test]
    fn fibonacci_weights_stretch_codes_past_64_bits() {
        // Fibonacci frequencies are the worst case for code length,
        // every merge chains onto the previous one. 92 of them are
        // the most a u64 histogram can hold and give a 91 bit code.
        let mut frequencies = BTreeMap::new();
        let (mut current, mut next) = (1_u64, 1_u64);

        for symbol in 0..92_i16 {
            frequencies.insert(symbol, current);
            let sum = current.saturating_add(next);
            current = next;
            next = sum;
        }

        let table = build_code_table(&frequencies).unwrap();

        let longest = table.values().map(|code| code.length).max().unwrap();
        let shortest = table.values().map(|code| code.length).min().unwrap();
        assert_eq!(longest, 91);
        assert_eq!(shortest, 1);

        // the long codewords survive the wire and still decode
        let bytes = serialize_code_table(&table).unwrap();
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(deserialize_code_table(&mut reader).unwrap(), table);

        let stream = [0_i16, 45, 91];
        let mut writer = BitWriter::new();
        encode_stream(&stream, &table, &mut writer).unwrap();

        let num_bits = writer.bits_written() as usize;
        let payload = writer.into_bytes();

        let tree = HuffmanTree::from_codes(&table).unwrap();
        let mut bits = BitReader::new(&payload, num_bits);
        assert_eq!(tree.decode_stream(&mut bits, stream.len()).unwrap(), stream);
    }

    #[test]
    fn trees_deeper_than_the_length_field_are_rejected() {
        // the caterpillar a Fibonacci-weighted alphabet degenerates
        // into, grown past the 255 bit ceiling of the one byte length
        // field, one leaf hanging off every internal node
        let mut arena = vec![TreeNode {
            symbol: Some(0),
            left:   NO_NODE,
            right:  NO_NODE
        }];
        let mut root = 0_usize;

        for symbol in 1..=300_i16 {
            arena.push(TreeNode {
                symbol: Some(symbol),
                left:   NO_NODE,
                right:  NO_NODE
            });
            let leaf = arena.len() - 1;

            arena.push(TreeNode {
                symbol: None,
                left:   root,
                right:  leaf
            });
            root = arena.len() - 1;
        }

        let mut table = CodeTable::new();
        let mut path = Vec::new();

        let err = assign_codes(&arena, root, &mut path, &mut table).unwrap_err();
        assert!(matches!(
            err,
            MedcEncodeErrors::TooLargeOutput("huffman code length")
        ));
    }
}
