// Entropy coder (§4.5): DC category+magnitude coding and AC
// (RRRR,SSSS)+magnitude coding against a supplied canonical Huffman table.
//
// Grounded on `rad-medica-jpegexp-rs/src/jpeg1-encoder.rs::encode_block_internal`
// (DC diff + category, AC run/category loop, ZRL/EOB handling).

use crate::bitwriter::BitWriter;
use crate::error::{EncodeError, EncodeResult};
use crate::huffman::CanonicalCodes;
use crate::transform::{ac_symbol_category, AcToken};
use crate::util::{category_of, magnitude_bits};

pub fn encode_dc(writer: &mut BitWriter, diff: i32, dc_table: &CanonicalCodes) -> EncodeResult<()> {
  let category = category_of(diff);
  let (code, len) = dc_table.code_for(category).ok_or_else(|| {
    EncodeError::InternalInvariantViolated(format!("no DC Huffman code for category {}", category))
  })?;
  writer.write_bits(code as u64, len as u32);
  if category > 0 {
    writer.write_bits(magnitude_bits(diff, category) as u64, category as u32);
  }
  Ok(())
}

pub fn encode_ac_tokens(
  writer: &mut BitWriter,
  tokens: &[AcToken],
  ac_table: &CanonicalCodes,
) -> EncodeResult<()> {
  for &token in tokens {
    let (run, category) = ac_symbol_category(token);
    let symbol = (run << 4) | category;
    let (code, len) = ac_table.code_for(symbol).ok_or_else(|| {
      EncodeError::InternalInvariantViolated(format!("no AC Huffman code for symbol 0x{:02x}", symbol))
    })?;
    writer.write_bits(code as u64, len as u32);
    if let AcToken::Value(_, value) = token {
      writer.write_bits(magnitude_bits(value, category) as u64, category as u32);
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::huffman::{huffman_table_from_symbols, MAX_CODE_LENGTH};

  fn identity_dc_table() -> CanonicalCodes {
    // One code per category 0..=11, length-limited arbitrarily: give every
    // category its own 4-bit code (16 slots, 12 used).
    let mut bits = [0u8; MAX_CODE_LENGTH];
    bits[3] = 12; // 12 codes of length 4
    let huffval: Vec<u8> = (0..12).collect();
    huffman_table_from_symbols(&bits, &huffval).unwrap()
  }

  #[test]
  fn test_encode_dc_zero_category() {
    let table = identity_dc_table();
    let mut w = BitWriter::new();
    encode_dc(&mut w, 0, &table).unwrap();
    // category 0 -> only the Huffman code bits, no magnitude bits
    assert_eq!(w.bit_len(), 4);
  }

  #[test]
  fn test_encode_dc_nonzero_adds_magnitude_bits() {
    let table = identity_dc_table();
    let mut w = BitWriter::new();
    encode_dc(&mut w, 5, &table).unwrap(); // category 3 -> 4 + 3 bits
    assert_eq!(w.bit_len(), 7);
  }

  #[test]
  fn test_encode_ac_eob_is_single_symbol() {
    let mut bits = [0u8; MAX_CODE_LENGTH];
    bits[1] = 2; // two 2-bit codes
    let huffval = vec![0x00u8, 0xF0u8]; // EOB, ZRL
    let table = huffman_table_from_symbols(&bits, &huffval).unwrap();
    let mut w = BitWriter::new();
    encode_ac_tokens(&mut w, &[AcToken::Eob], &table).unwrap();
    assert_eq!(w.bit_len(), 2);
  }
}
