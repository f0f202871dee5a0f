// Huffman code generation (§4.4): canonical codes from BITS+HUFFVAL
// (T.81 Annex C), and training a length-limited code from a symbol
// histogram (T.81 Annex K "adjust_bits").
//
// Grounded on `rad-medica-jpegexp-rs/src/jpeg1-encoder.rs`'s
// `HuffmanTable`/`HuffmanEncoder` usage, and
// `SilverlightningY-dmmt-jpeg-encoder`'s `create_huffman_lenght_header`/
// `SymbolCodeLength` shape for the length-then-symbols table layout.

use std::collections::HashMap;

use crate::error::{EncodeError, EncodeResult};

pub const MAX_CODE_LENGTH: usize = 16;

// A symbol -> (code, length) map plus the canonical BITS/HUFFVAL pair it
// was built from, so a `JpegStillEncoder` can both entropy-code with it and
// emit the DHT segment for it.
#[derive(Debug, Clone)]
pub struct CanonicalCodes {
  pub bits: [u8; MAX_CODE_LENGTH],
  pub huffval: Vec<u8>,
  codes: HashMap<u8, (u16, u8)>, // symbol -> (code, length)
}

impl CanonicalCodes {
  pub fn code_for(&self, symbol: u8) -> Option<(u16, u8)> {
    self.codes.get(&symbol).copied()
  }

  pub fn symbol_count(&self) -> usize {
    self.huffval.len()
  }
}

// T.81 Annex C.2: build canonical codes from BITS[1..16] and HUFFVAL.
pub fn huffman_table_from_symbols(
  bits: &[u8; MAX_CODE_LENGTH],
  huffval: &[u8],
) -> EncodeResult<CanonicalCodes> {
  let total: usize = bits.iter().map(|&b| b as usize).sum();
  if total != huffval.len() {
    return Err(EncodeError::InternalInvariantViolated(format!(
      "BITS total {} does not match HUFFVAL length {}",
      total,
      huffval.len()
    )));
  }

  // HUFFSIZE: flat list of code lengths, one per symbol in HUFFVAL order.
  let mut huffsize = Vec::with_capacity(huffval.len());
  for (len_idx, &count) in bits.iter().enumerate() {
    for _ in 0..count {
      huffsize.push((len_idx + 1) as u8);
    }
  }

  // HUFFCODE: canonical code values, Annex C Figure C.2.
  let mut huffcode = Vec::with_capacity(huffsize.len());
  let mut code: u32 = 0;
  let mut si = huffsize.first().copied().unwrap_or(0);
  let mut k = 0usize;
  while k < huffsize.len() {
    while k < huffsize.len() && huffsize[k] == si {
      huffcode.push(code);
      code += 1;
      k += 1;
    }
    code <<= 1;
    si += 1;
  }

  for (i, &len) in huffsize.iter().enumerate() {
    if len as usize > MAX_CODE_LENGTH {
      return Err(EncodeError::InternalInvariantViolated(format!(
        "code length {} exceeds {} bits",
        len, MAX_CODE_LENGTH
      )));
    }
    let c = huffcode[i];
    let all_ones = (1u32 << len) - 1;
    if c == all_ones {
      return Err(EncodeError::InternalInvariantViolated(
        "all-ones codeword assigned".to_string(),
      ));
    }
  }

  let mut codes = HashMap::with_capacity(huffval.len());
  for (i, &sym) in huffval.iter().enumerate() {
    codes.insert(sym, (huffcode[i] as u16, huffsize[i]));
  }

  Ok(CanonicalCodes {
    bits: *bits,
    huffval: huffval.to_vec(),
    codes,
  })
}

// Train BITS+HUFFVAL from a symbol histogram, §4.4 step "From data".
//
// Builds a package-merge-free but Annex-K-compatible Huffman tree over the
// observed symbols plus one reserved sentinel symbol (to guarantee the
// all-ones code is never assigned, per the sentinel trick), then applies
// the Annex K "adjust_bits" length-limiting procedure.
pub fn train_huffman_table(symbols: &[u8]) -> EncodeResult<([u8; MAX_CODE_LENGTH], Vec<u8>)> {
  let mut freq: HashMap<u16, u64> = HashMap::new();
  for &s in symbols {
    *freq.entry(s as u16).or_insert(0) += 1;
  }
  if freq.is_empty() {
    // No symbols at all: still produce a minimal valid table containing
    // just the sentinel so the DHT segment is well-formed.
    freq.insert(0, 1);
  }

  // Reserved sentinel: a value outside the u8 symbol range (256) so it can
  // never collide with a real symbol, guaranteeing a leaf survives to soak
  // up the all-ones code if length-limiting would otherwise assign it.
  const SENTINEL: u16 = 256;
  freq.insert(SENTINEL, 1);

  let code_lengths = build_huffman_lengths(&freq);

  // Reduce to a counts-per-length histogram and run Annex K's length
  // limiting on the counts; the specific symbol-to-length reassignment is
  // then reconstructed by redistributing symbols (sorted by their original
  // tree depth, i.e. roughly by descending frequency) across the adjusted
  // length buckets in order. This preserves the Kraft-sum validity the
  // adjust_bits procedure guarantees without needing to track which exact
  // leaf the tree-balancing step promoted or demoted.
  let mut symbols_by_len: Vec<(u16, u8)> = code_lengths.into_iter().collect();
  symbols_by_len.sort_by_key(|&(sym, len)| (len, sym));

  let mut hist = [0i64; 33]; // hist[1..=32]
  for &(_, len) in &symbols_by_len {
    // A classical merge-two-smallest tree has no inherent depth cap; with
    // enough symbols it can exceed 32 before adjust_bits ever runs. Clamp
    // the histogram index only — the stable sort order above (which
    // adjust_bits and the redistribution below rely on) is unaffected.
    let len = (len as usize).min(32);
    hist[len] += 1;
  }
  adjust_bits(&mut hist);

  // BITS[i] = count of codes with length i+1, reconstructed by walking the
  // symbol list (already ordered by original length, i.e. an approximation
  // of frequency rank) and handing out the adjusted per-length quotas.
  let mut bits = [0u8; MAX_CODE_LENGTH];
  let mut final_lengths: Vec<(u16, u8)> = Vec::with_capacity(symbols_by_len.len());
  let mut sym_iter = symbols_by_len.into_iter();
  for len in 1..=MAX_CODE_LENGTH {
    let count = hist[len];
    bits[len - 1] = count as u8;
    for _ in 0..count {
      if let Some((sym, _)) = sym_iter.next() {
        final_lengths.push((sym, len as u8));
      }
    }
  }

  // HUFFVAL: symbols ordered by increasing length, ties broken by
  // increasing symbol value. Drop the sentinel from the emitted table but
  // keep the length slot it occupied (it already did its job of forcing
  // the all-ones code to be unreachable by a real symbol).
  final_lengths.sort_by_key(|&(sym, len)| (len, sym));
  let sentinel_len = final_lengths
    .iter()
    .find(|&&(s, _)| s == SENTINEL)
    .map(|&(_, l)| l)
    .unwrap();
  bits[(sentinel_len - 1) as usize] -= 1;

  let huffval: Vec<u8> = final_lengths
    .into_iter()
    .filter(|&(s, _)| s != SENTINEL)
    .map(|(s, _)| s as u8)
    .collect();

  Ok((bits, huffval))
}

// T.81 Annex K "adjust_bits": cap code lengths at 16 bits by repeatedly
// borrowing two codes from the longest overlong length, promoting one to
// length-1 and demoting two codes of the next shorter used length. Operates
// purely on the per-length counts histogram (`hist[1..=32]`).
fn adjust_bits(hist: &mut [i64; 33]) {
  for i in (17..=32).rev() {
    while hist[i] > 0 {
      let mut j = i - 2;
      while hist[j] == 0 {
        j -= 1;
      }
      hist[i] -= 2;
      hist[i - 1] += 1;
      hist[j + 1] += 2;
      hist[j] -= 1;
    }
  }
}

// Build a Huffman-optimal length assignment via the classic
// frequency-sorted binary-merge algorithm (equivalent to a binary Huffman
// tree's leaf depths).
#[derive(Clone)]
enum Node {
  Leaf(u16),
  Internal(Box<Node>, Box<Node>),
}

fn build_huffman_lengths(freq: &HashMap<u16, u64>) -> HashMap<u16, u8> {
  let mut heap: Vec<(u64, usize, Node)> = freq
    .iter()
    .map(|(&s, &f)| (f, s as usize, Node::Leaf(s)))
    .collect();
  // Repeated extract-min over a Vec; symbol counts here are small
  // (<=257 in the DC/AC symbol space) so this is plenty fast.
  let mut next_id = heap.len();
  while heap.len() > 1 {
    heap.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
    let (f0, _, n0) = heap.remove(0);
    let (f1, _, n1) = heap.remove(0);
    heap.push((f0 + f1, next_id, Node::Internal(Box::new(n0), Box::new(n1))));
    next_id += 1;
  }

  let mut lengths = HashMap::new();
  if let Some((_, _, root)) = heap.into_iter().next() {
    assign_depths(&root, 0, &mut lengths);
  }
  lengths
}

fn assign_depths(node: &Node, depth: u8, out: &mut HashMap<u16, u8>) {
  match node {
    Node::Leaf(sym) => {
      // A tree with a single symbol still needs a 1-bit code.
      out.insert(*sym, depth.max(1));
    }
    Node::Internal(left, right) => {
      assign_depths(left, depth + 1, out);
      assign_depths(right, depth + 1, out);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_canonical_codes_no_prefix_collision() {
    let bits = [0u8; MAX_CODE_LENGTH];
    let mut bits = bits;
    bits[0] = 2; // two 1-bit codes would be invalid (only 2 possible and
                 // one must not be all-ones) -- use length 2 instead
    bits[0] = 0;
    bits[1] = 4;
    let huffval = vec![1, 2, 3, 4];
    let table = huffman_table_from_symbols(&bits, &huffval).unwrap();
    let mut codes: Vec<(u16, u8)> = huffval.iter().map(|&s| table.code_for(s).unwrap()).collect();
    codes.sort();
    codes.dedup();
    assert_eq!(codes.len(), 4);
  }

  #[test]
  fn test_mismatched_bits_huffval_rejected() {
    let mut bits = [0u8; MAX_CODE_LENGTH];
    bits[0] = 1;
    let huffval = vec![1, 2];
    assert!(huffman_table_from_symbols(&bits, &huffval).is_err());
  }

  #[test]
  fn test_trained_table_is_canonical_and_length_limited() {
    // Heavily skewed histogram to exercise length limiting.
    let mut symbols = Vec::new();
    for v in 0u8..20 {
      let count = 1u32 << (v.min(12));
      symbols.extend(std::iter::repeat(v).take(count as usize));
    }
    let (bits, huffval) = train_huffman_table(&symbols).unwrap();
    assert!(bits.iter().map(|&b| b as usize).sum::<usize>() == huffval.len());
    let table = huffman_table_from_symbols(&bits, &huffval).unwrap();
    let mut codes: Vec<(u16, u8)> = huffval.iter().map(|&s| table.code_for(s).unwrap()).collect();
    codes.sort();
    codes.dedup();
    assert_eq!(codes.len(), huffval.len());
    for &(_, len) in &codes {
      assert!(len as usize <= MAX_CODE_LENGTH);
    }
  }

  #[test]
  fn test_trained_table_single_symbol() {
    let symbols = vec![5u8; 10];
    let (bits, huffval) = train_huffman_table(&symbols).unwrap();
    assert!(huffman_table_from_symbols(&bits, &huffval).is_ok());
    assert!(huffval.contains(&5));
  }
}
