// Transform coding (§4.3): level shift, 8x8 type-II DCT, quality-scaled
// quantisation, zig-zag reordering, DC differential coding, AC zero-run-
// length coding.
//
// Grounded on `nekotrix-tinyavif/src/txfm.rs` for the *shape* of a
// forward/inverse 2D separable transform pipeline (row pass, transpose,
// column pass), and on `rad-medica-jpegexp-rs/src/jpeg1-encoder.rs`
// (`ZIGZAG_ORDER`, `fdct_8x8`, `quantize_block`) for JPEG-specific constants.
// Unlike the teacher's integer AV1 butterfly transform, this is a plain
// separable float DCT-II since baseline JPEG carries no bit-exactness
// requirement against an external reference beyond determinism (SPEC_FULL §3).

use crate::error::{EncodeError, EncodeResult};
use crate::util::{category_of, clamp};

pub const BLOCK: usize = 8;

pub const ZIGZAG_ORDER: [usize; 64] = [
  0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27, 20,
  13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58, 59, 52,
  45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

// T.81 Annex K recommended luminance quantisation table, natural order.
pub const BASE_LUMINANCE_QTABLE: [u16; 64] = [
  16, 11, 10, 16, 24, 40, 51, 61, 12, 12, 14, 19, 26, 58, 60, 55, 14, 13, 16, 24, 40, 57, 69, 56,
  14, 17, 22, 29, 51, 87, 80, 62, 18, 22, 37, 56, 68, 109, 103, 77, 24, 35, 55, 64, 81, 104, 113,
  92, 49, 64, 78, 87, 103, 121, 120, 101, 72, 92, 95, 98, 112, 100, 103, 99,
];

// T.81 Annex K recommended chrominance quantisation table, natural order.
pub const BASE_CHROMINANCE_QTABLE: [u16; 64] = [
  17, 18, 24, 47, 99, 99, 99, 99, 18, 21, 26, 66, 99, 99, 99, 99, 24, 26, 56, 99, 99, 99, 99, 99,
  47, 66, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99,
  99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99,
];

// IJG quality-to-scale-factor formula, §3.
pub fn scale_for_quality(quality: u8) -> EncodeResult<u32> {
  if quality < 1 || quality > 100 {
    return Err(EncodeError::InvalidParameter(format!(
      "quality {} out of range [1,100]",
      quality
    )));
  }
  let q = quality as u32;
  Ok(if q < 50 { 5000 / q } else { 200 - 2 * q })
}

pub fn scale_quant_table(base: &[u16; 64], quality: u8) -> EncodeResult<[u8; 64]> {
  let s = scale_for_quality(quality)?;
  let mut out = [0u8; 64];
  for i in 0..64 {
    let entry = (base[i] as u32 * s + 50) / 100;
    out[i] = clamp(entry, 1, 255) as u8;
  }
  Ok(out)
}

pub type Block = [i32; 64];
pub type FBlock = [f64; 64];

fn cos_table() -> [[f64; 8]; 8] {
  let mut t = [[0.0f64; 8]; 8];
  for x in 0..8 {
    for u in 0..8 {
      t[u][x] = ((2 * x + 1) as f64 * u as f64 * std::f64::consts::PI / 16.0).cos();
    }
  }
  t
}

fn alpha(u: usize) -> f64 {
  if u == 0 {
    1.0 / (2.0f64).sqrt()
  } else {
    1.0
  }
}

// Forward 8x8 type-II DCT with conventional 1/4 normalisation, applied to a
// level-shifted (i.e. already signed) block.
pub fn fdct_8x8(input: &[i32; 64]) -> FBlock {
  let cos = cos_table();
  let mut out = [0.0f64; 64];
  for v in 0..8 {
    for u in 0..8 {
      let mut sum = 0.0f64;
      for y in 0..8 {
        for x in 0..8 {
          sum += input[y * 8 + x] as f64 * cos[u][x] * cos[v][y];
        }
      }
      out[v * 8 + u] = 0.25 * alpha(u) * alpha(v) * sum;
    }
  }
  out
}

// Inverse 8x8 type-II DCT (the type-III "IDCT"), returning rounded integer
// samples (still level-shifted, i.e. signed).
pub fn idct_8x8(coeffs: &FBlock) -> Block {
  let cos = cos_table();
  let mut out = [0i32; 64];
  for y in 0..8 {
    for x in 0..8 {
      let mut sum = 0.0f64;
      for v in 0..8 {
        for u in 0..8 {
          sum += alpha(u) * alpha(v) * coeffs[v * 8 + u] * cos[u][x] * cos[v][y];
        }
      }
      out[y * 8 + x] = (0.25 * sum).round() as i32;
    }
  }
  out
}

pub fn level_shift(samples: &[u8; 64]) -> Block {
  let mut out = [0i32; 64];
  for i in 0..64 {
    out[i] = samples[i] as i32 - 128;
  }
  out
}

pub fn inverse_level_shift(block: &Block) -> [u8; 64] {
  let mut out = [0u8; 64];
  for i in 0..64 {
    out[i] = clamp(block[i] + 128, 0, 255) as u8;
  }
  out
}

// Round-half-away-from-zero quantisation.
pub fn quantize(coeffs: &FBlock, qtable: &[u8; 64]) -> Block {
  let mut out = [0i32; 64];
  for i in 0..64 {
    let q = qtable[i] as f64;
    let v = coeffs[i] / q;
    out[i] = if v >= 0.0 {
      (v + 0.5).floor() as i32
    } else {
      (v - 0.5).ceil() as i32
    };
  }
  out
}

pub fn dequantize(block: &Block, qtable: &[u8; 64]) -> FBlock {
  let mut out = [0.0f64; 64];
  for i in 0..64 {
    out[i] = block[i] as f64 * qtable[i] as f64;
  }
  out
}

pub fn zigzag(block: &Block) -> [i32; 64] {
  let mut out = [0i32; 64];
  for (i, &src) in ZIGZAG_ORDER.iter().enumerate() {
    out[i] = block[src];
  }
  out
}

pub fn unzigzag(ordered: &[i32; 64]) -> Block {
  let mut out = [0i32; 64];
  for (i, &src) in ZIGZAG_ORDER.iter().enumerate() {
    out[src] = ordered[i];
  }
  out
}

// DC differential coding across blocks in raster order of a single channel.
pub fn dc_differentials(dcs: &[i32]) -> Vec<i32> {
  let mut out = Vec::with_capacity(dcs.len());
  let mut prev = 0i32;
  for &dc in dcs {
    out.push(dc - prev);
    prev = dc;
  }
  out
}

pub fn dc_from_differentials(diffs: &[i32]) -> Vec<i32> {
  let mut out = Vec::with_capacity(diffs.len());
  let mut prev = 0i32;
  for &d in diffs {
    prev += d;
    out.push(prev);
  }
  out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcToken {
  // (run, value) — a non-zero AC preceded by `run` zeros
  Value(u8, i32),
  // 16 zeros (RRRR=15, SSSS=0)
  Zrl,
  // end of block (RRRR=0, SSSS=0)
  Eob,
}

// Zero-run-length code the 63 AC coefficients (zig-zag indices 1..64).
pub fn run_length_code_ac(ordered: &[i32; 64]) -> Vec<AcToken> {
  let mut tokens = Vec::new();
  let mut run = 0u8;
  for &v in &ordered[1..64] {
    if v == 0 {
      run += 1;
      if run == 16 {
        tokens.push(AcToken::Zrl);
        run = 0;
      }
    } else {
      tokens.push(AcToken::Value(run, v));
      run = 0;
    }
  }
  tokens.push(AcToken::Eob);
  tokens
}

pub fn run_length_decode_ac(tokens: &[AcToken]) -> [i32; 64] {
  let mut out = [0i32; 64];
  let mut idx = 1usize;
  for t in tokens {
    match t {
      AcToken::Zrl => idx += 16,
      AcToken::Eob => break,
      AcToken::Value(run, v) => {
        idx += *run as usize;
        if idx < 64 {
          out[idx] = *v;
        }
        idx += 1;
      }
    }
  }
  out
}

pub fn ac_symbol_category(token: AcToken) -> (u8, u8) {
  // returns (RRRR, SSSS)
  match token {
    AcToken::Zrl => (15, 0),
    AcToken::Eob => (0, 0),
    AcToken::Value(run, v) => (run, category_of(v)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_zigzag_is_bijective() {
    let mut seen = [false; 64];
    for &i in ZIGZAG_ORDER.iter() {
      assert!(!seen[i]);
      seen[i] = true;
    }
    assert!(seen.iter().all(|&b| b));
  }

  #[test]
  fn test_zigzag_roundtrip() {
    let mut block = [0i32; 64];
    for i in 0..64 {
      block[i] = i as i32 - 32;
    }
    let z = zigzag(&block);
    let back = unzigzag(&z);
    assert_eq!(block, back);
  }

  #[test]
  fn test_dct_flat_block_has_only_dc() {
    let samples = [0i32; 64]; // already level-shifted flat block
    let coeffs = fdct_8x8(&samples);
    for i in 1..64 {
      assert!(coeffs[i].abs() < 1e-6, "unexpected AC energy at {}", i);
    }
  }

  #[test]
  fn test_dct_idct_roundtrip_within_rounding() {
    let mut samples = [0i32; 64];
    for i in 0..64 {
      samples[i] = ((i * 7) % 255) as i32 - 128;
    }
    let coeffs = fdct_8x8(&samples);
    let back = idct_8x8(&coeffs);
    for i in 0..64 {
      assert!((back[i] - samples[i]).abs() <= 1, "mismatch at {}", i);
    }
  }

  #[test]
  fn test_quality_1_clamps_table_to_255() {
    let q = scale_quant_table(&BASE_LUMINANCE_QTABLE, 1).unwrap();
    assert!(q.iter().all(|&v| v == 255));
  }

  #[test]
  fn test_quality_out_of_range_rejected() {
    assert!(scale_for_quality(0).is_err());
    assert!(scale_for_quality(101).is_err());
  }

  #[test]
  fn test_all_zero_ac_emits_single_eob() {
    let ordered = [0i32; 64];
    let tokens = run_length_code_ac(&ordered);
    assert_eq!(tokens, vec![AcToken::Eob]);
  }

  #[test]
  fn test_rle_roundtrip() {
    let mut ordered = [0i32; 64];
    ordered[0] = 5;
    ordered[3] = 7;
    ordered[20] = -3;
    let tokens = run_length_code_ac(&ordered);
    let decoded = run_length_decode_ac(&tokens);
    assert_eq!(decoded, ordered);
  }

  #[test]
  fn test_long_zero_run_emits_zrl() {
    let mut ordered = [0i32; 64];
    ordered[40] = 9; // 39 preceding zeros among ACs -> >=16 -> ZRL tokens
    let tokens = run_length_code_ac(&ordered);
    let zrl_count = tokens.iter().filter(|&&t| t == AcToken::Zrl).count();
    assert!(zrl_count >= 2);
    assert_eq!(*tokens.last().unwrap(), AcToken::Eob);
  }

  #[test]
  fn test_dc_differential_roundtrip() {
    let dcs = vec![10, 12, 9, 9, 20];
    let diffs = dc_differentials(&dcs);
    assert_eq!(diffs[0], 10);
    let back = dc_from_differentials(&diffs);
    assert_eq!(back, dcs);
  }
}
