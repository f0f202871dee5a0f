use std::io::prelude::*;

use byteorder::WriteBytesExt;

// Write 0-8 bytes from a u64 value in big-endian order
pub fn write_be_bytes<W: Write>(w: &mut W, value: u64, nbytes: usize) {
  assert!(nbytes <= 8);
  assert!(nbytes == 8 || (value >> (8*nbytes)) == 0);

  for i in (0..nbytes).rev() {
    let byte = (value >> (8 * i)) & 0xFF;
    w.write_u8(byte as u8).unwrap();
  }
}

pub fn clamp<T: PartialOrd>(value: T, lo: T, hi: T) -> T {
  if value < lo {
    lo
  } else if value > hi {
    hi
  } else {
    value
  }
}

pub fn abs(value: i32) -> i32 {
  value.abs()
}

pub fn unsigned_abs(value: i32) -> u32 {
  value.unsigned_abs()
}

pub fn signum(value: i32) -> i32 {
  value.signum()
}

pub fn min<T: PartialOrd>(a: T, b: T) -> T {
  if a < b { a } else { b }
}

pub fn max<T: PartialOrd>(a: T, b: T) -> T {
  if a > b { a } else { b }
}

// Divide by 2^bits, rounding half away from zero
pub fn round2(value: i32, bits: u32) -> i32 {
  if bits == 0 {
    return value;
  }
  let half = 1i64 << (bits - 1);
  let v = value as i64;
  let rounded = if v >= 0 { v + half } else { v - half };
  (rounded >> bits) as i32
}

// Smallest n such that 2^n >= value (value >= 1)
pub fn ceil_log2(value: usize) -> u32 {
  if value <= 1 {
    return 0;
  }
  (usize::BITS - (value - 1).leading_zeros()) as u32
}

// JPEG "category" of a signed magnitude: ceil(log2(|v|+1))
// v=0 -> category 0
pub fn category_of(value: i32) -> u8 {
  let mut a = value.unsigned_abs();
  let mut cat = 0u8;
  while a > 0 {
    cat += 1;
    a >>= 1;
  }
  cat
}

// JPEG magnitude bits for a signed value given its category:
// v if v>=0, else (v + 2^category - 1), written in `category` bits
pub fn magnitude_bits(value: i32, category: u8) -> u32 {
  if category == 0 {
    return 0;
  }
  if value >= 0 {
    value as u32
  } else {
    (value + (1i32 << category) - 1) as u32
  }
}

// Inverse of magnitude_bits: given the coded bits and category, recover
// the signed value. Used by tests to check the category round trip.
pub fn decode_category_magnitude(bits: u32, category: u8) -> i32 {
  if category == 0 {
    return 0;
  }
  let half = 1i32 << (category - 1);
  let v = bits as i32;
  if v < half {
    v - (1i32 << category) + 1
  } else {
    v
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_category_zero() {
    assert_eq!(category_of(0), 0);
  }

  #[test]
  fn test_category_known_values() {
    assert_eq!(category_of(1), 1);
    assert_eq!(category_of(-1), 1);
    assert_eq!(category_of(3), 2);
    assert_eq!(category_of(-4), 3);
    assert_eq!(category_of(255), 8);
  }

  #[test]
  fn test_category_magnitude_round_trip() {
    for v in -2047i32..=2047 {
      let cat = category_of(v);
      let bits = magnitude_bits(v, cat);
      let back = decode_category_magnitude(bits, cat);
      assert_eq!(back, v);
    }
  }

  #[test]
  fn test_round2_half_away_from_zero() {
    assert_eq!(round2(5, 1), 3); // 2.5 -> 3
    assert_eq!(round2(-5, 1), -3);
    assert_eq!(round2(4, 1), 2);
  }

  #[test]
  fn test_ceil_log2() {
    assert_eq!(ceil_log2(1), 0);
    assert_eq!(ceil_log2(2), 1);
    assert_eq!(ceil_log2(3), 2);
    assert_eq!(ceil_log2(4), 2);
    assert_eq!(ceil_log2(5), 3);
  }
}
