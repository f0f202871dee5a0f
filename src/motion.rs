// Motion estimation (§4.7): block-matching between the current and
// reference Y plane, residual computation across all three channels, and
// closed-loop reconstruction.
//
// Grounded on `nekotrix-tinyavif/src/recon.rs`'s
// `dc_predict`/`compute_residual`/`quantize`/`dequantize`/`apply_residual`
// pipeline shape (predict, subtract, transform, the reverse path),
// generalized from pure intra DC prediction to motion-compensated
// prediction. The signed residual / range-mapping split mirrors
// `recon.rs`'s separation of `compute_residual` (signed) from
// `apply_residual` (re-clamped to sample range).

use crate::config::{BlockMatchAlgorithm, Config, DistortionMetric};
use crate::error::{EncodeError, EncodeResult};
use crate::subsample::{Plane, PlaneSet};
use crate::util::clamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotionVector {
  pub dx: i32,
  pub dy: i32,
}

#[derive(Debug, Clone)]
pub struct MotionVectorField {
  pub blocks_x: usize,
  pub blocks_y: usize,
  pub vectors: Vec<MotionVector>,
}

impl MotionVectorField {
  pub fn get(&self, bx: usize, by: usize) -> MotionVector {
    self.vectors[by * self.blocks_x + bx]
  }
}

// A signed residual plane, values in [-255,255] before range mapping.
#[derive(Debug, Clone)]
pub struct ResidualPlane {
  pub width: usize,
  pub height: usize,
  data: Vec<i32>,
}

impl ResidualPlane {
  pub fn new(width: usize, height: usize) -> Self {
    Self { width, height, data: vec![0; width * height] }
  }

  pub fn get(&self, x: usize, y: usize) -> i32 {
    self.data[y * self.width + x]
  }

  pub fn set(&mut self, x: usize, y: usize, value: i32) {
    self.data[y * self.width + x] = value;
  }

  // Forward affine range mapping, §9.2/§11: r' = (r+255)/2, into [0,255].
  pub fn to_mapped_plane(&self) -> Plane {
    let mut out = Plane::new(self.width, self.height);
    for y in 0..self.height {
      for x in 0..self.width {
        let r = self.get(x, y);
        let mapped = (r + 255) / 2;
        out.set(x, y, clamp(mapped, 0, 255) as u8);
      }
    }
    out
  }

  // Inverse affine range mapping: r = 2*r' - 255.
  pub fn from_mapped_plane(plane: &Plane) -> ResidualPlane {
    let mut out = ResidualPlane::new(plane.width, plane.height);
    for y in 0..plane.height {
      for x in 0..plane.width {
        let mapped = plane.get(x, y) as i32;
        out.set(x, y, 2 * mapped - 255);
      }
    }
    out
  }
}

#[derive(Debug, Clone)]
pub struct ResidualPlaneSet {
  pub y: ResidualPlane,
  pub cb: ResidualPlane,
  pub cr: ResidualPlane,
}

impl ResidualPlaneSet {
  pub fn to_mapped(&self, mode: crate::config::ChromaMode) -> PlaneSet {
    PlaneSet {
      mode,
      y: self.y.to_mapped_plane(),
      cb: self.cb.to_mapped_plane(),
      cr: self.cr.to_mapped_plane(),
    }
  }

  pub fn from_mapped(planes: &PlaneSet) -> ResidualPlaneSet {
    ResidualPlaneSet {
      y: ResidualPlane::from_mapped_plane(&planes.y),
      cb: ResidualPlane::from_mapped_plane(&planes.cb),
      cr: ResidualPlane::from_mapped_plane(&planes.cr),
    }
  }
}

fn sad(current: &Plane, reference: &Plane, x: usize, y: usize, dx: i32, dy: i32, block: usize) -> Option<i64> {
  let mut sum = 0i64;
  for by in 0..block {
    for bx in 0..block {
      let cx = x + bx;
      let cy = y + by;
      let rx = cx as i64 + dx as i64;
      let ry = cy as i64 + dy as i64;
      if rx < 0 || ry < 0 || rx as usize >= reference.width || ry as usize >= reference.height {
        return None;
      }
      let c = current.get(cx, cy) as i64;
      let r = reference.get(rx as usize, ry as usize) as i64;
      sum += (c - r).abs();
    }
  }
  Some(sum)
}

fn distortion(
  metric: DistortionMetric,
  current: &Plane,
  reference: &Plane,
  x: usize,
  y: usize,
  dx: i32,
  dy: i32,
  block: usize,
) -> Option<i64> {
  let s = sad(current, reference, x, y, dx, dy, block)?;
  Some(match metric {
    DistortionMetric::Sad => s,
    DistortionMetric::Mad => s / (block * block) as i64,
  })
}

// Tie-break rule: smaller L1 norm, then smaller dx, then smaller dy.
fn better(a: (i64, i32, i32), b: (i64, i32, i32)) -> bool {
  let (cost_a, dx_a, dy_a) = a;
  let (cost_b, dx_b, dy_b) = b;
  if cost_a != cost_b {
    return cost_a < cost_b;
  }
  let l1_a = dx_a.unsigned_abs() + dy_a.unsigned_abs();
  let l1_b = dx_b.unsigned_abs() + dy_b.unsigned_abs();
  if l1_a != l1_b {
    return l1_a < l1_b;
  }
  if dx_a != dx_b {
    return dx_a < dx_b;
  }
  dy_a < dy_b
}

fn full_search(
  current: &Plane,
  reference: &Plane,
  x: usize,
  y: usize,
  block: usize,
  search_distance: i32,
  metric: DistortionMetric,
) -> MotionVector {
  let mut best = (i64::MAX, 0i32, 0i32);
  for dy in -search_distance..=search_distance {
    for dx in -search_distance..=search_distance {
      if let Some(cost) = distortion(metric, current, reference, x, y, dx, dy, block) {
        let candidate = (cost, dx, dy);
        if better(candidate, best) {
          best = candidate;
        }
      }
    }
  }
  MotionVector { dx: best.1, dy: best.2 }
}

const LARGE_DIAMOND: [(i32, i32); 9] = [
  (0, 0),
  (0, -2),
  (1, -1),
  (2, 0),
  (1, 1),
  (0, 2),
  (-1, 1),
  (-2, 0),
  (-1, -1),
];

const SMALL_DIAMOND: [(i32, i32); 5] = [(0, 0), (0, -1), (1, 0), (0, 1), (-1, 0)];

// Large/small diamond search, with the search range reduced at the frame
// border rather than excluding out-of-range candidates outright (§4.7 edge
// handling for DSA, as distinct from FSA's exclusion). The block always
// fits inside the reference plane (`estimate_motion` requires exact
// macroblock-multiple dimensions), so the per-axis bounds below always
// satisfy min <= 0 <= max.
fn diamond_search(
  current: &Plane,
  reference: &Plane,
  x: usize,
  y: usize,
  block: usize,
  search_distance: i32,
  metric: DistortionMetric,
) -> MotionVector {
  let dx_min = (-(x as i32)).max(-search_distance);
  let dx_max = (reference.width as i32 - block as i32 - x as i32).min(search_distance);
  let dy_min = (-(y as i32)).max(-search_distance);
  let dy_max = (reference.height as i32 - block as i32 - y as i32).min(search_distance);
  let clamp_dx = |v: i32| v.clamp(dx_min, dx_max);
  let clamp_dy = |v: i32| v.clamp(dy_min, dy_max);

  let mut center = (0i32, 0i32);

  loop {
    let mut best = (i64::MAX, center.0, center.1);
    for &(ox, oy) in LARGE_DIAMOND.iter() {
      let dx = clamp_dx(center.0 + ox);
      let dy = clamp_dy(center.1 + oy);
      if let Some(cost) = distortion(metric, current, reference, x, y, dx, dy, block) {
        let candidate = (cost, dx, dy);
        if better(candidate, best) {
          best = candidate;
        }
      }
    }
    if (best.1, best.2) == center {
      let mut small_best = best;
      for &(ox, oy) in SMALL_DIAMOND.iter() {
        let dx = clamp_dx(center.0 + ox);
        let dy = clamp_dy(center.1 + oy);
        if let Some(cost) = distortion(metric, current, reference, x, y, dx, dy, block) {
          let candidate = (cost, dx, dy);
          if better(candidate, small_best) {
            small_best = candidate;
          }
        }
      }
      return MotionVector { dx: small_best.1, dy: small_best.2 };
    }
    center = (best.1, best.2);
  }
}

pub fn estimate_motion(
  current_y: &Plane,
  reference_y: &Plane,
  cfg: &Config,
) -> EncodeResult<MotionVectorField> {
  let block = cfg.macroblocksize as usize;
  if current_y.width % block != 0 || current_y.height % block != 0 {
    return Err(EncodeError::GeometryError(format!(
      "luma plane {}x{} is not a multiple of macroblock size {}",
      current_y.width, current_y.height, block
    )));
  }
  let blocks_x = current_y.width / block;
  let blocks_y = current_y.height / block;
  let mut vectors = Vec::with_capacity(blocks_x * blocks_y);

  for by in 0..blocks_y {
    for bx in 0..blocks_x {
      let x = bx * block;
      let y = by * block;
      let mv = match cfg.blockmatching {
        BlockMatchAlgorithm::Fsa => full_search(
          current_y,
          reference_y,
          x,
          y,
          block,
          cfg.blockmatchingsearchdistance as i32,
          cfg.blockmatchingdifferencecalculation,
        ),
        BlockMatchAlgorithm::Dsa => diamond_search(
          current_y,
          reference_y,
          x,
          y,
          block,
          cfg.blockmatchingsearchdistance as i32,
          cfg.blockmatchingdifferencecalculation,
        ),
      };
      vectors.push(mv);
    }
  }

  Ok(MotionVectorField { blocks_x, blocks_y, vectors })
}

// Motion vectors are expressed in luma pixels; for a subsampled chroma
// plane, scale by the chroma-to-luma ratio and truncate toward zero.
fn scale_mv_to_chroma(v: i32, ratio: usize) -> i32 {
  v / ratio as i32
}

fn motion_compensate_block(
  reference: &Plane,
  x: usize,
  y: usize,
  bw: usize,
  bh: usize,
  dx: i32,
  dy: i32,
) -> Vec<Vec<i32>> {
  let mut out = vec![vec![0i32; bw]; bh];
  for by in 0..bh {
    for bx in 0..bw {
      let rx = (x + bx) as i64 + dx as i64;
      let ry = (y + by) as i64 + dy as i64;
      let cx = rx.clamp(0, reference.width as i64 - 1) as usize;
      let cy = ry.clamp(0, reference.height as i64 - 1) as usize;
      out[by][bx] = reference.get(cx, cy) as i32;
    }
  }
  out
}

fn chroma_geometry(cfg: &Config) -> (usize, usize, usize, usize) {
  let (h_y, v_y, h_c, v_c) = cfg.subsampling.sampling_factors();
  let h_ratio = (h_y / h_c) as usize;
  let v_ratio = (v_y / v_c) as usize;
  let block = cfg.macroblocksize as usize;
  let chroma_block_x = (block / h_ratio).max(1);
  let chroma_block_y = (block / v_ratio).max(1);
  (h_ratio, v_ratio, chroma_block_x, chroma_block_y)
}

// current - motion_compensated(reference), in signed residual domain,
// §4.7. Luma uses the raw MVs at full macroblock size; chroma planes scale
// both the displacement and the block footprint by the subsampling ratio.
pub fn compute_residual(
  current: &PlaneSet,
  reference: &PlaneSet,
  mvs: &MotionVectorField,
  cfg: &Config,
) -> EncodeResult<ResidualPlaneSet> {
  let block = cfg.macroblocksize as usize;
  let (h_ratio, v_ratio, chroma_block_x, chroma_block_y) = chroma_geometry(cfg);

  let y = residual_for_channel(&current.y, &reference.y, mvs, block, block, 1, 1);
  let cb = residual_for_channel(&current.cb, &reference.cb, mvs, chroma_block_x, chroma_block_y, h_ratio, v_ratio);
  let cr = residual_for_channel(&current.cr, &reference.cr, mvs, chroma_block_x, chroma_block_y, h_ratio, v_ratio);

  Ok(ResidualPlaneSet { y, cb, cr })
}

fn residual_for_channel(
  current: &Plane,
  reference: &Plane,
  mvs: &MotionVectorField,
  bw: usize,
  bh: usize,
  h_ratio: usize,
  v_ratio: usize,
) -> ResidualPlane {
  let mut out = ResidualPlane::new(current.width, current.height);
  for by in 0..mvs.blocks_y {
    for bx in 0..mvs.blocks_x {
      let mv = mvs.get(bx, by);
      let dx = scale_mv_to_chroma(mv.dx, h_ratio);
      let dy = scale_mv_to_chroma(mv.dy, v_ratio);
      let x = bx * bw;
      let y = by * bh;
      if x >= current.width || y >= current.height {
        continue;
      }
      let comp = motion_compensate_block(reference, x, y, bw, bh, dx, dy);
      for oy in 0..bh {
        for ox in 0..bw {
          let cx = x + ox;
          let cy = y + oy;
          if cx >= current.width || cy >= current.height {
            continue;
          }
          out.set(cx, cy, current.get(cx, cy) as i32 - comp[oy][ox]);
        }
      }
    }
  }
  out
}

// reconstruct(mvs, reconstructed_residual, reference) -> frame, §4.7 final
// step: add the dequantised, reverse-mapped residual to the
// motion-compensated reference block.
pub fn reconstruct(
  mvs: &MotionVectorField,
  residual: &ResidualPlaneSet,
  reference: &PlaneSet,
  cfg: &Config,
) -> EncodeResult<PlaneSet> {
  let block = cfg.macroblocksize as usize;
  let (h_ratio, v_ratio, chroma_block_x, chroma_block_y) = chroma_geometry(cfg);

  let y = reconstruct_channel(&residual.y, &reference.y, mvs, block, block, 1, 1);
  let cb = reconstruct_channel(&residual.cb, &reference.cb, mvs, chroma_block_x, chroma_block_y, h_ratio, v_ratio);
  let cr = reconstruct_channel(&residual.cr, &reference.cr, mvs, chroma_block_x, chroma_block_y, h_ratio, v_ratio);

  Ok(PlaneSet { mode: cfg.subsampling, y, cb, cr })
}

fn reconstruct_channel(
  residual: &ResidualPlane,
  reference: &Plane,
  mvs: &MotionVectorField,
  bw: usize,
  bh: usize,
  h_ratio: usize,
  v_ratio: usize,
) -> Plane {
  let mut out = Plane::new(residual.width, residual.height);
  for by in 0..mvs.blocks_y {
    for bx in 0..mvs.blocks_x {
      let mv = mvs.get(bx, by);
      let dx = scale_mv_to_chroma(mv.dx, h_ratio);
      let dy = scale_mv_to_chroma(mv.dy, v_ratio);
      let x = bx * bw;
      let y = by * bh;
      if x >= residual.width || y >= residual.height {
        continue;
      }
      let comp = motion_compensate_block(reference, x, y, bw, bh, dx, dy);
      for oy in 0..bh {
        for ox in 0..bw {
          let cx = x + ox;
          let cy = y + oy;
          if cx >= residual.width || cy >= residual.height {
            continue;
          }
          let value = residual.get(cx, cy) + comp[oy][ox];
          out.set(cx, cy, clamp(value, 0, 255) as u8);
        }
      }
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::BlockMatchAlgorithm;

  fn ramp_plane(w: usize, h: usize) -> Plane {
    let mut p = Plane::new(w, h);
    for y in 0..h {
      for x in 0..w {
        p.set(x, y, ((x + y) % 256) as u8);
      }
    }
    p
  }

  #[test]
  fn test_identical_frames_yield_zero_motion_vectors() {
    let plane = ramp_plane(32, 32);
    let mut cfg = Config::default();
    cfg.macroblocksize = 16;
    let mvs = estimate_motion(&plane, &plane, &cfg).unwrap();
    for mv in &mvs.vectors {
      assert_eq!(*mv, MotionVector { dx: 0, dy: 0 });
    }
  }

  #[test]
  fn test_mv_bounds_respect_search_distance() {
    let current = ramp_plane(32, 32);
    let mut reference = Plane::new(32, 32);
    for y in 0..32 {
      for x in 0..32 {
        reference.set(x, y, ((x as i32 - 3).rem_euclid(256)) as u8);
      }
    }
    let mut cfg = Config::default();
    cfg.macroblocksize = 16;
    cfg.blockmatchingsearchdistance = 8;
    let mvs = estimate_motion(&current, &reference, &cfg).unwrap();
    for mv in &mvs.vectors {
      assert!(mv.dx.abs() <= 8);
      assert!(mv.dy.abs() <= 8);
    }
  }

  #[test]
  fn test_dsa_and_fsa_agree_on_flat_block() {
    let plane = Plane::new(16, 16);
    let mut cfg = Config::default();
    cfg.macroblocksize = 16;
    cfg.blockmatching = BlockMatchAlgorithm::Fsa;
    let fsa = estimate_motion(&plane, &plane, &cfg).unwrap();
    cfg.blockmatching = BlockMatchAlgorithm::Dsa;
    let dsa = estimate_motion(&plane, &plane, &cfg).unwrap();
    assert_eq!(fsa.vectors, dsa.vectors);
  }

  #[test]
  fn test_identical_frames_zero_residual() {
    let mut cfg = Config::default();
    cfg.macroblocksize = 16;
    cfg.subsampling = crate::config::ChromaMode::Yuv444;
    let y = ramp_plane(32, 32);
    let planes = PlaneSet { mode: cfg.subsampling, y: y.clone(), cb: Plane::new(32, 32), cr: Plane::new(32, 32) };
    let mvs = estimate_motion(&planes.y, &planes.y, &cfg).unwrap();
    let residual = compute_residual(&planes, &planes, &mvs, &cfg).unwrap();
    for y in 0..32 {
      for x in 0..32 {
        assert_eq!(residual.y.get(x, y), 0);
      }
    }
  }

  #[test]
  fn test_range_mapping_roundtrip() {
    let mut residual = ResidualPlane::new(4, 4);
    residual.set(0, 0, -255);
    residual.set(1, 0, 0);
    residual.set(2, 0, 255);
    let mapped = residual.to_mapped_plane();
    let back = ResidualPlane::from_mapped_plane(&mapped);
    assert_eq!(back.get(0, 0), -255);
    assert_eq!(back.get(1, 0), -1); // (0+255)/2=127 -> 2*127-255=-1, integer division artifact
    assert_eq!(back.get(2, 0), 255);
  }

  #[test]
  fn test_reconstruct_recovers_reference_with_zero_residual() {
    let mut cfg = Config::default();
    cfg.macroblocksize = 16;
    cfg.subsampling = crate::config::ChromaMode::Yuv444;
    let y = ramp_plane(32, 32);
    let planes = PlaneSet { mode: cfg.subsampling, y: y.clone(), cb: Plane::new(32, 32), cr: Plane::new(32, 32) };
    let mvs = estimate_motion(&planes.y, &planes.y, &cfg).unwrap();
    let zero_residual = ResidualPlaneSet { y: ResidualPlane::new(32, 32), cb: ResidualPlane::new(32, 32), cr: ResidualPlane::new(32, 32) };
    let recon = reconstruct(&mvs, &zero_residual, &planes, &cfg).unwrap();
    for yy in 0..32 {
      for xx in 0..32 {
        assert_eq!(recon.y.get(xx, yy), planes.y.get(xx, yy));
      }
    }
  }
}
