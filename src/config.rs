use crate::error::EncodeError;

// Chroma sampling mode, §3: each maps to (Hy,Vy,Hc,Vc) sampling factors
// per T.81 A.1.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromaMode {
  Yuv444,
  Yuv440,
  Yuv422,
  Yuv420,
  Yuv411,
  Yuv410,
}

impl ChromaMode {
  // (Hy, Vy, Hc, Vc)
  pub fn sampling_factors(self) -> (u32, u32, u32, u32) {
    match self {
      ChromaMode::Yuv444 => (1, 1, 1, 1),
      ChromaMode::Yuv440 => (1, 2, 1, 1),
      ChromaMode::Yuv422 => (2, 1, 1, 1),
      ChromaMode::Yuv420 => (2, 2, 1, 1),
      ChromaMode::Yuv411 => (4, 1, 1, 1),
      ChromaMode::Yuv410 => (4, 2, 1, 1),
    }
  }

  pub fn parse(s: &str) -> Result<Self, EncodeError> {
    match s {
      "4:4:4" => Ok(ChromaMode::Yuv444),
      "4:4:0" => Ok(ChromaMode::Yuv440),
      "4:2:2" => Ok(ChromaMode::Yuv422),
      "4:2:0" => Ok(ChromaMode::Yuv420),
      "4:1:1" => Ok(ChromaMode::Yuv411),
      "4:1:0" => Ok(ChromaMode::Yuv410),
      other => Err(EncodeError::InvalidParameter(format!("unknown chroma mode '{}'", other))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMatchAlgorithm {
  Fsa, // full search
  Dsa, // diamond search
}

impl BlockMatchAlgorithm {
  pub fn parse(s: &str) -> Result<Self, EncodeError> {
    match s.to_ascii_uppercase().as_str() {
      "FSA" => Ok(BlockMatchAlgorithm::Fsa),
      "DSA" => Ok(BlockMatchAlgorithm::Dsa),
      other => Err(EncodeError::InvalidParameter(format!("unknown block-matching algorithm '{}'", other))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistortionMetric {
  Sad,
  Mad,
}

impl DistortionMetric {
  pub fn parse(s: &str) -> Result<Self, EncodeError> {
    match s.to_ascii_uppercase().as_str() {
      "SAD" => Ok(DistortionMetric::Sad),
      "MAD" => Ok(DistortionMetric::Mad),
      other => Err(EncodeError::InvalidParameter(format!("unknown distortion metric '{}'", other))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GopFrameType {
  I,
  P,
}

impl GopFrameType {
  pub fn from_char(c: char) -> Result<Self, EncodeError> {
    match c.to_ascii_lowercase() {
      'i' => Ok(GopFrameType::I),
      'p' => Ok(GopFrameType::P),
      other => Err(EncodeError::InvalidParameter(format!("unknown GOP character '{}'", other))),
    }
  }
}

// Explicit configuration struct. Replaces the source's varargin-style
// dynamic parameter bag (DESIGN NOTES §9); the stage toggles select code
// paths but never mutate any global state.
#[derive(Debug, Clone)]
pub struct Config {
  pub quality: u8,
  pub subsampling: ChromaMode,
  pub gop: String,
  pub framerate: u8,
  pub blockmatching: BlockMatchAlgorithm,
  pub blockmatchingsearchdistance: u32,
  pub macroblocksize: u32,
  pub blockmatchingdifferencecalculation: DistortionMetric,
  pub docustomhuffmantables: bool,
  pub doentropycoding: bool,
  pub dobitstream: bool,
  pub doreconstruction: bool,
  pub dorunlengthcoding: bool,
  pub doreordering: bool,
  pub dodcdifferentials: bool,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      quality: 75,
      subsampling: ChromaMode::Yuv420,
      gop: "ippppppp".to_string(),
      framerate: 30,
      blockmatching: BlockMatchAlgorithm::Fsa,
      blockmatchingsearchdistance: 8,
      macroblocksize: 16,
      blockmatchingdifferencecalculation: DistortionMetric::Sad,
      docustomhuffmantables: true,
      doentropycoding: true,
      dobitstream: true,
      doreconstruction: true,
      dorunlengthcoding: true,
      doreordering: true,
      dodcdifferentials: true,
    }
  }
}

impl Config {
  pub fn validate(&self) -> Result<(), EncodeError> {
    if self.quality < 1 || self.quality > 100 {
      return Err(EncodeError::InvalidParameter(format!("quality {} out of range [1,100]", self.quality)));
    }
    if self.macroblocksize < 8 || self.macroblocksize % 8 != 0 {
      return Err(EncodeError::InvalidParameter(format!(
        "macroblocksize {} must be >= 8 and a multiple of 8", self.macroblocksize
      )));
    }
    if self.blockmatchingsearchdistance == 0 {
      return Err(EncodeError::InvalidParameter("blockmatchingsearchdistance must be positive".to_string()));
    }
    if self.framerate == 0 {
      return Err(EncodeError::InvalidParameter("framerate must be in 1..255".to_string()));
    }
    if self.gop.is_empty() {
      return Err(EncodeError::InvalidParameter("gop structure must not be empty".to_string()));
    }
    let mut chars = self.gop.chars();
    match chars.next() {
      Some(c) if GopFrameType::from_char(c)? == GopFrameType::I => {}
      _ => return Err(EncodeError::InvalidParameter("gop structure must start with 'I'".to_string())),
    }
    for c in self.gop.chars() {
      GopFrameType::from_char(c)?;
    }
    Ok(())
  }

  // Parsed GOP structure as a sequence of frame types
  pub fn gop_structure(&self) -> Result<Vec<GopFrameType>, EncodeError> {
    self.gop.chars().map(GopFrameType::from_char).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_config_validates() {
    assert!(Config::default().validate().is_ok());
  }

  #[test]
  fn test_quality_out_of_range_rejected() {
    let mut c = Config::default();
    c.quality = 0;
    assert!(c.validate().is_err());
    c.quality = 101;
    assert!(c.validate().is_err());
  }

  #[test]
  fn test_gop_must_start_with_i() {
    let mut c = Config::default();
    c.gop = "pipp".to_string();
    assert!(c.validate().is_err());
  }

  #[test]
  fn test_macroblocksize_must_be_multiple_of_8() {
    let mut c = Config::default();
    c.macroblocksize = 10;
    assert!(c.validate().is_err());
  }

  #[test]
  fn test_chroma_mode_parse() {
    assert_eq!(ChromaMode::parse("4:2:0").unwrap(), ChromaMode::Yuv420);
    assert!(ChromaMode::parse("4:4:4:4").is_err());
  }
}
