//! Surface types painted onto terrain vertices.
//!
//! Tags are stored as small integers so the renderer can map them to materials
//! exhaustively. The numeric order is part of the persisted format and of the
//! paint blend, which interpolates between tag numbers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Surface material of a terrain vertex
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum SurfaceType {
    #[default]
    Grass = 0,
    Rock = 1,
    Sand = 2,
    Snow = 3,
    Concrete = 4,
    Ice = 5,
}

impl SurfaceType {
    pub fn all() -> &'static [Self] {
        &[Self::Grass, Self::Rock, Self::Sand, Self::Snow, Self::Concrete, Self::Ice]
    }

    /// Numeric tag used on the wire and by the paint blend.
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Grass),
            1 => Some(Self::Rock),
            2 => Some(Self::Sand),
            3 => Some(Self::Snow),
            4 => Some(Self::Concrete),
            5 => Some(Self::Ice),
            _ => None,
        }
    }

    /// Round a blended tag value to the nearest valid surface.
    pub fn from_blend(value: f32) -> Self {
        let last = (Self::all().len() - 1) as f32;
        let id = value.round().clamp(0.0, last) as u8;
        Self::from_id(id).unwrap_or_default()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Grass => "grass",
            Self::Rock => "rock",
            Self::Sand => "sand",
            Self::Snow => "snow",
            Self::Concrete => "concrete",
            Self::Ice => "ice",
        }
    }

    /// Preview color for map exports.
    pub fn color(&self) -> [u8; 3] {
        match self {
            Self::Grass => [86, 140, 62],
            Self::Rock => [120, 114, 108],
            Self::Sand => [214, 196, 140],
            Self::Snow => [240, 244, 250],
            Self::Concrete => [168, 168, 160],
            Self::Ice => [170, 214, 236],
        }
    }
}

impl fmt::Display for SurfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SurfaceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|surface| surface.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown surface type '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_stable() {
        for (expected, surface) in SurfaceType::all().iter().enumerate() {
            assert_eq!(surface.id() as usize, expected);
            assert_eq!(SurfaceType::from_id(surface.id()), Some(*surface));
        }
        assert_eq!(SurfaceType::from_id(6), None);
    }

    #[test]
    fn test_from_blend_rounds_and_clamps() {
        assert_eq!(SurfaceType::from_blend(0.49), SurfaceType::Grass);
        assert_eq!(SurfaceType::from_blend(0.5), SurfaceType::Rock);
        assert_eq!(SurfaceType::from_blend(3.6), SurfaceType::Concrete);
        assert_eq!(SurfaceType::from_blend(-2.0), SurfaceType::Grass);
        assert_eq!(SurfaceType::from_blend(42.0), SurfaceType::Ice);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("Sand".parse::<SurfaceType>(), Ok(SurfaceType::Sand));
        assert_eq!(" ice ".parse::<SurfaceType>(), Ok(SurfaceType::Ice));
        assert!("lava".parse::<SurfaceType>().is_err());
    }
}
