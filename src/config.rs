//! Pipeline configuration.
//!
//! Every stage receives the configuration explicitly; nothing here is global.
//! A JSON file may override any subset of fields, the rest keep their defaults.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Genre used when a record has none, and the palette's fallback entry.
pub const FALLBACK_GENRE: &str = "Other";

/// Widest accepted time bin, in years.
pub const MAX_BUCKET_YEARS: u32 = 1000;

/// An sRGB color with components in `[0, 1]`, written as `#rrggbb` in config files.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub [f32; 3]);

impl Rgb {
    pub const WHITE: Rgb = Rgb([1.0, 1.0, 1.0]);

    pub fn to_vec3(self) -> Vec3 {
        Vec3::from_array(self.0)
    }

    pub fn from_vec3(v: Vec3) -> Self {
        Rgb(v.to_array())
    }

    /// Blend toward `other` by `t` (0 keeps `self`, 1 yields `other`).
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        Rgb::from_vec3(self.to_vec3().lerp(other.to_vec3(), t))
    }
}

impl FromStr for Rgb {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ConfigError::InvalidColor(s.to_string()));
        }
        let channel = |i: usize| -> Result<f32, ConfigError> {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map(|v| v as f32 / 255.0)
                .map_err(|_| ConfigError::InvalidColor(s.to_string()))
        };
        Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl TryFrom<String> for Rgb {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(c: Rgb) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
    }
}

/// One entry of the genre color table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenreColor {
    pub genre: String,
    pub color: Rgb,
}

impl GenreColor {
    fn new(genre: &str, hex: &str) -> Self {
        Self {
            genre: genre.to_string(),
            // Only called with the literals in `default_palette`.
            color: hex.parse().unwrap_or(Rgb::WHITE),
        }
    }
}

fn default_palette() -> Vec<GenreColor> {
    vec![
        GenreColor::new("Action", "#ff6b6b"),
        GenreColor::new("Adventure", "#86e1ff"),
        GenreColor::new("Animation", "#ffd166"),
        GenreColor::new("Drama", "#7aa2ff"),
        GenreColor::new("Comedy", "#a3eea0"),
        GenreColor::new("Sci-Fi", "#b693ff"),
        GenreColor::new("Horror", "#ff9de2"),
        GenreColor::new("Crime", "#7bdff2"),
        GenreColor::new("Fantasy", "#d3b7ff"),
        GenreColor::new("Family", "#ffe29a"),
        GenreColor::new(FALLBACK_GENRE, "#cbd5e1"),
    ]
}

/// Color used when neither the genre nor the fallback entry is in the table.
const LAST_RESORT_COLOR: Rgb = Rgb([0.796, 0.835, 0.882]);

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Width of one time bin in years.
    pub bucket_years: u32,
    /// Maximum number of summits to annotate.
    pub peak_count: usize,
    /// Height of the lowest cell, in world units.
    pub height_floor: f32,
    /// Height of the highest cell, in world units.
    pub height_ceiling: f32,
    /// World extent along the time axis (X).
    pub footprint_width: f32,
    /// World extent along the genre axis (Z).
    pub footprint_depth: f32,
    /// How far the tallest cells are blended toward white.
    pub tint_strength: f32,
    /// Base color per genre, in legend order.
    pub genre_colors: Vec<GenreColor>,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            bucket_years: 5,
            peak_count: 8,
            height_floor: 6.0,
            height_ceiling: 180.0,
            footprint_width: 720.0,
            footprint_depth: 420.0,
            tint_strength: 0.18,
            genre_colors: default_palette(),
        }
    }
}

impl TerrainConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: TerrainConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_BUCKET_YEARS).contains(&self.bucket_years) {
            return Err(ConfigError::OutOfRange {
                field: "bucket_years",
                requirement: "between 1 and 1000",
            });
        }
        if !(self.height_floor < self.height_ceiling) {
            return Err(ConfigError::OutOfRange {
                field: "height_ceiling",
                requirement: "greater than height_floor",
            });
        }
        if !(self.footprint_width > 0.0) || !(self.footprint_depth > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "footprint_width/footprint_depth",
                requirement: "positive",
            });
        }
        if !(0.0..=1.0).contains(&self.tint_strength) {
            return Err(ConfigError::OutOfRange {
                field: "tint_strength",
                requirement: "within [0, 1]",
            });
        }
        Ok(())
    }

    /// Base color for a genre, falling back to the "Other" entry.
    pub fn genre_color(&self, genre: &str) -> Rgb {
        let lookup = |name: &str| {
            self.genre_colors
                .iter()
                .find(|entry| entry.genre == name)
                .map(|entry| entry.color)
        };
        lookup(genre)
            .or_else(|| lookup(FALLBACK_GENRE))
            .unwrap_or(LAST_RESORT_COLOR)
    }
}
