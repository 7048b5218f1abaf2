//! Photo standards and sheet size catalogue.
//!
//! The catalogue is embedded at compile time from `data/standards.toml` and
//! parsed once on first access. Entries that violate their geometric
//! invariants are logged and skipped.

use crate::error::{invalid, PhotoError, Result};
use crate::units::mm_to_px;
use image::Rgb;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

const EMBEDDED_CATALOGUE: &str = include_str!("../data/standards.toml");

static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// An RGB color written as `#RRGGBB` (or `#RGB`) in the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(pub [u8; 3]);

impl HexColor {
    pub const WHITE: HexColor = HexColor([255, 255, 255]);

    pub fn to_rgb(self) -> Rgb<u8> {
        Rgb(self.0)
    }
}

impl FromStr for HexColor {
    type Err = PhotoError;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return Err(invalid(format!("invalid hex digits in color {s:?}")));
        }
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return Err(invalid(format!("color must be #RGB or #RRGGBB, got {s:?}"))),
        };
        let channel = |i: usize| {
            u8::from_str_radix(&expanded[i..i + 2], 16)
                .map_err(|_| invalid(format!("invalid hex digits in color {s:?}")))
        };
        Ok(HexColor([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl TryFrom<String> for HexColor {
    type Error = PhotoError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02X}{g:02X}{b:02X}")
    }
}

/// A country's photo-size and face-geometry requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standard {
    pub id: String,
    pub name: String,
    pub country: String,
    pub width_mm: f64,
    pub height_mm: f64,
    /// Minimum head height, percent of photo height.
    pub head_height_min: f64,
    /// Maximum head height, percent of photo height.
    pub head_height_max: f64,
    /// Eye line position, percent of photo height measured from the bottom edge.
    pub eye_line_from_bottom: f64,
    pub background: HexColor,
    #[serde(default)]
    pub notes: String,
}

impl Standard {
    /// Check the geometric invariants of this entry.
    pub fn validate(&self) -> Result<()> {
        if !(self.width_mm > 0.0 && self.height_mm > 0.0) {
            return Err(invalid(format!(
                "standard {}: photo size must be positive, got {}x{} mm",
                self.id, self.width_mm, self.height_mm
            )));
        }
        if !(self.head_height_min > 0.0
            && self.head_height_min < self.head_height_max
            && self.head_height_max <= 100.0)
        {
            return Err(invalid(format!(
                "standard {}: head height range must satisfy 0 < min < max <= 100, got {}..{}",
                self.id, self.head_height_min, self.head_height_max
            )));
        }
        if !(self.eye_line_from_bottom > 0.0 && self.eye_line_from_bottom < 100.0) {
            return Err(invalid(format!(
                "standard {}: eye line must lie strictly between 0 and 100, got {}",
                self.id, self.eye_line_from_bottom
            )));
        }
        Ok(())
    }

    /// Photo width divided by height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width_mm / self.height_mm
    }

    pub fn background_rgb(&self) -> Rgb<u8> {
        self.background.to_rgb()
    }

    /// Pixel dimensions of one photo printed at `dpi`.
    pub fn canvas_px(&self, dpi: u32) -> Result<(u32, u32)> {
        Ok((mm_to_px(self.width_mm, dpi)?, mm_to_px(self.height_mm, dpi)?))
    }
}

/// A printable sheet (photo paper or office paper) and its output resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetSize {
    pub id: String,
    pub name: String,
    pub width_mm: f64,
    pub height_mm: f64,
    pub dpi: u32,
}

impl SheetSize {
    pub fn validate(&self) -> Result<()> {
        if !(self.width_mm > 0.0 && self.height_mm > 0.0) {
            return Err(invalid(format!(
                "sheet {}: size must be positive, got {}x{} mm",
                self.id, self.width_mm, self.height_mm
            )));
        }
        if self.dpi == 0 {
            return Err(invalid(format!("sheet {}: dpi must be greater than zero", self.id)));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct CatalogueFile {
    #[serde(default, rename = "standard")]
    standards: Vec<Standard>,
    #[serde(default, rename = "sheet")]
    sheets: Vec<SheetSize>,
}

/// Read-only catalogue of standards and sheet sizes.
#[derive(Debug, Default)]
pub struct Registry {
    standards: Vec<Standard>,
    sheets: Vec<SheetSize>,
}

impl Registry {
    /// Parse a catalogue from TOML, dropping entries that fail validation
    /// or reuse an id.
    pub fn from_toml(src: &str) -> Result<Self> {
        let file: CatalogueFile =
            toml::from_str(src).map_err(|e| invalid(format!("bad catalogue TOML: {e}")))?;

        let mut registry = Registry::default();
        for standard in file.standards {
            if let Err(e) = standard.validate() {
                tracing::warn!(id = %standard.id, error = %e, "skipping invalid standard");
                continue;
            }
            if registry.standard(&standard.id).is_some() {
                tracing::warn!(id = %standard.id, "skipping duplicate standard");
                continue;
            }
            registry.standards.push(standard);
        }
        for sheet in file.sheets {
            if let Err(e) = sheet.validate() {
                tracing::warn!(id = %sheet.id, error = %e, "skipping invalid sheet size");
                continue;
            }
            if registry.sheet(&sheet.id).is_some() {
                tracing::warn!(id = %sheet.id, "skipping duplicate sheet size");
                continue;
            }
            registry.sheets.push(sheet);
        }

        tracing::debug!(
            standards = registry.standards.len(),
            sheets = registry.sheets.len(),
            "catalogue loaded"
        );
        Ok(registry)
    }

    pub fn standard(&self, id: &str) -> Option<&Standard> {
        self.standards.iter().find(|s| s.id.eq_ignore_ascii_case(id))
    }

    pub fn sheet(&self, id: &str) -> Option<&SheetSize> {
        self.sheets.iter().find(|s| s.id.eq_ignore_ascii_case(id))
    }

    pub fn standards(&self) -> &[Standard] {
        &self.standards
    }

    pub fn sheets(&self) -> &[SheetSize] {
        &self.sheets
    }
}

/// The process-wide catalogue built from the embedded TOML.
pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| match Registry::from_toml(EMBEDDED_CATALOGUE) {
        Ok(registry) => registry,
        Err(e) => {
            tracing::error!(error = %e, "embedded catalogue failed to parse");
            Registry::default()
        }
    })
}

/// Look up a standard by id (case-insensitive).
pub fn lookup_standard(id: &str) -> Result<&'static Standard> {
    registry()
        .standard(id)
        .ok_or_else(|| invalid(format!("unknown standard {id:?}")))
}

/// Look up a sheet size by id (case-insensitive).
pub fn lookup_sheet(id: &str) -> Result<&'static SheetSize> {
    registry()
        .sheet(id)
        .ok_or_else(|| invalid(format!("unknown sheet size {id:?}")))
}
