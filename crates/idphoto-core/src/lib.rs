//! idphoto-core: Passport-photo geometry engine.
//!
//! Validates a detected face against a country standard, solves the
//! transform that aligns it, replaces the background from a soft mask, and
//! lays out print sheets at physical-unit precision.

pub mod alignment;
pub mod compliance;
pub mod compositor;
pub mod detection;
pub mod error;
pub mod layout;
pub mod sheet;
pub mod standards;
pub mod types;
pub mod units;

pub use alignment::{render_aligned, solve_alignment};
pub use compliance::{validate_compliance, ComplianceReport};
pub use compositor::{replace_background, select_subject_mask, Mask, Resampling, Segment};
pub use detection::{select_face_box, Detection};
pub use error::{PhotoError, Result};
pub use layout::{compute_sheet_layout, layout_for_standard, LayoutOptions, SheetLayout};
pub use sheet::{render_sheet, SheetStyle};
pub use standards::{lookup_sheet, lookup_standard, registry, HexColor, SheetSize, Standard};
pub use types::{FaceBox, Transform};
pub use units::{mm_to_px, px_to_mm};
