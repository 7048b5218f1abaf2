use crate::detector::{Detector, ScrfdDetector};
use crate::error::Result;
use crate::segmenter::{MattingSegmenter, Segmenter};
use crate::service::ModelService;
use idphoto_core::{
    layout_for_standard, render_aligned, render_sheet, replace_background, select_face_box,
    select_subject_mask, solve_alignment, validate_compliance, ComplianceReport, FaceBox,
    LayoutOptions, Resampling, SheetLayout, SheetSize, SheetStyle, Standard, Transform,
};
use image::RgbImage;
use std::path::Path;
use std::sync::Arc;

pub type DetectorService = ModelService<Box<dyn Detector>>;
pub type SegmenterService = ModelService<Box<dyn Segmenter>>;

/// Knobs for [`PhotoEngine::prepare`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrepareOptions {
    /// Resolution of the aligned canvas; should match the target sheet.
    pub dpi: u32,
    pub resampling: Resampling,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self { dpi: 300, resampling: Resampling::Bilinear }
    }
}

/// An aligned, background-replaced photo ready for tiling.
pub struct PreparedPhoto {
    pub photo: RgbImage,
    /// Compliance of the face as found in the source image.
    pub report: ComplianceReport,
    pub transform: Transform,
    pub face: FaceBox,
}

pub struct ComposedSheet {
    pub layout: SheetLayout,
    pub sheet: RgbImage,
}

/// Runs the detect → align → segment → composite pipeline over two model services.
#[derive(Clone)]
pub struct PhotoEngine {
    detector: Arc<DetectorService>,
    segmenter: Arc<SegmenterService>,
}

impl PhotoEngine {
    pub fn new(detector: Arc<DetectorService>, segmenter: Arc<SegmenterService>) -> Self {
        Self { detector, segmenter }
    }

    /// Engine backed by the ONNX models in `model_dir`. Nothing loads until first use.
    pub fn from_model_dir(model_dir: &Path, intra_threads: usize) -> Self {
        let scrfd = model_dir.join(crate::SCRFD_MODEL_FILE);
        let matting = model_dir.join(crate::MATTING_MODEL_FILE);

        let detector = ModelService::new("detector", move || {
            Ok(Box::new(ScrfdDetector::load(&scrfd, intra_threads)?) as Box<dyn Detector>)
        });
        let segmenter = ModelService::new("segmenter", move || {
            Ok(Box::new(MattingSegmenter::load(&matting, intra_threads)?) as Box<dyn Segmenter>)
        });

        Self::new(Arc::new(detector), Arc::new(segmenter))
    }

    pub fn detector(&self) -> &DetectorService {
        &self.detector
    }

    pub fn segmenter(&self) -> &SegmenterService {
        &self.segmenter
    }

    /// Turn a source photo into a compliant, background-replaced canvas for `standard`.
    pub async fn prepare(
        &self,
        image: RgbImage,
        standard: &Standard,
        options: &PrepareOptions,
    ) -> Result<PreparedPhoto> {
        let source = Arc::new(image);
        let dims = source.dimensions();

        let input = Arc::clone(&source);
        let detections = self.detector.run(move |d| d.detect(&input)).await?;
        let face = select_face_box(&detections, dims.0, dims.1)?;

        let report = validate_compliance(&face, dims.0, dims.1, standard)?;
        tracing::info!(
            standard = %standard.id,
            valid = report.is_valid,
            head = report.head_height_percent,
            eye_line = report.eye_line_percent,
            center_offset = report.center_offset_percent,
            "source compliance"
        );

        let canvas = standard.canvas_px(options.dpi)?;
        let transform = solve_alignment(&face, dims, canvas, standard)?;
        let background = standard.background_rgb();
        let aligned = Arc::new(render_aligned(&source, &transform, canvas, background)?);

        let input = Arc::clone(&aligned);
        let segments = self.segmenter.run(move |s| s.segment(&input)).await?;
        let mask = select_subject_mask(&segments)?;
        let photo = replace_background(&aligned, mask, background, options.resampling)?;

        tracing::info!(
            width = photo.width(),
            height = photo.height(),
            scale = transform.scale,
            "photo prepared"
        );

        Ok(PreparedPhoto { photo, report, transform, face })
    }

    /// Tile a prepared photo over `sheet`.
    pub fn compose_sheet(
        &self,
        photo: &RgbImage,
        standard: &Standard,
        sheet: &SheetSize,
        layout: &LayoutOptions,
        style: &SheetStyle,
    ) -> Result<ComposedSheet> {
        let layout = layout_for_standard(standard, sheet, layout)?;
        let sheet = render_sheet(photo, &layout, style)?;
        Ok(ComposedSheet { layout, sheet })
    }
}
