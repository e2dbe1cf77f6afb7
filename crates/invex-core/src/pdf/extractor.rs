//! PDF primitive extraction using pdf-extract's content interpreter.

use pdf_extract::{ColorSpace, Document, MediaBox, OutputDev, OutputError, Path, PathOp, Transform};
use tracing::{debug, trace};

use super::PrimitiveSource;
use crate::error::{PdfError, Result};
use crate::layout::BBox;
use crate::models::primitive::Primitive;

/// Loads a PDF and records its glyphs and rules as primitives.
pub struct PdfExtractor {
    document: Option<Document>,
}

impl PdfExtractor {
    pub fn new() -> Self {
        Self { document: None }
    }

    /// Load a PDF from bytes, decrypting it with an empty password if needed.
    pub fn load(&mut self, data: &[u8]) -> std::result::Result<(), PdfError> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    /// Load a PDF file.
    pub fn open(path: &std::path::Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let mut extractor = Self::new();
        extractor.load(&data)?;
        Ok(extractor)
    }

    pub fn page_count(&self) -> usize {
        self.document.as_ref().map(|doc| doc.get_pages().len()).unwrap_or(0)
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PrimitiveSource for PdfExtractor {
    fn primitive_pages(&self) -> Result<Vec<Vec<Primitive>>> {
        let doc = self
            .document
            .as_ref()
            .ok_or_else(|| PdfError::Parse("No document loaded".to_string()))?;

        let mut recorder = PrimitiveRecorder::default();
        pdf_extract::output_doc(doc, &mut recorder).map_err(|e| PdfError::Content(e.to_string()))?;

        debug!(
            "Recorded {} primitives on {} pages",
            recorder.pages.iter().map(Vec::len).sum::<usize>(),
            recorder.pages.len()
        );
        Ok(recorder.pages)
    }
}

/// Map a point through a path's transformation matrix.
fn apply(ctm: &Transform, x: f64, y: f64) -> (f64, f64) {
    (
        ctm.m11 * x + ctm.m21 * y + ctm.m31,
        ctm.m12 * x + ctm.m22 * y + ctm.m32,
    )
}

/// `OutputDev` that keeps positions in PDF user space, y upward.
#[derive(Default)]
struct PrimitiveRecorder {
    pages: Vec<Vec<Primitive>>,
}

impl PrimitiveRecorder {
    fn current(&mut self) -> &mut Vec<Primitive> {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn record_path(&mut self, ctm: &Transform, path: &Path) {
        let mut start = (0.0, 0.0);
        let mut cursor = (0.0, 0.0);
        let mut segments = Vec::new();

        for op in &path.ops {
            match *op {
                PathOp::MoveTo(x, y) => {
                    start = apply(ctm, x, y);
                    cursor = start;
                }
                PathOp::LineTo(x, y) => {
                    let to = apply(ctm, x, y);
                    segments.push(Primitive::Line {
                        bbox: BBox::new(cursor.0, cursor.1, to.0, to.1).normalized(),
                    });
                    cursor = to;
                }
                PathOp::CurveTo(_, _, _, _, x, y) => {
                    cursor = apply(ctm, x, y);
                }
                PathOp::Rect(x, y, w, h) => {
                    let (x0, y0) = apply(ctm, x, y);
                    let (x1, y1) = apply(ctm, x + w, y + h);
                    segments.push(Primitive::Rect {
                        bbox: BBox::new(x0, y0, x1, y1).normalized(),
                    });
                    start = (x0, y0);
                    cursor = start;
                }
                PathOp::Close => {
                    if cursor != start {
                        segments.push(Primitive::Line {
                            bbox: BBox::new(cursor.0, cursor.1, start.0, start.1).normalized(),
                        });
                    }
                    cursor = start;
                }
            }
        }

        trace!("Path with {} ops gave {} segments", path.ops.len(), segments.len());
        self.current().extend(segments);
    }
}

impl OutputDev for PrimitiveRecorder {
    fn begin_page(&mut self, page_num: u32, _media_box: &MediaBox, _art_box: Option<(f64, f64, f64, f64)>) -> std::result::Result<(), OutputError> {
        trace!("Begin page {}", page_num);
        self.pages.push(Vec::new());
        Ok(())
    }

    fn end_page(&mut self) -> std::result::Result<(), OutputError> {
        Ok(())
    }

    fn output_character(&mut self, trm: &Transform, width: f64, _spacing: f64, font_size: f64, char: &str) -> std::result::Result<(), OutputError> {
        let x = trm.m31;
        let y = trm.m32;
        let advance = width * font_size * trm.m11.hypot(trm.m12);
        let height = font_size * trm.m21.hypot(trm.m22);

        self.current()
            .push(Primitive::char(BBox::new(x, y, x + advance, y + height).normalized(), char));
        Ok(())
    }

    fn begin_word(&mut self) -> std::result::Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> std::result::Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> std::result::Result<(), OutputError> {
        Ok(())
    }

    fn stroke(&mut self, ctm: &Transform, _colorspace: &ColorSpace, _color: &[f64], path: &Path) -> std::result::Result<(), OutputError> {
        self.record_path(ctm, path);
        Ok(())
    }

    fn fill(&mut self, ctm: &Transform, _colorspace: &ColorSpace, _color: &[f64], path: &Path) -> std::result::Result<(), OutputError> {
        self.record_path(ctm, path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pdf_extractor_new() {
        let extractor = PdfExtractor::new();
        assert!(extractor.document.is_none());
        assert_eq!(extractor.page_count(), 0);
        assert!(extractor.primitive_pages().is_err());
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let mut extractor = PdfExtractor::new();
        assert!(matches!(extractor.load(b"not a pdf"), Err(PdfError::Parse(_))));
    }

    #[test]
    fn test_paths_become_lines_and_rects() {
        let mut recorder = PrimitiveRecorder::default();
        recorder.pages.push(Vec::new());
        let path = Path {
            ops: vec![
                PathOp::MoveTo(10.0, 100.0),
                PathOp::LineTo(200.0, 100.0),
                PathOp::Rect(10.0, 20.0, 50.0, 30.0),
            ],
        };

        recorder.record_path(&Transform::identity(), &path);

        assert_eq!(
            recorder.pages[0],
            vec![
                Primitive::Line { bbox: BBox::new(10.0, 100.0, 200.0, 100.0) },
                Primitive::Rect { bbox: BBox::new(10.0, 20.0, 60.0, 50.0) },
            ]
        );
    }
}
