//! Human-readable dumps of the layout index, for template authoring.

use std::io::{self, Write};

use tracing::{enabled, trace, Level};

use super::index::LayoutContext;

impl LayoutContext {
    /// Write every page's rows, top-down, with run coordinates.
    pub fn write_text_dump<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for page in self.pages() {
            writeln!(out, "PAGE #{}", page.number() + 1)?;
            for (y, row) in page.rows_top_down() {
                write!(out, "{:>8.2}:", y)?;
                for run in row.runs() {
                    write!(out, " (x0={:.2},x1={:.2}) |{}|", run.bbox.x0, run.bbox.x1, run.text)?;
                }
                writeln!(out)?;
            }
        }
        Ok(())
    }

    /// Text dump as a string.
    pub fn text_dump(&self) -> String {
        let mut buf = Vec::new();
        // writing into a Vec cannot fail
        let _ = self.write_text_dump(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Trace every run and ruling segment of the index.
    pub fn trace_structure(&self) {
        if !enabled!(Level::TRACE) {
            return;
        }
        for page in self.pages() {
            for run in page.runs() {
                trace!(page = page.number(), bbox = ?run.bbox, "run {:?}", run.text);
            }
            for seg in page.horizontal_segments().values().flat_map(|row| row.values()) {
                trace!(page = page.number(), y = seg.at, x0 = seg.start, x1 = seg.end, source = ?seg.source, "horizontal rule");
            }
            for seg in page.vertical_segments().values().flat_map(|row| row.values()) {
                trace!(page = page.number(), x = seg.at, y0 = seg.start, y1 = seg.end, source = ?seg.source, "vertical rule");
            }
        }
    }
}
