//! Positioned primitives fed to the layout index.

use serde::{Deserialize, Serialize};

use crate::layout::BBox;

/// One positioned element of a page, as produced by a PDF interpreter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Primitive {
    /// A single glyph; adjacent glyphs are merged into runs.
    Char { bbox: BBox, text: String },
    /// Text already grouped by the producer, indexed as one run.
    Word { bbox: BBox, text: String },
    /// A straight stroke; only horizontal and vertical ones are kept.
    Line { bbox: BBox },
    /// A rectangle, decomposed into its four edges.
    Rect { bbox: BBox },
    /// A container (form XObject, figure) flattened into the same page.
    Group {
        #[serde(default)]
        children: Vec<Primitive>,
    },
}

impl Primitive {
    pub fn char(bbox: BBox, text: impl Into<String>) -> Self {
        Self::Char {
            bbox,
            text: text.into(),
        }
    }

    pub fn word(bbox: BBox, text: impl Into<String>) -> Self {
        Self::Word {
            bbox,
            text: text.into(),
        }
    }
}

/// A whole document as an ordered list of pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveDocument {
    pub pages: Vec<Vec<Primitive>>,
}

impl PrimitiveDocument {
    /// Load a primitives JSON file.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_tagged_primitives() {
        let json = r##"{"pages": [[
            {"kind": "word", "bbox": [10, 700, 60, 712], "text": "Invoice"},
            {"kind": "rect", "bbox": [10, 100, 500, 400]},
            {"kind": "group", "children": [
                {"kind": "char", "bbox": [70, 700, 76, 712], "text": "#"}
            ]}
        ]]}"##;

        let doc: PrimitiveDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(
            doc.pages[0][0],
            Primitive::word(BBox::new(10.0, 700.0, 60.0, 712.0), "Invoice")
        );
        match &doc.pages[0][2] {
            Primitive::Group { children } => assert_eq!(children.len(), 1),
            other => panic!("expected group, got {:?}", other),
        }
    }
}
