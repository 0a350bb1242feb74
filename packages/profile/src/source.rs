//! Document sources: the upstream layer that turns a profile document into
//! pages of text fragments in rendering order.
//!
//! Two sources are provided. [`PageDump`] reads pages that were already
//! extracted to JSON, and `PdfDocument` (behind the `pdf` feature) renders
//! a PDF with `pdf-extract`.

use std::path::{Path, PathBuf};

use carelink_profile_models::Page;
use serde::Deserialize;

use crate::ProfileError;

/// Anything that can produce the ordered pages of one document.
pub trait DocumentSource {
    /// Returns the document's pages in order.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError`] if the document cannot be read.
    fn pages(&self) -> Result<Vec<Page>, ProfileError>;
}

impl DocumentSource for [Page] {
    fn pages(&self) -> Result<Vec<Page>, ProfileError> {
        Ok(self.to_vec())
    }
}

/// A page as stored in a JSON dump.
#[derive(Debug, Deserialize)]
struct DumpedPage {
    /// Full page text; defaults to the fragments joined by newlines.
    #[serde(default)]
    text: Option<String>,
    /// Fragment texts in rendering order.
    fragments: Vec<String>,
}

/// Pages previously extracted to a JSON file of the form
/// `[{"text": "...", "fragments": ["...", ...]}, ...]`.
#[derive(Debug, Clone)]
pub struct PageDump {
    path: PathBuf,
}

impl PageDump {
    /// Creates a source reading from `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parses a JSON page dump from a string.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Json`] if `json` is not a valid page dump.
    pub fn parse_str(json: &str) -> Result<Vec<Page>, ProfileError> {
        let dumped: Vec<DumpedPage> = serde_json::from_str(json)?;

        Ok(dumped
            .into_iter()
            .map(|page| match page.text {
                Some(text) => Page::new(text, page.fragments),
                None => Page::from_fragments(page.fragments),
            })
            .collect())
    }
}

impl DocumentSource for PageDump {
    fn pages(&self) -> Result<Vec<Page>, ProfileError> {
        let json = std::fs::read_to_string(&self.path)?;
        let pages = Self::parse_str(&json)?;

        log::debug!("Read {} page(s) from {}", pages.len(), self.path.display());

        Ok(pages)
    }
}

/// Opens `path` with the source matching its extension.
///
/// # Errors
///
/// Returns [`ProfileError::UnsupportedFormat`] for unknown extensions, and
/// for `.pdf` when the `pdf` feature is disabled.
pub fn open(path: &Path) -> Result<Box<dyn DocumentSource>, ProfileError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "json" => Ok(Box::new(PageDump::new(path))),
        #[cfg(feature = "pdf")]
        "pdf" => Ok(Box::new(pdf::PdfDocument::new(path))),
        other => Err(ProfileError::UnsupportedFormat(if other.is_empty() {
            path.display().to_string()
        } else {
            format!(".{other}")
        })),
    }
}

#[cfg(feature = "pdf")]
pub mod pdf {
    //! PDF rendering through [`pdf_extract`]'s output device interface.
    //!
    //! Every text-showing operation becomes one fragment, in the order the
    //! page content stream draws them.

    use std::path::PathBuf;

    use carelink_profile_models::Page;
    use pdf_extract::{MediaBox, OutputDev, OutputError, Transform};

    use super::DocumentSource;
    use crate::ProfileError;

    /// A PDF file on disk.
    #[derive(Debug, Clone)]
    pub struct PdfDocument {
        path: PathBuf,
    }

    impl PdfDocument {
        /// Creates a source reading from `path`.
        #[must_use]
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }
    }

    /// Collects fragments page by page.
    #[derive(Default)]
    struct FragmentCollector {
        pages: Vec<Page>,
        fragments: Vec<String>,
        word: String,
    }

    impl OutputDev for FragmentCollector {
        fn begin_page(
            &mut self,
            _page_num: u32,
            _media_box: &MediaBox,
            _art_box: Option<(f64, f64, f64, f64)>,
        ) -> Result<(), OutputError> {
            self.fragments.clear();
            Ok(())
        }

        fn end_page(&mut self) -> Result<(), OutputError> {
            let fragments = std::mem::take(&mut self.fragments);
            self.pages.push(Page::from_fragments(fragments));
            Ok(())
        }

        fn output_character(
            &mut self,
            _trm: &Transform,
            _width: f64,
            _spacing: f64,
            _font_size: f64,
            char: &str,
        ) -> Result<(), OutputError> {
            self.word.push_str(char);
            Ok(())
        }

        fn begin_word(&mut self) -> Result<(), OutputError> {
            self.word.clear();
            Ok(())
        }

        fn end_word(&mut self) -> Result<(), OutputError> {
            self.fragments.push(std::mem::take(&mut self.word));
            Ok(())
        }

        fn end_line(&mut self) -> Result<(), OutputError> {
            Ok(())
        }
    }

    /// Renders every page of a loaded PDF into fragments.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Pdf`] if a page cannot be rendered.
    pub fn render(doc: &lopdf::Document) -> Result<Vec<Page>, ProfileError> {
        let mut collector = FragmentCollector::default();
        pdf_extract::output_doc(doc, &mut collector)
            .map_err(|e| ProfileError::Pdf(format!("failed to render PDF text: {e}")))?;
        Ok(collector.pages)
    }

    impl DocumentSource for PdfDocument {
        fn pages(&self) -> Result<Vec<Page>, ProfileError> {
            let bytes = std::fs::read(&self.path)?;
            let doc = lopdf::Document::load_mem(&bytes)
                .map_err(|e| ProfileError::Pdf(format!("failed to load PDF: {e}")))?;

            let pages = render(&doc)?;

            log::debug!("Rendered {} page(s) from {}", pages.len(), self.path.display());

            Ok(pages)
        }
    }

    #[cfg(test)]
    mod tests {
        use lopdf::content::{Content, Operation};
        use lopdf::{Document, Object, Stream, dictionary};

        use super::*;

        /// Builds a one-page PDF that draws each of `texts` with its own `Tj`.
        fn one_page_pdf(texts: &[&str]) -> Document {
            let mut doc = Document::with_version("1.5");
            let pages_id = doc.new_object_id();
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Courier",
            });
            let resources_id = doc.add_object(dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            });

            let mut operations = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
            ];
            for (i, text) in texts.iter().enumerate() {
                let y = 700 - 20 * i64::try_from(i).unwrap();
                operations.push(Operation::new("Td", vec![0.into(), y.into()]));
                operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
            }
            operations.push(Operation::new("ET", vec![]));

            let content = Content { operations };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            doc.objects.insert(
                pages_id,
                Object::Dictionary(dictionary! {
                    "Type" => "Pages",
                    "Kids" => vec![page_id.into()],
                    "Count" => 1,
                    "Resources" => resources_id,
                    "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                }),
            );
            let catalog_id = doc.add_object(dictionary! {
                "Type" => "Catalog",
                "Pages" => pages_id,
            });
            doc.trailer.set("Root", catalog_id);

            doc
        }

        #[test]
        fn each_text_operation_becomes_a_fragment() {
            let doc = one_page_pdf(&["K-Faktor", "Zeit"]);

            let pages = render(&doc).unwrap();

            assert_eq!(pages.len(), 1);
            assert_eq!(pages[0].contents(), vec!["K-Faktor", "Zeit"]);
            assert_eq!(pages[0].fragments[1].ordinal, 1);
        }
    }
}
