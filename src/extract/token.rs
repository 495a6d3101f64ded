//! Positioned word tokens, the input of PDF table extraction.
//!
//! The extractor never reads a PDF itself. Any word extractor that reports each word with its
//! bounding box can feed it through `PageSource`. The shipped source is a JSON token dump:
//!
//! ```json
//! { "pages": [ { "page": 1, "words": [ { "text": "Folha", "x0": 40.0, "x1": 70.5, "top": 90.2, "bottom": 99.0 } ] } ] }
//! ```

use serde::{Deserialize, Serialize};

/// One word on a page. Coordinates are in points, `top` grows downward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Token {
    pub fn new(text: impl Into<String>, x0: f64, x1: f64, top: f64, bottom: f64) -> Self {
        Self {
            text: text.into(),
            x0,
            x1,
            top,
            bottom,
        }
    }

    /// Horizontal centre, used for column assignment.
    pub fn x_mid(&self) -> f64 {
        (self.x0 + self.x1) * 0.5
    }

    /// Vertical centre, used for row clustering.
    pub fn y_mid(&self) -> f64 {
        (self.top + self.bottom) * 0.5
    }
}

/// The tokens of a single page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number.
    #[serde(rename = "page", default)]
    pub number: usize,
    #[serde(rename = "words", alias = "tokens", default)]
    pub tokens: Vec<Token>,
}

impl Page {
    pub fn new(number: usize, tokens: Vec<Token>) -> Self {
        Self { number, tokens }
    }
}

/// Anything that can hand the extractor the pages of one document, in order.
pub trait PageSource {
    fn pages(&self) -> &[Page];
}

impl PageSource for Vec<Page> {
    fn pages(&self) -> &[Page] {
        self.as_slice()
    }
}

impl PageSource for [Page] {
    fn pages(&self) -> &[Page] {
        self
    }
}

/// A whole document serialized as JSON words with bounding boxes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenDump {
    #[serde(default)]
    pages: Vec<Page>,
}

impl TokenDump {
    /// Parses a dump. Pages that carry no number are numbered by position.
    pub fn parse(json: &str) -> serde_json::Result<Self> {
        let mut dump: TokenDump = serde_json::from_str(json)?;
        for (i, page) in dump.pages.iter_mut().enumerate() {
            if page.number == 0 {
                page.number = i + 1;
            }
        }
        Ok(dump)
    }

    pub fn new(pages: Vec<Page>) -> Self {
        Self { pages }
    }
}

impl PageSource for TokenDump {
    fn pages(&self) -> &[Page] {
        &self.pages
    }
}
