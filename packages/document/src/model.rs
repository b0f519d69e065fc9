//! # NodeDoc Model
//!
//! A NodeDoc is a titled, ordered sequence of typed content blocks. Documents
//! are values: an edit produces a new `NodeDoc`, it never patches one in place
//! behind a consumer's back.
//!
//! ```text
//! NodeDoc
//!  ├─ schemaVersion (always 1)
//!  ├─ title / summary / conceptKeys / estimatedMinutes
//!  └─ blocks[]
//!       └─ Block { id, type, ...kind fields, citations? }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// The only document format generation this crate understands
pub const SCHEMA_VERSION: u64 = 1;

/// Root document value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDoc {
    pub schema_version: u64,
    pub title: String,
    pub summary: String,
    pub concept_keys: BTreeSet<String>,
    pub estimated_minutes: f64,
    pub blocks: Vec<Block>,
}

impl NodeDoc {
    /// Create an empty document at the current schema version
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            title: title.into(),
            summary: String::new(),
            concept_keys: BTreeSet::new(),
            estimated_minutes: 0.0,
            blocks: Vec::new(),
        }
    }

    /// Parse and validate a document from JSON text
    pub fn from_json(source: &str) -> Result<Self, crate::SchemaError> {
        let value: serde_json::Value = serde_json::from_str(source)
            .map_err(|e| crate::SchemaError::MalformedJson(e.to_string()))?;
        crate::validate(&value)
    }

    pub fn to_value(&self) -> serde_json::Value {
        // Every field serializes infallibly (string keys, finite numbers)
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id.as_str() == id)
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.blocks.iter().position(|b| b.id.as_str() == id)
    }

    pub fn contains_block(&self, id: &str) -> bool {
        self.position_of(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Stable block identifier, assigned once when the block is created
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for BlockId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// One addressable unit of a document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub id: BlockId,

    #[serde(flatten)]
    pub content: BlockContent,
}

impl Block {
    pub fn new(id: impl Into<BlockId>, content: BlockContent) -> Self {
        Self {
            id: id.into(),
            content,
        }
    }

    pub fn kind(&self) -> BlockKind {
        self.content.kind()
    }

    pub fn citations(&self) -> &[Citation] {
        self.content.citations()
    }
}

/// Kind-specific block payload, tagged by `type` on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockContent {
    Heading {
        level: u8,
        text: String,
    },

    Paragraph {
        text: String,
        #[serde(default)]
        citations: Vec<Citation>,
    },

    Callout {
        #[serde(default = "default_callout_variant")]
        variant: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        text: String,
        #[serde(default)]
        citations: Vec<Citation>,
    },

    Code {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        code: String,
    },

    Figure {
        src: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
        #[serde(default)]
        citations: Vec<Citation>,
    },

    Video {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },

    Diagram {
        #[serde(default = "default_diagram_syntax")]
        syntax: String,
        source: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },

    /// Rows are not required to match the column count
    Table {
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },

    Equation {
        latex: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
        #[serde(default)]
        citations: Vec<Citation>,
    },

    QuickCheck {
        prompt: String,
        choices: Vec<String>,
        #[serde(rename = "answerIndex", alias = "answer_index")]
        answer_index: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
        #[serde(default)]
        citations: Vec<Citation>,
    },

    Flashcard {
        front: String,
        back: String,
        #[serde(default)]
        citations: Vec<Citation>,
    },

    Divider,
}

fn default_callout_variant() -> String {
    "note".to_string()
}

fn default_diagram_syntax() -> String {
    "mermaid".to_string()
}

impl BlockContent {
    pub fn kind(&self) -> BlockKind {
        match self {
            BlockContent::Heading { .. } => BlockKind::Heading,
            BlockContent::Paragraph { .. } => BlockKind::Paragraph,
            BlockContent::Callout { .. } => BlockKind::Callout,
            BlockContent::Code { .. } => BlockKind::Code,
            BlockContent::Figure { .. } => BlockKind::Figure,
            BlockContent::Video { .. } => BlockKind::Video,
            BlockContent::Diagram { .. } => BlockKind::Diagram,
            BlockContent::Table { .. } => BlockKind::Table,
            BlockContent::Equation { .. } => BlockKind::Equation,
            BlockContent::QuickCheck { .. } => BlockKind::QuickCheck,
            BlockContent::Flashcard { .. } => BlockKind::Flashcard,
            BlockContent::Divider => BlockKind::Divider,
        }
    }

    /// Citations carried by this block (empty for kinds without citations)
    pub fn citations(&self) -> &[Citation] {
        match self {
            BlockContent::Paragraph { citations, .. }
            | BlockContent::Callout { citations, .. }
            | BlockContent::Figure { citations, .. }
            | BlockContent::Equation { citations, .. }
            | BlockContent::QuickCheck { citations, .. }
            | BlockContent::Flashcard { citations, .. } => citations,
            BlockContent::Heading { .. }
            | BlockContent::Code { .. }
            | BlockContent::Video { .. }
            | BlockContent::Diagram { .. }
            | BlockContent::Table { .. }
            | BlockContent::Divider => &[],
        }
    }

    pub fn citations_mut(&mut self) -> Option<&mut Vec<Citation>> {
        match self {
            BlockContent::Paragraph { citations, .. }
            | BlockContent::Callout { citations, .. }
            | BlockContent::Figure { citations, .. }
            | BlockContent::Equation { citations, .. }
            | BlockContent::QuickCheck { citations, .. }
            | BlockContent::Flashcard { citations, .. } => Some(citations),
            _ => None,
        }
    }

    /// The text a proposal's before/after text refers to
    pub fn primary_text(&self) -> Option<&str> {
        match self {
            BlockContent::Heading { text, .. }
            | BlockContent::Paragraph { text, .. }
            | BlockContent::Callout { text, .. } => Some(text),
            BlockContent::Code { code, .. } => Some(code),
            BlockContent::Equation { latex, .. } => Some(latex),
            BlockContent::QuickCheck { prompt, .. } => Some(prompt),
            BlockContent::Flashcard { front, .. } => Some(front),
            BlockContent::Diagram { source, .. } => Some(source),
            BlockContent::Figure { caption, .. } | BlockContent::Table { caption, .. } => {
                caption.as_deref()
            }
            BlockContent::Video { title, .. } => title.as_deref(),
            BlockContent::Divider => None,
        }
    }

    /// Replace the primary text; returns false for kinds without one
    pub fn set_primary_text(&mut self, value: impl Into<String>) -> bool {
        let value = value.into();
        match self {
            BlockContent::Heading { text, .. }
            | BlockContent::Paragraph { text, .. }
            | BlockContent::Callout { text, .. } => *text = value,
            BlockContent::Code { code, .. } => *code = value,
            BlockContent::Equation { latex, .. } => *latex = value,
            BlockContent::QuickCheck { prompt, .. } => *prompt = value,
            BlockContent::Flashcard { front, .. } => *front = value,
            BlockContent::Diagram { source, .. } => *source = value,
            BlockContent::Figure { caption, .. } | BlockContent::Table { caption, .. } => {
                *caption = Some(value)
            }
            BlockContent::Video { title, .. } => *title = Some(value),
            BlockContent::Divider => return false,
        }
        true
    }

    /// Build a fresh block of `kind` whose only content is `text`
    ///
    /// Returns `None` for kinds that need more than a single text field to be
    /// valid (figures need a source, flashcards need a back, ...).
    pub fn from_text(kind: BlockKind, text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        let content = match kind {
            BlockKind::Heading => BlockContent::Heading { level: 2, text },
            BlockKind::Paragraph => BlockContent::Paragraph {
                text,
                citations: Vec::new(),
            },
            BlockKind::Callout => BlockContent::Callout {
                variant: default_callout_variant(),
                title: None,
                text,
                citations: Vec::new(),
            },
            BlockKind::Code => BlockContent::Code {
                language: None,
                code: text,
            },
            BlockKind::Diagram => BlockContent::Diagram {
                syntax: default_diagram_syntax(),
                source: text,
                caption: None,
            },
            BlockKind::Equation => BlockContent::Equation {
                latex: text,
                caption: None,
                citations: Vec::new(),
            },
            BlockKind::Divider => BlockContent::Divider,
            BlockKind::Figure
            | BlockKind::Video
            | BlockKind::Table
            | BlockKind::QuickCheck
            | BlockKind::Flashcard => return None,
        };
        Some(content)
    }
}

/// The twelve block kinds of this format generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Heading,
    Paragraph,
    Callout,
    Code,
    Figure,
    Video,
    Diagram,
    Table,
    Equation,
    QuickCheck,
    Flashcard,
    Divider,
}

impl BlockKind {
    pub const ALL: [BlockKind; 12] = [
        BlockKind::Heading,
        BlockKind::Paragraph,
        BlockKind::Callout,
        BlockKind::Code,
        BlockKind::Figure,
        BlockKind::Video,
        BlockKind::Diagram,
        BlockKind::Table,
        BlockKind::Equation,
        BlockKind::QuickCheck,
        BlockKind::Flashcard,
        BlockKind::Divider,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Heading => "heading",
            BlockKind::Paragraph => "paragraph",
            BlockKind::Callout => "callout",
            BlockKind::Code => "code",
            BlockKind::Figure => "figure",
            BlockKind::Video => "video",
            BlockKind::Diagram => "diagram",
            BlockKind::Table => "table",
            BlockKind::Equation => "equation",
            BlockKind::QuickCheck => "quick_check",
            BlockKind::Flashcard => "flashcard",
            BlockKind::Divider => "divider",
        }
    }

    /// Wire fields that must be present for this kind
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            BlockKind::Heading => &["level", "text"],
            BlockKind::Paragraph | BlockKind::Callout => &["text"],
            BlockKind::Code => &["code"],
            BlockKind::Figure => &["src"],
            BlockKind::Video => &["url"],
            BlockKind::Diagram => &["source"],
            BlockKind::Table => &["columns", "rows"],
            BlockKind::Equation => &["latex"],
            BlockKind::QuickCheck => &["prompt", "choices", "answerIndex"],
            BlockKind::Flashcard => &["front", "back"],
            BlockKind::Divider => &[],
        }
    }

    pub fn carries_citations(&self) -> bool {
        matches!(
            self,
            BlockKind::Paragraph
                | BlockKind::Callout
                | BlockKind::Figure
                | BlockKind::Equation
                | BlockKind::QuickCheck
                | BlockKind::Flashcard
        )
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known block kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBlockKind(pub String);

impl fmt::Display for UnknownBlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown block kind `{}`", self.0)
    }
}

impl std::error::Error for UnknownBlockKind {}

impl FromStr for BlockKind {
    type Err = UnknownBlockKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownBlockKind(s.to_string()))
    }
}

/// Pointer from block content to a quoted source location
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    #[serde(alias = "chunk_id")]
    pub chunk_id: String,
    pub quote: String,
    pub loc: CitationLoc,
}

impl Citation {
    pub fn new(chunk_id: impl Into<String>, quote: impl Into<String>, loc: CitationLoc) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            quote: quote.into(),
            loc,
        }
    }
}

/// Location of a quote inside the source corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CitationLoc {
    pub page: u64,
    pub start: u64,
    pub end: u64,
}

impl CitationLoc {
    pub fn new(page: u64, start: u64, end: u64) -> Self {
        Self { page, start, end }
    }
}
