//! Encoders for converting the IR to output formats

mod epub;
mod markdown;

pub use epub::EpubEncoder;
pub use markdown::{
    plan_chapters, plan_chapters_with_headings, render_chapter, render_nodes, ChapterPlan,
    ExportBundle, MarkdownEncoder, OutputDocument, INDEX_FILE,
};
