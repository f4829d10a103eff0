//! Schema documentation: parse and render the markdown grammar
//!
//! [`parse_doc`] reads hand-maintained documentation into a doc-vocabulary
//! snapshot plus documented views; [`render_doc`] writes a snapshot back out
//! in the same grammar.

/// Line prefix marking a table whose introspection failed
pub const FAILURE_MARKER: &str = "> Introspection failed:";

pub mod parser;
pub mod render;

pub use parser::{parse_doc, ParsedDoc};
pub use render::{render_doc, DocHeader};
