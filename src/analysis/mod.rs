//! Document analysis engine
//! - document.rs: open document store
//! - syntax.rs: grammar selection, parsing, position conversion
//! - hover.rs: syntax-node hover with cooperative cancellation
//! - tree_print.rs: debug pretty-printer for syntax trees
//! - error.rs: analysis errors

pub mod document;
pub mod error;
pub mod hover;
pub mod syntax;
pub mod tree_print;

pub use document::{DocumentStore, TextDocument};
pub use error::AnalysisError;
pub use hover::hover_at;
pub use syntax::Syntax;
pub use tree_print::PrintableTree;
