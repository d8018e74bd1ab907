//! Grammar selection and position conversion

use tower_lsp::lsp_types::{Position, Range};
use tracing::warn;
use tree_sitter::{Language, Point, Tree};

use crate::analysis::error::AnalysisError;
use crate::rpc::method::WireName;
use crate::wire_enum;

wire_enum! {
    /// Supported syntaxes, named by their LSP language identifier
    pub enum Syntax {
        Json => "json",
        Toml => "toml",
        Yaml => "yaml",
    }
}

impl Syntax {
    /// Picks a grammar from the client's language id, falling back to the
    /// file extension of `uri`.
    pub fn detect(language_id: &str, uri: &str) -> Option<Self> {
        if let Some(syntax) = Self::from_wire_name(language_id) {
            return Some(syntax);
        }
        if language_id == "jsonc" {
            return Some(Syntax::Json);
        }

        let extension = uri.rsplit_once('.')?.1;
        match extension {
            "json" | "jsonc" => Some(Syntax::Json),
            "toml" => Some(Syntax::Toml),
            "yaml" | "yml" => Some(Syntax::Yaml),
            _ => None,
        }
    }

    fn language(self) -> Language {
        match self {
            Syntax::Json => tree_sitter_json::LANGUAGE.into(),
            Syntax::Toml => tree_sitter_toml_ng::LANGUAGE.into(),
            Syntax::Yaml => tree_sitter_yaml::LANGUAGE.into(),
        }
    }

    pub fn parse(self, text: &str) -> Result<Tree, AnalysisError> {
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&self.language()).map_err(|e| {
            warn!("Failed to set {} language for tree-sitter: {}", self, e);
            AnalysisError::Language(e.to_string())
        })?;

        parser.parse(text, None).ok_or_else(|| {
            warn!("Failed to parse {} content", self);
            AnalysisError::ParseFailed
        })
    }
}

/// Converts an LSP position (UTF-16 columns) into a tree-sitter point
/// (byte columns). Columns past the end of the line clamp to the line end.
pub fn point_at(text: &str, position: Position) -> Option<Point> {
    let row = position.line as usize;
    let line = text.split('\n').nth(row)?;
    let line = line.strip_suffix('\r').unwrap_or(line);

    let mut units = 0u32;
    let mut column = line.len();
    for (offset, ch) in line.char_indices() {
        if units >= position.character {
            column = offset;
            break;
        }
        units += ch.len_utf16() as u32;
    }

    Some(Point::new(row, column))
}

/// Converts a tree-sitter point back into an LSP position.
pub fn position_of(text: &str, point: Point) -> Position {
    let line = text.split('\n').nth(point.row).unwrap_or("");
    let prefix = line.get(..point.column).unwrap_or(line);
    let character = prefix.chars().map(|ch| ch.len_utf16() as u32).sum();
    Position::new(point.row as u32, character)
}

pub fn range_of(text: &str, node: tree_sitter::Node) -> Range {
    Range::new(
        position_of(text, node.start_position()),
        position_of(text, node.end_position()),
    )
}
