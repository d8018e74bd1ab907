//! Hover over syntax nodes

use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Position};
use tracing::debug;
use tree_sitter::{Node, Point};

use crate::analysis::document::TextDocument;
use crate::analysis::error::AnalysisError;
use crate::analysis::syntax::{Syntax, point_at, range_of};
use crate::analysis::tree_print::PrintableTree;

/// Describes the innermost named syntax node under `position`.
///
/// The cancellation token is checked once per tree level on the way down,
/// so a cancelled request stops before the next descent.
pub fn hover_at(
    document: &TextDocument,
    position: Position,
    cancel: &CancellationToken,
) -> Result<Option<Hover>, AnalysisError> {
    let Some(syntax) = Syntax::detect(&document.language_id, document.uri.as_str()) else {
        debug!(uri = %document.uri, language_id = %document.language_id, "No grammar for document");
        return Ok(None);
    };
    let Some(point) = point_at(&document.text, position) else {
        return Ok(None);
    };

    let tree = syntax.parse(&document.text)?;
    let mut node = tree.root_node();
    let mut path: Vec<&'static str> = Vec::new();

    loop {
        if cancel.is_cancelled() {
            debug!(uri = %document.uri, depth = path.len(), "Hover cancelled");
            return Err(AnalysisError::Cancelled);
        }
        let mut cursor = node.walk();
        let next = node
            .named_children(&mut cursor)
            .find(|child| contains(child, point));
        match next {
            Some(child) => {
                path.push(child.kind());
                node = child;
            }
            None => break,
        }
    }

    if path.is_empty() {
        return Ok(None);
    }

    let value = format!(
        "{}\n\n```text\n{}\n```",
        render_path(&path),
        PrintableTree::new(node, &document.text)
    );
    Ok(Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value,
        }),
        range: Some(range_of(&document.text, node)),
    }))
}

fn contains(node: &Node, point: Point) -> bool {
    node.start_position() <= point && point < node.end_position()
}

fn render_path(path: &[&str]) -> String {
    path.iter()
        .map(|kind| format!("`{}`", kind))
        .collect::<Vec<_>>()
        .join(" › ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_lsp::lsp_types::{Range, Url};

    fn json_document(text: &str) -> TextDocument {
        TextDocument {
            uri: Url::parse("file:///test/config.json").unwrap(),
            language_id: "json".to_string(),
            version: 1,
            text: text.to_string(),
        }
    }

    fn markdown(hover: &Hover) -> &str {
        match &hover.contents {
            HoverContents::Markup(content) => &content.value,
            other => panic!("unexpected hover contents: {:?}", other),
        }
    }

    #[test]
    fn hover_on_number_reports_path_and_tree() {
        let document = json_document("{\n  \"a\": 12\n}");
        let hover = hover_at(&document, Position::new(1, 8), &CancellationToken::new())
            .unwrap()
            .unwrap();

        let text = markdown(&hover);
        assert!(text.starts_with("`object` › `pair` › `number`"));
        assert!(text.contains("number '12'"));
        assert_eq!(
            hover.range,
            Some(Range::new(Position::new(1, 7), Position::new(1, 9)))
        );
    }

    #[test]
    fn hover_on_key_descends_into_string() {
        let document = json_document(r#"{"name": "x"}"#);
        let hover = hover_at(&document, Position::new(0, 3), &CancellationToken::new())
            .unwrap()
            .unwrap();
        assert!(markdown(&hover).starts_with("`object` › `pair` › `string` › `string_content`"));
    }

    #[test]
    fn cancelled_token_stops_analysis() {
        let document = json_document(r#"{"a": 1}"#);
        let token = CancellationToken::new();
        token.cancel();

        let result = hover_at(&document, Position::new(0, 6), &token);
        assert!(matches!(result, Err(AnalysisError::Cancelled)));
    }

    #[test]
    fn unsupported_language_has_no_hover() {
        let document = TextDocument {
            uri: Url::parse("file:///main.rs").unwrap(),
            language_id: "rust".to_string(),
            version: 1,
            text: "fn main() {}".to_string(),
        };
        let hover = hover_at(&document, Position::new(0, 0), &CancellationToken::new()).unwrap();
        assert!(hover.is_none());
    }

    #[test]
    fn position_past_last_line_has_no_hover() {
        let document = json_document("{}");
        let hover = hover_at(&document, Position::new(5, 0), &CancellationToken::new()).unwrap();
        assert!(hover.is_none());
    }

    #[test]
    fn toml_hover_names_the_pair() {
        let document = TextDocument {
            uri: Url::parse("file:///Cargo.toml").unwrap(),
            language_id: "toml".to_string(),
            version: 1,
            text: "[package]\nname = \"dedukt\"\n".to_string(),
        };
        let hover = hover_at(&document, Position::new(1, 1), &CancellationToken::new())
            .unwrap()
            .unwrap();
        assert!(markdown(&hover).contains("`bare_key`"));
    }
}
