//! Debug pretty-printer for syntax trees
//!
//! ```text
//! object
//! ├── '{'
//! ├── pair
//! │   ├── string
//! │   │   ├── '"'
//! │   │   ├── string_content 'a'
//! │   │   └── '"'
//! │   ├── ':'
//! │   └── number '1'
//! └── '}'
//! ```

use std::fmt;

use tree_sitter::Node;

/// Levels printed below the root; deeper subtrees are elided
pub const MAX_PRINT_DEPTH: usize = 64;

pub struct PrintableTree<'a> {
    node: Node<'a>,
    source: &'a str,
}

/// A node waiting to be printed, with the text that precedes it
struct Pending<'a> {
    node: Node<'a>,
    lead: String,
    prefix: String,
    depth: usize,
}

impl<'a> PrintableTree<'a> {
    pub fn new(node: Node<'a>, source: &'a str) -> Self {
        Self { node, source }
    }

    fn write_leaf(&self, f: &mut fmt::Formatter<'_>, node: Node<'a>) -> fmt::Result {
        let text = self.source.get(node.byte_range()).unwrap_or("");
        if node.is_named() {
            write!(f, "{} '{}'", node.kind(), text)
        } else {
            write!(f, "'{}'", text)
        }
    }
}

impl fmt::Display for PrintableTree<'_> {
    // Walks with an explicit stack: documents can nest deeper than the
    // thread stack allows.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![Pending {
            node: self.node,
            lead: String::new(),
            prefix: String::new(),
            depth: 0,
        }];

        while let Some(Pending {
            node,
            lead,
            prefix,
            depth,
        }) = stack.pop()
        {
            f.write_str(&lead)?;
            if node.child_count() == 0 {
                self.write_leaf(f, node)?;
                continue;
            }
            if depth >= MAX_PRINT_DEPTH {
                write!(f, "{} …", node.kind())?;
                continue;
            }

            let mut cursor = node.walk();
            let children: Vec<Node<'_>> = node.children(&mut cursor).collect();

            // A node wrapping a single token collapses onto one line
            if let [only] = children.as_slice()
                && only.child_count() == 0
            {
                write!(f, "{} ── ", node.kind())?;
                self.write_leaf(f, *only)?;
                continue;
            }

            f.write_str(node.kind())?;
            let last = children.len() - 1;
            for (index, child) in children.into_iter().enumerate().rev() {
                let (branch, indent) = if index == last {
                    ("└──", " ")
                } else {
                    ("├──", "│")
                };
                stack.push(Pending {
                    node: child,
                    lead: format!("\n{}{} ", prefix, branch),
                    prefix: format!("{}{}   ", prefix, indent),
                    depth: depth + 1,
                });
            }
        }
        Ok(())
    }
}
