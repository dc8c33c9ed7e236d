//! Parser seam between source text and the owned syntax tree

use crate::syntax::SourceUnit;
use anyhow::Result;
use std::path::Path;

/// Source-to-tree front-end
///
/// Implementations must produce a `SourceUnit` whose node ids are unique and
/// assigned in pre-order; the semantic model keys its bindings on them.
pub trait LanguageParser: Send + Sync {
    /// Parse one document
    ///
    /// # Arguments
    ///
    /// * `source` - The document text
    /// * `path` - Where the text came from (recorded on the unit and used in errors)
    fn parse(&self, source: &str, path: &Path) -> Result<SourceUnit>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::SourceSpan;
    use crate::syntax::{Modifiers, NodeId, SyntaxKind, SyntaxNode};

    // Produces a unit with a single empty class named after the file
    struct TestParser;

    impl LanguageParser for TestParser {
        fn parse(&self, source: &str, path: &Path) -> Result<SourceUnit> {
            let span = SourceSpan::new(0, source.len(), 1, 1, 0, 0);
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            let class = SyntaxNode {
                id: NodeId(1),
                kind: SyntaxKind::Class,
                span,
                text: Some(name),
                name_span: None,
                modifiers: Modifiers::default(),
                children: vec![],
            };
            Ok(SourceUnit {
                path: path.to_path_buf(),
                source: source.to_string(),
                root: SyntaxNode {
                    id: NodeId(0),
                    kind: SyntaxKind::CompilationUnit,
                    span,
                    text: None,
                    name_span: None,
                    modifiers: Modifiers::default(),
                    children: vec![class],
                },
                has_errors: false,
            })
        }
    }

    #[test]
    fn test_parser_trait() {
        let parser: Box<dyn LanguageParser> = Box::new(TestParser);
        let unit = parser.parse("class Widget {}", Path::new("Widget.cs")).unwrap();
        let classes = unit.classes();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].name(), "Widget");
        assert_eq!(unit.text_of(&unit.root), "class Widget {}");
    }
}
