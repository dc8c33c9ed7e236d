//! C# language parser using tree-sitter

use super::lower::lower_compilation_unit;
use crate::language::parser::LanguageParser;
use crate::language::tree_sitter_utils::{count_error_nodes, syntax_depth};
use crate::syntax::SourceUnit;
use anyhow::{Context, Result};
use std::path::Path;
use tree_sitter::Parser;

/// Deepest syntax tree accepted; lowering, binding and measuring recurse
/// once per level
pub const MAX_SYNTAX_DEPTH: usize = 400;

/// C# parser using tree-sitter
#[derive(Debug, Clone, Copy)]
pub struct CSharpParser;

impl CSharpParser {
    /// Create a new C# parser
    pub fn new() -> Result<Self> {
        // Just validate that the grammar loads
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_c_sharp::LANGUAGE.into())
            .context("Failed to set C# language for parser")?;
        Ok(CSharpParser)
    }
}

impl LanguageParser for CSharpParser {
    fn parse(&self, source: &str, path: &Path) -> Result<SourceUnit> {
        // tree_sitter::Parser is stateful and not Sync, so each parse gets its own
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_c_sharp::LANGUAGE.into())
            .context("Failed to set C# language")?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| anyhow::anyhow!("Failed to parse C# file: {}", path.display()))?;

        let root_node = tree.root_node();
        let depth = syntax_depth(root_node);
        if depth > MAX_SYNTAX_DEPTH {
            anyhow::bail!(
                "{}: syntax nested {} levels deep, limit is {}",
                path.display(),
                depth,
                MAX_SYNTAX_DEPTH
            );
        }

        let errors = count_error_nodes(root_node);
        if errors > 0 {
            tracing::debug!(
                "{}: {} syntax error node(s), continuing with partial tree",
                path.display(),
                errors
            );
        }

        Ok(SourceUnit {
            path: path.to_path_buf(),
            source: source.to_string(),
            root: lower_compilation_unit(root_node, source),
            has_errors: errors > 0,
        })
    }
}

#[cfg(test)]
pub(crate) fn parse_source(source: &str) -> SourceUnit {
    CSharpParser::new()
        .unwrap()
        .parse(source, Path::new("Test.cs"))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::query::{count_kind, descendants_of_kind};
    use crate::syntax::{Modifier, SyntaxKind};

    #[test]
    fn test_deeply_nested_expression_is_rejected() {
        let terms = vec!["1"; 5000].join(" + ");
        let source = format!("class Deep {{ int F() {{ return {terms}; }} }}");
        let result = CSharpParser::new()
            .unwrap()
            .parse(&source, Path::new("Deep.cs"));
        let message = result.unwrap_err().to_string();
        assert!(message.contains("Deep.cs"));
        assert!(message.contains("limit is 400"));
    }

    #[test]
    fn test_syntax_depth_counts_levels() {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_c_sharp::LANGUAGE.into())
            .unwrap();
        let shallow = parser.parse("class A { }", None).unwrap();
        let nested = parser
            .parse("class A { int F() { return ((((1)))); } }", None)
            .unwrap();
        assert!(syntax_depth(shallow.root_node()) < syntax_depth(nested.root_node()));
        assert!(syntax_depth(nested.root_node()) < MAX_SYNTAX_DEPTH);
    }

    #[test]
    fn test_parse_class_with_members() {
        let unit = parse_source(
            r#"
namespace Shop.Billing
{
    public class Invoice : DocumentBase, IPrintable
    {
        private int total, tax;
        public string Number { get; set; }

        public Invoice(int total) { this.total = total; }

        public virtual int Total() { return total + tax; }
    }
}
"#,
        );
        assert!(!unit.has_errors);
        let classes = unit.classes();
        assert_eq!(classes.len(), 1);
        let invoice = classes[0];
        assert_eq!(invoice.name(), "Invoice");
        assert!(invoice.modifiers().contains(Modifier::Public));
        assert_eq!(invoice.field_names(), vec!["total", "tax"]);
        assert_eq!(invoice.properties().count(), 1);

        let base_list = invoice.base_list().unwrap();
        let bases: Vec<&str> = base_list.children.iter().map(|c| c.text()).collect();
        assert_eq!(bases, vec!["DocumentBase", "IPrintable"]);

        let methods = invoice.methods();
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].name(), "Total");
        assert!(methods[0].modifiers().contains(Modifier::Virtual));
        assert_eq!(methods[0].return_type().unwrap().text(), "int");
        assert!(methods[0].parameters().is_empty());
        assert!(!methods[0].is_expression_bodied());
    }

    #[test]
    fn test_declared_names_are_not_identifier_references() {
        let unit = parse_source(
            "class A { int M(int p) { int local = p; return local; } }",
        );
        let identifiers: Vec<&str> = descendants_of_kind(&unit.root, SyntaxKind::Identifier)
            .map(|n| n.text())
            .collect();
        assert_eq!(identifiers, vec!["p", "local"]);
    }

    #[test]
    fn test_switch_labels_are_lowered() {
        let unit = parse_source(
            r#"
class A {
    int M(int x) {
        switch (x) {
            case 1:
            case 2:
                return 1;
            default:
                return 0;
        }
    }
}
"#,
        );
        assert_eq!(count_kind(&unit.root, SyntaxKind::Switch), 1);
        assert_eq!(count_kind(&unit.root, SyntaxKind::SwitchSection), 2);
        assert_eq!(count_kind(&unit.root, SyntaxKind::CaseLabel), 2);
        assert_eq!(count_kind(&unit.root, SyntaxKind::DefaultLabel), 1);
    }

    #[test]
    fn test_invocation_and_member_access_names() {
        let unit = parse_source("class A { void M() { this.helper.Run(1); Log(); } }");
        let calls: Vec<&str> = descendants_of_kind(&unit.root, SyntaxKind::Invocation)
            .map(|n| n.text())
            .collect();
        assert_eq!(calls, vec!["Run", "Log"]);
        let accesses: Vec<&str> = descendants_of_kind(&unit.root, SyntaxKind::MemberAccess)
            .map(|n| n.text())
            .collect();
        assert_eq!(accesses, vec!["Run", "helper"]);
        assert_eq!(count_kind(&unit.root, SyntaxKind::This), 1);
    }

    #[test]
    fn test_binary_operator_text() {
        let unit = parse_source("class A { bool M(int a, int b) { return a < b && b != 0; } }");
        let operators: Vec<&str> = descendants_of_kind(&unit.root, SyntaxKind::Binary)
            .map(|n| n.text())
            .collect();
        assert_eq!(operators, vec!["&&", "<", "!="]);
    }

    #[test]
    fn test_file_scoped_namespace_wraps_types() {
        let unit = parse_source("namespace Shop;\nclass Cart { }\nclass Item { }\n");
        let namespace = unit.root.child_of_kind(SyntaxKind::Namespace).unwrap();
        assert_eq!(namespace.text(), "Shop");
        assert_eq!(namespace.children_of_kind(SyntaxKind::Class).count(), 2);
    }

    #[test]
    fn test_lambda_parameters_are_declared() {
        let unit = parse_source("class A { void M() { F(o => o.Total); F((int p) => p); } }");
        let parameters: Vec<&str> = descendants_of_kind(&unit.root, SyntaxKind::Lambda)
            .flat_map(|lambda| lambda.children_of_kind(SyntaxKind::ParameterList))
            .flat_map(|list| list.children_of_kind(SyntaxKind::Parameter))
            .map(|parameter| parameter.text())
            .collect();
        assert_eq!(parameters, vec!["o", "p"]);
    }

    #[test]
    fn test_named_argument_label_is_dropped() {
        let unit = parse_source("class A { void M(int total) { Go(count: total); } }");
        let arguments: Vec<Vec<&str>> = descendants_of_kind(&unit.root, SyntaxKind::Argument)
            .map(|argument| argument.children.iter().map(|child| child.text()).collect())
            .collect();
        assert_eq!(arguments, vec![vec!["total"]]);
    }

    #[test]
    fn test_parse_tolerates_errors() {
        let unit = parse_source("class Broken { void M( { }");
        assert!(unit.has_errors);
    }
}
