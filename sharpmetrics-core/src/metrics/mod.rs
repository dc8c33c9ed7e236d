//! Metric formulas over classes and methods
//!
//! Global invariants enforced:
//! - Formatting, comments, and whitespace must not affect results
//! - Every value is a pure function of the declaration and its resolved symbols
//! - "Same class" is decided by symbol identity, never by name

pub mod class;
pub mod cohesion;
pub mod method;

use crate::semantic::{SemanticModel, SymbolId};
use crate::syntax::{SyntaxKind, SyntaxNode};

pub use class::{extract_class_metrics, ClassRaw};
pub use cohesion::FieldUsage;
pub use method::{extract_method_metrics, MethodRaw};

/// A member reference leaving the declaring type
#[derive(Debug, Clone, Copy)]
pub struct ForeignAccess<'a> {
    pub node: &'a SyntaxNode,
    pub symbol: SymbolId,
    pub owner: SymbolId,
}

/// Member accesses, member bindings and bare-name invocations under `body`
/// whose member belongs to a type other than `declaring`.
///
/// With `exclude_system` set, members owned by framework code (see
/// [`SemanticModel::is_system_symbol`]) are left out.
pub fn foreign_accesses<'a>(
    body: &'a SyntaxNode,
    declaring: Option<SymbolId>,
    model: &dyn SemanticModel,
    exclude_system: Option<&[String]>,
) -> Vec<ForeignAccess<'a>> {
    let mut accesses = Vec::new();
    for node in body.descendants() {
        let is_access = match node.kind {
            SyntaxKind::MemberAccess | SyntaxKind::MemberBinding => true,
            SyntaxKind::Invocation => node.children.first().is_some_and(|callee| {
                matches!(callee.kind, SyntaxKind::Identifier | SyntaxKind::GenericName)
            }),
            _ => false,
        };
        if !is_access {
            continue;
        }
        let Some(symbol) = model.resolve_symbol(node) else {
            continue;
        };
        if model.symbol(symbol).is_type() {
            continue;
        }
        let Some(owner) = model.containing_type_of(symbol) else {
            continue;
        };
        if Some(owner) == declaring {
            continue;
        }
        if let Some(prefixes) = exclude_system {
            if model.is_system_symbol(owner, prefixes) {
                continue;
            }
        }
        accesses.push(ForeignAccess { node, symbol, owner });
    }
    accesses
}

/// Type syntax written on a field, property, parameter or method declaration
pub(crate) fn declared_type(declaration: &SyntaxNode) -> Option<&SyntaxNode> {
    let holder = if declaration.kind == SyntaxKind::Field {
        declaration.child_of_kind(SyntaxKind::VariableDeclaration)?
    } else {
        declaration
    };
    holder.children.first().filter(|child| child.kind.is_type_syntax())
}

/// Resolved method symbols of every invocation under `node`, in pre-order
pub(crate) fn invoked_methods(node: &SyntaxNode, model: &dyn SemanticModel) -> Vec<SymbolId> {
    node.descendants()
        .filter(|n| n.kind == SyntaxKind::Invocation)
        .filter_map(|n| model.resolve_symbol(n))
        .filter(|&id| model.symbol(id).is_method())
        .collect()
}

/// `a / b` as a ratio, 0 for an empty denominator
pub(crate) fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::csharp::parser::parse_source;
    use crate::semantic::Compilation;

    #[test]
    fn test_foreign_accesses_system_filter() {
        let unit = parse_source(
            r#"
using System;
class Cart { public int Count; public void Clear() {} }
class Shop {
    int own;
    void Run(Cart cart) {
        cart.Clear();
        var n = cart.Count;
        Console.WriteLine(n);
        own = 1;
        Helper();
    }
    void Helper() {}
}"#,
        );
        let compilation = Compilation::build("App", vec![unit]);
        let model = compilation.model(0);
        let shop = compilation.find_type("Shop").unwrap();
        let run = model
            .unit()
            .root
            .descendants()
            .find(|n| n.kind == SyntaxKind::Method && n.text() == "Run")
            .unwrap();

        let all = foreign_accesses(run, Some(shop), &model, None);
        let names: Vec<&str> = all.iter().map(|a| model.symbol(a.symbol).name.as_str()).collect();
        assert_eq!(names, vec!["Clear", "Count", "WriteLine"]);

        let prefixes = vec!["System.".to_string()];
        let user_code = foreign_accesses(run, Some(shop), &model, Some(&prefixes));
        assert_eq!(user_code.len(), 2);
    }

    #[test]
    fn test_ratio() {
        assert_eq!(ratio(1, 4), 0.25);
        assert_eq!(ratio(3, 0), 0.0);
    }
}
