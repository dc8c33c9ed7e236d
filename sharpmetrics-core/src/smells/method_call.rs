//! Informational report of `receiver.Method(..)` calls into other types

use super::{Diagnostic, Severity, SmellRule};
use crate::config::ResolvedConfig;
use crate::semantic::{SemanticModel, SymbolId};
use crate::syntax::{SourceUnit, SyntaxKind, SyntaxNode};

pub struct MethodCall;

impl SmellRule for MethodCall {
    fn id(&self) -> &'static str {
        "MethodCall"
    }

    fn name(&self) -> &'static str {
        "method-call"
    }

    fn severity(&self) -> Severity {
        Severity::Info
    }

    fn check_unit(
        &self,
        unit: &SourceUnit,
        model: &dyn SemanticModel,
        _config: &ResolvedConfig,
        out: &mut Vec<Diagnostic>,
    ) {
        self.visit(&unit.root, None, unit, model, out);
    }
}

impl MethodCall {
    /// Pre-order walk tracking the innermost enclosing type declaration
    fn visit(
        &self,
        node: &SyntaxNode,
        enclosing: Option<SymbolId>,
        unit: &SourceUnit,
        model: &dyn SemanticModel,
        out: &mut Vec<Diagnostic>,
    ) {
        let enclosing = if node.kind.is_type_declaration() {
            model.declared_symbol(node)
        } else {
            enclosing
        };

        if node.kind == SyntaxKind::Invocation {
            if let (Some(current), Some(callee)) = (enclosing, node.children.first()) {
                if callee.kind == SyntaxKind::MemberAccess {
                    self.check_call(callee, current, unit, model, out);
                }
            }
        }

        for child in &node.children {
            self.visit(child, enclosing, unit, model, out);
        }
    }

    fn check_call(
        &self,
        access: &SyntaxNode,
        current: SymbolId,
        unit: &SourceUnit,
        model: &dyn SemanticModel,
        out: &mut Vec<Diagnostic>,
    ) {
        let Some(method) = model.resolve_symbol(access) else {
            return;
        };
        let symbol = model.symbol(method);
        if !symbol.is_method() {
            return;
        }
        match symbol.containing_type {
            Some(owner) if owner != current => {
                let message = format!("Method '{}' is called from another class.", symbol.name);
                out.push(self.diagnostic(unit, access.span, message));
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smells::check_source;

    #[test]
    fn test_reports_member_access_calls_into_other_types() {
        let source = r#"
class Printer { public void Print() { } }
class Report
{
    Printer printer = new Printer();
    void Render()
    {
        printer.Print();
        this.Render();
        Local();
    }
    void Local() { }
}
"#;
        let diagnostics = check_source(&MethodCall, &[source]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Method 'Print' is called from another class.");
        assert_eq!(diagnostics[0].severity, Severity::Info);
        assert_eq!(diagnostics[0].span.start_line, 8);
        assert_eq!(diagnostics[0].span.start_col, 8);
    }

    #[test]
    fn test_nested_type_is_its_own_context() {
        let source = r#"
class Outer
{
    public static void Helper() { }
    class Inner
    {
        void Go() { Outer.Helper(); }
    }
    void Stay() { Outer.Helper(); }
}
"#;
        let diagnostics = check_source(&MethodCall, &[source]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].span.start_line, 7);
    }
}
