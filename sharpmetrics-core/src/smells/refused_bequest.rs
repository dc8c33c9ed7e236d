//! Refused Bequest: a subclass of a source class that ignores what it inherits
//!
//! A class is accepted only when it overrides a base member, references a
//! base member, and none of its overriding methods throws
//! `NotImplementedException`.

use super::{name_location, Diagnostic, Severity, SmellRule};
use crate::config::ResolvedConfig;
use crate::semantic::{SemanticModel, SymbolId};
use crate::syntax::{ClassNode, MethodNode, Modifier, SourceUnit, SyntaxKind, SyntaxNode};

pub struct RefusedBequest;

impl SmellRule for RefusedBequest {
    fn id(&self) -> &'static str {
        "RefusedBequest"
    }

    fn name(&self) -> &'static str {
        "refused-bequest"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_unit(
        &self,
        unit: &SourceUnit,
        model: &dyn SemanticModel,
        _config: &ResolvedConfig,
        out: &mut Vec<Diagnostic>,
    ) {
        for class in unit.classes() {
            let Some(own) = model.declared_symbol(class.syntax()) else {
                continue;
            };
            let Some(base) = source_base(model, own) else {
                continue;
            };

            let overrides = class
                .members()
                .any(|member| member.modifiers.contains(Modifier::Override));
            let refuses = class
                .methods()
                .iter()
                .filter(|method| method.modifiers().contains(Modifier::Override))
                .any(|method| throws_not_implemented(*method, unit));

            if overrides && uses_base_members(class, base, model) && !refuses {
                continue;
            }

            let message = format!(
                "Class '{}' inherits from '{}' but does not use its members.",
                class.name(),
                model.symbol(base).name
            );
            out.push(self.diagnostic(unit, name_location(class.syntax()), message));
        }
    }
}

/// Base type declared in source; library and keyword bases are out of scope
fn source_base(model: &dyn SemanticModel, own: SymbolId) -> Option<SymbolId> {
    let base = model.base_type_of(own)?;
    let symbol = model.symbol(base);
    let ty = symbol.as_type()?;
    (symbol.is_source() && ty.special.is_none()).then_some(base)
}

fn uses_base_members(class: ClassNode<'_>, base: SymbolId, model: &dyn SemanticModel) -> bool {
    class
        .syntax()
        .descendants()
        .filter(|node| matches!(node.kind, SyntaxKind::MemberAccess | SyntaxKind::Identifier))
        .filter_map(|node| model.resolve_symbol(node))
        .any(|id| model.containing_type_of(id) == Some(base))
}

/// `throw new NotImplementedException(..)` as a top-level statement of the
/// body, or as the whole expression body
fn throws_not_implemented(method: MethodNode<'_>, unit: &SourceUnit) -> bool {
    let Some(body) = method.body() else {
        return false;
    };
    let throws: Vec<&SyntaxNode> = match body.kind {
        SyntaxKind::Block => body.children_of_kind(SyntaxKind::Throw).collect(),
        _ => body.children_of_kind(SyntaxKind::ThrowExpression).collect(),
    };
    throws.into_iter().any(|throw| {
        throw
            .child_of_kind(SyntaxKind::ObjectCreation)
            .and_then(|creation| creation.children.first())
            .is_some_and(|ty| {
                let simple = unit.text_of(ty).rsplit('.').next().map(str::trim);
                simple == Some("NotImplementedException")
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smells::check_source;

    const BASE: &str = r#"
public class BaseClass
{
    protected int state;
    public virtual void Run() { }
    public void Reset() { state = 0; }
}
"#;

    fn check(derived: &str) -> Vec<Diagnostic> {
        check_source(&RefusedBequest, &[BASE, derived])
    }

    #[test]
    fn test_accepts_a_class_that_overrides_and_uses() {
        let derived = r#"
public class DerivedClass : BaseClass
{
    public override void Run() { Reset(); }
}
"#;
        assert!(check(derived).is_empty());
    }

    #[test]
    fn test_reports_a_class_that_ignores_its_base() {
        let derived = r#"
public class DerivedClass : BaseClass
{
    public void Other() { }
}
"#;
        let diagnostics = check(derived);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].message,
            "Class 'DerivedClass' inherits from 'BaseClass' but does not use its members."
        );
        assert_eq!(diagnostics[0].span.start_line, 2);
    }

    #[test]
    fn test_override_without_use_is_reported() {
        let derived = r#"
public class DerivedClass : BaseClass
{
    public override void Run() { }
}
"#;
        assert_eq!(check(derived).len(), 1);
    }

    #[test]
    fn test_not_implemented_override_is_reported() {
        let derived = r#"
using System;
public class DerivedClass : BaseClass
{
    public override void Run()
    {
        state = 1;
        throw new NotImplementedException();
    }
}
"#;
        assert_eq!(check(derived).len(), 1);

        let arrow = r#"
public class DerivedClass : BaseClass
{
    public void Use() { Reset(); }
    public override void Run() => throw new System.NotImplementedException();
}
"#;
        assert_eq!(check(arrow).len(), 1);
    }

    #[test]
    fn test_library_and_missing_bases_are_skipped() {
        let source = r#"
using System;
public class Plain { }
public class AppError : Exception { }
"#;
        assert!(check_source(&RefusedBequest, &[source]).is_empty());
    }
}
