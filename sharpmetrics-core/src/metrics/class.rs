//! Class-level metric formulas
//!
//! Most formulas count or sum over the class's direct members. Methods of
//! nested classes belong to the nested class.

use super::cohesion::{tight_class_cohesion, FieldUsage};
use super::method::{cyclomatic_complexity, effective_lines_of_code, switch_complexity};
use super::{declared_type, foreign_accesses, invoked_methods, ratio};
use crate::semantic::{SemanticModel, SpecialType, SymbolId, SymbolKind};
use crate::syntax::query::{count_kind, count_matching, max_nesting};
use crate::syntax::{
    Accessibility, ClassNode, MethodNode, Modifier, SourceUnit, SyntaxKind, SyntaxNode,
};
use std::collections::BTreeSet;

/// Upper bound on base-chain walks
const MAX_INHERITANCE_DEPTH: usize = 64;

/// Binary operators counted as comparisons
const COMPARISON_OPERATORS: &[&str] = &["==", "!=", "<", "<=", ">", ">=", "??"];

/// Raw metrics for one class
#[derive(Debug, Clone, PartialEq)]
pub struct ClassRaw {
    pub cloc: usize,
    pub celoc: usize,
    pub nmd: usize,
    pub nad: usize,
    pub nmd_nad: usize,
    pub wmc: usize,
    pub wmc_no_case: usize,
    pub lcom: usize,
    pub lcom3: f64,
    pub lcom4: usize,
    pub tcc: f64,
    pub atfd: usize,
    pub cnor: usize,
    pub cnol: usize,
    pub cnoc: usize,
    pub cnoa: usize,
    pub nopm: usize,
    pub nopf: usize,
    pub cmnb: usize,
    pub rfc: usize,
    pub cbo: usize,
    pub dit: usize,
    pub dcc: usize,
    pub atfd10: usize,
    pub nic: usize,
    pub woc: f64,
    pub nopa: usize,
    pub nopp: usize,
    pub wmcnamm: usize,
    pub bur: f64,
    pub bovr: f64,
}

/// Extract all metrics for a class
pub fn extract_class_metrics(
    class: ClassNode<'_>,
    unit: &SourceUnit,
    model: &dyn SemanticModel,
) -> ClassRaw {
    let own = model.declared_symbol(class.syntax());
    let methods = class.methods();
    let usage = FieldUsage::resolve(class, model);

    let nmd = methods.len();
    let nad = class.field_declarators().len();
    let nopm = methods
        .iter()
        .filter(|method| method.modifiers().contains(Modifier::Public))
        .count();

    ClassRaw {
        cloc: class.syntax().span.line_count() as usize,
        celoc: sum_over(&methods, |method| effective_lines_of_code(method, unit)),
        nmd,
        nad,
        nmd_nad: nmd + nad,
        wmc: sum_over(&methods, |method| cyclomatic_complexity(method, unit)),
        wmc_no_case: sum_over(&methods, |method| switch_complexity(method, unit)),
        lcom: usage.lcom(),
        lcom3: usage.lcom3(),
        lcom4: usage.lcom4(),
        tcc: tight_class_cohesion(class),
        atfd: sum_over(&methods, |method| {
            foreign_accesses(method.syntax(), own, model, None).len()
        }),
        cnor: sum_over(&methods, |method| count_kind(method.syntax(), SyntaxKind::Return)),
        cnol: sum_over(&methods, |method| {
            count_matching(method.syntax(), |n| n.kind.is_loop())
        }),
        cnoc: sum_over(&methods, |method| comparison_operators(method.syntax())),
        cnoa: sum_over(&methods, |method| {
            count_kind(method.syntax(), SyntaxKind::Assignment)
        }),
        nopm,
        nopf: field_declarators_with(class, Modifier::Protected),
        cmnb: methods
            .iter()
            .map(|method| max_nesting(method.syntax(), |n| n.is(SyntaxKind::Block)))
            .max()
            .unwrap_or(0),
        rfc: invoked_methods(class.syntax(), model)
            .into_iter()
            .collect::<BTreeSet<_>>()
            .len(),
        cbo: coupling_between_objects(class, model),
        dit: depth_of_inheritance(own, model),
        dcc: direct_class_coupling(class, model),
        atfd10: direct_foreign_accesses(class, own, model),
        nic: class.nested_classes().count(),
        woc: ratio(nopm, nmd),
        nopa: field_declarators_with(class, Modifier::Public),
        nopp: class
            .properties()
            .filter(|property| property.modifiers.contains(Modifier::Public))
            .count(),
        wmcnamm: methods
            .iter()
            .filter(|method| !is_trivial_accessor(**method, own, model))
            .map(|method| cyclomatic_complexity(*method, unit))
            .sum(),
        bur: base_usage_ratio(class, own, model),
        bovr: base_overridden_ratio(own, model),
    }
}

fn sum_over<F>(methods: &[MethodNode<'_>], metric: F) -> usize
where
    F: Fn(MethodNode<'_>) -> usize,
{
    methods.iter().map(|method| metric(*method)).sum()
}

/// `==`, `!=`, `<`, `<=`, `>`, `>=`, `??` and `??=`
fn comparison_operators(node: &SyntaxNode) -> usize {
    count_matching(node, |n| match n.kind {
        SyntaxKind::Binary => COMPARISON_OPERATORS.contains(&n.text()),
        SyntaxKind::Assignment => n.text() == "??=",
        _ => false,
    })
}

fn field_declarators_with(class: ClassNode<'_>, modifier: Modifier) -> usize {
    class
        .field_declarators()
        .into_iter()
        .filter(|(field, _)| field.modifiers.contains(modifier))
        .count()
}

/// Type syntax of every field, property, parameter and return type
fn signature_types<'a>(class: ClassNode<'a>) -> Vec<&'a SyntaxNode> {
    let mut types: Vec<&SyntaxNode> = class
        .fields()
        .chain(class.properties())
        .filter_map(declared_type)
        .collect();
    for method in class.methods() {
        types.extend(method.parameters().into_iter().filter_map(declared_type));
        types.extend(method.return_type());
    }
    types
}

fn is_named_type(id: SymbolId, model: &dyn SemanticModel) -> bool {
    model
        .symbol(id)
        .as_type()
        .is_some_and(|ty| ty.special.is_none())
}

/// Named types anywhere inside a type syntax, type arguments included
fn collect_named_types(node: &SyntaxNode, model: &dyn SemanticModel, out: &mut BTreeSet<SymbolId>) {
    match node.kind {
        SyntaxKind::Identifier | SyntaxKind::GenericName | SyntaxKind::QualifiedName => {
            if let Some(id) = model.resolve_symbol(node).filter(|&id| is_named_type(id, model)) {
                out.insert(id);
            }
        }
        _ => {}
    }
    if node.kind == SyntaxKind::QualifiedName {
        // only the type arguments; the qualifier names namespaces or outer types
        for arguments in node
            .descendants()
            .filter(|n| n.kind == SyntaxKind::TypeArgumentList)
        {
            for argument in &arguments.children {
                collect_named_types(argument, model, out);
            }
        }
        return;
    }
    for child in &node.children {
        collect_named_types(child, model, out);
    }
}

/// Distinct named types in field, property, parameter and return types
fn coupling_between_objects(class: ClassNode<'_>, model: &dyn SemanticModel) -> usize {
    let mut types = BTreeSet::new();
    for ty in signature_types(class) {
        collect_named_types(ty, model, &mut types);
    }
    types.len()
}

/// Distinct reference types written as the outermost field, property,
/// parameter or return type
fn direct_class_coupling(class: ClassNode<'_>, model: &dyn SemanticModel) -> usize {
    signature_types(class)
        .into_iter()
        .filter_map(|ty| {
            let outer = match ty.kind {
                SyntaxKind::NullableType => ty.children.first()?,
                _ => ty,
            };
            model.resolve_symbol(outer)
        })
        .filter(|&id| {
            model
                .symbol(id)
                .as_type()
                .is_some_and(|ty| !ty.is_value_type())
        })
        .collect::<BTreeSet<_>>()
        .len()
}

/// Base types between the class and `object`
fn depth_of_inheritance(own: Option<SymbolId>, model: &dyn SemanticModel) -> usize {
    let mut depth = 0;
    let mut current = own.and_then(|id| model.base_type_of(id));
    while let Some(base) = current {
        let is_object = model
            .symbol(base)
            .as_type()
            .is_some_and(|ty| ty.special == Some(SpecialType::Object));
        if is_object || depth >= MAX_INHERITANCE_DEPTH {
            break;
        }
        depth += 1;
        current = model.base_type_of(base);
    }
    depth
}

/// Member accesses in the class resolving to fields or methods of other types
fn direct_foreign_accesses(
    class: ClassNode<'_>,
    own: Option<SymbolId>,
    model: &dyn SemanticModel,
) -> usize {
    class
        .syntax()
        .descendants()
        .filter(|node| node.kind == SyntaxKind::MemberAccess)
        .filter_map(|node| model.resolve_symbol(node))
        .filter(|&id| {
            let symbol = model.symbol(id);
            (symbol.is_field() || symbol.is_method()) && symbol.containing_type != own
        })
        .count()
}

/// The expression a body evaluates: `=> expr` or a block holding one statement
fn single_statement(method: MethodNode<'_>) -> Option<&SyntaxNode> {
    let body = method.body()?;
    match body.kind {
        SyntaxKind::ArrowExpression => body.children.first(),
        _ if body.children.len() == 1 => body.children.first(),
        _ => None,
    }
}

/// `return field;` or `field = parameter;` as the whole body
fn is_trivial_accessor(
    method: MethodNode<'_>,
    own: Option<SymbolId>,
    model: &dyn SemanticModel,
) -> bool {
    let Some(statement) = single_statement(method) else {
        return false;
    };
    let is_own_field = |node: &SyntaxNode| {
        model.resolve_symbol(node).is_some_and(|id| {
            let symbol = model.symbol(id);
            symbol.is_field() && own.is_some() && symbol.containing_type == own
        })
    };
    let is_parameter = |node: &SyntaxNode| {
        model.resolve_symbol(node).is_some_and(|id| {
            matches!(model.symbol(id).kind, SymbolKind::Parameter { .. })
        })
    };

    let expression = match statement.kind {
        SyntaxKind::Return | SyntaxKind::ExpressionStatement => match statement.children.first() {
            Some(expression) => expression,
            None => return false,
        },
        _ => statement,
    };
    match expression.kind {
        SyntaxKind::Identifier | SyntaxKind::MemberAccess => {
            statement.kind != SyntaxKind::ExpressionStatement && is_own_field(expression)
        }
        SyntaxKind::Assignment if expression.text() == "=" => {
            match (expression.children.first(), expression.children.get(1)) {
                (Some(target), Some(value)) => is_own_field(target) && is_parameter(value),
                _ => false,
            }
        }
        _ => false,
    }
}

/// The class's base type when it is declared in source
fn source_base(own: Option<SymbolId>, model: &dyn SemanticModel) -> Option<SymbolId> {
    own.and_then(|id| model.base_type_of(id))
        .filter(|&base| model.symbol(base).is_source())
}

/// Used public/protected base members over all public/protected base members
fn base_usage_ratio(class: ClassNode<'_>, own: Option<SymbolId>, model: &dyn SemanticModel) -> f64 {
    let Some(base) = source_base(own, model) else {
        return 0.0;
    };
    let members: BTreeSet<SymbolId> = model
        .symbol(base)
        .as_type()
        .map(|ty| {
            ty.members
                .iter()
                .copied()
                .filter(|&member| {
                    matches!(
                        model.symbol(member).accessibility,
                        Accessibility::Public | Accessibility::Protected
                    )
                })
                .collect()
        })
        .unwrap_or_default();
    if members.is_empty() {
        return 0.0;
    }

    let used: BTreeSet<SymbolId> = class
        .syntax()
        .descendants()
        .filter(|node| matches!(node.kind, SyntaxKind::Invocation | SyntaxKind::MemberAccess))
        .filter_map(|node| model.resolve_symbol(node))
        .filter(|id| members.contains(id))
        .collect();
    ratio(used.len(), members.len())
}

/// Overridden base methods over the base's non-static, non-private ordinary methods
fn base_overridden_ratio(own: Option<SymbolId>, model: &dyn SemanticModel) -> f64 {
    let (Some(own), Some(base)) = (own, source_base(own, model)) else {
        return 0.0;
    };
    let member_ids = |ty: SymbolId| {
        model
            .symbol(ty)
            .as_type()
            .map(|ty| ty.members.clone())
            .unwrap_or_default()
    };

    let base_methods: Vec<SymbolId> = member_ids(base)
        .into_iter()
        .filter(|&id| {
            let symbol = model.symbol(id);
            symbol.is_ordinary_method()
                && !symbol.is_static()
                && symbol.accessibility != Accessibility::Private
        })
        .collect();
    if base_methods.is_empty() {
        return 0.0;
    }

    let overridden: BTreeSet<SymbolId> = member_ids(own)
        .into_iter()
        .filter_map(|id| model.symbol(id).as_method().and_then(|method| method.overridden))
        .collect();
    let count = base_methods
        .iter()
        .filter(|method| overridden.contains(method))
        .count();
    ratio(count, base_methods.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::csharp::parser::parse_source;
    use crate::semantic::Compilation;

    fn metrics_of(source: &str, name: &str) -> ClassRaw {
        let compilation = Compilation::build("App", vec![parse_source(source)]);
        let model = compilation.model(0);
        let unit = model.unit();
        let class = unit
            .classes()
            .into_iter()
            .find(|class| class.name() == name)
            .unwrap_or_else(|| panic!("no class {name}"));
        extract_class_metrics(class, unit, &model)
    }

    const INHERITANCE: &str = r#"
public class Base {
    public virtual void Foo() {}
    protected int counter;
}
public class Derived : Base {
    public override void Foo() { base.Foo(); }
}
public class Leaf : Derived {}
"#;

    #[test]
    fn test_override_calling_base() {
        let metrics = metrics_of(INHERITANCE, "Derived");
        assert_eq!(metrics.bovr, 1.0);
        assert!(metrics.bur > 0.0);
        // Foo used, counter not
        assert_eq!(metrics.bur, 0.5);
        assert_eq!(metrics.dit, 1);
    }

    #[test]
    fn test_depth_of_inheritance() {
        assert_eq!(metrics_of(INHERITANCE, "Base").dit, 0);
        assert_eq!(metrics_of(INHERITANCE, "Leaf").dit, 2);
        let base = metrics_of(INHERITANCE, "Base");
        assert_eq!(base.bur, 0.0);
        assert_eq!(base.bovr, 0.0);
    }

    #[test]
    fn test_counts_and_sum_invariant() {
        let source = r#"
public class Account {
    public int a, b;
    protected string owner;
    private decimal balance;
    public string Name { get; set; }
    internal int Hidden { get; set; }

    public void Deposit(decimal amount) {
        if (amount <= 0) { return; }
        balance += amount;
    }
    public decimal Balance() { return balance; }
    private void Reset() { balance = 0; a = b; }

    class Audit {}
}"#;
        let metrics = metrics_of(source, "Account");
        assert_eq!(metrics.nmd, 3);
        assert_eq!(metrics.nad, 4);
        assert_eq!(metrics.nmd_nad, metrics.nmd + metrics.nad);
        assert_eq!(metrics.nopa, 2);
        assert_eq!(metrics.nopf, 1);
        assert_eq!(metrics.nopp, 1);
        assert_eq!(metrics.nopm, 2);
        assert!((metrics.woc - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(metrics.nic, 1);
        assert_eq!(metrics.cnor, 2);
        assert_eq!(metrics.cnoc, 1);
        assert_eq!(metrics.cnoa, 3);
        assert_eq!(metrics.wmc, 2 + 1 + 1);
        // Balance() is a plain getter
        assert_eq!(metrics.wmcnamm, 2 + 1);
        assert_eq!(metrics.lcom4, 1);
    }

    #[test]
    fn test_coupling() {
        let source = r#"
using System.Collections.Generic;
namespace Shop {
    public class Order {}
    public struct Money {}
    public class Customer {}
    public class Cart {
        private List<Order> orders;
        private Money total;
        private int count;
        private Order[] history;
        public Customer Owner { get; set; }
        public Order Find(Customer customer, int id) { return null; }
        public void Clear() {}
    }
}"#;
        let metrics = metrics_of(source, "Cart");
        // List, Order, Money, Customer
        assert_eq!(metrics.cbo, 4);
        // List, Customer, Order
        assert_eq!(metrics.dcc, 3);
    }

    #[test]
    fn test_response_and_foreign_access() {
        let source = r#"
public class Engine { public int Power; public void Start() {} }
public class Car {
    private Engine engine;
    public void Drive() {
        engine.Start();
        engine.Start();
        var p = engine.Power;
        Honk();
    }
    private void Honk() {}
}"#;
        let metrics = metrics_of(source, "Car");
        // Engine.Start and Car.Honk
        assert_eq!(metrics.rfc, 2);
        assert_eq!(metrics.atfd, 3);
        assert_eq!(metrics.atfd10, 3);
    }

    #[test]
    fn test_class_without_methods() {
        let metrics = metrics_of("class Empty { int x; }", "Empty");
        assert_eq!(metrics.nmd, 0);
        assert_eq!(metrics.cmnb, 0);
        assert_eq!(metrics.woc, 0.0);
        assert_eq!(metrics.tcc, 1.0);
        assert_eq!(metrics.lcom3, 0.0);
        assert_eq!(metrics.lcom4, 0);
    }
}
