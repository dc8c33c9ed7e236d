//! Semantic model over a compilation of C# units
//!
//! Metrics never look names up themselves; they ask a `SemanticModel`
//! which symbol a node declares or references.

mod binder;
pub mod symbol;

pub use symbol::{
    Declaration, MethodKind, MethodSymbol, SpecialType, Symbol, SymbolId, SymbolKind, SymbolTable,
    TypeKind, TypeSymbol,
};

use crate::syntax::{SourceUnit, SyntaxNode};
use binder::{Binder, UnitBindings};

/// Symbol queries over one document
pub trait SemanticModel {
    /// Symbol referenced by an identifier, member access, member binding,
    /// invocation, object creation or type syntax
    fn resolve_symbol(&self, node: &SyntaxNode) -> Option<SymbolId>;

    /// Symbol introduced by a declaration node
    fn declared_symbol(&self, node: &SyntaxNode) -> Option<SymbolId>;

    fn symbol(&self, id: SymbolId) -> &Symbol;

    fn containing_type_of(&self, id: SymbolId) -> Option<SymbolId> {
        self.symbol(id).containing_type
    }

    fn base_type_of(&self, ty: SymbolId) -> Option<SymbolId> {
        self.symbol(ty).as_type().and_then(|ty| ty.base_type)
    }

    /// Framework symbol: no known assembly, or one matching a prefix
    fn is_system_symbol(&self, id: SymbolId, prefixes: &[String]) -> bool {
        match &self.symbol(id).assembly {
            None => true,
            Some(assembly) => prefixes
                .iter()
                .any(|prefix| assembly.starts_with(prefix.as_str())),
        }
    }
}

/// Every unit of a set of projects, bound together
///
/// Each source symbol keeps the assembly of the project declaring it, so a
/// type from a sibling project is source code, not framework code.
#[derive(Debug, Clone)]
pub struct Compilation {
    assemblies: Vec<String>,
    units: Vec<SourceUnit>,
    symbols: SymbolTable,
    bindings: Vec<UnitBindings>,
}

impl Compilation {
    /// One project
    pub fn build(assembly: impl Into<String>, units: Vec<SourceUnit>) -> Self {
        Self::from_projects(vec![(assembly.into(), units)])
    }

    /// Several projects, as `(assembly, units)` pairs, bound as one
    pub fn from_projects(projects: Vec<(String, Vec<SourceUnit>)>) -> Self {
        let mut assemblies = Vec::new();
        let mut units = Vec::new();
        for (assembly, project_units) in projects {
            assemblies.extend(std::iter::repeat(assembly).take(project_units.len()));
            units.extend(project_units);
        }
        let (symbols, bindings) = Binder::new(&assemblies, &units).bind();
        tracing::debug!(
            units = units.len(),
            symbols = symbols.len(),
            "compilation bound"
        );
        Compilation {
            assemblies,
            units,
            symbols,
            bindings,
        }
    }

    /// Assembly of the project a unit belongs to; `unit` indexes `units()`
    pub fn assembly_of(&self, unit: usize) -> &str {
        self.assemblies.get(unit).map_or("", String::as_str)
    }

    pub fn units(&self) -> &[SourceUnit] {
        &self.units
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Per-document view; `unit` indexes `units()`
    pub fn model(&self, unit: usize) -> DocumentModel<'_> {
        DocumentModel {
            compilation: self,
            unit,
        }
    }

    /// Source type by `Namespace.Outer.Name`
    pub fn find_type(&self, qualified_name: &str) -> Option<SymbolId> {
        self.symbols
            .iter()
            .find(|symbol| {
                symbol.is_type() && symbol.is_source() && symbol.qualified_name == qualified_name
            })
            .map(|symbol| symbol.id)
    }
}

/// `SemanticModel` of one unit of a `Compilation`
#[derive(Debug, Clone, Copy)]
pub struct DocumentModel<'c> {
    compilation: &'c Compilation,
    unit: usize,
}

impl<'c> DocumentModel<'c> {
    pub fn unit(&self) -> &'c SourceUnit {
        &self.compilation.units[self.unit]
    }

    pub fn compilation(&self) -> &'c Compilation {
        self.compilation
    }
}

impl SemanticModel for DocumentModel<'_> {
    fn resolve_symbol(&self, node: &SyntaxNode) -> Option<SymbolId> {
        self.compilation.bindings[self.unit]
            .resolved
            .get(&node.id)
            .copied()
    }

    fn declared_symbol(&self, node: &SyntaxNode) -> Option<SymbolId> {
        self.compilation.bindings[self.unit]
            .declared
            .get(&node.id)
            .copied()
    }

    fn symbol(&self, id: SymbolId) -> &Symbol {
        self.compilation.symbols.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::csharp::parser::parse_source;
    use crate::syntax::{SyntaxKind, SyntaxNode};

    fn compile(sources: &[&str]) -> Compilation {
        let units = sources.iter().map(|source| parse_source(source)).collect();
        Compilation::build("App", units)
    }

    fn find<'a>(unit: &'a SourceUnit, kind: SyntaxKind, text: &str) -> &'a SyntaxNode {
        unit.root
            .descendants()
            .find(|node| node.kind == kind && node.text() == text)
            .unwrap_or_else(|| panic!("no {kind:?} '{text}'"))
    }

    #[test]
    fn test_same_name_in_two_namespaces_are_distinct() {
        let compilation = compile(&[
            "namespace A { public class Item { public void Touch() {} } }",
            "namespace B { public class Item { public void Touch() {} } }",
            "using B;\nnamespace C { class User { void Run(Item item) { item.Touch(); } } }",
        ]);
        let a = compilation.find_type("A.Item").unwrap();
        let b = compilation.find_type("B.Item").unwrap();
        assert_ne!(a, b);

        let model = compilation.model(2);
        let call = find(model.unit(), SyntaxKind::Invocation, "Touch");
        let method = model.resolve_symbol(call).unwrap();
        assert_eq!(model.containing_type_of(method), Some(b));
    }

    #[test]
    fn test_sibling_project_types_keep_their_assembly() {
        let compilation = Compilation::from_projects(vec![
            (
                "Shop.Core".to_string(),
                vec![parse_source(
                    "namespace Shop.Core { public class Ledger { public void Post() {} } }",
                )],
            ),
            (
                "Shop.App".to_string(),
                vec![parse_source(
                    "using Shop.Core;\n\
                     namespace Shop.App { class Clerk { void Run(Ledger l) { l.Post(); } } }",
                )],
            ),
        ]);
        assert_eq!(compilation.assembly_of(0), "Shop.Core");
        assert_eq!(compilation.assembly_of(1), "Shop.App");

        let ledger = compilation.find_type("Shop.Core.Ledger").unwrap();
        let clerk = compilation.find_type("Shop.App.Clerk").unwrap();
        assert_eq!(compilation.symbols().get(ledger).assembly.as_deref(), Some("Shop.Core"));
        assert_eq!(compilation.symbols().get(clerk).assembly.as_deref(), Some("Shop.App"));

        let model = compilation.model(1);
        let call = model
            .unit()
            .root
            .descendants()
            .find(|node| node.kind == SyntaxKind::Invocation)
            .unwrap();
        let post = model.resolve_symbol(call).unwrap();
        assert_eq!(model.containing_type_of(post), Some(ledger));
        let prefixes = vec!["System".to_string(), "Microsoft".to_string()];
        assert!(!model.is_system_symbol(post, &prefixes));
    }

    #[test]
    fn test_field_references_and_shadowing() {
        let compilation = compile(&[r#"
class Counter {
    private int count;
    void Increment() { count++; this.count += 1; }
    void Shadow() { int count = 0; count++; }
}"#]);
        let model = compilation.model(0);
        let unit = model.unit();
        let field = compilation.find_type("Counter").and_then(|ty| {
            model
                .symbol(ty)
                .as_type()
                .unwrap()
                .members
                .iter()
                .copied()
                .find(|&m| model.symbol(m).is_field())
        });
        let field = field.unwrap();

        let increment = find(unit, SyntaxKind::Method, "Increment");
        let references: Vec<SymbolId> = increment
            .descendants()
            .filter(|node| node.kind == SyntaxKind::Identifier && node.text() == "count")
            .filter_map(|node| model.resolve_symbol(node))
            .collect();
        assert_eq!(references, vec![field, field]);

        let shadow = find(unit, SyntaxKind::Method, "Shadow");
        let local_use = shadow
            .descendants()
            .find(|node| node.kind == SyntaxKind::Identifier && node.text() == "count")
            .unwrap();
        let local = model.resolve_symbol(local_use).unwrap();
        assert_ne!(local, field);
        assert!(matches!(model.symbol(local).kind, SymbolKind::Local { .. }));
    }

    #[test]
    fn test_calls_through_typed_locals_and_properties() {
        let compilation = compile(&[r#"
namespace Shop {
    public class Order { public decimal Total() { return 0; } }
    public class Customer { public Order Current { get; set; } }
    public class Billing {
        public void Charge(Customer customer) {
            var order = customer.Current;
            order.Total();
            customer.Current.Total();
        }
    }
}"#]);
        let model = compilation.model(0);
        let order = compilation.find_type("Shop.Order").unwrap();
        let calls: Vec<_> = model
            .unit()
            .root
            .descendants()
            .filter(|node| node.kind == SyntaxKind::Invocation)
            .collect();
        assert_eq!(calls.len(), 2);
        for call in calls {
            let method = model.resolve_symbol(call).unwrap();
            assert_eq!(model.symbol(method).name, "Total");
            assert_eq!(model.containing_type_of(method), Some(order));
        }
    }

    #[test]
    fn test_base_chain_and_override_target() {
        let compilation = compile(&[r#"
class Shape { public virtual double Area(int scale) { return 0; } }
class Square : Shape { public override double Area(int scale) { return 1; } }
"#]);
        let model = compilation.model(0);
        let shape = compilation.find_type("Shape").unwrap();
        let square = compilation.find_type("Square").unwrap();
        assert_eq!(model.base_type_of(square), Some(shape));

        let object = model.base_type_of(shape).unwrap();
        assert_eq!(model.symbol(object).as_type().unwrap().special, Some(SpecialType::Object));

        let overriding = model
            .declared_symbol(find(model.unit(), SyntaxKind::Method, "Area"))
            .unwrap();
        assert_eq!(model.containing_type_of(overriding), Some(shape), "first Area is Shape's");
        let square_area = model
            .symbol(square)
            .as_type()
            .unwrap()
            .members
            .iter()
            .copied()
            .find(|&m| model.symbol(m).is_method())
            .unwrap();
        let target = model.symbol(square_area).as_method().unwrap().overridden;
        assert_eq!(target, Some(overriding));
    }

    #[test]
    fn test_external_calls_are_system_symbols() {
        let compilation = compile(&[r#"
using System;
class Program { static void Main() { Console.WriteLine("hi"); } }
"#]);
        let model = compilation.model(0);
        let call = find(model.unit(), SyntaxKind::Invocation, "WriteLine");
        let method = model.resolve_symbol(call).unwrap();
        let console = model.containing_type_of(method).unwrap();
        assert_eq!(model.symbol(console).name, "Console");
        assert!(!model.symbol(console).is_source());

        let prefixes = vec!["System.".to_string()];
        assert!(model.is_system_symbol(method, &prefixes));
        let program = compilation.find_type("Program").unwrap();
        assert!(!model.is_system_symbol(program, &prefixes));
    }

    #[test]
    fn test_external_interface_in_base_list() {
        let compilation = compile(&[r#"
class Resource : IDisposable { public void Dispose() {} }
class Page : Control { void Draw() { Invalidate(); } }
"#]);
        let model = compilation.model(0);
        let resource = compilation.find_type("Resource").unwrap();
        let base = model.base_type_of(resource).unwrap();
        assert_eq!(model.symbol(base).as_type().unwrap().special, Some(SpecialType::Object));
        assert_eq!(model.symbol(resource).as_type().unwrap().interfaces.len(), 1);

        let page = compilation.find_type("Page").unwrap();
        let control = model.base_type_of(page).unwrap();
        assert_eq!(model.symbol(control).name, "Control");
        let call = find(model.unit(), SyntaxKind::Invocation, "Invalidate");
        let method = model.resolve_symbol(call).unwrap();
        assert_eq!(model.containing_type_of(method), Some(control));
    }

    #[test]
    fn test_extension_method_call() {
        let compilation = compile(&[r#"
namespace Util {
    public static class TextExtensions { public static int Words(this string text) { return 0; } }
    class Reader { int Count(string line) { return line.Words(); } }
}"#]);
        let model = compilation.model(0);
        let call = find(model.unit(), SyntaxKind::Invocation, "Words");
        let method = model.resolve_symbol(call).unwrap();
        let owner = model.containing_type_of(method).unwrap();
        assert_eq!(model.symbol(owner).qualified_name, "Util.TextExtensions");
    }

    #[test]
    fn test_partial_classes_share_a_symbol() {
        let compilation = compile(&[
            "namespace P { partial class Split { int a; } }",
            "namespace P { partial class Split { int b; } }",
        ]);
        let split = compilation.find_type("P.Split").unwrap();
        let first = compilation.model(0);
        let second = compilation.model(1);
        let in_first = find(first.unit(), SyntaxKind::Class, "Split");
        let in_second = find(second.unit(), SyntaxKind::Class, "Split");
        assert_eq!(first.declared_symbol(in_first), Some(split));
        assert_eq!(second.declared_symbol(in_second), Some(split));
        assert_eq!(first.symbol(split).as_type().unwrap().members.len(), 2);
    }

    #[test]
    fn test_type_syntax_resolution() {
        let compilation = compile(&[r#"
namespace Zoo {
    class Keeper {}
    class Cage<T> { T animal; Keeper keeper; int size; System.Text.StringBuilder log; }
}"#]);
        let model = compilation.model(0);
        let unit = model.unit();
        let keeper = compilation.find_type("Zoo.Keeper").unwrap();
        let keeper_ref = find(unit, SyntaxKind::Identifier, "Keeper");
        assert_eq!(model.resolve_symbol(keeper_ref), Some(keeper));

        let type_parameter = find(unit, SyntaxKind::Identifier, "T");
        assert_eq!(model.resolve_symbol(type_parameter), None);

        let int = unit
            .root
            .descendants()
            .find(|node| node.kind == SyntaxKind::PredefinedType)
            .unwrap();
        let int = model.resolve_symbol(int).unwrap();
        assert!(model.symbol(int).as_type().unwrap().is_value_type());

        let builder = unit
            .root
            .descendants()
            .find(|node| node.kind == SyntaxKind::QualifiedName)
            .unwrap();
        let builder = model.resolve_symbol(builder).unwrap();
        assert_eq!(model.symbol(builder).name, "StringBuilder");
    }
}
