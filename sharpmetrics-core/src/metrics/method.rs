//! Method-level metric formulas

use super::foreign_accesses;
use crate::semantic::{SemanticModel, SymbolId};
use crate::syntax::query::{
    count_kind, count_kinds, count_matching, matching_ancestor_counts, max_nesting,
};
use crate::syntax::{ClassNode, MethodNode, SourceUnit, SyntaxKind, SyntaxNode};
use crate::text;
use std::collections::HashSet;

/// Raw metrics for one method
#[derive(Debug, Clone, PartialEq)]
pub struct MethodRaw {
    pub cyclo: usize,
    pub cyclo_switch: usize,
    pub mloc: usize,
    pub meloc: usize,
    pub nop: usize,
    pub nolv: usize,
    pub notc: usize,
    pub mnol: usize,
    pub mnor: usize,
    pub mnoc: usize,
    pub mnoa: usize,
    pub nonl: usize,
    pub nosl: usize,
    pub nomo: usize,
    pub nope: usize,
    pub nole: usize,
    pub mmnb: usize,
    pub nouw: usize,
    pub aid: f64,
    pub atfd: usize,
}

/// Extract all metrics for a method declared in `owner`
pub fn extract_method_metrics(
    owner: ClassNode<'_>,
    method: MethodNode<'_>,
    unit: &SourceUnit,
    model: &dyn SemanticModel,
) -> MethodRaw {
    let declaring = model.declared_symbol(owner.syntax());
    let external = external_calls(method, declaring, model);
    MethodRaw {
        cyclo: cyclomatic_complexity(method, unit),
        cyclo_switch: switch_complexity(method, unit),
        mloc: lines_of_code(method),
        meloc: effective_lines_of_code(method, unit),
        nop: method.parameters().len(),
        nolv: count_kind(method.syntax(), SyntaxKind::VariableDeclarator),
        notc: count_kind(method.syntax(), SyntaxKind::Cast),
        mnol: max_nesting(method.syntax(), |n| n.kind.is_loop()),
        mnor: recursive_calls(method),
        mnoc: max_nesting(method.syntax(), |n| n.is(SyntaxKind::If)),
        mnoa: max_nesting(method.syntax(), |n| n.is(SyntaxKind::ArrayCreation)),
        nonl: nested_loops(method),
        nosl: statements_in_loops(method),
        nomo: overloads(owner, method),
        nope: external
            .iter()
            .map(|&callee| parameter_count(callee, model))
            .sum(),
        nole: external.len(),
        mmnb: max_nesting(method.syntax(), |n| n.is(SyntaxKind::Block)),
        nouw: unused_variables(method),
        aid: average_invocation_depth(method),
        atfd: foreign_accesses(method.syntax(), declaring, model, None).len(),
    }
}

/// Decision points that are not switch labels
const BRANCH_KINDS: &[SyntaxKind] = &[
    SyntaxKind::If,
    SyntaxKind::While,
    SyntaxKind::For,
    SyntaxKind::ForEach,
    SyntaxKind::Do,
    SyntaxKind::Conditional,
    SyntaxKind::Catch,
];

/// Short-circuit and null-coalescing operators, counted in the text
const LOGICAL_OPERATORS: &[&str] = &["&&", "||", "??"];

fn logical_operators(method: MethodNode<'_>, unit: &SourceUnit) -> usize {
    let source = unit.text_of(method.syntax());
    LOGICAL_OPERATORS
        .iter()
        .map(|operator| text::count_operator_tokens(source, operator))
        .sum()
}

/// Calculate Cyclomatic Complexity
///
/// 1 + branches + every case label, default label and switch-expression arm
/// + `&&`, `||` and `??` outside comments and literals
pub fn cyclomatic_complexity(method: MethodNode<'_>, unit: &SourceUnit) -> usize {
    let labels = count_matching(method.syntax(), |n| n.kind.is_case_label());
    1 + count_kinds(method.syntax(), BRANCH_KINDS) + labels + logical_operators(method, unit)
}

/// Cyclomatic complexity with each switch counted once instead of per label
pub fn switch_complexity(method: MethodNode<'_>, unit: &SourceUnit) -> usize {
    let switches = count_kinds(
        method.syntax(),
        &[SyntaxKind::Switch, SyntaxKind::SwitchExpression],
    );
    1 + count_kinds(method.syntax(), BRANCH_KINDS) + switches + logical_operators(method, unit)
}

pub fn lines_of_code(method: MethodNode<'_>) -> usize {
    method.syntax().span.line_count() as usize
}

pub fn effective_lines_of_code(method: MethodNode<'_>, unit: &SourceUnit) -> usize {
    text::effective_lines(unit.text_of(method.syntax()))
}

/// `Name(..)` and `this.Name(..)` calls inside the method's own body
fn recursive_calls(method: MethodNode<'_>) -> usize {
    let name = method.name();
    method
        .syntax()
        .descendants()
        .filter(|n| n.kind == SyntaxKind::Invocation)
        .filter_map(|n| n.children.first())
        .filter(|callee| match callee.kind {
            SyntaxKind::Identifier | SyntaxKind::GenericName => callee.text() == name,
            SyntaxKind::MemberAccess => {
                callee.text() == name
                    && callee
                        .children
                        .first()
                        .is_some_and(|target| target.kind == SyntaxKind::This)
            }
            _ => false,
        })
        .count()
}

/// Loops with at least one enclosing loop
fn nested_loops(method: MethodNode<'_>) -> usize {
    matching_ancestor_counts(method.syntax(), |n| n.kind.is_loop())
        .into_iter()
        .filter(|&enclosing| enclosing > 0)
        .count()
}

fn loop_body(node: &SyntaxNode) -> Option<&SyntaxNode> {
    match node.kind {
        SyntaxKind::Do => node.children.first(),
        _ => node.children.last(),
    }
}

/// Statements directly inside loop bodies; a non-block body is one statement
fn statements_in_loops(method: MethodNode<'_>) -> usize {
    method
        .syntax()
        .descendants()
        .filter(|n| n.kind.is_loop())
        .filter_map(loop_body)
        .map(|body| match body.kind {
            SyntaxKind::Block => body.children.len(),
            _ => 1,
        })
        .sum()
}

/// Methods of the declaring type sharing this method's name, itself included
fn overloads(owner: ClassNode<'_>, method: MethodNode<'_>) -> usize {
    owner
        .methods()
        .iter()
        .filter(|other| other.name() == method.name())
        .count()
}

/// Invoked methods whose containing type is not the declaring type
fn external_calls(
    method: MethodNode<'_>,
    declaring: Option<SymbolId>,
    model: &dyn SemanticModel,
) -> Vec<SymbolId> {
    super::invoked_methods(method.syntax(), model)
        .into_iter()
        .filter(|&callee| model.containing_type_of(callee) != declaring)
        .collect()
}

fn parameter_count(method: SymbolId, model: &dyn SemanticModel) -> usize {
    model
        .symbol(method)
        .as_method()
        .map_or(0, |method| method.parameters.len())
}

/// Declared variables whose name never shows up as an identifier reference
fn unused_variables(method: MethodNode<'_>) -> usize {
    let referenced: HashSet<&str> = method
        .syntax()
        .descendants()
        .filter(|n| n.kind == SyntaxKind::Identifier)
        .map(SyntaxNode::text)
        .collect();
    method
        .syntax()
        .descendants()
        .filter(|n| n.kind == SyntaxKind::VariableDeclarator)
        .filter(|declarator| !referenced.contains(declarator.text()))
        .count()
}

/// Mean number of enclosing invocations per invocation
fn average_invocation_depth(method: MethodNode<'_>) -> f64 {
    let depths = matching_ancestor_counts(method.syntax(), |n| n.is(SyntaxKind::Invocation));
    if depths.is_empty() {
        return 0.0;
    }
    depths.iter().sum::<usize>() as f64 / depths.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::csharp::parser::parse_source;
    use crate::semantic::Compilation;

    /// Metrics of the method `name` in a single-document compilation
    fn metrics_of(source: &str, name: &str) -> MethodRaw {
        let compilation = Compilation::build("App", vec![parse_source(source)]);
        let model = compilation.model(0);
        let unit = model.unit();
        let (owner, method) = unit
            .methods()
            .into_iter()
            .find(|(_, method)| method.name() == name)
            .unwrap_or_else(|| panic!("no method {name}"));
        extract_method_metrics(owner, method, unit, &model)
    }

    #[test]
    fn test_simple_lambda_parameter_takes_delegate_type() {
        let source = r#"
using System;
class Order { public int Total; public int Tax() { return 0; } }
class S {
    void Simple() { Func<Order, int> f = o => o.Total + o.Tax(); }
    void Paren() { Func<Order, int> f = (Order o) => o.Total + o.Tax(); }
}"#;
        let paren = metrics_of(source, "Paren");
        assert_eq!((paren.atfd, paren.nole), (2, 1));
        let simple = metrics_of(source, "Simple");
        assert_eq!((simple.atfd, simple.nole), (2, 1));
    }

    #[test]
    fn test_straight_line_method_has_unit_complexity() {
        let metrics = metrics_of("class A { int One() { return 1; } }", "One");
        assert_eq!(metrics.cyclo, 1);
        assert_eq!(metrics.cyclo_switch, 1);
        assert_eq!(metrics.meloc, 1);
        assert_eq!(metrics.mloc, 1);
        assert_eq!(metrics.aid, 0.0);
    }

    #[test]
    fn test_cyclomatic_complexity_counts_branches_and_operators() {
        let source = r#"
class A {
    int Classify(int x, string s) {
        // a && b in a comment does not count
        if (x > 0 && x < 10) { return 1; }
        for (int i = 0; i < x; i++) { x--; }
        var label = s ?? "none";
        try { x = x > 5 ? 1 : 2; } catch (System.Exception) { }
        switch (x) {
            case 1: return 1;
            case 2:
            case 3: return 2;
            default: return 0;
        }
    }
}"#;
        let metrics = metrics_of(source, "Classify");
        // if, for, ?:, catch = 4; labels = 4; && and ?? = 2
        assert_eq!(metrics.cyclo, 1 + 4 + 4 + 2);
        // the switch counts once
        assert_eq!(metrics.cyclo_switch, 1 + 4 + 1 + 2);
    }

    #[test]
    fn test_interpolated_string_holes_count_toward_complexity() {
        let source = r#"
class A {
    string Describe(bool a, bool b, bool p, bool q) {
        if (p || q) { return "both"; }
        return $"{(a && b ? 1 : 2)} && {{not || code}}";
    }
}"#;
        let metrics = metrics_of(source, "Describe");
        // if, ?:, || and the && inside the hole
        assert_eq!(metrics.cyclo, 5);
    }

    #[test]
    fn test_switch_expression_arms() {
        let source = r#"
class A {
    string Name(int x) => x switch { 1 => "one", 2 => "two", _ => "many" };
}"#;
        let metrics = metrics_of(source, "Name");
        assert_eq!(metrics.cyclo, 4);
        assert_eq!(metrics.cyclo_switch, 2);
    }

    #[test]
    fn test_nesting_metrics() {
        let source = r#"
class A {
    void Walk(int[][] grid) {
        foreach (var row in grid) {
            for (int i = 0; i < row.Length; i++) {
                if (row[i] > 0) {
                    if (row[i] > 10) { row[i] = 0; }
                }
            }
        }
        while (true) break;
        var jagged = new int[][] { new int[] { 1 } };
    }
}"#;
        let metrics = metrics_of(source, "Walk");
        assert_eq!(metrics.mnol, 2);
        assert_eq!(metrics.mnoc, 2);
        assert_eq!(metrics.nonl, 1);
        assert_eq!(metrics.mnoa, 2);
        // foreach block: 1 statement, for block: 1, while: 1
        assert_eq!(metrics.nosl, 3);
        // body, foreach, for, if, if
        assert_eq!(metrics.mmnb, 5);
    }

    #[test]
    fn test_recursion_and_overloads() {
        let source = r#"
class A {
    int Fact(int n) { return n <= 1 ? 1 : n * Fact(n - 1) + this.Fact(0) - other.Fact(0); }
    int Fact() { return 0; }
    A other;
}"#;
        let metrics = metrics_of(source, "Fact");
        assert_eq!(metrics.mnor, 2);
        assert_eq!(metrics.nomo, 2);
        assert_eq!(metrics.nop, 1);
    }

    #[test]
    fn test_variables_casts_and_unused() {
        let source = r#"
class A {
    double Mix(object o) {
        int used = (int)o, unused = 0;
        var scale = (double)used;
        return scale;
    }
}"#;
        let metrics = metrics_of(source, "Mix");
        assert_eq!(metrics.nolv, 3);
        assert_eq!(metrics.notc, 2);
        assert_eq!(metrics.nouw, 1);
    }

    #[test]
    fn test_external_calls_and_invocation_depth() {
        let source = r#"
class Repo { public int Load(int id, string key) { return id; } public void Save() {} }
class Service {
    Repo repo;
    int Run() {
        repo.Save();
        Local();
        return repo.Load(Local(), "k");
    }
    int Local() { return 0; }
}"#;
        let metrics = metrics_of(source, "Run");
        assert_eq!(metrics.nole, 2);
        assert_eq!(metrics.nope, 2);
        // Save: 0, Local: 0, Load: 0, inner Local: 1
        assert_eq!(metrics.aid, 0.25);
        // repo.Save and repo.Load
        assert_eq!(metrics.atfd, 2);
    }

    #[test]
    fn test_expression_bodied_lines() {
        let source = "class A {\n    int Twice(int x)\n        => x * 2;\n}";
        let metrics = metrics_of(source, "Twice");
        assert_eq!(metrics.mloc, 2);
        assert_eq!(metrics.meloc, 1);
    }
}
