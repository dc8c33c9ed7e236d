//! Cohesion measures built on a method-field usage relation
//!
//! Each method maps to the set of the class's own fields it references.
//! LCOM, LCOM3 and LCOM4 use symbol resolution; TCC uses textual matching
//! against the declared field names.

use crate::semantic::{SemanticModel, SymbolId};
use crate::syntax::{ClassNode, SyntaxKind};
use std::collections::{BTreeSet, HashSet};

/// Own fields referenced by each method of a class, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldUsage {
    methods: Vec<BTreeSet<SymbolId>>,
}

impl FieldUsage {
    /// Resolve every identifier in each method body and keep fields whose
    /// containing type is the class itself
    pub fn resolve(class: ClassNode<'_>, model: &dyn SemanticModel) -> Self {
        let own = model.declared_symbol(class.syntax());
        let methods = class
            .methods()
            .iter()
            .map(|method| {
                method
                    .syntax()
                    .descendants()
                    .filter(|node| node.kind == SyntaxKind::Identifier)
                    .filter_map(|node| model.resolve_symbol(node))
                    .filter(|&id| {
                        let symbol = model.symbol(id);
                        symbol.is_field() && own.is_some() && symbol.containing_type == own
                    })
                    .collect()
            })
            .collect();
        FieldUsage { methods }
    }

    pub fn from_sets(methods: Vec<BTreeSet<SymbolId>>) -> Self {
        FieldUsage { methods }
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    fn shares(&self, a: usize, b: usize) -> bool {
        !self.methods[a].is_disjoint(&self.methods[b])
    }

    /// `(sharing, not sharing)` over every unordered method pair
    fn pair_counts(&self) -> (usize, usize) {
        let mut sharing = 0;
        let mut disjoint = 0;
        for a in 0..self.methods.len() {
            for b in a + 1..self.methods.len() {
                if self.shares(a, b) {
                    sharing += 1;
                } else {
                    disjoint += 1;
                }
            }
        }
        (sharing, disjoint)
    }

    /// LCOM: pairs not sharing a field minus pairs sharing one, floored at 0
    pub fn lcom(&self) -> usize {
        let (sharing, disjoint) = self.pair_counts();
        disjoint.saturating_sub(sharing)
    }

    /// LCOM3: 1 - sharing pairs / all pairs; 0 with fewer than two methods
    pub fn lcom3(&self) -> f64 {
        let (sharing, disjoint) = self.pair_counts();
        let total = sharing + disjoint;
        if total == 0 {
            return 0.0;
        }
        1.0 - sharing as f64 / total as f64
    }

    /// LCOM4: connected components of the field-sharing graph
    pub fn lcom4(&self) -> usize {
        let count = self.methods.len();
        let mut visited = vec![false; count];
        let mut components = 0;

        for start in 0..count {
            if visited[start] {
                continue;
            }
            components += 1;
            visited[start] = true;
            let mut stack = vec![start];
            while let Some(current) = stack.pop() {
                for next in 0..count {
                    if !visited[next] && self.shares(current, next) {
                        visited[next] = true;
                        stack.push(next);
                    }
                }
            }
        }

        components
    }
}

/// TCC: share of method pairs referencing a common field name; 1.0 with
/// fewer than two methods
pub fn tight_class_cohesion(class: ClassNode<'_>) -> f64 {
    let fields: HashSet<&str> = class.field_names().into_iter().collect();
    let used: Vec<HashSet<&str>> = class
        .methods()
        .iter()
        .map(|method| {
            method
                .syntax()
                .descendants()
                .filter(|node| node.kind == SyntaxKind::Identifier)
                .map(|node| node.text())
                .filter(|name| fields.contains(name))
                .collect()
        })
        .collect();

    if used.len() < 2 {
        return 1.0;
    }

    let mut sharing = 0;
    let mut total = 0;
    for a in 0..used.len() {
        for b in a + 1..used.len() {
            total += 1;
            if !used[a].is_disjoint(&used[b]) {
                sharing += 1;
            }
        }
    }
    sharing as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::csharp::parser::parse_source;
    use crate::semantic::Compilation;

    fn sets(groups: &[&[u32]]) -> FieldUsage {
        FieldUsage::from_sets(
            groups
                .iter()
                .map(|fields| fields.iter().map(|&f| SymbolId(f)).collect())
                .collect(),
        )
    }

    #[test]
    fn test_empty_and_single_method() {
        let none = sets(&[]);
        assert_eq!(none.lcom(), 0);
        assert_eq!(none.lcom3(), 0.0);
        assert_eq!(none.lcom4(), 0);

        let one = sets(&[&[1]]);
        assert_eq!(one.lcom(), 0);
        assert_eq!(one.lcom3(), 0.0);
        assert_eq!(one.lcom4(), 1);
    }

    #[test]
    fn test_two_components() {
        // A and B share x, C uses y only
        let usage = sets(&[&[1], &[1], &[2]]);
        assert_eq!(usage.lcom4(), 2);
        // pairs: AB share, AC and BC do not
        assert_eq!(usage.lcom(), 1);
        assert!((usage.lcom3() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_order_independent() {
        let forward = sets(&[&[1], &[1, 2], &[2], &[3]]);
        let backward = sets(&[&[3], &[2], &[1, 2], &[1]]);
        assert_eq!(forward.lcom(), backward.lcom());
        assert_eq!(forward.lcom3(), backward.lcom3());
        assert_eq!(forward.lcom4(), backward.lcom4());
        // transitive chain 1-12-2 is one component, 3 another
        assert_eq!(forward.lcom4(), 2);
    }

    #[test]
    fn test_methods_without_fields_are_isolated() {
        let usage = sets(&[&[], &[]]);
        assert_eq!(usage.lcom4(), 2);
        assert_eq!(usage.lcom(), 1);
        assert_eq!(usage.lcom3(), 1.0);
    }

    const SPLIT: &str = r#"
class Split {
    private int x;
    private int y;
    public void A() { x = 1; }
    public void B() { this.x++; }
    public void C() { y = 2; }
}"#;

    #[test]
    fn test_field_usage_from_source() {
        let compilation = Compilation::build("App", vec![parse_source(SPLIT)]);
        let model = compilation.model(0);
        let class = model.unit().classes()[0];
        let usage = FieldUsage::resolve(class, &model);
        assert_eq!(usage.method_count(), 3);
        assert_eq!(usage.lcom4(), 2);
        assert_eq!(usage.lcom(), 1);
    }

    #[test]
    fn test_tight_class_cohesion() {
        let unit = parse_source(SPLIT);
        let class = unit.classes()[0];
        assert!((tight_class_cohesion(class) - 1.0 / 3.0).abs() < 1e-9);

        let lone = parse_source("class Lone { int z; void Only() { z = 1; } }");
        assert_eq!(tight_class_cohesion(lone.classes()[0]), 1.0);
    }

    fn lcom4_of(source: &str) -> usize {
        let compilation = Compilation::build("App", vec![parse_source(source)]);
        let model = compilation.model(0);
        FieldUsage::resolve(model.unit().classes()[0], &model).lcom4()
    }

    #[test]
    fn test_lambda_parameter_shadows_field() {
        let source = r#"
using System;
class Shadow {
    int x;
    void B() { x = 1; }
    void C() { Func<int, int> f = x => x + 1; }
}"#;
        assert_eq!(lcom4_of(source), 2);
    }

    #[test]
    fn test_named_argument_label_is_not_a_field_use() {
        let source = r#"
class Labels {
    Order x;
    void Simple() { }
    void Paren() { }
    void Named() { Go(x: null); }
    void Go(Order x) { }
    void UseField() { x = null; }
}
class Order {}"#;
        assert_eq!(lcom4_of(source), 5);
    }

    #[test]
    fn test_other_instance_fields_count_as_own() {
        let source = r#"
class Point {
    int x;
    bool Same(Point other) { return other.x == x; }
    void Reset() { x = 0; }
}"#;
        let compilation = Compilation::build("App", vec![parse_source(source)]);
        let model = compilation.model(0);
        let usage = FieldUsage::resolve(model.unit().classes()[0], &model);
        assert_eq!(usage.lcom4(), 1);
    }
}
