//! Typed views over class-like and method declarations

use super::{Modifier, Modifiers, SyntaxKind, SyntaxNode};

/// A class, struct, record or interface declaration
#[derive(Debug, Clone, Copy)]
pub struct ClassNode<'a> {
    node: &'a SyntaxNode,
}

impl<'a> ClassNode<'a> {
    pub fn cast(node: &'a SyntaxNode) -> Option<Self> {
        match node.kind {
            SyntaxKind::Class | SyntaxKind::Struct | SyntaxKind::Record | SyntaxKind::Interface => {
                Some(ClassNode { node })
            }
            _ => None,
        }
    }

    pub fn syntax(&self) -> &'a SyntaxNode {
        self.node
    }

    pub fn kind(&self) -> SyntaxKind {
        self.node.kind
    }

    pub fn name(&self) -> &'a str {
        self.node.text()
    }

    pub fn modifiers(&self) -> Modifiers {
        self.node.modifiers
    }

    pub fn base_list(&self) -> Option<&'a SyntaxNode> {
        self.node.child_of_kind(SyntaxKind::BaseList)
    }

    /// Member declarations (base list, type and primary-constructor parameters excluded)
    pub fn members(&self) -> impl Iterator<Item = &'a SyntaxNode> {
        self.node
            .children
            .iter()
            .filter(|child| {
                !matches!(
                    child.kind,
                    SyntaxKind::BaseList | SyntaxKind::ParameterList | SyntaxKind::TypeParameterList
                )
            })
    }

    pub fn methods(&self) -> Vec<MethodNode<'a>> {
        self.members().filter_map(MethodNode::cast).collect()
    }

    pub fn fields(&self) -> impl Iterator<Item = &'a SyntaxNode> {
        self.node.children_of_kind(SyntaxKind::Field)
    }

    /// One entry per declared field variable (`int a, b;` yields two)
    pub fn field_declarators(&self) -> Vec<(&'a SyntaxNode, &'a SyntaxNode)> {
        let mut declarators = Vec::new();
        for field in self.fields() {
            for declaration in field.children_of_kind(SyntaxKind::VariableDeclaration) {
                for declarator in declaration.children_of_kind(SyntaxKind::VariableDeclarator) {
                    declarators.push((field, declarator));
                }
            }
        }
        declarators
    }

    pub fn field_names(&self) -> Vec<&'a str> {
        self.field_declarators()
            .into_iter()
            .map(|(_, declarator)| declarator.text())
            .collect()
    }

    pub fn properties(&self) -> impl Iterator<Item = &'a SyntaxNode> {
        self.node.children_of_kind(SyntaxKind::Property)
    }

    pub fn nested_classes(&self) -> impl Iterator<Item = &'a SyntaxNode> {
        self.node.children_of_kind(SyntaxKind::Class)
    }
}

/// A method declaration
#[derive(Debug, Clone, Copy)]
pub struct MethodNode<'a> {
    node: &'a SyntaxNode,
}

impl<'a> MethodNode<'a> {
    pub fn cast(node: &'a SyntaxNode) -> Option<Self> {
        (node.kind == SyntaxKind::Method).then_some(MethodNode { node })
    }

    pub fn syntax(&self) -> &'a SyntaxNode {
        self.node
    }

    pub fn name(&self) -> &'a str {
        self.node.text()
    }

    pub fn modifiers(&self) -> Modifiers {
        self.node.modifiers
    }

    pub fn is_static(&self) -> bool {
        self.node.modifiers.contains(Modifier::Static)
    }

    pub fn return_type(&self) -> Option<&'a SyntaxNode> {
        self.node
            .children
            .first()
            .filter(|child| child.kind.is_type_syntax())
    }

    pub fn parameters(&self) -> Vec<&'a SyntaxNode> {
        self.node
            .child_of_kind(SyntaxKind::ParameterList)
            .map(|list| list.children_of_kind(SyntaxKind::Parameter).collect())
            .unwrap_or_default()
    }

    /// Block or `=> expr` body; `None` for abstract, extern and partial declarations
    pub fn body(&self) -> Option<&'a SyntaxNode> {
        self.node
            .children
            .iter()
            .find(|child| matches!(child.kind, SyntaxKind::Block | SyntaxKind::ArrowExpression))
    }

    pub fn is_expression_bodied(&self) -> bool {
        self.body()
            .is_some_and(|body| body.kind == SyntaxKind::ArrowExpression)
    }
}
