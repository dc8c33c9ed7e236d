//! Lowering of the tree-sitter C# concrete tree into `SyntaxNode`s
//!
//! Grammar revisions differ in a few places (switch labels, `this`/`base`
//! being named or anonymous, file-scoped namespaces); both shapes are
//! accepted wherever they differ.

use crate::language::tree_sitter_utils::{find_child_by_kind, last_named_child};
use crate::language::SourceSpan;
use crate::syntax::{Modifier, Modifiers, NodeId, SyntaxKind, SyntaxNode};
use tree_sitter::Node;

/// Lower a `compilation_unit` root
pub(crate) fn lower_compilation_unit(root: Node<'_>, source: &str) -> SyntaxNode {
    let mut lowerer = Lowerer { source, next_id: 0 };
    lowerer.compilation_unit(root)
}

/// Kinds dropped with their whole subtree
const DROPPED: &[&str] = &[
    "comment",
    "modifier",
    "attribute_list",
    "global_attribute",
    "type_parameter_constraints_clause",
    "explicit_interface_specifier",
    "name_colon",
    "name_equals",
    "extern_alias_directive",
    "interpolation_format_clause",
    "string_content",
    "string_literal_content",
    "string_literal_encoding",
    "escape_sequence",
    "interpolation_brace",
    "interpolation_start",
    "interpolation_quote",
    "raw_string_start",
    "raw_string_end",
    "raw_string_content",
    "shebang_directive",
];

/// Kinds replaced by their lowered children
const TRANSPARENT: &[&str] = &[
    "declaration_list",
    "switch_body",
    "equals_value_clause",
    "enum_member_declaration_list",
    "global_statement",
    "interpolation",
    "array_rank_specifier",
    "primary_constructor_base_type",
    "preproc_if",
    "preproc_elif",
    "preproc_else",
];

struct Lowerer<'s> {
    source: &'s str,
    next_id: u32,
}

impl<'s> Lowerer<'s> {
    fn text(&self, node: Node<'_>) -> &'s str {
        self.source
            .get(node.start_byte()..node.end_byte())
            .unwrap_or("")
    }

    /// Allocate a node; ids are handed out before children are lowered so
    /// they follow pre-order.
    fn make(&mut self, kind: SyntaxKind, node: Node<'_>, text: Option<String>) -> SyntaxNode {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        SyntaxNode {
            id,
            kind,
            span: SourceSpan::from_node(node),
            text,
            name_span: None,
            modifiers: Modifiers::default(),
            children: Vec::new(),
        }
    }

    fn compilation_unit(&mut self, root: Node<'_>) -> SyntaxNode {
        let mut unit = self.make(SyntaxKind::CompilationUnit, root, None);
        let mut file_namespace: Option<SyntaxNode> = None;

        let mut cursor = root.walk();
        let children: Vec<Node<'_>> = root.named_children(&mut cursor).collect();
        for child in children {
            if child.kind() == "file_scoped_namespace_declaration" {
                let name = child.child_by_field_name("name");
                let text = name.map(|n| compact(self.text(n)));
                let mut namespace = self.make(SyntaxKind::Namespace, child, text);
                namespace.children = self.lower_children_except(child, &[name]);
                file_namespace = Some(namespace);
                continue;
            }
            let lowered = self.lower(child);
            match file_namespace.as_mut() {
                Some(namespace) if child.kind() != "using_directive" => {
                    namespace.children.extend(lowered)
                }
                _ => unit.children.extend(lowered),
            }
        }
        if let Some(mut namespace) = file_namespace {
            if let Some(last) = namespace.children.last() {
                namespace.span.end = namespace.span.end.max(last.span.end);
                namespace.span.end_line = namespace.span.end_line.max(last.span.end_line);
            }
            unit.children.push(namespace);
        }
        unit
    }

    fn lower(&mut self, node: Node<'_>) -> Vec<SyntaxNode> {
        let kind = node.kind();
        if DROPPED.contains(&kind) || is_directive(kind) {
            return Vec::new();
        }
        if TRANSPARENT.contains(&kind) {
            let condition = node.child_by_field_name("condition");
            return self.lower_children_except(node, &[condition]);
        }
        vec![self.lower_node(node)]
    }

    fn lower_node(&mut self, node: Node<'_>) -> SyntaxNode {
        match node.kind() {
            "namespace_declaration" => {
                let name = node.child_by_field_name("name");
                let text = name.map(|n| compact(self.text(n)));
                self.declaration(SyntaxKind::Namespace, node, text, &[name])
            }
            "using_directive" => {
                let text = using_target(self.text(node));
                self.make(SyntaxKind::UsingDirective, node, Some(text))
            }
            "class_declaration" => self.named_declaration(SyntaxKind::Class, node),
            "struct_declaration" => self.named_declaration(SyntaxKind::Struct, node),
            "interface_declaration" => self.named_declaration(SyntaxKind::Interface, node),
            "record_declaration" | "record_struct_declaration" => {
                self.named_declaration(SyntaxKind::Record, node)
            }
            "enum_declaration" => self.named_declaration(SyntaxKind::Enum, node),
            "enum_member_declaration" => self.named_declaration(SyntaxKind::EnumMember, node),
            "delegate_declaration" => self.named_declaration(SyntaxKind::Delegate, node),
            "field_declaration" => self.declaration(SyntaxKind::Field, node, None, &[]),
            "event_field_declaration" => self.declaration(SyntaxKind::Event, node, None, &[]),
            "event_declaration" => self.named_declaration(SyntaxKind::Event, node),
            "property_declaration" => self.named_declaration(SyntaxKind::Property, node),
            "indexer_declaration" => self.declaration(SyntaxKind::Indexer, node, None, &[]),
            "method_declaration" => self.named_declaration(SyntaxKind::Method, node),
            "constructor_declaration" => self.named_declaration(SyntaxKind::Constructor, node),
            "destructor_declaration" => self.named_declaration(SyntaxKind::Destructor, node),
            "operator_declaration" | "conversion_operator_declaration" => {
                self.declaration(SyntaxKind::Operator, node, None, &[])
            }
            "local_function_statement" => self.named_declaration(SyntaxKind::LocalFunction, node),
            "accessor_list" => self.plain(SyntaxKind::AccessorList, node),
            "accessor_declaration" => {
                let name = node.child_by_field_name("name");
                let text = name.map(|n| self.text(n).to_string());
                self.declaration(SyntaxKind::Accessor, node, text, &[name])
            }
            "base_list" => self.plain(SyntaxKind::BaseList, node),
            "type_parameter_list" => self.plain(SyntaxKind::TypeParameterList, node),
            "type_parameter" => {
                let name = node
                    .child_by_field_name("name")
                    .or_else(|| find_child_by_kind(node, "identifier"));
                let text = name.map(|n| self.text(n).to_string());
                self.declaration(SyntaxKind::TypeParameter, node, text, &[name])
            }
            "parameter_list" | "bracketed_parameter_list" => {
                self.plain(SyntaxKind::ParameterList, node)
            }
            "parameter" => self.named_declaration(SyntaxKind::Parameter, node),
            "variable_declaration" => self.plain(SyntaxKind::VariableDeclaration, node),
            "variable_declarator" => {
                let name = node.child_by_field_name("name").or_else(|| {
                    node.named_child(0)
                        .filter(|child| child.kind() == "identifier")
                });
                let text = name.map(|n| self.text(n).to_string());
                self.declaration(SyntaxKind::VariableDeclarator, node, text, &[name])
            }
            "arrow_expression_clause" => self.plain(SyntaxKind::ArrowExpression, node),
            "constructor_initializer" => self.plain(SyntaxKind::ConstructorInitializer, node),

            "identifier" => {
                let text = self.text(node).to_string();
                self.make(SyntaxKind::Identifier, node, Some(text))
            }
            "generic_name" => {
                let identifier = find_child_by_kind(node, "identifier");
                let text = identifier.map(|n| self.text(n).to_string());
                self.declaration(SyntaxKind::GenericName, node, text, &[identifier])
            }
            "qualified_name" | "alias_qualified_name" => {
                let text = compact(self.text(node));
                let mut lowered = self.make(SyntaxKind::QualifiedName, node, Some(text));
                lowered.children = self.lower_children_except(node, &[]);
                lowered
            }
            "predefined_type" => {
                let text = self.text(node).to_string();
                self.make(SyntaxKind::PredefinedType, node, Some(text))
            }
            "implicit_type" => self.make(SyntaxKind::ImplicitType, node, Some("var".to_string())),
            "array_type" => self.plain(SyntaxKind::ArrayType, node),
            "nullable_type" => self.plain(SyntaxKind::NullableType, node),
            "tuple_type" => self.plain(SyntaxKind::TupleType, node),
            "pointer_type" => self.plain(SyntaxKind::PointerType, node),
            "type_argument_list" => self.plain(SyntaxKind::TypeArgumentList, node),
            "tuple_element" => {
                let name = node.child_by_field_name("name");
                self.declaration(SyntaxKind::Other, node, None, &[name])
            }

            "block" => self.plain(SyntaxKind::Block, node),
            "local_declaration_statement" => self.plain(SyntaxKind::LocalDeclaration, node),
            "expression_statement" => self.plain(SyntaxKind::ExpressionStatement, node),
            "if_statement" => self.plain(SyntaxKind::If, node),
            "while_statement" => self.plain(SyntaxKind::While, node),
            "do_statement" => self.plain(SyntaxKind::Do, node),
            "for_statement" => self.plain(SyntaxKind::For, node),
            "foreach_statement" => {
                let left = node
                    .child_by_field_name("left")
                    .filter(|n| matches!(n.kind(), "implicit_parameter" | "identifier"));
                let text = left.map(|n| self.text(n).to_string());
                self.declaration(SyntaxKind::ForEach, node, text, &[left])
            }
            "switch_statement" => self.plain(SyntaxKind::Switch, node),
            "switch_section" => self.switch_section(node),
            "case_switch_label" | "case_pattern_switch_label" => {
                self.plain(SyntaxKind::CaseLabel, node)
            }
            "default_switch_label" => self.plain(SyntaxKind::DefaultLabel, node),
            "switch_expression" => self.plain(SyntaxKind::SwitchExpression, node),
            "switch_expression_arm" => self.plain(SyntaxKind::SwitchExpressionArm, node),
            "break_statement" => self.plain(SyntaxKind::Break, node),
            "continue_statement" => self.plain(SyntaxKind::Continue, node),
            "return_statement" => self.plain(SyntaxKind::Return, node),
            "goto_statement" => self.plain(SyntaxKind::Goto, node),
            "throw_statement" => self.plain(SyntaxKind::Throw, node),
            "throw_expression" => self.plain(SyntaxKind::ThrowExpression, node),
            "try_statement" => self.plain(SyntaxKind::Try, node),
            "catch_clause" => self.plain(SyntaxKind::Catch, node),
            "catch_declaration" => self.named_declaration(SyntaxKind::CatchDeclaration, node),
            "finally_clause" => self.plain(SyntaxKind::Finally, node),
            "using_statement" => self.plain(SyntaxKind::Using, node),
            "lock_statement" => self.plain(SyntaxKind::Lock, node),
            "yield_statement" => self.plain(SyntaxKind::Yield, node),
            "labeled_statement" => {
                let label = find_child_by_kind(node, "identifier");
                let text = label.map(|n| self.text(n).to_string());
                self.declaration(SyntaxKind::Labeled, node, text, &[label])
            }
            "empty_statement" => self.plain(SyntaxKind::Empty, node),

            "member_access_expression" => {
                let text = node
                    .child_by_field_name("name")
                    .map(|name| self.simple_name(name));
                let mut lowered = self.make(SyntaxKind::MemberAccess, node, text);
                lowered.children = self.lower_children_except(node, &[]);
                lowered
            }
            "conditional_access_expression" => self.plain(SyntaxKind::ConditionalAccess, node),
            "member_binding_expression" => {
                let text = node
                    .child_by_field_name("name")
                    .map(|name| self.simple_name(name));
                let mut lowered = self.make(SyntaxKind::MemberBinding, node, text);
                lowered.children = self.lower_children_except(node, &[]);
                lowered
            }
            "invocation_expression" => {
                let text = node
                    .child_by_field_name("function")
                    .map(|callee| self.callee_name(callee));
                let mut lowered = self.make(SyntaxKind::Invocation, node, text);
                lowered.children = self.lower_children_except(node, &[]);
                lowered
            }
            "argument_list" | "bracketed_argument_list" => {
                self.plain(SyntaxKind::ArgumentList, node)
            }
            "argument" => self.argument(node),
            "object_creation_expression"
            | "implicit_object_creation_expression"
            | "anonymous_object_creation_expression" => {
                self.plain(SyntaxKind::ObjectCreation, node)
            }
            "array_creation_expression"
            | "implicit_array_creation_expression"
            | "stackalloc_expression"
            | "implicit_stackalloc_expression" => self.plain(SyntaxKind::ArrayCreation, node),
            "initializer_expression" => self.plain(SyntaxKind::Initializer, node),
            "cast_expression" => self.plain(SyntaxKind::Cast, node),
            "as_expression" => self.plain(SyntaxKind::As, node),
            "is_expression" | "is_pattern_expression" => self.plain(SyntaxKind::Is, node),
            "binary_expression" => self.operator_node(SyntaxKind::Binary, node),
            "assignment_expression" => self.operator_node(SyntaxKind::Assignment, node),
            "prefix_unary_expression" => {
                let text = node.child(0).map(|op| self.text(op).to_string());
                let mut lowered = self.make(SyntaxKind::PrefixUnary, node, text);
                lowered.children = self.lower_children_except(node, &[]);
                lowered
            }
            "postfix_unary_expression" => {
                let text = node
                    .child(node.child_count().saturating_sub(1))
                    .map(|op| self.text(op).to_string());
                let mut lowered = self.make(SyntaxKind::PostfixUnary, node, text);
                lowered.children = self.lower_children_except(node, &[]);
                lowered
            }
            "conditional_expression" => self.plain(SyntaxKind::Conditional, node),
            "lambda_expression" => self.lambda(node),
            "anonymous_method_expression" => self.plain(SyntaxKind::Lambda, node),
            "this_expression" | "this" => self.make(SyntaxKind::This, node, None),
            "base_expression" | "base" => self.make(SyntaxKind::Base, node, None),
            "integer_literal" => self.literal(node, "int"),
            "real_literal" => self.literal(node, "double"),
            "string_literal" | "verbatim_string_literal" | "raw_string_literal" => {
                self.literal(node, "string")
            }
            "character_literal" => self.literal(node, "char"),
            "boolean_literal" => self.literal(node, "bool"),
            "null_literal" => self.literal(node, "null"),
            "interpolated_string_expression" => self.plain(SyntaxKind::InterpolatedString, node),
            "element_access_expression" | "element_binding_expression" => {
                self.plain(SyntaxKind::ElementAccess, node)
            }
            "parenthesized_expression" => self.plain(SyntaxKind::Parenthesized, node),
            "typeof_expression" => self.plain(SyntaxKind::TypeOf, node),
            "default_expression" => self.plain(SyntaxKind::Default, node),
            "await_expression" => self.plain(SyntaxKind::Await, node),
            "query_expression" => self.plain(SyntaxKind::Query, node),
            "tuple_expression" => self.plain(SyntaxKind::Tuple, node),
            "declaration_expression" => {
                self.named_declaration(SyntaxKind::DeclarationExpression, node)
            }
            "declaration_pattern" => {
                let designation = last_named_child(node).filter(|n| n.kind() == "identifier");
                let text = designation.map(|n| self.text(n).to_string());
                self.declaration(SyntaxKind::DeclarationExpression, node, text, &[designation])
            }
            _ => self.plain(SyntaxKind::Other, node),
        }
    }

    fn plain(&mut self, kind: SyntaxKind, node: Node<'_>) -> SyntaxNode {
        let mut lowered = self.make(kind, node, None);
        lowered.children = self.lower_children_except(node, &[]);
        lowered
    }

    fn named_declaration(&mut self, kind: SyntaxKind, node: Node<'_>) -> SyntaxNode {
        let name = node.child_by_field_name("name");
        let text = name.map(|n| self.text(n).to_string());
        let mut lowered = self.declaration(kind, node, text, &[name]);
        lowered.name_span = name.map(SourceSpan::from_node);
        lowered
    }

    fn declaration(
        &mut self,
        kind: SyntaxKind,
        node: Node<'_>,
        text: Option<String>,
        skip: &[Option<Node<'_>>],
    ) -> SyntaxNode {
        let mut lowered = self.make(kind, node, text);
        lowered.modifiers = self.modifiers(node);
        lowered.children = self.lower_children_except(node, skip);
        lowered
    }

    fn operator_node(&mut self, kind: SyntaxKind, node: Node<'_>) -> SyntaxNode {
        let operator = node.child_by_field_name("operator").or_else(|| {
            let mut cursor = node.walk();
            let found = node.children(&mut cursor).find(|child| !child.is_named());
            found
        });
        let text = operator.map(|op| self.text(op).trim().to_string());
        let mut lowered = self.make(kind, node, text);
        lowered.children = self.lower_children_except(node, &[operator]);
        lowered
    }

    fn literal(&mut self, node: Node<'_>, type_keyword: &str) -> SyntaxNode {
        self.make(SyntaxKind::Literal, node, Some(type_keyword.to_string()))
    }

    /// The `name:` label of a named argument is not a reference
    fn argument(&mut self, node: Node<'_>) -> SyntaxNode {
        let label = node.child_by_field_name("name");
        let mut lowered = self.make(SyntaxKind::Argument, node, None);
        lowered.children = self.lower_children_except(node, &[label]);
        lowered
    }

    fn lambda(&mut self, node: Node<'_>) -> SyntaxNode {
        let mut lowered = self.make(SyntaxKind::Lambda, node, None);
        let implicit = node
            .child_by_field_name("parameters")
            .filter(|n| matches!(n.kind(), "implicit_parameter" | "identifier"));
        if let Some(parameter) = implicit {
            let mut list = self.make(SyntaxKind::ParameterList, parameter, None);
            let name = self.text(parameter).to_string();
            list.children
                .push(self.make(SyntaxKind::Parameter, parameter, Some(name)));
            lowered.children.push(list);
        }
        let rest = self.lower_children_except(node, &[implicit]);
        lowered.children.extend(rest);
        lowered
    }

    /// Sections either wrap labels in `*_switch_label` nodes or inline
    /// `case`/`default` tokens followed by the label expression.
    fn switch_section(&mut self, node: Node<'_>) -> SyntaxNode {
        let mut section = self.make(SyntaxKind::SwitchSection, node, None);
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        for child in children {
            match (child.is_named(), child.kind()) {
                (false, "case") => {
                    let label = self.make(SyntaxKind::CaseLabel, child, None);
                    section.children.push(label);
                }
                (false, "default") => {
                    let label = self.make(SyntaxKind::DefaultLabel, child, None);
                    section.children.push(label);
                }
                (true, _) => {
                    let lowered = self.lower(child);
                    section.children.extend(lowered);
                }
                _ => {}
            }
        }
        section
    }

    fn modifiers(&self, node: Node<'_>) -> Modifiers {
        let mut cursor = node.walk();
        let modifiers = node
            .children(&mut cursor)
            .filter(|child| {
                matches!(child.kind(), "modifier" | "parameter_modifier") || !child.is_named()
            })
            .flat_map(|child| {
                self.text(child)
                    .split_whitespace()
                    .filter_map(Modifier::from_keyword)
                    .collect::<Vec<_>>()
            })
            .collect();
        modifiers
    }

    fn lower_children_except(
        &mut self,
        node: Node<'_>,
        skip: &[Option<Node<'_>>],
    ) -> Vec<SyntaxNode> {
        let skip_ids: Vec<usize> = skip.iter().flatten().map(|n| n.id()).collect();
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        let mut lowered = Vec::new();
        for child in children {
            if skip_ids.contains(&child.id()) {
                continue;
            }
            if child.is_named() || matches!(child.kind(), "this" | "base") {
                lowered.extend(self.lower(child));
            }
        }
        lowered
    }

    /// Rightmost simple identifier of a name (`Foo`, `Foo<T>`, `A.B.Foo`)
    fn simple_name(&self, node: Node<'_>) -> String {
        match node.kind() {
            "generic_name" => node
                .named_child(0)
                .map(|n| self.text(n).to_string())
                .unwrap_or_default(),
            "qualified_name" => node
                .child_by_field_name("name")
                .or_else(|| last_named_child(node))
                .map(|n| self.simple_name(n))
                .unwrap_or_default(),
            _ => self.text(node).trim().to_string(),
        }
    }

    fn callee_name(&self, callee: Node<'_>) -> String {
        match callee.kind() {
            "member_access_expression" | "member_binding_expression" => callee
                .child_by_field_name("name")
                .map(|name| self.simple_name(name))
                .unwrap_or_default(),
            "identifier" | "generic_name" | "qualified_name" => self.simple_name(callee),
            _ => String::new(),
        }
    }
}

/// Preprocessor directives without code of their own
fn is_directive(kind: &str) -> bool {
    kind.starts_with("preproc_") && !TRANSPARENT.contains(&kind)
}

fn compact(text: &str) -> String {
    text.split_whitespace().collect()
}

/// `using static System.Math;` -> `System.Math`, `using IO = System.IO;` -> `System.IO`
fn using_target(text: &str) -> String {
    let mut rest = text.trim().trim_end_matches(';').trim();
    for keyword in ["global", "using", "static", "unsafe"] {
        if let Some(stripped) = rest.strip_prefix(keyword) {
            if stripped.starts_with(char::is_whitespace) {
                rest = stripped.trim_start();
            }
        }
    }
    let target = match rest.split_once('=') {
        Some((_, target)) => target,
        None => rest,
    };
    compact(target)
}
