//! Name-based binder
//!
//! Runs in four passes over every unit of a compilation:
//! 1. declare types and members
//! 2. resolve signatures and base lists
//! 3. link `override` methods to the method they replace
//! 4. bind member bodies with a lexical scope stack
//!
//! Names that cannot be found in source become synthesized external
//! symbols without an assembly, so references into library code still get
//! a stable identity.

use super::symbol::{
    Declaration, MethodKind, MethodSymbol, SpecialType, Symbol, SymbolId, SymbolKind, SymbolTable,
    TypeKind, TypeSymbol,
};
use crate::syntax::{Accessibility, Modifier, Modifiers, NodeId, SourceUnit, SyntaxKind, SyntaxNode};
use std::collections::{HashMap, HashSet};

/// Guard against cyclic base lists in broken code
const MAX_CHAIN: usize = 64;

/// Members every type inherits from `object`
const OBJECT_MEMBERS: &[&str] = &[
    "ToString",
    "Equals",
    "GetHashCode",
    "GetType",
    "MemberwiseClone",
    "ReferenceEquals",
    "Finalize",
];

/// Framework value types commonly referenced by simple name
const KNOWN_STRUCTS: &[&str] = &[
    "DateTime",
    "DateTimeOffset",
    "TimeSpan",
    "Guid",
    "CancellationToken",
    "KeyValuePair",
    "Nullable",
    "Span",
    "ReadOnlySpan",
    "Memory",
    "ReadOnlyMemory",
    "ValueTuple",
    "ValueTask",
    "Int32",
    "Int64",
    "Boolean",
    "Double",
    "Decimal",
    "Char",
    "Byte",
];

/// Symbols attached to the nodes of one unit
#[derive(Debug, Clone, Default)]
pub(crate) struct UnitBindings {
    pub(crate) declared: HashMap<NodeId, SymbolId>,
    pub(crate) resolved: HashMap<NodeId, SymbolId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Want {
    Any,
    Method(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Signatures,
    Bodies,
}

/// What an expression denotes
#[derive(Debug, Clone, PartialEq)]
enum Bound {
    /// A value of the given type, when known
    Value(Option<SymbolId>),
    Type(SymbolId),
    Namespace(String),
    Nothing,
}

impl Bound {
    fn value_type(&self) -> Option<SymbolId> {
        match self {
            Bound::Value(ty) => *ty,
            _ => None,
        }
    }
}

/// Lexical context while walking a unit
struct Scope {
    unit: usize,
    namespace: String,
    /// Enclosing types, innermost last
    types: Vec<SymbolId>,
    type_parameters: Vec<String>,
    locals: Vec<Vec<(String, SymbolId)>>,
    /// Receiver of the `?.` chain being bound
    conditional_receiver: Option<SymbolId>,
}

impl Scope {
    fn new(unit: usize) -> Self {
        Scope {
            unit,
            namespace: String::new(),
            types: Vec::new(),
            type_parameters: Vec::new(),
            locals: Vec::new(),
            conditional_receiver: None,
        }
    }

    fn current_type(&self) -> Option<SymbolId> {
        self.types.last().copied()
    }

    fn push(&mut self) {
        self.locals.push(Vec::new());
    }

    fn pop(&mut self) {
        self.locals.pop();
    }

    fn define(&mut self, name: &str, id: SymbolId) {
        if name.is_empty() {
            return;
        }
        if let Some(frame) = self.locals.last_mut() {
            frame.push((name.to_string(), id));
        }
    }

    fn local(&self, name: &str) -> Option<SymbolId> {
        self.locals
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|(local, _)| local == name)
            .map(|(_, id)| *id)
    }

    fn is_type_parameter(&self, name: &str) -> bool {
        self.type_parameters.iter().any(|parameter| parameter == name)
    }

    /// Bring the type parameters declared on `node` into scope, returning
    /// the mark to truncate back to
    fn enter_type_parameters(&mut self, node: &SyntaxNode) -> usize {
        let mark = self.type_parameters.len();
        self.type_parameters.extend(type_parameter_names(node));
        mark
    }
}

pub(crate) struct Binder<'u> {
    /// Assembly of each unit, parallel to `units`
    assemblies: &'u [String],
    units: &'u [SourceUnit],
    table: SymbolTable,
    bindings: Vec<UnitBindings>,
    usings: Vec<Vec<String>>,
    namespaces: HashSet<String>,
    types_by_qualified: HashMap<String, SymbolId>,
    types_by_simple: HashMap<String, Vec<SymbolId>>,
    extensions: HashMap<String, Vec<SymbolId>>,
    primary_parameters: HashMap<SymbolId, Vec<SymbolId>>,
    specials: HashMap<SpecialType, SymbolId>,
    externals: HashMap<String, SymbolId>,
    external_members: HashMap<(SymbolId, String, Option<usize>), SymbolId>,
}

impl<'u> Binder<'u> {
    pub(crate) fn new(assemblies: &'u [String], units: &'u [SourceUnit]) -> Self {
        let usings = units
            .iter()
            .map(|unit| {
                unit.root
                    .descendants()
                    .filter(|node| node.kind == SyntaxKind::UsingDirective)
                    .map(|node| node.text().to_string())
                    .collect()
            })
            .collect();
        let mut binder = Binder {
            assemblies,
            units,
            table: SymbolTable::default(),
            bindings: vec![UnitBindings::default(); units.len()],
            usings,
            namespaces: HashSet::new(),
            types_by_qualified: HashMap::new(),
            types_by_simple: HashMap::new(),
            extensions: HashMap::new(),
            primary_parameters: HashMap::new(),
            specials: HashMap::new(),
            externals: HashMap::new(),
            external_members: HashMap::new(),
        };
        binder.add_namespace("System");
        binder.add_namespace("Microsoft");
        let targets: Vec<String> = binder.usings.iter().flatten().cloned().collect();
        for target in targets {
            binder.add_namespace(&target);
        }
        binder
    }

    pub(crate) fn bind(mut self) -> (SymbolTable, Vec<UnitBindings>) {
        let units = self.units;
        for (index, unit) in units.iter().enumerate() {
            self.declare_container(index, &unit.root, "", None);
        }
        for (index, unit) in units.iter().enumerate() {
            let mut scope = Scope::new(index);
            self.walk(&unit.root, &mut scope, Pass::Signatures);
        }
        self.resolve_overrides();
        for (index, unit) in units.iter().enumerate() {
            let mut scope = Scope::new(index);
            self.walk(&unit.root, &mut scope, Pass::Bodies);
        }
        (self.table, self.bindings)
    }

    // ----- pass 1: declarations -----

    fn declare_container(
        &mut self,
        unit: usize,
        node: &'u SyntaxNode,
        namespace: &str,
        containing: Option<SymbolId>,
    ) {
        for child in &node.children {
            match child.kind {
                SyntaxKind::Namespace => {
                    let namespace = qualify(namespace, child.text());
                    self.add_namespace(&namespace);
                    self.declare_container(unit, child, &namespace, None);
                }
                SyntaxKind::Delegate => {
                    self.declare_type(unit, child, namespace, containing);
                }
                kind if kind.is_type_declaration() => {
                    let id = self.declare_type(unit, child, namespace, containing);
                    self.declare_container(unit, child, namespace, Some(id));
                }
                _ => {
                    if let Some(owner) = containing {
                        self.declare_member(unit, child, owner);
                    }
                }
            }
        }
    }

    fn declare_type(
        &mut self,
        unit: usize,
        node: &'u SyntaxNode,
        namespace: &str,
        containing: Option<SymbolId>,
    ) -> SymbolId {
        let name = node.text().to_string();
        let qualified_name = match containing {
            Some(outer) => format!("{}.{}", self.table.get(outer).qualified_name, name),
            None => qualify(namespace, &name),
        };

        // partial declarations share one symbol
        if node.modifiers.contains(Modifier::Partial) {
            if let Some(&existing) = self.types_by_qualified.get(&qualified_name) {
                if self.table.get(existing).modifiers.contains(Modifier::Partial) {
                    self.bindings[unit].declared.insert(node.id, existing);
                    return existing;
                }
            }
        }

        let type_kind = match node.kind {
            SyntaxKind::Struct => TypeKind::Struct,
            SyntaxKind::Interface => TypeKind::Interface,
            SyntaxKind::Enum => TypeKind::Enum,
            SyntaxKind::Record => TypeKind::Record,
            SyntaxKind::Delegate => TypeKind::Delegate,
            _ => TypeKind::Class,
        };
        let default = if containing.is_some() {
            Accessibility::Private
        } else {
            Accessibility::Internal
        };
        let id = self.table.add(Symbol {
            id: SymbolId(0),
            name: name.clone(),
            qualified_name: qualified_name.clone(),
            kind: SymbolKind::Type(TypeSymbol {
                type_kind,
                special: None,
                base_type: None,
                interfaces: Vec::new(),
                members: Vec::new(),
                type_parameters: type_parameter_names(node).collect(),
            }),
            containing_type: containing,
            accessibility: node.modifiers.accessibility(default),
            modifiers: node.modifiers,
            assembly: self.assemblies.get(unit).cloned(),
            declaration: Some(Declaration { unit, node: node.id }),
        });
        self.bindings[unit].declared.insert(node.id, id);
        if let Some(outer) = containing {
            self.add_member(outer, id);
        }
        self.types_by_qualified.entry(qualified_name).or_insert(id);
        self.types_by_simple.entry(name).or_default().push(id);
        id
    }

    fn declare_member(&mut self, unit: usize, node: &'u SyntaxNode, owner: SymbolId) {
        let owner_kind = self.type_kind(owner);
        let default = if owner_kind == Some(TypeKind::Interface) {
            Accessibility::Public
        } else {
            Accessibility::Private
        };
        let accessibility = node.modifiers.accessibility(default);

        match node.kind {
            SyntaxKind::Field | SyntaxKind::Event
                if node.child_of_kind(SyntaxKind::VariableDeclaration).is_some() =>
            {
                let declarators = node
                    .children_of_kind(SyntaxKind::VariableDeclaration)
                    .flat_map(|declaration| {
                        declaration.children_of_kind(SyntaxKind::VariableDeclarator)
                    });
                for declarator in declarators {
                    let kind = if node.kind == SyntaxKind::Field {
                        SymbolKind::Field { ty: None }
                    } else {
                        SymbolKind::Event { ty: None }
                    };
                    let id = self.add_source_member(
                        unit,
                        declarator,
                        owner,
                        kind,
                        accessibility,
                        node.modifiers,
                    );
                    self.add_member(owner, id);
                }
            }
            SyntaxKind::Event => {
                let id = self.add_source_member(
                    unit,
                    node,
                    owner,
                    SymbolKind::Event { ty: None },
                    accessibility,
                    node.modifiers,
                );
                self.add_member(owner, id);
            }
            SyntaxKind::Property => {
                let id = self.add_source_member(
                    unit,
                    node,
                    owner,
                    SymbolKind::Property { ty: None },
                    accessibility,
                    node.modifiers,
                );
                self.add_member(owner, id);
            }
            SyntaxKind::EnumMember => {
                let mut modifiers = node.modifiers;
                modifiers.insert(Modifier::Const);
                let id = self.add_source_member(
                    unit,
                    node,
                    owner,
                    SymbolKind::Field { ty: Some(owner) },
                    Accessibility::Public,
                    modifiers,
                );
                self.add_member(owner, id);
            }
            SyntaxKind::Method | SyntaxKind::Constructor => {
                let method_kind = if node.kind == SyntaxKind::Method {
                    MethodKind::Ordinary
                } else {
                    MethodKind::Constructor
                };
                let parameter_nodes: Vec<&'u SyntaxNode> = node
                    .child_of_kind(SyntaxKind::ParameterList)
                    .map(|list| list.children_of_kind(SyntaxKind::Parameter).collect())
                    .unwrap_or_default();
                let is_extension = parameter_nodes
                    .first()
                    .is_some_and(|first| first.modifiers.contains(Modifier::This));
                let parameters = parameter_nodes
                    .into_iter()
                    .map(|parameter| self.add_parameter(unit, parameter, Some(owner), None))
                    .collect();
                let id = self.add_source_member(
                    unit,
                    node,
                    owner,
                    SymbolKind::Method(MethodSymbol {
                        method_kind,
                        parameters,
                        return_type: None,
                        overridden: None,
                        is_extension,
                    }),
                    accessibility,
                    node.modifiers,
                );
                self.add_member(owner, id);
                if is_extension {
                    self.extensions
                        .entry(node.text().to_string())
                        .or_default()
                        .push(id);
                }
            }
            SyntaxKind::ParameterList => {
                // primary constructor
                for parameter in node.children_of_kind(SyntaxKind::Parameter) {
                    if owner_kind == Some(TypeKind::Record) {
                        let id = self.add_source_member(
                            unit,
                            parameter,
                            owner,
                            SymbolKind::Property { ty: None },
                            Accessibility::Public,
                            Modifiers::default(),
                        );
                        self.add_member(owner, id);
                    } else {
                        let id = self.add_parameter(unit, parameter, Some(owner), None);
                        self.primary_parameters.entry(owner).or_default().push(id);
                    }
                }
            }
            _ => {}
        }
    }

    fn add_source_member(
        &mut self,
        unit: usize,
        node: &SyntaxNode,
        owner: SymbolId,
        kind: SymbolKind,
        accessibility: Accessibility,
        modifiers: Modifiers,
    ) -> SymbolId {
        let name = node.text().to_string();
        let qualified_name = format!("{}.{}", self.table.get(owner).qualified_name, name);
        let id = self.table.add(Symbol {
            id: SymbolId(0),
            name,
            qualified_name,
            kind,
            containing_type: Some(owner),
            accessibility,
            modifiers,
            assembly: self.assemblies.get(unit).cloned(),
            declaration: Some(Declaration { unit, node: node.id }),
        });
        self.bindings[unit].declared.insert(node.id, id);
        id
    }

    fn add_parameter(
        &mut self,
        unit: usize,
        node: &SyntaxNode,
        containing: Option<SymbolId>,
        ty: Option<SymbolId>,
    ) -> SymbolId {
        let id = self.table.add(Symbol {
            id: SymbolId(0),
            name: node.text().to_string(),
            qualified_name: node.text().to_string(),
            kind: SymbolKind::Parameter { ty },
            containing_type: containing,
            accessibility: Accessibility::Private,
            modifiers: node.modifiers,
            assembly: self.assemblies.get(unit).cloned(),
            declaration: Some(Declaration { unit, node: node.id }),
        });
        self.bindings[unit].declared.insert(node.id, id);
        id
    }

    fn add_local(&mut self, scope: &Scope, node: &SyntaxNode, ty: Option<SymbolId>) -> SymbolId {
        let id = self.table.add(Symbol {
            id: SymbolId(0),
            name: node.text().to_string(),
            qualified_name: node.text().to_string(),
            kind: SymbolKind::Local { ty },
            containing_type: scope.current_type(),
            accessibility: Accessibility::Private,
            modifiers: node.modifiers,
            assembly: self.assemblies.get(scope.unit).cloned(),
            declaration: Some(Declaration {
                unit: scope.unit,
                node: node.id,
            }),
        });
        self.bindings[scope.unit].declared.insert(node.id, id);
        id
    }

    fn add_member(&mut self, owner: SymbolId, member: SymbolId) {
        if let SymbolKind::Type(ty) = &mut self.table.get_mut(owner).kind {
            ty.members.push(member);
        }
    }

    fn add_namespace(&mut self, namespace: &str) {
        let mut prefix = String::new();
        for segment in namespace.split('.') {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(segment);
            self.namespaces.insert(prefix.clone());
        }
    }

    // ----- passes 2 and 4: walking declarations -----

    fn walk(&mut self, node: &'u SyntaxNode, scope: &mut Scope, pass: Pass) {
        for child in &node.children {
            match child.kind {
                SyntaxKind::Namespace => {
                    let namespace = qualify(&scope.namespace, child.text());
                    let outer = std::mem::replace(&mut scope.namespace, namespace);
                    self.walk(child, scope, pass);
                    scope.namespace = outer;
                }
                kind if kind.is_type_declaration() => {
                    let Some(id) = self.declared(scope.unit, child) else {
                        continue;
                    };
                    scope.types.push(id);
                    let mark = scope.enter_type_parameters(child);
                    match pass {
                        Pass::Signatures => {
                            self.resolve_base_list(child, id, scope);
                            if kind == SyntaxKind::Delegate {
                                self.resolve_member_signature(child, scope);
                            } else {
                                self.walk(child, scope, pass);
                            }
                        }
                        Pass::Bodies if kind != SyntaxKind::Delegate => {
                            scope.push();
                            let primary = self
                                .primary_parameters
                                .get(&id)
                                .cloned()
                                .unwrap_or_default();
                            for parameter in primary {
                                let name = self.table.get(parameter).name.clone();
                                scope.define(&name, parameter);
                            }
                            self.walk(child, scope, pass);
                            scope.pop();
                        }
                        Pass::Bodies => {}
                    }
                    scope.type_parameters.truncate(mark);
                    scope.types.pop();
                }
                _ if scope.current_type().is_some() => match pass {
                    Pass::Signatures => self.resolve_member_signature(child, scope),
                    Pass::Bodies => self.bind_member_body(child, scope),
                },
                _ => {}
            }
        }
    }

    // ----- pass 2: signatures -----

    fn resolve_base_list(&mut self, node: &'u SyntaxNode, id: SymbolId, scope: &mut Scope) {
        let type_kind = self.type_kind(id);
        let takes_base = matches!(type_kind, Some(TypeKind::Class | TypeKind::Record));
        let entries: Vec<&'u SyntaxNode> = node
            .child_of_kind(SyntaxKind::BaseList)
            .map(|list| list.children.iter().filter(|c| c.kind.is_type_syntax()).collect())
            .unwrap_or_default();

        let mut explicit_base = None;
        let mut interfaces = Vec::new();
        for entry in entries {
            let Some(resolved) = self.resolve_type_syntax(entry, scope) else {
                continue;
            };
            let is_interface = self.type_kind(resolved) == Some(TypeKind::Interface);
            if takes_base && explicit_base.is_none() && !is_interface && resolved != id {
                explicit_base = Some(resolved);
            } else if type_kind != Some(TypeKind::Enum) {
                interfaces.push(resolved);
            }
        }
        let base = match explicit_base {
            Some(base) => Some(base),
            None if takes_base => Some(self.special_type(SpecialType::Object)),
            None => None,
        };

        if let SymbolKind::Type(ty) = &mut self.table.get_mut(id).kind {
            // another partial part may already have named the base
            if explicit_base.is_some() || ty.base_type.is_none() {
                ty.base_type = base;
            }
            for interface in interfaces {
                if !ty.interfaces.contains(&interface) {
                    ty.interfaces.push(interface);
                }
            }
        }
    }

    fn resolve_member_signature(&mut self, node: &'u SyntaxNode, scope: &mut Scope) {
        match node.kind {
            SyntaxKind::Field | SyntaxKind::Event => {
                if let Some(declaration) = node.child_of_kind(SyntaxKind::VariableDeclaration) {
                    let ty = self.resolve_leading_type(declaration, scope);
                    for declarator in declaration.children_of_kind(SyntaxKind::VariableDeclarator) {
                        if let Some(id) = self.declared(scope.unit, declarator) {
                            self.set_value_type(id, ty);
                        }
                    }
                } else {
                    let ty = self.resolve_leading_type(node, scope);
                    if let Some(id) = self.declared(scope.unit, node) {
                        self.set_value_type(id, ty);
                    }
                }
            }
            SyntaxKind::Property => {
                let ty = self.resolve_leading_type(node, scope);
                if let Some(id) = self.declared(scope.unit, node) {
                    self.set_value_type(id, ty);
                }
            }
            SyntaxKind::Method
            | SyntaxKind::Constructor
            | SyntaxKind::Destructor
            | SyntaxKind::Operator
            | SyntaxKind::Indexer
            | SyntaxKind::Delegate => {
                let mark = scope.enter_type_parameters(node);
                let return_type = match node.kind {
                    SyntaxKind::Constructor | SyntaxKind::Destructor => None,
                    _ => self.resolve_leading_type(node, scope),
                };
                self.resolve_parameter_types(node.child_of_kind(SyntaxKind::ParameterList), scope);
                if let Some(id) = self.declared(scope.unit, node) {
                    if self.table.get(id).is_method() {
                        self.set_value_type(id, return_type);
                    }
                }
                scope.type_parameters.truncate(mark);
            }
            SyntaxKind::ParameterList => self.resolve_parameter_types(Some(node), scope),
            _ => {}
        }
    }

    fn resolve_leading_type(
        &mut self,
        node: &'u SyntaxNode,
        scope: &mut Scope,
    ) -> Option<SymbolId> {
        node.children
            .first()
            .filter(|child| child.kind.is_type_syntax())
            .and_then(|ty| self.resolve_type_syntax(ty, scope))
    }

    fn resolve_parameter_types(&mut self, list: Option<&'u SyntaxNode>, scope: &mut Scope) {
        let Some(list) = list else {
            return;
        };
        for parameter in list.children_of_kind(SyntaxKind::Parameter) {
            let ty = self.parameter_type(parameter, scope);
            if let Some(id) = self.declared(scope.unit, parameter) {
                self.set_value_type(id, ty);
            }
        }
    }

    fn parameter_type(&mut self, parameter: &'u SyntaxNode, scope: &mut Scope) -> Option<SymbolId> {
        parameter
            .children
            .iter()
            .find(|child| child.kind.is_type_syntax())
            .and_then(|ty| self.resolve_type_syntax(ty, scope))
    }

    fn set_value_type(&mut self, id: SymbolId, value: Option<SymbolId>) {
        match &mut self.table.get_mut(id).kind {
            SymbolKind::Method(method) => method.return_type = value,
            SymbolKind::Field { ty }
            | SymbolKind::Property { ty }
            | SymbolKind::Event { ty }
            | SymbolKind::Parameter { ty }
            | SymbolKind::Local { ty } => *ty = value,
            SymbolKind::Type(_) => {}
        }
    }

    // ----- type resolution -----

    /// Resolve a type in type position and record it on the node
    fn resolve_type_syntax(&mut self, node: &'u SyntaxNode, scope: &mut Scope) -> Option<SymbolId> {
        let resolved = match node.kind {
            SyntaxKind::PredefinedType => {
                SpecialType::from_keyword(node.text()).map(|special| self.special_type(special))
            }
            SyntaxKind::Identifier | SyntaxKind::GenericName => {
                self.resolve_type_arguments(node, scope);
                let name = node.text();
                if scope.is_type_parameter(name) || name.is_empty() {
                    None
                } else {
                    Some(
                        self.lookup_type_name(name, scope)
                            .unwrap_or_else(|| self.external_type(name)),
                    )
                }
            }
            SyntaxKind::QualifiedName => self.resolve_qualified_name(node, scope),
            SyntaxKind::NullableType => {
                return node
                    .children
                    .first()
                    .and_then(|inner| self.resolve_type_syntax(inner, scope));
            }
            SyntaxKind::ArrayType | SyntaxKind::PointerType | SyntaxKind::TupleType => {
                for element in type_children(node) {
                    self.resolve_type_syntax(element, scope);
                }
                None
            }
            _ => None,
        };
        if let Some(id) = resolved {
            self.record(scope.unit, node, id);
        }
        resolved
    }

    fn resolve_type_arguments(&mut self, node: &'u SyntaxNode, scope: &mut Scope) {
        for list in node.children_of_kind(SyntaxKind::TypeArgumentList) {
            for argument in type_children(list) {
                self.resolve_type_syntax(argument, scope);
            }
        }
    }

    fn resolve_qualified_name(
        &mut self,
        node: &'u SyntaxNode,
        scope: &mut Scope,
    ) -> Option<SymbolId> {
        for list in node
            .descendants()
            .filter(|descendant| descendant.kind == SyntaxKind::TypeArgumentList)
        {
            for argument in type_children(list) {
                self.resolve_type_syntax(argument, scope);
            }
        }

        let full = strip_type_arguments(node.text().trim_start_matches("global::"));
        if let Some(found) = self.lookup_qualified(&full, scope) {
            return Some(found);
        }

        // Outer.Inner where Outer is a source type
        let mut segments = full.split('.');
        if let Some(first) = segments.next() {
            if let Some(mut current) = self.lookup_type_name(first, scope) {
                let mut complete = true;
                for segment in segments {
                    match self.nested_type(current, segment) {
                        Some(nested) => current = nested,
                        None => {
                            complete = false;
                            break;
                        }
                    }
                }
                if complete {
                    return Some(current);
                }
            }
        }

        let last = full.rsplit('.').next().unwrap_or(&full);
        if last.is_empty() {
            return None;
        }
        Some(self.external_type(last))
    }

    fn lookup_qualified(&self, name: &str, scope: &Scope) -> Option<SymbolId> {
        let mut namespace = scope.namespace.as_str();
        loop {
            if let Some(&id) = self.types_by_qualified.get(&qualify(namespace, name)) {
                return Some(id);
            }
            if namespace.is_empty() {
                break;
            }
            namespace = namespace.rsplit_once('.').map_or("", |(parent, _)| parent);
        }
        self.usings[scope.unit]
            .iter()
            .find_map(|using| self.types_by_qualified.get(&qualify(using, name)).copied())
    }

    /// Source type (or keyword type) visible under a simple name
    fn lookup_type_name(&mut self, name: &str, scope: &Scope) -> Option<SymbolId> {
        if scope.is_type_parameter(name) {
            return None;
        }
        for &enclosing in scope.types.iter().rev() {
            for owner in self.base_chain(enclosing) {
                if let Some(nested) = self.nested_type(owner, name) {
                    return Some(nested);
                }
            }
        }
        if let Some(found) = self.lookup_qualified(name, scope) {
            return Some(found);
        }
        if let Some(found) = self.types_by_simple.get(name).and_then(|ids| ids.first()) {
            return Some(*found);
        }
        match name {
            "Object" => Some(self.special_type(SpecialType::Object)),
            "String" => Some(self.special_type(SpecialType::String)),
            _ => None,
        }
    }

    fn nested_type(&self, owner: SymbolId, name: &str) -> Option<SymbolId> {
        self.table
            .get(owner)
            .as_type()?
            .members
            .iter()
            .copied()
            .find(|&member| {
                let symbol = self.table.get(member);
                symbol.is_type() && symbol.name == name
            })
    }

    fn special_type(&mut self, special: SpecialType) -> SymbolId {
        if let Some(&id) = self.specials.get(&special) {
            return id;
        }
        let name = special.metadata_name().to_string();
        let type_kind = if special.is_value_type() {
            TypeKind::Struct
        } else {
            TypeKind::Class
        };
        let id = self.table.add(Symbol {
            id: SymbolId(0),
            qualified_name: format!("System.{name}"),
            name,
            kind: SymbolKind::Type(TypeSymbol {
                type_kind,
                special: Some(special),
                base_type: None,
                interfaces: Vec::new(),
                members: Vec::new(),
                type_parameters: Vec::new(),
            }),
            containing_type: None,
            accessibility: Accessibility::Public,
            modifiers: Modifiers::default(),
            assembly: None,
            declaration: None,
        });
        self.specials.insert(special, id);
        id
    }

    /// Type outside the compilation, one symbol per simple name
    fn external_type(&mut self, name: &str) -> SymbolId {
        if let Some(&id) = self.externals.get(name) {
            return id;
        }
        let id = self.table.add(Symbol {
            id: SymbolId(0),
            name: name.to_string(),
            qualified_name: name.to_string(),
            kind: SymbolKind::Type(TypeSymbol {
                type_kind: external_type_kind(name),
                special: None,
                base_type: None,
                interfaces: Vec::new(),
                members: Vec::new(),
                type_parameters: Vec::new(),
            }),
            containing_type: None,
            accessibility: Accessibility::Public,
            modifiers: Modifiers::default(),
            assembly: None,
            declaration: None,
        });
        self.externals.insert(name.to_string(), id);
        id
    }

    fn type_kind(&self, id: SymbolId) -> Option<TypeKind> {
        self.table.get(id).as_type().map(|ty| ty.type_kind)
    }

    // ----- pass 3: overrides -----

    fn resolve_overrides(&mut self) {
        let overriding: Vec<SymbolId> = self
            .table
            .iter()
            .filter(|symbol| symbol.is_method() && symbol.modifiers.contains(Modifier::Override))
            .map(|symbol| symbol.id)
            .collect();
        for id in overriding {
            let Some(target) = self.find_overridden(id) else {
                continue;
            };
            if let SymbolKind::Method(method) = &mut self.table.get_mut(id).kind {
                method.overridden = Some(target);
            }
        }
    }

    fn find_overridden(&mut self, id: SymbolId) -> Option<SymbolId> {
        let method = self.table.get(id);
        let owner = method.containing_type?;
        let name = method.name.clone();
        let signature = self.parameter_types(id);

        let mut same_arity = None;
        let chain = self.base_chain(owner);
        for &base in chain.iter().skip(1) {
            let Some(base_type) = self.table.get(base).as_type() else {
                continue;
            };
            for &member in &base_type.members {
                let candidate = self.table.get(member);
                if candidate.name != name || !candidate.is_ordinary_method() {
                    continue;
                }
                let parameters = self.parameter_types(member);
                if parameters == signature {
                    return Some(member);
                }
                if same_arity.is_none() && parameters.len() == signature.len() {
                    same_arity = Some(member);
                }
            }
        }
        if same_arity.is_some() {
            return same_arity;
        }

        let host = chain
            .iter()
            .skip(1)
            .copied()
            .find(|&base| self.can_host(base, &name))?;
        Some(self.synthesize_member(host, &name, Want::Method(signature.len())))
    }

    fn parameter_types(&self, method: SymbolId) -> Vec<Option<SymbolId>> {
        self.table
            .get(method)
            .as_method()
            .map(|method| {
                method
                    .parameters
                    .iter()
                    .map(|&parameter| self.table.get(parameter).value_type())
                    .collect()
            })
            .unwrap_or_default()
    }

    // ----- member lookup -----

    fn base_chain(&self, ty: SymbolId) -> Vec<SymbolId> {
        let mut chain = vec![ty];
        let mut current = ty;
        while let Some(base) = self.table.get(current).as_type().and_then(|t| t.base_type) {
            if chain.contains(&base) || chain.len() >= MAX_CHAIN {
                break;
            }
            chain.push(base);
            current = base;
        }
        chain
    }

    /// Base chain followed by every reachable interface
    fn lookup_chain(&self, ty: SymbolId) -> Vec<SymbolId> {
        let mut chain = self.base_chain(ty);
        let mut index = 0;
        while index < chain.len() && chain.len() < MAX_CHAIN {
            if let Some(current) = self.table.get(chain[index]).as_type() {
                for &interface in &current.interfaces {
                    if !chain.contains(&interface) {
                        chain.push(interface);
                    }
                }
            }
            index += 1;
        }
        chain
    }

    fn find_member(&self, ty: SymbolId, name: &str, want: Want) -> Option<SymbolId> {
        for owner in self.lookup_chain(ty) {
            let Some(owner_type) = self.table.get(owner).as_type() else {
                continue;
            };
            let candidates: Vec<SymbolId> = owner_type
                .members
                .iter()
                .copied()
                .filter(|&member| {
                    let symbol = self.table.get(member);
                    symbol.name == name && !symbol.is_type() && !self.is_constructor(member)
                })
                .collect();
            let found = match want {
                Want::Any => candidates
                    .iter()
                    .copied()
                    .find(|&member| !self.table.get(member).is_method())
                    .or_else(|| candidates.first().copied()),
                Want::Method(arity) => {
                    let methods: Vec<SymbolId> = candidates
                        .into_iter()
                        .filter(|&member| self.table.get(member).is_method())
                        .collect();
                    methods
                        .iter()
                        .copied()
                        .find(|&member| self.arity(member) == arity)
                        .or_else(|| methods.first().copied())
                }
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// Member lookup that falls back to synthesizing the member on an
    /// external type of the chain
    fn lookup_member(&mut self, ty: SymbolId, name: &str, want: Want) -> Option<SymbolId> {
        if let Some(found) = self.find_member(ty, name, want) {
            return Some(found);
        }
        let host = self
            .lookup_chain(ty)
            .into_iter()
            .find(|&owner| self.can_host(owner, name))?;
        Some(self.synthesize_member(host, name, want))
    }

    /// External types accept any member; `object` only its own
    fn can_host(&self, owner: SymbolId, name: &str) -> bool {
        let symbol = self.table.get(owner);
        let Some(ty) = symbol.as_type() else {
            return false;
        };
        if symbol.is_source() {
            return false;
        }
        match ty.special {
            Some(SpecialType::Object) | Some(SpecialType::Dynamic) => {
                OBJECT_MEMBERS.contains(&name)
            }
            _ => true,
        }
    }

    fn synthesize_member(&mut self, host: SymbolId, name: &str, want: Want) -> SymbolId {
        let arity = match want {
            Want::Any => None,
            Want::Method(arity) => Some(arity),
        };
        let key = (host, name.to_string(), arity);
        if let Some(&id) = self.external_members.get(&key) {
            return id;
        }
        let kind = match arity {
            Some(arity) => {
                let parameters = (0..arity)
                    .map(|index| {
                        self.table.add(Symbol {
                            id: SymbolId(0),
                            name: format!("arg{index}"),
                            qualified_name: format!("arg{index}"),
                            kind: SymbolKind::Parameter { ty: None },
                            containing_type: Some(host),
                            accessibility: Accessibility::Private,
                            modifiers: Modifiers::default(),
                            assembly: None,
                            declaration: None,
                        })
                    })
                    .collect();
                SymbolKind::Method(MethodSymbol {
                    method_kind: MethodKind::Ordinary,
                    parameters,
                    return_type: None,
                    overridden: None,
                    is_extension: false,
                })
            }
            None => SymbolKind::Property { ty: None },
        };
        let id = self.table.add(Symbol {
            id: SymbolId(0),
            name: name.to_string(),
            qualified_name: format!("{}.{}", self.table.get(host).qualified_name, name),
            kind,
            containing_type: Some(host),
            accessibility: Accessibility::Public,
            modifiers: Modifiers::default(),
            assembly: self.table.get(host).assembly.clone(),
            declaration: None,
        });
        self.add_member(host, id);
        self.external_members.insert(key, id);
        id
    }

    fn find_extension(&self, name: &str, arity: usize) -> Option<SymbolId> {
        let candidates = self.extensions.get(name)?;
        candidates
            .iter()
            .copied()
            .find(|&candidate| self.arity(candidate) == arity + 1)
            .or_else(|| candidates.first().copied())
    }

    fn is_constructor(&self, id: SymbolId) -> bool {
        self.table
            .get(id)
            .as_method()
            .is_some_and(|method| method.method_kind == MethodKind::Constructor)
    }

    fn arity(&self, id: SymbolId) -> usize {
        self.table
            .get(id)
            .as_method()
            .map_or(0, |method| method.parameters.len())
    }

    // ----- pass 4: bodies -----

    fn bind_member_body(&mut self, node: &'u SyntaxNode, scope: &mut Scope) {
        match node.kind {
            SyntaxKind::Field | SyntaxKind::Event
                if node.child_of_kind(SyntaxKind::VariableDeclaration).is_some() =>
            {
                scope.push();
                let declarators = node
                    .children_of_kind(SyntaxKind::VariableDeclaration)
                    .flat_map(|declaration| {
                        declaration.children_of_kind(SyntaxKind::VariableDeclarator)
                    });
                for declarator in declarators {
                    self.bind_children(declarator, scope);
                }
                scope.pop();
            }
            SyntaxKind::Property | SyntaxKind::Event | SyntaxKind::Indexer => {
                scope.push();
                let value_type = self
                    .declared(scope.unit, node)
                    .and_then(|id| self.table.get(id).value_type())
                    .or_else(|| {
                        let first = node.children.first()?;
                        self.resolved(scope.unit, first)
                    });
                if let Some(parameters) = node.child_of_kind(SyntaxKind::ParameterList) {
                    self.declare_parameters(parameters, scope);
                }
                for (index, child) in node.children.iter().enumerate() {
                    if index == 0 && child.kind.is_type_syntax() {
                        continue;
                    }
                    match child.kind {
                        SyntaxKind::ParameterList => {}
                        SyntaxKind::AccessorList => {
                            for accessor in child.children_of_kind(SyntaxKind::Accessor) {
                                self.bind_accessor(accessor, value_type, scope);
                            }
                        }
                        _ => {
                            self.bind_expr(child, scope);
                        }
                    }
                }
                scope.pop();
            }
            SyntaxKind::Method
            | SyntaxKind::Constructor
            | SyntaxKind::Destructor
            | SyntaxKind::Operator => self.bind_function(node, scope),
            SyntaxKind::EnumMember => {
                scope.push();
                self.bind_children(node, scope);
                scope.pop();
            }
            _ => {}
        }
    }

    fn bind_accessor(
        &mut self,
        accessor: &'u SyntaxNode,
        value_type: Option<SymbolId>,
        scope: &mut Scope,
    ) {
        scope.push();
        if matches!(accessor.text(), "set" | "init" | "add" | "remove") {
            let value = self.table.add(Symbol {
                id: SymbolId(0),
                name: "value".to_string(),
                qualified_name: "value".to_string(),
                kind: SymbolKind::Parameter { ty: value_type },
                containing_type: scope.current_type(),
                accessibility: Accessibility::Private,
                modifiers: Modifiers::default(),
                assembly: self.assemblies.get(scope.unit).cloned(),
                declaration: None,
            });
            scope.define("value", value);
        }
        self.bind_children(accessor, scope);
        scope.pop();
    }

    /// Method-like body: parameters in scope, return type skipped
    fn bind_function(&mut self, node: &'u SyntaxNode, scope: &mut Scope) {
        let mark = scope.enter_type_parameters(node);
        scope.push();
        if let Some(parameters) = node.child_of_kind(SyntaxKind::ParameterList) {
            self.declare_parameters(parameters, scope);
        }
        let has_return_type =
            !matches!(node.kind, SyntaxKind::Constructor | SyntaxKind::Destructor);
        for (index, child) in node.children.iter().enumerate() {
            if index == 0 && has_return_type && child.kind.is_type_syntax() {
                continue;
            }
            match child.kind {
                SyntaxKind::ParameterList | SyntaxKind::TypeParameterList => {}
                _ => {
                    self.bind_expr(child, scope);
                }
            }
        }
        scope.pop();
        scope.type_parameters.truncate(mark);
    }

    fn declare_parameters(&mut self, list: &'u SyntaxNode, scope: &mut Scope) {
        for parameter in list.children_of_kind(SyntaxKind::Parameter) {
            let id = match self.declared(scope.unit, parameter) {
                Some(id) => id,
                None => {
                    let ty = self.parameter_type(parameter, scope);
                    self.add_parameter(scope.unit, parameter, scope.current_type(), ty)
                }
            };
            scope.define(parameter.text(), id);
        }
    }

    /// Declare local functions of a block up front; they are callable
    /// before their declaration
    fn predeclare_local_functions(&mut self, block: &'u SyntaxNode, scope: &mut Scope) {
        for function in block.children_of_kind(SyntaxKind::LocalFunction) {
            let mark = scope.enter_type_parameters(function);
            let return_type = self.resolve_leading_type(function, scope);
            let parameters: Vec<SymbolId> = function
                .child_of_kind(SyntaxKind::ParameterList)
                .map(|list| list.children_of_kind(SyntaxKind::Parameter).collect::<Vec<_>>())
                .unwrap_or_default()
                .into_iter()
                .map(|parameter| {
                    let ty = self.parameter_type(parameter, scope);
                    self.add_parameter(scope.unit, parameter, scope.current_type(), ty)
                })
                .collect();
            scope.type_parameters.truncate(mark);

            let id = self.table.add(Symbol {
                id: SymbolId(0),
                name: function.text().to_string(),
                qualified_name: function.text().to_string(),
                kind: SymbolKind::Method(MethodSymbol {
                    method_kind: MethodKind::LocalFunction,
                    parameters,
                    return_type,
                    overridden: None,
                    is_extension: false,
                }),
                containing_type: scope.current_type(),
                accessibility: Accessibility::Private,
                modifiers: function.modifiers,
                assembly: self.assemblies.get(scope.unit).cloned(),
                declaration: Some(Declaration {
                    unit: scope.unit,
                    node: function.id,
                }),
            });
            self.bindings[scope.unit].declared.insert(function.id, id);
            scope.define(function.text(), id);
        }
    }

    fn bind_children(&mut self, node: &'u SyntaxNode, scope: &mut Scope) {
        for child in &node.children {
            self.bind_expr(child, scope);
        }
    }

    fn bind_expr(&mut self, node: &'u SyntaxNode, scope: &mut Scope) -> Bound {
        match node.kind {
            SyntaxKind::Block
            | SyntaxKind::Switch
            | SyntaxKind::SwitchSection
            | SyntaxKind::SwitchExpressionArm
            | SyntaxKind::If
            | SyntaxKind::While
            | SyntaxKind::Do
            | SyntaxKind::For
            | SyntaxKind::Using
            | SyntaxKind::Try
            | SyntaxKind::Finally
            | SyntaxKind::Lock => {
                scope.push();
                self.predeclare_local_functions(node, scope);
                self.bind_children(node, scope);
                scope.pop();
                Bound::Nothing
            }
            SyntaxKind::VariableDeclaration => {
                self.bind_variable_declaration(node, scope);
                Bound::Nothing
            }
            SyntaxKind::ForEach => {
                self.bind_foreach(node, scope);
                Bound::Nothing
            }
            SyntaxKind::Catch => {
                scope.push();
                for child in &node.children {
                    if child.kind == SyntaxKind::CatchDeclaration {
                        let ty = self.resolve_leading_type(child, scope);
                        if child.text.is_some() {
                            let local = self.add_local(scope, child, ty);
                            scope.define(child.text(), local);
                        }
                    } else {
                        self.bind_expr(child, scope);
                    }
                }
                scope.pop();
                Bound::Nothing
            }
            SyntaxKind::Lambda => self.bind_lambda(node, scope, &[]),
            SyntaxKind::LocalFunction => {
                self.bind_function(node, scope);
                Bound::Nothing
            }
            SyntaxKind::DeclarationExpression => {
                let ty = match node.children.first() {
                    Some(first)
                        if first.kind.is_type_syntax() && first.kind != SyntaxKind::ImplicitType =>
                    {
                        self.resolve_type_syntax(first, scope)
                    }
                    _ => None,
                };
                if node.text.is_some() {
                    let local = self.add_local(scope, node, ty);
                    scope.define(node.text(), local);
                }
                Bound::Value(ty)
            }
            SyntaxKind::Identifier => self.bind_identifier(node, scope),
            SyntaxKind::GenericName => {
                self.resolve_type_arguments(node, scope);
                self.bind_identifier(node, scope)
            }
            SyntaxKind::QualifiedName | SyntaxKind::PredefinedType => {
                match self.resolve_type_syntax(node, scope) {
                    Some(ty) => Bound::Type(ty),
                    None => Bound::Nothing,
                }
            }
            SyntaxKind::ArrayType | SyntaxKind::NullableType | SyntaxKind::TupleType => {
                self.resolve_type_syntax(node, scope);
                Bound::Nothing
            }
            SyntaxKind::This => Bound::Value(scope.current_type()),
            SyntaxKind::Base => Bound::Value(
                scope
                    .current_type()
                    .and_then(|ty| self.table.get(ty).as_type().and_then(|t| t.base_type)),
            ),
            SyntaxKind::Literal => Bound::Value(match node.text() {
                "null" => None,
                keyword => {
                    SpecialType::from_keyword(keyword).map(|special| self.special_type(special))
                }
            }),
            SyntaxKind::InterpolatedString => {
                self.bind_children(node, scope);
                Bound::Value(Some(self.special_type(SpecialType::String)))
            }
            SyntaxKind::MemberAccess => self.bind_member_access(node, scope),
            SyntaxKind::MemberBinding => {
                let Some(receiver) = scope.conditional_receiver else {
                    return Bound::Nothing;
                };
                let name_node = node.children.last();
                if let Some(name_node) = name_node {
                    self.resolve_type_arguments(name_node, scope);
                }
                match self.lookup_member(receiver, node.text(), Want::Any) {
                    Some(member) => {
                        self.record(scope.unit, node, member);
                        if let Some(name_node) = name_node {
                            self.record(scope.unit, name_node, member);
                        }
                        Bound::Value(self.table.get(member).value_type())
                    }
                    None => Bound::Nothing,
                }
            }
            SyntaxKind::ConditionalAccess => {
                let Some((target, rest)) = node.children.split_first() else {
                    return Bound::Nothing;
                };
                let receiver = match self.bind_expr(target, scope) {
                    Bound::Value(ty) => ty,
                    Bound::Type(ty) => Some(ty),
                    _ => None,
                };
                let outer = std::mem::replace(&mut scope.conditional_receiver, receiver);
                let mut result = Bound::Nothing;
                for child in rest {
                    result = self.bind_expr(child, scope);
                }
                scope.conditional_receiver = outer;
                Bound::Value(result.value_type())
            }
            SyntaxKind::Invocation => self.bind_invocation(node, scope),
            SyntaxKind::ObjectCreation => self.bind_object_creation(node, scope),
            SyntaxKind::ArrayCreation | SyntaxKind::TypeOf => {
                for child in &node.children {
                    if child.kind.is_type_syntax() && child.kind != SyntaxKind::Identifier {
                        self.resolve_type_syntax(child, scope);
                    } else {
                        self.bind_expr(child, scope);
                    }
                }
                Bound::Value(None)
            }
            SyntaxKind::Cast | SyntaxKind::Default => {
                let mut ty = None;
                for (index, child) in node.children.iter().enumerate() {
                    if index == 0 && child.kind.is_type_syntax() {
                        ty = self.resolve_type_syntax(child, scope);
                    } else {
                        self.bind_expr(child, scope);
                    }
                }
                Bound::Value(ty)
            }
            SyntaxKind::As => {
                let mut ty = None;
                for (index, child) in node.children.iter().enumerate() {
                    if index == 1 && child.kind.is_type_syntax() {
                        ty = self.resolve_type_syntax(child, scope);
                    } else {
                        self.bind_expr(child, scope);
                    }
                }
                Bound::Value(ty)
            }
            SyntaxKind::Assignment => {
                let mut left = Bound::Nothing;
                for (index, child) in node.children.iter().enumerate() {
                    let bound = self.bind_expr(child, scope);
                    if index == 0 {
                        left = bound;
                    }
                }
                Bound::Value(left.value_type())
            }
            SyntaxKind::Binary => {
                let results: Vec<Bound> = node
                    .children
                    .iter()
                    .map(|child| self.bind_expr(child, scope))
                    .collect();
                let first = results.first().and_then(Bound::value_type);
                match node.text() {
                    "==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||" => {
                        Bound::Value(Some(self.special_type(SpecialType::Boolean)))
                    }
                    "+" => {
                        let string = self.special_type(SpecialType::String);
                        if results.iter().any(|result| result.value_type() == Some(string)) {
                            Bound::Value(Some(string))
                        } else {
                            Bound::Value(first)
                        }
                    }
                    _ => Bound::Value(first),
                }
            }
            SyntaxKind::Is => {
                self.bind_children(node, scope);
                Bound::Value(Some(self.special_type(SpecialType::Boolean)))
            }
            SyntaxKind::Parenthesized | SyntaxKind::Argument => {
                let mut result = Bound::Nothing;
                for child in &node.children {
                    result = self.bind_expr(child, scope);
                }
                result
            }
            SyntaxKind::Conditional => {
                let results: Vec<Bound> = node
                    .children
                    .iter()
                    .map(|child| self.bind_expr(child, scope))
                    .collect();
                Bound::Value(results.get(1).and_then(Bound::value_type))
            }
            SyntaxKind::Await | SyntaxKind::ElementAccess => {
                self.bind_children(node, scope);
                Bound::Value(None)
            }
            SyntaxKind::PrefixUnary | SyntaxKind::PostfixUnary => {
                let mut result = Bound::Nothing;
                for child in &node.children {
                    result = self.bind_expr(child, scope);
                }
                Bound::Value(result.value_type())
            }
            _ => {
                self.bind_children(node, scope);
                Bound::Nothing
            }
        }
    }

    fn bind_variable_declaration(&mut self, node: &'u SyntaxNode, scope: &mut Scope) {
        let type_syntax = node
            .children
            .first()
            .filter(|first| first.kind.is_type_syntax() && first.kind != SyntaxKind::ImplicitType);
        let declared_type = type_syntax.map(|first| self.resolve_type_syntax(first, scope));
        let lambda_parameters = type_syntax
            .map(|first| self.delegate_parameter_types(scope.unit, first))
            .unwrap_or_default();
        for declarator in node.children_of_kind(SyntaxKind::VariableDeclarator) {
            let mut initializer = None;
            for child in &declarator.children {
                initializer = if child.kind == SyntaxKind::Lambda {
                    self.bind_lambda(child, scope, &lambda_parameters).value_type()
                } else {
                    self.bind_expr(child, scope).value_type()
                };
            }
            let ty = match declared_type {
                Some(declared) => declared,
                None => initializer,
            };
            let local = self.add_local(scope, declarator, ty);
            scope.define(declarator.text(), local);
        }
    }

    /// Lambda whose untyped parameters take `expected` types by position
    fn bind_lambda(
        &mut self,
        node: &'u SyntaxNode,
        scope: &mut Scope,
        expected: &[Option<SymbolId>],
    ) -> Bound {
        scope.push();
        for child in &node.children {
            if child.kind != SyntaxKind::ParameterList {
                self.bind_expr(child, scope);
                continue;
            }
            self.declare_parameters(child, scope);
            for (parameter, &ty) in child.children_of_kind(SyntaxKind::Parameter).zip(expected) {
                if parameter.children.iter().any(|c| c.kind.is_type_syntax()) {
                    continue;
                }
                if let Some(id) = self.declared(scope.unit, parameter) {
                    self.set_value_type(id, ty);
                }
            }
        }
        scope.pop();
        Bound::Value(None)
    }

    /// Parameter types of a `Func<..>`, `Action<..>` or `Predicate<..>`
    /// whose type arguments are already resolved
    fn delegate_parameter_types(&self, unit: usize, target: &SyntaxNode) -> Vec<Option<SymbolId>> {
        if target.kind != SyntaxKind::GenericName {
            return Vec::new();
        }
        let mut arguments: Vec<Option<SymbolId>> = target
            .children_of_kind(SyntaxKind::TypeArgumentList)
            .flat_map(type_children)
            .map(|argument| self.resolved(unit, argument))
            .collect();
        match target.text() {
            "Func" => {
                arguments.pop();
                arguments
            }
            "Action" | "Predicate" => arguments,
            _ => Vec::new(),
        }
    }

    fn bind_foreach(&mut self, node: &'u SyntaxNode, scope: &mut Scope) {
        scope.push();
        let mut rest: &'u [SyntaxNode] = &node.children;
        let mut ty = None;
        if node.text.is_some() {
            if let Some((first, tail)) = rest.split_first() {
                if first.kind.is_type_syntax() && tail.len() >= 2 {
                    if first.kind != SyntaxKind::ImplicitType {
                        ty = self.resolve_type_syntax(first, scope);
                    }
                    rest = tail;
                }
            }
        }
        if let Some((collection, body)) = rest.split_first() {
            self.bind_expr(collection, scope);
            if node.text.is_some() {
                let local = self.add_local(scope, node, ty);
                scope.define(node.text(), local);
            }
            for statement in body {
                self.bind_expr(statement, scope);
            }
        }
        scope.pop();
    }

    fn bind_identifier(&mut self, node: &'u SyntaxNode, scope: &mut Scope) -> Bound {
        let name = node.text();
        if name.is_empty() {
            return Bound::Nothing;
        }
        if let Some(local) = scope.local(name) {
            self.record(scope.unit, node, local);
            return Bound::Value(self.table.get(local).value_type());
        }
        let member = scope
            .types
            .iter()
            .rev()
            .find_map(|&enclosing| self.find_member(enclosing, name, Want::Any));
        if let Some(member) = member {
            self.record(scope.unit, node, member);
            return Bound::Value(self.table.get(member).value_type());
        }
        if scope.is_type_parameter(name) {
            return Bound::Nothing;
        }
        if let Some(ty) = self.lookup_type_name(name, scope) {
            self.record(scope.unit, node, ty);
            return Bound::Type(ty);
        }
        if self.namespaces.contains(name) {
            return Bound::Namespace(name.to_string());
        }
        if name.starts_with(|c: char| c.is_ascii_uppercase()) {
            let ty = self.external_type(name);
            self.record(scope.unit, node, ty);
            return Bound::Type(ty);
        }
        Bound::Nothing
    }

    fn bind_member_access(&mut self, node: &'u SyntaxNode, scope: &mut Scope) -> Bound {
        let (Some(target), Some(name_node)) = (node.children.first(), node.children.get(1)) else {
            self.bind_children(node, scope);
            return Bound::Nothing;
        };
        let receiver = self.bind_expr(target, scope);
        self.resolve_type_arguments(name_node, scope);
        let name = node.text();

        match receiver {
            Bound::Namespace(namespace) => {
                let qualified = qualify(&namespace, name);
                if let Some(&ty) = self.types_by_qualified.get(&qualified) {
                    self.record(scope.unit, node, ty);
                    self.record(scope.unit, name_node, ty);
                    return Bound::Type(ty);
                }
                if self.namespaces.contains(&qualified) {
                    return Bound::Namespace(qualified);
                }
                let ty = self.external_type(name);
                self.record(scope.unit, node, ty);
                self.record(scope.unit, name_node, ty);
                Bound::Type(ty)
            }
            Bound::Type(ty) => {
                if let Some(nested) = self.nested_type(ty, name) {
                    self.record(scope.unit, node, nested);
                    self.record(scope.unit, name_node, nested);
                    return Bound::Type(nested);
                }
                self.bind_member_of(node, name_node, ty, scope)
            }
            Bound::Value(Some(ty)) => self.bind_member_of(node, name_node, ty, scope),
            Bound::Value(None) | Bound::Nothing => Bound::Nothing,
        }
    }

    fn bind_member_of(
        &mut self,
        node: &'u SyntaxNode,
        name_node: &'u SyntaxNode,
        receiver: SymbolId,
        scope: &mut Scope,
    ) -> Bound {
        match self.lookup_member(receiver, node.text(), Want::Any) {
            Some(member) => {
                self.record(scope.unit, node, member);
                self.record(scope.unit, name_node, member);
                Bound::Value(self.table.get(member).value_type())
            }
            None => Bound::Nothing,
        }
    }

    fn bind_invocation(&mut self, node: &'u SyntaxNode, scope: &mut Scope) -> Bound {
        let arity = node
            .child_of_kind(SyntaxKind::ArgumentList)
            .map_or(0, |list| list.children_of_kind(SyntaxKind::Argument).count());
        for argument in node.children.iter().skip(1) {
            self.bind_expr(argument, scope);
        }
        let Some(callee) = node.children.first() else {
            return Bound::Nothing;
        };

        let method = match callee.kind {
            SyntaxKind::Identifier | SyntaxKind::GenericName => {
                self.resolve_type_arguments(callee, scope);
                let method = self.resolve_simple_call(callee, arity, scope);
                if let Some(method) = method {
                    self.record(scope.unit, callee, method);
                }
                method
            }
            SyntaxKind::MemberAccess => {
                let receiver = match callee.children.first() {
                    Some(target) => self.bind_expr(target, scope),
                    None => Bound::Nothing,
                };
                let name_node = callee.children.get(1);
                if let Some(name_node) = name_node {
                    self.resolve_type_arguments(name_node, scope);
                }
                let method = self.resolve_method_on(receiver, callee.text(), arity);
                if let Some(method) = method {
                    self.record(scope.unit, callee, method);
                    if let Some(name_node) = name_node {
                        self.record(scope.unit, name_node, method);
                    }
                }
                method
            }
            SyntaxKind::MemberBinding => {
                let receiver = Bound::Value(scope.conditional_receiver);
                let method = self.resolve_method_on(receiver, callee.text(), arity);
                if let Some(method) = method {
                    self.record(scope.unit, callee, method);
                    if let Some(name_node) = callee.children.last() {
                        self.record(scope.unit, name_node, method);
                    }
                }
                method
            }
            _ => {
                self.bind_expr(callee, scope);
                None
            }
        };

        match method {
            Some(method) => {
                self.record(scope.unit, node, method);
                Bound::Value(self.table.get(method).value_type())
            }
            None => Bound::Nothing,
        }
    }

    /// `Name(..)`: local function, then methods of the enclosing types,
    /// then a member inherited from an external base
    fn resolve_simple_call(
        &mut self,
        callee: &'u SyntaxNode,
        arity: usize,
        scope: &mut Scope,
    ) -> Option<SymbolId> {
        let name = callee.text();
        if let Some(local) = scope.local(name) {
            if self.table.get(local).is_method() {
                return Some(local);
            }
            // delegate-typed variable
            self.record(scope.unit, callee, local);
            return None;
        }
        let found = scope
            .types
            .iter()
            .rev()
            .find_map(|&enclosing| self.find_member(enclosing, name, Want::Method(arity)));
        if found.is_some() {
            return found;
        }
        let innermost = scope.current_type()?;
        let host = self
            .lookup_chain(innermost)
            .into_iter()
            .find(|&owner| self.can_host(owner, name))?;
        Some(self.synthesize_member(host, name, Want::Method(arity)))
    }

    fn resolve_method_on(&mut self, receiver: Bound, name: &str, arity: usize) -> Option<SymbolId> {
        match receiver {
            Bound::Value(Some(ty)) => self
                .find_member(ty, name, Want::Method(arity))
                .or_else(|| self.find_extension(name, arity))
                .or_else(|| self.lookup_member(ty, name, Want::Method(arity))),
            Bound::Type(ty) => self.lookup_member(ty, name, Want::Method(arity)),
            Bound::Value(None) | Bound::Nothing => self.find_extension(name, arity),
            Bound::Namespace(_) => None,
        }
    }

    fn bind_object_creation(&mut self, node: &'u SyntaxNode, scope: &mut Scope) -> Bound {
        let mut created = None;
        for (index, child) in node.children.iter().enumerate() {
            if index == 0 && child.kind.is_type_syntax() {
                created = self.resolve_type_syntax(child, scope);
            } else if child.kind == SyntaxKind::Initializer {
                self.bind_initializer(child, created, scope);
            } else {
                self.bind_expr(child, scope);
            }
        }
        if let Some(ty) = created {
            let arity = node
                .child_of_kind(SyntaxKind::ArgumentList)
                .map_or(0, |list| list.children_of_kind(SyntaxKind::Argument).count());
            if let Some(constructor) = self.find_constructor(ty, arity) {
                self.record(scope.unit, node, constructor);
            }
        }
        Bound::Value(created)
    }

    fn bind_initializer(
        &mut self,
        node: &'u SyntaxNode,
        target: Option<SymbolId>,
        scope: &mut Scope,
    ) {
        for child in &node.children {
            let member_assignment = child.kind == SyntaxKind::Assignment
                && child
                    .children
                    .first()
                    .is_some_and(|left| left.kind == SyntaxKind::Identifier);
            match (member_assignment, target) {
                (true, Some(ty)) => {
                    if let Some((left, rest)) = child.children.split_first() {
                        if let Some(member) = self.lookup_member(ty, left.text(), Want::Any) {
                            self.record(scope.unit, left, member);
                        }
                        for right in rest {
                            self.bind_expr(right, scope);
                        }
                    }
                }
                _ => {
                    self.bind_expr(child, scope);
                }
            }
        }
    }

    fn find_constructor(&self, ty: SymbolId, arity: usize) -> Option<SymbolId> {
        let constructors: Vec<SymbolId> = self
            .table
            .get(ty)
            .as_type()?
            .members
            .iter()
            .copied()
            .filter(|&member| self.is_constructor(member))
            .collect();
        constructors
            .iter()
            .copied()
            .find(|&constructor| self.arity(constructor) == arity)
            .or_else(|| constructors.first().copied())
    }

    // ----- bookkeeping -----

    fn declared(&self, unit: usize, node: &SyntaxNode) -> Option<SymbolId> {
        self.bindings[unit].declared.get(&node.id).copied()
    }

    fn resolved(&self, unit: usize, node: &SyntaxNode) -> Option<SymbolId> {
        self.bindings[unit].resolved.get(&node.id).copied()
    }

    fn record(&mut self, unit: usize, node: &SyntaxNode, symbol: SymbolId) {
        self.bindings[unit].resolved.insert(node.id, symbol);
    }
}

fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

fn type_parameter_names(node: &SyntaxNode) -> impl Iterator<Item = String> + '_ {
    node.children_of_kind(SyntaxKind::TypeParameterList)
        .flat_map(|list| list.children_of_kind(SyntaxKind::TypeParameter))
        .map(|parameter| parameter.text().to_string())
}

/// Type syntax children, looking through tuple elements
fn type_children(node: &SyntaxNode) -> Vec<&SyntaxNode> {
    let mut types = Vec::new();
    for child in &node.children {
        if child.kind.is_type_syntax() {
            types.push(child);
        } else if child.kind == SyntaxKind::Other {
            types.extend(child.children.iter().filter(|c| c.kind.is_type_syntax()));
        }
    }
    types
}

/// `A.B<C.D>.E` -> `A.B.E`
fn strip_type_arguments(name: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn external_type_kind(name: &str) -> TypeKind {
    if KNOWN_STRUCTS.contains(&name) {
        return TypeKind::Struct;
    }
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some('I'), Some(second)) if second.is_ascii_uppercase() => TypeKind::Interface,
        _ => TypeKind::Class,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_type_arguments() {
        assert_eq!(strip_type_arguments("A.B<C.D>.E"), "A.B.E");
        assert_eq!(strip_type_arguments("List<Dictionary<int, string>>"), "List");
    }

    #[test]
    fn test_external_type_kind() {
        assert_eq!(external_type_kind("IDisposable"), TypeKind::Interface);
        assert_eq!(external_type_kind("Image"), TypeKind::Class);
        assert_eq!(external_type_kind("Guid"), TypeKind::Struct);
    }

    #[test]
    fn test_qualify() {
        assert_eq!(qualify("", "Foo"), "Foo");
        assert_eq!(qualify("App.Models", "Foo"), "App.Models.Foo");
    }
}
