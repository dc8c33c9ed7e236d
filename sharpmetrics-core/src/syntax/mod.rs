//! Owned C# syntax tree
//!
//! The C# front-end lowers the tree-sitter concrete tree into these nodes.
//! Every metric works on this representation only.
//!
//! Conventions:
//! - declared names live in `SyntaxNode::text`, never as child `Identifier`s,
//!   so an `Identifier` node is always a reference
//! - `Binary`, `Assignment` and unary nodes carry their operator in `text`
//! - comments and attributes are not part of the tree

pub mod decl;
pub mod query;

use crate::language::SourceSpan;
use std::path::PathBuf;

pub use decl::{ClassNode, MethodNode};

/// Pre-order index of a node inside its `SourceUnit`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Node kinds of the lowered C# tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    // declarations
    CompilationUnit,
    UsingDirective,
    Namespace,
    Class,
    Struct,
    Interface,
    Record,
    Enum,
    EnumMember,
    Delegate,
    Field,
    Property,
    Event,
    Indexer,
    Method,
    Constructor,
    Destructor,
    Operator,
    LocalFunction,
    Accessor,
    AccessorList,
    BaseList,
    ParameterList,
    Parameter,
    VariableDeclaration,
    VariableDeclarator,
    ArrowExpression,
    ConstructorInitializer,
    TypeParameterList,
    TypeParameter,

    // types
    PredefinedType,
    ImplicitType,
    GenericName,
    QualifiedName,
    ArrayType,
    NullableType,
    TupleType,
    PointerType,
    TypeArgumentList,

    // statements and clauses
    Block,
    LocalDeclaration,
    ExpressionStatement,
    If,
    While,
    Do,
    For,
    ForEach,
    Switch,
    SwitchSection,
    CaseLabel,
    DefaultLabel,
    Break,
    Continue,
    Return,
    Goto,
    Throw,
    Try,
    Catch,
    CatchDeclaration,
    Finally,
    Using,
    Lock,
    Yield,
    Labeled,
    Empty,

    // expressions
    Identifier,
    MemberAccess,
    ConditionalAccess,
    MemberBinding,
    Invocation,
    ArgumentList,
    Argument,
    ObjectCreation,
    ArrayCreation,
    Initializer,
    Cast,
    As,
    Is,
    Binary,
    Assignment,
    PrefixUnary,
    PostfixUnary,
    Conditional,
    Lambda,
    This,
    Base,
    Literal,
    InterpolatedString,
    ElementAccess,
    Parenthesized,
    TypeOf,
    Default,
    Await,
    SwitchExpression,
    SwitchExpressionArm,
    ThrowExpression,
    DeclarationExpression,
    Query,
    Tuple,

    /// Anything the lowering does not model; children are kept.
    Other,
}

impl SyntaxKind {
    pub fn is_type_declaration(self) -> bool {
        matches!(
            self,
            SyntaxKind::Class
                | SyntaxKind::Struct
                | SyntaxKind::Interface
                | SyntaxKind::Record
                | SyntaxKind::Enum
                | SyntaxKind::Delegate
        )
    }

    pub fn is_loop(self) -> bool {
        matches!(
            self,
            SyntaxKind::For | SyntaxKind::ForEach | SyntaxKind::While | SyntaxKind::Do
        )
    }

    /// Kinds that appear in type position
    pub fn is_type_syntax(self) -> bool {
        matches!(
            self,
            SyntaxKind::Identifier
                | SyntaxKind::PredefinedType
                | SyntaxKind::ImplicitType
                | SyntaxKind::GenericName
                | SyntaxKind::QualifiedName
                | SyntaxKind::ArrayType
                | SyntaxKind::NullableType
                | SyntaxKind::TupleType
                | SyntaxKind::PointerType
        )
    }

    pub fn is_case_label(self) -> bool {
        matches!(
            self,
            SyntaxKind::CaseLabel | SyntaxKind::DefaultLabel | SyntaxKind::SwitchExpressionArm
        )
    }
}

/// C# declaration modifier keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Public,
    Private,
    Protected,
    Internal,
    Static,
    Virtual,
    Override,
    Abstract,
    Sealed,
    Readonly,
    Const,
    Async,
    Extern,
    New,
    Partial,
    Unsafe,
    Volatile,
    Required,
    // parameter modifiers
    This,
    Ref,
    Out,
    In,
    Params,
}

impl Modifier {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let modifier = match keyword {
            "public" => Modifier::Public,
            "private" => Modifier::Private,
            "protected" => Modifier::Protected,
            "internal" => Modifier::Internal,
            "static" => Modifier::Static,
            "virtual" => Modifier::Virtual,
            "override" => Modifier::Override,
            "abstract" => Modifier::Abstract,
            "sealed" => Modifier::Sealed,
            "readonly" => Modifier::Readonly,
            "const" => Modifier::Const,
            "async" => Modifier::Async,
            "extern" => Modifier::Extern,
            "new" => Modifier::New,
            "partial" => Modifier::Partial,
            "unsafe" => Modifier::Unsafe,
            "volatile" => Modifier::Volatile,
            "required" => Modifier::Required,
            "this" => Modifier::This,
            "ref" => Modifier::Ref,
            "out" => Modifier::Out,
            "in" => Modifier::In,
            "params" => Modifier::Params,
            _ => return None,
        };
        Some(modifier)
    }

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

/// Declared accessibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Accessibility {
    Private,
    PrivateProtected,
    Protected,
    Internal,
    ProtectedInternal,
    Public,
}

impl Accessibility {
    /// Visible to derived classes (public, protected or protected internal)
    pub fn is_inheritable(self) -> bool {
        matches!(
            self,
            Accessibility::Public | Accessibility::Protected | Accessibility::ProtectedInternal
        )
    }
}

/// Set of modifiers attached to a declaration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    bits: u32,
}

impl Modifiers {
    pub fn insert(&mut self, modifier: Modifier) {
        self.bits |= modifier.bit();
    }

    pub fn contains(&self, modifier: Modifier) -> bool {
        self.bits & modifier.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Accessibility written on the declaration, or `default` when none is
    pub fn accessibility(&self, default: Accessibility) -> Accessibility {
        let public = self.contains(Modifier::Public);
        let private = self.contains(Modifier::Private);
        let protected = self.contains(Modifier::Protected);
        let internal = self.contains(Modifier::Internal);
        match (public, private, protected, internal) {
            (true, _, _, _) => Accessibility::Public,
            (_, true, true, _) => Accessibility::PrivateProtected,
            (_, _, true, true) => Accessibility::ProtectedInternal,
            (_, _, true, _) => Accessibility::Protected,
            (_, _, _, true) => Accessibility::Internal,
            (_, true, _, _) => Accessibility::Private,
            _ => default,
        }
    }
}

impl FromIterator<Modifier> for Modifiers {
    fn from_iter<I: IntoIterator<Item = Modifier>>(iter: I) -> Self {
        let mut modifiers = Modifiers::default();
        for modifier in iter {
            modifiers.insert(modifier);
        }
        modifiers
    }
}

/// A node of the lowered tree
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    pub id: NodeId,
    pub kind: SyntaxKind,
    pub span: SourceSpan,
    /// Declared name, referenced identifier, operator or keyword
    pub text: Option<String>,
    /// Where the declared name is written, for declarations
    pub name_span: Option<SourceSpan>,
    pub modifiers: Modifiers,
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn is(&self, kind: SyntaxKind) -> bool {
        self.kind == kind
    }

    pub fn child_of_kind(&self, kind: SyntaxKind) -> Option<&SyntaxNode> {
        self.children.iter().find(|child| child.kind == kind)
    }

    pub fn children_of_kind(&self, kind: SyntaxKind) -> impl Iterator<Item = &SyntaxNode> {
        self.children.iter().filter(move |child| child.kind == kind)
    }

    /// Strict descendants in pre-order
    pub fn descendants(&self) -> query::Descendants<'_> {
        query::Descendants::new(self)
    }
}

/// A parsed `.cs` document
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub source: String,
    pub root: SyntaxNode,
    /// tree-sitter reported ERROR or MISSING nodes
    pub has_errors: bool,
}

impl SourceUnit {
    pub fn text_of(&self, node: &SyntaxNode) -> &str {
        self.source.get(node.span.start..node.span.end).unwrap_or("")
    }

    /// Every class declaration, nested ones included, in source order
    pub fn classes(&self) -> Vec<ClassNode<'_>> {
        self.root
            .descendants()
            .filter(|node| node.kind == SyntaxKind::Class)
            .filter_map(ClassNode::cast)
            .collect()
    }

    /// Every method declaration outside interfaces, in source order
    pub fn methods(&self) -> Vec<(ClassNode<'_>, MethodNode<'_>)> {
        let mut methods = Vec::new();
        for declaration in self
            .root
            .descendants()
            .filter(|node| node.kind.is_type_declaration() && node.kind != SyntaxKind::Interface)
        {
            if let Some(owner) = ClassNode::cast(declaration) {
                methods.extend(owner.methods().into_iter().map(|method| (owner, method)));
            }
        }
        methods.sort_by_key(|(_, method)| method.syntax().span.start);
        methods
    }
}
