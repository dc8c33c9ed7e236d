//! Symbols and the symbol table

use crate::syntax::{Accessibility, Modifier, Modifiers, NodeId};

/// Nominal identity of a declaration
///
/// Two ids are equal exactly when they denote the same declaration; two
/// distinct classes that happen to share a name never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    Enum,
    Record,
    Delegate,
}

/// Types denoted by C# keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialType {
    Object,
    String,
    Dynamic,
    Void,
    Boolean,
    Char,
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    NInt,
    NUInt,
    Single,
    Double,
    Decimal,
}

impl SpecialType {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let special = match keyword {
            "object" => SpecialType::Object,
            "string" => SpecialType::String,
            "dynamic" => SpecialType::Dynamic,
            "void" => SpecialType::Void,
            "bool" => SpecialType::Boolean,
            "char" => SpecialType::Char,
            "sbyte" => SpecialType::SByte,
            "byte" => SpecialType::Byte,
            "short" => SpecialType::Int16,
            "ushort" => SpecialType::UInt16,
            "int" => SpecialType::Int32,
            "uint" => SpecialType::UInt32,
            "long" => SpecialType::Int64,
            "ulong" => SpecialType::UInt64,
            "nint" => SpecialType::NInt,
            "nuint" => SpecialType::NUInt,
            "float" => SpecialType::Single,
            "double" => SpecialType::Double,
            "decimal" => SpecialType::Decimal,
            _ => return None,
        };
        Some(special)
    }

    /// Framework name, e.g. `Int32` for `int`
    pub fn metadata_name(self) -> &'static str {
        match self {
            SpecialType::Object => "Object",
            SpecialType::String => "String",
            SpecialType::Dynamic => "Object",
            SpecialType::Void => "Void",
            SpecialType::Boolean => "Boolean",
            SpecialType::Char => "Char",
            SpecialType::SByte => "SByte",
            SpecialType::Byte => "Byte",
            SpecialType::Int16 => "Int16",
            SpecialType::UInt16 => "UInt16",
            SpecialType::Int32 => "Int32",
            SpecialType::UInt32 => "UInt32",
            SpecialType::Int64 => "Int64",
            SpecialType::UInt64 => "UInt64",
            SpecialType::NInt => "IntPtr",
            SpecialType::NUInt => "UIntPtr",
            SpecialType::Single => "Single",
            SpecialType::Double => "Double",
            SpecialType::Decimal => "Decimal",
        }
    }

    pub fn is_value_type(self) -> bool {
        !matches!(
            self,
            SpecialType::Object | SpecialType::String | SpecialType::Dynamic
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeSymbol {
    pub type_kind: TypeKind,
    pub special: Option<SpecialType>,
    pub base_type: Option<SymbolId>,
    pub interfaces: Vec<SymbolId>,
    pub members: Vec<SymbolId>,
    pub type_parameters: Vec<String>,
}

impl TypeSymbol {
    pub fn is_value_type(&self) -> bool {
        match self.special {
            Some(special) => special.is_value_type(),
            None => matches!(self.type_kind, TypeKind::Struct | TypeKind::Enum),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    Ordinary,
    Constructor,
    LocalFunction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodSymbol {
    pub method_kind: MethodKind,
    pub parameters: Vec<SymbolId>,
    pub return_type: Option<SymbolId>,
    /// Base method an `override` replaces
    pub overridden: Option<SymbolId>,
    pub is_extension: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    Type(TypeSymbol),
    Method(MethodSymbol),
    Field { ty: Option<SymbolId> },
    Property { ty: Option<SymbolId> },
    Event { ty: Option<SymbolId> },
    Parameter { ty: Option<SymbolId> },
    Local { ty: Option<SymbolId> },
}

/// Where a source symbol is declared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Declaration {
    pub unit: usize,
    pub node: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub qualified_name: String,
    pub kind: SymbolKind,
    pub containing_type: Option<SymbolId>,
    pub accessibility: Accessibility,
    pub modifiers: Modifiers,
    /// Owning assembly; `None` for symbols synthesized for unknown library code
    pub assembly: Option<String>,
    /// `None` for library and keyword types
    pub declaration: Option<Declaration>,
}

impl Symbol {
    pub fn as_type(&self) -> Option<&TypeSymbol> {
        match &self.kind {
            SymbolKind::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&MethodSymbol> {
        match &self.kind {
            SymbolKind::Method(method) => Some(method),
            _ => None,
        }
    }

    pub fn is_type(&self) -> bool {
        matches!(self.kind, SymbolKind::Type(_))
    }

    pub fn is_method(&self) -> bool {
        matches!(self.kind, SymbolKind::Method(_))
    }

    pub fn is_field(&self) -> bool {
        matches!(self.kind, SymbolKind::Field { .. })
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifier::Static) || self.modifiers.contains(Modifier::Const)
    }

    pub fn is_source(&self) -> bool {
        self.declaration.is_some()
    }

    /// Declared type of a variable-like symbol, return type of a method
    pub fn value_type(&self) -> Option<SymbolId> {
        match &self.kind {
            SymbolKind::Type(_) => None,
            SymbolKind::Method(method) => method.return_type,
            SymbolKind::Field { ty }
            | SymbolKind::Property { ty }
            | SymbolKind::Event { ty }
            | SymbolKind::Parameter { ty }
            | SymbolKind::Local { ty } => *ty,
        }
    }

    /// Ordinary (non-constructor, non-local) method
    pub fn is_ordinary_method(&self) -> bool {
        self.as_method()
            .is_some_and(|method| method.method_kind == MethodKind::Ordinary)
    }
}

/// Arena of every symbol of a compilation; `SymbolId` indexes into it
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub(crate) fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    /// Insert a symbol, assigning its id
    pub(crate) fn add(&mut self, mut symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        symbol.id = id;
        self.symbols.push(symbol);
        id
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> Symbol {
        Symbol {
            id: SymbolId(u32::MAX),
            name: name.to_string(),
            qualified_name: name.to_string(),
            kind: SymbolKind::Field { ty: None },
            containing_type: None,
            accessibility: Accessibility::Private,
            modifiers: Modifiers::default(),
            assembly: Some("App".to_string()),
            declaration: None,
        }
    }

    #[test]
    fn test_table_assigns_sequential_ids() {
        let mut table = SymbolTable::default();
        let a = table.add(field("a"));
        let b = table.add(field("a"));
        assert_eq!(a, SymbolId(0));
        assert_eq!(b, SymbolId(1));
        assert_ne!(a, b, "same name, different declarations");
        assert_eq!(table.get(b).id, b);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_special_types() {
        assert_eq!(SpecialType::from_keyword("int"), Some(SpecialType::Int32));
        assert!(SpecialType::Int32.is_value_type());
        assert!(!SpecialType::String.is_value_type());
        assert_eq!(SpecialType::from_keyword("var"), None);
        assert_eq!(SpecialType::Double.metadata_name(), "Double");
    }
}
