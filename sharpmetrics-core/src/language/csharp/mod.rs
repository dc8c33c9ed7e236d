//! C# support (tree-sitter-c-sharp)

mod lower;
pub mod parser;

pub use parser::CSharpParser;
