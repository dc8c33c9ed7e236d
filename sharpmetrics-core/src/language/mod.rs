//! C# front-end
//!
//! Parses `.cs` documents with tree-sitter and lowers them into the owned
//! syntax tree of [`crate::syntax`].

pub mod csharp;
pub mod parser;
pub mod span;
pub mod tree_sitter_utils;

use std::path::Path;

pub use csharp::CSharpParser;
pub use parser::LanguageParser;
pub use span::SourceSpan;

/// Check whether a path names a C# source document
pub fn is_csharp_source(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("cs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_csharp_source() {
        assert!(is_csharp_source(Path::new("src/Program.cs")));
        assert!(!is_csharp_source(Path::new("App.csproj")));
        assert!(!is_csharp_source(Path::new("README")));
    }
}
