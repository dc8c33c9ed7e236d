//! Code smell detection over bound C# documents
//!
//! Each rule is stateless: the same compilation and configuration always
//! produce the same diagnostics, in document order then source order.

pub mod data_class;
pub mod feature_envy;
pub mod method_call;
pub mod refused_bequest;

pub use data_class::DataClass;
pub use feature_envy::FeatureEnvy;
pub use method_call::MethodCall;
pub use refused_bequest::RefusedBequest;

use crate::config::ResolvedConfig;
use crate::language::{CSharpParser, SourceSpan};
use crate::project::{compile_projects, load_projects};
use crate::semantic::{Compilation, SemanticModel};
use crate::syntax::{SourceUnit, SyntaxNode};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// One reported smell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    pub file: PathBuf,
    pub span: SourceSpan,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {} {}: {}",
            self.file.display(),
            self.span.start_line,
            self.span.start_col + 1,
            self.severity,
            self.rule,
            self.message
        )
    }
}

/// A smell detector run once per document
pub trait SmellRule: Send + Sync {
    /// Diagnostic id, e.g. `FeatureEnvy` or `CFP001`
    fn id(&self) -> &'static str;

    /// Name accepted by `--rule`
    fn name(&self) -> &'static str;

    fn severity(&self) -> Severity;

    fn check_unit(
        &self,
        unit: &SourceUnit,
        model: &dyn SemanticModel,
        config: &ResolvedConfig,
        out: &mut Vec<Diagnostic>,
    );

    fn diagnostic(&self, unit: &SourceUnit, span: SourceSpan, message: String) -> Diagnostic {
        Diagnostic {
            rule: self.id().to_string(),
            severity: self.severity(),
            message,
            file: unit.path.clone(),
            span,
        }
    }
}

/// Names accepted by `select_rules`, in reporting order
pub const RULE_NAMES: &[&str] = &["feature-envy", "refused-bequest", "data-class", "method-call"];

/// Every shipped rule, in reporting order
pub fn all_rules() -> Vec<Box<dyn SmellRule>> {
    vec![
        Box::new(FeatureEnvy),
        Box::new(RefusedBequest),
        Box::new(DataClass),
        Box::new(MethodCall),
    ]
}

/// Rules selected by name; an empty selection means every rule
pub fn select_rules(names: &[String]) -> Result<Vec<Box<dyn SmellRule>>> {
    if names.is_empty() {
        return Ok(all_rules());
    }
    let mut selected = Vec::new();
    for rule in all_rules() {
        if names.iter().any(|name| name == rule.name()) {
            selected.push(rule);
        }
    }
    if let Some(unknown) = names
        .iter()
        .find(|name| !selected.iter().any(|rule| rule.name() == name.as_str()))
    {
        anyhow::bail!(
            "unknown rule '{}' (expected one of: {})",
            unknown,
            RULE_NAMES.join(", ")
        );
    }
    Ok(selected)
}

/// Run rules over every document of a compilation
pub fn run_rules(
    rules: &[Box<dyn SmellRule>],
    compilation: &Compilation,
    config: &ResolvedConfig,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for index in 0..compilation.units().len() {
        let model = compilation.model(index);
        for rule in rules {
            rule.check_unit(model.unit(), &model, config, &mut diagnostics);
        }
    }
    diagnostics
}

/// Load every project named by `path`, bind them together and check them
pub fn detect_smells(
    path: &Path,
    rules: &[Box<dyn SmellRule>],
    config: &ResolvedConfig,
) -> Result<Vec<Diagnostic>> {
    let parser = CSharpParser::new()?;
    let projects = load_projects(path, config)?;
    let compilation = compile_projects(&projects, &parser);
    let diagnostics = run_rules(rules, &compilation, config);
    tracing::debug!(
        projects = projects.len(),
        diagnostics = diagnostics.len(),
        "solution checked"
    );
    Ok(diagnostics)
}

/// Render diagnostics one per line
pub fn render_text(diagnostics: &[Diagnostic]) -> String {
    let mut output = String::new();
    for diagnostic in diagnostics {
        output.push_str(&diagnostic.to_string());
        output.push('\n');
    }
    output
}

/// Render diagnostics as JSON output
pub fn render_json(diagnostics: &[Diagnostic]) -> Result<String> {
    serde_json::to_string_pretty(diagnostics).context("Failed to serialize diagnostics as JSON")
}

/// Location of a declaration's name, or the whole declaration without one
pub(crate) fn name_location(declaration: &SyntaxNode) -> SourceSpan {
    declaration.name_span.unwrap_or(declaration.span)
}

#[cfg(test)]
pub(crate) fn check_source(rule: &dyn SmellRule, sources: &[&str]) -> Vec<Diagnostic> {
    use crate::language::csharp::parser::parse_source;

    let units = sources.iter().map(|source| parse_source(source)).collect();
    let compilation = Compilation::build("App", units);
    let config = ResolvedConfig::defaults().unwrap();
    let mut diagnostics = Vec::new();
    for index in 0..compilation.units().len() {
        let model = compilation.model(index);
        rule.check_unit(model.unit(), &model, &config, &mut diagnostics);
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_rules() {
        assert_eq!(select_rules(&[]).unwrap().len(), 4);
        let names: Vec<&str> = all_rules().iter().map(|rule| rule.name()).collect();
        assert_eq!(names, RULE_NAMES);
        let error = select_rules(&["bogus".to_string()]).err().unwrap().to_string();
        assert!(error.ends_with(
            "(expected one of: feature-envy, refused-bequest, data-class, method-call)"
        ));

        let names = ["data-class".to_string(), "feature-envy".to_string()];
        let selected = select_rules(&names).unwrap();
        let ids: Vec<&str> = selected.iter().map(|rule| rule.id()).collect();
        assert_eq!(ids, vec!["FeatureEnvy", "CFP001"]);

        assert!(select_rules(&["god-class".to_string()]).is_err());
    }

    #[test]
    fn test_diagnostic_line() {
        let diagnostic = Diagnostic {
            rule: "CFP001".to_string(),
            severity: Severity::Warning,
            message: "Class 'Order' contains non-field and non-property members.".to_string(),
            file: PathBuf::from("src/Order.cs"),
            span: SourceSpan::new(10, 15, 3, 3, 13, 18),
        };
        assert_eq!(
            diagnostic.to_string(),
            concat!(
                "src/Order.cs:3:14: warning CFP001: ",
                "Class 'Order' contains non-field and non-property members."
            )
        );

        let json = render_json(&[diagnostic]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["severity"], "warning");
        assert_eq!(value[0]["span"]["start_line"], 3);
    }

    #[test]
    fn test_run_rules_follows_document_order() {
        use crate::language::csharp::parser::parse_source;

        let compilation = Compilation::build(
            "App",
            vec![
                parse_source("class First { void M() { } }"),
                parse_source("class Second { int x; }\nclass Third { void N() { } }"),
            ],
        );
        let config = ResolvedConfig::defaults().unwrap();
        let rules = select_rules(&["data-class".to_string()]).unwrap();
        let diagnostics = run_rules(&rules, &compilation, &config);
        let messages: Vec<&str> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Class 'First' contains non-field and non-property members.",
                "Class 'Third' contains non-field and non-property members.",
            ]
        );
    }
}
