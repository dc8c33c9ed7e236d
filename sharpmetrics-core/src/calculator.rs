//! Row assembly: projects to compilations to metric records
//!
//! Global invariants enforced:
//! - Records follow document order, then source order within a document
//! - Paths handed to `calculate_many` are independent; results keep input order
//! - A path that cannot be loaded contributes no rows

use crate::config::ResolvedConfig;
use crate::language::CSharpParser;
use crate::metrics::{extract_class_metrics, extract_method_metrics};
use crate::project::{compile_projects, load_projects};
use crate::record::{ClassMetrics, MethodMetrics};
use crate::semantic::{Compilation, DocumentModel, SemanticModel};
use crate::syntax::SyntaxNode;
use anyhow::Result;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Stack of each worker; documents deeper than `MAX_SYNTAX_DEPTH` never
/// reach the recursive passes
const WORKER_STACK_SIZE: usize = 8 * 1024 * 1024;

/// Produces one record per measured declaration below a path
pub trait MetricCalculator: Sync {
    type Record: Send;

    fn config(&self) -> &ResolvedConfig;

    /// Records of one bound document
    fn unit_records(&self, model: &DocumentModel<'_>) -> Vec<Self::Record>;

    /// Records for every project named by `path`, bound as one compilation
    fn calculate(&self, path: &Path) -> Result<Vec<Self::Record>> {
        let parser = CSharpParser::new()?;
        let projects = load_projects(path, self.config())?;
        let compilation = compile_projects(&projects, &parser);
        Ok(self.compilation_records(&compilation))
    }

    fn compilation_records(&self, compilation: &Compilation) -> Vec<Self::Record> {
        let mut records = Vec::new();
        for index in 0..compilation.units().len() {
            records.extend(self.unit_records(&compilation.model(index)));
        }
        tracing::debug!(records = records.len(), "compilation measured");
        records
    }

    /// Calculate several paths concurrently, concatenating in input order
    ///
    /// A path that fails to load is logged and contributes nothing.
    fn calculate_many(&self, paths: &[PathBuf]) -> Vec<Self::Record> {
        let run = || -> Vec<Vec<Self::Record>> {
            paths
                .par_iter()
                .map(|path| match self.calculate(path) {
                    Ok(records) => records,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping path");
                        Vec::new()
                    }
                })
                .collect()
        };
        let pool = ThreadPoolBuilder::new()
            .stack_size(WORKER_STACK_SIZE)
            .thread_name(|i| format!("sharpmetrics-worker-{i}"))
            .build();
        let results = match pool {
            Ok(pool) => pool.install(run),
            Err(e) => {
                tracing::warn!(error = %e, "using the global thread pool");
                run()
            }
        };
        results.into_iter().flatten().collect()
    }
}

/// Qualified name of a declaration, falling back to its simple name
fn qualified_name(model: &dyn SemanticModel, declaration: &SyntaxNode, simple: &str) -> String {
    model
        .declared_symbol(declaration)
        .map(|id| model.symbol(id).qualified_name.clone())
        .unwrap_or_else(|| simple.to_string())
}

/// One `ClassMetrics` row per class declaration, nested classes included
pub struct ClassMetricCalculator {
    config: ResolvedConfig,
}

impl ClassMetricCalculator {
    pub fn new(config: ResolvedConfig) -> Self {
        ClassMetricCalculator { config }
    }
}

impl MetricCalculator for ClassMetricCalculator {
    type Record = ClassMetrics;

    fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    fn unit_records(&self, model: &DocumentModel<'_>) -> Vec<ClassMetrics> {
        let unit = model.unit();
        unit.classes()
            .into_iter()
            .map(|class| {
                let name = qualified_name(model, class.syntax(), class.name());
                ClassMetrics::new(name, extract_class_metrics(class, unit, model))
            })
            .collect()
    }
}

/// One `MethodMetrics` row per method outside interfaces
///
/// With annotations, only annotated methods are kept and carry their label.
pub struct MethodMetricCalculator {
    config: ResolvedConfig,
    annotations: Option<HashMap<String, i64>>,
}

impl MethodMetricCalculator {
    pub fn new(config: ResolvedConfig, annotations: Option<HashMap<String, i64>>) -> Self {
        MethodMetricCalculator {
            config,
            annotations,
        }
    }
}

impl MetricCalculator for MethodMetricCalculator {
    type Record = MethodMetrics;

    fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    fn unit_records(&self, model: &DocumentModel<'_>) -> Vec<MethodMetrics> {
        let unit = model.unit();
        let mut records = Vec::new();
        for (owner, method) in unit.methods() {
            let name = qualified_name(model, method.syntax(), method.name());
            let label = match &self.annotations {
                Some(annotations) => match annotations.get(&name) {
                    Some(&label) => Some(label),
                    None => continue,
                },
                None => None,
            };
            let raw = extract_method_metrics(owner, method, unit, model);
            records.push(MethodMetrics::new(name, raw, label));
        }
        records
    }
}
