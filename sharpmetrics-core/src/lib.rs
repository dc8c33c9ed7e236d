//! sharpmetrics core library - object-oriented metrics and code smells for C#

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Metrics are computed per class and per method declaration
// - No global mutable state
// - Symbol identity, never a name, decides whether two references share a type
// - Deterministic traversal order must be explicit
// - Formatting, comments, and whitespace must not affect results
// - Identical input yields byte-for-byte identical output

pub mod annotations;
pub mod calculator;
pub mod config;
pub mod language;
pub mod metrics;
pub mod project;
pub mod record;
pub mod report;
pub mod semantic;
pub mod smells;
pub mod syntax;
pub mod text;

pub use annotations::read_annotations;
pub use calculator::{ClassMetricCalculator, MethodMetricCalculator, MetricCalculator};
pub use config::ResolvedConfig;
pub use project::{compile_projects, load_projects, Project};
pub use record::{ClassMetrics, MethodMetrics, MetricRecord};
pub use report::{read_csv, render_console, render_json, save_to_file, write_csv};
pub use smells::{detect_smells, Diagnostic, Severity, SmellRule};
