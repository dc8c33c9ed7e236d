//! Data class check: classes should hold only fields and properties

use super::{name_location, Diagnostic, Severity, SmellRule};
use crate::config::ResolvedConfig;
use crate::semantic::SemanticModel;
use crate::syntax::{SourceUnit, SyntaxKind};

pub struct DataClass;

impl SmellRule for DataClass {
    fn id(&self) -> &'static str {
        "CFP001"
    }

    fn name(&self) -> &'static str {
        "data-class"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_unit(
        &self,
        unit: &SourceUnit,
        _model: &dyn SemanticModel,
        _config: &ResolvedConfig,
        out: &mut Vec<Diagnostic>,
    ) {
        for class in unit.classes() {
            // `Other` holds non-member syntax such as constraint clauses
            let has_behaviour = class.members().any(|member| {
                !matches!(
                    member.kind,
                    SyntaxKind::Field | SyntaxKind::Property | SyntaxKind::Other
                )
            });
            if has_behaviour {
                let message = format!(
                    "Class '{}' contains non-field and non-property members.",
                    class.name()
                );
                out.push(self.diagnostic(unit, name_location(class.syntax()), message));
            }
        }
    }
}
