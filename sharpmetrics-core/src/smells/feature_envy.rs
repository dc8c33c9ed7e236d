//! Feature Envy: a method calling into one other type more than the threshold

use super::{name_location, Diagnostic, Severity, SmellRule};
use crate::config::ResolvedConfig;
use crate::metrics::foreign_accesses;
use crate::semantic::{SemanticModel, SymbolId};
use crate::syntax::SourceUnit;
use std::collections::BTreeMap;

pub struct FeatureEnvy;

impl SmellRule for FeatureEnvy {
    fn id(&self) -> &'static str {
        "FeatureEnvy"
    }

    fn name(&self) -> &'static str {
        "feature-envy"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_unit(
        &self,
        unit: &SourceUnit,
        model: &dyn SemanticModel,
        config: &ResolvedConfig,
        out: &mut Vec<Diagnostic>,
    ) {
        for (owner, method) in unit.methods() {
            let Some(declaring) = model.declared_symbol(owner.syntax()) else {
                continue;
            };

            // Keyed by symbol so the report order does not depend on hashing
            let mut calls: BTreeMap<SymbolId, usize> = BTreeMap::new();
            for access in foreign_accesses(
                method.syntax(),
                Some(declaring),
                model,
                Some(&config.system_assembly_prefixes),
            ) {
                if model.symbol(access.symbol).is_method() {
                    *calls.entry(access.owner).or_default() += 1;
                }
            }

            for (envied, count) in calls {
                if count <= config.feature_envy_threshold {
                    continue;
                }
                let message = format!(
                    "Method '{}' in class '{}' frequently calls methods from class '{}'",
                    method.name(),
                    owner.name(),
                    model.symbol(envied).name
                );
                out.push(self.diagnostic(unit, name_location(method.syntax()), message));
            }
        }
    }
}
