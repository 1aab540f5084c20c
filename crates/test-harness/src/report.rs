//! Structured text-based sketch reports for agent consumption.
//!
//! Reports are natural language, not JSON, because agents read
//! structured text better than raw data for model inspection.

use std::fmt;

use sketch_constraints::ConstantValue;

use crate::helpers::{max_abs, residual_values, HarnessError};
use crate::oracle::OracleVerdict;
use crate::workflow::SketchBuilder;

/// A complete sketch report with all sections.
pub struct SketchReport {
    pub object_entries: Vec<ObjectEntry>,
    pub constraint_entries: Vec<ConstraintEntry>,
    pub param_count: usize,
    pub oracle_results: Vec<OracleVerdict>,
    pub errors: Vec<(String, String)>,
}

/// A single geometric object's report entry.
pub struct ObjectEntry {
    pub id: u32,
    pub name: Option<String>,
    pub kind: String,
    pub managed_by: Option<String>,
}

/// A single constraint's report entry.
pub struct ConstraintEntry {
    pub index: usize,
    pub name: String,
    pub label: String,
    pub objects: Vec<String>,
    pub constants: Vec<(String, String)>,
    pub param_count: usize,
    pub residual_count: usize,
    pub max_residual: Option<f64>,
    pub modifier: bool,
    pub internal: bool,
}

impl SketchReport {
    /// Format the report as text for agent consumption.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Sketch Constraint Report ===\n\n");

        // Objects
        let named = self.object_entries.iter().filter(|e| e.name.is_some()).count();
        out.push_str(&format!(
            "Objects ({} total, {} named, {} params):\n",
            self.object_entries.len(),
            named,
            self.param_count,
        ));
        for entry in self.object_entries.iter().filter(|e| e.name.is_some()) {
            let name = entry.name.as_deref().unwrap_or_default();
            let managed = match &entry.managed_by {
                Some(owner) => format!(" [MANAGED by {}]", owner),
                None => String::new(),
            };
            out.push_str(&format!("  {} \"{}\" #{}{}\n", entry.kind, name, entry.id, managed));
        }

        // Constraints
        let modifier_count = self.constraint_entries.iter().filter(|e| e.modifier).count();
        out.push_str(&format!(
            "\nConstraints ({} total, {} modifiers, {} errors):\n",
            self.constraint_entries.len(),
            modifier_count,
            self.errors.len(),
        ));
        for entry in &self.constraint_entries {
            let mut flags = String::new();
            if entry.modifier {
                flags.push_str(" [MODIFIER]");
            }
            if entry.internal {
                flags.push_str(" [INTERNAL]");
            }
            out.push_str(&format!(
                "  [{}] {} \"{}\"{}\n      Objects: {}\n",
                entry.index,
                entry.label,
                entry.name,
                flags,
                entry.objects.join(", "),
            ));
            if !entry.constants.is_empty() {
                let constants: Vec<String> = entry.constants.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                out.push_str(&format!("      Constants: {}\n", constants.join(", ")));
            }
            if !entry.modifier {
                let status = match entry.max_residual {
                    Some(r) => format!("max |r| = {:.3e}", r),
                    None => "not evaluated".to_string(),
                };
                out.push_str(&format!(
                    "      Params: {} | Residuals: {} | {}\n",
                    entry.param_count, entry.residual_count, status,
                ));
            }
        }

        // Oracle results
        if !self.oracle_results.is_empty() {
            let failed = self.oracle_results.iter().filter(|v| !v.passed).count();
            out.push_str(&format!(
                "\nOracle Results ({} checks, {} failed):\n",
                self.oracle_results.len(),
                failed,
            ));
            for v in &self.oracle_results {
                let status = if v.passed { "PASS" } else { "FAIL" };
                out.push_str(&format!("  [{}] {}: {}\n", status, v.oracle_name, v.detail));
            }
        }

        // Errors
        if self.errors.is_empty() {
            out.push_str("\nErrors: none\n");
        } else {
            out.push_str(&format!("\nErrors ({}):\n", self.errors.len()));
            for (constraint, msg) in &self.errors {
                out.push_str(&format!("  {}: {}\n", constraint, msg));
            }
        }

        out
    }
}

impl fmt::Display for SketchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl SketchBuilder {
    /// Generate a complete sketch report, running every oracle with
    /// residual tolerance `tol`.
    pub fn report(&mut self, tol: f64) -> Result<SketchReport, HarnessError> {
        let oracle_results = self.check_all(tol);

        let object_entries = self
            .sketch()
            .objects()
            .map(|obj| ObjectEntry {
                id: obj.id.0,
                name: self.object_name(obj.id).map(str::to_string),
                kind: format!("{:?}", obj.geometry.kind()),
                managed_by: obj.managed_by.map(|owner| {
                    self.constraints()
                        .iter()
                        .find(|c| c.constraint.id() == owner)
                        .map(|c| c.name.clone())
                        .unwrap_or_else(|| owner.to_string())
                }),
            })
            .collect();

        let mut constraint_entries = Vec::new();
        let mut errors = Vec::new();
        for (index, named) in self.constraints().iter().enumerate() {
            let c = &named.constraint;
            let residuals = match residual_values(c, self.sketch()) {
                Ok(values) => Some(values),
                Err(e) => {
                    errors.push((named.name.clone(), e.to_string()));
                    None
                }
            };
            constraint_entries.push(ConstraintEntry {
                index,
                name: named.name.clone(),
                label: c.label(),
                objects: c
                    .objects()
                    .iter()
                    .map(|&id| self.object_name(id).map(str::to_string).unwrap_or_else(|| id.to_string()))
                    .collect(),
                constants: c
                    .constants()
                    .iter()
                    .map(|(k, v)| (k.clone(), describe_constant(v)))
                    .collect(),
                param_count: c.params().len(),
                residual_count: residuals.as_ref().map_or(0, Vec::len),
                max_residual: residuals.as_deref().map(max_abs),
                modifier: c.is_modifier(),
                internal: c.is_internal(),
            });
        }

        Ok(SketchReport {
            object_entries,
            constraint_entries,
            param_count: self.sketch().param_count(),
            oracle_results,
            errors,
        })
    }
}

fn describe_constant(value: &ConstantValue) -> String {
    match value {
        ConstantValue::Flag(b) => b.to_string(),
        ConstantValue::Number(n) => n.to_string(),
        ConstantValue::Text(s) => s.clone(),
    }
}
