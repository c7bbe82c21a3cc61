use schemars::schema_for;

use crate::json::types;

pub fn generate_json_schema() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&schema_for!(types::Snapshot))
}

pub fn generate_result_schema() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&schema_for!(
        crate::solver::optimization_result::OptimizationResult
    ))
}
