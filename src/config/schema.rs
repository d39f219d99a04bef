use anyhow::{anyhow, Result};
use jsonschema::JSONSchema;
use log::info;
use serde_json::Value;

/// Validate a raw configuration document before deserialising it.
///
/// Schema errors are collected into one message so an operator sees every
/// problem at once instead of fixing them one resubmission at a time.
pub fn validate(json: &Value) -> Result<()> {
    info!("Validating configuration against JSON schema");
    let compiled = compile_schema();
    if let Err(errors) = compiled.validate(json) {
        let details: Vec<String> = errors.map(|err| err.to_string()).collect();
        return Err(anyhow!(
            "configuration fails schema validation: {}",
            details.join("; ")
        ));
    }
    Ok(())
}

fn compile_schema() -> JSONSchema {
    /// included configuration schema (static)
    static SCHEMA: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/config/schema.json"));
    let schema_json: Value = serde_json::from_str(SCHEMA).expect("Valid JSON");
    JSONSchema::compile(&schema_json).expect("Valid schema")
}
