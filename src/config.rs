//! Load and validate the pipeline configuration

/// Read the JSON configuration file into an immutable Config
pub mod load;

/// Validate raw configuration against the embedded JSON schema
pub mod schema;
