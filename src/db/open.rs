use std::fs;
use std::path::Path;

use log::info;
use rusqlite::Connection;

/// Open the submission ledger in the submit directory, creating the
/// directory and schema on first use.
pub fn open_ledger(submit_dir: &Path) -> anyhow::Result<Connection> {
    fs::create_dir_all(submit_dir)?;
    let path = submit_dir.join("harava.db");
    if !path.exists() {
        info!("Creating new ledger {}", path.display())
    }
    let conn = Connection::open(&path)?;

    static SCHEMA: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/db/schema.sql"));
    conn.execute(SCHEMA, [])?;

    Ok(conn)
}
