use anyhow::Result;
use chrono::Utc;
use log::info;
use rusqlite::Connection;

use crate::manifest::record::WorkUnit;

/// Record every planned unit. Replanning replaces the prior row for the
/// same (version, unit_id) and resets its submitted flag.
pub fn record_planned(conn: &Connection, units: &[WorkUnit]) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    for unit in units {
        conn.execute(
            "INSERT OR REPLACE INTO batch (version, unit_id, url_list, destination, planned_at, submitted) \
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            (
                &unit.version,
                &unit.unit_id,
                &unit.url_list.display().to_string(),
                &unit.destination,
                &now,
            ),
        )?;
    }
    info!("Recorded {} planned units in the ledger", units.len());
    Ok(())
}

/// Mark every pending unit as submitted under one SLURM array job id
pub fn mark_submitted(conn: &Connection, slurm_id: &str) -> Result<()> {
    let changed = conn.execute(
        "UPDATE batch SET submitted = 1, slurm_id = ?1 WHERE submitted = 0",
        [slurm_id],
    )?;
    info!("Marked {changed} units submitted under SLURM job {slurm_id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open::open_ledger;
    use std::path::PathBuf;

    fn unit(version: &str, unit_id: &str) -> WorkUnit {
        WorkUnit {
            url_list: PathBuf::from(format!("urls/{version}/batch_{unit_id}.txt")),
            version: version.to_string(),
            unit_id: unit_id.to_string(),
            destination: format!("nhagar/dolma_urls_{version}"),
        }
    }

    fn count(conn: &Connection, filter: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM batch WHERE {filter}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn records_one_row_per_planned_unit() {
        let dir = tempfile::tempdir().unwrap();
        let conn = open_ledger(dir.path()).unwrap();

        record_planned(&conn, &[unit("v1", "0001"), unit("v1", "0002"), unit("v2", "0001")]).unwrap();

        assert_eq!(count(&conn, "1=1"), 3);
        assert_eq!(count(&conn, "submitted = 0 AND planned_at != ''"), 3);
    }

    #[test]
    fn submit_stamps_the_slurm_job_id() {
        let dir = tempfile::tempdir().unwrap();
        let conn = open_ledger(dir.path()).unwrap();

        record_planned(&conn, &[unit("v1", "0001"), unit("v1", "0002")]).unwrap();
        mark_submitted(&conn, "123456").unwrap();

        assert_eq!(count(&conn, "submitted = 1 AND slurm_id = '123456'"), 2);
    }

    #[test]
    fn replanning_upserts_and_resets_the_submitted_flag() {
        let dir = tempfile::tempdir().unwrap();
        let conn = open_ledger(dir.path()).unwrap();

        record_planned(&conn, &[unit("v1", "0001")]).unwrap();
        mark_submitted(&conn, "123456").unwrap();
        record_planned(&conn, &[unit("v1", "0001")]).unwrap();

        // the (version, unit_id) primary key replaces rather than duplicates
        assert_eq!(count(&conn, "1=1"), 1);
        assert_eq!(count(&conn, "submitted = 0"), 1);
    }

    #[test]
    fn same_unit_id_across_versions_keeps_both_rows() {
        let dir = tempfile::tempdir().unwrap();
        let conn = open_ledger(dir.path()).unwrap();

        record_planned(&conn, &[unit("v1", "0001"), unit("v2", "0001")]).unwrap();
        assert_eq!(count(&conn, "unit_id = '0001'"), 2);
    }
}
