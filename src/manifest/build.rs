use std::cmp::Ordering;
use std::fs::{self, File};
use std::io::Write;
use std::iter::Peekable;
use std::path::{Path, PathBuf};
use std::str::Chars;

use anyhow::{bail, Context, Result};
use log::info;

use crate::config::load::Config;
use crate::manifest::record::WorkUnit;

/// Scan the per-version URL-list directories and write the batch manifest.
///
/// Versions are processed in configured order; files within a version in
/// natural-sort order of their names, so batch_2.txt precedes batch_10.txt
/// and the unit ids are stable across replans. Any existing manifest is
/// overwritten. Returns the planned units so the caller can record them in
/// the ledger.
pub fn plan(config: &Config) -> Result<Vec<WorkUnit>> {
    let mut units: Vec<WorkUnit> = Vec::new();

    for version in &config.versions {
        let dir = config.version_dir(version);
        info!("Scanning {} for URL lists", dir.display());
        let mut lists = list_files(&dir)?;
        lists.sort_by(|a, b| natural_cmp(&a.0, &b.0));

        let destination = config.destination(version)?;
        let before = units.len();
        for (position, (_, path)) in lists.into_iter().enumerate() {
            let unit = WorkUnit {
                url_list: path,
                version: version.clone(),
                unit_id: format!("{:04}", position + 1),
                destination: destination.clone(),
            };
            reject_embedded_whitespace(&unit)?;
            units.push(unit);
        }
        info!("Planned {} units for version {}", units.len() - before, version);
    }

    if units.is_empty() {
        bail!(
            "no URL lists found under {}, refusing to write an empty manifest",
            config.urls_root.display()
        );
    }

    write_manifest(&config.manifest_path, &units)?;
    info!(
        "Wrote manifest with {} units to {}",
        units.len(),
        config.manifest_path.display()
    );
    Ok(units)
}

fn list_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Can't read URL-list directory {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Can't read entry in {}", dir.display()))?;
        let path = entry.path();
        if path.is_file() {
            let name = entry.file_name().to_string_lossy().into_owned();
            files.push((name, path));
        }
    }
    Ok(files)
}

/// Manifest fields are whitespace delimited with no escaping, so a path or
/// destination containing whitespace would silently shift every field after
/// it. Fail loudly at plan time instead.
fn reject_embedded_whitespace(unit: &WorkUnit) -> Result<()> {
    let line = unit.to_string();
    if line.split_whitespace().count() != 4 {
        bail!("work unit fields may not contain whitespace: {line:?}");
    }
    Ok(())
}

fn write_manifest(path: &Path, units: &[WorkUnit]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Can't create {}", parent.display()))?;
        }
    }
    let mut file = File::create(path)
        .with_context(|| format!("Can't write manifest to {}", path.display()))?;
    for unit in units {
        writeln!(file, "{unit}")?;
    }
    Ok(())
}

/// Compare filenames so embedded numbers order numerically
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                match take_number(&mut left).cmp(&take_number(&mut right)) {
                    Ordering::Equal => {}
                    unequal => return unequal,
                }
            }
            (Some(x), Some(y)) => match x.cmp(&y) {
                Ordering::Equal => {
                    left.next();
                    right.next();
                }
                unequal => return unequal,
            },
        }
    }
}

fn take_number(chars: &mut Peekable<Chars>) -> u64 {
    let mut number: u64 = 0;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        number = number.saturating_mul(10).saturating_add(u64::from(digit));
        chars.next();
    }
    number
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(root: &Path, versions: &[&str]) -> Config {
        serde_json::from_value(serde_json::json!({
            "dataset": "dolma",
            "versions": versions,
            "urls_root": root.join("urls"),
            "manifest_path": root.join("batches.txt"),
            "scratch_root": root.join("scratch"),
            "submit_dir": root.join("submit"),
            "download_workers": 2,
            "destination_template": "nhagar/{dataset}_urls_{version}",
            "processor": ["true"],
            "sbatch": {
                "partition": "small",
                "account": "acct",
                "time": "01:00:00",
                "memory": "8G"
            }
        }))
        .unwrap()
    }

    #[test]
    fn natural_sort_orders_numbers_numerically() {
        let mut names = vec!["batch_10.txt", "batch_2.txt", "batch_1.txt"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["batch_1.txt", "batch_2.txt", "batch_10.txt"]);
    }

    #[test]
    fn plans_versions_in_configured_order_with_per_version_ids() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("urls/v1")).unwrap();
        fs::create_dir_all(root.join("urls/v2")).unwrap();
        fs::write(root.join("urls/v1/batch_2.txt"), "http://a\n").unwrap();
        fs::write(root.join("urls/v1/batch_10.txt"), "http://b\n").unwrap();
        fs::write(root.join("urls/v2/batch_1.txt"), "http://c\n").unwrap();

        let config = test_config(root, &["v1", "v2"]);
        let units = plan(&config).unwrap();

        assert_eq!(units.len(), 3);
        assert_eq!(units[0].unit_id, "0001");
        assert!(units[0].url_list.ends_with("batch_2.txt"));
        assert_eq!(units[1].unit_id, "0002");
        assert!(units[1].url_list.ends_with("batch_10.txt"));
        // unit ids restart per version
        assert_eq!(units[2].version, "v2");
        assert_eq!(units[2].unit_id, "0001");
        assert_eq!(units[2].destination, "nhagar/dolma_urls_v2");

        let manifest = fs::read_to_string(root.join("batches.txt")).unwrap();
        assert_eq!(manifest.lines().count(), 3);
    }

    #[test]
    fn zero_units_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("urls/v1")).unwrap();

        let config = test_config(root, &["v1"]);
        let err = plan(&config).unwrap_err().to_string();
        assert!(err.contains("refusing to write an empty manifest"));
        assert!(!root.join("batches.txt").exists());
    }

    #[test]
    fn replan_overwrites_the_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("urls/v1")).unwrap();
        fs::write(root.join("urls/v1/batch_1.txt"), "http://a\n").unwrap();

        let config = test_config(root, &["v1"]);
        plan(&config).unwrap();
        plan(&config).unwrap();

        let manifest = fs::read_to_string(root.join("batches.txt")).unwrap();
        assert_eq!(manifest.lines().count(), 1);
    }
}
