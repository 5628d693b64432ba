//! Mean molecular weight extraction from `save special` summaries.

use std::collections::BTreeMap;
use std::fs;
use std::sync::OnceLock;

use cooltab_core::errors::{ErrorInfo, GridError};
use regex::Regex;
use tracing::debug;

use crate::locate::PointFileLocator;

fn mmw_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"MeanMolecularWeight\s+([0-9Ee+\-.]+)").expect("mmw pattern compiles")
    })
}

fn tagged_mmw_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)grid(\d{9})_.*?MeanMolecularWeight\s+([0-9Ee+\-.]+)")
            .expect("tagged mmw pattern compiles")
    })
}

fn parse_weight(raw: &str, source: &str) -> Result<f64, GridError> {
    raw.parse::<f64>().map_err(|err| {
        GridError::MalformedArtifact(
            ErrorInfo::new("mmw_value", err.to_string())
                .with_context("source", source)
                .with_context("token", raw),
        )
    })
}

/// First mean molecular weight in a per-point summary.
pub fn extract_point_weight(text: &str, source: &str) -> Result<Option<f64>, GridError> {
    mmw_re()
        .captures(text)
        .map(|caps| parse_weight(&caps[1], source))
        .transpose()
}

/// Weights from a combined summary.
///
/// Blocks tagged `grid<9 digits>_` are keyed by that index. Untagged matches
/// are numbered from zero, but only when `known` is still empty.
pub fn extract_combined_weights(
    text: &str,
    source: &str,
    known: &mut BTreeMap<usize, f64>,
) -> Result<(), GridError> {
    let mut tagged = false;
    for caps in tagged_mmw_re().captures_iter(text) {
        tagged = true;
        let index = caps[1].parse::<usize>().map_err(|err| {
            GridError::MalformedArtifact(
                ErrorInfo::new("mmw_index", err.to_string()).with_context("source", source),
            )
        })?;
        known.insert(index, parse_weight(&caps[2], source)?);
    }
    if !tagged && known.is_empty() {
        for (index, caps) in mmw_re().captures_iter(text).enumerate() {
            known.insert(index, parse_weight(&caps[1], source)?);
        }
    }
    Ok(())
}

/// Mean molecular weight per grid index gathered from all summary documents.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MolecularWeights {
    by_index: BTreeMap<usize, f64>,
}

impl MolecularWeights {
    /// Weight recorded for `index`; a retained point without one is fatal.
    pub fn require(&self, index: usize) -> Result<f64, GridError> {
        self.by_index.get(&index).copied().ok_or_else(|| {
            GridError::MissingDerivedField(
                ErrorInfo::new("mmw_missing", "mean molecular weight not found for grid index")
                    .with_context("index", index.to_string()),
            )
        })
    }

    /// Number of indices with a weight.
    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    /// Returns true when no weight was found.
    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }
}

/// Loads weights from per-point summaries, then the combined summary.
///
/// Finding no weight at all is [`GridError::MissingDerivedField`].
pub fn load_molecular_weights(locator: &PointFileLocator) -> Result<MolecularWeights, GridError> {
    let mut by_index = BTreeMap::new();
    for (index, path) in locator.summary_files() {
        let text = fs::read_to_string(&path).map_err(|err| GridError::io("summary_read", &path, err))?;
        if let Some(weight) = extract_point_weight(&text, &path.display().to_string())? {
            by_index.insert(index, weight);
        }
    }

    let combined = locator.combined_summary();
    if combined.is_file() {
        let text = fs::read_to_string(&combined)
            .map_err(|err| GridError::io("summary_read", &combined, err))?;
        extract_combined_weights(&text, &combined.display().to_string(), &mut by_index)?;
    }

    if by_index.is_empty() {
        return Err(GridError::MissingDerivedField(
            ErrorInfo::new("mmw_absent", "no mean molecular weight data found")
                .with_context("dir", locator.base_dir().display().to_string())
                .with_hint("enable `save special` output in the grid input"),
        ));
    }
    debug!(points = by_index.len(), "loaded mean molecular weights");
    Ok(MolecularWeights { by_index })
}
