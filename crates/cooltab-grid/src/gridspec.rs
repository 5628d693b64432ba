use std::path::Path;
use std::sync::OnceLock;

use cooltab_core::errors::{ErrorInfo, GridError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Name prefix marking a declaration as the shared sampling axis.
pub const SAMPLING_PREFIX: &str = "constant temperature";

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[-+]?\d*\.?\d+(?:[eE][-+]?\d+)?").expect("number pattern compiles")
    })
}

fn grid_range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)grid\s+range\s+from\s+([+-]?\d+(?:\.\d+)?)\s+to\s+([+-]?\d+(?:\.\d+)?)\s+step\s+([+-]?\d+(?:\.\d+)?)",
        )
        .expect("grid range pattern compiles")
    })
}

fn save_patterns() -> &'static [(Regex, &'static str)] {
    static RE: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RE.get_or_init(|| {
        [
            (r#"(?i)save\s+cooling\s+"([^"]+)""#, "_cooling"),
            (r#"(?i)save\s+heating\s+"([^"]+)""#, "_heating"),
            (r#"(?i)save\s+grid\s+"([^"]+)""#, "_grid"),
        ]
        .into_iter()
        .map(|(pattern, suffix)| (Regex::new(pattern).expect("save pattern compiles"), suffix))
        .collect()
    })
}

/// Named parameter axis with its expanded, strictly monotonic values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterAxis {
    /// Parameter name as written before the `vary` keyword.
    pub name: String,
    /// Expanded axis values; the last value equals the declared upper bound.
    pub values: Vec<f64>,
}

impl ParameterAxis {
    /// Number of grid positions along the axis.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when the axis carries no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parsed grid-definition document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GridSpec {
    /// Parameter axes in declaration order.
    pub axes: Vec<ParameterAxis>,
    /// Shared sampling axis declared with a `constant temperature` vary line.
    pub sampling: Option<ParameterAxis>,
}

impl GridSpec {
    /// Sizes of the parameter axes in declaration order.
    pub fn axis_sizes(&self) -> Vec<usize> {
        self.axes.iter().map(ParameterAxis::len).collect()
    }
}

/// `start to stop step` triple from a `grid range from ... to ... step ...` line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridRange {
    /// First value of the range.
    pub start: f64,
    /// Declared upper bound.
    pub stop: f64,
    /// Increment between successive values.
    pub step: f64,
}

impl GridRange {
    /// Number of grid points covered by the range.
    pub fn count(&self) -> Result<usize, GridError> {
        if self.step == 0.0 {
            return Err(GridError::MalformedGridSpec(ErrorInfo::new(
                "grid_step_zero",
                "grid step cannot be zero",
            )));
        }
        let steps = ((self.stop - self.start) / self.step).round_ties_even();
        Ok(steps.abs() as usize + 1)
    }
}

/// Expands `start, stop, step` into the axis values.
///
/// `count = round((stop - start) / step) + 1` with ties rounded to even; the
/// final value is snapped to
/// `stop` so floating drift never leaks into the table.
pub fn expand_range(start: f64, stop: f64, step: f64) -> Result<Vec<f64>, GridError> {
    if step == 0.0 {
        return Err(GridError::MalformedGridSpec(
            ErrorInfo::new("grid_step_zero", "grid step cannot be zero")
                .with_context("start", start.to_string())
                .with_context("stop", stop.to_string()),
        ));
    }
    let steps = ((stop - start) / step).round_ties_even();
    if !steps.is_finite() || steps < 0.0 {
        return Err(GridError::MalformedGridSpec(
            ErrorInfo::new("grid_direction", "grid step does not move from start towards stop")
                .with_context("start", start.to_string())
                .with_context("stop", stop.to_string())
                .with_context("step", step.to_string()),
        ));
    }
    let count = steps as usize + 1;
    let mut values: Vec<f64> = (0..count).map(|i| start + i as f64 * step).collect();
    if let Some(last) = values.last_mut() {
        *last = stop;
    }
    Ok(values)
}

fn is_comment(line: &str) -> bool {
    let stripped = line.trim();
    stripped.is_empty()
        || stripped.starts_with('#')
        || stripped.to_lowercase().starts_with("c ")
}

fn is_number(token: &str) -> bool {
    number_re()
        .find(token)
        .map(|m| m.start() == 0 && m.end() == token.len())
        .unwrap_or(false)
}

/// Joins the tokens preceding the first `=`, `,` or numeric token.
pub fn extract_parameter_name(tokens: &[&str]) -> String {
    let name: Vec<&str> = tokens
        .iter()
        .copied()
        .take_while(|token| *token != "=" && *token != "," && !is_number(token))
        .collect();
    if name.is_empty() {
        tokens.join(" ").trim().to_string()
    } else {
        name.join(" ").trim().to_string()
    }
}

/// Parses the first three numbers of a `grid` line as `start, stop, step`.
pub fn parse_grid_values(line: &str) -> Result<Vec<f64>, GridError> {
    let numbers: Vec<&str> = number_re().find_iter(line).map(|m| m.as_str()).collect();
    if numbers.len() < 3 {
        return Err(GridError::MalformedGridSpec(
            ErrorInfo::new("grid_values", "grid declaration needs start, stop and step")
                .with_context("line", line),
        ));
    }
    let mut parsed = [0.0f64; 3];
    for (slot, raw) in parsed.iter_mut().zip(numbers.iter()) {
        *slot = raw.parse::<f64>().map_err(|err| {
            GridError::MalformedGridSpec(
                ErrorInfo::new("grid_number", err.to_string()).with_context("line", line),
            )
        })?;
    }
    expand_range(parsed[0], parsed[1], parsed[2]).map_err(|err| match err {
        GridError::MalformedGridSpec(info) => {
            GridError::MalformedGridSpec(info.with_context("line", line))
        }
        other => other,
    })
}

/// Parses a grid-definition document into parameter axes and the optional sampling axis.
pub fn parse_grid_spec(text: &str) -> Result<GridSpec, GridError> {
    let lines: Vec<&str> = text.lines().collect();
    let mut spec = GridSpec::default();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        if is_comment(line) || !line.to_lowercase().contains(" vary") {
            i += 1;
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(vary_at) = tokens.iter().position(|t| t.eq_ignore_ascii_case("vary")) else {
            i += 1;
            continue;
        };
        let name = extract_parameter_name(&tokens[..vary_at]);

        let mut j = i + 1;
        let mut grid_line = None;
        while j < lines.len() {
            let candidate = lines[j].trim();
            if is_comment(candidate) {
                j += 1;
                continue;
            }
            let lower = candidate.to_lowercase();
            if lower.starts_with("grid") {
                grid_line = Some(candidate);
                break;
            }
            if lower.contains(" vary") {
                break;
            }
            j += 1;
        }
        let Some(grid_line) = grid_line else {
            return Err(GridError::MalformedGridSpec(
                ErrorInfo::new("grid_missing", "no grid declaration follows the vary line")
                    .with_context("line", line)
                    .with_context("line_number", (i + 1).to_string()),
            ));
        };

        let values = parse_grid_values(grid_line)?;
        debug!(parameter = %name, points = values.len(), "parsed grid axis");
        let axis = ParameterAxis { name, values };
        if axis.name.to_lowercase().starts_with(SAMPLING_PREFIX) {
            spec.sampling = Some(axis);
        } else {
            spec.axes.push(axis);
        }
        i = j + 1;
    }
    Ok(spec)
}

/// Collects every `grid range from X to Y step Z` declaration in document order.
pub fn parse_grid_ranges(text: &str) -> Result<Vec<GridRange>, GridError> {
    grid_range_re()
        .captures_iter(text)
        .map(|caps| {
            let parse = |idx: usize| -> Result<f64, GridError> {
                caps[idx].parse::<f64>().map_err(|err| {
                    GridError::MalformedGridSpec(
                        ErrorInfo::new("grid_number", err.to_string())
                            .with_context("line", &caps[0]),
                    )
                })
            };
            let range = GridRange {
                start: parse(1)?,
                stop: parse(2)?,
                step: parse(3)?,
            };
            range.count()?;
            Ok(range)
        })
        .collect()
}

/// Infers the save-file prefix from `save cooling|heating|grid "<file>"` commands.
pub fn infer_prefix(text: &str, fallback: &str) -> String {
    for (pattern, suffix) in save_patterns() {
        let Some(caps) = text.lines().find_map(|line| pattern.captures(line)) else {
            continue;
        };
        let file = Path::new(&caps[1]);
        let stem = file
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default();
        let stem = stem.strip_suffix(suffix).unwrap_or(stem);
        return stem.to_string();
    }
    fallback.to_string()
}
