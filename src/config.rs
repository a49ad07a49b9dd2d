//! Grading configuration
//!
//! Loaded once from the environment (after `.env`, see `main`). Missing or
//! unparsable values fall back to defaults with a warning.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

use crate::core::utils::normalize_name;

/// Grading configuration
#[derive(Debug, Clone)]
pub struct GradingConfig {
    /// Lowest reportable grade (default: 0)
    pub grade_min: f32,
    /// Highest reportable grade (default: 10)
    pub grade_max: f32,
    /// Wall-clock budget for the whole run in seconds (default: 20)
    pub max_time: i64,
    /// Active variation, trimmed and lower-cased (default: empty)
    pub variation: String,
    /// Enhanced report style and message rewriting
    pub enhanced: bool,
    /// Submitted file name; only its extension is used
    pub submission_file: String,
    /// Locale such as `en_US.UTF-8`
    pub locale: String,
    /// Case definition file, deleted once parsed
    pub cases_file: PathBuf,
    /// Program run when a case does not override it
    pub program: String,
    /// Root of the message catalogs and enhancement tables
    pub lang_dir: PathBuf,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            grade_min: 0.0,
            grade_max: 10.0,
            max_time: 20,
            variation: String::new(),
            enhanced: false,
            submission_file: String::new(),
            locale: "en_US.UTF-8".to_string(),
            cases_file: PathBuf::from("evaluate.cases"),
            program: "./vpl_test".to_string(),
            lang_dir: PathBuf::from("./lang"),
        }
    }
}

impl GradingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str, default: String| lookup(key).unwrap_or(default);

        Self {
            grade_min: parse_or(&lookup, "VPL_GRADEMIN", defaults.grade_min),
            grade_max: parse_or(&lookup, "VPL_GRADEMAX", defaults.grade_max),
            // Fractional budgets are accepted and truncated to whole seconds.
            max_time: parse_or(&lookup, "VPL_MAXTIME", defaults.max_time as f64).trunc() as i64,
            variation: normalize_name(&text("VPL_VARIATION", defaults.variation)),
            enhanced: lookup("VPL_ENHANCE")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.enhanced),
            submission_file: text("VPL_SUBFILE0", defaults.submission_file),
            locale: text("VPL_LANG", defaults.locale),
            cases_file: lookup("VPL_CASES_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.cases_file),
            program: text("VPL_PROGRAM", defaults.program),
            lang_dir: lookup("VPL_LANG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.lang_dir),
        }
    }

    /// Grading is disabled when the range is empty or inverted.
    pub fn no_grade(&self) -> bool {
        self.grade_min >= self.grade_max
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy + Finite,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) if value.is_finite_value() => value,
            _ => {
                warn!("{} has invalid value {:?}, using default {}", key, raw, default);
                default
            }
        },
        None => {
            warn!("{} not set, using default {}", key, default);
            default
        }
    }
}

/// Rejects `inf` and `NaN`, which parse as floats but are not usable limits.
trait Finite {
    fn is_finite_value(&self) -> bool;
}

impl Finite for f32 {
    fn is_finite_value(&self) -> bool {
        self.is_finite()
    }
}

impl Finite for f64 {
    fn is_finite_value(&self) -> bool {
        self.is_finite()
    }
}
