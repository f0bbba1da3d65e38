//! Parse formula files (TOML and JSON) and resolve formula paths.

use std::path::{Path, PathBuf};

use crate::types::{Formula, FormulaError};

/// Parse a formula from a TOML string.
pub fn parse_toml(content: &str) -> Result<Formula, FormulaError> {
    toml::from_str(content).map_err(|e| FormulaError::Parse(e.to_string()))
}

/// Parse a formula from a JSON string.
pub fn parse_json(content: &str) -> Result<Formula, FormulaError> {
    serde_json::from_str(content).map_err(|e| FormulaError::Parse(e.to_string()))
}

/// Serialize a formula to TOML.
pub fn to_toml(formula: &Formula) -> Result<String, FormulaError> {
    toml::to_string_pretty(formula).map_err(|e| FormulaError::Parse(e.to_string()))
}

/// Serialize a formula to pretty JSON.
pub fn to_json(formula: &Formula) -> Result<String, FormulaError> {
    serde_json::to_string_pretty(formula).map_err(|e| FormulaError::Parse(e.to_string()))
}

/// Load a formula from a file path (auto-detect TOML vs JSON by extension).
pub fn load_formula(path: &Path) -> Result<Formula, FormulaError> {
    let content = std::fs::read_to_string(path)?;
    let mut formula = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => parse_toml(&content)?,
        Some("json") => parse_json(&content)?,
        _ => {
            // Try JSON first, then TOML
            parse_json(&content).or_else(|_| parse_toml(&content))?
        }
    };
    formula.source = path.display().to_string();
    Ok(formula)
}

/// Search for a formula file by name in standard locations.
///
/// Search order:
/// 1. Exact path (if it exists as-is)
/// 2. Current directory with standard extensions
/// 3. `.beads/formulas/` under cwd
pub fn find_formula(name: &str, cwd: &Path) -> Result<PathBuf, FormulaError> {
    // 1. Exact path
    let exact = Path::new(name);
    if exact.is_absolute() && exact.exists() {
        return Ok(exact.to_path_buf());
    }
    let relative = cwd.join(name);
    if relative.exists() {
        return Ok(relative);
    }

    // Standard suffixes to try
    let suffixes = [".formula.toml", ".formula.json", ".toml", ".json"];

    // 2. Current directory
    for suffix in &suffixes {
        let candidate = cwd.join(format!("{}{}", name, suffix));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    // 3. .beads/formulas/ under cwd
    let beads_formulas = cwd.join(".beads").join("formulas");
    if beads_formulas.is_dir() {
        for suffix in &suffixes {
            let candidate = beads_formulas.join(format!("{}{}", name, suffix));
            if candidate.exists() {
                return Ok(candidate);
            }
        }
    }

    Err(FormulaError::NotFound(name.to_owned()))
}
