//! Runtime configuration for the `infinitive` binary.
//! Values come from the process environment, optionally seeded from a `.env` file.

use std::fs;
use std::path::Path;

use crate::models::TemperatureUnit;
use crate::transport::DEFAULT_MAX_RETRIES;

/// Port the infinitive daemon listens on by default.
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Unit the caller's setpoints are converted into before sending.
    pub temperature_unit: TemperatureUnit,
    /// Transport-level retries for status reads.
    pub max_retries: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let host = match lookup("INFINITIVE_HOST") {
            Some(v) if !v.trim().is_empty() => v.trim().to_string(),
            _ => return Err("Missing device address: set INFINITIVE_HOST".to_string()),
        };

        let port = match lookup("INFINITIVE_PORT") {
            Some(s) if !s.trim().is_empty() => s
                .trim()
                .parse::<u16>()
                .map_err(|_| format!("INFINITIVE_PORT must be a port number, got {:?}", s))?,
            _ => DEFAULT_PORT,
        };

        let temperature_unit = match lookup("INFINITIVE_TEMP_UNITS") {
            Some(s) if !s.trim().is_empty() => s.trim().parse::<TemperatureUnit>().map_err(|e| e.to_string())?,
            _ => TemperatureUnit::default(),
        };

        let max_retries = lookup("INFINITIVE_MAX_RETRIES")
            .and_then(|s| s.trim().parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_RETRIES);

        Ok(Config {
            host,
            port,
            temperature_unit,
            max_retries,
        })
    }
}

/// Load `KEY=VALUE` lines from `path` into the process environment.
/// Variables already set in the environment are left untouched.
pub fn load_env_file(path: &Path) -> Result<(), String> {
    let contents = fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;

    for (index, line) in contents.lines().enumerate() {
        let Some((key, value)) =
            parse_env_line(line).map_err(|e| format!("{}:{}: {}", path.display(), index + 1, e))?
        else {
            continue;
        };
        if std::env::var_os(&key).is_none() {
            // Updating process-level environment variables is unsafe on some targets.
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }

    Ok(())
}

fn parse_env_line(line: &str) -> Result<Option<(String, String)>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let assignment = trimmed.strip_prefix("export ").map(str::trim_start).unwrap_or(trimmed);

    let (key, raw) = assignment
        .split_once('=')
        .ok_or_else(|| "missing '=' in assignment".to_string())?;
    let key = key.trim();
    if key.is_empty() || key.chars().any(char::is_whitespace) {
        return Err(format!("invalid environment variable name: {:?}", key));
    }

    let raw = raw.trim();
    let value = match raw.chars().next() {
        Some(q @ ('"' | '\'')) => {
            let inner = &raw[1..];
            let end = inner.find(q).ok_or_else(|| format!("unterminated {} quoted value", q))?;
            inner[..end].to_string()
        }
        _ => raw.split('#').next().unwrap_or_default().trim_end().to_string(),
    };

    Ok(Some((key.to_string(), value)))
}
