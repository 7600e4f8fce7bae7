//! Minimal runtime configuration helpers.
//! Defaults expect the datasets in `./data`, next to where the dashboard is started.

use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable dashboard on the terminal.
    #[default]
    Text,
    /// One JSON document per render, for an external chart renderer.
    Json,
}

impl OutputFormat {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the five dataset files.
    pub data_dir: PathBuf,
    /// Initial building (key or display name); first building when unset.
    pub building: Option<String>,
    /// Initial floor (key or display name); first floor of the building when unset.
    pub floor: Option<String>,
    /// Initial space type; `desk` when unset.
    pub space_type: Option<String>,
    pub output: OutputFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let non_empty = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let data_dir = non_empty("STUDY_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());

        let output = match non_empty("STUDY_OUTPUT") {
            Some(s) => OutputFormat::parse(&s).ok_or_else(|| format!("STUDY_OUTPUT must be `text` or `json`, got `{}`", s))?,
            None => OutputFormat::default(),
        };

        Ok(Config {
            data_dir: PathBuf::from(data_dir),
            building: non_empty("STUDY_BUILDING"),
            floor: non_empty("STUDY_FLOOR"),
            space_type: non_empty("STUDY_SPACE_TYPE"),
            output,
        })
    }
}

#[derive(Debug)]
pub struct LoadedEnvFile {
    pub path: PathBuf,
    pub explicit: bool,
}

/// Load `KEY=value` pairs from `explicit`, or from `./.env` when no path is given.
/// Variables already present in the process environment are left alone.
pub fn load_env_file(explicit: Option<&Path>) -> Result<Option<LoadedEnvFile>, String> {
    let (path, explicit) = match explicit {
        Some(p) if p.is_file() => (p.to_path_buf(), true),
        Some(p) => return Err(format!("env file not found: {}", p.display())),
        None => {
            let cwd = std::env::current_dir().map_err(|e| format!("unable to read current directory: {}", e))?;
            let p = cwd.join(".env");
            if !p.is_file() {
                return Ok(None);
            }
            (p, false)
        }
    };

    let contents = fs::read_to_string(&path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    let pairs = parse_env_file(&contents).map_err(|e| format!("{}:{}", path.display(), e))?;
    for (key, value) in pairs {
        if std::env::var_os(&key).is_none() {
            // Updating process-level environment variables is unsafe on some targets.
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }

    Ok(Some(LoadedEnvFile { path, explicit }))
}

fn parse_env_file(contents: &str) -> Result<Vec<(String, String)>, String> {
    contents
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            parse_env_line(line)
                .map_err(|e| format!("{}: {}", idx + 1, e))
                .transpose()
        })
        .collect()
}

fn parse_env_line(line: &str) -> Result<Option<(String, String)>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let line = line.strip_prefix("export ").map(str::trim_start).unwrap_or(line);
    let (key, raw) = line.split_once('=').ok_or("missing '=' in assignment")?;
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return Err(format!("invalid variable name `{}`", key));
    }
    Ok(Some((key.to_string(), unquote(raw.trim())?)))
}

/// Double quotes allow `\n`-style escapes, single quotes are literal, bare
/// values end at the first `#`.
fn unquote(raw: &str) -> Result<String, String> {
    let Some(quote) = raw.chars().next().filter(|c| *c == '"' || *c == '\'') else {
        return Ok(raw.split('#').next().unwrap_or_default().trim_end().to_string());
    };
    let body = &raw[1..];
    let mut value = String::new();
    let mut chars = body.char_indices();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '\\' if quote == '"' => {
                let (_, escaped) = chars.next().ok_or("unterminated escape sequence")?;
                value.push(match escaped {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    other => other,
                });
            }
            c if c == quote => {
                let rest = body[idx + 1..].trim();
                return if rest.is_empty() || rest.starts_with('#') {
                    Ok(value)
                } else {
                    Err(format!("unexpected characters after closing quote: {}", rest))
                };
            }
            c => value.push(c),
        }
    }
    Err("unterminated quoted value".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, String> {
        let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = config_from(&[]).unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
        assert_eq!(cfg.output, OutputFormat::Text);
        assert!(cfg.building.is_none() && cfg.floor.is_none() && cfg.space_type.is_none());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let cfg = config_from(&[("STUDY_DATA_DIR", "  "), ("STUDY_FLOOR", "")]).unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
        assert!(cfg.floor.is_none());
    }

    #[test]
    fn reads_selection_and_output() {
        let cfg = config_from(&[
            ("STUDY_DATA_DIR", "/srv/occupancy"),
            ("STUDY_BUILDING", "Fisher Library"),
            ("STUDY_SPACE_TYPE", "room"),
            ("STUDY_OUTPUT", "JSON"),
        ])
        .unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("/srv/occupancy"));
        assert_eq!(cfg.building.as_deref(), Some("Fisher Library"));
        assert_eq!(cfg.space_type.as_deref(), Some("room"));
        assert_eq!(cfg.output, OutputFormat::Json);
    }

    #[test]
    fn env_lines_parse_like_a_shell() {
        assert_eq!(parse_env_line("  # comment"), Ok(None));
        assert_eq!(
            parse_env_line("export STUDY_DATA_DIR=/srv/data # prod"),
            Ok(Some(("STUDY_DATA_DIR".into(), "/srv/data".into())))
        );
        assert_eq!(
            parse_env_line(r#"STUDY_BUILDING="Fisher \"Main\" Library""#),
            Ok(Some(("STUDY_BUILDING".into(), "Fisher \"Main\" Library".into())))
        );
        assert_eq!(
            parse_env_line(r"RUST_LOG='debug#not-a-comment'"),
            Ok(Some(("RUST_LOG".into(), "debug#not-a-comment".into())))
        );
        assert_eq!(parse_env_line("EMPTY="), Ok(Some(("EMPTY".into(), String::new()))));
    }

    #[test]
    fn env_lines_reject_garbage() {
        assert!(parse_env_line("NO_EQUALS").is_err());
        assert!(parse_env_line("BAD KEY=1").is_err());
        assert!(parse_env_line(r#"OPEN="never closed"#).is_err());
        assert!(parse_env_line(r#"TRAIL="x" y"#).is_err());
    }

    #[test]
    fn env_file_errors_carry_line_numbers() {
        let err = parse_env_file("A=1\n\nB\n").unwrap_err();
        assert!(err.starts_with("3: "));
        assert_eq!(parse_env_file("A=1\n# c\nB='2'\n").unwrap().len(), 2);
    }

    #[test]
    fn rejects_unknown_output() {
        let err = config_from(&[("STUDY_OUTPUT", "html")]).unwrap_err();
        assert!(err.contains("STUDY_OUTPUT"));
    }
}
