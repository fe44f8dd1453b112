use crate::types::*;
use std::{
    env,
    fs,
    path::PathBuf,
};

pub fn repo_root() -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn resolve_repo_path(raw: &str) -> PathBuf {
  let path = PathBuf::from(raw);
  if path.is_absolute() {
    path
  } else {
    repo_root().join(path)
  }
}

pub fn config_path() -> PathBuf {
  if let Some(raw) = env_default("BRACKET_CONFIG_PATH") {
    return resolve_repo_path(&raw);
  }
  repo_root().join("config.json")
}

pub fn env_default(key: &str) -> Option<String> {
  env::var(key)
    .ok()
    .map(|value| value.trim().to_string())
    .filter(|value| !value.is_empty())
}

pub fn env_flag_true_default(key: &str, default: bool) -> bool {
  match env::var(key) {
    Ok(value) => {
      let value = value.trim().to_ascii_lowercase();
      matches!(value.as_str(), "1" | "true" | "yes" | "on")
    }
    Err(_) => default,
  }
}

fn fill_from_env(field: &mut String, key: &str, fallback: &str) {
  if field.trim().is_empty() {
    *field = env_default(key).unwrap_or_else(|| fallback.to_string());
  }
}

pub fn apply_env_defaults(mut config: AppConfig) -> AppConfig {
  fill_from_env(&mut config.bind_addr, "BRACKET_BIND_ADDR", DEFAULT_BIND_ADDR);
  fill_from_env(&mut config.roster_path, "BRACKET_ROSTER_PATH", DEFAULT_ROSTER_PATH);
  fill_from_env(&mut config.snapshot_path, "BRACKET_SNAPSHOT_PATH", DEFAULT_SNAPSHOT_PATH);
  fill_from_env(&mut config.logs_dir, "BRACKET_LOGS_DIR", DEFAULT_LOGS_DIR);
  config.autosave = env_flag_true_default("BRACKET_AUTOSAVE", config.autosave);
  config
}

pub fn load_config_inner() -> Result<AppConfig, String> {
  let path = config_path();
  if !path.is_file() {
    return Ok(apply_env_defaults(AppConfig::default()));
  }
  let data = fs::read_to_string(&path).map_err(|e| format!("read config {}: {e}", path.display()))?;
  let config =
    serde_json::from_str::<AppConfig>(&data).map_err(|e| format!("parse config {}: {e}", path.display()))?;
  Ok(apply_env_defaults(config))
}

/// Keys a `.env` file may set: the `BRACKET_*` settings and the log filter.
fn is_app_env_key(key: &str) -> bool {
  key.starts_with("BRACKET_") || key == "RUST_LOG"
}

/// Load `.env` from the repository root. Variables already set in the
/// environment win; unrelated keys are ignored.
pub fn load_env_file() {
  let Ok(contents) = fs::read_to_string(repo_root().join(".env")) else {
    return;
  };
  for (key, value) in contents.lines().filter_map(parse_env_line) {
    if is_app_env_key(&key) && env::var_os(&key).is_none() {
      env::set_var(key, value);
    }
  }
}

/// `KEY=value`, optionally prefixed with `export` and with the value in one
/// pair of matching quotes. Blank lines and `#` comments yield `None`.
pub fn parse_env_line(line: &str) -> Option<(String, String)> {
  let line = line.trim();
  if line.is_empty() || line.starts_with('#') {
    return None;
  }
  let line = line.strip_prefix("export ").unwrap_or(line);
  let (key, value) = line.split_once('=')?;
  let key = key.trim();
  if key.is_empty() {
    return None;
  }
  let value = value.trim();
  let value = ['"', '\'']
    .iter()
    .find_map(|q| value.strip_prefix(*q).and_then(|v| v.strip_suffix(*q)))
    .unwrap_or(value);
  Some((key.to_string(), value.to_string()))
}

pub fn roster_path(config: &AppConfig) -> PathBuf {
  resolve_repo_path(&config.roster_path)
}

pub fn snapshot_path(config: &AppConfig) -> PathBuf {
  resolve_repo_path(&config.snapshot_path)
}

pub fn logs_dir(config: &AppConfig) -> PathBuf {
  resolve_repo_path(&config.logs_dir)
}

pub fn log_env_warnings(config: &AppConfig) {
  let mut warnings = Vec::new();

  if !config_path().is_file() {
    warnings.push("config.json not found, using environment and built-in defaults".to_string());
  }
  if !roster_path(config).is_file() {
    warnings.push(format!(
      "roster file {} does not exist; import will need an inline roster",
      roster_path(config).display()
    ));
  }
  if !config.autosave {
    warnings.push("autosave disabled: tournament state is lost on restart unless saved".to_string());
  }

  for msg in warnings {
    tracing::warn!("{}", msg);
  }
}
