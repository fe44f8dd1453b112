use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::info;

use crate::session::TournamentSession;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
  pub saved_at: DateTime<Local>,
  pub session: TournamentSession,
}

pub fn save_snapshot(path: &Path, session: &TournamentSession) -> Result<DateTime<Local>, String> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).map_err(|e| format!("create {}: {e}", parent.display()))?;
  }
  let snapshot = SessionSnapshot {
    saved_at: Local::now(),
    session: session.clone(),
  };
  let payload = serde_json::to_string_pretty(&snapshot).map_err(|e| e.to_string())?;
  // write-then-rename: the old snapshot stays intact until the new one is complete
  let tmp = path.with_extension("json.tmp");
  fs::write(&tmp, payload).map_err(|e| format!("write snapshot {}: {e}", tmp.display()))?;
  fs::rename(&tmp, path).map_err(|e| format!("replace snapshot {}: {e}", path.display()))?;
  info!(path = %path.display(), "snapshot saved");
  Ok(snapshot.saved_at)
}

/// `Ok(None)` when no snapshot has been written yet.
pub fn load_snapshot(path: &Path) -> Result<Option<SessionSnapshot>, String> {
  if !path.is_file() {
    return Ok(None);
  }
  let data = fs::read_to_string(path).map_err(|e| format!("read snapshot {}: {e}", path.display()))?;
  let snapshot =
    serde_json::from_str::<SessionSnapshot>(&data).map_err(|e| format!("parse snapshot {}: {e}", path.display()))?;
  info!(
    path = %path.display(),
    saved_at = %snapshot.saved_at.format("%Y-%m-%d %H:%M:%S"),
    "snapshot loaded"
  );
  Ok(Some(snapshot))
}
