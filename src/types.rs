use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::bracket::{RoundRecord, Section, Stage};
use crate::competitor::CompetitorId;
use crate::ledger::MatchRecord;
use crate::pairing::Pairing;
use crate::progression::TransitionOutcome;
use crate::session::TournamentSession;

// ── Constants ──────────────────────────────────────────────────────────

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:17890";
pub const DEFAULT_ROSTER_PATH: &str = "data/roster.csv";
pub const DEFAULT_SNAPSHOT_PATH: &str = "data/tournament.json";
pub const DEFAULT_LOGS_DIR: &str = "logs";

// ── Shared state type aliases ──────────────────────────────────────────

/// One lock guards the roster, both ledgers and the stage.
pub type SharedSession = Arc<Mutex<TournamentSession>>;

#[derive(Clone)]
pub struct ServerState {
    pub session: SharedSession,
    pub config: Arc<AppConfig>,
}

// ── Config types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub bind_addr: String,
    pub roster_path: String,
    pub snapshot_path: String,
    pub logs_dir: String,
    pub autosave: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: String::new(),
            roster_path: String::new(),
            snapshot_path: String::new(),
            logs_dir: String::new(),
            autosave: true,
        }
    }
}

// ── Request payloads ───────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResultRequest {
    pub section: Section,
    pub match_index: usize,
    pub winner_id: CompetitorId,
    pub loser_id: CompetitorId,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RosterImportRequest {
    /// Inline file contents; when absent the configured roster file is read.
    pub csv: Option<String>,
    pub replace: bool,
}

// ── Bracket views ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorView {
    pub id: CompetitorId,
    pub display_name: String,
    pub wins: u32,
    pub losses: u32,
    pub eliminated: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionView {
    pub competitors: Vec<CompetitorView>,
    pub pairings: Vec<Pairing>,
    pub winners: Vec<MatchWinnerView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchWinnerView {
    pub match_index: usize,
    pub winner_id: CompetitorId,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingMatchView {
    pub section: Section,
    pub match_index: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketView {
    pub round: u32,
    pub round_label: String,
    pub stage: Stage,
    pub champion: Option<CompetitorView>,
    pub active_count: usize,
    pub top: SectionView,
    pub bottom: SectionView,
    pub pending: Vec<PendingMatchView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponse {
    pub record: MatchRecord,
    pub state: BracketView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceResponse {
    pub outcome: TransitionOutcome,
    pub state: BracketView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterImportResult {
    pub imported: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryView {
    pub rounds: Vec<RoundRecord>,
}
