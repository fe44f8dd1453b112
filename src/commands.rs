use crate::bracket::RoundRecord;
use crate::competitor::{Competitor, CompetitorId};
use crate::config::*;
use crate::error::CommandError;
use crate::ranking::RankingRow;
use crate::roster::{NewCompetitor, Roster};
use crate::session::{build_bracket_view, TournamentSession};
use crate::snapshot::save_snapshot;
use crate::types::*;
use tracing::{info, warn};

// ── Helpers ─────────────────────────────────────────────────────────────

/// Lock the session and call `f`. A poisoned lock is recovered.
fn with_session<F, R>(state: &ServerState, f: F) -> Result<R, CommandError>
where
    F: FnOnce(&mut TournamentSession) -> Result<R, CommandError>,
{
    let mut guard = state.session.lock().unwrap_or_else(|e| e.into_inner());
    f(&mut guard)
}

/// Like `with_session`, but writes a snapshot afterwards when autosave is on
/// and `f` succeeded. A failed autosave is logged, not returned.
fn with_session_mut<F, R>(state: &ServerState, f: F) -> Result<R, CommandError>
where
    F: FnOnce(&mut TournamentSession) -> Result<R, CommandError>,
{
    let mut guard = state.session.lock().unwrap_or_else(|e| e.into_inner());
    let result = f(&mut guard)?;
    if state.config.autosave {
        if let Err(e) = save_snapshot(&snapshot_path(&state.config), &guard) {
            warn!("autosave failed: {e}");
        }
    }
    Ok(result)
}

// ── Queries ─────────────────────────────────────────────────────────────

pub fn bracket_state(state: &ServerState) -> Result<BracketView, CommandError> {
    with_session(state, |session| Ok(build_bracket_view(session.bracket()?)))
}

pub fn ranking(state: &ServerState) -> Result<Vec<RankingRow>, CommandError> {
    with_session(state, |session| Ok(session.bracket()?.ranking()))
}

pub fn history(state: &ServerState) -> Result<HistoryView, CommandError> {
    with_session(state, |session| {
        let rounds: Vec<RoundRecord> = session.bracket()?.history().to_vec();
        Ok(HistoryView { rounds })
    })
}

pub fn list_roster(state: &ServerState) -> Result<Vec<Competitor>, CommandError> {
    with_session(state, |session| Ok(session.roster.competitors().to_vec()))
}

// ── Roster edits ────────────────────────────────────────────────────────

pub fn add_competitor(state: &ServerState, entry: NewCompetitor) -> Result<Competitor, CommandError> {
    with_session_mut(state, |session| session.add_competitor(entry))
}

pub fn update_competitor(
    state: &ServerState,
    id: CompetitorId,
    entry: NewCompetitor,
) -> Result<Competitor, CommandError> {
    with_session_mut(state, |session| session.update_competitor(id, entry))
}

pub fn remove_competitor(state: &ServerState, id: CompetitorId) -> Result<Competitor, CommandError> {
    with_session_mut(state, |session| session.remove_competitor(id))
}

/// Import a roster file, inline or from the configured path. The import is
/// parsed into a scratch roster first so a bad line leaves the session alone.
pub fn import_roster(state: &ServerState, request: RosterImportRequest) -> Result<RosterImportResult, CommandError> {
    with_session_mut(state, |session| {
        let roster = session.roster_mut()?;
        let mut scratch = if request.replace { Roster::new() } else { roster.clone() };
        let imported = match request.csv.as_deref() {
            Some(text) => scratch.import_csv(text.as_bytes())?,
            None => scratch.load_csv(&roster_path(&state.config))?,
        };
        *roster = scratch;
        info!(imported, total = roster.len(), replace = request.replace, "roster import finished");
        Ok(RosterImportResult {
            imported,
            total: roster.len(),
        })
    })
}

pub fn export_roster(state: &ServerState) -> Result<String, CommandError> {
    with_session(state, |session| {
        let path = roster_path(&state.config);
        session.roster.save_csv(&path)?;
        Ok(path.display().to_string())
    })
}

// ── Tournament flow ─────────────────────────────────────────────────────

pub fn start_tournament(state: &ServerState) -> Result<BracketView, CommandError> {
    with_session_mut(state, |session| Ok(build_bracket_view(session.start()?)))
}

pub fn reset_tournament(state: &ServerState) -> Result<bool, CommandError> {
    with_session_mut(state, |session| Ok(session.reset()))
}

pub fn record_result(state: &ServerState, request: MatchResultRequest) -> Result<RecordResponse, CommandError> {
    with_session_mut(state, |session| {
        let bracket = session.bracket_mut()?;
        let record = bracket.record_match_result(
            request.section,
            request.match_index,
            request.winner_id,
            request.loser_id,
        )?;
        Ok(RecordResponse {
            record,
            state: build_bracket_view(bracket),
        })
    })
}

pub fn advance_round(state: &ServerState) -> Result<AdvanceResponse, CommandError> {
    with_session_mut(state, |session| {
        let bracket = session.bracket_mut()?;
        let outcome = bracket.advance_round()?;
        Ok(AdvanceResponse {
            outcome,
            state: build_bracket_view(bracket),
        })
    })
}

pub fn write_snapshot(state: &ServerState) -> Result<String, CommandError> {
    with_session(state, |session| {
        let path = snapshot_path(&state.config);
        let saved_at = save_snapshot(&path, session).map_err(CommandError::Storage)?;
        Ok(saved_at.to_rfc3339())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::{Section, Stage};
    use crate::error::BracketError;
    use crate::progression::TransitionOutcome;
    use std::sync::{Arc, Mutex};

    fn server_state(dir: &std::path::Path) -> ServerState {
        let config = AppConfig {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            roster_path: dir.join("roster.csv").display().to_string(),
            snapshot_path: dir.join("tournament.json").display().to_string(),
            logs_dir: dir.join("logs").display().to_string(),
            autosave: true,
        };
        ServerState {
            session: Arc::new(Mutex::new(TournamentSession::default())),
            config: Arc::new(config),
        }
    }

    fn import(state: &ServerState, csv: &str) -> RosterImportResult {
        import_roster(
            state,
            RosterImportRequest {
                csv: Some(csv.to_string()),
                replace: true,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_queries_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let state = server_state(dir.path());
        assert!(matches!(bracket_state(&state), Err(CommandError::NoTournament)));
        assert!(matches!(advance_round(&state), Err(CommandError::NoTournament)));
        assert!(list_roster(&state).unwrap().is_empty());
    }

    #[test]
    fn test_bad_import_leaves_roster_alone() {
        let dir = tempfile::tempdir().unwrap();
        let state = server_state(dir.path());
        assert_eq!(import(&state, "Ann,Lee,20,left\n").total, 1);

        let err = import_roster(
            &state,
            RosterImportRequest {
                csv: Some("Bob,Ray,20,left\nCy,Day,x,left\n".to_string()),
                replace: false,
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert_eq!(list_roster(&state).unwrap().len(), 1);
    }

    #[test]
    fn test_import_from_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let state = server_state(dir.path());
        std::fs::write(dir.path().join("roster.csv"), "Name,Surname,Age,Hand\nAnn,Lee,20,left\n").unwrap();
        let result = import_roster(&state, RosterImportRequest::default()).unwrap();
        assert_eq!((result.imported, result.total), (1, 1));

        import(&state, "Bob,Ray,20,right\nCy,Day,30,left\n");
        let path = export_roster(&state).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.starts_with("Name,Surname,Age,Hand\nBob,Ray,20,right"));
    }

    #[test]
    fn test_two_player_tournament_through_commands() {
        let dir = tempfile::tempdir().unwrap();
        let state = server_state(dir.path());
        import(&state, "Ann,Lee,20,left\nBob,Ray,20,right\n");

        let view = start_tournament(&state).unwrap();
        assert_eq!(view.pending.len(), 1);

        let err = advance_round(&state).unwrap_err();
        assert!(matches!(err, CommandError::Bracket(BracketError::ValidationFailed { pending: 1 })));

        record_result(
            &state,
            MatchResultRequest {
                section: Section::Top,
                match_index: 0,
                winner_id: 1,
                loser_id: 2,
            },
        )
        .unwrap();
        let advanced = advance_round(&state).unwrap();
        assert_eq!(advanced.outcome, TransitionOutcome::FinalEntered);
        assert_eq!(advanced.state.stage, Stage::Final);

        record_result(
            &state,
            MatchResultRequest {
                section: Section::Top,
                match_index: 0,
                winner_id: 1,
                loser_id: 2,
            },
        )
        .unwrap();
        let done = advance_round(&state).unwrap();
        assert_eq!(done.outcome, TransitionOutcome::TournamentComplete { champion: 1 });
        assert_eq!(ranking(&state).unwrap()[0].display_name, "Ann Lee");
        assert_eq!(history(&state).unwrap().rounds.len(), 2);

        // autosave wrote the finished bracket
        assert!(dir.path().join("tournament.json").is_file());
        assert!(matches!(
            add_competitor(
                &state,
                NewCompetitor {
                    name: "Late".to_string(),
                    surname: "Comer".to_string(),
                    age: 20,
                    hand: "left".to_string(),
                }
            ),
            Err(CommandError::RosterLocked)
        ));
        assert!(reset_tournament(&state).unwrap());
    }
}
