use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bracket::{BracketState, Section};
use crate::competitor::{Competitor, CompetitorId};
use crate::error::{CommandError, RosterError};
use crate::roster::{NewCompetitor, Roster};
use crate::types::{BracketView, CompetitorView, MatchWinnerView, PendingMatchView, SectionView};

/// Roster plus the running bracket, if any. The roster is frozen while a
/// bracket exists; the bracket works on its own copies of the competitors.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentSession {
    pub roster: Roster,
    #[serde(default)]
    pub bracket: Option<BracketState>,
}

impl TournamentSession {
    pub fn new(roster: Roster) -> Self {
        TournamentSession { roster, bracket: None }
    }

    pub fn bracket(&self) -> Result<&BracketState, CommandError> {
        self.bracket.as_ref().ok_or(CommandError::NoTournament)
    }

    pub fn bracket_mut(&mut self) -> Result<&mut BracketState, CommandError> {
        self.bracket.as_mut().ok_or(CommandError::NoTournament)
    }

    pub fn roster_mut(&mut self) -> Result<&mut Roster, CommandError> {
        if self.bracket.is_some() {
            return Err(CommandError::RosterLocked);
        }
        Ok(&mut self.roster)
    }

    pub fn add_competitor(&mut self, entry: NewCompetitor) -> Result<Competitor, CommandError> {
        let roster = self.roster_mut()?;
        let id = roster.add(entry)?;
        competitor_by_id(roster, id)
    }

    pub fn update_competitor(&mut self, id: CompetitorId, entry: NewCompetitor) -> Result<Competitor, CommandError> {
        let roster = self.roster_mut()?;
        roster.update(id, entry)?;
        competitor_by_id(roster, id)
    }

    pub fn remove_competitor(&mut self, id: CompetitorId) -> Result<Competitor, CommandError> {
        Ok(self.roster_mut()?.remove(id)?)
    }

    /// Seed a fresh bracket from the current roster. Starting twice is refused
    /// so a running tournament is never silently discarded.
    pub fn start(&mut self) -> Result<&BracketState, CommandError> {
        if self.bracket.is_some() {
            return Err(CommandError::RosterLocked);
        }
        let bracket = BracketState::initialize(self.roster.competitors().to_vec())?;
        info!(competitors = self.roster.len(), "tournament started");
        let bracket = self.bracket.insert(bracket);
        Ok(&*bracket)
    }

    /// Drop the bracket and unlock the roster.
    pub fn reset(&mut self) -> bool {
        let had_bracket = self.bracket.take().is_some();
        if had_bracket {
            info!("tournament reset");
        }
        had_bracket
    }
}

fn competitor_by_id(roster: &Roster, id: CompetitorId) -> Result<Competitor, CommandError> {
    roster
        .get(id)
        .cloned()
        .ok_or(CommandError::Roster(RosterError::UnknownCompetitor(id)))
}

fn competitor_view(competitor: &Competitor) -> CompetitorView {
    CompetitorView {
        id: competitor.id,
        display_name: competitor.display_name(),
        wins: competitor.wins(),
        losses: competitor.losses(),
        eliminated: competitor.eliminated(),
    }
}

fn section_view(state: &BracketState, section: Section) -> SectionView {
    SectionView {
        competitors: state
            .section_competitors(section)
            .into_iter()
            .map(competitor_view)
            .collect(),
        pairings: state.pairings(section),
        winners: state
            .ledger(section)
            .iter()
            .map(|(match_index, winner_id)| MatchWinnerView { match_index, winner_id })
            .collect(),
    }
}

pub fn build_bracket_view(state: &BracketState) -> BracketView {
    BracketView {
        round: state.current_round(),
        round_label: state.round_label(),
        stage: state.stage(),
        champion: state
            .champion()
            .and_then(|id| state.competitor(id))
            .map(competitor_view),
        active_count: state.active_count(),
        top: section_view(state, Section::Top),
        bottom: section_view(state, Section::Bottom),
        pending: state
            .pending_matches()
            .into_iter()
            .map(|(section, match_index)| PendingMatchView { section, match_index })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::Stage;
    use crate::pairing::Pairing;

    fn entry(name: &str) -> NewCompetitor {
        NewCompetitor {
            name: name.to_string(),
            surname: "Tester".to_string(),
            age: 30,
            hand: "right".to_string(),
        }
    }

    fn session_with(n: usize) -> TournamentSession {
        let mut session = TournamentSession::default();
        for i in 0..n {
            session.add_competitor(entry(&format!("P{i}"))).unwrap();
        }
        session
    }

    #[test]
    fn test_roster_locked_while_running() {
        let mut session = session_with(3);
        session.start().unwrap();
        assert!(matches!(session.add_competitor(entry("Late")), Err(CommandError::RosterLocked)));
        assert!(matches!(session.remove_competitor(1), Err(CommandError::RosterLocked)));
        assert!(matches!(session.start(), Err(CommandError::RosterLocked)));

        assert!(session.reset());
        assert!(!session.reset());
        session.add_competitor(entry("Late")).unwrap();
        assert_eq!(session.roster.len(), 4);
    }

    #[test]
    fn test_start_needs_two_competitors() {
        let mut session = session_with(1);
        assert!(matches!(session.start(), Err(CommandError::Bracket(_))));
        assert!(session.bracket.is_none());
        assert!(matches!(session.bracket(), Err(CommandError::NoTournament)));
    }

    #[test]
    fn test_bracket_view_lists_pairings_and_pending() {
        let mut session = session_with(5);
        let view = build_bracket_view(session.start().unwrap());
        assert_eq!(view.stage, Stage::Normal);
        assert_eq!(view.round_label, "Round 1");
        assert_eq!(view.top.competitors.len(), 5);
        assert_eq!(view.top.pairings.len(), 3);
        assert!(matches!(view.top.pairings[2], Pairing::Bye { competitor: 5, .. }));
        // the bye is credited on open, so only the two real matches wait
        assert_eq!(view.top.winners.len(), 1);
        assert_eq!(view.pending.len(), 2);
        assert!(view.bottom.pairings.is_empty());
        assert!(view.champion.is_none());
    }
}
