use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};

use crate::competitor::{Competitor, CompetitorId};
use crate::error::BracketError;
use crate::ledger::{MatchLedger, MatchRecord};
use crate::pairing::{pair_section, Pairing};
use crate::ranking::{self, RankingRow};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
  Top,
  Bottom,
}

impl fmt::Display for Section {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Section::Top => f.write_str("top"),
      Section::Bottom => f.write_str("bottom"),
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
  Normal,
  Semifinal,
  Final,
  SuperFinal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedMatch {
  pub section: Section,
  pub index: usize,
  pub winner: CompetitorId,
}

/// A closed round, kept so earlier rounds can still be shown after the
/// bracket has moved on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
  pub round: u32,
  pub label: String,
  pub stage: Stage,
  pub top: Vec<CompetitorId>,
  pub bottom: Vec<CompetitorId>,
  pub results: Vec<RecordedMatch>,
  pub closed_at: DateTime<Local>,
}

/// The whole mutable state of one tournament. Sections hold ids into
/// `participants`, which owns every competitor record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketState {
  pub(crate) participants: Vec<Competitor>,
  pub(crate) top: Vec<CompetitorId>,
  pub(crate) bottom: Vec<CompetitorId>,
  pub(crate) top_ledger: MatchLedger,
  pub(crate) bottom_ledger: MatchLedger,
  pub(crate) current_round: u32,
  pub(crate) stage: Stage,
  #[serde(default)]
  pub(crate) champion: Option<CompetitorId>,
  #[serde(default)]
  pub(crate) history: Vec<RoundRecord>,
}

impl BracketState {
  /// Seed a tournament: everyone starts in the top section in roster order.
  pub fn initialize(competitors: Vec<Competitor>) -> Result<Self, BracketError> {
    if competitors.len() < 2 {
      return Err(BracketError::InvalidReference(
        "a tournament needs at least two competitors".to_string(),
      ));
    }
    let mut seen = HashSet::new();
    for competitor in &competitors {
      if !seen.insert(competitor.id) {
        return Err(BracketError::InvalidReference(format!(
          "competitor id {} appears more than once",
          competitor.id
        )));
      }
    }

    let top = competitors.iter().map(|c| c.id).collect();
    let mut state = BracketState {
      participants: competitors,
      top,
      bottom: Vec::new(),
      top_ledger: MatchLedger::new(),
      bottom_ledger: MatchLedger::new(),
      current_round: 1,
      stage: Stage::Normal,
      champion: None,
      history: Vec::new(),
    };
    state.open_round();
    info!(
      competitors = state.participants.len(),
      "tournament initialized"
    );
    Ok(state)
  }

  pub fn participants(&self) -> &[Competitor] {
    &self.participants
  }

  pub fn stage(&self) -> Stage {
    self.stage
  }

  pub fn current_round(&self) -> u32 {
    self.current_round
  }

  pub fn champion(&self) -> Option<CompetitorId> {
    self.champion
  }

  pub fn is_over(&self) -> bool {
    self.champion.is_some()
  }

  pub fn history(&self) -> &[RoundRecord] {
    &self.history
  }

  pub fn section(&self, section: Section) -> &[CompetitorId] {
    match section {
      Section::Top => &self.top,
      Section::Bottom => &self.bottom,
    }
  }

  pub fn section_competitors(&self, section: Section) -> Vec<&Competitor> {
    self
      .section(section)
      .iter()
      .filter_map(|id| self.competitor(*id))
      .collect()
  }

  pub fn ledger(&self, section: Section) -> &MatchLedger {
    match section {
      Section::Top => &self.top_ledger,
      Section::Bottom => &self.bottom_ledger,
    }
  }

  pub fn competitor(&self, id: CompetitorId) -> Option<&Competitor> {
    self.participants.iter().find(|c| c.id == id)
  }

  pub fn active_count(&self) -> usize {
    ranking::active_count(&self.participants)
  }

  pub fn ranking(&self) -> Vec<RankingRow> {
    ranking::ranking(&self.participants)
  }

  pub fn round_label(&self) -> String {
    match self.stage {
      Stage::SuperFinal => "SUPER-FINAL".to_string(),
      Stage::Final => "FINAL".to_string(),
      Stage::Semifinal => "SEMIFINAL".to_string(),
      Stage::Normal => format!("Round {}", self.current_round),
    }
  }

  /// Sections that have matches to play this round. In the final stages the
  /// single match is filed under the top section.
  pub fn played_sections(&self) -> Vec<Section> {
    match self.stage {
      Stage::Normal => {
        let mut sections = Vec::new();
        if !self.top.is_empty() {
          sections.push(Section::Top);
        }
        if !self.bottom.is_empty() {
          sections.push(Section::Bottom);
        }
        sections
      }
      Stage::Semifinal => vec![Section::Bottom],
      Stage::Final | Stage::SuperFinal => vec![Section::Top],
    }
  }

  /// Match slots of `section` for the current round.
  pub fn pairings(&self, section: Section) -> Vec<Pairing> {
    match (self.stage, section) {
      (Stage::Final | Stage::SuperFinal, Section::Top) => match (self.top.first(), self.bottom.first()) {
        (Some(&first), Some(&second)) => vec![Pairing::Match { index: 0, first, second }],
        _ => Vec::new(),
      },
      (Stage::Final | Stage::SuperFinal, Section::Bottom) => Vec::new(),
      (Stage::Semifinal, Section::Top) => Vec::new(),
      (_, section) => pair_section(self.section(section)),
    }
  }

  /// Matches of the current round that still need a winner.
  pub fn pending_matches(&self) -> Vec<(Section, usize)> {
    let mut pending = Vec::new();
    for section in self.played_sections() {
      let ledger = self.ledger(section);
      for pairing in self.pairings(section) {
        if !ledger.contains(pairing.index()) {
          pending.push((section, pairing.index()));
        }
      }
    }
    pending
  }

  /// A ledger only ever holds winners of this round's slots, so a full count
  /// means every slot is decided.
  pub fn is_round_complete(&self) -> bool {
    self
      .played_sections()
      .into_iter()
      .all(|section| self.ledger(section).is_complete(self.pairings(section).len()))
  }

  /// Credit the byes of the current round. Safe to call repeatedly: a bye that
  /// is already in the ledger is not credited again.
  pub fn resolve_byes(&mut self) {
    for section in self.played_sections() {
      for pairing in self.pairings(section) {
        let Pairing::Bye { index, competitor } = pairing else {
          continue;
        };
        let ledger = match section {
          Section::Top => &mut self.top_ledger,
          Section::Bottom => &mut self.bottom_ledger,
        };
        let Some(entry) = self.participants.iter_mut().find(|c| c.id == competitor) else {
          continue;
        };
        if ledger.resolve_bye(index, entry) {
          debug!(%section, index, competitor, "bye credited");
        }
      }
    }
  }

  /// Record (or correct) the winner of one match of the current round.
  pub fn record_match_result(
    &mut self,
    section: Section,
    index: usize,
    winner_id: CompetitorId,
    loser_id: CompetitorId,
  ) -> Result<MatchRecord, BracketError> {
    if self.champion.is_some() {
      return Err(BracketError::InvalidReference(
        "the tournament has already been decided".to_string(),
      ));
    }
    if winner_id == loser_id {
      return Err(BracketError::InvalidReference(format!(
        "competitor {winner_id} cannot play against themselves"
      )));
    }
    let pairing = self
      .pairings(section)
      .into_iter()
      .find(|p| p.index() == index)
      .ok_or_else(|| {
        BracketError::InvalidReference(format!(
          "no match {index} in the {section} section for {}",
          self.round_label()
        ))
      })?;
    match pairing {
      Pairing::Bye { .. } => {
        return Err(BracketError::InvalidReference(format!(
          "match {index} in the {section} section is a bye"
        )));
      }
      Pairing::Match { .. } => {
        if !pairing.involves(winner_id) || !pairing.involves(loser_id) {
          return Err(BracketError::InvalidReference(format!(
            "competitors {winner_id} and {loser_id} are not paired in {section} match {index}"
          )));
        }
      }
    }

    let ledger = match section {
      Section::Top => &mut self.top_ledger,
      Section::Bottom => &mut self.bottom_ledger,
    };
    let (winner, loser) = pair_mut(&mut self.participants, winner_id, loser_id)?;
    let record = ledger.set_winner(index, winner, loser);
    match record {
      MatchRecord::Corrected { previous } => {
        info!(%section, index, winner = winner_id, previous, "match result corrected")
      }
      MatchRecord::Recorded => debug!(%section, index, winner = winner_id, "match result recorded"),
      MatchRecord::Unchanged => {}
    }
    Ok(record)
  }

  /// Clear both ledgers and credit the new round's byes.
  pub(crate) fn open_round(&mut self) {
    self.top_ledger.clear();
    self.bottom_ledger.clear();
    self.resolve_byes();
  }

  pub(crate) fn archive_round(&mut self) {
    let results = self
      .top_ledger
      .iter()
      .map(|(index, winner)| RecordedMatch { section: Section::Top, index, winner })
      .chain(
        self
          .bottom_ledger
          .iter()
          .map(|(index, winner)| RecordedMatch { section: Section::Bottom, index, winner }),
      )
      .collect();
    self.history.push(RoundRecord {
      round: self.current_round,
      label: self.round_label(),
      stage: self.stage,
      top: self.top.clone(),
      bottom: self.bottom.clone(),
      results,
      closed_at: Local::now(),
    });
  }
}

fn pair_mut(
  participants: &mut [Competitor],
  a: CompetitorId,
  b: CompetitorId,
) -> Result<(&mut Competitor, &mut Competitor), BracketError> {
  let ia = participants
    .iter()
    .position(|c| c.id == a)
    .ok_or_else(|| BracketError::unknown_competitor(a))?;
  let ib = participants
    .iter()
    .position(|c| c.id == b)
    .ok_or_else(|| BracketError::unknown_competitor(b))?;
  if ia < ib {
    let (left, right) = participants.split_at_mut(ib);
    Ok((&mut left[ia], &mut right[0]))
  } else {
    let (left, right) = participants.split_at_mut(ia);
    Ok((&mut right[0], &mut left[ib]))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::competitor::Hand;

  fn roster(n: u32) -> Vec<Competitor> {
    (1..=n)
      .map(|id| Competitor::new(id, format!("Name{id}"), format!("Surname{id}"), 25, Hand::Right))
      .collect()
  }

  #[test]
  fn test_initialize_seeds_top_in_order() {
    let state = BracketState::initialize(roster(4)).unwrap();
    assert_eq!(state.section(Section::Top), &[1, 2, 3, 4]);
    assert!(state.section(Section::Bottom).is_empty());
    assert_eq!(state.current_round(), 1);
    assert_eq!(state.stage(), Stage::Normal);
    assert_eq!(state.round_label(), "Round 1");
  }

  #[test]
  fn test_initialize_rejects_small_or_duplicate_roster() {
    assert!(BracketState::initialize(roster(1)).is_err());
    let mut dup = roster(3);
    dup[2].id = 1;
    assert!(matches!(
      BracketState::initialize(dup),
      Err(BracketError::InvalidReference(_))
    ));
  }

  #[test]
  fn test_odd_roster_credits_bye_on_open() {
    let mut state = BracketState::initialize(roster(5)).unwrap();
    assert_eq!(state.competitor(5).unwrap().wins(), 1);
    assert_eq!(state.ledger(Section::Top).get(2), Some(5));

    state.resolve_byes();
    state.resolve_byes();
    assert_eq!(state.competitor(5).unwrap().wins(), 1);
    assert_eq!(state.ledger(Section::Top).len(), 1);
  }

  #[test]
  fn test_record_rejects_foreign_ids_and_byes() {
    let mut state = BracketState::initialize(roster(5)).unwrap();

    let err = state.record_match_result(Section::Top, 0, 1, 3).unwrap_err();
    assert!(matches!(err, BracketError::InvalidReference(_)));

    let err = state.record_match_result(Section::Top, 2, 5, 1).unwrap_err();
    assert!(matches!(err, BracketError::InvalidReference(_)));

    let err = state.record_match_result(Section::Bottom, 0, 1, 2).unwrap_err();
    assert!(matches!(err, BracketError::InvalidReference(_)));

    assert!(state.participants().iter().all(|c| c.losses() == 0));
  }

  #[test]
  fn test_toggle_twice_restores_counters() {
    let mut state = BracketState::initialize(roster(2)).unwrap();

    state.record_match_result(Section::Top, 0, 1, 2).unwrap();
    let record = state.record_match_result(Section::Top, 0, 2, 1).unwrap();
    assert_eq!(record, MatchRecord::Corrected { previous: 1 });
    assert_eq!(state.ledger(Section::Top).get(0), Some(2));

    state.record_match_result(Section::Top, 0, 1, 2).unwrap();
    assert_eq!(state.ledger(Section::Top).get(0), Some(1));
    let a = state.competitor(1).unwrap();
    let b = state.competitor(2).unwrap();
    assert_eq!((a.wins(), a.losses(), b.wins(), b.losses()), (1, 0, 0, 1));
  }

  #[test]
  fn test_pending_matches_lists_undecided_slots() {
    let mut state = BracketState::initialize(roster(5)).unwrap();
    assert_eq!(state.pending_matches(), vec![(Section::Top, 0), (Section::Top, 1)]);

    state.record_match_result(Section::Top, 1, 4, 3).unwrap();
    assert_eq!(state.pending_matches(), vec![(Section::Top, 0)]);
    assert!(!state.is_round_complete());
  }

  #[test]
  fn test_round_complete_once_every_slot_has_a_winner() {
    let mut state = BracketState::initialize(roster(5)).unwrap();
    // bye already fills one of three slots
    assert!(!state.is_round_complete());
    state.record_match_result(Section::Top, 0, 1, 2).unwrap();
    state.record_match_result(Section::Top, 0, 2, 1).unwrap();
    assert!(!state.is_round_complete());
    state.record_match_result(Section::Top, 1, 3, 4).unwrap();
    assert!(state.is_round_complete());
    assert!(state.ledger(Section::Top).is_complete(3));
    assert!(state.pending_matches().is_empty());
  }
}
