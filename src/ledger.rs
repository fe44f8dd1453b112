use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::competitor::{Competitor, CompetitorId};

/// What a winner selection did to the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum MatchRecord {
  Recorded,
  Unchanged,
  Corrected { previous: CompetitorId },
}

/// Winners of the current round's matches in one section, keyed by match
/// index. A key exists iff that match has been decided this round.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchLedger {
  outcomes: BTreeMap<usize, CompetitorId>,
}

impl MatchLedger {
  pub fn new() -> Self {
    MatchLedger::default()
  }

  /// Record `winner` as the winner of `index`. Re-selecting the same winner is
  /// a no-op; selecting the other competitor reverses the superseded result
  /// before applying the new one, so counters only ever reflect the latest
  /// selection. `winner` and `loser` must be the two sides of the match.
  pub fn set_winner(&mut self, index: usize, winner: &mut Competitor, loser: &mut Competitor) -> MatchRecord {
    let record = match self.outcomes.get(&index).copied() {
      Some(current) if current == winner.id => return MatchRecord::Unchanged,
      Some(previous) => {
        // the previous winner is this call's loser and vice versa
        loser.undo_win();
        winner.undo_loss();
        MatchRecord::Corrected { previous }
      }
      None => MatchRecord::Recorded,
    };
    winner.record_win();
    loser.record_loss();
    self.outcomes.insert(index, winner.id);
    record
  }

  /// Credit a bye. Returns false when this bye was already resolved for the
  /// round.
  pub fn resolve_bye(&mut self, index: usize, competitor: &mut Competitor) -> bool {
    if self.outcomes.get(&index) == Some(&competitor.id) {
      return false;
    }
    competitor.record_win();
    self.outcomes.insert(index, competitor.id);
    true
  }

  pub fn get(&self, index: usize) -> Option<CompetitorId> {
    self.outcomes.get(&index).copied()
  }

  pub fn contains(&self, index: usize) -> bool {
    self.outcomes.contains_key(&index)
  }

  /// Forget every outcome. Counters are left alone: by the time a ledger is
  /// cleared its results have already been harvested.
  pub fn clear(&mut self) {
    self.outcomes.clear();
  }

  pub fn is_complete(&self, pair_count: usize) -> bool {
    self.outcomes.len() >= pair_count
  }

  pub fn len(&self) -> usize {
    self.outcomes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.outcomes.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (usize, CompetitorId)> + '_ {
    self.outcomes.iter().map(|(index, id)| (*index, *id))
  }
}
