use serde::Serialize;
use std::cmp::Ordering;

use crate::competitor::Competitor;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompetitorStatus {
  Active,
  Eliminated,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingRow {
  pub rank: usize,
  pub display_name: String,
  pub wins: u32,
  pub losses: u32,
  pub status: CompetitorStatus,
}

fn standing_order(a: &Competitor, b: &Competitor) -> Ordering {
  a.eliminated()
    .cmp(&b.eliminated())
    .then_with(|| b.wins().cmp(&a.wins()))
    .then_with(|| a.losses().cmp(&b.losses()))
    .then_with(|| a.surname.cmp(&b.surname))
}

/// Standings table: active before eliminated, then wins descending, losses
/// ascending, surname ascending. Ties keep roster order.
pub fn ranking(participants: &[Competitor]) -> Vec<RankingRow> {
  let mut sorted: Vec<&Competitor> = participants.iter().collect();
  sorted.sort_by(|a, b| standing_order(a, b));
  sorted
    .into_iter()
    .enumerate()
    .map(|(idx, competitor)| RankingRow {
      rank: idx + 1,
      display_name: competitor.display_name(),
      wins: competitor.wins(),
      losses: competitor.losses(),
      status: if competitor.eliminated() {
        CompetitorStatus::Eliminated
      } else {
        CompetitorStatus::Active
      },
    })
    .collect()
}

pub fn active_count(participants: &[Competitor]) -> usize {
  participants.iter().filter(|c| !c.eliminated()).count()
}
