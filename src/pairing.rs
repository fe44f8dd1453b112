use serde::Serialize;

use crate::competitor::CompetitorId;

/// One match slot of a section for the current round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Pairing {
  Match {
    index: usize,
    first: CompetitorId,
    second: CompetitorId,
  },
  Bye {
    index: usize,
    competitor: CompetitorId,
  },
}

impl Pairing {
  pub fn index(&self) -> usize {
    match self {
      Pairing::Match { index, .. } | Pairing::Bye { index, .. } => *index,
    }
  }

  pub fn is_bye(&self) -> bool {
    matches!(self, Pairing::Bye { .. })
  }

  pub fn involves(&self, id: CompetitorId) -> bool {
    match *self {
      Pairing::Match { first, second, .. } => first == id || second == id,
      Pairing::Bye { competitor, .. } => competitor == id,
    }
  }
}

/// Number of match slots (byes included) a section of `len` produces.
pub fn pair_count(len: usize) -> usize {
  len.div_ceil(2)
}

/// Pair a section positionally: `(0,1)`, `(2,3)`, ... with the odd one out
/// receiving a bye in the last slot. Order is never re-sorted.
pub fn pair_section(section: &[CompetitorId]) -> Vec<Pairing> {
  section
    .chunks(2)
    .enumerate()
    .map(|(index, chunk)| match *chunk {
      [first, second] => Pairing::Match { index, first, second },
      [competitor] => Pairing::Bye { index, competitor },
      _ => unreachable!("chunks(2) yields one or two items"),
    })
    .collect()
}
