use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type CompetitorId = u32;

/// Losses at which a competitor drops out of the bracket.
pub const ELIMINATION_LOSSES: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hand {
  Left,
  Right,
}

impl Hand {
  pub fn as_str(&self) -> &'static str {
    match self {
      Hand::Left => "left",
      Hand::Right => "right",
    }
  }
}

impl fmt::Display for Hand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Hand {
  type Err = String;

  fn from_str(raw: &str) -> Result<Self, Self::Err> {
    match raw.trim().to_ascii_lowercase().as_str() {
      "left" => Ok(Hand::Left),
      "right" => Ok(Hand::Right),
      other => Err(format!("Hand must be 'left' or 'right', got: {other}")),
    }
  }
}

/// A roster entry. Identity and display data never change once the
/// tournament starts; only the win/loss counters move, and only through the
/// match ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competitor {
  pub id: CompetitorId,
  pub name: String,
  pub surname: String,
  pub age: u8,
  pub hand: Hand,
  #[serde(default)]
  wins: u32,
  #[serde(default)]
  losses: u32,
}

impl Competitor {
  pub fn new(id: CompetitorId, name: impl Into<String>, surname: impl Into<String>, age: u8, hand: Hand) -> Self {
    Competitor {
      id,
      name: name.into(),
      surname: surname.into(),
      age,
      hand,
      wins: 0,
      losses: 0,
    }
  }

  pub fn wins(&self) -> u32 {
    self.wins
  }

  pub fn losses(&self) -> u32 {
    self.losses
  }

  pub fn eliminated(&self) -> bool {
    self.losses >= ELIMINATION_LOSSES
  }

  pub fn display_name(&self) -> String {
    format!("{} {}", self.name, self.surname)
  }

  pub(crate) fn record_win(&mut self) {
    self.wins += 1;
  }

  pub(crate) fn undo_win(&mut self) {
    self.wins = self.wins.saturating_sub(1);
  }

  pub(crate) fn record_loss(&mut self) {
    self.losses += 1;
  }

  pub(crate) fn undo_loss(&mut self) {
    self.losses = self.losses.saturating_sub(1);
  }
}
