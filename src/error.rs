use thiserror::Error;

use crate::competitor::CompetitorId;

/// Failures of the bracket state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BracketError {
  /// The round still has undecided matches. Nothing was changed; supply the
  /// missing results and retry.
  #[error("round incomplete: {pending} match(es) still need a winner")]
  ValidationFailed { pending: usize },

  /// An id or match slot that does not exist in the current round. Callers
  /// that only pass ids read from the current state never see this.
  #[error("invalid reference: {0}")]
  InvalidReference(String),
}

impl BracketError {
  pub(crate) fn unknown_competitor(id: CompetitorId) -> Self {
    BracketError::InvalidReference(format!("competitor {id} is not in this tournament"))
  }
}

/// Failures while editing or loading a roster.
#[derive(Debug, Error)]
pub enum RosterError {
  #[error("{0}")]
  InvalidField(String),

  #[error("Error on line {line}: {reason}")]
  Line { line: u64, reason: String },

  #[error("competitor {0} not found")]
  UnknownCompetitor(CompetitorId),

  #[error("csv: {0}")]
  Csv(#[from] csv::Error),

  #[error("io: {0}")]
  Io(#[from] std::io::Error),
}

/// Failures surfaced to API callers.
#[derive(Debug, Error)]
pub enum CommandError {
  #[error("no tournament has been started")]
  NoTournament,

  #[error("the roster cannot change while a tournament is running; reset it first")]
  RosterLocked,

  #[error(transparent)]
  Bracket(#[from] BracketError),

  #[error(transparent)]
  Roster(#[from] RosterError),

  #[error("{0}")]
  Storage(String),
}
