use serde::Serialize;
use tracing::{info, warn};

use crate::bracket::{BracketState, Section, Stage};
use crate::competitor::CompetitorId;
use crate::error::BracketError;
use crate::pairing::{pair_section, Pairing};

/// What `advance_round` did to the bracket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum TransitionOutcome {
  Advanced,
  SemifinalEntered,
  FinalEntered,
  SuperFinalEntered { winner: CompetitorId, loser: CompetitorId },
  TournamentComplete { champion: CompetitorId },
}

#[derive(Debug, Default)]
struct SectionResults {
  winners: Vec<CompetitorId>,
  losers: Vec<CompetitorId>,
}

impl BracketState {
  /// Close the current round and move the bracket to its next stage.
  ///
  /// Refuses with `ValidationFailed` while any match of the round is
  /// undecided; in that case nothing is touched.
  pub fn advance_round(&mut self) -> Result<TransitionOutcome, BracketError> {
    if let Some(champion) = self.champion {
      return Ok(TransitionOutcome::TournamentComplete { champion });
    }
    if !self.is_round_complete() {
      let pending = self.pending_matches().len();
      warn!(round = self.current_round, pending, "round incomplete, not advancing");
      return Err(BracketError::ValidationFailed { pending });
    }

    match self.stage {
      Stage::SuperFinal => self.close_super_final(),
      Stage::Final => self.close_final(),
      Stage::Semifinal => self.close_semifinal(),
      Stage::Normal => self.close_normal_round(),
    }
  }

  fn close_super_final(&mut self) -> Result<TransitionOutcome, BracketError> {
    let (winner, _) = self.final_result()?;
    Ok(self.finish(winner))
  }

  fn close_final(&mut self) -> Result<TransitionOutcome, BracketError> {
    let (winner, loser) = self.final_result()?;
    let (_, bottom_finalist) = self.finalists()?;
    let bottom_losses = self
      .competitor(bottom_finalist)
      .map(|c| c.losses())
      .ok_or_else(|| BracketError::unknown_competitor(bottom_finalist))?;

    // Counters already include the final, so a bottom finalist who won it
    // still carries exactly the loss that sent them down.
    if winner == bottom_finalist && bottom_losses == 1 {
      info!(winner, loser, "bracket reset, super-final required");
      self.begin_round(Stage::SuperFinal, vec![winner], vec![loser]);
      return Ok(TransitionOutcome::SuperFinalEntered { winner, loser });
    }
    Ok(self.finish(winner))
  }

  fn close_semifinal(&mut self) -> Result<TransitionOutcome, BracketError> {
    let bottom = self.harvest(Section::Bottom)?;
    let top_finalist = *self.top.first().ok_or_else(|| {
      BracketError::InvalidReference("semifinal has no top finalist".to_string())
    })?;
    let bottom_finalist = *bottom.winners.first().ok_or_else(|| {
      BracketError::InvalidReference("semifinal produced no winner".to_string())
    })?;
    self.begin_round(Stage::Final, vec![top_finalist], vec![bottom_finalist]);
    info!(top_finalist, bottom_finalist, "final entered");
    Ok(TransitionOutcome::FinalEntered)
  }

  fn close_normal_round(&mut self) -> Result<TransitionOutcome, BracketError> {
    let top = self.harvest(Section::Top)?;
    let bottom = self.harvest(Section::Bottom)?;

    let mut next_bottom = bottom.winners;
    next_bottom.extend(top.losers);

    match (top.winners.len(), next_bottom.len()) {
      (1, 2) => {
        self.begin_round(Stage::Semifinal, top.winners, next_bottom);
        info!(round = self.current_round, "semifinal entered");
        Ok(TransitionOutcome::SemifinalEntered)
      }
      (1, 1) => {
        // one contender left on each side: no semifinal to play
        self.begin_round(Stage::Final, top.winners, next_bottom);
        info!(round = self.current_round, "final entered directly");
        Ok(TransitionOutcome::FinalEntered)
      }
      _ => {
        self.begin_round(Stage::Normal, top.winners, next_bottom);
        info!(
          round = self.current_round,
          top = self.top.len(),
          bottom = self.bottom.len(),
          "advanced to next round"
        );
        Ok(TransitionOutcome::Advanced)
      }
    }
  }

  /// Winners and losers of a section in pair order, bye winners first.
  /// Competitors who are out on losses are dropped from both lists.
  fn harvest(&self, section: Section) -> Result<SectionResults, BracketError> {
    let ledger = self.ledger(section);
    let mut byes = Vec::new();
    let mut results = SectionResults::default();

    for pairing in pair_section(self.section(section)) {
      match pairing {
        Pairing::Bye { competitor, .. } => {
          if self.is_active(competitor) {
            byes.push(competitor);
          }
        }
        Pairing::Match { index, first, second } => {
          let winner = ledger
            .get(index)
            .ok_or(BracketError::ValidationFailed { pending: 1 })?;
          let loser = if winner == first {
            second
          } else if winner == second {
            first
          } else {
            return Err(BracketError::InvalidReference(format!(
              "recorded winner {winner} did not play {section} match {index}"
            )));
          };
          if self.is_active(winner) {
            results.winners.push(winner);
          }
          if self.is_active(loser) {
            results.losers.push(loser);
          }
        }
      }
    }

    byes.append(&mut results.winners);
    results.winners = byes;
    Ok(results)
  }

  fn finalists(&self) -> Result<(CompetitorId, CompetitorId), BracketError> {
    match (self.top.first(), self.bottom.first()) {
      (Some(&top), Some(&bottom)) => Ok((top, bottom)),
      _ => Err(BracketError::InvalidReference(
        "final stage needs one competitor in each section".to_string(),
      )),
    }
  }

  fn final_result(&self) -> Result<(CompetitorId, CompetitorId), BracketError> {
    let (top_finalist, bottom_finalist) = self.finalists()?;
    match self.top_ledger.get(0) {
      Some(id) if id == top_finalist => Ok((top_finalist, bottom_finalist)),
      Some(id) if id == bottom_finalist => Ok((bottom_finalist, top_finalist)),
      Some(id) => Err(BracketError::InvalidReference(format!(
        "recorded final winner {id} is not a finalist"
      ))),
      None => Err(BracketError::ValidationFailed { pending: 1 }),
    }
  }

  fn is_active(&self, id: CompetitorId) -> bool {
    self.competitor(id).is_some_and(|c| !c.eliminated())
  }

  fn begin_round(&mut self, stage: Stage, top: Vec<CompetitorId>, bottom: Vec<CompetitorId>) {
    self.archive_round();
    self.stage = stage;
    self.top = top;
    self.bottom = bottom;
    self.current_round += 1;
    self.open_round();
  }

  fn finish(&mut self, champion: CompetitorId) -> TransitionOutcome {
    self.archive_round();
    self.champion = Some(champion);
    info!(champion, round = self.current_round, "tournament complete");
    TransitionOutcome::TournamentComplete { champion }
  }
}
