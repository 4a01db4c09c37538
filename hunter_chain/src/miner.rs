// Tax preview for block assembly.
//
// A miner collects the bank tax of its block, which depends on the moves it
// includes. `TaxPreview` tracks a candidate move set on top of the current
// tip state: each `try_add` re-runs the step with the zero block hash, which
// stops after banking (no randomness is needed for the tax) and leaves the
// tip untouched. A move that would make the block invalid is not kept.

use hunter_sim::error::StepError;
use hunter_sim::moves::Move;
use hunter_sim::rules::Ruleset;
use hunter_sim::state::GameState;
use hunter_sim::step::{perform_step, StepData};
use hunter_sim::types::{Amount, BlockHash};

pub struct TaxPreview<'a> {
    rules: &'a Ruleset,
    base: &'a GameState,
    treasure: Amount,
    moves: Vec<Move>,
    tax: Amount,
}

impl<'a> TaxPreview<'a> {
    /// Start from an empty block on top of `base`.
    pub fn new(rules: &'a Ruleset, base: &'a GameState, treasure: Amount) -> Result<Self, StepError> {
        let mut preview = Self {
            rules,
            base,
            treasure,
            moves: Vec::new(),
            tax: 0,
        };
        preview.tax = preview.evaluate(&[])?;
        Ok(preview)
    }

    /// Add `mv` to the block if the block stays valid. Returns the tax of
    /// the block including it.
    pub fn try_add(&mut self, mv: Move) -> Result<Amount, StepError> {
        self.moves.push(mv);
        match self.evaluate(&self.moves) {
            Ok(tax) => {
                self.tax = tax;
                Ok(tax)
            }
            Err(e) => {
                self.moves.pop();
                tracing::debug!(error = %e, "move left out of block");
                Err(e)
            }
        }
    }

    pub fn tax(&self) -> Amount {
        self.tax
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    fn evaluate(&self, moves: &[Move]) -> Result<Amount, StepError> {
        let data = StepData {
            moves: moves.to_vec(),
            new_hash: BlockHash::ZERO,
            treasure: self.treasure,
        };
        let (_, result) = perform_step(self.rules, self.base, &data)?;
        Ok(result.tax_amount)
    }
}
