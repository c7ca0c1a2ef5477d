//! Milestone-triggered claim → buyback → burn pipeline
//!
//! One tick observes the market, compares the market cap against the goal ladder and drives
//! at most one goal through the three executor calls. A failed call parks the goal at the
//! failed step; the next eligible tick resumes there with the amounts already obtained.

use crate::{
  LOG_TARGET, ladder,
  adapters::{MarketData, TransactionExecutor},
  ledger::{EntryKind, EntryStatus, Ledger, LedgerEntry, describe},
  pallet::*,
};
use alloc::vec::Vec;
use frame::deps::{
  frame_support::{storage::with_storage_layer, traits::UnixTime},
  sp_runtime::{
    DispatchError,
    traits::{SaturatedConversion, Saturating},
  },
};
use frame::prelude::*;
use polkadot_sdk::sp_core::U256;

/// Market state observed at one tick.
#[derive(
  Clone, Copy, Debug, Decode, Default, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo,
)]
pub struct MarketSnapshot {
  pub price_usd: u128,
  /// Derived market cap including any manual bump, `PRECISION`-scaled.
  pub market_cap_usd: u128,
  pub native_price_usd: u128,
  pub volume_change_bps: i32,
  /// Unix time in milliseconds.
  pub observed_at: u64,
}

/// Progress of the ladder.
///
/// `last_processed_goal_index` never regresses and only moves when a goal's burn outcome
/// is known.
#[derive(
  Clone, Copy, Debug, Decode, Default, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo,
)]
pub struct ProcessedGoalState {
  pub last_processed_goal_index: u64,
  pub initialized: bool,
}

#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Encode,
  Eq,
  MaxEncodedLen,
  PartialEq,
  TypeInfo,
)]
pub enum PipelineStep {
  Claim,
  Buyback,
  Burn,
}

impl PipelineStep {
  fn entry_kind(self) -> EntryKind {
    match self {
      PipelineStep::Claim => EntryKind::Claim,
      PipelineStep::Buyback => EntryKind::Buyback,
      PipelineStep::Burn => EntryKind::Burn,
    }
  }

  fn failure<T: Config>(self) -> Error<T> {
    match self {
      PipelineStep::Claim => Error::<T>::ClaimFailed,
      PipelineStep::Buyback => Error::<T>::BuybackFailed,
      PipelineStep::Burn => Error::<T>::BurnFailed,
    }
  }

  fn label(self) -> &'static [u8] {
    match self {
      PipelineStep::Claim => b"Claim failed: ",
      PipelineStep::Buyback => b"Buyback failed: ",
      PipelineStep::Burn => b"Burn failed: ",
    }
  }
}

/// Where an in-flight goal continues, with the amounts obtained by earlier steps.
#[derive(
  Clone, Copy, Debug, Decode, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo,
)]
pub enum ResumePoint {
  Claim,
  Buyback { claimed: u128 },
  Burn { claimed: u128, spent: u128, bought: u128 },
}

impl ResumePoint {
  pub fn step(&self) -> PipelineStep {
    match self {
      ResumePoint::Claim => PipelineStep::Claim,
      ResumePoint::Buyback { .. } => PipelineStep::Buyback,
      ResumePoint::Burn { .. } => PipelineStep::Burn,
    }
  }
}

/// The goal currently owned by the pipeline.
#[derive(
  Clone, Copy, Debug, Decode, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo,
)]
pub struct InFlightGoal<BlockNumber> {
  pub goal_index: u64,
  pub resume: ResumePoint,
  /// Failed attempts so far.
  pub attempts: u32,
  /// First block at which the goal may be resumed.
  pub retry_at: BlockNumber,
}

#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Encode,
  Eq,
  MaxEncodedLen,
  PartialEq,
  TypeInfo,
)]
pub enum SkipReason {
  PipelineBusy,
  CoolingDown,
  InsufficientWeight,
}

/// Result of a tick that did not fail.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TickOutcome {
  /// First observation seeded the ladder.
  Initialized { last_processed_goal_index: u64 },
  /// No goal crossed and none in flight.
  Idle,
  /// The in-flight goal waits for its retry block.
  CoolingDown,
  /// A goal reached its terminal success.
  Completed { goal_index: u64 },
}

pub(crate) fn mul_div(a: u128, b: u128, c: u128) -> u128 {
  if c == 0 {
    return 0;
  }
  let result = U256::from(a).saturating_mul(U256::from(b)) / U256::from(c);
  if result > U256::from(u128::MAX) {
    u128::MAX
  } else {
    result.as_u128()
  }
}

impl<T: Config> Pallet<T> {
  /// Runs one tick at block `now`.
  ///
  /// Errors report why the tick stopped; state written before that point (snapshot,
  /// ledger entries, parked goal) is kept.
  pub fn tick(now: BlockNumberFor<T>) -> Result<TickOutcome, Error<T>> {
    if PipelineActive::<T>::get() {
      log::debug!(target: LOG_TARGET, "tick skipped, pipeline busy");
      Self::deposit_event(Event::TickSkipped {
        reason: SkipReason::PipelineBusy,
      });
      return Err(Error::<T>::PipelineBusy);
    }

    let Some(snapshot) = Self::observe() else {
      log::warn!(target: LOG_TARGET, "market data unavailable, tick skipped");
      Self::deposit_event(Event::MarketDataUnavailable);
      return Err(Error::<T>::MarketDataUnavailable);
    };
    let current = ladder::goal_index(snapshot.market_cap_usd, T::GoalStepUsd::get());

    let mut state = GoalState::<T>::get();
    if !state.initialized {
      state.last_processed_goal_index = state.last_processed_goal_index.max(current);
      state.initialized = true;
      GoalState::<T>::put(state);
      Self::deposit_event(Event::LadderInitialized {
        last_processed_goal_index: state.last_processed_goal_index,
        market_cap_usd: snapshot.market_cap_usd,
      });
      return Ok(TickOutcome::Initialized {
        last_processed_goal_index: state.last_processed_goal_index,
      });
    }

    let goal = match InFlight::<T>::get() {
      // Nothing has moved yet; the goal is crossed again from scratch if the cap recovers.
      Some(goal)
        if matches!(goal.resume, ResumePoint::Claim)
          && current <= state.last_processed_goal_index =>
      {
        InFlight::<T>::kill();
        log::debug!(
          target: LOG_TARGET,
          "goal {} dropped before claim, market cap fell back to goal {}",
          goal.goal_index,
          current,
        );
        return Ok(TickOutcome::Idle);
      }
      Some(goal) if now < goal.retry_at => {
        Self::deposit_event(Event::TickSkipped {
          reason: SkipReason::CoolingDown,
        });
        return Ok(TickOutcome::CoolingDown);
      }
      Some(goal) => goal,
      None => {
        if current <= state.last_processed_goal_index {
          return Ok(TickOutcome::Idle);
        }
        let goal_index = state.last_processed_goal_index.saturating_add(1);
        Self::deposit_event(Event::GoalCrossed {
          goal_index,
          market_cap_usd: snapshot.market_cap_usd,
        });
        InFlightGoal {
          goal_index,
          resume: ResumePoint::Claim,
          attempts: 0,
          retry_at: now,
        }
      }
    };

    Self::run_pipeline(goal, &snapshot, now)
  }

  /// Reads the market, derives the market cap and stores the snapshot.
  pub(crate) fn observe() -> Option<MarketSnapshot> {
    let quote = T::MarketData::quote()?;
    let market_cap_usd = mul_div(quote.price_usd, quote.circulating_supply, T::TokenUnit::get())
      .saturating_add(MarketCapBump::<T>::get());
    let snapshot = MarketSnapshot {
      price_usd: quote.price_usd,
      market_cap_usd,
      native_price_usd: quote.native_price_usd,
      volume_change_bps: quote.volume_change_bps,
      observed_at: Self::now_millis(),
    };
    LastSnapshot::<T>::put(snapshot);
    Some(snapshot)
  }

  fn run_pipeline(
    mut goal: InFlightGoal<BlockNumberFor<T>>,
    snapshot: &MarketSnapshot,
    now: BlockNumberFor<T>,
  ) -> Result<TickOutcome, Error<T>> {
    // Only observable from executor callbacks that re-enter `tick`.
    PipelineActive::<T>::put(true);
    let result = Self::advance(&mut goal, snapshot);
    PipelineActive::<T>::kill();

    match result {
      Ok(()) => {
        InFlight::<T>::kill();
        GoalState::<T>::mutate(|state| {
          state.last_processed_goal_index = state.last_processed_goal_index.max(goal.goal_index);
        });
        Self::deposit_event(Event::GoalProcessed {
          goal_index: goal.goal_index,
        });
        Ok(TickOutcome::Completed {
          goal_index: goal.goal_index,
        })
      }
      Err((step, error)) => {
        goal.attempts = goal.attempts.saturating_add(1);
        goal.retry_at = now.saturating_add(T::RetryCooldown::get());
        InFlight::<T>::put(goal);
        log::warn!(
          target: LOG_TARGET,
          "goal {} parked at {:?} after attempt {}: {:?}",
          goal.goal_index,
          step,
          goal.attempts,
          error,
        );
        Self::deposit_event(Event::StepFailed {
          goal_index: goal.goal_index,
          step,
          error,
          attempts: goal.attempts,
        });
        Err(step.failure::<T>())
      }
    }
  }

  /// Drives `goal` from its resume point to completion or to the first failing step.
  fn advance(
    goal: &mut InFlightGoal<BlockNumberFor<T>>,
    snapshot: &MarketSnapshot,
  ) -> Result<(), (PipelineStep, DispatchError)> {
    let wallet = Self::account_id();
    let goal_index = goal.goal_index;
    loop {
      goal.resume = match goal.resume {
        ResumePoint::Claim => {
          let receipt = Self::attempt(goal_index, PipelineStep::Claim, 0, 0, snapshot, || {
            T::Executor::claim_fees(&wallet)
          })?;
          let claimed = receipt.amount;
          Self::record(LedgerEntry {
            kind: EntryKind::Claim,
            goal_index,
            amount_native: claimed,
            amount_tokens: 0,
            value_usd: Self::native_value(claimed, snapshot),
            description: describe(b"Claimed creator fees"),
            reference: Some(receipt.reference),
            timestamp: Self::now_millis(),
            status: EntryStatus::Success,
          });
          Self::deposit_event(Event::FeesClaimed {
            goal_index,
            amount: claimed,
          });
          if T::BuybackRatio::get().mul_floor(claimed) == 0 {
            return Ok(());
          }
          ResumePoint::Buyback { claimed }
        }
        ResumePoint::Buyback { claimed } => {
          let spent = T::BuybackRatio::get().mul_floor(claimed);
          let receipt =
            Self::attempt(goal_index, PipelineStep::Buyback, spent, 0, snapshot, || {
              T::Executor::buyback(&wallet, spent)
            })?;
          let bought = receipt.tokens_bought;
          Self::record(LedgerEntry {
            kind: EntryKind::Buyback,
            goal_index,
            amount_native: spent,
            amount_tokens: bought,
            value_usd: Self::native_value(spent, snapshot),
            description: describe(b"Bought back tokens"),
            reference: Some(receipt.reference),
            timestamp: Self::now_millis(),
            status: EntryStatus::Success,
          });
          Self::deposit_event(Event::BuybackExecuted {
            goal_index,
            spent,
            tokens_bought: bought,
          });
          if bought == 0 {
            return Ok(());
          }
          ResumePoint::Burn {
            claimed,
            spent,
            bought,
          }
        }
        ResumePoint::Burn { bought, .. } => {
          let receipt = Self::attempt(goal_index, PipelineStep::Burn, 0, bought, snapshot, || {
            T::Executor::burn(&wallet, bought)
          })?;
          Self::record(LedgerEntry {
            kind: EntryKind::Burn,
            goal_index,
            amount_native: 0,
            amount_tokens: receipt.tokens_burned,
            value_usd: Self::token_value(receipt.tokens_burned, snapshot),
            description: describe(b"Burned bought-back tokens"),
            reference: Some(receipt.reference),
            timestamp: Self::now_millis(),
            status: EntryStatus::Success,
          });
          Self::deposit_event(Event::TokensBurned {
            goal_index,
            amount: receipt.tokens_burned,
          });
          return Ok(());
        }
      };
    }
  }

  /// Runs one executor call in its own storage layer.
  ///
  /// On failure the layer is discarded and a failed entry for the attempted amounts is
  /// appended.
  fn attempt<R>(
    goal_index: u64,
    step: PipelineStep,
    amount_native: u128,
    amount_tokens: u128,
    snapshot: &MarketSnapshot,
    call: impl FnOnce() -> Result<R, DispatchError>,
  ) -> Result<R, (PipelineStep, DispatchError)> {
    with_storage_layer(call).map_err(|error| {
      let reason: &'static str = error.into();
      let mut text = Vec::from(step.label());
      text.extend_from_slice(reason.as_bytes());
      let value_usd = match step {
        PipelineStep::Burn => Self::token_value(amount_tokens, snapshot),
        _ => Self::native_value(amount_native, snapshot),
      };
      Self::record(LedgerEntry {
        kind: step.entry_kind(),
        goal_index,
        amount_native,
        amount_tokens,
        value_usd,
        description: describe(&text),
        reference: None,
        timestamp: Self::now_millis(),
        status: EntryStatus::Failed,
      });
      (step, error)
    })
  }

  fn record(entry: LedgerEntry) {
    let seq = Ledger::<T>::append(entry);
    log::trace!(target: LOG_TARGET, "ledger entry {} appended", seq);
  }

  fn native_value(amount: u128, snapshot: &MarketSnapshot) -> u128 {
    mul_div(amount, snapshot.native_price_usd, T::NativeUnit::get())
  }

  fn token_value(amount: u128, snapshot: &MarketSnapshot) -> u128 {
    mul_div(amount, snapshot.price_usd, T::TokenUnit::get())
  }

  pub(crate) fn now_millis() -> u64 {
    T::TimeProvider::now().as_millis().saturated_into::<u64>()
  }
}
