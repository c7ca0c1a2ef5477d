//! Read-only projection served to the polling dashboard.

use crate::{
  ladder,
  ledger::{EntryKind, Ledger, LedgerEntry},
  pallet::*,
};
use alloc::vec::Vec;
use frame::deps::sp_runtime::{Perbill, Permill};
use frame::prelude::*;
use primitives::AssetKind;

#[derive(Clone, Debug, Decode, Encode, Eq, PartialEq, TypeInfo)]
pub struct DashboardView {
  /// Last known token price, `PRECISION`-scaled. Zero before the first observation.
  pub price_usd: u128,
  pub market_cap_usd: u128,
  pub volume_change_bps: i32,
  pub next_goal_usd: u128,
  pub next_goal_progress: Permill,
  pub supply_burned: Perbill,
  /// USD spent on successful buybacks.
  pub buybacks_usd: u128,
  /// USD value of successfully burned tokens.
  pub burned_usd: u128,
  /// Most recent ledger entries, newest first.
  pub transactions: Vec<LedgerEntry>,
  pub token: AssetKind,
  pub last_processed_goal_index: u64,
  /// Goal currently parked in the pipeline, if any.
  pub pending_goal: Option<u64>,
}

impl<T: Config> Pallet<T> {
  /// Assembles the dashboard from the last snapshot, the ladder state and the ledger.
  pub fn dashboard_view() -> DashboardView {
    let snapshot = LastSnapshot::<T>::get().unwrap_or_default();
    let step = T::GoalStepUsd::get();
    let burned = Ledger::<T>::aggregate_by_kind(EntryKind::Burn);
    DashboardView {
      price_usd: snapshot.price_usd,
      market_cap_usd: snapshot.market_cap_usd,
      volume_change_bps: snapshot.volume_change_bps,
      next_goal_usd: ladder::next_goal_usd(snapshot.market_cap_usd, step),
      next_goal_progress: ladder::progress(snapshot.market_cap_usd, step),
      supply_burned: Ledger::<T>::burn_share(&burned, T::TokenTotalSupply::get()).supply_burned,
      buybacks_usd: Ledger::<T>::aggregate_by_kind(EntryKind::Buyback).usd,
      burned_usd: burned.usd,
      transactions: Ledger::<T>::snapshot_newest_first(T::MaxDashboardEntries::get()),
      token: T::TokenAsset::get(),
      last_processed_goal_index: GoalState::<T>::get().last_processed_goal_index,
      pending_goal: InFlight::<T>::get().map(|goal| goal.goal_index),
    }
  }
}
