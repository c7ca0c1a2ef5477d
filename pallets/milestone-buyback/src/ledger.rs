//! Append-only transaction ledger
//!
//! Every attempted chain operation of the pipeline leaves exactly one entry, successful or
//! not. Entries are keyed by a dense sequence number so the insertion order is the single
//! total order of the history.

use crate::pallet::{Config, LedgerEntries, LedgerLength};
use alloc::vec::Vec;
use frame::deps::sp_runtime::Perbill;
use frame::prelude::*;

/// Maximum stored length of an entry description in bytes.
pub const MAX_DESCRIPTION_LEN: u32 = 96;

pub type Description = BoundedVec<u8, ConstU32<MAX_DESCRIPTION_LEN>>;

/// Builds a description, truncating anything beyond [`MAX_DESCRIPTION_LEN`].
pub fn describe(text: &[u8]) -> Description {
  BoundedVec::truncate_from(text.to_vec())
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
pub enum EntryKind {
  Claim,
  Buyback,
  Burn,
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
pub enum EntryStatus {
  Success,
  Failed,
}

/// One attempted claim, buyback or burn.
#[derive(Clone, Debug, Decode, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo)]
pub struct LedgerEntry {
  pub kind: EntryKind,
  /// Milestone whose pipeline produced the entry.
  pub goal_index: u64,
  /// Native amount involved (claimed or spent).
  pub amount_native: u128,
  /// Token amount involved (bought or burned).
  pub amount_tokens: u128,
  /// USD valuation at append time, `PRECISION`-scaled.
  pub value_usd: u128,
  pub description: Description,
  /// On-chain reference, absent for failed operations.
  pub reference: Option<[u8; 32]>,
  /// Unix time in milliseconds.
  pub timestamp: u64,
  pub status: EntryStatus,
}

impl LedgerEntry {
  pub fn is_success(&self) -> bool {
    self.status == EntryStatus::Success
  }
}

/// Sums over successful entries of one kind.
#[derive(Clone, Copy, Debug, Decode, Default, Encode, Eq, PartialEq, TypeInfo)]
pub struct LedgerTotals {
  pub native: u128,
  pub tokens: u128,
  pub usd: u128,
}

#[derive(Clone, Copy, Debug, Decode, Default, Encode, Eq, PartialEq, TypeInfo)]
pub struct BurnTotals {
  pub tokens_burned: u128,
  /// Share of the configured total supply destroyed so far.
  pub supply_burned: Perbill,
}

/// Storage-backed view over the ledger entries.
pub struct Ledger<T>(PhantomData<T>);

impl<T: Config> Ledger<T> {
  /// Appends `entry` and returns its sequence number.
  pub fn append(entry: LedgerEntry) -> u64 {
    let seq = LedgerLength::<T>::get();
    LedgerEntries::<T>::insert(seq, entry);
    LedgerLength::<T>::put(seq.saturating_add(1));
    seq
  }

  pub fn len() -> u64 {
    LedgerLength::<T>::get()
  }

  pub fn get(seq: u64) -> Option<LedgerEntry> {
    LedgerEntries::<T>::get(seq)
  }

  /// Up to `count` entries starting at sequence number `start`, oldest first.
  pub fn page(start: u64, count: u32) -> Vec<LedgerEntry> {
    let end = start.saturating_add(count as u64).min(Self::len());
    (start..end).filter_map(Self::get).collect()
  }

  pub fn snapshot_oldest_first() -> Vec<LedgerEntry> {
    (0..Self::len()).filter_map(Self::get).collect()
  }

  /// The `limit` most recent entries, newest first.
  pub fn snapshot_newest_first(limit: u32) -> Vec<LedgerEntry> {
    (0..Self::len())
      .rev()
      .take(limit as usize)
      .filter_map(Self::get)
      .collect()
  }

  pub fn aggregate_by_kind(kind: EntryKind) -> LedgerTotals {
    (0..Self::len())
      .filter_map(Self::get)
      .filter(|entry| entry.kind == kind && entry.is_success())
      .fold(LedgerTotals::default(), |acc, entry| LedgerTotals {
        native: acc.native.saturating_add(entry.amount_native),
        tokens: acc.tokens.saturating_add(entry.amount_tokens),
        usd: acc.usd.saturating_add(entry.value_usd),
      })
  }

  pub fn burn_totals(total_supply: u128) -> BurnTotals {
    Self::burn_share(&Self::aggregate_by_kind(EntryKind::Burn), total_supply)
  }

  /// Burn totals from already aggregated burn entries.
  pub fn burn_share(burned: &LedgerTotals, total_supply: u128) -> BurnTotals {
    let tokens_burned = burned.tokens;
    let supply_burned = if total_supply == 0 {
      Perbill::zero()
    } else {
      Perbill::from_rational(tokens_burned.min(total_supply), total_supply)
    };
    BurnTotals {
      tokens_burned,
      supply_burned,
    }
  }
}
