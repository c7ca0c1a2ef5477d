//! Ecosystem Constants for the Milestone Buyback chain
//!
//! This module centralizes system-level constants: dedicated pallet account IDs and the
//! economic parameters of the milestone ladder and the claim → buyback → burn pipeline.
//!
//! These constants are the single source of truth and are re-used by pallet configurations
//! via the primitives crate.

/// Balance type alias for consistency across ecosystem
pub type Balance = u128;

/// Pallet identifiers for deriving pallet-owned accounts.
///
/// Used with `PalletId::into_account_truncating()` to deterministically derive accounts.
pub mod pallet_ids {
  /// Milestone Buyback pallet ID (operating wallet of the pipeline)
  pub const MILESTONE_BUYBACK_PALLET_ID: &[u8; 8] = b"msbuybk0";

  /// Creator fee vault ID (where trading fees accrue until claimed)
  pub const CREATOR_FEE_VAULT_ID: &[u8; 8] = b"feevault";
}

/// Ecosystem parameters defining the milestone ladder and pipeline economics.
pub mod params {
  use super::Balance;
  use sp_arithmetic::Permill;

  /// Precision scalar for all USD fixed-point values (10^12).
  ///
  /// Prices, market caps and USD valuations are `u128` scaled by this factor.
  pub const PRECISION: Balance = 1_000_000_000_000;

  /// Size of one market-cap milestone ($100,000).
  ///
  /// Goal `k` is reached once the market cap is at least `k * GOAL_STEP_USD`.
  pub const GOAL_STEP_USD: Balance = usd(100_000);

  /// Share of each claim spent on the buyback (25%).
  pub const BUYBACK_RATIO: Permill = Permill::from_percent(25);

  /// Slippage tolerance applied to buyback swaps (10%).
  pub const BUYBACK_SLIPPAGE_TOLERANCE: Permill = Permill::from_percent(10);

  /// Number of ledger entries returned by the dashboard projection.
  pub const DASHBOARD_ENTRIES: u32 = 50;

  /// Blocks between two pipeline ticks (every block, ~6s).
  pub const TICK_INTERVAL_BLOCKS: u32 = 1;

  /// Blocks to wait before retrying a failed pipeline step (next tick).
  pub const RETRY_COOLDOWN_BLOCKS: u32 = 0;

  /// Converts whole dollars into the USD fixed-point representation.
  pub const fn usd(whole: Balance) -> Balance {
    whole * PRECISION
  }
}
