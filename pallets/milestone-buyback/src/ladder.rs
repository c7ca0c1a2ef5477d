//! Goal ladder
//!
//! Market-cap milestones are the multiples of a fixed USD step. Goal `k` is reached once the
//! market cap is at least `k * step`; exact multiples count as reached.

use frame::deps::sp_runtime::Permill;

/// Index of the highest milestone reached by `market_cap_usd`.
pub fn goal_index(market_cap_usd: u128, step: u128) -> u64 {
  if step == 0 {
    return 0;
  }
  u64::try_from(market_cap_usd / step).unwrap_or(u64::MAX)
}

/// USD threshold of goal `index`.
pub fn goal_threshold(index: u64, step: u128) -> u128 {
  step.saturating_mul(index as u128)
}

/// Threshold of the first milestone strictly above `market_cap_usd`.
pub fn next_goal_usd(market_cap_usd: u128, step: u128) -> u128 {
  goal_threshold(goal_index(market_cap_usd, step).saturating_add(1), step)
}

/// Progress made inside the current step, from 0% (just crossed) towards 100%.
pub fn progress(market_cap_usd: u128, step: u128) -> Permill {
  if step == 0 {
    return Permill::zero();
  }
  Permill::from_rational(market_cap_usd % step, step)
}
