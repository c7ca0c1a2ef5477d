use crate::*;
use polkadot_sdk::frame_benchmarking::v2::*;
use polkadot_sdk::frame_support::traits::{EnsureOrigin, Get};

fn seed_ladder<T: Config>(last_processed_goal_index: u64) {
  GoalState::<T>::put(ProcessedGoalState {
    last_processed_goal_index,
    initialized: true,
  });
}

#[benchmarks]
mod benches {
  use super::*;

  /// Full claim → buyback → burn for one crossed goal.
  #[benchmark]
  fn process_goal() -> Result<(), BenchmarkError> {
    let wallet = Pallet::<T>::account_id();
    seed_ladder::<T>(0);
    let market_cap = ladder::goal_threshold(1, T::GoalStepUsd::get());
    T::BenchmarkHelper::prepare_goal_crossing(&wallet, market_cap)
      .map_err(|_| BenchmarkError::Stop("goal crossing setup failed"))?;
    let now = polkadot_sdk::frame_system::Pallet::<T>::block_number();

    #[block]
    {
      let _ = Pallet::<T>::tick(now);
    }

    assert_eq!(GoalState::<T>::get().last_processed_goal_index, 1);
    Ok(())
  }

  /// Observation without a crossing.
  #[benchmark]
  fn idle_tick() -> Result<(), BenchmarkError> {
    let wallet = Pallet::<T>::account_id();
    seed_ladder::<T>(1);
    let market_cap = ladder::goal_threshold(1, T::GoalStepUsd::get());
    T::BenchmarkHelper::prepare_goal_crossing(&wallet, market_cap)
      .map_err(|_| BenchmarkError::Stop("market setup failed"))?;
    let now = polkadot_sdk::frame_system::Pallet::<T>::block_number();

    #[block]
    {
      let _ = Pallet::<T>::tick(now);
    }

    assert!(LastSnapshot::<T>::get().is_some());
    Ok(())
  }

  #[benchmark]
  fn bump_market_cap() -> Result<(), BenchmarkError> {
    if !T::DevHooksEnabled::get() {
      return Err(BenchmarkError::Weightless);
    }
    let origin = T::AdminOrigin::try_successful_origin().map_err(|_| BenchmarkError::Weightless)?;
    let delta = T::GoalStepUsd::get();

    #[extrinsic_call]
    _(origin as T::RuntimeOrigin, delta);

    assert_eq!(MarketCapBump::<T>::get(), delta);
    Ok(())
  }

  #[benchmark]
  fn reset_market_cap_bump() -> Result<(), BenchmarkError> {
    if !T::DevHooksEnabled::get() {
      return Err(BenchmarkError::Weightless);
    }
    let origin = T::AdminOrigin::try_successful_origin().map_err(|_| BenchmarkError::Weightless)?;
    MarketCapBump::<T>::put(T::GoalStepUsd::get());

    #[extrinsic_call]
    _(origin as T::RuntimeOrigin);

    assert_eq!(MarketCapBump::<T>::get(), 0);
    Ok(())
  }

  #[cfg(test)]
  use crate::mock::{Test, new_test_ext};
  #[cfg(test)]
  impl_benchmark_test_suite!(Pallet, new_test_ext(), Test);
}
