//! Milestone Buyback Pallet
//!
//! Watches the market cap of one token and, each time it crosses a multiple of
//! `GoalStepUsd`, claims accrued creator fees, spends `BuybackRatio` of the claim on buying
//! the token back and burns what was bought.
//!
//! Every attempted operation is recorded in an append-only ledger, which together with the
//! last market snapshot feeds the `dashboard` view function.
//!
//! ## Guarantees
//!
//! - Goals are processed strictly in order, one per tick, and never twice.
//! - A dip below a processed goal followed by a recovery does not re-trigger it.
//! - A failed step is retried from that step with the amounts already obtained: a failed
//!   buyback never re-claims, a failed burn never re-buys.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

pub mod adapters;
pub mod dashboard;
pub mod ladder;
pub mod ledger;
pub mod pipeline;

pub use adapters::{
  BurnReceipt, BuybackReceipt, ClaimReceipt, FungiblesExecutor, MarketData, MarketQuote,
  TokenSwap, TransactionExecutor, TxReference,
};
pub use dashboard::DashboardView;
pub use ledger::{BurnTotals, EntryKind, EntryStatus, Ledger, LedgerEntry, LedgerTotals};
pub use pipeline::{
  InFlightGoal, MarketSnapshot, PipelineStep, ProcessedGoalState, ResumePoint, SkipReason,
  TickOutcome,
};

#[cfg(test)]
pub mod mock;

#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;

pub mod weights;
pub use weights::WeightInfo;

pub(crate) const LOG_TARGET: &str = "runtime::milestone-buyback";

/// Helper for benchmarking
#[cfg(feature = "runtime-benchmarks")]
pub trait BenchmarkHelper<AccountId> {
  /// Make the market report a cap of at least `market_cap_usd` and make the next claim,
  /// buyback and burn for `wallet` succeed with non-zero amounts.
  fn prepare_goal_crossing(
    wallet: &AccountId,
    market_cap_usd: u128,
  ) -> frame::deps::sp_runtime::DispatchResult;
}

#[frame::pallet]
pub mod pallet {
  use super::{
    LOG_TARGET, WeightInfo,
    adapters::{MarketData, TransactionExecutor},
    ledger::{Ledger, LedgerEntry},
    pipeline::{
      InFlightGoal, MarketSnapshot, PipelineStep, ProcessedGoalState, SkipReason, TickOutcome,
    },
    dashboard::DashboardView,
  };
  use alloc::vec::Vec;
  use frame::deps::{
    frame_support::traits::UnixTime,
    sp_runtime::{
      DispatchError, Permill,
      traits::{AccountIdConversion, Zero},
    },
  };
  use frame::prelude::*;
  use primitives::{AssetInspector, AssetKind};

  /// Configuration trait for the milestone buyback pallet
  #[pallet::config]
  pub trait Config: frame_system::Config<RuntimeEvent: From<Event<Self>>> {
    /// Source of token price, supply and native price
    type MarketData: MarketData;

    /// Performs claim, buyback and burn on behalf of the pallet account
    type Executor: TransactionExecutor<Self::AccountId>;

    /// Wall clock used to timestamp snapshots and ledger entries
    type TimeProvider: UnixTime;

    /// Origin allowed to use the manual market-cap bump
    type AdminOrigin: EnsureOrigin<Self::RuntimeOrigin>;

    /// Weight information for extrinsics and the tick
    type WeightInfo: WeightInfo;

    /// The pallet ID; its account is the operating wallet
    #[pallet::constant]
    type PalletId: Get<PalletId>;

    /// The monitored token
    #[pallet::constant]
    type TokenAsset: Get<AssetKind>;

    /// Size of one market-cap milestone, `PRECISION`-scaled USD
    #[pallet::constant]
    type GoalStepUsd: Get<u128>;

    /// Share of each claim spent on the buyback
    #[pallet::constant]
    type BuybackRatio: Get<Permill>;

    /// Base units per whole token
    #[pallet::constant]
    type TokenUnit: Get<u128>;

    /// Base units per whole native unit
    #[pallet::constant]
    type NativeUnit: Get<u128>;

    /// Total token supply used for the burned-share figure
    #[pallet::constant]
    type TokenTotalSupply: Get<u128>;

    /// Blocks between two ticks
    #[pallet::constant]
    type TickInterval: Get<BlockNumberFor<Self>>;

    /// Blocks to wait before resuming a goal after a failed step
    #[pallet::constant]
    type RetryCooldown: Get<BlockNumberFor<Self>>;

    /// Number of ledger entries in the dashboard and the maximum page size
    #[pallet::constant]
    type MaxDashboardEntries: Get<u32>;

    /// Enables `bump_market_cap`; must be false on production chains
    #[pallet::constant]
    type DevHooksEnabled: Get<bool>;

    /// Helper for benchmarking
    #[cfg(feature = "runtime-benchmarks")]
    type BenchmarkHelper: crate::BenchmarkHelper<Self::AccountId>;
  }

  #[pallet::pallet]
  pub struct Pallet<T>(PhantomData<T>);

  /// Ladder progress: last fully processed goal
  #[pallet::storage]
  pub type GoalState<T: Config> = StorageValue<_, ProcessedGoalState, ValueQuery>;

  /// Goal currently owned by the pipeline, parked at its resume point
  #[pallet::storage]
  pub type InFlight<T: Config> = StorageValue<_, InFlightGoal<BlockNumberFor<T>>, OptionQuery>;

  /// Set while the pipeline runs
  #[pallet::storage]
  pub type PipelineActive<T: Config> = StorageValue<_, bool, ValueQuery>;

  /// Last successfully observed market snapshot
  #[pallet::storage]
  pub type LastSnapshot<T: Config> = StorageValue<_, MarketSnapshot, OptionQuery>;

  /// Manual offset added to every observed market cap
  #[pallet::storage]
  pub type MarketCapBump<T: Config> = StorageValue<_, u128, ValueQuery>;

  /// Ledger entries by sequence number
  #[pallet::storage]
  pub type LedgerEntries<T: Config> = StorageMap<_, Twox64Concat, u64, LedgerEntry, OptionQuery>;

  /// Number of ledger entries, also the next sequence number
  #[pallet::storage]
  pub type LedgerLength<T: Config> = StorageValue<_, u64, ValueQuery>;

  #[pallet::event]
  #[pallet::generate_deposit(pub(super) fn deposit_event)]
  pub enum Event<T: Config> {
    /// First observation seeded the ladder; goals up to this index are never processed
    LadderInitialized {
      last_processed_goal_index: u64,
      market_cap_usd: u128,
    },
    /// Market cap crossed a goal and its pipeline started
    GoalCrossed { goal_index: u64, market_cap_usd: u128 },
    FeesClaimed { goal_index: u64, amount: u128 },
    BuybackExecuted {
      goal_index: u64,
      spent: u128,
      tokens_bought: u128,
    },
    TokensBurned { goal_index: u64, amount: u128 },
    /// A step failed; the goal stays in flight at that step
    StepFailed {
      goal_index: u64,
      step: PipelineStep,
      error: DispatchError,
      attempts: u32,
    },
    /// Goal reached terminal success
    GoalProcessed { goal_index: u64 },
    TickSkipped { reason: SkipReason },
    /// Market data source returned nothing; tick skipped
    MarketDataUnavailable,
    MarketCapBumped { delta_usd: u128, total_usd: u128 },
    MarketCapBumpReset,
  }

  #[pallet::error]
  pub enum Error<T> {
    /// Market data source returned nothing
    MarketDataUnavailable,
    /// Fee claim failed
    ClaimFailed,
    /// Buyback failed
    BuybackFailed,
    /// Burn failed
    BurnFailed,
    /// Pallet constants are inconsistent
    ConfigurationInvalid,
    /// Manual bump is disabled on this chain
    DevHooksDisabled,
    /// A pipeline is already running
    PipelineBusy,
  }

  #[pallet::call]
  impl<T: Config> Pallet<T> {
    /// Add `delta_usd` to the offset applied to every observed market cap.
    ///
    /// The crossing is processed by the next regular tick.
    #[pallet::call_index(0)]
    #[pallet::weight(T::WeightInfo::bump_market_cap())]
    pub fn bump_market_cap(origin: OriginFor<T>, delta_usd: u128) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      ensure!(T::DevHooksEnabled::get(), Error::<T>::DevHooksDisabled);
      let total_usd = MarketCapBump::<T>::mutate(|bump| {
        *bump = bump.saturating_add(delta_usd);
        *bump
      });
      Self::deposit_event(Event::MarketCapBumped {
        delta_usd,
        total_usd,
      });
      Ok(())
    }

    #[pallet::call_index(1)]
    #[pallet::weight(T::WeightInfo::reset_market_cap_bump())]
    pub fn reset_market_cap_bump(origin: OriginFor<T>) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      ensure!(T::DevHooksEnabled::get(), Error::<T>::DevHooksDisabled);
      MarketCapBump::<T>::kill();
      Self::deposit_event(Event::MarketCapBumpReset);
      Ok(())
    }
  }

  #[pallet::hooks]
  impl<T: Config> Hooks<BlockNumberFor<T>> for Pallet<T> {
    fn on_idle(n: BlockNumberFor<T>, remaining_weight: Weight) -> Weight {
      let interval = T::TickInterval::get();
      if interval.is_zero() || !(n % interval).is_zero() {
        return Weight::zero();
      }
      let tick_weight = T::WeightInfo::process_goal();
      let idle_weight = T::WeightInfo::idle_tick();
      if !remaining_weight.all_gte(tick_weight) {
        if !remaining_weight.all_gte(idle_weight) {
          return Weight::zero();
        }
        log::debug!(target: LOG_TARGET, "tick skipped at {:?}, insufficient weight", n);
        Self::deposit_event(Event::TickSkipped {
          reason: SkipReason::InsufficientWeight,
        });
        return idle_weight;
      }
      match Self::tick(n) {
        Ok(TickOutcome::Completed { .. }) => tick_weight,
        Ok(_) => idle_weight,
        Err(Error::<T>::PipelineBusy) | Err(Error::<T>::MarketDataUnavailable) => idle_weight,
        Err(_) => tick_weight,
      }
    }

    fn integrity_test() {
      assert!(
        Self::validate_configuration().is_ok(),
        "milestone-buyback: invalid pallet configuration"
      );
    }
  }

  #[pallet::view_functions]
  impl<T: Config> Pallet<T> {
    /// Dashboard payload: market, ladder progress, burn totals and recent history.
    pub fn dashboard() -> DashboardView {
      Self::dashboard_view()
    }

    /// Up to `MaxDashboardEntries` ledger entries starting at `start`, oldest first.
    pub fn ledger_page(start: u64, count: u32) -> Vec<LedgerEntry> {
      Ledger::<T>::page(start, count.min(T::MaxDashboardEntries::get()))
    }
  }

  impl<T: Config> Pallet<T> {
    /// The operating wallet
    pub fn account_id() -> T::AccountId {
      T::PalletId::get().into_account_truncating()
    }

    pub fn validate_configuration() -> Result<(), Error<T>> {
      ensure!(
        !T::GoalStepUsd::get().is_zero(),
        Error::<T>::ConfigurationInvalid
      );
      ensure!(
        !T::BuybackRatio::get().is_zero(),
        Error::<T>::ConfigurationInvalid
      );
      ensure!(
        !T::TickInterval::get().is_zero(),
        Error::<T>::ConfigurationInvalid
      );
      ensure!(
        !T::TokenUnit::get().is_zero() && !T::NativeUnit::get().is_zero(),
        Error::<T>::ConfigurationInvalid
      );
      ensure!(
        !T::TokenTotalSupply::get().is_zero(),
        Error::<T>::ConfigurationInvalid
      );
      ensure!(
        !T::MaxDashboardEntries::get().is_zero(),
        Error::<T>::ConfigurationInvalid
      );
      ensure!(
        !T::TokenAsset::get().is_native(),
        Error::<T>::ConfigurationInvalid
      );
      Ok(())
    }
  }

  /// Genesis configuration, optionally pre-seeding the ladder
  #[pallet::genesis_config]
  #[derive(frame::prelude::DefaultNoBound)]
  pub struct GenesisConfig<T: Config> {
    pub last_processed_goal_index: u64,
    pub initialized: bool,
    #[serde(skip)]
    pub _marker: core::marker::PhantomData<T>,
  }

  #[pallet::genesis_build]
  impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
    fn build(&self) {
      assert!(
        Pallet::<T>::validate_configuration().is_ok(),
        "milestone-buyback: invalid pallet configuration"
      );
      GoalState::<T>::put(ProcessedGoalState {
        last_processed_goal_index: self.last_processed_goal_index,
        initialized: self.initialized,
      });
      // Pallet account survives zero native balance via provider reference
      frame_system::Pallet::<T>::inc_providers(&Pallet::<T>::account_id());
    }
  }
}
