extern crate alloc;

use crate as pallet_milestone_buyback;
use crate::{
  FungiblesExecutor, MarketQuote, PipelineStep, TickOutcome, TokenSwap, TransactionExecutor,
  adapters::{BurnReceipt, BuybackReceipt, ClaimReceipt},
};
use core::cell::RefCell;
use core::time::Duration;
use polkadot_sdk::frame_support::{
  PalletId, construct_runtime, derive_impl,
  traits::{
    ConstU32, ConstU128, Get, Hooks, UnixTime,
    fungible::Mutate as NativeMutate,
    fungibles::{Inspect as FungiblesInspect, Mutate as FungiblesMutate},
    tokens::{Fortitude, Precision, Preservation},
  },
  weights::Weight,
};
use polkadot_sdk::frame_system::{self, EnsureRoot};
use polkadot_sdk::sp_runtime::{
  BuildStorage, DispatchError, Permill,
  testing::H256,
  traits::{AccountIdConversion, BlakeTwo256, IdentityLookup},
};
use primitives::{
  AssetKind,
  ecosystem::{
    pallet_ids::{CREATOR_FEE_VAULT_ID, MILESTONE_BUYBACK_PALLET_ID},
    params::{
      BUYBACK_RATIO, BUYBACK_SLIPPAGE_TOLERANCE, DASHBOARD_ENTRIES, GOAL_STEP_USD, PRECISION,
      RETRY_COOLDOWN_BLOCKS, TICK_INTERVAL_BLOCKS, usd,
    },
  },
};

type Block = frame_system::mocking::MockBlock<Test>;
pub type AccountId = u64;
pub type Balance = u128;

pub const ALICE: AccountId = 1;
pub const TOKEN_ID: u32 = 7;
/// Token has 6 decimals.
pub const TOKEN_UNIT: Balance = 1_000_000;
/// Native has 12 decimals.
pub const NATIVE_UNIT: Balance = 1_000_000_000_000;
/// One billion whole tokens.
pub const TOKEN_SUPPLY: Balance = 1_000_000_000 * TOKEN_UNIT;

construct_runtime!(
  pub struct Test {
    System: frame_system,
    Balances: polkadot_sdk::pallet_balances,
    Assets: polkadot_sdk::pallet_assets,
    MilestoneBuyback: pallet_milestone_buyback,
  }
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig)]
impl frame_system::Config for Test {
  type Block = Block;
  type AccountId = AccountId;
  type Lookup = IdentityLookup<Self::AccountId>;
  type Hash = H256;
  type Hashing = BlakeTwo256;
  type AccountData = polkadot_sdk::pallet_balances::AccountData<Balance>;
}

impl polkadot_sdk::pallet_balances::Config for Test {
  type MaxLocks = ();
  type MaxReserves = ();
  type ReserveIdentifier = [u8; 8];
  type Balance = Balance;
  type DustRemoval = ();
  type RuntimeEvent = RuntimeEvent;
  type ExistentialDeposit = ConstU128<1>;
  type AccountStore = System;
  type WeightInfo = ();
  type FreezeIdentifier = ();
  type MaxFreezes = ();
  type RuntimeHoldReason = ();
  type RuntimeFreezeReason = ();
  type DoneSlashHandler = ();
}

impl polkadot_sdk::pallet_assets::Config for Test {
  type RuntimeEvent = RuntimeEvent;
  type Balance = Balance;
  type AssetId = u32;
  type AssetIdParameter = u32;
  type Currency = Balances;
  type CreateOrigin = polkadot_sdk::frame_support::traits::AsEnsureOriginWithArg<
    frame_system::EnsureSigned<Self::AccountId>,
  >;
  type ForceOrigin = EnsureRoot<Self::AccountId>;
  type AssetDeposit = ConstU128<1>;
  type AssetAccountDeposit = ConstU128<1>;
  type MetadataDepositBase = ConstU128<1>;
  type MetadataDepositPerByte = ConstU128<1>;
  type ApprovalDeposit = ConstU128<1>;
  type StringLimit = ConstU32<50>;
  type Freezer = ();
  type Extra = ();
  type ReserveData = ();
  type CallbackHandle = ();
  type WeightInfo = ();
  type RemoveItemsLimit = ConstU32<5>;
  type Holder = ();
  #[cfg(feature = "runtime-benchmarks")]
  type BenchmarkHelper = AssetBenchmarkHelper;
}

#[cfg(feature = "runtime-benchmarks")]
pub struct AssetBenchmarkHelper;

#[cfg(feature = "runtime-benchmarks")]
impl polkadot_sdk::pallet_assets::BenchmarkHelper<u32, ()> for AssetBenchmarkHelper {
  fn create_asset_id_parameter(id: u32) -> u32 {
    id
  }
  fn create_reserve_id_parameter(_id: u32) -> () {
    ()
  }
}

thread_local! {
  static MARKET: RefCell<Option<MarketQuote>> = const { RefCell::new(None) };
  static NOW_MS: RefCell<u64> = const { RefCell::new(1_700_000_000_000) };
  /// Token base units received per native base unit, `PRECISION`-scaled.
  static SWAP_RATE: RefCell<Balance> = const { RefCell::new(2 * PRECISION) };
  /// Execution shortfall against the quote, simulating price movement.
  static SWAP_SHORTFALL: RefCell<Permill> = const { RefCell::new(Permill::from_parts(0)) };
  /// Pending injected failures per step: claim, buyback, burn.
  static FAILURES: RefCell<[u32; 3]> = const { RefCell::new([0; 3]) };
  static CALLS: RefCell<[u32; 3]> = const { RefCell::new([0; 3]) };
  static DEV_HOOKS: RefCell<bool> = const { RefCell::new(true) };
  static TICK_INTERVAL: RefCell<u64> = const { RefCell::new(TICK_INTERVAL_BLOCKS as u64) };
  static RETRY_COOLDOWN: RefCell<u64> = const { RefCell::new(RETRY_COOLDOWN_BLOCKS as u64) };
  /// When set, the next claim calls back into `tick` and records what it returned.
  static REENTER_ON_CLAIM: RefCell<bool> = const { RefCell::new(false) };
  static REENTRY_RESULT: RefCell<Option<Result<TickOutcome, DispatchError>>> =
    const { RefCell::new(None) };
}

pub fn reset_mocks() {
  MARKET.with(|m| *m.borrow_mut() = None);
  NOW_MS.with(|n| *n.borrow_mut() = 1_700_000_000_000);
  SWAP_RATE.with(|r| *r.borrow_mut() = 2 * PRECISION);
  SWAP_SHORTFALL.with(|s| *s.borrow_mut() = Permill::zero());
  FAILURES.with(|f| *f.borrow_mut() = [0; 3]);
  CALLS.with(|c| *c.borrow_mut() = [0; 3]);
  DEV_HOOKS.with(|d| *d.borrow_mut() = true);
  TICK_INTERVAL.with(|i| *i.borrow_mut() = TICK_INTERVAL_BLOCKS as u64);
  RETRY_COOLDOWN.with(|c| *c.borrow_mut() = RETRY_COOLDOWN_BLOCKS as u64);
  REENTER_ON_CLAIM.with(|r| *r.borrow_mut() = false);
  REENTRY_RESULT.with(|r| *r.borrow_mut() = None);
}

fn slot(step: PipelineStep) -> usize {
  match step {
    PipelineStep::Claim => 0,
    PipelineStep::Buyback => 1,
    PipelineStep::Burn => 2,
  }
}

/// Report a market cap of `whole` dollars over a one-billion-token supply, native at $100.
pub fn set_market_cap_usd(whole: u128) {
  set_market_cap_scaled(usd(whole));
}

pub fn set_market_cap_scaled(market_cap_usd: u128) {
  let whole_tokens = TOKEN_SUPPLY / TOKEN_UNIT;
  MARKET.with(|m| {
    *m.borrow_mut() = Some(MarketQuote {
      price_usd: market_cap_usd / whole_tokens,
      circulating_supply: TOKEN_SUPPLY,
      native_price_usd: usd(100),
      volume_change_bps: 250,
    })
  });
}

pub fn set_market_unavailable() {
  MARKET.with(|m| *m.borrow_mut() = None);
}

pub fn set_now_ms(now: u64) {
  NOW_MS.with(|n| *n.borrow_mut() = now);
}

pub fn set_swap_rate(rate: Balance) {
  SWAP_RATE.with(|r| *r.borrow_mut() = rate);
}

pub fn set_tick_interval(blocks: u64) {
  TICK_INTERVAL.with(|i| *i.borrow_mut() = blocks);
}

pub fn set_retry_cooldown(blocks: u64) {
  RETRY_COOLDOWN.with(|c| *c.borrow_mut() = blocks);
}

pub fn set_swap_shortfall(shortfall: Permill) {
  SWAP_SHORTFALL.with(|s| *s.borrow_mut() = shortfall);
}

/// Make the next `times` calls of `step` fail before touching any balance.
pub fn fail_next(step: PipelineStep, times: u32) {
  FAILURES.with(|f| f.borrow_mut()[slot(step)] = times);
}

pub fn reenter_on_next_claim() {
  REENTER_ON_CLAIM.with(|r| *r.borrow_mut() = true);
}

pub fn reentry_result() -> Option<Result<TickOutcome, DispatchError>> {
  REENTRY_RESULT.with(|r| r.borrow().clone())
}

pub fn calls(step: PipelineStep) -> u32 {
  CALLS.with(|c| c.borrow()[slot(step)])
}

pub fn set_dev_hooks(enabled: bool) {
  DEV_HOOKS.with(|d| *d.borrow_mut() = enabled);
}

/// Accrue `amount` native creator fees in the fee vault.
pub fn accrue_fees(amount: Balance) {
  polkadot_sdk::frame_support::assert_ok!(<Balances as NativeMutate<AccountId>>::mint_into(
    &fee_vault(), amount
  ));
}

/// Account where creator fees accrue until claimed.
pub fn fee_vault() -> AccountId {
  PalletId(*CREATOR_FEE_VAULT_ID).into_account_truncating()
}

pub fn wallet() -> AccountId {
  MilestoneBuyback::account_id()
}

pub fn token_balance(who: AccountId) -> Balance {
  <Assets as FungiblesInspect<AccountId>>::balance(TOKEN_ID, &who)
}

pub struct MockMarket;
impl crate::MarketData for MockMarket {
  fn quote() -> Option<MarketQuote> {
    MARKET.with(|m| *m.borrow())
  }
}

pub struct MockTime;
impl UnixTime for MockTime {
  fn now() -> Duration {
    Duration::from_millis(NOW_MS.with(|n| *n.borrow()))
  }
}

/// Constant-rate DEX: burns the native input and mints the token output.
pub struct MockDex;
impl TokenSwap<AccountId> for MockDex {
  fn quote_native_to_token(token: AssetKind, native_in: Balance) -> Option<Balance> {
    if token != AssetKind::Local(TOKEN_ID) {
      return None;
    }
    let rate = SWAP_RATE.with(|r| *r.borrow());
    Some(native_in.saturating_mul(rate) / PRECISION)
  }

  fn swap_native_to_token(
    who: &AccountId,
    token: AssetKind,
    native_in: Balance,
    min_out: Balance,
  ) -> Result<Balance, DispatchError> {
    let quoted =
      Self::quote_native_to_token(token, native_in).ok_or(DispatchError::Other("NoPool"))?;
    let shortfall = SWAP_SHORTFALL.with(|s| *s.borrow());
    let out = quoted.saturating_sub(shortfall.mul_floor(quoted));
    if out < min_out {
      return Err(DispatchError::Other("SlippageExceeded"));
    }
    <Balances as NativeMutate<AccountId>>::burn_from(
      who,
      native_in,
      Preservation::Expendable,
      Precision::Exact,
      Fortitude::Polite,
    )?;
    if out > 0 {
      <Assets as FungiblesMutate<AccountId>>::mint_into(TOKEN_ID, who, out)?;
    }
    Ok(out)
  }
}

pub struct FeeVault;
impl Get<AccountId> for FeeVault {
  fn get() -> AccountId {
    fee_vault()
  }
}

pub struct TokenAsset;
impl Get<AssetKind> for TokenAsset {
  fn get() -> AssetKind {
    AssetKind::Local(TOKEN_ID)
  }
}

pub struct BuybackRatio;
impl Get<Permill> for BuybackRatio {
  fn get() -> Permill {
    BUYBACK_RATIO
  }
}

pub struct SlippageTolerance;
impl Get<Permill> for SlippageTolerance {
  fn get() -> Permill {
    BUYBACK_SLIPPAGE_TOLERANCE
  }
}

pub struct MilestoneBuybackPalletId;
impl Get<PalletId> for MilestoneBuybackPalletId {
  fn get() -> PalletId {
    PalletId(*MILESTONE_BUYBACK_PALLET_ID)
  }
}

pub struct TickInterval;
impl Get<u64> for TickInterval {
  fn get() -> u64 {
    TICK_INTERVAL.with(|i| *i.borrow())
  }
}

pub struct RetryCooldown;
impl Get<u64> for RetryCooldown {
  fn get() -> u64 {
    RETRY_COOLDOWN.with(|c| *c.borrow())
  }
}

pub struct DevHooksEnabled;
impl Get<bool> for DevHooksEnabled {
  fn get() -> bool {
    DEV_HOOKS.with(|d| *d.borrow())
  }
}

type ChainExecutor = FungiblesExecutor<
  Test,
  Balances,
  Assets,
  MockDex,
  FeeVault,
  TokenAsset,
  SlippageTolerance,
>;

/// Counts calls and injects failures in front of the fungibles executor.
pub struct MockExecutor;

impl MockExecutor {
  fn enter(step: PipelineStep) -> Result<(), DispatchError> {
    CALLS.with(|c| c.borrow_mut()[slot(step)] += 1);
    FAILURES.with(|f| {
      let mut failures = f.borrow_mut();
      if failures[slot(step)] > 0 {
        failures[slot(step)] -= 1;
        return Err(DispatchError::Other("rpc timeout"));
      }
      Ok(())
    })
  }
}

impl TransactionExecutor<AccountId> for MockExecutor {
  fn claim_fees(wallet: &AccountId) -> Result<ClaimReceipt, DispatchError> {
    Self::enter(PipelineStep::Claim)?;
    if REENTER_ON_CLAIM.with(|r| r.replace(false)) {
      let result = MilestoneBuyback::tick(System::block_number()).map_err(DispatchError::from);
      REENTRY_RESULT.with(|r| *r.borrow_mut() = Some(result));
    }
    ChainExecutor::claim_fees(wallet)
  }

  fn buyback(wallet: &AccountId, spend: Balance) -> Result<BuybackReceipt, DispatchError> {
    Self::enter(PipelineStep::Buyback)?;
    ChainExecutor::buyback(wallet, spend)
  }

  fn burn(wallet: &AccountId, tokens: Balance) -> Result<BurnReceipt, DispatchError> {
    Self::enter(PipelineStep::Burn)?;
    ChainExecutor::burn(wallet, tokens)
  }
}

impl pallet_milestone_buyback::Config for Test {
  type MarketData = MockMarket;
  type Executor = MockExecutor;
  type TimeProvider = MockTime;
  type AdminOrigin = EnsureRoot<AccountId>;
  type WeightInfo = ();
  type PalletId = MilestoneBuybackPalletId;
  type TokenAsset = TokenAsset;
  type GoalStepUsd = ConstU128<GOAL_STEP_USD>;
  type BuybackRatio = BuybackRatio;
  type TokenUnit = ConstU128<TOKEN_UNIT>;
  type NativeUnit = ConstU128<NATIVE_UNIT>;
  type TokenTotalSupply = ConstU128<TOKEN_SUPPLY>;
  type TickInterval = TickInterval;
  type RetryCooldown = RetryCooldown;
  type MaxDashboardEntries = ConstU32<DASHBOARD_ENTRIES>;
  type DevHooksEnabled = DevHooksEnabled;
  #[cfg(feature = "runtime-benchmarks")]
  type BenchmarkHelper = MockBenchmarkHelper;
}

#[cfg(feature = "runtime-benchmarks")]
pub struct MockBenchmarkHelper;

#[cfg(feature = "runtime-benchmarks")]
impl crate::BenchmarkHelper<AccountId> for MockBenchmarkHelper {
  fn prepare_goal_crossing(
    _wallet: &AccountId,
    market_cap_usd: u128,
  ) -> polkadot_sdk::sp_runtime::DispatchResult {
    set_market_cap_scaled(market_cap_usd);
    <Balances as NativeMutate<AccountId>>::mint_into(&fee_vault(), 2 * NATIVE_UNIT)?;
    Ok(())
  }
}

/// Advance to the next block and tick there directly.
pub fn next_tick() -> Result<TickOutcome, DispatchError> {
  let next = System::block_number() + 1;
  System::set_block_number(next);
  MilestoneBuyback::tick(next).map_err(DispatchError::from)
}

/// Run blocks through the idle hook with unlimited weight.
pub fn run_to_block(n: u64) {
  while System::block_number() < n {
    let next = System::block_number() + 1;
    System::set_block_number(next);
    MilestoneBuyback::on_idle(next, Weight::MAX);
  }
}

pub fn new_test_ext() -> polkadot_sdk::sp_io::TestExternalities {
  new_test_ext_with(pallet_milestone_buyback::GenesisConfig::<Test>::default())
}

pub fn new_test_ext_with(
  genesis: pallet_milestone_buyback::GenesisConfig<Test>,
) -> polkadot_sdk::sp_io::TestExternalities {
  reset_mocks();
  let mut t = frame_system::GenesisConfig::<Test>::default()
    .build_storage()
    .unwrap();

  polkadot_sdk::pallet_assets::GenesisConfig::<Test> {
    assets: alloc::vec![(TOKEN_ID, ALICE, true, 1)],
    metadata: alloc::vec![],
    accounts: alloc::vec![],
    reserves: alloc::vec![],
    next_asset_id: None,
  }
  .assimilate_storage(&mut t)
  .unwrap();

  genesis
    .assimilate_storage(&mut t)
    .unwrap();

  let mut ext: polkadot_sdk::sp_io::TestExternalities = t.into();
  ext.execute_with(|| System::set_block_number(1));
  ext
}
