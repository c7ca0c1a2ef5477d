//! Adapter traits for the milestone buyback pallet
//!
//! Market data and the three chain operations are abstracted behind traits so the
//! orchestrator stays independent of any concrete DEX, oracle or fee mechanism.

use frame::deps::frame_support::traits::{
  fungible::{Inspect as NativeInspect, Mutate as NativeMutate},
  fungibles::{Inspect as FungiblesInspect, Mutate as FungiblesMutate},
  tokens::{Fortitude, Precision, Preservation},
};
use frame::deps::sp_runtime::{DispatchError, Permill};
use frame::prelude::*;
use polkadot_sdk::sp_io::hashing::blake2_256;
use primitives::{AssetInspector, AssetKind};

/// Opaque on-chain reference of an executed operation.
pub type TxReference = [u8; 32];

/// Raw market reading handed to the pallet once per tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MarketQuote {
  /// Token price in USD, `PRECISION`-scaled, per whole token.
  pub price_usd: u128,
  /// Circulating supply in token base units.
  pub circulating_supply: u128,
  /// Native asset price in USD, `PRECISION`-scaled, per whole native unit.
  pub native_price_usd: u128,
  /// 24h volume change in basis points.
  pub volume_change_bps: i32,
}

/// Source of market data. `None` means the source is temporarily unavailable.
pub trait MarketData {
  fn quote() -> Option<MarketQuote>;
}

/// No market data: every tick is skipped.
impl MarketData for () {
  fn quote() -> Option<MarketQuote> {
    None
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClaimReceipt {
  /// Native amount moved into the wallet.
  pub amount: u128,
  pub reference: TxReference,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuybackReceipt {
  pub tokens_bought: u128,
  pub reference: TxReference,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BurnReceipt {
  pub tokens_burned: u128,
  pub reference: TxReference,
}

/// The three chain operations of the pipeline.
///
/// Each call either returns a definite receipt or an error. Implementations resolve any
/// ambiguity of the underlying operation before returning.
pub trait TransactionExecutor<AccountId> {
  /// Collect accrued creator fees into `wallet`.
  fn claim_fees(wallet: &AccountId) -> Result<ClaimReceipt, DispatchError>;

  /// Spend exactly `spend` native from `wallet` on the monitored token.
  fn buyback(wallet: &AccountId, spend: u128) -> Result<BuybackReceipt, DispatchError>;

  /// Destroy exactly `tokens` of the monitored token held by `wallet`.
  fn burn(wallet: &AccountId, tokens: u128) -> Result<BurnReceipt, DispatchError>;
}

/// No-op `TransactionExecutor` for configurations without a wired executor.
impl<AccountId> TransactionExecutor<AccountId> for () {
  fn claim_fees(_: &AccountId) -> Result<ClaimReceipt, DispatchError> {
    Err(DispatchError::Other("TransactionExecutor not configured"))
  }

  fn buyback(_: &AccountId, _: u128) -> Result<BuybackReceipt, DispatchError> {
    Err(DispatchError::Other("TransactionExecutor not configured"))
  }

  fn burn(_: &AccountId, _: u128) -> Result<BurnReceipt, DispatchError> {
    Err(DispatchError::Other("TransactionExecutor not configured"))
  }
}

/// DEX capabilities needed for the buyback leg.
pub trait TokenSwap<AccountId> {
  /// Expected token output for `native_in`, without executing anything.
  fn quote_native_to_token(token: AssetKind, native_in: u128) -> Option<u128>;

  /// Swap exactly `native_in` for at least `min_out` tokens, returning the tokens received.
  fn swap_native_to_token(
    who: &AccountId,
    token: AssetKind,
    native_in: u128,
    min_out: u128,
  ) -> Result<u128, DispatchError>;
}

/// `TransactionExecutor` over the fungible traits.
///
/// - claim: drains the reducible native balance of the `FeeVault` account into the wallet.
/// - buyback: swaps native for `Token` through `Dex`, bounded by `Slippage` below the quote.
/// - burn: burns `Token` from the wallet with exact precision.
pub struct FungiblesExecutor<T, Currency, Assets, Dex, FeeVault, Token, Slippage>(
  PhantomData<(T, Currency, Assets, Dex, FeeVault, Token, Slippage)>,
);

impl<T, Currency, Assets, Dex, FeeVault, Token, Slippage> TransactionExecutor<T::AccountId>
  for FungiblesExecutor<T, Currency, Assets, Dex, FeeVault, Token, Slippage>
where
  T: frame_system::Config,
  Currency: NativeInspect<T::AccountId, Balance = u128> + NativeMutate<T::AccountId, Balance = u128>,
  Assets: FungiblesInspect<T::AccountId, AssetId = u32, Balance = u128>
    + FungiblesMutate<T::AccountId, AssetId = u32, Balance = u128>,
  Dex: TokenSwap<T::AccountId>,
  FeeVault: Get<T::AccountId>,
  Token: Get<AssetKind>,
  Slippage: Get<Permill>,
{
  fn claim_fees(wallet: &T::AccountId) -> Result<ClaimReceipt, DispatchError> {
    let vault = FeeVault::get();
    let amount = Currency::reducible_balance(&vault, Preservation::Expendable, Fortitude::Polite);
    if amount > 0 {
      Currency::transfer(&vault, wallet, amount, Preservation::Expendable)?;
    }
    Ok(ClaimReceipt {
      amount,
      reference: operation_reference::<T>(b"claim", wallet, amount),
    })
  }

  fn buyback(wallet: &T::AccountId, spend: u128) -> Result<BuybackReceipt, DispatchError> {
    let token = Token::get();
    let quote = Dex::quote_native_to_token(token, spend)
      .ok_or(DispatchError::Other("BuybackQuoteUnavailable"))?;
    let min_out = quote.saturating_sub(Slippage::get().mul_floor(quote));
    let tokens_bought = Dex::swap_native_to_token(wallet, token, spend, min_out)?;
    Ok(BuybackReceipt {
      tokens_bought,
      reference: operation_reference::<T>(b"buyback", wallet, spend),
    })
  }

  fn burn(wallet: &T::AccountId, tokens: u128) -> Result<BurnReceipt, DispatchError> {
    let asset_id = Token::get()
      .local_id()
      .ok_or(DispatchError::Other("TokenNotBurnable"))?;
    let tokens_burned = Assets::burn_from(
      asset_id,
      wallet,
      tokens,
      Preservation::Expendable,
      Precision::Exact,
      Fortitude::Polite,
    )?;
    Ok(BurnReceipt {
      tokens_burned,
      reference: operation_reference::<T>(b"burn", wallet, tokens),
    })
  }
}

/// Digest identifying one operation within the current block.
fn operation_reference<T: frame_system::Config>(
  tag: &'static [u8],
  wallet: &T::AccountId,
  amount: u128,
) -> TxReference {
  let block = frame_system::Pallet::<T>::block_number();
  let event_count = frame_system::Pallet::<T>::event_count();
  blake2_256(&(tag, block, event_count, wallet, amount).encode())
}
