#![cfg_attr(rustfmt, rustfmt_skip)]
#![allow(unused_parens)]
#![allow(unused_imports)]
#![allow(missing_docs)]

use core::marker::PhantomData;
use polkadot_sdk::frame_support::{
  traits::Get,
  weights::{constants::RocksDbWeight, Weight},
};

pub trait WeightInfo {
  fn process_goal() -> Weight;
  fn idle_tick() -> Weight;
  fn bump_market_cap() -> Weight;
  fn reset_market_cap_bump() -> Weight;
}

pub struct SubstrateWeight<T>(PhantomData<T>);
impl<T: polkadot_sdk::frame_system::Config + crate::Config> WeightInfo for SubstrateWeight<T> {
  /// Full pipeline: snapshot, three executor calls with their balance and asset writes,
  /// three ledger appends and the ladder update.
  fn process_goal() -> Weight {
    Weight::from_parts(180_000_000, 12_000)
      .saturating_add(T::DbWeight::get().reads(16))
      .saturating_add(T::DbWeight::get().writes(18))
  }

  fn idle_tick() -> Weight {
    Weight::from_parts(20_000_000, 2_000)
      .saturating_add(T::DbWeight::get().reads(5))
      .saturating_add(T::DbWeight::get().writes(2))
  }

  fn bump_market_cap() -> Weight {
    Weight::from_parts(10_000_000, 1_000)
      .saturating_add(T::DbWeight::get().reads(1))
      .saturating_add(T::DbWeight::get().writes(1))
  }

  fn reset_market_cap_bump() -> Weight {
    Weight::from_parts(8_000_000, 1_000)
      .saturating_add(T::DbWeight::get().writes(1))
  }
}

impl WeightInfo for () {
  fn process_goal() -> Weight {
    Weight::from_parts(180_000_000, 12_000)
      .saturating_add(RocksDbWeight::get().reads(16))
      .saturating_add(RocksDbWeight::get().writes(18))
  }

  fn idle_tick() -> Weight {
    Weight::from_parts(20_000_000, 2_000)
      .saturating_add(RocksDbWeight::get().reads(5))
      .saturating_add(RocksDbWeight::get().writes(2))
  }

  fn bump_market_cap() -> Weight {
    Weight::from_parts(10_000_000, 1_000)
      .saturating_add(RocksDbWeight::get().reads(1))
      .saturating_add(RocksDbWeight::get().writes(1))
  }

  fn reset_market_cap_bump() -> Weight {
    Weight::from_parts(8_000_000, 1_000)
      .saturating_add(RocksDbWeight::get().writes(1))
  }
}
