//! Reserve transfers with the parachain on its current runtime.
//!
//! Two routes misbehave here: leaving the parachain for the asset hub is
//! refused outright, and tokens sent from the asset hub never reach the
//! receiver but pile up in the parachain's sovereign account instead.

mod common;

use anyhow::Result;
use serial_test::serial;
use xcm_reserve_transfer_tests::{
    config::RuntimeImage,
    scenario::{Expect, Expected},
    transfers::Route,
};

#[test_log::test(tokio::test)]
#[ignore = "requires chopsticks and live RPC endpoints"]
#[serial(chopsticks)]
async fn from_para_to_relay() -> Result<()> {
    let harness = common::setup(RuntimeImage::Before).await?;
    let report = common::run(&harness, Route::ParachainToRelay).await?;

    report.check(&Expected {
        ok: true,
        sender: Expect::Decreased,
        receiver: Expect::Increased,
        sovereign: Expect::Decreased,
    })?;
    Ok(())
}

#[test_log::test(tokio::test)]
#[ignore = "requires chopsticks and live RPC endpoints"]
#[serial(chopsticks)]
async fn from_relay_to_para() -> Result<()> {
    let harness = common::setup(RuntimeImage::Before).await?;
    let report = common::run(&harness, Route::RelayToParachain).await?;

    report.check(&Expected {
        ok: true,
        sender: Expect::Decreased,
        receiver: Expect::Increased,
        // Fees are taken before the deposit.
        sovereign: Expect::LessThan(report.amount),
    })?;
    Ok(())
}

#[test_log::test(tokio::test)]
#[ignore = "requires chopsticks and live RPC endpoints"]
#[serial(chopsticks)]
async fn from_para_to_asset_hub() -> Result<()> {
    let harness = common::setup(RuntimeImage::Before).await?;
    let report = common::run(&harness, Route::ParachainToAssetHub).await?;

    // Fees are paid in the parachain token, so nothing moves at all.
    report.check(&Expected {
        ok: false,
        sender: Expect::Unchanged,
        receiver: Expect::Unchanged,
        sovereign: Expect::Unchanged,
    })?;
    Ok(())
}

#[test_log::test(tokio::test)]
#[ignore = "requires chopsticks and live RPC endpoints"]
#[serial(chopsticks)]
async fn from_asset_hub_to_para() -> Result<()> {
    let harness = common::setup(RuntimeImage::Before).await?;
    let report = common::run(&harness, Route::AssetHubToParachain).await?;

    // Execution fails on the parachain and the tokens stay in reserve.
    report.check(&Expected {
        ok: true,
        sender: Expect::Decreased,
        receiver: Expect::Unchanged,
        sovereign: Expect::Increased,
    })?;
    Ok(())
}
