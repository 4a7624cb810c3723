// Shared by before_upgrade.rs and after_upgrade.rs.

use std::{future::Future, time::Duration};

use anyhow::{Context, Result};
use xcm_reserve_transfer_tests::{
    config::{Config, RuntimeImage},
    network::MockNetwork,
    scenario::{Scenario, ScenarioReport},
    signer::DevAccount,
    transfers::Route,
};

/// Wall-clock cap on one scenario once the forks are up.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(100);

pub struct Harness {
    pub config: Config,
    pub network: MockNetwork,
    pub alice: DevAccount,
}

pub async fn setup(image: RuntimeImage) -> Result<Harness> {
    let config = Config::from_env().context("reading harness configuration")?;
    let network = MockNetwork::setup(&config, image)
        .await
        .with_context(|| format!("launching {} forks ({image:?} runtime)", config.network))?;
    let alice = DevAccount::alice()?;
    Ok(Harness {
        config,
        network,
        alice,
    })
}

pub async fn with_timeout<T>(fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(TEST_TIMEOUT, fut)
        .await
        .with_context(|| format!("scenario exceeded {TEST_TIMEOUT:?}"))?
}

pub fn scenario(harness: &Harness, route: Route) -> Result<Scenario> {
    let counterparty = route.counterparty();
    let sovereign = harness
        .network
        .sovereign_account(counterparty)
        .with_context(|| format!("no sovereign account on {counterparty}"))?;
    Ok(Scenario::reserve_transfer(
        route,
        &harness.config,
        &harness.alice.account_id(),
        sovereign,
    ))
}

pub async fn run(harness: &Harness, route: Route) -> Result<ScenarioReport> {
    let scenario = scenario(harness, route)?;
    with_timeout(async {
        scenario
            .run(&harness.network, &harness.alice)
            .await
            .with_context(|| format!("running {route:?}"))
    })
    .await
}
