//! The forked relay, parachain and asset hub, wired together.

use subxt::utils::AccountId32;
use tracing::info;
use xcm::v4::{Junction, Location};

use crate::{
    chain::{ChainKind, MockChain},
    chopsticks::Chopsticks,
    config::{Config, RuntimeImage},
    error::Result,
    transfers::TransferBuilder,
};

/// Handles to the three forks plus the parachain's sovereign accounts on the
/// other two. The forks stop when this is dropped.
pub struct MockNetwork {
    pub parachain: MockChain,
    pub relay: MockChain,
    pub asset_hub: MockChain,
    pub para_sov_acc_on_relay: AccountId32,
    pub para_sov_acc_on_asset_hub: AccountId32,
    transfers: TransferBuilder,
    _chopsticks: Chopsticks,
}

impl MockNetwork {
    /// Launch the forks with the parachain running `image`.
    pub async fn setup(config: &Config, image: RuntimeImage) -> Result<Self> {
        let chopsticks = Chopsticks::launch(config, image).await?;

        let parachain =
            MockChain::connect(ChainKind::Parachain, chopsticks.endpoint(ChainKind::Parachain))
                .await?;
        let relay =
            MockChain::connect(ChainKind::Relay, chopsticks.endpoint(ChainKind::Relay)).await?;
        let asset_hub =
            MockChain::connect(ChainKind::AssetHub, chopsticks.endpoint(ChainKind::AssetHub))
                .await?;

        let para_sov_acc_on_relay = relay
            .convert_location(Location::new(0, Junction::Parachain(config.para_id)))
            .await?;
        let para_sov_acc_on_asset_hub = asset_hub
            .convert_location(Location::new(1, Junction::Parachain(config.para_id)))
            .await?;
        info!(
            para_id = config.para_id,
            on_relay = %para_sov_acc_on_relay,
            on_asset_hub = %para_sov_acc_on_asset_hub,
            "sovereign accounts resolved"
        );

        Ok(Self {
            parachain,
            relay,
            asset_hub,
            para_sov_acc_on_relay,
            para_sov_acc_on_asset_hub,
            transfers: TransferBuilder::new(config.para_id),
            _chopsticks: chopsticks,
        })
    }

    pub fn chain(&self, kind: ChainKind) -> &MockChain {
        match kind {
            ChainKind::Parachain => &self.parachain,
            ChainKind::Relay => &self.relay,
            ChainKind::AssetHub => &self.asset_hub,
        }
    }

    /// The parachain's sovereign account on `kind`; the parachain has none on itself.
    pub fn sovereign_account(&self, kind: ChainKind) -> Option<&AccountId32> {
        match kind {
            ChainKind::Parachain => None,
            ChainKind::Relay => Some(&self.para_sov_acc_on_relay),
            ChainKind::AssetHub => Some(&self.para_sov_acc_on_asset_hub),
        }
    }

    pub fn transfers(&self) -> TransferBuilder {
        self.transfers
    }
}
