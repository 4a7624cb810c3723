//! Direct state injection for test setup.
//!
//! Overrides are written with the simulator's `dev_setStorage` RPC and bypass
//! transaction execution entirely. They live apart from [`MockChain`]'s read
//! and submit path so setup never gets mistaken for protocol behaviour.
//!
//! [`MockChain`]: crate::chain::MockChain

use serde::{Serialize, Serializer};
use subxt::{
    backend::rpc::{RpcClient, RpcParams},
    utils::AccountId32,
};
use tracing::{debug, info};

use crate::{
    chain::{ChainKind, Token},
    error::Result,
};

/// One storage shape the harness knows how to overwrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOverride {
    /// `System.Account`: free balance plus a provider reference.
    NativeAccount { who: AccountId32, free: u128 },
    /// `ForeignAssets.Asset` supply and `ForeignAssets.Account` balance of the
    /// relay token, keyed by `{ parents: 1, interior: Here }`.
    RelayForeignAsset { who: AccountId32, balance: u128 },
}

/// Location of the relay token as seen from a parachain, in the simulator's JSON form.
#[derive(Debug, Clone, Copy, Serialize)]
struct RelayLocation {
    parents: u8,
    interior: &'static str,
}

const RELAY_LOCATION: RelayLocation = RelayLocation {
    parents: 1,
    interior: "Here",
};

fn amount<S: Serializer>(value: &u128, serializer: S) -> core::result::Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[derive(Debug, Serialize)]
struct AccountData {
    #[serde(serialize_with = "amount")]
    free: u128,
}

#[derive(Debug, Serialize)]
struct AccountInfo {
    providers: u32,
    data: AccountData,
}

#[derive(Debug, Serialize)]
struct AssetDetails {
    #[serde(serialize_with = "amount")]
    supply: u128,
}

#[derive(Debug, Serialize)]
struct AssetAccount {
    #[serde(serialize_with = "amount")]
    balance: u128,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SystemChanges {
    account: Vec<((String,), AccountInfo)>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ForeignAssetChanges {
    asset: Vec<((RelayLocation,), AssetDetails)>,
    account: Vec<((RelayLocation, String), AssetAccount)>,
}

/// The `dev_setStorage` payload, grouped by pallet and storage item.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<SystemChanges>,
    #[serde(skip_serializing_if = "Option::is_none")]
    foreign_assets: Option<ForeignAssetChanges>,
}

impl ChangeSet {
    pub fn from_overrides(overrides: &[StorageOverride]) -> Self {
        let mut changes = ChangeSet::default();
        let mut relay_supply: Option<u128> = None;

        for entry in overrides {
            match entry {
                StorageOverride::NativeAccount { who, free } => {
                    changes.system.get_or_insert_with(Default::default).account.push((
                        (who.to_string(),),
                        AccountInfo {
                            providers: 1,
                            data: AccountData { free: *free },
                        },
                    ));
                }
                StorageOverride::RelayForeignAsset { who, balance } => {
                    changes
                        .foreign_assets
                        .get_or_insert_with(Default::default)
                        .account
                        .push((
                            (RELAY_LOCATION, who.to_string()),
                            AssetAccount { balance: *balance },
                        ));
                    relay_supply = Some(relay_supply.unwrap_or(0).saturating_add(*balance));
                }
            }
        }

        if let (Some(supply), Some(assets)) = (relay_supply, changes.foreign_assets.as_mut()) {
            assets.asset.push(((RELAY_LOCATION,), AssetDetails { supply }));
        }
        changes
    }

    pub fn is_empty(&self) -> bool {
        self.system.is_none() && self.foreign_assets.is_none()
    }
}

/// State-injection handle for one chain.
pub struct ChainFixture<'a> {
    chain: ChainKind,
    rpc: &'a RpcClient,
}

impl<'a> ChainFixture<'a> {
    pub(crate) fn new(chain: ChainKind, rpc: &'a RpcClient) -> Self {
        Self { chain, rpc }
    }

    /// Overwrite balances. Each entry is `(who, token, amount)`.
    ///
    /// Fails with [`Error::UnsupportedToken`](crate::Error::UnsupportedToken)
    /// before touching the chain if any token kind is not stored here.
    pub async fn set_tokens(&self, entries: &[(AccountId32, Token, u128)]) -> Result<()> {
        let overrides = entries
            .iter()
            .map(|(who, token, amount)| self.chain.storage_override(who.clone(), *token, *amount))
            .collect::<Result<Vec<_>>>()?;
        self.set_storage(&overrides).await
    }

    pub async fn set_storage(&self, overrides: &[StorageOverride]) -> Result<()> {
        let changes = ChangeSet::from_overrides(overrides);
        if changes.is_empty() {
            return Ok(());
        }
        debug!(chain = %self.chain, ?changes, "dev_setStorage");

        let mut params = RpcParams::new();
        params.push(&changes)?;
        let _: serde_json::Value = self.rpc.request("dev_setStorage", params).await?;

        info!(chain = %self.chain, entries = overrides.len(), "storage overridden");
        Ok(())
    }
}
