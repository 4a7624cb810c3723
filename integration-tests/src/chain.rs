//! `MockChain`: read, submit and block-production access to one forked chain.

use core::fmt;

use parity_scale_codec::{Decode, Encode};
use subxt::{
    OnlineClient, PolkadotConfig,
    backend::rpc::{RpcClient, RpcParams},
    dynamic::Value,
    ext::scale_value::At,
    tx::Payload,
    utils::{AccountId32, H256},
};
use tracing::{debug, info};
use xcm::{VersionedLocation, v4::Location};

use crate::{
    config::{ASSET_HUB_PORT, PARACHAIN_PORT, RELAY_PORT},
    error::{Error, Result},
    fixture::{ChainFixture, StorageOverride},
    signer::DevAccount,
};

/// Token kinds the harness moves around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    /// Native token of the chain being touched.
    Para,
    /// The relay chain's token, a foreign asset everywhere except the relay.
    Relay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainKind {
    Parachain,
    Relay,
    AssetHub,
}

/// Where a token's balance is kept on a given chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceSource {
    /// `System.Account.data.free`
    Native,
    /// `ForeignAssets.Account(relay location, who).balance`
    RelayForeignAsset,
}

impl ChainKind {
    pub const ALL: [ChainKind; 3] = [ChainKind::Parachain, ChainKind::Relay, ChainKind::AssetHub];

    pub fn local_port(&self) -> u16 {
        match self {
            ChainKind::Parachain => PARACHAIN_PORT,
            ChainKind::Relay => RELAY_PORT,
            ChainKind::AssetHub => ASSET_HUB_PORT,
        }
    }

    pub fn local_endpoint(&self) -> String {
        format!("ws://127.0.0.1:{}", self.local_port())
    }

    /// Pallet dispatching `execute` for locally built XCM programs.
    pub fn xcm_pallet(&self) -> &'static str {
        match self {
            ChainKind::Relay => "XcmPallet",
            ChainKind::Parachain | ChainKind::AssetHub => "PolkadotXcm",
        }
    }

    pub fn balance_source(&self, token: Token) -> Result<BalanceSource> {
        match (self, token) {
            (ChainKind::Parachain, Token::Para) => Ok(BalanceSource::Native),
            (ChainKind::Parachain, Token::Relay) => Ok(BalanceSource::RelayForeignAsset),
            (ChainKind::Relay | ChainKind::AssetHub, Token::Relay) => Ok(BalanceSource::Native),
            (chain, token) => Err(Error::UnsupportedToken { chain: *chain, token }),
        }
    }

    pub fn storage_override(
        &self,
        who: AccountId32,
        token: Token,
        amount: u128,
    ) -> Result<StorageOverride> {
        Ok(match self.balance_source(token)? {
            BalanceSource::Native => StorageOverride::NativeAccount { who, free: amount },
            BalanceSource::RelayForeignAsset => {
                StorageOverride::RelayForeignAsset { who, balance: amount }
            }
        })
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChainKind::Parachain => "parachain",
            ChainKind::Relay => "relay",
            ChainKind::AssetHub => "asset-hub",
        };
        f.write_str(name)
    }
}

/// Result of a submitted transaction once it is finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Whether the extrinsic dispatched successfully (`System.ExtrinsicSuccess`).
    pub ok: bool,
    pub block_hash: H256,
}

/// Error half of `LocationToAccountApi::convert_location`.
#[derive(Debug, Decode)]
enum ConversionError {
    Unsupported,
    VersionedConversionFailed,
}

fn relay_location_value() -> Value {
    Value::named_composite([
        ("parents", Value::u128(1)),
        ("interior", Value::unnamed_variant("Here", Vec::<Value>::new())),
    ])
}

fn balance_at<T>(value: &subxt::ext::scale_value::Value<T>, path: &[&str]) -> Result<u128> {
    let mut cursor = Some(value);
    for field in path {
        cursor = cursor.and_then(|v| v.at(*field));
    }
    cursor
        .and_then(|v| v.as_u128())
        .ok_or_else(|| Error::Decode(format!("no numeric field at {}", path.join("."))))
}

pub struct MockChain {
    kind: ChainKind,
    rpc: RpcClient,
    client: OnlineClient<PolkadotConfig>,
}

impl MockChain {
    pub async fn connect(kind: ChainKind, endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        let rpc = RpcClient::from_url(&endpoint).await?;
        let client = OnlineClient::<PolkadotConfig>::from_rpc_client(rpc.clone()).await?;
        info!(chain = %kind, %endpoint, "connected");
        Ok(Self {
            kind,
            rpc,
            client,
        })
    }

    /// State injection for test setup.
    pub fn fixture(&self) -> ChainFixture<'_> {
        ChainFixture::new(self.kind, &self.rpc)
    }

    /// Current balances, in request order.
    pub async fn get_tokens(&self, queries: &[(AccountId32, Token)]) -> Result<Vec<u128>> {
        let storage = self.client.storage().at_latest().await?;
        let mut balances = Vec::with_capacity(queries.len());

        for (who, token) in queries {
            let balance = match self.kind.balance_source(*token)? {
                BalanceSource::Native => {
                    let address = subxt::dynamic::storage(
                        "System",
                        "Account",
                        vec![Value::from_bytes(who.0)],
                    );
                    let account = storage.fetch_or_default(&address).await?.to_value().map_err(subxt::Error::from)?;
                    balance_at(&account, &["data", "free"])?
                }
                BalanceSource::RelayForeignAsset => {
                    let address = subxt::dynamic::storage(
                        "ForeignAssets",
                        "Account",
                        vec![relay_location_value(), Value::from_bytes(who.0)],
                    );
                    match storage.fetch(&address).await? {
                        Some(account) => balance_at(&account.to_value().map_err(subxt::Error::from)?, &["balance"])?,
                        None => 0,
                    }
                }
            };
            debug!(chain = %self.kind, %who, ?token, balance, "balance read");
            balances.push(balance);
        }
        Ok(balances)
    }

    pub async fn get_token(&self, who: &AccountId32, token: Token) -> Result<u128> {
        let balances = self.get_tokens(&[(who.clone(), token)]).await?;
        balances
            .first()
            .copied()
            .ok_or_else(|| Error::Decode("empty balance response".to_string()))
    }

    /// Produce one block, delivering any queued inbound messages.
    pub async fn new_block(&self) -> Result<String> {
        let hash: String = self.rpc.request("dev_newBlock", RpcParams::new()).await?;
        info!(chain = %self.kind, %hash, "block produced");
        Ok(hash)
    }

    /// Sign, submit and wait for finalization.
    ///
    /// A dispatch failure is reported through [`TransferOutcome::ok`], not as an error.
    pub async fn submit<Call: Payload>(
        &self,
        call: &Call,
        signer: &DevAccount,
    ) -> Result<TransferOutcome> {
        let progress = self
            .client
            .tx()
            .sign_and_submit_then_watch_default(call, signer.keypair())
            .await?;
        let in_block = progress.wait_for_finalized().await?;

        let mut ok = false;
        for event in in_block.fetch_events().await?.iter() {
            let event = event?;
            if event.pallet_name() != "System" {
                continue;
            }
            match event.variant_name() {
                "ExtrinsicSuccess" => ok = true,
                "ExtrinsicFailed" => ok = false,
                _ => {}
            }
        }

        let outcome = TransferOutcome {
            ok,
            block_hash: in_block.block_hash(),
        };
        info!(chain = %self.kind, ok, block = ?outcome.block_hash, "transaction finalized");
        Ok(outcome)
    }

    /// Account `location` resolves to on this chain (`LocationToAccountApi`).
    pub async fn convert_location(&self, location: Location) -> Result<AccountId32> {
        let args = VersionedLocation::V4(location).encode();
        let converted: core::result::Result<AccountId32, ConversionError> = self
            .client
            .runtime_api()
            .at_latest()
            .await?
            .call_raw("LocationToAccountApi_convert_location", Some(args.as_slice()))
            .await?;

        converted.map_err(|e| {
            debug!(chain = %self.kind, error = ?e, "location conversion refused");
            Error::SovereignAccount { chain: self.kind }
        })
    }
}
