//! Reserve-backed transfers of the relay token between the three chains.
//!
//! Every route runs the same program on the source chain:
//!
//! 1. `WithdrawAsset` the amount of the source's view of the relay token.
//! 2. `InitiateReserveWithdraw` when leaving the parachain, `DepositReserveAsset`
//!    when leaving the relay or the asset hub.
//! 3. On the destination: `BuyExecution` paying half the amount, unlimited
//!    weight, then `DepositAsset` everything to the beneficiary.
//!
//! The builders never fail. Bad amounts or beneficiaries surface only when the
//! chain executes the program.

use parity_scale_codec::Encode;
use sp_weights::Weight;
use subxt::{
    Metadata,
    ext::subxt_core::{self, error::MetadataError},
    tx::Payload,
};
use xcm::{
    VersionedXcm,
    v4::{
        Asset, AssetFilter, AssetId, Fungibility, Instruction, Junction, Location, WeightLimit,
        WildAsset, Xcm,
    },
};

use crate::{chain::ChainKind, config::ASSET_HUB_ID};

/// Weight ceiling of the outer `execute` call, identical for every route.
pub const MAX_WEIGHT: Weight = Weight::from_parts(2_000_000_000, 200_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    ParachainToRelay,
    RelayToParachain,
    ParachainToAssetHub,
    AssetHubToParachain,
}

impl Route {
    pub const ALL: [Route; 4] = [
        Route::ParachainToRelay,
        Route::RelayToParachain,
        Route::ParachainToAssetHub,
        Route::AssetHubToParachain,
    ];

    pub fn source(&self) -> ChainKind {
        match self {
            Route::ParachainToRelay | Route::ParachainToAssetHub => ChainKind::Parachain,
            Route::RelayToParachain => ChainKind::Relay,
            Route::AssetHubToParachain => ChainKind::AssetHub,
        }
    }

    pub fn destination(&self) -> ChainKind {
        match self {
            Route::ParachainToRelay => ChainKind::Relay,
            Route::ParachainToAssetHub => ChainKind::AssetHub,
            Route::RelayToParachain | Route::AssetHubToParachain => ChainKind::Parachain,
        }
    }

    /// The side of the route that is not the parachain; it holds the
    /// parachain's sovereign account.
    pub fn counterparty(&self) -> ChainKind {
        match self.source() {
            ChainKind::Parachain => self.destination(),
            other => other,
        }
    }
}

/// Second instruction of the program.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Hop {
    InitiateReserveWithdraw { reserve: Location },
    DepositReserveAsset { dest: Location },
}

/// Per-route locations, relative to the chain that interprets them.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RouteTemplate {
    withdrawn: Location,
    hop: Hop,
    fee_asset: Location,
}

/// An unsigned `<XcmPallet>::execute(message, max_weight)` call.
///
/// The call index is resolved from the chain's metadata when the transaction
/// is encoded, so the same value can be handed to any client.
#[derive(Debug, Clone)]
pub struct ExecuteXcm {
    pallet: &'static str,
    message: VersionedXcm<()>,
    max_weight: Weight,
}

impl ExecuteXcm {
    pub fn pallet(&self) -> &'static str {
        self.pallet
    }

    pub fn message(&self) -> &VersionedXcm<()> {
        &self.message
    }

    pub fn max_weight(&self) -> Weight {
        self.max_weight
    }

    /// SCALE-encoded call arguments, without the pallet and call indices.
    pub fn encode_args(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.message.encode_to(&mut out);
        self.max_weight.encode_to(&mut out);
        out
    }
}

impl Payload for ExecuteXcm {
    fn encode_call_data_to(
        &self,
        metadata: &Metadata,
        out: &mut Vec<u8>,
    ) -> Result<(), subxt_core::Error> {
        let pallet = metadata.pallet_by_name_err(self.pallet)?;
        let call = pallet.call_variant_by_name("execute").ok_or_else(|| {
            subxt_core::Error::from(MetadataError::CallNameNotFound("execute".to_string()))
        })?;

        out.push(pallet.index());
        out.push(call.index);
        out.extend(self.encode_args());
        Ok(())
    }
}

/// Builds the transfer calls for a parachain with a given id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferBuilder {
    para_id: u32,
}

impl TransferBuilder {
    pub fn new(para_id: u32) -> Self {
        Self { para_id }
    }

    fn template(&self, route: Route) -> RouteTemplate {
        let relay_token_here = Location::here();
        let relay_token_from_para = Location::parent();

        match route {
            Route::ParachainToRelay => RouteTemplate {
                withdrawn: relay_token_from_para.clone(),
                hop: Hop::InitiateReserveWithdraw {
                    reserve: Location::parent(),
                },
                fee_asset: relay_token_here,
            },
            Route::RelayToParachain => RouteTemplate {
                withdrawn: relay_token_here,
                hop: Hop::DepositReserveAsset {
                    dest: Location::new(0, Junction::Parachain(self.para_id)),
                },
                fee_asset: relay_token_from_para,
            },
            Route::ParachainToAssetHub => RouteTemplate {
                withdrawn: relay_token_from_para.clone(),
                hop: Hop::InitiateReserveWithdraw {
                    reserve: Location::new(1, Junction::Parachain(ASSET_HUB_ID)),
                },
                fee_asset: relay_token_from_para,
            },
            Route::AssetHubToParachain => RouteTemplate {
                withdrawn: relay_token_from_para.clone(),
                hop: Hop::DepositReserveAsset {
                    dest: Location::new(1, Junction::Parachain(self.para_id)),
                },
                fee_asset: relay_token_from_para,
            },
        }
    }

    pub fn build(&self, route: Route, amount: u128, beneficiary: [u8; 32]) -> ExecuteXcm {
        let template = self.template(route);
        let all_counted = AssetFilter::Wild(WildAsset::AllCounted(1));

        let on_destination: Xcm<()> = Xcm(vec![
            Instruction::BuyExecution {
                fees: Asset {
                    id: AssetId(template.fee_asset),
                    fun: Fungibility::Fungible(amount / 2),
                },
                weight_limit: WeightLimit::Unlimited,
            },
            Instruction::DepositAsset {
                assets: all_counted.clone(),
                beneficiary: Location::new(
                    0,
                    Junction::AccountId32 {
                        network: None,
                        id: beneficiary,
                    },
                ),
            },
        ]);

        let hop = match template.hop {
            Hop::InitiateReserveWithdraw { reserve } => Instruction::InitiateReserveWithdraw {
                assets: all_counted,
                reserve,
                xcm: on_destination,
            },
            Hop::DepositReserveAsset { dest } => Instruction::DepositReserveAsset {
                assets: all_counted,
                dest,
                xcm: on_destination,
            },
        };

        let withdraw = Instruction::WithdrawAsset(
            vec![Asset {
                id: AssetId(template.withdrawn),
                fun: Fungibility::Fungible(amount),
            }]
            .into(),
        );

        ExecuteXcm {
            pallet: route.source().xcm_pallet(),
            message: VersionedXcm::V4(Xcm(vec![withdraw, hop])),
            max_weight: MAX_WEIGHT,
        }
    }

    pub fn from_parachain_to_relay(&self, amount: u128, beneficiary: [u8; 32]) -> ExecuteXcm {
        self.build(Route::ParachainToRelay, amount, beneficiary)
    }

    pub fn from_relay_to_parachain(&self, amount: u128, beneficiary: [u8; 32]) -> ExecuteXcm {
        self.build(Route::RelayToParachain, amount, beneficiary)
    }

    pub fn from_parachain_to_asset_hub(&self, amount: u128, beneficiary: [u8; 32]) -> ExecuteXcm {
        self.build(Route::ParachainToAssetHub, amount, beneficiary)
    }

    pub fn from_asset_hub_to_parachain(&self, amount: u128, beneficiary: [u8; 32]) -> ExecuteXcm {
        self.build(Route::AssetHubToParachain, amount, beneficiary)
    }
}
