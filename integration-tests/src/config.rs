//! Harness configuration, resolved once from the environment.
//!
//! | Variable              | Meaning                                   | Default        |
//! |-----------------------|-------------------------------------------|----------------|
//! | `NETWORK`             | `westend`, `kusama` or `polkadot`         | required       |
//! | `PARACHAIN_WS`        | parachain endpoint to fork                | required       |
//! | `RUNTIME_BEFORE`      | baseline parachain runtime (wasm)         | fork as-is     |
//! | `RUNTIME_AFTER`       | patched parachain runtime (wasm)          | fork as-is     |
//! | `PARACHAIN_ID`        | id of the parachain under test            | `2042`         |
//! | `PARA_TOKEN_DECIMALS` | decimals of the parachain native token    | `12`           |
//! | `CHOPSTICKS_DB`       | snapshot cache shared by the three forks  | `./db.sqlite`  |
//! | `CHOPSTICKS_BIN`      | launcher command                          | `chopsticks`   |

use std::{fmt, path::PathBuf, str::FromStr};

use crate::{
    chain::Token,
    error::{Error, Result},
};

pub const DEFAULT_PARACHAIN_ID: u32 = 2042;
pub const ASSET_HUB_ID: u32 = 1000;
pub const DEFAULT_PARA_TOKEN_DECIMALS: u32 = 12;
pub const DEFAULT_DB_PATH: &str = "./db.sqlite";
/// A globally installed `@acala-network/chopsticks`. `npx` wrappers fork a
/// child process that outlives the launcher, so a direct binary is preferred.
pub const DEFAULT_LAUNCHER: &str = "chopsticks";

/// Local ports of the three forks.
pub const PARACHAIN_PORT: u16 = 8006;
pub const RELAY_PORT: u16 = 8007;
pub const ASSET_HUB_PORT: u16 = 8008;

/// Live topologies the forks can be taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Westend,
    Kusama,
    Polkadot,
}

impl Network {
    pub fn relay_endpoint(&self) -> &'static str {
        match self {
            Network::Westend => "wss://westend-rpc.polkadot.io",
            Network::Kusama => "wss://rpc-kusama.luckyfriday.io",
            Network::Polkadot => "wss://rpc-polkadot.luckyfriday.io",
        }
    }

    pub fn asset_hub_endpoint(&self) -> &'static str {
        match self {
            Network::Westend => "wss://westend-asset-hub-rpc.polkadot.io",
            Network::Kusama => "wss://kusama-asset-hub-rpc.polkadot.io",
            Network::Polkadot => "wss://polkadot-asset-hub-rpc.polkadot.io",
        }
    }

    pub fn relay_token_decimals(&self) -> u32 {
        match self {
            Network::Westend | Network::Kusama => 12,
            Network::Polkadot => 10,
        }
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "westend" => Ok(Network::Westend),
            "kusama" => Ok(Network::Kusama),
            "polkadot" => Ok(Network::Polkadot),
            other => Err(Error::UnknownNetwork(other.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Westend => "westend",
            Network::Kusama => "kusama",
            Network::Polkadot => "polkadot",
        };
        f.write_str(name)
    }
}

/// Which parachain runtime the fork executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeImage {
    Before,
    After,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub network: Network,
    pub parachain_endpoint: String,
    pub runtime_before: Option<PathBuf>,
    pub runtime_after: Option<PathBuf>,
    pub para_id: u32,
    pub para_token_decimals: u32,
    pub db_path: PathBuf,
    /// Program and leading arguments, split on whitespace.
    pub launcher: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve the configuration through `lookup` instead of the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &'static str| lookup(key).ok_or(Error::MissingEnv(key));
        let parsed = |key: &'static str, default: u32| match lookup(key) {
            Some(value) => value
                .parse::<u32>()
                .map_err(|_| Error::InvalidEnv { key, value }),
            None => Ok(default),
        };

        let para_token_decimals = parsed("PARA_TOKEN_DECIMALS", DEFAULT_PARA_TOKEN_DECIMALS)?;
        if 10u128.checked_pow(para_token_decimals).is_none() {
            return Err(Error::InvalidEnv {
                key: "PARA_TOKEN_DECIMALS",
                value: para_token_decimals.to_string(),
            });
        }

        Ok(Self {
            network: required("NETWORK")?.parse()?,
            parachain_endpoint: required("PARACHAIN_WS")?,
            runtime_before: lookup("RUNTIME_BEFORE").map(PathBuf::from),
            runtime_after: lookup("RUNTIME_AFTER").map(PathBuf::from),
            para_id: parsed("PARACHAIN_ID", DEFAULT_PARACHAIN_ID)?,
            para_token_decimals,
            db_path: lookup("CHOPSTICKS_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            launcher: lookup("CHOPSTICKS_BIN").unwrap_or_else(|| DEFAULT_LAUNCHER.to_string()),
        })
    }

    pub fn wasm_override(&self, image: RuntimeImage) -> Option<&PathBuf> {
        match image {
            RuntimeImage::Before => self.runtime_before.as_ref(),
            RuntimeImage::After => self.runtime_after.as_ref(),
        }
    }

    pub fn decimals(&self, token: Token) -> u32 {
        match token {
            Token::Para => self.para_token_decimals,
            Token::Relay => self.network.relay_token_decimals(),
        }
    }

    /// `whole` tokens expressed in the token's smallest unit, saturating at `u128::MAX`.
    pub fn units(&self, token: Token, whole: u128) -> u128 {
        10u128
            .checked_pow(self.decimals(token))
            .map_or(u128::MAX, |unit| whole.saturating_mul(unit))
    }
}
