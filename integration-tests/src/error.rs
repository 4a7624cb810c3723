//! Error type shared by the harness.

use thiserror::Error;

use crate::chain::{ChainKind, Token};

#[derive(Debug, Error)]
pub enum Error {
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),
    #[error("unknown network `{0}`, expected one of: westend kusama polkadot")]
    UnknownNetwork(String),
    #[error("invalid value `{value}` for {key}")]
    InvalidEnv { key: &'static str, value: String },
    #[error("{chain} does not hold {token:?} tokens")]
    UnsupportedToken { chain: ChainKind, token: Token },
    #[error("port {port} for {chain} is already taken")]
    PortInUse { chain: ChainKind, port: u16 },
    #[error("chopsticks exited before the forks were ready: {status}")]
    LauncherExited { status: std::process::ExitStatus },
    #[error("{chain} did not accept connections on {endpoint} in time")]
    NotReady { chain: ChainKind, endpoint: String },
    #[error("{chain} could not convert the parachain location into an account")]
    SovereignAccount { chain: ChainKind },
    #[error("key derivation failed: {0}")]
    Signer(String),
    #[error("unexpected storage layout: {0}")]
    Decode(String),
    #[error(transparent)]
    Subxt(#[from] subxt::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
