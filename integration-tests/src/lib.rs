//! Chopsticks Regression Tests for Relay-Token Reserve Transfers
//!
//! This crate forks a live relay chain, its asset hub and one parachain with
//! chopsticks, moves the relay token between them with locally built XCM
//! programs, and checks the resulting balances. The same scenarios run twice:
//! once with the parachain on its current runtime and once on a patched one,
//! so a change in reserve handling shows up as a change in expected outcome.
//!
//! ## Overview
//!
//! - [`network::MockNetwork`] launches the forks and resolves the parachain's
//!   sovereign accounts on the relay and on the asset hub.
//! - [`chain::MockChain`] reads balances, submits transactions and produces
//!   blocks on one fork. [`fixture::ChainFixture`] overwrites its balances.
//! - [`transfers::TransferBuilder`] builds the four reserve-transfer calls.
//! - [`scenario::Scenario`] runs one transfer end to end and reports the
//!   balances before and after.
//!
//! ## Running Tests
//!
//! ```bash
//! # Unit tests only
//! cargo test -p xcm-reserve-transfer-tests
//!
//! # Live scenarios against forked networks
//! NETWORK=westend PARACHAIN_WS=wss://westend-penpal-rpc.polkadot.io \
//! RUNTIME_BEFORE=./before.wasm RUNTIME_AFTER=./after.wasm \
//! RUST_LOG=info cargo test -p xcm-reserve-transfer-tests -- --ignored --nocapture
//! ```
//!
//! The forks listen on fixed ports, so the live tests hold a shared
//! `#[serial]` lock and run one network at a time.
//!
//! ## Prerequisites
//!
//! 1. `chopsticks` on `PATH` (`npm i -g @acala-network/chopsticks`), or
//!    `CHOPSTICKS_BIN` pointing at another launcher.
//! 2. The two parachain runtime blobs; see [`config`] for every variable.
//! 3. Network access to the public RPC endpoints of the chosen network.

pub mod chain;
pub mod chopsticks;
pub mod config;
pub mod error;
pub mod fixture;
pub mod network;
pub mod scenario;
pub mod signer;
pub mod transfers;

pub use error::{Error, Result};
