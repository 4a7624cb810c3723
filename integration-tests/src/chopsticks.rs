//! Launcher for the three chopsticks forks.
//!
//! Chopsticks runs in XCM mode (`chopsticks xcm -r <relay> -p <para> -p <asset hub>`)
//! so messages between the forks are delivered when blocks are produced. All
//! forks share one on-disk snapshot cache. The process is killed when the
//! [`Chopsticks`] handle is dropped.
//!
//! The ports are fixed, so only one instance can run at a time. A launch fails
//! up front when a port is taken rather than attaching to someone else's fork.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Serialize;
use subxt::backend::rpc::RpcClient;
use tempfile::TempDir;
use tokio::{
    net::TcpListener,
    process::{Child, Command},
    time::{Instant, sleep},
};
use tracing::{debug, info};

use crate::{
    chain::ChainKind,
    config::{Config, RuntimeImage},
    error::{Error, Result},
};

/// Forking public networks is slow on a cold cache.
pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(180);
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Per-fork configuration file, in the keys chopsticks reads.
#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct ForkConfig<'a> {
    endpoint: &'a str,
    port: u16,
    db: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    wasm_override: Option<&'a Path>,
}

impl<'a> ForkConfig<'a> {
    fn new(chain: ChainKind, config: &'a Config, image: RuntimeImage) -> Self {
        let endpoint = match chain {
            ChainKind::Parachain => config.parachain_endpoint.as_str(),
            ChainKind::Relay => config.network.relay_endpoint(),
            ChainKind::AssetHub => config.network.asset_hub_endpoint(),
        };
        // Only the parachain runtime differs between the two runs.
        let wasm_override = match chain {
            ChainKind::Parachain => config.wasm_override(image).map(PathBuf::as_path),
            ChainKind::Relay | ChainKind::AssetHub => None,
        };
        Self {
            endpoint,
            port: chain.local_port(),
            db: &config.db_path,
            wasm_override,
        }
    }
}

/// A running chopsticks process serving the three forks.
pub struct Chopsticks {
    child: Child,
    _workdir: TempDir,
}

impl Chopsticks {
    pub async fn launch(config: &Config, image: RuntimeImage) -> Result<Self> {
        for chain in ChainKind::ALL {
            ensure_port_free(chain, chain.local_port()).await?;
        }
        let workdir = tempfile::tempdir()?;

        let mut files = Vec::with_capacity(ChainKind::ALL.len());
        for chain in ChainKind::ALL {
            let fork = ForkConfig::new(chain, config, image);
            // JSON is valid YAML, which is what chopsticks parses.
            let path = workdir.path().join(format!("{chain}.yml"));
            tokio::fs::write(&path, serde_json::to_vec_pretty(&fork)?).await?;
            debug!(%chain, path = %path.display(), ?fork, "fork config written");
            files.push((chain, path));
        }

        let mut launcher = config.launcher.split_whitespace();
        let program = launcher.next().ok_or_else(|| Error::InvalidEnv {
            key: "CHOPSTICKS_BIN",
            value: config.launcher.clone(),
        })?;
        let mut command = Command::new(program);
        command.args(launcher).arg("xcm").kill_on_drop(true);
        for (chain, path) in &files {
            let flag = match chain {
                ChainKind::Relay => "--relaychain",
                ChainKind::Parachain | ChainKind::AssetHub => "--parachain",
            };
            command.arg(flag).arg(path);
        }

        info!(network = %config.network, ?image, launcher = %config.launcher, "launching");
        let child = command.spawn()?;
        let mut chopsticks = Self {
            child,
            _workdir: workdir,
        };

        tokio::select! {
            ready = futures::future::try_join_all(ChainKind::ALL.map(wait_until_ready)) => {
                ready?;
            }
            status = chopsticks.child.wait() => {
                return Err(Error::LauncherExited { status: status? });
            }
        }
        info!("chopsticks forks ready");
        Ok(chopsticks)
    }

    pub fn endpoint(&self, chain: ChainKind) -> String {
        chain.local_endpoint()
    }
}

async fn ensure_port_free(chain: ChainKind, port: u16) -> Result<()> {
    match TcpListener::bind(("127.0.0.1", port)).await {
        Ok(_) => Ok(()),
        Err(e) => {
            debug!(%chain, port, error = %e, "port unavailable");
            Err(Error::PortInUse { chain, port })
        }
    }
}

async fn wait_until_ready(chain: ChainKind) -> Result<()> {
    let endpoint = chain.local_endpoint();
    let deadline = Instant::now() + STARTUP_TIMEOUT;

    loop {
        match RpcClient::from_url(&endpoint).await {
            Ok(_) => {
                debug!(%chain, %endpoint, "accepting connections");
                return Ok(());
            }
            Err(e) if Instant::now() < deadline => {
                debug!(%chain, %endpoint, error = %e, "not ready yet");
                sleep(POLL_INTERVAL).await;
            }
            Err(_) => return Err(Error::NotReady { chain, endpoint }),
        }
    }
}
