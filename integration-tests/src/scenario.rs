//! Seed, snapshot, transfer, advance, snapshot.
//!
//! A [`Scenario`] runs one reserve transfer of the relay token and records the
//! balances that matter for it: the sender on the source chain, the receiver
//! on the destination chain and the parachain's sovereign account on whichever
//! side is not the parachain. The sender and receiver are the same dev account.
//! [`Expected`] then states what a given runtime should have done to them.

use core::fmt;

use subxt::utils::AccountId32;
use tracing::{debug, info};

use crate::{
    chain::{ChainKind, MockChain, Token, TransferOutcome},
    config::Config,
    error::{Error, Result},
    network::MockNetwork,
    signer::DevAccount,
    transfers::Route,
};

/// Balance overwrite applied before the first snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seed {
    pub chain: ChainKind,
    pub who: AccountId32,
    pub token: Token,
    pub amount: u128,
}

#[derive(Debug, Clone)]
pub struct Scenario {
    route: Route,
    amount: u128,
    seeds: Vec<Seed>,
}

/// Relay-token balances of the three parties at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub sender: u128,
    pub receiver: u128,
    pub sovereign: u128,
}

impl Snapshot {
    fn get(&self, party: Party) -> u128 {
        match party {
            Party::Sender => self.sender,
            Party::Receiver => self.receiver,
            Party::Sovereign => self.sovereign,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioReport {
    pub route: Route,
    pub amount: u128,
    pub outcome: TransferOutcome,
    pub before: Snapshot,
    /// Second read of the "before" state with nothing in between.
    pub reread: Snapshot,
    pub after: Snapshot,
}

impl Scenario {
    pub fn new(route: Route, amount: u128) -> Self {
        Self {
            route,
            amount,
            seeds: Vec::new(),
        }
    }

    pub fn seed(mut self, chain: ChainKind, who: &AccountId32, token: Token, amount: u128) -> Self {
        self.seeds.push(Seed {
            chain,
            who: who.clone(),
            token,
            amount,
        });
        self
    }

    /// One relay token sent along `route`, from balances that cover it.
    ///
    /// `account` sends and receives. It holds 10 relay tokens on the source
    /// and none on the destination. The sovereign account holds 10 when it
    /// backs tokens leaving the parachain and none otherwise. The parachain
    /// side also gets native tokens for fees: 1000 on the way to the relay,
    /// 10 elsewhere.
    pub fn reserve_transfer(
        route: Route,
        config: &Config,
        account: &AccountId32,
        sovereign: &AccountId32,
    ) -> Self {
        let relay = |whole| config.units(Token::Relay, whole);
        let para = |whole| config.units(Token::Para, whole);
        let counterparty = route.counterparty();

        let scenario = Self::new(route, relay(1));
        match route {
            Route::ParachainToRelay | Route::ParachainToAssetHub => {
                let native = if route == Route::ParachainToRelay { 1000 } else { 10 };
                scenario
                    .seed(ChainKind::Parachain, account, Token::Para, para(native))
                    .seed(ChainKind::Parachain, account, Token::Relay, relay(10))
                    .seed(counterparty, account, Token::Relay, 0)
                    .seed(counterparty, sovereign, Token::Relay, relay(10))
            }
            Route::RelayToParachain | Route::AssetHubToParachain => scenario
                .seed(counterparty, account, Token::Relay, relay(10))
                .seed(counterparty, sovereign, Token::Relay, 0)
                .seed(ChainKind::Parachain, account, Token::Para, para(10))
                .seed(ChainKind::Parachain, account, Token::Relay, 0),
        }
    }

    pub fn seeds(&self) -> &[Seed] {
        &self.seeds
    }

    /// Seeds grouped per chain, in the order the chains are first mentioned.
    fn seeds_by_chain(&self) -> Vec<(ChainKind, Vec<(AccountId32, Token, u128)>)> {
        let mut grouped: Vec<(ChainKind, Vec<_>)> = Vec::new();
        for seed in &self.seeds {
            let entry = (seed.who.clone(), seed.token, seed.amount);
            match grouped.iter_mut().find(|(chain, _)| *chain == seed.chain) {
                Some((_, entries)) => entries.push(entry),
                None => grouped.push((seed.chain, vec![entry])),
            }
        }
        grouped
    }

    pub async fn run(&self, network: &MockNetwork, signer: &DevAccount) -> Result<ScenarioReport> {
        let route = self.route;
        info!(?route, amount = self.amount, "running scenario");

        for (chain, entries) in self.seeds_by_chain() {
            network.chain(chain).fixture().set_tokens(&entries).await?;
        }

        let parties = Parties::resolve(network, route, signer)?;
        let before = parties.snapshot().await?;
        let reread = parties.snapshot().await?;
        debug!(?before, ?reread, "balances before transfer");

        let call = network
            .transfers()
            .build(route, self.amount, signer.public_key());
        let outcome = network.chain(route.source()).submit(&call, signer).await?;
        network.chain(route.destination()).new_block().await?;

        let after = parties.snapshot().await?;
        info!(?route, ok = outcome.ok, ?before, ?after, "scenario finished");

        Ok(ScenarioReport {
            route,
            amount: self.amount,
            outcome,
            before,
            reread,
            after,
        })
    }
}

struct Parties<'a> {
    source: &'a MockChain,
    destination: &'a MockChain,
    counterparty: &'a MockChain,
    account: AccountId32,
    sovereign: &'a AccountId32,
}

impl<'a> Parties<'a> {
    fn resolve(network: &'a MockNetwork, route: Route, signer: &DevAccount) -> Result<Self> {
        let counterparty = route.counterparty();
        let sovereign = network
            .sovereign_account(counterparty)
            .ok_or(Error::SovereignAccount { chain: counterparty })?;
        Ok(Self {
            source: network.chain(route.source()),
            destination: network.chain(route.destination()),
            counterparty: network.chain(counterparty),
            account: signer.account_id(),
            sovereign,
        })
    }

    async fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            sender: self.source.get_token(&self.account, Token::Relay).await?,
            receiver: self.destination.get_token(&self.account, Token::Relay).await?,
            sovereign: self.counterparty.get_token(self.sovereign, Token::Relay).await?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Sender,
    Receiver,
    Sovereign,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Party::Sender => "sender",
            Party::Receiver => "receiver",
            Party::Sovereign => "sovereign account",
        };
        f.write_str(name)
    }
}

/// Relationship between a balance before and after the transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Unchanged,
    Increased,
    Decreased,
    /// `after < before + n`: whatever came in stayed below `n`.
    LessThan(u128),
}

impl Expect {
    pub fn holds(&self, before: u128, after: u128) -> bool {
        match self {
            Expect::Unchanged => after == before,
            Expect::Increased => after > before,
            Expect::Decreased => after < before,
            Expect::LessThan(n) => after < before.saturating_add(*n),
        }
    }
}

impl fmt::Display for Expect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expect::Unchanged => f.write_str("unchanged"),
            Expect::Increased => f.write_str("increased"),
            Expect::Decreased => f.write_str("decreased"),
            Expect::LessThan(n) => write!(f, "below before + {n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Mismatch {
    #[error("transfer ok = {actual}, expected {expected}")]
    Outcome { expected: bool, actual: bool },

    #[error("{party} balance went {before} -> {after}, expected {expect}")]
    Balance {
        party: Party,
        expect: Expect,
        before: u128,
        after: u128,
    },

    #[error("{party} balance read {first} then {second} with no change in between")]
    NotIdempotent { party: Party, first: u128, second: u128 },

    #[error("sovereign account moved {before} -> {after}, more than the {amount} transferred")]
    SovereignOverdrawn { before: u128, after: u128, amount: u128 },
}

/// What a runtime is expected to do for one route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expected {
    pub ok: bool,
    pub sender: Expect,
    pub receiver: Expect,
    pub sovereign: Expect,
}

const PARTIES: [Party; 3] = [Party::Sender, Party::Receiver, Party::Sovereign];

impl Expected {
    fn of(&self, party: Party) -> Expect {
        match party {
            Party::Sender => self.sender,
            Party::Receiver => self.receiver,
            Party::Sovereign => self.sovereign,
        }
    }
}

impl ScenarioReport {
    /// First mismatch against `expected`, if any.
    ///
    /// Independently of `expected`, the two "before" reads must agree, the
    /// sender may never end up richer and the sovereign account may not move
    /// by more than the amount transferred.
    pub fn check(&self, expected: &Expected) -> core::result::Result<(), Mismatch> {
        for party in PARTIES {
            let (first, second) = (self.before.get(party), self.reread.get(party));
            if first != second {
                return Err(Mismatch::NotIdempotent { party, first, second });
            }
        }

        if self.outcome.ok != expected.ok {
            return Err(Mismatch::Outcome {
                expected: expected.ok,
                actual: self.outcome.ok,
            });
        }

        for party in PARTIES {
            let (before, after) = (self.before.get(party), self.after.get(party));
            let expect = expected.of(party);
            if !expect.holds(before, after) {
                return Err(Mismatch::Balance {
                    party,
                    expect,
                    before,
                    after,
                });
            }
        }

        if self.after.sender > self.before.sender {
            return Err(Mismatch::Balance {
                party: Party::Sender,
                expect: Expect::LessThan(1),
                before: self.before.sender,
                after: self.after.sender,
            });
        }

        let (before, after) = (self.before.sovereign, self.after.sovereign);
        if before.abs_diff(after) > self.amount {
            return Err(Mismatch::SovereignOverdrawn {
                before,
                after,
                amount: self.amount,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use subxt::utils::H256;

    use super::*;
    use crate::config::Network;

    fn report(ok: bool, before: Snapshot, after: Snapshot) -> ScenarioReport {
        ScenarioReport {
            route: Route::ParachainToRelay,
            amount: 5,
            outcome: TransferOutcome {
                ok,
                block_hash: H256::zero(),
            },
            before,
            reread: before,
            after,
        }
    }

    fn snapshot(sender: u128, receiver: u128, sovereign: u128) -> Snapshot {
        Snapshot {
            sender,
            receiver,
            sovereign,
        }
    }

    #[test]
    fn expectations_compare_before_and_after() {
        assert!(Expect::Unchanged.holds(5, 5));
        assert!(!Expect::Unchanged.holds(5, 6));
        assert!(Expect::Increased.holds(5, 6));
        assert!(!Expect::Increased.holds(5, 5));
        assert!(Expect::Decreased.holds(5, 4));
        assert!(!Expect::Decreased.holds(5, 5));
        assert!(Expect::LessThan(10).holds(5, 14));
        assert!(Expect::LessThan(10).holds(5, 0));
        assert!(!Expect::LessThan(10).holds(5, 15));
        assert!(Expect::LessThan(1).holds(u128::MAX, u128::MAX));
    }

    #[test]
    fn successful_transfer_matches() {
        let report = report(true, snapshot(10, 0, 10), snapshot(9, 1, 9));
        let expected = Expected {
            ok: true,
            sender: Expect::Decreased,
            receiver: Expect::Increased,
            sovereign: Expect::Decreased,
        };
        assert_eq!(report.check(&expected), Ok(()));
    }

    #[test]
    fn outcome_mismatch_is_reported_first() {
        let report = report(false, snapshot(10, 0, 10), snapshot(10, 0, 10));
        let expected = Expected {
            ok: true,
            sender: Expect::Unchanged,
            receiver: Expect::Unchanged,
            sovereign: Expect::Unchanged,
        };
        assert_eq!(
            report.check(&expected),
            Err(Mismatch::Outcome {
                expected: true,
                actual: false
            })
        );
    }

    #[test]
    fn balance_mismatch_names_the_party() {
        let report = report(true, snapshot(10, 0, 0), snapshot(9, 0, 1));
        let expected = Expected {
            ok: true,
            sender: Expect::Decreased,
            receiver: Expect::Increased,
            sovereign: Expect::Increased,
        };
        let err = report.check(&expected).unwrap_err();
        assert_eq!(
            err,
            Mismatch::Balance {
                party: Party::Receiver,
                expect: Expect::Increased,
                before: 0,
                after: 0,
            }
        );
        assert_eq!(err.to_string(), "receiver balance went 0 -> 0, expected increased");
    }

    #[test]
    fn sender_never_gains() {
        let report = report(true, snapshot(10, 0, 0), snapshot(11, 0, 0));
        let expected = Expected {
            ok: true,
            sender: Expect::LessThan(5),
            receiver: Expect::Unchanged,
            sovereign: Expect::Unchanged,
        };
        assert!(matches!(
            report.check(&expected),
            Err(Mismatch::Balance { party: Party::Sender, .. })
        ));
    }

    #[test]
    fn diverging_rereads_are_flagged() {
        let mut report = report(true, snapshot(10, 0, 0), snapshot(10, 0, 0));
        report.reread.sovereign = 3;
        let expected = Expected {
            ok: true,
            sender: Expect::Unchanged,
            receiver: Expect::Unchanged,
            sovereign: Expect::Unchanged,
        };
        assert_eq!(
            report.check(&expected),
            Err(Mismatch::NotIdempotent {
                party: Party::Sovereign,
                first: 0,
                second: 3
            })
        );
    }

    #[test]
    fn seeds_are_grouped_per_chain() {
        let alice = AccountId32([1; 32]);
        let sovereign = AccountId32([2; 32]);
        let scenario = Scenario::new(Route::ParachainToRelay, 1)
            .seed(ChainKind::Parachain, &alice, Token::Para, 100)
            .seed(ChainKind::Relay, &alice, Token::Relay, 0)
            .seed(ChainKind::Parachain, &alice, Token::Relay, 10)
            .seed(ChainKind::Relay, &sovereign, Token::Relay, 10);

        let grouped = scenario.seeds_by_chain();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].0, ChainKind::Parachain);
        assert_eq!(
            grouped[0].1,
            vec![(alice.clone(), Token::Para, 100), (alice.clone(), Token::Relay, 10)]
        );
        assert_eq!(grouped[1].0, ChainKind::Relay);
        assert_eq!(grouped[1].1, vec![(alice, Token::Relay, 0), (sovereign, Token::Relay, 10)]);
        assert_eq!(scenario.seeds().len(), 4);
    }

    #[test]
    fn sovereign_may_not_move_more_than_the_amount() {
        let expected = Expected {
            ok: true,
            sender: Expect::Decreased,
            receiver: Expect::Unchanged,
            sovereign: Expect::Increased,
        };

        let within = report(true, snapshot(10, 0, 0), snapshot(5, 0, 5));
        assert_eq!(within.check(&expected), Ok(()));

        let oversized = report(true, snapshot(10, 0, 0), snapshot(5, 0, 6));
        assert_eq!(
            oversized.check(&expected),
            Err(Mismatch::SovereignOverdrawn {
                before: 0,
                after: 6,
                amount: 5
            })
        );

        let drained = report(true, snapshot(10, 0, 100), snapshot(5, 0, 0));
        let expected = Expected {
            sovereign: Expect::Decreased,
            ..expected
        };
        assert!(matches!(
            drained.check(&expected),
            Err(Mismatch::SovereignOverdrawn { .. })
        ));
    }

    fn config(network: Network) -> Config {
        Config {
            network,
            parachain_endpoint: "wss://penpal.example".to_string(),
            runtime_before: None,
            runtime_after: None,
            para_id: 2042,
            para_token_decimals: 12,
            db_path: PathBuf::from("./db.sqlite"),
            launcher: "chopsticks".to_string(),
        }
    }

    #[test]
    fn reserve_transfer_seeds_cover_the_amount() {
        let alice = AccountId32([1; 32]);
        let sovereign = AccountId32([2; 32]);

        for network in [Network::Westend, Network::Kusama, Network::Polkadot] {
            let config = config(network);
            for route in Route::ALL {
                let scenario = Scenario::reserve_transfer(route, &config, &alice, &sovereign);
                assert_eq!(scenario.amount, config.units(Token::Relay, 1), "{network} {route:?}");

                let sender_funds = scenario
                    .seeds()
                    .iter()
                    .find(|s| {
                        s.chain == route.source() && s.who == alice && s.token == Token::Relay
                    })
                    .map(|s| s.amount);
                assert!(
                    sender_funds.is_some_and(|funds| funds >= scenario.amount),
                    "{network} {route:?}: sender seeded {sender_funds:?}"
                );

                if route.source() == ChainKind::Parachain {
                    let reserve = scenario
                        .seeds()
                        .iter()
                        .find(|s| s.who == sovereign)
                        .map(|s| s.amount);
                    assert!(reserve.is_some_and(|r| r >= scenario.amount), "{network} {route:?}");
                }
            }
        }
    }
}
