//! Development signer derived from the well-known dev phrase.

use subxt::utils::AccountId32;
use subxt_signer::{DEV_PHRASE, DeriveJunction, bip39::Mnemonic, sr25519::Keypair};

use crate::error::{Error, Result};

/// Addresses are rendered with the generic substrate prefix (42).
pub const SS58_PREFIX: u16 = 42;

/// A keypair derived as `<DEV_PHRASE>//<path>`.
#[derive(Clone)]
pub struct DevAccount {
    keypair: Keypair,
}

impl DevAccount {
    pub fn derive(path: &str) -> Result<Self> {
        let phrase = Mnemonic::parse(DEV_PHRASE).map_err(|e| Error::Signer(e.to_string()))?;
        let root = Keypair::from_phrase(&phrase, None).map_err(|e| Error::Signer(e.to_string()))?;
        Ok(Self {
            keypair: root.derive([DeriveJunction::hard(path)]),
        })
    }

    pub fn alice() -> Result<Self> {
        Self::derive("Alice")
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.keypair.public_key().0
    }

    pub fn account_id(&self) -> AccountId32 {
        AccountId32(self.public_key())
    }

    /// SS58 address using [`SS58_PREFIX`].
    pub fn address(&self) -> String {
        self.account_id().to_string()
    }
}

impl core::fmt::Debug for DevAccount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DevAccount").field("address", &self.address()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alice_is_the_well_known_dev_account() {
        let alice = DevAccount::alice().unwrap();
        assert_eq!(
            hex::encode(alice.public_key()),
            "d43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d"
        );
        assert_eq!(alice.address(), "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY");
    }

    #[test]
    fn derivation_is_deterministic() {
        let first = DevAccount::derive("Bob").unwrap();
        let second = DevAccount::derive("Bob").unwrap();
        assert_eq!(first.public_key(), second.public_key());
        assert_ne!(first.public_key(), DevAccount::alice().unwrap().public_key());
    }
}
