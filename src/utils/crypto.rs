use anyhow::{anyhow, bail, Context, Result};
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, PublicKey, SecretKey, SECP256K1,
};
use sha2::Sha256;
use sha3::{Digest, Keccak256};

use crate::plasma::{Address, Signature, SIGNATURE_LENGTH};

const ETH_SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Hash of `hash` under the Ethereum signed-message convention, which is what owners
/// actually sign with their wallets.
pub fn eth_signed_message_hash(hash: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(ETH_SIGNED_MESSAGE_PREFIX);
    hasher.update(hash);
    hasher.finalize().into()
}

pub fn address_of(public_key: &PublicKey) -> Address {
    let uncompressed = public_key.serialize_uncompressed();
    let digest = keccak256(&uncompressed[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&digest[12..]);
    Address(address)
}

/// Recovers the address that produced `signature` over the eth-prefixed `hash`.
pub fn recover_address(hash: &[u8; 32], signature: &Signature) -> Result<Address> {
    let v = signature.0[SIGNATURE_LENGTH - 1];
    let recovery_id = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        _ => bail!("invalid signature recovery byte {v}"),
    };
    let recovery_id = RecoveryId::from_i32(recovery_id as i32)
        .map_err(|e| anyhow!("invalid recovery id: {e}"))?;
    let sig = RecoverableSignature::from_compact(&signature.0[..64], recovery_id)
        .context("malformed signature")?;

    let msg = Message::from_digest(eth_signed_message_hash(hash));
    let public_key = SECP256K1
        .recover_ecdsa(&msg, &sig)
        .context("could not recover signer")?;
    Ok(address_of(&public_key))
}

/// A secp256k1 key pair producing rootchain-compatible signatures.
#[derive(Clone)]
pub struct EthCrypto {
    sk: SecretKey,
    address: Address,
}

impl EthCrypto {
    /// Derives a key from an arbitrary seed. Only meant for tests and development nodes.
    pub fn new(seed: &str) -> Result<Self> {
        let ikm = keccak256(seed.as_bytes());
        let sk = SecretKey::from_slice(&ikm).context("seed does not map to a valid secret key")?;
        Ok(Self::from_secret_key(sk))
    }

    pub fn from_secret_key(sk: SecretKey) -> Self {
        let address = address_of(&PublicKey::from_secret_key_global(&sk));
        EthCrypto { sk, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Signs `hash` with the eth prefix applied; `v` is encoded as 27/28.
    pub fn sign_hash(&self, hash: &[u8; 32]) -> Signature {
        let msg = Message::from_digest(eth_signed_message_hash(hash));
        let sig = SECP256K1.sign_ecdsa_recoverable(&msg, &self.sk);
        let (recovery_id, compact) = sig.serialize_compact();

        let mut out = [0u8; SIGNATURE_LENGTH];
        out[..64].copy_from_slice(&compact);
        out[64] = recovery_id.to_i32() as u8 + 27;
        Signature(out)
    }
}
