//! Friend key exchange
//!
//! Both friends derive the same pair of session keys from their X25519 key
//! pairs, without any interaction beyond knowing each other's public key.
//! The side with the smaller public key takes the client role:
//!
//!   h = BLAKE2b-512(X25519(sk, friend_pk) || client_pk || server_pk)
//!   client: read = h[..32], write = h[32..]
//!   server: write = h[..32], read = h[32..]
//!
//! so one friend's write key is the other's read key.

use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{EnvelopeError, Result, KEY_BYTES};

/// X25519 key pair
pub struct KeyPair {
    public: PublicKey,
    secret: StaticSecret,
}

impl KeyPair {
    pub fn generate() -> Self {
        Self::from_secret(StaticSecret::random_from_rng(OsRng))
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        let mut arr: [u8; KEY_BYTES] =
            bytes
                .try_into()
                .map_err(|_| EnvelopeError::InvalidKeyLength {
                    expected: KEY_BYTES,
                    found: bytes.len(),
                })?;
        let secret = StaticSecret::from(arr);
        arr.zeroize();
        Ok(Self::from_secret(secret))
    }

    fn from_secret(secret: StaticSecret) -> Self {
        Self {
            public: PublicKey::from(&secret),
            secret,
        }
    }

    pub fn public_key(&self) -> [u8; KEY_BYTES] {
        self.public.to_bytes()
    }

    pub fn secret_bytes(&self) -> [u8; KEY_BYTES] {
        self.secret.to_bytes()
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// Directional keys shared with one friend. Zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct SessionKeys {
    pub read: [u8; KEY_BYTES],
    pub write: [u8; KEY_BYTES],
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKeys { .. }")
    }
}

/// Derive the session keys shared with the owner of `friend_public`
pub fn derive_read_write_keys(mine: &KeyPair, friend_public: &[u8]) -> Result<SessionKeys> {
    let friend: [u8; KEY_BYTES] =
        friend_public
            .try_into()
            .map_err(|_| EnvelopeError::InvalidKeyLength {
                expected: KEY_BYTES,
                found: friend_public.len(),
            })?;
    let my_public = mine.public_key();
    if my_public == friend {
        return Err(EnvelopeError::KeyExchange(
            "friend public key equals our own".to_string(),
        ));
    }

    let shared = mine.secret.diffie_hellman(&PublicKey::from(friend));
    if !shared.was_contributory() {
        return Err(EnvelopeError::KeyExchange(
            "low-order friend public key".to_string(),
        ));
    }

    let is_client = my_public < friend;
    let (client_pk, server_pk) = if is_client {
        (&my_public, &friend)
    } else {
        (&friend, &my_public)
    };

    let hash = blake2b_simd::Params::new()
        .hash_length(2 * KEY_BYTES)
        .to_state()
        .update(shared.as_bytes())
        .update(client_pk)
        .update(server_pk)
        .finalize();
    let (first, second) = hash.as_bytes().split_at(KEY_BYTES);

    let mut keys = SessionKeys {
        read: [0u8; KEY_BYTES],
        write: [0u8; KEY_BYTES],
    };
    if is_client {
        keys.read.copy_from_slice(first);
        keys.write.copy_from_slice(second);
    } else {
        keys.write.copy_from_slice(first);
        keys.read.copy_from_slice(second);
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_friends_agree() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();

        let a = derive_read_write_keys(&alice, &bob.public_key()).unwrap();
        let b = derive_read_write_keys(&bob, &alice.public_key()).unwrap();

        assert_eq!(a.write, b.read);
        assert_eq!(a.read, b.write);
        assert_ne!(a.read, a.write);
    }

    #[test]
    fn test_from_secret_bytes_is_deterministic() {
        let kp = KeyPair::generate();
        let restored = KeyPair::from_secret_bytes(&kp.secret_bytes()).unwrap();
        assert_eq!(restored.public_key(), kp.public_key());
        assert!(KeyPair::from_secret_bytes(&[1u8; 31]).is_err());
    }

    #[test]
    fn test_own_key_rejected() {
        let kp = KeyPair::generate();
        assert!(matches!(
            derive_read_write_keys(&kp, &kp.public_key()),
            Err(EnvelopeError::KeyExchange(_))
        ));
    }

    #[test]
    fn test_low_order_point_rejected() {
        let kp = KeyPair::generate();
        assert!(matches!(
            derive_read_write_keys(&kp, &[0u8; KEY_BYTES]),
            Err(EnvelopeError::KeyExchange(_))
        ));
    }

    #[test]
    fn test_bad_public_key_length() {
        let kp = KeyPair::generate();
        assert!(matches!(
            derive_read_write_keys(&kp, &[9u8; 16]),
            Err(EnvelopeError::InvalidKeyLength { .. })
        ));
    }
}
