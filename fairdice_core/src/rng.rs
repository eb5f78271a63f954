use chrono::Utc;
use fairdice_shared::RollRecord;
use hmac::digest::{Key, KeyInit};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

// Provably-fair dice roll:
// HMAC-SHA256(key = server_seed, msg = "server:client:nonce") -> first 32 bits -> [0, 100)

pub type HmacSha256 = Hmac<Sha256>;

/// Largest value a roll can take after rounding.
pub const MAX_ROLL: f64 = 99.99;

pub fn derive_hash_hex(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

/// Server seed as a block-sized HMAC key: hashed when longer than a block,
/// zero-padded otherwise.
fn hmac_key(server_seed: &str) -> Key<HmacSha256> {
    let seed = server_seed.as_bytes();
    let mut key = Key::<HmacSha256>::default();
    if seed.len() > key.len() {
        let digest = Sha256::digest(seed);
        key[..digest.len()].copy_from_slice(&digest);
    } else {
        key[..seed.len()].copy_from_slice(seed);
    }
    key
}

pub fn hmac_bytes(server_seed: &str, client_seed: &str, nonce: u64) -> [u8; 32] {
    let mut mac = <HmacSha256 as KeyInit>::new(&hmac_key(server_seed));
    let msg = format!("{}:{}:{}", server_seed, client_seed, nonce);
    mac.update(msg.as_bytes());
    let res = mac.finalize().into_bytes();
    let mut out = [0u8; 32];
    out.copy_from_slice(&res);
    out
}

pub fn hmac_hex(server_seed: &str, client_seed: &str, nonce: u64) -> String {
    hex::encode(hmac_bytes(server_seed, client_seed, nonce))
}

/// Deterministic roll in `[0.00, 99.99]`, two decimals.
pub fn roll(server_seed: &str, client_seed: &str, nonce: u64) -> f64 {
    let bytes = hmac_bytes(server_seed, client_seed, nonce);
    // first 8 hex chars of the digest == first 4 bytes, big-endian
    let v = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let raw = (v as f64) / (u32::MAX as f64) * 100.0;
    ((raw * 100.0).round() / 100.0).min(MAX_ROLL)
}

/// Recompute a roll and compare it at two-decimal precision.
pub fn verify_roll(server_seed: &str, client_seed: &str, nonce: u64, claimed: f64) -> bool {
    let expected = roll(server_seed, client_seed, nonce);
    ((expected * 100.0).round() as i64) == ((claimed * 100.0).round() as i64)
}

/// Fresh 32-byte seed from the OS entropy source, hex encoded.
pub fn generate_seed() -> String {
    let mut buf = [0u8; 32];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// A seed is considered well-formed once it is at least 64 characters long.
pub fn verify_seed(server_seed: &str) -> bool {
    server_seed.chars().count() >= 64
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedPair {
    pub server_seed: String, // secret
    pub client_seed: String,
}

impl SeedPair {
    pub fn new(server_seed: impl Into<String>, client_seed: impl Into<String>) -> Self {
        Self {
            server_seed: server_seed.into(),
            client_seed: client_seed.into(),
        }
    }

    pub fn random() -> Self {
        Self::new(generate_seed(), generate_seed())
    }

    pub fn server_seed_hash(&self) -> String {
        derive_hash_hex(self.server_seed.as_bytes())
    }

    pub fn roll(&self, nonce: u64) -> f64 {
        roll(&self.server_seed, &self.client_seed, nonce)
    }

    pub fn roll_record(&self, nonce: u64) -> RollRecord {
        RollRecord {
            roll: self.roll(nonce),
            server_seed: self.server_seed.clone(),
            client_seed: self.client_seed.clone(),
            nonce,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_key_matches_variable_length_hmac() {
        let generated = generate_seed();
        let long = "k".repeat(100);
        for seed in ["", "AAA", generated.as_str(), long.as_str()] {
            let mut reference =
                <HmacSha256 as KeyInit>::new_from_slice(seed.as_bytes()).unwrap();
            reference.update(format!("{seed}:client:7").as_bytes());
            let expected = reference.finalize().into_bytes();
            assert_eq!(hmac_bytes(seed, "client", 7)[..], expected[..], "seed {seed:?}");
        }
    }

    #[test]
    fn test_determinism() {
        let a = SeedPair::new("server", "client");
        let b = SeedPair::new("server", "client");
        assert_eq!(a.server_seed_hash(), b.server_seed_hash());
        assert_eq!(hmac_hex("server", "client", 1), hmac_hex("server", "client", 1));
        assert_eq!(a.roll(1).to_bits(), b.roll(1).to_bits());
    }

    #[test]
    fn roll_uses_leading_hex_digits() {
        let digest = hmac_hex("AAA", "BBB", 1);
        let lead = u32::from_str_radix(&digest[..8], 16).unwrap();
        let expected = ((lead as f64 / 4294967295.0 * 100.0) * 100.0).round() / 100.0;
        assert_eq!(roll("AAA", "BBB", 1), expected.min(MAX_ROLL));
    }

    #[test]
    fn nonce_changes_the_roll_stream() {
        let seeds = SeedPair::new("s", "c");
        let distinct: std::collections::HashSet<u64> =
            (1..=50).map(|n| seeds.roll(n).to_bits()).collect();
        assert!(distinct.len() > 40);
    }

    #[test]
    fn empty_seeds_are_accepted() {
        let r = roll("", "", 0);
        assert!((0.0..100.0).contains(&r));
    }

    #[test]
    fn generated_seeds_are_64_hex_chars() {
        let s = generate_seed();
        assert_eq!(s.len(), 64);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(verify_seed(&s));
        assert_ne!(s, generate_seed());
        assert!(!verify_seed("short"));
    }

    #[test]
    fn verify_roll_accepts_only_the_real_value() {
        let r = roll("server", "client", 9);
        assert!(verify_roll("server", "client", 9, r));
        assert!(!verify_roll("server", "client", 9, r + 0.01));
    }

    #[test]
    fn roll_record_carries_inputs() {
        let seeds = SeedPair::new("srv", "cli");
        let rec = seeds.roll_record(3);
        assert_eq!(rec.nonce, 3);
        assert_eq!(rec.roll, seeds.roll(3));
        assert_eq!(rec.server_seed, "srv");
    }
}
