//! TON mnemonic seed phrases
//!
//! 24 BIP-39 English words, but with TON's own derivation scheme
//! rather than BIP-39's: entropy is HMAC-SHA512 over the phrase, the
//! validity check and the signing-key seed both come from
//! PBKDF2-HMAC-SHA512 over that entropy. The same phrase always
//! derives the same ed25519 keypair, which is what makes the wallet
//! recoverable from configuration alone after a crash.

use std::fmt;

use bip39::Language;
use ed25519_dalek::SigningKey;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha512;

use crate::error::{Error, Result};

type HmacSha512 = Hmac<Sha512>;

/// Required number of words in a TON seed phrase
pub const WORD_COUNT: usize = 24;

/// Iterations for the signing-key seed derivation
const SEED_ITERATIONS: u32 = 100_000;
/// Iterations for the validity check (100_000 / 256)
const VALIDITY_ITERATIONS: u32 = 390;

const SEED_SALT: &[u8] = b"TON default seed";
const VALIDITY_SALT: &[u8] = b"TON seed version";

/// A validated 24-word seed phrase
///
/// Holds secret material: `Debug` is redacted and the phrase is never
/// logged or serialized by this crate.
#[derive(Clone)]
pub struct Mnemonic {
    words: Vec<String>,
}

impl Mnemonic {
    /// Parse and validate a whitespace-separated phrase
    ///
    /// Fails with `Error::Config` on wrong word count, a word outside
    /// the wordlist, or a failed validity check.
    pub fn parse(phrase: &str) -> Result<Self> {
        let words: Vec<String> = phrase
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect();

        if words.len() != WORD_COUNT {
            return Err(Error::Config(format!(
                "seed phrase must have {} words, got {}",
                WORD_COUNT,
                words.len()
            )));
        }

        for word in &words {
            if Language::English.find_word(word).is_none() {
                return Err(Error::Config(format!(
                    "seed phrase contains a word outside the wordlist: {}",
                    word
                )));
            }
        }

        let mnemonic = Self { words };
        if !mnemonic.passes_validity_check() {
            return Err(Error::Config(
                "seed phrase failed its checksum".to_string(),
            ));
        }
        Ok(mnemonic)
    }

    /// Generate a fresh valid phrase by sampling wordlist words until
    /// the validity check passes (roughly 1 in 256 candidates)
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let wordlist = Language::English.words_by_prefix("");
        loop {
            let words: Vec<String> = (0..WORD_COUNT)
                .map(|_| wordlist[rng.gen_range(0..wordlist.len())].to_string())
                .collect();
            let candidate = Self { words };
            if candidate.passes_validity_check() {
                return candidate;
            }
        }
    }

    /// The phrase as a single space-separated string
    ///
    /// Secret material; callers must not log it.
    pub fn phrase(&self) -> String {
        self.words.join(" ")
    }

    /// Derive the wallet's ed25519 signing key
    pub fn to_signing_key(&self) -> SigningKey {
        let mut seed = [0u8; 64];
        pbkdf2::pbkdf2_hmac::<Sha512>(&self.entropy(), SEED_SALT, SEED_ITERATIONS, &mut seed);
        let mut key = [0u8; 32];
        key.copy_from_slice(&seed[..32]);
        SigningKey::from_bytes(&key)
    }

    /// HMAC-SHA512 over the phrase (empty password)
    fn entropy(&self) -> [u8; 64] {
        let mut mac = HmacSha512::new_from_slice(self.phrase().as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(b"");
        mac.finalize().into_bytes().into()
    }

    /// TON's basic-seed check: the first derived byte must be zero
    fn passes_validity_check(&self) -> bool {
        let mut probe = [0u8; 64];
        pbkdf2::pbkdf2_hmac::<Sha512>(
            &self.entropy(),
            VALIDITY_SALT,
            VALIDITY_ITERATIONS,
            &mut probe,
        );
        probe[0] == 0
    }
}

impl fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mnemonic(redacted)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_rejects_wrong_word_count() {
        let short = vec!["abandon"; 23].join(" ");
        assert!(matches!(Mnemonic::parse(&short), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_unknown_word() {
        let mut words = vec!["abandon"; 23];
        words.push("zzzzzz");
        assert!(matches!(
            Mnemonic::parse(&words.join(" ")),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_generate_parses_back() {
        let mut rng = StdRng::seed_from_u64(7);
        let mnemonic = Mnemonic::generate(&mut rng);
        let reparsed = Mnemonic::parse(&mnemonic.phrase()).unwrap();
        assert_eq!(reparsed.phrase(), mnemonic.phrase());
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(42);
        let mnemonic = Mnemonic::generate(&mut rng);
        let a = mnemonic.to_signing_key();
        let b = Mnemonic::parse(&mnemonic.phrase()).unwrap().to_signing_key();
        assert_eq!(a.to_bytes(), b.to_bytes());
        assert_eq!(a.verifying_key(), b.verifying_key());
    }

    #[test]
    fn test_distinct_phrases_derive_distinct_keys() {
        let mut rng = StdRng::seed_from_u64(1);
        let a = Mnemonic::generate(&mut rng);
        let b = Mnemonic::generate(&mut rng);
        assert_ne!(a.phrase(), b.phrase());
        assert_ne!(
            a.to_signing_key().to_bytes(),
            b.to_signing_key().to_bytes()
        );
    }

    #[test]
    fn test_debug_is_redacted() {
        let mut rng = StdRng::seed_from_u64(3);
        let mnemonic = Mnemonic::generate(&mut rng);
        let debug = format!("{:?}", mnemonic);
        assert_eq!(debug, "Mnemonic(redacted)");
        assert!(!debug.contains(&mnemonic.phrase()));
    }
}
