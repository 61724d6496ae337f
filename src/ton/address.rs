//! TON account addresses
//!
//! The surrounding system hands us addresses in two encodings: raw
//! `workchain:hex` and user-friendly base64 (tag byte, workchain,
//! 32-byte account id, CRC16). `TonAddress` is the single canonical
//! value used by core logic; both external encodings are converted at
//! the boundary and re-emitted losslessly, flags included.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;

use crate::error::{Error, Result};

/// Friendly-format tag for bounceable addresses
const TAG_BOUNCEABLE: u8 = 0x11;
/// Friendly-format tag for non-bounceable addresses
const TAG_NON_BOUNCEABLE: u8 = 0x51;
/// Tag bit marking a testnet-only address
const TAG_TEST_ONLY: u8 = 0x80;

/// Canonical TON account address
///
/// Carries the encoding metadata captured at parse time so that
/// re-encoding reproduces the original external representation
/// exactly (workchain, bounceable/testnet flags, base64 alphabet).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TonAddress {
    workchain: i8,
    hash: [u8; 32],
    bounceable: bool,
    testnet: bool,
    url_safe: bool,
    raw_form: bool,
}

impl TonAddress {
    /// Construct an address from its parts, rendered user-friendly
    /// bounceable by default
    pub fn new(workchain: i8, hash: [u8; 32]) -> Self {
        Self {
            workchain,
            hash,
            bounceable: true,
            testnet: false,
            url_safe: true,
            raw_form: false,
        }
    }

    /// Parse either external encoding
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.contains(':') {
            Self::parse_raw(input)
        } else {
            Self::parse_friendly(input)
        }
    }

    /// Parse the raw `workchain:hex` form
    ///
    /// Raw addresses carry no flags; they re-encode as raw and are
    /// treated as non-bounceable for transfer purposes.
    fn parse_raw(input: &str) -> Result<Self> {
        let (wc, hex_part) = input
            .split_once(':')
            .ok_or_else(|| Error::InvalidAddress(format!("missing workchain separator: {}", input)))?;

        let workchain: i8 = wc
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("bad workchain: {}", wc)))?;

        if hex_part.len() != 64 {
            return Err(Error::InvalidAddress(format!(
                "account id must be 64 hex chars, got {}",
                hex_part.len()
            )));
        }
        let bytes = hex::decode(hex_part)
            .map_err(|e| Error::InvalidAddress(format!("bad account id hex: {}", e)))?;
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes);

        Ok(Self {
            workchain,
            hash,
            bounceable: false,
            testnet: false,
            url_safe: true,
            raw_form: true,
        })
    }

    /// Parse the 48-character user-friendly base64 form
    fn parse_friendly(input: &str) -> Result<Self> {
        if input.len() != 48 {
            return Err(Error::InvalidAddress(format!(
                "friendly address must be 48 chars, got {}",
                input.len()
            )));
        }

        // Either alphabet is accepted; remember which one was used.
        let url_safe = !input.contains('+') && !input.contains('/');
        let bytes = if url_safe {
            URL_SAFE.decode(input)
        } else {
            STANDARD.decode(input)
        }
        .map_err(|e| Error::InvalidAddress(format!("bad base64: {}", e)))?;

        if bytes.len() != 36 {
            return Err(Error::InvalidAddress(format!(
                "friendly address must decode to 36 bytes, got {}",
                bytes.len()
            )));
        }

        let expected = crc16_xmodem(&bytes[..34]);
        let actual = u16::from_be_bytes([bytes[34], bytes[35]]);
        if expected != actual {
            return Err(Error::InvalidAddress(format!(
                "checksum mismatch: expected {:04x}, got {:04x}",
                expected, actual
            )));
        }

        let mut tag = bytes[0];
        let testnet = tag & TAG_TEST_ONLY != 0;
        tag &= !TAG_TEST_ONLY;
        let bounceable = match tag {
            TAG_BOUNCEABLE => true,
            TAG_NON_BOUNCEABLE => false,
            _ => {
                return Err(Error::InvalidAddress(format!("unknown address tag: {:#04x}", tag)));
            }
        };

        let workchain = bytes[1] as i8;
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[2..34]);

        Ok(Self {
            workchain,
            hash,
            bounceable,
            testnet,
            url_safe,
            raw_form: false,
        })
    }

    pub fn workchain(&self) -> i8 {
        self.workchain
    }

    pub fn hash(&self) -> &[u8; 32] {
        &self.hash
    }

    /// Bounce flag for transfers to this address, as encoded by the
    /// caller that produced it
    pub fn is_bounceable(&self) -> bool {
        self.bounceable
    }

    pub fn is_testnet(&self) -> bool {
        self.testnet
    }

    /// Raw `workchain:hex` encoding
    pub fn to_raw(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash))
    }

    /// User-friendly base64 encoding with explicit flags
    pub fn to_friendly(&self, bounceable: bool, testnet: bool, url_safe: bool) -> String {
        let mut tag = if bounceable { TAG_BOUNCEABLE } else { TAG_NON_BOUNCEABLE };
        if testnet {
            tag |= TAG_TEST_ONLY;
        }

        let mut bytes = [0u8; 36];
        bytes[0] = tag;
        bytes[1] = self.workchain as u8;
        bytes[2..34].copy_from_slice(&self.hash);
        let crc = crc16_xmodem(&bytes[..34]);
        bytes[34..36].copy_from_slice(&crc.to_be_bytes());

        if url_safe {
            URL_SAFE.encode(bytes)
        } else {
            STANDARD.encode(bytes)
        }
    }
}

impl fmt::Display for TonAddress {
    /// Re-encode in the captured source form: `parse(s).to_string() == s`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.raw_form {
            write!(f, "{}", self.to_raw())
        } else {
            write!(f, "{}", self.to_friendly(self.bounceable, self.testnet, self.url_safe))
        }
    }
}

impl fmt::Debug for TonAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TonAddress({})", self)
    }
}

impl FromStr for TonAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// CRC16-XMODEM over the tag + workchain + account id bytes
fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TonAddress {
        TonAddress::new(0, [0xAB; 32])
    }

    #[test]
    fn test_crc16_vector() {
        assert_eq!(crc16_xmodem(b"123456789"), 0x31C3);
    }

    #[test]
    fn test_raw_round_trip() {
        let raw = sample().to_raw();
        let parsed = TonAddress::parse(&raw).unwrap();
        assert_eq!(parsed.workchain(), 0);
        assert_eq!(parsed.hash(), &[0xAB; 32]);
        assert_eq!(parsed.to_string(), raw);
    }

    #[test]
    fn test_friendly_round_trip_all_flags() {
        for bounceable in [true, false] {
            for testnet in [true, false] {
                for url_safe in [true, false] {
                    let friendly = sample().to_friendly(bounceable, testnet, url_safe);
                    let parsed = TonAddress::parse(&friendly).unwrap();
                    assert_eq!(parsed.is_bounceable(), bounceable);
                    assert_eq!(parsed.is_testnet(), testnet);
                    assert_eq!(parsed.hash(), &[0xAB; 32]);
                    // lossless: flags and alphabet survive re-encoding
                    assert_eq!(parsed.to_string(), friendly);
                }
            }
        }
    }

    #[test]
    fn test_negative_workchain() {
        let addr = TonAddress::parse(&format!("-1:{}", hex::encode([0x01; 32]))).unwrap();
        assert_eq!(addr.workchain(), -1);
        let friendly = addr.to_friendly(true, false, true);
        assert_eq!(TonAddress::parse(&friendly).unwrap().workchain(), -1);
    }

    #[test]
    fn test_rejects_malformed() {
        // wrong length
        assert!(TonAddress::parse("EQAb").is_err());
        // bad hex
        assert!(TonAddress::parse(&format!("0:{}", "zz".repeat(32))).is_err());
        // short account id
        assert!(TonAddress::parse("0:abcd").is_err());
        // corrupted checksum
        let mut friendly = sample().to_friendly(true, false, true).into_bytes();
        friendly[47] = if friendly[47] == b'A' { b'B' } else { b'A' };
        let corrupted = String::from_utf8(friendly).unwrap();
        assert!(matches!(
            TonAddress::parse(&corrupted),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_tag() {
        let mut bytes = [0u8; 36];
        bytes[0] = 0x22; // neither bounceable nor non-bounceable tag
        bytes[2..34].copy_from_slice(&[0xAB; 32]);
        let crc = crc16_xmodem(&bytes[..34]);
        bytes[34..36].copy_from_slice(&crc.to_be_bytes());
        let encoded = URL_SAFE.encode(bytes);
        assert!(matches!(
            TonAddress::parse(&encoded),
            Err(Error::InvalidAddress(_))
        ));
    }
}
