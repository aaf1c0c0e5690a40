//! Keeper public keys across the curve families the relay chain accepts.
//!
//! Two canonical byte forms are produced: the relay chain's native
//! serialization and an EVM-compatible uncompressed point used for
//! Keccak-256 fingerprints.

use std::cmp::Ordering;
use std::fmt;

use elliptic_curve::sec1::ToEncodedPoint;

use crate::KeyError;

/// Key type byte for ECDSA keys on a named curve.
pub const KEY_TYPE_ECDSA: u8 = 0x12;
/// Key type byte for SM2 keys.
pub const KEY_TYPE_SM2: u8 = 0x13;
/// Key type byte for Ed25519 keys.
pub const KEY_TYPE_EDDSA: u8 = 0x14;

/// Curve label the relay chain assigns to Ed25519.
pub const ED25519_LABEL: u8 = 25;

/// Elliptic curves usable for keeper keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Curve {
    P224,
    P256,
    P384,
    P521,
    Secp256k1,
    Sm2,
}

impl Curve {
    pub const ALL: [Curve; 6] = [
        Curve::P224,
        Curve::P256,
        Curve::P384,
        Curve::P521,
        Curve::Secp256k1,
        Curve::Sm2,
    ];

    /// One-byte label written into native key encodings.
    pub fn label(self) -> u8 {
        match self {
            Curve::P224 => 1,
            Curve::P256 => 2,
            Curve::P384 => 3,
            Curve::P521 => 4,
            Curve::Secp256k1 => 5,
            Curve::Sm2 => 20,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Curve::P224 => "P-224",
            Curve::P256 => "P-256",
            Curve::P384 => "P-384",
            Curve::P521 => "P-521",
            Curve::Secp256k1 => "secp256k1",
            Curve::Sm2 => "SM2P256V1",
        }
    }

    /// Case-insensitive lookup by curve name.
    pub fn from_name(name: &str) -> Result<Self, KeyError> {
        Curve::ALL
            .into_iter()
            .find(|curve| curve.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| KeyError::UnknownCurve(name.to_string()))
    }

    pub fn from_label(label: u8) -> Result<Self, KeyError> {
        Curve::ALL
            .into_iter()
            .find(|curve| curve.label() == label)
            .ok_or_else(|| KeyError::UnknownCurve(format!("label {}", label)))
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Label for a curve name, compared case-insensitively.
pub fn curve_label(name: &str) -> Result<u8, KeyError> {
    Curve::from_name(name).map(Curve::label)
}

/// A keeper's public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeeperKey {
    P224(p224::PublicKey),
    P256(p256::PublicKey),
    P384(p384::PublicKey),
    P521(p521::PublicKey),
    Secp256k1(k256::PublicKey),
    Sm2(sm2::PublicKey),
    Ed25519(ed25519_dalek::VerifyingKey),
}

impl KeeperKey {
    /// Parse the relay chain's native key serialization.
    ///
    /// Bare 33- or 65-byte SEC1 points are P-256. Otherwise the first byte is
    /// the key type and the second the curve label.
    pub fn decode_native(bytes: &[u8]) -> Result<Self, KeyError> {
        match bytes.first() {
            None => Err(KeyError::InvalidKey("empty key".into())),
            Some(0x02 | 0x03 | 0x04) if matches!(bytes.len(), 33 | 65) => {
                Self::from_sec1(Curve::P256, bytes)
            }
            Some(&KEY_TYPE_ECDSA) => {
                let (curve, point) = split_labelled(bytes)?;
                if curve == Curve::Sm2 {
                    return Err(KeyError::InvalidKey("SM2 curve under ECDSA key type".into()));
                }
                Self::from_sec1(curve, point)
            }
            Some(&KEY_TYPE_SM2) => {
                let (curve, point) = split_labelled(bytes)?;
                if curve != Curve::Sm2 {
                    return Err(KeyError::InvalidKey(format!("{} curve under SM2 key type", curve)));
                }
                Self::from_sec1(curve, point)
            }
            Some(&KEY_TYPE_EDDSA) => {
                if bytes.len() != 2 + ed25519_dalek::PUBLIC_KEY_LENGTH || bytes[1] != ED25519_LABEL {
                    return Err(KeyError::InvalidKey("malformed ed25519 key".into()));
                }
                let mut raw = [0u8; ed25519_dalek::PUBLIC_KEY_LENGTH];
                raw.copy_from_slice(&bytes[2..]);
                ed25519_dalek::VerifyingKey::from_bytes(&raw)
                    .map(KeeperKey::Ed25519)
                    .map_err(|e| KeyError::InvalidKey(e.to_string()))
            }
            Some(other) => Err(KeyError::InvalidKey(format!("unknown key type {:#04x}", other))),
        }
    }

    /// Parse a SEC1 point (compressed or uncompressed) on `curve`.
    pub fn from_sec1(curve: Curve, point: &[u8]) -> Result<Self, KeyError> {
        let invalid = |_| KeyError::InvalidKey(format!("bad {} point", curve));
        Ok(match curve {
            Curve::P224 => KeeperKey::P224(p224::PublicKey::from_sec1_bytes(point).map_err(invalid)?),
            Curve::P256 => KeeperKey::P256(p256::PublicKey::from_sec1_bytes(point).map_err(invalid)?),
            Curve::P384 => KeeperKey::P384(p384::PublicKey::from_sec1_bytes(point).map_err(invalid)?),
            Curve::P521 => KeeperKey::P521(p521::PublicKey::from_sec1_bytes(point).map_err(invalid)?),
            Curve::Secp256k1 => {
                KeeperKey::Secp256k1(k256::PublicKey::from_sec1_bytes(point).map_err(invalid)?)
            }
            Curve::Sm2 => KeeperKey::Sm2(sm2::PublicKey::from_sec1_bytes(point).map_err(invalid)?),
        })
    }

    /// The curve, or `None` for Ed25519.
    pub fn curve(&self) -> Option<Curve> {
        match self {
            KeeperKey::P224(_) => Some(Curve::P224),
            KeeperKey::P256(_) => Some(Curve::P256),
            KeeperKey::P384(_) => Some(Curve::P384),
            KeeperKey::P521(_) => Some(Curve::P521),
            KeeperKey::Secp256k1(_) => Some(Curve::Secp256k1),
            KeeperKey::Sm2(_) => Some(Curve::Sm2),
            KeeperKey::Ed25519(_) => None,
        }
    }

    pub fn key_type(&self) -> u8 {
        match self {
            KeeperKey::Sm2(_) => KEY_TYPE_SM2,
            KeeperKey::Ed25519(_) => KEY_TYPE_EDDSA,
            _ => KEY_TYPE_ECDSA,
        }
    }

    /// Uncompressed SEC1 point `0x04 || X || Y`.
    pub fn uncompressed_point(&self) -> Result<Vec<u8>, KeyError> {
        Ok(match self {
            KeeperKey::P224(k) => k.to_encoded_point(false).as_bytes().to_vec(),
            KeeperKey::P256(k) => k.to_encoded_point(false).as_bytes().to_vec(),
            KeeperKey::P384(k) => k.to_encoded_point(false).as_bytes().to_vec(),
            KeeperKey::P521(k) => k.to_encoded_point(false).as_bytes().to_vec(),
            KeeperKey::Secp256k1(k) => k.to_encoded_point(false).as_bytes().to_vec(),
            KeeperKey::Sm2(k) => k.to_encoded_point(false).as_bytes().to_vec(),
            KeeperKey::Ed25519(_) => {
                return Err(KeyError::UnsupportedKeyType("ed25519 has no SEC1 point".into()))
            }
        })
    }

    /// The relay chain's native form.
    ///
    /// P-256 is the bare uncompressed point; every other curve is
    /// `key type || curve label || uncompressed point`.
    pub fn encode_native(&self) -> Result<Vec<u8>, KeyError> {
        let curve = match self.curve() {
            Some(curve) => curve,
            None => return Err(KeyError::UnsupportedKeyType("ed25519 keeper key".into())),
        };
        let point = self.uncompressed_point()?;
        if curve == Curve::P256 {
            return Ok(point);
        }

        let mut out = Vec::with_capacity(point.len() + 2);
        out.push(self.key_type());
        out.push(curve.label());
        out.extend_from_slice(&point);
        Ok(out)
    }

    /// Uncompressed point in the form EVM signature recovery produces.
    pub fn encode_evm_compatible(&self) -> Result<Vec<u8>, KeyError> {
        match self {
            KeeperKey::Ed25519(_) => Err(KeyError::UnsupportedKeyType("ed25519 keeper key".into())),
            _ => self.uncompressed_point(),
        }
    }

    /// Key material used for ordering: the uncompressed point for EC keys,
    /// the raw 32 bytes for Ed25519.
    fn order_bytes(&self) -> Vec<u8> {
        match self {
            KeeperKey::Ed25519(k) => k.as_bytes().to_vec(),
            other => other.uncompressed_point().unwrap_or_default(),
        }
    }

    fn order_label(&self) -> u8 {
        self.curve().map(Curve::label).unwrap_or(ED25519_LABEL)
    }
}

impl Ord for KeeperKey {
    /// Key type, then curve label, then X and Y as big-endian integers.
    fn cmp(&self, other: &Self) -> Ordering {
        self.key_type()
            .cmp(&other.key_type())
            .then_with(|| self.order_label().cmp(&other.order_label()))
            .then_with(|| self.order_bytes().cmp(&other.order_bytes()))
    }
}

impl PartialOrd for KeeperKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn split_labelled(bytes: &[u8]) -> Result<(Curve, &[u8]), KeyError> {
    if bytes.len() < 3 {
        return Err(KeyError::InvalidKey("truncated key".into()));
    }
    Ok((Curve::from_label(bytes[1])?, &bytes[2..]))
}


#[cfg(test)]
mod tests {
    use super::test_keys::*;
    use super::*;

    #[test]
    fn test_curve_labels_any_case() {
        let expected = [
            ("P-224", 1u8),
            ("P-256", 2),
            ("P-384", 3),
            ("P-521", 4),
            ("secp256k1", 5),
            ("SM2P256V1", 20),
        ];
        for (name, label) in expected {
            assert_eq!(curve_label(name).unwrap(), label);
            assert_eq!(curve_label(&name.to_lowercase()).unwrap(), label);
            assert_eq!(curve_label(&name.to_uppercase()).unwrap(), label);
        }
    }

    #[test]
    fn test_unknown_curve_is_an_error() {
        for name in ["", "P-192", "ed25519", "brainpoolP256r1", "P256"] {
            assert!(matches!(curve_label(name), Err(KeyError::UnknownCurve(_))));
        }
    }

    #[test]
    fn test_p256_native_has_no_prefix() {
        let key = random_key(Curve::P256);
        let native = key.encode_native().unwrap();
        assert_eq!(native.len(), 65);
        assert_eq!(native[0], 0x04);
        assert_eq!(native, key.encode_evm_compatible().unwrap());
    }

    #[test]
    fn test_native_prefixes() {
        for (curve, key_type, point_len) in [
            (Curve::P224, KEY_TYPE_ECDSA, 57),
            (Curve::P384, KEY_TYPE_ECDSA, 97),
            (Curve::P521, KEY_TYPE_ECDSA, 133),
            (Curve::Secp256k1, KEY_TYPE_ECDSA, 65),
            (Curve::Sm2, KEY_TYPE_SM2, 65),
        ] {
            let key = random_key(curve);
            let native = key.encode_native().unwrap();
            assert_eq!(native[0], key_type, "{}", curve);
            assert_eq!(native[1], curve.label(), "{}", curve);
            assert_eq!(native.len(), 2 + point_len, "{}", curve);
            assert_eq!(&native[2..], key.encode_evm_compatible().unwrap().as_slice());
        }
    }

    #[test]
    fn test_native_decode_roundtrip() {
        for curve in Curve::ALL {
            let key = random_key(curve);
            let native = key.encode_native().unwrap();
            assert_eq!(KeeperKey::decode_native(&native).unwrap(), key, "{}", curve);
        }
    }

    #[test]
    fn test_compressed_p256_decodes() {
        let key = random_key(Curve::P256);
        let KeeperKey::P256(inner) = &key else {
            panic!("expected p256");
        };
        let compressed = inner.to_encoded_point(true);
        assert_eq!(KeeperKey::decode_native(compressed.as_bytes()).unwrap(), key);
    }

    #[test]
    fn test_ed25519_is_unsupported() {
        let key = ed25519_key();
        assert!(matches!(key.encode_native(), Err(KeyError::UnsupportedKeyType(_))));
        assert!(matches!(key.encode_evm_compatible(), Err(KeyError::UnsupportedKeyType(_))));

        let KeeperKey::Ed25519(inner) = &key else {
            panic!("expected ed25519");
        };
        let mut native = vec![KEY_TYPE_EDDSA, ED25519_LABEL];
        native.extend_from_slice(inner.as_bytes());
        assert_eq!(KeeperKey::decode_native(&native).unwrap(), key);
    }

    #[test]
    fn test_mismatched_key_type_and_label_rejected() {
        let key = random_key(Curve::Sm2);
        let mut native = key.encode_native().unwrap();
        native[0] = KEY_TYPE_ECDSA;
        assert!(KeeperKey::decode_native(&native).is_err());

        assert!(KeeperKey::decode_native(&[]).is_err());
        assert!(KeeperKey::decode_native(&[0x12, 99, 1, 2]).is_err());
    }

    #[test]
    fn test_order_groups_by_type_then_curve() {
        let p384 = random_key(Curve::P384);
        let p224 = random_key(Curve::P224);
        let sm2 = random_key(Curve::Sm2);
        let ed = ed25519_key();

        let mut keys = vec![ed.clone(), sm2.clone(), p384.clone(), p224.clone()];
        keys.sort();
        assert_eq!(keys, vec![p224, p384, sm2, ed]);
    }
}
