//! Conversion of keeper signatures into the EVM recovery format.
//!
//! Relay signatures are `scheme || value`; a bare 64-byte value is an
//! SHA256withECDSA `r || s`. EVM verifiers need a recoverable signature, so
//! only ECDSA schemes carrying a 65-byte compact value `v || r || s` convert.

use crate::CodecError;

/// Highest ECDSA scheme id (`RIPEMD160withECDSA`); SM2 and EdDSA follow.
pub const MAX_ECDSA_SCHEME: u8 = 8;
pub const SCHEME_SM3_WITH_SM2: u8 = 9;
pub const SCHEME_SHA512_WITH_EDDSA: u8 = 10;

/// Length of an EVM `r || s || v` signature.
pub const EVM_SIGNATURE_LEN: usize = 65;

/// Convert one native keeper signature to `r || s || v` with `v` in `0..=3`.
pub fn to_evm_compatible(sig: &[u8]) -> Result<[u8; EVM_SIGNATURE_LEN], CodecError> {
    if sig.len() == 64 {
        return Err(CodecError::Invalid(
            "signature has no recovery id".into(),
        ));
    }
    let (scheme, value) = sig
        .split_first()
        .ok_or_else(|| CodecError::Invalid("empty signature".into()))?;
    if *scheme > MAX_ECDSA_SCHEME {
        return Err(CodecError::Invalid(format!(
            "signature scheme {} is not ECDSA",
            scheme
        )));
    }
    if value.len() != EVM_SIGNATURE_LEN {
        return Err(CodecError::Invalid(format!(
            "recoverable signature must be {} bytes, got {}",
            EVM_SIGNATURE_LEN,
            value.len()
        )));
    }

    let header = value[0];
    if !(27..=34).contains(&header) {
        return Err(CodecError::Invalid(format!("invalid recovery byte {}", header)));
    }
    // 31..=34 flag a compressed public key; the recovery id is the same.
    let recid = (header - 27) & 0x03;

    let mut out = [0u8; EVM_SIGNATURE_LEN];
    out[..64].copy_from_slice(&value[1..]);
    out[64] = recid;
    Ok(out)
}

/// Convert a full signature set; one failure fails the set.
pub fn convert_all<'a, I>(sigs: I) -> Result<Vec<u8>, CodecError>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut out = Vec::new();
    for (i, sig) in sigs.into_iter().enumerate() {
        let converted = to_evm_compatible(sig)
            .map_err(|e| CodecError::Invalid(format!("signature {}: {}", i, e)))?;
        out.extend_from_slice(&converted);
    }
    Ok(out)
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// A recoverable SHA3-256 ECDSA signature with the given recovery byte.
    pub fn recoverable(v: u8, fill: u8) -> Vec<u8> {
        let mut sig = vec![5u8, v];
        sig.extend_from_slice(&[fill; 32]);
        sig.extend_from_slice(&[fill.wrapping_add(1); 32]);
        sig
    }
}
