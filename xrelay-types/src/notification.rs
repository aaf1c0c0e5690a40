//! Relay-chain contract notifications and the typed proof envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::CodecError;

/// Method tag of the notification that announces a cross-chain proof.
pub const MAKE_PROOF_METHOD: &str = "makeProof";

/// Minimum number of states a proof notification carries.
pub const MAKE_PROOF_MIN_STATES: usize = 6;

/// One contract notification inside a relay-chain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "ContractAddress")]
    pub contract_address: String,
    #[serde(rename = "States")]
    pub states: Value,
}

/// All notifications emitted by one relay-chain transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayEvent {
    #[serde(rename = "TxHash")]
    pub tx_hash: String,
    #[serde(rename = "Notify", default)]
    pub notifications: Vec<Notification>,
}

/// A validated `makeProof` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofNotification {
    pub from_chain_id: u64,
    pub to_chain_id: u64,
    /// Source transaction hash, hex.
    pub tx_hash: String,
    pub height: u32,
    /// Cross-states key, hex.
    pub key: String,
}

impl ProofNotification {
    /// Validate field count and types once. `Ok(None)` means the notification
    /// is from another contract or another method.
    pub fn parse(notification: &Notification, ccm_address: &str) -> Result<Option<Self>, CodecError> {
        if !notification.contract_address.eq_ignore_ascii_case(ccm_address) {
            return Ok(None);
        }
        let Some(states) = notification.states.as_array() else {
            return Ok(None);
        };
        if states.first().and_then(Value::as_str) != Some(MAKE_PROOF_METHOD) {
            return Ok(None);
        }
        if states.len() < MAKE_PROOF_MIN_STATES {
            return Err(CodecError::Invalid(format!(
                "makeProof notification has {} states, need {}",
                states.len(),
                MAKE_PROOF_MIN_STATES
            )));
        }

        let height = as_u64(&states[4], "height")?;
        Ok(Some(Self {
            from_chain_id: as_u64(&states[1], "from chain id")?,
            to_chain_id: as_u64(&states[2], "to chain id")?,
            tx_hash: as_hex(&states[3], "tx hash")?,
            height: u32::try_from(height)
                .map_err(|_| CodecError::Invalid(format!("height {} overflows u32", height)))?,
            key: as_hex(&states[5], "key")?,
        }))
    }
}

fn as_u64(value: &Value, field: &str) -> Result<u64, CodecError> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| CodecError::Invalid(format!("makeProof {} is not an unsigned integer", field)))
}

fn as_hex(value: &Value, field: &str) -> Result<String, CodecError> {
    let s = value
        .as_str()
        .ok_or_else(|| CodecError::Invalid(format!("makeProof {} is not a string", field)))?;
    hex::decode(s).map_err(|e| CodecError::Invalid(format!("makeProof {}: {}", field, e)))?;
    Ok(s.to_string())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use serde_json::json;

    pub const CCM: &str = "0300000000000000000000000000000000000000";

    pub fn make_proof(to_chain_id: u64, height: u32, key: &str) -> Notification {
        Notification {
            contract_address: CCM.to_string(),
            states: json!(["makeProof", 2, to_chain_id, "abcd", height, key]),
        }
    }
}
