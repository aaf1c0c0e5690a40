//! Cross-chain request parameters as the relay chain serializes them.

use serde::{Deserialize, Serialize};

use crate::codec::{Sink, Source};
use crate::CodecError;

/// Parameters of a cross-chain call, as emitted on the source chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeTxParam {
    #[serde(with = "hex::serde")]
    pub tx_hash: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub cross_chain_id: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub from_contract: Vec<u8>,
    /// Target chain id.
    pub to_chain_id: u64,
    #[serde(with = "hex::serde")]
    pub to_contract: Vec<u8>,
    /// Method invoked on the target contract.
    pub method: String,
    #[serde(with = "hex::serde")]
    pub args: Vec<u8>,
}

impl MakeTxParam {
    pub fn read(source: &mut Source<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            tx_hash: source.next_var_bytes("param tx hash")?.to_vec(),
            cross_chain_id: source.next_var_bytes("param cross chain id")?.to_vec(),
            from_contract: source.next_var_bytes("param from contract")?.to_vec(),
            to_chain_id: source.next_u64("param to chain id")?,
            to_contract: source.next_var_bytes("param to contract")?.to_vec(),
            method: source.next_var_string("param method")?,
            args: source.next_var_bytes("param args")?.to_vec(),
        })
    }

    pub fn write(&self, sink: &mut Sink) {
        sink.write_var_bytes(&self.tx_hash)
            .write_var_bytes(&self.cross_chain_id)
            .write_var_bytes(&self.from_contract)
            .write_u64(self.to_chain_id)
            .write_var_bytes(&self.to_contract)
            .write_var_string(&self.method)
            .write_var_bytes(&self.args);
    }

    /// Decode a complete payload; trailing bytes are rejected.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut source = Source::new(bytes);
        let param = Self::read(&mut source)?;
        source.finish()?;
        Ok(param)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut sink = Sink::new();
        self.write(&mut sink);
        sink.into_bytes()
    }
}

/// Value committed in the relay chain's cross-states tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToMerkleValue {
    /// Relay-chain transaction hash.
    #[serde(with = "hex::serde")]
    pub tx_hash: Vec<u8>,
    pub from_chain_id: u64,
    pub param: MakeTxParam,
}

impl ToMerkleValue {
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut source = Source::new(bytes);
        let tx_hash = source.next_var_bytes("merkle value tx hash")?.to_vec();
        let from_chain_id = source.next_u64("merkle value from chain id")?;
        let param = MakeTxParam::read(&mut source)?;
        source.finish()?;
        Ok(Self {
            tx_hash,
            from_chain_id,
            param,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut sink = Sink::new();
        sink.write_var_bytes(&self.tx_hash)
            .write_u64(self.from_chain_id);
        self.param.write(&mut sink);
        sink.into_bytes()
    }
}
