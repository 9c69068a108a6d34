//! Permission parameters.
//!
//! A parameterized grant carries an ordered list of [`Param`]s. Param `0` is
//! the root of the rule; logic params refer to other params by index, so a
//! list forms a small expression graph. Each param packs into one 256-bit
//! word: `id (8 bits) | op (8 bits) | value (240 bits)`.

use crate::{Error, Result};
use alloy_primitives::{Address, B256, U256, keccak256};
use serde::{Deserialize, Serialize};

/// Compare against the current block number.
pub const BLOCK_NUMBER_PARAM_ID: u8 = 200;
/// Compare against the current block timestamp.
pub const TIMESTAMP_PARAM_ID: u8 = 201;
/// Ask an external oracle; `value` holds its address.
pub const ORACLE_PARAM_ID: u8 = 203;
/// Combine other params; `value` holds their indices.
pub const LOGIC_OP_PARAM_ID: u8 = 204;
/// Use `value` itself.
pub const PARAM_VALUE_PARAM_ID: u8 = 205;

/// Comparison and logic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Op {
    None = 0,
    Eq = 1,
    Neq = 2,
    Gt = 3,
    Lt = 4,
    Gte = 5,
    Lte = 6,
    /// True when the resolved value is non-zero.
    Ret = 7,
    Not = 8,
    And = 9,
    Or = 10,
    Xor = 11,
    /// `value` holds (condition, success, failure) indices.
    IfElse = 12,
}

impl TryFrom<u8> for Op {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self> {
        Ok(match byte {
            0 => Op::None,
            1 => Op::Eq,
            2 => Op::Neq,
            3 => Op::Gt,
            4 => Op::Lt,
            5 => Op::Gte,
            6 => Op::Lte,
            7 => Op::Ret,
            8 => Op::Not,
            9 => Op::And,
            10 => Op::Or,
            11 => Op::Xor,
            12 => Op::IfElse,
            other => return Err(Error::InvalidOp(other)),
        })
    }
}

impl Op {
    /// Apply a comparison operator. Non-comparison operators yield false.
    pub fn compare(self, a: U256, b: U256) -> bool {
        match self {
            Op::Eq => a == b,
            Op::Neq => a != b,
            Op::Gt => a > b,
            Op::Lt => a < b,
            Op::Gte => a >= b,
            Op::Lte => a <= b,
            _ => false,
        }
    }
}

/// Largest value a param can carry.
pub fn value_mask() -> U256 {
    (U256::from(1u8) << 240) - U256::from(1u8)
}

/// One condition of a parameterized grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Param {
    /// Argument slot (`0..=199`) or one of the special `*_PARAM_ID`s.
    pub id: u8,
    pub op: Op,
    /// 240-bit payload.
    pub value: U256,
}

impl Param {
    pub fn new(id: u8, op: Op, value: U256) -> Result<Self> {
        let param = Self { id, op, value };
        param.validate()?;
        Ok(param)
    }

    /// Compare positional argument `index` against `value`.
    pub fn arg(index: u8, op: Op, value: impl Into<U256>) -> Self {
        Self {
            id: index,
            op,
            value: value.into() & value_mask(),
        }
    }

    pub fn block_number(op: Op, number: u64) -> Self {
        Self {
            id: BLOCK_NUMBER_PARAM_ID,
            op,
            value: U256::from(number),
        }
    }

    pub fn timestamp(op: Op, timestamp: u64) -> Self {
        Self {
            id: TIMESTAMP_PARAM_ID,
            op,
            value: U256::from(timestamp),
        }
    }

    /// Delegate the decision to the oracle deployed at `oracle`.
    pub fn oracle(oracle: Address) -> Self {
        Self {
            id: ORACLE_PARAM_ID,
            op: Op::Eq,
            value: U256::from_be_slice(oracle.as_slice()),
        }
    }

    /// A constant outcome: true when `value` is non-zero.
    pub fn constant(value: bool) -> Self {
        Self {
            id: PARAM_VALUE_PARAM_ID,
            op: Op::Ret,
            value: U256::from(value as u8),
        }
    }

    pub fn not(param: u32) -> Self {
        Self::logic(Op::Not, param, 0, 0)
    }

    pub fn and(left: u32, right: u32) -> Self {
        Self::logic(Op::And, left, right, 0)
    }

    pub fn or(left: u32, right: u32) -> Self {
        Self::logic(Op::Or, left, right, 0)
    }

    pub fn xor(left: u32, right: u32) -> Self {
        Self::logic(Op::Xor, left, right, 0)
    }

    pub fn if_else(condition: u32, success: u32, failure: u32) -> Self {
        Self::logic(Op::IfElse, condition, success, failure)
    }

    fn logic(op: Op, a: u32, b: u32, c: u32) -> Self {
        Self {
            id: LOGIC_OP_PARAM_ID,
            op,
            value: encode_params_list(a, b, c),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.value > value_mask() {
            return Err(Error::ValueTooWide);
        }
        Ok(())
    }

    /// Oracle address held in the low 160 bits of `value`.
    pub fn oracle_address(&self) -> Address {
        Address::from_word(B256::from(self.value.to_be_bytes::<32>()))
    }

    /// Pack into a single word.
    pub fn encode(&self) -> U256 {
        (U256::from(self.id) << 248) | (U256::from(self.op as u8) << 240) | (self.value & value_mask())
    }

    /// Unpack a word produced by [`Param::encode`].
    pub fn decode(word: U256) -> Result<Self> {
        let id = low_u64(word >> 248) as u8;
        let op = Op::try_from(low_u64((word >> 240) & U256::from(0xffu8)) as u8)?;
        Ok(Self {
            id,
            op,
            value: word & value_mask(),
        })
    }
}

/// Pack up to three param indices into a logic param value.
pub fn encode_params_list(a: u32, b: u32, c: u32) -> U256 {
    U256::from(a) | (U256::from(b) << 32) | (U256::from(c) << 64)
}

/// Inverse of [`encode_params_list`].
pub fn decode_params_list(value: U256) -> (u32, u32, u32) {
    let mask = U256::from(u32::MAX);
    (
        low_u64(value & mask) as u32,
        low_u64((value >> 32) & mask) as u32,
        low_u64((value >> 64) & mask) as u32,
    )
}

/// Identity of a param list; the hash of the packed words in order.
pub fn params_hash(params: &[Param]) -> B256 {
    let mut packed = Vec::with_capacity(params.len() * 32);
    for param in params {
        packed.extend_from_slice(&param.encode().to_be_bytes::<32>());
    }
    keccak256(packed)
}

/// Hash of the empty list, which marks a plain grant.
pub fn empty_params_hash() -> B256 {
    params_hash(&[])
}

fn low_u64(value: U256) -> u64 {
    value.as_limbs()[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn packing_layout() {
        let param = Param::arg(2, Op::Gt, U256::from(5u8));
        let word = param.encode();
        assert_eq!(low_u64(word >> 248), 2);
        assert_eq!(low_u64((word >> 240) & U256::from(0xffu8)), Op::Gt as u64);
        assert_eq!(word & value_mask(), U256::from(5u8));
    }

    #[test]
    fn oracle_param_holds_address() {
        let oracle = Address::repeat_byte(0x42);
        let param = Param::oracle(oracle);
        assert_eq!(param.id, ORACLE_PARAM_ID);
        assert_eq!(param.oracle_address(), oracle);
    }

    #[test]
    fn unknown_operator_rejected() {
        let word = (U256::from(1u8) << 248) | (U256::from(99u8) << 240);
        assert_eq!(Param::decode(word), Err(Error::InvalidOp(99)));
    }

    #[test]
    fn wide_values_rejected() {
        assert_eq!(
            Param::new(0, Op::Eq, U256::from(1u8) << 240),
            Err(Error::ValueTooWide)
        );
        assert!(Param::new(0, Op::Eq, value_mask()).is_ok());
    }

    #[test]
    fn params_hash_is_order_sensitive() {
        let a = Param::arg(0, Op::Eq, U256::from(1u8));
        let b = Param::arg(1, Op::Eq, U256::from(1u8));
        assert_ne!(params_hash(&[a, b]), params_hash(&[b, a]));
        assert_ne!(params_hash(&[a]), empty_params_hash());
    }

    #[test]
    fn serde_uses_operator_names() {
        let json = serde_json::to_string(&Param::arg(0, Op::Gte, U256::from(1u8))).unwrap();
        assert!(json.contains("\"GTE\""), "{json}");
    }

    proptest! {
        #[test]
        fn params_list_roundtrip(a: u32, b: u32, c: u32) {
            prop_assert_eq!(decode_params_list(encode_params_list(a, b, c)), (a, b, c));
        }

        #[test]
        fn param_word_roundtrip(id: u8, op in 0u8..=12, value: [u8; 30]) {
            let param = Param::new(id, Op::try_from(op).unwrap(), U256::from_be_slice(&value)).unwrap();
            prop_assert_eq!(Param::decode(param.encode()).unwrap(), param);
        }
    }
}
