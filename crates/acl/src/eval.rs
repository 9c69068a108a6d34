//! Parameter evaluation.

use crate::params::{
    BLOCK_NUMBER_PARAM_ID, LOGIC_OP_PARAM_ID, ORACLE_PARAM_ID, Op, PARAM_VALUE_PARAM_ID, Param,
    TIMESTAMP_PARAM_ID, decode_params_list, value_mask,
};
use alloy_primitives::{Address, B256, U256};
use tracing::debug;

/// The question being asked of the permission engine.
#[derive(Debug, Clone, Copy)]
pub struct PermissionRequest<'a> {
    /// Entity performing the action.
    pub who: Address,
    /// Component the action is performed on.
    pub app: Address,
    /// Action id.
    pub role: B256,
    /// Arguments the rule's params compare against.
    pub how: &'a [U256],
}

impl<'a> PermissionRequest<'a> {
    pub fn new(who: Address, app: Address, role: B256, how: &'a [U256]) -> Self {
        Self { who, app, role, how }
    }
}

/// Answer from an oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleOutcome {
    Allowed,
    Denied,
    /// The oracle failed, ran out of budget or returned something that is
    /// not a boolean.
    Inconclusive,
}

impl OracleOutcome {
    pub fn is_allowed(self) -> bool {
        matches!(self, OracleOutcome::Allowed)
    }
}

/// What params can observe beyond the request itself.
pub trait ParamContext {
    fn block_number(&self) -> u64;

    fn timestamp(&self) -> u64;

    /// Consult the oracle at `oracle`. Must not fail: anything other than a
    /// clean boolean answer is [`OracleOutcome::Inconclusive`].
    fn check_oracle(&mut self, oracle: Address, request: &PermissionRequest<'_>) -> OracleOutcome;
}

/// Evaluate a param list for `request`.
///
/// An empty list is true. Visiting more than `max_steps` params makes the
/// whole list false, whatever the partial result, which also ends cyclic
/// logic graphs.
pub fn eval_params<C: ParamContext + ?Sized>(
    params: &[Param],
    request: &PermissionRequest<'_>,
    ctx: &mut C,
    max_steps: usize,
) -> bool {
    if params.is_empty() {
        return true;
    }
    let mut evaluator = Evaluator {
        params,
        request,
        ctx,
        steps_left: max_steps,
        exhausted: false,
    };
    let result = evaluator.eval(0);
    if evaluator.exhausted {
        debug!(role = %request.role, "param evaluation budget exhausted");
        return false;
    }
    result
}

struct Evaluator<'p, 'r, 'a, 'c, C: ?Sized> {
    params: &'p [Param],
    request: &'r PermissionRequest<'a>,
    ctx: &'c mut C,
    steps_left: usize,
    exhausted: bool,
}

impl<C: ParamContext + ?Sized> Evaluator<'_, '_, '_, '_, C> {
    fn eval(&mut self, index: u32) -> bool {
        if self.exhausted || self.steps_left == 0 {
            self.exhausted = true;
            return false;
        }
        self.steps_left -= 1;

        let Some(param) = self.params.get(index as usize).copied() else {
            return false;
        };
        if param.id == LOGIC_OP_PARAM_ID {
            return self.eval_logic(param);
        }

        let mut compared_to = param.value;
        let value = match param.id {
            ORACLE_PARAM_ID => {
                compared_to = U256::from(1u8);
                let outcome = self.ctx.check_oracle(param.oracle_address(), self.request);
                U256::from(outcome.is_allowed() as u8)
            }
            BLOCK_NUMBER_PARAM_ID => U256::from(self.ctx.block_number()),
            TIMESTAMP_PARAM_ID => U256::from(self.ctx.timestamp()),
            PARAM_VALUE_PARAM_ID => param.value,
            arg => match self.request.how.get(arg as usize) {
                // Arguments are compared at the precision params can carry.
                Some(value) => *value & value_mask(),
                None => return false,
            },
        };

        if param.op == Op::Ret {
            return !value.is_zero();
        }
        param.op.compare(value, compared_to)
    }

    fn eval_logic(&mut self, param: Param) -> bool {
        let (first, second, third) = decode_params_list(param.value);
        if param.op == Op::IfElse {
            let condition = self.eval(first);
            return self.eval(if condition { second } else { third });
        }

        let left = self.eval(first);
        match param.op {
            Op::Not => !left,
            Op::Or if left => true,
            Op::And if !left => false,
            Op::Or | Op::And => self.eval(second),
            Op::Xor => left != self.eval(second),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Ctx {
        block: u64,
        timestamp: u64,
        oracles: HashMap<Address, OracleOutcome>,
        oracle_calls: usize,
    }

    impl ParamContext for Ctx {
        fn block_number(&self) -> u64 {
            self.block
        }

        fn timestamp(&self) -> u64 {
            self.timestamp
        }

        fn check_oracle(&mut self, oracle: Address, _: &PermissionRequest<'_>) -> OracleOutcome {
            self.oracle_calls += 1;
            self.oracles
                .get(&oracle)
                .copied()
                .unwrap_or(OracleOutcome::Inconclusive)
        }
    }

    fn eval_with(params: &[Param], how: &[u64], ctx: &mut Ctx) -> bool {
        let how: Vec<U256> = how.iter().map(|v| U256::from(*v)).collect();
        let request = PermissionRequest::new(
            Address::with_last_byte(1),
            Address::with_last_byte(2),
            B256::ZERO,
            &how,
        );
        eval_params(params, &request, ctx, 64)
    }

    fn eval(params: &[Param], how: &[u64]) -> bool {
        eval_with(params, how, &mut Ctx::default())
    }

    #[test]
    fn greater_than_argument() {
        let rule = [Param::arg(0, Op::Gt, U256::from(5u64))];
        assert!(eval(&rule, &[6]));
        assert!(!eval(&rule, &[5]));
        assert!(!eval(&rule, &[4]));
    }

    #[test]
    fn comparison_operators() {
        let cases = [
            (Op::Eq, 5, true),
            (Op::Eq, 6, false),
            (Op::Neq, 6, true),
            (Op::Lt, 4, true),
            (Op::Lt, 5, false),
            (Op::Gte, 5, true),
            (Op::Lte, 5, true),
            (Op::Lte, 6, false),
            (Op::None, 5, false),
        ];
        for (op, arg, expected) in cases {
            assert_eq!(eval(&[Param::arg(0, op, U256::from(5u64))], &[arg]), expected, "{op:?} {arg}");
        }
    }

    #[test]
    fn missing_argument_is_false() {
        assert!(!eval(&[Param::arg(3, Op::Eq, U256::from(0u64))], &[0]));
    }

    #[test]
    fn empty_list_is_true() {
        assert!(eval(&[], &[]));
    }

    #[test]
    fn arguments_truncated_to_param_width() {
        let how = [(U256::from(1u8) << 250) | U256::from(7u8)];
        let request = PermissionRequest::new(Address::ZERO, Address::ZERO, B256::ZERO, &how);
        let rule = [Param::arg(0, Op::Eq, U256::from(7u64))];
        assert!(eval_params(&rule, &request, &mut Ctx::default(), 8));
    }

    #[test]
    fn block_and_timestamp() {
        let mut ctx = Ctx {
            block: 10,
            timestamp: 1_000,
            ..Default::default()
        };
        assert!(eval_with(&[Param::block_number(Op::Gte, 10)], &[], &mut ctx));
        assert!(!eval_with(&[Param::block_number(Op::Gt, 10)], &[], &mut ctx));
        assert!(eval_with(&[Param::timestamp(Op::Lt, 1_001)], &[], &mut ctx));
    }

    #[test]
    fn logic_operators() {
        // [root, arg0 > 5, arg1 == 1]
        let gt = Param::arg(0, Op::Gt, U256::from(5u64));
        let eq = Param::arg(1, Op::Eq, U256::from(1u64));

        let and = [Param::and(1, 2), gt, eq];
        assert!(eval(&and, &[6, 1]));
        assert!(!eval(&and, &[6, 0]));

        let or = [Param::or(1, 2), gt, eq];
        assert!(eval(&or, &[0, 1]));
        assert!(!eval(&or, &[0, 0]));

        let xor = [Param::xor(1, 2), gt, eq];
        assert!(eval(&xor, &[6, 0]));
        assert!(!eval(&xor, &[6, 1]));

        let not = [Param::not(1), gt];
        assert!(eval(&not, &[5]));
    }

    #[test]
    fn if_else_picks_branch() {
        // if arg0 == 1 then arg1 > 10 else arg1 < 3
        let rule = [
            Param::if_else(1, 2, 3),
            Param::arg(0, Op::Eq, U256::from(1u64)),
            Param::arg(1, Op::Gt, U256::from(10u64)),
            Param::arg(1, Op::Lt, U256::from(3u64)),
        ];
        assert!(eval(&rule, &[1, 11]));
        assert!(!eval(&rule, &[1, 2]));
        assert!(eval(&rule, &[0, 2]));
        assert!(!eval(&rule, &[0, 11]));
    }

    #[test]
    fn ret_and_constants() {
        assert!(eval(&[Param::constant(true)], &[]));
        assert!(!eval(&[Param::constant(false)], &[]));
        assert!(eval(&[Param::arg(0, Op::Ret, U256::from(0u64))], &[3]));
        assert!(!eval(&[Param::arg(0, Op::Ret, U256::from(0u64))], &[0]));
    }

    #[test]
    fn or_short_circuits_oracle() {
        let oracle = Address::repeat_byte(9);
        let rule = [Param::or(1, 2), Param::constant(true), Param::oracle(oracle)];
        let mut ctx = Ctx::default();
        assert!(eval_with(&rule, &[], &mut ctx));
        assert_eq!(ctx.oracle_calls, 0);
    }

    #[test]
    fn oracle_outcomes() {
        let yes = Address::repeat_byte(1);
        let no = Address::repeat_byte(2);
        let broken = Address::repeat_byte(3);
        let mut ctx = Ctx::default();
        ctx.oracles.insert(yes, OracleOutcome::Allowed);
        ctx.oracles.insert(no, OracleOutcome::Denied);
        ctx.oracles.insert(broken, OracleOutcome::Inconclusive);

        assert!(eval_with(&[Param::oracle(yes)], &[], &mut ctx));
        assert!(!eval_with(&[Param::oracle(no)], &[], &mut ctx));
        assert!(!eval_with(&[Param::oracle(broken)], &[], &mut ctx));
        // An inconclusive oracle reads as false, so negating it grants.
        assert!(eval_with(&[Param::not(1), Param::oracle(broken)], &[], &mut ctx));
    }

    #[test]
    fn out_of_range_index_is_false() {
        assert!(!eval(&[Param::and(1, 7), Param::constant(true)], &[]));
    }

    #[test]
    fn cyclic_graphs_are_false() {
        let how: Vec<U256> = Vec::new();
        let request = PermissionRequest::new(Address::ZERO, Address::ZERO, B256::ZERO, &how);
        let mut ctx = Ctx::default();

        // 0 = NOT(1), 1 = NOT(0): false at every budget parity.
        let rule = [Param::not(1), Param::not(0)];
        for budget in [9, 10, 64, 256] {
            assert!(!eval_params(&rule, &request, &mut ctx, budget), "budget {budget}");
        }

        // An odd number of negations around the cycle.
        let odd = [Param::and(1, 2), Param::not(3), Param::not(2), Param::constant(false)];
        assert!(!eval_params(&odd, &request, &mut ctx, 256));

        let self_loop = [Param::and(0, 0)];
        assert!(!eval_params(&self_loop, &request, &mut ctx, 100));
    }

    #[test]
    fn budget_large_enough_is_not_exhausted() {
        let rule = [Param::not(1), Param::constant(false)];
        let how: Vec<U256> = Vec::new();
        let request = PermissionRequest::new(Address::ZERO, Address::ZERO, B256::ZERO, &how);
        assert!(eval_params(&rule, &request, &mut Ctx::default(), 2));
        assert!(!eval_params(&rule, &request, &mut Ctx::default(), 1));
    }
}
