//! Weighted pool: fixed normalized weights, closed-form pricing.
//!
//! Protocol fees accrue implicitly while trading (swap fees stay in
//! the balances and grow the invariant) and are settled in a single
//! token at the next join or exit, before the liquidity change is
//! priced. The fee token is chosen by a [`FeeTokenPolicy`]; a
//! single-token exit instead charges the token already leaving, so
//! the exiting party bears the transfer.

use crate::domain::{ExitRequest, JoinExitResult, JoinRequest, SwapRequest, Token};
use crate::error::{AmmError, Result};
use crate::math::{weighted, FixedPoint};
use crate::pools::guard::ReentrancyGuard;
use crate::pools::validate_swap_fee;
use crate::accounting::SupplyLedger;
use crate::traits::{FeeTokenPolicy, HighestWeightPolicy, ProtocolFeePolicy};

/// Everything needed to construct a [`WeightedPool`].
#[derive(Debug)]
pub struct WeightedPoolParams {
    /// Pool tokens in storage order.
    pub tokens: Vec<Token>,
    /// Normalized weights, one per token, summing to one.
    pub weights: Vec<FixedPoint>,
    /// Swap fee percentage in `[0.0001%, 10%]`.
    pub swap_fee: FixedPoint,
    /// Protocol's cut of swap-fee growth, at most 50%.
    pub protocol_swap_fee: FixedPoint,
    /// Chooses the token accrued protocol fees are paid in.
    pub fee_policy: Box<dyn FeeTokenPolicy>,
}

impl WeightedPoolParams {
    /// Params with the default fee policy and no protocol cut.
    #[must_use]
    pub fn basic(tokens: Vec<Token>, weights: Vec<FixedPoint>, swap_fee: FixedPoint) -> Self {
        Self {
            tokens,
            weights,
            swap_fee,
            protocol_swap_fee: FixedPoint::ZERO,
            fee_policy: Box::new(HighestWeightPolicy),
        }
    }
}

/// A constant-weight pool over 2 to 16 tokens.
#[derive(Debug)]
pub struct WeightedPool {
    tokens: Vec<Token>,
    weights: Vec<FixedPoint>,
    /// 18-decimal upscaled balances.
    balances: Vec<FixedPoint>,
    swap_fee: FixedPoint,
    protocol_swap_fee: FixedPoint,
    fee_policy: Box<dyn FeeTokenPolicy>,
    supply: SupplyLedger,
    /// Invariant at the last fee settlement.
    last_invariant: FixedPoint,
    guard: ReentrancyGuard,
}

impl WeightedPool {
    /// Validates the parameters and creates an empty pool.
    ///
    /// The pool accepts no operation except an initializing join until
    /// [`join`](Self::join) is called with [`JoinRequest::Init`].
    pub fn new(params: WeightedPoolParams) -> Result<Self> {
        weighted::validate_weights(&params.weights)?;
        if params.tokens.len() != params.weights.len() {
            return Err(AmmError::InvalidConfiguration("token and weight counts differ"));
        }
        for (i, token) in params.tokens.iter().enumerate() {
            if params.tokens[..i].iter().any(|t| t.address() == token.address()) {
                return Err(AmmError::InvalidConfiguration("duplicate token address"));
            }
        }
        validate_swap_fee(params.swap_fee)?;
        if params.protocol_swap_fee > crate::accounting::MAX_PROTOCOL_FEE {
            return Err(AmmError::InvalidFee("protocol swap fee above 50%"));
        }

        let token_count = params.tokens.len();
        Ok(Self {
            tokens: params.tokens,
            weights: params.weights,
            balances: vec![FixedPoint::ZERO; token_count],
            swap_fee: params.swap_fee,
            protocol_swap_fee: params.protocol_swap_fee,
            fee_policy: params.fee_policy,
            supply: SupplyLedger::new(),
            last_invariant: FixedPoint::ZERO,
            guard: ReentrancyGuard::new(),
        })
    }

    // -- accessors -----------------------------------------------------------

    /// The pool's tokens in storage order.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Normalized weights, summing to one.
    #[must_use]
    pub fn weights(&self) -> &[FixedPoint] {
        &self.weights
    }

    /// Current 18-decimal balances.
    #[must_use]
    pub fn balances(&self) -> &[FixedPoint] {
        &self.balances
    }

    /// Shares in circulation.
    pub fn virtual_supply(&self) -> FixedPoint {
        self.supply.virtual_supply()
    }

    /// Invariant recorded at the last fee settlement.
    #[must_use]
    pub const fn last_invariant(&self) -> FixedPoint {
        self.last_invariant
    }

    /// The invariant of the current balances.
    pub fn compute_invariant(&self) -> Result<FixedPoint> {
        weighted::calculate_invariant(&self.weights, &self.balances)
    }

    /// Pulls a fresh protocol swap fee percentage from `policy` and
    /// replaces the cached one. Weighted pools hold no rate providers,
    /// so the yield percentage is never consulted.
    pub fn update_protocol_fee_cache(&mut self, policy: &dyn ProtocolFeePolicy) -> Result<()> {
        let _lock = self.guard.enter()?;
        let swap = policy.swap_fee_percentage()?;
        if swap > crate::accounting::MAX_PROTOCOL_FEE {
            return Err(AmmError::InvalidFee("protocol swap fee above 50%"));
        }
        self.protocol_swap_fee = swap;
        Ok(())
    }

    // -- swaps ---------------------------------------------------------------

    /// Executes a swap and returns the counter-amount in the other
    /// token's native decimals: the amount out for a given-in request,
    /// the amount in for a given-out request.
    pub fn swap(&mut self, request: SwapRequest) -> Result<FixedPoint> {
        let _lock = self.guard.enter()?;
        self.require_initialized()?;
        let token_in = request.token_in();
        let token_out = request.token_out();
        if token_in >= self.tokens.len() || token_out >= self.tokens.len() {
            return Err(AmmError::InvalidToken("swap token index out of range"));
        }

        let (scaled_in, scaled_out, quote) = match request {
            SwapRequest::GivenIn { amount_in, .. } => {
                let scaled_in = self.tokens[token_in].upscale(amount_in)?;
                // fee comes off the top; the full input still lands in
                // the balances so the fee accrues to the invariant
                let fee = scaled_in.mul_up(self.swap_fee)?;
                let net_in = scaled_in.sub(fee)?;

                let scaled_out = weighted::calc_out_given_in(
                    self.balances[token_in],
                    self.weights[token_in],
                    self.balances[token_out],
                    self.weights[token_out],
                    net_in,
                )?;
                let quote = self.tokens[token_out].downscale_down(scaled_out)?;
                (scaled_in, scaled_out, quote)
            }
            SwapRequest::GivenOut { amount_out, .. } => {
                let scaled_out = self.tokens[token_out].upscale(amount_out)?;

                let net_in = weighted::calc_in_given_out(
                    self.balances[token_in],
                    self.weights[token_in],
                    self.balances[token_out],
                    self.weights[token_out],
                    scaled_out,
                )?;
                let scaled_in = net_in.div_up(self.swap_fee.complement())?;
                let quote = self.tokens[token_in].downscale_up(scaled_in)?;
                (scaled_in, scaled_out, quote)
            }
        };
        let balance_in = self.balances[token_in].add(scaled_in)?;
        let balance_out = self.balances[token_out].sub(scaled_out)?;

        // commit; nothing below can fail
        self.balances[token_in] = balance_in;
        self.balances[token_out] = balance_out;
        Ok(quote)
    }

    // -- joins ---------------------------------------------------------------

    /// Adds liquidity. [`JoinRequest::Init`] must be the pool's first
    /// operation; all other variants settle accrued protocol fees
    /// before pricing the deposit.
    pub fn join(&mut self, request: JoinRequest) -> Result<JoinExitResult> {
        request.validate(self.tokens.len())?;
        if let JoinRequest::Init { amounts } = request {
            return self.init(&amounts);
        }
        self.join_non_init(request)
    }

    fn join_non_init(&mut self, request: JoinRequest) -> Result<JoinExitResult> {
        let _lock = self.guard.enter()?;
        self.require_initialized()?;

        let (mut balances, fee_amounts, fee_token) = self.settle_due_protocol_fees(None)?;
        let supply = self.supply.virtual_supply();

        let (share_delta, amounts_scaled) = match &request {
            JoinRequest::Init { .. } => {
                return Err(AmmError::InvalidConfiguration("pool already initialized"))
            }
            JoinRequest::ExactTokensIn { amounts } => {
                let scaled = self.upscale_all(amounts)?;
                let shares = weighted::calc_shares_out_given_exact_tokens_in(
                    &balances,
                    &self.weights,
                    &scaled,
                    supply,
                    self.swap_fee,
                )?;
                if shares.is_zero() {
                    return Err(AmmError::InvalidQuantity("deposit mints zero shares"));
                }
                (shares, scaled)
            }
            JoinRequest::TokenInForExactShares {
                token_index,
                shares_out,
            } => {
                let amount = weighted::calc_token_in_given_exact_shares_out(
                    balances[*token_index],
                    self.weights[*token_index],
                    *shares_out,
                    supply,
                    self.swap_fee,
                )?;
                let mut amounts = vec![FixedPoint::ZERO; self.tokens.len()];
                amounts[*token_index] = amount;
                (*shares_out, amounts)
            }
            JoinRequest::ProportionalSharesOut { shares_out } => {
                let amounts = weighted::calc_all_tokens_in_given_exact_shares_out(
                    &balances,
                    *shares_out,
                    supply,
                )?;
                (*shares_out, amounts)
            }
        };

        for (balance, amount) in balances.iter_mut().zip(&amounts_scaled) {
            *balance = balance.add(*amount)?;
        }
        let new_invariant = weighted::calculate_invariant(&self.weights, &balances)?;
        let amounts_native = self.downscale_amounts_up(&amounts_scaled)?;
        let fees_native = self.downscale_fee_amounts(&fee_amounts, fee_token)?;
        self.supply.mint(share_delta)?;

        // commit; nothing below can fail
        self.balances = balances;
        self.last_invariant = new_invariant;

        Ok(JoinExitResult {
            share_delta,
            amounts: amounts_native,
            protocol_fee_amounts: fees_native,
            protocol_shares_minted: FixedPoint::ZERO,
        })
    }

    // -- exits ---------------------------------------------------------------

    /// Removes liquidity. Settles accrued protocol fees first, except
    /// for the proportional variant, which is fee-free but still
    /// re-records the invariant afterwards.
    pub fn exit(&mut self, request: ExitRequest) -> Result<JoinExitResult> {
        request.validate(self.tokens.len())?;
        // Proportional exits skip fee settlement so they keep working
        // even if the fee math ever becomes uncomputable.
        if let ExitRequest::ProportionalSharesIn { shares_in } = request {
            return self.proportional_exit(shares_in);
        }
        self.exit_non_proportional(request)
    }

    fn exit_non_proportional(&mut self, request: ExitRequest) -> Result<JoinExitResult> {
        let _lock = self.guard.enter()?;
        self.require_initialized()?;

        let exit_fee_token = match &request {
            ExitRequest::ExactSharesInForToken { token_index, .. } => Some(*token_index),
            _ => None,
        };
        let (mut balances, fee_amounts, fee_token) =
            self.settle_due_protocol_fees(exit_fee_token)?;
        let supply = self.supply.virtual_supply();

        let (share_delta, amounts_scaled) = match &request {
            ExitRequest::ExactTokensOut { amounts } => {
                let scaled = self.upscale_all(amounts)?;
                let shares = weighted::calc_shares_in_given_exact_tokens_out(
                    &balances,
                    &self.weights,
                    &scaled,
                    supply,
                    self.swap_fee,
                )?;
                (shares, scaled)
            }
            ExitRequest::ExactSharesInForToken {
                token_index,
                shares_in,
            } => {
                let amount = weighted::calc_token_out_given_exact_shares_in(
                    balances[*token_index],
                    self.weights[*token_index],
                    *shares_in,
                    supply,
                    self.swap_fee,
                )?;
                let mut amounts = vec![FixedPoint::ZERO; self.tokens.len()];
                amounts[*token_index] = amount;
                (*shares_in, amounts)
            }
            // dispatched in exit() before reaching this point
            ExitRequest::ProportionalSharesIn { .. } => {
                return Err(AmmError::InvalidConfiguration("unexpected exit variant"))
            }
        };

        for (balance, amount) in balances.iter_mut().zip(&amounts_scaled) {
            *balance = balance.sub(*amount)?;
        }
        let new_invariant = weighted::calculate_invariant(&self.weights, &balances)?;
        let amounts_native = self.downscale_amounts_down(&amounts_scaled)?;
        let fees_native = self.downscale_fee_amounts(&fee_amounts, fee_token)?;
        self.supply.burn(share_delta)?;

        // commit; nothing below can fail
        self.balances = balances;
        self.last_invariant = new_invariant;

        Ok(JoinExitResult {
            share_delta,
            amounts: amounts_native,
            protocol_fee_amounts: fees_native,
            protocol_shares_minted: FixedPoint::ZERO,
        })
    }

    // -- internals -----------------------------------------------------------

    fn init(&mut self, amounts: &[FixedPoint]) -> Result<JoinExitResult> {
        let _lock = self.guard.enter()?;
        if self.supply.is_initialized() {
            return Err(AmmError::InvalidConfiguration("pool already initialized"));
        }
        let scaled = self.upscale_all(amounts)?;
        let invariant = weighted::calculate_invariant(&self.weights, &scaled)?;

        // Seed the supply at invariant * n so initial shares land near
        // the deposit's face value.
        let mut initial_shares = invariant;
        for _ in 1..self.tokens.len() {
            initial_shares = initial_shares.add(invariant)?;
        }
        let mint = self.supply.initialize(initial_shares)?;

        self.balances = scaled;
        self.last_invariant = invariant;

        Ok(JoinExitResult {
            share_delta: mint.to_recipient,
            amounts: amounts.to_vec(),
            protocol_fee_amounts: vec![FixedPoint::ZERO; self.tokens.len()],
            protocol_shares_minted: FixedPoint::ZERO,
        })
    }

    fn proportional_exit(&mut self, shares_in: FixedPoint) -> Result<JoinExitResult> {
        let _lock = self.guard.enter()?;
        self.require_initialized()?;
        let supply = self.supply.virtual_supply();
        let amounts_scaled =
            weighted::calc_tokens_out_given_exact_shares_in(&self.balances, shares_in, supply)?;

        let mut balances = self.balances.clone();
        for (balance, amount) in balances.iter_mut().zip(&amounts_scaled) {
            *balance = balance.sub(*amount)?;
        }
        // The invariant is homogeneous: removing an r-fraction of every
        // balance scales it by (1 - r). Scaling the recorded value the
        // same way keeps accrued-growth measurement intact without
        // evaluating any power.
        let ratio = shares_in.div_down(supply)?;
        let next_invariant = self.last_invariant.mul_down(ratio.complement())?;
        let amounts_native = self.downscale_amounts_down(&amounts_scaled)?;
        self.supply.burn(shares_in)?;

        // commit; nothing below can fail
        self.balances = balances;
        self.last_invariant = next_invariant;

        Ok(JoinExitResult {
            share_delta: shares_in,
            amounts: amounts_native,
            protocol_fee_amounts: vec![FixedPoint::ZERO; self.tokens.len()],
            protocol_shares_minted: FixedPoint::ZERO,
        })
    }

    /// Pays the protocol its due share of invariant growth out of the
    /// fee token (policy-selected, unless `forced_token` pins it).
    /// Returns the post-fee balances, the scaled fee amounts, and the
    /// fee token index.
    fn settle_due_protocol_fees(
        &self,
        forced_token: Option<usize>,
    ) -> Result<(Vec<FixedPoint>, Vec<FixedPoint>, usize)> {
        let mut balances = self.balances.clone();
        let mut fee_amounts = vec![FixedPoint::ZERO; self.tokens.len()];
        let fee_token =
            forced_token.unwrap_or_else(|| self.fee_policy.select_fee_token(&self.weights));

        if self.protocol_swap_fee.is_zero() {
            return Ok((balances, fee_amounts, fee_token));
        }

        let current_invariant = weighted::calculate_invariant(&self.weights, &balances)?;
        let due = weighted::calc_due_token_protocol_swap_fee_amount(
            balances[fee_token],
            self.weights[fee_token],
            self.last_invariant,
            current_invariant,
            self.protocol_swap_fee,
        )?;
        balances[fee_token] = balances[fee_token].sub(due)?;
        fee_amounts[fee_token] = due;
        Ok((balances, fee_amounts, fee_token))
    }

    fn require_initialized(&self) -> Result<()> {
        if !self.supply.is_initialized() {
            return Err(AmmError::InvalidConfiguration("pool not initialized"));
        }
        Ok(())
    }

    fn upscale_all(&self, amounts: &[FixedPoint]) -> Result<Vec<FixedPoint>> {
        self.tokens
            .iter()
            .zip(amounts)
            .map(|(token, &amount)| token.upscale(amount))
            .collect()
    }

    fn downscale_amounts_down(&self, amounts: &[FixedPoint]) -> Result<Vec<FixedPoint>> {
        self.tokens
            .iter()
            .zip(amounts)
            .map(|(token, &amount)| token.downscale_down(amount))
            .collect()
    }

    fn downscale_amounts_up(&self, amounts: &[FixedPoint]) -> Result<Vec<FixedPoint>> {
        self.tokens
            .iter()
            .zip(amounts)
            .map(|(token, &amount)| token.downscale_up(amount))
            .collect()
    }

    fn downscale_fee_amounts(
        &self,
        amounts: &[FixedPoint],
        fee_token: usize,
    ) -> Result<Vec<FixedPoint>> {
        let mut native = vec![FixedPoint::ZERO; amounts.len()];
        native[fee_token] = self.tokens[fee_token].downscale_down(amounts[fee_token])?;
        Ok(native)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::TokenAddress;

    const ONE: u128 = 1_000_000_000_000_000_000;

    fn fp(wei: u128) -> FixedPoint {
        FixedPoint::from_wei(wei)
    }

    fn fp_int(value: u64) -> FixedPoint {
        FixedPoint::from_integer(value)
    }

    fn token(seed: u8) -> Token {
        let Ok(token) = Token::new(TokenAddress::from_seed(seed), 18) else {
            panic!("expected Ok");
        };
        token
    }

    fn eighty_twenty() -> WeightedPool {
        let params = WeightedPoolParams::basic(
            vec![token(1), token(2)],
            vec![fp(8 * ONE / 10), fp(2 * ONE / 10)],
            fp(ONE / 100),
        );
        let Ok(mut pool) = WeightedPool::new(params) else {
            panic!("expected Ok");
        };
        let Ok(_) = pool.join(JoinRequest::Init {
            amounts: vec![fp_int(1000), fp_int(200)],
        }) else {
            panic!("expected Ok");
        };
        pool
    }

    #[test]
    fn construction_rejects_duplicate_tokens() {
        let params = WeightedPoolParams::basic(
            vec![token(1), token(1)],
            vec![fp(ONE / 2), fp(ONE / 2)],
            fp(ONE / 100),
        );
        assert!(matches!(
            WeightedPool::new(params),
            Err(AmmError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn construction_rejects_fee_out_of_range() {
        let params = WeightedPoolParams::basic(
            vec![token(1), token(2)],
            vec![fp(ONE / 2), fp(ONE / 2)],
            fp(2 * ONE / 10),
        );
        assert!(matches!(WeightedPool::new(params), Err(AmmError::InvalidFee(_))));
    }

    #[test]
    fn swap_before_init_rejected() {
        let params = WeightedPoolParams::basic(
            vec![token(1), token(2)],
            vec![fp(ONE / 2), fp(ONE / 2)],
            fp(ONE / 100),
        );
        let Ok(mut pool) = WeightedPool::new(params) else {
            panic!("expected Ok");
        };
        let Ok(request) = SwapRequest::given_in(0, 1, fp_int(1)) else {
            panic!("expected Ok");
        };
        assert!(pool.swap(request).is_err());
    }

    #[test]
    fn init_mints_invariant_times_token_count() {
        let pool = eighty_twenty();
        // invariant = 1000^0.8 * 200^0.2 ~= 724.78; shares ~= 1449.56,
        // minus the locked minimum
        let supply = pool.virtual_supply();
        assert!(supply > fp_int(1449), "supply {supply}");
        assert!(supply < fp_int(1450), "supply {supply}");
    }

    #[test]
    fn swap_given_in_charges_fee() {
        let mut pool = eighty_twenty();
        let Ok(request) = SwapRequest::given_in(0, 1, fp_int(100)) else {
            panic!("expected Ok");
        };
        let Ok(out) = pool.swap(request) else {
            panic!("expected Ok");
        };
        // without fee the output would be ~63.397; 1% input fee lowers it
        assert!(out < fp(63_397_308_926_985_862));
        assert!(out > fp_int(62), "out {out}");
        // full input (fee included) landed in the balances
        assert_eq!(pool.balances()[0], fp_int(1100));
    }

    #[test]
    fn swap_given_out_charges_fee_on_input() {
        let mut pool = eighty_twenty();
        let Ok(request) = SwapRequest::given_out(0, 1, fp_int(20)) else {
            panic!("expected Ok");
        };
        let Ok(amount_in) = pool.swap(request) else {
            panic!("expected Ok");
        };
        // 200 -> 180 out needs (200/180)^(0.25) - 1 ~= 2.67% of 1000 in,
        // grossed up by the 1% fee
        assert!(amount_in > fp_int(26), "in {amount_in}");
        assert!(amount_in < fp_int(28), "in {amount_in}");
        assert_eq!(pool.balances()[1], fp_int(180));
    }

    #[test]
    fn reentrancy_guard_is_released_between_operations() {
        let mut pool = eighty_twenty();
        for _ in 0..3 {
            let Ok(request) = SwapRequest::given_in(0, 1, fp_int(10)) else {
                panic!("expected Ok");
            };
            let Ok(_) = pool.swap(request) else {
                panic!("expected Ok");
            };
        }
    }

    #[test]
    fn failed_swap_leaves_state_unchanged() {
        let mut pool = eighty_twenty();
        let balances_before = pool.balances().to_vec();
        let Ok(request) = SwapRequest::given_in(0, 1, fp_int(900)) else {
            panic!("expected Ok");
        };
        // 900 > 30% of 1000
        assert!(matches!(
            pool.swap(request),
            Err(AmmError::SwapLimitExceeded(_))
        ));
        assert_eq!(pool.balances(), balances_before.as_slice());
    }

    #[test]
    fn join_and_exit_round_trip() {
        let mut pool = eighty_twenty();
        let supply_before = pool.virtual_supply();

        let Ok(join) = pool.join(JoinRequest::ExactTokensIn {
            amounts: vec![fp_int(100), fp_int(20)],
        }) else {
            panic!("expected Ok");
        };
        assert!(join.share_delta > FixedPoint::ZERO);
        assert!(pool.virtual_supply() > supply_before);

        let Ok(exit) = pool.exit(ExitRequest::ProportionalSharesIn {
            shares_in: join.share_delta,
        }) else {
            panic!("expected Ok");
        };
        // proportional exit returns at most what the join deposited
        assert!(exit.amounts[0] <= fp_int(100));
        assert!(exit.amounts[1] <= fp_int(20));
    }

    #[test]
    fn proportional_join_mints_exact_shares() {
        let mut pool = eighty_twenty();
        let supply_before = pool.virtual_supply();
        let Ok(join) = pool.join(JoinRequest::ProportionalSharesOut {
            shares_out: fp_int(100),
        }) else {
            panic!("expected Ok");
        };
        assert_eq!(join.share_delta, fp_int(100));
        let Ok(expected) = supply_before.add(fp_int(100)) else {
            panic!("expected Ok");
        };
        assert_eq!(pool.virtual_supply(), expected);
        // deposits sit on the current balance ratio: 1000/200 = 5:1
        let Ok(five_b) = join.amounts[1].mul_down(fp_int(5)) else {
            panic!("expected Ok");
        };
        let diff = join.amounts[0]
            .sub_or_zero(five_b)
            .max(five_b.sub_or_zero(join.amounts[0]));
        assert!(diff < fp(10), "diff {diff}");
    }

    #[test]
    fn protocol_fee_settled_on_join_after_swaps() {
        let params = WeightedPoolParams {
            tokens: vec![token(1), token(2)],
            weights: vec![fp(8 * ONE / 10), fp(2 * ONE / 10)],
            swap_fee: fp(ONE / 100),
            protocol_swap_fee: fp(ONE / 2),
            fee_policy: Box::new(HighestWeightPolicy),
        };
        let Ok(mut pool) = WeightedPool::new(params) else {
            panic!("expected Ok");
        };
        let Ok(_) = pool.join(JoinRequest::Init {
            amounts: vec![fp_int(1000), fp_int(200)],
        }) else {
            panic!("expected Ok");
        };

        // grow the invariant through fee-charging swaps
        for _ in 0..5 {
            let Ok(forward) = SwapRequest::given_in(0, 1, fp_int(50)) else {
                panic!("expected Ok");
            };
            let Ok(out) = pool.swap(forward) else {
                panic!("expected Ok");
            };
            let Ok(backward) = SwapRequest::given_in(1, 0, out) else {
                panic!("expected Ok");
            };
            let Ok(_) = pool.swap(backward) else {
                panic!("expected Ok");
            };
        }

        let Ok(join) = pool.join(JoinRequest::ExactTokensIn {
            amounts: vec![fp_int(10), fp_int(2)],
        }) else {
            panic!("expected Ok");
        };
        // fees paid in the highest-weight token only
        assert!(join.protocol_fee_amounts[0] > FixedPoint::ZERO);
        assert_eq!(join.protocol_fee_amounts[1], FixedPoint::ZERO);
    }

    #[test]
    fn single_token_exit_charges_fee_on_exiting_token() {
        let params = WeightedPoolParams {
            tokens: vec![token(1), token(2)],
            weights: vec![fp(8 * ONE / 10), fp(2 * ONE / 10)],
            swap_fee: fp(ONE / 100),
            protocol_swap_fee: fp(ONE / 2),
            fee_policy: Box::new(HighestWeightPolicy),
        };
        let Ok(mut pool) = WeightedPool::new(params) else {
            panic!("expected Ok");
        };
        let Ok(_) = pool.join(JoinRequest::Init {
            amounts: vec![fp_int(1000), fp_int(200)],
        }) else {
            panic!("expected Ok");
        };
        let Ok(forward) = SwapRequest::given_in(0, 1, fp_int(100)) else {
            panic!("expected Ok");
        };
        let Ok(out) = pool.swap(forward) else {
            panic!("expected Ok");
        };
        let Ok(backward) = SwapRequest::given_in(1, 0, out) else {
            panic!("expected Ok");
        };
        let Ok(_) = pool.swap(backward) else {
            panic!("expected Ok");
        };

        let Ok(exit) = pool.exit(ExitRequest::ExactSharesInForToken {
            token_index: 1,
            shares_in: fp_int(10),
        }) else {
            panic!("expected Ok");
        };
        // the fee came out of token 1 even though token 0 outweighs it
        assert_eq!(exit.protocol_fee_amounts[0], FixedPoint::ZERO);
        assert!(exit.protocol_fee_amounts[1] > FixedPoint::ZERO);
    }

    #[test]
    fn compute_invariant_matches_settlement_record() {
        let pool = eighty_twenty();
        let Ok(invariant) = pool.compute_invariant() else {
            panic!("expected Ok");
        };
        // nothing traded since init, so the two agree
        assert_eq!(invariant, pool.last_invariant());
    }

    #[test]
    fn fee_cache_update_takes_effect_on_next_settlement() {
        use crate::traits::ConstantFeePolicy;

        // starts with no protocol cut
        let mut pool = eighty_twenty();
        let Ok(()) = pool.update_protocol_fee_cache(&ConstantFeePolicy::new(
            fp(ONE / 2),
            FixedPoint::ZERO,
        )) else {
            panic!("expected Ok");
        };

        let Ok(forward) = SwapRequest::given_in(0, 1, fp_int(100)) else {
            panic!("expected Ok");
        };
        let Ok(out) = pool.swap(forward) else {
            panic!("expected Ok");
        };
        let Ok(backward) = SwapRequest::given_in(1, 0, out) else {
            panic!("expected Ok");
        };
        let Ok(_) = pool.swap(backward) else {
            panic!("expected Ok");
        };

        let Ok(join) = pool.join(JoinRequest::ExactTokensIn {
            amounts: vec![fp_int(10), fp_int(2)],
        }) else {
            panic!("expected Ok");
        };
        assert!(join.protocol_fee_amounts[0] > FixedPoint::ZERO);

        // above the 50% cap: rejected, cache unchanged
        let result = pool.update_protocol_fee_cache(&ConstantFeePolicy::new(
            fp(51 * ONE / 100),
            FixedPoint::ZERO,
        ));
        assert!(matches!(result, Err(AmmError::InvalidFee(_))));
    }

    #[test]
    fn six_decimal_token_scaling_round_trips() {
        let Ok(usdc_like) = Token::new(TokenAddress::from_seed(9), 6) else {
            panic!("expected Ok");
        };
        let params = WeightedPoolParams::basic(
            vec![usdc_like, token(2)],
            vec![fp(ONE / 2), fp(ONE / 2)],
            fp(ONE / 100),
        );
        let Ok(mut pool) = WeightedPool::new(params) else {
            panic!("expected Ok");
        };
        // 1000 units of a 6-decimal token is 1e9 native wei
        let Ok(_) = pool.join(JoinRequest::Init {
            amounts: vec![fp(1_000_000_000), fp_int(1000)],
        }) else {
            panic!("expected Ok");
        };
        assert_eq!(pool.balances()[0], fp_int(1000));

        let Ok(request) = SwapRequest::given_in(1, 0, fp_int(100)) else {
            panic!("expected Ok");
        };
        let Ok(out) = pool.swap(request) else {
            panic!("expected Ok");
        };
        // output is denominated in native 6-decimal wei
        assert!(out < fp(100_000_000));
        assert!(out > fp(80_000_000), "out {out}");
    }
}
