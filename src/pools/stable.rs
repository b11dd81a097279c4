//! Stable pool: amplified curve, rate-scaled balances, fee-by-dilution.
//!
//! Tokens may carry a [`RateProvider`] whose value is cached per token
//! ([`RateCache`]). All math runs on balances scaled by the current
//! rate; the old rate (frozen at the last join/exit) is what lets the
//! pool tell yield apart from swap fees when the protocol's cut is
//! settled. Unlike weighted pools, the protocol is paid by minting
//! shares, never by removing tokens.
//!
//! The proportional exit is deliberately minimal: no rate refresh, no
//! fee settlement, no solver. It works even when every rate provider
//! is down and the iteration fails to converge, which is exactly when
//! liquidity providers most need the exit.

use crate::accounting::{
    pool_ownership_percentage, shares_for_pool_ownership, GrowthInvariants,
    ProtocolFeePercentages, RateCache, SupplyLedger,
};
use crate::amplification::{AmplificationParameter, Timestamp};
use crate::domain::{ExitRequest, JoinExitResult, JoinRequest, SwapRequest, Token};
use crate::error::{AmmError, Result};
use crate::math::{stable, FixedPoint};
use crate::pools::guard::ReentrancyGuard;
use crate::pools::validate_swap_fee;
use crate::traits::{ProtocolFeePolicy, RateProvider};

/// Per-token configuration for a [`StablePool`].
#[derive(Debug)]
pub struct StableTokenParams {
    /// The token's identity and decimals.
    pub token: Token,
    /// Rate source for yield-bearing tokens; `None` for plain tokens.
    pub rate_provider: Option<Box<dyn RateProvider>>,
    /// Cache lifetime in seconds; ignored without a provider.
    pub rate_cache_duration: u64,
    /// Exempt tokens accrue yield to liquidity providers untaxed.
    pub exempt_from_yield_fees: bool,
}

impl StableTokenParams {
    /// A plain token with no rate provider.
    #[must_use]
    pub fn plain(token: Token) -> Self {
        Self {
            token,
            rate_provider: None,
            rate_cache_duration: 0,
            exempt_from_yield_fees: false,
        }
    }
}

/// Everything needed to construct a [`StablePool`].
#[derive(Debug)]
pub struct StablePoolParams {
    /// Per-token configuration in storage order.
    pub tokens: Vec<StableTokenParams>,
    /// Unscaled amplification value in `[1, 5000]`.
    pub amplification: u64,
    /// Swap fee percentage in `[0.0001%, 10%]`.
    pub swap_fee: FixedPoint,
    /// Protocol's cut of swap-fee and yield growth.
    pub protocol_fees: ProtocolFeePercentages,
}

/// An amplified stable-curve pool over 2 to 5 tokens.
#[derive(Debug)]
pub struct StablePool {
    tokens: Vec<Token>,
    /// 18-decimal upscaled balances, before rate scaling.
    balances: Vec<FixedPoint>,
    rate_providers: Vec<Option<Box<dyn RateProvider>>>,
    rate_caches: Vec<Option<RateCache>>,
    exempt_from_yield_fees: Vec<bool>,
    amplification: AmplificationParameter,
    swap_fee: FixedPoint,
    protocol_fees: ProtocolFeePercentages,
    supply: SupplyLedger,
    /// Pre-scaled amp in force at the last join/exit settlement.
    last_join_exit_amp: u64,
    /// Invariant recorded at the last join/exit settlement.
    last_invariant: FixedPoint,
    guard: ReentrancyGuard,
}

impl StablePool {
    /// Validates the parameters, seeds the rate caches, and creates an
    /// empty pool.
    ///
    /// # Errors
    ///
    /// Configuration errors for bad token counts, duplicate addresses,
    /// exemption without a provider, or out-of-range fees and
    /// amplification. Provider failures during cache seeding propagate
    /// as [`AmmError::RateProviderFailure`].
    pub fn new(params: StablePoolParams, now: Timestamp) -> Result<Self> {
        if params.tokens.len() < 2 {
            return Err(AmmError::InvalidConfiguration("fewer than two tokens"));
        }
        if params.tokens.len() > stable::MAX_TOKENS {
            return Err(AmmError::InvalidConfiguration("more than five tokens"));
        }
        for (i, entry) in params.tokens.iter().enumerate() {
            if params.tokens[..i]
                .iter()
                .any(|other| other.token.address() == entry.token.address())
            {
                return Err(AmmError::InvalidConfiguration("duplicate token address"));
            }
            if entry.exempt_from_yield_fees && entry.rate_provider.is_none() {
                return Err(AmmError::InvalidConfiguration(
                    "yield exemption requires a rate provider",
                ));
            }
        }
        validate_swap_fee(params.swap_fee)?;
        let amplification = AmplificationParameter::new(params.amplification)?;
        let (initial_amp, _) = amplification.value_at(now);

        let token_count = params.tokens.len();
        let mut tokens = Vec::with_capacity(token_count);
        let mut rate_providers = Vec::with_capacity(token_count);
        let mut rate_caches = Vec::with_capacity(token_count);
        let mut exempt_from_yield_fees = Vec::with_capacity(token_count);
        for entry in params.tokens {
            let cache = match &entry.rate_provider {
                Some(provider) => {
                    let rate = provider.get_rate()?;
                    Some(RateCache::new(rate, entry.rate_cache_duration, now))
                }
                None => None,
            };
            tokens.push(entry.token);
            rate_providers.push(entry.rate_provider);
            rate_caches.push(cache);
            exempt_from_yield_fees.push(entry.exempt_from_yield_fees);
        }

        Ok(Self {
            tokens,
            balances: vec![FixedPoint::ZERO; token_count],
            rate_providers,
            rate_caches,
            exempt_from_yield_fees,
            amplification,
            swap_fee: params.swap_fee,
            protocol_fees: params.protocol_fees,
            supply: SupplyLedger::new(),
            last_join_exit_amp: initial_amp,
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

    /// Current 18-decimal balances, before rate scaling.
    #[must_use]
    pub fn balances(&self) -> &[FixedPoint] {
        &self.balances
    }

    /// Shares in circulation.
    pub fn virtual_supply(&self) -> FixedPoint {
        self.supply.virtual_supply()
    }

    /// Invariant recorded at the last join/exit settlement.
    #[must_use]
    pub const fn last_invariant(&self) -> FixedPoint {
        self.last_invariant
    }

    /// The invariant of the current rate-scaled balances at `now`'s
    /// amplification.
    pub fn compute_invariant(&self, now: Timestamp) -> Result<FixedPoint> {
        let amp = self.amplification.value_at(now).0;
        let scaled = self.scaled_balances(&self.rate_caches)?;
        stable::calculate_invariant(amp, &scaled)
    }

    /// The pre-scaled amplification value at `now`.
    #[must_use]
    pub fn amplification_at(&self, now: Timestamp) -> u64 {
        self.amplification.value_at(now).0
    }

    /// Begins an amplification ramp; see
    /// [`AmplificationParameter::start_ramp`].
    pub fn start_amplification_ramp(
        &mut self,
        end_value: u64,
        now: Timestamp,
        end_time: Timestamp,
    ) -> Result<()> {
        let _lock = self.guard.enter()?;
        self.amplification.start_ramp(end_value, now, end_time)
    }

    /// Freezes the amplification at its current value.
    pub fn stop_amplification_ramp(&mut self, now: Timestamp) -> Result<()> {
        let _lock = self.guard.enter()?;
        self.amplification.stop_ramp(now);
        Ok(())
    }

    /// Changes a token's rate cache lifetime, forcing a refresh.
    pub fn set_rate_cache_duration(
        &mut self,
        token_index: usize,
        duration: u64,
        now: Timestamp,
    ) -> Result<()> {
        let _lock = self.guard.enter()?;
        if token_index >= self.tokens.len() {
            return Err(AmmError::InvalidToken("token index out of range"));
        }
        match (
            self.rate_caches[token_index].as_mut(),
            self.rate_providers[token_index].as_ref(),
        ) {
            (Some(cache), Some(provider)) => cache.set_duration(duration, provider.as_ref(), now),
            _ => Err(AmmError::InvalidToken("token has no rate provider")),
        }
    }

    /// Forces a refresh of one token's rate cache regardless of
    /// expiry. The yield baseline (`old_rate`) is left untouched.
    pub fn update_rate_cache(&mut self, token_index: usize, now: Timestamp) -> Result<()> {
        let _lock = self.guard.enter()?;
        if token_index >= self.tokens.len() {
            return Err(AmmError::InvalidToken("token index out of range"));
        }
        match (
            self.rate_caches[token_index].as_mut(),
            self.rate_providers[token_index].as_ref(),
        ) {
            (Some(cache), Some(provider)) => cache.refresh(provider.as_ref(), now),
            _ => Err(AmmError::InvalidToken("token has no rate provider")),
        }
    }

    /// Pulls fresh protocol fee percentages from `policy` and replaces
    /// the cached pair. Out-of-range values leave the cache unchanged.
    pub fn update_protocol_fee_cache(&mut self, policy: &dyn ProtocolFeePolicy) -> Result<()> {
        let _lock = self.guard.enter()?;
        let swap = policy.swap_fee_percentage()?;
        let yield_ = policy.yield_fee_percentage()?;
        self.protocol_fees = ProtocolFeePercentages::new(swap, yield_)?;
        Ok(())
    }

    /// The cached current rate for a token (1.0 for plain tokens).
    #[must_use]
    pub fn current_rate(&self, token_index: usize) -> FixedPoint {
        rate(&self.rate_caches, token_index)
    }

    // -- swaps ---------------------------------------------------------------

    /// Executes a swap and returns the counter-amount in the other
    /// token's native decimals. Expired rate caches are refreshed on a
    /// staged copy; a failing provider (or failing math) aborts the
    /// swap with every stored field, the caches included, unchanged.
    pub fn swap(&mut self, request: SwapRequest, now: Timestamp) -> Result<FixedPoint> {
        let _lock = self.guard.enter()?;
        self.require_initialized()?;
        let token_in = request.token_in();
        let token_out = request.token_out();
        if token_in >= self.tokens.len() || token_out >= self.tokens.len() {
            return Err(AmmError::InvalidToken("swap token index out of range"));
        }
        let caches = refreshed_caches(&self.rate_caches, &self.rate_providers, now)?;

        let amp = self.amplification.value_at(now).0;
        let scaled = self.scaled_balances(&caches)?;
        let invariant = stable::calculate_invariant(amp, &scaled)?;

        let (stored_in, stored_out, quote) = match request {
            SwapRequest::GivenIn { amount_in, .. } => {
                let stored_in = self.tokens[token_in].upscale(amount_in)?;
                let internal_in = stored_in.mul_down(rate(&caches, token_in))?;
                let fee = internal_in.mul_up(self.swap_fee)?;
                let net_in = internal_in.sub(fee)?;

                let internal_out =
                    stable::calc_out_given_in(amp, &scaled, token_in, token_out, net_in, invariant)?;
                let stored_out = internal_out.div_down(rate(&caches, token_out))?;
                let quote = self.tokens[token_out].downscale_down(stored_out)?;
                (stored_in, stored_out, quote)
            }
            SwapRequest::GivenOut { amount_out, .. } => {
                let stored_out = self.tokens[token_out].upscale(amount_out)?;
                let internal_out = stored_out.mul_up(rate(&caches, token_out))?;

                let net_in =
                    stable::calc_in_given_out(amp, &scaled, token_in, token_out, internal_out, invariant)?;
                let internal_in = net_in.div_up(self.swap_fee.complement())?;
                let stored_in = internal_in.div_up(rate(&caches, token_in))?;
                let quote = self.tokens[token_in].downscale_up(stored_in)?;
                (stored_in, stored_out, quote)
            }
        };
        let balance_in = self.balances[token_in].add(stored_in)?;
        let balance_out = self.balances[token_out].sub(stored_out)?;

        // commit; nothing below can fail
        self.balances[token_in] = balance_in;
        self.balances[token_out] = balance_out;
        self.rate_caches = caches;
        Ok(quote)
    }

    // -- joins ---------------------------------------------------------------

    /// Adds liquidity. [`JoinRequest::Init`] must be the pool's first
    /// operation; all other variants settle the protocol's share of
    /// growth (by minting) before pricing the deposit.
    pub fn join(&mut self, request: JoinRequest, now: Timestamp) -> Result<JoinExitResult> {
        request.validate(self.tokens.len())?;
        if let JoinRequest::Init { amounts } = request {
            return self.init(&amounts, now);
        }
        self.join_non_init(request, now)
    }

    fn init(&mut self, amounts: &[FixedPoint], now: Timestamp) -> Result<JoinExitResult> {
        let _lock = self.guard.enter()?;
        if self.supply.is_initialized() {
            return Err(AmmError::InvalidConfiguration("pool already initialized"));
        }
        let mut caches = refreshed_caches(&self.rate_caches, &self.rate_providers, now)?;

        let stored = self.upscale_all(amounts)?;
        let mut internal = stored.clone();
        for (i, amount) in internal.iter_mut().enumerate() {
            *amount = amount.mul_down(rate(&caches, i))?;
        }

        let amp = self.amplification.value_at(now).0;
        let invariant = stable::calculate_invariant(amp, &internal)?;
        let mut supply = self.supply;
        let mint = supply.initialize(invariant)?;

        // commit; nothing below can fail
        for cache in caches.iter_mut().flatten() {
            cache.finalize_join_exit();
        }
        self.rate_caches = caches;
        self.balances = stored;
        self.supply = supply;
        self.last_join_exit_amp = amp;
        self.last_invariant = invariant;

        Ok(JoinExitResult {
            share_delta: mint.to_recipient,
            amounts: amounts.to_vec(),
            protocol_fee_amounts: vec![FixedPoint::ZERO; self.tokens.len()],
            protocol_shares_minted: FixedPoint::ZERO,
        })
    }

    fn join_non_init(&mut self, request: JoinRequest, now: Timestamp) -> Result<JoinExitResult> {
        let _lock = self.guard.enter()?;
        self.require_initialized()?;
        let mut caches = refreshed_caches(&self.rate_caches, &self.rate_providers, now)?;

        let amp = self.amplification.value_at(now).0;
        let scaled = self.scaled_balances(&caches)?;
        let protocol_shares = self.growth_fee_shares(&scaled, &caches)?;
        let mut supply_ledger = self.supply;
        supply_ledger.mint(protocol_shares)?;
        let supply = supply_ledger.virtual_supply();
        let current_invariant = stable::calculate_invariant(amp, &scaled)?;

        let (share_delta, stored_amounts) = match &request {
            JoinRequest::Init { .. } => {
                return Err(AmmError::InvalidConfiguration("pool already initialized"))
            }
            JoinRequest::ExactTokensIn { amounts } => {
                let stored = self.upscale_all(amounts)?;
                let mut internal = stored.clone();
                for (i, amount) in internal.iter_mut().enumerate() {
                    *amount = amount.mul_down(rate(&caches, i))?;
                }
                let shares = stable::calc_shares_out_given_exact_tokens_in(
                    amp,
                    &scaled,
                    &internal,
                    supply,
                    current_invariant,
                    self.swap_fee,
                )?;
                if shares.is_zero() {
                    return Err(AmmError::InvalidQuantity("deposit mints zero shares"));
                }
                (shares, stored)
            }
            JoinRequest::TokenInForExactShares {
                token_index,
                shares_out,
            } => {
                let internal_in = stable::calc_token_in_given_exact_shares_out(
                    amp,
                    &scaled,
                    *token_index,
                    *shares_out,
                    supply,
                    current_invariant,
                    self.swap_fee,
                )?;
                let stored_in = internal_in.div_up(rate(&caches, *token_index))?;
                let mut amounts = vec![FixedPoint::ZERO; self.tokens.len()];
                amounts[*token_index] = stored_in;
                (*shares_out, amounts)
            }
            JoinRequest::ProportionalSharesOut { shares_out } => {
                // proportional amounts are rate-agnostic, so they are
                // computed on the stored balances directly
                let stored = stable::calc_all_tokens_in_given_exact_shares_out(
                    &self.balances,
                    *shares_out,
                    supply,
                )?;
                (*shares_out, stored)
            }
        };

        let mut balances = self.balances.clone();
        for (balance, amount) in balances.iter_mut().zip(&stored_amounts) {
            *balance = balance.add(*amount)?;
        }
        let post_invariant = self.invariant_of(amp, &balances, &caches)?;
        supply_ledger.mint(share_delta)?;
        let amounts_native = self.downscale_amounts_up(&stored_amounts)?;

        // commit; nothing below can fail
        for cache in caches.iter_mut().flatten() {
            cache.finalize_join_exit();
        }
        self.rate_caches = caches;
        self.balances = balances;
        self.supply = supply_ledger;
        self.last_join_exit_amp = amp;
        self.last_invariant = post_invariant;

        Ok(JoinExitResult {
            share_delta,
            amounts: amounts_native,
            protocol_fee_amounts: vec![FixedPoint::ZERO; self.tokens.len()],
            protocol_shares_minted: protocol_shares,
        })
    }

    // -- exits ---------------------------------------------------------------

    /// Removes liquidity. The proportional variant touches no rates
    /// and runs no solver; the others settle growth fees first.
    pub fn exit(&mut self, request: ExitRequest, now: Timestamp) -> Result<JoinExitResult> {
        request.validate(self.tokens.len())?;
        if let ExitRequest::ProportionalSharesIn { shares_in } = request {
            return self.proportional_exit(shares_in);
        }
        self.exit_non_proportional(request, now)
    }

    fn proportional_exit(&mut self, shares_in: FixedPoint) -> Result<JoinExitResult> {
        let _lock = self.guard.enter()?;
        self.require_initialized()?;
        let supply = self.supply.virtual_supply();
        let stored_amounts =
            stable::calc_tokens_out_given_exact_shares_in(&self.balances, shares_in, supply)?;

        let mut balances = self.balances.clone();
        for (balance, amount) in balances.iter_mut().zip(&stored_amounts) {
            *balance = balance.sub(*amount)?;
        }
        // The invariant is homogeneous: removing an r-fraction of every
        // balance scales it by (1 - r). Scaling the recorded value the
        // same way keeps accrued-growth measurement intact without
        // running the solver.
        let ratio = shares_in.div_down(supply)?;
        let next_invariant = self.last_invariant.mul_down(ratio.complement())?;
        let amounts_native = self.downscale_amounts_down(&stored_amounts)?;
        let mut supply_ledger = self.supply;
        supply_ledger.burn(shares_in)?;

        // commit; nothing below can fail
        self.supply = supply_ledger;
        self.balances = balances;
        self.last_invariant = next_invariant;

        Ok(JoinExitResult {
            share_delta: shares_in,
            amounts: amounts_native,
            protocol_fee_amounts: vec![FixedPoint::ZERO; self.tokens.len()],
            protocol_shares_minted: FixedPoint::ZERO,
        })
    }

    fn exit_non_proportional(
        &mut self,
        request: ExitRequest,
        now: Timestamp,
    ) -> Result<JoinExitResult> {
        let _lock = self.guard.enter()?;
        self.require_initialized()?;
        let mut caches = refreshed_caches(&self.rate_caches, &self.rate_providers, now)?;

        let amp = self.amplification.value_at(now).0;
        let scaled = self.scaled_balances(&caches)?;
        let protocol_shares = self.growth_fee_shares(&scaled, &caches)?;
        let mut supply_ledger = self.supply;
        supply_ledger.mint(protocol_shares)?;
        let supply = supply_ledger.virtual_supply();
        let current_invariant = stable::calculate_invariant(amp, &scaled)?;

        let (share_delta, stored_amounts) = match &request {
            ExitRequest::ExactTokensOut { amounts } => {
                let stored = self.upscale_all(amounts)?;
                let mut internal = stored.clone();
                for (i, amount) in internal.iter_mut().enumerate() {
                    *amount = amount.mul_up(rate(&caches, i))?;
                }
                let shares = stable::calc_shares_in_given_exact_tokens_out(
                    amp,
                    &scaled,
                    &internal,
                    supply,
                    current_invariant,
                    self.swap_fee,
                )?;
                (shares, stored)
            }
            ExitRequest::ExactSharesInForToken {
                token_index,
                shares_in,
            } => {
                let internal_out = stable::calc_token_out_given_exact_shares_in(
                    amp,
                    &scaled,
                    *token_index,
                    *shares_in,
                    supply,
                    current_invariant,
                    self.swap_fee,
                )?;
                let stored_out = internal_out.div_down(rate(&caches, *token_index))?;
                let mut amounts = vec![FixedPoint::ZERO; self.tokens.len()];
                amounts[*token_index] = stored_out;
                (*shares_in, amounts)
            }
            // dispatched in exit() before reaching this point
            ExitRequest::ProportionalSharesIn { .. } => {
                return Err(AmmError::InvalidConfiguration("unexpected exit variant"))
            }
        };

        let mut balances = self.balances.clone();
        for (balance, amount) in balances.iter_mut().zip(&stored_amounts) {
            *balance = balance.sub(*amount)?;
        }
        let post_invariant = self.invariant_of(amp, &balances, &caches)?;
        supply_ledger.burn(share_delta)?;
        let amounts_native = self.downscale_amounts_down(&stored_amounts)?;

        // commit; nothing below can fail
        for cache in caches.iter_mut().flatten() {
            cache.finalize_join_exit();
        }
        self.rate_caches = caches;
        self.balances = balances;
        self.supply = supply_ledger;
        self.last_join_exit_amp = amp;
        self.last_invariant = post_invariant;

        Ok(JoinExitResult {
            share_delta,
            amounts: amounts_native,
            protocol_fee_amounts: vec![FixedPoint::ZERO; self.tokens.len()],
            protocol_shares_minted: protocol_shares,
        })
    }

    // -- internals -----------------------------------------------------------

    /// Shares owed to the protocol for growth since the last
    /// settlement. Measured at the amp in force at that settlement so
    /// an amp ramp is never misread as trading growth.
    fn growth_fee_shares(
        &self,
        current_scaled: &[FixedPoint],
        caches: &[Option<RateCache>],
    ) -> Result<FixedPoint> {
        let amp = self.last_join_exit_amp;

        let mut swap_growth_balances = self.balances.clone();
        let mut non_exempt_balances = self.balances.clone();
        for i in 0..self.balances.len() {
            let old = settlement_rate(caches, i);
            let current = rate(caches, i);
            // A fallen rate deflates the total-growth denominator. The
            // fee baselines floor at the lower of the two rates so the
            // measured deltas never outgrow the denominator: a pool
            // whose rate dropped cannot owe more than one whose rate
            // held.
            let swap_basis = old.min(current);
            let yield_basis = if self.exempt_from_yield_fees[i] {
                swap_basis
            } else {
                current
            };
            swap_growth_balances[i] = self.balances[i].mul_down(swap_basis)?;
            non_exempt_balances[i] = self.balances[i].mul_down(yield_basis)?;
        }

        let growth = GrowthInvariants {
            swap_fee_growth: stable::calculate_invariant(amp, &swap_growth_balances)?,
            total_non_exempt_growth: stable::calculate_invariant(amp, &non_exempt_balances)?,
            total_growth: stable::calculate_invariant(amp, current_scaled)?,
        };
        let ownership = pool_ownership_percentage(&growth, self.last_invariant, &self.protocol_fees)?;
        shares_for_pool_ownership(self.supply.virtual_supply(), ownership)
    }

    /// Invariant of `stored_balances` at the staged current rates.
    fn invariant_of(
        &self,
        amp: u64,
        stored_balances: &[FixedPoint],
        caches: &[Option<RateCache>],
    ) -> Result<FixedPoint> {
        let mut internal = stored_balances.to_vec();
        for (i, balance) in internal.iter_mut().enumerate() {
            *balance = balance.mul_down(rate(caches, i))?;
        }
        stable::calculate_invariant(amp, &internal)
    }

    fn scaled_balances(&self, caches: &[Option<RateCache>]) -> Result<Vec<FixedPoint>> {
        let mut scaled = self.balances.clone();
        for (i, balance) in scaled.iter_mut().enumerate() {
            *balance = balance.mul_down(rate(caches, i))?;
        }
        Ok(scaled)
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
}

/// A copy of the caches with every expired entry refreshed. The caller
/// commits the copy only once the whole operation has succeeded, so a
/// provider failure here, or any later failure, leaves the stored
/// caches exactly as they were.
fn refreshed_caches(
    caches: &[Option<RateCache>],
    providers: &[Option<Box<dyn RateProvider>>],
    now: Timestamp,
) -> Result<Vec<Option<RateCache>>> {
    let mut staged = caches.to_vec();
    for (cache, provider) in staged.iter_mut().zip(providers) {
        if let (Some(cache), Some(provider)) = (cache.as_mut(), provider.as_ref()) {
            cache.refresh_if_expired(provider.as_ref(), now)?;
        }
    }
    Ok(staged)
}

/// Current rate for a token (1.0 for plain tokens).
fn rate(caches: &[Option<RateCache>], token_index: usize) -> FixedPoint {
    match &caches[token_index] {
        Some(cache) => cache.current_rate(),
        None => FixedPoint::ONE,
    }
}

/// Rate frozen at the last join/exit settlement (1.0 for plain
/// tokens).
fn settlement_rate(caches: &[Option<RateCache>], token_index: usize) -> FixedPoint {
    match &caches[token_index] {
        Some(cache) => cache.old_rate(),
        None => FixedPoint::ONE,
    }
}
