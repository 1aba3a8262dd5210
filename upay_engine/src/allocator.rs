//! # Wallet and amount allocation
//!
//! A small, fixed pool of wallets serves every order for a currency. The chains involved have no per-order
//! sub-addresses, so the exact on-chain amount is the second half of the key that ties a transfer to an order. The
//! allocator picks a `(wallet, amount)` pair that nobody else holds, and claims it in the [`ReservationStore`] for the
//! length of the order's validity window.
//!
//! Wallets are visited round-robin. Each wallet carries its own collision counter, and every collision on a wallet
//! bumps that wallet's next candidate by exactly [`AMOUNT_INCREMENT`]. All of this state lives in an
//! [`AllocationState`] that is created fresh for each call, so the allocator itself holds nothing between calls.
use chrono::Duration;
use log::*;
use thiserror::Error;
use upg_common::{Amount, AMOUNT_INCREMENT, MIN_PAYMENT_AMOUNT};

use crate::{
    db_types::{ReservationKey, WalletAddress, WalletStatus},
    helpers::convert_quote,
    traits::{ReservationError, ReservationStore},
};

/// How many times a single wallet may be visited in one allocation.
pub const MAX_VISITS_PER_WALLET: usize = 100;

#[derive(Debug, Clone, Error)]
pub enum AllocationError {
    #[error("Invalid allocation request. {0}")]
    Configuration(String),
    #[error("No free wallet and amount pair for {currency} after {visits} attempts")]
    Exhausted { currency: String, visits: usize },
    #[error("Could not reserve a wallet and amount pair. {0}")]
    Reservation(#[from] ReservationError),
}

/// The round-robin cursor and per-wallet collision counters for one allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationState {
    cursor: usize,
    attempts: Vec<i64>,
    visits: usize,
}

impl AllocationState {
    pub fn new(wallet_count: usize) -> Self {
        Self { cursor: 0, attempts: vec![0; wallet_count], visits: 0 }
    }

    /// Returns the index of the wallet to visit next and moves the cursor on.
    pub fn next_wallet(&mut self) -> usize {
        let index = self.cursor;
        self.cursor = (self.cursor + 1) % self.attempts.len();
        self.visits += 1;
        index
    }

    pub fn record_collision(&mut self, index: usize) {
        self.attempts[index] += 1;
    }

    pub fn attempts(&self, index: usize) -> i64 {
        self.attempts[index]
    }

    pub fn visits(&self) -> usize {
        self.visits
    }

    pub fn max_visits(&self) -> usize {
        self.attempts.len() * MAX_VISITS_PER_WALLET
    }

    pub fn is_exhausted(&self) -> bool {
        self.visits >= self.max_visits()
    }
}

/// A successfully reserved pair.
#[derive(Debug, Clone)]
pub struct Allocation {
    pub wallet: WalletAddress,
    pub actual_amount: Amount,
    pub key: ReservationKey,
    /// The state the allocation finished in. Useful for diagnostics and tests.
    pub state: AllocationState,
}

/// `round(quote / rate, 2) + attempts * 0.01`
pub fn candidate_amount(quote: Amount, wallet: &WalletAddress, attempts: i64) -> Result<Amount, AllocationError> {
    let base = convert_quote(quote, &wallet.rate).map_err(|e| {
        AllocationError::Configuration(format!("Cannot convert {quote} at the rate for {}. {e}", wallet.token))
    })?;
    Ok(base + AMOUNT_INCREMENT * attempts)
}

/// Checks that every wallet can take part in an allocation for `currency`.
pub fn validate_wallets(currency: &str, wallets: &[WalletAddress]) -> Result<(), AllocationError> {
    if wallets.is_empty() {
        return Err(AllocationError::Configuration(format!("There are no enabled wallets for {currency}")));
    }
    for wallet in wallets {
        if wallet.status != WalletStatus::Enabled {
            return Err(AllocationError::Configuration(format!("Wallet {} is disabled", wallet.token)));
        }
        if wallet.currency != currency {
            return Err(AllocationError::Configuration(format!(
                "Wallet {} belongs to {}, not {currency}",
                wallet.token, wallet.currency
            )));
        }
        if !wallet.rate.is_usable() {
            return Err(AllocationError::Configuration(format!(
                "Wallet {} has a non-positive exchange rate ({})",
                wallet.token, wallet.rate
            )));
        }
    }
    Ok(())
}

pub struct WalletAllocator<R> {
    reservations: R,
}

impl<R> WalletAllocator<R> {
    pub fn new(reservations: R) -> Self {
        Self { reservations }
    }

    pub fn reservations(&self) -> &R {
        &self.reservations
    }
}

impl<R> WalletAllocator<R>
where R: ReservationStore
{
    /// Picks and reserves a `(wallet, amount)` pair for a quote of `quote` in `currency`.
    ///
    /// The reservation is held for `ttl`. Fails with [`AllocationError::Configuration`] if the wallets are unusable or
    /// the rate produces an amount below the minimum payment, and with [`AllocationError::Exhausted`] once every
    /// wallet has been visited [`MAX_VISITS_PER_WALLET`] times without success.
    pub async fn allocate(
        &self,
        currency: &str,
        quote: Amount,
        wallets: &[WalletAddress],
        ttl: Duration,
    ) -> Result<Allocation, AllocationError> {
        validate_wallets(currency, wallets)?;
        if ttl <= Duration::zero() {
            return Err(AllocationError::Configuration("The reservation window must be positive".into()));
        }
        let mut state = AllocationState::new(wallets.len());
        while !state.is_exhausted() {
            let index = state.next_wallet();
            let wallet = &wallets[index];
            let amount = candidate_amount(quote, wallet, state.attempts(index))?;
            if amount < MIN_PAYMENT_AMOUNT {
                return Err(AllocationError::Configuration(format!(
                    "A quote of {quote} converts to {amount} on {}, below the minimum payment of {MIN_PAYMENT_AMOUNT}",
                    wallet.token
                )));
            }
            let key = ReservationKey::new(&wallet.token, amount);
            if self.reservations.set_if_absent(&key, ttl).await? {
                debug!("🎯️ Reserved {key} for {currency} after {} visits", state.visits());
                return Ok(Allocation { wallet: wallet.clone(), actual_amount: amount, key, state });
            }
            trace!("🎯️ {key} is taken");
            state.record_collision(index);
        }
        warn!("🎯️ Allocation for {quote} in {currency} exhausted after {} visits", state.visits());
        Err(AllocationError::Exhausted { currency: currency.to_string(), visits: state.visits() })
    }

    /// Gives up a reservation that will not be used, e.g. because the order could not be stored.
    pub async fn release(&self, key: &ReservationKey) -> Result<(), AllocationError> {
        self.reservations.delete(key).await?;
        debug!("🎯️ Released {key}");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use super::*;
    use crate::{db_types::ExchangeRate, memory::MemoryReservationStore};

    fn wallet(id: i64, token: &str, rate: &str) -> WalletAddress {
        WalletAddress {
            id,
            currency: "USDT-TRC20".into(),
            token: token.into(),
            status: WalletStatus::Enabled,
            rate: ExchangeRate::from_str(rate).unwrap(),
        }
    }

    fn ttl() -> Duration {
        Duration::minutes(10)
    }

    const QUOTE: Amount = Amount::from_cents(1000);

    #[test]
    fn state_is_round_robin() {
        let mut state = AllocationState::new(3);
        let order = (0..7).map(|_| state.next_wallet()).collect::<Vec<_>>();
        assert_eq!(order, vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(state.visits(), 7);
        assert_eq!(state.max_visits(), 300);
    }

    #[tokio::test]
    async fn two_wallet_scenario() {
        let store = MemoryReservationStore::new();
        let allocator = WalletAllocator::new(store);
        let wallets = vec![wallet(1, "W1", "7.0"), wallet(2, "W2", "7.1")];
        let first = allocator.allocate("USDT-TRC20", QUOTE, &wallets, ttl()).await.unwrap();
        assert_eq!(first.wallet.token, "W1");
        assert_eq!(first.actual_amount, Amount::from_cents(143));
        let second = allocator.allocate("USDT-TRC20", QUOTE, &wallets, ttl()).await.unwrap();
        assert_eq!(second.wallet.token, "W2");
        assert_eq!(second.actual_amount, Amount::from_cents(141));
        assert_eq!(second.state.attempts(0), 1);
    }

    #[tokio::test]
    async fn single_wallet_increments_by_one_cent() {
        let allocator = WalletAllocator::new(MemoryReservationStore::new());
        let wallets = vec![wallet(1, "W1", "7.0")];
        for expected in 143..153 {
            let allocation = allocator.allocate("USDT-TRC20", QUOTE, &wallets, ttl()).await.unwrap();
            assert_eq!(allocation.actual_amount, Amount::from_cents(expected));
            assert_eq!(allocation.state.attempts(0), expected - 143);
        }
    }

    #[tokio::test]
    async fn exhaustion_is_bounded_per_wallet() {
        for n in [1usize, 2, 5] {
            let store = MemoryReservationStore::new();
            let wallets = (0..n).map(|i| wallet(i as i64, &format!("W{i}"), "1")).collect::<Vec<_>>();
            // Occupy the first 100 candidates on every wallet
            for w in &wallets {
                for c in 0..MAX_VISITS_PER_WALLET as i64 {
                    let key = ReservationKey::new(&w.token, QUOTE + AMOUNT_INCREMENT * c);
                    assert!(store.set_if_absent(&key, ttl()).await.unwrap());
                }
            }
            let allocator = WalletAllocator::new(store.clone());
            let err = allocator.allocate("USDT-TRC20", QUOTE, &wallets, ttl()).await.unwrap_err();
            match err {
                AllocationError::Exhausted { visits, .. } => assert_eq!(visits, n * MAX_VISITS_PER_WALLET),
                e => panic!("Expected exhaustion, got {e}"),
            }
            // Free the last candidate of the last wallet: allocation succeeds on the final visit
            let last = wallets.last().unwrap();
            let key = ReservationKey::new(&last.token, QUOTE + AMOUNT_INCREMENT * (MAX_VISITS_PER_WALLET as i64 - 1));
            store.delete(&key).await.unwrap();
            let allocation = allocator.allocate("USDT-TRC20", QUOTE, &wallets, ttl()).await.unwrap();
            assert_eq!(allocation.key, key);
            assert_eq!(allocation.state.visits(), n * MAX_VISITS_PER_WALLET);
        }
    }

    #[tokio::test]
    async fn configuration_errors() {
        let allocator = WalletAllocator::new(MemoryReservationStore::new());
        let err = allocator.allocate("USDT-TRC20", QUOTE, &[], ttl()).await.unwrap_err();
        assert!(matches!(err, AllocationError::Configuration(_)));

        let zero_rate = vec![wallet(1, "W1", "7.0"), wallet(2, "W2", "0")];
        let err = allocator.allocate("USDT-TRC20", QUOTE, &zero_rate, ttl()).await.unwrap_err();
        assert!(matches!(err, AllocationError::Configuration(_)));

        let mut disabled = wallet(1, "W1", "7.0");
        disabled.status = WalletStatus::Disabled;
        let err = allocator.allocate("USDT-TRC20", QUOTE, &[disabled], ttl()).await.unwrap_err();
        assert!(matches!(err, AllocationError::Configuration(_)));

        // 10.00 at a rate of 5000 is 0.002, which rounds to zero
        let extreme = vec![wallet(1, "W1", "5000")];
        let err = allocator.allocate("USDT-TRC20", QUOTE, &extreme, ttl()).await.unwrap_err();
        assert!(matches!(err, AllocationError::Configuration(_)));
        assert!(!allocator.reservations().exists(&ReservationKey::new("W1", Amount::from_cents(0))).await.unwrap());
    }
}
