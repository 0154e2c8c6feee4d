//! Balance-weighted lottery
//!
//! Each cycle the recipient of the native-coin reward is drawn with
//! probability proportional to its balance. The candidate set is rebuilt
//! from a fresh account fetch on every draw; nothing accumulates across
//! cycles.

use crate::error::AirdropError;
use crate::ledger::{Account, Address, LedgerClient};
use num_bigint::{BigUint, RandBigInt};
use rand::Rng;

/// Eligible lottery candidates: the fetched account list minus the payer,
/// the exclusion list, and every zero-balance account.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    accounts: Vec<Account>,
}

impl CandidateSet {
    pub fn build(accounts: Vec<Account>, payer: &Address, excluded: &[Address]) -> Self {
        let accounts = accounts
            .into_iter()
            .filter(|account| {
                account.address != *payer
                    && account.balance != BigUint::ZERO
                    && !excluded.contains(&account.address)
            })
            .collect();
        Self { accounts }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Draw one candidate, weighted by balance.
    ///
    /// `r` is uniform in `[0, total)`; the walk returns the first candidate
    /// whose cumulative balance exceeds `r`. Falling off the end can only
    /// happen through accumulation quirks in degenerate inputs; the last
    /// candidate is then returned on purpose so a winner always exists once
    /// the set is non-empty.
    pub fn pick<R: Rng>(&self, rng: &mut R) -> Result<&Address, AirdropError> {
        let total: BigUint = self.accounts.iter().map(|a| &a.balance).sum();
        if self.accounts.is_empty() || total == BigUint::ZERO {
            return Err(AirdropError::EmptyCandidateSet);
        }

        let r = rng.gen_biguint_below(&total);
        let mut sum = BigUint::ZERO;
        for account in &self.accounts {
            sum += &account.balance;
            if r < sum {
                return Ok(&account.address);
            }
        }
        Ok(&self.accounts[self.accounts.len() - 1].address)
    }
}

/// Fetch accounts and draw this cycle's winner.
pub async fn choose_winner<C, R>(
    client: &C,
    payer: &Address,
    excluded: &[Address],
    rng: &mut R,
) -> Result<Address, AirdropError>
where
    C: LedgerClient + ?Sized,
    R: Rng,
{
    let accounts = client.fetch_accounts().await?;
    let candidates = CandidateSet::build(accounts, payer, excluded);
    candidates.pick(rng).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn account(address: &str, balance: u64) -> Account {
        Account {
            address: Address::from(address),
            balance: BigUint::from(balance),
        }
    }

    #[test]
    fn filters_payer_excluded_and_zero_balance() {
        let accounts = vec![
            account("payer", 500),
            account("excluded", 300),
            account("broke", 0),
            account("alice", 70),
        ];
        let set = CandidateSet::build(
            accounts,
            &Address::from("payer"),
            &[Address::from("excluded")],
        );
        assert_eq!(set.len(), 1);

        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            assert_eq!(set.pick(&mut rng).unwrap(), &Address::from("alice"));
        }
    }

    #[test]
    fn empty_set_fails() {
        let set = CandidateSet::build(vec![account("broke", 0)], &Address::from("payer"), &[]);
        assert!(matches!(
            set.pick(&mut StdRng::seed_from_u64(0)),
            Err(AirdropError::EmptyCandidateSet)
        ));
    }

    #[test]
    fn all_excluded_fails() {
        let set = CandidateSet::build(
            vec![account("a", 10), account("b", 20)],
            &Address::from("payer"),
            &[Address::from("a"), Address::from("b")],
        );
        assert!(matches!(
            set.pick(&mut StdRng::seed_from_u64(0)),
            Err(AirdropError::EmptyCandidateSet)
        ));
    }

    #[test]
    fn winner_always_comes_from_the_set() {
        let set = CandidateSet::build(
            vec![account("a", 1), account("b", 2), account("c", 3)],
            &Address::from("payer"),
            &[],
        );
        let members = [Address::from("a"), Address::from("b"), Address::from("c")];
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let winner = set.pick(&mut rng).unwrap();
            assert!(members.contains(winner));
        }
    }

    #[test]
    fn selection_frequency_tracks_weights() {
        // Two candidates at 70/30: over many draws the empirical frequency
        // must converge to the weight ratio.
        let set = CandidateSet::build(
            vec![account("heavy", 70), account("light", 30)],
            &Address::from("payer"),
            &[],
        );
        let mut rng = StdRng::seed_from_u64(42);
        let draws = 20_000;
        let mut heavy = 0u32;
        for _ in 0..draws {
            if set.pick(&mut rng).unwrap() == &Address::from("heavy") {
                heavy += 1;
            }
        }
        let freq = f64::from(heavy) / f64::from(draws);
        assert!((freq - 0.7).abs() < 0.02, "frequency was {}", freq);
    }

    #[test]
    fn cumulative_walk_matches_fixed_draw() {
        // Weights [70, 30]: any r in [0, 70) lands on the first candidate.
        // Exercised indirectly: a single-candidate set is always picked and
        // a two-candidate set with an overwhelming first weight essentially
        // never yields the second.
        let set = CandidateSet::build(
            vec![account("a", u64::MAX), account("b", 1)],
            &Address::from("payer"),
            &[],
        );
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            assert_eq!(set.pick(&mut rng).unwrap(), &Address::from("a"));
        }
    }

    #[test]
    fn huge_balances_do_not_lose_precision() {
        // Balances beyond u64 still sum and draw exactly.
        let big = BigUint::parse_bytes(b"340282366920938463463374607431768211456", 10).unwrap();
        let set = CandidateSet::build(
            vec![
                Account {
                    address: Address::from("whale"),
                    balance: big,
                },
                account("shrimp", 1),
            ],
            &Address::from("payer"),
            &[],
        );
        let mut rng = StdRng::seed_from_u64(9);
        let mut whale = 0;
        for _ in 0..100 {
            if set.pick(&mut rng).unwrap() == &Address::from("whale") {
                whale += 1;
            }
        }
        assert!(whale >= 99);
    }
}
