//! # Balances
//!
//! Ledger-held credit balances. Settlement proceeds and payment refunds are
//! credited here; withdrawing them is the business of whatever payment
//! rail sits outside the engine.
//!
//! Credits are two-step. [`Balances::stage`] computes every new balance
//! with checked arithmetic and fails with `TransferFailed` on overflow
//! without touching the table; [`Balances::apply`] then writes the staged
//! balances and cannot fail. A settlement stages its credits before any of
//! its other effects, so a failed transfer leaves nothing behind.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use agri_core::{LedgerError, Principal};

/// Credit balance per principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    accounts: BTreeMap<Principal, u64>,
}

impl Balances {
    /// Current balance of `principal`; zero if it was never credited.
    pub fn balance_of(&self, principal: &Principal) -> u64 {
        self.accounts.get(principal).copied().unwrap_or(0)
    }

    /// Sum of all balances, if it fits in a `u64`.
    pub fn total(&self) -> Option<u64> {
        self.accounts.values().try_fold(0u64, |acc, v| acc.checked_add(*v))
    }

    /// Validate a set of credits against the current balances.
    ///
    /// Credits to the same principal accumulate; zero credits are skipped.
    pub(crate) fn stage(&self, credits: &[(&Principal, u64)]) -> Result<StagedCredits, LedgerError> {
        let mut updated: BTreeMap<Principal, u64> = BTreeMap::new();
        for &(to, amount) in credits {
            if amount == 0 {
                continue;
            }
            let current = updated
                .get(to)
                .copied()
                .unwrap_or_else(|| self.balance_of(to));
            let next = current.checked_add(amount).ok_or_else(|| {
                LedgerError::TransferFailed(format!(
                    "crediting {amount} to {to} would overflow balance {current}"
                ))
            })?;
            updated.insert(to.clone(), next);
        }
        Ok(StagedCredits(updated))
    }

    pub(crate) fn apply(&mut self, staged: StagedCredits) {
        self.accounts.extend(staged.0);
    }
}

/// New balances computed by [`Balances::stage`].
#[derive(Debug)]
#[must_use]
pub(crate) struct StagedCredits(BTreeMap<Principal, u64>);

#[cfg(test)]
mod tests {
    use super::*;
    use agri_core::ErrorKind;

    fn p(key: &str) -> Principal {
        Principal::new(key).unwrap()
    }

    #[test]
    fn test_credit_accumulates() {
        let mut balances = Balances::default();
        let staged = balances.stage(&[(&p("seller"), 100)]).unwrap();
        balances.apply(staged);
        let staged = balances.stage(&[(&p("seller"), 25)]).unwrap();
        balances.apply(staged);
        assert_eq!(balances.balance_of(&p("seller")), 125);
        assert_eq!(balances.balance_of(&p("nobody")), 0);
        assert_eq!(balances.total(), Some(125));
    }

    #[test]
    fn test_same_principal_credits_combine() {
        let mut balances = Balances::default();
        let trader = p("trader");
        let staged = balances.stage(&[(&trader, 70), (&trader, 30)]).unwrap();
        balances.apply(staged);
        assert_eq!(balances.balance_of(&trader), 100);
    }

    #[test]
    fn test_zero_credit_creates_no_account() {
        let mut balances = Balances::default();
        let staged = balances.stage(&[(&p("buyer"), 0)]).unwrap();
        balances.apply(staged);
        assert_eq!(balances, Balances::default());
    }

    #[test]
    fn test_overflow_rejected_at_stage() {
        let mut balances = Balances::default();
        let staged = balances.stage(&[(&p("seller"), u64::MAX)]).unwrap();
        balances.apply(staged);
        let before = balances.clone();

        let err = balances
            .stage(&[(&p("buyer"), 5), (&p("seller"), 1)])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransferFailed);
        assert_eq!(balances, before);

        // Overflow from two credits to one principal.
        let err = balances
            .stage(&[(&p("buyer"), u64::MAX), (&p("buyer"), 1)])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransferFailed);
    }
}
