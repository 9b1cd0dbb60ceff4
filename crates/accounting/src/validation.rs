//! Voucher entry validator: the balancing rule for double-entry vouchers.

use rust_decimal::Decimal;
use thiserror::Error;

use ledgerdesk_core::DomainError;

use crate::entry::{EntryLine, EntryType};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EntryValidationError {
    #[error("voucher must have entries")]
    NoEntries,

    #[error("voucher must balance across at least two entries (got {0})")]
    TooFewEntries(usize),

    #[error("entry {line} amount must be positive (got {amount})")]
    NonPositiveAmount { line: usize, amount: Decimal },

    #[error("debits ({debits}) must equal credits ({credits})")]
    Unbalanced { debits: Decimal, credits: Decimal },

    #[error("entry {line}: amount out of range")]
    OutOfRange { line: usize },
}

impl From<EntryValidationError> for DomainError {
    fn from(value: EntryValidationError) -> Self {
        DomainError::validation(value.to_string())
    }
}

/// Check that a set of entries forms a balanced voucher.
///
/// Returns the voucher total (the common debit/credit sum). Pure: callers
/// run this before touching any store.
pub fn validate_entries<E: EntryLine>(entries: &[E]) -> Result<Decimal, EntryValidationError> {
    if entries.is_empty() {
        return Err(EntryValidationError::NoEntries);
    }
    if entries.len() < 2 {
        return Err(EntryValidationError::TooFewEntries(entries.len()));
    }

    let mut debits = Decimal::ZERO;
    let mut credits = Decimal::ZERO;

    for (idx, entry) in entries.iter().enumerate() {
        let amount = entry.amount();
        if amount <= Decimal::ZERO {
            return Err(EntryValidationError::NonPositiveAmount {
                line: idx + 1,
                amount,
            });
        }
        let side = match entry.entry_type() {
            EntryType::Debit => &mut debits,
            EntryType::Credit => &mut credits,
        };
        *side = side
            .checked_add(amount)
            .ok_or(EntryValidationError::OutOfRange { line: idx + 1 })?;
    }

    if debits != credits {
        return Err(EntryValidationError::Unbalanced { debits, credits });
    }

    Ok(debits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::ProposedEntry;
    use proptest::prelude::*;

    fn d(units: i64) -> Decimal {
        Decimal::from(units)
    }

    #[test]
    fn balanced_entries_return_total() {
        let entries = vec![
            ProposedEntry::debit("Cash", d(500)),
            ProposedEntry::credit("Sales", d(500)),
        ];
        assert_eq!(validate_entries(&entries).unwrap(), d(500));
    }

    #[test]
    fn unbalanced_entries_are_rejected() {
        let entries = vec![
            ProposedEntry::debit("A", d(100)),
            ProposedEntry::credit("B", d(90)),
        ];
        assert_eq!(
            validate_entries(&entries).unwrap_err(),
            EntryValidationError::Unbalanced {
                debits: d(100),
                credits: d(90),
            }
        );
    }

    #[test]
    fn empty_and_single_entry_are_rejected() {
        let none: Vec<ProposedEntry> = vec![];
        assert_eq!(validate_entries(&none).unwrap_err(), EntryValidationError::NoEntries);

        let one = vec![ProposedEntry::debit("Cash", d(1))];
        assert_eq!(
            validate_entries(&one).unwrap_err(),
            EntryValidationError::TooFewEntries(1)
        );
    }

    #[test]
    fn non_positive_amount_reports_line() {
        let entries = vec![
            ProposedEntry::debit("Cash", d(10)),
            ProposedEntry::credit("Sales", d(0)),
        ];
        assert_eq!(
            validate_entries(&entries).unwrap_err(),
            EntryValidationError::NonPositiveAmount { line: 2, amount: d(0) }
        );
    }

    #[test]
    fn decimal_sums_do_not_drift() {
        // 0.1 + 0.2 == 0.3 exactly in decimal, unlike binary floating point.
        let entries = vec![
            ProposedEntry::debit("Cash", Decimal::new(1, 1)),
            ProposedEntry::debit("Cash", Decimal::new(2, 1)),
            ProposedEntry::credit("Sales", Decimal::new(3, 1)),
        ];
        assert_eq!(validate_entries(&entries).unwrap(), Decimal::new(3, 1));
    }

    #[test]
    fn one_sided_voucher_is_unbalanced() {
        let entries = vec![
            ProposedEntry::debit("Cash", d(5)),
            ProposedEntry::debit("Bank", d(5)),
        ];
        assert!(matches!(
            validate_entries(&entries),
            Err(EntryValidationError::Unbalanced { .. })
        ));
    }

    #[test]
    fn side_total_overflow_is_rejected() {
        let entries = vec![
            ProposedEntry::debit("A", Decimal::MAX),
            ProposedEntry::debit("A2", Decimal::MAX),
            ProposedEntry::credit("B", d(1)),
        ];
        assert_eq!(
            validate_entries(&entries).unwrap_err(),
            EntryValidationError::OutOfRange { line: 2 }
        );
        let as_domain: DomainError = EntryValidationError::OutOfRange { line: 2 }.into();
        assert!(matches!(as_domain, DomainError::Validation(_)));
    }

    proptest! {
        /// Splitting a credit into arbitrary positive cent amounts always
        /// balances against a single debit of their sum.
        #[test]
        fn split_credits_balance_single_debit(
            cents in prop::collection::vec(1i64..10_000_000i64, 1..12)
        ) {
            let total: i64 = cents.iter().sum();
            let mut entries = vec![ProposedEntry::debit("Cash", Decimal::new(total, 2))];
            for c in &cents {
                entries.push(ProposedEntry::credit("Sales", Decimal::new(*c, 2)));
            }
            prop_assert_eq!(validate_entries(&entries).unwrap(), Decimal::new(total, 2));
        }

        #[test]
        fn any_cent_of_difference_is_rejected(
            amount in 1i64..10_000_000i64,
            skew in 1i64..100i64,
        ) {
            let entries = vec![
                ProposedEntry::debit("A", Decimal::new(amount + skew, 2)),
                ProposedEntry::credit("B", Decimal::new(amount, 2)),
            ];
            let is_unbalanced = matches!(
                validate_entries(&entries),
                Err(EntryValidationError::Unbalanced { .. })
            );
            prop_assert!(is_unbalanced);
        }

        #[test]
        fn huge_amounts_never_panic(
            lo in any::<u32>(),
            mid in any::<u32>(),
            hi in any::<u32>(),
            n in 2usize..6,
        ) {
            let big = Decimal::from_parts(lo, mid, hi, false, 0);
            prop_assume!(big > Decimal::ZERO);
            let mut entries: Vec<ProposedEntry> = (0..n).map(|_| ProposedEntry::debit("A", big)).collect();
            entries.push(ProposedEntry::credit("B", big));
            let outcome = validate_entries(&entries);
            let rejected = matches!(
                outcome,
                Err(EntryValidationError::OutOfRange { .. }) | Err(EntryValidationError::Unbalanced { .. })
            );
            prop_assert!(rejected);
        }
    }
}
