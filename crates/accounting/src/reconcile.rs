//! Ledger balance reconciliation.

use rust_decimal::Decimal;
use serde::Serialize;

use ledgerdesk_core::money::{checked_add, checked_sub};
use ledgerdesk_core::{DomainResult, LedgerId};

use crate::ledger::Ledger;
use crate::posting::{PostingDirection, signed_delta};
use crate::voucher::Voucher;

/// Stored balance vs. the balance implied by posted vouchers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub ledger_id: LedgerId,
    pub opening_balance: Decimal,
    pub expected_balance: Decimal,
    pub current_balance: Decimal,
    pub difference: Decimal,
    pub posted_entries: usize,
    pub balanced: bool,
}

/// `expected = opening + Σ signed entries of POSTED vouchers` on this ledger.
///
/// Drafts and reversed vouchers are skipped, so passing a tenant's whole
/// voucher list is fine.
pub fn reconcile<'a>(
    ledger: &Ledger,
    vouchers: impl IntoIterator<Item = &'a Voucher>,
) -> DomainResult<Reconciliation> {
    let mut expected = ledger.opening_balance;
    let mut posted_entries = 0usize;

    for voucher in vouchers.into_iter().filter(|v| v.affects_balances()) {
        for entry in voucher.entries.iter().filter(|e| e.ledger_id == ledger.id) {
            let delta = signed_delta(
                ledger.balance_type,
                entry.entry_type,
                entry.amount.value(),
                PostingDirection::Apply,
            );
            expected = checked_add(expected, delta)?;
            posted_entries += 1;
        }
    }

    let difference = checked_sub(ledger.current_balance, expected)?;
    Ok(Reconciliation {
        ledger_id: ledger.id,
        opening_balance: ledger.opening_balance,
        expected_balance: expected,
        current_balance: ledger.current_balance,
        difference,
        posted_entries,
        balanced: difference.is_zero(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use ledgerdesk_core::{Amount, TenantId, VoucherId};
    use proptest::prelude::*;

    use crate::entry::{EntryType, VoucherEntry};
    use crate::ledger::{LedgerSubtype, NewLedger};
    use crate::posting::balance_deltas;
    use crate::voucher::{NewVoucher, VoucherNumbering, VoucherStatus};
    use crate::voucher_type::VoucherCategory;

    fn ledger(tenant: TenantId, name: &str, subtype: LedgerSubtype, opening: i64) -> Ledger {
        Ledger::open(tenant, NewLedger::new(name, subtype, Decimal::from(opening)), Utc::now()).unwrap()
    }

    fn line(line_no: u32, l: &Ledger, entry_type: EntryType, cents: i64) -> VoucherEntry {
        VoucherEntry {
            line_no,
            ledger_id: l.id,
            ledger_name: l.name.clone(),
            ledger_code: None,
            entry_type,
            amount: Amount::new(Decimal::new(cents, 2)).unwrap(),
            narration: None,
            cost_center_id: None,
            cost_category_id: None,
        }
    }

    fn voucher(tenant: TenantId, entries: Vec<VoucherEntry>, status: VoucherStatus) -> Voucher {
        let total = entries
            .iter()
            .filter(|e| e.entry_type == EntryType::Debit)
            .map(|e| e.amount.value())
            .sum();
        NewVoucher {
            id: VoucherId::new(),
            tenant_id: tenant,
            voucher_type: VoucherCategory::Journal,
            numbering: VoucherNumbering::Auto,
            date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            reference: None,
            narration: None,
            total_amount: total,
            entries,
            party_ledger_id: None,
            status,
        }
        .into_voucher("JRN-1".into(), Utc::now())
    }

    fn post(ledgers: &mut [&mut Ledger], v: &Voucher, direction: PostingDirection) {
        let deltas = balance_deltas(&v.entries, direction, |id| {
            ledgers.iter().find(|l| l.id == id).map(|l| l.balance_type)
        })
        .unwrap();
        for d in deltas {
            if let Some(l) = ledgers.iter_mut().find(|l| l.id == d.ledger_id) {
                l.apply_delta(d.delta).unwrap();
            }
        }
    }

    #[test]
    fn drafts_and_reversed_vouchers_do_not_count() {
        let t = TenantId::new();
        let cash = ledger(t, "Cash", LedgerSubtype::Cash, 1000);
        let sales = ledger(t, "Sales", LedgerSubtype::Income, 0);

        let draft = voucher(
            t,
            vec![line(1, &cash, EntryType::Debit, 5000), line(2, &sales, EntryType::Credit, 5000)],
            VoucherStatus::Draft,
        );
        let reversed = voucher(
            t,
            vec![line(1, &cash, EntryType::Debit, 700), line(2, &sales, EntryType::Credit, 700)],
            VoucherStatus::Reversed,
        );

        let r = reconcile(&cash, [&draft, &reversed]).unwrap();
        assert!(r.balanced);
        assert_eq!(r.expected_balance, Decimal::from(1000));
        assert_eq!(r.posted_entries, 0);
    }

    #[test]
    fn out_of_band_balance_change_is_reported() {
        let t = TenantId::new();
        let mut cash = ledger(t, "Cash", LedgerSubtype::Cash, 1000);
        cash.current_balance += Decimal::new(1, 2);
        let r = reconcile(&cash, &Vec::<Voucher>::new()).unwrap();
        assert!(!r.balanced);
        assert_eq!(r.difference, Decimal::new(1, 2));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Posting any sequence of balanced vouchers keeps every ledger
        /// reconciled, and reversing them all restores opening balances.
        #[test]
        fn post_then_reverse_restores_openings(
            amounts in prop::collection::vec((1i64..10_000_000i64, any::<bool>()), 1..16)
        ) {
            let t = TenantId::new();
            let mut cash = ledger(t, "Cash", LedgerSubtype::Cash, 1000);
            let mut sales = ledger(t, "Sales", LedgerSubtype::Income, 250);

            let mut posted = Vec::new();
            for (cents, cash_debit) in amounts {
                let (cash_side, sales_side) = if cash_debit {
                    (EntryType::Debit, EntryType::Credit)
                } else {
                    (EntryType::Credit, EntryType::Debit)
                };
                let v = voucher(
                    t,
                    vec![line(1, &cash, cash_side, cents), line(2, &sales, sales_side, cents)],
                    VoucherStatus::Posted,
                );
                prop_assert!(v.is_balanced());
                post(&mut [&mut cash, &mut sales], &v, PostingDirection::Apply);
                posted.push(v);
            }

            prop_assert!(reconcile(&cash, &posted).unwrap().balanced);
            prop_assert!(reconcile(&sales, &posted).unwrap().balanced);

            for v in posted.iter_mut().rev() {
                post(&mut [&mut cash, &mut sales], v, PostingDirection::Revert);
                v.mark_reversed(Utc::now()).unwrap();
            }

            prop_assert_eq!(cash.current_balance, Decimal::from(1000));
            prop_assert_eq!(sales.current_balance, Decimal::from(250));
            prop_assert!(reconcile(&cash, &posted).unwrap().balanced);
        }
    }
}
