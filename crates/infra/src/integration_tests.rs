//! End-to-end tests of the books service over the in-memory store.
//!
//! Verifies:
//! - posted vouchers balance and move ledger balances by signed deltas
//! - reversal and transaction deletion restore balances exactly
//! - rejected operations leave every balance unchanged
//! - Tally import and export

use chrono::NaiveDate;
use rust_decimal::Decimal;

use ledgerdesk_accounting::{
    EntryType, Ledger, LedgerSubtype, NewLedger, NewNumberingSeries, ProposedEntry, VoucherCategory,
    VoucherDeletion, VoucherStatus,
};
use ledgerdesk_banking::{NewBankAccount, NewTransaction, TransactionFilter, TransactionType};
use ledgerdesk_core::{AccountId, Amount, TenantId};

use crate::service::{Books, EditDraft, PostVoucher};
use crate::store::{Pagination, VoucherFilter};
use crate::tally::{ExportKind, Sheet, Workbook};

fn d(v: i64) -> Decimal {
    Decimal::from(v)
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()
}

fn sale(entries: Vec<ProposedEntry>) -> PostVoucher {
    PostVoucher {
        voucher_type: VoucherCategory::Sales,
        date: date(),
        narration: None,
        reference: None,
        voucher_number: None,
        numbering_series_id: None,
        entries,
        party_ledger_id: None,
        auto_post: true,
    }
}

async fn ledger(books: &Books, tenant: TenantId, name: &str, subtype: LedgerSubtype, opening: i64) -> Ledger {
    books
        .create_ledger(tenant, NewLedger::new(name, subtype, d(opening)))
        .await
        .unwrap()
}

async fn balance(books: &Books, tenant: TenantId, l: &Ledger) -> Decimal {
    books.get_ledger(tenant, l.id).await.unwrap().current_balance
}

async fn setup() -> (Books, TenantId, Ledger, Ledger) {
    let books = Books::in_memory();
    let tenant = TenantId::new();
    let cash = ledger(&books, tenant, "Cash", LedgerSubtype::Cash, 1000).await;
    let sales = ledger(&books, tenant, "Sales", LedgerSubtype::Income, 0).await;
    (books, tenant, cash, sales)
}

#[tokio::test]
async fn posting_then_reversing_restores_balances() {
    let (books, tenant, cash, sales) = setup().await;

    let voucher = books
        .post_voucher(
            tenant,
            sale(vec![ProposedEntry::debit("Cash", d(500)), ProposedEntry::credit("Sales", d(500))]),
        )
        .await
        .unwrap();

    assert_eq!(voucher.status, VoucherStatus::Posted);
    assert!(voucher.is_balanced());
    assert_eq!(voucher.side_total(EntryType::Debit), Some(voucher.total_amount));
    assert_eq!(voucher.side_total(EntryType::Credit), Some(voucher.total_amount));
    assert_eq!(balance(&books, tenant, &cash).await, d(1500));
    assert_eq!(balance(&books, tenant, &sales).await, d(500));

    let removed = books.delete_voucher(tenant, voucher.id).await.unwrap();
    assert_eq!(removed.deletion, VoucherDeletion::ReversePosted);
    assert_eq!(removed.voucher.status, VoucherStatus::Reversed);
    assert_eq!(balance(&books, tenant, &cash).await, d(1000));
    assert_eq!(balance(&books, tenant, &sales).await, d(0));
}

#[tokio::test]
async fn unbalanced_voucher_is_rejected_before_ledger_lookup() {
    let (books, tenant, cash, _) = setup().await;

    // Neither ledger exists; a validation error proves no lookup happened.
    let err = books
        .post_voucher(
            tenant,
            sale(vec![ProposedEntry::debit("A", d(100)), ProposedEntry::credit("B", d(90))]),
        )
        .await
        .unwrap_err();
    assert!(err.is_validation(), "{err}");
    assert_eq!(balance(&books, tenant, &cash).await, d(1000));

    let page = books
        .list_vouchers(tenant, &VoucherFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn unknown_ledger_name_is_not_found_and_nothing_moves() {
    let (books, tenant, cash, _) = setup().await;

    let err = books
        .post_voucher(
            tenant,
            sale(vec![ProposedEntry::debit("cash", d(50)), ProposedEntry::credit("Rent", d(50))]),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("Rent"));
    assert_eq!(balance(&books, tenant, &cash).await, d(1000));
}

#[tokio::test]
async fn ledger_names_resolve_case_insensitively() {
    let (books, tenant, cash, _) = setup().await;

    let voucher = books
        .post_voucher(
            tenant,
            sale(vec![ProposedEntry::debit("  CASH ", d(10)), ProposedEntry::credit("sales", d(10))]),
        )
        .await
        .unwrap();
    assert_eq!(voucher.entries[0].ledger_id, cash.id);
    assert_eq!(voucher.entries[0].ledger_name, "Cash");
}

#[tokio::test]
async fn double_delete_voucher_is_not_found_and_balances_hold() {
    let (books, tenant, cash, _) = setup().await;
    let voucher = books
        .post_voucher(
            tenant,
            sale(vec![ProposedEntry::debit("Cash", d(200)), ProposedEntry::credit("Sales", d(200))]),
        )
        .await
        .unwrap();

    books.delete_voucher(tenant, voucher.id).await.unwrap();
    let err = books.delete_voucher(tenant, voucher.id).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(balance(&books, tenant, &cash).await, d(1000));
}

#[tokio::test]
async fn balances_reconcile_with_posted_vouchers() {
    let (books, tenant, cash, sales) = setup().await;

    for amount in [100, 250, 75] {
        books
            .post_voucher(
                tenant,
                sale(vec![ProposedEntry::debit("Cash", d(amount)), ProposedEntry::credit("Sales", d(amount))]),
            )
            .await
            .unwrap();
    }
    let reversed = books
        .post_voucher(
            tenant,
            sale(vec![ProposedEntry::debit("Cash", d(40)), ProposedEntry::credit("Sales", d(40))]),
        )
        .await
        .unwrap();
    books.delete_voucher(tenant, reversed.id).await.unwrap();

    let mut draft = sale(vec![ProposedEntry::debit("Cash", d(999)), ProposedEntry::credit("Sales", d(999))]);
    draft.auto_post = false;
    books.post_voucher(tenant, draft).await.unwrap();

    let rec = books.reconcile_ledger(tenant, cash.id).await.unwrap();
    assert!(rec.balanced);
    assert_eq!(rec.expected_balance, d(1425));
    assert_eq!(rec.current_balance, d(1425));
    assert_eq!(rec.posted_entries, 3);

    let rec = books.reconcile_ledger(tenant, sales.id).await.unwrap();
    assert!(rec.balanced);
    assert_eq!(rec.current_balance, d(425));
}

#[tokio::test]
async fn drafts_have_no_effect_until_posted() {
    let (books, tenant, cash, _) = setup().await;

    let mut cmd = sale(vec![ProposedEntry::debit("Cash", d(300)), ProposedEntry::credit("Sales", d(300))]);
    cmd.auto_post = false;
    let draft = books.post_voucher(tenant, cmd).await.unwrap();
    assert_eq!(draft.status, VoucherStatus::Draft);
    assert_eq!(balance(&books, tenant, &cash).await, d(1000));

    let edited = books
        .update_draft(
            tenant,
            draft.id,
            EditDraft {
                date: date(),
                narration: Some("corrected".into()),
                reference: None,
                entries: vec![ProposedEntry::debit("Cash", d(350)), ProposedEntry::credit("Sales", d(350))],
                party_ledger_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.total_amount, d(350));
    assert_eq!(balance(&books, tenant, &cash).await, d(1000));

    let posted = books.post_draft(tenant, draft.id).await.unwrap();
    assert_eq!(posted.status, VoucherStatus::Posted);
    assert_eq!(balance(&books, tenant, &cash).await, d(1350));

    let err = books.post_draft(tenant, draft.id).await.unwrap_err();
    assert!(err.is_validation() || err.is_conflict(), "{err}");
    assert_eq!(balance(&books, tenant, &cash).await, d(1350));
}

#[tokio::test]
async fn discarding_a_draft_leaves_balances_alone() {
    let (books, tenant, cash, _) = setup().await;

    let mut cmd = sale(vec![ProposedEntry::debit("Cash", d(300)), ProposedEntry::credit("Sales", d(300))]);
    cmd.auto_post = false;
    let draft = books.post_voucher(tenant, cmd).await.unwrap();

    let removed = books.delete_voucher(tenant, draft.id).await.unwrap();
    assert_eq!(removed.deletion, VoucherDeletion::DiscardDraft);
    assert!(books.get_voucher(tenant, draft.id).await.unwrap_err().is_not_found());
    assert_eq!(balance(&books, tenant, &cash).await, d(1000));
}

#[tokio::test]
async fn series_numbering_and_manual_numbers() {
    let (books, tenant, _, _) = setup().await;
    let series = books
        .create_series(
            tenant,
            NewNumberingSeries {
                name: "Retail".into(),
                voucher_type: VoucherCategory::Sales,
                prefix: "R/".into(),
                suffix: String::new(),
                width: 3,
                start_at: 1,
            },
        )
        .await
        .unwrap();

    let mut cmd = sale(vec![ProposedEntry::debit("Cash", d(1)), ProposedEntry::credit("Sales", d(1))]);
    cmd.numbering_series_id = Some(series.id);
    let first = books.post_voucher(tenant, cmd.clone()).await.unwrap();
    let second = books.post_voucher(tenant, cmd.clone()).await.unwrap();
    assert_eq!(first.voucher_number, "R/001");
    assert_eq!(second.voucher_number, "R/002");

    cmd.voucher_number = Some("R/002".into());
    let err = books.post_voucher(tenant, cmd.clone()).await.unwrap_err();
    assert!(err.is_conflict());

    cmd.voucher_type = VoucherCategory::Receipt;
    cmd.voucher_number = None;
    let err = books.post_voucher(tenant, cmd).await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn transaction_debit_and_delete_restore_account_balance() {
    let books = Books::in_memory();
    let tenant = TenantId::new();
    let account = books
        .create_account(tenant, NewBankAccount { name: "Current".into(), balance: d(1000) })
        .await
        .unwrap();

    let tx = books
        .create_transaction(
            tenant,
            NewTransaction {
                account_id: account.id,
                amount: Amount::new(d(200)).unwrap(),
                kind: TransactionType::Debit,
                description: "rent".into(),
                date: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(books.get_account(tenant, account.id).await.unwrap().balance, d(800));

    books.delete_transaction(tenant, tx.id).await.unwrap();
    assert_eq!(books.get_account(tenant, account.id).await.unwrap().balance, d(1000));

    let err = books.delete_transaction(tenant, tx.id).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(books.get_account(tenant, account.id).await.unwrap().balance, d(1000));
}

#[tokio::test]
async fn transaction_for_missing_account_is_not_found() {
    let books = Books::in_memory();
    let err = books
        .create_transaction(
            TenantId::new(),
            NewTransaction {
                account_id: AccountId::new(),
                amount: Amount::new(d(1)).unwrap(),
                kind: TransactionType::Credit,
                description: String::new(),
                date: None,
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn transaction_pages_report_filtered_total() {
    let books = Books::in_memory();
    let tenant = TenantId::new();
    let account = books
        .create_account(tenant, NewBankAccount { name: "Current".into(), balance: d(0) })
        .await
        .unwrap();

    for i in 0..15 {
        let kind = if i % 3 == 0 { TransactionType::Debit } else { TransactionType::Credit };
        books
            .create_transaction(
                tenant,
                NewTransaction {
                    account_id: account.id,
                    amount: Amount::new(d(10)).unwrap(),
                    kind,
                    description: format!("tx {i}"),
                    date: None,
                },
            )
            .await
            .unwrap();
    }

    let all = TransactionFilter {
        account_id: Some(account.id),
        ..Default::default()
    };
    let page = books
        .list_transactions(tenant, &all, Pagination::new(Some(10), Some(0)))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 10);
    assert_eq!(page.total, 15);
    assert!(page.has_more);

    let debits = TransactionFilter {
        kind: Some(TransactionType::Debit),
        ..all
    };
    let page = books
        .list_transactions(tenant, &debits, Pagination::new(Some(10), Some(0)))
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert!(page.items.iter().all(|t| t.kind == TransactionType::Debit));
}

#[tokio::test]
async fn tenants_cannot_see_each_others_books() {
    let (books, tenant, cash, _) = setup().await;
    let other = TenantId::new();

    assert!(books.get_ledger(other, cash.id).await.unwrap_err().is_not_found());
    let err = books
        .post_voucher(
            other,
            sale(vec![ProposedEntry::debit("Cash", d(5)), ProposedEntry::credit("Sales", d(5))]),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(balance(&books, tenant, &cash).await, d(1000));
}

#[tokio::test]
async fn tally_import_creates_ledgers_and_posts_vouchers() {
    let books = Books::in_memory();
    let tenant = TenantId::new();

    let book = Workbook::new(vec![
        Sheet::from_csv(
            "Ledger",
            "Ledger Name,Under,Opening Balance,Dr/Cr\nCash,Cash-in-Hand,1000,Dr\nSales,Sales Accounts,,\nOutput CGST,Duties & Taxes,,\nOutput SGST,Duties & Taxes,,\nMystery,Branch / Divisions,,\n",
        )
        .unwrap(),
        Sheet::from_csv("Parties", "Name,GSTIN\nAcme Traders,27AAPFU0939F1ZV\nCash,\n").unwrap(),
        Sheet::from_csv(
            "Transactions",
            "Date,Voucher Type,Voucher No,Ledger,Debit,Credit\n\
             1-Apr-2026,Sales,S-1,Acme Traders,1180,\n\
             1-Apr-2026,Sales,S-1,Sales,,1000\n\
             1-Apr-2026,Sales,S-1,Output CGST,,90\n\
             1-Apr-2026,Sales,S-1,Output SGST,,90\n\
             2-Apr-2026,Receipt,R-1,Cash,500,\n\
             2-Apr-2026,Receipt,R-1,Acme Traders,,400\n",
        )
        .unwrap(),
    ]);

    let report = books.import_tally(tenant, &book).await.unwrap();
    assert_eq!(report.ledgers_created, 4);
    assert_eq!(report.parties_created, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.vouchers_posted, 1);
    assert_eq!(report.errors.len(), 2, "{:?}", report.errors);
    assert!(report.errors.iter().any(|e| e.sheet == "Ledger" && e.row == 6));
    assert!(report.errors.iter().any(|e| e.message.contains("R-1")));

    let ledgers = books.list_ledgers(tenant).await.unwrap();
    let acme = ledgers.iter().find(|l| l.name == "Acme Traders").unwrap();
    assert_eq!(acme.subtype, LedgerSubtype::Customer);
    assert_eq!(acme.current_balance, d(1180));

    let gst = books.export_tally(tenant, ExportKind::Gst).await.unwrap();
    let sheet = &gst.sheets[0];
    assert_eq!(sheet.name, "GST");
    assert_eq!(sheet.rows.len(), 1);
    assert_eq!(sheet.rows[0][3], "Acme Traders");
    assert_eq!(sheet.rows[0][4], "1000");
    assert_eq!(sheet.rows[0][5], "90");
    assert_eq!(sheet.rows[0][8], "1180");
}

#[tokio::test]
async fn exported_ledgers_import_into_another_tenant() {
    let (books, tenant, _, _) = setup().await;
    let exported = books.export_tally(tenant, ExportKind::Ledgers).await.unwrap();
    let csv = exported.sheets[0].to_csv().unwrap();

    let other = TenantId::new();
    let book = Workbook::new(vec![Sheet::from_csv("Ledger", &csv).unwrap()]);
    let report = books.import_tally(other, &book).await.unwrap();
    assert_eq!(report.ledgers_created, 2);
    assert!(report.errors.is_empty(), "{:?}", report.errors);

    let mut names: Vec<_> = books.list_ledgers(other).await.unwrap().into_iter().map(|l| l.name).collect();
    names.sort();
    assert_eq!(names, vec!["Cash", "Sales"]);

    let again = books.import_tally(other, &book).await.unwrap();
    assert_eq!(again.skipped, 2);
    assert_eq!(again.ledgers_created, 0);
}

#[tokio::test]
async fn voucher_export_has_one_row_per_entry() {
    let (books, tenant, _, _) = setup().await;
    books
        .post_voucher(
            tenant,
            sale(vec![ProposedEntry::debit("Cash", d(500)), ProposedEntry::credit("Sales", d(500))]),
        )
        .await
        .unwrap();

    let book = books.export_tally(tenant, ExportKind::Vouchers).await.unwrap();
    let sheet = &book.sheets[0];
    assert_eq!(sheet.headers[2], "Voucher No");
    assert_eq!(sheet.rows.len(), 2);
    assert_eq!(sheet.rows[0][2], "SAL-1");
    assert_eq!(sheet.rows[0][5], "500");
    assert_eq!(sheet.rows[1][6], "500");
}

#[tokio::test]
async fn tally_numbers_are_scoped_by_voucher_type() {
    let (books, tenant, cash, _) = setup().await;
    ledger(&books, tenant, "Rent", LedgerSubtype::Expense, 0).await;

    let book = Workbook::new(vec![
        Sheet::from_csv(
            "Transactions",
            "Date,Voucher Type,Voucher No,Ledger,Debit,Credit\n\
             2026-04-01,Sales,1,Cash,300,\n\
             2026-04-01,Sales,1,Sales,,300\n\
             2026-04-01,Payment,1,Rent,100,\n\
             2026-04-01,Payment,1,Cash,,100\n",
        )
        .unwrap(),
    ]);

    let report = books.import_tally(tenant, &book).await.unwrap();
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert_eq!(report.vouchers_posted, 2);
    assert_eq!(balance(&books, tenant, &cash).await, d(1200));

    let posted = books.all_vouchers(tenant, &VoucherFilter::default()).await.unwrap();
    let mut kinds: Vec<_> = posted.iter().map(|v| (v.voucher_type.as_str(), v.voucher_number.as_str())).collect();
    kinds.sort();
    assert_eq!(kinds, vec![("PAYMENT", "1"), ("SALES", "1")]);
}

#[tokio::test]
async fn tally_status_column_drafts_and_skips() {
    let (books, tenant, cash, _) = setup().await;

    let book = Workbook::new(vec![
        Sheet::from_csv(
            "Transactions",
            "Date,Voucher Type,Voucher No,Status,Ledger,Debit,Credit\n\
             2026-04-01,Sales,S-1,POSTED,Cash,50,\n\
             2026-04-01,Sales,S-1,POSTED,Sales,,50\n\
             2026-04-01,Sales,S-2,DRAFT,Cash,70,\n\
             2026-04-01,Sales,S-2,DRAFT,Sales,,70\n\
             2026-04-01,Sales,S-3,REVERSED,Cash,90,\n\
             2026-04-01,Sales,S-3,REVERSED,Sales,,90\n",
        )
        .unwrap(),
    ]);

    let report = books.import_tally(tenant, &book).await.unwrap();
    assert_eq!(report.vouchers_posted, 1);
    assert_eq!(report.drafts_created, 1);
    assert_eq!(report.errors.len(), 1, "{:?}", report.errors);
    assert_eq!(report.errors[0].row, 6);
    assert!(report.errors[0].message.contains("S-3"));
    assert_eq!(balance(&books, tenant, &cash).await, d(1050));

    let drafts = VoucherFilter {
        status: Some(VoucherStatus::Draft),
        ..Default::default()
    };
    let drafts = books.all_vouchers(tenant, &drafts).await.unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].voucher_number, "S-2");
}
