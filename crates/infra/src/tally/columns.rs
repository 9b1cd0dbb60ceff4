//! Sheet names, column aliases and Tally group names.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use ledgerdesk_accounting::LedgerSubtype;

pub const LEDGER_SHEET: &[&str] = &["Ledger", "Ledgers"];
pub const PARTY_SHEET: &[&str] = &["Party Ledger", "Parties", "Party Ledgers"];
pub const TRANSACTION_SHEET: &[&str] = &["Transactions", "Vouchers"];

pub const NAME: &[&str] = &["Name", "Ledger Name", "Ledger", "Party Name", "Party"];
pub const GROUP: &[&str] = &["Group", "Under", "Type", "Parent"];
pub const CODE: &[&str] = &["Code", "Ledger Code", "Alias"];
pub const OPENING: &[&str] = &["Opening Balance", "Opening", "Balance"];
pub const OPENING_SIDE: &[&str] = &["Dr/Cr", "Balance Type", "Side"];
pub const GSTIN: &[&str] = &["GSTIN", "GSTIN/UIN", "GST No", "GST Number"];

pub const DATE: &[&str] = &["Date", "Voucher Date"];
pub const VOUCHER_TYPE: &[&str] = &["Voucher Type", "Vch Type", "Type"];
pub const VOUCHER_NO: &[&str] = &["Voucher No", "Voucher Number", "Vch No", "Voucher No."];
pub const DEBIT: &[&str] = &["Debit", "Dr", "Debit Amount"];
pub const CREDIT: &[&str] = &["Credit", "Cr", "Credit Amount"];
pub const NARRATION: &[&str] = &["Narration", "Particulars", "Description"];
pub const REFERENCE: &[&str] = &["Reference", "Ref", "Ref No"];
pub const STATUS: &[&str] = &["Status", "Voucher Status"];

/// Map a Tally group (or one of our own subtype codes) to a subtype.
pub fn subtype_for_group(group: &str) -> Option<LedgerSubtype> {
    let key = group.trim().to_ascii_lowercase();
    let subtype = match key.as_str() {
        "cash-in-hand" | "cash in hand" | "cash" => LedgerSubtype::Cash,
        "bank accounts" | "bank account" | "bank od a/c" | "bank" => LedgerSubtype::Bank,
        "sundry debtors" | "debtors" | "customer" | "customers" => LedgerSubtype::Customer,
        "sundry creditors" | "creditors" | "supplier" | "suppliers" => LedgerSubtype::Supplier,
        "sales accounts" | "direct incomes" | "indirect incomes" | "income" => LedgerSubtype::Income,
        "purchase accounts" | "direct expenses" | "indirect expenses" | "expense" | "expenses" => {
            LedgerSubtype::Expense
        }
        "fixed assets" => LedgerSubtype::FixedAsset,
        "current assets" | "deposits (asset)" | "loans & advances (asset)" | "stock-in-hand" => {
            LedgerSubtype::CurrentAsset
        }
        "current liabilities" | "provisions" => LedgerSubtype::Liability,
        "capital account" | "reserves & surplus" | "capital" => LedgerSubtype::Capital,
        "duties & taxes" | "duties and taxes" => LedgerSubtype::DutiesTaxes,
        "loans (liability)" | "secured loans" | "unsecured loans" | "loan" => LedgerSubtype::Loan,
        _ => return key.parse().ok(),
    };
    Some(subtype)
}

/// Tally group written on export.
pub fn group_for_subtype(subtype: LedgerSubtype) -> &'static str {
    match subtype {
        LedgerSubtype::Cash => "Cash-in-Hand",
        LedgerSubtype::Bank => "Bank Accounts",
        LedgerSubtype::Customer => "Sundry Debtors",
        LedgerSubtype::Supplier => "Sundry Creditors",
        LedgerSubtype::Income => "Sales Accounts",
        LedgerSubtype::Expense => "Indirect Expenses",
        LedgerSubtype::FixedAsset => "Fixed Assets",
        LedgerSubtype::CurrentAsset => "Current Assets",
        LedgerSubtype::Liability => "Current Liabilities",
        LedgerSubtype::Capital => "Capital Account",
        LedgerSubtype::DutiesTaxes => "Duties & Taxes",
        LedgerSubtype::Loan => "Loans (Liability)",
    }
}

/// Amounts as Tally prints them: optional thousands separators and an
/// optional `Dr`/`Cr` suffix, which is ignored.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '.' || c.is_whitespace())
        .chars()
        .filter(|c| *c != ',')
        .collect();
    cleaned.trim().parse().ok()
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%d-%b-%Y", "%d-%b-%y", "%d.%m.%Y"];

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}
