//! CSV statement parsers
//!
//! Bank exports share one shape (date, narration, withdrawal and deposit
//! columns, optional reference number) and differ only in column names, so
//! they go through a single parser driven by a [`StatementLayout`]. The
//! Paytm wallet export has signed amounts and a per-row account column and
//! gets its own parser.
//!
//! Bad rows never abort a file: they are logged and reported in
//! [`ParsedStatement::skipped`]. Only an unreadable header is an error.

use std::collections::HashMap;
use std::io::Read;

use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{Direction, RawTransaction};

/// Supported statement providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Hdfc,
    Icici,
    Sbi,
    Kotak,
    Paytm,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::Hdfc,
        Provider::Icici,
        Provider::Sbi,
        Provider::Kotak,
        Provider::Paytm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hdfc => "hdfc",
            Self::Icici => "icici",
            Self::Sbi => "sbi",
            Self::Kotak => "kotak",
            Self::Paytm => "paytm",
        }
    }

    /// Column layout for bank providers; `None` for Paytm
    pub fn layout(&self) -> Option<StatementLayout> {
        match self {
            Self::Hdfc => Some(StatementLayout::new(
                "hdfc",
                "Date",
                "Narration",
                "Withdrawal Amt.",
                "Deposit Amt.",
            )
            .with_ref_column("Chq./Ref.No.")),
            Self::Icici => Some(StatementLayout::new(
                "icici",
                "Transaction Date",
                "Transaction Remarks",
                "Withdrawal Amount (INR )",
                "Deposit Amount (INR )",
            )
            .with_unique_id_column("Tran. Id")),
            Self::Sbi => Some(StatementLayout::new(
                "sbi",
                "Txn Date",
                "Description",
                "Debit",
                "Credit",
            )
            .with_ref_column("Ref No./Cheque No.")),
            Self::Kotak => Some(StatementLayout::new(
                "kotak",
                "Transaction Date",
                "Description",
                "Debit",
                "Credit",
            )
            .with_ref_column("Chq / Ref No.")),
            Self::Paytm => None,
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hdfc" => Ok(Self::Hdfc),
            "icici" => Ok(Self::Icici),
            "sbi" => Ok(Self::Sbi),
            "kotak" => Ok(Self::Kotak),
            "paytm" => Ok(Self::Paytm),
            other => Err(Error::UnsupportedProvider(other.to_string())),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Column names of a withdrawal/deposit style bank statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementLayout {
    /// Provider tag written to each transaction
    pub source: String,
    pub date_col: String,
    pub description_col: String,
    pub debit_col: String,
    pub credit_col: String,
    /// Reference number column, used in the unique key
    pub ref_col: Option<String>,
    /// Stable transaction ID column, preferred over `ref_col`
    pub unique_id_col: Option<String>,
}

impl StatementLayout {
    pub fn new(
        source: &str,
        date_col: &str,
        description_col: &str,
        debit_col: &str,
        credit_col: &str,
    ) -> Self {
        Self {
            source: source.to_string(),
            date_col: clean_column(date_col),
            description_col: clean_column(description_col),
            debit_col: clean_column(debit_col),
            credit_col: clean_column(credit_col),
            ref_col: None,
            unique_id_col: None,
        }
    }

    pub fn with_ref_column(mut self, col: &str) -> Self {
        self.ref_col = Some(clean_column(col));
        self
    }

    pub fn with_unique_id_column(mut self, col: &str) -> Self {
        self.unique_id_col = Some(clean_column(col));
        self
    }

    fn required_columns(&self) -> [&str; 4] {
        [
            &self.date_col,
            &self.description_col,
            &self.debit_col,
            &self.credit_col,
        ]
    }
}

/// A row the parser could not turn into a transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    /// 1-based line in the file
    pub line: u64,
    pub reason: String,
}

/// Parser output: valid transactions plus the rows that were dropped
#[derive(Debug, Default)]
pub struct ParsedStatement {
    pub transactions: Vec<RawTransaction>,
    pub skipped: Vec<SkippedRow>,
}

impl ParsedStatement {
    fn skip(&mut self, line: u64, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("Skipping statement line {}: {}", line, reason);
        self.skipped.push(SkippedRow { line, reason });
    }
}

/// Header cells are trimmed and dots removed before comparison
fn clean_column(name: &str) -> String {
    name.trim().replace('.', "")
}

/// Map cleaned header names to column positions
fn header_index(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (clean_column(h), i))
        .collect()
}

/// Detect the provider from a CSV header line
///
/// Returns None if the format is not recognized.
pub fn detect_provider(header: &str) -> Option<Provider> {
    let columns: Vec<String> = header
        .split(',')
        .map(|c| clean_column(c.trim_matches('"')))
        .collect();
    let has = |name: &str| columns.iter().any(|c| c == name);

    if has("Your Account") && has("Transaction Details") && has("Amount") {
        return Some(Provider::Paytm);
    }

    // Most specific layouts first: ICICI and Kotak share a date column name
    [Provider::Icici, Provider::Hdfc, Provider::Sbi, Provider::Kotak]
        .into_iter()
        .find(|p| {
            p.layout()
                .is_some_and(|layout| layout.required_columns().iter().all(|&c| has(c)))
        })
}

/// Convert a CSV record to a JSON object using headers as keys
fn record_to_json(headers: &StringRecord, record: &StringRecord) -> Value {
    let mut map = serde_json::Map::new();
    for (i, header) in headers.iter().enumerate() {
        if let Some(value) = record.get(i) {
            map.insert(header.trim().to_string(), Value::String(value.to_string()));
        }
    }
    Value::Object(map)
}

/// Parse a withdrawal/deposit style bank statement
pub fn parse_statement<R: Read>(
    reader: R,
    account_id: i64,
    layout: &StatementLayout,
) -> Result<ParsedStatement> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let index = header_index(&headers);

    for col in layout.required_columns() {
        if !index.contains_key(col) {
            return Err(Error::Import(format!(
                "Missing column '{}' for {} statement",
                col, layout.source
            )));
        }
    }

    let column = |record: &StringRecord, name: &str| -> String {
        index
            .get(name)
            .and_then(|&i| record.get(i))
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };

    let upi_re = Regex::new(r"(\d{12})")?;
    let mut parsed = ParsedStatement::default();

    for (row_index, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map_or(0, |p| p.line());
                parsed.skip(line, format!("Unreadable row: {}", e));
                continue;
            }
        };
        let line = record.position().map_or(0, |p| p.line());

        let date_str = column(&record, &layout.date_col);
        if date_str.is_empty() {
            debug!("Line {} has no date, skipping", line);
            continue;
        }

        let debit = match parse_optional_amount(&column(&record, &layout.debit_col)) {
            Ok(v) => v,
            Err(e) => {
                parsed.skip(line, e.to_string());
                continue;
            }
        };
        let credit = match parse_optional_amount(&column(&record, &layout.credit_col)) {
            Ok(v) => v,
            Err(e) => {
                parsed.skip(line, e.to_string());
                continue;
            }
        };

        let (amount, direction) = if debit > 0.0 {
            (debit, Direction::Debit)
        } else if credit > 0.0 {
            (credit, Direction::Credit)
        } else {
            debug!("Line {} has no amount, skipping", line);
            continue;
        };

        let txn_date = match parse_date(&date_str) {
            Ok(d) => d,
            Err(e) => {
                parsed.skip(line, e.to_string());
                continue;
            }
        };

        let description = column(&record, &layout.description_col);
        let upi_ref = if description.contains("UPI") {
            upi_re
                .captures(&description)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        } else {
            None
        };

        let unique_id = layout
            .unique_id_col
            .as_deref()
            .map(|c| column(&record, c))
            .filter(|v| !v.is_empty());
        let id_part = match (unique_id, layout.ref_col.as_deref()) {
            (Some(id), _) => id,
            (None, Some(ref_col)) => column(&record, ref_col),
            (None, None) => {
                let prefix: String = description.chars().take(10).collect();
                format!("{}-{}", prefix, row_index)
            }
        };

        match RawTransaction::new(
            account_id,
            txn_date,
            description,
            amount,
            direction,
            layout.source.as_str(),
        ) {
            Ok(raw) => parsed.transactions.push(
                raw.with_id_part(id_part)
                    .with_upi_ref(upi_ref)
                    .with_raw_data(record_to_json(&headers, &record)),
            ),
            Err(e) => parsed.skip(line, e.to_string()),
        }
    }

    debug!(
        "Parsed {} {} transactions ({} skipped)",
        parsed.transactions.len(),
        layout.source,
        parsed.skipped.len()
    );
    Ok(parsed)
}

/// Parse a Paytm wallet export
///
/// Each row names the linked account in `Your Account`; rows are routed to
/// the first account (longest name first) whose name occurs in that cell,
/// and rows matching no account are skipped. The matched account's name is
/// the row's source. Paytm rows carry no stable reference, so they get no
/// unique key.
pub fn parse_paytm<R: Read>(reader: R, accounts: &HashMap<String, i64>) -> Result<ParsedStatement> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let index = header_index(&headers);

    for col in ["Date", "Time", "Transaction Details", "Your Account", "Amount"] {
        if !index.contains_key(col) {
            return Err(Error::Import(format!(
                "Missing column '{}' for paytm statement",
                col
            )));
        }
    }

    let column = |record: &StringRecord, name: &str| -> String {
        index
            .get(name)
            .and_then(|&i| record.get(i))
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };

    let mut names: Vec<(&String, i64)> = accounts.iter().map(|(n, id)| (n, *id)).collect();
    names.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

    let mut parsed = ParsedStatement::default();

    for result in rdr.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map_or(0, |p| p.line());
                parsed.skip(line, format!("Unreadable row: {}", e));
                continue;
            }
        };
        let line = record.position().map_or(0, |p| p.line());

        let date_str = column(&record, "Date");
        if date_str.is_empty() || column(&record, "Remarks").contains("This is not included") {
            continue;
        }

        let account_cell = column(&record, "Your Account");
        let Some(&(account_name, account_id)) =
            names.iter().find(|(n, _)| account_cell.contains(n.as_str()))
        else {
            debug!("Line {} matches no account ({}), skipping", line, account_cell);
            continue;
        };

        let signed = match parse_optional_amount(&column(&record, "Amount")) {
            Ok(v) if v != 0.0 => v,
            Ok(_) => continue,
            Err(e) => {
                parsed.skip(line, e.to_string());
                continue;
            }
        };
        let direction = if signed > 0.0 {
            Direction::Credit
        } else {
            Direction::Debit
        };

        let stamp = format!("{} {}", date_str, column(&record, "Time"));
        let txn_date = match NaiveDateTime::parse_from_str(&stamp, "%d/%m/%Y %H:%M:%S") {
            Ok(d) => d,
            Err(_) => {
                parsed.skip(line, format!("Unable to parse date: {}", stamp));
                continue;
            }
        };

        let upi_ref = match parse_upi_ref(&column(&record, "UPI Ref No")) {
            Ok(r) => r,
            Err(e) => {
                parsed.skip(line, e.to_string());
                continue;
            }
        };

        match RawTransaction::new(
            account_id,
            txn_date,
            column(&record, "Transaction Details"),
            signed.abs(),
            direction,
            account_name.as_str(),
        ) {
            Ok(raw) => parsed.transactions.push(
                raw.with_upi_ref(upi_ref)
                    .with_raw_data(record_to_json(&headers, &record)),
            ),
            Err(e) => parsed.skip(line, e.to_string()),
        }
    }

    debug!(
        "Parsed {} paytm transactions ({} skipped)",
        parsed.transactions.len(),
        parsed.skipped.len()
    );
    Ok(parsed)
}

/// Paytm exports the reference as a number, sometimes with a trailing `.0`
fn parse_upi_ref(s: &str) -> Result<Option<String>> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    let value: f64 = s
        .parse()
        .map_err(|_| Error::Import(format!("Invalid UPI reference: {}", s)))?;
    if !value.is_finite() {
        return Err(Error::Import(format!("Invalid UPI reference: {}", s)));
    }
    Ok(Some(format!("{:.0}", value.trunc())))
}

/// Parse a day-first date, with or without a time of day
fn parse_date(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();

    let datetime_formats = [
        "%d/%m/%Y %H:%M:%S", // 15/01/2024 13:45:00
        "%d/%m/%Y %H:%M",    // 15/01/2024 13:45
        "%d-%m-%Y %H:%M:%S", // 15-01-2024 13:45:00
        "%Y-%m-%d %H:%M:%S", // 2024-01-15 13:45:00
    ];
    for fmt in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }

    let date_formats = [
        "%d/%m/%Y", // 15/01/2024
        "%d/%m/%y", // 15/01/24
        "%d-%m-%Y", // 15-01-2024
        "%d-%m-%y", // 15-01-24
        "%d.%m.%Y", // 15.01.2024
        "%d-%b-%Y", // 15-Jan-2024
        "%d %b %Y", // 15 Jan 2024
        "%d-%b-%y", // 15-Jan-24
        "%Y-%m-%d", // 2024-01-15
    ];
    for fmt in date_formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Ok(dt);
            }
        }
    }

    Err(Error::Import(format!("Unable to parse date: {}", s)))
}

/// Parse an amount string, handling currency symbols and commas
fn parse_amount(s: &str) -> Result<f64> {
    let cleaned: String = s
        .trim()
        .replace(['₹', '$', ',', ' '], "")
        .replace("Rs", "")
        .replace('(', "-")
        .replace(')', "");

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::Import(format!("Unable to parse amount: {}", s)))
}

/// Empty cells count as zero
fn parse_optional_amount(s: &str) -> Result<f64> {
    if s.trim().is_empty() {
        Ok(0.0)
    } else {
        parse_amount(s)
    }
}
