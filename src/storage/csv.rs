//! CSV ledger and export.
//!
//! One row per evaluated bet, columns in this order:
//! `Date, Matchup, Bet, Odds, Model Win%, EV%, Implied%, Result, Market`.
//! Percentages are stored as percentages (`60.0`), probabilities are
//! recovered on read by dividing by 100.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use super::LedgerStore;
use crate::strategy::valuation::{implied_probability, NEUTRAL_PROBABILITY};
use crate::types::{BetResult, EvaluatedBet, OddsboardError};

/// Default ledger file path.
pub const DEFAULT_LEDGER_FILE: &str = "daily_history.csv";

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Date,
    Matchup,
    Bet,
    Odds,
    ModelWin,
    Ev,
    Implied,
    Result,
    Market,
}

impl Column {
    const ALL: [Column; 9] = [
        Column::Date,
        Column::Matchup,
        Column::Bet,
        Column::Odds,
        Column::ModelWin,
        Column::Ev,
        Column::Implied,
        Column::Result,
        Column::Market,
    ];

    /// Columns a row cannot be reconstructed without.
    const REQUIRED: [Column; 4] = [Column::Date, Column::Matchup, Column::Bet, Column::Ev];

    fn name(self) -> &'static str {
        match self {
            Column::Date => "Date",
            Column::Matchup => "Matchup",
            Column::Bet => "Bet",
            Column::Odds => "Odds",
            Column::ModelWin => "Model Win%",
            Column::Ev => "EV%",
            Column::Implied => "Implied%",
            Column::Result => "Result",
            Column::Market => "Market",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Column::ALL.into_iter().find(|c| c.name().eq_ignore_ascii_case(name))
    }

    fn cell(self, bet: &EvaluatedBet) -> String {
        match self {
            Column::Date => bet.date.clone(),
            Column::Matchup => bet.matchup.clone(),
            Column::Bet => bet.selection.clone(),
            Column::Odds => bet.american_odds.to_string(),
            Column::ModelWin => format_number(bet.model_pct()),
            Column::Ev => format_number(bet.expected_value_pct),
            Column::Implied => format_number(bet.implied_pct()),
            Column::Result => bet.result.to_string(),
            Column::Market => bet.market.clone(),
        }
    }
}

/// Header row of the ledger and of CSV exports.
pub fn ledger_header() -> String {
    Column::ALL.iter().map(|c| c.name()).collect::<Vec<_>>().join(",")
}

/// Position of each known column within a file's header.
#[derive(Debug, Clone)]
struct ColumnLayout {
    /// `order[i]` is the column at position `i`, or `None` if unknown.
    order: Vec<Option<Column>>,
}

impl ColumnLayout {
    fn standard() -> Self {
        Self {
            order: Column::ALL.iter().copied().map(Some).collect(),
        }
    }

    fn from_header(header: &[String]) -> Result<Self> {
        let order: Vec<Option<Column>> = header.iter().map(|h| Column::from_name(h)).collect();
        for required in Column::REQUIRED {
            if !order.contains(&Some(required)) {
                return Err(OddsboardError::Ledger(format!(
                    "header is missing the '{}' column",
                    required.name()
                ))
                .into());
            }
        }
        Ok(Self { order })
    }

    fn is_standard(&self) -> bool {
        self.order.len() == Column::ALL.len()
            && self.order.iter().zip(Column::ALL).all(|(a, b)| *a == Some(b))
    }

    fn index_of(&self, column: Column) -> Option<usize> {
        self.order.iter().position(|c| *c == Some(column))
    }

    fn render(&self, bet: &EvaluatedBet) -> String {
        self.order
            .iter()
            .map(|c| c.map(|c| escape_field(&c.cell(bet))).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(",")
    }

    fn parse_row(&self, row: &[String]) -> Result<EvaluatedBet> {
        let get = |column: Column| -> Option<&str> {
            self.index_of(column)
                .and_then(|i| row.get(i))
                .map(|s| s.trim())
        };
        let required = |column: Column| -> Result<&str> {
            get(column)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| OddsboardError::Ledger(format!("empty '{}' cell", column.name())).into())
        };

        let odds = match get(Column::Odds) {
            Some(cell) => parse_odds(cell)?,
            None => 0,
        };
        let expected_value_pct = parse_number(required(Column::Ev)?, Column::Ev)?;
        let model_probability = match get(Column::ModelWin).filter(|s| !s.is_empty()) {
            Some(cell) => parse_number(cell, Column::ModelWin)? / 100.0,
            None => NEUTRAL_PROBABILITY,
        };
        let implied_probability = match get(Column::Implied).filter(|s| !s.is_empty()) {
            Some(cell) => parse_number(cell, Column::Implied)? / 100.0,
            None => implied_probability(odds).unwrap_or(NEUTRAL_PROBABILITY),
        };
        let result = match get(Column::Result) {
            Some(cell) => cell.parse::<BetResult>()?,
            None => BetResult::Pending,
        };

        Ok(EvaluatedBet {
            date: required(Column::Date)?.to_string(),
            matchup: required(Column::Matchup)?.to_string(),
            market: get(Column::Market).unwrap_or_default().to_string(),
            selection: required(Column::Bet)?.to_string(),
            american_odds: odds,
            model_probability,
            implied_probability,
            expected_value_pct,
            result,
        })
    }
}

// ---------------------------------------------------------------------------
// CSV ledger
// ---------------------------------------------------------------------------

/// Ledger stored as a CSV file.
pub struct CsvLedger {
    path: PathBuf,
    /// Serializes appends within this process.
    write_lock: Mutex<()>,
}

impl CsvLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Layout of the existing file, or `None` when it is absent or empty.
    fn existing_layout(&self) -> Result<Option<ColumnLayout>> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open ledger {}", self.path.display()))
            }
        };

        let mut first_line = String::new();
        BufReader::new(file)
            .read_line(&mut first_line)
            .with_context(|| format!("Failed to read ledger header from {}", self.path.display()))?;

        if first_line.trim().is_empty() {
            return Ok(None);
        }
        let header = parse_records(&first_line).into_iter().next().unwrap_or_default();
        ColumnLayout::from_header(&header).map(Some)
    }
}

impl LedgerStore for CsvLedger {
    fn append(&self, records: &[EvaluatedBet]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| OddsboardError::Ledger("ledger write lock poisoned".into()))?;

        let existing = self.existing_layout()?;
        let write_header = existing.is_none();
        let layout = existing.unwrap_or_else(ColumnLayout::standard);
        if !layout.is_standard() {
            warn!(path = %self.path.display(), "Ledger has a non-standard column order, appending in file order");
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create ledger directory {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open ledger {} for append", self.path.display()))?;
        let mut writer = BufWriter::new(file);

        if write_header {
            writeln!(writer, "{}", ledger_header())?;
        }
        for bet in records {
            writeln!(writer, "{}", layout.render(bet))?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to flush ledger {}", self.path.display()))?;

        debug!(path = %self.path.display(), rows = records.len(), "Ledger appended");
        Ok(records.len())
    }

    fn read_all(&self) -> Result<Vec<EvaluatedBet>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No ledger found, starting with empty history");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read ledger {}", self.path.display()))
            }
        };

        let mut rows = parse_records(&text).into_iter();
        let layout = match rows.next() {
            Some(header) if header.iter().any(|h| !h.trim().is_empty()) => ColumnLayout::from_header(&header)
                .with_context(|| format!("Ledger {} is corrupt", self.path.display()))?,
            _ => return Ok(Vec::new()),
        };

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for (idx, row) in rows.enumerate() {
            if row.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            match layout.parse_row(&row) {
                Ok(bet) => records.push(bet),
                Err(e) => {
                    skipped += 1;
                    // +2: 1-based and the header line
                    warn!(path = %self.path.display(), row = idx + 2, error = %e, "Skipping malformed ledger row");
                }
            }
        }

        debug!(path = %self.path.display(), rows = records.len(), skipped, "Ledger loaded");
        Ok(records)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Render bets as CSV with the ledger header, for download.
pub fn to_csv(bets: &[EvaluatedBet]) -> String {
    let layout = ColumnLayout::standard();
    let mut out = ledger_header();
    out.push('\n');
    for bet in bets {
        out.push_str(&layout.render(bet));
        out.push('\n');
    }
    out
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Always show at least one decimal so `60` is written as `60.0`.
fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn parse_number(cell: &str, column: Column) -> Result<f64> {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            OddsboardError::Ledger(format!("'{}' is not a number in '{}'", cell, column.name())).into()
        })
}

/// Odds cells may be integers or pandas-style floats (`-150.0`); blank
/// and `nan` mean unpriced.
fn parse_odds(cell: &str) -> Result<i32> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(0);
    }
    let value = parse_number(cell.strip_prefix('+').unwrap_or(cell), Column::Odds)?;
    if value.fract() != 0.0 || value.abs() > i32::MAX as f64 {
        return Err(OddsboardError::Ledger(format!("'{cell}' is not valid American odds")).into());
    }
    Ok(value as i32)
}

/// Split CSV text into records, honouring double-quoted fields (which may
/// contain commas, escaped quotes and line breaks).
fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
