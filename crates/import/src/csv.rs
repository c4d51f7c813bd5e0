use thiserror::Error;

use ebbflow_core::record::RawRecord;

use crate::util::parse_amount;

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("no rows in CSV input")]
    Empty,
    #[error("line {line}: missing column {column}")]
    MissingColumn { line: usize, column: usize },
    #[error("line {line}: invalid amount '{value}'")]
    InvalidAmount { line: usize, value: String },
}

/// Parses CSV statement text into raw records.
///
/// Column layout is fixed: date in column 0, payee in column 1. The amount
/// column is located by a case-insensitive `amount` header; with no header
/// row, data starts at row 0 and the amount is column 2. Dates are kept as
/// raw text for the upload's [`DateFormat`](ebbflow_core::DateFormat) to
/// interpret.
pub fn parse(text: &str) -> Result<Vec<RawRecord>, CsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let rows = reader
        .records()
        .collect::<Result<Vec<_>, _>>()?;
    if rows.is_empty() {
        return Err(CsvError::Empty);
    }

    let header_amount = rows[0]
        .iter()
        .position(|field| field.eq_ignore_ascii_case("amount"));
    let (first_data_row, amount_column) = match header_amount {
        Some(column) => (1, column),
        None => (0, 2),
    };

    let mut records = Vec::new();
    for (index, row) in rows.iter().enumerate().skip(first_data_row) {
        let line = index + 1;
        let field = |column: usize| {
            row.get(column)
                .ok_or(CsvError::MissingColumn { line, column })
        };

        let date = field(0)?.to_string();
        let payee = field(1)?.to_string();
        let amount_field = field(amount_column)?;
        let amount = parse_amount(amount_field).ok_or_else(|| CsvError::InvalidAmount {
            line,
            value: amount_field.to_string(),
        })?;

        records.push(RawRecord {
            date,
            amount,
            payee,
            address: Vec::new(),
            reference: None,
        });
    }

    Ok(records)
}
