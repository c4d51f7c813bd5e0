use thiserror::Error;

use ebbflow_core::money::Money;
use ebbflow_core::record::RawRecord;

use crate::util::parse_amount;

#[derive(Debug, Error)]
pub enum QifError {
    #[error("not a QIF file: missing '!' type header")]
    MissingHeader,
    #[error("line {line}: unrecognised field code '{code}'")]
    UnrecognisedField { line: usize, code: char },
    #[error("line {line}: invalid amount '{value}'")]
    InvalidAmount { line: usize, value: String },
    #[error("line {line}: record {index} is missing required fields")]
    IncompleteRecord { line: usize, index: usize },
    #[error("partial information for record {index}; check the file is complete")]
    TrailingRecord { index: usize },
}

#[derive(Default)]
struct BuildingRecord {
    date: Option<String>,
    amount: Option<Money>,
    payee: Option<String>,
    address: Vec<String>,
    reference: Option<String>,
}

impl BuildingRecord {
    fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.amount.is_none()
            && self.payee.is_none()
            && self.address.is_empty()
            && self.reference.is_none()
    }

    fn finish(self) -> Option<RawRecord> {
        Some(RawRecord {
            date: self.date?,
            amount: self.amount?,
            payee: self.payee?,
            address: self.address,
            reference: self.reference,
        })
    }
}

/// Parses QIF statement text into raw records.
///
/// Line-oriented: a `!Type` header, then `D` (date, kept as raw text; the
/// format choice belongs to the upload, not the parser), `T` amount, `P`
/// payee, `A` address lines, `N` reference, and `^` closing each record.
/// Dangling field lines after the last `^` are an error so a truncated file
/// cannot silently lose its tail.
pub fn parse(text: &str) -> Result<Vec<RawRecord>, QifError> {
    let mut lines = text.lines().enumerate();

    let header = lines.next().map(|(_, l)| l.trim_end_matches('\r'));
    if !header.is_some_and(|l| l.starts_with('!')) {
        return Err(QifError::MissingHeader);
    }

    let mut records = Vec::new();
    let mut current = BuildingRecord::default();

    for (idx, raw_line) in lines {
        let line = raw_line.trim_end_matches('\r');
        let Some(code) = line.chars().next() else {
            continue;
        };
        let number = idx + 1;
        let rest = &line[code.len_utf8()..];

        match code {
            'D' => current.date = Some(rest.to_string()),
            'T' => {
                current.amount = Some(parse_amount(rest).ok_or_else(|| {
                    QifError::InvalidAmount {
                        line: number,
                        value: rest.to_string(),
                    }
                })?)
            }
            'P' => current.payee = Some(rest.to_string()),
            'A' => current.address.push(rest.to_string()),
            'N' => current.reference = Some(rest.to_string()),
            '^' => {
                let finished = std::mem::take(&mut current);
                match finished.finish() {
                    Some(record) => records.push(record),
                    None => {
                        return Err(QifError::IncompleteRecord {
                            line: number,
                            index: records.len() + 1,
                        })
                    }
                }
            }
            other => {
                return Err(QifError::UnrecognisedField {
                    line: number,
                    code: other,
                })
            }
        }
    }

    if !current.is_empty() {
        return Err(QifError::TrailingRecord {
            index: records.len() + 1,
        });
    }

    Ok(records)
}
