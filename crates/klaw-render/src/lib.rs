//! Presentation of reconciliation reports, track outcomes and settings as
//! terminal tables, JSON or CSV.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

mod report;
mod table;

pub use report::{
    issue_cell, render_note, render_report, render_settings, render_track, render_warnings,
    summary_line,
};
pub use table::{Cell, Table, Tone};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to encode json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to encode csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv output is not valid utf-8")]
    CsvEncoding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Table,
    Json,
    Csv,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "table" | "text" => Ok(Format::Table),
            "json" => Ok(Format::Json),
            "csv" => Ok(Format::Csv),
            other => Err(format!("unknown format '{}' (expected table, json or csv)", other)),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Table => "table",
            Format::Json => "json",
            Format::Csv => "csv",
        })
    }
}

pub(crate) fn write_csv<I, T>(records: I) -> Result<String, RenderError>
where
    I: IntoIterator<Item = T>,
    T: Serialize,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| RenderError::Csv(err.into_error().into()))?;
    String::from_utf8(bytes).map_err(|_| RenderError::CsvEncoding)
}
