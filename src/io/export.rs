//! Write calendar-dated sample series to CSV.
//!
//! Layout: header `Date,<ticker...>`, then one row per sample with the date as
//! `YYYY-MM-DD`. An existing file is replaced wholesale; a missing file is
//! created. Rows go to a temporary file next to the target which is renamed
//! into place only after a successful flush, so a failure never leaves a
//! half-written table behind.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::info;

use crate::domain::CalendarSeries;
use crate::error::PrepError;

pub fn write_calendar_series(path: &Path, series: &CalendarSeries) -> Result<(), PrepError> {
    let path_id = path.display().to_string();
    if series.tickers.len() != series.values.ncols() {
        return Err(PrepError::dimension("calendar series tickers", series.values.ncols(), series.tickers.len()));
    }
    if series.dates.len() != series.values.nrows() {
        return Err(PrepError::dimension("calendar series dates", series.values.nrows(), series.dates.len()));
    }

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir).map_err(|e| PrepError::io(&path_id, e))?;

    {
        let mut writer = csv::Writer::from_writer(tmp.as_file());

        let mut header = Vec::with_capacity(series.tickers.len() + 1);
        header.push("Date".to_string());
        header.extend(series.tickers.iter().cloned());
        writer.write_record(&header).map_err(|e| PrepError::io(&path_id, e))?;

        for (r, date) in series.dates.iter().enumerate() {
            let mut record = Vec::with_capacity(series.values.ncols() + 1);
            record.push(date.format("%Y-%m-%d").to_string());
            record.extend(series.values.row(r).iter().map(|v| v.to_string()));
            writer.write_record(&record).map_err(|e| PrepError::io(&path_id, e))?;
        }

        writer.flush().map_err(|e| PrepError::io(&path_id, e))?;
    }
    tmp.as_file().flush().map_err(|e| PrepError::io(&path_id, e))?;
    tmp.as_file().sync_all().map_err(|e| PrepError::io(&path_id, e))?;

    // On error the temp file is dropped (and removed) without touching `path`.
    tmp.persist(path).map_err(|e| PrepError::io(&path_id, e.error))?;

    info!(path = %path_id, rows = series.dates.len(), "wrote calendar series");
    Ok(())
}
