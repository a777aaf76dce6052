use std::path::{Path, PathBuf};

use chrono::TimeZone;

use crate::dates::DateRange;

const FILE_DATE_FORMAT: &str = "%Y_%m_%d";

/// `{dir}/{CURRENCY}-{start}-{end}.csv` with dates as `YYYY_MM_DD`.
pub fn default_output_path<Tz: TimeZone>(dir: &Path, currency: &str, range: &DateRange<Tz>) -> PathBuf
where
    Tz::Offset: std::fmt::Display,
{
    dir.join(format!(
        "{}-{}-{}.csv",
        currency.to_uppercase(),
        range.start.format(FILE_DATE_FORMAT),
        range.end.format(FILE_DATE_FORMAT),
    ))
}
