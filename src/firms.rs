/*!
 * Read detections from FIRMS style CSV text.
 *
 * The active fire CSV files have a header row naming the columns. Only `latitude` and
 * `longitude` are required. `frp`, `confidence`, `acq_date` (YYYY-MM-DD) and `acq_time` (HHMM in
 * UTC, leading zeros are often dropped) are used when present, and every other column is kept as
 * metadata on the detection.
 */
use crate::{
    detection::Detection,
    error::{FireEventError, FireEventResult},
};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use csv::{ReaderBuilder, Trim};
use log::warn;
use rustc_hash::FxHashMap as HashMap;
use std::{collections::BTreeMap, path::Path};

const LATITUDE: &str = "latitude";
const LONGITUDE: &str = "longitude";
const FRP: &str = "frp";
const CONFIDENCE: &str = "confidence";
const ACQ_DATE: &str = "acq_date";
const ACQ_TIME: &str = "acq_time";

/**
 * Combine the acquisition date and time columns into a UTC time.
 *
 * #Arguments
 * acq_date - a date like "2024-01-31".
 * acq_time - hours and minutes like "0342", "342" or "42".
 *
 * #Returns
 * `None` if either can't be parsed.
 */
pub fn parse_acquisition_time(acq_date: &str, acq_time: &str) -> Option<DateTime<Utc>> {
    let acq_time = acq_time.trim();
    if acq_time.is_empty() || acq_time.len() > 4 || !acq_time.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let date = NaiveDate::parse_from_str(acq_date.trim(), "%Y-%m-%d").ok()?;

    let padded = format!("{:0>4}", acq_time);
    let hour: u32 = padded[0..2].parse().ok()?;
    let minute: u32 = padded[2..4].parse().ok()?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;

    Some(Utc.from_utc_datetime(&date.and_time(time)))
}

/**
 * Parse CSV text into detections.
 *
 * Rows with coordinates that can't be parsed are skipped with a warning. A missing or invalid
 * `frp` is 0.0, an empty `confidence` is no confidence, and a missing or invalid date or time
 * leaves the detection without an acquisition time.
 *
 * #Errors
 * If the header row does not have `latitude` and `longitude` columns.
 */
pub fn parse_csv(text: &str) -> Result<Vec<Detection>, FireEventError> {
    // Files saved by spreadsheet programs often start with a byte order mark.
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|err| FireEventError::MalformedCsv(err.to_string()))?
        .clone();
    if headers.is_empty() {
        return Ok(vec![]);
    }

    let columns: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h, i))
        .collect();

    let idx_lat = *columns
        .get(LATITUDE)
        .ok_or(FireEventError::MissingColumn(LATITUDE))?;
    let idx_lon = *columns
        .get(LONGITUDE)
        .ok_or(FireEventError::MissingColumn(LONGITUDE))?;
    let idx_frp = columns.get(FRP).copied();
    let idx_confidence = columns.get(CONFIDENCE).copied();
    let idx_date = columns.get(ACQ_DATE).copied();
    let idx_time = columns.get(ACQ_TIME).copied();

    let mut detections = vec![];
    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                warn!("skipping unreadable row: {}", err);
                continue;
            }
        };
        let field = |idx: Option<usize>| idx.and_then(|i| record.get(i));

        let lat = field(Some(idx_lat)).and_then(|v| v.parse::<f64>().ok());
        let lon = field(Some(idx_lon)).and_then(|v| v.parse::<f64>().ok());
        let (lat, lon) = match (lat, lon) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => (lat, lon),
            _ => {
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                warn!("skipping row on line {} with invalid coordinates: {:?}", line, record);
                continue;
            }
        };

        let radiative_power = field(idx_frp)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0)
            .unwrap_or(0.0);

        let confidence = field(idx_confidence)
            .filter(|v| !v.is_empty())
            .map(str::to_owned);

        let acquired_at = match (field(idx_date), field(idx_time)) {
            (Some(date), Some(time)) => parse_acquisition_time(date, time),
            _ => None,
        };

        let metadata: BTreeMap<String, String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                *i != idx_lat
                    && *i != idx_lon
                    && Some(*i) != idx_frp
                    && Some(*i) != idx_confidence
            })
            .filter_map(|(i, h)| record.get(i).map(|v| (h.to_owned(), v.to_owned())))
            .collect();

        detections.push(Detection {
            lat,
            lon,
            radiative_power,
            confidence,
            acquired_at,
            metadata,
        });
    }

    Ok(detections)
}

/// Read and parse a CSV file.
pub fn read_csv_file<P: AsRef<Path>>(path: P) -> FireEventResult<Vec<Detection>> {
    let text = std::fs::read_to_string(path.as_ref())?;
    Ok(parse_csv(&text)?)
}
