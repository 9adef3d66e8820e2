use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use clap::Parser;
use crossbeam_channel::bounded;
use firetrend::{
    read_csv_file, AnalysisOptions, Detection, DetectionSelection, EventReport, FireEventError,
    FireEventResult, TimeRange, TimeWindow, Trend,
};
use log::{info, warn, LevelFilter};
use simple_logger::SimpleLogger;
use std::{
    fmt::{self, Display},
    path::PathBuf,
    sync::Arc,
    thread::{self, JoinHandle},
};
use strum::IntoEnumIterator;

/*-------------------------------------------------------------------------------------------------
 *                                     Command Line Options
 *-----------------------------------------------------------------------------------------------*/

///
/// Find fire events in satellite hotspot detections.
///
/// This program reads FIRMS style CSV files, groups nearby detections into fire events, and
/// classifies whether each event is growing, shrinking, stable, or extinguished.
///
#[derive(Debug, Parser)]
#[clap(bin_name = "fireevents")]
#[clap(author, version, about)]
struct FireEventsOptionsInit {
    /// A CSV file or a directory to search for CSV files.
    ///
    /// If this is not specified, then the program will check for it in the "FIRE_DETECTIONS"
    /// environment variable.
    #[clap(env = "FIRE_DETECTIONS")]
    input: PathBuf,

    /// The time range to analyze, one of 6h, 12h, 24h, 48h, or 7d.
    #[clap(short, long)]
    #[clap(parse(try_from_str=TimeRange::parse))]
    #[clap(default_value_t=TimeRange::Hours24)]
    range: TimeRange,

    /// The reference time (UTC) in the format YYYY-MM-DD-HH, defaults to the current time.
    #[clap(short, long)]
    #[clap(parse(try_from_str=parse_datetime))]
    now: Option<DateTime<Utc>>,

    /// Only cluster detections whose coverage reaches a window ending at this time (UTC) in the
    /// format YYYY-MM-DD-HH.
    #[clap(long)]
    #[clap(parse(try_from_str=parse_datetime))]
    window_end: Option<DateTime<Utc>>,

    /// The length of the window ending at window-end, in hours.
    #[clap(long, default_value_t = 3)]
    window_hours: i64,

    /// The hours before and after a detection it is considered representative of.
    #[clap(long, default_value_t = firetrend::DEFAULT_COVERAGE_EXTENSION_HOURS)]
    extension_hours: i64,

    /// Clustering distance in meters.
    #[clap(long, default_value_t = firetrend::DEFAULT_EPS_METERS)]
    eps: f64,

    /// Minimum number of neighbors to start a cluster.
    #[clap(long, default_value_t = firetrend::DEFAULT_MIN_POINTS)]
    min_points: usize,

    /// Analyze every time range at once, in parallel.
    #[clap(short, long)]
    all_ranges: bool,

    /// Print the reports as JSON instead of text.
    #[clap(short, long)]
    json: bool,

    /// Verbose output
    #[clap(short, long)]
    verbose: bool,
}

/// Parse a command line datetime
fn parse_datetime(dt_str: &str) -> Result<DateTime<Utc>, String> {
    const TIME_FORMAT: &str = "%Y-%m-%d-%H:%M:%S";
    let t_str = format!("{}:00:00", dt_str);

    let naive = NaiveDateTime::parse_from_str(&t_str, TIME_FORMAT)
        .map_err(|err| format!("invalid time '{}', expected YYYY-MM-DD-HH: {}", dt_str, err))?;
    Ok(Utc.from_utc_datetime(&naive))
}

#[derive(Debug)]
struct FireEventsOptionsChecked {
    /// The CSV file or directory.
    input: PathBuf,

    /// The time ranges to analyze.
    ranges: Vec<TimeRange>,

    /// The reference time.
    now: DateTime<Utc>,

    /// The coverage window, if any.
    window: Option<TimeWindow>,

    /// Clustering parameters.
    options: AnalysisOptions,

    /// Output JSON.
    json: bool,

    /// Verbose output
    verbose: bool,
}

impl Display for FireEventsOptionsChecked {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        let ranges: Vec<&'static str> = self.ranges.iter().map(|r| (*r).into()).collect();

        writeln!(f, "\n")?; // yes, two blank lines.
        writeln!(f, "           Input: {}", self.input.display())?;
        writeln!(f, "     Time Ranges: {}", ranges.join(", "))?;
        writeln!(f, "  Reference Time: {}", self.now)?;
        match self.window {
            Some(window) => {
                writeln!(f, " Coverage Window: {} to {}", window.start(), window.end())?
            }
            None => writeln!(f, " Coverage Window: none")?,
        }
        writeln!(f, "         Eps (m): {:.0}", self.options.eps_meters)?;
        writeln!(f, "      Min Points: {}", self.options.min_points)?;
        writeln!(f, " Extension (hrs): {}", self.options.coverage_extension_hours)?;
        writeln!(f, "\n")?; // yes, two blank lines.

        Ok(())
    }
}

/// Get the command line arguments and check them.
fn parse_args() -> FireEventResult<FireEventsOptionsChecked> {
    let FireEventsOptionsInit {
        input,
        range,
        now,
        window_end,
        window_hours,
        extension_hours,
        eps,
        min_points,
        all_ranges,
        json,
        verbose,
    } = FireEventsOptionsInit::parse();

    let now = now.unwrap_or_else(Utc::now);

    let window = match window_end {
        Some(end) => Some(TimeWindow::ending_at(end, window_hours)?),
        None => None,
    };

    let ranges = if all_ranges {
        TimeRange::iter().collect()
    } else {
        vec![range]
    };

    let options = AnalysisOptions {
        eps_meters: eps,
        min_points,
        coverage_extension_hours: extension_hours,
    };

    Ok(FireEventsOptionsChecked {
        input,
        ranges,
        now,
        window,
        options,
        json,
        verbose,
    })
}

/*-------------------------------------------------------------------------------------------------
 *                                             MAIN
 *-----------------------------------------------------------------------------------------------*/
fn main() -> FireEventResult<()> {
    let opts = parse_args()?;

    let level = if opts.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new().with_level(level).init()?;

    if opts.verbose {
        info!("{}", opts);
    }

    let detections = load_detections(&opts)?;

    let reports = if opts.ranges.len() == 1 {
        vec![EventReport::analyze(
            &detections,
            opts.now,
            selection(&opts, opts.ranges[0]),
            &opts.options,
        )?]
    } else {
        analyze_in_parallel(&opts, detections)?
    };

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for report in &reports {
        println!("{}", report);

        if opts.verbose {
            let range: &'static str = report.range.into();
            for trend in Trend::iter() {
                let label: &'static str = trend.into();
                info!("{:>4} {:>11}: {}", range, label, report.count_trend(trend));
            }
        }
    }

    Ok(())
}

fn selection(opts: &FireEventsOptionsChecked, range: TimeRange) -> DetectionSelection {
    match opts.window {
        Some(window) => DetectionSelection::Coverage { window, range },
        None => DetectionSelection::Range(range),
    }
}

/// Read every CSV file under the input path.
fn load_detections(opts: &FireEventsOptionsChecked) -> FireEventResult<Vec<Detection>> {
    let mut detections = vec![];

    for entry in walkdir::WalkDir::new(&opts.input)
        .into_iter()
        .filter_map(|res| res.ok())
        // Ignore directories, WalkDir will take care of recursing into them.
        .filter(|entry| entry.path().is_file())
        // Only consider CSV files.
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        })
    {
        match read_csv_file(entry.path()) {
            Ok(mut file_detections) => {
                // Files are named after the feed they were downloaded from.
                if let Some(source) = entry.path().file_stem().and_then(|s| s.to_str()) {
                    for detection in file_detections.iter_mut() {
                        detection.set_source(source);
                    }
                }

                if opts.verbose {
                    info!(
                        "Read {} detections from {}",
                        file_detections.len(),
                        entry.path().display()
                    );
                }
                detections.append(&mut file_detections);
            }
            Err(err) => warn!("Skipping {}: {}", entry.path().display(), err),
        }
    }

    if opts.verbose {
        let longest = opts.ranges.iter().map(|r| r.days_for_upstream()).max();
        info!(
            "Loaded {} detections, the selected ranges need {} days of data.",
            detections.len(),
            longest.unwrap_or(0)
        );
    }

    Ok(detections)
}

/// Analyze each range on its own thread.
fn analyze_in_parallel(
    opts: &FireEventsOptionsChecked,
    detections: Vec<Detection>,
) -> FireEventResult<Vec<EventReport>> {
    let detections = Arc::new(detections);
    let (to_main, from_workers) = bounded(opts.ranges.len());

    let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(opts.ranges.len());
    for (position, range) in opts.ranges.iter().copied().enumerate() {
        let detections = Arc::clone(&detections);
        let to_main = to_main.clone();
        let select = selection(opts, range);
        let now = opts.now;
        let options = opts.options;

        let jh = thread::Builder::new()
            .name(format!("fireevents-{}", range))
            .spawn(move || {
                let result = EventReport::analyze(&detections, now, select, &options);
                // The receiver only goes away if main already failed.
                let _ = to_main.send((position, result));
            })?;
        handles.push(jh);
    }
    drop(to_main);

    let mut results: Vec<(usize, Result<EventReport, FireEventError>)> =
        from_workers.iter().collect();

    for jh in handles {
        jh.join().map_err(|_| "analysis thread panicked")?;
    }

    results.sort_unstable_by_key(|(position, _)| *position);

    let mut reports = Vec::with_capacity(results.len());
    for (_, result) in results {
        reports.push(result?);
    }

    Ok(reports)
}
