use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use chrono::{Duration, Local, NaiveDate};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::util::business_days;

/// One daily OHLCV price bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Bar {
    pub(crate) date: NaiveDate,
    pub(crate) open: f64,
    pub(crate) high: f64,
    pub(crate) low: f64,
    pub(crate) close: f64,
    pub(crate) volume: f64,
}

const REQUIRED_COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

/// Seed for the synthetic random walk, fixed so demo runs are repeatable.
const SYNTHETIC_SEED: u64 = 42;
const SYNTHETIC_FALLBACK_DAYS: usize = 100;

struct HeaderIndex {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

/// Load bars for [start, end]: an explicit CSV wins, then a best-effort
/// remote fetch, then a synthetic random walk.
pub(crate) fn load_bars(
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
    csv_path: Option<&Path>,
    quote_base_url: &str,
) -> anyhow::Result<Vec<Bar>> {
    if let Some(path) = csv_path {
        let mut bars = read_bars_csv(path)?;
        bars.retain(|bar| bar.date >= start && bar.date <= end);
        bars.sort_by_key(|bar| bar.date);
        return Ok(bars);
    }

    match fetch_bars(quote_base_url, ticker, start, end) {
        Ok(bars) if !bars.is_empty() => {
            info!("Fetched {} bars for {}", bars.len(), ticker);
            return Ok(bars);
        }
        Ok(_) => warn!("Quote endpoint returned no rows for {}", ticker),
        Err(e) => warn!("Quote download failed for {}: {}", ticker, e),
    }

    info!("Using synthetic data (no CSV given and download unavailable)");
    Ok(synthetic_bars(start, end))
}

/// Read bars from a CSV with Date,Open,High,Low,Close,Volume columns.
/// Column detection is case-insensitive; a missing column is a hard error.
pub(crate) fn read_bars_csv(path: &Path) -> anyhow::Result<Vec<Bar>> {
    if !path.exists() {
        bail!("File not found: {}", path.display());
    }
    let rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Unable to open {}", path.display()))?;
    parse_bars(rdr)
}

fn parse_bars<R: Read>(mut rdr: csv::Reader<R>) -> anyhow::Result<Vec<Bar>> {
    let headers = rdr.headers().context("Unable to read CSV header")?;
    let index = parse_header_index(headers)?;

    let mut bars = vec![];
    let mut record = StringRecord::new();
    while rdr.read_record(&mut record).context("Unable to read CSV record")? {
        let bar = parse_bar(&record, &index);
        match bar {
            Some(bar) => bars.push(bar),
            None => warn!("Skipping unparsable price row: {:?}", record),
        }
    }
    bars.sort_by_key(|bar| bar.date);
    Ok(bars)
}

fn parse_header_index(headers: &StringRecord) -> anyhow::Result<HeaderIndex> {
    let mut found = [None; 6];
    for (i, name) in headers.iter().enumerate() {
        let name = name.trim().to_lowercase();
        if let Some(pos) = REQUIRED_COLUMNS.iter().position(|c| *c == name) {
            found[pos] = Some(i);
        }
    }

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .zip(&found)
        .filter(|(_, idx)| idx.is_none())
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        bail!("CSV is missing required columns: {}", missing.join(", "));
    }

    Ok(HeaderIndex {
        date: found[0].unwrap(),
        open: found[1].unwrap(),
        high: found[2].unwrap(),
        low: found[3].unwrap(),
        close: found[4].unwrap(),
        volume: found[5].unwrap(),
    })
}

fn parse_bar(record: &StringRecord, index: &HeaderIndex) -> Option<Bar> {
    let field = |i: usize| record.get(i).map(str::trim);
    Some(Bar {
        date: crate::frame::parse_date(field(index.date)?)?,
        open: field(index.open)?.parse().ok()?,
        high: field(index.high)?.parse().ok()?,
        low: field(index.low)?.parse().ok()?,
        close: field(index.close)?.parse().ok()?,
        volume: field(index.volume)?.parse().ok()?,
    })
}

/// Best-effort download of daily history from the quotes endpoint, which
/// serves the same Date,Open,High,Low,Close,Volume CSV shape.
pub(crate) fn fetch_bars(
    base_url: &str,
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<Vec<Bar>> {
    let url = format!(
        "{}?s={}&d1={}&d2={}&i=d",
        base_url,
        ticker.to_lowercase(),
        start.format("%Y%m%d"),
        end.format("%Y%m%d")
    );
    info!("Downloading {}", url);
    let response = reqwest::blocking::get(&url)
        .context("Quote request failed")?
        .error_for_status()
        .context("Quote request was rejected")?;
    let body = response.text().context("Unable to read quote response")?;

    let rdr = ReaderBuilder::new().has_headers(true).from_reader(body.as_bytes());
    parse_bars(rdr)
}

/// Gaussian random walk over the business days of [start, end], or over
/// the last hundred business days when the range is empty. Seeded so the
/// fallback is deterministic.
pub(crate) fn synthetic_bars(start: NaiveDate, end: NaiveDate) -> Vec<Bar> {
    let mut days = business_days(start, end);
    if days.is_empty() {
        let today = Local::now().date_naive();
        days = business_days(today - Duration::days(200), today);
        let skip = days.len().saturating_sub(SYNTHETIC_FALLBACK_DAYS);
        days = days.split_off(skip);
    }

    let mut rng = StdRng::seed_from_u64(SYNTHETIC_SEED);
    let normal = Normal::new(0.0, 1.0).unwrap();

    let mut bars = Vec::with_capacity(days.len());
    let mut level = 100.0;
    let mut previous_close: Option<f64> = None;
    for date in days {
        level += normal.sample(&mut rng);
        let close = level;
        let open = previous_close.unwrap_or(close);
        let high = open.max(close) + rng.gen::<f64>() * 0.6;
        let low = open.min(close) - rng.gen::<f64>() * 0.6;
        let volume = rng.gen_range(100_000.0..500_000.0);

        bars.push(Bar { date, open, high, low, close, volume });
        previous_close = Some(close);
    }
    bars
}

/// Save a copy of the bars actually plotted, alongside the charts.
pub(crate) fn write_bars_csv(bars: &[Bar], path: &Path) -> anyhow::Result<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Unable to write {}", path.display()))?;
    writer.write_record(["Date", "Open", "High", "Low", "Close", "Volume"])?;
    for bar in bars {
        writer.write_record([
            bar.date.format("%Y-%m-%d").to_string(),
            format!("{}", bar.open),
            format!("{}", bar.high),
            format!("{}", bar.low),
            format!("{}", bar.close),
            format!("{}", bar.volume),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
