use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use log::info;

use crate::config::Config;
use crate::market::{self, Bar};

// Canvas geometry shared by every plot.
const WIDTH: i32 = 960;
const HEIGHT: i32 = 480;
const PADDING: f64 = 56.0;

const LINE_COLOR: &str = "#348dc1";
const UP_COLOR: &str = "#26a69a";
const DOWN_COLOR: &str = "#ef5350";
const VOLUME_COLOR: &str = "#b0bec5";
const HISTOGRAM_COLOR: &str = "#87ceeb";
const AXIS_COLOR: &str = "#8c8c8c";

// Endpoints of the Sharpe colour gradient in the scatter plot.
const GRADIENT_LOW: (u8, u8, u8) = (68, 1, 84);
const GRADIENT_HIGH: (u8, u8, u8) = (253, 231, 37);

const Y_TICKS: usize = 5;
const X_LABELS: usize = 6;

/// Chart subcommand: load bars, save the dataset copy and both charts.
pub(crate) fn run_chart(
    ticker: &str,
    start: &str,
    end: Option<&str>,
    csv_path: Option<&Path>,
    outdir: &Path,
    config: &Config,
) -> anyhow::Result<()> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .context("Start date must be formatted YYYY-MM-DD")?;
    let end = match end {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .context("End date must be formatted YYYY-MM-DD")?,
        None => Local::now().date_naive(),
    };

    let bars = market::load_bars(ticker, start, end, csv_path, &config.quote_base_url)?;
    if bars.is_empty() {
        bail!("No data to plot");
    }

    fs::create_dir_all(outdir)?;

    let prices_path = outdir.join(format!("{}_prices.csv", ticker));
    market::write_bars_csv(&bars, &prices_path)?;

    let line_path = outdir.join(format!("{}_line.svg", ticker));
    fs::write(&line_path, render_line(&bars, ticker))?;

    let candle_path = outdir.join(format!("{}_candlestick.svg", ticker));
    fs::write(&candle_path, render_candlestick(&bars, ticker))?;

    info!("Plotted {} bars for {}", bars.len(), ticker);
    println!("Saved data: {}", prices_path.display());
    println!("Saved line chart: {}", line_path.display());
    println!("Saved candlestick chart: {}", candle_path.display());
    Ok(())
}

/// Close-price line chart.
pub(crate) fn render_line(bars: &[Bar], ticker: &str) -> String {
    let closes: Vec<f64> = bars.iter().map(|bar| bar.close).collect();
    let (min_v, max_v) = value_extent(&closes);

    let mut svg = svg_header(WIDTH, HEIGHT);
    draw_title(&mut svg, &format!("{} - Close Price", ticker));
    draw_axes(&mut svg, PADDING, HEIGHT as f64 - PADDING);
    draw_y_ticks(&mut svg, min_v, max_v, PADDING, HEIGHT as f64 - PADDING);
    draw_date_labels(&mut svg, bars, HEIGHT as f64 - PADDING);
    draw_axis_labels(&mut svg, "Date", "Price");

    let mut points = String::new();
    for (i, close) in closes.iter().enumerate() {
        let x = x_position(i, bars.len());
        let y = y_position(*close, min_v, max_v, PADDING, HEIGHT as f64 - PADDING);
        points.push_str(&format!("{:.2},{:.2} ", x, y));
    }
    svg.push_str(&format!(
        r#"<polyline fill="none" stroke="{}" stroke-width="1.5" points="{}"/>"#,
        LINE_COLOR,
        points.trim_end()
    ));

    svg.push_str(svg_footer());
    svg
}

/// Candlestick chart with a volume panel underneath.
pub(crate) fn render_candlestick(bars: &[Bar], ticker: &str) -> String {
    let plot_bottom = HEIGHT as f64 - PADDING;
    let price_bottom = PADDING + (plot_bottom - PADDING) * 0.68;
    let volume_top = price_bottom + 12.0;

    let mut lows: Vec<f64> = bars.iter().map(|bar| bar.low).collect();
    let highs: Vec<f64> = bars.iter().map(|bar| bar.high).collect();
    lows.extend(highs);
    let (min_v, max_v) = value_extent(&lows);
    let volumes: Vec<f64> = bars.iter().map(|bar| bar.volume).collect();
    let max_volume = volumes.iter().cloned().fold(0.0, f64::max).max(1.0);

    let mut svg = svg_header(WIDTH, HEIGHT);
    draw_title(&mut svg, &format!("{} - Candlestick", ticker));
    draw_axes(&mut svg, PADDING, price_bottom);
    draw_y_ticks(&mut svg, min_v, max_v, PADDING, price_bottom);
    draw_date_labels(&mut svg, bars, plot_bottom);
    draw_axis_labels(&mut svg, "Date", "Price");

    let slot = (WIDTH as f64 - 2.0 * PADDING) / bars.len() as f64;
    let body_width = (slot * 0.7).max(1.0);

    for (i, bar) in bars.iter().enumerate() {
        let x = x_position(i, bars.len());
        let color = if bar.close >= bar.open { UP_COLOR } else { DOWN_COLOR };

        let y_high = y_position(bar.high, min_v, max_v, PADDING, price_bottom);
        let y_low = y_position(bar.low, min_v, max_v, PADDING, price_bottom);
        svg.push_str(&format!(
            r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="1"/>"#,
            x, y_high, x, y_low, color
        ));

        let y_open = y_position(bar.open, min_v, max_v, PADDING, price_bottom);
        let y_close = y_position(bar.close, min_v, max_v, PADDING, price_bottom);
        let body_top = y_open.min(y_close);
        let body_height = (y_open - y_close).abs().max(1.0);
        svg.push_str(&format!(
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"/>"#,
            x - body_width / 2.0,
            body_top,
            body_width,
            body_height,
            color
        ));

        let volume_height = (bar.volume / max_volume) * (plot_bottom - volume_top);
        svg.push_str(&format!(
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"/>"#,
            x - body_width / 2.0,
            plot_bottom - volume_height,
            body_width,
            volume_height,
            VOLUME_COLOR
        ));
    }

    svg.push_str(svg_footer());
    svg
}

/// Histogram with a fixed number of equal-width bins.
pub(crate) fn render_histogram(
    values: &[f64],
    bins: usize,
    title: &str,
    x_label: &str,
    y_label: &str,
) -> String {
    let (min_v, max_v) = value_extent(values);
    let span = (max_v - min_v).max(f64::EPSILON);

    let mut counts = vec![0usize; bins.max(1)];
    for value in values {
        let mut bin = (((value - min_v) / span) * counts.len() as f64) as usize;
        if bin >= counts.len() {
            bin = counts.len() - 1;
        }
        counts[bin] += 1;
    }
    let max_count = counts.iter().cloned().max().unwrap_or(1).max(1) as f64;

    let plot_bottom = HEIGHT as f64 - PADDING;
    let mut svg = svg_header(WIDTH, HEIGHT);
    draw_title(&mut svg, title);
    draw_axes(&mut svg, PADDING, plot_bottom);
    draw_y_ticks(&mut svg, 0.0, max_count, PADDING, plot_bottom);
    draw_value_labels(&mut svg, min_v, max_v, plot_bottom);
    draw_axis_labels(&mut svg, x_label, y_label);

    let bin_width = (WIDTH as f64 - 2.0 * PADDING) / counts.len() as f64;
    for (i, count) in counts.iter().enumerate() {
        if *count == 0 {
            continue;
        }
        let height = (*count as f64 / max_count) * (plot_bottom - PADDING);
        svg.push_str(&format!(
            r##"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" stroke="#000000" stroke-width="0.5"/>"##,
            PADDING + i as f64 * bin_width,
            plot_bottom - height,
            bin_width,
            height,
            HISTOGRAM_COLOR
        ));
    }

    svg.push_str(svg_footer());
    svg
}

/// Scatter plot of (x, y) points coloured along a gradient by the third
/// component.
pub(crate) fn render_scatter(
    points: &[(f64, f64, f64)],
    title: &str,
    x_label: &str,
    y_label: &str,
) -> String {
    let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
    let colors: Vec<f64> = points.iter().map(|p| p.2).collect();
    let (min_x, max_x) = value_extent(&xs);
    let (min_y, max_y) = value_extent(&ys);
    let (min_c, max_c) = value_extent(&colors);
    let color_span = (max_c - min_c).max(f64::EPSILON);

    let plot_bottom = HEIGHT as f64 - PADDING;
    let mut svg = svg_header(WIDTH, HEIGHT);
    draw_title(&mut svg, title);
    draw_axes(&mut svg, PADDING, plot_bottom);
    draw_y_ticks(&mut svg, min_y, max_y, PADDING, plot_bottom);
    draw_value_labels(&mut svg, min_x, max_x, plot_bottom);
    draw_axis_labels(&mut svg, x_label, y_label);

    let x_span = (max_x - min_x).max(f64::EPSILON);
    for (x, y, c) in points {
        let px = PADDING + ((x - min_x) / x_span) * (WIDTH as f64 - 2.0 * PADDING);
        let py = y_position(*y, min_y, max_y, PADDING, plot_bottom);
        let color = gradient_color((c - min_c) / color_span);
        svg.push_str(&format!(
            r#"<circle cx="{:.2}" cy="{:.2}" r="3" fill="{}" fill-opacity="0.8"/>"#,
            px, py, color
        ));
    }

    svg.push_str(&format!(
        r#"<text x="{:.0}" y="{:.0}" text-anchor="end">colour: Sharpe {} to {}</text>"#,
        WIDTH as f64 - PADDING,
        PADDING - 8.0,
        format_value(min_c),
        format_value(max_c)
    ));

    svg.push_str(svg_footer());
    svg
}

fn svg_header(width: i32, height: i32) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}"><style>text{{font-family:Arial,sans-serif;font-size:11px;fill:#666}}</style>"#,
        w = width,
        h = height
    )
}

fn svg_footer() -> &'static str {
    "</svg>"
}

fn draw_title(svg: &mut String, title: &str) {
    svg.push_str(&format!(
        r#"<text x="{:.0}" y="20" text-anchor="middle" font-size="14">{}</text>"#,
        WIDTH as f64 / 2.0,
        title
    ));
}

fn draw_axes(svg: &mut String, top: f64, bottom: f64) {
    let right = WIDTH as f64 - PADDING;
    svg.push_str(&format!(
        r#"<line x1="{p:.1}" y1="{t:.1}" x2="{p:.1}" y2="{b:.1}" stroke="{c}" stroke-width="1"/>"#,
        p = PADDING,
        t = top,
        b = bottom,
        c = AXIS_COLOR
    ));
    svg.push_str(&format!(
        r#"<line x1="{p:.1}" y1="{b:.1}" x2="{r:.1}" y2="{b:.1}" stroke="{c}" stroke-width="1"/>"#,
        p = PADDING,
        b = bottom,
        r = right,
        c = AXIS_COLOR
    ));
}

fn draw_y_ticks(svg: &mut String, min_v: f64, max_v: f64, top: f64, bottom: f64) {
    for i in 0..=Y_TICKS {
        let fraction = i as f64 / Y_TICKS as f64;
        let value = min_v + fraction * (max_v - min_v);
        let y = bottom - fraction * (bottom - top);
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end">{}</text>"#,
            PADDING - 6.0,
            y + 4.0,
            format_value(value)
        ));
    }
}

fn draw_date_labels(svg: &mut String, bars: &[Bar], bottom: f64) {
    let step = (bars.len() / X_LABELS).max(1);
    for (i, bar) in bars.iter().enumerate().step_by(step) {
        let x = x_position(i, bars.len());
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
            x,
            bottom + 16.0,
            bar.date.format("%Y-%m-%d")
        ));
    }
}

fn draw_value_labels(svg: &mut String, min_v: f64, max_v: f64, bottom: f64) {
    for i in 0..=X_LABELS {
        let fraction = i as f64 / X_LABELS as f64;
        let value = min_v + fraction * (max_v - min_v);
        let x = PADDING + fraction * (WIDTH as f64 - 2.0 * PADDING);
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
            x,
            bottom + 16.0,
            format_value(value)
        ));
    }
}

fn draw_axis_labels(svg: &mut String, x_label: &str, y_label: &str) {
    svg.push_str(&format!(
        r#"<text x="{:.0}" y="{:.0}" text-anchor="middle">{}</text>"#,
        WIDTH as f64 / 2.0,
        HEIGHT as f64 - 10.0,
        x_label
    ));
    svg.push_str(&format!(
        r#"<text x="14" y="{:.0}" text-anchor="middle" transform="rotate(-90 14 {:.0})">{}</text>"#,
        HEIGHT as f64 / 2.0,
        HEIGHT as f64 / 2.0,
        y_label
    ));
}

fn x_position(index: usize, count: usize) -> f64 {
    let plot_width = WIDTH as f64 - 2.0 * PADDING;
    if count <= 1 {
        return PADDING + plot_width / 2.0;
    }
    PADDING + (index as f64 / (count - 1) as f64) * plot_width
}

fn y_position(value: f64, min_v: f64, max_v: f64, top: f64, bottom: f64) -> f64 {
    let span = (max_v - min_v).max(f64::EPSILON);
    bottom - ((value - min_v) / span) * (bottom - top)
}

fn value_extent(values: &[f64]) -> (f64, f64) {
    let mut min_v = f64::INFINITY;
    let mut max_v = f64::NEG_INFINITY;
    for value in values {
        if value.is_finite() {
            min_v = min_v.min(*value);
            max_v = max_v.max(*value);
        }
    }
    if min_v > max_v {
        (0.0, 1.0)
    } else {
        (min_v, max_v)
    }
}

fn format_value(value: f64) -> String {
    if value.abs() >= 1000.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

/// Linear interpolation between the gradient endpoints, t in [0, 1].
fn gradient_color(t: f64) -> String {
    let t = t.clamp(0.0, 1.0);
    let channel = |low: u8, high: u8| -> u8 {
        (low as f64 + t * (high as f64 - low as f64)).round() as u8
    };
    format!(
        "#{:02x}{:02x}{:02x}",
        channel(GRADIENT_LOW.0, GRADIENT_HIGH.0),
        channel(GRADIENT_LOW.1, GRADIENT_HIGH.1),
        channel(GRADIENT_LOW.2, GRADIENT_HIGH.2)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::tests::fixture_filename;
    use crate::market::read_bars_csv;

    fn fixture_bars() -> Vec<Bar> {
        read_bars_csv(&fixture_filename("prices.csv")).unwrap()
    }

    #[test]
    fn test_render_line() {
        let svg = render_line(&fixture_bars(), "TEST");
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("<polyline"));
        assert!(svg.contains("TEST - Close Price"));
    }

    #[test]
    fn test_render_candlestick_draws_every_bar() {
        let bars = fixture_bars();
        let svg = render_candlestick(&bars, "TEST");
        // One body rect and one volume rect per bar.
        assert_eq!(svg.matches("<rect").count(), bars.len() * 2);
        assert_eq!(svg.matches("<line").count(), bars.len() + 2);
        assert!(svg.contains(UP_COLOR));
        assert!(svg.contains(DOWN_COLOR));
    }

    #[test]
    fn test_render_histogram_bin_assignment() {
        let values = vec![0.0, 0.1, 0.9, 1.0, 1.0];
        let svg = render_histogram(&values, 10, "t", "x", "y");
        // Bins: two values at the bottom, one in the middle, two clamped
        // into the last bin.
        assert_eq!(svg.matches(HISTOGRAM_COLOR).count(), 3);
    }

    #[test]
    fn test_render_scatter_draws_every_point() {
        let points = vec![(0.1, 0.12, 1.1), (0.15, 0.1, 0.7), (0.2, 0.14, 0.9)];
        let svg = render_scatter(&points, "t", "x", "y");
        assert_eq!(svg.matches("<circle").count(), points.len());
    }

    #[test]
    fn test_gradient_color_endpoints() {
        assert_eq!(gradient_color(0.0), "#440154");
        assert_eq!(gradient_color(1.0), "#fde725");
        // Out-of-range inputs clamp.
        assert_eq!(gradient_color(-1.0), "#440154");
        assert_eq!(gradient_color(2.0), "#fde725");
    }

    #[test]
    fn test_single_bar_does_not_divide_by_zero() {
        let bars = vec![fixture_bars()[0]];
        let svg = render_candlestick(&bars, "ONE");
        assert!(svg.contains("<rect"));
    }
}
