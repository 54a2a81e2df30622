use anyhow::bail;

use crate::prompt::Prompt;
use crate::util::plain_table;

/// Per-stock reductions over a daily return series.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StockStats {
    pub(crate) mean: f64,
    pub(crate) variance: f64,
    pub(crate) std_dev: f64,
    pub(crate) sharpe: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct Report {
    pub(crate) stocks: Vec<StockStats>,
    pub(crate) covariance: Vec<Vec<f64>>,
    pub(crate) portfolio_return: f64,
    pub(crate) portfolio_risk: f64,
    pub(crate) portfolio_sharpe: f64,
}

/// Analyse one return series per stock, all of equal length. Variance and
/// standard deviation are population statistics; the covariance matrix uses
/// the sample normalisation. The equal-weighted portfolio Sharpe degrades
/// to +inf when the computed risk is exactly zero.
pub(crate) fn analyse(returns: &[Vec<f64>], risk_free: f64) -> anyhow::Result<Report> {
    if returns.is_empty() {
        bail!("At least one return series is required");
    }
    let days = returns[0].len();
    if days == 0 {
        bail!("Return series must not be empty");
    }
    if returns.iter().any(|series| series.len() != days) {
        bail!("All return series must have the same length");
    }

    let n = returns.len();
    let means: Vec<f64> = returns.iter().map(|series| mean(series)).collect();

    let stocks: Vec<StockStats> = returns
        .iter()
        .zip(&means)
        .map(|(series, &mean)| {
            let variance = series.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / days as f64;
            let std_dev = variance.sqrt();
            StockStats {
                mean,
                variance,
                std_dev,
                sharpe: (mean - risk_free) / std_dev,
            }
        })
        .collect();

    let denominator = (days - 1).max(1) as f64;
    let mut covariance = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..n {
            let mut sum = 0.0;
            for day in 0..days {
                sum += (returns[i][day] - means[i]) * (returns[j][day] - means[j]);
            }
            covariance[i][j] = sum / denominator;
        }
    }

    let weight = 1.0 / n as f64;
    let portfolio_return = means.iter().sum::<f64>() * weight;
    let mut quadratic = 0.0;
    for row in &covariance {
        for cell in row {
            quadratic += weight * weight * cell;
        }
    }
    let portfolio_risk = quadratic.sqrt();
    let portfolio_sharpe = if portfolio_risk == 0.0 {
        f64::INFINITY
    } else {
        (portfolio_return - risk_free) / portfolio_risk
    };

    Ok(Report {
        stocks,
        covariance,
        portfolio_return,
        portfolio_risk,
        portfolio_sharpe,
    })
}

fn mean(series: &[f64]) -> f64 {
    series.iter().sum::<f64>() / series.len() as f64
}

/// Interactive entry point: prompt for the return series, then print the
/// per-stock table, the equal-weighted portfolio summary and the covariance
/// matrix.
pub(crate) fn run_portfolio(risk_free: f64) -> anyhow::Result<()> {
    let mut prompt = Prompt::new()?;

    let stocks = loop {
        let count = prompt.read_usize("How many stocks? ")?;
        if count > 0 {
            break count;
        }
        println!("At least one stock is required.");
    };
    let days = loop {
        let count = prompt.read_usize("How many daily returns per stock? ")?;
        if count > 0 {
            break count;
        }
        println!("At least one return is required.");
    };

    let mut returns = Vec::with_capacity(stocks);
    for i in 0..stocks {
        let series = prompt.read_series(
            &format!("Returns for stock {} ({} values separated by spaces): ", i + 1, days),
            days,
        )?;
        returns.push(series);
    }

    let report = analyse(&returns, risk_free)?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &Report) {
    println!("\n--- Per-stock analysis ---");
    let mut table = plain_table();
    table.set_header(vec!["Stock", "Mean", "Variance", "Std Dev (Risk)", "Sharpe"]);
    for (i, stats) in report.stocks.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            format!("{:.4}", stats.mean),
            format!("{:.4}", stats.variance),
            format!("{:.4}", stats.std_dev),
            format!("{:.4}", stats.sharpe),
        ]);
    }
    println!("{table}");

    println!("\n--- Portfolio analysis (equal weights) ---");
    println!("Portfolio mean return: {:.4}", report.portfolio_return);
    println!("Portfolio risk (std dev): {:.4}", report.portfolio_risk);
    println!("Portfolio Sharpe ratio: {:.4}", report.portfolio_sharpe);

    println!("\nCovariance matrix:");
    let mut table = plain_table();
    for row in &report.covariance {
        table.add_row(row.iter().map(|cell| format!("{:.4}", cell)));
    }
    println!("{table}");
}
