use std::fs;
use std::path::Path;

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::chart;

/// Fixed three-asset universe for the risk simulation.
const MEAN_RETURNS: [f64; 3] = [0.12, 0.08, 0.15];
const STD_DEVS: [f64; 3] = [0.2, 0.1, 0.25];
const CORRELATION: [[f64; 3]; 3] = [
    [1.0, 0.2, 0.4],
    [0.2, 1.0, 0.1],
    [0.4, 0.1, 1.0],
];

const HISTOGRAM_BINS: usize = 50;

#[derive(Debug, Clone, Copy)]
pub(crate) struct SimulatedPortfolio {
    pub(crate) expected_return: f64,
    pub(crate) risk: f64,
    pub(crate) sharpe: f64,
}

fn covariance_matrix() -> [[f64; 3]; 3] {
    let mut cov = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            cov[i][j] = STD_DEVS[i] * STD_DEVS[j] * CORRELATION[i][j];
        }
    }
    cov
}

/// Sample `portfolios` random weight vectors and compute the return, risk
/// and Sharpe ratio of each. Seeded for reproducible runs.
pub(crate) fn simulate(portfolios: usize, seed: u64) -> Vec<SimulatedPortfolio> {
    let mut rng = StdRng::seed_from_u64(seed);
    let cov = covariance_matrix();

    (0..portfolios)
        .map(|_| {
            let mut weights = [rng.gen::<f64>(), rng.gen::<f64>(), rng.gen::<f64>()];
            let total: f64 = weights.iter().sum();
            for w in weights.iter_mut() {
                *w /= total;
            }

            let expected_return: f64 =
                weights.iter().zip(MEAN_RETURNS.iter()).map(|(w, m)| w * m).sum();
            let mut quadratic = 0.0;
            for i in 0..3 {
                for j in 0..3 {
                    quadratic += weights[i] * cov[i][j] * weights[j];
                }
            }
            let risk = quadratic.sqrt();

            SimulatedPortfolio {
                expected_return,
                risk,
                sharpe: expected_return / risk,
            }
        })
        .collect()
}

/// Run the simulation and write the risk histogram and the risk/return
/// scatter into the output directory.
pub(crate) fn run_simulate(portfolios: usize, seed: u64, outdir: &Path) -> anyhow::Result<()> {
    if portfolios == 0 {
        anyhow::bail!("At least one portfolio is required");
    }
    info!("Simulating {} random portfolios (seed {})", portfolios, seed);
    let results = simulate(portfolios, seed);

    fs::create_dir_all(outdir)?;

    let risks: Vec<f64> = results.iter().map(|p| p.risk).collect();
    let histogram = chart::render_histogram(
        &risks,
        HISTOGRAM_BINS,
        "Portfolio risk distribution (Monte Carlo)",
        "Portfolio risk (std dev)",
        "Portfolios",
    );
    let histogram_path = outdir.join("portfolio_risk_histogram.svg");
    fs::write(&histogram_path, histogram)?;

    let points: Vec<(f64, f64, f64)> =
        results.iter().map(|p| (p.risk, p.expected_return, p.sharpe)).collect();
    let scatter = chart::render_scatter(
        &points,
        "Simulated portfolios (Monte Carlo)",
        "Portfolio risk (std dev)",
        "Portfolio return",
    );
    let scatter_path = outdir.join("portfolio_scatter.svg");
    fs::write(&scatter_path, scatter)?;

    let min_risk = risks.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_risk = risks.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mean_risk = risks.iter().sum::<f64>() / risks.len() as f64;
    let best_sharpe = results.iter().map(|p| p.sharpe).fold(f64::NEG_INFINITY, f64::max);
    println!(
        "Risk: min {:.4}, mean {:.4}, max {:.4}; best Sharpe {:.4}",
        min_risk, mean_risk, max_risk, best_sharpe
    );
    println!("Saved histogram: {}", histogram_path.display());
    println!("Saved scatter: {}", scatter_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulation_size_and_ranges() {
        let results = simulate(500, 42);
        assert_eq!(results.len(), 500);
        for p in &results {
            // A convex combination of the asset means stays inside them.
            assert!(p.expected_return >= 0.08 && p.expected_return <= 0.15);
            assert!(p.risk > 0.0);
            assert!((p.sharpe - p.expected_return / p.risk).abs() < 1e-12);
        }
    }

    #[test]
    fn test_simulation_is_reproducible() {
        let a = simulate(50, 7);
        let b = simulate(50, 7);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.expected_return, y.expected_return);
            assert_eq!(x.risk, y.risk);
        }
    }

    #[test]
    fn test_seeds_differ() {
        let a = simulate(10, 1);
        let b = simulate(10, 2);
        assert!(a.iter().zip(&b).any(|(x, y)| x.risk != y.risk));
    }

    #[test]
    fn test_covariance_matrix_diagonal() {
        let cov = covariance_matrix();
        for i in 0..3 {
            assert!((cov[i][i] - STD_DEVS[i] * STD_DEVS[i]).abs() < 1e-12);
        }
        assert!((cov[0][1] - 0.2 * 0.1 * 0.2).abs() < 1e-12);
    }
}
