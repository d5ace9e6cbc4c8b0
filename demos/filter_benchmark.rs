use std::fs;
use std::hint::black_box;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use rgba_filters::{
    BrightnessParams, ContrastParams, Filter, FilterKind, GrayscaleParams, PixelBuffer, measure,
};
use rustc_hash::FxHashMap;

// Iteration scheme: a handful of warmup passes to settle kernel selection
// and the thread pool, then the measured runs, each over a pristine copy
// of the source raster (filters mutate in place).
const DEFAULT_WARMUP_ITERS: usize = 10;
const DEFAULT_MEASURE_ITERS: usize = 50;
const DEFAULT_MAX_REGRESSION_PCT: f64 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RegressionMetric {
    Avg,
    P50,
    P95,
}

impl RegressionMetric {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "avg" | "average" => Some(Self::Avg),
            "p50" | "median" => Some(Self::P50),
            "p95" => Some(Self::P95),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Avg => "avg",
            Self::P50 => "p50",
            Self::P95 => "p95",
        }
    }

    fn current_value(self, result: &BenchResult) -> f64 {
        match self {
            Self::Avg => result.avg_ms,
            Self::P50 => result.p50_ms,
            Self::P95 => result.p95_ms,
        }
    }

    fn baseline_value(self, entry: &BaselineEntry) -> f64 {
        match self {
            Self::Avg => entry.avg_ms,
            Self::P50 => entry.p50_ms,
            Self::P95 => entry.p95_ms,
        }
    }
}

impl Default for RegressionMetric {
    fn default() -> Self {
        Self::P50
    }
}

#[derive(Clone, Debug)]
struct Config {
    warmup_iters: usize,
    measure_iters: usize,
    scenario_filter: Option<String>,
    baseline_path: Option<PathBuf>,
    save_baseline_path: Option<PathBuf>,
    max_regression_pct: f64,
    regression_metric: RegressionMetric,
}

#[derive(Clone, Debug)]
struct Scenario {
    name: String,
    filter: Filter,
    width: usize,
    height: usize,
    stride: usize,
}

#[derive(Clone, Debug)]
struct BenchResult {
    scenario: String,
    avg_ms: f64,
    p50_ms: f64,
    p95_ms: f64,
    min_ms: f64,
    max_ms: f64,
    stddev_ms: f64,
    /// Pixels per second at the average duration.
    pps: f64,
}

#[derive(Clone, Copy, Debug)]
struct BaselineEntry {
    avg_ms: f64,
    p50_ms: f64,
    p95_ms: f64,
}

fn parse_usize_arg(flag: &str, value: Option<&str>) -> Result<usize> {
    let Some(raw) = value else {
        bail!("{flag} requires a value");
    };
    raw.parse::<usize>()
        .with_context(|| format!("failed to parse {flag} value: {raw}"))
}

fn parse_f64_arg(flag: &str, value: Option<&str>) -> Result<f64> {
    let Some(raw) = value else {
        bail!("{flag} requires a value");
    };
    raw.parse::<f64>()
        .with_context(|| format!("failed to parse {flag} value: {raw}"))
}

fn parse_args() -> Result<Config> {
    let mut warmup_iters = DEFAULT_WARMUP_ITERS;
    let mut measure_iters = DEFAULT_MEASURE_ITERS;
    let mut scenario_filter = None;
    let mut baseline_path = None;
    let mut save_baseline_path = None;
    let mut max_regression_pct = DEFAULT_MAX_REGRESSION_PCT;
    let mut regression_metric = RegressionMetric::default();

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1usize;
    while i < args.len() {
        match args[i].as_str() {
            "--warmup" => {
                warmup_iters = parse_usize_arg("--warmup", args.get(i + 1).map(String::as_str))?;
                i += 2;
            }
            "--iters" => {
                measure_iters = parse_usize_arg("--iters", args.get(i + 1).map(String::as_str))?;
                i += 2;
            }
            "--scenario" => {
                let Some(raw) = args.get(i + 1) else {
                    bail!("--scenario requires a value (scenario name prefix or `all`)");
                };
                let trimmed = raw.trim();
                if !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("all") {
                    scenario_filter = Some(trimmed.to_ascii_lowercase());
                } else {
                    scenario_filter = None;
                }
                i += 2;
            }
            "--baseline" => {
                let Some(raw) = args.get(i + 1) else {
                    bail!("--baseline requires a file path");
                };
                baseline_path = Some(PathBuf::from(raw));
                i += 2;
            }
            "--save-baseline" => {
                let Some(raw) = args.get(i + 1) else {
                    bail!("--save-baseline requires a file path");
                };
                save_baseline_path = Some(PathBuf::from(raw));
                i += 2;
            }
            "--max-regression-pct" => {
                max_regression_pct =
                    parse_f64_arg("--max-regression-pct", args.get(i + 1).map(String::as_str))?;
                i += 2;
            }
            "--regression-metric" => {
                let Some(raw) = args.get(i + 1).map(String::as_str) else {
                    bail!("--regression-metric requires one of: avg, p50, p95");
                };
                let Some(metric) = RegressionMetric::parse(raw) else {
                    bail!("invalid --regression-metric: {raw}. Use avg, p50, or p95");
                };
                regression_metric = metric;
                i += 2;
            }
            "--help" | "-h" => {
                println!(
                    "Usage: cargo run --release --example filter_benchmark -- [options]
  --warmup <n>              Warmup iterations per scenario (default: {DEFAULT_WARMUP_ITERS})
  --iters <n>               Measured iterations per scenario (default: {DEFAULT_MEASURE_ITERS})
  --scenario <prefix|all>   Scenario name prefix filter, e.g. `sepia` (default: all)
  --baseline <path>         Compare current run to baseline CSV
  --save-baseline <path>    Save current run as baseline CSV
  --max-regression-pct <f>  Allowed metric increase vs baseline (default: {DEFAULT_MAX_REGRESSION_PCT})
  --regression-metric <m>   Metric for regression checks: avg | p50 | p95 (default: p50)"
                );
                std::process::exit(0);
            }
            other => {
                bail!("unknown argument: {other}");
            }
        }
    }

    if warmup_iters == 0 {
        bail!("--warmup must be >= 1");
    }
    if measure_iters == 0 {
        bail!("--iters must be >= 1");
    }
    if !max_regression_pct.is_finite() || max_regression_pct < 0.0 {
        bail!("--max-regression-pct must be a finite value >= 0");
    }
    if let (Some(baseline), Some(save_baseline)) = (&baseline_path, &save_baseline_path)
        && baseline == save_baseline
    {
        bail!("--baseline and --save-baseline must point to different files");
    }

    Ok(Config {
        warmup_iters,
        measure_iters,
        scenario_filter,
        baseline_path,
        save_baseline_path,
        max_regression_pct,
        regression_metric,
    })
}

fn align_up(value: usize, align: usize) -> usize {
    if align <= 1 {
        return value;
    }
    (value + align - 1) & !(align - 1)
}

/// Parameters that make each filter do representative work; the defaults
/// for brightness and contrast are identities.
fn bench_filter(kind: FilterKind) -> Filter {
    match kind {
        FilterKind::Grayscale => Filter::Grayscale(GrayscaleParams::default()),
        FilterKind::Invert => Filter::Invert,
        FilterKind::Brightness => Filter::Brightness(BrightnessParams { brightness: 40 }),
        FilterKind::Contrast => Filter::Contrast(ContrastParams { contrast: 1.5 }),
        FilterKind::Sepia => Filter::Sepia,
    }
}

fn scenario_catalog() -> Vec<Scenario> {
    let mut out = Vec::new();
    for kind in FilterKind::ALL {
        out.push(Scenario {
            name: format!("{}_1080p", kind.as_str()),
            filter: bench_filter(kind),
            width: 1920,
            height: 1080,
            stride: 1920 * 4,
        });
        // Odd width plus 256-byte row alignment exercises the strided
        // row path instead of one contiguous run.
        out.push(Scenario {
            name: format!("{}_720p_padded", kind.as_str()),
            filter: bench_filter(kind),
            width: 1279,
            height: 719,
            stride: align_up(1279 * 4, 256),
        });
    }
    out
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    let clamped = p.clamp(0.0, 1.0);
    let idx = ((n - 1) as f64 * clamped).round() as usize;
    sorted[idx]
}

fn fill_source_buffer(scenario: &Scenario) -> Vec<u8> {
    let len = scenario.stride * (scenario.height - 1) + scenario.width * 4;
    let mut out = vec![0u8; len];

    let mut state = 0x9e37_79b9_7f4a_7c15_u64;
    for byte in &mut out {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        *byte = (state >> 32) as u8;
    }

    out
}

fn run_scenario(scenario: &Scenario, warmup_iters: usize, measure_iters: usize) -> Result<BenchResult> {
    let pristine = fill_source_buffer(scenario);
    let mut working = pristine.clone();
    let width = u32::try_from(scenario.width).context("scenario width overflow")?;
    let height = u32::try_from(scenario.height).context("scenario height overflow")?;
    let stride = u32::try_from(scenario.stride).context("scenario stride overflow")?;

    for _ in 0..warmup_iters {
        working.copy_from_slice(&pristine);
        let mut buffer = PixelBuffer::from_slice(black_box(working.as_mut_slice()), width, height, stride)
            .context("scenario geometry rejected")?;
        rgba_filters::apply(&mut buffer, scenario.filter);
        black_box(working.as_slice());
    }

    let mut samples_ms = Vec::with_capacity(measure_iters);
    for _ in 0..measure_iters {
        working.copy_from_slice(&pristine);
        let mut buffer = PixelBuffer::from_slice(black_box(working.as_mut_slice()), width, height, stride)
            .context("scenario geometry rejected")?;
        let elapsed = measure(&mut buffer, scenario.filter);
        black_box(working.as_slice());
        samples_ms.push(elapsed.as_secs_f64() * 1000.0);
    }

    let mut sorted = samples_ms.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let sum_ms: f64 = samples_ms.iter().sum();
    let avg_ms = sum_ms / samples_ms.len() as f64;
    let variance = samples_ms
        .iter()
        .map(|sample| {
            let d = *sample - avg_ms;
            d * d
        })
        .sum::<f64>()
        / samples_ms.len() as f64;
    let stddev_ms = variance.sqrt();

    let total_pixels = (scenario.width * scenario.height) as f64;
    let pps = if avg_ms > 0.0 {
        total_pixels / (avg_ms / 1000.0)
    } else {
        0.0
    };

    Ok(BenchResult {
        scenario: scenario.name.clone(),
        avg_ms,
        p50_ms: percentile(&sorted, 0.50),
        p95_ms: percentile(&sorted, 0.95),
        min_ms: *sorted.first().unwrap(),
        max_ms: *sorted.last().unwrap(),
        stddev_ms,
        pps,
    })
}

fn load_baseline(path: &PathBuf) -> Result<FxHashMap<String, BaselineEntry>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read baseline file {}", path.display()))?;
    let mut lines = text.lines();
    let header = lines
        .next()
        .context("baseline file is empty (missing header row)")?;
    if !header.starts_with("scenario,avg_ms,p50_ms,p95_ms") {
        bail!("unrecognized baseline header: {header}");
    }

    let mut out = FxHashMap::default();
    for (line_offset, line) in lines.enumerate() {
        let line_number = line_offset + 2;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let parts: Vec<&str> = trimmed.split(',').collect();
        if parts.len() < 4 {
            bail!("invalid baseline line {line_number}: {line}");
        }
        let parse_metric = |column: &str, raw: &str| -> Result<f64> {
            raw.trim().parse::<f64>().with_context(|| {
                format!("invalid {column} in baseline line {line_number}: {line}")
            })
        };
        out.insert(
            parts[0].trim().to_string(),
            BaselineEntry {
                avg_ms: parse_metric("avg_ms", parts[1])?,
                p50_ms: parse_metric("p50_ms", parts[2])?,
                p95_ms: parse_metric("p95_ms", parts[3])?,
            },
        );
    }

    Ok(out)
}

fn save_baseline(path: &PathBuf, results: &[BenchResult]) -> Result<()> {
    let mut out = String::from("scenario,avg_ms,p50_ms,p95_ms,min_ms,max_ms,stddev_ms,pps\n");
    for result in results {
        out.push_str(&format!(
            "{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.1}\n",
            result.scenario,
            result.avg_ms,
            result.p50_ms,
            result.p95_ms,
            result.min_ms,
            result.max_ms,
            result.stddev_ms,
            result.pps,
        ));
    }

    fs::write(path, out)
        .with_context(|| format!("failed to write baseline file {}", path.display()))
}

fn check_regression(
    baseline: &FxHashMap<String, BaselineEntry>,
    current: &[BenchResult],
    max_regression_pct: f64,
    metric: RegressionMetric,
) -> Result<()> {
    let mut regressions = Vec::new();

    for result in current {
        let Some(base) = baseline.get(&result.scenario) else {
            continue;
        };

        let base_value = metric.baseline_value(base);
        if base_value <= 0.0 {
            continue;
        }
        let current_value = metric.current_value(result);
        let delta_pct = ((current_value - base_value) / base_value) * 100.0;
        if delta_pct > max_regression_pct {
            regressions.push(format!(
                "{} {} regressed by {:.2}% (baseline {:.3} ms -> current {:.3} ms, limit {:.2}%)",
                result.scenario,
                metric.as_str(),
                delta_pct,
                base_value,
                current_value,
                max_regression_pct,
            ));
        }
    }

    if regressions.is_empty() {
        return Ok(());
    }

    bail!(
        "performance regression detected:\n{}",
        regressions.join("\n")
    )
}

fn print_results(results: &[BenchResult]) {
    println!(
        "{:<24} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>14}",
        "scenario", "avg_ms", "p50_ms", "p95_ms", "min_ms", "max_ms", "stddev", "pps"
    );
    for result in results {
        println!(
            "{:<24} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>14.0}",
            result.scenario,
            result.avg_ms,
            result.p50_ms,
            result.p95_ms,
            result.min_ms,
            result.max_ms,
            result.stddev_ms,
            result.pps,
        );
    }
}

fn main() -> Result<()> {
    let config = parse_args()?;
    let all_scenarios = scenario_catalog();
    let available_scenarios = all_scenarios
        .iter()
        .map(|scenario| scenario.name.as_str())
        .collect::<Vec<_>>()
        .join(",");
    let scenarios: Vec<Scenario> = all_scenarios
        .into_iter()
        .filter(|scenario| {
            config
                .scenario_filter
                .as_ref()
                .is_none_or(|needle| scenario.name.starts_with(needle))
        })
        .collect();

    if scenarios.is_empty() {
        bail!(
            "no scenarios matched the requested filter; available scenarios: {}",
            available_scenarios
        );
    }

    println!(
        "Running filter benchmark: warmup={} iters={} regression_metric={} scenarios={}",
        config.warmup_iters,
        config.measure_iters,
        config.regression_metric.as_str(),
        scenarios
            .iter()
            .map(|scenario| scenario.name.as_str())
            .collect::<Vec<_>>()
            .join(","),
    );

    let mut results = Vec::with_capacity(scenarios.len());
    for scenario in &scenarios {
        println!("Benchmarking {}...", scenario.name);
        let result = run_scenario(scenario, config.warmup_iters, config.measure_iters)?;
        results.push(result);
    }

    print_results(&results);

    if let Some(path) = &config.save_baseline_path {
        save_baseline(path, &results)?;
        println!("Saved baseline to {}", path.display());
    }

    if let Some(path) = &config.baseline_path {
        let baseline = load_baseline(path)?;
        check_regression(
            &baseline,
            &results,
            config.max_regression_pct,
            config.regression_metric,
        )?;
        println!(
            "Regression check passed ({}, max allowed regression: {:.2}%)",
            config.regression_metric.as_str(),
            config.max_regression_pct,
        );
    }

    Ok(())
}
