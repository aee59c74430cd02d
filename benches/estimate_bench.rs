//! Benchmarks for the SRS estimation chain
//!
//! Run with: cargo bench --bench estimate_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use num_complex::Complex32;
use srs_estimator::config::{SrsEstimatorConfig, SrsResource};
use srs_estimator::resource_grid::ResourceGrid;
use srs_estimator::srs_sequence::{sequence_info, LowPaprSequenceGenerator};
use srs_estimator::SrsChannelEstimator;

fn make_config(nof_prb: usize, nof_antenna_ports: usize, nof_rx_ports: usize) -> SrsEstimatorConfig {
    SrsEstimatorConfig {
        resource: SrsResource {
            nof_antenna_ports,
            nof_symbols: 1,
            start_symbol: 13,
            comb_size: 2,
            comb_offset: 0,
            sequence_id: 42,
            cyclic_shift: 0,
            freq_shift: 0,
            nof_prb,
        },
        numerology: 1,
        ports: (0..nof_rx_ports).collect(),
        context: None,
    }
}

fn make_grid(config: &SrsEstimatorConfig) -> ResourceGrid {
    let res = &config.resource;
    let mut grid = ResourceGrid::new(config.ports.len(), 14, res.nof_prb * 12);
    let generator = LowPaprSequenceGenerator::new();
    for antenna_port in 0..res.nof_antenna_ports {
        let info = sequence_info(res, antenna_port);
        let mut pilot = vec![Complex32::new(0.0, 0.0); info.sequence_length];
        generator.generate(
            &mut pilot,
            info.sequence_group,
            info.sequence_number,
            info.n_cs,
            info.n_cs_max,
        );
        for &port in &config.ports {
            for symbol in res.start_symbol..res.start_symbol + res.nof_symbols {
                for (n, &p) in pilot.iter().enumerate() {
                    let subcarrier = info.mapping_initial_subcarrier + n * info.comb_size;
                    let previous = grid.sample(port, symbol, subcarrier);
                    grid.put(port, symbol, subcarrier, previous + p);
                }
            }
        }
    }
    grid
}

// ============================================================================
// Full Estimation Chain
// ============================================================================

fn bench_estimate_bandwidth(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimate_bandwidth");

    for nof_prb in [4usize, 16, 64, 128].iter() {
        let config = make_config(*nof_prb, 1, 1);
        let grid = make_grid(&config);
        let mut estimator = SrsChannelEstimator::new();

        group.throughput(Throughput::Elements(config.resource.sequence_length() as u64));
        group.bench_with_input(BenchmarkId::new("single_port", nof_prb), nof_prb, |b, _| {
            b.iter(|| estimator.estimate(black_box(&grid), black_box(&config)))
        });
    }

    group.finish();
}

fn bench_estimate_mimo(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimate_mimo");

    for (tx, rx) in [(1usize, 1usize), (2, 2), (4, 4)].iter() {
        let config = make_config(16, *tx, *rx);
        let grid = make_grid(&config);
        let mut estimator = SrsChannelEstimator::new();

        group.bench_with_input(
            BenchmarkId::new("antenna_pairs", format!("{tx}x{rx}")),
            &(tx, rx),
            |b, _| b.iter(|| estimator.estimate(black_box(&grid), black_box(&config))),
        );
    }

    group.finish();
}

// ============================================================================
// Sequence Generation
// ============================================================================

fn bench_sequence_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequence_generation");

    let generator = LowPaprSequenceGenerator::new();
    for nof_prb in [4usize, 64, 272].iter() {
        let length = nof_prb * 12 / 2;
        let mut out = vec![Complex32::new(0.0, 0.0); length];

        group.throughput(Throughput::Elements(length as u64));
        group.bench_with_input(BenchmarkId::new("low_papr", nof_prb), nof_prb, |b, _| {
            b.iter(|| generator.generate(black_box(&mut out), 7, 0, 3, 8))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_estimate_bandwidth,
    bench_estimate_mimo,
    bench_sequence_generation
);
criterion_main!(benches);
