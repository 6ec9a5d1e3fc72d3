use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rusty_portfolio::data::benchmarks::{cumulative_index, BenchmarkRate};
use rusty_portfolio::finance::{compute_positions, portfolio_timeseries, Ledger};
use rusty_portfolio::transaction::Transaction;

fn sample_transactions(n: usize) -> Vec<Transaction> {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    (0..n)
        .map(|i| {
            let holding = (i % 25) as u64 + 1;
            let date = start + Duration::days((i / 5) as i64);
            let price = 10.0 + (i % 97) as f64 * 0.5;
            if i % 4 == 3 {
                Transaction::sell(holding, date, price, 1.0)
            } else {
                Transaction::buy(holding, date, price, 3.0).with_fees(0.35)
            }
        })
        .collect()
}

fn benchmark_positions(c: &mut Criterion) {
    let transactions = sample_transactions(2000);

    c.bench_function("compute_positions_2000", |b| {
        b.iter(|| compute_positions(black_box(&transactions)));
    });

    c.bench_function("ledger_incremental_2000", |b| {
        b.iter(|| {
            let mut ledger = Ledger::new();
            ledger.extend(black_box(transactions.iter().cloned()));
            ledger.positions()
        });
    });
}

fn benchmark_timeseries(c: &mut Criterion) {
    let transactions = sample_transactions(2000);

    c.bench_function("portfolio_timeseries_2000", |b| {
        b.iter(|| portfolio_timeseries(black_box(&transactions)));
    });
}

fn benchmark_index(c: &mut Criterion) {
    let start = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
    let rates: Vec<BenchmarkRate> = (0..2500)
        .map(|i| BenchmarkRate::new(start + Duration::days(i), 0.04))
        .collect();

    c.bench_function("cumulative_index_2500", |b| {
        b.iter(|| cumulative_index(black_box(&rates)));
    });
}

criterion_group!(benches, benchmark_positions, benchmark_timeseries, benchmark_index);
criterion_main!(benches);
