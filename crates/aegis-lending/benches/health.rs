//! Lending arithmetic benchmarks

use std::sync::Arc;

use aegis_common::{AccountId, AssetId, ManualClock, RiskState, RiskStateSource};
use aegis_identity::{IdentityRegistry, ProbationLedger};
use aegis_lending::{health, LendingMarket, MarketConfig, StaticPriceOracle};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal::Decimal;

struct Normal;

impl RiskStateSource for Normal {
    fn current_state(&self) -> RiskState {
        RiskState::Normal
    }
}

fn bench_health_factor(c: &mut Criterion) {
    let mut group = c.benchmark_group("health");

    for debt in [1_000u32, 18_000, 1_000_000].iter() {
        group.bench_with_input(BenchmarkId::new("health_factor", debt), debt, |b, &debt| {
            let value = Decimal::new(25_000, 0);
            let debt = Decimal::from(debt);
            b.iter(|| health::health_factor(black_box(value), black_box(75), black_box(debt)))
        });
    }

    group.bench_function("seize_amount", |b| {
        b.iter(|| {
            health::seize_amount(
                black_box(Decimal::new(18_000, 0)),
                black_box(10),
                black_box(Decimal::new(2_000, 0)),
            )
        })
    });

    group.finish();
}

fn bench_market_borrow(c: &mut Criterion) {
    let mut group = c.benchmark_group("market");

    group.bench_function("borrow_repay", |b| {
        let market = LendingMarket::new(
            MarketConfig::default(),
            Arc::new(IdentityRegistry::new()),
            Arc::new(StaticPriceOracle::with_price(AssetId::from("WETH"), Decimal::new(2_500, 0)).unwrap()),
            Arc::new(Normal),
            Arc::new(ProbationLedger::new()),
            Arc::new(ManualClock::new(0)),
        );
        let user = AccountId::from("bench-user");
        market.provide_liquidity(&AccountId::from("bench-lp"), Decimal::new(1_000_000, 0)).unwrap();
        market.deposit_collateral(&user, Decimal::new(100, 0)).unwrap();

        b.iter(|| {
            market.borrow(&user, black_box(Decimal::new(1_000, 0))).unwrap();
            market.repay(&user, black_box(Decimal::new(1_000, 0))).unwrap();
        })
    });

    group.finish();
}

criterion_group!(benches, bench_health_factor, bench_market_borrow);
criterion_main!(benches);
