//! Benchmark for ledger and exchange throughput.
//!
//! Run with: cargo bench --package respawn_economy --bench ledger_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use respawn_economy::resources::scan;
use respawn_economy::sim::{SimHost, SimInventory};
use respawn_economy::{AccountKey, Caller, EconomyConfig, Ledger, MemoryStore, PlayerUid, RespawnEconomy};

fn populated_ledger(players: u32) -> Ledger {
    let ledger = Ledger::init(MemoryStore::new()).unwrap();
    for i in 0..players {
        ledger
            .get_or_create(&PlayerUid::new(format!("uid-{i}")), &format!("Player{i}"), 5)
            .unwrap();
    }
    ledger
}

fn benchmark_credit(c: &mut Criterion) {
    let ledger = populated_ledger(200);
    let key = AccountKey::known(&PlayerUid::new("uid-7"));

    c.bench_function("ledger_credit_200_accounts", |b| {
        b.iter(|| {
            ledger.credit(black_box(&key), 1).unwrap();
            ledger.debit(black_box(&key), 1).unwrap()
        });
    });
}

fn benchmark_lookup_by_name(c: &mut Criterion) {
    let ledger = populated_ledger(200);

    c.bench_function("ledger_lookup_by_name_200_accounts", |b| {
        b.iter(|| ledger.lookup_by_name(black_box("player150")).unwrap());
    });
}

fn benchmark_scan(c: &mut Criterion) {
    let uid = PlayerUid::new("uid-1");
    let mut inventory = SimInventory::standard(&uid);
    for _ in 0..20 {
        inventory.insert("game:gear-rusty", 7);
    }

    c.bench_function("scan_standard_inventory", |b| {
        b.iter(|| scan(black_box(&inventory), black_box("game:gear-rusty")));
    });
}

fn benchmark_transfer_command(c: &mut Criterion) {
    let mut economy = RespawnEconomy::init(EconomyConfig::default(), MemoryStore::new()).unwrap();
    let mut host = SimHost::new();
    let alex = host.connect("a", "Alex");
    let blake = host.connect("b", "Blake");
    economy.on_player_login(&mut host, &alex).unwrap();
    economy.on_player_login(&mut host, &blake).unwrap();
    let from_alex = Caller::player("a", "Alex");
    let from_blake = Caller::player("b", "Blake");

    c.bench_function("transfer_round_trip_command", |b| {
        b.iter(|| {
            economy.handle_line(&mut host, &from_alex, "econ transfer Blake 1");
            economy.handle_line(&mut host, &from_blake, "econ transfer Alex 1");
            host.take_notices().len()
        });
    });
}

criterion_group!(
    benches,
    benchmark_credit,
    benchmark_lookup_by_name,
    benchmark_scan,
    benchmark_transfer_command
);
criterion_main!(benches);
