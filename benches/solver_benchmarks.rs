use criterion::{black_box, criterion_group, criterion_main, Criterion};
use strikeforge::player::{ClassProfile, PlayerId, WeaponClass};
use strikeforge::queue::{pick_role_contract, QueueEntry, WindowPolicy};
use strikeforge::team::build_teams;

fn entry(id: u64, primary: WeaponClass, secondary: WeaponClass, mmr: i32) -> QueueEntry {
    QueueEntry {
        player_id: PlayerId(id),
        display_name: format!("player-{id}"),
        mmr,
        classes: ClassProfile::new(primary, secondary),
        queued_at: id as i64,
        party_id: None,
    }
}

fn contract_cohort() -> Vec<QueueEntry> {
    use WeaponClass::*;
    vec![
        entry(1, Sniper, T1, 1480),
        entry(2, Sniper, T2, 1530),
        entry(3, T1, T2, 1450),
        entry(4, T1, T3, 1560),
        entry(5, T2, T1, 1500),
        entry(6, T2, T4, 1510),
        entry(7, T3, T1, 1470),
        entry(8, T3, T2, 1540),
        entry(9, T4, T1, 1490),
        entry(10, T4, T3, 1520),
    ]
}

fn degenerate_cohort() -> Vec<QueueEntry> {
    // All-SMG cohort forces the strict pass to exhaust before autofill.
    (1..=10)
        .map(|id| entry(id, WeaponClass::Smg, WeaponClass::Smg, 1400 + id as i32 * 17))
        .collect()
}

fn wide_pool(size: u64) -> Vec<QueueEntry> {
    use WeaponClass::*;
    let classes = [Sniper, T1, T2, T3, T4, Smg];
    (1..=size)
        .map(|id| {
            entry(
                id,
                classes[(id % 6) as usize],
                classes[((id + 1) % 6) as usize],
                1300 + (id as i32 * 37) % 500,
            )
        })
        .collect()
}

fn solver_benchmarks(c: &mut Criterion) {
    c.bench_function("strict_solve_balanced_cohort", |b| {
        let entries = contract_cohort();
        b.iter(|| build_teams(black_box(&entries)))
    });

    c.bench_function("autofill_solve_degenerate_cohort", |b| {
        let entries = degenerate_cohort();
        b.iter(|| build_teams(black_box(&entries)))
    });

    c.bench_function("role_contract_pick_from_60_pool", |b| {
        let pool = wide_pool(60);
        b.iter(|| pick_role_contract(black_box(&pool), 600_000, 120_000))
    });

    c.bench_function("window_policy_sweep", |b| {
        let policy = WindowPolicy::default();
        b.iter(|| {
            let mut acc = 0;
            for mmr in (800..2800).step_by(100) {
                for wait in (0..300_000).step_by(30_000) {
                    acc += policy.window(black_box(mmr), black_box(wait as i64));
                }
            }
            acc
        })
    });
}

criterion_group!(benches, solver_benchmarks);
criterion_main!(benches);
