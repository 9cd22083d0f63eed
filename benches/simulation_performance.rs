use criterion::{black_box, criterion_group, criterion_main, Criterion};
use junction_sim::{config::SimulationConfig, control::ControlKind, simulation::Simulation};

fn warmed_up(kind: ControlKind, spawn_rate: f32) -> Simulation {
    let mut config = SimulationConfig::default();
    config.simulation.seed = Some(42);
    config.simulation.spawn_rate = spawn_rate;

    let mut simulation = Simulation::new(kind, config);

    // Pre-populate with traffic for realistic benchmarking
    for _ in 0..1_000 {
        simulation.tick(16.0);
    }
    simulation
}

fn benchmark_tick(c: &mut Criterion) {
    for kind in ControlKind::ALL {
        let mut simulation = warmed_up(kind, 1.5);

        c.bench_function(&format!("{}_tick", kind), |b| {
            b.iter(|| simulation.tick(black_box(16.0)))
        });
    }
}

fn benchmark_demand_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("demand_scaling");

    for spawn_rate in [0.5_f32, 1.5, 3.0, 6.0] {
        for kind in ControlKind::ALL {
            let mut simulation = warmed_up(kind, spawn_rate);

            group.bench_function(
                format!("{}_{}_per_s_{}_vehicles", kind, spawn_rate, simulation.vehicles().len()),
                |b| b.iter(|| simulation.tick(black_box(16.0))),
            );
        }
    }

    group.finish();
}

fn benchmark_fast_forward(c: &mut Criterion) {
    let mut simulation = warmed_up(ControlKind::Roundabout, 1.5);
    simulation.set_simulation_speed(8.0);

    c.bench_function("roundabout_tick_8x", |b| {
        b.iter(|| simulation.tick(black_box(16.0)))
    });
}

criterion_group!(benches, benchmark_tick, benchmark_demand_scaling, benchmark_fast_forward);
criterion_main!(benches);
