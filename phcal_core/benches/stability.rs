use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use phcal_core::{ExactRepeat, StabilityStrategy, Windowed};

// Settling pH trace: exponential approach to 7.00 plus xorshift noise,
// quantized to 0.01 like the circuit output.
fn synth_trace(n: usize, noise_amp: f64, seed: u32) -> Vec<f64> {
    let mut state = seed.max(1);
    let mut next_f64 = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        f64::from(x) / (f64::from(u32::MAX) + 1.0)
    };
    let mut ph = 6.2;
    let mut v = Vec::with_capacity(n);
    for _ in 0..n {
        ph += (7.0 - ph) * 0.05;
        let noise = (next_f64() * 2.0 - 1.0) * noise_amp;
        v.push(((ph + noise) * 100.0).round() / 100.0);
    }
    v
}

fn feed(detector: &mut dyn StabilityStrategy, trace: &[f64]) -> u32 {
    let mut fires = 0;
    for &ph in trace {
        if detector.update(ph) == phcal_core::Verdict::Stable {
            fires += 1;
        }
    }
    fires
}

pub fn bench_detectors(c: &mut Criterion) {
    let mut g = c.benchmark_group("stability");
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p phcal_core --bench stability
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }

    let trace = synth_trace(50_000, 0.01, 0xC0FFEE);

    for &window in &[4usize, 5, 10] {
        g.bench_function(format!("windowed_w{window}"), |b| {
            b.iter_batched(
                || Windowed::new(window, 0.005, 3),
                |mut d| black_box(feed(&mut d, black_box(&trace))),
                BatchSize::SmallInput,
            )
        });
    }
    g.bench_function("exact_repeat_4", |b| {
        b.iter_batched(
            || ExactRepeat::new(4),
            |mut d| black_box(feed(&mut d, black_box(&trace))),
            BatchSize::SmallInput,
        )
    });
    g.finish();
}

criterion_group!(stability, bench_detectors);
criterion_main!(stability);
