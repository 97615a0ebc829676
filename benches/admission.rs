use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use turnstile::{AdmissionConfig, AdmissionGate, ClientKey, MonotonicClock, QuotaStore, RequestContext};

fn try_admit_hot_key(c: &mut Criterion) {
    // Capacity high enough that the bench never runs dry.
    let store = QuotaStore::new(u32::MAX, Arc::new(MonotonicClock::default()));
    let key = ClientKey::User("bench".to_string());

    c.bench_function("try_admit_hot_key", |b| {
        b.iter(|| black_box(store.try_admit(black_box(&key))));
    });
}

fn try_admit_many_keys(c: &mut Criterion) {
    let store = QuotaStore::new(u32::MAX, Arc::new(MonotonicClock::default()));
    let keys: Vec<ClientKey> =
        (0..1_000).map(|n| ClientKey::Ip(format!("198.51.{}.{}", n / 256, n % 256))).collect();

    let mut cursor = 0usize;
    c.bench_function("try_admit_rotating_1k_keys", |b| {
        b.iter(|| {
            cursor = (cursor + 1) % keys.len();
            black_box(store.try_admit(black_box(&keys[cursor])))
        });
    });
}

fn gate_admit_end_to_end(c: &mut Criterion) {
    let gate = AdmissionGate::new(AdmissionConfig::with_requests_per_minute(u32::MAX))
        .expect("valid config");
    let request = RequestContext {
        path: "/api/v1/albums",
        auth: None,
        forwarded_for: Some("203.0.113.9"),
        peer: None,
    };

    c.bench_function("gate_admit_anonymous", |b| {
        b.iter(|| black_box(gate.admit(black_box(&request))));
    });
}

criterion_group!(benches, try_admit_hot_key, try_admit_many_keys, gate_admit_end_to_end);
criterion_main!(benches);
