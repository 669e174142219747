use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gossip_protocol::network::MembershipView;
use std::net::SocketAddr;

fn addr(i: u16) -> SocketAddr {
    format!("127.0.0.1:{}", 10_000 + i).parse().unwrap()
}

fn bench_touch_or_add(c: &mut Criterion) {
    c.bench_function("membership_touch_or_add", |b| {
        let view = MembershipView::new(64, 7);
        let mut i: u16 = 0;
        b.iter(|| {
            view.touch_or_add(black_box(addr(i % 200)));
            i = i.wrapping_add(1);
        });
    });
}

fn bench_sample(c: &mut Criterion) {
    let mut group = c.benchmark_group("membership_sample");
    for peer_count in [8usize, 32, 128] {
        let view = MembershipView::new(peer_count, 7);
        for i in 0..peer_count {
            view.touch_or_add(addr(i as u16));
        }
        group.bench_with_input(
            BenchmarkId::from_parameter(peer_count),
            &peer_count,
            |b, _| {
                b.iter(|| black_box(view.sample(3, None)));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_touch_or_add, bench_sample);
criterion_main!(benches);
