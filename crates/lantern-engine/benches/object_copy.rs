use std::ffi::c_int;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lantern_engine::sdk::{NativeValue, PropFlags, RawContext};
use lantern_engine::{shared, CopyPolicy, ExtensionObject};

extern "C" fn noop(
    _ctx: *mut RawContext,
    _this: NativeValue,
    _argc: c_int,
    _argv: *const NativeValue,
) -> NativeValue {
    NativeValue::undefined()
}

fn build(members: usize) -> ExtensionObject {
    let mut obj = ExtensionObject::new();
    for i in 0..members {
        match i % 3 {
            0 => obj.add_function(&format!("fn_{i}"), noop, 1),
            1 => obj.add_property(&format!("str_{i}"), "value", PropFlags::C_W_E),
            _ => obj.add_alias_of(&format!("alias_{i}"), "fn_0"),
        }
    }
    obj
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");

    for members in [8, 64, 512] {
        group.bench_with_input(BenchmarkId::new("members", members), &members, |b, &n| {
            b.iter(|| build(black_box(n)));
        });
    }

    group.finish();
}

fn bench_clone(c: &mut Criterion) {
    let mut group = c.benchmark_group("clone");

    for members in [8, 64, 512] {
        let obj = build(members);
        group.bench_with_input(BenchmarkId::new("flat", members), &obj, |b, obj| {
            b.iter(|| black_box(obj).clone());
        });
    }

    let child = shared(build(64));
    let mut with_shared = build(64);
    with_shared.add_nested_object("child", &child, CopyPolicy::Shared, PropFlags::C_W_E);
    group.bench_function("shared_child", |b| {
        b.iter(|| black_box(&with_shared).clone());
    });

    let mut with_deep = build(64);
    with_deep.add_nested_object("child", &child, CopyPolicy::Deep, PropFlags::C_W_E);
    group.bench_function("deep_child", |b| {
        b.iter(|| black_box(&with_deep).clone());
    });

    group.finish();
}

criterion_group!(benches, bench_build, bench_clone);
criterion_main!(benches);
