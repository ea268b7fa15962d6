//! Benchmarks for bus dispatch, scene delegation and binding updates.
//!
//! Run with: cargo bench -p jgui-runtime --bench dispatch_bench

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use jgui_core::{Element, Event};
use jgui_runtime::{
    BindingEngine, Composer, Dispatch, EventSpec, HandlerContext, Model, Module, Viewlet,
};
use std::hint::black_box;

struct Sink {
    name: String,
    hits: u64,
}

impl Module for Sink {
    fn name(&self) -> &str {
        &self.name
    }

    fn events(&self) -> EventSpec {
        EventSpec::new()
            .global("tick", "hit")
            .scene(".row .btn", "click", "hit")
    }

    fn dispatch(&mut self, _handler: &str, _ctx: &HandlerContext<'_>) -> Dispatch {
        self.hits += 1;
        Dispatch::Handled
    }
}

fn composer_with(modules: usize, rows: usize) -> (Composer, Element) {
    let root = Element::new("div");
    for i in 0..rows {
        root.append(
            &Element::new("tr")
                .with_class("row")
                .with_child(Element::new("button").with_class("btn").with_id(format!("b{i}"))),
        );
    }
    let mut comp = Composer::new().with_container(&root);
    for i in 0..modules {
        comp.add_module(Sink {
            name: format!("sink{i}"),
            hits: 0,
        })
        .expect("valid spec");
    }
    comp.render().expect("container set");
    (comp, root)
}

fn bench_bus_fire(c: &mut Criterion) {
    let mut group = c.benchmark_group("router/bus_fire");
    for modules in [1, 8, 64] {
        group.throughput(Throughput::Elements(modules as u64));
        let (comp, _root) = composer_with(modules, 1);
        let event = Event::new("tick");
        group.bench_with_input(BenchmarkId::new("modules", modules), &(), |b, _| {
            b.iter(|| black_box(comp.fire(&event)))
        });
    }
    group.finish();
}

fn bench_scene_click(c: &mut Criterion) {
    let mut group = c.benchmark_group("router/scene_click");
    for rows in [10, 100] {
        let (_comp, root) = composer_with(4, rows);
        let target = root.query("#b0").expect("row rendered");
        group.bench_with_input(BenchmarkId::new("rows", rows), &(), |b, _| {
            b.iter(|| black_box(target.dispatch_event(&Event::new("click"))))
        });
    }
    group.finish();
}

fn bench_binding_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("binding/update");
    for viewlets in [1, 16] {
        let region = Element::new("div");
        let engine = BindingEngine::new(&region);
        let model = Model::new("wordpress").with("aggregated_status.running", 0);
        let set: Vec<Viewlet> = (0..viewlets)
            .map(|i| {
                Viewlet::new(format!("v{i}"), |_| {
                    Element::new("div").with_child(Element::new("span").with_class("running"))
                })
                .bind("aggregated_status.running", ".running")
            })
            .collect();
        engine.bind(&model, set).expect("valid viewlets");
        engine.show_viewlet("v0").expect("registered");
        let mut n = 0i64;
        group.bench_with_input(BenchmarkId::new("viewlets", viewlets), &(), |b, _| {
            b.iter(|| {
                n += 1;
                black_box(model.set("aggregated_status.running", n))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_bus_fire, bench_scene_click, bench_binding_update);

criterion_main!(benches);
