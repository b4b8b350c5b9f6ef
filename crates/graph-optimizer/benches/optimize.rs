// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for the rewrite engine on synthetic graphs.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use graph_ir::descriptor::{PermuteDescriptor, ReshapeDescriptor};
use graph_ir::{Descriptor, Graph, InputSlotRef, LayerId, LayerType, OutputSlotRef};
use graph_optimizer::{default_catalogue, Optimizer, PrecisionReduction};
use tensor_core::{DType, Shape, TensorInfo};

fn out(layer: LayerId) -> OutputSlotRef {
    OutputSlotRef { layer, slot: 0 }
}

fn inp(layer: LayerId) -> InputSlotRef {
    InputSlotRef { layer, slot: 0 }
}

/// A deep chain alternating activations, redundant reshapes, and
/// permutes, so every structural rule has work to do.
fn deep_chain(blocks: usize) -> Graph {
    let mut g = Graph::new();
    let info = |dims: &[usize]| TensorInfo::new(Shape::from(dims), DType::F32);
    let mut prev = g.add_input(0, info(&[4, 8]));
    for i in 0..blocks {
        let act = g.add_layer(LayerType::Activation, format!("act.{i}"), Descriptor::None);
        let r1 = g.add_layer(
            LayerType::Reshape,
            format!("r1.{i}"),
            Descriptor::Reshape(ReshapeDescriptor { target_shape: Shape::from(&[32][..]) }),
        );
        let r2 = g.add_layer(
            LayerType::Reshape,
            format!("r2.{i}"),
            Descriptor::Reshape(ReshapeDescriptor { target_shape: Shape::from(&[4, 8][..]) }),
        );
        let perm = g.add_layer(
            LayerType::Permute,
            format!("perm.{i}"),
            Descriptor::Permute(PermuteDescriptor::new(vec![1, 0])),
        );
        let back = g.add_layer(
            LayerType::Permute,
            format!("back.{i}"),
            Descriptor::Permute(PermuteDescriptor::new(vec![1, 0])),
        );
        g.connect(out(prev), inp(act)).unwrap();
        g.connect(out(act), inp(r1)).unwrap();
        g.connect(out(r1), inp(r2)).unwrap();
        g.connect(out(r2), inp(perm)).unwrap();
        g.connect(out(perm), inp(back)).unwrap();
        g.set_output_info(out(act), info(&[4, 8])).unwrap();
        g.set_output_info(out(r1), info(&[32])).unwrap();
        g.set_output_info(out(r2), info(&[4, 8])).unwrap();
        g.set_output_info(out(perm), info(&[8, 4])).unwrap();
        g.set_output_info(out(back), info(&[4, 8])).unwrap();
        prev = back;
    }
    let output = g.add_output(0);
    g.connect(out(prev), inp(output)).unwrap();
    g
}

fn bench_default_catalogue(c: &mut Criterion) {
    let mut group = c.benchmark_group("default_catalogue");
    for blocks in [8usize, 64] {
        group.bench_function(format!("{blocks}_blocks"), |b| {
            b.iter_batched(
                || deep_chain(blocks),
                |mut g| {
                    let rules = default_catalogue(&Default::default(), PrecisionReduction::None);
                    Optimizer::run(&mut g, &rules).unwrap()
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_topological_sort(c: &mut Criterion) {
    let g = deep_chain(64);
    c.bench_function("topological_sort_320_layers", |b| {
        b.iter(|| g.topological_sort().unwrap())
    });
}

criterion_group!(benches, bench_default_catalogue, bench_topological_sort);
criterion_main!(benches);
