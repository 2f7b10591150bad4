// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for print command construction and job listing in the
// printdrop-print crate.

use std::path::Path;

use chrono::{TimeDelta, Utc};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

use printdrop_core::types::{DuplexMode, JobId, PaperSize, Platform, PrintJob, PrintOptions};
use printdrop_print::command::CommandBuilder;
use printdrop_print::store::{JobStore, MemoryJobStore};

fn bench_command_builder(c: &mut Criterion) {
    let options = PrintOptions {
        paper_size: Some(PaperSize::Letter),
        duplex: Some(DuplexMode::ShortEdge),
        copies: Some(3),
    };

    let cups = CommandBuilder::new(Platform::Cups);
    c.bench_function("build_command (cups, 3 copies)", |b| {
        b.iter(|| {
            cups.build(
                black_box(Path::new("uploads/file-1736150000000-123456789.pdf")),
                black_box(Some("Office")),
                black_box(&options),
            )
        });
    });

    let windows = CommandBuilder::new(Platform::Windows);
    c.bench_function("build_command (windows, 3 copies)", |b| {
        b.iter(|| {
            windows.build(
                black_box(Path::new("C:\\uploads\\file-1736150000000-123456789.pdf")),
                black_box(Some("Front Desk")),
                black_box(&options),
            )
        });
    });
}

fn bench_list_all(c: &mut Criterion) {
    let store = MemoryJobStore::new();
    let now = Utc::now();
    for i in 0..1000 {
        let mut job = PrintJob::new(JobId::generate(), format!("doc-{i}.pdf"), None);
        // Scatter timestamps so the sort has work to do.
        job.timestamp = now - TimeDelta::milliseconds((i * 7919) % 100_000);
        let _ = store.create(job);
    }

    c.bench_function("list_all (1000 jobs)", |b| {
        b.iter(|| black_box(store.list_all()));
    });
}

criterion_group!(benches, bench_command_builder, bench_list_all);
criterion_main!(benches);
