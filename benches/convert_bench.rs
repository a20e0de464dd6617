//! Benchmarks for baf2mzml
//!
//! Run with: cargo bench

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use baf2mzml::codec::{encode_f32_base64, encode_f64_base64};
use baf2mzml::iterator::filter_line_pairs;
use baf2mzml::model::{
    AcquisitionKey, LineData, Polarity, Scan, SpectrumAcquisitionData,
};
use baf2mzml::writer::MzMlWriter;

fn synthetic_arrays(n: usize) -> (Vec<f64>, Vec<f64>) {
    let mz: Vec<f64> = (0..n).map(|i| 100.0 + i as f64 * 0.01).collect();
    let intensity: Vec<f64> = (0..n).map(|i| (i % 1000) as f64).collect();
    (mz, intensity)
}

fn synthetic_scan(id: i64, peaks: usize) -> Scan {
    let (mz, intensity) = synthetic_arrays(peaks);
    Scan {
        id,
        rt: id as f64 * 0.5,
        segment: 1,
        acquisition_key: AcquisitionKey {
            id: 1,
            polarity: Polarity::Positive,
            scan_mode: 0,
            acquisition_mode: 0,
            ms_level: 0,
        },
        acquisition_data: SpectrumAcquisitionData::empty(id),
        parent: 0,
        mz_acq_range_lower: 100,
        mz_acq_range_upper: 2000,
        sum_intensity: intensity.iter().sum(),
        max_intensity: 999.0,
        transformator_id: None,
        profile_data: None,
        line_data: Some(LineData { mz, intensity }),
    }
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    for size in [100usize, 10_000, 100_000] {
        let (mz, intensity) = synthetic_arrays(size);

        group.bench_with_input(BenchmarkId::new("encode_f64", size), &mz, |b, values| {
            b.iter(|| encode_f64_base64(black_box(values)));
        });
        group.bench_with_input(
            BenchmarkId::new("encode_f32", size),
            &intensity,
            |b, values| {
                b.iter(|| encode_f32_base64(black_box(values)));
            },
        );
    }

    group.finish();
}

fn bench_level_filter(c: &mut Criterion) {
    let (mz, intensity) = synthetic_arrays(100_000);

    c.bench_function("filter_line_pairs_100k", |b| {
        b.iter(|| filter_line_pairs(black_box(&mz), black_box(&intensity), 500.0));
    });
}

fn bench_write_document(c: &mut Criterion) {
    let scans: Vec<Scan> = (1..=50).map(|id| synthetic_scan(id, 2_000)).collect();

    c.bench_function("write_document_50x2000", |b| {
        b.iter(|| {
            let mut writer = MzMlWriter::new(std::io::sink());
            writer.write_declaration().unwrap();
            writer.write_header("/data/run1.d/analysis.baf").unwrap();
            writer.write_param_groups().unwrap();
            writer.write_sample_list("run1").unwrap();
            writer.open_run("run1", scans.len()).unwrap();
            for scan in &scans {
                writer.write_spectrum(scan).unwrap();
            }
            writer.close_run().unwrap();
            writer.write_index().unwrap();
            writer.close_document().unwrap();
            black_box(writer.position())
        });
    });
}

criterion_group!(benches, bench_codec, bench_level_filter, bench_write_document);
criterion_main!(benches);
