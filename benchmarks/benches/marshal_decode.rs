//! Benchmarks du décodeur marshal (Criterion).
//!
//! Suites :
//!   - marshal/consts   → pool de constantes plat (ints, chaînes internées, stringrefs)
//!   - marshal/nested   → module avec N fonctions imbriquées, décodage + sections
//!   - marshal/pyc      → fichiers `*.pyc` de PYC_BENCH_DIR (optionnel)
//!
//! Variables d’environnement :
//!   PYC_BENCH_DIR=chemin           — répertoire de `.pyc` réels (suite ignorée si absent)
//!   CRIT_SAMPLES (def=50) | CRIT_WARMUP_MS (def=300) | CRIT_MEASURE_MS (def=1200)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pyc_marshal::{decode, decode_sections, PycFile};
use std::{fs, path::PathBuf, time::Duration};

const PY38: u32 = 3413;

// -------------------------------------------------------------------------------------
// Helpers env
// -------------------------------------------------------------------------------------
fn env_usize(k: &str, d: usize) -> usize {
    std::env::var(k).ok().and_then(|s| s.parse().ok()).unwrap_or(d)
}
fn env_u64(k: &str, d: u64) -> u64 {
    std::env::var(k).ok().and_then(|s| s.parse().ok()).unwrap_or(d)
}

// -------------------------------------------------------------------------------------
// Flux synthétiques
// -------------------------------------------------------------------------------------
fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn push_short(out: &mut Vec<u8>, tag: u8, s: &str) {
    out.push(tag);
    out.push(s.len() as u8);
    out.extend_from_slice(s.as_bytes());
}

/// Tuple de `n` constantes : un tiers d’ints, un tiers de noms internés, un tiers de références.
fn const_pool(n: usize) -> Vec<u8> {
    let mut out = vec![b'('];
    push_u32(&mut out, n as u32);
    let mut interned = 0u32;
    for i in 0..n {
        match i % 3 {
            0 => {
                out.push(b'i');
                out.extend_from_slice(&(i as i32).to_le_bytes());
            }
            1 => {
                push_short(&mut out, b'Z', &format!("name_{i}"));
                interned += 1;
            }
            _ => {
                out.push(b'R');
                push_u32(&mut out, interned.saturating_sub(1));
            }
        }
    }
    out
}

/// Code object 3.8 minimal ; `consts` écrit le champ du même nom.
fn code38(out: &mut Vec<u8>, name: &str, consts: impl FnOnce(&mut Vec<u8>)) {
    out.push(b'c');
    for v in [0, 0, 0, 1, 2, 0x43] {
        push_u32(out, v);
    }
    let bytecode = [0x64, 0x00, 0x53, 0x00];
    out.push(b's');
    push_u32(out, bytecode.len() as u32);
    out.extend_from_slice(&bytecode);
    consts(out);
    for _ in 0..4 {
        out.extend_from_slice(&[b')', 0]);
    }
    push_short(out, b'z', "bench.py");
    push_short(out, b'Z', name);
    push_u32(out, 1);
    out.extend_from_slice(&[b's', 0, 0, 0, 0]);
}

/// Module contenant `n` fonctions, chacune avec une fonction interne.
fn nested_module(n: usize) -> Vec<u8> {
    let mut out = Vec::new();
    code38(&mut out, "<module>", |out| {
        out.push(b'(');
        push_u32(out, n as u32);
        for i in 0..n {
            code38(out, &format!("f{i}"), |out| {
                out.extend_from_slice(&[b')', 2, b'N']);
                code38(out, "inner", |out| out.extend_from_slice(&[b')', 0]));
            });
        }
    });
    out
}

fn pyc_files() -> Vec<(String, Vec<u8>)> {
    let Ok(dir) = std::env::var("PYC_BENCH_DIR") else { return Vec::new() };
    let Ok(entries) = fs::read_dir(PathBuf::from(dir)) else { return Vec::new() };
    let mut files: Vec<_> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "pyc"))
        .filter_map(|p| {
            let name = p.file_name()?.to_string_lossy().into_owned();
            fs::read(&p).ok().map(|bytes| (name, bytes))
        })
        .collect();
    files.sort();
    files
}

// -------------------------------------------------------------------------------------
// Benches
// -------------------------------------------------------------------------------------
fn configure() -> Criterion {
    Criterion::default()
        .sample_size(env_usize("CRIT_SAMPLES", 50))
        .warm_up_time(Duration::from_millis(env_u64("CRIT_WARMUP_MS", 300)))
        .measurement_time(Duration::from_millis(env_u64("CRIT_MEASURE_MS", 1200)))
}

fn bench_consts(c: &mut Criterion) {
    let mut group = c.benchmark_group("marshal/consts");
    for n in [64usize, 1024, 16 * 1024] {
        let data = const_pool(n);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &data, |b, data| {
            b.iter(|| decode(black_box(data), PY38));
        });
    }
    group.finish();
}

fn bench_nested(c: &mut Criterion) {
    let mut group = c.benchmark_group("marshal/nested");
    for n in [8usize, 128, 1024] {
        let data = nested_module(n);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &data, |b, data| {
            b.iter(|| decode_sections(black_box(data), PY38).map(|d| d.sections.len()));
        });
    }
    group.finish();
}

fn bench_pyc(c: &mut Criterion) {
    let files = pyc_files();
    if files.is_empty() {
        return;
    }
    let mut group = c.benchmark_group("marshal/pyc");
    for (name, bytes) in &files {
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), bytes, |b, bytes| {
            b.iter(|| PycFile::parse(black_box(bytes)).map(|f| f.sections().len()));
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = configure();
    targets = bench_consts, bench_nested, bench_pyc
}
criterion_main!(benches);
