use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use densolve::{Decomposition, DynMatrix, Hints, Structure};

// ---------------------------------------------------------------------------
// Helpers: deterministic test matrices, identical for both libraries
// ---------------------------------------------------------------------------

const SIZES: [usize; 3] = [4, 16, 64];

fn entry(i: usize, j: usize, n: usize) -> f64 {
    ((i * 7 + j * 3) % 11) as f64 - 5.0 + if i == j { n as f64 } else { 0.0 }
}

fn densolve_general(n: usize) -> DynMatrix<f64> {
    DynMatrix::from_fn(n, n, |i, j| entry(i, j, n))
}

fn nalgebra_general(n: usize) -> nalgebra::DMatrix<f64> {
    nalgebra::DMatrix::from_fn(n, n, |i, j| entry(i, j, n))
}

fn densolve_spd(n: usize) -> DynMatrix<f64> {
    let a = densolve_general(n);
    a.tr_mul(&a).with_structure(Structure::Symmetric)
}

fn nalgebra_spd(n: usize) -> nalgebra::DMatrix<f64> {
    let a = nalgebra_general(n);
    a.transpose() * a
}

fn densolve_rhs(n: usize) -> DynMatrix<f64> {
    DynMatrix::from_fn(n, 1, |i, _| (i + 1) as f64)
}

fn nalgebra_rhs(n: usize) -> nalgebra::DVector<f64> {
    nalgebra::DVector::from_fn(n, |i, _| (i + 1) as f64)
}

// ---------------------------------------------------------------------------
// LU
// ---------------------------------------------------------------------------

fn lu_solve(c: &mut Criterion) {
    let mut g = c.benchmark_group("lu_solve");

    for n in SIZES {
        g.bench_with_input(BenchmarkId::new("densolve_gauss", n), &n, |b, &n| {
            let a = densolve_general(n);
            let rhs = densolve_rhs(n);
            b.iter(|| std::hint::black_box(&a).gauss().solve(std::hint::black_box(&rhs)))
        });

        g.bench_with_input(BenchmarkId::new("densolve_crout", n), &n, |b, &n| {
            let a = densolve_general(n);
            let rhs = densolve_rhs(n);
            b.iter(|| {
                std::hint::black_box(&a)
                    .crout()
                    .and_then(|d| d.solve(std::hint::black_box(&rhs)))
            })
        });

        g.bench_with_input(BenchmarkId::new("nalgebra", n), &n, |b, &n| {
            let a = nalgebra_general(n);
            let rhs = nalgebra_rhs(n);
            b.iter(|| std::hint::black_box(&a).clone().lu().solve(std::hint::black_box(&rhs)))
        });
    }

    g.finish();
}

fn lu_determinant(c: &mut Criterion) {
    let mut g = c.benchmark_group("lu_determinant");

    for n in SIZES {
        g.bench_with_input(BenchmarkId::new("densolve", n), &n, |b, &n| {
            let a = densolve_general(n);
            b.iter(|| std::hint::black_box(&a).gauss().determinant())
        });

        g.bench_with_input(BenchmarkId::new("nalgebra", n), &n, |b, &n| {
            let a = nalgebra_general(n);
            b.iter(|| std::hint::black_box(&a).clone().lu().determinant())
        });
    }

    g.finish();
}

// ---------------------------------------------------------------------------
// Cholesky
// ---------------------------------------------------------------------------

fn cholesky_solve(c: &mut Criterion) {
    let mut g = c.benchmark_group("cholesky_solve");

    for n in SIZES {
        g.bench_with_input(BenchmarkId::new("densolve", n), &n, |b, &n| {
            let a = densolve_spd(n);
            let rhs = densolve_rhs(n);
            b.iter(|| {
                std::hint::black_box(&a)
                    .cholesky()
                    .and_then(|d| d.solve(std::hint::black_box(&rhs)))
            })
        });

        g.bench_with_input(BenchmarkId::new("nalgebra", n), &n, |b, &n| {
            let a = nalgebra_spd(n);
            let rhs = nalgebra_rhs(n);
            b.iter(|| {
                std::hint::black_box(&a)
                    .clone()
                    .cholesky()
                    .map(|d| d.solve(std::hint::black_box(&rhs)))
            })
        });
    }

    g.finish();
}

// ---------------------------------------------------------------------------
// QR
// ---------------------------------------------------------------------------

fn qr_factor(c: &mut Criterion) {
    let mut g = c.benchmark_group("qr_factor");

    for n in SIZES {
        g.bench_with_input(BenchmarkId::new("densolve_householder", n), &n, |b, &n| {
            let a = densolve_general(n);
            b.iter(|| {
                let qr = std::hint::black_box(&a).householder();
                qr.r().map(|r| r.nrows())
            })
        });

        g.bench_with_input(BenchmarkId::new("densolve_gram_schmidt", n), &n, |b, &n| {
            let a = densolve_general(n);
            b.iter(|| {
                let qr = std::hint::black_box(&a).gram_schmidt();
                qr.r().map(|r| r.nrows())
            })
        });

        g.bench_with_input(BenchmarkId::new("densolve_rrqr", n), &n, |b, &n| {
            let a = densolve_general(n);
            b.iter(|| std::hint::black_box(&a).rrqr().rank())
        });

        g.bench_with_input(BenchmarkId::new("nalgebra", n), &n, |b, &n| {
            let a = nalgebra_general(n);
            b.iter(|| std::hint::black_box(&a).clone().qr().r())
        });
    }

    g.finish();
}

fn least_squares(c: &mut Criterion) {
    let mut g = c.benchmark_group("least_squares");

    for n in SIZES {
        let m = 2 * n;
        g.bench_with_input(BenchmarkId::new("densolve", n), &n, |b, _| {
            let a = DynMatrix::from_fn(m, n, |i, j| entry(i, j, n));
            let rhs = densolve_rhs(m);
            b.iter(|| {
                let qr = densolve::linalg::HouseholderDecomposition::new(Hints::new(
                    std::hint::black_box(&a),
                ));
                qr.approx(std::hint::black_box(&rhs))
            })
        });
    }

    g.finish();
}

// ---------------------------------------------------------------------------
// SVD
// ---------------------------------------------------------------------------

fn svd(c: &mut Criterion) {
    let mut g = c.benchmark_group("svd");

    for n in SIZES {
        g.bench_with_input(BenchmarkId::new("densolve", n), &n, |b, &n| {
            let a = densolve_general(n);
            b.iter(|| {
                std::hint::black_box(&a)
                    .svd()
                    .singular_values()
                    .map(|s| s.len())
            })
        });

        g.bench_with_input(BenchmarkId::new("nalgebra", n), &n, |b, &n| {
            let a = nalgebra_general(n);
            b.iter(|| std::hint::black_box(&a).clone().svd(true, true))
        });
    }

    g.finish();
}

criterion_group!(
    benches,
    lu_solve,
    lu_determinant,
    cholesky_solve,
    qr_factor,
    least_squares,
    svd,
);
criterion_main!(benches);
