use approx::{assert_abs_diff_eq, assert_relative_eq, AbsDiffEq};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use densolve::linalg::{CacheState, Decomposition, Hints, Permutation};
use densolve::{DynMatrix, FloatScalar, LinalgError, Method, Solver, Structure};

const TOL: f64 = 1e-9;

fn assert_matrix_near<T>(a: &DynMatrix<T>, b: &DynMatrix<T>, eps: T)
where
    T: FloatScalar + AbsDiffEq<Epsilon = T>,
{
    assert_eq!((a.nrows(), a.ncols()), (b.nrows(), b.ncols()), "shape mismatch");
    for j in 0..a.ncols() {
        for i in 0..a.nrows() {
            assert_abs_diff_eq!(a[(i, j)], b[(i, j)], epsilon = eps);
        }
    }
}

fn random(rng: &mut StdRng, rows: usize, cols: usize) -> DynMatrix<f64> {
    let data = (0..rows * cols).map(|_| rng.random_range(-1.0..1.0)).collect();
    DynMatrix::from_vec(rows, cols, data)
}

fn random_f32(rng: &mut StdRng, rows: usize, cols: usize) -> DynMatrix<f32> {
    let m = random(rng, rows, cols);
    DynMatrix::from_fn(rows, cols, |i, j| m[(i, j)] as f32)
}

/// Random square matrix pushed away from singularity.
fn well_conditioned(rng: &mut StdRng, n: usize) -> DynMatrix<f64> {
    let mut m = random(rng, n, n);
    for i in 0..n {
        m[(i, i)] += n as f64;
    }
    m
}

/// `BᵗB + n·I`, tagged symmetric.
fn spd(rng: &mut StdRng, n: usize) -> DynMatrix<f64> {
    let b = random(rng, n, n);
    let mut m = b.tr_mul(&b);
    for i in 0..n {
        m[(i, i)] += n as f64;
    }
    m.with_structure(Structure::Symmetric)
}

fn orthonormal_columns(q: &DynMatrix<f64>) {
    assert_matrix_near(&q.tr_mul(q), &DynMatrix::identity(q.ncols()), TOL);
}

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn gauss_pivots_on_largest_entry() {
    let m = DynMatrix::from_rows(2, 2, &[4.0, 3.0, 6.0, 3.0]);
    let lu = m.gauss();
    assert_relative_eq!(lu.determinant().unwrap(), -6.0, epsilon = 1e-12);
    let pmq = &(&lu.p().unwrap() * &m) * &lu.q().unwrap();
    assert_eq!(pmq[(0, 0)], 6.0);
    assert_eq!(lu.u().unwrap()[(0, 0)], 6.0);
}

#[test]
fn cholesky_of_diagonal() {
    let m = DynMatrix::from_diagonal(&[4.0, 9.0]);
    let chol = m.cholesky().unwrap();
    assert_matrix_near(chol.r().unwrap(), &DynMatrix::from_diagonal(&[2.0, 3.0]), 1e-15);
    assert_relative_eq!(chol.determinant().unwrap(), 36.0);
}

#[test]
fn upper_triangular_solve() {
    let u = DynMatrix::from_rows(2, 2, &[1.0, 1.0, 0.0, 1.0]);
    let solver = Solver::new(Hints::new(&u), Method::Auto).unwrap();
    assert_eq!(solver.method(), Method::Triangular);
    let x = solver.solve(&DynMatrix::column(&[3.0, 1.0])).unwrap();
    assert_eq!(x, DynMatrix::column(&[2.0, 1.0]));
}

#[test]
fn svd_of_identity() {
    let eye = DynMatrix::<f64>::identity(3);
    let svd = eye.svd();
    assert_eq!(*svd.u().unwrap(), eye);
    assert_eq!(*svd.v().unwrap(), eye);
    assert_eq!(svd.singular_values().unwrap(), &[1.0, 1.0, 1.0]);
    assert_eq!(svd.rank().unwrap(), 3);
}

#[test]
fn reference_precision_f32() {
    let a = DynMatrix::from_rows(3, 3, &[2.0_f32, 1.0, -1.0, -3.0, -1.0, 2.0, -2.0, 1.0, 2.0]);
    let x = a.solve(&DynMatrix::column(&[8.0, -11.0, -3.0])).unwrap();
    assert_abs_diff_eq!(x[(0, 0)], 2.0, epsilon = 1e-5);
    assert_abs_diff_eq!(x[(1, 0)], 3.0, epsilon = 1e-5);
    assert_abs_diff_eq!(x[(2, 0)], -1.0, epsilon = 1e-5);
}

#[test]
fn sub_tolerance_entries_are_not_dropped() {
    // off-diagonals below the default f32 tolerance (2⁻¹⁶) still count
    let m = DynMatrix::from_rows(2, 2, &[1.0_f32, 1e-5, 1e-5, 2e-5]);
    assert_eq!(Hints::new(&m).structure(), Structure::Symmetric);
    let b = DynMatrix::column(&[0.0, 1.0]);
    for x in [m.solve(&b).unwrap(), m.gauss().solve(&b).unwrap()] {
        assert_relative_eq!(x[(1, 0)], 50000.25, max_relative = 1e-3);
        assert_abs_diff_eq!(x[(0, 0)], -0.5, epsilon = 1e-2);
    }
    let lu = m.gauss();
    let pmq = &(&lu.p().unwrap() * &m) * &lu.q().unwrap();
    assert_matrix_near(&(lu.l().unwrap() * lu.u().unwrap()), &pmq, 1e-7);

    let m = DynMatrix::from_rows(2, 2, &[1e-3_f32, 0.0, 1e-5, 2e-3]);
    assert_eq!(Hints::new(&m).structure(), Structure::Lower);
    let b = DynMatrix::column(&[1.0, 1.0]);
    for method in [Method::Auto, Method::Gauss, Method::Householder, Method::Svd] {
        let x = Solver::new(Hints::new(&m), method).unwrap().solve(&b).unwrap();
        assert_matrix_near(&(&m * &x), &b, 1e-4);
        assert_relative_eq!(x[(1, 0)], 495.0, max_relative = 1e-4);
    }
    let svd = m.svd();
    let usv = (svd.u().unwrap() * svd.e().unwrap()).mul_tr(svd.v().unwrap());
    assert_matrix_near(&usv, &m, 1e-7);
}

// ── Properties over generated matrices ──────────────────────────────

#[test]
fn gauss_reconstructs_any_shape() {
    let mut rng = StdRng::seed_from_u64(7);
    for &(r, c) in &[(1, 1), (3, 3), (5, 5), (4, 6), (6, 4)] {
        let m = random(&mut rng, r, c);
        let lu = m.gauss();
        let pmq = &(&lu.p().unwrap() * &m) * &lu.q().unwrap();
        assert_matrix_near(&(lu.l().unwrap() * lu.u().unwrap()), &pmq, TOL);
    }
}

#[test]
fn inverse_times_source_is_identity() {
    let mut rng = StdRng::seed_from_u64(11);
    for n in 1..=6 {
        let m = well_conditioned(&mut rng, n);
        for method in [Method::Gauss, Method::Crout, Method::Householder, Method::Svd] {
            let s = Solver::new(Hints::new(&m), method).unwrap();
            assert_matrix_near(&(&s.inverse().unwrap() * &m), &DynMatrix::identity(n), TOL);
        }
    }
}

#[test]
fn crout_has_unit_upper_factor() {
    let mut rng = StdRng::seed_from_u64(13);
    let m = well_conditioned(&mut rng, 5);
    let crout = m.crout().unwrap();
    let u = crout.u().unwrap();
    for i in 0..5 {
        assert_eq!(u[(i, i)], 1.0);
    }
    let plu = &crout.p().unwrap() * &(crout.l().unwrap() * u);
    assert_matrix_near(&plu, &m, TOL);
    assert_relative_eq!(
        crout.determinant().unwrap(),
        m.gauss().determinant().unwrap(),
        max_relative = 1e-10
    );
}

#[test]
fn crout_fails_hard_on_singular_input() {
    let m = DynMatrix::from_rows(3, 3, &[1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 1.0, 1.0, 1.0]);
    let crout = m.crout().unwrap();
    assert!(matches!(
        crout.determinant(),
        Err(LinalgError::NotInvertible { .. })
    ));
    assert_eq!(crout.cache_state(), CacheState::Failed);
    // Gauss reports the same matrix as soft rank deficiency
    assert_eq!(m.gauss().rank().unwrap(), 2);
}

#[test]
fn cholesky_of_spd() {
    let mut rng = StdRng::seed_from_u64(17);
    for n in 1..=6 {
        let m = spd(&mut rng, n);
        let chol = m.cholesky().unwrap();
        let r = chol.r().unwrap();
        assert_matrix_near(&r.tr_mul(r), &m, TOL);
        let diag_sq: f64 = r.diagonal().iter().map(|d| d * d).product();
        assert_relative_eq!(chol.determinant().unwrap(), diag_sq, max_relative = 1e-10);
        assert_relative_eq!(
            chol.determinant().unwrap(),
            m.gauss().determinant().unwrap(),
            max_relative = 1e-10
        );
    }
}

#[test]
fn qr_variants_agree_up_to_sign() {
    let mut rng = StdRng::seed_from_u64(19);
    for &(r, c) in &[(4, 4), (6, 3), (5, 1)] {
        let m = random(&mut rng, r, c);
        let hh = m.householder();
        let gs = m.gram_schmidt();

        assert_matrix_near(&(hh.q().unwrap() * hh.r().unwrap()), &m, TOL);
        orthonormal_columns(hh.q().unwrap());
        assert_matrix_near(&(gs.q().unwrap() * gs.r().unwrap()), &m, TOL);
        orthonormal_columns(gs.q().unwrap());

        let qh = hh.q_reduced().unwrap();
        let qg = gs.q().unwrap();
        for j in 0..c {
            let dot: f64 = (0..r).map(|i| qh[(i, j)] * qg[(i, j)]).sum();
            assert_abs_diff_eq!(dot.abs(), 1.0, epsilon = TOL);
        }
    }
}

#[test]
fn rank_revealing_reconstruction() {
    let mut rng = StdRng::seed_from_u64(23);
    for &(r, c) in &[(5, 5), (7, 4), (4, 7)] {
        let m = random(&mut rng, r, c);
        let qr = m.rrqr();
        let p = qr.p().unwrap();
        if r >= c {
            assert_matrix_near(&(qr.q().unwrap() * qr.r().unwrap()), &(&m * &p), TOL);
        } else {
            let prq = &(&p * qr.r().unwrap()) * qr.q().unwrap();
            assert_matrix_near(&prq, &m, TOL);
        }
        assert_eq!(qr.rank().unwrap(), r.min(c));
    }
}

#[test]
fn svd_reconstruction_and_ordering() {
    let mut rng = StdRng::seed_from_u64(29);
    for &(r, c) in &[(4, 4), (6, 3), (3, 6), (1, 4)] {
        let m = random(&mut rng, r, c);
        let svd = m.svd();
        let u = svd.u().unwrap();
        let v = svd.v().unwrap();
        assert_matrix_near(&(u * svd.e().unwrap()).mul_tr(v), &m, TOL);
        orthonormal_columns(u);
        orthonormal_columns(v);

        let sigma = svd.singular_values().unwrap();
        assert!(sigma.iter().all(|&s| s >= 0.0));
        assert!(sigma.windows(2).all(|w| w[0] >= w[1]));
    }
}

#[test]
fn svd_rank_matches_rank_revealing_qr() {
    let mut rng = StdRng::seed_from_u64(31);
    for &(r, k, c) in &[(6, 3, 5), (5, 2, 7), (4, 4, 4), (6, 1, 6)] {
        let m = &random(&mut rng, r, k) * &random(&mut rng, k, c);
        assert_eq!(m.svd().rank().unwrap(), k);
        assert_eq!(m.rrqr().rank().unwrap(), k);
        assert_eq!(m.rank().unwrap(), k);
    }
}

#[test]
fn svd_determinant_matches_gauss() {
    let mut rng = StdRng::seed_from_u64(37);
    for n in 2..=5 {
        let m = random(&mut rng, n, n);
        assert_relative_eq!(
            m.svd().determinant().unwrap(),
            m.gauss().determinant().unwrap(),
            max_relative = 1e-9
        );
    }
}

#[test]
fn moore_penrose_identities() {
    let mut rng = StdRng::seed_from_u64(41);
    for &(r, c) in &[(5, 3), (3, 5)] {
        let m = random(&mut rng, r, c);
        for method in [Method::Householder, Method::GramSchmidt, Method::RankRevealing, Method::Svd] {
            let pinv = Solver::new(Hints::new(&m), method)
                .unwrap()
                .pseudoinverse()
                .unwrap();
            assert_eq!((pinv.nrows(), pinv.ncols()), (c, r));
            assert_matrix_near(&(&(&m * &pinv) * &m), &m, TOL);
            assert_matrix_near(&(&(&pinv * &m) * &pinv), &pinv, TOL);
            let mp = &m * &pinv;
            assert_matrix_near(&mp, &mp.transpose(), TOL);
        }
    }
}

#[test]
fn wide_systems_get_minimum_norm_solution() {
    let mut rng = StdRng::seed_from_u64(43);
    let m = random(&mut rng, 3, 6);
    let b = random(&mut rng, 3, 1);
    // x = Mᵗ·(M·Mᵗ)⁻¹·b
    let expected = m.tr_mul(&m.mul_tr(&m).solve(&b).unwrap());
    for method in [Method::Householder, Method::GramSchmidt, Method::RankRevealing, Method::Svd] {
        let x = Solver::new(Hints::new(&m), method).unwrap().approx(&b).unwrap();
        assert_matrix_near(&x, &expected, TOL);
    }
    assert_matrix_near(&m.approx(&b).unwrap(), &expected, TOL);
}

#[test]
fn tall_systems_get_least_squares_solution() {
    let mut rng = StdRng::seed_from_u64(47);
    let m = random(&mut rng, 8, 3);
    let b = random(&mut rng, 8, 2);
    // normal equations: (MᵗM)·x = Mᵗb
    let expected = m.tr_mul(&m).solve(&m.tr_mul(&b)).unwrap();
    for method in [Method::Householder, Method::GramSchmidt, Method::RankRevealing, Method::Svd] {
        let x = Solver::new(Hints::new(&m), method).unwrap().approx(&b).unwrap();
        assert_matrix_near(&x, &expected, 1e-8);
    }
}

// ── Cache behavior ───────────────────────────────────────────────────

#[test]
fn accessors_return_the_cached_factor() {
    let m = DynMatrix::from_rows(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let svd = m.svd();
    assert_eq!(svd.cache_state(), CacheState::Uninitialized);
    let first = svd.u().unwrap() as *const DynMatrix<f64>;
    let second = svd.u().unwrap() as *const DynMatrix<f64>;
    assert!(core::ptr::eq(first, second));
    assert_eq!(svd.cache_state(), CacheState::Factorized);
}

#[test]
fn invalidate_picks_up_edits() {
    let m = DynMatrix::from_rows(2, 2, &[2.0, 0.0, 0.0, 3.0]);
    let mut svd = m.svd();
    assert_eq!(svd.rank().unwrap(), 2);
    svd.source_mut()[(1, 1)] = 0.0;
    // stale until invalidated
    assert_eq!(svd.rank().unwrap(), 2);
    svd.invalidate();
    assert_eq!(svd.rank().unwrap(), 1);
}

#[test]
fn permutation_matrices_are_tagged() {
    let mut p = Permutation::identity(3);
    assert_eq!(p.to_matrix::<f64>().structure(), Structure::Diagonal);
    p.swap(0, 1);
    assert_eq!(p.to_matrix::<f64>().structure(), Structure::Orthogonal);
    assert_eq!(p.sign::<f64>(), -1.0);
}

// ── f32 at the default tolerance ────────────────────────────────────

#[test]
fn f32_factorizations_reconstruct() {
    let mut rng = StdRng::seed_from_u64(41);
    for &(r, c) in &[(4, 4), (8, 8), (12, 12), (7, 3), (3, 7)] {
        let m = random_f32(&mut rng, r, c);

        let lu = m.gauss();
        let pmq = &(&lu.p().unwrap() * &m) * &lu.q().unwrap();
        assert_matrix_near(&(lu.l().unwrap() * lu.u().unwrap()), &pmq, 1e-4);

        let hh = m.householder();
        assert_matrix_near(&(hh.q().unwrap() * hh.r().unwrap()), &m, 1e-4);
        let q = hh.q().unwrap();
        assert_matrix_near(&q.tr_mul(q), &DynMatrix::identity(q.ncols()), 1e-4);

        let qr = m.rrqr();
        let p = qr.p().unwrap();
        if r >= c {
            assert_matrix_near(&(qr.q().unwrap() * qr.r().unwrap()), &(&m * &p), 1e-4);
        } else {
            let prq = &(&p * qr.r().unwrap()) * qr.q().unwrap();
            assert_matrix_near(&prq, &m, 1e-4);
        }

        let svd = m.svd();
        let usv = (svd.u().unwrap() * svd.e().unwrap()).mul_tr(svd.v().unwrap());
        assert_matrix_near(&usv, &m, 1e-3);
        let sigma = svd.singular_values().unwrap();
        assert!(sigma.windows(2).all(|w| w[0] >= w[1]));

        assert_eq!(qr.rank().unwrap(), r.min(c));
        assert_eq!(svd.rank().unwrap(), r.min(c));
    }
}

#[test]
fn f32_cholesky_of_spd() {
    let mut rng = StdRng::seed_from_u64(43);
    for n in [2, 5, 9] {
        let b = random_f32(&mut rng, n, n);
        let mut m = b.tr_mul(&b);
        for i in 0..n {
            m[(i, i)] += n as f32;
        }
        let m = m.with_structure(Structure::Symmetric);
        let chol = m.cholesky().unwrap();
        let r = chol.r().unwrap();
        assert_matrix_near(&r.tr_mul(r), &m, 1e-4);
        assert_relative_eq!(
            chol.determinant().unwrap(),
            m.gauss().determinant().unwrap(),
            max_relative = 1e-3
        );
    }
}

#[test]
fn f32_rank_agreement() {
    let mut rng = StdRng::seed_from_u64(47);
    for &(r, k, c) in &[(6, 3, 5), (5, 2, 7), (8, 1, 4), (4, 4, 4)] {
        let m = &random_f32(&mut rng, r, k) * &random_f32(&mut rng, k, c);
        assert_eq!(m.svd().rank().unwrap(), k);
        assert_eq!(m.rrqr().rank().unwrap(), k);
        let auto = Solver::new(Hints::new(&m), Method::Auto).unwrap();
        assert_eq!(auto.rank().unwrap(), k);
    }
}
