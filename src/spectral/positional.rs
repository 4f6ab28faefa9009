use std::cmp::Ordering;

use nalgebra::{Complex, DMatrix, DVector, Schur, SymmetricEigen};
use ndarray::Array2;

use crate::error::{IgError, IgResult};
use crate::graph::GraphRecord;
use crate::spectral::NormalizedLaplacianBuilder;

const SYMMETRY_TOLERANCE: f64 = 1e-12;
const EIGEN_ITERATIONS_PER_NODE: usize = 1_000;
const CLUSTER_TOLERANCE: f64 = 1e-6;
const NULL_TOLERANCE: f64 = 1e-8;

/// Laplacian eigenvectors `1..=dim` (ascending eigenvalue, trivial one skipped),
/// one row per node. Graphs with fewer than `dim + 1` nodes get zero columns on
/// the right.
pub fn laplacian_positional_encoding(record: &GraphRecord, dim: usize) -> IgResult<Array2<f32>> {
    if dim == 0 {
        return Err(IgError::EncodingDimension { requested: dim });
    }
    let n = record.node_count();
    let mut encoding = Array2::zeros((n, dim));
    if n == 0 {
        return Ok(encoding);
    }

    let laplacian = NormalizedLaplacianBuilder::build(record);
    let (_, eigenvectors) = sorted_eigenpairs(&laplacian)?;

    let available = (n - 1).min(dim);
    for col in 0..available {
        for row in 0..n {
            encoding[(row, col)] = eigenvectors[(row, col + 1)] as f32;
        }
    }
    Ok(encoding)
}

/// Eigenpairs by ascending eigenvalue (real part). Non-symmetric input takes
/// eigenvalues from a real Schur form and eigenvectors from the null space of
/// `L - lambda I`, real part kept.
pub fn sorted_eigenpairs(matrix: &DMatrix<f64>) -> IgResult<(Vec<f64>, DMatrix<f64>)> {
    if matrix.nrows() != matrix.ncols() {
        return Err(IgError::EncodingComputation(format!(
            "expected a square matrix, got {}x{}",
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(IgError::EncodingComputation(
            "laplacian contains non-finite entries".to_string(),
        ));
    }
    if matrix.nrows() == 0 {
        return Ok((Vec::new(), DMatrix::zeros(0, 0)));
    }

    if is_symmetric(matrix) {
        symmetric_eigenpairs(matrix)
    } else {
        general_eigenpairs(matrix)
    }
}

fn symmetric_eigenpairs(matrix: &DMatrix<f64>) -> IgResult<(Vec<f64>, DMatrix<f64>)> {
    let n = matrix.nrows();
    let eigen = SymmetricEigen::try_new(matrix.clone(), f64::EPSILON, EIGEN_ITERATIONS_PER_NODE * n)
        .ok_or_else(|| {
            IgError::EncodingComputation(format!("eigen solver did not converge for {n} nodes"))
        })?;

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[a]
            .partial_cmp(&eigen.eigenvalues[b])
            .unwrap_or(Ordering::Equal)
    });
    let eigenvalues = order.iter().map(|&i| eigen.eigenvalues[i]).collect();
    let eigenvectors = DMatrix::from_fn(n, n, |row, col| eigen.eigenvectors[(row, order[col])]);
    Ok((eigenvalues, eigenvectors))
}

fn general_eigenpairs(matrix: &DMatrix<f64>) -> IgResult<(Vec<f64>, DMatrix<f64>)> {
    let n = matrix.nrows();
    let schur = Schur::try_new(matrix.clone(), f64::EPSILON, EIGEN_ITERATIONS_PER_NODE * n)
        .ok_or_else(|| {
            IgError::EncodingComputation(format!("schur decomposition did not converge for {n} nodes"))
        })?;
    let mut eigenvalues: Vec<Complex<f64>> = schur.complex_eigenvalues().iter().copied().collect();
    eigenvalues.sort_by(|a, b| {
        a.re.partial_cmp(&b.re)
            .unwrap_or(Ordering::Equal)
            .then(a.im.partial_cmp(&b.im).unwrap_or(Ordering::Equal))
    });

    let complex = matrix.map(|v| Complex::new(v, 0.0));
    let mut eigenvectors = DMatrix::zeros(n, n);
    let mut start = 0;
    while start < n {
        let lambda = eigenvalues[start];
        let end = (start..n)
            .find(|&i| (eigenvalues[i] - lambda).norm() > CLUSTER_TOLERANCE)
            .unwrap_or(n);
        let vectors = null_vectors(&complex, lambda, end - start)?;
        for (offset, vector) in vectors.into_iter().enumerate() {
            eigenvectors.set_column(start + offset, &vector.map(|c| c.re));
        }
        start = end;
    }

    let eigenvalues = eigenvalues.iter().map(|lambda| lambda.re).collect();
    Ok((eigenvalues, eigenvectors))
}

// a defective eigenvalue repeats its last eigenvector for the missing columns
fn null_vectors(
    matrix: &DMatrix<Complex<f64>>,
    lambda: Complex<f64>,
    count: usize,
) -> IgResult<Vec<DVector<Complex<f64>>>> {
    let n = matrix.nrows();
    let mut shifted = matrix.clone();
    for i in 0..n {
        shifted[(i, i)] -= lambda;
    }
    let svd = shifted
        .try_svd(false, true, f64::EPSILON, EIGEN_ITERATIONS_PER_NODE * n)
        .ok_or_else(|| {
            IgError::EncodingComputation(format!("eigenvector solve did not converge for {n} nodes"))
        })?;
    let v_t = svd
        .v_t
        .ok_or_else(|| IgError::EncodingComputation("missing right singular vectors".to_string()))?;

    let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
    order.sort_by(|&a, &b| {
        svd.singular_values[a]
            .partial_cmp(&svd.singular_values[b])
            .unwrap_or(Ordering::Equal)
    });
    let scale = svd.singular_values.max().max(1.0);

    let mut vectors: Vec<DVector<Complex<f64>>> = Vec::with_capacity(count);
    for (rank, &idx) in order.iter().enumerate().take(count) {
        if rank > 0 && svd.singular_values[idx] > NULL_TOLERANCE * scale {
            break;
        }
        vectors.push(real_pivot(v_t.row(idx).adjoint()));
    }
    while vectors.len() < count {
        match vectors.last() {
            Some(last) => vectors.push(last.clone()),
            None => break,
        }
    }
    Ok(vectors)
}

// largest-modulus component becomes real and positive
fn real_pivot(vector: DVector<Complex<f64>>) -> DVector<Complex<f64>> {
    let pivot = vector
        .iter()
        .copied()
        .max_by(|a, b| a.norm().partial_cmp(&b.norm()).unwrap_or(Ordering::Equal));
    match pivot {
        Some(p) if p.norm() > 0.0 => {
            let rotation = p.conj() / p.norm();
            vector.map(|c| c * rotation)
        }
        _ => vector,
    }
}

fn is_symmetric(matrix: &DMatrix<f64>) -> bool {
    let n = matrix.nrows();
    (0..n).all(|i| (i + 1..n).all(|j| (matrix[(i, j)] - matrix[(j, i)]).abs() <= SYMMETRY_TOLERANCE))
}
