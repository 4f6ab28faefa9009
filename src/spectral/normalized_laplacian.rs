use nalgebra::DMatrix;
use petgraph::visit::EdgeRef;

use crate::graph::GraphRecord;

/// \( L = I - D^{-1/2} A D^{-1/2} \) over unit edge weights, in-degrees clamped to 1.
pub struct NormalizedLaplacianBuilder;

impl NormalizedLaplacianBuilder {
    pub fn build(record: &GraphRecord) -> DMatrix<f64> {
        let n = record.node_count();
        if n == 0 {
            return DMatrix::zeros(0, 0);
        }

        let adjacency = Self::adjacency(record);
        let inv_sqrt: Vec<f64> = (0..n)
            .map(|col| adjacency.column(col).sum().max(1.0).powf(-0.5))
            .collect();

        let mut laplacian = DMatrix::identity(n, n);
        for i in 0..n {
            for j in 0..n {
                let a = adjacency[(i, j)];
                if a != 0.0 {
                    laplacian[(i, j)] -= inv_sqrt[i] * a * inv_sqrt[j];
                }
            }
        }
        laplacian
    }

    pub fn adjacency(record: &GraphRecord) -> DMatrix<f64> {
        let n = record.node_count();
        let mut adjacency = DMatrix::zeros(n, n);
        for edge in record.graph.edge_references() {
            adjacency[(edge.source().index(), edge.target().index())] += 1.0;
        }
        adjacency
    }
}
