pub mod normalized_laplacian;
pub mod positional;

pub use normalized_laplacian::NormalizedLaplacianBuilder;
pub use positional::{laplacian_positional_encoding, sorted_eigenpairs};
