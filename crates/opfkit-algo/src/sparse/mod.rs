//! Sparse network matrices and the sensitivity factors derived from them.

pub mod linalg;
pub mod sensitivity;
pub mod susceptance;

pub use sensitivity::{
    compute_branch_ptdf, compute_branch_ptdf_columns, compute_ptdf, PtdfFactors, PtdfTable,
};
pub use susceptance::{
    branch_susceptance_matrix, bus_susceptance_matrix, generator_incidence_matrix,
    grounded_bus_susceptance_matrix, line_incidence_columns, line_incidence_matrix,
    load_incidence_matrix,
};
