pub mod basis;
pub mod boundary;
pub mod conservation_law;
pub mod flux;
pub mod gauss_points;
pub mod geometric;
pub mod linalg;
pub mod mesh;
pub mod operators;
pub mod quadrature;
pub mod reference_approximation;
pub mod reference_element;
pub mod riemann_solver;
pub mod spatial_discretization;
