//! Canonical reference domains.
//!
//! line `[-1,1]`, quad `[-1,1]^2`, hex `[-1,1]^3`,
//! tri `{ξ1+ξ2 <= 0}`, tet `{ξ1+ξ2+ξ3 <= -1}` (all coordinates >= -1).
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, array};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    Line,
    Quad,
    Hex,
    Tri,
    Tet,
}

const LINE_FACETS: [&[usize]; 2] = [&[0], &[1]];
const QUAD_FACETS: [&[usize]; 4] = [&[0, 2], &[1, 3], &[0, 1], &[2, 3]];
const HEX_FACETS: [&[usize]; 6] = [
    &[0, 2, 4, 6],
    &[1, 3, 5, 7],
    &[0, 1, 4, 5],
    &[2, 3, 6, 7],
    &[0, 1, 2, 3],
    &[4, 5, 6, 7],
];
const TRI_FACETS: [&[usize]; 3] = [&[0, 2], &[1, 2], &[0, 1]];
const TET_FACETS: [&[usize]; 4] = [&[0, 2, 3], &[1, 2, 3], &[0, 1, 3], &[0, 1, 2]];

impl Shape {
    pub fn dim(&self) -> usize {
        match self {
            Shape::Line => 1,
            Shape::Quad | Shape::Tri => 2,
            Shape::Hex | Shape::Tet => 3,
        }
    }
    pub fn is_simplex(&self) -> bool {
        matches!(self, Shape::Tri | Shape::Tet)
    }
    pub fn num_vertices(&self) -> usize {
        match self {
            Shape::Line => 2,
            Shape::Quad => 4,
            Shape::Hex => 8,
            Shape::Tri => 3,
            Shape::Tet => 4,
        }
    }
    pub fn num_facets(&self) -> usize {
        self.facet_vertex_table().len()
    }
    /// The shape of each facet (`None` for the point facets of a line).
    pub fn facet_shape(&self) -> Option<Shape> {
        match self {
            Shape::Line => None,
            Shape::Quad | Shape::Tri => Some(Shape::Line),
            Shape::Hex => Some(Shape::Quad),
            Shape::Tet => Some(Shape::Tri),
        }
    }
    fn facet_vertex_table(&self) -> &'static [&'static [usize]] {
        match self {
            Shape::Line => &LINE_FACETS,
            Shape::Quad => &QUAD_FACETS,
            Shape::Hex => &HEX_FACETS,
            Shape::Tri => &TRI_FACETS,
            Shape::Tet => &TET_FACETS,
        }
    }
    /// Local vertex indices of facet `f`.
    pub fn facet_vertices(&self, f: usize) -> &'static [usize] {
        self.facet_vertex_table()[f]
    }
    /// Vertex coordinates, one row per vertex.
    pub fn vertices(&self) -> Array2<f64> {
        match self {
            Shape::Line => array![[-1.0], [1.0]],
            Shape::Quad => array![[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]],
            Shape::Hex => Array2::from_shape_fn((8, 3), |(v, m)| {
                if (v >> m) & 1 == 1 { 1.0 } else { -1.0 }
            }),
            Shape::Tri => array![[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0]],
            Shape::Tet => array![
                [-1.0, -1.0, -1.0],
                [1.0, -1.0, -1.0],
                [-1.0, 1.0, -1.0],
                [-1.0, -1.0, 1.0]
            ],
        }
    }
    pub fn centroid(&self) -> Array1<f64> {
        let v = self.vertices();
        v.sum_axis(ndarray::Axis(0)) / v.nrows() as f64
    }
    /// Reference measure (length, area or volume).
    pub fn measure(&self) -> f64 {
        match self {
            Shape::Line => 2.0,
            Shape::Quad => 4.0,
            Shape::Hex => 8.0,
            Shape::Tri => 2.0,
            Shape::Tet => 4.0 / 3.0,
        }
    }
    /// Maps facet-parameter points (rows, `d-1` columns) of facet `f` to
    /// reference coordinates.
    ///
    /// Tensor shapes use the remaining axes in increasing order as the facet
    /// parameters. Simplex facets are parametrized affinely over the reference
    /// line / triangle through the facet's vertices in the listed order.
    pub fn map_facet_points(&self, f: usize, params: ArrayView2<f64>) -> Array2<f64> {
        let d = self.dim();
        let n = params.nrows();
        match self {
            Shape::Line => Array2::from_elem((n.max(1), 1), if f == 0 { -1.0 } else { 1.0 }),
            Shape::Quad | Shape::Hex => {
                let (axis, side) = (f / 2, f % 2);
                let mut out = Array2::zeros((n, d));
                for i in 0..n {
                    let mut c = 0;
                    for m in 0..d {
                        out[[i, m]] = if m == axis {
                            if side == 0 { -1.0 } else { 1.0 }
                        } else {
                            c += 1;
                            params[[i, c - 1]]
                        };
                    }
                }
                out
            }
            Shape::Tri | Shape::Tet => {
                let verts = self.vertices();
                let fv = self.facet_vertices(f);
                let mut out = Array2::zeros((n, d));
                for i in 0..n {
                    let lambda = facet_barycentric(params.row(i));
                    for (local, &v) in fv.iter().enumerate() {
                        for m in 0..d {
                            out[[i, m]] += lambda[local] * verts[[v, m]];
                        }
                    }
                }
                out
            }
        }
    }
    /// Outward normal of facet `f` scaled by the Jacobian of its
    /// parametrization, so that `∮ g n dS = Σ_j w_j g(ξ_j) n̂_f` for a facet
    /// rule with weights `w_j` in parameter space.
    pub fn reference_normal(&self, f: usize) -> Array1<f64> {
        let d = self.dim();
        match self {
            Shape::Line => array![if f == 0 { -1.0 } else { 1.0 }],
            Shape::Quad | Shape::Hex => {
                let mut n = Array1::zeros(d);
                n[f / 2] = if f % 2 == 0 { -1.0 } else { 1.0 };
                n
            }
            Shape::Tri => {
                let verts = self.vertices();
                let fv = self.facet_vertices(f);
                let t = (&verts.row(fv[1]) - &verts.row(fv[0])) * 0.5;
                let n = array![t[1], -t[0]];
                self.orient_outward(f, n)
            }
            Shape::Tet => {
                let verts = self.vertices();
                let fv = self.facet_vertices(f);
                let ts = (&verts.row(fv[1]) - &verts.row(fv[0])) * 0.5;
                let tt = (&verts.row(fv[2]) - &verts.row(fv[0])) * 0.5;
                let n = cross(ts.view(), tt.view());
                self.orient_outward(f, n)
            }
        }
    }
    fn orient_outward(&self, f: usize, n: Array1<f64>) -> Array1<f64> {
        let verts = self.vertices();
        let fv = self.facet_vertices(f);
        let mut facet_centroid = Array1::<f64>::zeros(self.dim());
        for &v in fv {
            facet_centroid += &verts.row(v);
        }
        facet_centroid /= fv.len() as f64;
        let outward = facet_centroid - self.centroid();
        if n.dot(&outward) < 0.0 { -n } else { n }
    }
    /// Collapse map from the square/cube onto the simplex.
    ///
    /// tri: `ξ1 = (1+a)(1-b)/2 - 1`, `ξ2 = b`;
    /// tet: `ξ1 = (1+a)(1-b)(1-c)/4 - 1`, `ξ2 = (1+b)(1-c)/2 - 1`, `ξ3 = c`.
    pub fn collapse(&self, eta: ArrayView1<f64>) -> Array1<f64> {
        match self {
            Shape::Tri => {
                let (a, b) = (eta[0], eta[1]);
                array![0.5 * (1.0 + a) * (1.0 - b) - 1.0, b]
            }
            Shape::Tet => {
                let (a, b, c) = (eta[0], eta[1], eta[2]);
                array![
                    0.25 * (1.0 + a) * (1.0 - b) * (1.0 - c) - 1.0,
                    0.5 * (1.0 + b) * (1.0 - c) - 1.0,
                    c
                ]
            }
            _ => eta.to_owned(),
        }
    }
    /// Simplex facets of the collapsed square/cube, in the order of
    /// [`Shape::facet_vertices`]: `(axis, side)` of the computational facet.
    /// The remaining computational facets are degenerate (collapsed onto a
    /// vertex or an edge).
    pub fn collapsed_facets(&self) -> &'static [(usize, usize)] {
        match self {
            Shape::Tri => &[(0, 0), (0, 1), (1, 0)],
            Shape::Tet => &[(0, 0), (0, 1), (1, 0), (2, 0)],
            _ => &[],
        }
    }
}

/// Barycentric weights of a point of the reference line (1 parameter) or the
/// reference triangle (2 parameters).
fn facet_barycentric(p: ArrayView1<f64>) -> Vec<f64> {
    match p.len() {
        1 => vec![0.5 * (1.0 - p[0]), 0.5 * (1.0 + p[0])],
        _ => vec![-0.5 * (p[0] + p[1]), 0.5 * (1.0 + p[0]), 0.5 * (1.0 + p[1])],
    }
}

pub fn cross(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Array1<f64> {
    array![
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0]
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn reference_normals_close_the_boundary() {
        // Σ_f |facet| n_f = 0 for every closed reference domain.
        for shape in [Shape::Line, Shape::Quad, Shape::Hex, Shape::Tri, Shape::Tet] {
            let facet_measure = match shape.facet_shape() {
                None => 1.0,
                Some(s) => s.measure(),
            };
            let mut total = Array1::<f64>::zeros(shape.dim());
            for f in 0..shape.num_facets() {
                total += &(shape.reference_normal(f) * facet_measure);
            }
            for v in total.iter() {
                assert_relative_eq!(*v, 0.0, epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn hypotenuse_normal_is_scaled_by_edge_length() {
        let n = Shape::Tri.reference_normal(1);
        assert_relative_eq!(n[0], 1.0, epsilon = 1e-15);
        assert_relative_eq!(n[1], 1.0, epsilon = 1e-15);
    }

    #[test]
    fn facet_points_lie_on_facets() {
        let params = array![[-0.5, -0.2], [0.1, -0.6]];
        for f in 0..4 {
            let pts = Shape::Tet.map_facet_points(f, params.view());
            for p in pts.rows() {
                let on_facet = match f {
                    0 => p[0] + 1.0,
                    1 => p[0] + p[1] + p[2] + 1.0,
                    2 => p[1] + 1.0,
                    _ => p[2] + 1.0,
                };
                assert_relative_eq!(on_facet, 0.0, epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn collapse_maps_cube_facets_onto_tet_facets() {
        let eta = array![1.0, 0.3, -0.4];
        let xi = Shape::Tet.collapse(eta.view());
        assert_relative_eq!(xi[0] + xi[1] + xi[2], -1.0, epsilon = 1e-14);
        let eta = array![0.2, 1.0];
        let xi = Shape::Tri.collapse(eta.view());
        assert_relative_eq!(xi[0], -1.0, epsilon = 1e-14);
        assert_relative_eq!(xi[1], 1.0, epsilon = 1e-14);
    }
}
