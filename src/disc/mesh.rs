//! Unstructured meshes of a single element shape.
use hashbrown::HashMap;
use ndarray::{Array1, Array3, ArrayView1, ArrayView2, Axis, s};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::disc::basis::mapping::MappingBasis;
use crate::disc::reference_element::Shape;
use crate::error::{Error, Result};

pub mod uniform;

pub use uniform::{sine_warp, uniform_mesh, uniform_periodic_mesh};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BoundaryTag {
    Left,
    Right,
    Lower,
    Upper,
    Back,
    Front,
    Custom(u32),
}

#[derive(Clone, Debug, PartialEq)]
pub enum FacetConnection {
    /// `offset` translates points of this facet onto the matching facet
    /// (non-zero across periodic boundaries).
    Interior {
        element: usize,
        facet: usize,
        offset: [f64; 3],
    },
    Boundary(BoundaryTag),
}

#[derive(Clone, Debug)]
pub struct Mesh {
    pub shape: Shape,
    pub mapping_degree: usize,
    /// `(K, N_map, d)`: coordinates of the mapping nodes of every element.
    pub mapping_nodes: Array3<f64>,
    /// Per element, per facet.
    pub connectivity: Vec<Vec<FacetConnection>>,
}

impl Mesh {
    pub fn num_elements(&self) -> usize {
        self.mapping_nodes.shape()[0]
    }
    pub fn dim(&self) -> usize {
        self.shape.dim()
    }
    /// Builds a mesh from vertex coordinates and element-to-vertex lists.
    ///
    /// `periodic_ids[v]` is the canonical vertex that `v` is identified with
    /// (itself when not periodic). Facets whose canonical vertex sets coincide
    /// are connected; unmatched facets are tagged by `tagger` from their
    /// centroid.
    pub fn from_elements(
        shape: Shape,
        vertices: ArrayView2<f64>,
        elements: &[Vec<usize>],
        periodic_ids: &[usize],
        mapping_degree: usize,
        tagger: impl Fn(ArrayView1<f64>) -> BoundaryTag,
    ) -> Result<Self> {
        let d = shape.dim();
        if vertices.ncols() != d {
            return Err(Error::ConfigurationMismatch(format!(
                "{d}-dimensional {shape:?} mesh given {}-dimensional vertices",
                vertices.ncols()
            )));
        }
        if periodic_ids.len() != vertices.nrows() {
            return Err(Error::ConfigurationMismatch(
                "one periodic identifier per vertex is required".to_string(),
            ));
        }
        let nv = shape.num_vertices();
        if let Some(bad) = elements.iter().position(|e| {
            e.len() != nv || e.iter().any(|&v| v >= vertices.nrows())
        }) {
            return Err(Error::ConfigurationMismatch(format!(
                "element {bad} does not list {nv} valid vertices"
            )));
        }

        let elements: Vec<Vec<usize>> = elements
            .iter()
            .map(|element| canonical_vertex_order(shape, element, periodic_ids))
            .collect();

        let vertex_map = MappingBasis::new(shape, 1)?;
        let mapping = MappingBasis::new(shape, mapping_degree)?;
        let to_nodes = vertex_map.interpolation_matrix(mapping.nodes.view());
        let k = elements.len();
        let mut mapping_nodes = Array3::<f64>::zeros((k, mapping.num_nodes(), d));
        for (e, element) in elements.iter().enumerate() {
            let corners = vertices.select(Axis(0), element);
            mapping_nodes
                .slice_mut(s![e, .., ..])
                .assign(&to_nodes.dot(&corners));
        }

        let facet_centroid = |e: usize, f: usize| -> Array1<f64> {
            let fv = shape.facet_vertices(f);
            let mut c = Array1::<f64>::zeros(d);
            for &lv in fv {
                c += &vertices.row(elements[e][lv]);
            }
            c / fv.len() as f64
        };

        let mut facet_map: HashMap<Vec<usize>, Vec<(usize, usize)>> = HashMap::new();
        for (e, element) in elements.iter().enumerate() {
            for f in 0..shape.num_facets() {
                let mut key: Vec<usize> = shape
                    .facet_vertices(f)
                    .iter()
                    .map(|&lv| periodic_ids[element[lv]])
                    .collect();
                key.sort_unstable();
                facet_map.entry(key).or_default().push((e, f));
            }
        }

        let mut connectivity: Vec<Vec<FacetConnection>> = (0..k)
            .map(|_| vec![FacetConnection::Boundary(BoundaryTag::Custom(0)); shape.num_facets()])
            .collect();
        for (key, sharing) in facet_map.iter() {
            match sharing.as_slice() {
                [(e, f)] => {
                    connectivity[*e][*f] =
                        FacetConnection::Boundary(tagger(facet_centroid(*e, *f).view()));
                }
                [(e0, f0), (e1, f1)] => {
                    let delta = facet_centroid(*e1, *f1) - facet_centroid(*e0, *f0);
                    let mut offset = [0.0; 3];
                    for m in 0..d {
                        offset[m] = delta[m];
                    }
                    connectivity[*e0][*f0] = FacetConnection::Interior {
                        element: *e1,
                        facet: *f1,
                        offset,
                    };
                    connectivity[*e1][*f1] = FacetConnection::Interior {
                        element: *e0,
                        facet: *f0,
                        offset: offset.map(|v| -v),
                    };
                }
                _ => {
                    return Err(Error::ConfigurationMismatch(format!(
                        "facet with vertices {key:?} is shared by {} elements",
                        sharing.len()
                    )));
                }
            }
        }

        info!(
            ?shape,
            elements = k,
            mapping_degree,
            "built mesh"
        );
        Ok(Self {
            shape,
            mapping_degree,
            mapping_nodes,
            connectivity,
        })
    }

    /// Moves every mapping node through `f`, producing a curvilinear mesh.
    /// Periodic offsets are kept, so `f` must be periodic itself across
    /// periodic boundaries.
    pub fn warp(&mut self, f: impl Fn(ArrayView1<f64>) -> Array1<f64>) {
        for mut node in self.mapping_nodes.lanes_mut(Axis(2)) {
            let moved = f(node.view());
            node.assign(&moved);
        }
    }

    /// Mapping node coordinates of element `e`, `(N_map, d)`.
    pub fn element_nodes(&self, e: usize) -> ArrayView2<f64> {
        self.mapping_nodes.index_axis(Axis(0), e)
    }

    pub fn boundary_tags(&self) -> Vec<BoundaryTag> {
        let mut tags: Vec<BoundaryTag> = self
            .connectivity
            .iter()
            .flatten()
            .filter_map(|c| match c {
                FacetConnection::Boundary(tag) => Some(*tag),
                FacetConnection::Interior { .. } => None,
            })
            .collect();
        tags.sort();
        tags.dedup();
        tags
    }
}

/// Tetrahedra are renumbered so that local vertex order follows the
/// canonical vertex ids, up to a swap of the first two vertices that keeps
/// the orientation of the input. Collapsed face grids are invariant under
/// swapping the two lower vertices of a face, so every shared face then
/// collapses towards the same vertex from both sides.
fn canonical_vertex_order(shape: Shape, element: &[usize], periodic_ids: &[usize]) -> Vec<usize> {
    if shape != Shape::Tet {
        return element.to_vec();
    }
    let mut order: Vec<usize> = (0..element.len()).collect();
    order.sort_by_key(|&lv| (periodic_ids[element[lv]], element[lv]));
    let mut sorted: Vec<usize> = order.iter().map(|&lv| element[lv]).collect();
    if permutation_is_odd(&order) {
        sorted.swap(0, 1);
    }
    sorted
}

fn permutation_is_odd(order: &[usize]) -> bool {
    let mut inversions = 0;
    for i in 0..order.len() {
        for j in i + 1..order.len() {
            if order[i] > order[j] {
                inversions += 1;
            }
        }
    }
    inversions % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn two_triangles_share_an_edge() {
        let vertices = array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        let elements = vec![vec![0, 1, 2], vec![3, 2, 1]];
        let mesh = Mesh::from_elements(
            Shape::Tri,
            vertices.view(),
            &elements,
            &[0, 1, 2, 3],
            1,
            |_| BoundaryTag::Custom(7),
        )
        .unwrap();
        // hypotenuse of the first triangle is facet 1 (vertices 1 and 2)
        assert!(matches!(
            mesh.connectivity[0][1],
            FacetConnection::Interior { element: 1, facet: 1, .. }
        ));
        assert_eq!(mesh.connectivity[0][0], FacetConnection::Boundary(BoundaryTag::Custom(7)));
        assert_eq!(mesh.boundary_tags(), vec![BoundaryTag::Custom(7)]);
    }

    #[test]
    fn tetrahedra_are_renumbered_by_vertex_id() {
        assert_eq!(canonical_vertex_order(Shape::Tet, &[4, 3, 2, 1], &[0, 1, 2, 3, 4]), vec![1, 2, 3, 4]);
        assert_eq!(canonical_vertex_order(Shape::Tet, &[4, 1, 3, 2], &[0, 1, 2, 3, 4]), vec![1, 2, 3, 4]);
        // an odd reordering swaps the two lowest vertices
        assert_eq!(canonical_vertex_order(Shape::Tet, &[1, 2, 4, 3], &[0, 1, 2, 3, 4]), vec![2, 1, 3, 4]);
        // periodic images sort by the vertex they are identified with
        assert_eq!(canonical_vertex_order(Shape::Tet, &[5, 1, 2, 3], &[0, 1, 2, 3, 4, 0]), vec![5, 1, 2, 3]);
        assert_eq!(canonical_vertex_order(Shape::Tri, &[2, 0, 1], &[0, 1, 2]), vec![2, 0, 1]);
    }

    #[test]
    fn periodic_line_wraps_around() {
        let vertices = array![[0.0], [0.5], [1.0]];
        let elements = vec![vec![0, 1], vec![1, 2]];
        let mesh =
            Mesh::from_elements(Shape::Line, vertices.view(), &elements, &[0, 1, 0], 2, |_| {
                BoundaryTag::Left
            })
            .unwrap();
        match &mesh.connectivity[0][0] {
            FacetConnection::Interior {
                element,
                facet,
                offset,
            } => {
                assert_eq!((*element, *facet), (1, 1));
                assert_eq!(offset[0], 1.0);
            }
            other => panic!("expected a periodic connection, got {other:?}"),
        }
        assert_eq!(mesh.mapping_nodes.shape(), &[2, 3, 1]);
        approx::assert_relative_eq!(mesh.mapping_nodes[[1, 1, 0]], 0.75, epsilon = 1e-14);
    }
}
