//! Axis-aligned box meshes.
use ndarray::{Array1, Array2, ArrayView1};

use super::{BoundaryTag, Mesh};
use crate::disc::reference_element::Shape;
use crate::error::{Error, Result};

/// Box `[lower, upper]` split into `elements[m]` cells along axis `m`.
/// Triangles split each square along its anti-diagonal; tetrahedra use the
/// six-tetrahedron Kuhn split of each cube.
pub fn uniform_mesh(
    shape: Shape,
    elements: &[usize],
    lower: &[f64],
    upper: &[f64],
    mapping_degree: usize,
) -> Result<Mesh> {
    box_mesh(shape, elements, lower, upper, mapping_degree, false)
}

/// As [`uniform_mesh`], periodic in every direction. At least three cells are
/// needed along each axis so that facets are identified unambiguously.
pub fn uniform_periodic_mesh(
    shape: Shape,
    elements: &[usize],
    lower: &[f64],
    upper: &[f64],
    mapping_degree: usize,
) -> Result<Mesh> {
    box_mesh(shape, elements, lower, upper, mapping_degree, true)
}

/// Smooth perturbation of the box `[lower, upper]` that vanishes on its
/// boundary and is periodic across it:
/// `x_m += amplitude (upper_m − lower_m) Π_k sin(2π (x_k − lower_k) / (upper_k − lower_k))`.
pub fn sine_warp(
    lower: &[f64],
    upper: &[f64],
    amplitude: f64,
) -> impl Fn(ArrayView1<f64>) -> Array1<f64> + use<> {
    let lower = lower.to_vec();
    let upper = upper.to_vec();
    move |x: ArrayView1<f64>| {
        let bump: f64 = (0..x.len())
            .map(|k| {
                let t = (x[k] - lower[k]) / (upper[k] - lower[k]);
                (2.0 * std::f64::consts::PI * t).sin()
            })
            .product();
        Array1::from_shape_fn(x.len(), |m| x[m] + amplitude * (upper[m] - lower[m]) * bump)
    }
}

fn box_mesh(
    shape: Shape,
    elements: &[usize],
    lower: &[f64],
    upper: &[f64],
    mapping_degree: usize,
    periodic: bool,
) -> Result<Mesh> {
    let d = shape.dim();
    if elements.len() != d || lower.len() != d || upper.len() != d {
        return Err(Error::ConfigurationMismatch(format!(
            "a {shape:?} box needs {d} element counts and bounds"
        )));
    }
    let min_cells = if periodic && d > 1 { 3 } else { 1 };
    if elements.iter().any(|&n| n < min_cells) {
        return Err(Error::ConfigurationMismatch(format!(
            "at least {min_cells} elements per direction are required"
        )));
    }
    if (0..d).any(|m| upper[m] <= lower[m]) {
        return Err(Error::ConfigurationMismatch(
            "upper bounds must exceed lower bounds".to_string(),
        ));
    }

    let counts: Vec<usize> = elements.iter().map(|n| n + 1).collect();
    let num_vertices: usize = counts.iter().product();
    let index = |ijk: &[usize]| -> usize {
        ijk.iter()
            .zip(counts.iter())
            .rev()
            .fold(0, |acc, (&i, &c)| acc * c + i)
    };
    let mut vertices = Array2::<f64>::zeros((num_vertices, d));
    let mut periodic_ids = vec![0; num_vertices];
    for v in 0..num_vertices {
        let ijk = unravel(v, &counts);
        for m in 0..d {
            vertices[[v, m]] =
                lower[m] + (upper[m] - lower[m]) * ijk[m] as f64 / elements[m] as f64;
        }
        periodic_ids[v] = if periodic {
            let wrapped: Vec<usize> = ijk
                .iter()
                .zip(elements.iter())
                .map(|(&i, &n)| i % n)
                .collect();
            index(&wrapped)
        } else {
            v
        };
    }

    let num_cells: usize = elements.iter().product();
    let mut cells: Vec<Vec<usize>> = Vec::new();
    for c in 0..num_cells {
        let ijk = unravel(c, elements);
        let corner = |bits: usize| -> usize {
            let shifted: Vec<usize> = (0..d).map(|m| ijk[m] + ((bits >> m) & 1)).collect();
            index(&shifted)
        };
        match shape {
            Shape::Line | Shape::Quad | Shape::Hex => {
                cells.push((0..1 << d).map(corner).collect());
            }
            Shape::Tri => {
                cells.push(vec![corner(0), corner(1), corner(2)]);
                cells.push(vec![corner(3), corner(2), corner(1)]);
            }
            Shape::Tet => {
                // Kuhn paths from the lowest to the highest corner. Odd
                // permutations swap their first two vertices to keep a
                // positive orientation.
                const PATHS: [([usize; 3], bool); 6] = [
                    ([0, 1, 2], true),
                    ([1, 2, 0], true),
                    ([2, 0, 1], true),
                    ([0, 2, 1], false),
                    ([1, 0, 2], false),
                    ([2, 1, 0], false),
                ];
                for (sigma, even) in PATHS {
                    let b1 = 1 << sigma[0];
                    let b2 = b1 | (1 << sigma[1]);
                    let path = [corner(0), corner(b1), corner(b2), corner(7)];
                    if even {
                        cells.push(path.to_vec());
                    } else {
                        cells.push(vec![path[1], path[0], path[2], path[3]]);
                    }
                }
            }
        }
    }

    let tol = 1e-10;
    let tagger = |centroid: ArrayView1<f64>| -> BoundaryTag {
        const TAGS: [(BoundaryTag, BoundaryTag); 3] = [
            (BoundaryTag::Left, BoundaryTag::Right),
            (BoundaryTag::Lower, BoundaryTag::Upper),
            (BoundaryTag::Back, BoundaryTag::Front),
        ];
        for m in 0..d {
            let scale = upper[m] - lower[m];
            if (centroid[m] - lower[m]).abs() < tol * scale {
                return TAGS[m].0;
            }
            if (centroid[m] - upper[m]).abs() < tol * scale {
                return TAGS[m].1;
            }
        }
        BoundaryTag::Custom(0)
    };
    Mesh::from_elements(
        shape,
        vertices.view(),
        &cells,
        &periodic_ids,
        mapping_degree,
        tagger,
    )
}

/// Multi-index of `flat` in a grid of extents `dims`, first axis fastest.
fn unravel(flat: usize, dims: &[usize]) -> Vec<usize> {
    let mut rest = flat;
    dims.iter()
        .map(|&n| {
            let i = rest % n;
            rest /= n;
            i
        })
        .collect()
}
