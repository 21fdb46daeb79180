use csv::Writer;
use ndarray::ArrayView3;

use crate::disc::spatial_discretization::SpatialDiscretization;
use crate::error::Result;

/// One row per volume node: element, physical coordinates and the value of
/// every variable at the node.
pub fn write_to_csv(
    solutions: ArrayView3<f64>,
    disc: &SpatialDiscretization,
    filename: &str,
) -> Result<()> {
    let mut writer = Writer::from_path(filename)?;
    let d = disc.dim();
    let nc = solutions.shape()[2];
    let mut header = vec!["element".to_string()];
    header.extend(["x", "y", "z"].iter().take(d).map(|s| s.to_string()));
    header.extend((0..nc).map(|c| format!("u{c}")));
    writer.write_record(&header)?;

    let coords = &disc.geometry.volume_coordinates;
    for (ielem, u) in solutions.outer_iter().enumerate() {
        let values = disc.operators.volume_interpolation.apply(u);
        for (igp, row) in values.outer_iter().enumerate() {
            let mut record = vec![ielem.to_string()];
            record.extend((0..d).map(|m| coords[[ielem, igp, m]].to_string()));
            record.extend(row.iter().map(|v| v.to_string()));
            writer.write_record(&record)?;
        }
    }
    writer.flush()?;
    Ok(())
}
