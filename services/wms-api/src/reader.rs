//! Reader for raw binary grids.
//!
//! Each variable is stored as `{dataset.location}/{variable_id}.bin`: a flat
//! array of little-endian `f32` ordered `[t][z][y][x]`. The lattice is the
//! variable's registry bbox split into `nx` by `ny` equal cells, row 0 at
//! `min_y` (south). Sampling is nearest neighbour on cell centres.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, instrument};

use wms_common::{BoundingBox, Dataset, Variable, WmsError, WmsResult};
use wms_protocol::dimension::elevation_index;

use crate::pipeline::DataReader;

/// Reads `.bin` files from each dataset's location directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawGridReader;

impl RawGridReader {
    pub fn new() -> Self {
        Self
    }

    /// Path of the file holding `variable_id`.
    pub fn variable_path(dataset: &Dataset, variable_id: &str) -> PathBuf {
        Path::new(&dataset.location).join(format!("{}.bin", variable_id))
    }
}

#[async_trait]
impl DataReader for RawGridReader {
    #[instrument(skip(self, dataset, lat_values, lon_values), fields(dataset = %dataset.id))]
    async fn read(
        &self,
        dataset: &Dataset,
        variable_id: &str,
        time_index: usize,
        elevation: &str,
        lat_values: &[f64],
        lon_values: &[f64],
        fill_value: f32,
    ) -> WmsResult<Vec<f32>> {
        let variable = dataset.variable(variable_id).ok_or_else(|| {
            WmsError::DataReadError(format!(
                "variable {} not found in dataset {}",
                variable_id, dataset.id
            ))
        })?;
        let lattice = Lattice::for_variable(variable)?;
        let z_index = elevation_index(variable, elevation)?;
        let t_count = variable.tvalues.len().max(1);
        if time_index >= t_count {
            return Err(WmsError::DataReadError(format!(
                "time index {} out of range for {}",
                time_index, variable_id
            )));
        }
        let z_count = variable.zvalues.as_ref().map_or(1, |z| z.len().max(1));
        let slab = time_index * z_count + z_index;

        let path = Self::variable_path(dataset, variable_id);
        let rows = lat_values
            .iter()
            .map(|&lat| lattice.row(lat))
            .collect::<Vec<_>>();
        let cols = lon_values
            .iter()
            .map(|&lon| lattice.column(lon))
            .collect::<Vec<_>>();

        debug!(
            path = %path.display(),
            time_index,
            z_index,
            width = cols.len(),
            height = rows.len(),
            "Reading raw grid"
        );

        tokio::task::spawn_blocking(move || {
            let values = read_slab(&path, lattice, slab, t_count * z_count)?;
            let mut out = Vec::with_capacity(rows.len() * cols.len());
            for row in &rows {
                for col in &cols {
                    let value = match (row, col) {
                        (Some(y), Some(x)) => values[y * lattice.nx + x],
                        _ => fill_value,
                    };
                    out.push(value);
                }
            }
            Ok(out)
        })
        .await
        .map_err(|e| WmsError::InternalError(format!("read task failed: {}", e)))?
    }
}

/// Regular lon/lat lattice of one stored variable.
#[derive(Debug, Clone, Copy)]
struct Lattice {
    bbox: BoundingBox,
    nx: usize,
    ny: usize,
}

impl Lattice {
    fn for_variable(variable: &Variable) -> WmsResult<Self> {
        if variable.nx == 0 || variable.ny == 0 {
            return Err(WmsError::DataReadError(format!(
                "variable {} has no lattice size (nx, ny)",
                variable.id
            )));
        }
        Ok(Self {
            bbox: variable.bbox,
            nx: variable.nx,
            ny: variable.ny,
        })
    }

    fn column(&self, lon: f64) -> Option<usize> {
        // Bring the longitude into the lattice's 360 degree window
        let lon = self.bbox.min_x + (lon - self.bbox.min_x).rem_euclid(360.0);
        cell(lon, self.bbox.min_x, self.bbox.max_x, self.nx)
    }

    fn row(&self, lat: f64) -> Option<usize> {
        cell(lat, self.bbox.min_y, self.bbox.max_y, self.ny)
    }
}

fn cell(value: f64, min: f64, max: f64, count: usize) -> Option<usize> {
    if !value.is_finite() || value < min || value > max {
        return None;
    }
    let index = ((value - min) / (max - min) * count as f64).floor() as usize;
    Some(index.min(count - 1))
}

/// Read one `nx * ny` slab from the file.
fn read_slab(path: &Path, lattice: Lattice, slab: usize, slabs: usize) -> WmsResult<Vec<f32>> {
    let cells = lattice.nx * lattice.ny;
    let slab_bytes = cells * 4;

    let mut file = File::open(path).map_err(|e| {
        WmsError::DataReadError(format!("cannot open {}: {}", path.display(), e))
    })?;
    let expected = (slabs * slab_bytes) as u64;
    let actual = file.metadata()?.len();
    if actual < expected {
        return Err(WmsError::DataReadError(format!(
            "{} holds {} bytes, expected at least {}",
            path.display(),
            actual,
            expected
        )));
    }

    file.seek(SeekFrom::Start((slab * slab_bytes) as u64))?;
    let mut bytes = vec![0u8; slab_bytes];
    file.read_exact(&mut bytes)?;

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
