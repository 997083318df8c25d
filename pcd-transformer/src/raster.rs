//! Raster data the colorization filter samples.

use pcd_core::{Error, Result};

/// A multi-band grid addressed by pixel (column) and line (row).
pub trait RasterSource {
    fn width(&self) -> usize;

    fn height(&self) -> usize;

    fn band_count(&self) -> usize;

    /// Value of 1-based `band` at a cell inside the grid, `None` for
    /// nodata.
    fn value(&self, band: usize, pixel: usize, line: usize) -> Option<f64>;
}

/// An in-memory raster, band-sequential and row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct GridRaster {
    width: usize,
    height: usize,
    bands: Vec<Vec<f64>>,
    nodata: Option<f64>,
}

impl GridRaster {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            bands: Vec::new(),
            nodata: None,
        }
    }

    pub fn with_band(mut self, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.width * self.height {
            return Err(Error::Config(format!(
                "band {} has {} values, expected {}x{}",
                self.bands.len() + 1,
                values.len(),
                self.width,
                self.height
            )));
        }
        self.bands.push(values);
        Ok(self)
    }

    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }
}

impl RasterSource for GridRaster {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn band_count(&self) -> usize {
        self.bands.len()
    }

    fn value(&self, band: usize, pixel: usize, line: usize) -> Option<f64> {
        if pixel >= self.width || line >= self.height {
            return None;
        }
        let values = self.bands.get(band.checked_sub(1)?)?;
        let value = values[line * self.width + pixel];
        match self.nodata {
            Some(nodata) if value == nodata => None,
            _ => Some(value),
        }
    }
}
