use serde::{Deserialize, Serialize};

/// Six-coefficient affine map from raster pixel/line to world x/y, in the
/// usual GDAL order:
///
/// ```text
/// x = c[0] + pixel * c[1] + line * c[2]
/// y = c[3] + pixel * c[4] + line * c[5]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeoTransform([f64; 6]);

impl GeoTransform {
    pub fn new(coefficients: [f64; 6]) -> Self {
        Self(coefficients)
    }

    /// Pixel centers at integer coordinates, one unit per pixel.
    pub fn identity() -> Self {
        Self([0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
    }

    pub fn coefficients(&self) -> [f64; 6] {
        self.0
    }

    pub fn apply(&self, u: f64, v: f64) -> (f64, f64) {
        let c = &self.0;
        (c[0] + u * c[1] + v * c[2], c[3] + u * c[4] + v * c[5])
    }

    /// The world to pixel/line map, or `None` when the linear part is
    /// singular.
    pub fn invert(&self) -> Option<Self> {
        let c = &self.0;
        let det = c[1] * c[5] - c[2] * c[4];
        if det.abs() < 1e-15 || !det.is_finite() {
            return None;
        }
        let inv = 1.0 / det;
        Some(Self([
            (c[2] * c[3] - c[0] * c[5]) * inv,
            c[5] * inv,
            -c[2] * inv,
            (-c[1] * c[3] + c[0] * c[4]) * inv,
            -c[4] * inv,
            c[1] * inv,
        ]))
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::identity()
    }
}
