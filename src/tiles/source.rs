use crate::core::{bounds::Bounds, geo::Size};
use crate::{GridError, Result};

/// Trait representing anything that can produce a resource locator for a
/// tile cell of the given bounds and pixel size.
pub trait TileSource: Send + Sync {
    /// Build a URL (or other locator) for the requested cell.
    fn url(&self, bounds: &Bounds, size: Size) -> String;
}

/// Bounding-box style source (WMS and friends).
///
/// Recognised placeholders: `{left}` `{bottom}` `{right}` `{top}` `{bbox}`
/// `{width}` `{height}`.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    template: String,
}

impl TemplateSource {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl TileSource for TemplateSource {
    fn url(&self, bounds: &Bounds, size: Size) -> String {
        self.template
            .replace("{bbox}", &bounds.to_string())
            .replace("{left}", &bounds.left.to_string())
            .replace("{bottom}", &bounds.bottom.to_string())
            .replace("{right}", &bounds.right.to_string())
            .replace("{top}", &bounds.top.to_string())
            .replace("{width}", &size.w.to_string())
            .replace("{height}", &size.h.to_string())
    }
}

/// `{z}/{x}/{y}` source. Column and row are counted from the upper-left of
/// `origin`; the zoom level is the index of the closest entry of the
/// resolution ladder.
#[derive(Debug, Clone)]
pub struct XyzSource {
    template: String,
    origin: Bounds,
    resolutions: Vec<f64>,
    subdomains: Vec<String>,
}

impl XyzSource {
    pub fn new(template: impl Into<String>, origin: Bounds, resolutions: Vec<f64>) -> Result<Self> {
        if resolutions.is_empty() || resolutions.iter().any(|r| !(*r > 0.0)) {
            return Err(GridError::InvalidConfig(
                "xyz source needs a non-empty ladder of positive resolutions".to_string(),
            )
            .into());
        }
        Ok(Self {
            template: template.into(),
            origin,
            resolutions,
            subdomains: Vec::new(),
        })
    }

    /// Spherical-mercator ladder: 256px tiles, zoom 0 covers `origin` once
    pub fn mercator(template: impl Into<String>, origin: Bounds, levels: usize) -> Result<Self> {
        let base = origin.width() / 256.0;
        let resolutions = (0..levels.max(1))
            .map(|z| base / 2f64.powi(z as i32))
            .collect();
        Self::new(template, origin, resolutions)
    }

    /// Rotates `{s}` through the given hosts
    pub fn with_subdomains(mut self, subdomains: &[&str]) -> Self {
        self.subdomains = subdomains.iter().map(|s| s.to_string()).collect();
        self
    }

    fn zoom_for(&self, resolution: f64) -> usize {
        self.resolutions
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let da = (*a - resolution).abs();
                let db = (*b - resolution).abs();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(z, _)| z)
            .unwrap_or(0)
    }

    /// Column and row of the cell whose upper-left corner is `bounds`'
    pub fn tile_address(&self, bounds: &Bounds, size: Size) -> (usize, i64, i64) {
        let resolution = bounds.width() / size.w.max(1) as f64;
        let z = self.zoom_for(resolution);
        let res = self.resolutions[z];
        let x = ((bounds.left - self.origin.left) / (res * size.w as f64)).round() as i64;
        let y = ((self.origin.top - bounds.top) / (res * size.h as f64)).round() as i64;
        (z, x, y)
    }
}

impl TileSource for XyzSource {
    fn url(&self, bounds: &Bounds, size: Size) -> String {
        let (z, x, y) = self.tile_address(bounds, size);
        let mut url = self
            .template
            .replace("{z}", &z.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string());

        if !self.subdomains.is_empty() {
            let idx = (x + y).rem_euclid(self.subdomains.len() as i64) as usize;
            url = url.replace("{s}", &self.subdomains[idx]);
        }
        url
    }
}
