//! Configuration for grid layers
//!
//! Layers are configured through [`GridOptions`], which can be built in code,
//! deserialized from JSON, or derived from a [`LoadingProfile`] preset for
//! the fetch/caching side.

use crate::core::{bounds::Bounds, constants, geo::Size};
use crate::{GridError, Result};
use serde::{Deserialize, Serialize};

/// Half the width of the spherical-mercator world in metres.
const MERCATOR_HALF_WORLD: f64 = 20_037_508.342_789_244;

#[derive(Debug, Clone, PartialEq)]
pub enum LoadingProfile {
    Balanced,
    LowResource,
    Aggressive,
    Custom(LoadingConfig),
}

impl LoadingProfile {
    pub fn resolve(&self) -> LoadingConfig {
        match self {
            Self::Balanced => LoadingConfig {
                max_concurrent: constants::DEFAULT_MAX_CONCURRENT,
                cache_size: constants::DEFAULT_CACHE_SIZE,
            },
            Self::LowResource => LoadingConfig {
                max_concurrent: 2,
                cache_size: 64,
            },
            Self::Aggressive => LoadingConfig {
                max_concurrent: 32,
                cache_size: 4096,
            },
            Self::Custom(config) => config.clone(),
        }
    }
}

impl Default for LoadingProfile {
    fn default() -> Self {
        Self::Balanced
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadingConfig {
    /// Fetches allowed in flight at once; extra requests wait in the loader
    pub max_concurrent: usize,
    /// Payloads kept in the in-memory cache, keyed by resource locator
    pub cache_size: usize,
}

impl LoadingConfig {
    pub fn estimated_memory_usage(&self) -> usize {
        self.cache_size * 15_000
    }
}

impl Default for LoadingConfig {
    fn default() -> Self {
        LoadingProfile::default().resolve()
    }
}

/// How a layer bridges the gap while a new resolution loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionEffect {
    /// Old imagery disappears as soon as the grid is relaid out
    None,
    /// Old imagery is stretched to the new resolution until replaced
    Resize,
}

impl Default for TransitionEffect {
    fn default() -> Self {
        Self::None
    }
}

/// How a tile whose fetch failed is marked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureIndicator {
    /// Image shown in place of the failed tile, if any
    pub error_tile_url: Option<String>,
    /// Style hook applied to failed cells by the renderer
    pub class_name: String,
}

impl Default for FailureIndicator {
    fn default() -> Self {
        Self {
            error_tile_url: None,
            class_name: "tile-load-error".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridOptions {
    pub tile_size: Size,
    pub buffer: u32,
    pub single_tile: bool,
    pub ratio: f64,
    /// Reference origin of the tile lattice and the extent used for
    /// out-of-range checks
    pub max_extent: Bounds,
    pub display_outside_max_extent: bool,
    pub transition: TransitionEffect,
    pub failure_indicator: FailureIndicator,
    pub loading: LoadingConfig,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            tile_size: Size::square(constants::TILE_SIZE),
            buffer: constants::DEFAULT_BUFFER,
            single_tile: false,
            ratio: constants::DEFAULT_SINGLE_TILE_RATIO,
            max_extent: Bounds::new(
                -MERCATOR_HALF_WORLD,
                -MERCATOR_HALF_WORLD,
                MERCATOR_HALF_WORLD,
                MERCATOR_HALF_WORLD,
            ),
            display_outside_max_extent: false,
            transition: TransitionEffect::None,
            failure_indicator: FailureIndicator::default(),
            loading: LoadingConfig::default(),
        }
    }
}

impl GridOptions {
    pub fn with_profile(mut self, profile: LoadingProfile) -> Self {
        self.loading = profile.resolve();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.tile_size.is_empty() {
            return Err(GridError::InvalidConfig("tile size must be non-zero".to_string()).into());
        }
        if !(self.ratio >= 1.0) {
            return Err(GridError::InvalidConfig(format!(
                "single tile ratio must be >= 1.0, got {}",
                self.ratio
            ))
            .into());
        }
        if !self.max_extent.is_valid() || self.max_extent.area() <= 0.0 {
            return Err(GridError::InvalidConfig(format!(
                "max extent {} is empty or inverted",
                self.max_extent
            ))
            .into());
        }
        if self.loading.max_concurrent == 0 {
            return Err(
                GridError::InvalidConfig("max_concurrent must be at least 1".to_string()).into(),
            );
        }
        Ok(())
    }

    /// Whether tiles of this layer keep a back-buffer across redraws
    pub fn uses_back_buffer(&self) -> bool {
        self.single_tile || self.transition == TransitionEffect::Resize
    }

    /// Pixel size of a tile for a viewport of `viewport_size`
    pub fn effective_tile_size(&self, viewport_size: Size) -> Size {
        if self.single_tile {
            viewport_size.scaled(self.ratio)
        } else {
            self.tile_size
        }
    }
}
