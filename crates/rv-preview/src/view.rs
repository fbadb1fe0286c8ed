//! View configuration: device profile, viewport and guard toggle.

use core::fmt;
use core::str::FromStr;
use rv_core::PreviewError;

pub const MIN_CUSTOM_DIMENSION: u32 = 200;
pub const MAX_CUSTOM_DIMENSION: u32 = 3000;
pub const DEFAULT_CUSTOM_WIDTH: u32 = 1200;
pub const DEFAULT_CUSTOM_HEIGHT: u32 = 800;

const MOBILE_FRAME: (u32, u32) = (375, 667);
const TABLET_FRAME: (u32, u32) = (768, 1024);
const MIN_CUSTOM_CONTAINER_WIDTH: u32 = 800;
const CUSTOM_CONTAINER_GUTTER: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Desktop,
    Tablet,
    Mobile,
    Custom,
}

impl ViewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Tablet => "tablet",
            Self::Mobile => "mobile",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = PreviewError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "desktop" => Ok(Self::Desktop),
            "tablet" => Ok(Self::Tablet),
            "mobile" => Ok(Self::Mobile),
            "custom" => Ok(Self::Custom),
            other => Err(PreviewError::new(
                "view.unknown_mode",
                format!("unknown view mode `{other}`"),
            )),
        }
    }
}

/// Width handed to the rendered document's viewport meta tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportWidth {
    DeviceWidth,
    Pixels(u32),
}

impl fmt::Display for ViewportWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceWidth => f.write_str("device-width"),
            Self::Pixels(width) => write!(f, "{width}"),
        }
    }
}

/// Size of the container the host draws around the preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameGeometry {
    /// Fills the host surface.
    Fill,
    Fixed {
        width: u32,
        height: u32,
        /// Minimum width of the surrounding container.
        container_width: u32,
    },
}

/// Supplied by the host for every render request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewConfiguration {
    pub mode: ViewMode,
    /// Only meaningful for [`ViewMode::Custom`].
    pub viewport_width: u32,
    /// Only meaningful for [`ViewMode::Custom`].
    pub viewport_height: u32,
    pub block_network: bool,
}

impl Default for ViewConfiguration {
    fn default() -> Self {
        Self {
            mode: ViewMode::Desktop,
            viewport_width: DEFAULT_CUSTOM_WIDTH,
            viewport_height: DEFAULT_CUSTOM_HEIGHT,
            block_network: true,
        }
    }
}

impl ViewConfiguration {
    pub fn new(mode: ViewMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn custom(width: u32, height: u32) -> Self {
        Self::new(ViewMode::Custom).with_custom_size(width, height)
    }

    pub fn with_custom_size(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = clamp_custom_dimension(width);
        self.viewport_height = clamp_custom_dimension(height);
        self
    }

    pub fn with_block_network(mut self, block_network: bool) -> Self {
        self.block_network = block_network;
        self
    }

    pub fn viewport_width(&self) -> ViewportWidth {
        match self.mode {
            ViewMode::Desktop => ViewportWidth::DeviceWidth,
            ViewMode::Tablet => ViewportWidth::Pixels(TABLET_FRAME.0),
            ViewMode::Mobile => ViewportWidth::Pixels(MOBILE_FRAME.0),
            ViewMode::Custom => ViewportWidth::Pixels(clamp_custom_dimension(self.viewport_width)),
        }
    }

    /// Content of the `<meta name="viewport">` tag.
    pub fn viewport_meta(&self) -> String {
        format!("width={}, initial-scale=1.0", self.viewport_width())
    }

    pub fn frame(&self) -> FrameGeometry {
        let (width, height) = match self.mode {
            ViewMode::Desktop => return FrameGeometry::Fill,
            ViewMode::Tablet => TABLET_FRAME,
            ViewMode::Mobile => MOBILE_FRAME,
            ViewMode::Custom => (
                clamp_custom_dimension(self.viewport_width),
                clamp_custom_dimension(self.viewport_height),
            ),
        };
        let container_width = if self.mode == ViewMode::Custom {
            width
                .saturating_add(CUSTOM_CONTAINER_GUTTER)
                .max(MIN_CUSTOM_CONTAINER_WIDTH)
        } else {
            width
        };
        FrameGeometry::Fixed {
            width,
            height,
            container_width,
        }
    }

    /// True when moving from `self` to `next` needs a fresh render session.
    /// Custom width/height changes only resize the container.
    pub fn requires_reload(&self, next: &Self) -> bool {
        self.mode != next.mode || self.block_network != next.block_network
    }
}

pub fn clamp_custom_dimension(value: u32) -> u32 {
    value.clamp(MIN_CUSTOM_DIMENSION, MAX_CUSTOM_DIMENSION)
}

#[cfg(test)]
mod tests {
    use super::FrameGeometry;
    use super::ViewConfiguration;
    use super::ViewMode;

    #[test]
    fn custom_dimensions_are_clamped() {
        let view = ViewConfiguration::custom(50, 9000);
        assert_eq!(view.viewport_width, 200);
        assert_eq!(view.viewport_height, 3000);
    }

    #[test]
    fn viewport_meta_follows_mode() {
        assert_eq!(
            ViewConfiguration::new(ViewMode::Desktop).viewport_meta(),
            "width=device-width, initial-scale=1.0"
        );
        assert_eq!(
            ViewConfiguration::new(ViewMode::Mobile).viewport_meta(),
            "width=375, initial-scale=1.0"
        );
        assert_eq!(
            ViewConfiguration::new(ViewMode::Tablet).viewport_meta(),
            "width=768, initial-scale=1.0"
        );
        assert_eq!(
            ViewConfiguration::custom(1024, 600).viewport_meta(),
            "width=1024, initial-scale=1.0"
        );
    }

    #[test]
    fn frames_match_device_profiles() {
        assert_eq!(ViewConfiguration::default().frame(), FrameGeometry::Fill);
        assert_eq!(
            ViewConfiguration::new(ViewMode::Mobile).frame(),
            FrameGeometry::Fixed {
                width: 375,
                height: 667,
                container_width: 375
            }
        );
        assert_eq!(
            ViewConfiguration::custom(300, 400).frame(),
            FrameGeometry::Fixed {
                width: 300,
                height: 400,
                container_width: 800
            }
        );
        assert_eq!(
            ViewConfiguration::custom(1200, 800).frame(),
            FrameGeometry::Fixed {
                width: 1200,
                height: 800,
                container_width: 1300
            }
        );
    }

    #[test]
    fn only_mode_and_network_changes_require_reload() {
        let base = ViewConfiguration::custom(800, 600);
        assert!(!base.requires_reload(&base.with_custom_size(1000, 700)));
        assert!(base.requires_reload(&ViewConfiguration::new(ViewMode::Tablet)));
        assert!(base.requires_reload(&base.with_block_network(false)));
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!("Mobile".parse::<ViewMode>().ok(), Some(ViewMode::Mobile));
        assert!("watch".parse::<ViewMode>().is_err());
    }
}
