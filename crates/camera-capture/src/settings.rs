//! Camera settings and view identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel for "let the camera decide" in numeric controls
pub const AUTO: i32 = -1;

/// An image or data modality produced by one grab
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
    /// Left color image (the base view)
    Rgb,
    /// Right color image
    Right,
    /// Normalized depth map
    Depth,
    /// Disparity map
    Disparity,
    /// Depth confidence map
    Confidence,
    /// Colored point cloud (PLY)
    PointCloud,
}

impl ViewType {
    pub const ALL: [ViewType; 6] = [
        ViewType::Rgb,
        ViewType::Right,
        ViewType::Depth,
        ViewType::Disparity,
        ViewType::Confidence,
        ViewType::PointCloud,
    ];

    /// The view captured when nothing else is selected
    pub const BASE: ViewType = ViewType::Rgb;

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewType::Rgb => "rgb",
            ViewType::Right => "right",
            ViewType::Depth => "depth",
            ViewType::Disparity => "disparity",
            ViewType::Confidence => "confidence",
            ViewType::PointCloud => "point_cloud",
        }
    }
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewType::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| format!("unknown view type: {s}"))
    }
}

/// Exposure / gain control mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraMode {
    #[default]
    Auto,
    Manual,
}

impl CameraMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraMode::Auto => "auto",
            CameraMode::Manual => "manual",
        }
    }
}

/// Sensor resolution presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Resolution {
    #[serde(rename = "HD2K")]
    Hd2k,
    #[default]
    #[serde(rename = "HD1080")]
    Hd1080,
    #[serde(rename = "HD720")]
    Hd720,
    Vga,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Hd2k => "HD2K",
            Resolution::Hd1080 => "HD1080",
            Resolution::Hd720 => "HD720",
            Resolution::Vga => "VGA",
        }
    }

    /// Width and height of one eye
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Resolution::Hd2k => (2208, 1242),
            Resolution::Hd1080 => (1920, 1080),
            Resolution::Hd720 => (1280, 720),
            Resolution::Vga => (672, 376),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Camera configuration handed through to the device.
///
/// Numeric controls use [`AUTO`] (`-1`) for automatic; these values are passed
/// to the device untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub mode: CameraMode,
    pub resolution: Resolution,
    pub fps: u32,
    pub brightness: i32,
    pub contrast: i32,
    pub hue: i32,
    pub saturation: i32,
    pub exposure: i32,
    pub gain: i32,
    pub whitebalance: i32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            mode: CameraMode::Auto,
            resolution: Resolution::Hd1080,
            fps: 30,
            brightness: 4,
            contrast: 4,
            hue: 0,
            saturation: 4,
            exposure: AUTO,
            gain: AUTO,
            whitebalance: AUTO,
        }
    }
}

impl CameraSettings {
    /// Whether exposure is left to the camera
    pub fn auto_exposure(&self) -> bool {
        self.exposure == AUTO
    }

    /// Whether gain is left to the camera
    pub fn auto_gain(&self) -> bool {
        self.gain == AUTO
    }

    /// Whether white balance is left to the camera
    pub fn auto_whitebalance(&self) -> bool {
        self.whitebalance == AUTO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_type_names_round_trip() {
        for view in ViewType::ALL {
            assert_eq!(view.as_str().parse::<ViewType>().unwrap(), view);
            let json = serde_json::to_string(&view).unwrap();
            assert_eq!(json, format!("\"{}\"", view.as_str()));
        }
        assert!("thermal".parse::<ViewType>().is_err());
    }

    #[test]
    fn test_resolution_labels() {
        let json = serde_json::to_string(&Resolution::Hd1080).unwrap();
        assert_eq!(json, "\"HD1080\"");
        let vga: Resolution = serde_json::from_str("\"VGA\"").unwrap();
        assert_eq!(vga, Resolution::Vga);
        assert_eq!(Resolution::Hd720.dimensions(), (1280, 720));
    }

    #[test]
    fn test_auto_sentinels() {
        let settings = CameraSettings::default();
        assert!(settings.auto_exposure());
        assert!(settings.auto_gain());
        assert!(settings.auto_whitebalance());

        let manual = CameraSettings {
            mode: CameraMode::Manual,
            exposure: 50,
            ..Default::default()
        };
        assert!(!manual.auto_exposure());
        assert!(manual.auto_gain());
    }
}
