use serde::{Deserialize, Serialize};

/// RGBA sample. Values use channel 0, vectors channels 0..3.
pub type Pixel = [f32; 4];

pub const TRANSPARENT: Pixel = [0.0, 0.0, 0.0, 0.0];

/// Data type tag carried by every socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Value,
    Vector,
    Color,
}

impl DataType {
    /// Number of `f32` channels a buffer of this type stores per pixel.
    pub fn channels(self) -> usize {
        match self {
            DataType::Value => 1,
            DataType::Vector => 3,
            DataType::Color => 4,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Value => write!(f, "Value"),
            DataType::Vector => write!(f, "Vector"),
            DataType::Color => write!(f, "Color"),
        }
    }
}

/// Width and height in pixels. `0x0` means "not determined".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const ZERO: Resolution = Resolution { width: 0, height: 0 };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero; such a resolution cannot be scheduled.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    /// Whether the pixel containing the sample position lies inside.
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        self.contains(x.floor() as i64, y.floor() as i64)
    }

    /// Full-frame rectangle.
    pub fn rect(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Half-open pixel rectangle `[x_min, x_max) x [y_min, y_max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
}

impl Rect {
    pub const fn new(x_min: u32, y_min: u32, x_max: u32, y_max: u32) -> Self {
        Self { x_min, y_min, x_max, y_max }
    }

    pub fn width(&self) -> u32 {
        self.x_max.saturating_sub(self.x_min)
    }

    pub fn height(&self) -> u32 {
        self.y_max.saturating_sub(self.y_min)
    }

    pub fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x_min && x < self.x_max && y >= self.y_min && y < self.y_max
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x_min < other.x_max
            && other.x_min < self.x_max
            && self.y_min < other.y_max
            && other.y_min < self.y_max
    }
}

/// Output group priority. Lower ordinal = executed earlier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Final composite and the active viewer.
    High = 0,
    Medium = 1,
    /// Previews and inactive viewers.
    #[default]
    Low = 2,
}

impl Priority {
    /// Every tier in execution order.
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "High"),
            Priority::Medium => write!(f, "Medium"),
            Priority::Low => write!(f, "Low"),
        }
    }
}

/// Quality tier chosen by the tree for rendering or editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    #[default]
    High,
    Medium,
    Low,
}

impl Quality {
    /// Sampling stride operations may use to trade accuracy for speed.
    pub fn sample_step(self) -> u32 {
        match self {
            Quality::High => 1,
            Quality::Medium => 2,
            Quality::Low => 3,
        }
    }
}

/// How an input socket adapts a producer of a different resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Never convert; the consumer samples the producer in its own coordinates.
    None,
    /// Keep scale, align centers.
    #[default]
    Center,
    /// Uniform scale so the producer fits inside, centered.
    Fit,
    /// Scale each axis independently to cover the consumer exactly.
    Stretch,
}
