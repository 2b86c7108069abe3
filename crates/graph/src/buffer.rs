use std::sync::{Arc, PoisonError, RwLock};

use tessera_core::{DataType, Pixel, Rect, Resolution, TRANSPARENT};

use crate::ids::{GroupId, OperationId, ProxyId};

/// Addressable intermediate image storage.
///
/// Chunks of the single writer fill disjoint rectangles under a short write
/// lock; readers only sample after the writer's group has drained.
#[derive(Debug)]
pub struct MemoryBuffer {
    resolution: Resolution,
    data_type: DataType,
    data: RwLock<Vec<f32>>,
}

impl MemoryBuffer {
    pub fn new(resolution: Resolution, data_type: DataType) -> Self {
        let len = resolution.pixel_count() * data_type.channels();
        Self {
            resolution,
            data_type,
            data: RwLock::new(vec![0.0; len]),
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.resolution.width as usize + x as usize) * self.data_type.channels()
    }

    /// Nearest-pixel sample; transparent outside the buffer.
    pub fn read(&self, x: f32, y: f32) -> Pixel {
        let (px, py) = (x.floor() as i64, y.floor() as i64);
        if !self.resolution.contains(px, py) {
            return TRANSPARENT;
        }
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        let start = self.offset(px as u32, py as u32);
        let mut pixel = TRANSPARENT;
        let channels = self.data_type.channels();
        pixel[..channels].copy_from_slice(&data[start..start + channels]);
        pixel
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Pixel> {
        if !self.resolution.contains(x as i64, y as i64) {
            return None;
        }
        Some(self.read(x as f32, y as f32))
    }

    /// Store a row-major block of pixels covering `rect`. Parts of `rect`
    /// outside the buffer are ignored.
    pub fn write_rect(&self, rect: &Rect, pixels: &[Pixel]) {
        let channels = self.data_type.channels();
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let row_len = rect.width() as usize;
        for y in rect.y_min..rect.y_max.min(self.resolution.height) {
            for x in rect.x_min..rect.x_max.min(self.resolution.width) {
                let local = (y - rect.y_min) as usize * row_len + (x - rect.x_min) as usize;
                let Some(pixel) = pixels.get(local) else {
                    continue;
                };
                let start = self.offset(x, y);
                data[start..start + channels].copy_from_slice(&pixel[..channels]);
            }
        }
    }

    /// Copy of the raw channel data.
    pub fn snapshot(&self) -> Vec<f32> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Per-channel average over the whole buffer.
    pub fn mean(&self) -> Pixel {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        let channels = self.data_type.channels();
        let count = self.resolution.pixel_count();
        let mut sum = [0.0f64; 4];
        for chunk in data.chunks_exact(channels) {
            for (c, v) in chunk.iter().enumerate() {
                sum[c] += *v as f64;
            }
        }
        let mut mean = TRANSPARENT;
        if count > 0 {
            for c in 0..channels {
                mean[c] = (sum[c] / count as f64) as f32;
            }
        }
        mean
    }
}

/// Hand-off point between one write-buffer and its read-buffers.
#[derive(Debug, Clone)]
pub struct MemoryProxy {
    pub id: ProxyId,
    pub writer: OperationId,
    pub data_type: DataType,
    pub resolution: Resolution,
    /// Buffer group that fills this proxy.
    pub executor: Option<GroupId>,
    pub(crate) buffer: Option<Arc<MemoryBuffer>>,
}

impl MemoryProxy {
    pub fn buffer(&self) -> Option<&Arc<MemoryBuffer>> {
        self.buffer.as_ref()
    }

    pub fn is_allocated(&self) -> bool {
        self.buffer.is_some()
    }
}
