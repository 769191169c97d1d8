//! Shared-memory pixel buffers
//!
//! Turns a [`ShmRegion`] into a `wl_buffer` the compositor can sample:
//! geometry is computed up front, the checker pattern is painted through a
//! scoped mapping, then the region is wrapped in a `wl_shm_pool` that only
//! lives long enough to mint one buffer covering the whole pool.
//!
//! The mapping is write-once: it is dropped as soon as the pattern is in
//! place, before the compositor ever sees the descriptor. A dynamic
//! repaint would have to keep the mapping alongside the buffer instead.

use std::os::fd::AsFd;

use log::{debug, info};
use wayland_client::protocol::{wl_buffer::WlBuffer, wl_shm, wl_shm_pool::WlShmPool};
use wayland_client::{Dispatch, QueueHandle};

use crate::error::{ClientError, Result};
use crate::shm::ShmRegion;

/// Dark band color (XRGB8888)
pub const DARK_GRAY: u32 = 0xFF66_6666;
/// Light band color (XRGB8888)
pub const LIGHT_GRAY: u32 = 0xFFEE_EEEE;

/// Width in pixels of one diagonal band
const BAND_WIDTH: u32 = 8;

/// Largest width or height accepted for a buffer
pub const MAX_DIMENSION: u32 = 16384;

/// Pixel formats this client can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Xrgb8888,
    Argb8888,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Xrgb8888 | PixelFormat::Argb8888 => 4,
        }
    }

    /// Parses the lowercase names used in configuration files
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "xrgb8888" => Some(PixelFormat::Xrgb8888),
            "argb8888" => Some(PixelFormat::Argb8888),
            _ => None,
        }
    }

    pub fn wl_format(self) -> wl_shm::Format {
        match self {
            PixelFormat::Xrgb8888 => wl_shm::Format::Xrgb8888,
            PixelFormat::Argb8888 => wl_shm::Format::Argb8888,
        }
    }
}

/// Width, height, stride and total size of a single-buffer pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferGeometry {
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub size: usize,
    pub format: PixelFormat,
}

impl BufferGeometry {
    /// `stride = width * bpp`, `size = stride * height`
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(ClientError::resource(
                "geometry",
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("{}x{} is outside 1..={}", width, height, MAX_DIMENSION),
                ),
            ));
        }

        let stride = width * format.bytes_per_pixel();
        let size = stride as usize * height as usize;

        // wl_shm sizes travel as i32 on the wire
        if i32::try_from(size).is_err() {
            return Err(ClientError::resource(
                "geometry",
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "pool larger than i32::MAX"),
            ));
        }

        Ok(Self { width, height, stride, size, format })
    }
}

/// Color of the pixel at (x, y): diagonal bands 8 pixels wide
pub fn checker_band_color(x: u32, y: u32) -> u32 {
    let band = (x + (y / BAND_WIDTH) * BAND_WIDTH) % (2 * BAND_WIDTH);
    if band < BAND_WIDTH {
        DARK_GRAY
    } else {
        LIGHT_GRAY
    }
}

/// Fills `pixels` (laid out per `geometry`) with the band pattern
pub fn paint_checker_bands(pixels: &mut [u8], geometry: &BufferGeometry) {
    let row_bytes = geometry.width as usize * 4;
    for (y, row) in pixels
        .chunks_exact_mut(geometry.stride as usize)
        .take(geometry.height as usize)
        .enumerate()
    {
        for (x, px) in row[..row_bytes].chunks_exact_mut(4).enumerate() {
            px.copy_from_slice(&checker_band_color(x as u32, y as u32).to_le_bytes());
        }
    }
}

/// Reads back the pixel at (x, y)
pub fn pixel_at(pixels: &[u8], geometry: &BufferGeometry, x: u32, y: u32) -> Option<u32> {
    if x >= geometry.width || y >= geometry.height {
        return None;
    }
    let offset = y as usize * geometry.stride as usize + x as usize * 4;
    let bytes = pixels.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Allocates a region for `geometry` and paints the initial content
///
/// The mapping is released before this returns.
pub fn prepare_pixels(geometry: &BufferGeometry) -> Result<ShmRegion> {
    let region = ShmRegion::allocate(geometry.size)?;
    let mut mapping = region.map()?;
    paint_checker_bands(mapping.bytes_mut(), geometry);
    debug!(
        "🎨 Painted {}x{} checker bands into shared memory",
        geometry.width, geometry.height
    );
    drop(mapping);
    Ok(region)
}

/// A compositor-side buffer backed by shared memory
#[derive(Debug)]
pub struct SharedBuffer {
    pub geometry: BufferGeometry,
    pub buffer: WlBuffer,
}

impl SharedBuffer {
    /// Allocates, paints and wraps a buffer through the bound `wl_shm`
    pub fn create<D>(shm: &wl_shm::WlShm, geometry: BufferGeometry, qh: &QueueHandle<D>) -> Result<Self>
    where
        D: Dispatch<WlShmPool, ()> + Dispatch<WlBuffer, ()> + 'static,
    {
        let region = prepare_pixels(&geometry)?;

        let pool = shm.create_pool(region.as_fd(), geometry.size as i32, qh, ());
        let buffer = pool.create_buffer(
            0,
            geometry.width as i32,
            geometry.height as i32,
            geometry.stride as i32,
            geometry.format.wl_format(),
            qh,
            (),
        );
        pool.destroy();
        drop(region);

        info!(
            "🖼️ Created {}x{} {:?} buffer (stride {}, {} bytes)",
            geometry.width, geometry.height, geometry.format, geometry.stride, geometry.size
        );
        Ok(Self { geometry, buffer })
    }
}
