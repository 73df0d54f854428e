use ndarray::{ArrayView3, ArrayViewMut3};

use crate::shared::region::Region;

/// A single captured frame: contiguous RGB bytes in row-major order.
///
/// Sources convert to RGB at the I/O boundary; everything downstream treats
/// the pixel buffer as `height × width × channels`. `Clone` is a deep copy,
/// which is what evidence capture relies on to keep the live frame untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// A frame filled with one value in every channel.
    pub fn filled(width: u32, height: u32, value: u8, index: usize) -> Self {
        let len = (width as usize) * (height as usize) * 3;
        Self::new(vec![value; len], width, height, 3, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Position of this frame in the stream, assigned by the source.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the pixels under `region` into a tightly packed buffer.
    ///
    /// The region must lie inside the frame.
    pub fn copy_region(&self, region: &Region) -> Vec<u8> {
        let (rx, ry, rw, rh) = region.as_usize();
        let ch = self.channels as usize;
        let fw = self.width as usize;
        let mut out = Vec::with_capacity(rw * rh * ch);
        for row in ry..ry + rh {
            let start = (row * fw + rx) * ch;
            out.extend_from_slice(&self.data[start..start + rw * ch]);
        }
        out
    }

    /// Writes a tightly packed buffer back over `region`.
    ///
    /// `pixels` must be `region.width * region.height * channels` bytes.
    pub fn write_region(&mut self, region: &Region, pixels: &[u8]) {
        let (rx, ry, rw, rh) = region.as_usize();
        let ch = self.channels as usize;
        let fw = self.width as usize;
        debug_assert_eq!(pixels.len(), rw * rh * ch);
        for row in 0..rh {
            let dst = ((ry + row) * fw + rx) * ch;
            let src = row * rw * ch;
            self.data[dst..dst + rw * ch].copy_from_slice(&pixels[src..src + rw * ch]);
        }
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
