// Sample matrix produced by the raster decoder

/// Row-major grid of decoded samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleMatrix {
    width: usize,
    height: usize,
    samples: Vec<u16>,
}

impl SampleMatrix {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            samples: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, row: usize, col: usize) -> Option<u16> {
        if row < self.height && col < self.width {
            Some(self.samples[row * self.width + col])
        } else {
            None
        }
    }

    pub fn row(&self, row: usize) -> &[u16] {
        &self.samples[row * self.width..(row + 1) * self.width]
    }

    pub(crate) fn row_mut(&mut self, row: usize) -> &mut [u16] {
        &mut self.samples[row * self.width..(row + 1) * self.width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u16]> {
        self.samples.chunks(self.width.max(1))
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.samples
    }

    pub fn into_vec(self) -> Vec<u16> {
        self.samples
    }

    /// (min, max) sample, `None` for an empty matrix
    pub fn range(&self) -> Option<(u16, u16)> {
        let min = self.samples.iter().min()?;
        let max = self.samples.iter().max()?;
        Some((*min, *max))
    }
}
