/// Borrowed 8-bit grayscale image, row-major with `data.len() == width * height`.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8],
}

/// Owned 8-bit grayscale image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    /// Image filled with a constant value.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.data[y * self.width + x] = value;
    }
}

/// Bilinear sample; `None` when the 2x2 neighbourhood leaves the image.
#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f64, y: f64) -> Option<f64> {
    // range check in f64 so huge coordinates never reach the integer cast
    let fits = |v: f64, n: usize| v.is_finite() && v >= 0.0 && v + 1.0 < n as f64;
    if !fits(x, src.width) || !fits(y, src.height) {
        return None;
    }
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let row0 = y0 * src.width + x0;
    let row1 = row0 + src.width;
    let p00 = src.data[row0] as f64;
    let p10 = src.data[row0 + 1] as f64;
    let p01 = src.data[row1] as f64;
    let p11 = src.data[row1 + 1] as f64;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    Some(a + fy * (b - a))
}
