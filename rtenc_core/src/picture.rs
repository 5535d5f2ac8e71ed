//! Borrowed view of a raw planar 4:2:0 picture.

use crate::error::EncoderError;

pub const PLANE_Y: usize = 0;
pub const PLANE_U: usize = 1;
pub const PLANE_V: usize = 2;

/// Three read-only 8-bit planes (Y, U, V) with independent row strides.
///
/// Chroma planes are half the luma size in both directions, rounded up. A
/// stride may exceed the plane width to allow row padding. The view is never
/// retained by the encoder past a single `encode` call.
#[derive(Debug, Clone, Copy)]
pub struct Picture<'a> {
    width: i32,
    height: i32,
    planes: [&'a [u8]; 3],
    strides: [i32; 3],
}

impl<'a> Picture<'a> {
    /// Create a picture from three planes and their strides.
    ///
    /// # Errors
    ///
    /// Returns [`EncoderError::InvalidParameter`] if the geometry is not
    /// positive, a stride is smaller than its plane width, or a plane is too
    /// short to hold all of its rows.
    pub fn new(
        width: i32,
        height: i32,
        y: &'a [u8],
        u: &'a [u8],
        v: &'a [u8],
        strides: [i32; 3],
    ) -> Result<Self, EncoderError> {
        if width <= 0 || height <= 0 {
            return Err(EncoderError::InvalidParameter(format!(
                "picture geometry must be positive, got {width}x{height}"
            )));
        }
        let picture = Self {
            width,
            height,
            planes: [y, u, v],
            strides,
        };
        for plane in [PLANE_Y, PLANE_U, PLANE_V] {
            let stride = strides[plane];
            let plane_width = picture.plane_width(plane);
            if stride < plane_width {
                return Err(EncoderError::InvalidParameter(format!(
                    "stride {stride} of plane {plane} is smaller than its width {plane_width}"
                )));
            }
            let required = Self::min_plane_len(stride, plane_width, picture.plane_height(plane));
            let actual = picture.planes[plane].len();
            if actual < required {
                return Err(EncoderError::InvalidParameter(format!(
                    "plane {plane} holds {actual} bytes, {required} required"
                )));
            }
        }
        Ok(picture)
    }

    /// Create a picture from a tightly packed I420 buffer (Y, then U, then V).
    pub fn from_i420(width: i32, height: i32, data: &'a [u8]) -> Result<Self, EncoderError> {
        if width <= 0 || height <= 0 {
            return Err(EncoderError::InvalidParameter(format!(
                "picture geometry must be positive, got {width}x{height}"
            )));
        }
        let (cw, ch) = (chroma_dim(width), chroma_dim(height));
        let y_len = width as usize * height as usize;
        let c_len = cw as usize * ch as usize;
        if data.len() < y_len + 2 * c_len {
            return Err(EncoderError::InvalidParameter(format!(
                "I420 buffer holds {} bytes, {} required",
                data.len(),
                y_len + 2 * c_len
            )));
        }
        let (y, rest) = data.split_at(y_len);
        let (u, v) = rest.split_at(c_len);
        Self::new(width, height, y, u, v, [width, cw, cw])
    }

    /// Minimum byte length of a plane: full strides for every row but the last.
    pub fn min_plane_len(stride: i32, plane_width: i32, rows: i32) -> usize {
        if rows <= 0 {
            return 0;
        }
        (rows as usize - 1) * stride.max(0) as usize + plane_width.max(0) as usize
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn plane(&self, index: usize) -> &'a [u8] {
        self.planes[index]
    }

    pub fn stride(&self, index: usize) -> i32 {
        self.strides[index]
    }

    pub fn strides(&self) -> [i32; 3] {
        self.strides
    }

    pub fn plane_width(&self, index: usize) -> i32 {
        if index == PLANE_Y {
            self.width
        } else {
            chroma_dim(self.width)
        }
    }

    pub fn plane_height(&self, index: usize) -> i32 {
        if index == PLANE_Y {
            self.height
        } else {
            chroma_dim(self.height)
        }
    }
}

/// Chroma dimension for a luma dimension under 2x subsampling.
pub fn chroma_dim(luma: i32) -> i32 {
    (luma + 1) / 2
}
