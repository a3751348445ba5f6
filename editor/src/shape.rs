use std::fmt;

/// The shape of the data flowing between two layers. Networks in this
/// editor only ever deal with image-like rank 3 tensors and flat feature
/// vectors, so the two are modeled explicitly instead of as a general
/// dimension list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// A flat feature vector of the given length.
    Flat(usize),
    /// An image-like tensor in (height, width, channels) layout.
    Image {
        height: usize,
        width: usize,
        channels: usize,
    },
}

impl Shape {
    pub fn flat(len: usize) -> Shape {
        Shape::Flat(len)
    }

    pub fn image(height: usize, width: usize, channels: usize) -> Shape {
        Shape::Image {
            height,
            width,
            channels,
        }
    }

    pub fn rank(&self) -> usize {
        match self {
            Shape::Flat(_) => 1,
            Shape::Image { .. } => 3,
        }
    }

    pub fn num_elements(&self) -> usize {
        match *self {
            Shape::Flat(len) => len,
            Shape::Image {
                height,
                width,
                channels,
            } => height * width * channels,
        }
    }

    /// The length of the last axis: channels for images, the vector length
    /// for flat data. This is the axis feature-wise layers operate on.
    pub fn num_features(&self) -> usize {
        match *self {
            Shape::Flat(len) => len,
            Shape::Image { channels, .. } => channels,
        }
    }

    pub fn channels(&self) -> Option<usize> {
        match *self {
            Shape::Flat(_) => None,
            Shape::Image { channels, .. } => Some(channels),
        }
    }

    pub fn dims(&self) -> Vec<usize> {
        match *self {
            Shape::Flat(len) => vec![len],
            Shape::Image {
                height,
                width,
                channels,
            } => vec![height, width, channels],
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Shape::Flat(len) => write!(f, "({},)", len),
            Shape::Image {
                height,
                width,
                channels,
            } => write!(f, "({}, {}, {})", height, width, channels),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Shape::flat(10).to_string(), "(10,)");
        assert_eq!(Shape::image(28, 28, 1).to_string(), "(28, 28, 1)");
    }

    #[test]
    fn test_num_elements() {
        assert_eq!(Shape::flat(10).num_elements(), 10);
        assert_eq!(Shape::image(13, 13, 15).num_elements(), 2535);
    }

    #[test]
    fn test_num_features() {
        assert_eq!(Shape::flat(200).num_features(), 200);
        assert_eq!(Shape::image(26, 26, 15).num_features(), 15);
    }
}
