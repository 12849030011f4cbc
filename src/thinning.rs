/// How many chain steps to discard between two emitted samples.
///
/// The skip count only depends on the dimension of the reduced space. Any
/// `Fn(usize) -> usize` closure can be used as a custom growth law.
pub trait Thinning {
    fn skip(&self, dim: usize) -> usize;
}

impl<F: Fn(usize) -> usize> Thinning for F {
    fn skip(&self, dim: usize) -> usize {
        self(dim)
    }
}

/// Emit every step of the chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoThinning;

impl Thinning for NoThinning {
    fn skip(&self, _dim: usize) -> usize {
        0
    }
}

/// Skip `⌈f·k⌉` steps.
#[derive(Debug, Clone, Copy)]
pub struct LinearThinning {
    pub scale: f64,
}

impl LinearThinning {
    pub fn new(scale: f64) -> Self {
        Self { scale }
    }
}

impl Thinning for LinearThinning {
    fn skip(&self, dim: usize) -> usize {
        scaled_ceil(self.scale, dim as f64)
    }
}

/// Skip `⌈f·k³⌉` steps, matching the mixing time bound of hit-and-run.
#[derive(Debug, Clone, Copy)]
pub struct CubicThinning {
    pub scale: f64,
}

impl CubicThinning {
    pub fn new(scale: f64) -> Self {
        Self { scale }
    }
}

impl Thinning for CubicThinning {
    fn skip(&self, dim: usize) -> usize {
        scaled_ceil(self.scale, (dim as f64).powi(3))
    }
}

// Negative or NaN scales saturate to zero in the cast.
fn scaled_ceil(scale: f64, growth: f64) -> usize {
    (scale * growth).ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn known_values() {
        assert_eq!(LinearThinning::new(1.).skip(3), 3);
        assert_eq!(LinearThinning::new(0.5).skip(3), 2);
        assert_eq!(CubicThinning::new(1.).skip(3), 27);
        assert_eq!(CubicThinning::new(0.1).skip(2), 1);
        assert_eq!(CubicThinning::new(1.).skip(0), 0);
        assert_eq!(LinearThinning::new(-1.).skip(4), 0);
        assert_eq!(NoThinning.skip(10), 0);
        assert_eq!((|dim: usize| dim * dim).skip(4), 16);
    }

    proptest! {
        #[test]
        fn monotone_in_dimension(scale in 0f64..10f64, dim in 0usize..200) {
            prop_assert!(LinearThinning::new(scale).skip(dim) <= LinearThinning::new(scale).skip(dim + 1));
            prop_assert!(CubicThinning::new(scale).skip(dim) <= CubicThinning::new(scale).skip(dim + 1));
        }

        #[test]
        fn monotone_in_scale(scale in 0f64..10f64, extra in 0f64..10f64, dim in 0usize..200) {
            prop_assert!(LinearThinning::new(scale).skip(dim) <= LinearThinning::new(scale + extra).skip(dim));
            prop_assert!(CubicThinning::new(scale).skip(dim) <= CubicThinning::new(scale + extra).skip(dim));
        }
    }
}
