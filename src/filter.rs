//! Filter operations and their value-typed parameters.
//!
//! The five transforms are independent leaves over the same buffer view;
//! [`Filter`] carries the operation together with its parameters so call
//! sites dispatch on one value. Parameter ranges marked `MIN_*`/`MAX_*`
//! are advisory slider bounds — the kernels accept any value and clamp
//! per channel after computation.

/// A filter operation plus its parameters, dispatched by the kernels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Filter {
    Grayscale(GrayscaleParams),
    Invert,
    Brightness(BrightnessParams),
    Contrast(ContrastParams),
    Sepia,
}

impl Filter {
    pub fn kind(&self) -> FilterKind {
        match self {
            Self::Grayscale(_) => FilterKind::Grayscale,
            Self::Invert => FilterKind::Invert,
            Self::Brightness(_) => FilterKind::Brightness,
            Self::Contrast(_) => FilterKind::Contrast,
            Self::Sepia => FilterKind::Sepia,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
    Grayscale,
    Invert,
    Brightness,
    Contrast,
    Sepia,
}

impl FilterKind {
    pub const ALL: [FilterKind; 5] = [
        FilterKind::Grayscale,
        FilterKind::Invert,
        FilterKind::Brightness,
        FilterKind::Contrast,
        FilterKind::Sepia,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Grayscale => "grayscale",
            Self::Invert => "invert",
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Sepia => "sepia",
        }
    }

    /// The operation with its default parameters.
    pub fn default_filter(self) -> Filter {
        match self {
            Self::Grayscale => Filter::Grayscale(GrayscaleParams::default()),
            Self::Invert => Filter::Invert,
            Self::Brightness => Filter::Brightness(BrightnessParams::default()),
            Self::Contrast => Filter::Contrast(ContrastParams::default()),
            Self::Sepia => Filter::Sepia,
        }
    }
}

/// Channel weights for the grayscale reduction.
///
/// The defaults are the BT.601 luma weights. Weights are not required to
/// sum to 1 and are not validated — the result is clamped to `[0, 255]`
/// after computation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GrayscaleParams {
    pub red_coefficient: f32,
    pub green_coefficient: f32,
    pub blue_coefficient: f32,
}

impl GrayscaleParams {
    pub const DEFAULT_RED_COEFFICIENT: f32 = 0.299;
    pub const DEFAULT_GREEN_COEFFICIENT: f32 = 0.587;
    pub const DEFAULT_BLUE_COEFFICIENT: f32 = 0.114;

    pub const MIN_COEFFICIENT: f32 = 0.0;
    pub const MAX_COEFFICIENT: f32 = 1.0;
}

impl Default for GrayscaleParams {
    fn default() -> Self {
        Self {
            red_coefficient: Self::DEFAULT_RED_COEFFICIENT,
            green_coefficient: Self::DEFAULT_GREEN_COEFFICIENT,
            blue_coefficient: Self::DEFAULT_BLUE_COEFFICIENT,
        }
    }
}

/// Signed per-channel adjustment for the brightness filter.
///
/// Any `i32` is accepted; arithmetic saturates at the channel bounds, it
/// never wraps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BrightnessParams {
    pub brightness: i32,
}

impl BrightnessParams {
    pub const DEFAULT_BRIGHTNESS: i32 = 0;

    pub const MIN_BRIGHTNESS: i32 = -100;
    pub const MAX_BRIGHTNESS: i32 = 100;
}

impl Default for BrightnessParams {
    fn default() -> Self {
        Self {
            brightness: Self::DEFAULT_BRIGHTNESS,
        }
    }
}

/// Scale factor for the contrast filter. `1.0` is identity; the pivot is
/// fixed at 128 regardless of image content.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContrastParams {
    pub contrast: f32,
}

impl ContrastParams {
    pub const DEFAULT_CONTRAST: f32 = 1.0;

    pub const MIN_CONTRAST: f32 = 0.5;
    pub const MAX_CONTRAST: f32 = 2.0;
}

impl Default for ContrastParams {
    fn default() -> Self {
        Self {
            contrast: Self::DEFAULT_CONTRAST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filters_carry_default_params() {
        match FilterKind::Grayscale.default_filter() {
            Filter::Grayscale(params) => {
                assert_eq!(params.red_coefficient, 0.299);
                assert_eq!(params.green_coefficient, 0.587);
                assert_eq!(params.blue_coefficient, 0.114);
            }
            other => panic!("unexpected filter: {other:?}"),
        }
        assert_eq!(
            FilterKind::Brightness.default_filter(),
            Filter::Brightness(BrightnessParams { brightness: 0 })
        );
        assert_eq!(
            FilterKind::Contrast.default_filter(),
            Filter::Contrast(ContrastParams { contrast: 1.0 })
        );
    }

    #[test]
    fn kind_round_trips_through_default_filter() {
        for kind in FilterKind::ALL {
            assert_eq!(kind.default_filter().kind(), kind);
        }
    }
}
