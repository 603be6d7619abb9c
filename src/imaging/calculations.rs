//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the largest dimensions that fit inside `bound` while keeping
/// the aspect ratio of `original`.
///
/// Images already inside the bound are returned unchanged; this never
/// upscales. Neither output dimension is ever zero.
///
/// # Arguments
/// * `original` - Source image dimensions (width, height)
/// * `bound` - Maximum allowed (width, height)
///
/// # Examples
/// ```
/// # use simple_folio::imaging::fit_within;
/// // 4000x3000 landscape into a 1280 box → 1280x960
/// assert_eq!(fit_within((4000, 3000), (1280, 1280)), (1280, 960));
///
/// // Already small enough → untouched
/// assert_eq!(fit_within((640, 480), (1280, 1280)), (640, 480));
/// ```
pub fn fit_within(original: (u32, u32), bound: (u32, u32)) -> (u32, u32) {
    let (orig_w, orig_h) = original;
    let (max_w, max_h) = bound;

    if orig_w <= max_w && orig_h <= max_h {
        return original;
    }

    let scale_w = max_w as f64 / orig_w as f64;
    let scale_h = max_h as f64 / orig_h as f64;
    let scale = scale_w.min(scale_h);

    let w = ((orig_w as f64 * scale).round() as u32).clamp(1, max_w);
    let h = ((orig_h as f64 * scale).round() as u32).clamp(1, max_h);
    (w, h)
}

/// Whether `original` has to be scaled down to satisfy `bound`.
pub fn exceeds(original: (u32, u32), bound: (u32, u32)) -> bool {
    original.0 > bound.0 || original.1 > bound.1
}
