//! Global binarization.

use marker_track_core::GrayImage;

use crate::ThresholdMode;

/// Otsu's threshold over the whole image histogram.
pub fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut hist = [0u32; 256];
    for &v in &gray.data {
        hist[v as usize] += 1;
    }
    otsu_from_histogram(&hist)
}

fn otsu_from_histogram(hist: &[u32; 256]) -> u8 {
    let total: f64 = hist.iter().map(|&h| h as f64).sum();
    if total < 1.0 {
        return 127;
    }

    let occupied: Vec<usize> = (0..256).filter(|&i| hist[i] > 0).collect();
    match occupied.as_slice() {
        [only] => return *only as u8,
        [lo, hi] => return ((lo + hi) / 2) as u8,
        _ => {}
    }

    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0.0;
    let mut w_b = 0.0;
    let mut best_var = -1.0;
    let mut best_t = 127u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }

    best_t
}

/// Resolve the level for this frame.
pub fn resolve_threshold(mode: ThresholdMode, gray: &GrayImage) -> u8 {
    match mode {
        ThresholdMode::Manual(t) => t,
        ThresholdMode::Otsu => otsu_threshold(gray),
    }
}

/// Foreground mask: `true` where the pixel is at or below `level`.
pub fn binarize(gray: &GrayImage, level: u8) -> Vec<bool> {
    gray.data.iter().map(|&v| v <= level).collect()
}
