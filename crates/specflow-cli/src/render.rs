//! Text rendering of display columns.

/// Intensity ramp for one-line spectrogram rows, dark to bright.
const RAMP: &[u8] = b" .:-=+*#%@";

/// One character per bucket, picked from [`RAMP`] by level in `[0, 1]`.
pub fn spectrogram_row(levels: &[f64]) -> String {
    let top = (RAMP.len() - 1) as f64;
    levels
        .iter()
        .map(|&v| {
            let index = (v.clamp(0.0, 1.0) * top).round() as usize;
            char::from(RAMP[index])
        })
        .collect()
}

/// Vertical bar chart, `rows` lines tall, top line first.
///
/// A bucket fills row `r` (counted from the bottom) once its level reaches
/// `(r + 1) / rows`; half-filled rows show as `.`.
pub fn bar_chart(levels: &[f64], rows: usize) -> Vec<String> {
    let rows = rows.max(1);
    (0..rows)
        .rev()
        .map(|row| {
            levels
                .iter()
                .map(|&v| {
                    let height = v.clamp(0.0, 1.0) * rows as f64 - row as f64;
                    if height >= 1.0 {
                        '#'
                    } else if height >= 0.5 {
                        '.'
                    } else {
                        ' '
                    }
                })
                .collect()
        })
        .collect()
}
