//! Synthetic fingerprint frames for the mock scanner.

use fingerprint_hardware::mock::MockScannerHandle;

/// Frame width of the simulated sensor.
pub const FRAME_WIDTH: u32 = 256;

/// Frame height of the simulated sensor.
pub const FRAME_HEIGHT: u32 = 360;

/// A ridge-like pattern: concentric rings around the frame centre.
pub fn ridge_frame(seed: u32) -> Vec<u8> {
    let cx = FRAME_WIDTH as f32 / 2.0;
    let cy = FRAME_HEIGHT as f32 / 2.0;
    let phase = seed as f32 * 0.7;

    (0..FRAME_HEIGHT)
        .flat_map(|y| (0..FRAME_WIDTH).map(move |x| (x, y)))
        .map(|(x, y)| {
            let r = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
            (127.5 + 110.0 * (r / 3.0 + phase).sin()) as u8
        })
        .collect()
}

/// Queue `count` frames; a negative `quality` makes the score unavailable.
///
/// # Errors
///
/// Returns an error if a generated frame does not match the sensor size.
pub fn queue_frames(
    mock: &MockScannerHandle,
    count: u32,
    quality: i32,
) -> fingerprint_hardware::Result<()> {
    let quality = (quality >= 0).then_some(quality);
    for seed in 0..count {
        mock.queue_frame(ridge_frame(seed), FRAME_WIDTH, FRAME_HEIGHT, quality)?;
    }
    Ok(())
}
