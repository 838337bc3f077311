//! PCM audio data processing utilities
//!
//! This module provides conversion between integer WAV samples and the
//! codec's normalized float domain, plus interleaving helpers for stereo
//! streams.

/// Convert 16-bit integer samples to floats in [-1, 1]
pub fn i16_to_f32(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / 32768.0).collect()
}

/// Convert floats in [-1, 1] back to 16-bit integers with clamping
pub fn f32_to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0).round() as i16)
        .collect()
}

/// Split interleaved samples [L0, R0, L1, R1, ...] into per-channel buffers
pub fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let per_channel = samples.len() / channels.max(1);
    let mut buffers = vec![Vec::with_capacity(per_channel); channels];
    for (i, &s) in samples.iter().enumerate() {
        buffers[i % channels].push(s);
    }
    buffers
}

/// Merge per-channel buffers back into interleaved order.
///
/// Channels are truncated to the shortest buffer.
pub fn interleave(channels: &[Vec<f32>]) -> Vec<f32> {
    if channels.is_empty() {
        return Vec::new();
    }
    let len = channels.iter().map(|c| c.len()).min().unwrap_or(0);
    let mut out = Vec::with_capacity(len * channels.len());
    for i in 0..len {
        for channel in channels {
            out.push(channel[i]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i16_round_trip() {
        let samples = vec![0i16, 100, -100, 32767, -32768];
        let floats = i16_to_f32(&samples);
        assert!(floats[0].abs() < 1e-9);
        assert!((floats[3] - 0.99997).abs() < 1e-4);
        let back = f32_to_i16(&floats);
        for (a, b) in samples.iter().zip(back.iter()) {
            assert!((a - b).abs() <= 1, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_f32_clamps_out_of_range() {
        let out = f32_to_i16(&[2.0, -2.0]);
        assert_eq!(out, vec![32767, -32767]);
    }

    #[test]
    fn test_deinterleave_interleave_round_trip() {
        let samples: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let channels = deinterleave(&samples, 2);
        assert_eq!(channels[0], vec![0.0, 2.0, 4.0, 6.0, 8.0]);
        assert_eq!(channels[1], vec![1.0, 3.0, 5.0, 7.0, 9.0]);
        assert_eq!(interleave(&channels), samples);
    }

    #[test]
    fn test_interleave_truncates_to_shortest() {
        let channels = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0]];
        assert_eq!(interleave(&channels), vec![1.0, 4.0, 2.0, 5.0]);
    }
}
