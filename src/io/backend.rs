//! cpal output stream driving a `SynthEngine`.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::engine::SynthEngine;
use crate::error::{BackendError, BackendResult};
use crate::MAX_BLOCK_SIZE;

/// A running output stream. Audio stops when this is dropped.
pub struct OutputStream {
    _stream: cpal::Stream,
    pub device_name: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Open an output device and start pulling audio from `engine`.
///
/// `device_hint` picks the first output device whose name contains it
/// (case-insensitive); without a hint, or if nothing matches, the host
/// default is used. The engine is moved to the device's sample rate before
/// the stream starts.
pub fn start_output(
    mut engine: SynthEngine,
    device_hint: Option<&str>,
) -> BackendResult<OutputStream> {
    let host = cpal::default_host();
    let device = find_device(&host, device_hint)?;
    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

    let supported = device.default_output_config()?;
    if supported.sample_format() != cpal::SampleFormat::F32 {
        return Err(BackendError::UnsupportedFormat(supported.sample_format()));
    }
    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels();
    engine.set_sample_rate(sample_rate as f32);

    tracing::debug!(
        device = %device_name,
        sample_rate,
        channels,
        "opening output stream"
    );

    let channel_count = channels as usize;
    let mut stereo = vec![0.0f32; MAX_BLOCK_SIZE * 2];
    let stream = device.build_output_stream(
        &supported.into(),
        move |data: &mut [f32], _| {
            let total_frames = data.len() / channel_count;
            let mut frames_written = 0;

            while frames_written < total_frames {
                let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                let block = &mut stereo[..frames * 2];
                engine.process(block, frames);

                let out_off = frames_written * channel_count;
                let out = &mut data[out_off..out_off + frames * channel_count];
                write_channels(block, out, channel_count);
                frames_written += frames;
            }
        },
        |err| tracing::warn!(%err, "output stream error"),
        None,
    )?;

    stream.play()?;

    Ok(OutputStream {
        _stream: stream,
        device_name,
        sample_rate,
        channels,
    })
}

fn find_device(host: &cpal::Host, hint: Option<&str>) -> BackendResult<cpal::Device> {
    if let Some(hint) = hint {
        let wanted = hint.to_lowercase();
        let matched = host.output_devices()?.find(|device| {
            device
                .name()
                .map(|name| name.to_lowercase().contains(&wanted))
                .unwrap_or(false)
        });
        match matched {
            Some(device) => return Ok(device),
            None => tracing::debug!(hint, "no output device matches, using default"),
        }
    }
    host.default_output_device()
        .ok_or(BackendError::NoOutputDevice)
}

/// Spread interleaved stereo across `channels` device channels. Mono
/// devices get the average; channels past the second stay silent.
fn write_channels(stereo: &[f32], out: &mut [f32], channels: usize) {
    for (frame, lr) in out.chunks_exact_mut(channels).zip(stereo.chunks_exact(2)) {
        match frame {
            [mono] => *mono = (lr[0] + lr[1]) * 0.5,
            [left, right, rest @ ..] => {
                *left = lr[0];
                *right = lr[1];
                rest.fill(0.0);
            }
            [] => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_channels_layouts() {
        let stereo = [0.5, -0.5, 1.0, 0.0];

        let mut mono = [9.0; 2];
        write_channels(&stereo, &mut mono, 1);
        assert_eq!(mono, [0.0, 0.5]);

        let mut quad = [9.0; 8];
        write_channels(&stereo, &mut quad, 4);
        assert_eq!(quad, [0.5, -0.5, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
    }
}
