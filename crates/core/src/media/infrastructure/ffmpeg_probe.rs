use std::fs;
use std::path::Path;

use crate::media::domain::audio_segment::AudioSegment;
use crate::media::domain::error::MediaError;
use crate::media::domain::media_probe::MediaProbe;
use crate::shared::audio_asset::{AudioAsset, ContainerFormat};

/// Probes and decodes audio files using ffmpeg-next.
pub struct FfmpegMediaProbe;

impl MediaProbe for FfmpegMediaProbe {
    fn probe(&self, path: &Path) -> Result<AudioAsset, MediaError> {
        if !path.exists() {
            return Err(MediaError::NotFound(path.to_path_buf()));
        }

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ContainerFormat::from_extension)
            .ok_or_else(|| {
                MediaError::UnsupportedFormat(
                    path.extension()
                        .and_then(|e| e.to_str())
                        .unwrap_or("<none>")
                        .to_string(),
                )
            })?;

        let byte_size = fs::metadata(path)
            .map_err(|e| MediaError::Io {
                path: path.to_path_buf(),
                source: e,
            })?
            .len();

        ffmpeg_next::init()?;
        let ictx = ffmpeg_next::format::input(path).map_err(|e| MediaError::Decode {
            path: path.to_path_buf(),
            source: e,
        })?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Audio)
            .ok_or_else(|| MediaError::NoAudioStream(path.to_path_buf()))?;

        // Container duration is in AV_TIME_BASE (microsecond) units; fall
        // back to the stream duration when the container does not carry one.
        let duration_ms = if ictx.duration() > 0 {
            (ictx.duration() as u64) / 1000
        } else {
            let tb = stream.time_base();
            let stream_duration = stream.duration().max(0) as u64;
            stream_duration * 1000 * tb.numerator() as u64 / tb.denominator().max(1) as u64
        };

        Ok(AudioAsset {
            path: path.to_path_buf(),
            duration_ms,
            byte_size,
            format,
        })
    }

    fn decode_mono(&self, path: &Path, sample_rate: u32) -> Result<AudioSegment, MediaError> {
        decode_mono(path, sample_rate)
    }
}

/// Decode the full audio track to mono f32 PCM at `sample_rate`.
/// Shared by the probe and the re-encoding segment extractor.
pub(crate) fn decode_mono(path: &Path, sample_rate: u32) -> Result<AudioSegment, MediaError> {
    if !path.exists() {
        return Err(MediaError::NotFound(path.to_path_buf()));
    }
    ffmpeg_next::init()?;

    let mut ictx = ffmpeg_next::format::input(path).map_err(|e| MediaError::Decode {
        path: path.to_path_buf(),
        source: e,
    })?;

    let audio_stream = ictx
        .streams()
        .best(ffmpeg_next::media::Type::Audio)
        .ok_or_else(|| MediaError::NoAudioStream(path.to_path_buf()))?;

    let audio_stream_index = audio_stream.index();
    let codec_params = audio_stream.parameters();

    let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(codec_params)?;
    let mut decoder = codec_ctx.decoder().audio()?;

    let mut resampler = ffmpeg_next::software::resampling::Context::get(
        decoder.format(),
        decoder.channel_layout(),
        decoder.rate(),
        ffmpeg_next::format::Sample::F32(ffmpeg_next::format::sample::Type::Planar),
        ffmpeg_next::ChannelLayout::MONO,
        sample_rate,
    )?;

    let mut all_samples: Vec<f32> = Vec::new();
    let mut decoded_frame = ffmpeg_next::util::frame::audio::Audio::empty();
    let mut resampled_frame = ffmpeg_next::util::frame::audio::Audio::empty();

    for (stream, packet) in ictx.packets() {
        if stream.index() != audio_stream_index {
            continue;
        }

        decoder.send_packet(&packet)?;

        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            resampler.run(&decoded_frame, &mut resampled_frame)?;
            extract_f32_samples(&resampled_frame, &mut all_samples);
        }
    }

    // Flush the decoder
    decoder.send_eof()?;
    while decoder.receive_frame(&mut decoded_frame).is_ok() {
        resampler.run(&decoded_frame, &mut resampled_frame)?;
        extract_f32_samples(&resampled_frame, &mut all_samples);
    }

    // Flush the resampler (may have buffered samples)
    if let Ok(Some(delay)) = resampler.flush(&mut resampled_frame) {
        if delay.output > 0 {
            extract_f32_samples(&resampled_frame, &mut all_samples);
        }
    }

    Ok(AudioSegment::new(all_samples, sample_rate, 1))
}

fn extract_f32_samples(frame: &ffmpeg_next::util::frame::audio::Audio, out: &mut Vec<f32>) {
    let sample_count = frame.samples();
    if sample_count == 0 {
        return;
    }
    let data = frame.data(0);
    let byte_len = sample_count * std::mem::size_of::<f32>();
    let floats: &[f32] = unsafe {
        std::slice::from_raw_parts(data.as_ptr() as *const f32, byte_len / 4)
    };
    out.extend_from_slice(floats);
}
