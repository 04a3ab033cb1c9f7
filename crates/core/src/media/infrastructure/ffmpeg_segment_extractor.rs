use std::path::{Path, PathBuf};

use crate::media::domain::error::MediaError;
use crate::media::domain::segment_extractor::SegmentExtractor;
use crate::media::infrastructure::ffmpeg_probe;
use crate::shared::audio_asset::AudioAsset;
use crate::shared::constants::ANALYSIS_SAMPLE_RATE;
use crate::shared::files;

const ENCODER_FRAME_SIZE: usize = 1024;

/// Splits audio files at planned cut points using ffmpeg-next.
///
/// MP3 and WAV sources are cut with a stream copy (no re-encode); other
/// containers are decoded once and re-encoded as mono WAV chunks. Either
/// way the output timestamps match `ffmpeg -c copy` segmenting.
pub struct FfmpegSegmentExtractor;

impl SegmentExtractor for FfmpegSegmentExtractor {
    fn extract(
        &self,
        asset: &AudioAsset,
        cut_points_ms: &[u64],
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, MediaError> {
        let mut created = Vec::new();
        let result = if asset.format.supports_stream_copy() {
            stream_copy_split(asset, cut_points_ms, out_dir, &mut created)
        } else {
            reencode_split(asset, cut_points_ms, out_dir, &mut created)
        };

        match result {
            Ok(paths) => {
                if paths.len() != cut_points_ms.len() + 1 {
                    let produced = paths.len();
                    files::remove_files(&paths);
                    return Err(MediaError::IncompleteSplit {
                        expected: cut_points_ms.len() + 1,
                        produced,
                    });
                }
                Ok(paths)
            }
            Err(e) => {
                files::remove_files(&created);
                Err(e)
            }
        }
    }
}

fn chunk_path(asset: &AudioAsset, out_dir: &Path, index: usize, ext: &str) -> PathBuf {
    let stem = asset
        .path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");
    out_dir.join(format!("{stem}_chunk_{index}.{ext}"))
}

fn ms_to_stream_ts(ms: u64, time_base: ffmpeg_next::Rational) -> i64 {
    let num = time_base.numerator().max(1) as i64;
    let den = time_base.denominator() as i64;
    (ms as i64 * den) / (1000 * num)
}

fn open_copy_output(
    path: &Path,
    params: &ffmpeg_next::codec::Parameters,
) -> Result<(ffmpeg_next::format::context::Output, ffmpeg_next::Rational), MediaError> {
    let mut octx = ffmpeg_next::format::output(&path)?;
    let mut ost = octx.add_stream(ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::None))?;
    ost.set_parameters(params.clone());
    unsafe {
        (*ost.parameters().as_mut_ptr()).codec_tag = 0;
    }
    octx.write_header()?;
    let out_tb = octx
        .stream(0)
        .ok_or(MediaError::Ffmpeg(ffmpeg_next::Error::StreamNotFound))?
        .time_base();
    Ok((octx, out_tb))
}

fn stream_copy_split(
    asset: &AudioAsset,
    cut_points_ms: &[u64],
    out_dir: &Path,
    created: &mut Vec<PathBuf>,
) -> Result<Vec<PathBuf>, MediaError> {
    ffmpeg_next::init()?;

    let mut ictx = ffmpeg_next::format::input(&asset.path).map_err(|e| MediaError::Decode {
        path: asset.path.clone(),
        source: e,
    })?;

    let (in_index, in_tb, params) = {
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Audio)
            .ok_or_else(|| MediaError::NoAudioStream(asset.path.clone()))?;
        (stream.index(), stream.time_base(), stream.parameters())
    };

    let boundaries: Vec<i64> = cut_points_ms
        .iter()
        .map(|ms| ms_to_stream_ts(*ms, in_tb))
        .collect();
    let ext = asset.format.extension();

    let mut finished = Vec::new();
    let mut current_path = chunk_path(asset, out_dir, 0, ext);
    created.push(current_path.clone());
    let (mut octx, mut out_tb) = open_copy_output(&current_path, &params)?;
    let mut next_boundary = 0;

    for (stream, mut packet) in ictx.packets() {
        if stream.index() != in_index {
            continue;
        }
        let pts = packet.pts().or_else(|| packet.dts()).unwrap_or(0);

        while next_boundary < boundaries.len() && pts >= boundaries[next_boundary] {
            octx.write_trailer()?;
            log::info!("Created chunk file: {}", current_path.display());
            finished.push(current_path);

            next_boundary += 1;
            current_path = chunk_path(asset, out_dir, finished.len(), ext);
            created.push(current_path.clone());
            let (next_octx, next_tb) = open_copy_output(&current_path, &params)?;
            octx = next_octx;
            out_tb = next_tb;
        }

        packet.rescale_ts(in_tb, out_tb);
        packet.set_stream(0);
        packet.set_position(-1);
        packet.write_interleaved(&mut octx)?;
    }

    octx.write_trailer()?;
    log::info!("Created chunk file: {}", current_path.display());
    finished.push(current_path);
    Ok(finished)
}

fn reencode_split(
    asset: &AudioAsset,
    cut_points_ms: &[u64],
    out_dir: &Path,
    created: &mut Vec<PathBuf>,
) -> Result<Vec<PathBuf>, MediaError> {
    let audio = ffmpeg_probe::decode_mono(&asset.path, ANALYSIS_SAMPLE_RATE)?;
    let samples = audio.samples();

    let mut boundaries: Vec<u64> = cut_points_ms.to_vec();
    boundaries.push(asset.duration_ms);

    let mut finished = Vec::new();
    let mut start_ms = 0;
    for (index, end_ms) in boundaries.into_iter().enumerate() {
        let start = audio.sample_index_at_ms(start_ms);
        let end = audio.sample_index_at_ms(end_ms).max(start);
        let path = chunk_path(asset, out_dir, index, "wav");
        created.push(path.clone());
        write_wav_chunk(&path, &samples[start..end], ANALYSIS_SAMPLE_RATE)?;
        log::info!("Created chunk file: {}", path.display());
        finished.push(path);
        start_ms = end_ms;
    }
    Ok(finished)
}

/// Encode mono f32 samples as 16-bit PCM WAV.
fn write_wav_chunk(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), MediaError> {
    ffmpeg_next::init()?;

    let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::PCM_S16LE)
        .ok_or_else(|| MediaError::Encoder("pcm_s16le encoder not found".to_string()))?;

    let mut octx = ffmpeg_next::format::output(&path)?;
    let mut ost = octx.add_stream(Some(codec))?;
    let stream_index = ost.index();

    let mut encoder = ffmpeg_next::codec::context::Context::new_with_codec(codec)
        .encoder()
        .audio()?;
    encoder.set_rate(sample_rate as i32);
    encoder.set_channel_layout(ffmpeg_next::ChannelLayout::MONO);
    encoder.set_format(ffmpeg_next::format::Sample::I16(
        ffmpeg_next::format::sample::Type::Packed,
    ));
    encoder.set_time_base(ffmpeg_next::Rational::new(1, sample_rate as i32));

    let mut encoder = encoder.open_as(codec)?;
    ost.set_parameters(&encoder);

    octx.write_header()?;

    let enc_tb = encoder.time_base();
    let ost_tb = octx
        .stream(stream_index)
        .ok_or(MediaError::Ffmpeg(ffmpeg_next::Error::StreamNotFound))?
        .time_base();

    let mut pts: i64 = 0;
    for chunk in samples.chunks(ENCODER_FRAME_SIZE) {
        let mut frame = ffmpeg_next::util::frame::audio::Audio::new(
            ffmpeg_next::format::Sample::I16(ffmpeg_next::format::sample::Type::Packed),
            chunk.len(),
            ffmpeg_next::ChannelLayout::MONO,
        );
        frame.set_rate(sample_rate);
        frame.set_pts(Some(pts));

        let dst = frame.data_mut(0);
        for (i, sample) in chunk.iter().enumerate() {
            let value = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
            dst[i * 2..i * 2 + 2].copy_from_slice(&value.to_le_bytes());
        }

        encoder.send_frame(&frame)?;
        flush_packets(&mut encoder, &mut octx, stream_index, enc_tb, ost_tb)?;
        pts += chunk.len() as i64;
    }

    encoder.send_eof()?;
    flush_packets(&mut encoder, &mut octx, stream_index, enc_tb, ost_tb)?;
    octx.write_trailer()?;
    Ok(())
}

fn flush_packets(
    encoder: &mut ffmpeg_next::codec::encoder::audio::Encoder,
    octx: &mut ffmpeg_next::format::context::Output,
    stream_index: usize,
    enc_tb: ffmpeg_next::Rational,
    ost_tb: ffmpeg_next::Rational,
) -> Result<(), MediaError> {
    let mut encoded = ffmpeg_next::Packet::empty();
    while encoder.receive_packet(&mut encoded).is_ok() {
        encoded.set_stream(stream_index);
        encoded.rescale_ts(enc_tb, ost_tb);
        encoded.write_interleaved(octx)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::audio_asset::ContainerFormat;

    #[test]
    fn test_extract_missing_source_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let asset = AudioAsset {
            path: PathBuf::from("/nonexistent/audio.mp3"),
            duration_ms: 60_000,
            byte_size: 1,
            format: ContainerFormat::Mp3,
        };

        let extractor = FfmpegSegmentExtractor;
        let result = extractor.extract(&asset, &[30_000], dir.path());
        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_chunk_path_uses_source_stem_and_index() {
        let asset = AudioAsset {
            path: PathBuf::from("/tmp/meeting.mp3"),
            duration_ms: 0,
            byte_size: 0,
            format: ContainerFormat::Mp3,
        };
        let path = chunk_path(&asset, Path::new("/work"), 2, "mp3");
        assert_eq!(path, PathBuf::from("/work/meeting_chunk_2.mp3"));
    }

    #[test]
    fn test_ms_to_stream_ts() {
        // mp3 streams commonly use a 1/14112000 time base
        let tb = ffmpeg_next::Rational::new(1, 1000);
        assert_eq!(ms_to_stream_ts(500, tb), 500);
        let tb = ffmpeg_next::Rational::new(1, 44100);
        assert_eq!(ms_to_stream_ts(1000, tb), 44100);
    }
}
