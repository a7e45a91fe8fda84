//! Audio decoding, resampling and encoding
//!
//! Any container symphonia can probe is decoded to interleaved f32 PCM.
//! Hit-sounds are written back as 16-bit PCM WAV (hound); tracks and
//! previews as Ogg Vorbis (vorbis_rs).

use crate::error::MediaError;
use iacta_common::{DurationMs, FadeCurve};
use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use std::fs::File;
use std::io::BufWriter;
use std::num::{NonZeroU32, NonZeroU8};
use std::path::Path;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::IntoSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use tracing::{debug, warn};
use vorbis_rs::{VorbisBitrateManagementStrategy, VorbisEncoderBuilder};

/// Frames handed to the Vorbis encoder per block
const VORBIS_BLOCK_FRAMES: usize = 4096;

/// Interleaved PCM audio
#[derive(Debug, Clone, PartialEq)]
pub struct PcmAudio {
    /// Interleaved samples, normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    pub channels: usize,
    pub sample_rate: u32,
}

impl PcmAudio {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1)
    }

    /// Length rounded to the nearest millisecond
    pub fn duration(&self) -> DurationMs {
        if self.sample_rate == 0 {
            return DurationMs(0);
        }
        let ms = (self.frames() as u64 * 1000 + self.sample_rate as u64 / 2) / self.sample_rate as u64;
        DurationMs(ms)
    }

    /// Frame index closest to `ms`, clamped to the buffer
    pub fn frame_at(&self, ms: u64) -> usize {
        let frame = (ms as u128 * self.sample_rate as u128 / 1000) as usize;
        frame.min(self.frames())
    }

    /// Copy of the `[begin_ms, end_ms)` window, clamped to the buffer
    pub fn slice_ms(&self, begin_ms: u64, end_ms: u64) -> PcmAudio {
        let begin = self.frame_at(begin_ms);
        let end = self.frame_at(end_ms).max(begin);
        PcmAudio {
            samples: self.samples[begin * self.channels..end * self.channels].to_vec(),
            channels: self.channels,
            sample_rate: self.sample_rate,
        }
    }

    /// Fade in over `fade_in` and out over `fade_out` with `curve`
    pub fn apply_fades(&mut self, curve: FadeCurve, fade_in: DurationMs, fade_out: DurationMs) {
        let fade_in_frames = self.frame_at(fade_in.as_millis());
        let fade_out_frames = self.frame_at(fade_out.as_millis());
        curve.apply_fade_in(&mut self.samples, self.channels, fade_in_frames);
        curve.apply_fade_out(&mut self.samples, self.channels, fade_out_frames);
    }

    /// Resample to `target_rate`; unchanged when the rate already matches
    pub fn resampled(self, target_rate: u32) -> Result<PcmAudio, MediaError> {
        if self.sample_rate == target_rate || self.samples.is_empty() {
            return Ok(PcmAudio {
                sample_rate: target_rate,
                ..self
            });
        }

        let channels = self.channels;
        let num_frames = self.frames();
        let input = self.to_planar();

        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };
        let ratio = target_rate as f64 / self.sample_rate as f64;

        // Chunk size = input length for single-pass processing
        let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, num_frames, channels)
            .map_err(|e| MediaError::Resample(e.to_string()))?;
        let output = resampler
            .process(&input, None)
            .map_err(|e| MediaError::Resample(e.to_string()))?;

        let resampled = PcmAudio::from_planar(&output, target_rate);
        debug!(
            "Resampled {} frames ({} Hz) → {} frames ({} Hz)",
            num_frames,
            self.sample_rate,
            resampled.frames(),
            target_rate
        );
        Ok(resampled)
    }

    /// One buffer per channel
    pub fn to_planar(&self) -> Vec<Vec<f32>> {
        let channels = self.channels.max(1);
        let mut planar = vec![Vec::with_capacity(self.frames()); channels];
        for frame in self.samples.chunks_exact(channels) {
            for (ch, sample) in frame.iter().enumerate() {
                planar[ch].push(*sample);
            }
        }
        planar
    }

    pub fn from_planar(planar: &[Vec<f32>], sample_rate: u32) -> PcmAudio {
        let channels = planar.len();
        let frames = planar.iter().map(Vec::len).min().unwrap_or(0);
        let mut samples = Vec::with_capacity(frames * channels);
        for i in 0..frames {
            for channel in planar {
                samples.push(channel[i]);
            }
        }
        PcmAudio {
            samples,
            channels,
            sample_rate,
        }
    }
}

/// Decode an entire audio file
pub fn decode_file(path: &Path) -> Result<PcmAudio, MediaError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    // Sniff the real container; samples are often misnamed
    match infer::get_from_path(path) {
        Ok(Some(kind)) => {
            hint.with_extension(kind.extension());
        }
        _ => {
            if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                hint.with_extension(ext);
            }
        }
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| MediaError::Decode(format!("Failed to probe audio format: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(MediaError::NoTrack)?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| MediaError::Decode(format!("Failed to create decoder: {}", e)))?;

    let mut samples = Vec::new();
    let mut channels = codec_params.channels.map(|c| c.count()).unwrap_or(0);
    let mut sample_rate = codec_params.sample_rate.unwrap_or(0);

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(MediaError::Decode(format!("Failed to read packet: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(path = %path.display(), "Decode error in packet, skipping: {}", e);
                continue;
            }
            Err(e) => return Err(MediaError::Decode(format!("Fatal decode error: {}", e))),
        };

        channels = decoded.spec().channels.count();
        sample_rate = decoded.spec().rate;

        match decoded {
            AudioBufferRef::U8(buf) => interleave_into(&mut samples, &*buf),
            AudioBufferRef::U16(buf) => interleave_into(&mut samples, &*buf),
            AudioBufferRef::U24(buf) => interleave_into(&mut samples, &*buf),
            AudioBufferRef::U32(buf) => interleave_into(&mut samples, &*buf),
            AudioBufferRef::S8(buf) => interleave_into(&mut samples, &*buf),
            AudioBufferRef::S16(buf) => interleave_into(&mut samples, &*buf),
            AudioBufferRef::S24(buf) => interleave_into(&mut samples, &*buf),
            AudioBufferRef::S32(buf) => interleave_into(&mut samples, &*buf),
            AudioBufferRef::F32(buf) => interleave_into(&mut samples, &*buf),
            AudioBufferRef::F64(buf) => interleave_into(&mut samples, &*buf),
        }
    }

    if channels == 0 || sample_rate == 0 {
        return Err(MediaError::Decode("Stream has no channels or sample rate".to_string()));
    }

    let audio = PcmAudio {
        samples,
        channels,
        sample_rate,
    };
    debug!(
        path = %path.display(),
        channels,
        sample_rate,
        duration = %audio.duration(),
        "Decoded audio"
    );
    Ok(audio)
}

fn interleave_into<S>(out: &mut Vec<f32>, buf: &AudioBuffer<S>)
where
    S: Sample + IntoSample<f32>,
{
    let channels = buf.spec().channels.count();
    out.reserve(buf.frames() * channels);
    for frame in 0..buf.frames() {
        for ch in 0..channels {
            out.push(buf.chan(ch)[frame].into_sample());
        }
    }
}

/// Write 16-bit PCM WAV
pub fn write_wav(path: &Path, audio: &PcmAudio) -> Result<(), MediaError> {
    let channels = u16::try_from(audio.channels)
        .map_err(|_| MediaError::Encode(format!("Too many channels: {}", audio.channels)))?;
    let spec = hound::WavSpec {
        channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(|e| MediaError::Encode(e.to_string()))?;
    for &sample in &audio.samples {
        let value = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        writer
            .write_sample(value)
            .map_err(|e| MediaError::Encode(e.to_string()))?;
    }
    writer.finalize().map_err(|e| MediaError::Encode(e.to_string()))?;
    Ok(())
}

/// Write Ogg Vorbis at the given VBR quality (-0.1 to 1.0)
pub fn write_vorbis(path: &Path, audio: &PcmAudio, quality: f32) -> Result<(), MediaError> {
    let rate = NonZeroU32::new(audio.sample_rate)
        .ok_or_else(|| MediaError::Encode("Sample rate must be positive".to_string()))?;
    let channels = u8::try_from(audio.channels)
        .ok()
        .and_then(NonZeroU8::new)
        .ok_or_else(|| MediaError::Encode(format!("Unsupported channel count: {}", audio.channels)))?;

    let sink = BufWriter::new(File::create(path)?);
    let mut builder =
        VorbisEncoderBuilder::new(rate, channels, sink).map_err(|e| MediaError::Encode(e.to_string()))?;
    builder.bitrate_management_strategy(VorbisBitrateManagementStrategy::QualityVbr {
        target_quality: quality,
    });
    let mut encoder = builder.build().map_err(|e| MediaError::Encode(e.to_string()))?;

    let planar = audio.to_planar();
    let frames = audio.frames();
    let mut start = 0;
    while start < frames {
        let end = (start + VORBIS_BLOCK_FRAMES).min(frames);
        let block: Vec<&[f32]> = planar.iter().map(|ch| &ch[start..end]).collect();
        encoder
            .encode_audio_block(&block)
            .map_err(|e| MediaError::Encode(e.to_string()))?;
        start = end;
    }
    encoder.finish().map_err(|e| MediaError::Encode(e.to_string()))?;
    Ok(())
}
