//! Stage 5: audio tracks and previews
//!
//! Each audio key's `<key>.ogg` is decoded, range-checked for non-bonus
//! bundles, resampled and re-encoded in place. A preview clip is cut from
//! the normalized track around the preview window, padded by the fade
//! margins, faded and written next to it.

use super::{asset_keys, not_found, Staged};
use crate::manifest::Manifest;
use crate::media::audio::{self, PcmAudio};
use iacta_common::config::AudioPolicy;
use iacta_common::{AssetKey, DurationMs, ErrorAggregate, Failure, Policy};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Track and preview filenames per asset key
#[derive(Debug, Clone, Default)]
pub struct AudioAssets {
    pub tracks: BTreeMap<AssetKey, String>,
    pub previews: BTreeMap<AssetKey, String>,
}

pub fn track_name(key: AssetKey) -> String {
    format!("{}.ogg", key)
}

/// `preview.ogg` for the base track, `<key>_preview.ogg` otherwise
pub fn preview_name(key: AssetKey) -> String {
    match key {
        AssetKey::Base => "preview.ogg".to_string(),
        AssetKey::Class(class) => format!("{}_preview.ogg", class),
    }
}

pub fn run(root: &Path, policy: &Policy, manifest: &Manifest) -> Staged<AudioAssets> {
    let mut errors = ErrorAggregate::new();
    let mut assets = AudioAssets::default();

    for key in asset_keys(manifest, |d| d.overrides_audio()) {
        let name = track_name(key);
        let path = root.join(&name);
        if !path.is_file() {
            errors.add(name, not_found(&path));
            continue;
        }

        let decoded = match audio::decode_file(&path) {
            Ok(pcm) => pcm,
            Err(e) => {
                errors.add(name, Failure::fault("Media", e));
                continue;
            }
        };

        if !manifest.event_info.is_bonus {
            if let Err(reason) = check_length(decoded.duration(), &policy.audio) {
                warn!(track = %name, "{}", reason);
                errors.add(name.clone(), reason);
            }
        }

        let track = match decoded
            .resampled(policy.audio.sampling_rate)
            .and_then(|pcm| audio::write_vorbis(&path, &pcm, policy.audio.vorbis_quality).map(|_| pcm))
        {
            Ok(pcm) => pcm,
            Err(e) => {
                errors.add(name, Failure::fault("Media", e));
                continue;
            }
        };
        assets.tracks.insert(key, name);

        let preview = preview_name(key);
        let (begin, end) = preview_window(manifest, key);
        let duration = track.duration();
        if end > duration.as_millis() {
            errors.add(
                preview.clone(),
                format!(
                    "Invalid 'audioPreviewEnd': {} is beyond the track length {}",
                    DurationMs(end),
                    duration
                ),
            );
        }

        let clip = cut_preview(&track, begin, end, &policy.audio);
        drop(track);
        if clip.frames() == 0 {
            errors.add(preview, "Preview window lies outside the track");
            continue;
        }

        match audio::write_vorbis(&root.join(&preview), &clip, policy.audio.vorbis_quality) {
            Ok(()) => {
                debug!(preview = %preview, length = %clip.duration(), "Preview written");
                assets.previews.insert(key, preview);
            }
            Err(e) => errors.add(preview, Failure::fault("Media", e)),
        }
    }

    info!(tracks = assets.tracks.len(), previews = assets.previews.len(), "Audio normalized");
    Staged::new(assets, errors)
}

/// Duration must lie in the configured inclusive range
pub fn check_length(length: DurationMs, policy: &AudioPolicy) -> Result<(), String> {
    let (min, max) = policy.time_range;
    if length < min {
        Err(format!("Audio too short: minimum length is {}, got {}", min, length))
    } else if length > max {
        Err(format!("Audio too long: maximum length is {}, got {}", max, length))
    } else {
        Ok(())
    }
}

/// Preview markers: the difficulty's when both are set, else the song's
fn preview_window(manifest: &Manifest, key: AssetKey) -> (u64, u64) {
    let song = (manifest.audio_preview, manifest.audio_preview_end);
    match key {
        AssetKey::Base => song,
        AssetKey::Class(class) => manifest
            .difficulty(class)
            .and_then(|d| d.preview_window())
            .unwrap_or(song),
    }
}

/// Window widened by the fade margins (clamped to the track), then faded
pub fn cut_preview(track: &PcmAudio, begin: u64, end: u64, policy: &AudioPolicy) -> PcmAudio {
    let length = track.duration().as_millis();
    let clip_begin = begin.saturating_sub(policy.fade_in.as_millis());
    let clip_end = end.saturating_add(policy.fade_out.as_millis()).min(length);

    let mut clip = track.slice_ms(clip_begin, clip_end);
    clip.apply_fades(policy.fade_curve, policy.fade_in, policy.fade_out);
    clip
}
