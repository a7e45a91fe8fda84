//! Bundle fixture generator
//!
//! Builds complete, valid bundle directories that individual tests then
//! break in one specific way.

use iacta_common::config::TrailingComma;
use iacta_common::Policy;
use iacta_ingest::manifest::Manifest;
use iacta_ingest::stages::manifest::canonical_text;
use std::fs;
use std::path::Path;

/// Small, fast policy: low sample rates, tiny images, short durations
pub const TEST_POLICY: &str = r#"
event_name = "Test Event"

[preparation]
no_root_found = "create"
cleaning_root = "force"
stray_items = "ignore"

[manifest]
accepts = ["songlist", "songlist.json", "slst.txt"]
normalize_to = "songlist"
choosing = "by_priority"
trailing_comma = "require"
sides = [0, 1]
ratings = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]
ratings_with_plus = [9, 10]
rating_classes = [0, 1, 2, 3]
custom_string_max_lines = 2
custom_string_max_line_length = 36

[manifest.fixed_fields]
set = "single"
purchase = ""

[charts]
density_range = [0.5, 2.0]

[hitsounds]
sampling_rate = 22050

[covers]
accepts = ["{}.jpg", "{}.png"]

[[covers.normalize_to]]
template = "{}.jpg"
size = [64, 64]

[[covers.normalize_to]]
template = "{}_256.jpg"
size = [32, 32]

[audio]
sampling_rate = 22050
time_range = [1000, 60000]
fade_in = 200
fade_out = 200

[backgrounds]
size = [64, 36]

[event]
sessions = 2

[technical]
digest_salts = ["one", "two", "three"]
"#;

/// What a generated bundle looks like
#[derive(Debug, Clone)]
pub struct BundleSpec {
    pub id: String,
    pub manifest_name: String,
    pub track_ms: u64,
    pub is_bonus: bool,
    pub charters: Vec<String>,
    pub signed: bool,
    /// Custom hit-sound referenced by the Future chart
    pub hitsound: Option<String>,
}

impl BundleSpec {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            manifest_name: "slst.txt".to_string(),
            track_ms: 3000,
            is_bonus: false,
            charters: vec!["Someone".to_string()],
            signed: true,
            hitsound: None,
        }
    }
}

fn build_manifest(spec: &BundleSpec) -> Manifest {
    let difficulty = |class: u8, rating: i32| {
        serde_json::json!({
            "ratingClass": class,
            "chartDesigner": "Someone",
            "jacketDesigner": "Painter",
            "rating": rating,
        })
    };
    let value = serde_json::json!({
        "id": spec.id,
        "title_localized": {"en": format!("Song {}", spec.id)},
        "artist": "Composer",
        "bpm": "120",
        "bpm_base": 120.0,
        "set": "single",
        "purchase": "",
        "audioPreview": 500,
        "audioPreviewEnd": 1500,
        "side": 0,
        "bg": "bg_custom",
        "date": 1700000000u64,
        "version": "1.0",
        "difficulties": [
            difficulty(0, 3),
            difficulty(1, 6),
            difficulty(2, 9),
            difficulty(3, -1),
        ],
        "event_info": {"is_bonus": spec.is_bonus, "charters": spec.charters},
    });
    serde_json::from_value(value).expect("fixture manifest must parse")
}

/// Manifest text as a bundle author would ship it
pub fn write_manifest(path: &Path, manifest: &Manifest) {
    let text = canonical_text(manifest, TrailingComma::Require).unwrap();
    fs::write(path, text).unwrap();
}

/// Re-sign `manifest` after a test edited it and write it to `path`
pub fn write_signed_manifest(path: &Path, manifest: &mut Manifest, policy: &Policy) {
    manifest.digest = None;
    manifest.digest = Some(manifest.expected_digest(&policy.technical.digest_salts).unwrap());
    write_manifest(path, manifest);
}

/// AFF chart with one arc, optionally carrying a custom hit-sound
pub fn write_chart(path: &Path, hitsound: Option<&str>) {
    let hitsound = hitsound.unwrap_or("none");
    let text = format!(
        "AudioOffset:0\nTimingPointDensityFactor:1.00\n-\n\
         timing(0,120.00,4.00);\n\
         (500,1);\n\
         hold(1000,1500,2);\n\
         arc(0,500,0.00,1.00,s,1.00,1.00,0,{},true)[arctap(250)];\n",
        hitsound
    );
    fs::write(path, text).unwrap();
}

/// 16-bit WAV sine tone, whatever the extension of `path`
pub fn write_tone(path: &Path, duration_ms: u64, sample_rate: u32, channels: u16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let frames = duration_ms * sample_rate as u64 / 1000;
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let sample = (0.3 * (2.0 * std::f32::consts::PI * 440.0 * t).sin() * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(sample).unwrap();
        }
    }
    writer.finalize().unwrap();
}

/// Gradient image; the format follows the extension
pub fn write_image(path: &Path, width: u32, height: u32) {
    let image = image::RgbImage::from_fn(width, height, |x, y| image::Rgb([x as u8, y as u8, 128]));
    image.save(path).unwrap();
}

/// Write a complete bundle into `root`; returns the manifest as written
pub fn write_bundle(root: &Path, spec: &BundleSpec, policy: &Policy) -> Manifest {
    fs::create_dir_all(root).unwrap();

    let mut manifest = build_manifest(spec);
    if spec.signed {
        manifest.digest = Some(manifest.expected_digest(&policy.technical.digest_salts).unwrap());
    }
    write_manifest(&root.join(&spec.manifest_name), &manifest);

    write_chart(&root.join("0.aff"), None);
    write_chart(&root.join("1.aff"), None);
    write_chart(&root.join("2.aff"), spec.hitsound.as_deref());
    if let Some(name) = &spec.hitsound {
        write_tone(&root.join(name), 200, 44100, 1);
    }

    // Real WAV content behind the .ogg name; the decoder sniffs the container
    write_tone(&root.join("base.ogg"), spec.track_ms, 22050, 2);
    write_image(&root.join("base.png"), 96, 96);
    write_image(&root.join("bg_custom.jpg"), 80, 45);
    fs::write(root.join("notes.txt"), "left over from authoring").unwrap();

    manifest
}
