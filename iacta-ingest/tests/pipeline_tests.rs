//! Single-bundle pipeline tests
//!
//! Every test writes a complete bundle with the fixture generator, breaks
//! it in one way and runs `ingest_bundle` over it.

mod helpers;

use helpers::{
    file_names, test_policy, write_bundle, write_chart, write_image, write_signed_manifest, write_tone, BundleSpec,
};
use iacta_common::config::ManifestChoice;
use iacta_common::{AssetKey, DurationMs, RatingClass};
use iacta_ingest::manifest::{Category, Localized, RESTRICTED_FIELDS};
use iacta_ingest::media::audio::decode_file;
use iacta_ingest::stages::backgrounds::required_backgrounds;
use iacta_ingest::{ingest_bundle, IngestError};
use std::collections::BTreeSet;
use std::fs;
use tempfile::TempDir;

fn rejection(err: IngestError) -> iacta_common::ErrorAggregate {
    match err {
        IngestError::BadBundle { errors, .. } => errors,
        other => panic!("expected a bad bundle, got: {}", other),
    }
}

#[test]
fn test_valid_bundle_is_normalized() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("song");
    let policy = test_policy();
    write_bundle(&root, &BundleSpec::new("song"), &policy);

    let bundle = ingest_bundle(&root, &policy).unwrap();
    assert_eq!(bundle.id(), "song");
    assert_eq!(bundle.category(), Category::A);

    let assets = bundle.assets();
    assert_eq!(assets.manifest, "songlist");
    assert_eq!(
        assets.charts.keys().copied().collect::<Vec<_>>(),
        vec![RatingClass::Past, RatingClass::Present, RatingClass::Future]
    );
    assert_eq!(assets.audio.get(&AssetKey::Base).map(String::as_str), Some("base.ogg"));
    assert_eq!(assets.previews.get(&AssetKey::Base).map(String::as_str), Some("preview.ogg"));
    assert_eq!(
        assets.covers.get(&AssetKey::Base),
        Some(&vec!["base.jpg".to_string(), "base_256.jpg".to_string()])
    );
    assert_eq!(assets.backgrounds.get("bg_custom").map(String::as_str), Some("bg_custom.jpg"));

    // Exactly the kept assets remain
    let kept: Vec<String> = assets.all().into_iter().collect();
    assert_eq!(file_names(&root), kept);
    assert!(!root.join("slst.txt").exists());
    assert!(!root.join("notes.txt").exists());
    assert!(!root.join("base.png").exists());

    let manifest_text = fs::read_to_string(root.join("songlist")).unwrap();
    assert!(manifest_text.trim_end().ends_with("},"));

    assert_eq!(image::image_dimensions(root.join("base.jpg")).unwrap(), (64, 64));
    assert_eq!(image::image_dimensions(root.join("base_256.jpg")).unwrap(), (32, 32));
    assert_eq!(image::image_dimensions(root.join("bg_custom.jpg")).unwrap(), (64, 36));

    let track = decode_file(&root.join("base.ogg")).unwrap();
    assert_eq!(track.sample_rate, 22050);
    let preview = decode_file(&root.join("preview.ogg")).unwrap();
    // 500..1500 widened by 200 ms on each side
    let length = preview.duration().as_millis();
    assert!((1300..=1500).contains(&length), "preview length {}", length);
}

#[test]
fn test_missing_digest_rejects_bundle() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("song");
    let policy = test_policy();
    let spec = BundleSpec {
        signed: false,
        ..BundleSpec::new("song")
    };
    write_bundle(&root, &spec, &policy);

    let errors = rejection(ingest_bundle(&root, &policy).unwrap_err());
    assert_eq!(
        errors.get("digest").map(|f| f.message()),
        Some("Digest verification failed")
    );

    // Later stages never ran
    assert!(root.join("slst.txt").exists());
    assert!(root.join("notes.txt").exists());
    assert!(!root.join("preview.ogg").exists());
}

#[test]
fn test_tampered_manifest_rejects_bundle() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("song");
    let policy = test_policy();
    write_bundle(&root, &BundleSpec::new("song"), &policy);

    let path = root.join("slst.txt");
    let text = fs::read_to_string(&path).unwrap().replace("Composer", "Composer!");
    fs::write(&path, text).unwrap();

    let errors = rejection(ingest_bundle(&root, &policy).unwrap_err());
    assert!(errors.contains("digest"));
}

#[test]
fn test_hitsound_renamed_and_references_updated() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("song");
    let policy = test_policy();
    let spec = BundleSpec {
        hitsound: Some("clap.mp3".to_string()),
        ..BundleSpec::new("song")
    };
    write_bundle(&root, &spec, &policy);

    let bundle = ingest_bundle(&root, &policy).unwrap();
    assert!(bundle.assets().hitsounds.contains("clap.wav"));
    assert!(!root.join("clap.mp3").exists());

    let chart = fs::read_to_string(root.join("2.aff")).unwrap();
    assert!(chart.contains("clap.wav"));
    assert!(!chart.contains("clap.mp3"));

    let reader = hound::WavReader::open(root.join("clap.wav")).unwrap();
    assert_eq!(reader.spec().sample_rate, 22050);
    assert_eq!(reader.spec().bits_per_sample, 16);
}

#[test]
fn test_hitsound_rename_conflict() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("song");
    let policy = test_policy();
    let spec = BundleSpec {
        hitsound: Some("clap.mp3".to_string()),
        ..BundleSpec::new("song")
    };
    write_bundle(&root, &spec, &policy);
    write_tone(&root.join("clap.wav"), 100, 44100, 1);

    let errors = rejection(ingest_bundle(&root, &policy).unwrap_err());
    let failure = errors.get("clap.mp3").unwrap();
    assert_eq!(failure.kind(), Some("RenameConflict"));
    assert_eq!(failure.message(), "Failed to rename to clap.wav: already exists");
    assert!(root.join("clap.mp3").exists());
}

#[test]
fn test_missing_hitsound_reported() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("song");
    let policy = test_policy();
    write_bundle(&root, &BundleSpec::new("song"), &policy);
    write_chart(&root.join("1.aff"), Some("snare.wav"));

    let errors = rejection(ingest_bundle(&root, &policy).unwrap_err());
    assert_eq!(errors.get("snare.wav").and_then(|f| f.kind()), Some("PathNotFound"));
}

#[test]
fn test_short_audio_rejected_with_both_lengths() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("song");
    let mut policy = test_policy();
    policy.audio.time_range = (DurationMs(5000), DurationMs(60000));
    write_bundle(&root, &BundleSpec::new("song"), &policy);

    let errors = rejection(ingest_bundle(&root, &policy).unwrap_err());
    assert_eq!(
        errors.get("base.ogg").map(|f| f.message()),
        Some("Audio too short: minimum length is 0:05.000, got 0:03.000")
    );
    // Cleanup never runs on a rejected bundle
    assert!(root.join("notes.txt").exists());
}

#[test]
fn test_bonus_bundle_skips_length_check() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("song");
    let mut policy = test_policy();
    policy.audio.time_range = (DurationMs(5000), DurationMs(60000));
    let spec = BundleSpec {
        is_bonus: true,
        ..BundleSpec::new("song")
    };
    write_bundle(&root, &spec, &policy);

    let bundle = ingest_bundle(&root, &policy).unwrap();
    assert!(bundle.is_bonus());
    assert_eq!(bundle.category(), Category::B);
}

#[test]
fn test_every_problem_is_reported() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("song");
    let mut policy = test_policy();
    policy.audio.time_range = (DurationMs(5000), DurationMs(60000));
    write_bundle(&root, &BundleSpec::new("song"), &policy);
    fs::remove_file(root.join("1.aff")).unwrap();
    fs::remove_file(root.join("bg_custom.jpg")).unwrap();
    fs::remove_file(root.join("base.png")).unwrap();

    let errors = rejection(ingest_bundle(&root, &policy).unwrap_err());
    assert!(errors.contains("1.aff"));
    assert!(errors.contains("bg_custom.jpg"));
    assert!(errors.contains("covers for Base"));
    assert!(errors.contains("base.ogg"));
    assert_eq!(errors.len(), 4);
}

#[test]
fn test_density_out_of_range() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("song");
    let policy = test_policy();
    write_bundle(&root, &BundleSpec::new("song"), &policy);
    fs::write(
        root.join("0.aff"),
        "AudioOffset:0\nTimingPointDensityFactor:5\n-\ntiming(0,120.00,4.00);\n",
    )
    .unwrap();

    let errors = rejection(ingest_bundle(&root, &policy).unwrap_err());
    assert_eq!(
        errors.get("0.aff").map(|f| f.message()),
        Some("TPDF exceeds maximum 2 (got 5)")
    );
}

#[test]
fn test_banned_arc_features() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("song");
    let policy = test_policy();
    write_bundle(&root, &BundleSpec::new("song"), &policy);
    fs::write(
        root.join("0.aff"),
        "AudioOffset:0\n-\ntiming(0,120.00,4.00);\n\
         timinggroup(anglex90){\n  arc(0,500,0.00,1.00,s,1.00,1.00,0,none,designant,2.00);\n};\n",
    )
    .unwrap();

    let errors = rejection(ingest_bundle(&root, &policy).unwrap_err());
    assert_eq!(
        errors.get("0.aff [tg #1]").map(|f| f.message()),
        Some("Parameter 'anglex' is banned")
    );
    assert_eq!(
        errors.get("0.aff [tg #1] [event #0] (Arc)").map(|f| f.message()),
        Some("Arc kind 'designant' is banned\nParameter 'smoothness' is banned")
    );
}

#[test]
fn test_manifest_choice() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("song");
    let mut policy = test_policy();
    write_bundle(&root, &BundleSpec::new("song"), &policy);
    fs::copy(root.join("slst.txt"), root.join("songlist.json")).unwrap();

    policy.manifest.choosing = ManifestChoice::Ask;
    let err = ingest_bundle(&root, &policy).unwrap_err();
    assert!(matches!(err, IngestError::UnresolvedChoice("manifest.choosing")));

    policy.manifest.choosing = ManifestChoice::Forbid;
    let errors = rejection(ingest_bundle(&root, &policy).unwrap_err());
    assert_eq!(errors.get("manifest").and_then(|f| f.kind()), Some("AmbiguousManifest"));

    policy.manifest.choosing = ManifestChoice::ByPriority;
    let bundle = ingest_bundle(&root, &policy).unwrap();
    assert_eq!(bundle.assets().manifest, "songlist");
    assert!(!root.join("songlist.json").exists());
    // The lower-priority candidate is not a kept asset
    assert!(!root.join("slst.txt").exists());
}

#[test]
fn test_take_first_uses_name_order() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("song");
    let mut policy = test_policy();
    write_bundle(&root, &BundleSpec::new("song"), &policy);
    // Higher priority than slst.txt, but sorts after it and is tampered
    let tampered = fs::read_to_string(root.join("slst.txt")).unwrap().replace("Composer", "Other");
    fs::write(root.join("songlist.json"), tampered).unwrap();

    policy.manifest.choosing = ManifestChoice::ByPriority;
    let errors = rejection(ingest_bundle(&root, &policy).unwrap_err());
    assert!(errors.contains("digest"));

    policy.manifest.choosing = ManifestChoice::TakeFirst;
    let bundle = ingest_bundle(&root, &policy).unwrap();
    assert_eq!(bundle.manifest().artist, "Composer");
    assert!(!root.join("songlist.json").exists());
}

#[test]
fn test_missing_manifest() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("song");
    let policy = test_policy();
    write_bundle(&root, &BundleSpec::new("song"), &policy);
    fs::remove_file(root.join("slst.txt")).unwrap();

    let errors = rejection(ingest_bundle(&root, &policy).unwrap_err());
    assert_eq!(errors.get("manifest").and_then(|f| f.kind()), Some("MissingManifest"));
    assert_eq!(errors.len(), 1);
}

#[test]
fn test_rerun_is_convergent() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("song");
    let policy = test_policy();
    let spec = BundleSpec {
        hitsound: Some("clap.mp3".to_string()),
        ..BundleSpec::new("song")
    };
    write_bundle(&root, &spec, &policy);

    let first = ingest_bundle(&root, &policy).unwrap();
    let files = file_names(&root);
    let manifest_text = fs::read_to_string(root.join("songlist")).unwrap();
    let chart_text = fs::read_to_string(root.join("2.aff")).unwrap();

    let second = ingest_bundle(&root, &policy).unwrap();
    assert_eq!(first.assets(), second.assets());
    assert_eq!(first.manifest(), second.manifest());
    assert_eq!(file_names(&root), files);
    assert_eq!(fs::read_to_string(root.join("songlist")).unwrap(), manifest_text);
    assert_eq!(fs::read_to_string(root.join("2.aff")).unwrap(), chart_text);
}

#[test]
fn test_difficulty_overrides_get_own_assets() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("song");
    let policy = test_policy();
    let mut manifest = write_bundle(&root, &BundleSpec::new("song"), &policy);

    let future = &mut manifest.difficulties[2];
    future.audio_override = Some(true);
    future.jacket_override = Some(true);
    future.audio_preview = Some(100);
    future.audio_preview_end = Some(900);
    write_signed_manifest(&root.join("slst.txt"), &mut manifest, &policy);
    write_tone(&root.join("2.ogg"), 2000, 44100, 1);
    write_image(&root.join("2.png"), 70, 70);

    let bundle = ingest_bundle(&root, &policy).unwrap();
    let assets = bundle.assets();
    let future = AssetKey::from(RatingClass::Future);
    assert_eq!(assets.audio.keys().copied().collect::<Vec<_>>(), vec![AssetKey::Base, future]);
    assert_eq!(assets.previews.get(&future).map(String::as_str), Some("2_preview.ogg"));
    assert_eq!(
        assets.covers.get(&future),
        Some(&vec!["2.jpg".to_string(), "2_256.jpg".to_string()])
    );
    assert!(assets.covers.contains_key(&AssetKey::Base));

    // Difficulty markers 100..900, widened and clamped at the start
    let variant = decode_file(&root.join("2_preview.ogg")).unwrap().duration().as_millis();
    assert!((1000..=1200).contains(&variant), "variant preview length {}", variant);
    // Song markers 500..1500 still drive the base preview
    let base = decode_file(&root.join("preview.ogg")).unwrap().duration().as_millis();
    assert!((1300..=1500).contains(&base), "base preview length {}", base);

    assert_eq!(decode_file(&root.join("2.ogg")).unwrap().sample_rate, 22050);
    assert!(!root.join("2.png").exists());
}

#[test]
fn test_base_omitted_when_every_difficulty_overrides() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("song");
    let policy = test_policy();
    let mut manifest = write_bundle(&root, &BundleSpec::new("song"), &policy);

    // Placeholder difficulties count too
    for difficulty in &mut manifest.difficulties {
        difficulty.jacket_override = Some(true);
        write_image(&root.join(format!("{}.png", difficulty.rating_class)), 48, 48);
    }
    write_signed_manifest(&root.join("slst.txt"), &mut manifest, &policy);

    let bundle = ingest_bundle(&root, &policy).unwrap();
    let keys: Vec<AssetKey> = bundle.assets().covers.keys().copied().collect();
    assert_eq!(
        keys,
        vec![
            AssetKey::from(RatingClass::Past),
            AssetKey::from(RatingClass::Present),
            AssetKey::from(RatingClass::Future),
            AssetKey::from(RatingClass::Beyond),
        ]
    );
    assert!(!root.join("base.jpg").exists());
    assert!(!root.join("base.png").exists());
    assert!(root.join("3_256.jpg").exists());
}

#[test]
fn test_preview_end_beyond_track_still_writes_previews() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("song");
    let policy = test_policy();
    let mut manifest = write_bundle(&root, &BundleSpec::new("song"), &policy);

    manifest.audio_preview_end = 5000;
    let future = &mut manifest.difficulties[2];
    future.audio_override = Some(true);
    future.audio_preview = Some(100);
    future.audio_preview_end = Some(900);
    write_signed_manifest(&root.join("slst.txt"), &mut manifest, &policy);
    write_tone(&root.join("2.ogg"), 2000, 22050, 2);

    let errors = rejection(ingest_bundle(&root, &policy).unwrap_err());
    assert_eq!(
        errors.get("preview.ogg").map(|f| f.message()),
        Some("Invalid 'audioPreviewEnd': 0:05.000 is beyond the track length 0:03.000")
    );
    assert_eq!(errors.len(), 1);
    assert!(root.join("preview.ogg").is_file());
    assert!(root.join("2_preview.ogg").is_file());
}

#[test]
fn test_required_backgrounds() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("song");
    let mut policy = test_policy();
    policy.backgrounds.builtin = ["builtin_bg".to_string()].into_iter().collect();
    let mut manifest = write_bundle(&root, &BundleSpec::new("song"), &policy);

    manifest.difficulties[0].bg = Some("bg_past".to_string());
    manifest.difficulties[1].bg = Some(String::new());
    manifest.difficulties[2].bg = Some("builtin_bg".to_string());
    let expected: BTreeSet<String> = ["bg_custom".to_string(), "bg_past".to_string()].into_iter().collect();
    assert_eq!(required_backgrounds(&manifest, &policy.backgrounds.builtin), expected);

    write_signed_manifest(&root.join("slst.txt"), &mut manifest, &policy);
    let errors = rejection(ingest_bundle(&root, &policy).unwrap_err());
    assert_eq!(errors.get("bg_past.jpg").and_then(|f| f.kind()), Some("PathNotFound"));
    assert_eq!(errors.len(), 1);

    // Once every difficulty names its own, the song background is not needed
    manifest.difficulties[3].bg = Some("bg_past".to_string());
    let only_past: BTreeSet<String> = ["bg_past".to_string()].into_iter().collect();
    assert_eq!(required_backgrounds(&manifest, &policy.backgrounds.builtin), only_past);
}

#[test]
fn test_unlisted_directories_are_removed() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("song");
    let policy = test_policy();
    write_bundle(&root, &BundleSpec::new("song"), &policy);
    fs::create_dir_all(root.join("__MACOSX/junk")).unwrap();
    fs::write(root.join("__MACOSX/junk/x.bin"), "x").unwrap();

    let bundle = ingest_bundle(&root, &policy).unwrap();
    assert!(!root.join("__MACOSX").exists());
    let entries = fs::read_dir(&root).unwrap().count();
    assert_eq!(entries, bundle.assets().all().len());
}

#[test]
fn test_public_form_of_accepted_manifest() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("song");
    let policy = test_policy();
    let mut manifest = write_bundle(&root, &BundleSpec::new("song"), &policy);
    manifest.difficulties[2].title_localized = Some(Localized {
        en: "Future Title".to_string(),
        ja: None,
        ko: None,
        zh_hans: None,
        zh_hant: None,
    });
    write_signed_manifest(&root.join("slst.txt"), &mut manifest, &policy);

    let bundle = ingest_bundle(&root, &policy).unwrap();
    let public = bundle.manifest().public_form().unwrap();
    let object = public.as_object().unwrap();
    for field in RESTRICTED_FIELDS {
        assert!(!object.contains_key(field), "{} should be stripped", field);
    }
    assert_eq!(object["difficulties"][2]["title_localized"]["en"], "Future Title");
    assert!(object["difficulties"][2]["title_localized"].get("ja").is_none());
}
