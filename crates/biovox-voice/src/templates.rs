use std::fs;
use std::path::Path;

use biovox_features::{extract_lpcc, extract_mel_template, extract_mfcc, preprocess, Matrix};
use biovox_foundation::MatchError;
use biovox_match::{FeatureKind, MatchMethod, MatchMethodRegistry};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::VoiceConfig;

/// An ordered filename-substring -> command mapping, checked top to bottom.
/// The source ships filenames beginning with a foreign-language word for
/// each command (e.g. the Chinese word for "start" names the `START`
/// clips); here the mapping is just data, not baked into string literals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandMapping {
    pub substring: String,
    pub command: String,
}

fn classify_filename(stem: &str, mappings: &[CommandMapping]) -> Option<String> {
    let lower = stem.to_lowercase();
    if lower.contains("noise") {
        return Some("__NOISE__".to_string());
    }
    mappings
        .iter()
        .find(|m| lower.contains(&m.substring.to_lowercase()))
        .map(|m| m.command.clone())
}

fn load_wav_samples(path: &Path) -> Result<Vec<f32>, MatchError> {
    let mut reader = hound::WavReader::open(path).map_err(|e| MatchError::TemplateFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let spec = reader.spec();
    let raw: Vec<i16> = match spec.sample_format {
        hound::SampleFormat::Int => reader
            .samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| MatchError::TemplateFile {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?,
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v * i16::MAX as f32) as i16))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| MatchError::TemplateFile {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?,
    };
    Ok(preprocess(&raw))
}

/// Extracts every feature kind the registered methods need from one
/// preprocessed template recording.
fn extract_needed(
    samples: &[f32],
    kinds: &[FeatureKind],
    config: &VoiceConfig,
) -> Vec<(FeatureKind, Matrix)> {
    kinds
        .iter()
        .map(|&kind| {
            let matrix = match kind {
                FeatureKind::MfccDelta => extract_mfcc(samples, &config.mfcc.into()),
                FeatureKind::Lpcc => extract_lpcc(samples, &config.lpc.into()),
                FeatureKind::MelTemplate => extract_mel_template(samples, &config.mel.into()),
            };
            (kind, matrix)
        })
        .collect()
}

/// Loads one flat directory of `.wav` files: filenames containing "noise"
/// become noise templates, everything else is classified by `mappings` and
/// dropped (with a log) if no mapping matches. Feature extraction runs once
/// per file per needed `FeatureKind`, never once per method.
fn load_flat_directory(
    dir: &Path,
    mappings: &[CommandMapping],
    registry: &mut MatchMethodRegistry,
    config: &VoiceConfig,
    needed_kinds: &[FeatureKind],
) -> Result<usize, MatchError> {
    let mut loaded = 0usize;

    let entries = fs::read_dir(dir).map_err(|e| MatchError::TemplateFile {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("wav") {
            continue;
        }
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        let Some(classification) = classify_filename(&stem, mappings) else {
            warn!(file = %path.display(), "template filename matched no command, skipping");
            continue;
        };

        let samples = match load_wav_samples(&path) {
            Ok(s) => s,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "failed to load template wav, skipping");
                continue;
            }
        };

        let features = extract_needed(&samples, needed_kinds, config);

        if classification == "__NOISE__" {
            add_noise_to_registry(registry, stem.clone(), &features);
        } else {
            add_command_to_registry(registry, &classification, stem.clone(), &features);
        }

        loaded += 1;
        info!(file = %stem, command = %classification, "loaded voice template");
    }

    Ok(loaded)
}

/// Loads a templates directory per §6's layout: an optional `cmd_templates/`
/// subdirectory, loose top-level files, an optional `noise/` subdirectory
/// (every file there is treated as a noise template regardless of name),
/// and per-speaker subdirectories (any other subdirectory), excluding names
/// in `config.speaker_dir_skip_list`.
pub fn load_template_directory(
    dir: &Path,
    mappings: &[CommandMapping],
    registry: &mut MatchMethodRegistry,
    config: &VoiceConfig,
) -> Result<usize, MatchError> {
    let needed_kinds = registry.feature_kinds_needed();
    let mut loaded = load_flat_directory(dir, mappings, registry, config, &needed_kinds)?;

    let cmd_templates = dir.join("cmd_templates");
    if cmd_templates.is_dir() {
        loaded += load_flat_directory(&cmd_templates, mappings, registry, config, &needed_kinds)?;
    }

    let noise_dir = dir.join("noise");
    if noise_dir.is_dir() {
        loaded += load_noise_directory(&noise_dir, registry, config, &needed_kinds)?;
    }

    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            if name == "cmd_templates" || name == "noise" {
                continue;
            }
            if config.speaker_dir_skip_list.iter().any(|s| s == &name) {
                info!(speaker = %name, "skipping speaker template subdirectory (skip-list)");
                continue;
            }
            match load_flat_directory(&path, mappings, registry, config, &needed_kinds) {
                Ok(n) => loaded += n,
                Err(e) => warn!(dir = %path.display(), error = %e, "failed to load speaker template subdirectory"),
            }
        }
    }

    Ok(loaded)
}

/// Loads every `.wav` file in a `noise/` subdirectory as a noise template,
/// regardless of filename (the `noise/` placement itself is the signal).
fn load_noise_directory(
    dir: &Path,
    registry: &mut MatchMethodRegistry,
    config: &VoiceConfig,
    needed_kinds: &[FeatureKind],
) -> Result<usize, MatchError> {
    let mut loaded = 0usize;
    let entries = fs::read_dir(dir).map_err(|e| MatchError::TemplateFile {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("wav") {
            continue;
        }
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        let samples = match load_wav_samples(&path) {
            Ok(s) => s,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "failed to load noise template wav, skipping");
                continue;
            }
        };

        let features = extract_needed(&samples, needed_kinds, config);
        add_noise_to_registry(registry, stem.clone(), &features);
        loaded += 1;
        info!(file = %stem, "loaded noise template from noise/ subdirectory");
    }

    Ok(loaded)
}

/// Extracts the feature kinds every registered method needs from one
/// preprocessed recording. Shared by the startup loader and by the voice
/// controller's calibration paths, so extraction always runs once per
/// segment regardless of how many methods consume it.
pub fn extract_for_registry(
    registry: &MatchMethodRegistry,
    samples: &[f32],
    config: &VoiceConfig,
) -> Vec<(FeatureKind, Matrix)> {
    extract_needed(samples, &registry.feature_kinds_needed(), config)
}

/// Adds a new command template to every method whose feature kind is
/// present, without touching any template already loaded for that command.
pub fn add_command_to_registry(
    registry: &mut MatchMethodRegistry,
    command: &str,
    name: String,
    features: &[(FeatureKind, Matrix)],
) {
    for method in registry.methods_mut() {
        if let Some((_, matrix)) = features.iter().find(|(k, _)| *k == method.feature_kind()) {
            method.add_template(command, name.clone(), matrix.clone());
        }
    }
}

/// Freedom-mode calibration: replaces every prior template for `command`
/// with this single captured segment.
pub fn replace_command_in_registry(
    registry: &mut MatchMethodRegistry,
    command: &str,
    name: String,
    features: &[(FeatureKind, Matrix)],
) {
    for method in registry.methods_mut() {
        if let Some((_, matrix)) = features.iter().find(|(k, _)| *k == method.feature_kind()) {
            method.replace_templates(command, name.clone(), matrix.clone());
        }
    }
}

/// Seeds a noise template into every method from a captured ambient
/// recording (startup calibration, §4.7), rather than a file on disk.
pub fn add_noise_seed(
    registry: &mut MatchMethodRegistry,
    name: String,
    features: &[(FeatureKind, Matrix)],
) {
    add_noise_to_registry(registry, name, features)
}

fn add_noise_to_registry(
    registry: &mut MatchMethodRegistry,
    name: String,
    features: &[(FeatureKind, Matrix)],
) {
    for method in registry.methods_mut() {
        if let Some((_, matrix)) = features.iter().find(|(k, _)| *k == method.feature_kind()) {
            method.add_noise_template(name.clone(), matrix.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_noise_files_regardless_of_mapping() {
        let mappings = vec![CommandMapping {
            substring: "jump".into(),
            command: "JUMP".into(),
        }];
        assert_eq!(
            classify_filename("background_noise_01", &mappings),
            Some("__NOISE__".to_string())
        );
    }

    #[test]
    fn classifies_command_by_substring() {
        let mappings = vec![CommandMapping {
            substring: "qi".into(),
            command: "START".into(),
        }];
        assert_eq!(
            classify_filename("qi_dong_01", &mappings),
            Some("START".to_string())
        );
    }

    #[test]
    fn unmatched_filename_yields_none() {
        let mappings = vec![CommandMapping {
            substring: "jump".into(),
            command: "JUMP".into(),
        }];
        assert_eq!(classify_filename("unrelated_clip", &mappings), None);
    }

    fn write_tone_wav(path: &Path, freq: f32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..4_000 {
            let v = (2.0 * std::f32::consts::PI * freq * i as f32 / 16_000.0).sin();
            writer.write_sample((v * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn registry_with_mel() -> MatchMethodRegistry {
        let mut registry = MatchMethodRegistry::new();
        registry.register(Box::new(biovox_match::MelCosineMatcher::new(0.5)));
        registry
    }

    #[test]
    fn loads_loose_top_level_and_cmd_templates_and_noise_subdirs() {
        let root = tempfile::tempdir().unwrap();
        write_tone_wav(&root.path().join("jump_01.wav"), 440.0);

        let cmd_dir = root.path().join("cmd_templates");
        std::fs::create_dir(&cmd_dir).unwrap();
        write_tone_wav(&cmd_dir.join("duck_01.wav"), 220.0);

        let noise_dir = root.path().join("noise");
        std::fs::create_dir(&noise_dir).unwrap();
        write_tone_wav(&noise_dir.join("hiss.wav"), 880.0);

        let mappings = vec![
            CommandMapping { substring: "jump".into(), command: "JUMP".into() },
            CommandMapping { substring: "duck".into(), command: "DUCK".into() },
        ];
        let mut registry = registry_with_mel();
        let config = VoiceConfig::default();
        let loaded = load_template_directory(root.path(), &mappings, &mut registry, &config).unwrap();

        assert_eq!(loaded, 3);
        let method = registry.method_mut("mel_cosine").unwrap();
        let commands: Vec<_> = method.store().commands().map(|(c, _)| c.to_string()).collect();
        assert!(commands.contains(&"JUMP".to_string()));
        assert!(commands.contains(&"DUCK".to_string()));
        assert_eq!(method.store().noise().len(), 1);
    }

    #[test]
    fn speaker_subdirectory_is_skipped_when_listed() {
        let root = tempfile::tempdir().unwrap();
        let speaker_dir = root.path().join("speaker_a");
        std::fs::create_dir(&speaker_dir).unwrap();
        write_tone_wav(&speaker_dir.join("jump_01.wav"), 440.0);

        let mappings = vec![CommandMapping { substring: "jump".into(), command: "JUMP".into() }];
        let mut registry = registry_with_mel();
        let config = VoiceConfig {
            speaker_dir_skip_list: vec!["speaker_a".to_string()],
            ..VoiceConfig::default()
        };
        let loaded = load_template_directory(root.path(), &mappings, &mut registry, &config).unwrap();

        assert_eq!(loaded, 0);
    }

    #[test]
    fn unskipped_speaker_subdirectory_is_loaded() {
        let root = tempfile::tempdir().unwrap();
        let speaker_dir = root.path().join("speaker_b");
        std::fs::create_dir(&speaker_dir).unwrap();
        write_tone_wav(&speaker_dir.join("jump_01.wav"), 440.0);

        let mappings = vec![CommandMapping { substring: "jump".into(), command: "JUMP".into() }];
        let mut registry = registry_with_mel();
        let config = VoiceConfig::default();
        let loaded = load_template_directory(root.path(), &mappings, &mut registry, &config).unwrap();

        assert_eq!(loaded, 1);
    }
}
