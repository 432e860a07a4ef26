//! Upload admission against real files on disk

use pqtk_admin::{UploadCandidate, UploadLimits, UploadQueue, UploadRejection};
use pqtk_common::events::{drain, NoticeBus, NoticeLevel};
use pqtk_common::models::RatedSample;
use std::path::Path;
use tempfile::TempDir;

/// Write a short 16-bit mono sine to `path`
fn write_wav(path: &Path, seconds: f32) {
    let format = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, format).unwrap();
    let frames = (format.sample_rate as f32 * seconds) as u32;
    for i in 0..frames {
        let t = i as f32 / format.sample_rate as f32;
        let value = (t * 440.0 * std::f32::consts::TAU).sin() * 0.5 * i16::MAX as f32;
        writer.write_sample(value as i16).unwrap();
    }
    writer.finalize().unwrap();
}

#[tokio::test]
async fn wav_detected_by_magic_bytes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tone.wav");
    write_wav(&path, 0.25);

    let candidate = UploadCandidate::from_path(&path).await.unwrap();
    assert_eq!(candidate.name, "tone.wav");
    assert!(candidate.content_type.is_none());
    assert!(candidate.is_audio());
    assert_eq!(candidate.mime_type(), "audio/x-wav");

    let mut queue = UploadQueue::for_experiment("demo", &[], NoticeBus::default());
    assert!(queue.offer(vec![candidate]).is_empty());
    assert_eq!(queue.pending().len(), 1);
}

#[tokio::test]
async fn non_audio_file_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "not audio at all").unwrap();

    let candidate = UploadCandidate::from_path(&path).await.unwrap();
    let mut queue = UploadQueue::for_experiment("demo", &[], NoticeBus::default());
    let rejected = queue.offer(vec![candidate]);
    assert_eq!(
        rejected,
        vec![UploadRejection::NotAudio {
            name: "notes.txt".into()
        }]
    );
    assert!(queue.is_empty());
}

#[test]
fn oversized_file_warns_and_is_never_pending() {
    let bus = NoticeBus::default();
    let mut rx = bus.subscribe();
    let mut queue = UploadQueue::for_experiment("demo", &[], bus);

    let big = UploadCandidate::new("big.wav", vec![0u8; 7_000_000]).with_content_type("audio/wav");
    let small = UploadCandidate::new("small.wav", vec![0u8; 1024]).with_content_type("audio/wav");
    let rejected = queue.offer(vec![big, small]);

    assert_eq!(rejected.len(), 1);
    match &rejected[0] {
        UploadRejection::TooLarge { name, max_mib, .. } => {
            assert_eq!(name, "big.wav");
            assert_eq!(*max_mib, 6);
        }
        other => panic!("unexpected rejection {:?}", other),
    }
    let names: Vec<&str> = queue.pending().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["small.wav"]);

    let notices = drain(&mut rx);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Warning);
    assert!(notices[0].message.contains("big.wav"));
}

#[test]
fn library_duplicates_match_names_case_insensitively() {
    let library = vec![RatedSample {
        sample_id: "1".into(),
        name: "Piano.wav".into(),
        asset_path: "samples/Piano.wav".into(),
        rating: 3.0,
    }];
    let mut queue = UploadQueue::for_library(&library, NoticeBus::default());
    let audio = |name: &str| UploadCandidate::new(name, vec![1, 2, 3]).with_content_type("audio/wav");

    let rejected = queue.offer(vec![audio("piano.WAV"), audio("violin.wav")]);
    assert_eq!(rejected[0].file_name(), "piano.WAV");
    assert_eq!(queue.pending().len(), 1);
    assert_eq!(queue.limits(), UploadLimits::library());
}

#[test]
fn ceiling_counts_existing_pending_and_selected() {
    let pool: Vec<String> = (0..2).map(|i| format!("demo/{}.wav", i)).collect();
    let mut queue = UploadQueue::for_experiment("demo", &pool, NoticeBus::default()).with_limits(
        UploadLimits {
            max_file_bytes: UploadLimits::MAX_FILE_BYTES,
            ceiling: 4,
        },
    );
    let audio = |name: &str| UploadCandidate::new(name, vec![0u8; 8]).with_content_type("audio/flac");

    assert!(queue.toggle_existing("lib-1"));
    let rejected = queue.offer(vec![audio("a.flac"), audio("b.flac")]);
    assert_eq!(
        rejected,
        vec![UploadRejection::OverCeiling {
            name: "b.flac".into(),
            ceiling: 4
        }]
    );
    assert_eq!(queue.total(), 4);
    assert!(!queue.toggle_existing("lib-2"));

    // deselecting frees a slot
    assert!(!queue.toggle_existing("lib-1"));
    assert!(queue.offer(vec![audio("b.flac")]).is_empty());

    let batch = queue.into_batch();
    assert_eq!(batch.files.len(), 2);
    assert!(batch.sample_ids.is_empty());
}

#[tokio::test]
async fn oversized_file_on_disk_is_sniffed_not_loaded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("huge.wav");
    write_wav(&path, 0.1);
    std::fs::OpenOptions::new()
        .write(true)
        .open(&path)
        .unwrap()
        .set_len(7_000_000)
        .unwrap();

    let candidate = UploadCandidate::from_path(&path).await.unwrap();
    assert_eq!(candidate.size(), 7_000_000);
    assert!(candidate.is_partial());
    assert!(candidate.bytes.len() <= 8 * 1024);
    assert!(candidate.is_audio());

    let mut queue = UploadQueue::for_experiment("demo", &[], NoticeBus::default());
    let rejected = queue.offer(vec![candidate]);
    assert!(matches!(
        rejected.as_slice(),
        [UploadRejection::TooLarge { size: 7_000_000, .. }]
    ));
    assert!(queue.pending().is_empty());
}

#[tokio::test]
async fn partial_candidate_rejected_even_under_raised_limit() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("long.wav");
    write_wav(&path, 0.1);
    std::fs::OpenOptions::new()
        .write(true)
        .open(&path)
        .unwrap()
        .set_len(7_000_000)
        .unwrap();

    let candidate = UploadCandidate::from_path(&path).await.unwrap();
    let mut queue = UploadQueue::for_experiment("demo", &[], NoticeBus::default()).with_limits(
        UploadLimits {
            max_file_bytes: 16 * 1024 * 1024,
            ceiling: 100,
        },
    );
    assert_eq!(queue.offer(vec![candidate]).len(), 1);
    assert!(queue.is_empty());
}
