/*!
    Dump stored artifacts to numbered files for inspection.
*/

use std::path::{Path, PathBuf};

use crate::config::{CaptureConfig, QueueKeys};
use crate::error::CaptureError;
use crate::queue::BlobQueue;

/**
    Write every blob under each artifact key to `dir` as `output{i}.{ext}`,
    numbering per key from zero. Video blobs take the A/V container's
    extension, audio blobs the audio container's, thumbnails `jpg`.

    A key whose extension an earlier key already uses gets the key in its
    file names instead (`output{i}-{key}.{ext}`), so nothing is overwritten.
*/
pub fn export_all(
    queue: &dyn BlobQueue,
    keys: &QueueKeys,
    settings: &CaptureConfig,
    dir: &Path,
) -> Result<Vec<PathBuf>, CaptureError> {
    std::fs::create_dir_all(dir)?;

    let targets = [
        (keys.video.as_str(), settings.av_format.as_str()),
        (keys.audio.as_str(), settings.audio_format.as_str()),
        (keys.image.as_str(), "jpg"),
    ];

    let mut written = Vec::new();
    let mut claimed: Vec<&str> = Vec::new();
    for (key, extension) in targets {
        let blobs = queue.get_all(key)?;
        if blobs.is_empty() {
            tracing::warn!(key, "nothing stored");
            continue;
        }

        let shared = claimed.contains(&extension);
        claimed.push(extension);

        for (index, blob) in blobs.iter().enumerate() {
            let name = if shared {
                format!("output{index}-{key}.{extension}")
            } else {
                format!("output{index}.{extension}")
            };
            let path = dir.join(name);
            std::fs::write(&path, blob)?;
            tracing::debug!(key, path = %path.display(), bytes = blob.len(), "exported");
            written.push(path);
        }
        tracing::info!(key, files = blobs.len(), "key exported");
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MemoryQueue;

    #[test]
    fn blobs_land_in_numbered_files() {
        let queue = MemoryQueue::new();
        queue.push("VideoData", b"clip-a").unwrap();
        queue.push("VideoData", b"clip-b").unwrap();
        queue.push("AudioData", b"wav-a").unwrap();
        queue.push("ImageData", b"jpeg-a").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let written = export_all(
            &queue,
            &QueueKeys::default(),
            &CaptureConfig::default(),
            dir.path(),
        )
        .unwrap();

        assert_eq!(written.len(), 4);
        assert_eq!(std::fs::read(dir.path().join("output0.mp4")).unwrap(), b"clip-a");
        assert_eq!(std::fs::read(dir.path().join("output1.mp4")).unwrap(), b"clip-b");
        assert_eq!(std::fs::read(dir.path().join("output0.wav")).unwrap(), b"wav-a");
        assert_eq!(std::fs::read(dir.path().join("output0.jpg")).unwrap(), b"jpeg-a");
    }

    #[test]
    fn empty_keys_are_skipped() {
        let queue = MemoryQueue::new();
        queue.push("ImageData", b"jpeg").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let written = export_all(
            &queue,
            &QueueKeys::default(),
            &CaptureConfig::default(),
            dir.path(),
        )
        .unwrap();

        assert_eq!(written, vec![dir.path().join("output0.jpg")]);
    }

    #[test]
    fn shared_extensions_do_not_overwrite() {
        let queue = MemoryQueue::new();
        queue.push("VideoData", b"av").unwrap();
        queue.push("AudioData", b"audio").unwrap();
        let settings = CaptureConfig {
            audio_format: "mp4".to_string(),
            ..CaptureConfig::default()
        };

        let dir = tempfile::tempdir().unwrap();
        let written = export_all(&queue, &QueueKeys::default(), &settings, dir.path()).unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(std::fs::read(dir.path().join("output0.mp4")).unwrap(), b"av");
        assert_eq!(
            std::fs::read(dir.path().join("output0-AudioData.mp4")).unwrap(),
            b"audio"
        );
    }
}
