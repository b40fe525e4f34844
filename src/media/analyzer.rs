use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{AnalysisError, HenkanError};
use crate::formats::MediaKind;
use super::{MediaFile, MediaProbeTrait};

/// Result of analyzing one path.
///
/// `media` is always present; `issue` says why it may be incomplete.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub media: MediaFile,
    pub issue: Option<AnalysisError>,
}

impl AnalysisReport {
    pub fn complete(media: MediaFile) -> Self {
        Self { media, issue: None }
    }

    pub fn degraded(media: MediaFile, issue: AnalysisError) -> Self {
        Self {
            media,
            issue: Some(issue),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.issue.is_none()
    }

    /// False only when there is nothing on disk to hand to the encoder.
    pub fn is_usable(&self) -> bool {
        !matches!(
            self.issue,
            Some(AnalysisError::NotFound(_)) | Some(AnalysisError::Unreadable(_))
        )
    }
}

/// Best-effort analyzer: never fails, degrades instead.
pub struct MediaAnalyzer {
    prober: Box<dyn MediaProbeTrait>,
}

impl MediaAnalyzer {
    pub fn new(prober: Box<dyn MediaProbeTrait>) -> Self {
        Self { prober }
    }

    pub async fn analyze<P: AsRef<Path>>(&self, path: P) -> AnalysisReport {
        let path = path.as_ref();
        debug!("Analyzing {}", path.display());

        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Input does not exist: {}", path.display());
                return AnalysisReport::degraded(
                    MediaFile::missing(path),
                    AnalysisError::NotFound(path.display().to_string()),
                );
            }
            Err(e) => {
                warn!("Cannot read metadata of {}: {}", path.display(), e);
                return AnalysisReport::degraded(
                    MediaFile::missing(path),
                    AnalysisError::Unreadable(format!("{}: {}", path.display(), e)),
                );
            }
        };

        if !metadata.is_file() {
            return AnalysisReport::degraded(
                MediaFile::missing(path),
                AnalysisError::Unreadable(format!("{} is not a regular file", path.display())),
            );
        }

        let size = metadata.len();
        match self.prober.probe(path).await {
            Ok(probe) => {
                let media = MediaFile::from_probe(path, size, &probe);
                info!(
                    "Analyzed {}: {} {} video={:?} audio={:?} {:.1}s",
                    path.display(),
                    media.kind,
                    media.container,
                    media.video_codec,
                    media.audio_codec,
                    media.duration
                );
                AnalysisReport::complete(media)
            }
            Err(e) => {
                warn!("Probe failed for {}, continuing with partial information: {}", path.display(), e);
                let issue = match e {
                    HenkanError::Analysis(issue) => issue,
                    other => AnalysisError::Probe(other.to_string()),
                };
                AnalysisReport::degraded(
                    MediaFile::minimal(path, MediaKind::from_path(path), size),
                    issue,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MockMediaProbeTrait, ProbeData, StreamInfo, StreamKind};

    fn h264_probe() -> ProbeData {
        ProbeData {
            format_name: Some("mov,mp4,m4a,3gp,3g2,mj2".to_string()),
            duration: Some(60.0),
            bitrate: Some(1_400_000),
            size: None,
            streams: vec![
                StreamInfo {
                    kind: StreamKind::Video,
                    codec: Some("h264".to_string()),
                    width: 640,
                    height: 360,
                    cover_art: false,
                },
                StreamInfo {
                    kind: StreamKind::Audio,
                    codec: Some("aac".to_string()),
                    width: 0,
                    height: 0,
                    cover_art: false,
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_missing_path_yields_minimal_media() {
        let mut prober = MockMediaProbeTrait::new();
        prober.expect_probe().never();
        let analyzer = MediaAnalyzer::new(Box::new(prober));

        let report = analyzer.analyze("/definitely/not/here.mp4").await;
        assert_eq!(report.media.kind, MediaKind::Unknown);
        assert_eq!(report.media.size, 0);
        assert!(matches!(report.issue, Some(AnalysisError::NotFound(_))));
        assert!(!report.is_usable());
    }

    #[tokio::test]
    async fn test_directory_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let mut prober = MockMediaProbeTrait::new();
        prober.expect_probe().never();
        let analyzer = MediaAnalyzer::new(Box::new(prober));

        let report = analyzer.analyze(dir.path()).await;
        assert!(matches!(report.issue, Some(AnalysisError::Unreadable(_))));
    }

    #[tokio::test]
    async fn test_successful_probe() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, vec![0u8; 2048]).unwrap();

        let mut prober = MockMediaProbeTrait::new();
        prober.expect_probe().times(1).returning(|_| Ok(h264_probe()));
        let analyzer = MediaAnalyzer::new(Box::new(prober));

        let report = analyzer.analyze(&path).await;
        assert!(report.is_complete());
        assert_eq!(report.media.kind, MediaKind::Video);
        assert_eq!(report.media.size, 2048);
        assert_eq!(report.media.video_codec.as_deref(), Some("h264"));
        assert_eq!(report.media.duration, 60.0);
    }

    #[tokio::test]
    async fn test_probe_failure_degrades_to_partial_media() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.mkv");
        std::fs::write(&path, b"garbage").unwrap();

        let mut prober = MockMediaProbeTrait::new();
        prober.expect_probe().returning(|_| {
            Err(AnalysisError::Probe("Invalid data found when processing input".to_string()).into())
        });
        let analyzer = MediaAnalyzer::new(Box::new(prober));

        let report = analyzer.analyze(&path).await;
        assert_eq!(report.media.kind, MediaKind::Video);
        assert_eq!(report.media.size, 7);
        assert_eq!(report.media.video_codec, None);
        assert!(matches!(report.issue, Some(AnalysisError::Probe(_))));
        assert!(report.is_usable());
    }

    #[tokio::test]
    async fn test_tool_failure_is_reported_as_probe_issue() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let mut prober = MockMediaProbeTrait::new();
        prober
            .expect_probe()
            .returning(|_| Err(HenkanError::Media("ffprobe not found".to_string())));
        let analyzer = MediaAnalyzer::new(Box::new(prober));

        let report = analyzer.analyze(&path).await;
        assert_eq!(report.media.kind, MediaKind::Unknown);
        assert!(matches!(report.issue, Some(AnalysisError::Probe(_))));
    }
}
