//! Caller-side request building.
//!
//! Turns what the user typed (a comma-separated link list plus format,
//! quality and certificate choices) into the job list handed to the runner.
//! Empty input and unknown selections are rejected here, before any run
//! exists.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::job::Job;

/// Token that disables TLS certificate verification in the tool.
pub const SKIP_CERT_ARG: &str = "--no-check-certificate";

/// Default file name template inside the save directory.
pub const TITLE_TEMPLATE: &str = "%(title)s.%(ext)s";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    /// No link was entered.
    #[error("no links were entered")]
    EmptyInput,
    /// Format or quality choice not recognized.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaFormat {
    /// Video.
    #[default]
    Mp4,
    /// Audio only.
    Mp3,
}

impl MediaFormat {
    /// Numeric choice ids as used by the radio-button groups (1 = MP4, 2 = MP3).
    pub fn from_id(id: u8) -> Result<Self, RequestError> {
        match id {
            1 => Ok(Self::Mp4),
            2 => Ok(Self::Mp3),
            other => Err(RequestError::InvalidSelection(format!(
                "unknown format id {other}"
            ))),
        }
    }
}

impl FromStr for MediaFormat {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" | "video" => Ok(Self::Mp4),
            "mp3" | "audio" => Ok(Self::Mp3),
            other => Err(RequestError::InvalidSelection(format!(
                "unknown format {other:?} (expected mp4 or mp3)"
            ))),
        }
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaFormat::Mp4 => write!(f, "mp4"),
            MediaFormat::Mp3 => write!(f, "mp3"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    /// Let the tool pick the best streams.
    #[default]
    High,
    /// Single-file mp4 (`-f mp4`).
    Low,
}

impl Quality {
    /// 1 = high, 2 = low.
    pub fn from_id(id: u8) -> Result<Self, RequestError> {
        match id {
            1 => Ok(Self::High),
            2 => Ok(Self::Low),
            other => Err(RequestError::InvalidSelection(format!(
                "unknown quality id {other}"
            ))),
        }
    }
}

impl FromStr for Quality {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "best" => Ok(Self::High),
            "low" => Ok(Self::Low),
            other => Err(RequestError::InvalidSelection(format!(
                "unknown quality {other:?} (expected high or low)"
            ))),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::High => write!(f, "high"),
            Quality::Low => write!(f, "low"),
        }
    }
}

/// Split the comma-separated link field into targets.
///
/// Whitespace around each link is trimmed and empty entries are skipped.
/// Targets are kept verbatim otherwise: the tool accepts more than URLs
/// (bare video ids, `ytsearch:` queries), so a parse failure only logs.
pub fn parse_targets(input: &str) -> Result<Vec<String>, RequestError> {
    let targets: Vec<String> = input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    if targets.is_empty() {
        return Err(RequestError::EmptyInput);
    }
    for t in &targets {
        if url::Url::parse(t).is_err() {
            tracing::debug!(link = %t, "link is not an absolute URL; passing it through");
        }
    }
    Ok(targets)
}

/// Everything the caller resolved for one "start download" action.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub targets: Vec<String>,
    pub format: MediaFormat,
    pub quality: Quality,
    pub skip_cert_check: bool,
    pub save_dir: PathBuf,
}

impl DownloadRequest {
    /// Parse the link field and attach the selections.
    pub fn new(
        links: &str,
        format: MediaFormat,
        quality: Quality,
        skip_cert_check: bool,
        save_dir: impl AsRef<Path>,
    ) -> Result<Self, RequestError> {
        Ok(Self {
            targets: parse_targets(links)?,
            format,
            quality,
            skip_cert_check,
            save_dir: save_dir.as_ref().to_path_buf(),
        })
    }

    /// Tool arguments shared by every job of the request.
    /// Quality only applies to MP4; MP3 always extracts audio.
    pub fn arguments(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.skip_cert_check {
            args.push(SKIP_CERT_ARG.to_string());
        }
        match (self.format, self.quality) {
            (MediaFormat::Mp4, Quality::High) => {}
            (MediaFormat::Mp4, Quality::Low) => {
                args.extend(["-f", "mp4"].map(String::from));
            }
            (MediaFormat::Mp3, _) => {
                args.extend(["-x", "--audio-format", "mp3"].map(String::from));
            }
        }
        args
    }

    pub fn output_template(&self) -> String {
        self.save_dir
            .join(TITLE_TEMPLATE)
            .to_string_lossy()
            .into_owned()
    }

    /// One job per target, in input order.
    pub fn jobs(&self) -> Vec<Job> {
        let arguments = self.arguments();
        let template = self.output_template();
        self.targets
            .iter()
            .map(|t| Job::new(t.clone(), arguments.clone(), template.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(format: MediaFormat, quality: Quality, skip: bool) -> DownloadRequest {
        DownloadRequest::new("https://a.test/1", format, quality, skip, "/dl").unwrap()
    }

    #[test]
    fn parse_targets_splits_and_trims() {
        let t = parse_targets(" https://a.test/1 ,https://b.test/2,, ").unwrap();
        assert_eq!(t, vec!["https://a.test/1", "https://b.test/2"]);
    }

    #[test]
    fn parse_targets_keeps_non_url_verbatim() {
        let t = parse_targets("dQw4w9WgXcQ").unwrap();
        assert_eq!(t, vec!["dQw4w9WgXcQ"]);
    }

    #[test]
    fn parse_targets_empty_input() {
        assert_eq!(parse_targets(""), Err(RequestError::EmptyInput));
        assert_eq!(parse_targets("  , ,"), Err(RequestError::EmptyInput));
    }

    #[test]
    fn selection_ids() {
        assert_eq!(MediaFormat::from_id(1), Ok(MediaFormat::Mp4));
        assert_eq!(MediaFormat::from_id(2), Ok(MediaFormat::Mp3));
        assert!(matches!(
            MediaFormat::from_id(0),
            Err(RequestError::InvalidSelection(_))
        ));
        assert_eq!(Quality::from_id(2), Ok(Quality::Low));
        assert!(matches!(
            Quality::from_id(3),
            Err(RequestError::InvalidSelection(_))
        ));
    }

    #[test]
    fn selection_names() {
        assert_eq!("MP3".parse::<MediaFormat>(), Ok(MediaFormat::Mp3));
        assert_eq!("low".parse::<Quality>(), Ok(Quality::Low));
        assert!(matches!(
            "flac".parse::<MediaFormat>(),
            Err(RequestError::InvalidSelection(_))
        ));
        assert!(matches!(
            "medium".parse::<Quality>(),
            Err(RequestError::InvalidSelection(_))
        ));
    }

    #[test]
    fn arguments_per_selection() {
        assert!(request(MediaFormat::Mp4, Quality::High, false)
            .arguments()
            .is_empty());
        assert_eq!(
            request(MediaFormat::Mp4, Quality::Low, false).arguments(),
            vec!["-f", "mp4"]
        );
        assert_eq!(
            request(MediaFormat::Mp3, Quality::Low, false).arguments(),
            vec!["-x", "--audio-format", "mp3"]
        );
        assert_eq!(
            request(MediaFormat::Mp3, Quality::High, true).arguments(),
            vec!["--no-check-certificate", "-x", "--audio-format", "mp3"]
        );
    }

    #[test]
    fn jobs_follow_input_order() {
        let req = DownloadRequest::new(
            "https://a.test/1, https://b.test/2",
            MediaFormat::Mp4,
            Quality::Low,
            true,
            "/dl",
        )
        .unwrap();
        let jobs = req.jobs();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].target, "https://a.test/1");
        assert_eq!(jobs[1].target, "https://b.test/2");
        assert_eq!(jobs[1].arguments, vec!["--no-check-certificate", "-f", "mp4"]);
        assert_eq!(jobs[0].output_template, "/dl/%(title)s.%(ext)s");
    }
}
