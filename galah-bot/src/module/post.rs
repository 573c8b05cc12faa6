///! Post composition and publishing
///!
///! A post is three short paragraphs plus media:
///! - a bird noise
///! - when and in which programme the star was observed
///! - distance, age and mass, when all three are known

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use galah_common::{DisplayName, StarRecord};
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const BIRD_WORDS: &[&str] = &[
    "squawk", "chirp", "tweet", "hoot", "cacaw", "quack", "cluck", "screech", "coo", "warble", "honk",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub path: PathBuf,
    pub alt_text: String,
}

impl MediaItem {
    pub fn new(path: impl Into<PathBuf>, alt_text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            alt_text: alt_text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub text: String,
    pub media: Vec<MediaItem>,
}

impl Post {
    /// Every media file must exist before anything is published
    pub fn validate_media(&self) -> Result<()> {
        let missing: Vec<String> = self
            .media
            .iter()
            .filter(|m| !m.path.is_file())
            .map(|m| m.path.display().to_string())
            .collect();

        if !missing.is_empty() {
            bail!("Missing {} media file(s): {}", missing.len(), missing.join(", "));
        }
        Ok(())
    }
}

/// Observing night encoded in the first six digits (YYMMDD) of `sobject_id`
pub fn observation_date(sobject_id: i64) -> Result<NaiveDate> {
    let digits = sobject_id.to_string();
    let yymmdd = digits
        .get(..6)
        .with_context(|| format!("sobject_id {} is too short to hold a date", sobject_id))?;
    NaiveDate::parse_from_str(yymmdd, "%y%m%d")
        .with_context(|| format!("sobject_id {} does not start with a valid date", sobject_id))
}

pub fn survey_phrase(survey_name: &str) -> &'static str {
    match survey_name {
        "galah_main" | "galah_faint" => "during the main GALAH survey",
        "k2_hermes" => "during the K2-HERMES survey",
        "tess_hermes" => "during the TESS-HERMES survey",
        _ => "during a special observing programme",
    }
}

/// Post text with the given bird word
pub fn compose_text(star: &StarRecord, name: &DisplayName, bird_word: &str) -> Result<String> {
    let date = observation_date(star.sobject_id)?;

    let mut lines = vec![
        format!("{}!", bird_word.to_uppercase()),
        format!(
            "We observed {} on the night of {} {}.",
            name,
            date.format("%-d %b %Y"),
            survey_phrase(&star.survey_name)
        ),
    ];

    if let (Some(distance), Some(age), Some(mass)) = (star.distance(), star.age(), star.mass()) {
        lines.push(format!(
            "It is about {:.0} pc from the Sun, and we estimate this star is {:.0} Gyr old and {:.1} solar masses.",
            (distance * 10.0).round() * 100.0,
            age,
            mass
        ));
    } else {
        tracing::debug!("Skipping physical parameters line: missing estimates");
    }

    Ok(lines.join("\n\n"))
}

/// Post text with a random bird word
pub fn compose(star: &StarRecord, name: &DisplayName) -> Result<String> {
    let bird_word = BIRD_WORDS.choose(&mut rand::rng()).context("No bird words configured")?;
    compose_text(star, name, bird_word)
}

pub fn sky_image_alt_text(survey_label: &str, name: &DisplayName, fov_deg: f64) -> String {
    let arcmin = fov_deg * 60.0;
    format!(
        "A {:.0} by {:.0} arcminute image from {}. {} is found at the centre.",
        arcmin, arcmin, survey_label, name
    )
}

/// Where finished posts go
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `post` and return a reference to the published copy
    async fn publish(&self, post: &Post) -> Result<String>;
}

/// Writes each post into its own timestamped directory with a `post.json` manifest
pub struct OutboxPublisher {
    dir: PathBuf,
}

impl OutboxPublisher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn unique_dir(&self) -> Result<PathBuf> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        let mut candidate = self.dir.join(&stamp);
        let mut n = 1;
        while tokio::fs::try_exists(&candidate)
            .await
            .context(format!("Failed to check outbox directory: {}", candidate.display()))?
        {
            candidate = self.dir.join(format!("{}-{}", stamp, n));
            n += 1;
        }
        Ok(candidate)
    }
}

#[async_trait]
impl Publisher for OutboxPublisher {
    async fn publish(&self, post: &Post) -> Result<String> {
        post.validate_media()?;

        let target = self.unique_dir().await?;
        tokio::fs::create_dir_all(&target)
            .await
            .context(format!("Failed to create outbox directory: {}", target.display()))?;

        let mut manifest = Post {
            text: post.text.clone(),
            media: Vec::with_capacity(post.media.len()),
        };

        for item in &post.media {
            let file_name = item
                .path
                .file_name()
                .with_context(|| format!("Media path has no file name: {}", item.path.display()))?;
            let dest = target.join(file_name);
            tokio::fs::copy(&item.path, &dest)
                .await
                .context(format!("Failed to copy media: {}", item.path.display()))?;
            manifest.media.push(MediaItem::new(Path::new(file_name), item.alt_text.clone()));
        }

        let json = serde_json::to_string_pretty(&manifest).context("Failed to serialize post")?;
        tokio::fs::write(target.join("post.json"), json)
            .await
            .context("Failed to write post manifest")?;

        tracing::info!("Post published to {}", target.display());
        Ok(target.display().to_string())
    }
}
