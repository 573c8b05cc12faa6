///! One-shot pipeline: pick a star, name it, image it, post it
///!
///! External calls run strictly one after another. Any error ends the run
///! before publishing.

use anyhow::{Context, Result};
use galah_common::{DisplayName, StarRecord};
use std::path::{Path, PathBuf};

use crate::config::BotConfig;
use crate::http::HttpFetcher;
use crate::module::catalog::CatalogStore;
use crate::module::name::{lookup_identifiers, IdentityLookup, NameResolver, SimbadClient};
use crate::module::plots::{CommandPlotter, PlotRenderer};
use crate::module::post::{self, MediaItem, OutboxPublisher, Post, Publisher};
use crate::module::renderer::OverlayRenderer;
use crate::module::survey::{
    FootprintValidator, Hips2FitsClient, MocServerClient, SurveyCandidate, SurveySelector,
};

pub const SKY_IMAGE_FILE: &str = "sky_image.jpg";
pub const SKY_OVERLAY_FILE: &str = "sky_image_overlay.png";

/// Which star to post about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarTarget {
    Random,
    SobjectId(i64),
    Dr3SourceId(i64),
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub star: StarRecord,
    pub name: DisplayName,
    pub survey: String,
    pub post: Post,
    /// Where the post went; `None` on a dry run
    pub published: Option<String>,
}

pub struct Orchestrator {
    config: BotConfig,
    identity: Box<dyn IdentityLookup>,
    resolver: NameResolver,
    selector: SurveySelector,
    surveys: Vec<SurveyCandidate>,
    overlay: OverlayRenderer,
    plotter: Box<dyn PlotRenderer>,
    publisher: Box<dyn Publisher>,
}

impl Orchestrator {
    /// Wire the pipeline to the real services named in `config`
    pub fn from_config(config: BotConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.network)?;

        let identity = Box::new(SimbadClient::new(fetcher.clone(), &config.identity));
        let validator = FootprintValidator::new(Box::new(MocServerClient::new(fetcher.clone(), &config.imagery)));
        let images = Box::new(Hips2FitsClient::new(fetcher, &config.imagery));
        let selector = SurveySelector::new(validator, images, config.imagery.failure_policy);
        let plotter = Box::new(CommandPlotter::new(config.plots.clone()));
        let publisher = Box::new(OutboxPublisher::new(config.outbox.dir.clone()));

        Ok(Self::new(config, identity, selector, plotter, publisher))
    }

    pub fn new(
        config: BotConfig,
        identity: Box<dyn IdentityLookup>,
        selector: SurveySelector,
        plotter: Box<dyn PlotRenderer>,
        publisher: Box<dyn Publisher>,
    ) -> Self {
        let surveys = config.imagery.survey_candidates();
        let overlay = OverlayRenderer::new(config.fonts_dir.clone(), config.imagery.fov_deg);

        Self {
            config,
            identity,
            resolver: NameResolver::default(),
            selector,
            surveys,
            overlay,
            plotter,
            publisher,
        }
    }

    pub async fn run(&self, target: StarTarget, dry_run: bool) -> Result<RunOutcome> {
        let content_dir = self.config.content_dir.as_path();
        clear_content_dir(content_dir).await?;

        let catalog = CatalogStore::load(&self.config.catalog_path).await?;
        let star = self.select_star(&catalog, target)?;
        tracing::info!(
            "Selected sobject_id {} (Gaia DR3 {}) at {}",
            star.sobject_id,
            star.dr3_source_id,
            star.position
        );

        let candidates = lookup_identifiers(
            self.identity.as_ref(),
            &star,
            self.config.identity.search_radius_arcsec,
        )
        .await?;
        let constellation = star.constellation.as_deref().unwrap_or_default();
        let name = self.resolver.resolve_display_name(&star, &candidates, constellation);

        let image = self.selector.select_and_fetch(&self.surveys, star.position).await?;
        let image_path = content_dir.join(SKY_IMAGE_FILE);
        tokio::fs::write(&image_path, &image.bytes)
            .await
            .context(format!("Failed to write {}", image_path.display()))?;

        let overlay_path = content_dir.join(SKY_OVERLAY_FILE);
        self.overlay
            .render(
                &image_path,
                &overlay_path,
                self.config.imagery.width,
                self.config.imagery.height,
                name.as_str(),
                &image.survey.label,
            )
            .await?;

        let mut media = vec![MediaItem::new(
            &overlay_path,
            post::sky_image_alt_text(&image.survey.label, &name, self.config.imagery.fov_deg),
        )];
        media.extend(self.plotter.render_plots(&star, &name, content_dir).await?);

        let post = Post {
            text: post::compose(&star, &name)?,
            media,
        };
        for line in post.text.split("\n\n") {
            tracing::info!("{}", line);
        }

        let published = if dry_run {
            tracing::info!("Dry run, not publishing");
            post.validate_media()?;
            None
        } else {
            Some(self.publisher.publish(&post).await?)
        };

        Ok(RunOutcome {
            star,
            name,
            survey: image.survey.label,
            post,
            published,
        })
    }

    fn select_star(&self, catalog: &CatalogStore, target: StarTarget) -> Result<StarRecord> {
        match target {
            StarTarget::SobjectId(id) => {
                tracing::info!("Told to do a specific star: sobject_id={}", id);
                Ok(catalog.by_sobject_id(id)?.to_star())
            }
            StarTarget::Dr3SourceId(id) => {
                tracing::info!("Told to do a specific star: dr3_source_id={}", id);
                Ok(catalog.by_dr3_source_id(id)?.to_star())
            }
            StarTarget::Random => catalog.select_random(self.config.selection.min_snr),
        }
    }
}

/// Remove the files left by the previous run; subdirectories are kept
async fn clear_content_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .context(format!("Failed to create content directory: {}", dir.display()))?;

    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut removed: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file() {
            tokio::fs::remove_file(&path)
                .await
                .context(format!("Failed to remove {}", path.display()))?;
            removed.push(path);
        }
    }

    tracing::debug!("Cleared {} files from {}", removed.len(), dir.display());
    Ok(())
}
