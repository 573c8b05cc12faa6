///! Plotting collaborator
///!
///! Plots are produced by external programs configured under `[[plots]]`.
///! Each one runs to completion before the next starts.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use galah_common::{DisplayName, StarRecord};
use std::path::Path;

use super::post::MediaItem;
use crate::config::PlotConfig;

#[async_trait]
pub trait PlotRenderer: Send + Sync {
    /// Produce plots for `star` in `out_dir` and describe them as media
    async fn render_plots(&self, star: &StarRecord, name: &DisplayName, out_dir: &Path) -> Result<Vec<MediaItem>>;
}

pub struct CommandPlotter {
    plots: Vec<PlotConfig>,
}

impl CommandPlotter {
    pub fn new(plots: Vec<PlotConfig>) -> Self {
        Self { plots }
    }

    fn expand_args(plot: &PlotConfig, star: &StarRecord, out_dir: &Path) -> Vec<String> {
        let out_dir = out_dir.display().to_string();
        plot.args
            .iter()
            .map(|arg| {
                arg.replace("{sobject_id}", &star.sobject_id.to_string())
                    .replace("{dr3_source_id}", &star.dr3_source_id.to_string())
                    .replace("{out_dir}", &out_dir)
            })
            .collect()
    }

    async fn run(&self, plot: &PlotConfig, star: &StarRecord, out_dir: &Path) -> Result<()> {
        let args = Self::expand_args(plot, star, out_dir);
        tracing::info!("Running plot '{}': {} {}", plot.name, plot.program, args.join(" "));

        let output = tokio::process::Command::new(&plot.program)
            .args(&args)
            .output()
            .await
            .context(format!("Failed to start plot command '{}'", plot.program))?;

        if !output.status.success() {
            bail!(
                "Plot '{}' exited with {}: {}",
                plot.name,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

#[async_trait]
impl PlotRenderer for CommandPlotter {
    async fn render_plots(&self, star: &StarRecord, name: &DisplayName, out_dir: &Path) -> Result<Vec<MediaItem>> {
        let mut media = Vec::with_capacity(self.plots.len());

        for plot in &self.plots {
            self.run(plot, star, out_dir).await?;

            let path = out_dir.join(&plot.output);
            if !path.is_file() {
                bail!("Plot '{}' did not produce {}", plot.name, path.display());
            }
            media.push(MediaItem::new(path, plot.alt_text.replace("{name}", name.as_str())));
        }

        Ok(media)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galah_common::{DisplayNameKind, SkyPosition};

    fn star() -> StarRecord {
        StarRecord {
            sobject_id: 131216001101059,
            dr3_source_id: 42,
            position: SkyPosition::new(1.0, 2.0),
            survey_name: "galah_main".to_string(),
            distance_kpc: f64::NAN,
            age_gyr: f64::NAN,
            mass_msun: f64::NAN,
            constellation: None,
        }
    }

    fn name() -> DisplayName {
        DisplayName::new("HD 1234", DisplayNameKind::Catalog).unwrap()
    }

    fn plot(program: &str, args: &[&str], output: &str) -> PlotConfig {
        PlotConfig {
            name: "spectra".to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            output: output.to_string(),
            alt_text: "The spectrum of {name}.".to_string(),
        }
    }

    #[test]
    fn test_expand_args() {
        let p = plot("python3", &["plot.py", "{sobject_id}", "--gaia={dr3_source_id}", "{out_dir}"], "x.png");
        let args = CommandPlotter::expand_args(&p, &star(), Path::new("/tmp/content"));
        assert_eq!(args, vec!["plot.py", "131216001101059", "--gaia=42", "/tmp/content"]);
    }

    #[tokio::test]
    async fn test_no_plots_configured() {
        let dir = tempfile::tempdir().unwrap();
        let media = CommandPlotter::new(Vec::new())
            .render_plots(&star(), &name(), dir.path())
            .await
            .unwrap();
        assert!(media.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_output_becomes_media() {
        let dir = tempfile::tempdir().unwrap();
        let p = plot("touch", &["{out_dir}/spectra.png"], "spectra.png");

        let media = CommandPlotter::new(vec![p])
            .render_plots(&star(), &name(), dir.path())
            .await
            .unwrap();
        assert_eq!(media[0].path, dir.path().join("spectra.png"));
        assert_eq!(media[0].alt_text, "The spectrum of HD 1234.");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_output_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = plot("true", &[], "never_written.png");
        assert!(CommandPlotter::new(vec![p]).render_plots(&star(), &name(), dir.path()).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_command_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = plot("false", &[], "x.png");
        assert!(CommandPlotter::new(vec![p]).render_plots(&star(), &name(), dir.path()).await.is_err());
    }
}
