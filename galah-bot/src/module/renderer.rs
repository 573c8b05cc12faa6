///! Sky image overlay renderer
///!
///! Draws a centre crosshair, the star and survey labels and a 2 arcmin scale
///! bar over the downloaded cutout, and writes the result as PNG.

use anyhow::{bail, Context, Result};
use resvg::tiny_skia;
use resvg::usvg::{fontdb, Group, Node, Options, Tree};
use std::path::{Path, PathBuf};

const SKY_OVERLAY_TEMPLATE: &str = include_str!("../../resources/sky_overlay_template.svg");

/// Layout reference width; positions scale with the actual image size
const REFERENCE_SIZE: f64 = 1000.0;
const SCALE_BAR_ARCMIN: f64 = 2.0;

pub struct OverlayRenderer {
    fonts_dir: PathBuf,
    fov_deg: f64,
}

impl OverlayRenderer {
    const FONT_SIZE: f64 = 40.0;
    const STROKE: f64 = 5.0;
    const MARGIN: f64 = 30.0;
    const TICK_GAP: f64 = 20.0;
    const TICK_LENGTH: f64 = 60.0;

    pub fn new(fonts_dir: impl Into<PathBuf>, fov_deg: f64) -> Self {
        Self {
            fonts_dir: fonts_dir.into(),
            fov_deg,
        }
    }

    /// Scale bar length in pixels for an image `width` pixels across
    pub fn scale_bar_length(&self, width: u32) -> f64 {
        width as f64 * SCALE_BAR_ARCMIN / (self.fov_deg * 60.0)
    }

    /// Overlay SVG referencing `image_href` as its background
    pub fn build_svg(&self, image_href: &str, width: u32, height: u32, star_label: &str, survey_label: &str) -> String {
        let w = width as f64;
        let h = height as f64;
        let s = w / REFERENCE_SIZE;

        SKY_OVERLAY_TEMPLATE
            .replace("{{WIDTH}}", &width.to_string())
            .replace("{{HEIGHT}}", &height.to_string())
            .replace("{{FONT_SIZE}}", &format!("{:.1}", Self::FONT_SIZE * s))
            .replace("{{STROKE}}", &format!("{:.1}", Self::STROKE * s))
            .replace("{{IMAGE}}", &escape_xml(image_href))
            .replace("{{CROSSHAIR}}", &Self::crosshair(w, h, s))
            .replace("{{MARGIN}}", &format!("{:.1}", Self::MARGIN * s))
            .replace("{{STAR_Y}}", &format!("{:.1}", (Self::MARGIN + Self::FONT_SIZE) * s))
            .replace("{{SURVEY_Y}}", &format!("{:.1}", h - Self::MARGIN * s))
            .replace("{{STAR_LABEL}}", &escape_xml(star_label))
            .replace("{{SURVEY_LABEL}}", &escape_xml(survey_label))
            .replace("{{SCALE_BAR}}", &self.scale_bar(w, h, s))
    }

    /// Two ticks pointing at the target: one from the left, one from below
    fn crosshair(w: f64, h: f64, s: f64) -> String {
        let cx = w / 2.0;
        let cy = h / 2.0;
        let near = Self::TICK_GAP * s;
        let far = (Self::TICK_GAP + Self::TICK_LENGTH) * s;

        format!(
            r#"<line x1="{:.1}" y1="{cy:.1}" x2="{:.1}" y2="{cy:.1}" class="mark" /><line x1="{cx:.1}" y1="{:.1}" x2="{cx:.1}" y2="{:.1}" class="mark" />"#,
            cx - far,
            cx - near,
            cy + far,
            cy + near,
        )
    }

    fn scale_bar(&self, w: f64, h: f64, s: f64) -> String {
        let length = self.scale_bar_length(w as u32);
        let x_end = w - Self::MARGIN * s;
        let x_start = x_end - length;
        let y = h - 70.0 * s;

        format!(
            r#"<line x1="{x_start:.1}" y1="{y:.1}" x2="{x_end:.1}" y2="{y:.1}" class="mark" /><text x="{:.1}" y="{:.1}" class="label" text-anchor="middle">{} arcmin</text>"#,
            (x_start + x_end) / 2.0,
            h - Self::MARGIN * s,
            SCALE_BAR_ARCMIN,
        )
    }

    /// Render the overlay for `image_path` into `output_path`
    pub async fn render(
        &self,
        image_path: &Path,
        output_path: &Path,
        width: u32,
        height: u32,
        star_label: &str,
        survey_label: &str,
    ) -> Result<()> {
        if !image_path.is_file() {
            bail!("Background image not found: {}", image_path.display());
        }

        let href = image_path
            .file_name()
            .context("Image path has no file name")?
            .to_string_lossy()
            .to_string();
        let svg = self.build_svg(&href, width, height, star_label, survey_label);

        let tree = parse_svg(&svg, image_path.parent(), &self.fonts_dir)?;
        if !contains_raster(tree.root()) {
            bail!("Background image could not be decoded: {}", image_path.display());
        }

        render_tree_to_png(&tree, output_path)?;
        tracing::info!("Overlay rendered to {}", output_path.display());
        Ok(())
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Whether a raster image survived parsing; undecodable images are dropped by usvg
fn contains_raster(group: &Group) -> bool {
    group.children().iter().any(|node| match node {
        Node::Image(_) => true,
        Node::Group(child) => contains_raster(child),
        _ => false,
    })
}

/// Parse SVG with fonts from `fonts_dir` and images relative to `resources_dir`
fn parse_svg(svg_content: &str, resources_dir: Option<&Path>, fonts_dir: &Path) -> Result<Tree> {
    // Load fonts
    let mut fontdb = fontdb::Database::new();
    fontdb.load_fonts_dir(fonts_dir);
    if fontdb.len() == 0 {
        fontdb.load_system_fonts();
    }
    tracing::debug!("Loaded {} font faces", fontdb.len());

    let mut options = Options::default();
    options.font_family = "DejaVu Sans".to_string();
    options.fontdb = std::sync::Arc::new(fontdb);
    options.resources_dir = resources_dir.map(Path::to_path_buf);

    Tree::from_str(svg_content, &options).context("Failed to parse SVG")
}

/// Render SVG to PNG
fn render_tree_to_png(tree: &Tree, output_path: &Path) -> Result<()> {
    let size = tree.size();
    let width = size.width() as u32;
    let height = size.height() as u32;

    let mut pixmap = tiny_skia::Pixmap::new(width, height).context("Failed to create pixmap")?;

    resvg::render(tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    pixmap.save_png(output_path).context("Failed to save PNG")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> OverlayRenderer {
        OverlayRenderer::new("fonts", 0.25)
    }

    #[test]
    fn test_scale_bar_length() {
        let length = renderer().scale_bar_length(1000);
        assert!((length - 133.333).abs() < 0.01);
    }

    #[test]
    fn test_svg_contents() {
        let svg = renderer().build_svg("sky_image.jpg", 1000, 1000, "alf Cen", "DSS2");

        assert!(svg.contains(r#"width="1000""#));
        assert!(svg.contains(r#"xlink:href="sky_image.jpg""#));
        assert!(svg.contains(">alf Cen</text>"));
        assert!(svg.contains(">DSS2</text>"));
        assert!(svg.contains("2 arcmin"));
        assert!(!svg.contains("{{"));
    }

    #[test]
    fn test_crosshair_centred() {
        let svg = renderer().build_svg("x.jpg", 1000, 1000, "", "");
        assert!(svg.contains(r#"x1="420.0" y1="500.0" x2="480.0" y2="500.0""#));
        assert!(svg.contains(r#"x1="500.0" y1="580.0" x2="500.0" y2="520.0""#));
    }

    #[test]
    fn test_labels_are_escaped() {
        let svg = renderer().build_svg("x.jpg", 500, 500, "V* <test> & co", "DES");
        assert!(svg.contains("V* &lt;test&gt; &amp; co"));
    }

    const SAMPLE_JPEG: &[u8] = include_bytes!("../../resources/sample_cutout.jpg");

    #[tokio::test]
    async fn test_render_with_background() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("sky_image.jpg");
        let output = dir.path().join("overlay.png");
        std::fs::write(&image, SAMPLE_JPEG).unwrap();

        renderer()
            .render(&image, &output, 200, 200, "HD 1234", "DSS2")
            .await
            .unwrap();
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_missing_background_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("sky_image.jpg");
        let output = dir.path().join("overlay.png");

        let err = renderer()
            .render(&image, &output, 200, 200, "HD 1234", "DSS2")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_undecodable_background_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("sky_image.jpg");
        let output = dir.path().join("overlay.png");
        std::fs::write(&image, b"<html>Service temporarily unavailable</html>").unwrap();

        let err = renderer()
            .render(&image, &output, 200, 200, "HD 1234", "DSS2")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("could not be decoded"));
        assert!(!output.exists());
    }
}
