use std::fmt::Write as _;
use std::io::Cursor;

use anyhow::Context as _;
use base64::Engine as _;
use kurbo::Affine;
use ndarray::Array2;

use crate::figure::backend::{Brightness, Compositor, ContourLayer, FigureView, Panel};
use crate::figure::contour::mask_outline;
use crate::foundation::core::ViewAxis;
use crate::foundation::error::{QcError, QcResult};
use crate::volume::bbox::{IntensityWindow, VoxelBox, cut_to_index};
use crate::volume::nifti_io::Volume;

const MARGIN: f64 = 8.0;
const GAP: f64 = 4.0;
const LABEL_SIZE: f64 = 14.0;
const CUT_LABEL_SIZE: f64 = 9.0;
/// Approximate advance of one sans-serif glyph, in font sizes.
const CHAR_WIDTH: f64 = 0.6;

/// Built-in compositor: a mosaic of cuts (sagittal, coronal and axial rows) per panel.
///
/// Backgrounds are embedded as base64 PNG images; overlays are vector outlines. When a view
/// has several panels they share the canvas and every panel after the first flickers on top
/// of the one below it.
#[derive(Clone, Debug)]
pub struct SvgCompositor {
    /// Height of one cut tile in SVG user units.
    pub tile_height: f64,
}

impl Default for SvgCompositor {
    fn default() -> Self {
        Self { tile_height: 120.0 }
    }
}

struct RenderedPanel {
    body: String,
    width: f64,
    height: f64,
}

impl Compositor for SvgCompositor {
    fn compose(&mut self, view: &FigureView) -> QcResult<String> {
        if view.panels.is_empty() {
            return Err(QcError::render("figure view has no panels"));
        }
        if !self.tile_height.is_finite() || self.tile_height <= 0.0 {
            return Err(QcError::render("tile height must be finite and > 0"));
        }

        let rendered = view
            .panels
            .iter()
            .map(|p| self.render_panel(p))
            .collect::<QcResult<Vec<_>>>()?;
        let width = rendered.iter().map(|r| r.width).fold(0.0, f64::max);
        let height = rendered.iter().map(|r| r.height).fold(0.0, f64::max);

        let mut doc = String::new();
        let _ = write!(
            doc,
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{width:.1}" height="{height:.1}" viewBox="0 0 {width:.1} {height:.1}">"#
        );
        if rendered.len() > 1 {
            doc.push_str(concat!(
                "<style>",
                "@keyframes flicker { 0%, 45% { opacity: 1; } 50%, 95% { opacity: 0; } 100% { opacity: 1; } }",
                ".overlay-panel { animation: flicker 4s infinite; }",
                "</style>"
            ));
        }
        let _ = write!(
            doc,
            r#"<rect x="0" y="0" width="{width:.1}" height="{height:.1}" fill="black"/>"#
        );
        for (i, (panel, r)) in view.panels.iter().zip(&rendered).enumerate() {
            let mut class = panel
                .label
                .as_deref()
                .map(escape_xml)
                .unwrap_or_else(|| format!("panel-{i}"));
            if i > 0 {
                class.push_str(" overlay-panel");
            }
            let _ = write!(doc, r#"<g class="{class}">{}</g>"#, r.body);
        }
        doc.push_str("</svg>");

        usvg::Tree::from_str(&doc, &usvg::Options::default())
            .map_err(|e| QcError::render(format!("composed svg does not parse: {e}")))?;
        Ok(doc)
    }
}

impl SvgCompositor {
    fn render_panel(&self, panel: &Panel) -> QcResult<RenderedPanel> {
        let bg = &panel.background;
        let crop = panel.crop.unwrap_or_else(|| VoxelBox::full(bg.shape()));
        let window = match panel.brightness {
            Brightness::Full => IntensityWindow::full(bg.data()),
            Brightness::Estimate => IntensityWindow::robust(bg.data()),
        };
        let spacing = bg.voxel_sizes();
        let ext = crop.extent();

        let mut body = String::new();
        let mut y = MARGIN;
        // Margins plus the caption, so a panel without cuts still has a size.
        let caption = panel
            .label
            .as_deref()
            .map_or(0.0, |l| l.chars().count() as f64 * LABEL_SIZE * CHAR_WIDTH);
        let mut width = 2.0 * MARGIN + caption;

        // Opaque background so a lower panel never shows through an upper one.
        let _ = write!(
            body,
            r#"<rect x="0" y="0" width="100%" height="100%" fill="black"/>"#
        );

        if let Some(label) = &panel.label {
            let _ = write!(
                body,
                r#"<text x="{MARGIN}" y="{:.1}" font-size="{LABEL_SIZE}" font-family="sans-serif" fill="white">{}</text>"#,
                y + LABEL_SIZE,
                escape_xml(label)
            );
            y += LABEL_SIZE + GAP;
        }

        for axis in ViewAxis::ALL {
            let cuts = panel.cuts.along(axis);
            if cuts.is_empty() {
                continue;
            }
            let (h, v) = axis.plane_axes();
            let (wpx, hpx) = (ext[h], ext[v]);
            let mm_w = wpx as f64 * spacing[h];
            let mm_h = hpx as f64 * spacing[v];
            let tile_h = self.tile_height;
            let tile_w = tile_h * mm_w / mm_h;

            let mut x = MARGIN;
            for &cut in cuts {
                let idx = cut_to_index(bg, axis, cut)?;
                let png = encode_gray_png(&background_slice(bg, &window, axis, idx, &crop))?;
                let _ = write!(
                    body,
                    r#"<image x="{x:.2}" y="{y:.2}" width="{tile_w:.2}" height="{tile_h:.2}" preserveAspectRatio="none" style="image-rendering:pixelated" xlink:href="data:image/png;base64,{png}"/>"#
                );

                let to_tile = Affine::translate((x, y))
                    * Affine::scale_non_uniform(tile_w / wpx as f64, tile_h / hpx as f64);
                for layer in &panel.layers {
                    let mask = layer_slice(layer, bg, axis, idx, &crop)?;
                    let mut outline = mask_outline(&mask);
                    if outline.elements().is_empty() {
                        continue;
                    }
                    outline.apply_affine(to_tile);
                    let _ = write!(
                        body,
                        r#"<path class="{}" d="{}" fill="none" stroke="{}" stroke-width="1"><title>{}</title></path>"#,
                        escape_xml(&layer.name),
                        outline.to_svg(),
                        escape_xml(&layer.color),
                        escape_xml(&layer.title)
                    );
                }

                let _ = write!(
                    body,
                    r#"<text x="{:.2}" y="{:.2}" font-size="{CUT_LABEL_SIZE}" font-family="sans-serif" fill="white">{}={cut:.0}</text>"#,
                    x + 2.0,
                    y + tile_h - 2.0,
                    axis.letter()
                );
                x += tile_w + GAP;
            }
            width = width.max(x - GAP + MARGIN);
            y += tile_h + GAP;
        }

        Ok(RenderedPanel {
            body,
            width,
            height: y - GAP + MARGIN,
        })
    }
}

/// Voxel index of display pixel `(row, col)` for a cut at `idx` on `axis`.
/// Rows run top to bottom, so the vertical volume axis is flipped.
fn pixel_voxel(axis: ViewAxis, idx: usize, crop: &VoxelBox, row: usize, col: usize) -> [usize; 3] {
    let (h, v) = axis.plane_axes();
    let mut p = [0usize; 3];
    p[axis.index()] = idx;
    p[h] = crop.min[h] + col;
    p[v] = crop.max[v] - row;
    p
}

fn background_slice(
    bg: &Volume,
    window: &IntensityWindow,
    axis: ViewAxis,
    idx: usize,
    crop: &VoxelBox,
) -> Array2<u8> {
    let (h, v) = axis.plane_axes();
    let ext = crop.extent();
    let data = bg.data();
    Array2::from_shape_fn((ext[v], ext[h]), |(row, col)| {
        let [x, y, z] = pixel_voxel(axis, idx, crop, row, col);
        window.gray(data[(x, y, z)])
    })
}

/// Binary slice of an overlay sampled on the background's display grid.
fn layer_slice(
    layer: &ContourLayer,
    bg: &Volume,
    axis: ViewAxis,
    idx: usize,
    crop: &VoxelBox,
) -> QcResult<Array2<bool>> {
    let (h, v) = axis.plane_axes();
    let ext = crop.extent();
    let lv = &layer.volume;
    let data = lv.data();

    if lv.shape() == bg.shape() && lv.affine() == bg.affine() {
        return Ok(Array2::from_shape_fn((ext[v], ext[h]), |(row, col)| {
            let [x, y, z] = pixel_voxel(axis, idx, crop, row, col);
            data[(x, y, z)] > 0.0
        }));
    }

    let inv = lv.affine().try_inverse().ok_or_else(|| {
        QcError::load(lv.path(), "voxel-to-world affine is not invertible")
    })?;
    let bg_to_layer = inv * bg.affine();
    let shape = lv.shape();
    Ok(Array2::from_shape_fn((ext[v], ext[h]), |(row, col)| {
        let [x, y, z] = pixel_voxel(axis, idx, crop, row, col);
        let p = bg_to_layer * nalgebra::Vector4::new(x as f64, y as f64, z as f64, 1.0);
        let q = [p.x, p.y, p.z].map(|c| c.round());
        if q.iter().zip(shape).any(|(c, n)| *c < 0.0 || *c >= n as f64) {
            return false;
        }
        data[(q[0] as usize, q[1] as usize, q[2] as usize)] > 0.0
    }))
}

fn encode_gray_png(pixels: &Array2<u8>) -> QcResult<String> {
    let (rows, cols) = pixels.dim();
    let raw: Vec<u8> = pixels.iter().copied().collect();
    let img = image::GrayImage::from_raw(cols as u32, rows as u32, raw)
        .ok_or_else(|| QcError::render("slice buffer does not match its dimensions"))?;

    let mut buf = Vec::new();
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .context("encode slice png")?;
    Ok(base64::engine::general_purpose::STANDARD.encode(buf))
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/figure/svg.rs"]
mod tests;
