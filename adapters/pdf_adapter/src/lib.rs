use archive_core::ports::{DocumentCanvas, DocumentRenderer, Frame, Rgb, TextStyle};
use archive_core::CanvasError;
use image::io::Reader as ImageReader;
use image::DynamicImage;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Rect,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::debug;

/// US Letter in points
pub const LETTER: (f32, f32) = (612.0, 792.0);

/// Baseline offset below the top of a text line, as a fraction of font size
const ASCENT: f32 = 0.8;
/// Images are placed at one pixel per point
const IMAGE_DPI: f32 = 72.0;

fn mm(points: f32) -> Mm {
    Mm(points * 25.4 / 72.0)
}

/// Builtin PDF fonts only cover Latin-1; anything else is drawn as '?'
pub fn latin1_text(text: &str) -> String {
    text.chars()
        .map(|c| if (c as u32) < 0x100 && !c.is_control() { c } else { '?' })
        .collect()
}

/// Size of `(width, height)` scaled to fit inside `(max_width, max_height)`
/// without enlarging it
pub fn fit_within(width: f32, height: f32, max_width: f32, max_height: f32) -> (f32, f32) {
    if width <= 0.0 || height <= 0.0 {
        return (0.0, 0.0);
    }
    let scale = (max_width / width).min(max_height / height).min(1.0);
    (width * scale, height * scale)
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

/// DocumentCanvas backed by printpdf
pub struct PdfCanvas {
    doc: Option<PdfDocumentReference>,
    fonts: Fonts,
    layer: Option<PdfLayerReference>,
    page_width: f32,
    page_height: f32,
    pages: usize,
}

impl PdfCanvas {
    pub fn new(title: &str, (page_width, page_height): (f32, f32)) -> Result<Self, CanvasError> {
        let doc = PdfDocument::empty(title);
        let font = |builtin: BuiltinFont| {
            doc.add_builtin_font(builtin).map_err(|err| CanvasError::Save {
                path: Path::new(title).to_path_buf(),
                reason: format!("font setup failed: {err}"),
            })
        };
        let fonts = Fonts {
            regular: font(BuiltinFont::Helvetica)?,
            bold: font(BuiltinFont::HelveticaBold)?,
            italic: font(BuiltinFont::HelveticaOblique)?,
        };
        Ok(Self {
            doc: Some(doc),
            fonts,
            layer: None,
            page_width,
            page_height,
            pages: 0,
        })
    }

    fn layer(&self) -> Result<&PdfLayerReference, CanvasError> {
        self.layer.as_ref().ok_or(CanvasError::NoPage)
    }

    /// Converts a top-down y coordinate in points to printpdf's bottom-up millimetres
    fn y(&self, top_down: f32) -> Mm {
        mm(self.page_height - top_down)
    }

    fn load_image(path: &Path) -> Result<DynamicImage, CanvasError> {
        let image_error = |reason: String| CanvasError::Image {
            path: path.to_path_buf(),
            reason,
        };
        let decoded = ImageReader::open(path)
            .map_err(|err| image_error(err.to_string()))?
            .with_guessed_format()
            .map_err(|err| image_error(err.to_string()))?
            .decode()
            .map_err(|err| image_error(err.to_string()))?;
        // alpha channels are not embedded reliably; flatten to RGB
        Ok(DynamicImage::ImageRgb8(decoded.to_rgb8()))
    }
}

impl DocumentCanvas for PdfCanvas {
    fn page_size(&self) -> (f32, f32) {
        (self.page_width, self.page_height)
    }

    fn add_page(&mut self) -> Result<(), CanvasError> {
        let doc = self.doc.as_ref().ok_or(CanvasError::NoPage)?;
        self.pages += 1;
        let (page, layer) = doc.add_page(
            mm(self.page_width),
            mm(self.page_height),
            format!("Page {}", self.pages),
        );
        self.layer = Some(doc.get_page(page).get_layer(layer));
        Ok(())
    }

    fn place_text(&mut self, text: &str, x: f32, y: f32, size: f32, style: TextStyle) -> Result<(), CanvasError> {
        let font = match style {
            TextStyle::Regular => &self.fonts.regular,
            TextStyle::Bold => &self.fonts.bold,
            TextStyle::Italic => &self.fonts.italic,
        };
        let baseline = self.y(y + size * ASCENT);
        self.layer()?
            .use_text(latin1_text(text), size, mm(x), baseline, font);
        Ok(())
    }

    fn place_image(&mut self, path: &Path, frame: Frame) -> Result<f32, CanvasError> {
        let layer = self.layer()?.clone();
        let decoded = Self::load_image(path)?;
        let (px_width, px_height) = (decoded.width() as f32, decoded.height() as f32);
        let (width, height) = fit_within(px_width, px_height, frame.width, frame.height);
        if width == 0.0 {
            return Err(CanvasError::Image {
                path: path.to_path_buf(),
                reason: "image has no pixels".to_string(),
            });
        }

        let scale = width / px_width;
        Image::from_dynamic_image(&decoded).add_to_layer(
            layer,
            ImageTransform {
                translate_x: Some(mm(frame.x)),
                translate_y: Some(self.y(frame.y + height)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(IMAGE_DPI),
                ..Default::default()
            },
        );
        debug!(path = %path.display(), width, height, "Placed image");
        Ok(height)
    }

    fn draw_rect(&mut self, frame: Frame, color: Rgb) -> Result<(), CanvasError> {
        let layer = self.layer()?;
        let fill = |r: u8, g: u8, b: u8| {
            Color::Rgb(printpdf::Rgb::new(
                f32::from(r) / 255.0,
                f32::from(g) / 255.0,
                f32::from(b) / 255.0,
                None,
            ))
        };
        layer.set_fill_color(fill(color.r, color.g, color.b));
        let rect = Rect::new(
            mm(frame.x),
            self.y(frame.y + frame.height),
            mm(frame.x + frame.width),
            self.y(frame.y),
        )
        .with_mode(PaintMode::Fill);
        layer.add_rect(rect);
        // text is drawn with the fill colour
        layer.set_fill_color(fill(0, 0, 0));
        Ok(())
    }

    fn save(&mut self, path: &Path) -> Result<(), CanvasError> {
        let save_error = |reason: String| CanvasError::Save {
            path: path.to_path_buf(),
            reason,
        };
        let doc = self
            .doc
            .take()
            .ok_or_else(|| save_error("document already saved".to_string()))?;
        let file = File::create(path).map_err(|err| save_error(err.to_string()))?;
        doc.save(&mut BufWriter::new(file))
            .map_err(|err| save_error(err.to_string()))?;
        self.layer = None;
        Ok(())
    }
}

/// Creates Letter-sized printpdf canvases
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer;

impl DocumentRenderer for PdfRenderer {
    fn new_canvas(&self, title: &str) -> Result<Box<dyn DocumentCanvas>, CanvasError> {
        Ok(Box::new(PdfCanvas::new(title, LETTER)?))
    }
}
