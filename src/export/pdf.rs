use crate::export::png::encode_png;
use crate::foundation::core::FrameRGBA;
use crate::foundation::error::{BadgeError, BadgeResult};

/// Encode a frame as a one-page PDF whose page is exactly `width_mm` x `height_mm`.
///
/// The raster fills the page; its resolution follows from the frame size.
#[tracing::instrument(skip(frame), fields(w = frame.width, h = frame.height))]
pub fn encode_pdf(frame: &FrameRGBA, width_mm: f64, height_mm: f64) -> BadgeResult<Vec<u8>> {
    if !(width_mm.is_finite() && width_mm > 0.0 && height_mm.is_finite() && height_mm > 0.0) {
        return Err(BadgeError::validation("pdf page size must be finite and > 0"));
    }
    if frame.width == 0 || frame.height == 0 {
        return Err(BadgeError::render("cannot export an empty frame"));
    }
    let png = encode_png(frame)?;

    let (w_mm, h_mm) = (width_mm as f32, height_mm as f32);
    let (doc, page1, layer1) =
        printpdf::PdfDocument::new("Badge", printpdf::Mm(w_mm), printpdf::Mm(h_mm), "Layer 1");
    let layer = doc.get_page(page1).get_layer(layer1);

    // printpdf pins its own `image` version; decode through it.
    let dynamic = printpdf::image_crate::load_from_memory(&png)
        .map_err(|e| BadgeError::render(format!("decode png for pdf: {e}")))?;
    let pdf_image = printpdf::Image::from_dynamic_image(&dynamic);

    // At this dpi the raster is exactly `w_mm` wide; stretch y for rounding in the pixel height.
    let dpi = frame.width as f32 * 25.4 / w_mm;
    let natural_h_mm = frame.height as f32 * 25.4 / dpi;
    let transform = printpdf::ImageTransform {
        translate_x: Some(printpdf::Mm(0.0)),
        translate_y: Some(printpdf::Mm(0.0)),
        scale_x: Some(1.0),
        scale_y: Some(h_mm / natural_h_mm),
        dpi: Some(dpi),
        ..Default::default()
    };
    pdf_image.add_to_layer(layer, transform);

    doc.save_to_bytes()
        .map_err(|e| BadgeError::render(format!("pdf save failed: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/export/pdf.rs"]
mod tests;
