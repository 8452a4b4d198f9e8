use super::*;

fn png_bytes(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(px));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

const RED_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="5"><rect width="10" height="5" fill="red"/></svg>"#;

#[test]
fn decode_image_premultiplies() {
    let img = decode_image(&png_bytes(3, 2, [200, 100, 50, 128])).unwrap();
    assert_eq!((img.width, img.height), (3, 2));
    assert_eq!(img.rgba8_premul.len(), 3 * 2 * 4);
    assert_eq!(&img.rgba8_premul[..4], &[100, 50, 25, 128]);
}

#[test]
fn fully_transparent_pixels_are_zeroed() {
    let img = decode_image(&png_bytes(1, 1, [255, 255, 255, 0])).unwrap();
    assert_eq!(img.rgba8_premul.as_slice(), &[0, 0, 0, 0]);
}

#[test]
fn garbage_bytes_are_image_load_errors() {
    assert!(matches!(
        decode_image(b"definitely not an image").unwrap_err(),
        BadgeError::ImageLoad(_)
    ));
    assert!(matches!(
        decode_bitmap(b"<svg").unwrap_err(),
        BadgeError::ImageLoad(_)
    ));
}

#[test]
fn svg_is_rasterized_oversampled() {
    let img = rasterize_svg(RED_SVG.as_bytes()).unwrap();
    assert_eq!((img.width, img.height), (20, 10));
    let mid = ((5 * img.width + 10) * 4) as usize;
    assert_eq!(&img.rgba8_premul[mid..mid + 4], &[255, 0, 0, 255]);
}

#[test]
fn decode_bitmap_sniffs_svg() {
    let with_prolog = format!("<?xml version=\"1.0\"?>\n{RED_SVG}");
    let img = decode_bitmap(with_prolog.as_bytes()).unwrap();
    assert_eq!((img.width, img.height), (20, 10));

    let img = decode_bitmap(&png_bytes(4, 4, [0, 0, 255, 255])).unwrap();
    assert_eq!((img.width, img.height), (4, 4));
}

#[test]
fn downscale_preserves_aspect() {
    let out = downscale_image(&png_bytes(100, 50, [1, 2, 3, 255]), 40).unwrap();
    let img = image::load_from_memory(&out).unwrap();
    assert_eq!((img.width(), img.height()), (40, 20));

    let out = downscale_image(&png_bytes(30, 50, [1, 2, 3, 255]), 40).unwrap();
    let img = image::load_from_memory(&out).unwrap();
    assert_eq!((img.width(), img.height()), (30, 50));

    assert!(downscale_image(b"nope", 40).is_err());
}
