//! PNG export of a grid.

use crate::grid::Grid;

/// Pixel size of one cell in exported images.
pub const EXPORT_CELL_SIZE: u32 = 12;

/// Fill used for empty cells.
const BACKGROUND: [u8; 3] = [0xF5, 0xF5, 0xF5];

/// Rasterize a grid to RGBA pixels, `cell_size` pixels per cell.
///
/// Cells whose color is not in `#RRGGBB` form render as background.
pub fn render_rgba(grid: &Grid, cell_size: u32) -> (u32, u32, Vec<u8>) {
    let side = grid.size() as u32 * cell_size;
    let mut pixels = Vec::with_capacity((side * side * 4) as usize);

    for row in grid.rows() {
        let mut line = Vec::with_capacity((side * 4) as usize);
        for cell in row {
            let [r, g, b] = cell.as_ref().and_then(|c| c.to_rgb()).unwrap_or(BACKGROUND);
            for _ in 0..cell_size {
                line.extend_from_slice(&[r, g, b, 0xFF]);
            }
        }
        for _ in 0..cell_size {
            pixels.extend_from_slice(&line);
        }
    }

    (side, side, pixels)
}

/// Encode a grid as a PNG image.
pub fn encode_png(grid: &Grid, cell_size: u32) -> Result<Vec<u8>, png::EncodingError> {
    let (width, height, rgba) = render_rgba(grid, cell_size);
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&rgba)?;
    }
    Ok(png_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Color;

    #[test]
    fn test_render_colors_cells() {
        let mut grid = Grid::new(2);
        grid.set_cell(0, 1, Some(Color::new("#FF0000"))).unwrap();
        let (width, height, rgba) = render_rgba(&grid, 2);
        assert_eq!((width, height), (4, 4));
        assert_eq!(rgba.len(), 4 * 4 * 4);

        // Pixel (x=2, y=0) lies in cell (0, 1).
        assert_eq!(&rgba[8..12], &[0xFF, 0x00, 0x00, 0xFF]);
        // Pixel (x=0, y=3) lies in empty cell (1, 0).
        let offset = (3 * 4) * 4;
        assert_eq!(&rgba[offset..offset + 4], &[0xF5, 0xF5, 0xF5, 0xFF]);
    }

    #[test]
    fn test_encode_png_dimensions() {
        let grid = Grid::default();
        let bytes = encode_png(&grid, EXPORT_CELL_SIZE).unwrap();
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);

        let decoder = png::Decoder::new(&bytes[..]);
        let reader = decoder.read_info().unwrap();
        assert_eq!(reader.info().width, 600);
        assert_eq!(reader.info().height, 600);
    }
}
