use std::io::Cursor;
use std::path::{Path, PathBuf};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;
use thiserror::Error;
use crate::buffer::RollingBuffer;
#[derive(Debug, Error)]
pub enum PlotError {
    #[error("no readings to plot")]
    Empty,
    #[error("failed to render plot: {0}")]
    Render(String),
    #[error("failed to save plot to {path}: {source}")]
    Save {
        path: PathBuf,
        source: std::io::Error,
    },
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for PlotError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        PlotError::Render(format!("{value:?}"))
    }
}
impl From<image::ImageError> for PlotError {
    fn from(value: image::ImageError) -> Self {
        PlotError::Render(value.to_string())
    }
}
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub line: RGBColor,
    /// Caption, axis titles and tick labels. Needs a system font.
    pub labels: bool,
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 450,
            background: RGBColor(255, 255, 255),
            line: BLUE,
            labels: true,
        }
    }
}
/// Draws the rolling window as an `o-` line chart and returns PNG bytes.
pub fn render_readings_png(readings: &RollingBuffer, style: &PlotStyle) -> Result<Vec<u8>, PlotError> {
    if readings.is_empty() {
        return Err(PlotError::Empty);
    }
    let points: Vec<(f64, f64)> = readings.iter().map(|r| (r.elapsed, r.value)).collect();
    let (x_min, x_max) = bounds(points.iter().map(|p| p.0));
    let (y_min, y_max) = bounds(points.iter().map(|p| p.1));
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut builder = ChartBuilder::on(&root);
        builder.margin(10);
        if style.labels {
            builder
                .caption("Voltage Reader", ("sans-serif", 20).into_font())
                .set_label_area_size(LabelAreaPosition::Left, 60)
                .set_label_area_size(LabelAreaPosition::Bottom, 40);
        }
        let mut chart = builder.build_cartesian_2d(x_min..x_max, y_min..y_max)?;
        let mut mesh = chart.configure_mesh();
        mesh.light_line_style(BLACK.mix(0.05));
        if style.labels {
            mesh.x_desc("Time (s)").y_desc("DCV");
        } else {
            mesh.x_labels(0).y_labels(0);
        }
        mesh.draw()?;
        let color = style.line;
        chart.draw_series(LineSeries::new(points.iter().copied(), &color))?;
        chart.draw_series(
            points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 3, color.filled())),
        )?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
/// Renders and writes the PNG, returning the path written.
pub fn save_readings_png(
    readings: &RollingBuffer,
    style: &PlotStyle,
    path: &Path,
) -> Result<PathBuf, PlotError> {
    let png = render_readings_png(readings, style)?;
    std::fs::write(path, png).map_err(|source| PlotError::Save {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(path.to_path_buf())
}
/// `out.txt` -> `out.txt.png`; no output file -> `voltage.png`.
pub fn snapshot_path(output: Option<&Path>) -> PathBuf {
    match output {
        Some(path) => {
            let mut name = path.as_os_str().to_owned();
            name.push(".png");
            PathBuf::from(name)
        }
        None => PathBuf::from("voltage.png"),
    }
}
fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if (hi - lo).abs() < f64::EPSILON {
        (lo - 1.0, hi + 1.0)
    } else {
        let pad = (hi - lo) * 0.05;
        (lo - pad, hi + pad)
    }
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, PlotError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| PlotError::Render("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Reading;
    fn unlabelled() -> PlotStyle {
        PlotStyle {
            labels: false,
            ..PlotStyle::default()
        }
    }
    #[test]
    fn renders_png_bytes() {
        let mut readings = RollingBuffer::new(10);
        for i in 0..5 {
            readings.push(Reading {
                elapsed: i as f64 * 0.1,
                value: (i % 3) as f64,
            });
        }
        let png = render_readings_png(&readings, &unlabelled()).unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }
    #[test]
    fn single_reading_still_renders() {
        let mut readings = RollingBuffer::new(10);
        readings.push(Reading {
            elapsed: 0.0,
            value: 4.0,
        });
        assert!(render_readings_png(&readings, &unlabelled()).is_ok());
    }
    #[test]
    fn empty_buffer_is_rejected() {
        let readings = RollingBuffer::new(10);
        assert!(matches!(
            render_readings_png(&readings, &unlabelled()),
            Err(PlotError::Empty)
        ));
    }
    #[test]
    fn snapshot_sits_next_to_output() {
        assert_eq!(
            snapshot_path(Some(Path::new("runs/out.txt_1"))),
            PathBuf::from("runs/out.txt_1.png")
        );
        assert_eq!(snapshot_path(None), PathBuf::from("voltage.png"));
    }
}
