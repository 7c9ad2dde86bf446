use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::{FontStyle, register_font};
use std::io::Cursor;
use std::sync::OnceLock;

use crate::error::{DashboardError, Result};
use crate::graph::{ChartId, DashboardFigures, Figure};

/// Largest accepted chart width or height, in pixels
pub const MAX_DIMENSION: u32 = 4096;

/// Face registered as plotters' `sans-serif` family, used for every label
const CHART_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");

/// Plotly's default trace colours, reused for bars and pie slices
const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

/// Output encoding of a rendered chart
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    Svg,
    Png,
}

impl ImageFormat {
    pub fn parse(value: &str) -> Result<ImageFormat> {
        match value.to_ascii_lowercase().as_str() {
            "svg" => Ok(ImageFormat::Svg),
            "png" => Ok(ImageFormat::Png),
            other => Err(DashboardError::UnsupportedFormat(format!(
                "unknown image format: {}",
                other
            ))),
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ImageFormat::Svg => "image/svg+xml",
            ImageFormat::Png => "image/png",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Svg => "svg",
            ImageFormat::Png => "png",
        }
    }
}

/// Configuration options for chart images
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Width of the image in pixels
    pub width: u32,

    /// Height of the image in pixels
    pub height: u32,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

fn render_err(e: impl std::fmt::Display) -> DashboardError {
    DashboardError::Render(e.to_string())
}

/// Registers the embedded font once per process
fn ensure_font() -> Result<()> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let registered = *REGISTERED
        .get_or_init(|| register_font("sans-serif", FontStyle::Normal, CHART_FONT).is_ok());
    if registered {
        Ok(())
    } else {
        Err(render_err("embedded chart font could not be loaded"))
    }
}

/// Size in bytes of an RGB bitmap for the given dimensions
fn bitmap_len(options: &GraphOptions) -> Result<usize> {
    if options.width == 0
        || options.height == 0
        || options.width > MAX_DIMENSION
        || options.height > MAX_DIMENSION
    {
        return Err(render_err(format!(
            "chart size {}x{} outside 1..={} pixels",
            options.width, options.height, MAX_DIMENSION
        )));
    }
    (options.width as usize)
        .checked_mul(options.height as usize)
        .and_then(|pixels| pixels.checked_mul(3))
        .ok_or_else(|| render_err("chart bitmap size overflows"))
}

/// Renders one of the six chart artifacts as an image
///
/// # Arguments
/// * `figures` - The dashboard built for the current filters
/// * `id` - Which chart to draw
/// * `format` - SVG or PNG
/// * `options` - Image dimensions
///
/// # Errors
/// * `NotRenderable` for the project table
/// * `Render` if plotting fails or the size is outside `1..=MAX_DIMENSION`
pub fn render_chart(
    figures: &DashboardFigures,
    id: ChartId,
    format: ImageFormat,
    options: &GraphOptions,
) -> Result<Vec<u8>> {
    let figure = figures.get(id);
    if figure.series().is_none() {
        return Err(DashboardError::NotRenderable(id.to_string()));
    }
    ensure_font()?;

    match format {
        ImageFormat::Svg => {
            bitmap_len(options)?;
            let mut svg = String::new();
            {
                let root =
                    SVGBackend::with_string(&mut svg, (options.width, options.height)).into_drawing_area();
                draw_figure(&root, figure, id.is_pie())?;
                root.present().map_err(render_err)?;
            }
            Ok(svg.into_bytes())
        }
        ImageFormat::Png => {
            let mut buffer = vec![0u8; bitmap_len(options)?];
            {
                let root = BitMapBackend::with_buffer(&mut buffer, (options.width, options.height))
                    .into_drawing_area();
                draw_figure(&root, figure, id.is_pie())?;
                root.present().map_err(render_err)?;
            }
            encode_png(buffer, options)
        }
    }
}

fn encode_png(buffer: Vec<u8>, options: &GraphOptions) -> Result<Vec<u8>> {
    let image = image::RgbImage::from_raw(options.width, options.height, buffer)
        .ok_or_else(|| render_err("bitmap buffer does not match image size"))?;
    let mut png = Vec::new();
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut png), image::ImageOutputFormat::Png)
        .map_err(render_err)?;
    Ok(png)
}

fn draw_figure<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &Figure,
    pie: bool,
) -> Result<()> {
    root.fill(&WHITE).map_err(render_err)?;
    let (labels, values) = figure
        .series()
        .ok_or_else(|| render_err("figure has no series"))?;

    if pie {
        draw_pie(root, figure.title(), labels, values)
    } else {
        let x_title = figure
            .layout
            .xaxis
            .as_ref()
            .map(|axis| axis.title.text.as_str())
            .unwrap_or_default();
        let y_title = figure
            .layout
            .yaxis
            .as_ref()
            .map(|axis| axis.title.text.as_str())
            .unwrap_or_default();
        draw_bar(root, figure.title(), x_title, y_title, labels, values)
    }
}

/// One bar per category, categories in count order along the x axis
fn draw_bar<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    x_title: &str,
    y_title: &str,
    labels: &[String],
    values: &[usize],
) -> Result<()> {
    let categories = labels.len().max(1) as u32;
    let max_y = values.iter().copied().max().unwrap_or(0).max(1) as u32;

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d((0u32..categories).into_segmented(), 0u32..max_y + 1)
        .map_err(render_err)?;

    let category_label = |value: &SegmentValue<u32>| match value {
        SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
        _ => String::new(),
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(categories as usize)
        .x_label_formatter(&category_label)
        .x_desc(x_title)
        .y_desc(y_title)
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(
            Histogram::vertical(&chart)
                .style(PALETTE[0].filled())
                .margin(10)
                .data(
                    values
                        .iter()
                        .enumerate()
                        .map(|(i, count)| (i as u32, *count as u32)),
                ),
        )
        .map_err(render_err)?;

    Ok(())
}

/// One slice per category; an empty distribution draws only the title
fn draw_pie<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    labels: &[String],
    values: &[usize],
) -> Result<()> {
    let area = root
        .titled(title, ("sans-serif", 30).into_font())
        .map_err(render_err)?;

    if values.iter().sum::<usize>() == 0 {
        return Ok(());
    }

    let (width, height) = area.dim_in_pixel();
    let center = ((width / 2) as i32, (height / 2) as i32);
    let radius = f64::from(width.min(height)) * 0.35;
    let sizes: Vec<f64> = values.iter().map(|count| *count as f64).collect();
    let colors: Vec<RGBColor> = (0..values.len())
        .map(|i| PALETTE[i % PALETTE.len()])
        .collect();

    let pie = Pie::new(&center, &radius, &sizes, &colors, labels);
    area.draw(&pie).map_err(render_err)?;

    Ok(())
}
