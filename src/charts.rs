//! SVG-графики (plotters): распределение классов, гистограмма, круговая диаграмма

use std::path::Path;

use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;

use crate::error::{PipelineError, Result};

pub const LEGIT_COLOR: RGBColor = RGBColor(0x66, 0xbb, 0x6a);
pub const FRAUD_COLOR: RGBColor = RGBColor(0xef, 0x53, 0x50);
const NEUTRAL_COLOR: RGBColor = RGBColor(0x42, 0x7a, 0xb8);

/// Цвет в виде CSS hex (#rrggbb), чтобы легенда HTML совпадала с графиками
pub fn hex(color: &RGBColor) -> String {
    format!("#{:02x}{:02x}{:02x}", color.0, color.1, color.2)
}

type DrawResult = std::result::Result<(), DrawingAreaErrorKind<std::io::Error>>;

fn chart_error(err: DrawingAreaErrorKind<std::io::Error>) -> PipelineError {
    PipelineError::Chart(err.to_string())
}

#[derive(Debug, Clone)]
pub struct ChartSettings {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub width: u32,
    pub height: u32,
}

impl ChartSettings {
    pub fn new(title: &str, width: u32, height: u32) -> Self {
        Self {
            title: title.to_string(),
            x_label: String::new(),
            y_label: String::new(),
            width,
            height,
        }
    }

    pub fn labels(mut self, x_label: &str, y_label: &str) -> Self {
        self.x_label = x_label.to_string();
        self.y_label = y_label.to_string();
        self
    }
}

/// Категория для столбчатой и круговой диаграмм
#[derive(Debug, Clone)]
pub struct Category {
    pub label: String,
    pub value: f64,
    pub color: RGBColor,
}

impl Category {
    pub fn new(label: &str, value: f64, color: RGBColor) -> Self {
        Self {
            label: label.to_string(),
            value,
            color,
        }
    }
}

pub fn write_svg<P: AsRef<Path>>(path: P, svg: &str) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, svg)?;
    Ok(())
}

/// Столбчатая диаграмма по категориям, над каждым столбцом - значение
pub fn bar_chart(categories: &[Category], settings: &ChartSettings) -> Result<String> {
    if categories.is_empty() {
        return Err(PipelineError::Chart("no categories to plot".to_string()));
    }
    let mut svg = String::new();
    draw_bars(&mut svg, categories, settings).map_err(chart_error)?;
    Ok(svg)
}

fn draw_bars(svg: &mut String, categories: &[Category], settings: &ChartSettings) -> DrawResult {
    let root = SVGBackend::with_string(svg, (settings.width, settings.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let n = categories.len();
    let y_max = categories.iter().map(|c| c.value).fold(0.0, f64::max).max(1.0) * 1.15;
    let labels: Vec<String> = categories.iter().map(|c| c.label.clone()).collect();
    let label_for = |x: &f64| -> String {
        let idx = x.round();
        if (x - idx).abs() < 1e-6 && idx >= 0.0 && (idx as usize) < labels.len() {
            labels[idx as usize].clone()
        } else {
            String::new()
        }
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(&settings.title, ("sans-serif", 20).into_font())
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&label_for)
        .y_label_formatter(&|v| format!("{:.0}", v))
        .x_desc(settings.x_label.as_str())
        .y_desc(settings.y_label.as_str())
        .draw()?;

    chart.draw_series(categories.iter().enumerate().map(|(i, c)| {
        let x = i as f64;
        Rectangle::new([(x - 0.35, 0.0), (x + 0.35, c.value)], c.color.filled())
    }))?;

    chart.draw_series(categories.iter().enumerate().map(|(i, c)| {
        Text::new(
            format!("{}", c.value),
            (i as f64 - 0.1, c.value + y_max * 0.02),
            ("sans-serif", 14).into_font(),
        )
    }))?;

    root.present()?;
    Ok(())
}

/// Точек на кривой плотности
const KDE_POINTS: usize = 200;

/// Гистограмма с равными интервалами и сглаженной кривой плотности поверх
pub fn histogram(values: &[f64], bins: usize, settings: &ChartSettings) -> Result<String> {
    if values.is_empty() {
        return Err(PipelineError::Chart("no values to plot".to_string()));
    }
    if bins == 0 {
        return Err(PipelineError::Chart("bins must be positive".to_string()));
    }

    let (edges, counts) = bin_values(values, bins);

    // Плотность переводится в масштаб счетчиков: n * ширина интервала
    let x_min = edges[0];
    let bin_width = edges[1] - edges[0];
    let step = (edges[bins] - x_min) / (KDE_POINTS - 1) as f64;
    let grid: Vec<f64> = (0..KDE_POINTS).map(|i| x_min + i as f64 * step).collect();
    let scale = values.len() as f64 * bin_width;
    let curve: Vec<(f64, f64)> = grid
        .iter()
        .zip(kde(values, &grid))
        .map(|(&x, density)| (x, density * scale))
        .collect();

    let mut svg = String::new();
    draw_histogram(&mut svg, &edges, &counts, &curve, settings).map_err(chart_error)?;
    Ok(svg)
}

/// Гауссова оценка плотности в точках `grid`, ширина окна по правилу Скотта
/// (sigma * n^(-1/5)); при нулевом разбросе окно равно 1
pub fn kde(values: &[f64], grid: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return vec![0.0; grid.len()];
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    let bandwidth = match variance.sqrt() * (n as f64).powf(-0.2) {
        h if h > 1e-12 => h,
        _ => 1.0,
    };

    let norm = 1.0 / (n as f64 * bandwidth * (2.0 * std::f64::consts::PI).sqrt());
    grid.iter()
        .map(|&x| {
            let sum: f64 = values
                .iter()
                .map(|&v| {
                    let u = (x - v) / bandwidth;
                    (-0.5 * u * u).exp()
                })
                .sum();
            sum * norm
        })
        .collect()
}

/// Границы интервалов (bins + 1) и количество значений в каждом
pub fn bin_values(values: &[f64], bins: usize) -> (Vec<f64>, Vec<usize>) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = if max > min { (max - min) / bins as f64 } else { 1.0 };

    let edges: Vec<f64> = (0..=bins).map(|i| min + i as f64 * width).collect();
    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    (edges, counts)
}

fn draw_histogram(
    svg: &mut String,
    edges: &[f64],
    counts: &[usize],
    curve: &[(f64, f64)],
    settings: &ChartSettings,
) -> DrawResult {
    let root = SVGBackend::with_string(svg, (settings.width, settings.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let x_min = edges[0];
    let x_max = edges[edges.len() - 1];
    let peak = counts.iter().copied().max().unwrap_or(0).max(1) as f64;
    let y_max = curve.iter().map(|&(_, y)| y).fold(peak, f64::max) * 1.1;

    let mut chart = ChartBuilder::on(&root)
        .caption(&settings.title, ("sans-serif", 20).into_font())
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_labels(10)
        .y_labels(10)
        .x_label_formatter(&|v| format!("{:.1}", v))
        .y_label_formatter(&|v| format!("{:.0}", v))
        .x_desc(settings.x_label.as_str())
        .y_desc(settings.y_label.as_str())
        .draw()?;

    chart.draw_series(counts.iter().enumerate().map(|(i, &count)| {
        Rectangle::new(
            [(edges[i], 0.0), (edges[i + 1], count as f64)],
            NEUTRAL_COLOR.mix(0.6).filled(),
        )
    }))?;

    chart.draw_series(LineSeries::new(
        curve.iter().copied(),
        NEUTRAL_COLOR.stroke_width(2),
    ))?;

    root.present()?;
    Ok(())
}

/// Круговая диаграмма с процентами; нулевые категории не рисуются
pub fn pie_chart(categories: &[Category], settings: &ChartSettings) -> Result<String> {
    let visible: Vec<&Category> = categories.iter().filter(|c| c.value > 0.0).collect();
    if visible.is_empty() {
        return Err(PipelineError::Chart("nothing to plot".to_string()));
    }

    let sizes: Vec<f64> = visible.iter().map(|c| c.value).collect();
    let colors: Vec<RGBColor> = visible.iter().map(|c| c.color).collect();
    let labels: Vec<String> = visible.iter().map(|c| c.label.clone()).collect();

    let mut svg = String::new();
    draw_pie(&mut svg, &sizes, &colors, &labels, settings).map_err(chart_error)?;
    Ok(svg)
}

fn draw_pie(
    svg: &mut String,
    sizes: &[f64],
    colors: &[RGBColor],
    labels: &[String],
    settings: &ChartSettings,
) -> DrawResult {
    let root = SVGBackend::with_string(svg, (settings.width, settings.height)).into_drawing_area();
    root.fill(&WHITE)?;
    let area = root.titled(&settings.title, ("sans-serif", 20).into_font())?;

    let (w, h) = area.dim_in_pixel();
    let center = (w as i32 / 2, h as i32 / 2);
    let radius = w.min(h) as f64 * 0.35;

    let mut pie = Pie::new(&center, &radius, sizes, colors, labels);
    pie.start_angle(90.0);
    pie.label_style(("sans-serif", 14).into_font().color(&BLACK));
    pie.percentages(("sans-serif", 14).into_font().color(&WHITE));
    area.draw(&pie)?;

    root.present()?;
    Ok(())
}
