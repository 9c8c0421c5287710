use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use image::{ImageBuffer, ImageEncoder, RgbaImage};
use sha2::{Digest, Sha256};
use std::fmt::Write;
use usvg::{TreeParsing, TreeTextToPath};

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 440.0;
const FONT_FAMILY: &str = "sans-serif";
const TEXT_COLOR: &str = "#24292e";
const GRID_COLOR: &str = "#e1e4e8";
const AXIS_TICKS: usize = 5;
const MAX_LABEL_CHARS: usize = 18;
const MAX_LEGEND_ENTRIES: usize = 12;

/// Categorical colors for grouped bars and line series
const SERIES_COLORS: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

pub const DAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

// 5 colors from low to high intensity
pub struct ColorPalette {
    pub colors: Vec<String>,
}

impl ColorPalette {
    pub fn blues() -> Self {
        Self {
            colors: vec![
                "#f7fbff".to_string(),
                "#c6dbef".to_string(),
                "#6baed6".to_string(),
                "#2171b5".to_string(),
                "#08306b".to_string(),
            ],
        }
    }

    pub fn get_color_for_count(&self, count: i64, max_count: i64) -> &str {
        if count == 0 {
            return &self.colors[0];
        }

        if max_count == 0 {
            return &self.colors[1];
        }

        let ratio = count as f64 / max_count as f64;
        let index = match ratio {
            r if r >= 0.75 => 4,
            r if r >= 0.50 => 3,
            r if r >= 0.25 => 2,
            _ => 1,
        };

        &self.colors[index]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartFormat {
    Svg,
    Png,
}

impl ChartFormat {
    /// Parse the `format` query value; absent means SVG
    pub fn parse(value: Option<&str>) -> Option<Self> {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("svg") => Some(ChartFormat::Svg),
            Some("png") => Some(ChartFormat::Png),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ChartFormat::Svg => "image/svg+xml",
            ChartFormat::Png => "image/png",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    /// Bars sharing a group share a color and a legend entry
    pub group: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DatePoint {
    pub x: f64,
    pub date: NaiveDate,
    pub label: String,
    pub group: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<(NaiveDate, f64)>,
}

struct PlotArea {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl PlotArea {
    fn new(has_legend: bool) -> Self {
        let right_margin = if has_legend { 190.0 } else { 30.0 };
        let left = 70.0;
        let top = 50.0;
        Self {
            left,
            top,
            width: WIDTH - left - right_margin,
            height: HEIGHT - top - 100.0,
        }
    }

    fn bottom(&self) -> f64 {
        self.top + self.height
    }

    fn right(&self) -> f64 {
        self.left + self.width
    }
}

/// Escape text for use inside SVG elements and attributes
pub fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Smallest 1/2/5 × 10^k value that is at least `max`
pub fn nice_ceiling(max: f64) -> f64 {
    if !max.is_finite() || max <= 0.0 {
        return 1.0;
    }

    let magnitude = 10f64.powf(max.log10().floor());
    for step in [1.0, 2.0, 5.0, 10.0] {
        if step * magnitude >= max {
            return step * magnitude;
        }
    }
    10.0 * magnitude
}

fn format_tick(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value)
    }
}

fn short_label(label: &str) -> String {
    if label.chars().count() > MAX_LABEL_CHARS {
        let truncated: String = label.chars().take(MAX_LABEL_CHARS - 1).collect();
        format!("{}…", truncated)
    } else {
        label.to_string()
    }
}

/// Distinct groups in first-seen order
fn group_order<'a, I: IntoIterator<Item = &'a str>>(groups: I) -> Vec<&'a str> {
    let mut order: Vec<&str> = Vec::new();
    for group in groups {
        if !order.contains(&group) {
            order.push(group);
        }
    }
    order
}

fn series_color(index: usize) -> &'static str {
    SERIES_COLORS[index % SERIES_COLORS.len()]
}

fn svg_header(svg: &mut String, width: f64, height: f64, title: &str) {
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    );
    let _ = write!(
        svg,
        r##"<rect width="{}" height="{}" fill="#ffffff"/>"##,
        width, height
    );
    let _ = write!(
        svg,
        r#"<text x="{}" y="28" font-family="{}" font-size="16" font-weight="600" fill="{}" text-anchor="middle">{}</text>"#,
        width / 2.0,
        FONT_FAMILY,
        TEXT_COLOR,
        escape_xml(title)
    );
}

fn empty_chart(title: &str) -> String {
    let mut svg = String::new();
    svg_header(&mut svg, WIDTH, HEIGHT, title);
    let _ = write!(
        svg,
        r#"<text x="{}" y="{}" font-family="{}" font-size="13" fill="{}" text-anchor="middle">No data</text>"#,
        WIDTH / 2.0,
        HEIGHT / 2.0,
        FONT_FAMILY,
        TEXT_COLOR
    );
    svg.push_str("</svg>");
    svg
}

/// Horizontal gridlines with value labels from 0 to `max`
fn value_axis(svg: &mut String, plot: &PlotArea, max: f64, label: &str) {
    for i in 0..=AXIS_TICKS {
        let value = max * i as f64 / AXIS_TICKS as f64;
        let y = plot.bottom() - plot.height * i as f64 / AXIS_TICKS as f64;
        let _ = write!(
            svg,
            r#"<line x1="{}" y1="{y}" x2="{}" y2="{y}" stroke="{}" stroke-width="1"/>"#,
            plot.left,
            plot.right(),
            GRID_COLOR,
            y = y
        );
        let _ = write!(
            svg,
            r#"<text x="{}" y="{}" font-family="{}" font-size="11" fill="{}" text-anchor="end">{}</text>"#,
            plot.left - 6.0,
            y + 4.0,
            FONT_FAMILY,
            TEXT_COLOR,
            format_tick(value)
        );
    }

    let _ = write!(
        svg,
        r#"<text x="16" y="{}" font-family="{}" font-size="12" fill="{}" text-anchor="middle" transform="rotate(-90 16 {})">{}</text>"#,
        plot.top + plot.height / 2.0,
        FONT_FAMILY,
        TEXT_COLOR,
        plot.top + plot.height / 2.0,
        escape_xml(label)
    );
}

fn legend(svg: &mut String, plot: &PlotArea, entries: &[&str]) {
    let x = plot.right() + 16.0;
    for (i, entry) in entries.iter().take(MAX_LEGEND_ENTRIES).enumerate() {
        let y = plot.top + i as f64 * 18.0;
        let _ = write!(
            svg,
            r#"<rect x="{}" y="{}" width="10" height="10" fill="{}"/>"#,
            x,
            y,
            series_color(i)
        );
        let _ = write!(
            svg,
            r#"<text x="{}" y="{}" font-family="{}" font-size="11" fill="{}">{}</text>"#,
            x + 16.0,
            y + 9.0,
            FONT_FAMILY,
            TEXT_COLOR,
            escape_xml(&short_label(entry))
        );
    }

    if entries.len() > MAX_LEGEND_ENTRIES {
        let _ = write!(
            svg,
            r#"<text x="{}" y="{}" font-family="{}" font-size="11" fill="{}">+{} more</text>"#,
            x,
            plot.top + MAX_LEGEND_ENTRIES as f64 * 18.0 + 9.0,
            FONT_FAMILY,
            TEXT_COLOR,
            entries.len() - MAX_LEGEND_ENTRIES
        );
    }
}

fn date_ticks(svg: &mut String, plot: &PlotArea, start: i32, end: i32) {
    for i in 0..=AXIS_TICKS {
        let day = start as f64 + (end - start) as f64 * i as f64 / AXIS_TICKS as f64;
        let label = NaiveDate::from_num_days_from_ce_opt(day.round() as i32)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let x = plot.left + plot.width * i as f64 / AXIS_TICKS as f64;
        let _ = write!(
            svg,
            r#"<text x="{}" y="{}" font-family="{}" font-size="11" fill="{}" text-anchor="middle">{}</text>"#,
            x,
            plot.bottom() + 18.0,
            FONT_FAMILY,
            TEXT_COLOR,
            label
        );
    }
}

/// Vertical bar chart, one bar per entry in input order
pub fn bar_chart(title: &str, value_label: &str, bars: &[Bar]) -> String {
    if bars.is_empty() {
        return empty_chart(title);
    }

    let groups = group_order(bars.iter().filter_map(|b| b.group.as_deref()));
    let plot = PlotArea::new(!groups.is_empty());
    let max = nice_ceiling(bars.iter().map(|b| b.value).fold(0.0, f64::max));

    let mut svg = String::new();
    svg_header(&mut svg, WIDTH, HEIGHT, title);
    value_axis(&mut svg, &plot, max, value_label);

    let slot = plot.width / bars.len() as f64;
    let bar_width = (slot * 0.7).max(1.0);

    for (i, bar) in bars.iter().enumerate() {
        let height = plot.height * (bar.value.max(0.0) / max);
        let x = plot.left + slot * i as f64 + (slot - bar_width) / 2.0;
        let y = plot.bottom() - height;
        let color = match bar.group.as_deref() {
            Some(group) => series_color(groups.iter().position(|g| *g == group).unwrap_or(0)),
            None => series_color(0),
        };

        let _ = write!(
            svg,
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"><title>{}: {}</title></rect>"#,
            x,
            y,
            bar_width,
            height,
            color,
            escape_xml(&bar.label),
            format_tick(bar.value)
        );

        if bars.len() <= 30 {
            let _ = write!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" font-family="{}" font-size="10" fill="{}" text-anchor="middle">{}</text>"#,
                x + bar_width / 2.0,
                y - 4.0,
                FONT_FAMILY,
                TEXT_COLOR,
                format_tick(bar.value)
            );
        }

        let label_x = x + bar_width / 2.0;
        let label_y = plot.bottom() + 12.0;
        let _ = write!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-family="{}" font-size="10" fill="{}" text-anchor="end" transform="rotate(-40 {:.1} {:.1})">{}</text>"#,
            label_x,
            label_y,
            FONT_FAMILY,
            TEXT_COLOR,
            label_x,
            label_y,
            escape_xml(&short_label(&bar.label))
        );
    }

    if !groups.is_empty() {
        legend(&mut svg, &plot, &groups);
    }

    svg.push_str("</svg>");
    svg
}

/// Scatter of a numeric x value against a date on the y axis
pub fn date_scatter_chart(title: &str, x_label: &str, points: &[DatePoint]) -> String {
    if points.is_empty() {
        return empty_chart(title);
    }

    let groups = group_order(points.iter().filter_map(|p| p.group.as_deref()));
    let plot = PlotArea::new(!groups.is_empty());
    let max_x = nice_ceiling(points.iter().map(|p| p.x).fold(0.0, f64::max));

    let days: Vec<i32> = points.iter().map(|p| p.date.num_days_from_ce()).collect();
    let mut first_day = days.iter().copied().min().unwrap_or(0);
    let mut last_day = days.iter().copied().max().unwrap_or(0);
    if first_day == last_day {
        first_day -= 1;
        last_day += 1;
    }
    let day_span = (last_day - first_day) as f64;

    let mut svg = String::new();
    svg_header(&mut svg, WIDTH, HEIGHT, title);

    for i in 0..=AXIS_TICKS {
        let day = first_day as f64 + day_span * i as f64 / AXIS_TICKS as f64;
        let y = plot.bottom() - plot.height * i as f64 / AXIS_TICKS as f64;
        let label = NaiveDate::from_num_days_from_ce_opt(day.round() as i32)
            .map(|d| d.format("%Y-%m").to_string())
            .unwrap_or_default();
        let _ = write!(
            svg,
            r#"<line x1="{}" y1="{y:.1}" x2="{}" y2="{y:.1}" stroke="{}" stroke-width="1"/>"#,
            plot.left,
            plot.right(),
            GRID_COLOR,
            y = y
        );
        let _ = write!(
            svg,
            r#"<text x="{}" y="{:.1}" font-family="{}" font-size="11" fill="{}" text-anchor="end">{}</text>"#,
            plot.left - 6.0,
            y + 4.0,
            FONT_FAMILY,
            TEXT_COLOR,
            label
        );
    }

    for i in 0..=AXIS_TICKS {
        let value = max_x * i as f64 / AXIS_TICKS as f64;
        let x = plot.left + plot.width * i as f64 / AXIS_TICKS as f64;
        let _ = write!(
            svg,
            r#"<text x="{:.1}" y="{}" font-family="{}" font-size="11" fill="{}" text-anchor="middle">{}</text>"#,
            x,
            plot.bottom() + 18.0,
            FONT_FAMILY,
            TEXT_COLOR,
            format_tick(value)
        );
    }
    let _ = write!(
        svg,
        r#"<text x="{}" y="{}" font-family="{}" font-size="12" fill="{}" text-anchor="middle">{}</text>"#,
        plot.left + plot.width / 2.0,
        plot.bottom() + 40.0,
        FONT_FAMILY,
        TEXT_COLOR,
        escape_xml(x_label)
    );

    for (point, day) in points.iter().zip(&days) {
        let x = plot.left + plot.width * (point.x.max(0.0) / max_x);
        let y = plot.bottom() - plot.height * ((*day - first_day) as f64 / day_span);
        let color = match point.group.as_deref() {
            Some(group) => series_color(groups.iter().position(|g| *g == group).unwrap_or(0)),
            None => series_color(0),
        };
        let _ = write!(
            svg,
            r#"<circle cx="{:.1}" cy="{:.1}" r="4" fill="{}" fill-opacity="0.75"><title>{}</title></circle>"#,
            x,
            y,
            color,
            escape_xml(&point.label)
        );
    }

    if !groups.is_empty() {
        legend(&mut svg, &plot, &groups);
    }

    svg.push_str("</svg>");
    svg
}

/// One polyline per series over a shared date axis
pub fn line_chart(title: &str, value_label: &str, series: &[LineSeries]) -> String {
    let all_points: Vec<&(NaiveDate, f64)> = series.iter().flat_map(|s| &s.points).collect();
    if all_points.is_empty() {
        return empty_chart(title);
    }

    let plot = PlotArea::new(true);
    let max = nice_ceiling(all_points.iter().map(|(_, v)| *v).fold(0.0, f64::max));
    let mut first_day = all_points
        .iter()
        .map(|(d, _)| d.num_days_from_ce())
        .min()
        .unwrap_or(0);
    let mut last_day = all_points
        .iter()
        .map(|(d, _)| d.num_days_from_ce())
        .max()
        .unwrap_or(0);
    if first_day == last_day {
        first_day -= 1;
        last_day += 1;
    }
    let day_span = (last_day - first_day) as f64;

    let mut svg = String::new();
    svg_header(&mut svg, WIDTH, HEIGHT, title);
    value_axis(&mut svg, &plot, max, value_label);
    date_ticks(&mut svg, &plot, first_day, last_day);

    for (i, line) in series.iter().enumerate() {
        if line.points.is_empty() {
            continue;
        }

        let mut points = line.points.clone();
        points.sort_by_key(|(d, _)| *d);

        let coords: Vec<(f64, f64)> = points
            .iter()
            .map(|(date, value)| {
                let x = plot.left
                    + plot.width * ((date.num_days_from_ce() - first_day) as f64 / day_span);
                let y = plot.bottom() - plot.height * (value.max(0.0) / max);
                (x, y)
            })
            .collect();

        let path: Vec<String> = coords
            .iter()
            .map(|(x, y)| format!("{:.1},{:.1}", x, y))
            .collect();
        let color = series_color(i);

        let _ = write!(
            svg,
            r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="2"><title>{}</title></polyline>"#,
            path.join(" "),
            color,
            escape_xml(&line.name)
        );
        for (x, y) in coords {
            let _ = write!(
                svg,
                r#"<circle cx="{:.1}" cy="{:.1}" r="3" fill="{}"/>"#,
                x, y, color
            );
        }
    }

    let names: Vec<&str> = series.iter().map(|s| s.name.as_str()).collect();
    legend(&mut svg, &plot, &names);

    svg.push_str("</svg>");
    svg
}

/// Day-of-week × hour grid, rows Sun..Sat, columns 0..23
pub fn activity_heatmap(title: &str, grid: &[[i64; 24]; 7]) -> String {
    let cell_size = 24.0;
    let cell_gap = 3.0;
    let day_label_width = 40.0;
    let hour_label_height = 20.0;
    let title_height = 44.0;
    let padding = 20.0;

    let graph_width = 24.0 * (cell_size + cell_gap);
    let graph_height = 7.0 * (cell_size + cell_gap);
    let total_width = padding + day_label_width + graph_width + padding;
    let total_height = title_height + hour_label_height + graph_height + 40.0;

    let palette = ColorPalette::blues();
    let max_count = grid.iter().flatten().copied().max().unwrap_or(0);

    let mut svg = String::new();
    svg_header(&mut svg, total_width, total_height, title);

    let grid_left = padding + day_label_width;
    let grid_top = title_height + hour_label_height;

    for hour in (0..24).step_by(3) {
        let _ = write!(
            svg,
            r#"<text x="{}" y="{}" font-family="{}" font-size="10" fill="{}" text-anchor="middle">{}</text>"#,
            grid_left + hour as f64 * (cell_size + cell_gap) + cell_size / 2.0,
            grid_top - 6.0,
            FONT_FAMILY,
            TEXT_COLOR,
            hour
        );
    }

    for (day_idx, row) in grid.iter().enumerate() {
        let y = grid_top + day_idx as f64 * (cell_size + cell_gap);
        let _ = write!(
            svg,
            r#"<text x="{}" y="{}" font-family="{}" font-size="10" fill="{}" text-anchor="end">{}</text>"#,
            grid_left - 6.0,
            y + cell_size / 2.0 + 3.0,
            FONT_FAMILY,
            TEXT_COLOR,
            DAY_LABELS[day_idx]
        );

        for (hour, count) in row.iter().enumerate() {
            let x = grid_left + hour as f64 * (cell_size + cell_gap);
            let _ = write!(
                svg,
                r#"<rect x="{}" y="{}" width="{}" height="{}" rx="2" fill="{}"><title>{} {:02}:00: {} plays</title></rect>"#,
                x,
                y,
                cell_size,
                cell_size,
                palette.get_color_for_count(*count, max_count),
                DAY_LABELS[day_idx],
                hour,
                count
            );
        }
    }

    // Legend at bottom right
    let legend_y = grid_top + graph_height + 10.0;
    let legend_cell = 10.0;
    let legend_start_x =
        total_width - (40.0 + palette.colors.len() as f64 * (legend_cell + 3.0) + 40.0 + padding);

    let _ = write!(
        svg,
        r#"<text x="{}" y="{}" font-family="{}" font-size="10" fill="{}" text-anchor="end">Less</text>"#,
        legend_start_x + 30.0,
        legend_y + legend_cell / 2.0 + 3.0,
        FONT_FAMILY,
        TEXT_COLOR
    );
    for (i, color) in palette.colors.iter().enumerate() {
        let _ = write!(
            svg,
            r#"<rect x="{}" y="{}" width="{}" height="{}" rx="2" fill="{}"/>"#,
            legend_start_x + 35.0 + i as f64 * (legend_cell + 3.0),
            legend_y,
            legend_cell,
            legend_cell,
            color
        );
    }
    let _ = write!(
        svg,
        r#"<text x="{}" y="{}" font-family="{}" font-size="10" fill="{}" text-anchor="start">More</text>"#,
        legend_start_x + 40.0 + palette.colors.len() as f64 * (legend_cell + 3.0),
        legend_y + legend_cell / 2.0 + 3.0,
        FONT_FAMILY,
        TEXT_COLOR
    );

    svg.push_str("</svg>");
    svg
}

/// Encode an SVG document in the requested format
pub fn encode(svg: String, format: ChartFormat) -> Result<Vec<u8>> {
    match format {
        ChartFormat::Svg => Ok(svg.into_bytes()),
        ChartFormat::Png => svg_to_png(&svg),
    }
}

/// Convert SVG to PNG
pub fn svg_to_png(svg_content: &str) -> Result<Vec<u8>> {
    let mut fontdb = usvg::fontdb::Database::new();
    fontdb.load_system_fonts();

    let opts = usvg::Options::default();
    let mut tree = usvg::Tree::from_data(svg_content.as_bytes(), &opts)?;

    // Text must become paths before resvg can draw it
    tree.convert_text(&fontdb);

    let scale = 2.0;
    let pixmap_size = tree.size.to_int_size();
    let scaled_width = (pixmap_size.width() as f32 * scale) as u32;
    let scaled_height = (pixmap_size.height() as f32 * scale) as u32;

    let mut pixmap = tiny_skia::Pixmap::new(scaled_width, scaled_height)
        .context("Failed to create pixmap")?;

    let transform = tiny_skia::Transform::from_scale(scale, scale);
    resvg::Tree::from_usvg(&tree).render(transform, &mut pixmap.as_mut());

    let img: RgbaImage =
        ImageBuffer::from_raw(pixmap.width(), pixmap.height(), pixmap.data().to_vec())
            .context("Failed to create image buffer")?;

    let mut buffer = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new_with_quality(
        &mut buffer,
        image::codecs::png::CompressionType::Best,
        image::codecs::png::FilterType::Adaptive,
    );
    encoder.write_image(
        img.as_raw(),
        img.width(),
        img.height(),
        image::ColorType::Rgba8,
    )?;

    Ok(buffer)
}

/// SHA-256 of the rendered bytes, hex encoded
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_palette_quantization() {
        let palette = ColorPalette::blues();

        assert_eq!(palette.get_color_for_count(0, 100), "#f7fbff");
        assert_eq!(palette.get_color_for_count(10, 100), "#c6dbef");
        assert_eq!(palette.get_color_for_count(25, 100), "#6baed6");
        assert_eq!(palette.get_color_for_count(50, 100), "#2171b5");
        assert_eq!(palette.get_color_for_count(100, 100), "#08306b");
        assert_eq!(palette.get_color_for_count(3, 0), "#c6dbef");
    }

    #[test]
    fn test_chart_format_parse() {
        assert_eq!(ChartFormat::parse(None), Some(ChartFormat::Svg));
        assert_eq!(ChartFormat::parse(Some("svg")), Some(ChartFormat::Svg));
        assert_eq!(ChartFormat::parse(Some("PNG")), Some(ChartFormat::Png));
        assert_eq!(ChartFormat::parse(Some("jpeg")), None);
        assert_eq!(ChartFormat::Png.content_type(), "image/png");
    }

    #[test]
    fn test_nice_ceiling() {
        assert_eq!(nice_ceiling(0.0), 1.0);
        assert_eq!(nice_ceiling(7.0), 10.0);
        assert_eq!(nice_ceiling(13.0), 20.0);
        assert_eq!(nice_ceiling(42.0), 50.0);
        assert_eq!(nice_ceiling(100.0), 100.0);
        assert_eq!(nice_ceiling(f64::NAN), 1.0);
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(
            escape_xml(r#"Rock & <Roll> "Mix" 'x'"#),
            "Rock &amp; &lt;Roll&gt; &quot;Mix&quot; &apos;x&apos;"
        );
    }

    #[test]
    fn test_bar_chart_renders_every_bar() {
        let bars = vec![
            Bar {
                label: "Song <A>".to_string(),
                value: 12.0,
                group: Some("Artist 1".to_string()),
            },
            Bar {
                label: "Song B".to_string(),
                value: 7.0,
                group: Some("Artist 2".to_string()),
            },
            Bar {
                label: "Song C".to_string(),
                value: 3.0,
                group: Some("Artist 1".to_string()),
            },
        ];

        let svg = bar_chart("Top Skipped", "Skips", &bars);

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<title>").count(), 3);
        assert!(svg.contains("Song &lt;A&gt;"));
        assert!(!svg.contains("Song <A>"));
        // Two groups, two legend entries
        assert!(svg.contains(">Artist 1</text>"));
        assert!(svg.contains(">Artist 2</text>"));
    }

    #[test]
    fn test_empty_charts_say_no_data() {
        assert!(bar_chart("Empty", "Count", &[]).contains("No data"));
        assert!(date_scatter_chart("Empty", "Duration", &[]).contains("No data"));
        assert!(line_chart("Empty", "Plays", &[]).contains("No data"));
    }

    #[test]
    fn test_scatter_plots_each_point() {
        let points: Vec<DatePoint> = (0..10)
            .map(|i| DatePoint {
                x: 120.0 + i as f64 * 30.0,
                date: date(2020 + i % 5, 1 + (i as u32 % 12), 1),
                label: format!("Song {}", i),
                group: None,
            })
            .collect();

        let svg = date_scatter_chart("Duration vs Release Date", "Duration (s)", &points);
        assert_eq!(svg.matches("<circle").count(), 10);
    }

    #[test]
    fn test_scatter_with_single_date() {
        let points = vec![DatePoint {
            x: 200.0,
            date: date(2024, 3, 1),
            label: "Only".to_string(),
            group: None,
        }];

        let svg = date_scatter_chart("Single", "Duration (s)", &points);
        assert!(!svg.contains("NaN"));
    }

    #[test]
    fn test_line_chart_one_polyline_per_series() {
        let series = vec![
            LineSeries {
                name: "Song A".to_string(),
                points: vec![(date(2025, 1, 6), 25.0), (date(2025, 1, 13), 31.0)],
            },
            LineSeries {
                name: "Song B".to_string(),
                points: vec![(date(2025, 1, 13), 22.0)],
            },
        ];

        let svg = line_chart("Weekly Plays", "Plays", &series);
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert_eq!(svg.matches("<circle").count(), 3);
    }

    #[test]
    fn test_heatmap_has_full_grid() {
        let mut grid = [[0i64; 24]; 7];
        grid[0][9] = 4;
        grid[6][23] = 8;

        let svg = activity_heatmap("Listening Activity", &grid);

        assert_eq!(svg.matches("plays</title>").count(), 7 * 24);
        assert!(svg.contains("Sun 09:00: 4 plays"));
        assert!(svg.contains("Sat 23:00: 8 plays"));
        assert!(svg.contains("#08306b"));
    }

    #[test]
    fn test_content_hash_is_stable() {
        let first = content_hash(b"<svg/>");
        let second = content_hash(b"<svg/>");

        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert_ne!(first, content_hash(b"<svg></svg>"));
    }

    #[test]
    fn test_svg_to_png() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10"><rect width="20" height="10" fill="#2171b5"/></svg>"##;
        let png = svg_to_png(svg).unwrap();

        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
