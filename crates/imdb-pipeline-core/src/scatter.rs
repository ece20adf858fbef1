//! ASCII rating-vs-votes scatter plot.
//!
//! The x axis is rating on `[0, 10]`; the y axis is `log10(votes + 1)` from
//! zero up to the largest value in the data. Cell glyphs show density:
//! `.` one movie, `o` two to four, `@` five or more.

use crate::view::ScatterPoint;

pub const DEFAULT_WIDTH: usize = 50;
pub const DEFAULT_HEIGHT: usize = 12;

fn glyph(n: u32) -> char {
    match n {
        0 => ' ',
        1 => '.',
        2..=4 => 'o',
        _ => '@',
    }
}

/// Render points into lines of text, top row first.
pub fn render(points: &[ScatterPoint], width: usize, height: usize) -> Vec<String> {
    if points.is_empty() || width == 0 || height == 0 {
        return vec!["(no data)".to_string()];
    }

    let y_max = points
        .iter()
        .map(|p| ((p.votes as f64) + 1.0).log10())
        .fold(0.0_f64, f64::max)
        .max(1.0);

    let max_votes = points.iter().map(|p| p.votes).max().unwrap_or(0);

    let mut grid = vec![vec![0u32; width]; height];
    for p in points {
        let x = ((p.rating.clamp(0.0, 10.0) / 10.0) * (width - 1) as f64).round() as usize;
        let y_val = ((p.votes as f64) + 1.0).log10();
        let y = ((y_val / y_max) * (height - 1) as f64).round() as usize;
        grid[height - 1 - y.min(height - 1)][x.min(width - 1)] += 1;
    }

    let mut lines = Vec::with_capacity(height + 2);
    for (row_idx, row) in grid.iter().enumerate() {
        let label = if row_idx == 0 {
            format!("{:>7}", format_votes(max_votes as f64))
        } else if row_idx == height - 1 {
            format!("{:>7}", 0)
        } else {
            " ".repeat(7)
        };
        let cells: String = row.iter().map(|n| glyph(*n)).collect();
        lines.push(format!("{} |{}", label, cells.trim_end()));
    }
    lines.push(format!("{} +{}", " ".repeat(7), "-".repeat(width)));
    lines.push(format!(
        "{}  0{}10  (rating)",
        " ".repeat(7),
        " ".repeat(width.saturating_sub(3))
    ));
    lines
}

/// Compact vote count: `950`, `12K`, `1.2M`.
pub fn format_votes(v: f64) -> String {
    let v = v.max(0.0);
    if v >= 1_000_000.0 {
        format!("{:.1}M", v / 1_000_000.0)
    } else if v >= 1_000.0 {
        format!("{:.0}K", v / 1_000.0)
    } else {
        format!("{:.0}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(render(&[], 40, 10), vec!["(no data)"]);
    }

    #[test]
    fn test_dimensions_and_density() {
        let mut points = vec![ScatterPoint {
            rating: 10.0,
            votes: 1_000_000,
        }];
        for _ in 0..5 {
            points.push(ScatterPoint {
                rating: 0.0,
                votes: 0,
            });
        }
        let lines = render(&points, 20, 6);
        assert_eq!(lines.len(), 8);
        // highest vote count sits in the top-right cell
        assert!(lines[0].ends_with('.'));
        assert!(lines[0].trim_start().starts_with("1.0M"));
        // five zero-vote, zero-rated movies pile up bottom-left
        assert!(lines[5].ends_with("|@"));
    }

    #[test]
    fn test_format_votes() {
        assert_eq!(format_votes(950.0), "950");
        assert_eq!(format_votes(12_345.0), "12K");
        assert_eq!(format_votes(1_200_000.0), "1.2M");
    }
}
