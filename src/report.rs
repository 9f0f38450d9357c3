//! Plain-text rendering of results and grids.

use crate::estimator::Impacts;
use crate::model::Population;
use std::fmt::Write;

/// Placeholder shown for results that cannot be computed.
pub const UNDEFINED: &str = "N/A";

/// Format an impact with a fixed number of decimals, or [`UNDEFINED`].
pub fn format_impact(value: Option<f64>, decimal_places: usize) -> String {
    match value {
        Some(val) => format!("{val:.decimal_places$}"),
        None => UNDEFINED.to_string(),
    }
}

pub fn render_impacts(impacts: &Impacts, decimal_places: usize) -> String {
    let rows = [
        ("survey impact", impacts.survey),
        ("true impact", impacts.truth),
        ("theoretical impact", impacts.theoretical),
        ("discrepancy", impacts.discrepancy),
    ];
    let mut out = String::new();
    for (label, value) in rows {
        let _ = writeln!(out, "{label:<20}{}", format_impact(value, decimal_places));
    }
    out
}

/// Draw the grid, one row per line.
///
/// Each cell shows `#` for no-take or `.` for fished, one digit per habitat
/// present (or `-`), and `*` when selected.
pub fn render_grid(pop: &Population) -> String {
    let size = pop.grid_size();
    let mut out = String::new();
    for row in pop.sites().chunks(size) {
        let cells: Vec<String> = row
            .iter()
            .map(|site| {
                let mut cell = String::new();
                cell.push(if site.is_no_take() { '#' } else { '.' });
                for (i_hab, &present) in site.habitats().iter().enumerate() {
                    cell.push(if present {
                        char::from_digit((i_hab + 1) as u32, 10).unwrap_or('+')
                    } else {
                        '-'
                    });
                }
                cell.push(if site.is_selected() { '*' } else { ' ' });
                cell
            })
            .collect();
        let _ = writeln!(out, "{}", cells.join(" ").trim_end());
    }
    out
}
