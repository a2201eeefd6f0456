// src/report.rs
//! Terminal rendering of a [`DashboardView`].

use prettytable::{format, Cell, Row, Table};
use std::io::{self, Write};

use crate::session::DashboardView;

const NO_DATA: &str = "no data";

fn fmt_opt(v: Option<f64>) -> String {
    v.map_or_else(|| NO_DATA.to_string(), |v| format!("{:.2}", v))
}

/// Thousands separators for the enrolment total.
fn group_digits(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0 {
        out.insert(0, '-');
    }
    out
}

fn header(cells: &[&str]) -> Row {
    Row::new(cells.iter().map(|c| Cell::new(c).style_spec("bFg")).collect())
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table
}

pub fn render_dashboard<W: Write>(view: &DashboardView, out: &mut W) -> io::Result<()> {
    writeln!(out, "\n=== Identity Stress Monitoring ({}) ===", view.title)?;
    if let Some(dates) = view.dates {
        writeln!(out, "period: {} .. {}", dates.start, dates.end)?;
    }
    if let Some(count) = view.alert {
        writeln!(
            out,
            "ALERT: {} districts identified as high risk in current view",
            count
        )?;
    }

    // headline metrics
    let mut metrics = new_table();
    metrics.add_row(header(&[
        "Avg Demographic Stress",
        "Avg Biometric Stress",
        "High Risk Districts",
        "Total Enrolments",
    ]));
    metrics.add_row(Row::new(vec![
        Cell::new(&fmt_opt(view.metrics.avg_demo_ratio)).style_spec("r"),
        Cell::new(&fmt_opt(view.metrics.avg_bio_ratio)).style_spec("r"),
        Cell::new(&view.metrics.high_risk_count.to_string()).style_spec("r"),
        Cell::new(&group_digits(view.metrics.total_enrolments)).style_spec("r"),
    ]));
    metrics.print(out)?;

    writeln!(out, "\n--- State Stress Map ({:?}) ---", view.map_scope)?;
    if view.map.is_empty() {
        writeln!(out, "No geospatial data available.")?;
    } else {
        let mut map = new_table();
        map.add_row(header(&["State", "Lat", "Lon", "Average Stress"]));
        for p in &view.map {
            map.add_row(Row::new(vec![
                Cell::new(&p.state),
                Cell::new(&format!("{:.4}", p.lat)).style_spec("r"),
                Cell::new(&format!("{:.4}", p.lon)).style_spec("r"),
                Cell::new(&format!("{:.2}", p.value)).style_spec("r"),
            ]));
        }
        map.print(out)?;
        writeln!(
            out,
            "view: lat {:?} lon {:?}",
            view.bounds.lat_range, view.bounds.lon_range
        )?;
    }

    writeln!(out, "\n--- Stress Trend ---")?;
    if view.trend.is_empty() {
        writeln!(out, "No trend data available for current selection.")?;
    } else {
        let mut trend = new_table();
        trend.add_row(header(&["Month", "Stress Index"]));
        for m in &view.trend {
            trend.add_row(Row::new(vec![
                Cell::new(&m.month.to_string()),
                Cell::new(&format!("{:.2}", m.mean_stress_index)).style_spec("r"),
            ]));
        }
        trend.print(out)?;
    }

    writeln!(out, "\n--- Top High-Stress Districts ({}) ---", view.region)?;
    if view.ranking.is_empty() {
        writeln!(out, "No data available.")?;
    } else {
        let mut ranking = new_table();
        ranking.add_row(header(&["#", "District", "State", "Stress Score"]));
        for (i, r) in view.ranking.iter().enumerate() {
            ranking.add_row(Row::new(vec![
                Cell::new(&(i + 1).to_string()).style_spec("r"),
                Cell::new(&r.district),
                Cell::new(&r.state),
                Cell::new(&fmt_opt(r.total_stress_index)).style_spec("r"),
            ]));
        }
        ranking.print(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapScope;
    use crate::filter::{Region, Selection};
    use crate::index::IndexCache;
    use crate::session::Session;
    use crate::store::Dataset;
    use anyhow::Result;

    fn render(region: &str) -> Result<String> {
        let raw = Dataset::from_csv_str(
            "state,district,month,demo_update_ratio,bio_update_ratio,total_enrolments\n\
Bihar,Patna,2024-01-01,0.3,0.4,1234567\n\
Bihar,Gaya,2024-01-01,0.1,0.1,3\n",
        )?;
        let session = Session::from_dataset(&raw, &mut IndexCache::default(), MapScope::National, 10)?;
        let view = session.render(&Selection::new(Region::parse(Some(region)), None));
        let mut buf = Vec::new();
        render_dashboard(&view, &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }

    #[test]
    fn digits_are_grouped() {
        assert_eq!(group_digits(0), "0");
        assert_eq!(group_digits(999), "999");
        assert_eq!(group_digits(1000), "1,000");
        assert_eq!(group_digits(1234570), "1,234,570");
        assert_eq!(group_digits(-12345), "-12,345");
    }

    #[test]
    fn renders_sections() -> Result<()> {
        let text = render("Bihar")?;
        assert!(text.contains("(Bihar)"));
        assert!(text.contains("Patna"));
        assert!(text.contains("1,234,570"));
        assert!(text.contains("0.45"));
        Ok(())
    }

    #[test]
    fn empty_selection_says_no_data() -> Result<()> {
        let text = render("Kerala")?;
        assert!(text.contains("No trend data available"));
        assert!(text.contains("No data available."));
        assert!(text.contains(NO_DATA));
        assert!(!text.contains("ALERT"));
        Ok(())
    }
}
