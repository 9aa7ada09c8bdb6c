use crate::models::{Cell, ResultSet, Table};
use crate::error::Result;
use csv::WriterBuilder;
use serde::Serialize;
use std::borrow::Cow;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Prefix text that a spreadsheet would evaluate as a formula with `'`.
fn sanitize(s: &str) -> Cow<'_, str> {
    if s.starts_with(['=', '+', '-', '@']) {
        Cow::Owned(format!("'{s}"))
    } else {
        Cow::Borrowed(s)
    }
}

/// Write a result set as tidy CSV: `place,period,value`.
pub fn write_csv<V, W>(data: &ResultSet<V>, out: W) -> Result<()>
where
    V: Serialize,
    W: Write,
{
    let mut wtr = WriterBuilder::new().from_writer(out);
    wtr.serialize(("place", "period", "value"))?;
    for (place, series) in data {
        for (period, value) in series {
            wtr.serialize((sanitize(place), period.to_string(), value))?;
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_csv<V, P>(data: &ResultSet<V>, path: P) -> Result<()>
where
    V: Serialize,
    P: AsRef<Path>,
{
    write_csv(data, File::create(path)?)
}

/// Save a result set as a pretty JSON object.
pub fn save_json<V, P>(data: &ResultSet<V>, path: P) -> Result<()>
where
    V: Serialize,
    P: AsRef<Path>,
{
    let mut f = File::create(path)?;
    let s = serde_json::to_string_pretty(data)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}

/// Write a table as CSV, one table row per record.
pub fn write_table_csv<W: Write>(table: &Table, out: W) -> Result<()> {
    let mut wtr = WriterBuilder::new().flexible(true).from_writer(out);
    for row in table {
        wtr.write_record(row.iter().map(|cell| match cell {
            Cell::Text(s) => sanitize(s).into_owned(),
            other => other.to_string(),
        }))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_table_csv<P: AsRef<Path>>(table: &Table, path: P) -> Result<()> {
    write_table_csv(table, File::create(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Period;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[test]
    fn write_csv_and_json() {
        let dir = tempdir().unwrap();
        let csvp = dir.path().join("x.csv");
        let jsonp = dir.path().join("x.json");
        let mut data: ResultSet<f64> = BTreeMap::new();
        data.entry("Italy".into())
            .or_default()
            .insert(Period::Year(2000), 1.23);
        save_csv(&data, &csvp).unwrap();
        save_json(&data, &jsonp).unwrap();
        assert_eq!(
            std::fs::read_to_string(&csvp).unwrap(),
            "place,period,value\nItaly,2000,1.23\n"
        );
        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&jsonp).unwrap()).unwrap();
        assert_eq!(v["Italy"]["2000"], 1.23);
    }

    #[test]
    fn tidy_csv_cells_are_sanitized() {
        let mut data: ResultSet<Option<f64>> = BTreeMap::new();
        let series = data.entry("=SUM(A1)".into()).or_default();
        series.insert(Period::Year(2000), Some(99.0));
        series.insert(Period::Year(2001), None);
        let mut out = Vec::new();
        write_csv(&data, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "place,period,value\n'=SUM(A1),2000,99.0\n'=SUM(A1),2001,\n"
        );
    }

    #[test]
    fn sanitize_only_touches_formula_starters() {
        assert_eq!(sanitize("=1+1"), "'=1+1");
        assert_eq!(sanitize("Italy"), "Italy");
    }
}
