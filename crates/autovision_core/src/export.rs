use crate::report::Report;
use anyhow::Result;
use std::path::Path;

/// Export the specification table of a report to CSV with headers:
/// field,value,unit,source,confidence
pub fn export_csv(report: &Report, path: impl AsRef<Path>) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["field", "value", "unit", "source", "confidence"])?;

    for card in &report.cards {
        let unit = card.descriptor.unit;
        let value = if unit.is_empty() {
            card.display_value.as_str()
        } else {
            card.display_value
                .strip_suffix(unit)
                .map(str::trim_end)
                .unwrap_or(card.display_value.as_str())
        };
        let confidence = card.confidence.percent.to_string();

        wtr.write_record([
            &*card.descriptor.label,
            value,
            unit,
            card.source.as_str(),
            confidence.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
