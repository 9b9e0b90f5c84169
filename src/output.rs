use crate::countries::CountryLookup;
use crate::error::Result;
use crate::table::WideTable;
use crate::types::{HasMeta, IndicatorRecord, Project, ReportData};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde::Serialize;
use std::path::Path;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

pub fn write_table_csv(path: &Path, table: &WideTable) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    let mut header = vec![table.key_name().to_string()];
    header.extend(table.columns().iter().cloned());
    wtr.write_record(&header)?;
    for (key, cells) in table.rows() {
        let mut record = vec![key.to_string()];
        record.extend(
            cells
                .iter()
                .map(|c| c.as_ref().map(ToString::to_string).unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/* ---------------- Raw dump ---------------- */

fn write_header(sheet: &mut Worksheet, headers: &[&str], bold: &Format) -> Result<()> {
    for (col, h) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *h, bold)?;
    }
    Ok(())
}

/// Writes the shared leading columns and returns the next free column.
fn write_meta<T: HasMeta>(sheet: &mut Worksheet, row: u32, rec: &T) -> Result<u16> {
    let m = rec.meta();
    sheet.write_string(row, 0, &m.project)?;
    sheet.write_string(row, 1, &m.title)?;
    sheet.write_string(row, 2, m.reporting_date.format("%Y-%m-%d").to_string())?;
    sheet.write_string(row, 3, m.data_type.to_string())?;
    Ok(4)
}

const META_HEADERS: [&str; 4] = ["Project", "Title", "Reporting Date", "Data Type"];

fn indicator_sheet(wb: &mut Workbook, name: &str, rows: &[IndicatorRecord], bold: &Format) -> Result<()> {
    let sheet = wb.add_worksheet();
    sheet.set_name(name)?;
    let mut headers = META_HEADERS.to_vec();
    headers.extend(["Sub-Indicator", "Value"]);
    write_header(sheet, &headers, bold)?;
    for (i, r) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        let col = write_meta(sheet, row, r)?;
        sheet.write_string(row, col, &r.sub_indicator)?;
        sheet.write_number(row, col + 1, r.value)?;
    }
    Ok(())
}

/// Spreadsheet with the resolved project list and every cleaned input
/// table, one sheet each.
pub fn write_raw_workbook(
    path: &Path,
    projects: &[Project],
    lookup: &CountryLookup,
    data: &ReportData,
) -> Result<()> {
    let mut wb = Workbook::new();
    let bold = Format::new().set_bold();

    {
        let sheet = wb.add_worksheet();
        sheet.set_name("Projects")?;
        write_header(
            sheet,
            &["Name", "Provider Country", "Country", "Tags", "Notes"],
            &bold,
        )?;
        let in_scope = projects.iter().filter(|p| lookup.get(&p.name).is_some());
        for (i, p) in in_scope.enumerate() {
            let row = i as u32 + 1;
            sheet.write_string(row, 0, &p.name)?;
            sheet.write_string(row, 1, &p.country)?;
            sheet.write_string(row, 2, lookup.country_of(&p.name))?;
            sheet.write_string(row, 3, p.tags.join("; "))?;
            sheet.write_string(row, 4, &p.notes)?;
        }
    }

    indicator_sheet(&mut wb, "F1", &data.f1, &bold)?;
    indicator_sheet(&mut wb, "F2", &data.f2, &bold)?;
    indicator_sheet(&mut wb, "F6", &data.f6, &bold)?;
    indicator_sheet(&mut wb, "F7", &data.f7, &bold)?;

    {
        let sheet = wb.add_worksheet();
        sheet.set_name("BusinessesFinanceSolutions")?;
        let mut headers = META_HEADERS.to_vec();
        headers.extend(["Sector", "Solution"]);
        write_header(sheet, &headers, &bold)?;
        for (i, r) in data.businesses.iter().enumerate() {
            let row = i as u32 + 1;
            let col = write_meta(sheet, row, r)?;
            sheet.write_string(row, col, &r.sector)?;
            sheet.write_string(row, col + 1, &r.solution)?;
        }
    }
    {
        let sheet = wb.add_worksheet();
        sheet.set_name("Investments")?;
        let mut headers = META_HEADERS.to_vec();
        headers.extend(["Sector", "Investment Source", "Investment Type", "Gender-Smart", "Amount"]);
        write_header(sheet, &headers, &bold)?;
        for (i, r) in data.investments.iter().enumerate() {
            let row = i as u32 + 1;
            let col = write_meta(sheet, row, r)?;
            sheet.write_string(row, col, &r.sector)?;
            sheet.write_string(row, col + 1, &r.source)?;
            sheet.write_string(row, col + 2, &r.investment_type)?;
            sheet.write_boolean(row, col + 3, r.gender_smart)?;
            sheet.write_number(row, col + 4, r.amount)?;
        }
    }
    {
        let sheet = wb.add_worksheet();
        sheet.set_name("Revenues")?;
        let mut headers = META_HEADERS.to_vec();
        headers.extend(["Sector", "Revenue Type", "Amount"]);
        write_header(sheet, &headers, &bold)?;
        for (i, r) in data.revenues.iter().enumerate() {
            let row = i as u32 + 1;
            let col = write_meta(sheet, row, r)?;
            sheet.write_string(row, col, &r.sector)?;
            sheet.write_string(row, col + 1, &r.revenue_type)?;
            sheet.write_number(row, col + 2, r.amount)?;
        }
    }

    wb.save(path)?;
    Ok(())
}

/* ---------------- Console preview ---------------- */

pub fn preview_table(title: &str, table: &WideTable, max_rows: usize) {
    println!("\n{}", title);
    if table.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let mut builder = Builder::default();
    let mut header = vec![table.key_name().to_string()];
    header.extend(table.columns().iter().cloned());
    builder.push_record(header);
    for (key, cells) in table.rows().take(max_rows) {
        let mut record = vec![key.to_string()];
        record.extend(cells.iter().map(|c| match c {
            Some(crate::table::Cell::Number(n)) => crate::util::format_number(*n, 2),
            Some(other) => other.to_string(),
            None => String::new(),
        }));
        builder.push_record(record);
    }
    let table_str = builder.build().with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_has_key_column_and_all_rows() {
        let mut t = WideTable::new("Country");
        t.set("Fiji", "F1 Secured (ha)", 300.0);
        t.set("Fiji", "F1 Secured Titles", "2023 Annual, Mid 2023".to_string());
        t.set("Global", "F1 Secured (ha)", 300.0);
        let t = t.fill_zero();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_table_csv(&path, &t).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Country,F1 Secured (ha),F1 Secured Titles");
        assert_eq!(lines[1], "Fiji,300,\"2023 Annual, Mid 2023\"");
        assert_eq!(lines[2], "Global,300,0");
    }

    #[test]
    fn workbook_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.xlsx");
        let lookup: CountryLookup = vec![("Alpha".to_string(), "Fiji".to_string())]
            .into_iter()
            .collect();
        let projects = vec![Project {
            name: "Alpha".into(),
            country: "Fiji".into(),
            tags: vec!["Coral Reef Rescue".into()],
            notes: String::new(),
        }];
        write_raw_workbook(&path, &projects, &lookup, &ReportData::default()).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
