// Input side of the pipeline.
//
// `ReportSource` is the seam to the remote reporting provider. The
// bundled implementation reads the provider's CSV exports from a
// directory; rows that fail to parse are skipped and counted, while a
// missing or unreadable file aborts the run.
use crate::error::{Error, Result};
use crate::types::{
    BusinessRecord, DataType, HasMeta, IndicatorRecord, InvestmentRecord, Project, RawBusinessRow,
    RawIndicatorRow, RawInvestmentRow, RawProjectRow, RawRevenueRow, RecordMeta, ReportData,
    RevenueRecord,
};
use crate::util::{format_int, parse_date_safe, parse_f64_safe, parse_flag, text_or};
use csv::ReaderBuilder;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const PROJECTS_FILE: &str = "projects.csv";
pub const F1_FILE: &str = "F1.csv";
pub const F2_FILE: &str = "F2.csv";
pub const F6_FILE: &str = "F6.csv";
pub const F7_FILE: &str = "F7.csv";
pub const BUSINESSES_FILE: &str = "BusinessesFinanceSolutions.csv";
pub const INVESTMENTS_FILE: &str = "Investments.csv";
pub const REVENUES_FILE: &str = "Revenues.csv";

pub const UNSPECIFIED_SECTOR: &str = "Unspecified";

/// The two operations the pipeline needs from the reporting provider.
pub trait ReportSource {
    /// Projects carrying `tag`, with test and placeholder projects removed.
    fn list_projects(&self, tag: &str) -> Result<Vec<Project>>;

    /// Indicator tables restricted to `projects`.
    fn report_data(&self, projects: &[String]) -> Result<ReportData>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub parse_errors: usize,
}

impl LoadReport {
    fn log(&self, table: &str) {
        debug!(
            table,
            "{} rows read, {} kept",
            format_int(self.total_rows),
            format_int(self.kept_rows)
        );
        if self.parse_errors > 0 {
            warn!(
                table,
                "{} rows skipped due to parse/validation errors",
                format_int(self.parse_errors)
            );
        }
    }
}

/// Test and placeholder projects never make it into a report.
pub fn is_placeholder_project(name: &str, tags: &[String]) -> bool {
    if tags.iter().any(|t| t.eq_ignore_ascii_case("test")) {
        return true;
    }
    name.split(|c: char| !c.is_alphanumeric())
        .any(|w| w.eq_ignore_ascii_case("test") || w.eq_ignore_ascii_case("placeholder"))
}

/// Reads the provider's CSV exports from one directory.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    dir: PathBuf,
}

impl CsvDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read_rows<T: DeserializeOwned>(&self, file: &str) -> Result<(Vec<T>, usize, usize)> {
        let path = self.dir.join(file);
        let mut rdr = ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_path(&path)
            .map_err(|e| Error::data_source(&path, e.to_string()))?;
        let mut rows = Vec::new();
        let mut total = 0usize;
        let mut errors = 0usize;
        for result in rdr.deserialize::<T>() {
            total += 1;
            match result {
                Ok(r) => rows.push(r),
                Err(e) if e.is_io_error() => return Err(Error::data_source(&path, e.to_string())),
                Err(_) => errors += 1,
            }
        }
        Ok((rows, total, errors))
    }

    fn load<R, T, F>(&self, file: &str, keep: &HashSet<&str>, clean: F) -> Result<Vec<T>>
    where
        R: DeserializeOwned,
        F: Fn(R) -> Option<T>,
        T: HasMeta,
    {
        let (raw, total_rows, mut parse_errors) = self.read_rows::<R>(file)?;
        let mut out = Vec::new();
        for r in raw {
            match clean(r) {
                Some(rec) if keep.contains(rec.meta().project.as_str()) => out.push(rec),
                Some(_) => {}
                None => parse_errors += 1,
            }
        }
        LoadReport {
            total_rows,
            kept_rows: out.len(),
            parse_errors,
        }
        .log(file);
        Ok(out)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ReportSource for CsvDirectorySource {
    fn list_projects(&self, tag: &str) -> Result<Vec<Project>> {
        let (raw, total, mut errors) = self.read_rows::<RawProjectRow>(PROJECTS_FILE)?;
        let mut projects = Vec::new();
        for row in raw {
            let Some(project) = clean_project(row) else {
                errors += 1;
                continue;
            };
            if !project.tags.iter().any(|t| t == tag) {
                continue;
            }
            if is_placeholder_project(&project.name, &project.tags) {
                debug!(project = %project.name, "skipping test/placeholder project");
                continue;
            }
            projects.push(project);
        }
        LoadReport {
            total_rows: total,
            kept_rows: projects.len(),
            parse_errors: errors,
        }
        .log(PROJECTS_FILE);
        info!("{} projects tagged {:?}", format_int(projects.len()), tag);
        Ok(projects)
    }

    fn report_data(&self, projects: &[String]) -> Result<ReportData> {
        let keep: HashSet<&str> = projects.iter().map(String::as_str).collect();
        let data = ReportData {
            f1: self.load(F1_FILE, &keep, clean_indicator)?,
            f2: self.load(F2_FILE, &keep, clean_indicator)?,
            f6: self.load(F6_FILE, &keep, clean_indicator)?,
            f7: self.load(F7_FILE, &keep, clean_indicator)?,
            businesses: self.load(BUSINESSES_FILE, &keep, clean_business)?,
            investments: self.load(INVESTMENTS_FILE, &keep, clean_investment)?,
            revenues: self.load(REVENUES_FILE, &keep, clean_revenue)?,
        };
        info!(
            "report data pulled for {} projects",
            format_int(projects.len())
        );
        Ok(data)
    }
}

/* ---------------- Cleaning ---------------- */

pub fn clean_project(row: RawProjectRow) -> Option<Project> {
    let name = row.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())?;
    let tags = row
        .tags
        .unwrap_or_default()
        .split(';')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    Some(Project {
        name,
        country: row.country.unwrap_or_default().trim().to_string(),
        tags,
        notes: row.notes.unwrap_or_default().trim().to_string(),
    })
}

fn clean_meta(
    project: Option<String>,
    title: Option<String>,
    reporting_date: Option<String>,
    data_type: Option<String>,
) -> Option<RecordMeta> {
    let project = project.map(|p| p.trim().to_string()).filter(|p| !p.is_empty())?;
    Some(RecordMeta {
        project,
        title: title.unwrap_or_default().trim().to_string(),
        reporting_date: parse_date_safe(reporting_date.as_deref())?,
        data_type: DataType::parse(data_type.as_deref()?)?,
    })
}

pub fn clean_indicator(row: RawIndicatorRow) -> Option<IndicatorRecord> {
    let value = parse_f64_safe(row.value.as_deref())?;
    Some(IndicatorRecord {
        meta: clean_meta(row.project, row.title, row.reporting_date, row.data_type)?,
        sub_indicator: row.sub_indicator.unwrap_or_default().trim().to_string(),
        value,
    })
}

pub fn clean_business(row: RawBusinessRow) -> Option<BusinessRecord> {
    let solution = row.solution.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())?;
    Some(BusinessRecord {
        meta: clean_meta(row.project, row.title, row.reporting_date, row.data_type)?,
        sector: text_or(row.sector, UNSPECIFIED_SECTOR),
        solution,
    })
}

pub fn clean_investment(row: RawInvestmentRow) -> Option<InvestmentRecord> {
    let amount = parse_f64_safe(row.amount.as_deref())?;
    Some(InvestmentRecord {
        meta: clean_meta(row.project, row.title, row.reporting_date, row.data_type)?,
        sector: text_or(row.sector, UNSPECIFIED_SECTOR),
        source: text_or(row.investment_source, "Unspecified"),
        investment_type: text_or(row.investment_type, "Unspecified"),
        gender_smart: parse_flag(row.gender_smart.as_deref()),
        amount,
    })
}

pub fn clean_revenue(row: RawRevenueRow) -> Option<RevenueRecord> {
    let amount = parse_f64_safe(row.amount.as_deref())?;
    Some(RevenueRecord {
        meta: clean_meta(row.project, row.title, row.reporting_date, row.data_type)?,
        sector: text_or(row.sector, UNSPECIFIED_SECTOR),
        revenue_type: text_or(row.revenue_type, "Unspecified"),
        amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, file: &str, body: &str) {
        fs::write(dir.join(file), body).unwrap();
    }

    fn seed(dir: &Path) {
        write(
            dir,
            PROJECTS_FILE,
            "Name,Country,Tags,Notes\n\
             Alpha,Fiji,Coral Reef Rescue,\n\
             Beta,Tanzania,Coral Reef Rescue;Finance,co-financed\n\
             Test Project,Fiji,Coral Reef Rescue,\n\
             Gamma,Egypt,Other Programme,\n\
             Delta,Jordan,Coral Reef Rescue;test,\n",
        );
        write(
            dir,
            F1_FILE,
            "Project,Title,Reporting Date,Data Type,Value\n\
             Alpha,2023 Annual,2023-12-31,Report,\"1,000.5\"\n\
             Beta,2023 Annual,2023-12-31,target,4\n\
             Beta,2023 Annual,not a date,Report,4\n\
             Gamma,2023 Annual,2023-12-31,Report,9\n",
        );
        for f in [F2_FILE, F6_FILE, F7_FILE] {
            write(dir, f, "Project,Title,Reporting Date,Data Type,Sub-Indicator,Value\n");
        }
        write(
            dir,
            BUSINESSES_FILE,
            "Project,Title,Reporting Date,Data Type,Sector,Solution\n\
             Alpha,2023 Annual,2023-12-31,Report,,Reef Tours Ltd\n",
        );
        write(
            dir,
            INVESTMENTS_FILE,
            "Project,Title,Reporting Date,Data Type,Sector,Investment Source,Investment Type,Gender-Smart,Amount\n\
             Beta,2023 Annual,2023-12-31,Report,Tourism,Private,Equity,Yes,2500\n",
        );
        write(
            dir,
            REVENUES_FILE,
            "Project,Title,Reporting Date,Data Type,Sector,Revenue Type,Amount\n",
        );
    }

    #[test]
    fn lists_tagged_projects_without_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let source = CsvDirectorySource::new(dir.path());
        let names: Vec<String> = source
            .list_projects("Coral Reef Rescue")
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Alpha".to_string(), "Beta".to_string()]);
    }

    #[test]
    fn report_data_is_cleaned_and_restricted() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let source = CsvDirectorySource::new(dir.path());
        let data = source
            .report_data(&["Alpha".to_string(), "Beta".to_string()])
            .unwrap();

        assert_eq!(data.f1.len(), 2);
        assert_eq!(data.f1[0].value, 1000.5);
        assert_eq!(data.f1[1].meta.data_type, DataType::Target);
        assert_eq!(data.businesses[0].sector, UNSPECIFIED_SECTOR);
        assert!(data.investments[0].gender_smart);
        assert!(data.revenues.is_empty());
    }

    #[test]
    fn missing_table_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        fs::remove_file(dir.path().join(REVENUES_FILE)).unwrap();
        let source = CsvDirectorySource::new(dir.path());
        let err = source.report_data(&["Alpha".to_string()]).unwrap_err();
        assert!(matches!(err, Error::Source { .. }));
    }

    #[test]
    fn placeholder_detection() {
        assert!(is_placeholder_project("Test Project", &[]));
        assert!(is_placeholder_project("Placeholder - do not use", &[]));
        assert!(is_placeholder_project("Alpha", &["TEST".to_string()]));
        assert!(!is_placeholder_project("Contest Reef", &[]));
    }
}
