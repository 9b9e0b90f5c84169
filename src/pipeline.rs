// The batch run: pull, check, re-pull, resolve, summarize, write.
//
// `summarize` is free of I/O apart from the data source so tests can drive
// it with an in-memory source; `run` adds the output files and console
// preview.
use crate::config::Config;
use crate::countries::{override_rules, resolve_countries, CountryLookup};
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::loader::{CsvDirectorySource, ReportSource};
use crate::output;
use crate::reports::{build_summaries, projects_without_reports, CombinedSummary};
use crate::types::{Project, ReportData};
use crate::util::format_int;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{info, info_span};

pub const RAW_DUMP_FILE: &str = "raw_report_data.xlsx";
pub const IMPACT_BY_COUNTRY_FILE: &str = "country_impact_summary.csv";
pub const FINANCE_BY_COUNTRY_FILE: &str = "country_finance_summary.csv";
pub const FINANCE_BY_SECTOR_FILE: &str = "sector_finance_summary.csv";
pub const BY_COUNTRY_FILE: &str = "country_summary.csv";
pub const DIAGNOSTICS_FILE: &str = "diagnostics.json";

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Projects listed by the source, before the missing-report exclusion.
    pub projects: Vec<Project>,
    pub lookup: CountryLookup,
    /// Report data from the final pull.
    pub data: ReportData,
    pub summary: CombinedSummary,
    /// Every diagnostic of the run, summary diagnostics included.
    pub diagnostics: Diagnostics,
}

pub fn summarize<S: ReportSource + ?Sized>(source: &S, cfg: &Config) -> Result<PipelineOutput> {
    let projects = source.list_projects(&cfg.project_tag)?;
    let mut names: Vec<String> = projects.iter().map(|p| p.name.clone()).collect();
    let mut diagnostics = Diagnostics::new();

    let mut data = {
        let _span = info_span!("pull", round = 1).entered();
        source.report_data(&names)?
    };

    let missing = projects_without_reports(&data.f1, &names);
    if !missing.is_empty() {
        let excluded: BTreeSet<&str> = missing.iter().map(|d| d.project()).collect();
        names.retain(|n| !excluded.contains(n.as_str()));
        info!(
            "excluding {} projects without reports, pulling again",
            format_int(excluded.len())
        );
        let _span = info_span!("pull", round = 2).entered();
        data = source.report_data(&names)?;
    }
    diagnostics.extend(missing);

    let rules = override_rules(&cfg.project_overrides);
    let (lookup, country_diags) = resolve_countries(&projects, &data.project_names(), &rules);
    diagnostics.extend(country_diags);

    let summary = build_summaries(&data, &lookup);
    diagnostics.extend(summary.diagnostics.clone());
    info!(
        "summaries built: {} countries, {} sectors",
        format_int(summary.by_country.len()),
        format_int(summary.by_sector.len())
    );

    Ok(PipelineOutput {
        projects,
        lookup,
        data,
        summary,
        diagnostics,
    })
}

/// Write every artifact into `cfg.output_dir`; returns the written paths.
pub fn write_outputs(out: &PipelineOutput, cfg: &Config) -> Result<Vec<PathBuf>> {
    let dir = &cfg.output_dir;
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let raw = dir.join(RAW_DUMP_FILE);
    output::write_raw_workbook(&raw, &out.projects, &out.lookup, &out.data)?;
    written.push(raw);

    for (file, table) in [
        (IMPACT_BY_COUNTRY_FILE, &out.summary.impact_by_country),
        (FINANCE_BY_COUNTRY_FILE, &out.summary.finance_by_country),
        (FINANCE_BY_SECTOR_FILE, &out.summary.by_sector),
        (BY_COUNTRY_FILE, &out.summary.by_country),
    ] {
        let path = dir.join(file);
        output::write_table_csv(&path, table)?;
        written.push(path);
    }

    let diag = dir.join(DIAGNOSTICS_FILE);
    output::write_json(&diag, &out.diagnostics)?;
    written.push(diag);

    for p in &written {
        info!("wrote {}", p.display());
    }
    Ok(written)
}

/// The full batch run against the CSV exports named in `cfg`.
pub fn run(cfg: &Config) -> Result<PipelineOutput> {
    let source = CsvDirectorySource::new(&cfg.input_dir);
    info!("reading provider exports from {}", source.dir().display());

    let out = summarize(&source, cfg)?;
    out.diagnostics.log();
    write_outputs(&out, cfg)?;

    if cfg.preview_rows > 0 {
        output::preview_table("Area and people by country", &out.summary.impact_by_country, cfg.preview_rows);
        output::preview_table("Finance by country", &out.summary.finance_by_country, cfg.preview_rows);
        output::preview_table("Finance by sector", &out.summary.by_sector, cfg.preview_rows);
        if !out.diagnostics.is_empty() {
            println!("Diagnostics");
            output::preview_table_rows(&out.diagnostics.rows(), out.diagnostics.len());
        }
    }
    Ok(out)
}
