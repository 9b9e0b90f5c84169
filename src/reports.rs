// Per-indicator summaries and the combined country/sector tables.
//
// Each indicator family runs the same steps with small variations: drop
// the malformed baseline rows, keep the family's sub-indicator codes,
// convert units, pick latest values, reconcile targets, attach the
// country, then reduce per country (or sector) plus a `Global` row.

use crate::countries::CountryLookup;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::reconcile::{latest_reports, reconcile_latest};
use crate::table::{join_all, pivot, share_pivot, CountedItem, LongRow, WideTable, GLOBAL};
use crate::types::{
    BusinessRecord, DataType, HasMeta, IndicatorRecord, InvestmentRecord, Observation, RecordMeta,
    ReportData, RevenueRecord,
};
use crate::util::{join_distinct, matches_code};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Title of a malformed baseline submission; its rows are never used.
pub const BAD_BASELINE_TITLE: &str = "Baseline (superseded)";

/// Areas are reported in km² and summarized in hectares.
pub const HECTARES_PER_SQ_KM: f64 = 100.0;

pub const COUNTRY: &str = "Country";
pub const SECTOR: &str = "Sector";

pub const F1_CODE: &str = "F1";
pub const F2_CODES: [&str; 2] = ["F2.1b", "F2.2b"];
pub const F6_CODES: [&str; 2] = ["F6.1", "F6.2"];
pub const F7_CODES: [&str; 2] = ["F7.1", "F7.2"];

pub const INVESTMENTS: &str = "Investments";
pub const GENDER_SMART_INVESTMENTS: &str = "Gender-Smart Investments";
pub const REVENUES: &str = "Revenues";
pub const BUSINESSES: &str = "Businesses";

fn keep_row(meta: &RecordMeta) -> bool {
    meta.title != BAD_BASELINE_TITLE
}

/// Which rows of an indicator table belong to a family.
#[derive(Debug, Clone, Copy)]
pub enum Codes<'a> {
    /// Every row, reported under this code.
    Whole(&'a str),
    /// Rows whose sub-indicator carries one of these codes.
    Matching(&'a [&'a str]),
}

impl Codes<'_> {
    fn code_for(&self, sub_indicator: &str) -> Option<String> {
        match self {
            Codes::Whole(code) => Some(code.to_string()),
            Codes::Matching(codes) => codes
                .iter()
                .find(|c| matches_code(sub_indicator, c))
                .map(|c| c.to_string()),
        }
    }

    fn all(&self) -> Vec<&str> {
        match self {
            Codes::Whole(code) => vec![*code],
            Codes::Matching(codes) => codes.to_vec(),
        }
    }
}

/// Row selection, code filtering and unit conversion for one table.
pub fn observations(rows: &[IndicatorRecord], codes: Codes<'_>, factor: f64) -> Vec<Observation> {
    rows.iter()
        .filter(|r| keep_row(&r.meta))
        .filter_map(|r| {
            let code = codes.code_for(&r.sub_indicator)?;
            Some(Observation {
                project: r.meta.project.clone(),
                title: r.meta.title.clone(),
                reporting_date: r.meta.reporting_date,
                data_type: r.meta.data_type,
                code,
                value: r.value * factor,
            })
        })
        .collect()
}

/* ---------------- Reduction ---------------- */

/// One value attributed to a grouping key (a country or a sector).
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub key: String,
    pub code: String,
    pub data_type: DataType,
    pub value: f64,
    pub reporting_date: NaiveDate,
    pub title: String,
}

impl Contribution {
    fn from_observation(o: &Observation, key: &str) -> Self {
        Self {
            key: key.to_string(),
            code: o.code.clone(),
            data_type: o.data_type,
            value: o.value,
            reporting_date: o.reporting_date,
            title: o.title.clone(),
        }
    }

    fn from_meta(meta: &RecordMeta, key: &str, code: &str, value: f64) -> Self {
        Self {
            key: key.to_string(),
            code: code.to_string(),
            data_type: meta.data_type,
            value,
            reporting_date: meta.reporting_date,
            title: meta.title.clone(),
        }
    }
}

/// Reduced value for one (key, code, data type).
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub key: String,
    pub code: String,
    pub data_type: DataType,
    pub total: f64,
    pub reporting_dates: String,
    pub titles: String,
}

/// Sum per (key, code, data type), collecting the distinct dates and
/// titles behind each total, plus the same reduction under [`GLOBAL`].
pub fn aggregate(contributions: &[Contribution]) -> Vec<AggregateRow> {
    #[derive(Default)]
    struct Acc {
        total: f64,
        dates: BTreeSet<NaiveDate>,
        titles: BTreeSet<String>,
    }

    let mut map: BTreeMap<(String, String, DataType), Acc> = BTreeMap::new();
    for c in contributions {
        for key in [c.key.as_str(), GLOBAL] {
            let e = map
                .entry((key.to_string(), c.code.clone(), c.data_type))
                .or_default();
            e.total += c.value;
            e.dates.insert(c.reporting_date);
            e.titles.insert(c.title.clone());
        }
    }
    map.into_iter()
        .map(|((key, code, data_type), acc)| AggregateRow {
            key,
            code,
            data_type,
            total: acc.total,
            reporting_dates: join_distinct(acc.dates.iter().map(|d| d.format("%Y-%m-%d").to_string())),
            titles: join_distinct(&acc.titles),
        })
        .collect()
}

/// Header triple for one reduced metric.
struct Columns {
    value: String,
    dates: String,
    titles: String,
}

fn columns(base: &str, value_suffix: &str) -> Columns {
    Columns {
        value: format!("{base}{value_suffix}"),
        dates: format!("{base} Reporting Dates"),
        titles: format!("{base} Titles"),
    }
}

/// Reshape aggregate rows into one row per key. `slots` fixes the column
/// order so every family has the same schema whatever data arrived.
fn to_wide<F>(rows: &[AggregateRow], key_name: &str, slots: &[(&str, DataType)], names: F) -> WideTable
where
    F: Fn(&str, DataType) -> Columns,
{
    let mut table = WideTable::new(key_name);
    for &(code, dt) in slots {
        let cols = names(code, dt);
        table.add_column(&cols.value);
        table.add_column(&cols.dates);
        table.add_column(&cols.titles);
    }
    for row in rows {
        let cols = names(&row.code, row.data_type);
        table.set(&row.key, &cols.value, row.total);
        table.set(&row.key, &cols.dates, row.reporting_dates.clone());
        table.set(&row.key, &cols.titles, row.titles.clone());
    }
    table.fill_zero()
}

fn by_country(obs: &[Observation], lookup: &CountryLookup) -> Vec<Contribution> {
    obs.iter()
        .map(|o| Contribution::from_observation(o, lookup.country_of(&o.project)))
        .collect()
}

/* ---------------- Area families ---------------- */

/// Area-style family: latest report and target per project, reconciled,
/// summed per country into Target/Secured column pairs in hectares.
pub fn area_summary(
    rows: &[IndicatorRecord],
    codes: Codes<'_>,
    lookup: &CountryLookup,
) -> (WideTable, Diagnostics) {
    let obs = observations(rows, codes, HECTARES_PER_SQ_KM);
    let (reconciled, diags) = reconcile_latest(obs);
    let aggregated = aggregate(&by_country(&reconciled, lookup));

    let all = codes.all();
    let slots: Vec<(&str, DataType)> = all
        .iter()
        .flat_map(|c| [(*c, DataType::Target), (*c, DataType::Report)])
        .collect();
    let table = to_wide(&aggregated, COUNTRY, &slots, |code, dt| {
        columns(&format!("{code} {}", dt.role()), " (ha)")
    });
    debug!(codes = ?all, rows = reconciled.len(), "area summary built");
    (table, diags)
}

/// F1: area under improved management.
pub fn area_under_management(f1: &[IndicatorRecord], lookup: &CountryLookup) -> (WideTable, Diagnostics) {
    area_summary(f1, Codes::Whole(F1_CODE), lookup)
}

/// F2: protected areas with improved financing.
pub fn protected_area_financing(f2: &[IndicatorRecord], lookup: &CountryLookup) -> (WideTable, Diagnostics) {
    area_summary(f2, Codes::Matching(&F2_CODES), lookup)
}

/* ---------------- People families ---------------- */

/// Latest report per project and sub-indicator, summed per country.
pub fn people_summary(rows: &[IndicatorRecord], codes: &[&str], lookup: &CountryLookup) -> WideTable {
    let latest = latest_reports(observations(rows, Codes::Matching(codes), 1.0));
    let aggregated = aggregate(&by_country(&latest, lookup));
    let slots: Vec<(&str, DataType)> = codes.iter().map(|c| (*c, DataType::Report)).collect();
    to_wide(&aggregated, COUNTRY, &slots, |code, _| columns(code, " Secured"))
}

/// F6: direct jobs.
pub fn direct_jobs(f6: &[IndicatorRecord], lookup: &CountryLookup) -> WideTable {
    people_summary(f6, &F6_CODES, lookup)
}

/// F7: indirect beneficiaries.
pub fn indirect_beneficiaries(f7: &[IndicatorRecord], lookup: &CountryLookup) -> WideTable {
    people_summary(f7, &F7_CODES, lookup)
}

/* ---------------- Finance families ---------------- */

/// A family summarized both ways.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedSummary {
    pub by_country: WideTable,
    pub by_sector: WideTable,
}

/// Reported amount with its grouping attributes.
struct Amount<'a> {
    meta: &'a RecordMeta,
    project_country: &'a str,
    sector: &'a str,
    amount: f64,
    categories: Vec<(String, String)>,
}

fn reported<T: HasMeta>(rows: &[T]) -> impl Iterator<Item = &T> {
    rows.iter()
        .filter(|r| keep_row(r.meta()) && r.meta().data_type == DataType::Report)
}

fn amount_table<F>(items: &[Amount<'_>], prefix: &str, key_name: &str, key: F) -> WideTable
where
    F: Fn(&Amount<'_>) -> String,
{
    let contributions: Vec<Contribution> = items
        .iter()
        .map(|a| Contribution::from_meta(a.meta, &key(a), prefix, a.amount))
        .collect();
    let totals = to_wide(
        &aggregate(&contributions),
        key_name,
        &[(prefix, DataType::Report)],
        |code, _| columns(code, " (USD)"),
    );

    // One pivot per categorical dimension, each with its own header form.
    let mut dims: BTreeMap<&str, Vec<LongRow>> = BTreeMap::new();
    for a in items {
        let k = key(a);
        for (header, category) in &a.categories {
            let rows = dims.entry(header.as_str()).or_default();
            for row_key in [k.as_str(), GLOBAL] {
                rows.push(LongRow {
                    key: row_key.to_string(),
                    category: category.clone(),
                    value: a.amount,
                });
            }
        }
    }
    dims.into_iter().fold(totals, |table, (header, rows)| {
        let pivoted = pivot(&rows, key_name, |c| format!("{prefix} {header} {c} (USD)"));
        table.outer_join(pivoted).fill_zero()
    })
}

fn amount_summary(items: &[Amount<'_>], prefix: &str) -> KeyedSummary {
    KeyedSummary {
        by_country: amount_table(items, prefix, COUNTRY, |a| a.project_country.to_string()),
        by_sector: amount_table(items, prefix, SECTOR, |a| a.sector.to_string()),
    }
}

/// Reported investments, with breakdowns by source and by type.
pub fn investments(rows: &[InvestmentRecord], lookup: &CountryLookup) -> KeyedSummary {
    let items: Vec<Amount<'_>> = reported(rows)
        .map(|r| Amount {
            meta: &r.meta,
            project_country: lookup.country_of(&r.meta.project),
            sector: &r.sector,
            amount: r.amount,
            categories: vec![
                ("from".to_string(), r.source.clone()),
                ("as".to_string(), r.investment_type.clone()),
            ],
        })
        .collect();
    amount_summary(&items, INVESTMENTS)
}

/// Reported investments flagged gender-smart.
pub fn gender_smart_investments(rows: &[InvestmentRecord], lookup: &CountryLookup) -> KeyedSummary {
    let items: Vec<Amount<'_>> = reported(rows)
        .filter(|r| r.gender_smart)
        .map(|r| Amount {
            meta: &r.meta,
            project_country: lookup.country_of(&r.meta.project),
            sector: &r.sector,
            amount: r.amount,
            categories: Vec::new(),
        })
        .collect();
    amount_summary(&items, GENDER_SMART_INVESTMENTS)
}

/// Reported revenues, with a breakdown by revenue type.
pub fn revenues(rows: &[RevenueRecord], lookup: &CountryLookup) -> KeyedSummary {
    let items: Vec<Amount<'_>> = reported(rows)
        .map(|r| Amount {
            meta: &r.meta,
            project_country: lookup.country_of(&r.meta.project),
            sector: &r.sector,
            amount: r.amount,
            categories: vec![("from".to_string(), r.revenue_type.clone())],
        })
        .collect();
    amount_summary(&items, REVENUES)
}

/* ---------------- Business / finance solutions ---------------- */

fn business_counts<F>(rows: &[&BusinessRecord], key_name: &str, key: F) -> WideTable
where
    F: Fn(&BusinessRecord) -> String,
{
    #[derive(Default)]
    struct Acc<'a> {
        solutions: BTreeSet<&'a str>,
        dates: BTreeSet<NaiveDate>,
        titles: BTreeSet<&'a str>,
    }

    let mut map: BTreeMap<String, Acc<'_>> = BTreeMap::new();
    for &r in rows {
        for k in [key(r), GLOBAL.to_string()] {
            let e = map.entry(k).or_default();
            e.solutions.insert(&r.solution);
            e.dates.insert(r.meta.reporting_date);
            e.titles.insert(&r.meta.title);
        }
    }

    let cols = columns(BUSINESSES, "");
    let mut table = WideTable::new(key_name);
    table.add_column(&cols.value);
    table.add_column(&cols.dates);
    table.add_column(&cols.titles);
    for (k, acc) in map {
        table.set(&k, &cols.value, acc.solutions.len() as f64);
        table.set(
            &k,
            &cols.dates,
            join_distinct(acc.dates.iter().map(|d| d.format("%Y-%m-%d").to_string())),
        );
        table.set(&k, &cols.titles, join_distinct(&acc.titles));
    }
    table
}

/// Distinct reef-positive business and finance solutions, with the share
/// of each sector per country and of each country per sector.
pub fn business_solutions(rows: &[BusinessRecord], lookup: &CountryLookup) -> KeyedSummary {
    let solutions: Vec<&BusinessRecord> = reported(rows).collect();
    let country = |r: &BusinessRecord| lookup.country_of(&r.meta.project).to_string();

    let sector_share: Vec<CountedItem> = solutions
        .iter()
        .map(|&r| CountedItem {
            key: country(r),
            category: r.sector.clone(),
            item: r.solution.clone(),
        })
        .collect();
    let country_share: Vec<CountedItem> = sector_share
        .iter()
        .map(|i| CountedItem {
            key: i.category.clone(),
            category: i.key.clone(),
            item: i.item.clone(),
        })
        .collect();

    let by_country = business_counts(&solutions, COUNTRY, country)
        .outer_join(share_pivot(&sector_share, COUNTRY, |s| format!("{BUSINESSES} % {s}")))
        .fill_zero();
    let by_sector = business_counts(&solutions, SECTOR, |r| r.sector.clone())
        .outer_join(share_pivot(&country_share, SECTOR, |c| format!("{BUSINESSES} % {c}")))
        .fill_zero();
    KeyedSummary { by_country, by_sector }
}

/* ---------------- Validation ---------------- */

/// Projects without a single usable Report row in the primary area
/// indicator. Rows under the superseded baseline title do not count.
pub fn projects_without_reports(f1: &[IndicatorRecord], projects: &[String]) -> Diagnostics {
    let reporting: BTreeSet<&str> = f1
        .iter()
        .filter(|r| keep_row(&r.meta) && r.meta.data_type == DataType::Report)
        .map(|r| r.meta.project.as_str())
        .collect();
    projects
        .iter()
        .filter(|p| !reporting.contains(p.as_str()))
        .map(|p| Diagnostic::MissingReport { project: p.clone() })
        .collect()
}

/* ---------------- Combined tables ---------------- */

/// Everything the pipeline writes, plus the diagnostics raised on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedSummary {
    /// F1, F2, F6 and F7 by country.
    pub impact_by_country: WideTable,
    /// Finance families by country.
    pub finance_by_country: WideTable,
    /// Finance families by sector.
    pub by_sector: WideTable,
    /// All families by country.
    pub by_country: WideTable,
    pub diagnostics: Diagnostics,
}

pub fn build_summaries(data: &ReportData, lookup: &CountryLookup) -> CombinedSummary {
    let mut diagnostics = Diagnostics::new();

    let (f1, d1) = area_under_management(&data.f1, lookup);
    diagnostics.extend(d1);
    let (f2, d2) = protected_area_financing(&data.f2, lookup);
    diagnostics.extend(d2);
    let impact = vec![
        f1,
        f2,
        direct_jobs(&data.f6, lookup),
        indirect_beneficiaries(&data.f7, lookup),
    ];

    let finance = [
        investments(&data.investments, lookup),
        gender_smart_investments(&data.investments, lookup),
        revenues(&data.revenues, lookup),
        business_solutions(&data.businesses, lookup),
    ];
    let finance_by_country: Vec<WideTable> = finance.iter().map(|s| s.by_country.clone()).collect();
    let finance_by_sector: Vec<WideTable> = finance.into_iter().map(|s| s.by_sector).collect();

    let by_country = join_all(
        COUNTRY,
        impact.iter().cloned().chain(finance_by_country.iter().cloned()).collect(),
    );
    CombinedSummary {
        impact_by_country: join_all(COUNTRY, impact),
        finance_by_country: join_all(COUNTRY, finance_by_country),
        by_sector: join_all(SECTOR, finance_by_sector),
        by_country,
        diagnostics,
    }
}
