use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/* ---------------- Raw rows, as exported by the reporting provider ---------------- */

#[derive(Debug, Deserialize)]
pub struct RawProjectRow {
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Country")]
    pub country: Option<String>,
    #[serde(rename = "Tags", default)]
    pub tags: Option<String>,
    #[serde(rename = "Notes", default)]
    pub notes: Option<String>,
}

/// F1, F2, F6 and F7 share one layout; F1 has no sub-indicator column.
#[derive(Debug, Deserialize)]
pub struct RawIndicatorRow {
    #[serde(rename = "Project")]
    pub project: Option<String>,
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Reporting Date")]
    pub reporting_date: Option<String>,
    #[serde(rename = "Data Type")]
    pub data_type: Option<String>,
    #[serde(rename = "Sub-Indicator", default)]
    pub sub_indicator: Option<String>,
    #[serde(rename = "Value")]
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawBusinessRow {
    #[serde(rename = "Project")]
    pub project: Option<String>,
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Reporting Date")]
    pub reporting_date: Option<String>,
    #[serde(rename = "Data Type")]
    pub data_type: Option<String>,
    #[serde(rename = "Sector", default)]
    pub sector: Option<String>,
    #[serde(rename = "Solution")]
    pub solution: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawInvestmentRow {
    #[serde(rename = "Project")]
    pub project: Option<String>,
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Reporting Date")]
    pub reporting_date: Option<String>,
    #[serde(rename = "Data Type")]
    pub data_type: Option<String>,
    #[serde(rename = "Sector", default)]
    pub sector: Option<String>,
    #[serde(rename = "Investment Source", default)]
    pub investment_source: Option<String>,
    #[serde(rename = "Investment Type", default)]
    pub investment_type: Option<String>,
    #[serde(rename = "Gender-Smart", default)]
    pub gender_smart: Option<String>,
    #[serde(rename = "Amount")]
    pub amount: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawRevenueRow {
    #[serde(rename = "Project")]
    pub project: Option<String>,
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Reporting Date")]
    pub reporting_date: Option<String>,
    #[serde(rename = "Data Type")]
    pub data_type: Option<String>,
    #[serde(rename = "Sector", default)]
    pub sector: Option<String>,
    #[serde(rename = "Revenue Type", default)]
    pub revenue_type: Option<String>,
    #[serde(rename = "Amount")]
    pub amount: Option<String>,
}

/* ---------------- Clean records ---------------- */

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub name: String,
    /// Country as supplied by the provider, before override rules.
    pub country: String,
    pub tags: Vec<String>,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataType {
    Report,
    Target,
}

impl DataType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "report" => Some(DataType::Report),
            "target" => Some(DataType::Target),
            _ => None,
        }
    }

    /// Column label used in summaries: reports are what has been secured.
    pub fn role(self) -> &'static str {
        match self {
            DataType::Report => "Secured",
            DataType::Target => "Target",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Report => write!(f, "Report"),
            DataType::Target => write!(f, "Target"),
        }
    }
}

/// Columns every indicator table carries.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMeta {
    pub project: String,
    pub title: String,
    pub reporting_date: NaiveDate,
    pub data_type: DataType,
}

pub trait HasMeta {
    fn meta(&self) -> &RecordMeta;
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRecord {
    pub meta: RecordMeta,
    /// Empty for tables without sub-indicators (F1).
    pub sub_indicator: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BusinessRecord {
    pub meta: RecordMeta,
    pub sector: String,
    pub solution: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvestmentRecord {
    pub meta: RecordMeta,
    pub sector: String,
    pub source: String,
    pub investment_type: String,
    pub gender_smart: bool,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevenueRecord {
    pub meta: RecordMeta,
    pub sector: String,
    pub revenue_type: String,
    pub amount: f64,
}

macro_rules! impl_has_meta {
    ($($t:ty),*) => {
        $(impl HasMeta for $t {
            fn meta(&self) -> &RecordMeta {
                &self.meta
            }
        })*
    };
}

impl_has_meta!(IndicatorRecord, BusinessRecord, InvestmentRecord, RevenueRecord);

/// The named long tables returned by one pull from the data source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportData {
    pub f1: Vec<IndicatorRecord>,
    pub f2: Vec<IndicatorRecord>,
    pub f6: Vec<IndicatorRecord>,
    pub f7: Vec<IndicatorRecord>,
    pub businesses: Vec<BusinessRecord>,
    pub investments: Vec<InvestmentRecord>,
    pub revenues: Vec<RevenueRecord>,
}

impl ReportData {
    /// Every project that appears in at least one table.
    pub fn project_names(&self) -> std::collections::BTreeSet<String> {
        fn names<T: HasMeta>(rows: &[T]) -> impl Iterator<Item = String> + '_ {
            rows.iter().map(|r| r.meta().project.clone())
        }
        names(&self.f1)
            .chain(names(&self.f2))
            .chain(names(&self.f6))
            .chain(names(&self.f7))
            .chain(names(&self.businesses))
            .chain(names(&self.investments))
            .chain(names(&self.revenues))
            .collect()
    }
}

/// One value of one indicator code for one project, in target units.
/// This is the shape reconciliation and aggregation work on.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub project: String,
    pub title: String,
    pub reporting_date: NaiveDate,
    pub data_type: DataType,
    pub code: String,
    pub value: f64,
}
