// Latest-value selection and report/target reconciliation.
//
// Both work on `Observation`s keyed by (project, code), so the area and
// protected-area families share one implementation.
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::types::{DataType, Observation};
use std::cmp::Ordering;
use std::collections::BTreeMap;

type PairKey = (String, String);

/// Keep the most recent row per (project, code, data type).
///
/// Rows are ordered by (reporting date, title, value) and the greatest one
/// is kept: among rows sharing the latest date the greatest title wins, and
/// exact duplicates of date and title resolve to the larger value. The
/// result does not depend on input order. Output is ordered by project,
/// code, then data type.
pub fn latest_per_group(obs: Vec<Observation>) -> Vec<Observation> {
    let mut latest: BTreeMap<(String, String, DataType), Observation> = BTreeMap::new();
    for o in obs {
        let key = (o.project.clone(), o.code.clone(), o.data_type);
        let newer = latest
            .get(&key)
            .map_or(true, |cur| recency(&o, cur) == Ordering::Greater);
        if newer {
            latest.insert(key, o);
        }
    }
    latest.into_values().collect()
}

fn recency(a: &Observation, b: &Observation) -> Ordering {
    (&a.reporting_date, &a.title)
        .cmp(&(&b.reporting_date, &b.title))
        .then_with(|| a.value.total_cmp(&b.value))
}

/// Latest Report row per (project, code); targets are dropped.
pub fn latest_reports(obs: Vec<Observation>) -> Vec<Observation> {
    latest_per_group(
        obs.into_iter()
            .filter(|o| o.data_type == DataType::Report)
            .collect(),
    )
}

/// Make every reported value have a target at least as large.
///
/// Expects at most one row per (project, code, data type), i.e. the output
/// of [`latest_per_group`]:
/// - a report without a target gets a target copied from it, and the
///   project is recorded as a [`Diagnostic::SynthesizedTarget`];
/// - a target below its report is raised to the report value.
///
/// Running it again on its own output changes nothing.
pub fn reconcile_targets(obs: Vec<Observation>) -> (Vec<Observation>, Diagnostics) {
    let mut pairs: BTreeMap<PairKey, (Option<Observation>, Option<Observation>)> = BTreeMap::new();
    for o in obs {
        let slot = pairs.entry((o.project.clone(), o.code.clone())).or_default();
        match o.data_type {
            DataType::Report => slot.0 = Some(o),
            DataType::Target => slot.1 = Some(o),
        }
    }

    let mut diags = Diagnostics::new();
    let mut out = Vec::with_capacity(pairs.len() * 2);
    for ((project, code), (report, target)) in pairs {
        let target = match (&report, target) {
            (Some(r), None) => {
                diags.push(Diagnostic::SynthesizedTarget {
                    indicator: code,
                    project,
                });
                Some(Observation {
                    data_type: DataType::Target,
                    ..r.clone()
                })
            }
            (Some(r), Some(mut t)) => {
                if r.value > t.value {
                    t.value = r.value;
                }
                Some(t)
            }
            (None, t) => t,
        };
        out.extend(report);
        out.extend(target);
    }
    (out, diags)
}

/// Latest selection followed by target reconciliation.
pub fn reconcile_latest(obs: Vec<Observation>) -> (Vec<Observation>, Diagnostics) {
    reconcile_targets(latest_per_group(obs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn obs(project: &str, date: (i32, u32, u32), title: &str, dt: DataType, value: f64) -> Observation {
        Observation {
            project: project.to_string(),
            title: title.to_string(),
            reporting_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            data_type: dt,
            code: "F1".to_string(),
            value,
        }
    }

    fn value_of(rows: &[Observation], project: &str, dt: DataType) -> Vec<f64> {
        rows.iter()
            .filter(|o| o.project == project && o.data_type == dt)
            .map(|o| o.value)
            .collect()
    }

    #[test]
    fn duplicate_date_and_title_pick_the_same_row_in_any_order() {
        let low = obs("A", (2023, 12, 31), "2023 Annual", DataType::Report, 1.0);
        let high = obs("A", (2023, 12, 31), "2023 Annual", DataType::Report, 5.0);

        let forward = latest_per_group(vec![low.clone(), high.clone()]);
        let reversed = latest_per_group(vec![high, low]);
        assert_eq!(value_of(&forward, "A", DataType::Report), vec![5.0]);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn keeps_only_latest_date_per_group() {
        let rows = vec![
            obs("A", (2023, 6, 30), "Mid 2023", DataType::Report, 5.0),
            obs("A", (2022, 12, 31), "Annual 2022", DataType::Report, 3.0),
            obs("A", (2021, 12, 31), "Annual 2021", DataType::Target, 9.0),
            obs("A", (2023, 12, 31), "Annual 2023", DataType::Target, 7.0),
        ];
        let latest = latest_per_group(rows);
        assert_eq!(latest.len(), 2);
        assert_eq!(value_of(&latest, "A", DataType::Report), vec![5.0]);
        assert_eq!(value_of(&latest, "A", DataType::Target), vec![7.0]);
    }

    #[test]
    fn same_date_ties_break_on_title() {
        let rows = vec![
            obs("A", (2023, 6, 30), "Round B", DataType::Report, 2.0),
            obs("A", (2023, 6, 30), "Round C", DataType::Report, 3.0),
            obs("A", (2023, 6, 30), "Round A", DataType::Report, 1.0),
        ];
        let latest = latest_per_group(rows.clone());
        assert_eq!(latest[0].title, "Round C");

        let mut reversed = rows;
        reversed.reverse();
        assert_eq!(latest_per_group(reversed)[0].title, "Round C");
    }

    #[test]
    fn latest_reports_ignores_targets() {
        let rows = vec![
            obs("A", (2023, 6, 30), "t", DataType::Target, 10.0),
            obs("A", (2022, 6, 30), "r", DataType::Report, 4.0),
        ];
        let latest = latest_reports(rows);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].data_type, DataType::Report);
    }

    #[test]
    fn missing_target_is_synthesized_from_report() {
        let rows = vec![obs("Alpha", (2023, 1, 1), "R1", DataType::Report, 100.0)];
        let (out, diags) = reconcile_targets(rows);
        assert_eq!(value_of(&out, "Alpha", DataType::Target), vec![100.0]);
        let synthesized: Vec<_> = diags.iter().cloned().collect();
        assert_eq!(
            synthesized,
            vec![Diagnostic::SynthesizedTarget {
                indicator: "F1".into(),
                project: "Alpha".into()
            }]
        );
    }

    #[test]
    fn target_never_below_report() {
        let rows = vec![
            obs("Beta", (2023, 1, 1), "R1", DataType::Report, 200.0),
            obs("Beta", (2023, 1, 1), "R1", DataType::Target, 100.0),
            obs("Gamma", (2023, 1, 1), "R1", DataType::Report, 50.0),
            obs("Gamma", (2023, 1, 1), "R1", DataType::Target, 80.0),
        ];
        let (out, diags) = reconcile_targets(rows);
        assert!(diags.is_empty());
        assert_eq!(value_of(&out, "Beta", DataType::Target), vec![200.0]);
        assert_eq!(value_of(&out, "Gamma", DataType::Target), vec![80.0]);
        assert_eq!(value_of(&out, "Gamma", DataType::Report), vec![50.0]);
    }

    #[test]
    fn target_only_projects_are_left_alone() {
        let rows = vec![obs("Delta", (2023, 1, 1), "R1", DataType::Target, 12.0)];
        let (out, diags) = reconcile_targets(rows);
        assert!(diags.is_empty());
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn reconciliation_is_idempotent() {
        let rows = vec![
            obs("Alpha", (2023, 1, 1), "R1", DataType::Report, 1.0),
            obs("Beta", (2023, 1, 1), "R1", DataType::Report, 2.0),
            obs("Beta", (2023, 1, 1), "R1", DataType::Target, 1.0),
            obs("Gamma", (2022, 1, 1), "R0", DataType::Target, 5.0),
        ];
        let (once, first) = reconcile_latest(rows);
        let (twice, second) = reconcile_latest(once.clone());
        assert_eq!(once, twice);
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }
}
