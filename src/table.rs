// Wide tables keyed by country or sector.
//
// Every summary the pipeline writes is a [`WideTable`]: one row per key,
// named columns, and cells that may be absent until [`WideTable::fill_zero`]
// is applied. The reshaping helpers here are shared by all indicator
// families.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// Synthesized key holding the reduction over every other row.
pub const GLOBAL: &str = "Global";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(_) => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

/// Row key ordered alphabetically, with [`GLOBAL`] always last.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RowKey(String);

impl Ord for RowKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0 == GLOBAL, other.0 == GLOBAL) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for RowKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WideTable {
    key_name: String,
    columns: Vec<String>,
    rows: BTreeMap<RowKey, Vec<Option<Cell>>>,
}

impl WideTable {
    pub fn new(key_name: impl Into<String>) -> Self {
        Self {
            key_name: key_name.into(),
            columns: Vec::new(),
            rows: BTreeMap::new(),
        }
    }

    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(|k| k.0.as_str())
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &[Option<Cell>])> {
        self.rows.iter().map(|(k, v)| (k.0.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&mut self, column: &str) -> usize {
        match self.columns.iter().position(|c| c == column) {
            Some(i) => i,
            None => {
                self.columns.push(column.to_string());
                for cells in self.rows.values_mut() {
                    cells.push(None);
                }
                self.columns.len() - 1
            }
        }
    }

    /// Make sure `column` exists, appending it (empty) if needed.
    pub fn add_column(&mut self, column: &str) {
        self.column_index(column);
    }

    /// Make sure a row for `key` exists.
    pub fn add_row(&mut self, key: &str) {
        let width = self.columns.len();
        self.rows
            .entry(RowKey(key.to_string()))
            .or_insert_with(|| vec![None; width]);
    }

    pub fn set(&mut self, key: &str, column: &str, cell: impl Into<Cell>) {
        let idx = self.column_index(column);
        self.add_row(key);
        if let Some(cells) = self.rows.get_mut(&RowKey(key.to_string())) {
            cells[idx] = Some(cell.into());
        }
    }

    pub fn get(&self, key: &str, column: &str) -> Option<&Cell> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(&RowKey(key.to_string()))?[idx].as_ref()
    }

    pub fn number(&self, key: &str, column: &str) -> Option<f64> {
        self.get(key, column).and_then(Cell::as_number)
    }

    /// True when any cell is still absent.
    pub fn has_gaps(&self) -> bool {
        self.rows.values().flatten().any(Option::is_none)
    }

    /// Replace every absent cell with 0.
    pub fn fill_zero(mut self) -> Self {
        for cell in self.rows.values_mut().flatten() {
            if cell.is_none() {
                *cell = Some(Cell::Number(0.0));
            }
        }
        self
    }

    /// Full outer join on the key column. Keys missing on either side get
    /// absent cells. A column present on both sides stays one column: cells
    /// already set on the left are kept and `other` fills the rest.
    pub fn outer_join(mut self, other: WideTable) -> WideTable {
        let targets: Vec<usize> = other
            .columns
            .iter()
            .map(|c| self.column_index(c))
            .collect();
        for (key, cells) in other.rows {
            let width = self.columns.len();
            let row = self.rows.entry(key).or_insert_with(|| vec![None; width]);
            for (&idx, cell) in targets.iter().zip(cells) {
                if row[idx].is_none() {
                    row[idx] = cell;
                }
            }
        }
        self
    }
}

/// One observation in long form: `(key, category, value)`.
#[derive(Debug, Clone, PartialEq)]
pub struct LongRow {
    pub key: String,
    pub category: String,
    pub value: f64,
}

/// Long `(key, category, value)` rows to one row per key and one column per
/// category. Values sharing a key and category are summed; combinations
/// that never occur are 0.
pub fn pivot<F>(rows: &[LongRow], key_name: &str, column_name: F) -> WideTable
where
    F: Fn(&str) -> String,
{
    let categories: BTreeSet<&str> = rows.iter().map(|r| r.category.as_str()).collect();
    let mut sums: BTreeMap<(&str, &str), f64> = BTreeMap::new();
    for r in rows {
        *sums.entry((r.key.as_str(), r.category.as_str())).or_insert(0.0) += r.value;
    }

    let mut table = WideTable::new(key_name);
    for c in &categories {
        table.add_column(&column_name(c));
    }
    for ((key, category), total) in sums {
        table.set(key, &column_name(category), total);
    }
    table.fill_zero()
}

/// A distinct item counted under a key and a category, e.g. a business
/// under a country and a sector.
#[derive(Debug, Clone, PartialEq)]
pub struct CountedItem {
    pub key: String,
    pub category: String,
    pub item: String,
}

/// Percentage of each key's distinct items that fall in each category.
///
/// For key `k` and category `c`: distinct items in (k, c) divided by
/// distinct items in k, times 100. The [`GLOBAL`] row is recomputed over
/// all items regardless of key.
pub fn share_pivot<F>(items: &[CountedItem], key_name: &str, column_name: F) -> WideTable
where
    F: Fn(&str) -> String,
{
    fn shares<'a>(
        items: impl Iterator<Item = &'a CountedItem>,
    ) -> BTreeMap<&'a str, f64> {
        let mut all: HashSet<&str> = HashSet::new();
        let mut per_category: BTreeMap<&str, HashSet<&str>> = BTreeMap::new();
        for it in items {
            all.insert(it.item.as_str());
            per_category
                .entry(it.category.as_str())
                .or_default()
                .insert(it.item.as_str());
        }
        let total = all.len() as f64;
        per_category
            .into_iter()
            .map(|(c, set)| (c, set.len() as f64 / total * 100.0))
            .collect()
    }

    let categories: BTreeSet<&str> = items.iter().map(|i| i.category.as_str()).collect();
    let keys: BTreeSet<&str> = items.iter().map(|i| i.key.as_str()).collect();

    let mut table = WideTable::new(key_name);
    for c in &categories {
        table.add_column(&column_name(c));
    }
    for key in keys {
        for (category, pct) in shares(items.iter().filter(|i| i.key == key)) {
            table.set(key, &column_name(category), pct);
        }
    }
    if !items.is_empty() {
        for (category, pct) in shares(items.iter()) {
            table.set(GLOBAL, &column_name(category), pct);
        }
    }
    table.fill_zero()
}

/// Sequential full outer join of all tables on their key, gaps filled
/// with 0.
pub fn join_all(key_name: &str, tables: Vec<WideTable>) -> WideTable {
    tables
        .into_iter()
        .fold(WideTable::new(key_name), WideTable::outer_join)
        .fill_zero()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long(key: &str, category: &str, value: f64) -> LongRow {
        LongRow {
            key: key.into(),
            category: category.into(),
            value,
        }
    }

    fn item(key: &str, category: &str, it: &str) -> CountedItem {
        CountedItem {
            key: key.into(),
            category: category.into(),
            item: it.into(),
        }
    }

    #[test]
    fn global_row_sorts_last() {
        let mut t = WideTable::new("Country");
        t.set(GLOBAL, "x", 1.0);
        t.set("Seychelles", "x", 1.0);
        t.set("Brazil", "x", 1.0);
        let keys: Vec<&str> = t.keys().collect();
        assert_eq!(keys, vec!["Brazil", "Seychelles", GLOBAL]);
    }

    #[test]
    fn pivot_sums_and_zero_fills() {
        let rows = vec![
            long("Fiji", "Private", 10.0),
            long("Fiji", "Private", 5.0),
            long("Egypt", "Public", 3.0),
        ];
        let t = pivot(&rows, "Country", |c| format!("From {c}"));
        assert_eq!(t.columns(), &["From Private".to_string(), "From Public".to_string()]);
        assert_eq!(t.number("Fiji", "From Private"), Some(15.0));
        assert_eq!(t.number("Fiji", "From Public"), Some(0.0));
        assert_eq!(t.number("Egypt", "From Private"), Some(0.0));
        assert!(!t.has_gaps());
    }

    #[test]
    fn shares_sum_to_hundred_per_key() {
        let items = vec![
            item("Fiji", "Tourism", "b1"),
            item("Fiji", "Tourism", "b1"),
            item("Fiji", "Fisheries", "b2"),
            item("Fiji", "Aquaculture", "b3"),
            item("Egypt", "Tourism", "b4"),
        ];
        let t = share_pivot(&items, "Country", |c| format!("% {c}"));
        for key in ["Fiji", "Egypt", GLOBAL] {
            let total: f64 = t
                .columns()
                .iter()
                .filter_map(|c| t.number(key, c))
                .sum();
            assert!((total - 100.0).abs() < 1e-9, "{key} sums to {total}");
        }
        assert!((t.number("Fiji", "% Tourism").unwrap() - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(t.number(GLOBAL, "% Tourism"), Some(50.0));
        assert_eq!(t.number("Egypt", "% Fisheries"), Some(0.0));
    }

    #[test]
    fn global_share_is_recomputed_not_averaged() {
        let items = vec![
            item("Fiji", "Tourism", "b1"),
            item("Egypt", "Tourism", "b2"),
            item("Egypt", "Fisheries", "b3"),
            item("Egypt", "Fisheries", "b4"),
        ];
        let t = share_pivot(&items, "Country", |c| c.to_string());
        // Mean of per-country shares would be (100 + 33.3) / 2.
        assert_eq!(t.number(GLOBAL, "Tourism"), Some(50.0));
    }

    #[test]
    fn outer_join_keeps_all_keys_and_fills_gaps() {
        let mut a = WideTable::new("Country");
        a.set("Fiji", "F1 Secured (ha)", 300.0);
        a.set("Egypt", "F1 Secured (ha)", 10.0);
        let mut b = WideTable::new("Country");
        b.set("Fiji", "Revenues (USD)", 50.0);
        b.set("Jordan", "Revenues (USD)", 7.0);

        let joined = a.clone().outer_join(b.clone());
        assert!(joined.has_gaps());
        assert_eq!(joined.get("Jordan", "F1 Secured (ha)"), None);

        let all = join_all("Country", vec![a, b]);
        assert_eq!(all.len(), 3);
        assert!(!all.has_gaps());
        assert_eq!(all.number("Jordan", "F1 Secured (ha)"), Some(0.0));
        assert_eq!(all.number("Egypt", "Revenues (USD)"), Some(0.0));
        assert_eq!(all.number("Fiji", "Revenues (USD)"), Some(50.0));
    }

    #[test]
    fn shared_columns_are_merged_not_duplicated() {
        let mut a = WideTable::new("Country");
        a.set("Fiji", "Businesses", 3.0);
        let mut b = WideTable::new("Country");
        b.set("Fiji", "Businesses", 9.0);
        b.set("Egypt", "Businesses", 2.0);
        b.set("Egypt", "Revenues (USD)", 5.0);

        let joined = a.outer_join(b);
        assert_eq!(
            joined.columns().to_vec(),
            vec!["Businesses".to_string(), "Revenues (USD)".to_string()]
        );
        assert_eq!(joined.number("Fiji", "Businesses"), Some(3.0));
        assert_eq!(joined.number("Egypt", "Businesses"), Some(2.0));
        assert_eq!(joined.get("Fiji", "Revenues (USD)"), None);
    }
}
