// Project to country resolution.
//
// The provider reports a country per project, but the downstream platform
// works with a fixed set of regions. Override rules map provider values
// (and a few individual projects) onto those regions.

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::types::Project;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// Regions the platform knows about. Keep in sync with the platform.
pub const VALID_COUNTRIES: [&str; 15] = [
    "Brazil",
    "Colombia",
    "Egypt",
    "Fiji",
    "Indonesia",
    "Jordan",
    "Kenya & Tanzania",
    "Maldives",
    "Mesoamerican Reef Region",
    "Micronesia Region",
    "Papua New Guinea",
    "Philippines",
    "Seychelles",
    "Sri Lanka",
    "The Bahamas",
];

/// Country used for rows whose project is not in the lookup.
pub const UNASSIGNED_COUNTRY: &str = "Unassigned";

pub fn is_valid_country(country: &str) -> bool {
    VALID_COUNTRIES.contains(&country)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideRule {
    /// Provider country is one of `from`: use `to`.
    Country { from: Vec<String>, to: String },
    /// Project name equals `project`: use `to` whatever the provider says.
    Project { project: String, to: String },
}

impl OverrideRule {
    pub fn country(from: &[&str], to: &str) -> Self {
        OverrideRule::Country {
            from: from.iter().map(|s| s.to_string()).collect(),
            to: to.to_string(),
        }
    }

    pub fn project(project: &str, to: &str) -> Self {
        OverrideRule::Project {
            project: project.to_string(),
            to: to.to_string(),
        }
    }

    /// The country this rule assigns, if it matches.
    ///
    /// Country rules look at the provider value, not at whatever an earlier
    /// rule produced, so rule order only matters between matching rules.
    pub fn apply(&self, project: &Project) -> Option<&str> {
        match self {
            OverrideRule::Country { from, to } => from
                .iter()
                .any(|c| c == project.country.trim())
                .then_some(to.as_str()),
            OverrideRule::Project { project: name, to } => {
                (name == &project.name).then_some(to.as_str())
            }
        }
    }
}

static BUILTIN_RULES: Lazy<Vec<OverrideRule>> = Lazy::new(|| {
    vec![
        OverrideRule::country(&["Kenya", "Tanzania"], "Kenya & Tanzania"),
        OverrideRule::country(
            &["Belize", "Guatemala", "Honduras", "Mexico"],
            "Mesoamerican Reef Region",
        ),
        OverrideRule::country(
            &[
                "Federated States of Micronesia",
                "Micronesia",
                "Palau",
                "Marshall Islands",
            ],
            "Micronesia Region",
        ),
        OverrideRule::country(&["Bahamas"], "The Bahamas"),
        OverrideRule::project("Mesoamerican Reef Fund", "Mesoamerican Reef Region"),
        OverrideRule::project("Micronesia Conservation Trust", "Micronesia Region"),
    ]
});

/// Built-in rules followed by `extra` project-name rules, in priority order.
pub fn override_rules(extra: &BTreeMap<String, String>) -> Vec<OverrideRule> {
    let mut rules = BUILTIN_RULES.to_vec();
    rules.extend(extra.iter().map(|(p, c)| OverrideRule::project(p, c)));
    rules
}

/// Fold the rules over the provider country; the last matching rule wins.
pub fn resolve_country(project: &Project, rules: &[OverrideRule]) -> String {
    rules
        .iter()
        .fold(project.country.trim(), |current, rule| {
            rule.apply(project).unwrap_or(current)
        })
        .to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryLookup {
    map: BTreeMap<String, String>,
}

impl CountryLookup {
    pub fn get(&self, project: &str) -> Option<&str> {
        self.map.get(project).map(String::as_str)
    }

    /// Country for a data row; projects missing from the lookup are
    /// reported under [`UNASSIGNED_COUNTRY`].
    pub fn country_of(&self, project: &str) -> &str {
        self.get(project).unwrap_or(UNASSIGNED_COUNTRY)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }
}

impl FromIterator<(String, String)> for CountryLookup {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

/// Build the lookup for projects that have indicator data, and flag any
/// project whose country is still not a valid region afterwards.
pub fn resolve_countries(
    projects: &[Project],
    with_data: &BTreeSet<String>,
    rules: &[OverrideRule],
) -> (CountryLookup, Diagnostics) {
    let mut diags = Diagnostics::new();
    let lookup: CountryLookup = projects
        .iter()
        .filter(|p| with_data.contains(&p.name))
        .map(|p| (p.name.clone(), resolve_country(p, rules)))
        .collect();

    for (project, country) in lookup.iter() {
        if !is_valid_country(country) {
            diags.push(Diagnostic::InvalidCountry {
                project: project.to_string(),
                country: country.to_string(),
            });
        }
    }
    info!(
        "resolved countries for {} projects ({} invalid)",
        lookup.len(),
        diags.len()
    );
    (lookup, diags)
}
