// src/engine/policy.rs

//! The rerun policy engine: a pure decision function over one candidate
//! and its current ledger row.
//!
//! Nothing here talks to the network; the scheduler fetches the row and
//! hands it in, which keeps every policy path unit-testable.
//!
//! Two view sets matter per row:
//! - the *requested* set: the row's boolean view columns (`front`,
//!   `left`, `back`, `top`), human-editable checkboxes;
//! - the *previously rendered* set: the `previouslyrendered` cell this
//!   pipeline writes after each successful job.

use std::fmt;

use clap::ValueEnum;

use crate::candidate::{Candidate, Category};
use crate::ledger::LedgerRow;

/// Preview views a render job can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum View {
    Front,
    Left,
    Back,
    Top,
}

impl View {
    pub const ALL: [View; 4] = [View::Front, View::Left, View::Back, View::Top];

    /// Cleaned heading of this view's boolean ledger column.
    pub fn column(self) -> &'static str {
        match self {
            View::Front => "front",
            View::Left => "left",
            View::Back => "back",
            View::Top => "top",
        }
    }

    fn parse(token: &str) -> Option<View> {
        match token.trim().to_lowercase().as_str() {
            "front" => Some(View::Front),
            "left" => Some(View::Left),
            "back" => Some(View::Back),
            "top" => Some(View::Top),
            _ => None,
        }
    }
}

/// A small ordered set of views.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewSet(Vec<View>);

impl ViewSet {
    pub fn new(mut views: Vec<View>) -> Self {
        views.sort();
        views.dedup();
        Self(views)
    }

    /// The requested set: views whose boolean columns are truthy in the
    /// row.
    pub fn requested_in(row: &LedgerRow) -> Self {
        Self::new(
            View::ALL
                .into_iter()
                .filter(|v| row.flag(v.column()))
                .collect(),
        )
    }

    /// The set recorded in the `previouslyrendered` cell
    /// (comma-separated view names; unknown tokens ignored).
    pub fn previously_rendered_in(row: &LedgerRow) -> Self {
        let cell = row.get("previouslyrendered").unwrap_or("");
        Self::new(cell.split(',').filter_map(View::parse).collect())
    }

    /// Default request when no ledger row exists yet. Characters get the
    /// full set; everything else gets the single front view.
    pub fn default_for(category: Category) -> Self {
        match category {
            Category::Characters => Self::new(View::ALL.to_vec()),
            _ => Self::new(vec![View::Front]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = View> + '_ {
        self.0.iter().copied()
    }
}

impl fmt::Display for ViewSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|v| v.column()).collect();
        f.write_str(&names.join(","))
    }
}

/// Which candidates get (re)processed on a given run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RerunPolicy {
    /// Run only candidates with no existing ledger row.
    NewOnly,
    /// Run new candidates, plus existing ones whose requested view set
    /// differs from the views already rendered.
    ReRenderIfNewView,
    /// Run only candidates whose row records a crash. Never runs
    /// brand-new candidates.
    CrashedOnly,
    /// Run everything.
    ForceAll,
}

/// Outcome of the policy decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Skip(String),
    Run(ViewSet),
}

/// Values of the `crashed` column that mean "did not crash".
fn crash_is_clean(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "" | "no" | "n" | "false" | "0" | "none"
    )
}

/// The view set a run request would carry for this candidate/row pair.
///
/// The category default covers rows with no checked views; this fallback
/// only feeds the modes that rerun regardless of the checkboxes
/// (crashed-only, force-all) and brand-new candidates. ReRenderIfNewView
/// reads the row's literal requested set itself.
fn requested_views(candidate: &Candidate, row: Option<&LedgerRow>) -> ViewSet {
    match row {
        Some(row) => {
            let requested = ViewSet::requested_in(row);
            if requested.is_empty() {
                ViewSet::default_for(candidate.category)
            } else {
                requested
            }
        }
        None => ViewSet::default_for(candidate.category),
    }
}

/// Decide whether `candidate` needs a render, and which views to ask for.
///
/// The deleted gate runs before any mode logic: a soft-deleted row is
/// skipped under every policy unless the run sets `include_deleted`.
pub fn decide(
    candidate: &Candidate,
    row: Option<&LedgerRow>,
    policy: RerunPolicy,
    include_deleted: bool,
) -> Decision {
    if let Some(row) = row {
        if row.flag("deleted") && !include_deleted {
            return Decision::Skip(format!(
                "row for '{}' is marked deleted (run with the deleted override to re-render)",
                candidate.asset_id()
            ));
        }
    }

    let requested = requested_views(candidate, row);

    match (policy, row) {
        (RerunPolicy::ForceAll, _) => Decision::Run(requested),

        (RerunPolicy::NewOnly, None) => Decision::Run(requested),
        (RerunPolicy::NewOnly, Some(_)) => {
            Decision::Skip(format!("'{}' already has a ledger row", candidate.asset_id()))
        }

        (RerunPolicy::ReRenderIfNewView, None) => Decision::Run(requested),
        (RerunPolicy::ReRenderIfNewView, Some(row)) => {
            // This mode compares the row's literal checkbox set, not the
            // category default: nothing checked means nothing to render.
            let checked = ViewSet::requested_in(row);
            if checked.is_empty() {
                return Decision::Skip(format!(
                    "'{}' has no views requested",
                    candidate.asset_id()
                ));
            }
            let rendered = ViewSet::previously_rendered_in(row);
            if rendered == checked {
                Decision::Skip(format!(
                    "'{}' already rendered with views [{rendered}]",
                    candidate.asset_id()
                ))
            } else {
                Decision::Run(checked)
            }
        }

        (RerunPolicy::CrashedOnly, None) => Decision::Skip(format!(
            "'{}' has no ledger row; crashed-only never renders new assets",
            candidate.asset_id()
        )),
        (RerunPolicy::CrashedOnly, Some(row)) => match row.get("crashed") {
            Some(v) if !crash_is_clean(v) => Decision::Run(requested),
            _ => Decision::Skip(format!(
                "'{}' has no recorded crash",
                candidate.asset_id()
            )),
        },
    }
}
