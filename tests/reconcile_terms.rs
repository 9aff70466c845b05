// tests/reconcile_terms.rs

use std::error::Error;

mod common;

use common::{client_for, item, FakeCatalog, FakeLedger};
use previewpipe::catalog::{reconcile, resolve};

type TestResult = Result<(), Box<dyn Error>>;

const CHAIR_NOTE: &str =
    "malink: //Potter/Art/3D/Props/p_chair_rig.ma\n\npoly_count: 1200\n\nbounding_box: [1, 2, 3]\n\nrig_used: ";

#[test]
fn resolve_matches_on_name_without_extension() {
    let items = vec![
        item("A1", "chair.png", CHAIR_NOTE),
        item("B2", "table.png", ""),
    ];

    let r = resolve("chair", &items);
    assert_eq!(r.catalog_ids, vec!["A1".to_string()]);
    // The malink line recovers the canonical asset id; the identity
    // itself rides along for the name match.
    assert!(r.asset_ids.contains(&"p_chair_rig".to_string()));
    assert!(r.asset_ids.contains(&"chair".to_string()));
}

#[test]
fn resolve_matches_via_annotation_substring_and_recovers_the_asset_id() {
    let items = vec![
        item("A1", "chair.png", CHAIR_NOTE),
        item("B2", "table.png", ""),
    ];

    // "p_chair" appears only inside the annotation's malink path.
    let r = resolve("p_chair", &items);
    assert_eq!(r.catalog_ids, vec!["A1".to_string()]);
    assert_eq!(r.asset_ids, vec!["p_chair_rig".to_string()]);
}

#[test]
fn resolve_with_no_match_is_empty() {
    let items = vec![item("A1", "chair.png", CHAIR_NOTE)];
    let r = resolve("lamp", &items);
    assert!(r.catalog_ids.is_empty());
    assert!(r.asset_ids.is_empty());
}

#[tokio::test]
async fn reconcile_trashes_and_marks_ledger_rows() -> TestResult {
    let catalog = FakeCatalog::with_items(vec![
        item("A1", "chair.png", CHAIR_NOTE),
        item("B2", "table.png", ""),
    ]);
    let fake = FakeLedger::with_tab(
        "Props",
        vec![
            vec!["Type", "Asset", "Deleted", "Date And Time", "Blame"],
            vec!["prop", "p_chair_rig", "", "", ""],
        ],
    );
    let mut ledger = client_for(&fake);

    let report = reconcile(&catalog, &mut ledger, &["p_chair".to_string()]).await?;

    assert_eq!(report.trashed, vec!["A1".to_string()]);
    assert_eq!(report.marked.len(), 1);
    assert!(report.mark_failures.is_empty());

    let rows = fake.tab("Props");
    assert_eq!(rows[1][2], "Yes");
    Ok(())
}

#[tokio::test]
async fn trash_failure_does_not_block_ledger_marking() -> TestResult {
    let mut catalog = FakeCatalog::with_items(vec![item("A1", "chair.png", CHAIR_NOTE)]);
    catalog.fail_trash = true;

    let fake = FakeLedger::with_tab(
        "Props",
        vec![
            vec!["Type", "Asset", "Deleted", "Date And Time", "Blame"],
            vec!["prop", "p_chair_rig", "", "", ""],
        ],
    );
    let mut ledger = client_for(&fake);

    let report = reconcile(&catalog, &mut ledger, &["p_chair".to_string()]).await?;

    assert!(report.trash_error.is_some());
    assert_eq!(report.marked.len(), 1);
    assert_eq!(fake.tab("Props")[1][2], "Yes");
    Ok(())
}

#[tokio::test]
async fn malformed_table_does_not_block_marking_in_a_later_one() -> TestResult {
    let catalog = FakeCatalog::with_items(vec![item(
        "A1",
        "hermione.png",
        "malink: //Potter/Art/3D/Characters/c_hermione_rig.ma",
    )]);

    // The first table probed has no usable key column; the asset lives in
    // a later one.
    let fake = FakeLedger::with_tab("Props", vec![vec!["Alpha", "Beta"]]);
    fake.set_tab(
        "Characters",
        vec![
            vec!["Type", "Asset", "Deleted", "Date And Time", "Blame"],
            vec!["character", "c_hermione_rig", "", "", ""],
        ],
    );
    for tab in ["Creatures", "Outfits", "Hair", "Effects"] {
        fake.set_tab(tab, vec![vec!["Type", "Asset"]]);
    }
    let mut ledger = client_for(&fake);

    let report = reconcile(&catalog, &mut ledger, &["hermione".to_string()]).await?;

    assert_eq!(report.marked.len(), 1);
    assert_eq!(fake.tab("Characters")[1][2], "Yes");
    Ok(())
}

#[tokio::test]
async fn unknown_assets_are_reported_not_fatal() -> TestResult {
    let catalog = FakeCatalog::with_items(vec![item(
        "A1",
        "ghost.png",
        "malink: //Potter/Art/3D/Props/p_ghost_rig.ma",
    )]);
    // Ledger knows nothing about this asset in any table.
    let fake = FakeLedger::with_tab("Props", vec![vec!["Type", "Asset"]]);
    for tab in ["Characters", "Creatures", "Outfits", "Hair", "Effects"] {
        fake.set_tab(tab, vec![vec!["Type", "Asset"]]);
    }
    let mut ledger = client_for(&fake);

    let report = reconcile(&catalog, &mut ledger, &["ghost".to_string()]).await?;

    assert_eq!(report.trashed, vec!["A1".to_string()]);
    assert!(report.marked.is_empty());
    assert_eq!(report.mark_failures.len(), 2); // p_ghost_rig and the identity "ghost"
    Ok(())
}
