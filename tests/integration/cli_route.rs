//! CLI route table driven through `RunContext` with a temporary store.

use super::test_utils::*;
use clap::Parser;
use std::sync::Arc;
use tempfile::TempDir;
use visitplan::cli::{map_error, Cli, Commands, RunContext};
use visitplan::clock::FixedClock;
use visitplan::config::VisitplanConfig;
use visitplan::model::FollowUpStatus;
use visitplan::store::SledStore;

fn context() -> RunContext {
    RunContext::from_parts(
        VisitplanConfig::default(),
        SledStore::temporary().unwrap(),
        Arc::new(FixedClock::on(day(1))),
    )
    .unwrap()
}

fn command(args: &[&str]) -> Commands {
    let mut argv = vec!["visitplan"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap().command
}

fn import_fixture(ctx: &RunContext, dir: &TempDir) {
    let data = dataset(outbreak(1), vec![contact("c1", day(1), day(4)), contact("c2", day(1), day(4))]);
    let file = dir.path().join("dataset.json");
    std::fs::write(&file, serde_json::to_string(&data).unwrap()).unwrap();
    let output = ctx
        .execute(&command(&["import", "--file", file.to_str().unwrap()]))
        .unwrap();
    assert!(output.contains("Contacts: 2"));
}

#[test]
fn import_generate_list_and_modify() {
    let dir = TempDir::new().unwrap();
    let ctx = context();
    import_fixture(&ctx, &dir);

    let output = ctx
        .execute(&command(&[
            "generate",
            "--outbreak",
            "ob",
            "--start-date",
            "2024-01-01",
            "--end-date",
            "2024-01-04",
            "--format",
            "json",
        ]))
        .unwrap();
    let response: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(response["count"], 8);

    let listed = ctx
        .execute(&command(&["list", "--outbreak", "ob", "--contact", "c2", "--format", "json"]))
        .unwrap();
    let rows: Vec<serde_json::Value> = serde_json::from_str(&listed).unwrap();
    assert_eq!(rows.len(), 4);

    let output = ctx
        .execute(&command(&[
            "bulk-modify",
            "--outbreak",
            "ob",
            "--from",
            "2024-01-03",
            "--set-status",
            "seen_ok",
            "--clear-team",
        ]))
        .unwrap();
    assert_eq!(output, "Updated 4 follow-ups");

    let touched: Vec<_> = all_visits(ctx.store())
        .into_iter()
        .filter(|v| v.status == FollowUpStatus::SeenOk)
        .collect();
    assert_eq!(touched.len(), 4);
    assert!(touched.iter().all(|v| v.team_id.is_none() && v.date >= day(3)));

    let table = ctx
        .execute(&command(&["list", "--outbreak", "ob", "--status", "seen_ok"]))
        .unwrap();
    assert!(table.contains("seen_ok"));
    assert!(table.ends_with("4 follow-ups"));
}

#[test]
fn bad_status_flag_is_an_invalid_parameter() {
    let ctx = context();
    let err = ctx
        .execute(&command(&["list", "--outbreak", "ob", "--status", "finished"]))
        .unwrap_err();
    assert!(map_error(&err).starts_with("Invalid parameters:"));
}

#[test]
fn generate_for_unknown_outbreak_fails() {
    let ctx = context();
    let err = ctx
        .execute(&command(&["generate", "--outbreak", "nope"]))
        .unwrap_err();
    assert!(map_error(&err).contains("nope"));
}
