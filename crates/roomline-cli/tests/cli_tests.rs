//! Integration tests for the `roomline` CLI binary.
//!
//! Exercises the slots, durations, check, and book subcommands against the
//! studio.json fixture: one UTC room, 09:00–22:00, with a confirmed booking
//! 10:00–12:00 on 2026-09-14.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;

fn scenario_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/studio.json")
}

// ─────────────────────────────────────────────────────────────────────────────
// Slots subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn slots_lists_gaps_around_the_existing_booking() {
    Command::cargo_bin("roomline")
        .unwrap()
        .args([
            "slots",
            "-s",
            scenario_path(),
            "--room",
            "studio-a",
            "--date",
            "2026-09-14",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("2026-09-14 09:00 - 10:00  (1 hour)"))
        .stdout(predicate::str::contains("2026-09-14 12:00 - 22:00  (10 hours)"));
}

#[test]
fn slots_for_an_empty_day_span_the_whole_window() {
    Command::cargo_bin("roomline")
        .unwrap()
        .args([
            "slots",
            "-s",
            scenario_path(),
            "--room",
            "studio-a",
            "--date",
            "2026-09-15",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("09:00 - 22:00  (13 hours)"));
}

#[test]
fn unknown_room_fails_with_a_message() {
    Command::cargo_bin("roomline")
        .unwrap()
        .args([
            "slots",
            "-s",
            scenario_path(),
            "--room",
            "vault",
            "--date",
            "2026-09-14",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("vault"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Durations subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn durations_near_closing_are_capped() {
    // 20:00 with a 22:00 close: 1h, 1.5h, 2h fit.
    Command::cargo_bin("roomline")
        .unwrap()
        .args([
            "durations",
            "-s",
            scenario_path(),
            "--room",
            "studio-a",
            "--start",
            "2026-09-14T20:00:00Z",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("60 min  1 hour"))
        .stdout(predicate::str::contains("90 min  1.5 hours"))
        .stdout(predicate::str::contains("120 min  2 hours"))
        .stdout(predicate::str::contains("150").not());
}

#[test]
fn durations_inside_a_booking_are_empty() {
    Command::cargo_bin("roomline")
        .unwrap()
        .args([
            "durations",
            "-s",
            scenario_path(),
            "--room",
            "studio-a",
            "--start",
            "2026-09-14T11:00:00Z",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("No bookable durations"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Check subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn check_reports_conflict_with_the_seed_booking() {
    Command::cargo_bin("roomline")
        .unwrap()
        .args([
            "check",
            "-s",
            scenario_path(),
            "--room",
            "studio-a",
            "--start",
            "2026-09-14T10:00:00Z",
            "--end",
            "2026-09-14T11:00:00Z",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("conflict with booking"))
        .stdout(predicate::str::contains("60 minutes overlap"));
}

#[test]
fn check_passes_for_a_touching_interval() {
    Command::cargo_bin("roomline")
        .unwrap()
        .args([
            "check",
            "-s",
            scenario_path(),
            "--room",
            "studio-a",
            "--start",
            "2026-09-14T12:00:00Z",
            "--end",
            "2026-09-14T13:00:00Z",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("available"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Book subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn book_a_free_interval_succeeds_and_prices_it() {
    Command::cargo_bin("roomline")
        .unwrap()
        .args([
            "book",
            "-s",
            scenario_path(),
            "--room",
            "studio-a",
            "--user",
            "grace",
            "--start",
            "2026-09-14T13:00:00Z",
            "--minutes",
            "90",
            "--now",
            "2026-09-14T08:00:00Z",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("booked"))
        .stdout(predicate::str::contains("1.5 hours"))
        .stdout(predicate::str::contains("3000 cents"));
}

#[test]
fn book_an_occupied_interval_is_rejected() {
    Command::cargo_bin("roomline")
        .unwrap()
        .args([
            "book",
            "-s",
            scenario_path(),
            "--room",
            "studio-a",
            "--user",
            "grace",
            "--start",
            "2026-09-14T10:00:00Z",
            "--minutes",
            "60",
            "--now",
            "2026-09-14T08:00:00Z",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("choose a different time"));
}

#[test]
fn book_off_the_half_hour_grid_is_rejected() {
    Command::cargo_bin("roomline")
        .unwrap()
        .args([
            "book",
            "-s",
            scenario_path(),
            "--room",
            "studio-a",
            "--user",
            "grace",
            "--start",
            "2026-09-14T13:00:00Z",
            "--minutes",
            "45",
            "--now",
            "2026-09-14T08:00:00Z",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("half-hour grid"));
}
