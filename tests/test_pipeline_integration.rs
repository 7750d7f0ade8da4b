//! End-to-end pipeline tests over real gzip log fixtures
//!
//! Each test builds a clean-data folder in a tempdir, writes one
//! gzip-compressed newline-delimited JSON file per date, runs the full
//! pipeline, and asserts on the finalized result bundle.

use eventflow::{run, Config, ConfigOptions, PipelineError};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

const SESSION_A: &str = "9f2c1a40-0b1e-4e8a-b8a1-3c74d2e90f11";

/// Build a run config over `num_dates` dates starting 20160201, rooted in
/// the tempdir.
fn test_config(dir: &TempDir, num_dates: u32, options: ConfigOptions) -> Config {
    let config = Config::new(ConfigOptions {
        start: Some(20160201),
        end: Some(20160200 + num_dates),
        data_folder: Some(dir.path().to_path_buf()),
        quiet: true,
        ..options
    })
    .unwrap();
    assert_eq!(config.num_dates, num_dates as usize);
    config
}

/// Write one gzip'd log file into the clean-data folder.
fn write_log_file(clean_folder: &Path, date: u32, lines: &[Value]) {
    std::fs::create_dir_all(clean_folder).unwrap();
    let path = clean_folder.join(format!("metrics-{}.log.gz", date));
    let mut encoder = GzEncoder::new(std::fs::File::create(path).unwrap(), Compression::fast());
    for line in lines {
        writeln!(encoder, "{}", line).unwrap();
    }
    encoder.finish().unwrap();
}

fn page_visit(session_id: &str, site_id: &str, locations: &[&str]) -> Value {
    json!({
        "name": "page-visited",
        "siteId": site_id,
        "sessionId": session_id,
        "meta": {
            "locations": locations,
            "domain": locations.first().copied().unwrap_or(""),
            "ua": { "browser": "Firefox", "browserVersion": 44.0, "groups": ["desktop"] },
            "pseudoEvents": ["operational"],
        },
    })
}

#[tokio::test]
async fn test_nonbounce_double_fire_end_to_end() {
    // A session's second operational page visit matches both session rules,
    // so that single line emits page-visited::nonbounce twice
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, 2, Default::default());

    write_log_file(
        &config.clean_data_folder,
        20160201,
        &[page_visit(SESSION_A, "s-1", &["www.example.com"])],
    );
    write_log_file(
        &config.clean_data_folder,
        20160202,
        &[
            page_visit(SESSION_A, "s-1", &["www.example.com"]),
            page_visit(SESSION_A, "s-1", &["www.example.com"]),
        ],
    );

    let bundle = run(config).await.unwrap();
    assert!(bundle.missing_days.is_empty());

    let by_name = &bundle.reports["eventTotals"]["byNameOnly"];
    assert_eq!(by_name["page-visited"], json!([1, 2]));
    // Date 0's lone visit never becomes non-bounce; date 1's second visit
    // fires both augmentation rules
    assert_eq!(by_name["page-visited::nonbounce"], json!([0, 2]));
    assert_eq!(by_name["page-visited::operational"], json!([1, 2]));
}

#[tokio::test]
async fn test_missing_file_is_recorded_and_run_continues() {
    // 15 files scheduled, pool of 10, exactly one file absent
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, 15, Default::default());

    for (date_index, date) in config.dates.clone().into_iter().enumerate() {
        if date_index == 4 {
            continue; // The missing day
        }
        write_log_file(
            &config.clean_data_folder,
            date,
            &[page_visit(SESSION_A, "s-1", &["www.example.com"])],
        );
    }

    let bundle = run(config).await.unwrap();
    assert_eq!(bundle.missing_days, vec![4]);

    // All 14 present files were processed
    let visits = bundle.reports["eventTotals"]["byNameOnly"]["page-visited"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_u64().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(visits.iter().sum::<u64>(), 14);
    assert_eq!(visits[4], 0);
}

#[tokio::test]
async fn test_event_step_sampling_is_deterministic() {
    // Of 9 lines with eventStep 3, exactly lines 3, 6, 9 are parsed
    let dir = TempDir::new().unwrap();
    let config = test_config(
        &dir,
        1,
        ConfigOptions {
            event_step: Some(3),
            ..Default::default()
        },
    );

    let lines: Vec<Value> = (1..=9)
        .map(|n| json!({ "name": format!("event-{}", n) }))
        .collect();
    write_log_file(&config.clean_data_folder, 20160201, &lines);

    let bundle = run(config).await.unwrap();
    let by_name = bundle.reports["eventTotals"]["byNameOnly"].as_object().unwrap();

    let mut names: Vec<&str> = by_name.keys().map(String::as_str).collect();
    names.sort();
    assert_eq!(names, vec!["event-3", "event-6", "event-9"]);
}

#[tokio::test]
async fn test_keep_top_events_discards_later_samples() {
    // eventStep 3 within the top 7 lines keeps only lines 3 and 6
    let dir = TempDir::new().unwrap();
    let config = test_config(
        &dir,
        1,
        ConfigOptions {
            event_step: Some(3),
            keep_top_events: Some(7),
            ..Default::default()
        },
    );

    let lines: Vec<Value> = (1..=20)
        .map(|n| json!({ "name": format!("event-{}", n) }))
        .collect();
    write_log_file(&config.clean_data_folder, 20160201, &lines);

    let bundle = run(config).await.unwrap();
    let by_name = bundle.reports["eventTotals"]["byNameOnly"].as_object().unwrap();

    let mut names: Vec<&str> = by_name.keys().map(String::as_str).collect();
    names.sort();
    assert_eq!(names, vec!["event-3", "event-6"]);
}

#[tokio::test]
async fn test_malformed_json_line_aborts_run() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, 1, Default::default());

    std::fs::create_dir_all(&config.clean_data_folder).unwrap();
    let path = config.clean_data_folder.join("metrics-20160201.log.gz");
    let mut encoder =
        GzEncoder::new(std::fs::File::create(path).unwrap(), Compression::fast());
    writeln!(encoder, "{}", page_visit(SESSION_A, "s-1", &["a.com"])).unwrap();
    writeln!(encoder, "this is not json").unwrap();
    encoder.finish().unwrap();

    match run(config).await {
        Err(PipelineError::Parse { file, line, .. }) => {
            assert_eq!(file, "metrics-20160201.log.gz");
            assert_eq!(line, 2);
        }
        other => panic!("expected Parse error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_corrupt_gzip_stream_aborts_run() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, 1, Default::default());

    std::fs::create_dir_all(&config.clean_data_folder).unwrap();
    let path = config.clean_data_folder.join("metrics-20160201.log.gz");
    std::fs::write(path, b"definitely not a gzip stream").unwrap();

    assert!(matches!(
        run(config).await,
        Err(PipelineError::Stream { .. })
    ));
}

#[tokio::test]
async fn test_full_report_suite_end_to_end() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, 3, Default::default());

    let feedback = json!({
        "name": "feedback-sent",
        "siteId": "s-1",
        "details": { "rating": 5, "feedbackText": "love it" },
        "meta": { "domain": "www.example.com", "ua": { "browser": "Firefox" } },
    });
    let ab_visit = json!({
        "name": "page-visited",
        "siteId": "s-1",
        "abTest": "checkout.button-color.red",
        "meta": {
            "locations": ["www.example.com"],
            "domain": "www.example.com",
            "ua": { "browser": "Firefox" },
        },
    });

    // Enough visits to keep www.example.com above the noise threshold
    let mut day_one: Vec<Value> = (0..12)
        .map(|_| page_visit(SESSION_A, "s-1", &["www.example.com"]))
        .collect();
    day_one.push(feedback);
    write_log_file(&config.clean_data_folder, 20160201, &day_one);
    write_log_file(&config.clean_data_folder, 20160202, &[ab_visit.clone()]);
    write_log_file(&config.clean_data_folder, 20160203, &[ab_visit]);

    let bundle = run(config).await.unwrap();

    // SiteInfo kept the location and knows the site
    let site_info = &bundle.reports["siteInfo"];
    assert_eq!(site_info["allSiteIds"], json!(["#s-1"]));
    assert!(site_info["locationToSiteIdMap"]["www.example.com"]["#s-1"]
        .as_u64()
        .unwrap() >= 12);
    assert_eq!(site_info["uninterestingLocations"], json!([]));

    // ABTest sliced to its observed span [1, 2] with a baseline injected
    let variants = &bundle.reports["abTest"]["eventCount"]["page-visited"]["checkout.button-color"];
    assert_eq!(variants["red"], json!([1, 1]));
    assert_eq!(variants["*base*"], json!([1, 1]));
    assert_eq!(
        bundle.reports["abTest"]["dateInfo"]["checkout.button-color"],
        json!({ "startIndex": 1, "endIndex": 2 })
    );

    // Feedback grouped under its rating in all three partitions
    let feedback_report = &bundle.reports["feedback"];
    assert_eq!(feedback_report["all"]["5"][0]["text"], json!("love it"));
    assert_eq!(
        feedback_report["byUa"]["Firefox"]["5"][0]["text"],
        json!("love it")
    );
    assert_eq!(
        feedback_report["byDomain"]["www.example.com"]["5"][0]["text"],
        json!("love it")
    );
}

#[tokio::test]
async fn test_all_files_missing() {
    // No files on disk at all: every day is missing, reports are empty
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, 3, Default::default());

    let bundle = run(config).await.unwrap();

    let mut missing = bundle.missing_days.clone();
    missing.sort();
    assert_eq!(missing, vec![0, 1, 2]);
    assert_eq!(
        bundle.reports["eventTotals"]["byNameOnly"],
        json!({})
    );
}
