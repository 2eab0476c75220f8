//! Orders in, labeled sample groups out.
//!
//! These tests drive the public pipeline the way the `rfm` binary does,
//! minus argument parsing.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use rfm_sampler::app::pipeline::{InputSource, load_customers, run_from_orders, run_sampling};
use rfm_sampler::domain::{BucketAxis, GroupTargets, OrderRow, RunConfig, SampleGroup};
use rfm_sampler::error::{AppError, DataError, SegmentationError};
use rfm_sampler::io::{
    CUSTOMER_SUMMARY_FILE, export_customer_summary, export_sample_groups, load_customer_summary, read_orders,
};
use rfm_sampler::sample::SampleRun;
use rfm_sampler::segment::parse_bin_edges;

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

fn config(recency: &str, frequency: &str, groups: &[(&str, u64)], seed: u64) -> RunConfig {
    RunConfig {
        as_of: as_of(),
        recency_bins: parse_bin_edges(BucketAxis::Recency, recency).unwrap(),
        frequency_bins: parse_bin_edges(BucketAxis::Frequency, frequency).unwrap(),
        max_recency: Some(36),
        groups: GroupTargets::new(groups.iter().map(|(n, s)| SampleGroup::new(*n, *s)).collect()).unwrap(),
        seed,
        out_dir: "unused".into(),
        prefix: String::new(),
    }
}

fn order(customer: &str, order: &str, day: &str) -> OrderRow {
    OrderRow {
        customer_id: customer.to_string(),
        customer_email: Some(format!("{customer}@example.com")),
        order_id: order.to_string(),
        day: NaiveDate::parse_from_str(day, "%Y-%m-%d").ok(),
        gross_sales: 20.0,
        discounts: -2.0,
        net_sales: 18.0,
    }
}

/// Three one-time June buyers (F1, R1) and three repeat buyers last seen in
/// May (F2, R2).
fn six_customers() -> Vec<OrderRow> {
    let mut rows = Vec::new();
    for id in ["a1", "a2", "a3"] {
        rows.push(order(id, &format!("{id}-1"), "2024-06-12"));
    }
    for id in ["b1", "b2", "b3"] {
        rows.push(order(id, &format!("{id}-1"), "2024-01-03"));
        rows.push(order(id, &format!("{id}-2"), "2024-05-20"));
    }
    rows
}

/// `n` customers spread over many segments with varied histories.
fn population(n: usize) -> Vec<OrderRow> {
    let mut rows = Vec::new();
    for i in 0..n {
        let id = format!("c{i:04}");
        let orders = 1 + i % 4;
        for k in 0..orders {
            let month = 1 + ((i / 4) + k) % 12;
            let year = 2022 + (i % 3) as i32;
            rows.push(order(&id, &format!("{id}-{k}"), &format!("{year}-{month:02}-15")));
        }
    }
    rows
}

fn membership(run: &SampleRun) -> Vec<(String, BTreeSet<String>)> {
    run.groups
        .iter()
        .map(|g| {
            let ids = g.customers.iter().map(|c| c.customer.customer_id.clone()).collect();
            (g.group.name.clone(), ids)
        })
        .collect()
}

#[test]
fn six_customers_split_evenly_into_three_groups() {
    let config = config("0,1,2,inf", "1,2,inf", &[("Test", 2), ("Control", 2), ("Holdout", 2)], 42);
    let (summary, output) = run_from_orders(&six_customers(), &config).unwrap();

    assert_eq!(summary.customers.len(), 6);
    let counts = output.segmented.segment_counts();
    assert_eq!(counts.values().copied().collect::<Vec<_>>(), [3, 3], "{counts:?}");
    assert_eq!(
        counts.keys().map(|k| k.to_string()).collect::<Vec<_>>(),
        ["F1_R1", "F2_R2"]
    );

    let sizes: Vec<usize> = output.sample.groups.iter().map(|g| g.customers.len()).collect();
    assert_eq!(sizes, [2, 2, 2]);

    let mut seen = HashSet::new();
    for (_, ids) in membership(&output.sample) {
        for id in ids {
            assert!(seen.insert(id.clone()), "{id} drawn twice");
        }
    }
    assert_eq!(seen.len(), 6);

    // One customer from each segment per group.
    for g in &output.sample.groups {
        let segments: BTreeSet<String> = g.customers.iter().map(|c| c.segment().to_string()).collect();
        assert_eq!(segments.len(), 2, "{}: {segments:?}", g.group.name);
    }
}

#[test]
fn same_seed_same_groups_regardless_of_row_order() {
    let config = config("0,3,6,12,24,inf", "1,2,3,inf", &[("Test", 40), ("Control", 40), ("Holdout", 80)], 42);
    let rows = population(400);

    let (_, first) = run_from_orders(&rows, &config).unwrap();
    let (_, second) = run_from_orders(&rows, &config).unwrap();
    assert_eq!(membership(&first.sample), membership(&second.sample));

    let mut reversed = rows.clone();
    reversed.reverse();
    let (_, third) = run_from_orders(&reversed, &config).unwrap();
    assert_eq!(membership(&first.sample), membership(&third.sample));

    let other_seed = RunConfig { seed: 43, ..config };
    let (_, fourth) = run_from_orders(&rows, &other_seed).unwrap();
    assert_ne!(membership(&first.sample), membership(&fourth.sample));
}

#[test]
fn oversized_targets_exhaust_every_segment() {
    let config = config("0,3,6,12,24,inf", "1,2,3,inf", &[("Test", 500), ("Control", 500)], 7);
    let (summary, output) = run_from_orders(&population(120), &config).unwrap();

    let segmented = output.segmented.customers.len();
    assert!(segmented <= summary.customers.len());
    assert_eq!(output.sample.total_sampled(), segmented);
    for a in &output.sample.allocations {
        assert!(a.shortfall, "{}", a.segment);
        assert_eq!(a.assigned(), a.size);
    }
}

#[test]
fn stale_population_is_a_data_error() {
    let mut config = config("0,1,2,inf", "1,2,inf", &[("Test", 1)], 42);
    config.max_recency = Some(0);
    let rows = vec![order("old", "o1", "2019-01-01")];

    let err = run_from_orders(&rows, &config).unwrap_err();
    assert_eq!(err, SegmentationError::Data(DataError::EmptyAfterFilter { threshold: 0 }));
    assert_eq!(AppError::from(err).exit_code(), 3);
}

#[test]
fn csv_round_trip_through_summary_and_group_files() {
    let dir = tempfile::tempdir().unwrap();
    let orders_path = dir.path().join("orders.csv");
    std::fs::write(
        &orders_path,
        "customer_id,order_id,day,customer_email,gross_sales,discounts,net_sales
a1,o1,2024-06-12,a1@example.com,10.00,0,10.00
a2,o2,2024-06-13,a2@example.com,10.00,0,10.00
b1,o3,2024-01-03,b1@example.com,5.00,0,5.00
b1,o4,2024-05-20,b1@example.com,5.00,0,5.00
b2,o5,2024-02-03,b2@example.com,5.00,0,5.00
b2,o6,2024-05-21,b2@example.com,5.00,0,5.00
,o7,2024-05-21,x@example.com,5.00,0,5.00
",
    )
    .unwrap();

    let loaded = load_customers(&InputSource::Orders(vec![orders_path]), as_of()).unwrap();
    let ingest = loaded.ingest.as_ref().unwrap();
    assert_eq!(ingest.rows_read, 7);
    assert_eq!(ingest.row_errors.len(), 1);

    let out_dir = dir.path().join("out");
    let summary_path = out_dir.join(CUSTOMER_SUMMARY_FILE);
    export_customer_summary(&summary_path, &loaded.summary.customers).unwrap();
    let reloaded = load_customer_summary(&summary_path).unwrap();
    assert_eq!(reloaded, loaded.summary.customers);

    let config = config("0,1,2,inf", "1,2,inf", &[("Test", 2), ("Control", 2)], 42);
    let from_orders = run_sampling(&loaded.summary.customers, &config).unwrap();
    let from_summary = run_sampling(&reloaded, &config).unwrap();
    assert_eq!(membership(&from_orders.sample), membership(&from_summary.sample));

    let written = export_sample_groups(&out_dir, "Spring_", &from_summary.sample).unwrap();
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["Spring_Test_Group.csv", "Spring_Control_Group.csv", "Spring_Combined_Groups.csv"]);

    let mut reader = csv::Reader::from_path(&written[2]).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.get(headers.len() - 1), Some("group"));
    let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(rows.len(), from_summary.sample.total_sampled());
}

#[test]
fn reads_orders_from_memory_like_files() {
    let csv = "customer_id,order_id,day,customer_email,gross_sales,discounts,net_sales\nc1,o1,2024-06-01,c1@x.com,1,0,1\n";
    let ingest = read_orders(csv.as_bytes(), "inline").unwrap();
    let config = config("0,1,inf", "1,inf", &[("Test", 1)], 42);
    let (_, output) = run_from_orders(&ingest.rows, &config).unwrap();
    assert_eq!(output.sample.group("Test").map(|g| g.customers.len()), Some(1));
}

#[test]
fn several_order_files_are_concatenated() {
    let dir = tempfile::tempdir().unwrap();
    let header = "customer_id,order_id,day,customer_email,gross_sales,discounts,net_sales\n";
    let first = dir.path().join("orders_2023.csv");
    let second = dir.path().join("orders_2024.csv");
    std::fs::write(
        &first,
        format!("{header}c1,o1,2023-11-02,c1@x.com,10,0,10\nc2,o2,2023-12-01,c2@x.com,4,0,4\n,o3,2023-12-01,x@x.com,1,0,1\n"),
    )
    .unwrap();
    // o1 is exported again in the second file; it must not count twice.
    std::fs::write(
        &second,
        format!("{header}c1,o1,2023-11-02,c1@x.com,0,0,0\nc1,o4,2024-05-10,c1@x.com,6,0,6\nc2,,2024-05-11,c2@x.com,1,0,1\n"),
    )
    .unwrap();

    let loaded = load_customers(&InputSource::Orders(vec![first.clone(), second.clone()]), as_of()).unwrap();
    let ingest = loaded.ingest.as_ref().unwrap();
    assert_eq!(ingest.rows_read, 6);
    assert_eq!(ingest.rows_used(), 4);

    let sources: Vec<(String, usize)> = ingest.row_errors.iter().map(|e| (e.source.clone(), e.line)).collect();
    assert_eq!(
        sources,
        [(first.display().to_string(), 4), (second.display().to_string(), 4)]
    );

    let c1 = loaded.summary.customers.iter().find(|c| c.customer_id == "c1").unwrap();
    assert_eq!(c1.frequency, 2);
    assert_eq!(c1.last_order_date, NaiveDate::from_ymd_opt(2024, 5, 10));
    assert_eq!(c1.recency, Some(1));
    let c2 = loaded.summary.customers.iter().find(|c| c.customer_id == "c2").unwrap();
    assert_eq!(c2.frequency, 1);
}
