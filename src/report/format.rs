//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the segmentation/sampling code stays clean and testable
//! - output changes are localized

use chrono::NaiveDate;

use crate::domain::{GroupTargets, RunConfig};
use crate::io::ingest::IngestedOrders;
use crate::report::RfPivot;
use crate::rfm::CustomerSummary;
use crate::sample::SampleRun;
use crate::segment::SegmentationStats;

/// Format an RF pivot: frequency rows, recency columns, each cell as
/// `count (share%)`. Highest ordinals come first on both axes.
pub fn format_pivot(title: &str, pivot: &RfPivot) -> String {
    let mut out = String::new();
    out.push_str(&format!("{title} (n={})\n", pivot.total));

    if pivot.is_empty() {
        out.push_str("  (no customers)\n");
        return out;
    }

    let mut header = format!("{:<6}", "");
    for r in &pivot.recency {
        header.push_str(&format!(" {:>16}", format!("R{r}")));
    }
    out.push_str(header.trim_end());
    out.push('\n');

    let mut rule = format!("{:-<6}", "");
    for _ in &pivot.recency {
        rule.push_str(&format!(" {:-<16}", ""));
    }
    out.push_str(&rule);
    out.push('\n');

    for &f in &pivot.frequency {
        let mut line = format!("{:<6}", format!("F{f}"));
        for &r in &pivot.recency {
            let cell = format!("{} ({:.2}%)", pivot.count(f, r), 100.0 * pivot.share(f, r));
            line.push_str(&format!(" {cell:>16}"));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// Per-segment allocation table. Shortfall segments are marked with `!`.
pub fn format_allocations(run: &SampleRun, groups: &GroupTargets) -> String {
    let mut out = String::new();
    out.push_str("Allocation by segment (desired -> final):\n");

    let mut header = format!("  {:<10} {:>8} {:>8}", "segment", "size", "share");
    for name in groups.names() {
        header.push_str(&format!(" {:>16}", truncate(name, 16)));
    }
    header.push_str(&format!(" {:>8}", "left"));
    out.push_str(&header);
    out.push('\n');

    for a in &run.allocations {
        let mark = if a.shortfall { "!" } else { " " };
        let mut line = format!("{mark} {:<10} {:>8} {:>7.2}%", a.segment.to_string(), a.size, 100.0 * a.share);
        for (desired, count) in a.desired.iter().zip(&a.counts) {
            line.push_str(&format!(" {:>16}", format!("{desired} -> {count}")));
        }
        line.push_str(&format!(" {:>8}", a.unassigned()));
        out.push_str(&line);
        out.push('\n');
    }

    let shortfalls = run.allocations.iter().filter(|a| a.shortfall).count();
    if shortfalls > 0 {
        out.push_str(&format!("! {shortfalls} segment(s) could not cover their desired counts\n"));
    }

    out
}

/// Format the input side of a run: as-of date, cleaning, and aggregation.
pub fn format_run_summary(as_of: NaiveDate, ingest: Option<&IngestedOrders>, summary: &CustomerSummary) -> String {
    let mut out = String::new();

    out.push_str("=== rfm - RFM Segmentation & Stratified Sampling ===\n");
    out.push_str(&format!("As-of: {as_of}\n"));

    if let Some(ingest) = ingest {
        out.push_str(&format!(
            "Orders: read={} | used={} | dropped={} | undated={}\n",
            ingest.rows_read,
            ingest.rows_used(),
            ingest.row_errors.len(),
            ingest.undated_rows,
        ));
    }
    out.push_str(&format!(
        "Customers: n={} | dropped (no email)={}\n",
        summary.customers.len(),
        summary.dropped_missing_email
    ));

    out
}

/// Format the segmentation settings and what each step kept.
pub fn format_segmentation(config: &RunConfig, stats: &SegmentationStats) -> String {
    let mut out = String::new();

    out.push_str(&format!("Recency edges  : {}\n", config.recency_bins));
    out.push_str(&format!("Frequency edges: {}\n", config.frequency_bins));
    match config.max_recency {
        Some(max) => out.push_str(&format!("Max recency: {max} months\n")),
        None => out.push_str("Max recency: off\n"),
    }
    out.push_str(&format!(
        "Segmentation: input={} | filtered={} | unbinned={} | segmented={}\n",
        stats.input, stats.filtered_out, stats.unbinned, stats.segmented
    ));

    out
}

/// Realized vs requested size per group.
pub fn format_group_sizes(run: &SampleRun, seed: u64) -> String {
    let mut out = String::new();

    out.push_str(&format!("Groups (seed={seed}):\n"));
    for g in &run.groups {
        let realized = g.customers.len() as u64;
        let note = if realized < g.group.size { " (short)" } else { "" };
        out.push_str(&format!(
            "- {:<16} {:>8} / {:<8}{note}\n",
            truncate(&g.group.name, 16),
            realized,
            g.group.size
        ));
    }
    out.push_str(&format!("Total sampled: {}\n", run.total_sampled()));

    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
