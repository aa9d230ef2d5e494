//! Console reports printed at the end of each command

use crate::crawler::DiscoveryReport;
use crate::pipeline::RunSummary;
use crate::search::SearchHit;

/// Characters of a description shown per search hit
const SNIPPET_CHARS: usize = 160;

pub fn print_discovery_report(report: &DiscoveryReport) {
    println!("=== Discovery Report ===\n");
    println!("  Run ID: {}", report.run_id);
    println!("  Seed: {}", report.seed_url);
    println!("  Pages fetched this run: {}", report.pages_this_run);
    println!("  Discovered: {}", report.discovered());
    println!("  Visited: {}", report.visited);
    println!("  Failed: {}", report.failed);
    println!("  Queued for a later run: {}", report.queued);
    println!("  Elapsed: {:.1}s", report.elapsed.as_secs_f64());

    if report.cancelled {
        println!("\nInterrupted; run `crawl` again to resume.");
    } else if report.budget_reached {
        println!("\nPage budget reached; run `crawl` again to continue.");
    }

    if !report.failure_sample.is_empty() {
        println!("\nSample failures:");
        for failure in &report.failure_sample {
            println!("  - {} ({})", failure.url, failure.reason);
        }
    }
}

pub fn print_run_summary(summary: &RunSummary) {
    println!("=== Index Run Summary ===\n");
    println!("  Run ID: {}", summary.run_id);
    println!("  Candidates: {}", summary.candidates);
    println!("  Already indexed: {}", summary.skipped);
    println!("  Scheduled: {}", summary.scheduled);
    println!(
        "  Indexed: {} ({} degraded)",
        summary.indexed, summary.degraded
    );
    println!("  Failed: {}", summary.failed);
    println!("  Remaining: {}", summary.remaining);
    println!("  Batches flushed: {}", summary.batches_flushed);
    println!("  Elapsed: {:.1}s", summary.elapsed.as_secs_f64());

    if summary.cancelled {
        println!("\nInterrupted; completed batches were kept.");
    }

    if !summary.failure_sample.is_empty() {
        println!("\nSample failures:");
        for failure in &summary.failure_sample {
            println!("  - {} ({})", failure.url, failure.reason);
        }
    }
}

pub fn print_search_hits(query: &str, hits: &[SearchHit<'_>]) {
    if hits.is_empty() {
        println!("No results for \"{}\"", query);
        return;
    }

    println!("{} result(s) for \"{}\":\n", hits.len(), query);
    for (rank, hit) in hits.iter().enumerate() {
        let record = hit.record;
        println!("{}. {} [{:.1}]", rank + 1, record.title, hit.score);
        println!("   {}", record.url);
        if !record.description.is_empty() {
            println!("   {}", snippet(&record.description));
        }
        println!(
            "   type: {}, language: {}, relevance: {:.2}",
            record.content_type, record.language, record.relevance_score
        );
        if !record.keywords.is_empty() {
            println!("   keywords: {}", record.keywords.join(", "));
        }
        println!();
    }
}

fn snippet(text: &str) -> String {
    if text.chars().count() <= SNIPPET_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(SNIPPET_CHARS).collect();
    format!("{}...", cut.trim_end())
}
