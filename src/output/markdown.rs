//! Markdown summary of the index record repository

use crate::output::stats::IndexStatistics;
use crate::output::OutputResult;
use crate::storage::{IndexRecord, RunRecord};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Degraded records listed in the summary
const DEGRADED_LISTED: usize = 20;

/// Writes the markdown summary to `output_path`
pub fn write_markdown_summary(
    records: &[IndexRecord],
    last_run: Option<&RunRecord>,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_summary(records, last_run);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats the repository as markdown
pub fn format_markdown_summary(records: &[IndexRecord], last_run: Option<&RunRecord>) -> String {
    let stats = IndexStatistics::from_records(records);
    let mut md = String::new();

    md.push_str("# Site Index Summary\n\n");

    if let Some(run) = last_run {
        md.push_str("## Last Index Run\n\n");
        md.push_str(&format!("- **Run ID**: {}\n", run.id));
        md.push_str(&format!("- **Started**: {}\n", run.started_at));
        if let Some(finished) = &run.finished_at {
            md.push_str(&format!("- **Finished**: {}\n", finished));
        }
        md.push_str(&format!("- **Status**: {}\n", run.status.to_db_string()));
        md.push_str(&format!("- **Config Hash**: {}\n\n", run.config_hash));
    }

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Total Records**: {}\n", stats.total_records));
    md.push_str(&format!(
        "- **Degraded Records**: {}\n",
        stats.degraded_records
    ));
    md.push_str(&format!(
        "- **Analyzed**: {:.2}%\n",
        stats.analyzed_rate()
    ));
    md.push_str(&format!(
        "- **Average Relevance**: {:.2}\n\n",
        stats.average_relevance
    ));

    push_table(&mut md, "Content Types", "Type", &stats.content_types);
    push_table(&mut md, "Languages", "Language", &stats.languages);
    push_table(&mut md, "Content Quality", "Quality", &stats.quality);
    push_table(&mut md, "Sentiment", "Sentiment", &stats.sentiment);
    push_table(&mut md, "Target Audiences", "Audience", &stats.audiences);
    push_table(&mut md, "Top Keywords", "Keyword", &stats.top_keywords);
    push_table(&mut md, "Top Topics", "Topic", &stats.top_topics);

    let degraded: Vec<&IndexRecord> = records.iter().filter(|r| r.is_degraded()).collect();
    if !degraded.is_empty() {
        md.push_str("## Degraded Records\n\n");
        md.push_str("| URL | Reason |\n");
        md.push_str("|-----|--------|\n");
        for record in degraded.iter().take(DEGRADED_LISTED) {
            md.push_str(&format!(
                "| {} | {} |\n",
                record.url,
                record.error.as_deref().unwrap_or_default()
            ));
        }
        if degraded.len() > DEGRADED_LISTED {
            md.push_str(&format!(
                "\n... and {} more\n",
                degraded.len() - DEGRADED_LISTED
            ));
        }
        md.push('\n');
    }

    md
}

fn push_table(md: &mut String, heading: &str, column: &str, rows: &[(String, u64)]) {
    if rows.is_empty() {
        return;
    }
    md.push_str(&format!("## {}\n\n", heading));
    md.push_str(&format!("| {} | Count |\n", column));
    md.push_str("|------|-------|\n");
    for (value, count) in rows {
        md.push_str(&format!("| {} | {} |\n", value, count));
    }
    md.push('\n');
}
