//! Console summary of a finalized run.
//!
//! Mirrors the Slack summary: jobs ordered by failure count, categories
//! within a job by count, a representative message per category and up
//! to three build links.

use owo_colors::OwoColorize;

use buildwatch_core::FailureReport;

const MAX_LINKED_BUILDS: usize = 3;

/// Print the run summary to stdout.
pub fn print_summary(report: &FailureReport, failed_jobs: usize, failed_builds: usize) {
    println!();
    println!("{}", "=== JENKINS FAILURE EXCEPTIONS SUMMARY ===".bold());
    println!();
    println!("Failed jobs: {}   Failed builds: {}", failed_jobs, failed_builds);
    println!();

    if report.is_empty() {
        println!(
            "{}",
            "All systems healthy! No failed builds in the scan window.".green()
        );
        return;
    }

    for job in &report.jobs {
        println!(
            "{} {} ({} failures)",
            "●".red(),
            job.job.bold(),
            job.total_failures()
        );

        for category in &job.categories {
            println!("   {} ({} occurrences)", category.category.yellow(), category.count);
            if let Some(message) = category.latest_message() {
                println!("      {}", message);
            }

            let refs: Vec<&str> = category.build_refs().collect();
            if refs.is_empty() {
                println!("      Build URLs: none available");
            } else {
                println!("      Build URLs:");
                for url in refs.iter().take(MAX_LINKED_BUILDS) {
                    println!("         {}", url.dimmed());
                }
                if refs.len() > MAX_LINKED_BUILDS {
                    println!("         ... and {} more", refs.len() - MAX_LINKED_BUILDS);
                }
            }
            println!();
        }
        println!();
    }
}
