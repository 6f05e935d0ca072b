use std::io::{self, Write};

use crate::config::Config;
use crate::presentation::{ResultView, SentimentView, TrackerView};
use crate::tracker::{FailureKind, TrackerState};

const BAR_WIDTH: usize = 30;

pub fn banner(config: &Config) {
    println!("COBS Bread Research Tracker");
    println!("API: {}", config.server.base_url);
    println!("Type a bakery location to start, or /help for commands.");
}

pub fn help() {
    println!("Commands:");
    println!("  <location>      Start research for a bakery location");
    println!("  /status         Show the current task");
    println!("  /reset          Cancel tracking and start over");
    println!("  /help           Show commands");
    println!("  /quit | /exit   Exit");
}

pub fn info(msg: &str) {
    println!("{}", msg);
}

pub fn error(msg: &str) {
    eprintln!("error: {}", msg);
}

// Full redraw after a state change
pub fn transition(view: &TrackerView, download_url: Option<&str>) {
    end_progress_line();
    match view.state {
        TrackerState::Idle => {
            println!("Ready. Enter a bakery location.");
        }
        TrackerState::Submitting => {
            println!("Starting research...");
        }
        TrackerState::Polling => {
            if let (Some(id), Some(location)) = (&view.task_id, &view.location) {
                println!("Researching {} (task {})", location, id);
            }
            println!("This usually takes 10-20 minutes. Type /reset to cancel.");
            progress(view);
        }
        TrackerState::Completed => {
            println!("Research complete.");
            if let Some(result) = &view.result {
                result_section(result);
            }
            if let Some(url) = download_url {
                println!("Download report: {}", url);
            }
            println!("Type /reset to research another location.");
        }
        TrackerState::Failed => {
            if let Some(failure) = &view.failure {
                let heading = match failure.kind {
                    FailureKind::Submission => "Could not start research",
                    FailureKind::TerminalJob => "Research failed",
                    FailureKind::ConnectivityExhausted => "Connection lost",
                };
                println!("{}: {}", heading, failure.message);
            }
            if view.input_enabled {
                println!("Enter a location to try again.");
            } else {
                println!("Type /reset to start over.");
            }
        }
    }
}

// Rewrites the single in-place progress line
pub fn progress(view: &TrackerView) {
    let filled = ((view.progress_percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    print!(
        "\r[{}{}] {:>3.0}%  {}  {}\x1b[K",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        view.progress_percent,
        view.elapsed,
        view.status_text.as_deref().unwrap_or_default()
    );
    let _ = io::stdout().flush();
}

fn end_progress_line() {
    print!("\r\x1b[K");
    let _ = io::stdout().flush();
}

fn result_section(result: &ResultView) {
    println!("  Report length: {} characters", result.report_length);
    println!("  Time taken: {} min", result.elapsed_minutes);
    if let Some(sentiment) = &result.sentiment {
        sentiment_section(sentiment);
    }
}

fn sentiment_section(sentiment: &SentimentView) {
    println!("  Sentiment");
    if let Some(score) = &sentiment.score {
        println!("    Score: {} / 5", score);
    }
    if let Some(label) = &sentiment.label {
        println!("    Overall: {}", label);
    }
    if let Some(confidence) = &sentiment.confidence {
        println!("    Confidence: {}", confidence);
    }
    if let Some(total) = &sentiment.total_reviews {
        println!("    Reviews analyzed: {}", total);
    }
    if !sentiment.distribution.is_empty() {
        println!("    Distribution:");
        for bucket in &sentiment.distribution {
            println!("      {:<14} {:>5.1}%", bucket.bucket.label(), bucket.percent);
        }
    }
    if !sentiment.categories.is_empty() {
        println!("    Categories:");
        for category in &sentiment.categories {
            println!("      {:<16} {}", category.category.label(), category.label);
        }
    }
}
