// Colored terminal output for attribution verdicts and corpus summaries.
//
// main.rs decides what to show; this module decides how it looks.

use colored::Colorize;

use crate::pipeline::{Outcome, TopicLabel, NO_DATA_MESSAGE};
use crate::retrieval::ContextHit;

/// Display the result of one analysis, including the context it was judged against.
pub fn display_outcome(outcome: &Outcome, topic: Option<&TopicLabel>, judge: &str) {
    let (verdict, context) = match outcome {
        Outcome::NoData => {
            println!("\n{}", NO_DATA_MESSAGE.yellow());
            println!("Import tweets with `quill import <file>` or loosen --author/--topic.");
            return;
        }
        Outcome::Judged { verdict, context } => (verdict, context),
    };

    println!("\n{}", format!("=== Attribution ({judge} judge) ===").bold());

    let result = if verdict.is_error() {
        verdict.result.red().bold()
    } else {
        verdict.result.bold()
    };
    println!("  Result:     {}", result);
    println!("  Confidence: {}", colorize_confidence(verdict.confidence));

    if let Some(topic) = topic {
        println!("  Topic:      {} ({:.2}%)", topic.label, topic.percent());
    }
    if let Some(explanation) = &verdict.explanation {
        println!("  Explanation: {}", explanation.dimmed());
    }

    display_context(context);
}

/// Display the retrieved neighbours, nearest first.
pub fn display_context(context: &[ContextHit]) {
    if context.is_empty() {
        return;
    }

    println!(
        "\n{}",
        format!("=== Closest tweets ({}) ===", context.len()).bold()
    );
    for (i, hit) in context.iter().enumerate() {
        let preview = super::truncate_chars(&hit.record.text, 120);
        println!(
            "  {:>2}. [{:.3}] {:<20} {}",
            i + 1,
            hit.distance,
            hit.record.author,
            preview.dimmed()
        );
    }
    println!();
}

/// Display how many records each author has in the corpus.
pub fn display_author_counts(counts: &[(String, i64)]) {
    if counts.is_empty() {
        println!("  No tweets imported yet. Run `quill import <file>` first.");
        return;
    }

    println!("  {:<32} {:>8}", "Author".dimmed(), "Tweets".dimmed());
    println!("  {}", "-".repeat(41).dimmed());
    for (author, count) in counts {
        println!("  {:<32} {:>8}", author, count);
    }
}

fn colorize_confidence(confidence: f64) -> colored::ColoredString {
    let text = format!("{confidence:.2}%");
    if confidence >= 75.0 {
        text.green()
    } else if confidence >= 50.0 {
        text.yellow()
    } else {
        text.red()
    }
}
