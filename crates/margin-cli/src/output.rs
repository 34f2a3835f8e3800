//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use margin_core::{Config, Intent};

use crate::commands::replay::ReplayReport;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print the result of a replayed session
    pub fn print_replay(&self, report: &ReplayReport) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                for step in &report.steps {
                    let mut line = format!("{:>3}. {:<15}", step.index, step.action);
                    if let Some(changed) = step.changed {
                        line.push_str(if changed { " changed" } else { " unchanged" });
                    }
                    if let Some(ref detail) = step.detail {
                        line.push(' ');
                        line.push_str(detail);
                    }
                    if !step.intents.is_empty() {
                        let intents: Vec<String> = step.intents.iter().map(describe_intent).collect();
                        line.push_str(&format!(" -> {}", intents.join(", ")));
                    }
                    println!("{}", line.trim_end());
                }

                println!();
                println!("── Overlay ({}) ──", report.overlay.len());
                for highlight in &report.overlay {
                    let marker = if highlight.focused { "*" } else { " " };
                    let color = highlight
                        .color
                        .map(|c| c.label())
                        .unwrap_or("unstyled");
                    println!(
                        "{} {} {:<7} \"{}\"",
                        marker,
                        short_id(highlight.id.as_str()),
                        color,
                        truncate(highlight.text.as_deref().unwrap_or(""), 40)
                    );
                }

                let cards: Vec<String> = report
                    .cards
                    .iter()
                    .map(|card| {
                        if card.pending {
                            format!("{} (draft)", short_id(card.id.as_str()))
                        } else {
                            short_id(card.id.as_str()).to_string()
                        }
                    })
                    .collect();
                println!();
                println!("Cards:        {}", or_none(&cards.join(", ")));
                println!(
                    "Focused:      {}",
                    or_none(report.focused.as_ref().map_or("", |id| id.as_str()))
                );
                println!(
                    "Pending:      {}",
                    or_none(report.pending.as_ref().map_or("", |id| id.as_str()))
                );
                if let Some(ref id) = report.scroll_error {
                    println!("Scroll target not found: {}", id);
                }
            }
            OutputFormat::Json => print_json(report)?,
            OutputFormat::Quiet => {
                for card in &report.cards {
                    println!("{}", card.id);
                }
            }
        }
        Ok(())
    }

    /// Print the effective configuration
    pub fn print_config(&self, config: &Config, path: &Path) -> Result<()> {
        match self.format {
            OutputFormat::Json => print_json(&serde_json::json!({
                "editable": config.capabilities.editable,
                "search_integration": config.capabilities.search_integration,
                "gated_by_feature_flag": config.capabilities.gated_by_feature_flag,
                "location_id": config.location(),
                "log_file": config.log_file,
            }))?,
            OutputFormat::Quiet => {
                println!("{}", config.location());
            }
            OutputFormat::Human => {
                println!("Configuration:");
                println!("  editable:              {}", config.capabilities.editable);
                println!(
                    "  search_integration:    {}",
                    config.capabilities.search_integration
                );
                println!(
                    "  gated_by_feature_flag: {}",
                    config.capabilities.gated_by_feature_flag
                );
                println!("  location_id:           {}", config.location());
                println!(
                    "  log_file:              {}",
                    config
                        .log_file
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "(not set)".to_string())
                );
                println!();
                println!("Config file: {}", path.display());
            }
        }
        Ok(())
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One-line summary of an intent
fn describe_intent(intent: &Intent) -> String {
    match intent {
        Intent::Focus { id } => format!("focus {}", short_id(id.as_str())),
        Intent::ClearFocus => "clear focus".to_string(),
        Intent::Create { record } => format!(
            "create {} ({})",
            short_id(record.id.as_str()),
            record.color
        ),
        Intent::Update { id, color, .. } => match color {
            Some(color) => format!("update {} ({})", short_id(id.as_str()), color),
            None => format!("update {}", short_id(id.as_str())),
        },
        Intent::Delete { id } => format!("delete {}", short_id(id.as_str())),
    }
}

/// Generated ids are UUIDs; show their first 8 characters
fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((end, _)) if id.len() >= 36 => &id[..end],
        _ => id,
    }
}

fn or_none(s: &str) -> &str {
    if s.is_empty() {
        "(none)"
    } else {
        s
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use margin_core::{Color, HighlightRecord, RangeAnchor};

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("a"), "a");
        assert_eq!(short_id("shared-highlight"), "shared-highlight");
        assert_eq!(short_id("6f1c2b9e-4c1d-4d0e-9a55-0d2a1d0b7e11"), "6f1c2b9e");
    }

    #[test]
    fn test_describe_intent() {
        let record = HighlightRecord::new("a", Color::Blue, RangeAnchor::new("p1", 0, 3), "page");
        assert_eq!(describe_intent(&Intent::Create { record }), "create a (blue)");
        assert_eq!(describe_intent(&Intent::ClearFocus), "clear focus");
        assert_eq!(
            describe_intent(&Intent::Update {
                id: "a".into(),
                color: None,
                annotation: Some("note".to_string()),
            }),
            "update a"
        );
    }
}
