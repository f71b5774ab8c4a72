//! Terminal rendering and Markdown export of a plan

use std::fs;
use std::path::Path;

use chrono::Utc;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use crate::plan::{PlanSnapshot, Section, UserProfile};

const SECTIONS: [Section; 3] = [Section::Workout, Section::Diet, Section::Tips];

/// Emoji blocks and variation selectors that plain-text exports drop
const STRIPPED_RANGES: &[(u32, u32)] = &[
    (0x1F600, 0x1F64F), // emoticons
    (0x1F300, 0x1F5FF), // symbols & pictographs
    (0x1F680, 0x1F6FF), // transport & map
    (0x1F1E0, 0x1F1FF), // flags
    (0x2600, 0x26FF),   // misc symbols
    (0x2700, 0x27BF),   // dingbats
    (0xFE00, 0xFEFF),   // variation selectors
    (0x1F900, 0x1F9FF), // supplemental symbols
    (0x1FA70, 0x1FAFF), // symbols & pictographs extended
];

/// Remove emoji and variation selectors
pub fn strip_emoji(text: &str) -> String {
    text.chars()
        .filter(|c| {
            let cp = *c as u32;
            !STRIPPED_RANGES.iter().any(|(lo, hi)| (*lo..=*hi).contains(&cp))
        })
        .collect()
}

/// Style one Markdown line for the terminal
fn style_line(line: &str) -> String {
    let trimmed = line.trim();
    if let Some(heading) = trimmed.strip_prefix('#') {
        return heading.trim_start_matches('#').trim().bright_cyan().bold().to_string();
    }
    if let Some(item) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
        let item = if item.contains("**") {
            item.replace("**", "").bold().to_string()
        } else {
            item.to_string()
        };
        return format!("  {} {}", "\u{2022}".green(), item);
    }
    if trimmed.contains("**") {
        return trimmed.replace("**", "").bold().to_string();
    }
    if trimmed.starts_with('*') && trimmed.ends_with('*') && trimmed.len() > 1 {
        return trimmed.trim_matches('*').italic().dimmed().to_string();
    }
    trimmed.to_string()
}

/// Print a plan to stdout, or only `section` when given
pub fn print_plan(snapshot: &PlanSnapshot, section: Option<Section>) {
    debug!(?section, "print_plan: called");
    let name = snapshot.profile.name.trim();
    if section.is_none() && !name.is_empty() {
        println!("{}", format!("Fitness plan for {}", name).bright_cyan().bold());
        if let Some(saved_at) = snapshot.saved_at {
            println!("{}", format!("Saved {}", saved_at.format("%Y-%m-%d %H:%M UTC")).dimmed());
        }
        println!();
    }

    for current in SECTIONS.into_iter().filter(|s| section.is_none_or(|only| only == *s)) {
        let text = snapshot.plan.section(current);
        if text.trim().is_empty() {
            if section.is_some() {
                println!("{}", format!("No {} in this plan.", current.title()).dimmed());
            }
            continue;
        }
        println!("{}", current.title().yellow().bold());
        println!("{}", "-".repeat(current.title().len()).yellow());
        for line in text.lines() {
            println!("{}", style_line(line));
        }
        println!();
    }
}

/// Render a plan as one Markdown document
pub fn to_markdown(snapshot: &PlanSnapshot) -> String {
    let date = snapshot.saved_at.unwrap_or_else(Utc::now).format("%Y-%m-%d");
    let mut doc = format!("# AI Fitness Coach Plan\n\nGenerated on: {}\n\n---\n", date);
    for section in SECTIONS {
        let text = strip_emoji(snapshot.plan.section(section));
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        doc.push_str(&format!("\n## {}\n\n{}\n", section.title(), text));
    }
    doc
}

/// Write the plan to `path` as Markdown
pub fn export_markdown(snapshot: &PlanSnapshot, path: &Path) -> Result<()> {
    debug!(path = %path.display(), "export_markdown: called");
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).context(format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, to_markdown(snapshot)).context(format!("Failed to write {}", path.display()))?;
    info!("Exported plan to {}", path.display());
    Ok(())
}

/// Default export file name for `profile`
pub fn default_export_name(profile: &UserProfile) -> String {
    let name = profile.name.trim();
    let name = if name.is_empty() { "My" } else { name };
    format!("{}-Fitness-Plan.md", name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::GeneratedPlan;
    use tempfile::TempDir;

    fn snapshot() -> PlanSnapshot {
        PlanSnapshot {
            profile: UserProfile::named("Asha"),
            plan: GeneratedPlan {
                workout: "**Monday - Legs** \u{1F4AA}\n- Squats".to_string(),
                diet: "Oats \u{2615}\u{FE0F}".to_string(),
                tips: String::new(),
            },
            saved_at: None,
        }
    }

    #[test]
    fn test_strip_emoji() {
        assert_eq!(strip_emoji("Run \u{1F3C3} fast \u{2764}\u{FE0F}!"), "Run  fast !");
        assert_eq!(strip_emoji("3 sets × 12 reps"), "3 sets × 12 reps");
    }

    #[test]
    fn test_markdown_sections() {
        let doc = to_markdown(&snapshot());
        assert!(doc.starts_with("# AI Fitness Coach Plan"));
        assert!(doc.contains("## Workout Plan\n\n**Monday - Legs** \n- Squats"));
        assert!(doc.contains("## Diet Plan\n\nOats"));
        assert!(!doc.contains("Tips & Motivation"));
        assert!(!doc.contains('\u{1F4AA}'));
    }

    #[test]
    fn test_export_writes_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out").join("plan.md");
        export_markdown(&snapshot(), &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("## Diet Plan"));
    }

    #[test]
    fn test_default_export_name() {
        assert_eq!(default_export_name(&UserProfile::named("Asha")), "Asha-Fitness-Plan.md");
        assert_eq!(default_export_name(&UserProfile::named(" ")), "My-Fitness-Plan.md");
    }

    #[test]
    fn test_style_line_strips_markers() {
        colored::control::set_override(false);
        assert_eq!(style_line("### Workout Plan"), "Workout Plan");
        assert_eq!(style_line("**Breakfast:** Oats"), "Breakfast: Oats");
        assert_eq!(style_line("- Squats"), "  \u{2022} Squats");
        assert_eq!(style_line("- **Monday:** Legs"), "  \u{2022} Monday: Legs");
        assert_eq!(style_line("* **Rest day**"), "  \u{2022} Rest day");
        assert_eq!(style_line("*Warm up first*"), "Warm up first");
    }
}
