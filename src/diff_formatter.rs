use crate::backup_manager::BackupMetadata;
use crate::file_processor::{ChangeType, DiffLine, FileDiff};
use colored::*;
use std::io::IsTerminal;

/// One row of a preview: a diff line, or a gap between distant hunks
#[derive(Debug, Clone, PartialEq)]
enum PreviewRow<'a> {
    Line(&'a DiffLine),
    Gap,
}

pub struct DiffFormatter {
    use_color: bool,
}

impl DiffFormatter {
    /// Colors only when enabled, stdout is a terminal and NO_COLOR is unset
    pub fn detect(color_enabled: bool) -> Self {
        // https://no-color.org/
        let use_color = color_enabled
            && std::env::var_os("NO_COLOR").is_none()
            && std::io::stdout().is_terminal();
        Self { use_color }
    }

    pub fn plain() -> Self {
        Self { use_color: false }
    }

    /// Format file diff with context around changed lines
    pub fn format_diff_with_context(&self, diff: &FileDiff, context_size: usize) -> String {
        let mut output = String::new();

        if self.use_color {
            output.push_str(&format!("{}\n", diff.file_path.bold().cyan()));
        } else {
            output.push_str(&format!("{}\n", diff.file_path));
        }

        if !diff.has_changes() {
            output.push_str("No OPTIONS handlers to rewrite.\n");
            return output;
        }

        for row in Self::filter_lines_with_context(&diff.lines, context_size) {
            let line = match row {
                PreviewRow::Gap => {
                    if self.use_color {
                        output.push_str(&format!("{}\n", "...".dimmed()));
                    } else {
                        output.push_str("...\n");
                    }
                    continue;
                }
                PreviewRow::Line(line) => line,
            };

            let line_num = line.display_line();
            let content = line.content.as_str();
            let indicator = match line.change_type {
                ChangeType::Unchanged => "=",
                ChangeType::Added => "+",
                ChangeType::Deleted => "-",
            };

            if self.use_color {
                let colored_line = match line.change_type {
                    ChangeType::Unchanged => format!("L{}: {} {}\n", line_num, indicator.dimmed(), content.dimmed()),
                    ChangeType::Added => format!("L{}: {} {}\n", line_num, indicator.green().bold(), content.green().bold()),
                    ChangeType::Deleted => format!("L{}: {} {}\n", line_num, indicator.red().bold(), content.red()),
                };
                output.push_str(&colored_line);
            } else {
                output.push_str(&format!("L{}: {} {}\n", line_num, indicator, content));
            }
        }

        let added = diff.count(ChangeType::Added);
        let deleted = diff.count(ChangeType::Deleted);
        let noun = if diff.replacements == 1 { "handler" } else { "handlers" };

        if self.use_color {
            output.push_str(&format!(
                "\nTotal: {} {} rewritten ({} {}, {} {})\n",
                diff.replacements.to_string().bold().white(),
                noun,
                added,
                "added".green(),
                deleted,
                "deleted".red()
            ));
        } else {
            output.push_str(&format!(
                "\nTotal: {} {} rewritten ({} added, {} deleted)\n",
                diff.replacements, noun, added, deleted
            ));
        }

        output
    }

    /// Keep changed lines plus `context_size` lines around them, merging close hunks
    fn filter_lines_with_context(lines: &[DiffLine], context_size: usize) -> Vec<PreviewRow<'_>> {
        let changed_indices: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.change_type != ChangeType::Unchanged)
            .map(|(i, _)| i)
            .collect();

        let Some(&first_change) = changed_indices.first() else {
            return Vec::new();
        };

        // Ranges of line indices to show, each already widened by the context
        let mut ranges: Vec<(usize, usize)> = Vec::new();
        let mut start = first_change.saturating_sub(context_size);
        let mut end = (first_change + context_size + 1).min(lines.len());

        for &idx in &changed_indices[1..] {
            let next_start = idx.saturating_sub(context_size);
            if next_start <= end {
                end = (idx + context_size + 1).min(lines.len());
            } else {
                ranges.push((start, end));
                start = next_start;
                end = (idx + context_size + 1).min(lines.len());
            }
        }
        ranges.push((start, end));

        let mut result = Vec::new();
        for (i, (start, end)) in ranges.into_iter().enumerate() {
            if i > 0 {
                result.push(PreviewRow::Gap);
            }
            result.extend(lines[start..end].iter().map(PreviewRow::Line));
        }

        result
    }

    /// Format dry run header
    pub fn format_dry_run_header(&self, helper: &str) -> String {
        let title = format!("extract inlined OPTIONS handlers into {}(exchange)", helper);

        if self.use_color {
            format!("{} {}\n\n", "🔍 Dry run:".bold().cyan(), title.white().bold())
        } else {
            format!("Dry run: {}\n\n", title)
        }
    }

    /// Format the backup ID and how to undo the run
    pub fn format_backup_hint(&self, backup_id: &str) -> String {
        if self.use_color {
            format!(
                "\n{} {}\n{} {}\n",
                "Backup ID:".white(),
                backup_id.yellow().bold(),
                "Rollback with:".white(),
                format!("optpatch rollback {}", backup_id).bold().yellow()
            )
        } else {
            format!(
                "\nBackup ID: {}\nRollback with: optpatch rollback {}\n",
                backup_id, backup_id
            )
        }
    }

    /// Format operation history
    pub fn format_history(&self, backups: &[BackupMetadata]) -> String {
        let mut output = String::new();

        if backups.is_empty() {
            output.push_str("No backup history found.\n");
            return output;
        }

        if self.use_color {
            output.push_str(&format!("{}\n\n", "Operation History:".bold().white()));
        } else {
            output.push_str("Operation History:\n\n");
        }

        for backup in backups {
            let time = backup.timestamp.format("%Y-%m-%d %H:%M:%S");
            if self.use_color {
                output.push_str(&format!("ID: {}\n", backup.id.yellow()));
                output.push_str(&format!("  Time: {}\n", time));
                output.push_str(&format!("  Operation: {}\n", backup.label.cyan()));
            } else {
                output.push_str(&format!("ID: {}\n", backup.id));
                output.push_str(&format!("  Time: {}\n", time));
                output.push_str(&format!("  Operation: {}\n", backup.label));
            }
            for file in &backup.files {
                output.push_str(&format!("  File: {}\n", file.original_path.display()));
            }
            output.push('\n');
        }

        output
    }
}
