//! Output formatting for CLI operations.

use serde_json::json;
use std::path::Path;

use nszconv::format::{BlockLayout, NczSection};
use nszconv::progress::format_bytes_iec;
use nszconv::{ContainerInfo, ConvertResult, EntryPlan};

/// Trait for output formatting
pub trait OutputFormatter {
    /// Formats the structure of a compressed file
    fn format_info(&self, path: &Path, info: &ContainerInfo) -> String;

    /// Formats a finished conversion
    fn format_convert_result(&self, input: &Path, result: &ConvertResult) -> String;
}

/// Human-readable output formatter
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn format_info(&self, path: &Path, info: &ContainerInfo) -> String {
        let mut output = String::new();

        output.push_str(&format!("{} ({})\n", path.display(), info.format.name()));
        output.push_str(&"-".repeat(70));
        output.push('\n');
        output.push_str(&format!("  Entries:        {}\n", info.entries.len()));
        output.push_str(&format!("  Compressed:     {}\n", info.compressed_entries()));
        output.push_str(&format!(
            "  Input size:     {}\n",
            format_bytes_iec(info.input_size)
        ));
        output.push_str(&format!(
            "  Output size:    {}\n",
            format_bytes_iec(info.output_size)
        ));
        output.push('\n');

        output.push_str(&format!(
            "{:>12} {:>12} {:<8} {}\n",
            "Size", "Output", "Layout", "Name"
        ));
        for plan in &info.entries {
            let entry = plan.entry();
            output.push_str(&format!(
                "{:>12} {:>12} {:<8} {}\n",
                format_bytes_iec(entry.size),
                format_bytes_iec(plan.output_size()),
                layout_name(plan),
                entry.name
            ));
            if let Some(header) = plan.header() {
                for (index, section) in header.sections.iter().enumerate() {
                    output.push_str(&format!(
                        "{:>26} #{} {:#012x}..{:#012x} {}\n",
                        "",
                        index,
                        section.offset,
                        section.offset.saturating_add(section.size),
                        crypto_name(section)
                    ));
                }
                if let Some(layout) = &header.block_layout {
                    output.push_str(&format!(
                        "{:>26} {} blocks of {}\n",
                        "",
                        layout.number_of_blocks,
                        format_bytes_iec(layout.block_size())
                    ));
                }
            }
        }

        output
    }

    fn format_convert_result(&self, input: &Path, result: &ConvertResult) -> String {
        format!(
            "{} -> {}: {} entries ({} decompressed), {}\n",
            input.display(),
            result.output_path.display(),
            result.entries_total,
            result.entries_decompressed,
            format_bytes_iec(result.bytes_written)
        )
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_info(&self, path: &Path, info: &ContainerInfo) -> String {
        let entries: Vec<_> = info
            .entries
            .iter()
            .map(|plan| {
                let entry = plan.entry();
                let header = plan.header();
                json!({
                    "name": entry.name,
                    "output_name": entry.output_name,
                    "size": entry.size,
                    "output_size": plan.output_size(),
                    "compressed": plan.is_compressed(),
                    "sections": header.map(|h| h.sections.iter().map(section_json).collect::<Vec<_>>()),
                    "block_layout": header.and_then(|h| h.block_layout.as_ref()).map(layout_json),
                })
            })
            .collect();

        let obj = json!({
            "path": path.display().to_string(),
            "format": info.format.name(),
            "input_size": info.input_size,
            "output_size": info.output_size,
            "entries": entries,
        });

        let mut text = serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string());
        text.push('\n');
        text
    }

    fn format_convert_result(&self, input: &Path, result: &ConvertResult) -> String {
        let obj = json!({
            "input": input.display().to_string(),
            "output": result.output_path.display().to_string(),
            "entries_total": result.entries_total,
            "entries_decompressed": result.entries_decompressed,
            "bytes_written": result.bytes_written,
        });

        let mut text = serde_json::to_string(&obj).unwrap_or_else(|_| "{}".to_string());
        text.push('\n');
        text
    }
}

fn section_json(section: &NczSection) -> serde_json::Value {
    json!({
        "offset": section.offset,
        "size": section.size,
        "crypto_type": section.crypto_type,
    })
}

fn layout_json(layout: &BlockLayout) -> serde_json::Value {
    json!({
        "block_size": layout.block_size(),
        "number_of_blocks": layout.number_of_blocks,
        "decompressed_size": layout.decompressed_size,
    })
}

fn layout_name(plan: &EntryPlan) -> &'static str {
    match plan.header() {
        None => "copy",
        Some(header) if header.block_layout.is_some() => "block",
        Some(_) => "solid",
    }
}

fn crypto_name(section: &NczSection) -> String {
    match section.crypto_type {
        1 => "plain".to_string(),
        3 => "aes-ctr".to_string(),
        4 => "aes-ctr (bktr)".to_string(),
        other => format!("type {}", other),
    }
}

/// Creates the appropriate formatter based on output format
pub fn create_formatter(format: super::OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        super::OutputFormat::Human => Box::new(HumanFormatter),
        super::OutputFormat::Json => Box::new(JsonFormatter),
    }
}
