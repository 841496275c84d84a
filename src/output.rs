use std::io::{self, Write};

use serde::Serialize;

use crate::app::{DownloadResult, ProgressEvent, ProgressSink};
use crate::domain::DownloadLinks;
use crate::table::DatasetTable;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

/// Columns shown by the plain-text table renderer.
const SUMMARY_COLUMNS: &[&str] = &[
    "ID",
    "Name",
    "Organism",
    "Organism Part",
    "Polarity",
    "Analyzer",
    "Maldi Matrix",
];

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_table(table: &DatasetTable) -> io::Result<()> {
        Self::print_json(table)
    }

    pub fn print_links(links: &DownloadLinks) -> io::Result<()> {
        Self::print_json(links)
    }

    pub fn print_download(result: &DownloadResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Human-readable output on stdout, progress on stderr.
pub struct TextOutput;

impl TextOutput {
    pub fn print_table(table: &DatasetTable) -> io::Result<()> {
        let mut stdout = io::stdout();
        stdout.write_all(render_table(table).as_bytes())
    }

    pub fn print_links(links: &DownloadLinks) -> io::Result<()> {
        let mut stdout = io::stdout();
        if let Some(license) = &links.license {
            writeln!(stdout, "license: {} ({})", license.name, license.code)?;
        }
        for contributor in &links.contributors {
            match &contributor.institution {
                Some(institution) => {
                    writeln!(stdout, "contributor: {} ({institution})", contributor.name)?
                }
                None => writeln!(stdout, "contributor: {}", contributor.name)?,
            }
        }
        for file in &links.files {
            writeln!(stdout, "{}\t{}", file.filename, file.link)?;
        }
        Ok(())
    }

    pub fn print_download(result: &DownloadResult) -> io::Result<()> {
        let mut stdout = io::stdout();
        writeln!(stdout, "datasets: {}", result.items.len())?;
        for item in &result.items {
            writeln!(stdout, "{} {} ({})", item.id, item.name, item.action)?;
            writeln!(stdout, "   dir: {}", item.directory)?;
            for file in &item.files {
                writeln!(stdout, "   - {file}")?;
            }
        }
        Ok(())
    }
}

impl ProgressSink for TextOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("{} ({} ms)", event.message, elapsed.as_millis()),
            None => eprintln!("{}", event.message),
        }
    }
}

/// Tab-separated summary of `table`: a header line, then one line per row.
pub fn render_table(table: &DatasetTable) -> String {
    let mut out = SUMMARY_COLUMNS.join("\t");
    if table.has_molecules() {
        out.push_str("\tMolecules");
    }
    out.push('\n');
    for record in table.records() {
        let mut cells: Vec<String> = SUMMARY_COLUMNS
            .iter()
            .map(|column| record.cell(column).unwrap_or_default())
            .collect();
        if let Some(set) = &record.molecules {
            let ions: usize = set.iter().map(|results| results.len()).sum();
            cells.push(ions.to_string());
        }
        out.push_str(&cells.join("\t"));
        out.push('\n');
    }
    out
}
