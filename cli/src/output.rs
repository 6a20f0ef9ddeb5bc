//! Output sinks: structured JSON lines and the colored human display
//!
//! Line composition is kept in plain functions so it can be tested
//! without a terminal; the sinks only decide where the text goes and
//! how the previous frame is cleared.

use std::sync::Mutex;

use console::{style, Term};

use memwatch_monitor::chart::{ChartCell, ChartRender};
use memwatch_monitor::format_bytes;
use memwatch_monitor::{OutputSink, SampleRecord};

/// One JSON record per line on stdout. Informational notices go to
/// stderr so they never interleave with the record stream.
pub struct JsonSink;

impl OutputSink for JsonSink {
    fn emit(&self, record: &SampleRecord, _chart: Option<&ChartRender>) {
        match serde_json::to_string(record) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::error!("failed to serialize record: {e}"),
        }
    }

    fn notify(&self, message: &str) {
        eprintln!("{message}");
    }
}

/// Colored status lines redrawn in place, plus the optional chart
pub struct HumanSink {
    term: Term,
    colored: bool,
    lines_drawn: Mutex<usize>,
}

impl HumanSink {
    pub fn new(colored: bool) -> Self {
        Self {
            term: Term::stdout(),
            colored,
            lines_drawn: Mutex::new(0),
        }
    }
}

impl OutputSink for HumanSink {
    fn emit(&self, record: &SampleRecord, chart: Option<&ChartRender>) {
        let mut lines = vec![
            memory_line(record, self.colored),
            cpu_line(record, self.colored),
            disk_line(record, self.colored),
        ];
        if let Some(chart) = chart {
            lines.extend(chart_lines(chart, record.threshold, self.colored));
        }

        let mut drawn = match self.lines_drawn.lock() {
            Ok(drawn) => drawn,
            Err(poisoned) => poisoned.into_inner(),
        };
        let _ = self.term.clear_last_lines(*drawn);
        for line in &lines {
            let _ = self.term.write_line(line);
        }
        *drawn = lines.len();
    }

    fn notify(&self, message: &str) {
        let text = if self.colored {
            style(message).yellow().to_string()
        } else {
            message.to_string()
        };
        let _ = self.term.write_line("");
        let _ = self.term.write_line(&text);
        // The frame was broken by the notice; repaint from scratch
        if let Ok(mut drawn) = self.lines_drawn.lock() {
            *drawn = 0;
        }
    }
}

pub fn memory_line(record: &SampleRecord, colored: bool) -> String {
    let heap_used = format_bytes(record.memory.heap_used);
    let rss = format_bytes(record.memory.rss);
    let threshold = format_bytes(record.threshold);
    let process_info = match record.mode.as_str() {
        "self" => "Self".to_string(),
        _ => format!("PID:{}", record.pid),
    };
    let status = if record.is_breach {
        "⚠ THRESHOLD BREACH"
    } else {
        "✓ Normal"
    };

    if colored {
        let heap_styled = if record.is_breach {
            style(heap_used).red()
        } else {
            style(heap_used).green()
        };
        let status_styled = if record.is_breach {
            style(status).red()
        } else {
            style(status).green()
        };
        format!(
            "{} HeapUsed: {} | RSS: {} | {} {} | {} {} | {} {} | {} {}",
            style("Memory:").cyan(),
            heap_styled,
            style(rss).magenta(),
            style("Process:").dim(),
            style(process_info).magenta(),
            style("Threshold:").dim(),
            style(threshold).yellow(),
            style("Breaches:").dim(),
            style(record.breach_count).cyan(),
            style("Status:").dim(),
            status_styled,
        )
    } else {
        format!(
            "Memory: HeapUsed: {} | RSS: {} | Process: {} | Threshold: {} | Breaches: {} | Status: {}",
            heap_used, rss, process_info, threshold, record.breach_count, status,
        )
    }
}

pub fn cpu_line(record: &SampleRecord, colored: bool) -> String {
    if colored {
        format!(
            "{} {}",
            style("CPU:").dim(),
            style(format!("{:.2}%", record.cpu.percent)).yellow()
        )
    } else {
        format!("CPU: {:.2}%", record.cpu.percent)
    }
}

pub fn disk_line(record: &SampleRecord, colored: bool) -> String {
    let Some(disk) = &record.disk else {
        return if colored {
            format!("{} N/A", style("Disk:").dim())
        } else {
            "Disk: N/A".to_string()
        };
    };

    const GB: f64 = 1024.0 * 1024.0 * 1024.0;
    let free_gb = disk.free as f64 / GB;
    let total_gb = disk.total as f64 / GB;
    let used_percent = if disk.total > 0 {
        disk.used as f64 / disk.total as f64 * 100.0
    } else {
        0.0
    };

    if colored {
        format!(
            "{} Free: {} / {:.1} GB ({:.1}%) | Drive: {}",
            style("Disk:").dim(),
            style(format!("{free_gb:.1} GB")).cyan(),
            total_gb,
            used_percent,
            disk.drive,
        )
    } else {
        format!(
            "Disk: Free: {free_gb:.1} GB / {total_gb:.1} GB ({used_percent:.1}%) | Drive: {}",
            disk.drive,
        )
    }
}

pub fn chart_lines(chart: &ChartRender, _threshold: u64, colored: bool) -> Vec<String> {
    let mut lines = Vec::with_capacity(chart.rows.len() + 2);

    let header = format!("Memory Chart ({} point window)", chart.width);
    lines.push(if colored {
        style(header).cyan().to_string()
    } else {
        header
    });

    for row in &chart.rows {
        let mut line = format!("{:>3.0}MB ", row.label_mb);
        for cell in &row.cells {
            line.push_str(&cell_text(*cell, colored));
        }
        lines.push(line);
    }

    lines.push(if colored {
        format!(
            "     {} Heap  {} RSS  {} Both  {} Threshold",
            style("█").green(),
            style("█").blue(),
            style("█").red(),
            style("─").yellow(),
        )
    } else {
        "     █ Heap  █ RSS  █ Both  ─ Threshold".to_string()
    });

    lines
}

fn cell_text(cell: ChartCell, colored: bool) -> String {
    if !colored {
        return match cell {
            ChartCell::Empty => " ".to_string(),
            ChartCell::Threshold => "─".to_string(),
            _ => "█".to_string(),
        };
    }
    match cell {
        ChartCell::Empty => " ".to_string(),
        ChartCell::Threshold => style("─").yellow().to_string(),
        ChartCell::Both => style("█").red().to_string(),
        ChartCell::Heap => style("█").green().to_string(),
        ChartCell::Rss => style("█").blue().to_string(),
    }
}
