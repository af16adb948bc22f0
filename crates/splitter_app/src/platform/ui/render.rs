use splitter_core::{AppViewModel, DownloadStatus, JobState};

const BAR_WIDTH: usize = 20;

/// Renders the view model as status lines for the terminal.
pub fn render(view: &AppViewModel) -> Vec<String> {
    let mut lines = Vec::new();

    let file = match (&view.file_name, view.file_size) {
        (Some(name), Some(size)) => format!("{name} ({})", format_size(size)),
        (Some(name), None) => name.clone(),
        _ => "no file".to_string(),
    };
    let stems = if view.stems.is_empty() {
        "none".to_string()
    } else {
        view.stems
            .iter()
            .map(|stem| stem.label())
            .collect::<Vec<_>>()
            .join("+")
    };
    lines.push(format!(
        "{}: {file} | stems: {stems} | format: {}",
        state_label(view.state),
        view.format
    ));

    match view.state {
        JobState::Tracking | JobState::Completed => {
            lines.push(progress_bar(view.progress_percent));
        }
        JobState::Failed => {
            if let Some(message) = &view.error_message {
                lines.push(format!("error: {message}"));
            }
        }
        _ => {}
    }

    for row in &view.downloads {
        let status = match &row.status {
            DownloadStatus::Pending => "downloading".to_string(),
            DownloadStatus::Saved(path) => format!("saved to {path}"),
            DownloadStatus::Failed(message) => format!("failed: {message}"),
        };
        lines.push(format!("  {}: {status}", row.stem));
    }

    lines
}

fn state_label(state: JobState) -> &'static str {
    match state {
        JobState::Idle => "Idle",
        JobState::FileReady => "Ready",
        JobState::Submitting => "Uploading",
        JobState::Tracking => "Processing",
        JobState::Completed => "Completed",
        JobState::Failed => "Failed",
    }
}

fn progress_bar(percent: u8) -> String {
    let percent = percent.min(100) as usize;
    let filled = percent * BAR_WIDTH / 100;
    format!(
        "[{}{}] {percent}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled)
    )
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Prints only lines that differ from the previous frame.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    last: Vec<String>,
}

impl TerminalRenderer {
    pub fn frame(&mut self, view: &AppViewModel) -> Vec<String> {
        let lines = render(view);
        let changed = lines
            .iter()
            .filter(|line| !self.last.contains(line))
            .cloned()
            .collect();
        self.last = lines;
        changed
    }
}
