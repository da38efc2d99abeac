//! Box-drawn tables for CLI output.

/// Widest a column may grow, including its two padding cells.
pub const MAX_COLUMN_WIDTH: usize = 30;

/// Render `rows` under `headers` as a box-drawn table.
///
/// Long cells are cut and suffixed with `...`; missing cells render blank.
pub fn render_table<S: AsRef<str>>(headers: &[&str], rows: &[Vec<S>]) -> String {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let content = rows
                .iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.as_ref().chars().count())
                .fold(header.chars().count(), usize::max);
            (content + 2).min(MAX_COLUMN_WIDTH)
        })
        .collect();

    let rule = |left: char, mid: char, right: char| {
        let segments: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
        format!("{left}{}{right}\n", segments.join(mid.to_string().as_str()))
    };
    let line = |cells: Vec<&str>| {
        let formatted: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let text = truncate(cells.get(i).copied().unwrap_or(""), w - 2);
                format!(" {text:<width$}", width = w - 1)
            })
            .collect();
        format!("│{}│\n", formatted.join("│"))
    };

    let mut out = rule('┌', '┬', '┐');
    out.push_str(&line(headers.to_vec()));
    out.push_str(&rule('├', '┼', '┤'));
    for row in rows {
        out.push_str(&line(row.iter().map(AsRef::as_ref).collect()));
    }
    out.push_str(&rule('└', '┴', '┘'));
    out
}

/// Print a table to stdout.
pub fn print_table<S: AsRef<str>>(headers: &[&str], rows: &[Vec<S>]) {
    print!("{}", render_table(headers, rows));
}

/// Section title above a table.
pub fn print_heading(title: &str) {
    println!("\n{title}");
    println!("{}", "─".repeat(title.chars().count()));
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}
