//! Splitting of combined task descriptions and task titles.
//!
//! When an Epic is created together with several Tasks, all task
//! descriptions arrive in one string. `|||` is the preferred separator;
//! commas are accepted only when they yield exactly one piece per task,
//! since free text routinely contains commas.

use tracing::debug;

/// Separator between task descriptions.
pub const TASK_DELIMITER: &str = "|||";

/// Split `combined` into one description per task.
///
/// The result has at least `task_count` entries, padded with empty
/// strings. A `|||` split that yields more pieces than tasks is returned
/// as is; callers index only the tasks they have.
pub fn split_task_descriptions(combined: &str, task_count: usize) -> Vec<String> {
    if combined.trim().is_empty() {
        return vec![String::new(); task_count];
    }

    let mut descriptions: Vec<String> = if combined.contains(TASK_DELIMITER) {
        let pieces = trimmed_pieces(combined, TASK_DELIMITER);
        debug!(pieces = pieces.len(), task_count, "Split descriptions on |||");
        pieces
    } else {
        let pieces = trimmed_pieces(combined, ",");
        if pieces.len() == task_count {
            debug!(task_count, "Split descriptions on commas");
            pieces
        } else {
            debug!(
                pieces = pieces.len(),
                task_count, "Comma count mismatch, using whole text for the first task"
            );
            vec![combined.trim().to_string()]
        }
    };

    if descriptions.len() < task_count {
        descriptions.resize(task_count, String::new());
    }
    descriptions
}

/// Split comma-separated task titles, dropping blanks.
pub fn split_task_titles(titles: &str) -> Vec<String> {
    titles
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn trimmed_pieces(text: &str, separator: &str) -> Vec<String> {
    text.split(separator)
        .map(|piece| piece.trim().to_string())
        .collect()
}
