//! Rendering of tool results as Markdown-flavoured text.
//!
//! Every tool returns a human-readable string; the LLM relays the tables
//! to the user as is.

use std::fmt::Display;

use azdo_core::{CreatedWorkItem, WorkItem, WorkItemType};

/// A task created as part of an Epic, with its link outcome.
#[derive(Debug, Clone)]
pub struct TaskRow {
    pub title: String,
    pub created: CreatedWorkItem,
    pub linked: bool,
}

const NEXT_STEPS: [&str; 4] = [
    "Review and update work item descriptions with detailed acceptance criteria",
    "Assign specific team members to individual tasks if needed",
    "Set up any additional dependencies or blockers",
    "Update Epic progress as tasks are completed",
];

pub fn created_message(kind: WorkItemType, item: &CreatedWorkItem) -> String {
    format!(
        "{} created successfully! ID: {}, URL: {}",
        kind, item.id, item.url
    )
}

pub fn updated_message(url: &str) -> String {
    format!("Work item updated successfully! URL: {}", url)
}

pub fn deleted_message(id: u64) -> String {
    format!(
        "Work item deleted successfully! Deleted Work item ID: {}",
        id
    )
}

pub fn linked_message(epic_id: u64, task_id: u64) -> String {
    format!("Successfully linked Task {} to Epic {}", task_id, epic_id)
}

pub fn current_project_message(project: &str) -> String {
    format!("Current project: {}", project)
}

pub fn project_changed_message(previous: &str, current: &str) -> String {
    format!(
        "Project changed from '{}' to '{}'. New work items will be created in '{}'.",
        previous, current, current
    )
}

/// Consistent error text for a failed tool operation.
pub fn error_message(operation: &str, error: impl Display) -> String {
    format!("Error during {}: {}", operation, error)
}

/// Details block for a work item, with a child table for Epics.
pub fn work_item_details(item: &WorkItem, children: &[WorkItem]) -> String {
    let kind = item.work_item_type.as_deref().unwrap_or("Unknown");
    let priority = item
        .priority
        .map(|p| p.to_string())
        .unwrap_or_else(|| "Not Set".to_string());

    let mut output = String::new();
    output.push_str(&format!("=== {} Details ===\n", kind));
    output.push_str(&format!("ID: {}\n", item.id));
    output.push_str(&format!(
        "Title: {}\n",
        item.title.as_deref().unwrap_or("No Title")
    ));
    output.push_str(&format!(
        "State: {}\n",
        item.state.as_deref().unwrap_or("Unknown")
    ));
    output.push_str(&format!(
        "Assigned To: {}\n",
        item.assigned_to.as_deref().unwrap_or("Unassigned")
    ));
    output.push_str(&format!("Priority: {}\n", priority));
    output.push_str(&format!(
        "Tags: {}\n",
        non_empty(item.tags.as_deref()).unwrap_or("No Tags")
    ));
    output.push_str(&format!(
        "Created: {}\n",
        item.created_date.as_deref().unwrap_or("Unknown")
    ));
    output.push_str(&format!(
        "Description: {}\n",
        non_empty(item.description.as_deref()).unwrap_or("No Description")
    ));
    output.push_str(&format!("URL: {}\n", item.url));
    output.push_str("===============================");

    if item.is_epic() && !children.is_empty() {
        output.push_str(&format!(
            "\n\n🔗 **Child Work Items ({} total):**\n",
            children.len()
        ));
        output.push_str("| ID | Type | Title | State | Assigned To | URL |\n");
        output.push_str("|----|------|-------|-------|-------------|-----|\n");
        for child in children {
            output.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                child.id,
                cell(child.work_item_type.as_deref().unwrap_or("Unknown")),
                cell(child.title.as_deref().unwrap_or("No Title")),
                cell(child.state.as_deref().unwrap_or("Unknown")),
                cell(child.assigned_to.as_deref().unwrap_or("Unassigned")),
                child.url
            ));
        }
        output.push_str(
            "\n💡 **Tip:** Use get_work_item with individual child IDs for detailed information.",
        );
    }

    output
}

/// Summary for an Epic created without tasks.
pub fn epic_only_summary(epic_title: &str, epic: &CreatedWorkItem) -> String {
    let mut output = String::from("Epic created successfully!\n\n");
    output.push_str("📋 **Epic Summary**\n");
    output.push_str("| Work Item | ID | URL |\n");
    output.push_str("|-----------|----|-----|\n");
    output.push_str(&format!(
        "| {} | {} | {} |\n\n",
        cell(epic_title),
        epic.id,
        epic.url
    ));
    output.push_str("No tasks were created. Use task_titles parameter to add tasks.");
    output
}

/// Summary table for an Epic and its tasks.
pub fn epic_summary(epic_title: &str, epic: &CreatedWorkItem, tasks: &[TaskRow]) -> String {
    let mut output = String::from("Epic with Tasks created successfully!\n\n");
    output.push_str("📋 **Work Items Summary**\n");
    output.push_str("| Work Item | Type | ID | Linked | URL |\n");
    output.push_str("|-----------|------|----|--------|-----|\n");
    output.push_str(&format!(
        "| {} | Epic | {} | - | {} |\n",
        cell(epic_title),
        epic.id,
        epic.url
    ));
    for task in tasks {
        output.push_str(&format!(
            "| {} | Task | {} | {} | {} |\n",
            cell(&task.title),
            task.created.id,
            if task.linked { "✅" } else { "❌" },
            task.created.url
        ));
    }

    output.push_str("\n🎯 **Next Steps:**\n");
    for step in NEXT_STEPS {
        output.push_str(&format!("- {}\n", step));
    }
    output
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Keep a value on one table row.
fn cell(value: &str) -> String {
    value.replace('|', "\\|").replace(['\r', '\n'], " ")
}
