//! taskchat view command implementation
//!
//! Prints the materialized project tree and the session transcript.

use super::Context;
use crate::error::Result;
use crate::model::{Project, Task, UserRef};
use crate::output::{emit_success, HumanOutput};
use crate::service::ChatService;

fn names(users: &[UserRef]) -> String {
    users
        .iter()
        .map(UserRef::display_name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn project_line(project: &Project) -> String {
    let mut line = format!("{} (#{})", project.name, project.id);
    if let Some(deadline) = &project.deadline {
        line.push_str(&format!(" due {deadline}"));
    }
    if let Some(description) = &project.description {
        line.push_str(&format!(": {description}"));
    }
    line
}

fn task_line(task: &Task) -> String {
    let mut line = format!(
        "  [{}] {} (#{})",
        if task.done { "x" } else { " " },
        task.title,
        task.id
    );
    if let Some(due) = &task.due_date {
        line.push_str(&format!(" due {due}"));
    }
    if let Some(description) = &task.description {
        line.push_str(&format!(": {description}"));
    }
    if !task.assignees.is_empty() {
        line.push_str(&format!(" | assigned: {}", names(&task.assignees)));
    }
    line
}

pub fn run(ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let sessions = ctx.sessions();
    let view = ChatService::new(&ctx.config, &store, &sessions).view(&ctx.session)?;

    let task_count: usize = view.projects.iter().map(|p| p.tasks.len()).sum();
    let mut human = HumanOutput::new(format!("taskchat view: {}", view.user.display_name()));
    human.push_summary("projects", view.projects.len().to_string());
    human.push_summary("tasks", task_count.to_string());
    human.push_summary("users", names(&view.users));

    for project in &view.projects {
        human.push_line("Projects", project_line(project));
        for task in &project.tasks {
            human.push_line("Projects", task_line(task));
            for comment in &task.comments {
                human.push_line(
                    "Projects",
                    format!("    {}: {}", comment.author.display_name(), comment.text),
                );
            }
        }
    }
    for entry in &view.history {
        human.push_line("Transcript", entry.render(&ctx.config.chat.time_format));
    }
    if view.projects.is_empty() {
        human.push_next_step("taskchat chat send \"create project <name>\"");
    }

    emit_success(ctx.output, "view", &view, Some(&human))
}
