//! Live index event stream

use anyhow::Result;
use serde::Serialize;

use super::output::Output;
use crate::index::{Fetcher, IndexEvent, IndexOp, TaskIndex};
use crate::storage::{Config, DocumentSource};

#[derive(Serialize)]
struct EventView<'a> {
    #[serde(flatten)]
    event: &'a IndexEvent,
    tasks: usize,
}

/// Prints index events until interrupted
pub fn run(config: &Config, output: &Output) -> Result<()> {
    let source = DocumentSource::new(&config.root, config.project.clone());
    let (index, _handle) = source.spawn_index(config.project.index_config())?;
    let events = index.subscribe();

    if !output.is_json() {
        output.success(&format!(
            "Watching {} ({} tasks in {} documents)",
            config.root.display(),
            index.summary(),
            index.documents().len()
        ));
    }

    for event in events {
        report(&index, &event, output);
    }
    Ok(())
}

fn report(index: &TaskIndex, event: &IndexEvent, output: &Output) {
    let tasks = match event.op {
        IndexOp::Delete => 0,
        IndexOp::Load | IndexOp::Change => index.list(&Fetcher::Document(event.path.clone()), &[]).len(),
    };

    if output.is_json() {
        output.data(&EventView { event, tasks });
    } else {
        let op = match event.op {
            IndexOp::Load => "load",
            IndexOp::Change => "change",
            IndexOp::Delete => "delete",
        };
        let tasks = tasks.to_string();
        output.row(&[op, event.path.as_str(), tasks.as_str()]);
    }
}
