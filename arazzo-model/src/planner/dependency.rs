use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use crate::types::{Workflow, WorkflowDocument};

/// Orders `workflows` so every workflow comes after the ones it depends on.
///
/// Depth-first, in document order: workflows that do not constrain each
/// other keep their declared relative order.
pub fn sort_by_dependencies(workflows: &[Workflow]) -> Result<Vec<&Workflow>, SortError> {
    let by_id: BTreeMap<&str, &Workflow> = workflows
        .iter()
        .map(|w| (w.workflow_id.as_str(), w))
        .collect();

    let mut sorter = Sorter {
        by_id,
        visited: BTreeSet::new(),
        on_path: BTreeSet::new(),
        out: Vec::with_capacity(workflows.len()),
    };
    for workflow in workflows {
        sorter.visit(workflow)?;
    }

    let order: Vec<&str> = sorter.out.iter().map(|w| w.workflow_id.as_str()).collect();
    info!(order = ?order, "workflow execution order");
    Ok(sorter.out)
}

/// Reorders the document's workflows in place.
pub fn sort_document_workflows(document: &mut WorkflowDocument) -> Result<(), SortError> {
    let order: Vec<String> = sort_by_dependencies(&document.workflows)?
        .into_iter()
        .map(|w| w.workflow_id.clone())
        .collect();

    let mut remaining: BTreeMap<String, Workflow> = std::mem::take(&mut document.workflows)
        .into_iter()
        .map(|w| (w.workflow_id.clone(), w))
        .collect();
    document.workflows = order
        .iter()
        .filter_map(|id| remaining.remove(id))
        .collect();
    Ok(())
}

struct Sorter<'a> {
    by_id: BTreeMap<&'a str, &'a Workflow>,
    visited: BTreeSet<&'a str>,
    on_path: BTreeSet<&'a str>,
    out: Vec<&'a Workflow>,
}

impl<'a> Sorter<'a> {
    fn visit(&mut self, workflow: &'a Workflow) -> Result<(), SortError> {
        let id = workflow.workflow_id.as_str();
        if self.visited.contains(id) {
            return Ok(());
        }
        self.on_path.insert(id);

        for dep in &workflow.depends_on {
            if self.on_path.contains(dep.as_str()) {
                return Err(SortError::Cycle {
                    workflow_id: dep.clone(),
                });
            }
            let next = self
                .by_id
                .get(dep.as_str())
                .copied()
                .ok_or_else(|| SortError::UnknownDependency {
                    workflow_id: id.to_string(),
                    dependency: dep.clone(),
                })?;
            self.visit(next)?;
        }

        self.on_path.remove(id);
        self.visited.insert(id);
        self.out.push(workflow);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SortError {
    #[error("cyclic workflow dependency involving '{workflow_id}'")]
    Cycle { workflow_id: String },
    #[error("workflow '{workflow_id}' depends on unknown workflow '{dependency}'")]
    UnknownDependency {
        workflow_id: String,
        dependency: String,
    },
}
