//! Execution order resolution for the test catalog.

use std::collections::{HashMap, HashSet};

use crate::catalog::{DependencyMap, TestId};
use crate::error::{Error, Result};

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

/// Computes an execution order in which every declared dependency runs
/// before its dependents.
///
/// Tests are expanded depth-first in catalog order, visiting dependencies in
/// their declared order before appending the test itself. Each catalogued
/// test appears exactly once and independent tests keep their catalog order.
/// Dependencies that are not part of `catalog` are never appended. A cycle
/// returns [`Error::DependencyCycle`] naming the offending path.
pub fn resolve(catalog: &[TestId], deps: &DependencyMap) -> Result<Vec<TestId>> {
    let in_catalog: HashSet<&TestId> = catalog.iter().collect();
    let mut marks: HashMap<&TestId, Mark> = HashMap::new();
    let mut order = Vec::with_capacity(catalog.len());

    fn visit<'a>(
        test: &'a TestId,
        deps: &'a DependencyMap,
        in_catalog: &HashSet<&'a TestId>,
        marks: &mut HashMap<&'a TestId, Mark>,
        path: &mut Vec<&'a TestId>,
        order: &mut Vec<TestId>,
    ) -> Result<()> {
        match marks.get(test) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = path.iter().position(|t| *t == test).unwrap_or(0);
                let mut cycle: Vec<&str> = path[start..].iter().map(|t| t.as_str()).collect();
                cycle.push(test.as_str());
                return Err(Error::DependencyCycle(cycle.join(" -> ")));
            }
            None => {}
        }

        if !in_catalog.contains(test) {
            tracing::warn!(test = %test, "dependency is not in the catalog, ignoring");
            return Ok(());
        }

        marks.insert(test, Mark::Visiting);
        path.push(test);

        if let Some(prereqs) = deps.get(test) {
            for dep in prereqs {
                visit(dep, deps, in_catalog, marks, path, order)?;
            }
        }

        path.pop();
        marks.insert(test, Mark::Done);
        order.push(test.clone());
        Ok(())
    }

    for test in catalog {
        let mut path = Vec::new();
        visit(test, deps, &in_catalog, &mut marks, &mut path, &mut order)?;
    }

    tracing::debug!(
        order = ?order.iter().map(TestId::as_str).collect::<Vec<_>>(),
        "resolved execution order"
    );

    Ok(order)
}
