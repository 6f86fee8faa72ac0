//! Dependency ordering for rule sets
//!
//! Produces a linear order in which every rule follows the rules named in
//! its `dependencies`. Uses a depth-first traversal with a "visiting" set
//! for cycle detection and a "visited" set for memoized completion, driven
//! by an explicit stack so that deep rule chains cannot overflow the call
//! stack.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use validation_core::error::{Result, SolarValidationError};

use super::ValidationRule;

/// Orders rules so that prerequisites come first
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyResolver;

impl DependencyResolver {
    /// Create a resolver
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Order `rules` by their declared dependencies
    ///
    /// Dependencies naming a rule outside `rules` are ignored; such rules are
    /// immediately eligible. Input order is preserved wherever dependencies
    /// allow, and repeated ids keep their first occurrence.
    ///
    /// # Errors
    ///
    /// Returns `SolarValidationError::CycleDetected` naming the rule that
    /// closes the cycle. No partial order is returned.
    pub fn resolve(&self, rules: &[Arc<ValidationRule>]) -> Result<Vec<Arc<ValidationRule>>> {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(rules.len());
        for (position, rule) in rules.iter().enumerate() {
            index.entry(rule.id.as_str()).or_insert(position);
        }

        let mut order = Vec::with_capacity(index.len());
        let mut visited: HashSet<usize> = HashSet::with_capacity(index.len());
        let mut visiting: HashSet<usize> = HashSet::new();
        // (rule position, next dependency to inspect)
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for start in 0..rules.len() {
            if visited.contains(&start) || index.get(rules[start].id.as_str()) != Some(&start) {
                continue;
            }

            visiting.insert(start);
            stack.push((start, 0));

            while let Some(top) = stack.last_mut() {
                let node = top.0;
                let dependencies = &rules[node].dependencies;

                if top.1 < dependencies.len() {
                    let dependency = dependencies[top.1].as_str();
                    top.1 += 1;

                    let Some(&next) = index.get(dependency) else {
                        continue;
                    };
                    if visited.contains(&next) {
                        continue;
                    }
                    if visiting.contains(&next) {
                        let cycle_start = stack
                            .iter()
                            .position(|(position, _)| *position == next)
                            .unwrap_or(0);
                        let mut path: Vec<String> = stack[cycle_start..]
                            .iter()
                            .map(|(position, _)| rules[*position].id.clone())
                            .collect();
                        path.push(rules[next].id.clone());
                        return Err(SolarValidationError::CycleDetected {
                            rule_id: rules[next].id.clone(),
                            path,
                        });
                    }

                    visiting.insert(next);
                    stack.push((next, 0));
                } else {
                    stack.pop();
                    visiting.remove(&node);
                    visited.insert(node);
                    order.push(Arc::clone(&rules[node]));
                }
            }
        }

        Ok(order)
    }
}
