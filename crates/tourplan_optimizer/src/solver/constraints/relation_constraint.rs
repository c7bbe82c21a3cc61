use crate::{
    problem::relation::check_relation,
    solver::{
        cost_model::{CostComponent, CostVector},
        solution::view::{EvaluationScope, MarkSink, SolutionView},
        violation::ViolationClass,
    },
};

use super::global_constraint::GlobalConstraint;

#[derive(Clone)]
pub struct RelationConstraint;

impl GlobalConstraint for RelationConstraint {
    fn evaluate<V: SolutionView, M: MarkSink>(
        &self,
        view: &V,
        scope: EvaluationScope,
        costs: &mut CostVector,
        marks: &mut M,
    ) {
        let graph = view.problem().relations();
        if graph.is_empty() {
            return;
        }

        let indices: Vec<usize> = match scope {
            EvaluationScope::Full => (0..graph.len()).collect(),
            EvaluationScope::Partial { nodes, .. } => {
                let mut indices = nodes
                    .iter()
                    .flat_map(|&node| graph.relations_of(node).iter().copied())
                    .collect::<Vec<_>>();
                indices.sort_unstable();
                indices.dedup();
                indices
            }
        };

        for index in indices {
            let relation = graph.relation(index);
            let outcome = check_relation(relation, view);
            if outcome.satisfied {
                continue;
            }

            if relation.hard {
                costs.add_hard(CostComponent::Relationship, outcome.cost);
            } else {
                costs.add_soft(CostComponent::Relationship, outcome.cost);
            }
            marks.mark(relation.master, ViolationClass::RelationViolation);
            marks.mark(relation.related, ViolationClass::RelationViolation);
        }
    }
}
