use itertools::Itertools;
use prettytable::format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR;
use prettytable::Table;

use crate::expression::Expression;
use crate::operator::{JoinMode, LogicalOperator};
use crate::plan::{LogicalPlan, NodeId, PlanVisitation};

impl LogicalPlan {
    fn describe_expressions(&self, expressions: &[Expression]) -> String {
        expressions
            .iter()
            .map(|expression| expression.display(self))
            .join(", ")
    }

    /// One line description of a node, without its inputs.
    pub fn describe_node(&self, node_id: NodeId) -> String {
        let expressions = self.node_expressions(node_id);
        match self.operator(node_id) {
            LogicalOperator::Root => "[Root]".to_string(),
            LogicalOperator::StoredTable(scan) => {
                format!("[StoredTable] Name: '{}'", scan.table_name())
            }
            LogicalOperator::Mock(mock) => match mock.name() {
                Some(name) => format!("[MockTable] {}", name),
                None => "[MockTable]".to_string(),
            },
            LogicalOperator::Predicate => {
                format!("[Predicate] {}", self.describe_expressions(expressions))
            }
            LogicalOperator::Join(join) => {
                let mut description = format!("[Join] Mode: {}", join.mode());
                if join.mode() != JoinMode::Cross {
                    description.push_str(&format!(
                        " [{}]",
                        expressions
                            .iter()
                            .map(|expression| expression.display(self))
                            .join(" AND ")
                    ));
                }
                if join.disambiguate() {
                    description.push_str(" - with lineage");
                }
                description
            }
            LogicalOperator::Union(union) => format!("[Union] Mode: {}", union.mode()),
            LogicalOperator::Aggregate(aggregate) => {
                let (group_by, aggregates) = expressions.split_at(aggregate.group_by_count());
                format!(
                    "[Aggregate] GroupBy: [{}] Aggregates: [{}]",
                    self.describe_expressions(group_by),
                    self.describe_expressions(aggregates)
                )
            }
            LogicalOperator::Projection => {
                format!("[Projection] {}", self.describe_expressions(expressions))
            }
            LogicalOperator::Sort(sort) => format!(
                "[Sort] {} Modes: {}",
                self.describe_expressions(expressions),
                sort.describe_modes()
            ),
            LogicalOperator::Limit => {
                format!("[Limit] {}", self.describe_expressions(expressions))
            }
        }
    }

    /// Renders the plan below `root` as a table with one row per node.
    pub fn explain(&self, root: NodeId) -> String {
        let mut table = Table::new();
        table.set_format(*FORMAT_NO_BORDER_LINE_SEPARATOR);
        table.set_titles(row!["Id", "Node", "Inputs"]);

        self.visit_downward(root, |node_id| {
            let inputs = self
                .inputs(node_id)
                .into_iter()
                .map(|input| format!("#{}", input.index()))
                .join(", ");
            table.add_row(row![
                format!("#{}", node_id.index()),
                self.describe_node(node_id),
                inputs
            ]);
            PlanVisitation::VisitInputs
        });

        table.to_string()
    }
}
