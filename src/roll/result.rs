use super::num::Number;
use crate::common::Int;
use crate::parse::ast::{attr, Node};

/// The outcome of interpreting one expression tree.
#[derive(Debug, Clone, PartialEq)]
pub struct DiceResult {
    tree: Node,
    total: Number,
    successes: Int,
    fails: Int,
    errors: Vec<String>,
}

impl DiceResult {
    pub(crate) fn new(tree: Node, total: Number, errors: Vec<String>) -> Self {
        let (successes, fails) = count_outcomes(&tree);
        Self {
            tree,
            total,
            successes,
            fails,
            errors,
        }
    }

    /// The evaluated tree, with every die rolled and every value filled in.
    pub fn tree(&self) -> &Node {
        &self.tree
    }

    pub fn into_tree(self) -> Node {
        self.tree
    }

    pub fn total(&self) -> Number {
        self.total
    }

    pub fn successes(&self) -> Int {
        self.successes
    }

    pub fn fails(&self) -> Int {
        self.fails
    }

    /// Messages for rolls that were skipped and operations that could not be
    /// carried out. The total is still valid when this is not empty.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn dice_rolls(&self) -> Vec<&Node> {
        self.tree.dice_rolls()
    }

    pub(crate) fn prepend_errors(&mut self, errors: impl IntoIterator<Item = String>) {
        let mut all: Vec<_> = errors.into_iter().collect();
        all.append(&mut self.errors);
        self.errors = all;
    }
}

/// Sums the outermost counts. A comparison nested inside a counted one is
/// already reflected in the outer value.
fn count_outcomes(node: &Node) -> (Int, Int) {
    if node.is_counted() {
        let count = |key| node.number_attr(key).map_or(0, Number::as_int);
        return (count(attr::SUCCESSES), count(attr::FAILS));
    }
    node.children
        .iter()
        .map(count_outcomes)
        .fold((0, 0), |(s, f), (cs, cf)| (s + cs, f + cf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::ast::NodeKind;

    fn comparison(successes: Int, fails: Int, children: Vec<Node>) -> Node {
        let mut node = Node::with_children(NodeKind::Greater, children);
        node.set_attr(attr::SUCCESSES, successes);
        node.set_attr(attr::FAILS, fails);
        node
    }

    #[test]
    fn test_outcomes_sum_over_tree() {
        let tree = Node::with_children(
            NodeKind::Group,
            vec![
                comparison(2, 1, vec![Node::integer(1), Node::integer(2)]),
                comparison(0, 3, vec![Node::integer(1), Node::integer(2)]),
            ],
        );
        let result = DiceResult::new(tree, Number::from(2), vec![]);
        assert_eq!((result.successes(), result.fails()), (2, 4));
    }

    #[test]
    fn test_nested_counts_are_not_summed() {
        let inner = comparison(3, 0, vec![Node::integer(3), Node::integer(3)]);
        let tree = comparison(1, 0, vec![inner, Node::integer(0)]);
        let result = DiceResult::new(tree.clone(), Number::from(1), vec![]);
        assert_eq!((result.successes(), result.fails()), (1, 0));
        assert_eq!(result.into_tree(), tree);
    }

    #[test]
    fn test_prepend_errors() {
        let mut result = DiceResult::new(Node::integer(0), Number::ZERO, vec!["late".to_owned()]);
        result.prepend_errors(vec!["early".to_owned()]);
        assert_eq!(result.errors(), &["early".to_owned(), "late".to_owned()]);
    }
}
