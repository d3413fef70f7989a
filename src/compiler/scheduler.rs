use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Orders the included blocks so that every block comes after all of its
/// upstream blocks. Among blocks that are ready at the same time, the one
/// declared first in the graph runs first.
///
/// `edges` are `(source, target)` pairs of declaration indices; edges touching
/// an excluded block are ignored. Returns `None` if the included subgraph has
/// a cycle.
pub(super) fn schedule(included: &[bool], edges: &[(usize, usize)]) -> Option<Vec<usize>> {
    let block_count = included.len();
    let mut in_degree = vec![0usize; block_count];
    let mut downstream: Vec<Vec<usize>> = vec![Vec::new(); block_count];

    for &(source, target) in edges {
        if included[source] && included[target] {
            in_degree[target] += 1;
            downstream[source].push(target);
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = (0..block_count)
        .filter(|&i| included[i] && in_degree[i] == 0)
        .map(Reverse)
        .collect();

    let mut order = Vec::with_capacity(block_count);
    while let Some(Reverse(index)) = ready.pop() {
        order.push(index);
        for &next in &downstream[index] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    let expected = included.iter().filter(|&&i| i).count();
    (order.len() == expected).then_some(order)
}

#[cfg(test)]
mod tests {
    use super::schedule;

    #[test]
    fn ties_follow_declaration_order() {
        // 0 -> 3, 2 -> 3, 1 is independent
        let order = schedule(&[true; 4], &[(0, 3), (2, 3)]).unwrap();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn dependencies_override_declaration_order() {
        // 2 -> 0 -> 1
        let order = schedule(&[true; 3], &[(2, 0), (0, 1)]).unwrap();
        assert_eq!(order, vec![2, 0, 1]);
    }

    #[test]
    fn excluded_blocks_are_skipped() {
        let order = schedule(&[true, false, true], &[(0, 1), (1, 2)]).unwrap();
        assert_eq!(order, vec![0, 2]);
    }

    #[test]
    fn cycle_yields_none() {
        assert!(schedule(&[true; 2], &[(0, 1), (1, 0)]).is_none());
    }
}
