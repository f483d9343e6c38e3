use std::ops::Range;

/// Greedily packs consecutive items into batches.
///
/// A batch closes when the next item would push it past `max_items` or past
/// `token_budget`. An item larger than the budget still gets its own batch.
pub fn plan_batches(costs: &[usize], max_items: usize, token_budget: usize) -> Vec<Range<usize>> {
    let max_items = max_items.max(1);
    let mut batches = Vec::new();
    let mut start = 0;
    let mut tokens = 0;

    for (index, cost) in costs.iter().copied().enumerate() {
        let len = index - start;
        if len > 0 && (len == max_items || tokens + cost > token_budget) {
            batches.push(start..index);
            start = index;
            tokens = 0;
        }
        tokens += cost;
    }
    if start < costs.len() {
        batches.push(start..costs.len());
    }
    batches
}
