//! Grouping of rows by target class.

use crate::mask::ValidityMask;

/// Number of members of one class among the usable rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassCount {
    /// The class label.
    pub label: f64,
    /// Number of usable rows carrying that label.
    pub count: usize,
}

/// Members of one class, in the order they were supplied.
#[derive(Debug, Clone)]
pub(crate) struct ClassGroup {
    pub(crate) label: f64,
    pub(crate) members: Vec<usize>,
}

// -0.0 and 0.0 are the same class.
fn canonical(label: f64) -> f64 {
    if label == 0.0 { 0.0 } else { label }
}

/// Group `items` by `labels[item]`, classes ordered numerically.
///
/// Within a class, members keep their relative order from `items`.
pub(crate) fn group_by_class(labels: &[f64], items: &[usize]) -> Vec<ClassGroup> {
    let mut keyed: Vec<(f64, usize)> = items
        .iter()
        .map(|&i| (canonical(labels[i]), i))
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut groups: Vec<ClassGroup> = Vec::new();
    for (label, item) in keyed {
        match groups.last_mut() {
            Some(group) if group.label.total_cmp(&label).is_eq() => group.members.push(item),
            _ => groups.push(ClassGroup {
                label,
                members: vec![item],
            }),
        }
    }
    groups
}

/// Per-class member counts among the rows where `mask` is set.
#[must_use]
pub fn class_counts(labels: &[f64], mask: &ValidityMask) -> Vec<ClassCount> {
    let rows: Vec<usize> = mask.indices().into_iter().filter(|&i| i < labels.len()).collect();
    group_by_class(labels, &rows)
        .into_iter()
        .map(|g| ClassCount {
            label: g.label,
            count: g.members.len(),
        })
        .collect()
}
