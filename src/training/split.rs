// Stratified train/test split.
//
// The test set takes ceil(test_size * n) rows. Each class contributes the
// floor of its proportional share, and the leftover rows go to the classes
// with the largest fractional remainders, so class proportions carry over
// to both sides. Shuffling uses a seeded StdRng, so a given seed always
// produces the same split.

use std::collections::BTreeMap;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// The two sides of a split.
#[derive(Debug, Clone)]
pub struct Split<T> {
    pub train: Vec<T>,
    pub test: Vec<T>,
}

/// Split `items` into train and test sets, stratified by `class_of`.
pub fn stratified_split<T, K, F>(
    items: &[T],
    class_of: F,
    test_size: f64,
    seed: u64,
) -> Result<Split<T>>
where
    T: Clone,
    K: Ord + Copy + std::fmt::Debug,
    F: Fn(&T) -> K,
{
    if !(test_size > 0.0 && test_size < 1.0) {
        anyhow::bail!("test_size must be between 0 and 1, got {test_size}");
    }

    let n = items.len();
    let n_test = (test_size * n as f64).ceil() as usize;
    let n_train = n.saturating_sub(n_test);

    // Group row indices by class; BTreeMap keeps class order deterministic.
    let mut classes: BTreeMap<K, Vec<usize>> = BTreeMap::new();
    for (i, item) in items.iter().enumerate() {
        classes.entry(class_of(item)).or_default().push(i);
    }

    if let Some((class, members)) = classes.iter().find(|(_, m)| m.len() < 2) {
        anyhow::bail!(
            "Class {class:?} has only {} row(s); a stratified split needs at least 2 per class",
            members.len()
        );
    }
    let n_classes = classes.len();
    if n_test < n_classes || n_train < n_classes {
        anyhow::bail!(
            "A {n_train}/{n_test} train/test split of {n} rows can't hold all {n_classes} classes \
             on both sides"
        );
    }

    let counts: Vec<usize> = classes.values().map(Vec::len).collect();
    let test_counts = allocate(&counts, n_test);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train_idx = Vec::with_capacity(n_train);
    let mut test_idx = Vec::with_capacity(n_test);
    for (members, take) in classes.into_values().zip(test_counts) {
        let mut members = members;
        members.shuffle(&mut rng);
        test_idx.extend_from_slice(&members[..take]);
        train_idx.extend_from_slice(&members[take..]);
    }

    // Interleave the classes.
    train_idx.shuffle(&mut rng);
    test_idx.shuffle(&mut rng);

    Ok(Split {
        train: train_idx.into_iter().map(|i| items[i].clone()).collect(),
        test: test_idx.into_iter().map(|i| items[i].clone()).collect(),
    })
}

/// Distribute `total` draws across classes in proportion to `counts`.
///
/// Floors first, then hands the remainder to the largest fractional parts
/// (earlier classes win ties). Never gives a class more than it has.
fn allocate(counts: &[usize], total: usize) -> Vec<usize> {
    let n: usize = counts.iter().sum();
    if n == 0 {
        return vec![0; counts.len()];
    }

    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| c as f64 * total as f64 / n as f64)
        .collect();
    let mut alloc: Vec<usize> = exact
        .iter()
        .zip(counts)
        .map(|(e, &c)| (e.floor() as usize).min(c))
        .collect();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut remaining = total.saturating_sub(alloc.iter().sum());
    while remaining > 0 {
        let before = remaining;
        for &i in &order {
            if remaining == 0 {
                break;
            }
            if alloc[i] < counts[i] {
                alloc[i] += 1;
                remaining -= 1;
            }
        }
        if remaining == before {
            break;
        }
    }

    alloc
}
