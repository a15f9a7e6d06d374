use crate::utils::Result;
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;

/// Shuffle `0..num_items` and deal the indices round-robin into `k` folds,
/// so fold sizes differ by at most one.
pub fn split_folds<R: Rng>(num_items: usize, k: usize, rng: &mut R) -> Result<Vec<Vec<usize>>> {
    if k < 2 {
        return Err(format!("Cross-validation needs at least 2 folds, got {}", k));
    }
    if num_items < k {
        return Err(format!(
            "Cannot split {} events into {} folds",
            num_items, k
        ));
    }

    let mut order = (0..num_items).collect_vec();
    order.shuffle(rng);

    Ok((0..k)
        .map(|fold| order.iter().skip(fold).step_by(k).copied().collect_vec())
        .collect_vec())
}

/// Indices of every fold except `held_out`, in fold order.
pub fn training_indices(folds: &[Vec<usize>], held_out: usize) -> Vec<usize> {
    folds
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != held_out)
        .flat_map(|(_, fold)| fold.iter().copied())
        .collect_vec()
}
