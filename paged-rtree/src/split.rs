//! Partitioning of an overflowing node's branches into two groups.
//!
//! Both strategies are deterministic: ties are always resolved by a fixed
//! order (lower axis, the min-sorted ordering, the smaller first group, the
//! lower branch index), and each output group keeps the input order of its
//! branches.

use std::cmp::Ordering;

use crate::config::{SplitMethod, TreeConfig};
use crate::errors::{RTreeError, RTreeResult};
use crate::node::Branch;
use crate::rect::Rect;

/// Splits `branches` of a node at `level` into two groups, each holding at
/// least `config.min_split_fill(level)` branches.
pub(crate) fn split(
    branches: Vec<Branch>,
    level: u32,
    config: &TreeConfig,
) -> RTreeResult<(Vec<Branch>, Vec<Branch>)> {
    let min_fill = config.min_split_fill(level);
    let count = branches.len();
    if count < 2 || count < 2 * min_fill {
        return Err(RTreeError::InvalidOperation(format!(
            "cannot split {} branches into two groups of at least {}",
            count, min_fill
        )));
    }

    let rects: Vec<&Rect> = branches.iter().map(|b| &b.rect).collect();
    let in_first = match config.split_method() {
        SplitMethod::RStar => rstar_partition(&rects, min_fill, config.dimensions()),
        SplitMethod::Quadratic => quadratic_partition(&rects, min_fill, config.dimensions()),
    };

    let mut first = Vec::with_capacity(count);
    let mut second = Vec::with_capacity(count);
    for (branch, goes_first) in branches.into_iter().zip(in_first) {
        if goes_first {
            first.push(branch);
        } else {
            second.push(branch);
        }
    }
    log::debug!(
        "Split {} branches at level {} into {} + {}",
        count,
        level,
        first.len(),
        second.len()
    );
    Ok((first, second))
}

/// Lexicographic comparison of cost tuples.
fn compare_costs(a: &[f64], b: &[f64]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Branch indices sorted along `axis`, either by lower edge or by upper
/// edge, with the other edge and then the index as tie-breakers.
fn sorted_along(rects: &[&Rect], axis: usize, by_upper: bool) -> Vec<usize> {
    let mut order: Vec<usize> = (0..rects.len()).collect();
    order.sort_by(|&a, &b| {
        let (ra, rb) = (rects[a], rects[b]);
        let (primary, secondary) = if by_upper {
            (
                ra.max()[axis].total_cmp(&rb.max()[axis]),
                ra.min()[axis].total_cmp(&rb.min()[axis]),
            )
        } else {
            (
                ra.min()[axis].total_cmp(&rb.min()[axis]),
                ra.max()[axis].total_cmp(&rb.max()[axis]),
            )
        };
        primary.then(secondary).then(a.cmp(&b))
    });
    order
}

/// Covers of every prefix and every suffix of `order`:
/// `prefix[k]` bounds `order[..k]`, `suffix[k]` bounds `order[k..]`.
fn prefix_suffix_covers(
    rects: &[&Rect],
    order: &[usize],
    dimensions: usize,
) -> (Vec<Rect>, Vec<Rect>) {
    let n = order.len();
    let mut prefix = Vec::with_capacity(n + 1);
    let mut cover = Rect::null(dimensions);
    prefix.push(cover.clone());
    for &i in order {
        cover.expand(rects[i]);
        prefix.push(cover.clone());
    }

    let mut suffix = vec![Rect::null(dimensions); n + 1];
    let mut cover = Rect::null(dimensions);
    for k in (0..n).rev() {
        cover.expand(rects[order[k]]);
        suffix[k] = cover.clone();
    }
    (prefix, suffix)
}

/// R*-tree topological split.
///
/// The split axis is the one whose candidate distributions have the
/// smallest total margin. Along it, the distribution with the least overlap
/// between the two covers wins, then the least total area, then the least
/// total margin.
fn rstar_partition(rects: &[&Rect], min_fill: usize, dimensions: usize) -> Vec<bool> {
    let n = rects.len();
    let mut best_axis = 0;
    let mut best_margin = f64::INFINITY;
    let mut orderings = Vec::with_capacity(dimensions);

    for axis in 0..dimensions {
        let mut margin_sum = 0.0;
        let mut axis_orderings = Vec::with_capacity(2);
        for by_upper in [false, true] {
            let order = sorted_along(rects, axis, by_upper);
            let (prefix, suffix) = prefix_suffix_covers(rects, &order, dimensions);
            for k in min_fill..=n - min_fill {
                margin_sum += prefix[k].margin() + suffix[k].margin();
            }
            axis_orderings.push((order, prefix, suffix));
        }
        if margin_sum < best_margin {
            best_margin = margin_sum;
            best_axis = axis;
        }
        orderings.push(axis_orderings);
    }

    let mut best: Option<([f64; 3], usize, usize)> = None;
    for (which, (_, prefix, suffix)) in orderings[best_axis].iter().enumerate() {
        for k in min_fill..=n - min_fill {
            let (a, b) = (&prefix[k], &suffix[k]);
            let cost = [
                a.overlap_area(b),
                a.area() + b.area(),
                a.margin() + b.margin(),
            ];
            let improves = match &best {
                None => true,
                Some((best_cost, _, _)) => compare_costs(&cost, best_cost) == Ordering::Less,
            };
            if improves {
                best = Some((cost, which, k));
            }
        }
    }

    let mut in_first = vec![false; n];
    if let Some((_, which, k)) = best {
        let (order, _, _) = &orderings[best_axis][which];
        for &i in &order[..k] {
            in_first[i] = true;
        }
    }
    in_first
}

/// Guttman's quadratic split.
///
/// Seeds are the pair that would waste the most area if grouped together.
/// The remaining branches are then assigned one at a time, always picking
/// the branch with the strongest preference for one group.
fn quadratic_partition(rects: &[&Rect], min_fill: usize, dimensions: usize) -> Vec<bool> {
    let n = rects.len();

    let (mut seed_a, mut seed_b) = (0, 1);
    let mut worst_waste = f64::NEG_INFINITY;
    for i in 0..n {
        for j in (i + 1)..n {
            let waste = rects[i].combine(rects[j]).area() - rects[i].area() - rects[j].area();
            if waste > worst_waste {
                worst_waste = waste;
                seed_a = i;
                seed_b = j;
            }
        }
    }

    let mut in_first = vec![false; n];
    in_first[seed_a] = true;
    let mut covers = [Rect::null(dimensions), Rect::null(dimensions)];
    covers[0].expand(rects[seed_a]);
    covers[1].expand(rects[seed_b]);
    let mut sizes = [1usize, 1usize];
    let mut remaining: Vec<usize> = (0..n).filter(|&i| i != seed_a && i != seed_b).collect();

    while !remaining.is_empty() {
        // a group that needs every remaining branch to reach min fill takes them all
        if sizes[0] + remaining.len() <= min_fill {
            for &i in &remaining {
                in_first[i] = true;
            }
            break;
        }
        if sizes[1] + remaining.len() <= min_fill {
            break;
        }

        let mut pick = 0;
        let mut strongest = f64::NEG_INFINITY;
        for (position, &i) in remaining.iter().enumerate() {
            let d0 = covers[0].enlargement(rects[i]);
            let d1 = covers[1].enlargement(rects[i]);
            let preference = (d0 - d1).abs();
            if preference > strongest {
                strongest = preference;
                pick = position;
            }
        }
        let i = remaining.remove(pick);

        let d0 = covers[0].enlargement(rects[i]);
        let d1 = covers[1].enlargement(rects[i]);
        let group = match d0.total_cmp(&d1) {
            Ordering::Less => 0,
            Ordering::Greater => 1,
            Ordering::Equal => match covers[0].area().total_cmp(&covers[1].area()) {
                Ordering::Less => 0,
                Ordering::Greater => 1,
                Ordering::Equal => {
                    if sizes[1] < sizes[0] {
                        1
                    } else {
                        0
                    }
                }
            },
        };
        in_first[i] = group == 0;
        covers[group].expand(rects[i]);
        sizes[group] += 1;
    }
    in_first
}
