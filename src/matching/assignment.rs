//! Minimum-cost bipartite assignment (Kuhn–Munkres, shortest augmenting
//! path formulation with row/column potentials).

/// Cost used to square up a rectangular input. Large enough that a padding
/// cell is only chosen when nothing else is left.
pub const SOLVER_PADDING_COST: f64 = 1.0e9;

/// Assign every row of `cost` to a distinct column so the total cost is
/// minimal.
///
/// The input may be rectangular (`n` rows, `m` columns, ragged rows are
/// treated as padded). The result has one entry per input row: `Some(col)`
/// with `col < m`, or `None` when the row could only be given one of the
/// solver's own padding columns (possible only when `n > m`).
pub fn solve(cost: &[Vec<f64>]) -> Vec<Option<usize>> {
    let n = cost.len();
    let m = cost.iter().map(Vec::len).max().unwrap_or(0);
    if n == 0 || m == 0 {
        return Vec::new();
    }
    let size = n.max(m);

    let mut a = vec![vec![SOLVER_PADDING_COST; size]; size];
    for (i, row) in cost.iter().enumerate() {
        a[i][..row.len()].copy_from_slice(row);
    }

    // 1-based potentials and matching; index 0 is the virtual source column.
    let mut u = vec![0.0_f64; size + 1];
    let mut v = vec![0.0_f64; size + 1];
    let mut p = vec![0_usize; size + 1];
    let mut way = vec![0_usize; size + 1];

    for i in 1..=size {
        p[0] = i;
        let mut j0 = 0;
        let mut minv = vec![f64::INFINITY; size + 1];
        let mut used = vec![false; size + 1];

        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0;
            for j in 1..=size {
                if used[j] {
                    continue;
                }
                let reduced = a[i0 - 1][j - 1] - u[i0] - v[j];
                if reduced < minv[j] {
                    minv[j] = reduced;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }
            for j in 0..=size {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }

        // Flip the augmenting path back to the source.
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![None; size];
    for j in 1..=size {
        if p[j] != 0 {
            assignment[p[j] - 1] = Some(j - 1);
        }
    }

    assignment
        .into_iter()
        .take(n)
        .map(|column| column.filter(|&col| col < m))
        .collect()
}

/// Sum of the chosen cells, skipping unassigned rows.
pub fn total_cost(cost: &[Vec<f64>], assignment: &[Option<usize>]) -> f64 {
    assignment
        .iter()
        .enumerate()
        .filter_map(|(row, column)| column.map(|col| cost[row][col]))
        .sum()
}
