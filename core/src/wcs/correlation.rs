//! Pure queries over the world × pixel axis-correlation matrix.

use ndarray::ArrayView2;

/// World axes influenced by the given pixel axis, ascending.
pub fn world_axes_for_pixel(matrix: ArrayView2<bool>, pixel_axis: usize) -> Vec<usize> {
    matrix
        .column(pixel_axis)
        .iter()
        .enumerate()
        .filter(|(_, correlated)| **correlated)
        .map(|(world_axis, _)| world_axis)
        .collect()
}

/// Pixel axes influencing the given world axis, ascending.
pub fn pixel_axes_for_world(matrix: ArrayView2<bool>, world_axis: usize) -> Vec<usize> {
    matrix
        .row(world_axis)
        .iter()
        .enumerate()
        .filter(|(_, correlated)| **correlated)
        .map(|(pixel_axis, _)| pixel_axis)
        .collect()
}

/// All pixel axes sharing at least one world axis with the given pixel axis,
/// the axis itself included, ascending.
pub fn dependent_pixel_axes(matrix: ArrayView2<bool>, pixel_axis: usize) -> Vec<usize> {
    let mut dependent: Vec<usize> = (0..matrix.ncols())
        .filter(|&other| {
            other == pixel_axis
                || matrix
                    .column(pixel_axis)
                    .iter()
                    .zip(matrix.column(other).iter())
                    .any(|(a, b)| *a && *b)
        })
        .collect();
    dependent.sort_unstable();
    dependent
}

/// A maximal set of pixel axes whose world-axis influences overlap, paired
/// with the world axes they jointly resolve. Axes in a group must be
/// transformed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisGroup {
    pub pixel_axes: Vec<usize>,
    pub world_axes: Vec<usize>,
}

/// Partitions the pixel axes into maximal dependent groups (transitive
/// closure of [`dependent_pixel_axes`]). Groups are ordered by their lowest
/// world axis; axes within a group are ascending. World axes uncorrelated
/// with every pixel axis belong to no group.
pub fn axis_groups(matrix: ArrayView2<bool>) -> Vec<AxisGroup> {
    let n_pixel = matrix.ncols();
    let mut visited = vec![false; n_pixel];
    let mut groups = Vec::new();

    for seed in 0..n_pixel {
        if visited[seed] {
            continue;
        }
        let mut pixel_axes = vec![seed];
        visited[seed] = true;
        let mut frontier = vec![seed];
        while let Some(axis) = frontier.pop() {
            for other in dependent_pixel_axes(matrix, axis) {
                if !visited[other] {
                    visited[other] = true;
                    pixel_axes.push(other);
                    frontier.push(other);
                }
            }
        }
        pixel_axes.sort_unstable();

        let mut world_axes: Vec<usize> = pixel_axes
            .iter()
            .flat_map(|&p| world_axes_for_pixel(matrix, p))
            .collect();
        world_axes.sort_unstable();
        world_axes.dedup();

        groups.push(AxisGroup {
            pixel_axes,
            world_axes,
        });
    }

    groups.sort_by_key(|g| g.world_axes.first().copied().unwrap_or(usize::MAX));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // wave on pixel 0, a celestial pair coupled across pixels 1 and 2
    fn split_matrix() -> ndarray::Array2<bool> {
        array![
            [true, false, false],
            [false, true, true],
            [false, true, true],
        ]
    }

    #[test]
    fn per_axis_lookups() {
        let m = split_matrix();
        assert_eq!(world_axes_for_pixel(m.view(), 0), vec![0]);
        assert_eq!(world_axes_for_pixel(m.view(), 2), vec![1, 2]);
        assert_eq!(pixel_axes_for_world(m.view(), 1), vec![1, 2]);
    }

    #[test]
    fn dependent_axes_include_self() {
        let m = split_matrix();
        assert_eq!(dependent_pixel_axes(m.view(), 0), vec![0]);
        assert_eq!(dependent_pixel_axes(m.view(), 1), vec![1, 2]);
        assert_eq!(dependent_pixel_axes(m.view(), 2), vec![1, 2]);
    }

    #[test]
    fn groups_split_independent_from_coupled() {
        let groups = axis_groups(split_matrix().view());
        assert_eq!(
            groups,
            vec![
                AxisGroup {
                    pixel_axes: vec![0],
                    world_axes: vec![0],
                },
                AxisGroup {
                    pixel_axes: vec![1, 2],
                    world_axes: vec![1, 2],
                },
            ]
        );
    }

    #[test]
    fn diagonal_matrix_gives_singleton_groups() {
        let m = array![[true, false], [false, true]];
        let groups = axis_groups(m.view());
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.pixel_axes.len() == 1));
    }
}
