use anyhow::{ensure, Result};
use hausdorff_core::nalgebra::DVector;
use itertools::Itertools;

/// Covering radius of a cubic cell with edge length `cell_edge` in `dim` dimensions: the distance from the cell
/// center to any of its corners
pub fn covering_radius(dim: usize, cell_edge: f64) -> f64 {
    (dim as f64).sqrt() * cell_edge / 2.0
}

/// A single vertex of a [Lattice]
#[derive(Debug, Clone, PartialEq)]
pub struct LatticeVertex {
    /// Center of the cubic cell that this vertex represents
    pub cell_center: DVector<f64>,
    /// The representative position of the cell. Equal to `cell_center`, unless the cell center lies outside of
    /// the covered ball, in which case it is the radial projection of the cell center onto the ball surface
    pub position: DVector<f64>,
}

/// A set of vertices that covers a ball: every point within `radius` of `center` lies within `covering_radius`
/// of the `position` of some vertex
#[derive(Debug, Clone)]
pub struct Lattice {
    cell_edge: f64,
    covering_radius: f64,
    vertices: Vec<LatticeVertex>,
}

impl Lattice {
    /// Edge length of the cells of this lattice
    pub fn cell_edge(&self) -> f64 {
        self.cell_edge
    }

    pub fn covering_radius(&self) -> f64 {
        self.covering_radius
    }

    pub fn vertices(&self) -> &[LatticeVertex] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Discretizes a ball into a regular cubic lattice. The same builder is used for translations and for rotation
/// parameters, so it works in any dimension.
///
/// The cube that is partitioned defaults to the cube with edge length `2 * radius` around the center (the smallest
/// cube containing the ball). The cube is split into `n = ceil(cube_edge / cell_edge)` cells per axis, so the cell
/// edge that is actually used may be smaller than the requested one. Cells that can't contain any point of the
/// ball are dropped, cell centers outside of the ball are projected onto its surface
/// ```
/// # use hausdorff_algorithms::grid::GridBuilder;
/// # use hausdorff_core::nalgebra::DVector;
/// let lattice = GridBuilder::new(DVector::zeros(2), 0.5, 1.0).build().unwrap();
/// assert_eq!(lattice.cell_edge(), 0.5);
/// assert!(lattice.len() <= 16);
/// ```
#[derive(Debug, Clone)]
pub struct GridBuilder {
    center: DVector<f64>,
    cell_edge: f64,
    radius: f64,
    cube_edge: Option<f64>,
}

impl GridBuilder {
    pub fn new(center: DVector<f64>, cell_edge: f64, radius: f64) -> Self {
        Self {
            center,
            cell_edge,
            radius,
            cube_edge: None,
        }
    }

    /// Use a cube with the given edge length instead of the default `2 * radius`
    pub fn with_cube_edge(mut self, cube_edge: f64) -> Self {
        self.cube_edge = Some(cube_edge);
        self
    }

    pub fn dim(&self) -> usize {
        self.center.len()
    }

    pub fn center(&self) -> &DVector<f64> {
        &self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.dim() > 0, "Lattice center must have at least one dimension");
        ensure!(
            self.center.iter().all(|c| c.is_finite()),
            "Lattice center must be finite"
        );
        ensure!(
            self.cell_edge.is_finite() && self.cell_edge > 0.0,
            "Cell edge must be finite and positive, got {}",
            self.cell_edge
        );
        ensure!(
            self.radius.is_finite() && self.radius >= 0.0,
            "Radius must be finite and non-negative, got {}",
            self.radius
        );
        if let Some(cube_edge) = self.cube_edge {
            ensure!(
                cube_edge.is_finite() && cube_edge > 0.0,
                "Cube edge must be finite and positive, got {}",
                cube_edge
            );
        }
        Ok(())
    }

    /// Builds the lattice covering the whole ball
    pub fn build(&self) -> Result<Lattice> {
        self.validate()?;
        let cube_edge = match self.cube_edge {
            Some(edge) => edge,
            // a ball of radius zero is covered by a single cell
            None if self.radius == 0.0 => self.cell_edge,
            None => 2.0 * self.radius,
        };
        let cells_per_axis = ((cube_edge / self.cell_edge).ceil() as usize).max(1);
        Ok(self.fill_cube(&self.center, cube_edge, cells_per_axis))
    }

    /// Splits the cell with the given center and edge length into `branching` cells per axis. The resulting
    /// vertices cover all points of the parent cell that are inside the ball of this builder
    pub fn subdivide(
        &self,
        cell_center: &DVector<f64>,
        cell_edge: f64,
        branching: usize,
    ) -> Result<Lattice> {
        self.validate()?;
        ensure!(
            cell_center.len() == self.dim(),
            "Cell center has dimension {} but the lattice has dimension {}",
            cell_center.len(),
            self.dim()
        );
        ensure!(
            cell_edge.is_finite() && cell_edge > 0.0,
            "Cell edge must be finite and positive, got {}",
            cell_edge
        );
        ensure!(branching >= 1, "Branching factor must be at least 1");
        Ok(self.fill_cube(cell_center, cell_edge, branching))
    }

    /// Creates the cells of a cube split into `cells_per_axis` cells per axis and places their vertices
    /// relative to the ball
    fn fill_cube(
        &self,
        cube_center: &DVector<f64>,
        cube_edge: f64,
        cells_per_axis: usize,
    ) -> Lattice {
        let dim = self.dim();
        let cell_edge = cube_edge / cells_per_axis as f64;
        let covering_radius = covering_radius(dim, cell_edge);
        let first_center = cube_center.add_scalar((cell_edge - cube_edge) / 2.0);

        let cell_centers = (0..dim)
            .map(|_| 0..cells_per_axis)
            .multi_cartesian_product()
            .map(|index| {
                DVector::from_iterator(
                    dim,
                    index
                        .iter()
                        .enumerate()
                        .map(|(axis, &i)| first_center[axis] + i as f64 * cell_edge),
                )
            })
            .collect::<Vec<_>>();

        let mut vertices = cell_centers
            .iter()
            .filter(|cell_center| {
                (*cell_center - &self.center).norm() <= self.radius + covering_radius
            })
            .map(|cell_center| self.place(cell_center))
            .collect::<Vec<_>>();

        if vertices.is_empty() {
            // Only reachable through rounding at the ball boundary. Keep the closest cell, so that a subdivision
            // never yields an empty lattice
            let closest = cell_centers.iter().min_by(|l, r| {
                (*l - &self.center)
                    .norm()
                    .total_cmp(&(*r - &self.center).norm())
            });
            if let Some(cell_center) = closest {
                vertices.push(self.place(cell_center));
            }
        }

        Lattice {
            cell_edge,
            covering_radius,
            vertices,
        }
    }

    /// Projects cell centers outside of the ball onto the ball surface
    fn place(&self, cell_center: &DVector<f64>) -> LatticeVertex {
        let offset = cell_center - &self.center;
        let distance = offset.norm();
        let position = if distance > self.radius {
            &self.center + offset * (self.radius / distance)
        } else {
            cell_center.clone()
        };
        LatticeVertex {
            cell_center: cell_center.clone(),
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_point_in_ball<R: Rng>(rng: &mut R, center: &DVector<f64>, radius: f64) -> DVector<f64> {
        loop {
            let candidate = DVector::from_iterator(
                center.len(),
                (0..center.len()).map(|_| rng.gen_range(-1.0..1.0)),
            );
            if candidate.norm() <= 1.0 {
                return center + candidate * radius;
            }
        }
    }

    fn distance_to_nearest_vertex(lattice: &Lattice, point: &DVector<f64>) -> f64 {
        lattice
            .vertices()
            .iter()
            .map(|v| (&v.position - point).norm())
            .fold(f64::INFINITY, f64::min)
    }

    #[test]
    fn test_single_cell_lattice() -> Result<()> {
        let lattice = GridBuilder::new(DVector::zeros(3), 4.0, 1.0).build()?;
        assert_eq!(lattice.len(), 1);
        assert_eq!(lattice.cell_edge(), 2.0);
        assert_eq!(lattice.vertices()[0].position, DVector::zeros(3));
        assert!((lattice.covering_radius() - 3.0_f64.sqrt()).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_cell_edge_is_shrunk_to_divide_cube_evenly() -> Result<()> {
        let lattice = GridBuilder::new(DVector::zeros(1), 0.3, 1.0).build()?;
        // 2.0 / 0.3 -> 7 cells per axis
        assert!((lattice.cell_edge() - 2.0 / 7.0).abs() < 1e-12);
        assert_eq!(lattice.len(), 7);
        Ok(())
    }

    #[test]
    fn test_rotation_lattices() -> Result<()> {
        use std::f64::consts::PI;
        let planar = GridBuilder::new(DVector::zeros(1), 2.0, PI).build()?;
        assert_eq!(planar.len(), 4);
        assert!((planar.cell_edge() - PI / 2.0).abs() < 1e-12);

        let spatial = GridBuilder::new(DVector::zeros(3), 4.0, PI).build()?;
        assert_eq!(spatial.len(), 8);
        assert!((spatial.cell_edge() - PI).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_vertices_are_inside_ball() -> Result<()> {
        let center = DVector::from_vec(vec![1.0, -2.0]);
        let lattice = GridBuilder::new(center.clone(), 0.35, 2.5).build()?;
        for vertex in lattice.vertices() {
            assert!((&vertex.position - &center).norm() <= 2.5 + 1e-12);
        }
        Ok(())
    }

    #[test]
    fn test_zero_radius_ball() -> Result<()> {
        let center = DVector::from_vec(vec![1.0, 2.0]);
        let lattice = GridBuilder::new(center.clone(), 0.5, 0.0).build()?;
        assert_eq!(lattice.len(), 1);
        assert_eq!(lattice.vertices()[0].position, center);
        Ok(())
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(GridBuilder::new(DVector::zeros(2), 0.0, 1.0).build().is_err());
        assert!(GridBuilder::new(DVector::zeros(2), 1.0, -1.0).build().is_err());
        assert!(GridBuilder::new(DVector::zeros(0), 1.0, 1.0).build().is_err());
        assert!(GridBuilder::new(DVector::zeros(2), 1.0, 1.0)
            .with_cube_edge(f64::NAN)
            .build()
            .is_err());
    }

    #[test]
    fn test_lattice_covers_ball() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(2024);
        for dim in 1..=3 {
            for _ in 0..20 {
                let center = DVector::from_iterator(dim, (0..dim).map(|_| rng.gen_range(-5.0..5.0)));
                let radius = rng.gen_range(0.1..4.0);
                let cell_edge = rng.gen_range(0.05..2.0) * radius;
                let lattice = GridBuilder::new(center.clone(), cell_edge, radius).build()?;
                assert!(lattice.cell_edge() <= cell_edge + 1e-12);
                for _ in 0..200 {
                    let point = random_point_in_ball(&mut rng, &center, radius);
                    assert!(distance_to_nearest_vertex(&lattice, &point) <= lattice.covering_radius() + 1e-9);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_subdivision_covers_parent_cell() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(77);
        for dim in 1..=3 {
            let builder = GridBuilder::new(DVector::zeros(dim), 0.6, 1.0);
            let lattice = builder.build()?;
            for parent in lattice.vertices() {
                let children = builder.subdivide(&parent.cell_center, lattice.cell_edge(), 2)?;
                assert!(!children.is_empty());
                assert!(children.len() <= 1 << dim);
                assert!((children.cell_edge() - lattice.cell_edge() / 2.0).abs() < 1e-12);
                for _ in 0..100 {
                    // random point of the parent cell, kept only if it is inside the ball
                    let offset = DVector::from_iterator(
                        dim,
                        (0..dim).map(|_| rng.gen_range(-0.5..0.5) * lattice.cell_edge()),
                    );
                    let point = &parent.cell_center + offset;
                    if point.norm() > 1.0 {
                        continue;
                    }
                    assert!(distance_to_nearest_vertex(&children, &point) <= children.covering_radius() + 1e-9);
                    // the parent position covers it as well
                    assert!((&parent.position - &point).norm() <= lattice.covering_radius() + 1e-9);
                }
            }
        }
        Ok(())
    }
}
