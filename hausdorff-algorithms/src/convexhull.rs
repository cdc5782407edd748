use nalgebra::{Vector2, Vector3};
use std::collections::HashSet;

/// Relative tolerance for visibility and degeneracy tests, scaled by the extent of the input
const RELATIVE_EPSILON: f64 = 1e-12;

#[derive(Clone, Copy, Debug)]
struct Triangle {
    a: usize,
    b: usize,
    c: usize,
    normal: Vector3<f64>,
}

impl Triangle {
    /// Creates the triangle `a`, `b`, `c` with its normal pointing away from `interior`
    fn oriented(points: &[Vector3<f64>], a: usize, b: usize, c: usize, interior: &Vector3<f64>) -> Self {
        let normal = calc_normal(points[a], points[b], points[c]);
        if normal.dot(&(interior - points[a])) > 0.0 {
            Triangle {
                a,
                b: c,
                c: b,
                normal: -normal,
            }
        } else {
            Triangle { a, b, c, normal }
        }
    }

    /// Signed distance of `point` to the plane of this triangle, positive on the outside
    fn signed_distance(&self, points: &[Vector3<f64>], point: &Vector3<f64>) -> f64 {
        let length = self.normal.magnitude();
        if length == 0.0 {
            return 0.0;
        }
        self.normal.dot(&(point - points[self.a])) / length
    }
}

/// Convex hull as points
/// Returns the sorted indices of all points in `points` that are vertices of their convex hull. Degenerate
/// inputs are handled as well: coplanar points yield the vertices of their 2D hull, collinear points yield the
/// two extreme points and if all points coincide, only the first point is returned. An empty input yields an
/// empty result.
///
/// Points that lie on the hull surface within a small relative tolerance may or may not be reported.
pub fn convex_hull_points(points: &[Vector3<f64>]) -> Vec<usize> {
    if points.is_empty() {
        return vec![];
    }
    let extent = extent(points);
    if extent == 0.0 {
        return vec![0];
    }
    let eps = extent * RELATIVE_EPSILON;

    let first = farthest_from(points, |p| (p - points[0]).magnitude());
    let second = farthest_from(points, |p| (p - points[first]).magnitude());
    let axis = points[second] - points[first];
    let third = farthest_from(points, |p| dist_point_to_line(p, &points[first], &axis));
    if dist_point_to_line(&points[third], &points[first], &axis) <= eps {
        let mut endpoints = vec![first, second];
        endpoints.sort_unstable();
        return endpoints;
    }
    let plane_normal = calc_normal(points[first], points[second], points[third]).normalize();
    let fourth = farthest_from(points, |p| plane_normal.dot(&(p - points[first])).abs());
    if plane_normal.dot(&(points[fourth] - points[first])).abs() <= eps {
        return planar_hull(points, first, &axis, &plane_normal);
    }

    let mut hull = incremental_hull(points, [first, second, third, fourth], eps);
    hull.sort_unstable();
    hull
}

/// Convex hull of 2D points via Andrew's monotone chain. Returns the hull vertices in counter-clockwise order,
/// collinear boundary points are dropped
pub fn convex_hull_2d(points: &[Vector2<f64>]) -> Vec<usize> {
    let mut order = (0..points.len()).collect::<Vec<_>>();
    order.sort_by(|&l, &r| {
        points[l]
            .x
            .total_cmp(&points[r].x)
            .then(points[l].y.total_cmp(&points[r].y))
    });
    order.dedup_by(|l, r| points[*l] == points[*r]);
    if order.len() < 3 {
        return order;
    }

    let cross = |o: usize, a: usize, b: usize| {
        let oa = points[a] - points[o];
        let ob = points[b] - points[o];
        oa.x * ob.y - oa.y * ob.x
    };

    let mut hull: Vec<usize> = Vec::with_capacity(2 * order.len());
    // lower chain, then upper chain
    for pass in 0..2 {
        let chain_start = hull.len();
        let iter: Box<dyn Iterator<Item = &usize>> = if pass == 0 {
            Box::new(order.iter())
        } else {
            Box::new(order.iter().rev())
        };
        for &idx in iter {
            while hull.len() >= chain_start + 2
                && cross(hull[hull.len() - 2], hull[hull.len() - 1], idx) <= 0.0
            {
                hull.pop();
            }
            hull.push(idx);
        }
        // the last point of each chain is the first point of the next one
        hull.pop();
    }
    hull
}

/// Projects coplanar points into their plane and computes the 2D hull there
fn planar_hull(
    points: &[Vector3<f64>],
    origin: usize,
    axis: &Vector3<f64>,
    plane_normal: &Vector3<f64>,
) -> Vec<usize> {
    let u = axis.normalize();
    let v = plane_normal.cross(&u);
    let projected = points
        .iter()
        .map(|p| {
            let d = p - points[origin];
            Vector2::new(d.dot(&u), d.dot(&v))
        })
        .collect::<Vec<_>>();
    let mut hull = convex_hull_2d(&projected);
    hull.sort_unstable();
    hull
}

/// Incremental hull construction, starting from a non-degenerate tetrahedron. Each point that is outside the
/// current hull removes all triangles that it can see and closes the hole with triangles to the horizon edges.
fn incremental_hull(points: &[Vector3<f64>], seed: [usize; 4], eps: f64) -> Vec<usize> {
    let interior = seed
        .iter()
        .fold(Vector3::zeros(), |acc: Vector3<f64>, &i| acc + points[i])
        / 4.0;
    let [p0, p1, p2, p3] = seed;
    let mut triangles = vec![
        Triangle::oriented(points, p0, p1, p2, &interior),
        Triangle::oriented(points, p0, p1, p3, &interior),
        Triangle::oriented(points, p0, p2, p3, &interior),
        Triangle::oriented(points, p1, p2, p3, &interior),
    ];

    for (pointid, point) in points.iter().enumerate() {
        if seed.contains(&pointid) {
            continue;
        }
        let mut outer_edges = HashSet::new();
        triangles.retain(|tri| {
            if tri.signed_distance(points, point) > eps {
                add_edge_to_outer_edges(tri.a, tri.b, &mut outer_edges);
                add_edge_to_outer_edges(tri.b, tri.c, &mut outer_edges);
                add_edge_to_outer_edges(tri.c, tri.a, &mut outer_edges);
                return false;
            }
            true
        });
        // outer edges keep the winding of the removed triangles, so the new triangles face outwards
        for (a, b) in outer_edges {
            triangles.push(Triangle::oriented(points, a, b, pointid, &interior));
        }
    }

    let mut vertices = HashSet::new();
    for tri in triangles.iter() {
        vertices.insert(tri.a);
        vertices.insert(tri.b);
        vertices.insert(tri.c);
    }
    vertices.into_iter().collect()
}

/// Adds the directed edge `a -> b` to the set of outer edges. If the opposite edge `b -> a` is already contained,
/// the edge is shared by two removed triangles and is dropped from the set instead.
/// `a`: first vertex of the edge
/// `b`: second vertex of the edge
/// `outer_edges`: the set of outer (horizon) edges
fn add_edge_to_outer_edges(a: usize, b: usize, outer_edges: &mut HashSet<(usize, usize)>) {
    if !outer_edges.remove(&(b, a)) {
        outer_edges.insert((a, b));
    }
}

/// Index of the point that maximizes `metric`
fn farthest_from<F: Fn(&Vector3<f64>) -> f64>(points: &[Vector3<f64>], metric: F) -> usize {
    points
        .iter()
        .enumerate()
        .map(|(idx, p)| (idx, metric(p)))
        .fold((0, f64::NEG_INFINITY), |best, current| {
            if current.1 > best.1 {
                current
            } else {
                best
            }
        })
        .0
}

/// Length of the diagonal of the axis-aligned bounding box of `points`
fn extent(points: &[Vector3<f64>]) -> f64 {
    let (min, max) = points.iter().fold(
        (points[0], points[0]),
        |(min, max): (Vector3<f64>, Vector3<f64>), p| (min.inf(p), max.sup(p)),
    );
    (max - min).magnitude()
}

/// Calculates the distance of a point to an infinite line.
/// `point`: the point
/// `origin`: a point on the line
/// `direction`: direction of the line, must not be zero
fn dist_point_to_line(point: &Vector3<f64>, origin: &Vector3<f64>, direction: &Vector3<f64>) -> f64 {
    direction.cross(&(point - origin)).magnitude() / direction.magnitude()
}

/// Calculates the (unnormalized) normal of a triangle formed by three points.
fn calc_normal(a: Vector3<f64>, b: Vector3<f64>, c: Vector3<f64>) -> Vector3<f64> {
    let ab: Vector3<f64> = b - a;
    let ac: Vector3<f64> = c - a;
    ab.cross(&ac)
}
