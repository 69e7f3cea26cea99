use super::structure::Residue;

// Ring outlines walked along the perimeter, so the projected polygon is
// convex for any real base geometry.
const PYRIMIDINE_OUTLINE: [&str; 6] = ["N1", "C2", "N3", "C4", "C5", "C6"];
const PURINE_OUTLINE: [&str; 9] = ["N1", "C2", "N3", "C4", "N9", "C8", "N7", "C5", "C6"];

type Point = (f64, f64);

fn signed_area(polygon: &[Point]) -> f64 {
    let n = polygon.len();
    let mut acc = 0.0;
    for i in 0..n {
        let (x1, y1) = polygon[i];
        let (x2, y2) = polygon[(i + 1) % n];
        acc += x1 * y2 - x2 * y1;
    }
    acc / 2.0
}

fn counter_clockwise(mut polygon: Vec<Point>) -> Vec<Point> {
    if signed_area(&polygon) < 0.0 {
        polygon.reverse();
    }
    polygon
}

fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

fn intersect(a: Point, b: Point, p: Point, q: Point) -> Point {
    let a1 = b.1 - a.1;
    let b1 = a.0 - b.0;
    let c1 = a1 * a.0 + b1 * a.1;
    let a2 = q.1 - p.1;
    let b2 = p.0 - q.0;
    let c2 = a2 * p.0 + b2 * p.1;
    let det = a1 * b2 - a2 * b1;
    ((b2 * c1 - b1 * c2) / det, (a1 * c2 - a2 * c1) / det)
}

/// Sutherland-Hodgman clip of `subject` against a convex counter-clockwise
/// `clip` polygon.
fn convex_clip(subject: &[Point], clip: &[Point]) -> Vec<Point> {
    let mut output: Vec<Point> = subject.to_vec();
    let n = clip.len();
    for i in 0..n {
        if output.is_empty() {
            break;
        }
        let edge_a = clip[i];
        let edge_b = clip[(i + 1) % n];
        let input = std::mem::take(&mut output);
        let m = input.len();
        for j in 0..m {
            let current = input[j];
            let previous = input[(j + m - 1) % m];
            let current_inside = cross(edge_a, edge_b, current) >= 0.0;
            let previous_inside = cross(edge_a, edge_b, previous) >= 0.0;
            if current_inside {
                if !previous_inside {
                    output.push(intersect(edge_a, edge_b, previous, current));
                }
                output.push(current);
            } else if previous_inside {
                output.push(intersect(edge_a, edge_b, previous, current));
            }
        }
    }
    output
}

/// Intersection area of two convex polygons.
pub fn polygon_overlap(a: &[Point], b: &[Point]) -> f64 {
    if a.len() < 3 || b.len() < 3 {
        return 0.0;
    }
    let a = counter_clockwise(a.to_vec());
    let b = counter_clockwise(b.to_vec());
    let clipped = convex_clip(&a, &b);
    if clipped.len() < 3 {
        return 0.0;
    }
    signed_area(&clipped).abs()
}

fn outline(residue: &Residue) -> Vec<super::geometry::Vec3> {
    let names: &[&str] = if residue.is_purine {
        &PURINE_OUTLINE
    } else {
        &PYRIMIDINE_OUTLINE
    };
    names
        .iter()
        .filter_map(|name| residue.atom(name))
        .map(|atom| atom.coord)
        .collect()
}

/// Area of the intersection of the two base rings, projected onto the mean
/// base plane of the pair. A substantial area means the bases are stacked
/// on top of each other rather than paired edge to edge.
pub fn pair_overlap_area(res_i: &Residue, res_j: &Residue) -> f64 {
    let (frame_i, frame_j) = match (res_i.frame, res_j.frame) {
        (Some(a), Some(b)) => (a, b),
        _ => return 0.0,
    };

    let mut zj = frame_j.z();
    if frame_i.z().dot(zj) < 0.0 {
        zj = -zj;
    }
    let zm = (frame_i.z() + zj).normalized();
    let om = (frame_i.origin + frame_j.origin) / 2.0;
    let u = (frame_i.x() - zm * frame_i.x().dot(zm)).normalized();
    let v = zm.cross(u);

    let project = |points: Vec<super::geometry::Vec3>| -> Vec<Point> {
        points
            .into_iter()
            .map(|p| ((p - om).dot(u), (p - om).dot(v)))
            .collect()
    };

    let ring_i = project(outline(res_i));
    let ring_j = project(outline(res_j));
    polygon_overlap(&ring_i, &ring_j)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square(dx: f64, dy: f64) -> Vec<Point> {
        vec![
            (dx, dy),
            (dx + 1.0, dy),
            (dx + 1.0, dy + 1.0),
            (dx, dy + 1.0),
        ]
    }

    #[test]
    fn identical_squares_overlap_fully() {
        let a = unit_square(0.0, 0.0);
        assert!((polygon_overlap(&a, &a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn half_shifted_squares_overlap_by_half() {
        let a = unit_square(0.0, 0.0);
        let b = unit_square(0.5, 0.0);
        assert!((polygon_overlap(&a, &b) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn disjoint_squares_do_not_overlap() {
        let a = unit_square(0.0, 0.0);
        let b = unit_square(2.5, 0.0);
        assert_eq!(polygon_overlap(&a, &b), 0.0);
    }

    #[test]
    fn winding_order_does_not_matter() {
        let a = unit_square(0.0, 0.0);
        let mut b = unit_square(0.25, 0.25);
        b.reverse();
        assert!((polygon_overlap(&a, &b) - 0.5625).abs() < 1e-12);
    }

    #[test]
    fn triangle_inside_square() {
        let square = unit_square(0.0, 0.0);
        let triangle = vec![(0.25, 0.25), (0.75, 0.25), (0.5, 0.75)];
        assert!((polygon_overlap(&square, &triangle) - 0.125).abs() < 1e-12);
    }

    #[test]
    fn degenerate_outlines_report_zero() {
        let a = unit_square(0.0, 0.0);
        let line = vec![(0.0, 0.0), (1.0, 1.0)];
        assert_eq!(polygon_overlap(&a, &line), 0.0);
    }
}
