//! Triangulation of planar loops with holes, used to close the seams left
//! by a cut.

use std::cmp::Ordering;

use nalgebra::Vector2;

type Point = Vector2<f64>;

/// Triangulates closed loops given as indices into `points`.
///
/// Counter-clockwise loops are outlines, clockwise loops are holes in the
/// smallest outline around them. A clockwise loop outside of every outline is
/// filled on its own. Every triangle winds the same way as the loop it came
/// from, so loop edges reappear unchanged in the output.
pub fn triangulate_loops(points: &[Vector2<f32>], loops: &[Vec<u32>]) -> Vec<[u32; 3]> {
    let points = points.iter().map(|x| x.cast::<f64>()).collect::<Vec<_>>();

    let mut outlines = Vec::new();
    let mut holes = Vec::new();
    for lp in loops.iter().filter(|x| x.len() >= 3) {
        let area = signed_area(&points, lp);
        match area.partial_cmp(&0.0) {
            Some(Ordering::Greater) => outlines.push((lp.clone(), area)),
            Some(Ordering::Less) => holes.push(lp.clone()),
            _ => {}
        }
    }

    let mut out = Vec::new();
    let mut assigned = vec![Vec::new(); outlines.len()];
    for hole in holes {
        let parent = (outlines.iter().enumerate())
            .filter(|(_, (outline, _))| contains_loop(&points, outline, &hole))
            .min_by(|(_, (_, a)), (_, (_, b))| a.total_cmp(b))
            .map(|(idx, _)| idx);

        match parent {
            Some(idx) => assigned[idx].push(hole),
            None => {
                let reversed = hole.iter().rev().copied().collect();
                let start = out.len();
                ear_clip(&points, reversed, &mut out);
                out[start..].iter_mut().for_each(|x| x.swap(1, 2));
            }
        }
    }

    for ((outline, _), holes) in outlines.into_iter().zip(assigned) {
        let polygon = bridge_holes(&points, outline, holes);
        ear_clip(&points, polygon, &mut out);
    }

    out
}

/// Twice the signed area of the triangle, positive if counter-clockwise.
fn orient(a: &Point, b: &Point, c: &Point) -> f64 {
    (b - a).perp(&(c - a))
}

fn signed_area(points: &[Point], lp: &[u32]) -> f64 {
    let area = (0..lp.len())
        .map(|i| {
            let (a, b) = (lp[i], lp[(i + 1) % lp.len()]);
            points[a as usize].perp(&points[b as usize])
        })
        .sum::<f64>();
    area / 2.0
}

/// Even-odd test, points on the boundary may land on either side.
fn contains_point(points: &[Point], lp: &[u32], point: &Point) -> bool {
    let mut inside = false;
    for i in 0..lp.len() {
        let a = points[lp[i] as usize];
        let b = points[lp[(i + 1) % lp.len()] as usize];
        if (a.y > point.y) != (b.y > point.y) {
            let x = a.x + (point.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if point.x < x {
                inside = !inside;
            }
        }
    }
    inside
}

/// Holes may touch their outline, so the majority of vertices decides.
fn contains_loop(points: &[Point], outline: &[u32], lp: &[u32]) -> bool {
    let inside = (lp.iter())
        .filter(|&&x| contains_point(points, outline, &points[x as usize]))
        .count();
    inside * 2 > lp.len()
}

/// Merges holes into the outline by cutting a two way bridge from each hole
/// to a visible outline vertex, producing one weakly simple polygon.
fn bridge_holes(points: &[Point], outline: Vec<u32>, mut holes: Vec<Vec<u32>>) -> Vec<u32> {
    holes.sort_by(|a, b| {
        let a = points[a[rightmost(points, a)] as usize];
        let b = points[b[rightmost(points, b)] as usize];
        b.x.total_cmp(&a.x)
    });

    let mut polygon = outline;
    for (idx, hole) in holes.iter().enumerate() {
        let start = rightmost(points, hole);
        let from = points[hole[start] as usize];

        let mut candidates = (0..polygon.len()).collect::<Vec<_>>();
        candidates.sort_by(|&a, &b| {
            let a = (points[polygon[a] as usize] - from).norm_squared();
            let b = (points[polygon[b] as usize] - from).norm_squared();
            a.total_cmp(&b)
        });

        let remaining = &holes[idx..];
        let bridge = (candidates.iter().copied())
            .find(|&k| {
                in_wedge(points, &polygon, k, &from)
                    && is_clear(points, &from, &points[polygon[k] as usize], &polygon, remaining)
            })
            .unwrap_or(candidates[0]);

        let mut merged = Vec::with_capacity(polygon.len() + hole.len() + 2);
        merged.extend_from_slice(&polygon[..=bridge]);
        merged.extend(hole[start..].iter().chain(&hole[..=start]));
        merged.extend_from_slice(&polygon[bridge..]);
        polygon = merged;
    }

    polygon
}

/// Index of the loop vertex with the largest x, lowest y on ties.
fn rightmost(points: &[Point], lp: &[u32]) -> usize {
    (0..lp.len())
        .max_by(|&a, &b| {
            let (a, b) = (points[lp[a] as usize], points[lp[b] as usize]);
            a.x.total_cmp(&b.x).then(b.y.total_cmp(&a.y))
        })
        .unwrap_or(0)
}

/// Whether `target` lies inside the polygon's interior angle at corner `k`.
fn in_wedge(points: &[Point], polygon: &[u32], k: usize, target: &Point) -> bool {
    let n = polygon.len();
    let prev = points[polygon[(k + n - 1) % n] as usize];
    let curr = points[polygon[k] as usize];
    let next = points[polygon[(k + 1) % n] as usize];

    let left_of_prev = orient(&prev, &curr, target) > 0.0;
    let left_of_next = orient(&curr, &next, target) > 0.0;
    if orient(&prev, &curr, &next) >= 0.0 {
        left_of_prev && left_of_next
    } else {
        left_of_prev || left_of_next
    }
}

/// The open segment doesn't cross any loop edge or pass through any vertex.
fn is_clear(points: &[Point], a: &Point, b: &Point, polygon: &[u32], holes: &[Vec<u32>]) -> bool {
    let loops = std::iter::once(polygon).chain(holes.iter().map(Vec::as_slice));
    for lp in loops {
        for i in 0..lp.len() {
            let p = points[lp[i] as usize];
            let q = points[lp[(i + 1) % lp.len()] as usize];

            if p != *a && p != *b && orient(a, b, &p) == 0.0 && (p - a).dot(&(p - b)) < 0.0 {
                return false;
            }

            if [p, q].iter().any(|x| x == a || x == b) {
                continue;
            }

            let crosses = orient(a, b, &p) * orient(a, b, &q) < 0.0
                && orient(&p, &q, a) * orient(&p, &q, b) < 0.0;
            if crosses {
                return false;
            }
        }
    }

    true
}

/// Clips ears off a counter-clockwise polygon until a single triangle is
/// left. Falls back to the most convex corner if no clean ear exists, so it
/// always terminates on bad input.
fn ear_clip(points: &[Point], mut polygon: Vec<u32>, out: &mut Vec<[u32; 3]>) {
    let mut i = 0;
    let mut misses = 0;

    while polygon.len() > 3 {
        let n = polygon.len();
        i %= n;

        let ear = if is_ear(points, &polygon, i) {
            Some(i)
        } else if misses >= n {
            (0..n).max_by(|&a, &b| turn(points, &polygon, a).total_cmp(&turn(points, &polygon, b)))
        } else {
            None
        };

        let Some(ear) = ear else {
            i += 1;
            misses += 1;
            continue;
        };

        out.push([polygon[(ear + n - 1) % n], polygon[ear], polygon[(ear + 1) % n]]);
        polygon.remove(ear);
        misses = 0;
        i = if ear == 0 { n - 2 } else { ear - 1 };
    }

    if let [a, b, c] = polygon[..] {
        out.push([a, b, c]);
    }
}

fn turn(points: &[Point], polygon: &[u32], i: usize) -> f64 {
    let n = polygon.len();
    let [a, b, c] = [(i + n - 1) % n, i, (i + 1) % n].map(|x| points[polygon[x] as usize]);
    orient(&a, &b, &c)
}

fn is_ear(points: &[Point], polygon: &[u32], i: usize) -> bool {
    let n = polygon.len();
    let corner = [polygon[(i + n - 1) % n], polygon[i], polygon[(i + 1) % n]];
    let [a, b, c] = corner.map(|x| points[x as usize]);
    if orient(&a, &b, &c) <= 0.0 {
        return false;
    }

    let (min, max) = (a.inf(&b).inf(&c), a.sup(&b).sup(&c));
    !polygon.iter().any(|&idx| {
        let p = points[idx as usize];
        !corner.contains(&idx)
            && p != a
            && p != b
            && p != c
            && (min.x..=max.x).contains(&p.x)
            && (min.y..=max.y).contains(&p.y)
            && orient(&a, &b, &p) >= 0.0
            && orient(&b, &c, &p) >= 0.0
            && orient(&c, &a, &p) >= 0.0
    })
}
