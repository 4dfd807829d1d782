//! Delaunay triangulation of integer grid sites with barycentric lookup.

use std::collections::BTreeMap;

use rustfft::num_complex::Complex64;

use super::Interpolator;
use crate::error::{OtfsError, Result};

type Point = (i64, i64);
type Edge = (usize, usize);

/// Piecewise-linear interpolation over a Delaunay triangulation of the sites.
///
/// Inside the convex hull of the sites (boundary included) the value is the
/// barycentric blend of the enclosing triangle's corners. Outside the hull
/// the result is `None`. Needs at least three sites that are not all on one
/// line.
#[derive(Debug, Clone)]
pub struct LinearTriangulation {
    points: Vec<Point>,
    triangles: Vec<[usize; 3]>,
}

impl LinearTriangulation {
    pub fn new(sites: &[(usize, usize)]) -> Result<Self> {
        if sites.len() < 3 {
            return Err(OtfsError::config(format!(
                "linear interpolation needs at least 3 pilots, got {}",
                sites.len()
            )));
        }
        let points: Vec<Point> = sites.iter().map(|&(d, l)| (d as i64, l as i64)).collect();
        let mut triangles = sweep(&points)?;
        make_delaunay(&points, &mut triangles);
        tracing::debug!(
            sites = points.len(),
            triangles = triangles.len(),
            "built pilot triangulation"
        );
        Ok(Self { points, triangles })
    }

    /// Triangles as counter-clockwise site index triples.
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Enclosing triangle and barycentric weights of `p`, if inside the hull.
    fn locate(&self, p: Point) -> Option<([usize; 3], [f64; 3])> {
        for tri in &self.triangles {
            let [a, b, c] = tri.map(|i| self.points[i]);
            let (min_x, max_x) = (a.0.min(b.0).min(c.0), a.0.max(b.0).max(c.0));
            let (min_y, max_y) = (a.1.min(b.1).min(c.1), a.1.max(b.1).max(c.1));
            if p.0 < min_x || p.0 > max_x || p.1 < min_y || p.1 > max_y {
                continue;
            }
            let wa = orient(b, c, p);
            let wb = orient(c, a, p);
            let wc = orient(a, b, p);
            if wa >= 0 && wb >= 0 && wc >= 0 {
                let area = (wa + wb + wc) as f64;
                return Some((*tri, [wa as f64 / area, wb as f64 / area, wc as f64 / area]));
            }
        }
        None
    }
}

impl Interpolator for LinearTriangulation {
    fn site_count(&self) -> usize {
        self.points.len()
    }

    fn evaluate(&self, values: &[Complex64], doppler: usize, delay: usize) -> Option<Complex64> {
        let (tri, weights) = self.locate((doppler as i64, delay as i64))?;
        let mut acc = Complex64::new(0.0, 0.0);
        for (&i, w) in tri.iter().zip(weights) {
            acc += *values.get(i)? * w;
        }
        Some(acc)
    }
}

/// Twice the signed area of `abc`; positive when counter-clockwise.
fn orient(a: Point, b: Point, c: Point) -> i128 {
    let (abx, aby) = ((b.0 - a.0) as i128, (b.1 - a.1) as i128);
    let (acx, acy) = ((c.0 - a.0) as i128, (c.1 - a.1) as i128);
    abx * acy - aby * acx
}

/// Positive when `d` is strictly inside the circumcircle of the
/// counter-clockwise triangle `abc`.
fn in_circle(a: Point, b: Point, c: Point, d: Point) -> i128 {
    let (adx, ady) = ((a.0 - d.0) as i128, (a.1 - d.1) as i128);
    let (bdx, bdy) = ((b.0 - d.0) as i128, (b.1 - d.1) as i128);
    let (cdx, cdy) = ((c.0 - d.0) as i128, (c.1 - d.1) as i128);
    let ad = adx * adx + ady * ady;
    let bd = bdx * bdx + bdy * bdy;
    let cd = cdx * cdx + cdy * cdy;
    adx * (bdy * cd - bd * cdy) - ady * (bdx * cd - bd * cdx) + ad * (bdx * cdy - bdy * cdx)
}

/// Triangulate the convex hull by sweeping the sites in lexicographic order.
///
/// Each new site lies outside the hull built so far and is joined to every
/// hull edge it can see.
fn sweep(points: &[Point]) -> Result<Vec<[usize; 3]>> {
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by_key(|&i| points[i]);
    if let Some(w) = order.windows(2).find(|w| points[w[0]] == points[w[1]]) {
        return Err(OtfsError::config(format!(
            "pilots {} and {} share a cell",
            w[0], w[1]
        )));
    }

    // Leading sites stay on one line until the first one that leaves it.
    let apex_pos = (2..order.len())
        .find(|&k| orient(points[order[0]], points[order[1]], points[order[k]]) != 0)
        .ok_or_else(|| OtfsError::config("pilots are collinear; cannot triangulate"))?;
    let chain = &order[..apex_pos];
    let apex = order[apex_pos];

    let first = points[chain[0]];
    let last = points[chain[chain.len() - 1]];
    let apex_left = orient(first, last, points[apex]) > 0;

    let mut triangles = Vec::with_capacity(2 * points.len());
    for w in chain.windows(2) {
        if apex_left {
            triangles.push([w[0], w[1], apex]);
        } else {
            triangles.push([w[1], w[0], apex]);
        }
    }

    // Hull vertices in counter-clockwise order.
    let mut hull: Vec<usize> = if apex_left {
        chain.iter().copied().chain([apex]).collect()
    } else {
        [chain[0], apex]
            .into_iter()
            .chain(chain[1..].iter().rev().copied())
            .collect()
    };

    for &site in &order[apex_pos + 1..] {
        let p = points[site];
        let h = hull.len();
        let visible: Vec<bool> = (0..h)
            .map(|i| orient(points[hull[i]], points[hull[(i + 1) % h]], p) < 0)
            .collect();
        let start = (0..h)
            .find(|&i| visible[i] && !visible[(i + h - 1) % h])
            .ok_or_else(|| OtfsError::config(format!("pilot {} could not join the hull", site)))?;

        hull.rotate_left(start);
        let visible_edges = (0..h).take_while(|&i| visible[(start + i) % h]).count();
        for i in 0..visible_edges {
            triangles.push([hull[i + 1], hull[i], site]);
        }
        hull.splice(1..visible_edges, [site]);
    }

    Ok(triangles)
}

/// Lawson flips until every interior edge is locally Delaunay.
fn make_delaunay(points: &[Point], triangles: &mut [[usize; 3]]) {
    let mut edges: BTreeMap<Edge, Vec<usize>> = BTreeMap::new();
    for (t, tri) in triangles.iter().enumerate() {
        for i in 0..3 {
            edges.entry(key(tri[i], tri[(i + 1) % 3])).or_default().push(t);
        }
    }

    let mut pending: Vec<Edge> = edges.keys().copied().collect();
    while let Some(edge) = pending.pop() {
        let (t1, t2) = match edges.get(&edge).map(Vec::as_slice) {
            Some(&[t1, t2]) => (t1, t2),
            _ => continue,
        };
        let (a, b, c) = split(triangles[t1], edge);
        let d = opposite(triangles[t2], edge);
        if in_circle(points[a], points[b], points[c], points[d]) <= 0 {
            continue;
        }

        edges.remove(&key(a, b));
        replace(&mut edges, key(b, c), t1, t2);
        replace(&mut edges, key(a, d), t2, t1);
        edges.insert(key(c, d), vec![t1, t2]);
        triangles[t1] = [a, d, c];
        triangles[t2] = [d, b, c];

        pending.extend([key(a, d), key(d, b), key(b, c), key(c, a)]);
    }
}

fn key(a: usize, b: usize) -> Edge {
    (a.min(b), a.max(b))
}

/// Rotate `tri` so that it reads `(a, b, c)` with `edge == {a, b}`.
fn split(tri: [usize; 3], edge: Edge) -> (usize, usize, usize) {
    for i in 0..3 {
        let (a, b) = (tri[i], tri[(i + 1) % 3]);
        if key(a, b) == edge {
            return (a, b, tri[(i + 2) % 3]);
        }
    }
    unreachable!("edge map points at a triangle without that edge")
}

fn opposite(tri: [usize; 3], edge: Edge) -> usize {
    split(tri, edge).2
}

fn replace(edges: &mut BTreeMap<Edge, Vec<usize>>, edge: Edge, from: usize, to: usize) {
    if let Some(owners) = edges.get_mut(&edge) {
        for owner in owners.iter_mut() {
            if *owner == from {
                *owner = to;
            }
        }
    }
}
