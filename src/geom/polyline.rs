use geo::{Coord, LineString, MultiLineString};

use crate::error::GeometryError;

/// Resolve polyline parts into a single line, merging parts whose endpoints meet.
pub(crate) fn resolve_polyline(parts: &MultiLineString<f64>) -> Result<LineString<f64>, GeometryError> {
    let mut remaining: Vec<Vec<Coord<f64>>> = parts.0.iter()
        .map(|part| dedup(&part.0))
        .filter(|coords| !coords.is_empty())
        .collect();

    if remaining.is_empty() { return Err(GeometryError::Empty) }
    let num_parts = remaining.len();

    let mut chain = remaining.remove(0);
    while !remaining.is_empty() {
        let Some(pos) = remaining.iter().position(|part| touches(&chain, part)) else {
            return Err(GeometryError::Disjoint { parts: num_parts });
        };
        attach(&mut chain, remaining.swap_remove(pos));
    }

    if chain.len() < 2 { return Err(GeometryError::Degenerate) }
    Ok(LineString(chain))
}

/// Drop consecutive repeated coordinates.
fn dedup(coords: &[Coord<f64>]) -> Vec<Coord<f64>> {
    let mut out = coords.to_vec();
    out.dedup();
    out
}

fn endpoints(coords: &[Coord<f64>]) -> (Coord<f64>, Coord<f64>) {
    (coords[0], coords[coords.len() - 1])
}

/// Check whether `part` shares an endpoint with `chain`.
fn touches(chain: &[Coord<f64>], part: &[Coord<f64>]) -> bool {
    let (a, b) = endpoints(chain);
    let (c, d) = endpoints(part);
    a == c || a == d || b == c || b == d
}

/// Join `part` onto whichever end of `chain` it meets, reversing it as needed.
fn attach(chain: &mut Vec<Coord<f64>>, mut part: Vec<Coord<f64>>) {
    let (start, end) = endpoints(chain);
    let (c, d) = endpoints(&part);
    if end == c {
        chain.extend(part.into_iter().skip(1));
    } else if end == d {
        part.reverse();
        chain.extend(part.into_iter().skip(1));
    } else {
        if start == c { part.reverse() }
        part.pop();
        part.append(chain);
        *chain = part;
    }
}
