use super::filter::Candidate;

/// Ratings this close to the head of a group rank as equal.
const RATING_TOLERANCE: f64 = 0.1;
const TOLERANCE_EPSILON: f64 = 1e-9;

/// Order candidates best first: higher rating, then shorter distance.
///
/// Ratings are grouped by proximity. A group starts at its highest rating and
/// takes every following rating no more than 0.1 below it; inside a group the
/// closer officer wins. Returns a new vector holding the same candidates, and
/// both sorts are stable so exact ties keep their roster order.
pub fn rank(candidates: &[Candidate]) -> Vec<Candidate> {
    let mut by_rating = candidates.to_vec();
    by_rating.sort_by(|a, b| b.officer.rating.total_cmp(&a.officer.rating));

    let mut ranked = Vec::with_capacity(by_rating.len());
    let mut group: Vec<Candidate> = Vec::new();
    let mut head_rating = f64::NAN;

    for candidate in by_rating {
        let within_group =
            head_rating - candidate.officer.rating <= RATING_TOLERANCE + TOLERANCE_EPSILON;
        if !within_group {
            flush_group(&mut group, &mut ranked);
            head_rating = candidate.officer.rating;
        }
        group.push(candidate);
    }
    flush_group(&mut group, &mut ranked);

    ranked
}

fn flush_group(group: &mut Vec<Candidate>, ranked: &mut Vec<Candidate>) {
    group.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    ranked.append(group);
}
