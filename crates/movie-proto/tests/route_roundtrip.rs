//! Round-trip law of the Detail route over many generated identifiers.
//!
//! Run with: cargo test -p movie-proto --test route_roundtrip

use movie_proto::route::{
    detail_path, match_path, parse_detail_param, route_for, Destination, Route,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ALPHABET: &[char] = &[
    'a', 'Z', '0', '9', '-', '_', '.', '~', ' ', '/', '{', '}', '%', '?', '#', '&', '+', 'é',
    'ß', '東', '🎬',
];

fn random_id(rng: &mut StdRng) -> String {
    let len = rng.gen_range(1..24);
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())])
        .collect()
}

#[test]
fn detail_path_round_trips_generated_ids() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..2_000 {
        let id = random_id(&mut rng);
        let path = detail_path(&id);
        assert_eq!(
            parse_detail_param(&path).as_deref(),
            Some(id.as_str()),
            "path {}",
            path
        );
        assert_eq!(
            match_path(&path).unwrap(),
            Destination::Detail {
                movie_id: Some(id.clone())
            }
        );
    }
}

#[test]
fn placeholder_text_is_an_ordinary_id() {
    let placeholder = route_for(Route::Detail)
        .strip_prefix("detailScreen/")
        .unwrap()
        .to_string();
    let path = detail_path(&placeholder);
    assert_ne!(path, route_for(Route::Detail));
    assert_eq!(parse_detail_param(&path), Some(placeholder));
}

#[test]
fn every_template_resolves_to_its_route() {
    for route in Route::ALL {
        let dest = match_path(route_for(route)).unwrap();
        assert_eq!(dest.route(), route);
    }
}

#[test]
fn detail_template_carries_no_argument() {
    assert_eq!(
        match_path(route_for(Route::Detail)).unwrap(),
        Destination::Detail { movie_id: None }
    );
}
