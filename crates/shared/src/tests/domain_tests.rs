use super::*;

#[test]
fn truncates_on_char_boundaries() {
    assert_eq!(truncate_chars("abc", 5), "abc");
    assert_eq!(truncate_chars("abcdef", 3), "abc");
    assert_eq!(truncate_chars("ééé", 2), "éé");
    assert_eq!(truncate_chars(&"x".repeat(150), MAX_TOUR_NAME_CHARS).len(), 100);
}

#[test]
fn location_accepts_decimal_string_coordinates() {
    let loc: Location = serde_json::from_str(
        r#"{"id":2,"name":"Hood College","address":"401 Rosemont Ave","latitude":"39.422962","longitude":"-77.418917"}"#,
    )
    .expect("decode");
    assert_eq!(loc.id, LocationId(2));
    assert_eq!(loc.lat_lon(), [39.422962, -77.418917]);
}

#[test]
fn location_rejects_garbage_coordinates() {
    let err = serde_json::from_str::<Location>(
        r#"{"id":2,"name":"x","address":"","latitude":"north","longitude":"1"}"#,
    )
    .expect_err("must fail");
    assert!(err.to_string().contains("invalid coordinate"));
}

#[test]
fn tour_without_locations_decodes_empty() {
    let tour: Tour = serde_json::from_str(r#"{"id":4,"name":"Maryland Trip"}"#).expect("decode");
    assert!(tour.locations.is_empty());
    assert_eq!(tour.summary().name, "Maryland Trip");
}

#[test]
fn non_positive_ids_are_not_selectable() {
    assert!(!TourId(0).is_selectable());
    assert!(!TourId(-1).is_selectable());
    assert!(TourId(1).is_selectable());
}

#[test]
fn rounds_to_six_places() {
    assert_eq!(round_coordinate(39.42296249), 39.422962);
    assert_eq!(round_coordinate(-77.41891751), -77.418918);
}

#[test]
fn location_rejects_non_finite_coordinates() {
    for raw in ["NaN", "inf", "-infinity"] {
        let json = format!(
            r#"{{"id":2,"name":"x","address":"","latitude":"{raw}","longitude":"1"}}"#
        );
        let err = serde_json::from_str::<Location>(&json).expect_err(raw);
        assert!(err.to_string().contains("not a finite number"), "{raw}: {err}");
    }
}
