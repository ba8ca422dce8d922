use reel_tuner::error::SlotError;
use reel_tuner::reel::*;

fn set(a: &[u8], b: &[u8], c: &[u8]) -> ReelSet {
    ReelSet::from_symbols([a.to_vec(), b.to_vec(), c.to_vec()]).unwrap()
}

#[test]
fn test_window_wraps_around_end() {
    let reel = Reel::new(vec![0, 1, 2, 3, 4]).unwrap();
    assert_eq!(reel.window(0), [0, 1, 2]);
    assert_eq!(reel.window(3), [3, 4, 0]);
    assert_eq!(reel.window(4), [4, 0, 1]);
}

#[test]
fn test_window_reduces_any_stop() {
    let reel = Reel::new(vec![0, 1, 2, 3, 4]).unwrap();
    assert_eq!(reel.window(5), reel.window(0));
    assert_eq!(reel.window(-1), [4, 0, 1]);
    assert_eq!(reel.window(-6), [4, 0, 1]);
    assert_eq!(reel.window(1_000_000_007), [2, 3, 4]);
}

#[test]
fn test_minimum_length_reel() {
    let reel = Reel::new(vec![3, 1, 4]).unwrap();
    assert_eq!(reel.window(0), [3, 1, 4]);
    assert_eq!(reel.window(2), [4, 3, 1]);
}

#[test]
fn test_short_reel_rejected() {
    assert!(matches!(Reel::new(vec![0, 1]), Err(SlotError::InvalidReel(_))));
    assert!(matches!(Reel::new(vec![]), Err(SlotError::InvalidReel(_))));
}

#[test]
fn test_unknown_symbol_rejected() {
    assert!(matches!(Reel::new(vec![0, 1, 9]), Err(SlotError::InvalidReel(_))));
}

#[test]
fn test_parse_reel_notation() {
    let reel = parse_reel("0,0,2, 4 3").unwrap();
    assert_eq!(reel.symbols(), &[0, 0, 2, 4, 3]);
    assert!(parse_reel("0,x,1").is_err());
    assert!(parse_reel("1,2").is_err());
    assert!(parse_reel("").is_err());
}

#[test]
fn test_reel_display() {
    let reel = Reel::new(vec![2, 0, 4]).unwrap();
    assert_eq!(reel.to_string(), "[2, 0, 4]");
}

#[test]
fn test_reel_set_json_shape() {
    let reels = set(&[0, 1, 2], &[2, 2, 2, 3], &[4, 4, 0]);
    let value = serde_json::to_value(&reels).unwrap();
    assert_eq!(value["reel_1"], serde_json::json!([0, 1, 2]));
    assert_eq!(value["reel_2"], serde_json::json!([2, 2, 2, 3]));
    assert_eq!(value["reel_3"], serde_json::json!([4, 4, 0]));

    let back: ReelSet = serde_json::from_value(value).unwrap();
    assert_eq!(back, reels);
}

#[test]
fn test_reel_set_json_validates_reels() {
    let short = r#"{"reel_1": [0, 1], "reel_2": [0, 1, 2], "reel_3": [0, 1, 2]}"#;
    assert!(serde_json::from_str::<ReelSet>(short).is_err());
    let unknown = r#"{"reel_1": [0, 1, 2], "reel_2": [0, 7, 2], "reel_3": [0, 1, 2]}"#;
    assert!(serde_json::from_str::<ReelSet>(unknown).is_err());
    let missing = r#"{"reel_1": [0, 1, 2], "reel_2": [0, 1, 2]}"#;
    assert!(serde_json::from_str::<ReelSet>(missing).is_err());
}

#[test]
fn test_stop_combinations() {
    let reels = set(&[0, 1, 2], &[0, 1, 2, 3], &[0, 1, 2, 3, 4]);
    assert_eq!(reels.lengths(), [3, 4, 5]);
    assert_eq!(reels.stop_combinations(), 60);
}

#[test]
fn test_stop_combinations_saturates() {
    let wide = vec![0u8; 1 << 22];
    let reels = set(&wide, &wide, &wide);
    assert_eq!(reels.stop_combinations(), u64::MAX);
}
